pub mod email_service;
pub mod google_auth;
pub mod moderation;
pub mod otp_service;
pub mod payment_service;
pub mod paystack;
pub mod review_service;

use sea_orm::DbErr;
use thiserror::Error;

/// Taxonomie d'erreurs partagée par tous les services.
/// Les routes traduisent chaque variante en enveloppe JSON
/// {"error": ..., "message": ...} avec le bon code HTTP.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Entrée invalide ou refusée (OTP invalide inclus) -> 400
    #[error("{0}")]
    Validation(String),

    /// Credentials ou token invalides -> 401
    #[error("{0}")]
    Authentication(String),

    /// Rôle ou propriété insuffisants -> 403
    #[error("{0}")]
    Authorization(String),

    /// Ressource introuvable -> 404
    #[error("{0}")]
    NotFound(String),

    /// Doublon (email, produit, jti déjà révoqué...) -> 409
    #[error("{0}")]
    Conflict(String),

    /// Échec d'un service externe (Paystack, Google) -> 400/502
    #[error("{0}")]
    Upstream(String),

    /// Échec d'envoi d'email, toujours remonté à l'appelant -> 502
    #[error("{0}")]
    EmailDelivery(String),

    /// Erreur SeaORM (contrainte DB incluse) -> 500
    #[error("database error: {0}")]
    Db(#[from] DbErr),

    /// Erreur inattendue -> 500
    #[error("{0}")]
    Internal(String),
}
