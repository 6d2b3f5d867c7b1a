use actix_web::{HttpRequest, HttpResponse, get, post, web};
use sea_orm::DatabaseConnection;
use serde::Deserialize;
use std::env;
use validator::Validate;

use crate::middleware::AuthUser;
use crate::routes::error_response;
use crate::services::ServiceError;
use crate::services::payment_service::{PaymentService, WebhookOutcome};
use crate::services::paystack::PaymentGateway;

// DTO pour le checkout
#[derive(Deserialize, Validate)]
pub struct CheckoutRequest {
    #[validate(length(min = 1, message = "Address must not be empty"))]
    pub address: String,
}

/// POST /payment/checkout - Payer le contenu du panier (PROTÉGÉE)
///
/// Crée la commande et la transaction "pending" (atomiquement), puis
/// initialise le paiement Paystack. Si Paystack échoue APRÈS le commit,
/// la commande et la transaction restent "pending": trou assumé, hérité
/// du design d'origine.
#[post("/checkout")]
pub async fn checkout(
    auth_user: AuthUser,
    body: web::Json<CheckoutRequest>,
    db: web::Data<DatabaseConnection>,
    gateway: web::Data<dyn PaymentGateway>,
) -> HttpResponse {
    if let Err(errors) = body.validate() {
        return HttpResponse::BadRequest().json(errors);
    }

    // 1. Panier -> commande + transaction pending
    let outcome = match PaymentService::create_pending_checkout(
        db.get_ref(),
        auth_user.account_id,
        body.address.clone(),
    )
    .await
    {
        Ok(outcome) => outcome,
        Err(e) => return error_response(&e),
    };

    // 2. Initialiser le paiement côté Paystack (montant en kobo)
    let amount_minor_units = match PaymentService::to_minor_units(outcome.order.total_amount) {
        Ok(amount) => amount,
        Err(e) => return error_response(&e),
    };

    let payment_link = match gateway
        .initialize(
            &auth_user.email,
            amount_minor_units,
            &outcome.transaction.reference,
        )
        .await
    {
        Ok(url) => url,
        Err(ServiceError::Upstream(message)) => {
            // Message Paystack repassé tel quel (comportement d'origine),
            // la commande reste "pending"
            return HttpResponse::BadRequest().json(serde_json::json!({
                "error": true,
                "message": message,
            }));
        }
        Err(e) => return error_response(&e),
    };

    HttpResponse::Ok().json(serde_json::json!({
        "message": "Please follow the link to finish your payment",
        "payment_link": payment_link,
    }))
}

/// GET /payment/{reference}/verify - Statut d'une transaction (PROTÉGÉE)
///
/// Retourne toujours 200 si l'appel Paystack aboutit, quel que soit le
/// statut du paiement: c'est le champ transaction_status qui fait foi
/// (abandoned, failed, ongoing, pending, processing, queued, reversed,
/// success).
#[get("/{reference}/verify")]
pub async fn verify_transaction(
    _auth_user: AuthUser,
    path: web::Path<String>,
    gateway: web::Data<dyn PaymentGateway>,
) -> HttpResponse {
    let reference = path.into_inner();

    match gateway.verify(&reference).await {
        Ok(status) => HttpResponse::Ok().json(serde_json::json!({
            "transaction_status": status,
        })),
        Err(ServiceError::Upstream(message)) => {
            HttpResponse::BadRequest().json(serde_json::json!({
                "error": true,
                "message": message,
            }))
        }
        Err(e) => error_response(&e),
    }
}

/// POST /payment/webhook - Callback Paystack (PUBLIC, ne pas consommer)
///
/// Seule authentification: la signature HMAC-SHA512 du corps brut dans
/// le header x-paystack-signature.
#[post("/webhook")]
pub async fn webhook(
    request: HttpRequest,
    body: web::Bytes,
    db: web::Data<DatabaseConnection>,
) -> HttpResponse {
    let secret = match env::var("PAYSTACK_SECRET_KEY") {
        Ok(secret) => secret,
        Err(_) => {
            tracing::error!("PAYSTACK_SECRET_KEY is not configured");
            return error_response(&ServiceError::Internal(
                "Webhook secret not configured".to_string(),
            ));
        }
    };

    let signature = request
        .headers()
        .get("x-paystack-signature")
        .and_then(|value| value.to_str().ok());

    match PaymentService::handle_webhook(db.get_ref(), &secret, signature, &body).await {
        Ok(WebhookOutcome::Processed) | Ok(WebhookOutcome::Ignored) => HttpResponse::Ok().finish(),
        Err(e @ ServiceError::Validation(_)) => error_response(&e),
        Err(e @ ServiceError::NotFound(_)) => error_response(&e),
        Err(e @ ServiceError::Conflict(_)) => error_response(&e),
        Err(e) => {
            // Jamais de détails internes vers l'expéditeur du webhook
            tracing::error!(error = %e, "Webhook processing error");
            HttpResponse::InternalServerError().json(serde_json::json!({
                "error": true,
                "message": "Internal server error",
            }))
        }
    }
}

pub fn payment_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/payment")
            .service(checkout)
            .service(webhook)
            .service(verify_transaction),
    );
}
