use actix_web::{Error, FromRequest, HttpRequest, HttpResponse, dev::Payload};
use futures::future::{Ready, ready};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::utils::jwt;

/// Structure qui contient les infos du compte authentifié
/// Utilisée comme extracteur dans les routes protégées
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthUser {
    pub account_id: Uuid,
    pub email: String,
    pub account_type: String,
}

fn unauthorized(message: String) -> Error {
    let response = HttpResponse::Unauthorized().json(serde_json::json!({
        "error": true,
        "message": message
    }));
    actix_web::error::InternalError::from_response("", response).into()
}

/// Implémentation de FromRequest pour AuthUser
/// Cela permet à Actix-Web d'extraire automatiquement AuthUser des requêtes
impl FromRequest for AuthUser {
    type Error = Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        // 1. Extraire le header Authorization
        let auth_header = match req.headers().get("Authorization") {
            Some(header) => header,
            None => {
                return ready(Err(unauthorized("Missing Authorization header".to_string())));
            }
        };

        // 2. Convertir le header en string
        let auth_str = match auth_header.to_str() {
            Ok(s) => s,
            Err(_) => {
                return ready(Err(unauthorized("Invalid Authorization header".to_string())));
            }
        };

        // 3. Extraire le token (format: "Bearer <token>")
        let token = match auth_str.strip_prefix("Bearer ") {
            Some(token) => token,
            None => {
                return ready(Err(unauthorized(
                    "Invalid Authorization format (expected: Bearer <token>)".to_string(),
                )));
            }
        };

        // 4. Vérifier le token JWT
        let claims = match jwt::verify_token(token) {
            Ok(claims) => claims,
            Err(e) => {
                return ready(Err(unauthorized(format!("Invalid token: {}", e))));
            }
        };

        // 5. Seuls les access tokens donnent accès aux routes protégées
        //    (un refresh token volé ne doit pas servir de passe-partout)
        if claims.token_type != jwt::TOKEN_TYPE_ACCESS {
            return ready(Err(unauthorized("Invalid token: not an access token".to_string())));
        }

        ready(Ok(AuthUser {
            account_id: claims.sub,
            email: claims.email,
            account_type: claims.account_type,
        }))
    }
}
