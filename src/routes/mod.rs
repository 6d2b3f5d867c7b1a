pub mod auth;
pub mod carts;
pub mod categories;
pub mod health;
pub mod orders;
pub mod payments;
pub mod products;
pub mod reviews;

use actix_web::{HttpResponse, web};

use crate::services::ServiceError;

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .service(health::health_check)
            .configure(auth::auth_routes)
            .configure(categories::category_routes)
            .configure(products::product_routes)
            .configure(reviews::review_routes)
            .configure(carts::cart_routes)
            .configure(orders::order_routes)
            .configure(payments::payment_routes),
    );
}

/// Traduit une ServiceError en enveloppe JSON uniforme
/// {"error": true, "message": ...} avec le code HTTP de la taxonomie.
/// Les erreurs internes sont loggées mais jamais détaillées au client.
pub fn error_response(err: &ServiceError) -> HttpResponse {
    let body = serde_json::json!({
        "error": true,
        "message": err.to_string(),
    });

    match err {
        ServiceError::Validation(_) => HttpResponse::BadRequest().json(body),
        ServiceError::Authentication(_) => HttpResponse::Unauthorized().json(body),
        ServiceError::Authorization(_) => HttpResponse::Forbidden().json(body),
        ServiceError::NotFound(_) => HttpResponse::NotFound().json(body),
        ServiceError::Conflict(_) => HttpResponse::Conflict().json(body),
        ServiceError::Upstream(_) | ServiceError::EmailDelivery(_) => {
            HttpResponse::BadGateway().json(body)
        }
        ServiceError::Db(e) => {
            tracing::error!(error = %e, "Database error");
            HttpResponse::InternalServerError().json(serde_json::json!({
                "error": true,
                "message": "Something went wrong",
            }))
        }
        ServiceError::Internal(message) => {
            tracing::error!(detail = %message, "Internal error");
            HttpResponse::InternalServerError().json(serde_json::json!({
                "error": true,
                "message": "Something went wrong",
            }))
        }
    }
}

const DEFAULT_PAGE_SIZE: u64 = 20;
const MAX_PAGE_SIZE: u64 = 100;

/// Convertit page/limit (1-indexé) en (offset, limit) pour les listes
pub fn pagination(page: Option<u64>, limit: Option<u64>) -> (u64, u64) {
    let limit = limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
    let page = page.unwrap_or(1).max(1);

    ((page - 1) * limit, limit)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pagination_defaults() {
        assert_eq!(pagination(None, None), (0, 20));
    }

    #[test]
    fn test_pagination_offsets_by_page() {
        assert_eq!(pagination(Some(3), Some(10)), (20, 10));
    }

    #[test]
    fn test_pagination_clamps_bad_input() {
        assert_eq!(pagination(Some(0), Some(0)), (0, 1));
        assert_eq!(pagination(Some(1), Some(1000)), (0, 100));
    }
}
