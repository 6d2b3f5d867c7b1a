// ============================================================================
// SERVICE : PAIEMENTS
// ============================================================================
//
// Description:
//   Orchestration du checkout (panier -> commande + transaction pending)
//   et réconciliation des webhooks Paystack.
//
// Points d'attention:
//   - create_pending_checkout: la commande et la transaction sont créées
//     dans UNE transaction DB (les deux existent ou aucune). L'appel
//     Paystack se fait APRÈS le commit, hors de cette garantie: si la
//     passerelle échoue, la commande et la transaction restent "pending"
//     (trou assumé, hérité du design d'origine, pas de job de nettoyage)
//   - handle_webhook: la signature HMAC-SHA512 du corps brut est la seule
//     authentification de l'endpoint. Vérification en temps constant.
//   - charge.success: vidage du panier + passage de la transaction à
//     "successful" dans UNE transaction DB. Rejouer le même webhook est
//     sans effet (statut déjà "successful" -> no-op, panier déjà vide).
//   - Les événements inconnus sont acquittés (200) pour ne pas déclencher
//     les retries infinis de l'expéditeur.
//
// ============================================================================

use chrono::Utc;
use hmac::{Hmac, Mac};
use rand::Rng;
use rand::distributions::Alphanumeric;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set,
    TransactionTrait,
};
use sha2::Sha512;
use uuid::Uuid;

use super::ServiceError;
use crate::models::{accounts, cart_products, carts, orders, order_products, transactions};

type HmacSha512 = Hmac<Sha512>;

/// Préfixe des références de paiement partagées avec Paystack
const REFERENCE_PREFIX: &str = "TRDW-";
const REFERENCE_SUFFIX_LENGTH: usize = 10;

#[derive(Debug, PartialEq)]
pub enum WebhookOutcome {
    /// Événement charge.success appliqué
    Processed,
    /// Événement bien formé mais non géré, acquitté sans effet
    Ignored,
}

pub struct CheckoutOutcome {
    pub order: orders::Model,
    pub transaction: transactions::Model,
}

pub struct PaymentService;

impl PaymentService {
    /// Génère une référence unique et non devinable:
    /// TRDW- suivi de 10 alphanumériques aléatoires
    pub fn generate_reference() -> String {
        let suffix: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(REFERENCE_SUFFIX_LENGTH)
            .map(char::from)
            .collect();

        format!("{}{}", REFERENCE_PREFIX, suffix)
    }

    /// Convertit un montant en unité mineure de la passerelle (kobo).
    /// Jamais de float pour l'argent: Decimal de bout en bout.
    pub fn to_minor_units(amount: Decimal) -> Result<i64, ServiceError> {
        (amount * Decimal::from(100))
            .trunc()
            .to_i64()
            .ok_or_else(|| ServiceError::Internal("Amount out of range".to_string()))
    }

    /// Vérifie la signature HMAC-SHA512 (hex) du corps brut d'un webhook.
    /// La comparaison passe par Mac::verify_slice (temps constant).
    pub fn verify_webhook_signature(secret: &str, body: &[u8], signature_hex: &str) -> bool {
        let mut mac = match HmacSha512::new_from_slice(secret.as_bytes()) {
            Ok(mac) => mac,
            Err(_) => return false,
        };
        mac.update(body);

        let expected = match hex::decode(signature_hex) {
            Ok(bytes) => bytes,
            Err(_) => return false,
        };

        mac.verify_slice(&expected).is_ok()
    }

    /// Transforme le panier du buyer en commande + transaction "pending".
    ///
    /// Préconditions: le compte a un panier, et ce panier est non vide.
    /// Le total fige la somme des prix courants à cet instant.
    pub async fn create_pending_checkout(
        db: &DatabaseConnection,
        buyer_id: Uuid,
        address: String,
    ) -> Result<CheckoutOutcome, ServiceError> {
        // 1. Le compte doit avoir un panier
        let cart = carts::Entity::find()
            .filter(carts::Column::AccountId.eq(buyer_id))
            .one(db)
            .await?
            .ok_or_else(|| {
                ServiceError::Validation("Account has no cart associated with it".to_string())
            })?;

        // 2. Et ce panier doit contenir au moins un produit
        let items = cart_products::Entity::find()
            .filter(cart_products::Column::CartId.eq(cart.id))
            .all(db)
            .await?;

        if items.is_empty() {
            return Err(ServiceError::Validation(
                "Cart does not have any items in it".to_string(),
            ));
        }

        let product_ids: Vec<Uuid> = items.iter().map(|item| item.product_id).collect();
        let products = crate::models::products::Entity::find()
            .filter(crate::models::products::Column::Id.is_in(product_ids.clone()))
            .all(db)
            .await?;

        // 3. Total = somme des prix courants, figée dans la commande
        let total: Decimal = products.iter().map(|p| p.current_price).sum();

        let now = Utc::now();

        // 4. Commande + transaction pending dans UNE transaction DB
        let txn = db.begin().await?;

        let order = orders::ActiveModel {
            id: Set(Uuid::new_v4()),
            buyer_id: Set(buyer_id),
            address: Set(address),
            total_amount: Set(total),
            status: Set(orders::STATUS_PENDING.to_string()),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&txn)
        .await?;

        for product_id in &product_ids {
            order_products::ActiveModel {
                order_id: Set(order.id),
                product_id: Set(*product_id),
                ..Default::default()
            }
            .insert(&txn)
            .await?;
        }

        let transaction = transactions::ActiveModel {
            id: Set(Uuid::new_v4()),
            order_id: Set(order.id),
            reference: Set(Self::generate_reference()),
            status: Set(transactions::STATUS_PENDING.to_string()),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&txn)
        .await?;

        txn.commit().await?;

        Ok(CheckoutOutcome { order, transaction })
    }

    /// Point d'entrée du webhook Paystack: authentifie, parse, dispatch.
    pub async fn handle_webhook(
        db: &DatabaseConnection,
        secret: &str,
        signature: Option<&str>,
        body: &[u8],
    ) -> Result<WebhookOutcome, ServiceError> {
        // 1. Signature obligatoire
        let signature = signature.ok_or_else(|| {
            tracing::warn!("Missing Paystack signature header");
            ServiceError::Validation("Invalid signature".to_string())
        })?;

        // 2. Corps vide refusé
        if body.is_empty() {
            tracing::warn!("Empty webhook payload received");
            return Err(ServiceError::Validation("Empty payload".to_string()));
        }

        // 3. Vérification de la signature sur le corps brut
        if !Self::verify_webhook_signature(secret, body, signature) {
            tracing::warn!("Paystack signature verification failed");
            return Err(ServiceError::Validation("Invalid signature".to_string()));
        }

        // 4. Parse du payload
        let payload: serde_json::Value = serde_json::from_slice(body)
            .map_err(|_| ServiceError::Validation("Invalid JSON".to_string()))?;

        // 5. Structure minimale: event + data
        let event = payload.get("event").and_then(|e| e.as_str());
        let data = payload.get("data");
        let (event, data) = match (event, data) {
            (Some(event), Some(data)) => (event, data),
            _ => {
                return Err(ServiceError::Validation(
                    "Invalid event structure".to_string(),
                ));
            }
        };

        match event {
            "charge.success" => Self::handle_charge_success(db, data).await,
            other => {
                // Les événements inconnus sont acquittés pour ne pas être
                // rejoués indéfiniment par Paystack
                tracing::debug!(event = other, "Unhandled Paystack event type");
                Ok(WebhookOutcome::Ignored)
            }
        }
    }

    /// Applique un charge.success: vide le panier du buyer et passe la
    /// transaction à "successful". Les deux mutations dans UNE transaction
    /// DB: un apply partiel serait un bug de cohérence.
    async fn handle_charge_success(
        db: &DatabaseConnection,
        data: &serde_json::Value,
    ) -> Result<WebhookOutcome, ServiceError> {
        let email = data
            .pointer("/customer/email")
            .and_then(|v| v.as_str())
            .ok_or_else(|| ServiceError::Validation("Invalid event structure".to_string()))?;
        let reference = data
            .get("reference")
            .and_then(|v| v.as_str())
            .ok_or_else(|| ServiceError::Validation("Invalid event structure".to_string()))?;

        let txn = db.begin().await?;

        let account = accounts::Entity::find()
            .filter(accounts::Column::Email.eq(email))
            .one(&txn)
            .await?
            .ok_or_else(|| {
                tracing::warn!("charge.success for unknown customer email");
                ServiceError::NotFound("Account not found".to_string())
            })?;

        // Vider le panier: les articles sont payés
        if let Some(cart) = carts::Entity::find()
            .filter(carts::Column::AccountId.eq(account.id))
            .one(&txn)
            .await?
        {
            cart_products::Entity::delete_many()
                .filter(cart_products::Column::CartId.eq(cart.id))
                .exec(&txn)
                .await?;
        }

        // Une référence signée sans transaction en face est un problème
        // d'intégrité: on échoue bruyamment et la transaction DB annule
        // le vidage du panier
        let transaction = transactions::Entity::find()
            .filter(transactions::Column::Reference.eq(reference))
            .one(&txn)
            .await?
            .ok_or_else(|| {
                tracing::error!(reference = reference, "charge.success for unknown reference");
                ServiceError::NotFound("Transaction not found".to_string())
            })?;

        if transaction.status != transactions::STATUS_SUCCESSFUL {
            if !transactions::can_transition(&transaction.status, transactions::STATUS_SUCCESSFUL) {
                return Err(ServiceError::Conflict(format!(
                    "Transaction cannot move from {} to successful",
                    transaction.status
                )));
            }

            let transaction_id = transaction.id;
            let mut active: transactions::ActiveModel = transaction.into();
            active.status = Set(transactions::STATUS_SUCCESSFUL.to_string());
            active.updated_at = Set(Utc::now());
            active.update(&txn).await?;

            tracing::debug!(transaction_id = %transaction_id, "Transaction marked successful");
        }

        txn.commit().await?;

        Ok(WebhookOutcome::Processed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};

    const SECRET: &str = "sk_test_webhook_secret";

    fn sign(body: &[u8]) -> String {
        let mut mac = HmacSha512::new_from_slice(SECRET.as_bytes()).unwrap();
        mac.update(body);
        hex::encode(mac.finalize().into_bytes())
    }

    fn account_row(email: &str) -> accounts::Model {
        let now = Utc::now();
        accounts::Model {
            id: Uuid::new_v4(),
            name: "Buyer".to_string(),
            email: email.to_string(),
            account_type: "BUYER".to_string(),
            password_hash: String::new(),
            email_verified: true,
            auth_type: "email".to_string(),
            created_at: now,
            updated_at: now,
        }
    }

    fn cart_row(account_id: Uuid) -> carts::Model {
        let now = Utc::now();
        carts::Model {
            id: Uuid::new_v4(),
            account_id,
            created_at: now,
            updated_at: now,
        }
    }

    fn transaction_row(reference: &str, status: &str) -> transactions::Model {
        let now = Utc::now();
        transactions::Model {
            id: Uuid::new_v4(),
            order_id: Uuid::new_v4(),
            reference: reference.to_string(),
            status: status.to_string(),
            created_at: now,
            updated_at: now,
        }
    }

    fn product_row(price: Decimal) -> crate::models::products::Model {
        let now = Utc::now();
        crate::models::products::Model {
            id: Uuid::new_v4(),
            name: format!("Product {}", Uuid::new_v4()),
            description: String::new(),
            size: "M".to_string(),
            color: "blue".to_string(),
            image: String::new(),
            initial_price: price,
            current_price: price,
            in_stock: true,
            is_approved: true,
            average_rating: Decimal::ZERO,
            seller_id: Uuid::new_v4(),
            created_at: now,
            updated_at: now,
        }
    }

    fn charge_success_body(email: &str, reference: &str) -> Vec<u8> {
        serde_json::to_vec(&serde_json::json!({
            "event": "charge.success",
            "data": {
                "customer": { "email": email },
                "reference": reference,
            }
        }))
        .unwrap()
    }

    #[test]
    fn test_reference_format() {
        let reference = PaymentService::generate_reference();
        assert!(reference.starts_with("TRDW-"));
        assert_eq!(reference.len(), "TRDW-".len() + 10);
        assert!(reference["TRDW-".len()..].chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn test_references_are_not_repeated() {
        let first = PaymentService::generate_reference();
        let second = PaymentService::generate_reference();
        assert_ne!(first, second);
    }

    #[test]
    fn test_to_minor_units() {
        assert_eq!(
            PaymentService::to_minor_units(Decimal::new(1550, 2)).unwrap(),
            1550
        );
        assert_eq!(
            PaymentService::to_minor_units(Decimal::new(100, 0)).unwrap(),
            10000
        );
        assert_eq!(PaymentService::to_minor_units(Decimal::ZERO).unwrap(), 0);
    }

    #[test]
    fn test_signature_roundtrip() {
        let body = br#"{"event":"charge.success"}"#;
        let signature = sign(body);

        assert!(PaymentService::verify_webhook_signature(SECRET, body, &signature));
    }

    #[test]
    fn test_tampered_body_is_rejected() {
        let body = br#"{"event":"charge.success"}"#;
        let signature = sign(body);

        assert!(!PaymentService::verify_webhook_signature(
            SECRET,
            br#"{"event":"charge.failed"}"#,
            &signature
        ));
        assert!(!PaymentService::verify_webhook_signature(SECRET, body, "deadbeef"));
        assert!(!PaymentService::verify_webhook_signature(SECRET, body, "not-hex"));
    }

    #[tokio::test]
    async fn test_webhook_without_signature_changes_nothing() {
        let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();

        let body = charge_success_body("buyer@example.com", "TRDW-abc123DEF0");
        let result = PaymentService::handle_webhook(&db, SECRET, None, &body).await;

        assert!(matches!(result, Err(ServiceError::Validation(_))));
        assert!(db.into_transaction_log().is_empty());
    }

    #[tokio::test]
    async fn test_webhook_with_bad_signature_changes_nothing() {
        let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();

        let body = charge_success_body("buyer@example.com", "TRDW-abc123DEF0");
        let bad_signature = sign(b"some other body");
        let result =
            PaymentService::handle_webhook(&db, SECRET, Some(&bad_signature), &body).await;

        assert!(matches!(result, Err(ServiceError::Validation(_))));
        assert!(db.into_transaction_log().is_empty());
    }

    #[tokio::test]
    async fn test_webhook_rejects_malformed_payloads() {
        for body in [b"".to_vec(), b"not json".to_vec(), br#"{"event":"x"}"#.to_vec()] {
            let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();
            let signature = sign(&body);
            let result =
                PaymentService::handle_webhook(&db, SECRET, Some(&signature), &body).await;

            assert!(matches!(result, Err(ServiceError::Validation(_))));
            assert!(db.into_transaction_log().is_empty());
        }
    }

    #[tokio::test]
    async fn test_webhook_acknowledges_unknown_events() {
        let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();

        let body = serde_json::to_vec(&serde_json::json!({
            "event": "charge.dispute.create",
            "data": {}
        }))
        .unwrap();
        let signature = sign(&body);
        let outcome = PaymentService::handle_webhook(&db, SECRET, Some(&signature), &body)
            .await
            .unwrap();

        assert_eq!(outcome, WebhookOutcome::Ignored);
        assert!(db.into_transaction_log().is_empty());
    }

    #[tokio::test]
    async fn test_charge_success_empties_cart_and_marks_transaction() {
        let account = account_row("buyer@example.com");
        let cart = cart_row(account.id);
        let pending = transaction_row("TRDW-abc123DEF0", transactions::STATUS_PENDING);
        let mut successful = pending.clone();
        successful.status = transactions::STATUS_SUCCESSFUL.to_string();

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![account]])
            .append_query_results([vec![cart]])
            .append_query_results([vec![pending]])
            .append_query_results([vec![successful]])
            .append_exec_results([
                MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 2,
                },
                MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 1,
                },
            ])
            .into_connection();

        let body = charge_success_body("buyer@example.com", "TRDW-abc123DEF0");
        let signature = sign(&body);
        let outcome = PaymentService::handle_webhook(&db, SECRET, Some(&signature), &body)
            .await
            .unwrap();

        assert_eq!(outcome, WebhookOutcome::Processed);

        let log = format!("{:?}", db.into_transaction_log());
        assert!(log.contains("DELETE"));
        assert!(log.contains("UPDATE"));
    }

    #[tokio::test]
    async fn test_charge_success_replay_is_idempotent() {
        let account = account_row("buyer@example.com");
        let cart = cart_row(account.id);
        let already_successful =
            transaction_row("TRDW-abc123DEF0", transactions::STATUS_SUCCESSFUL);

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![account]])
            .append_query_results([vec![cart]])
            .append_query_results([vec![already_successful]])
            .append_exec_results([MockExecResult {
                last_insert_id: 0,
                rows_affected: 0,
            }])
            .into_connection();

        let body = charge_success_body("buyer@example.com", "TRDW-abc123DEF0");
        let signature = sign(&body);
        let outcome = PaymentService::handle_webhook(&db, SECRET, Some(&signature), &body)
            .await
            .unwrap();

        // La transaction reste "successful", aucun UPDATE émis
        assert_eq!(outcome, WebhookOutcome::Processed);
        let log = format!("{:?}", db.into_transaction_log());
        assert!(!log.contains("UPDATE"));
    }

    #[tokio::test]
    async fn test_charge_success_for_unknown_account_is_not_found() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<accounts::Model>::new()])
            .into_connection();

        let body = charge_success_body("ghost@example.com", "TRDW-abc123DEF0");
        let signature = sign(&body);
        let result = PaymentService::handle_webhook(&db, SECRET, Some(&signature), &body).await;

        assert!(matches!(result, Err(ServiceError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_checkout_with_empty_cart_creates_nothing() {
        let buyer_id = Uuid::new_v4();
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![cart_row(buyer_id)]])
            .append_query_results([Vec::<cart_products::Model>::new()])
            .into_connection();

        let result =
            PaymentService::create_pending_checkout(&db, buyer_id, "12 Main St".to_string()).await;

        match result {
            Err(ServiceError::Validation(message)) => {
                assert_eq!(message, "Cart does not have any items in it");
            }
            _ => panic!("expected EmptyCart validation error"),
        }

        let log = format!("{:?}", db.into_transaction_log());
        assert!(!log.contains("INSERT"));
    }

    #[tokio::test]
    async fn test_checkout_without_cart_is_rejected() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<carts::Model>::new()])
            .into_connection();

        let result = PaymentService::create_pending_checkout(
            &db,
            Uuid::new_v4(),
            "12 Main St".to_string(),
        )
        .await;

        match result {
            Err(ServiceError::Validation(message)) => {
                assert_eq!(message, "Account has no cart associated with it");
            }
            _ => panic!("expected NoCartAssociated validation error"),
        }
    }

    #[tokio::test]
    async fn test_checkout_totals_current_prices_and_creates_pending_transaction() {
        let buyer_id = Uuid::new_v4();
        let cart = cart_row(buyer_id);
        let first = product_row(Decimal::new(1000, 2)); // 10.00
        let second = product_row(Decimal::new(550, 2)); // 5.50

        let now = Utc::now();
        let items = vec![
            cart_products::Model {
                id: 1,
                cart_id: cart.id,
                product_id: first.id,
                created_at: now,
            },
            cart_products::Model {
                id: 2,
                cart_id: cart.id,
                product_id: second.id,
                created_at: now,
            },
        ];

        let order = orders::Model {
            id: Uuid::new_v4(),
            buyer_id,
            address: "12 Main St".to_string(),
            total_amount: Decimal::new(1550, 2),
            status: orders::STATUS_PENDING.to_string(),
            created_at: now,
            updated_at: now,
        };
        let order_product_rows = [
            order_products::Model {
                id: 1,
                order_id: order.id,
                product_id: first.id,
            },
            order_products::Model {
                id: 2,
                order_id: order.id,
                product_id: second.id,
            },
        ];
        let transaction = transaction_row("TRDW-abc123DEF0", transactions::STATUS_PENDING);

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![cart]])
            .append_query_results([items])
            .append_query_results([vec![first, second]])
            .append_query_results([vec![order]])
            .append_query_results([vec![order_product_rows[0].clone()]])
            .append_query_results([vec![order_product_rows[1].clone()]])
            .append_query_results([vec![transaction]])
            .append_exec_results([
                MockExecResult {
                    last_insert_id: 1,
                    rows_affected: 1,
                },
                MockExecResult {
                    last_insert_id: 1,
                    rows_affected: 1,
                },
                MockExecResult {
                    last_insert_id: 2,
                    rows_affected: 1,
                },
                MockExecResult {
                    last_insert_id: 1,
                    rows_affected: 1,
                },
            ])
            .into_connection();

        let outcome =
            PaymentService::create_pending_checkout(&db, buyer_id, "12 Main St".to_string())
                .await
                .unwrap();

        assert_eq!(outcome.transaction.status, transactions::STATUS_PENDING);

        // Le total 15.50 et la référence TRDW- doivent apparaître dans les
        // INSERT émis (les modèles retournés viennent du mock)
        let log = format!("{:?}", db.into_transaction_log());
        assert!(log.contains("15.50"));
        assert!(log.contains("TRDW-"));
        assert!(log.contains("pending"));
    }
}
