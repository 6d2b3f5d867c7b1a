// ============================================================================
// SERVICE : OTP
// ============================================================================
//
// Description:
//   Génération et vérification des codes OTP à 4 chiffres envoyés par email
//   (vérification de compte et reset de mot de passe).
//
// Points d'attention:
//   - generate() invalide d'abord tous les codes encore valides du compte,
//     puis insère le nouveau: l'appelant DOIT fournir une transaction DB
//     ouverte pour que les deux étapes restent un seul bloc atomique
//     (sinon deux generate concurrents laissent deux codes valides)
//   - verify() est scopé compte + code: un code à 4 chiffres n'est unique
//     que par compte, jamais globalement
//   - thread_rng() est un CSPRNG, suffisant pour des codes courts à usage
//     unique
//
// ============================================================================

use chrono::{Duration, Utc};
use rand::Rng;
use sea_orm::sea_query::Expr;
use sea_orm::{ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, Set};
use uuid::Uuid;

use super::ServiceError;
use crate::models::otps;

pub const OTP_LENGTH: usize = 4;
pub const DEFAULT_EXPIRY_MINUTES: i64 = 10;

pub struct OtpService;

impl OtpService {
    /// Tire un code à 4 chiffres, chaque chiffre uniforme sur 0-9
    pub fn random_code() -> String {
        let mut rng = rand::thread_rng();
        (0..OTP_LENGTH)
            .map(|_| char::from(b'0' + rng.gen_range(0..=9u8)))
            .collect()
    }

    /// Génère un nouveau OTP pour le compte.
    ///
    /// Invalide (is_used = true) tous les codes encore valides du compte
    /// avant d'insérer le nouveau. À appeler avec la transaction DB de
    /// l'appelant pour garder l'invariant "au plus un code valide".
    pub async fn generate<C: ConnectionTrait>(
        db: &C,
        account_id: Uuid,
        expiry_minutes: i64,
    ) -> Result<otps::Model, ServiceError> {
        let now = Utc::now();

        // 1. Invalider les OTP non utilisés et non expirés de ce compte
        otps::Entity::update_many()
            .col_expr(otps::Column::IsUsed, Expr::value(true))
            .col_expr(otps::Column::UpdatedAt, Expr::value(now))
            .filter(otps::Column::AccountId.eq(account_id))
            .filter(otps::Column::IsUsed.eq(false))
            .filter(otps::Column::ExpiresAt.gt(now))
            .exec(db)
            .await?;

        // 2. Créer le nouveau code
        let otp = otps::ActiveModel {
            account_id: Set(account_id),
            code: Set(Self::random_code()),
            expires_at: Set(now + Duration::minutes(expiry_minutes)),
            is_used: Set(false),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };

        let otp = otp.insert(db).await?;

        Ok(otp)
    }

    /// Vérifie un OTP pour un compte et le marque utilisé si valide.
    ///
    /// Un deuxième verify avec le même code échoue (usage unique).
    pub async fn verify<C: ConnectionTrait>(
        db: &C,
        account_id: Uuid,
        code: &str,
    ) -> Result<otps::Model, ServiceError> {
        let now = Utc::now();

        let otp = otps::Entity::find()
            .filter(otps::Column::AccountId.eq(account_id))
            .filter(otps::Column::Code.eq(code))
            .filter(otps::Column::IsUsed.eq(false))
            .filter(otps::Column::ExpiresAt.gt(now))
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::Validation("Invalid OTP".to_string()))?;

        let mut active: otps::ActiveModel = otp.into();
        active.is_used = Set(true);
        active.updated_at = Set(now);
        let otp = active.update(db).await?;

        Ok(otp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult, TransactionTrait};

    fn otp_row(account_id: Uuid, code: &str, is_used: bool) -> otps::Model {
        let now = Utc::now();
        otps::Model {
            id: 1,
            account_id,
            code: code.to_string(),
            expires_at: now + Duration::minutes(10),
            is_used,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_random_code_is_four_digits() {
        for _ in 0..100 {
            let code = OtpService::random_code();
            assert_eq!(code.len(), OTP_LENGTH);
            assert!(code.chars().all(|c| c.is_ascii_digit()));
        }
    }

    #[tokio::test]
    async fn test_generate_invalidates_previous_codes_before_insert() {
        let account_id = Uuid::new_v4();
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_exec_results([MockExecResult {
                last_insert_id: 0,
                rows_affected: 1,
            }])
            .append_query_results([vec![otp_row(account_id, "4821", false)]])
            .into_connection();

        let txn = db.begin().await.unwrap();
        let otp = OtpService::generate(&txn, account_id, DEFAULT_EXPIRY_MINUTES)
            .await
            .unwrap();
        txn.commit().await.unwrap();

        assert!(!otp.is_used);

        // L'UPDATE d'invalidation doit précéder l'INSERT du nouveau code
        let log = format!("{:?}", db.into_transaction_log());
        let update_pos = log.find("UPDATE").expect("no invalidation UPDATE issued");
        let insert_pos = log.find("INSERT").expect("no INSERT issued");
        assert!(update_pos < insert_pos);
        assert!(log.contains("is_used"));
    }

    #[tokio::test]
    async fn test_verify_marks_otp_used() {
        let account_id = Uuid::new_v4();
        let found = otp_row(account_id, "4821", false);
        let mut updated = found.clone();
        updated.is_used = true;

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![found], vec![updated]])
            .append_exec_results([MockExecResult {
                last_insert_id: 0,
                rows_affected: 1,
            }])
            .into_connection();

        let otp = OtpService::verify(&db, account_id, "4821").await.unwrap();
        assert!(otp.is_used);
    }

    #[tokio::test]
    async fn test_verify_with_no_matching_code_fails() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<otps::Model>::new()])
            .into_connection();

        let result = OtpService::verify(&db, Uuid::new_v4(), "0000").await;
        match result {
            Err(ServiceError::Validation(message)) => assert_eq!(message, "Invalid OTP"),
            _ => panic!("expected Validation error"),
        }
    }
}
