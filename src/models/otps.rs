// ============================================================================
// MODÈLE : OTPS
// ============================================================================
//
// Description:
//   Codes OTP à 4 chiffres envoyés par email pour la vérification de compte
//   et le reset de mot de passe.
//
// Colonnes de la table otps:
//   - id (INTEGER, PRIMARY KEY, SERIAL)
//   - account_id (UUID, NOT NULL, FK vers accounts)
//   - code (VARCHAR(4), NOT NULL) - 4 chiffres tirés d'un CSPRNG
//   - expires_at (TIMESTAMPTZ, NOT NULL) - created_at + 10 minutes
//   - is_used (BOOLEAN, DEFAULT FALSE, NOT NULL)
//   - created_at / updated_at (TIMESTAMPTZ)
//
// Workflow:
//   1. User s'inscrit via POST /api/auth/signup (ou demande un reset)
//   2. Backend invalide tous les OTP encore valides du compte
//   3. Backend génère un nouveau code à 4 chiffres et l'insère
//      (les deux étapes dans UNE SEULE transaction DB)
//   4. Backend envoie le code par email
//   5. User renvoie le code via POST /api/auth/verify-otp
//   6. Backend vérifie: code du compte, not expired, not used
//   7. Backend met is_used = true (un code ne sert qu'une fois)
//
// Points d'attention:
//   - Au plus UN code valide par compte à tout instant (invariant garanti
//     par l'invalidation à la génération, pas par une contrainte unique)
//   - Les codes ne sont jamais supprimés physiquement (audit trail)
//   - ON DELETE CASCADE: si le compte est supprimé, ses OTP aussi
//
// ============================================================================

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "otps")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub account_id: Uuid,

    pub code: String,

    pub expires_at: DateTimeUtc,

    pub is_used: bool,

    pub created_at: DateTimeUtc,

    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::accounts::Entity",
        from = "Column::AccountId",
        to = "super::accounts::Column::Id"
    )]
    Account,
}

impl Related<super::accounts::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Account.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Un OTP est valide s'il n'a pas servi et n'a pas expiré
    pub fn is_valid(&self, now: DateTimeUtc) -> bool {
        !self.is_used && self.expires_at > now
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn otp(is_used: bool, expires_in: Duration) -> Model {
        let now = Utc::now();
        Model {
            id: 1,
            account_id: Uuid::new_v4(),
            code: "1234".to_string(),
            expires_at: now + expires_in,
            is_used,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_unused_unexpired_otp_is_valid() {
        let otp = otp(false, Duration::minutes(10));
        assert!(otp.is_valid(Utc::now()));
    }

    #[test]
    fn test_used_otp_is_invalid() {
        let otp = otp(true, Duration::minutes(10));
        assert!(!otp.is_valid(Utc::now()));
    }

    #[test]
    fn test_expired_otp_is_invalid() {
        let otp = otp(false, Duration::minutes(-1));
        assert!(!otp.is_valid(Utc::now()));
    }
}
