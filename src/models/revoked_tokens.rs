// ============================================================================
// MODÈLE : REVOKED TOKENS
// ============================================================================
//
// Description:
//   Blacklist des refresh tokens révoqués au logout. Un refresh token est
//   utilisable tant que son jti n'apparaît pas ici et qu'il n'a pas expiré.
//
// Workflow:
//   1. User se déconnecte via POST /api/auth/logout avec son refresh token
//   2. Backend vérifie le token et insère son jti dans cette table
//   3. Tout appel ultérieur à /api/auth/refresh-token avec ce jti est rejeté
//
// Points d'attention:
//   - jti est UNIQUE: révoquer deux fois le même token est une erreur 400
//   - expires_at reprend l'expiration du token: les lignes périmées
//     deviennent inoffensives d'elles-mêmes
//
// ============================================================================

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "revoked_tokens")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    #[sea_orm(unique)]
    pub jti: Uuid,

    pub account_id: Uuid,

    pub expires_at: DateTimeUtc,

    pub created_at: DateTimeUtc,
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
