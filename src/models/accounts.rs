use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Types de comptes autorisés sur la plateforme
pub const ACCOUNT_TYPES: [&str; 3] = ["ADMIN", "SELLER", "BUYER"];

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "accounts")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub name: String,

    #[sea_orm(unique)]
    pub email: String,

    /// "ADMIN", "SELLER" ou "BUYER"
    pub account_type: String,

    /// Format: pbkdf2_sha256$iterations$salt$hash (vide pour les comptes Google)
    #[serde(skip_serializing)]
    pub password_hash: String,

    pub email_verified: bool,

    /// "email" ou "google"
    pub auth_type: String,

    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::otps::Entity")]
    Otp,

    #[sea_orm(has_many = "super::revoked_tokens::Entity")]
    RevokedToken,

    #[sea_orm(has_one = "super::carts::Entity")]
    Cart,

    #[sea_orm(has_many = "super::products::Entity")]
    Product,

    #[sea_orm(has_many = "super::product_reviews::Entity")]
    ProductReview,

    #[sea_orm(has_many = "super::orders::Entity")]
    Order,
}

impl Related<super::otps::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Otp.def()
    }
}

impl Related<super::revoked_tokens::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::RevokedToken.def()
    }
}

impl Related<super::carts::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Cart.def()
    }
}

impl Related<super::products::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Product.def()
    }
}

impl Related<super::product_reviews::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ProductReview.def()
    }
}

impl Related<super::orders::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Order.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
