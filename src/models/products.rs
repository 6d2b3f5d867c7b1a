use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Produit mis en vente par un seller.
///
/// initial_price est figé au prix courant lors de la création; seul
/// current_price bouge ensuite. average_rating est un agrégat mis en cache,
/// recalculé à chaque création/modification/suppression d'avis (la source
/// de vérité reste la table product_reviews).
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "products")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    #[sea_orm(unique)]
    pub name: String,

    pub description: String,

    pub size: String,

    pub color: String,

    /// URL de l'image principale
    pub image: String,

    pub initial_price: Decimal,

    pub current_price: Decimal,

    pub in_stock: bool,

    /// Un produit doit être approuvé par un admin avant d'être mis en avant.
    /// Toute modification par le seller repasse le produit en non approuvé.
    pub is_approved: bool,

    /// Moyenne des notes, arrondie à 2 décimales (agrégat en cache)
    pub average_rating: Decimal,

    pub seller_id: Uuid,

    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::accounts::Entity",
        from = "Column::SellerId",
        to = "super::accounts::Column::Id"
    )]
    Seller,

    #[sea_orm(has_many = "super::product_categories::Entity")]
    ProductCategory,

    #[sea_orm(has_many = "super::product_images::Entity")]
    ProductImage,

    #[sea_orm(has_many = "super::product_reviews::Entity")]
    ProductReview,

    #[sea_orm(has_many = "super::cart_products::Entity")]
    CartProduct,

    #[sea_orm(has_many = "super::order_products::Entity")]
    OrderProduct,
}

impl Related<super::accounts::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Seller.def()
    }
}

impl Related<super::product_categories::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ProductCategory.def()
    }
}

impl Related<super::product_images::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ProductImage.def()
    }
}

impl Related<super::product_reviews::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ProductReview.def()
    }
}

impl Related<super::cart_products::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::CartProduct.def()
    }
}

impl Related<super::order_products::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::OrderProduct.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
