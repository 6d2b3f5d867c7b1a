use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Statuts possibles d'une commande
pub const STATUS_PENDING: &str = "pending";
pub const STATUS_DELIVERED: &str = "delivered";
pub const STATUS_CANCELLED: &str = "cancelled";

pub const ORDER_STATUSES: [&str; 3] = [STATUS_PENDING, STATUS_DELIVERED, STATUS_CANCELLED];

/// Commande créée au checkout. total_amount fige la somme des prix
/// courants des produits du panier à l'instant du checkout: il n'est
/// jamais re-dérivé ensuite.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "orders")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub buyer_id: Uuid,

    pub address: String,

    pub total_amount: Decimal,

    /// "pending", "delivered" ou "cancelled"
    pub status: String,

    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::accounts::Entity",
        from = "Column::BuyerId",
        to = "super::accounts::Column::Id"
    )]
    Buyer,

    #[sea_orm(has_many = "super::order_products::Entity")]
    OrderProduct,

    #[sea_orm(has_many = "super::transactions::Entity")]
    Transaction,
}

impl Related<super::accounts::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Buyer.def()
    }
}

impl Related<super::order_products::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::OrderProduct.def()
    }
}

impl Related<super::transactions::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Transaction.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
