// ============================================================================
// MODÈLE : TRANSACTIONS
// ============================================================================
//
// Description:
//   Une tentative de paiement Paystack rattachée à une commande.
//
// Workflow:
//   1. Checkout: la transaction est créée en "pending" avec une référence
//      unique (TRDW-xxxxxxxxxx), dans la même transaction DB que la commande
//   2. Paystack rappelle POST /api/payment/webhook (event charge.success)
//   3. Backend passe le statut à "successful" et vide le panier du buyer
//
// Points d'attention:
//   - La référence est immuable une fois créée (partagée avec Paystack)
//   - Le statut n'avance que vers l'avant:
//       pending -> successful | failed
//       successful -> refunded
//     Réécrire le même statut est un no-op (les webhooks sont rejoués)
//
// ============================================================================

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

pub const STATUS_PENDING: &str = "pending";
pub const STATUS_FAILED: &str = "failed";
pub const STATUS_SUCCESSFUL: &str = "successful";
pub const STATUS_REFUNDED: &str = "refunded";

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "transactions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub order_id: Uuid,

    #[sea_orm(unique)]
    pub reference: String,

    /// "pending", "failed", "successful" ou "refunded"
    pub status: String,

    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::orders::Entity",
        from = "Column::OrderId",
        to = "super::orders::Column::Id"
    )]
    Order,
}

impl Related<super::orders::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Order.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// Indique si le passage de statut `from` -> `to` est autorisé.
/// Le même statut deux fois est accepté (rejeu de webhook).
pub fn can_transition(from: &str, to: &str) -> bool {
    if from == to {
        return true;
    }

    matches!(
        (from, to),
        (STATUS_PENDING, STATUS_SUCCESSFUL)
            | (STATUS_PENDING, STATUS_FAILED)
            | (STATUS_SUCCESSFUL, STATUS_REFUNDED)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forward_transitions_allowed() {
        assert!(can_transition(STATUS_PENDING, STATUS_SUCCESSFUL));
        assert!(can_transition(STATUS_PENDING, STATUS_FAILED));
        assert!(can_transition(STATUS_SUCCESSFUL, STATUS_REFUNDED));
    }

    #[test]
    fn test_same_status_is_idempotent() {
        assert!(can_transition(STATUS_SUCCESSFUL, STATUS_SUCCESSFUL));
        assert!(can_transition(STATUS_PENDING, STATUS_PENDING));
    }

    #[test]
    fn test_backward_and_skip_transitions_rejected() {
        assert!(!can_transition(STATUS_SUCCESSFUL, STATUS_PENDING));
        assert!(!can_transition(STATUS_FAILED, STATUS_SUCCESSFUL));
        assert!(!can_transition(STATUS_PENDING, STATUS_REFUNDED));
        assert!(!can_transition(STATUS_REFUNDED, STATUS_SUCCESSFUL));
        assert!(!can_transition(STATUS_FAILED, STATUS_REFUNDED));
    }
}
