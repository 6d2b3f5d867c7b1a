// Fonctions de policy par action. Arguments explicites (id + type de
// compte + objet), aucune dépendance au framework web: chaque route les
// appelle après avoir chargé l'objet concerné.

use uuid::Uuid;

use crate::models::{orders, product_reviews, products};

pub fn is_admin(account_type: &str) -> bool {
    account_type == "ADMIN"
}

pub fn is_seller(account_type: &str) -> bool {
    account_type == "SELLER"
}

/// Seul le seller propriétaire ou un admin peut modifier/supprimer un produit
pub fn can_modify_product(account_id: Uuid, account_type: &str, product: &products::Model) -> bool {
    product.seller_id == account_id || is_admin(account_type)
}

/// Seul l'auteur ou un admin peut modifier/supprimer un avis
pub fn can_modify_review(
    account_id: Uuid,
    account_type: &str,
    review: &product_reviews::Model,
) -> bool {
    review.account_id == account_id || is_admin(account_type)
}

/// Une commande n'est visible que par son buyer ou un admin
pub fn can_view_order(account_id: Uuid, account_type: &str, order: &orders::Model) -> bool {
    order.buyer_id == account_id || is_admin(account_type)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal::Decimal;

    fn product(seller_id: Uuid) -> products::Model {
        let now = Utc::now();
        products::Model {
            id: Uuid::new_v4(),
            name: "Chair".to_string(),
            description: "A chair".to_string(),
            size: "M".to_string(),
            color: "red".to_string(),
            image: String::new(),
            initial_price: Decimal::new(1000, 2),
            current_price: Decimal::new(1000, 2),
            in_stock: true,
            is_approved: true,
            average_rating: Decimal::ZERO,
            seller_id,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_owner_can_modify_product() {
        let seller = Uuid::new_v4();
        assert!(can_modify_product(seller, "SELLER", &product(seller)));
    }

    #[test]
    fn test_admin_can_modify_any_product() {
        assert!(can_modify_product(Uuid::new_v4(), "ADMIN", &product(Uuid::new_v4())));
    }

    #[test]
    fn test_other_seller_cannot_modify_product() {
        assert!(!can_modify_product(Uuid::new_v4(), "SELLER", &product(Uuid::new_v4())));
        assert!(!can_modify_product(Uuid::new_v4(), "BUYER", &product(Uuid::new_v4())));
    }
}
