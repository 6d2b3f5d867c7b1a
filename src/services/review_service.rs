// Logique des avis produits: contrôle d'achat, agrégat average_rating.
// L'agrégat est un cache: la source de vérité reste la table des avis,
// et le recalcul est déclenché explicitement par les routes après chaque
// mutation réussie (création, changement de note, suppression).

use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ColumnTrait, ConnectionTrait, EntityTrait, JoinType, PaginatorTrait, QueryFilter, QuerySelect,
    RelationTrait,
};
use uuid::Uuid;

use super::ServiceError;
use crate::models::{order_products, orders, product_reviews, products};

pub struct ReviewService;

impl ReviewService {
    /// Un buyer ne peut noter que les produits d'une commande livrée
    pub async fn has_purchased<C: ConnectionTrait>(
        db: &C,
        buyer_id: Uuid,
        product_id: Uuid,
    ) -> Result<bool, ServiceError> {
        let count = orders::Entity::find()
            .join(JoinType::InnerJoin, orders::Relation::OrderProduct.def())
            .filter(orders::Column::BuyerId.eq(buyer_id))
            .filter(orders::Column::Status.eq(orders::STATUS_DELIVERED))
            .filter(order_products::Column::ProductId.eq(product_id))
            .count(db)
            .await?;

        Ok(count > 0)
    }

    /// Moyenne des notes arrondie à 2 décimales, 0 sans aucun avis
    pub fn average(ratings: &[i16]) -> Decimal {
        if ratings.is_empty() {
            return Decimal::ZERO;
        }

        let sum: i64 = ratings.iter().map(|r| i64::from(*r)).sum();
        (Decimal::from(sum) / Decimal::from(ratings.len() as i64)).round_dp(2)
    }

    /// Recalcule et écrit l'agrégat average_rating du produit
    pub async fn recompute_average_rating<C: ConnectionTrait>(
        db: &C,
        product_id: Uuid,
    ) -> Result<Decimal, ServiceError> {
        let reviews = product_reviews::Entity::find()
            .filter(product_reviews::Column::ProductId.eq(product_id))
            .all(db)
            .await?;

        let ratings: Vec<i16> = reviews.iter().map(|r| r.rating).collect();
        let average = Self::average(&ratings);

        products::Entity::update_many()
            .col_expr(products::Column::AverageRating, Expr::value(average))
            .col_expr(products::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(products::Column::Id.eq(product_id))
            .exec(db)
            .await?;

        Ok(average)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};

    #[test]
    fn test_average_of_three_reviews() {
        assert_eq!(ReviewService::average(&[5, 3, 4]), Decimal::new(4, 0));
    }

    #[test]
    fn test_average_updates_with_fourth_review() {
        assert_eq!(ReviewService::average(&[5, 3, 4, 2]), Decimal::new(35, 1));
    }

    #[test]
    fn test_average_rounds_to_two_decimals() {
        assert_eq!(ReviewService::average(&[2, 3, 3]), Decimal::new(267, 2));
    }

    #[test]
    fn test_average_of_no_reviews_is_zero() {
        assert_eq!(ReviewService::average(&[]), Decimal::ZERO);
    }

    #[tokio::test]
    async fn test_recompute_writes_the_new_average() {
        let product_id = Uuid::new_v4();
        let now = Utc::now();
        let reviews: Vec<product_reviews::Model> = [5i16, 3, 4]
            .iter()
            .enumerate()
            .map(|(i, rating)| product_reviews::Model {
                id: i as i32 + 1,
                product_id,
                account_id: Uuid::new_v4(),
                comment: "ok".to_string(),
                rating: *rating,
                is_offensive: false,
                created_at: now,
                updated_at: now,
            })
            .collect();

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([reviews])
            .append_exec_results([MockExecResult {
                last_insert_id: 0,
                rows_affected: 1,
            }])
            .into_connection();

        let average = ReviewService::recompute_average_rating(&db, product_id)
            .await
            .unwrap();

        assert_eq!(average, Decimal::new(4, 0));
    }
}
