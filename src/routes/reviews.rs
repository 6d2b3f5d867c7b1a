use actix_web::{HttpResponse, delete, get, patch, post, web};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set, TransactionTrait,
};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::middleware::AuthUser;
use crate::models::{product_reviews, products};
use crate::routes::{error_response, pagination};
use crate::services::ServiceError;
use crate::services::moderation::TextClassifier;
use crate::services::review_service::ReviewService;
use crate::utils::policies;

#[derive(Deserialize, Validate)]
pub struct CreateReviewRequest {
    pub product_id: Uuid,
    #[validate(range(min = 1, max = 5))]
    pub rating: i16,
    #[validate(length(min = 1, max = 255))]
    pub comment: String,
}

#[derive(Deserialize, Validate)]
pub struct UpdateReviewRequest {
    #[validate(range(min = 1, max = 5))]
    pub rating: Option<i16>,
    #[validate(length(min = 1, max = 255))]
    pub comment: Option<String>,
}

#[derive(Deserialize)]
pub struct ReviewListQuery {
    pub product_id: Option<Uuid>,
    pub rating: Option<i16>,
    /// "newest" (défaut), "oldest" ou "rating"
    pub sort: Option<String>,
    pub page: Option<u64>,
    pub limit: Option<u64>,
}

/// GET /reviews - Lister les avis, filtrables par produit et note (PUBLIC)
#[get("")]
pub async fn list_reviews(
    query: web::Query<ReviewListQuery>,
    db: web::Data<DatabaseConnection>,
) -> HttpResponse {
    let (offset, limit) = pagination(query.page, query.limit);

    let mut select = product_reviews::Entity::find();
    if let Some(product_id) = query.product_id {
        select = select.filter(product_reviews::Column::ProductId.eq(product_id));
    }
    if let Some(rating) = query.rating {
        select = select.filter(product_reviews::Column::Rating.eq(rating));
    }

    select = match query.sort.as_deref().unwrap_or("newest") {
        "oldest" => select.order_by_asc(product_reviews::Column::CreatedAt),
        "rating" => select.order_by_desc(product_reviews::Column::Rating),
        _ => select.order_by_desc(product_reviews::Column::CreatedAt),
    };

    let total_reviews = match select.clone().count(db.get_ref()).await {
        Ok(count) => count,
        Err(e) => return error_response(&ServiceError::Db(e)),
    };

    match select.offset(offset).limit(limit).all(db.get_ref()).await {
        Ok(reviews) => HttpResponse::Ok().json(serde_json::json!({
            "total_reviews": total_reviews,
            "reviews": reviews,
        })),
        Err(e) => error_response(&ServiceError::Db(e)),
    }
}

/// POST /reviews - Noter un produit acheté (PROTÉGÉE)
/// Réservé aux commandes livrées; le commentaire passe par le
/// classificateur de texte, et l'agrégat average_rating est recalculé
#[post("")]
pub async fn create_review(
    auth_user: AuthUser,
    body: web::Json<CreateReviewRequest>,
    db: web::Data<DatabaseConnection>,
    classifier: web::Data<dyn TextClassifier>,
) -> HttpResponse {
    if let Err(errors) = body.validate() {
        return HttpResponse::BadRequest().json(errors);
    }

    // 1. Le produit doit exister
    match products::Entity::find_by_id(body.product_id).one(db.get_ref()).await {
        Ok(Some(_)) => {}
        Ok(None) => return error_response(&ServiceError::NotFound("Product not found".to_string())),
        Err(e) => return error_response(&ServiceError::Db(e)),
    }

    // 2. Seuls les acheteurs livrés peuvent noter
    match ReviewService::has_purchased(db.get_ref(), auth_user.account_id, body.product_id).await {
        Ok(true) => {}
        Ok(false) => {
            return error_response(&ServiceError::Validation(
                "You can only review products you have purchased".to_string(),
            ));
        }
        Err(e) => return error_response(&e),
    }

    // 3. Modération du commentaire à l'écriture
    let is_offensive = classifier.is_offensive(&body.comment);

    let txn = match db.begin().await {
        Ok(txn) => txn,
        Err(e) => return error_response(&ServiceError::Db(e)),
    };

    let now = Utc::now();
    let review = product_reviews::ActiveModel {
        product_id: Set(body.product_id),
        account_id: Set(auth_user.account_id),
        comment: Set(body.comment.clone()),
        rating: Set(body.rating),
        is_offensive: Set(is_offensive),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };

    let review = match review.insert(&txn).await {
        Ok(review) => review,
        Err(e) => return error_response(&ServiceError::Db(e)),
    };

    // 4. Recalcul explicite de l'agrégat
    if let Err(e) = ReviewService::recompute_average_rating(&txn, body.product_id).await {
        return error_response(&e);
    }

    if let Err(e) = txn.commit().await {
        return error_response(&ServiceError::Db(e));
    }

    HttpResponse::Created().json(review)
}

/// PATCH /reviews/{id} - Modifier son avis (auteur ou ADMIN)
/// L'agrégat n'est recalculé que si la note change
#[patch("/{id}")]
pub async fn update_review(
    auth_user: AuthUser,
    path: web::Path<i32>,
    body: web::Json<UpdateReviewRequest>,
    db: web::Data<DatabaseConnection>,
    classifier: web::Data<dyn TextClassifier>,
) -> HttpResponse {
    if let Err(errors) = body.validate() {
        return HttpResponse::BadRequest().json(errors);
    }

    let review = match product_reviews::Entity::find_by_id(path.into_inner())
        .one(db.get_ref())
        .await
    {
        Ok(Some(review)) => review,
        Ok(None) => return error_response(&ServiceError::NotFound("Review not found".to_string())),
        Err(e) => return error_response(&ServiceError::Db(e)),
    };

    if !policies::can_modify_review(auth_user.account_id, &auth_user.account_type, &review) {
        return error_response(&ServiceError::Authorization(
            "You can only modify your own reviews".to_string(),
        ));
    }

    let original_rating = review.rating;
    let product_id = review.product_id;

    let txn = match db.begin().await {
        Ok(txn) => txn,
        Err(e) => return error_response(&ServiceError::Db(e)),
    };

    let mut active: product_reviews::ActiveModel = review.into();
    if let Some(comment) = &body.comment {
        active.comment = Set(comment.clone());
        active.is_offensive = Set(classifier.is_offensive(comment));
    }
    if let Some(rating) = body.rating {
        active.rating = Set(rating);
    }
    active.updated_at = Set(Utc::now());

    let updated = match active.update(&txn).await {
        Ok(updated) => updated,
        Err(e) => return error_response(&ServiceError::Db(e)),
    };

    if updated.rating != original_rating {
        if let Err(e) = ReviewService::recompute_average_rating(&txn, product_id).await {
            return error_response(&e);
        }
    }

    if let Err(e) = txn.commit().await {
        return error_response(&ServiceError::Db(e));
    }

    HttpResponse::Ok().json(updated)
}

/// DELETE /reviews/{id} - Supprimer un avis (auteur ou ADMIN)
/// L'agrégat doit suivre l'ensemble des avis, suppression comprise
#[delete("/{id}")]
pub async fn delete_review(
    auth_user: AuthUser,
    path: web::Path<i32>,
    db: web::Data<DatabaseConnection>,
) -> HttpResponse {
    let review = match product_reviews::Entity::find_by_id(path.into_inner())
        .one(db.get_ref())
        .await
    {
        Ok(Some(review)) => review,
        Ok(None) => return error_response(&ServiceError::NotFound("Review not found".to_string())),
        Err(e) => return error_response(&ServiceError::Db(e)),
    };

    if !policies::can_modify_review(auth_user.account_id, &auth_user.account_type, &review) {
        return error_response(&ServiceError::Authorization(
            "You can only delete your own reviews".to_string(),
        ));
    }

    let product_id = review.product_id;

    let txn = match db.begin().await {
        Ok(txn) => txn,
        Err(e) => return error_response(&ServiceError::Db(e)),
    };

    if let Err(e) = product_reviews::Entity::delete_by_id(review.id).exec(&txn).await {
        return error_response(&ServiceError::Db(e));
    }

    if let Err(e) = ReviewService::recompute_average_rating(&txn, product_id).await {
        return error_response(&e);
    }

    if let Err(e) = txn.commit().await {
        return error_response(&ServiceError::Db(e));
    }

    HttpResponse::Ok().json(serde_json::json!({ "message": "Review deleted" }))
}

pub fn review_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/reviews")
            .service(list_reviews)
            .service(create_review)
            .service(update_review)
            .service(delete_review),
    );
}
