use actix_web::{HttpResponse, delete, get, patch, post, web};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, ModelTrait, QueryFilter,
    QueryOrder, QuerySelect, Set,
};
use serde::Deserialize;
use validator::Validate;

use crate::middleware::AuthUser;
use crate::models::categories;
use crate::routes::{error_response, pagination};
use crate::services::ServiceError;
use crate::utils::policies;

#[derive(Deserialize, Validate)]
pub struct CreateCategoryRequest {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    #[validate(length(min = 1, max = 255))]
    pub description: String,
    #[validate(url)]
    pub image: String,
}

#[derive(Deserialize, Validate)]
pub struct UpdateCategoryRequest {
    #[validate(length(min = 1, max = 255))]
    pub name: Option<String>,
    #[validate(length(min = 1, max = 255))]
    pub description: Option<String>,
    #[validate(url)]
    pub image: Option<String>,
}

#[derive(Deserialize)]
pub struct CategoryListQuery {
    pub search: Option<String>,
    pub page: Option<u64>,
    pub limit: Option<u64>,
}

/// GET /categories - Lister les catégories (PUBLIC)
#[get("")]
pub async fn list_categories(
    query: web::Query<CategoryListQuery>,
    db: web::Data<DatabaseConnection>,
) -> HttpResponse {
    let (offset, limit) = pagination(query.page, query.limit);

    let mut select = categories::Entity::find().order_by_desc(categories::Column::CreatedAt);
    if let Some(search) = query.search.as_deref() {
        select = select.filter(categories::Column::Name.contains(search));
    }

    match select.offset(offset).limit(limit).all(db.get_ref()).await {
        Ok(categories) => HttpResponse::Ok().json(categories),
        Err(e) => error_response(&ServiceError::Db(e)),
    }
}

/// GET /categories/{id} - Détail d'une catégorie (PUBLIC)
#[get("/{id}")]
pub async fn get_category(path: web::Path<i32>, db: web::Data<DatabaseConnection>) -> HttpResponse {
    match categories::Entity::find_by_id(path.into_inner()).one(db.get_ref()).await {
        Ok(Some(category)) => HttpResponse::Ok().json(category),
        Ok(None) => error_response(&ServiceError::NotFound("Category not found".to_string())),
        Err(e) => error_response(&ServiceError::Db(e)),
    }
}

/// POST /categories - Créer une catégorie (ADMIN)
#[post("")]
pub async fn create_category(
    auth_user: AuthUser,
    body: web::Json<CreateCategoryRequest>,
    db: web::Data<DatabaseConnection>,
) -> HttpResponse {
    if !policies::is_admin(&auth_user.account_type) {
        return error_response(&ServiceError::Authorization(
            "Only admins can manage categories".to_string(),
        ));
    }

    if let Err(errors) = body.validate() {
        return HttpResponse::BadRequest().json(errors);
    }

    // Le nom est unique
    match categories::Entity::find()
        .filter(categories::Column::Name.eq(&body.name))
        .one(db.get_ref())
        .await
    {
        Ok(Some(_)) => {
            return error_response(&ServiceError::Conflict(
                "Category name already exists".to_string(),
            ));
        }
        Ok(None) => {}
        Err(e) => return error_response(&ServiceError::Db(e)),
    }

    let now = Utc::now();
    let category = categories::ActiveModel {
        name: Set(body.name.clone()),
        description: Set(body.description.clone()),
        image: Set(body.image.clone()),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };

    match category.insert(db.get_ref()).await {
        Ok(category) => HttpResponse::Created().json(category),
        Err(e) => error_response(&ServiceError::Db(e)),
    }
}

/// PATCH /categories/{id} - Modifier une catégorie (ADMIN)
#[patch("/{id}")]
pub async fn update_category(
    auth_user: AuthUser,
    path: web::Path<i32>,
    body: web::Json<UpdateCategoryRequest>,
    db: web::Data<DatabaseConnection>,
) -> HttpResponse {
    if !policies::is_admin(&auth_user.account_type) {
        return error_response(&ServiceError::Authorization(
            "Only admins can manage categories".to_string(),
        ));
    }

    if let Err(errors) = body.validate() {
        return HttpResponse::BadRequest().json(errors);
    }

    let category = match categories::Entity::find_by_id(path.into_inner())
        .one(db.get_ref())
        .await
    {
        Ok(Some(category)) => category,
        Ok(None) => {
            return error_response(&ServiceError::NotFound("Category not found".to_string()));
        }
        Err(e) => return error_response(&ServiceError::Db(e)),
    };

    let mut active: categories::ActiveModel = category.into();
    if let Some(name) = &body.name {
        active.name = Set(name.clone());
    }
    if let Some(description) = &body.description {
        active.description = Set(description.clone());
    }
    if let Some(image) = &body.image {
        active.image = Set(image.clone());
    }
    active.updated_at = Set(Utc::now());

    match active.update(db.get_ref()).await {
        Ok(category) => HttpResponse::Ok().json(category),
        Err(e) => error_response(&ServiceError::Db(e)),
    }
}

/// DELETE /categories/{id} - Supprimer une catégorie (ADMIN)
#[delete("/{id}")]
pub async fn delete_category(
    auth_user: AuthUser,
    path: web::Path<i32>,
    db: web::Data<DatabaseConnection>,
) -> HttpResponse {
    if !policies::is_admin(&auth_user.account_type) {
        return error_response(&ServiceError::Authorization(
            "Only admins can manage categories".to_string(),
        ));
    }

    let category = match categories::Entity::find_by_id(path.into_inner())
        .one(db.get_ref())
        .await
    {
        Ok(Some(category)) => category,
        Ok(None) => {
            return error_response(&ServiceError::NotFound("Category not found".to_string()));
        }
        Err(e) => return error_response(&ServiceError::Db(e)),
    };

    match category.delete(db.get_ref()).await {
        Ok(_) => HttpResponse::Ok().json(serde_json::json!({ "message": "Category deleted" })),
        Err(e) => error_response(&ServiceError::Db(e)),
    }
}

pub fn category_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/categories")
            .service(list_categories)
            .service(create_category)
            .service(get_category)
            .service(update_category)
            .service(delete_category),
    );
}
