use actix_web::{HttpResponse, delete, get, patch, post, web};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, JoinType, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, RelationTrait, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::middleware::AuthUser;
use crate::models::{accounts, cart_products, categories, product_categories, product_images,
    product_reviews, products};
use crate::routes::{error_response, pagination};
use crate::services::ServiceError;
use crate::utils::policies;

const MAX_EXTRA_IMAGES: u64 = 3;

#[derive(Deserialize, Validate)]
pub struct CreateProductRequest {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    #[validate(length(min = 1, max = 255))]
    pub description: String,
    #[validate(length(min = 1, max = 50))]
    pub size: String,
    #[validate(length(min = 1, max = 50))]
    pub color: String,
    #[validate(url)]
    pub image: String,
    pub current_price: Decimal,
    #[serde(default)]
    pub categories: Vec<i32>,
}

#[derive(Deserialize, Validate)]
pub struct UpdateProductRequest {
    #[validate(length(min = 1, max = 255))]
    pub name: Option<String>,
    #[validate(length(min = 1, max = 255))]
    pub description: Option<String>,
    #[validate(length(min = 1, max = 50))]
    pub size: Option<String>,
    #[validate(length(min = 1, max = 50))]
    pub color: Option<String>,
    #[validate(url)]
    pub image: Option<String>,
    pub current_price: Option<Decimal>,
    pub in_stock: Option<bool>,
    pub categories: Option<Vec<i32>>,
}

#[derive(Deserialize, Validate)]
pub struct AddImageRequest {
    #[validate(url)]
    pub image: String,
}

#[derive(Deserialize)]
pub struct ProductListQuery {
    pub category_id: Option<i32>,
    pub seller_id: Option<Uuid>,
    pub in_stock: Option<bool>,
    pub search: Option<String>,
    pub page: Option<u64>,
    pub limit: Option<u64>,
}

#[derive(Serialize)]
struct SellerInfo {
    name: String,
    email: String,
    image: Option<String>,
}

#[derive(Serialize)]
struct ProductDetailResponse {
    #[serde(flatten)]
    product: products::Model,
    categories: Vec<categories::Model>,
    extra_images: Vec<product_images::Model>,
    seller: SellerInfo,
}

/// GET /products - Lister les produits avec filtres (PUBLIC)
#[get("")]
pub async fn list_products(
    query: web::Query<ProductListQuery>,
    db: web::Data<DatabaseConnection>,
) -> HttpResponse {
    let (offset, limit) = pagination(query.page, query.limit);

    let mut select = products::Entity::find().order_by_desc(products::Column::CreatedAt);

    if let Some(category_id) = query.category_id {
        select = select
            .join(JoinType::InnerJoin, products::Relation::ProductCategory.def())
            .filter(product_categories::Column::CategoryId.eq(category_id));
    }
    if let Some(seller_id) = query.seller_id {
        select = select.filter(products::Column::SellerId.eq(seller_id));
    }
    if let Some(in_stock) = query.in_stock {
        select = select.filter(products::Column::InStock.eq(in_stock));
    }
    if let Some(search) = query.search.as_deref() {
        select = select.filter(products::Column::Name.contains(search));
    }

    match select.offset(offset).limit(limit).all(db.get_ref()).await {
        Ok(products) => HttpResponse::Ok().json(products),
        Err(e) => error_response(&ServiceError::Db(e)),
    }
}

/// GET /products/{id} - Détail d'un produit avec catégories, images et
/// infos du seller (PUBLIC)
#[get("/{id}")]
pub async fn get_product(path: web::Path<Uuid>, db: web::Data<DatabaseConnection>) -> HttpResponse {
    let product = match products::Entity::find_by_id(path.into_inner())
        .one(db.get_ref())
        .await
    {
        Ok(Some(product)) => product,
        Ok(None) => return error_response(&ServiceError::NotFound("Product not found".to_string())),
        Err(e) => return error_response(&ServiceError::Db(e)),
    };

    let categories = match product_categories::Entity::find()
        .filter(product_categories::Column::ProductId.eq(product.id))
        .find_also_related(categories::Entity)
        .all(db.get_ref())
        .await
    {
        Ok(rows) => rows.into_iter().filter_map(|(_, category)| category).collect(),
        Err(e) => return error_response(&ServiceError::Db(e)),
    };

    let extra_images = match product_images::Entity::find()
        .filter(product_images::Column::ProductId.eq(product.id))
        .all(db.get_ref())
        .await
    {
        Ok(images) => images,
        Err(e) => return error_response(&ServiceError::Db(e)),
    };

    let seller = match accounts::Entity::find_by_id(product.seller_id)
        .one(db.get_ref())
        .await
    {
        Ok(Some(seller)) => SellerInfo {
            name: seller.name,
            email: seller.email,
            image: None,
        },
        Ok(None) => return error_response(&ServiceError::NotFound("Seller not found".to_string())),
        Err(e) => return error_response(&ServiceError::Db(e)),
    };

    HttpResponse::Ok().json(ProductDetailResponse {
        product,
        categories,
        extra_images,
        seller,
    })
}

/// POST /products - Mettre un produit en vente (SELLER)
/// initial_price est figé au prix courant, le produit attend l'approbation
/// d'un admin
#[post("")]
pub async fn create_product(
    auth_user: AuthUser,
    body: web::Json<CreateProductRequest>,
    db: web::Data<DatabaseConnection>,
) -> HttpResponse {
    if !policies::is_seller(&auth_user.account_type) {
        return error_response(&ServiceError::Authorization(
            "Only sellers can create products".to_string(),
        ));
    }

    if let Err(errors) = body.validate() {
        return HttpResponse::BadRequest().json(errors);
    }

    if body.current_price <= Decimal::ZERO {
        return error_response(&ServiceError::Validation(
            "Price must be greater than 0".to_string(),
        ));
    }

    // Le nom est unique
    match products::Entity::find()
        .filter(products::Column::Name.eq(&body.name))
        .one(db.get_ref())
        .await
    {
        Ok(Some(_)) => {
            return error_response(&ServiceError::Conflict(
                "Product name already exists".to_string(),
            ));
        }
        Ok(None) => {}
        Err(e) => return error_response(&ServiceError::Db(e)),
    }

    // Les catégories doivent toutes exister
    let category_rows = match categories::Entity::find()
        .filter(categories::Column::Id.is_in(body.categories.clone()))
        .all(db.get_ref())
        .await
    {
        Ok(rows) => rows,
        Err(e) => return error_response(&ServiceError::Db(e)),
    };
    if category_rows.len() != body.categories.len() {
        return error_response(&ServiceError::Validation("Unknown category".to_string()));
    }

    let txn = match db.begin().await {
        Ok(txn) => txn,
        Err(e) => return error_response(&ServiceError::Db(e)),
    };

    let now = Utc::now();
    let product = products::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(body.name.clone()),
        description: Set(body.description.clone()),
        size: Set(body.size.clone()),
        color: Set(body.color.clone()),
        image: Set(body.image.clone()),
        // Le prix initial est figé au prix courant à la création
        initial_price: Set(body.current_price),
        current_price: Set(body.current_price),
        in_stock: Set(true),
        is_approved: Set(false),
        average_rating: Set(Decimal::ZERO),
        seller_id: Set(auth_user.account_id),
        created_at: Set(now),
        updated_at: Set(now),
    };

    let product = match product.insert(&txn).await {
        Ok(product) => product,
        Err(e) => return error_response(&ServiceError::Db(e)),
    };

    for category_id in &body.categories {
        let link = product_categories::ActiveModel {
            product_id: Set(product.id),
            category_id: Set(*category_id),
            ..Default::default()
        };
        if let Err(e) = link.insert(&txn).await {
            return error_response(&ServiceError::Db(e));
        }
    }

    if let Err(e) = txn.commit().await {
        return error_response(&ServiceError::Db(e));
    }

    HttpResponse::Created().json(product)
}

/// PATCH /products/{id} - Modifier un produit (SELLER propriétaire ou ADMIN)
/// Toute modification repasse le produit en non approuvé
#[patch("/{id}")]
pub async fn update_product(
    auth_user: AuthUser,
    path: web::Path<Uuid>,
    body: web::Json<UpdateProductRequest>,
    db: web::Data<DatabaseConnection>,
) -> HttpResponse {
    if let Err(errors) = body.validate() {
        return HttpResponse::BadRequest().json(errors);
    }

    let product = match products::Entity::find_by_id(path.into_inner())
        .one(db.get_ref())
        .await
    {
        Ok(Some(product)) => product,
        Ok(None) => return error_response(&ServiceError::NotFound("Product not found".to_string())),
        Err(e) => return error_response(&ServiceError::Db(e)),
    };

    if !policies::can_modify_product(auth_user.account_id, &auth_user.account_type, &product) {
        return error_response(&ServiceError::Authorization(
            "You can only modify your own products".to_string(),
        ));
    }

    if let Some(price) = body.current_price {
        if price <= Decimal::ZERO {
            return error_response(&ServiceError::Validation(
                "Price must be greater than 0".to_string(),
            ));
        }
    }

    let txn = match db.begin().await {
        Ok(txn) => txn,
        Err(e) => return error_response(&ServiceError::Db(e)),
    };

    let product_id = product.id;
    let mut active: products::ActiveModel = product.into();
    if let Some(name) = &body.name {
        active.name = Set(name.clone());
    }
    if let Some(description) = &body.description {
        active.description = Set(description.clone());
    }
    if let Some(size) = &body.size {
        active.size = Set(size.clone());
    }
    if let Some(color) = &body.color {
        active.color = Set(color.clone());
    }
    if let Some(image) = &body.image {
        active.image = Set(image.clone());
    }
    if let Some(price) = body.current_price {
        active.current_price = Set(price);
    }
    if let Some(in_stock) = body.in_stock {
        active.in_stock = Set(in_stock);
    }
    // Une modification invalide l'approbation précédente
    active.is_approved = Set(false);
    active.updated_at = Set(Utc::now());

    let updated = match active.update(&txn).await {
        Ok(updated) => updated,
        Err(e) => return error_response(&ServiceError::Db(e)),
    };

    // Remplacer les liens de catégories si fournis
    if let Some(category_ids) = &body.categories {
        let category_rows = match categories::Entity::find()
            .filter(categories::Column::Id.is_in(category_ids.clone()))
            .all(&txn)
            .await
        {
            Ok(rows) => rows,
            Err(e) => return error_response(&ServiceError::Db(e)),
        };
        if category_rows.len() != category_ids.len() {
            return error_response(&ServiceError::Validation("Unknown category".to_string()));
        }

        if let Err(e) = product_categories::Entity::delete_many()
            .filter(product_categories::Column::ProductId.eq(product_id))
            .exec(&txn)
            .await
        {
            return error_response(&ServiceError::Db(e));
        }

        for category_id in category_ids {
            let link = product_categories::ActiveModel {
                product_id: Set(product_id),
                category_id: Set(*category_id),
                ..Default::default()
            };
            if let Err(e) = link.insert(&txn).await {
                return error_response(&ServiceError::Db(e));
            }
        }
    }

    if let Err(e) = txn.commit().await {
        return error_response(&ServiceError::Db(e));
    }

    HttpResponse::Ok().json(updated)
}

/// POST /products/{id}/approve - Approuver un produit (ADMIN)
#[post("/{id}/approve")]
pub async fn approve_product(
    auth_user: AuthUser,
    path: web::Path<Uuid>,
    db: web::Data<DatabaseConnection>,
) -> HttpResponse {
    if !policies::is_admin(&auth_user.account_type) {
        return error_response(&ServiceError::Authorization(
            "Only admins can approve products".to_string(),
        ));
    }

    let product = match products::Entity::find_by_id(path.into_inner())
        .one(db.get_ref())
        .await
    {
        Ok(Some(product)) => product,
        Ok(None) => return error_response(&ServiceError::NotFound("Product not found".to_string())),
        Err(e) => return error_response(&ServiceError::Db(e)),
    };

    let mut active: products::ActiveModel = product.into();
    active.is_approved = Set(true);
    active.updated_at = Set(Utc::now());

    match active.update(db.get_ref()).await {
        Ok(product) => HttpResponse::Ok().json(product),
        Err(e) => error_response(&ServiceError::Db(e)),
    }
}

/// DELETE /products/{id} - Retirer un produit (SELLER propriétaire ou ADMIN)
/// Le nettoyage des lignes liées (images, liens, avis, paniers) est fait
/// explicitement ici, dans l'ordre, jamais par effet de bord caché
#[delete("/{id}")]
pub async fn delete_product(
    auth_user: AuthUser,
    path: web::Path<Uuid>,
    db: web::Data<DatabaseConnection>,
) -> HttpResponse {
    let product = match products::Entity::find_by_id(path.into_inner())
        .one(db.get_ref())
        .await
    {
        Ok(Some(product)) => product,
        Ok(None) => return error_response(&ServiceError::NotFound("Product not found".to_string())),
        Err(e) => return error_response(&ServiceError::Db(e)),
    };

    if !policies::can_modify_product(auth_user.account_id, &auth_user.account_type, &product) {
        return error_response(&ServiceError::Authorization(
            "You can only delete your own products".to_string(),
        ));
    }

    let txn = match db.begin().await {
        Ok(txn) => txn,
        Err(e) => return error_response(&ServiceError::Db(e)),
    };

    if let Err(e) = product_images::Entity::delete_many()
        .filter(product_images::Column::ProductId.eq(product.id))
        .exec(&txn)
        .await
    {
        return error_response(&ServiceError::Db(e));
    }
    if let Err(e) = product_categories::Entity::delete_many()
        .filter(product_categories::Column::ProductId.eq(product.id))
        .exec(&txn)
        .await
    {
        return error_response(&ServiceError::Db(e));
    }
    if let Err(e) = product_reviews::Entity::delete_many()
        .filter(product_reviews::Column::ProductId.eq(product.id))
        .exec(&txn)
        .await
    {
        return error_response(&ServiceError::Db(e));
    }
    if let Err(e) = cart_products::Entity::delete_many()
        .filter(cart_products::Column::ProductId.eq(product.id))
        .exec(&txn)
        .await
    {
        return error_response(&ServiceError::Db(e));
    }

    if let Err(e) = products::Entity::delete_by_id(product.id).exec(&txn).await {
        return error_response(&ServiceError::Db(e));
    }

    if let Err(e) = txn.commit().await {
        return error_response(&ServiceError::Db(e));
    }

    HttpResponse::Ok().json(serde_json::json!({ "message": "Product deleted" }))
}

/// POST /products/{id}/images - Ajouter une image (SELLER propriétaire ou ADMIN)
#[post("/{id}/images")]
pub async fn add_product_image(
    auth_user: AuthUser,
    path: web::Path<Uuid>,
    body: web::Json<AddImageRequest>,
    db: web::Data<DatabaseConnection>,
) -> HttpResponse {
    if let Err(errors) = body.validate() {
        return HttpResponse::BadRequest().json(errors);
    }

    let product = match products::Entity::find_by_id(path.into_inner())
        .one(db.get_ref())
        .await
    {
        Ok(Some(product)) => product,
        Ok(None) => return error_response(&ServiceError::NotFound("Product not found".to_string())),
        Err(e) => return error_response(&ServiceError::Db(e)),
    };

    if !policies::can_modify_product(auth_user.account_id, &auth_user.account_type, &product) {
        return error_response(&ServiceError::Authorization(
            "You can only modify your own products".to_string(),
        ));
    }

    let image_count = match product_images::Entity::find()
        .filter(product_images::Column::ProductId.eq(product.id))
        .count(db.get_ref())
        .await
    {
        Ok(count) => count,
        Err(e) => return error_response(&ServiceError::Db(e)),
    };

    if image_count >= MAX_EXTRA_IMAGES {
        return error_response(&ServiceError::Validation(
            "You can only upload 3 images per product".to_string(),
        ));
    }

    let image = product_images::ActiveModel {
        product_id: Set(product.id),
        image: Set(body.image.clone()),
        created_at: Set(Utc::now()),
        ..Default::default()
    };

    match image.insert(db.get_ref()).await {
        Ok(image) => HttpResponse::Created().json(image),
        Err(e) => error_response(&ServiceError::Db(e)),
    }
}

/// DELETE /products/{id}/images/{image_id} - Supprimer une image
/// (SELLER propriétaire ou ADMIN)
#[delete("/{id}/images/{image_id}")]
pub async fn delete_product_image(
    auth_user: AuthUser,
    path: web::Path<(Uuid, i32)>,
    db: web::Data<DatabaseConnection>,
) -> HttpResponse {
    let (product_id, image_id) = path.into_inner();

    let product = match products::Entity::find_by_id(product_id).one(db.get_ref()).await {
        Ok(Some(product)) => product,
        Ok(None) => return error_response(&ServiceError::NotFound("Product not found".to_string())),
        Err(e) => return error_response(&ServiceError::Db(e)),
    };

    if !policies::can_modify_product(auth_user.account_id, &auth_user.account_type, &product) {
        return error_response(&ServiceError::Authorization(
            "You can only modify your own products".to_string(),
        ));
    }

    let image = match product_images::Entity::find_by_id(image_id).one(db.get_ref()).await {
        Ok(Some(image)) if image.product_id == product.id => image,
        Ok(_) => return error_response(&ServiceError::NotFound("Image not found".to_string())),
        Err(e) => return error_response(&ServiceError::Db(e)),
    };

    match product_images::Entity::delete_by_id(image.id).exec(db.get_ref()).await {
        Ok(_) => HttpResponse::Ok().json(serde_json::json!({ "message": "Image deleted" })),
        Err(e) => error_response(&ServiceError::Db(e)),
    }
}

pub fn product_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/products")
            .service(list_products)
            .service(create_product)
            .service(get_product)
            .service(update_product)
            .service(approve_product)
            .service(delete_product)
            .service(add_product_image)
            .service(delete_product_image),
    );
}
