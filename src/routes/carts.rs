use actix_web::{HttpResponse, delete, get, post, web};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::middleware::AuthUser;
use crate::models::{cart_products, carts, products};
use crate::routes::error_response;
use crate::services::ServiceError;

#[derive(Deserialize)]
pub struct AddCartProductRequest {
    pub product_id: Uuid,
}

/// Retrouve le panier du compte, en le créant au premier accès
/// (un seul panier par compte, jamais supprimé)
async fn get_or_create_cart(
    db: &DatabaseConnection,
    account_id: Uuid,
) -> Result<carts::Model, ServiceError> {
    if let Some(cart) = carts::Entity::find()
        .filter(carts::Column::AccountId.eq(account_id))
        .one(db)
        .await?
    {
        return Ok(cart);
    }

    let now = Utc::now();
    let cart = carts::ActiveModel {
        id: Set(Uuid::new_v4()),
        account_id: Set(account_id),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(db)
    .await?;

    Ok(cart)
}

/// GET /cart - Contenu du panier du compte (PROTÉGÉE)
#[get("")]
pub async fn get_cart(auth_user: AuthUser, db: web::Data<DatabaseConnection>) -> HttpResponse {
    let cart = match get_or_create_cart(db.get_ref(), auth_user.account_id).await {
        Ok(cart) => cart,
        Err(e) => return error_response(&e),
    };

    let items = match cart_products::Entity::find()
        .filter(cart_products::Column::CartId.eq(cart.id))
        .find_also_related(products::Entity)
        .all(db.get_ref())
        .await
    {
        Ok(rows) => rows,
        Err(e) => return error_response(&ServiceError::Db(e)),
    };

    let products: Vec<products::Model> =
        items.into_iter().filter_map(|(_, product)| product).collect();

    HttpResponse::Ok().json(serde_json::json!({
        "id": cart.id,
        "products": products,
    }))
}

/// POST /cart/products - Ajouter un produit au panier (PROTÉGÉE)
#[post("/products")]
pub async fn add_cart_product(
    auth_user: AuthUser,
    body: web::Json<AddCartProductRequest>,
    db: web::Data<DatabaseConnection>,
) -> HttpResponse {
    // 1. Le produit doit exister et être en stock
    let product = match products::Entity::find_by_id(body.product_id).one(db.get_ref()).await {
        Ok(Some(product)) => product,
        Ok(None) => return error_response(&ServiceError::NotFound("Product not found".to_string())),
        Err(e) => return error_response(&ServiceError::Db(e)),
    };

    if !product.in_stock {
        return error_response(&ServiceError::Validation(
            "Product is out of stock".to_string(),
        ));
    }

    let cart = match get_or_create_cart(db.get_ref(), auth_user.account_id).await {
        Ok(cart) => cart,
        Err(e) => return error_response(&e),
    };

    // 2. Un produit n'apparaît qu'une fois dans un panier
    match cart_products::Entity::find()
        .filter(cart_products::Column::CartId.eq(cart.id))
        .filter(cart_products::Column::ProductId.eq(product.id))
        .one(db.get_ref())
        .await
    {
        Ok(Some(_)) => {
            return error_response(&ServiceError::Conflict(
                "Product already in cart".to_string(),
            ));
        }
        Ok(None) => {}
        Err(e) => return error_response(&ServiceError::Db(e)),
    }

    let item = cart_products::ActiveModel {
        cart_id: Set(cart.id),
        product_id: Set(product.id),
        created_at: Set(Utc::now()),
        ..Default::default()
    };

    match item.insert(db.get_ref()).await {
        Ok(_) => HttpResponse::Created().json(serde_json::json!({
            "message": "Product added to cart"
        })),
        Err(e) => error_response(&ServiceError::Db(e)),
    }
}

/// DELETE /cart/products/{product_id} - Retirer un produit du panier (PROTÉGÉE)
#[delete("/products/{product_id}")]
pub async fn remove_cart_product(
    auth_user: AuthUser,
    path: web::Path<Uuid>,
    db: web::Data<DatabaseConnection>,
) -> HttpResponse {
    let product_id = path.into_inner();

    let cart = match carts::Entity::find()
        .filter(carts::Column::AccountId.eq(auth_user.account_id))
        .one(db.get_ref())
        .await
    {
        Ok(Some(cart)) => cart,
        Ok(None) => {
            return error_response(&ServiceError::NotFound(
                "Account has no cart associated with it".to_string(),
            ));
        }
        Err(e) => return error_response(&ServiceError::Db(e)),
    };

    let item = match cart_products::Entity::find()
        .filter(cart_products::Column::CartId.eq(cart.id))
        .filter(cart_products::Column::ProductId.eq(product_id))
        .one(db.get_ref())
        .await
    {
        Ok(Some(item)) => item,
        Ok(None) => {
            return error_response(&ServiceError::NotFound(
                "Product not in cart".to_string(),
            ));
        }
        Err(e) => return error_response(&ServiceError::Db(e)),
    };

    match cart_products::Entity::delete_by_id(item.id).exec(db.get_ref()).await {
        Ok(_) => HttpResponse::Ok().json(serde_json::json!({
            "message": "Product removed from cart"
        })),
        Err(e) => error_response(&ServiceError::Db(e)),
    }
}

pub fn cart_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/cart")
            .service(get_cart)
            .service(add_cart_product)
            .service(remove_cart_product),
    );
}
