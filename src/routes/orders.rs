use actix_web::{HttpResponse, get, patch, web};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::middleware::AuthUser;
use crate::models::{order_products, orders, products, transactions};
use crate::routes::{error_response, pagination};
use crate::services::ServiceError;
use crate::utils::policies;

#[derive(Deserialize)]
pub struct OrderListQuery {
    pub status: Option<String>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub min_amount: Option<Decimal>,
    pub max_amount: Option<Decimal>,
    pub page: Option<u64>,
    pub limit: Option<u64>,
}

#[derive(Deserialize)]
pub struct UpdateOrderStatusRequest {
    pub status: String,
}

/// GET /orders - Lister ses commandes, toutes pour un ADMIN (PROTÉGÉE)
#[get("")]
pub async fn list_orders(
    auth_user: AuthUser,
    query: web::Query<OrderListQuery>,
    db: web::Data<DatabaseConnection>,
) -> HttpResponse {
    if let Some(status) = query.status.as_deref() {
        if !orders::ORDER_STATUSES.contains(&status) {
            return error_response(&ServiceError::Validation(
                "Invalid status. Must be one of: pending, delivered, cancelled".to_string(),
            ));
        }
    }

    let (offset, limit) = pagination(query.page, query.limit);

    let mut select = orders::Entity::find().order_by_desc(orders::Column::CreatedAt);

    // Un buyer ne voit que ses commandes
    if !policies::is_admin(&auth_user.account_type) {
        select = select.filter(orders::Column::BuyerId.eq(auth_user.account_id));
    }
    if let Some(status) = query.status.as_deref() {
        select = select.filter(orders::Column::Status.eq(status));
    }
    if let Some(start_date) = query.start_date {
        select = select.filter(orders::Column::CreatedAt.gte(start_date));
    }
    if let Some(end_date) = query.end_date {
        select = select.filter(orders::Column::CreatedAt.lte(end_date));
    }
    if let Some(min_amount) = query.min_amount {
        select = select.filter(orders::Column::TotalAmount.gte(min_amount));
    }
    if let Some(max_amount) = query.max_amount {
        select = select.filter(orders::Column::TotalAmount.lte(max_amount));
    }

    match select.offset(offset).limit(limit).all(db.get_ref()).await {
        Ok(orders) => HttpResponse::Ok().json(orders),
        Err(e) => error_response(&ServiceError::Db(e)),
    }
}

/// GET /orders/{id} - Détail d'une commande avec produits et transactions
/// (buyer propriétaire ou ADMIN)
#[get("/{id}")]
pub async fn get_order(
    auth_user: AuthUser,
    path: web::Path<Uuid>,
    db: web::Data<DatabaseConnection>,
) -> HttpResponse {
    let order = match orders::Entity::find_by_id(path.into_inner()).one(db.get_ref()).await {
        Ok(Some(order)) => order,
        Ok(None) => return error_response(&ServiceError::NotFound("Order not found".to_string())),
        Err(e) => return error_response(&ServiceError::Db(e)),
    };

    if !policies::can_view_order(auth_user.account_id, &auth_user.account_type, &order) {
        return error_response(&ServiceError::Authorization(
            "You can only view your own orders".to_string(),
        ));
    }

    let products: Vec<products::Model> = match order_products::Entity::find()
        .filter(order_products::Column::OrderId.eq(order.id))
        .find_also_related(products::Entity)
        .all(db.get_ref())
        .await
    {
        Ok(rows) => rows.into_iter().filter_map(|(_, product)| product).collect(),
        Err(e) => return error_response(&ServiceError::Db(e)),
    };

    let transactions = match transactions::Entity::find()
        .filter(transactions::Column::OrderId.eq(order.id))
        .order_by_desc(transactions::Column::CreatedAt)
        .all(db.get_ref())
        .await
    {
        Ok(transactions) => transactions,
        Err(e) => return error_response(&ServiceError::Db(e)),
    };

    HttpResponse::Ok().json(serde_json::json!({
        "order": order,
        "products": products,
        "transactions": transactions,
    }))
}

/// PATCH /orders/{id}/status - Marquer livrée ou annulée (ADMIN)
/// Seules les commandes "pending" peuvent bouger
#[patch("/{id}/status")]
pub async fn update_order_status(
    auth_user: AuthUser,
    path: web::Path<Uuid>,
    body: web::Json<UpdateOrderStatusRequest>,
    db: web::Data<DatabaseConnection>,
) -> HttpResponse {
    if !policies::is_admin(&auth_user.account_type) {
        return error_response(&ServiceError::Authorization(
            "Only admins can update order status".to_string(),
        ));
    }

    if !(body.status == orders::STATUS_DELIVERED || body.status == orders::STATUS_CANCELLED) {
        return error_response(&ServiceError::Validation(
            "Invalid status. Must be one of: delivered, cancelled".to_string(),
        ));
    }

    let order = match orders::Entity::find_by_id(path.into_inner()).one(db.get_ref()).await {
        Ok(Some(order)) => order,
        Ok(None) => return error_response(&ServiceError::NotFound("Order not found".to_string())),
        Err(e) => return error_response(&ServiceError::Db(e)),
    };

    if order.status != orders::STATUS_PENDING {
        return error_response(&ServiceError::Conflict(format!(
            "Order is already {}",
            order.status
        )));
    }

    let mut active: orders::ActiveModel = order.into();
    active.status = Set(body.status.clone());
    active.updated_at = Set(Utc::now());

    match active.update(db.get_ref()).await {
        Ok(order) => HttpResponse::Ok().json(order),
        Err(e) => error_response(&ServiceError::Db(e)),
    }
}

pub fn order_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/orders")
            .service(list_orders)
            .service(get_order)
            .service(update_order_status),
    );
}
