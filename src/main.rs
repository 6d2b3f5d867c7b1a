mod db;
mod middleware;
mod models;
mod routes;
mod services;
mod utils;

use actix_web::{App, HttpServer, web};
use std::sync::Arc;

use services::email_service::EmailService;
use services::moderation::{BadWordClassifier, TextClassifier};
use services::paystack::{PaymentGateway, PaystackClient};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    println!("🔌 Connecting to database...");
    let db = db::establish_connection()
        .await
        .expect("Failed to connect to database");
    println!("✅ Database connected!");

    let email_service = EmailService::from_env().expect("Failed to configure SMTP transport");
    let gateway: Arc<dyn PaymentGateway> =
        Arc::new(PaystackClient::from_env().expect("Failed to configure Paystack client"));
    let classifier: Arc<dyn TextClassifier> = Arc::new(BadWordClassifier::new());

    println!("🚀 Starting server on http://127.0.0.1:8080");

    let db_data = web::Data::new(db);

    HttpServer::new(move || {
        App::new()
            .app_data(db_data.clone())
            .app_data(web::Data::new(email_service.clone()))
            .app_data(web::Data::from(gateway.clone()))
            .app_data(web::Data::from(classifier.clone()))
            .configure(routes::configure_routes)
    })
    .bind(("127.0.0.1", 8080))?
    .run()
    .await
}
