// store/src/web/routes.rs

use actix_web::{web, HttpResponse};

use crate::web::handlers::{checkout_handlers, order_handlers, webhook_handlers};

async fn health_check_handler() -> HttpResponse {
  HttpResponse::Ok().json(serde_json::json!({ "status": "ok" }))
}

pub fn configure_app_routes(cfg: &mut web::ServiceConfig) {
  cfg
    .route("/health", web::get().to(health_check_handler))
    .service(
      web::scope("/checkout")
        .route("/preview", web::post().to(checkout_handlers::preview_handler))
        .route("/initiate", web::post().to(checkout_handlers::initiate_handler))
        .route("/status", web::get().to(checkout_handlers::status_handler)),
    )
    .service(web::scope("/payments").route("/webhook", web::post().to(webhook_handlers::payment_webhook_handler)))
    .service(
      web::scope("/orders")
        .route("/my", web::get().to(order_handlers::my_orders_handler))
        .route("/{order_id}/fulfillment", web::put().to(order_handlers::update_fulfillment_handler)),
    );
}
