// tests/reconciliation_tests.rs

mod common;

use common::{home_delivery, line, pickup_delivery, webhook_body, TestApp, WEBHOOK_SECRET};
use kobo_flow::ContextData;
use kobo_store::errors::AppError;
use kobo_store::models::{AlertKind, FulfillmentStatus, PaymentStatus};
use kobo_store::pipelines::contexts::{FulfillmentCtxData, WebhookDisposition};
use kobo_store::services::signature;
use kobo_store::store::OrderLedger;
use serde_json::json;
use uuid::Uuid;

#[tokio::test]
async fn duplicate_success_webhooks_apply_once() {
  let app = TestApp::new();
  let product = app.add_product("Kente scarf", 1000, 10);
  let order = app
    .checkout(Uuid::new_v4(), vec![line(product.id, 2)], pickup_delivery())
    .await
    .unwrap();
  let body = webhook_body(&order.transaction_ref, "success");

  let first = app.deliver_webhook(&body).await.unwrap();
  let second = app.deliver_webhook(&body).await.unwrap();

  assert_eq!(first, WebhookDisposition::Applied);
  assert_eq!(second, WebhookDisposition::AlreadyProcessed);
  let stored = app.store.find_by_transaction_ref(&order.transaction_ref).await.unwrap();
  assert_eq!(stored.payment_status, PaymentStatus::Paid);
  assert!(stored.tracking_id.is_some());
  assert_eq!(app.store.stock_of(product.id), Some(8));
  assert!(app.store.alerts().is_empty());
}

#[tokio::test]
async fn unknown_reference_is_acknowledged_with_alert() {
  let app = TestApp::new();

  let disposition = app.deliver_webhook(&webhook_body("TX-ghost", "success")).await.unwrap();

  assert_eq!(disposition, WebhookDisposition::OrderNotFound);
  assert_eq!(app.store.order_count(), 0);
  let alerts = app.store.alerts();
  assert_eq!(alerts.len(), 1);
  assert_eq!(alerts[0].kind, AlertKind::OrphanPayment);
  assert_eq!(alerts[0].transaction_ref.as_deref(), Some("TX-ghost"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_orders_for_last_unit_record_one_shortfall() {
  let app = TestApp::new();
  let product = app.add_product("Last lamp", 3000, 1);
  let first = app
    .checkout(Uuid::new_v4(), vec![line(product.id, 1)], pickup_delivery())
    .await
    .unwrap();
  let second = app
    .checkout(Uuid::new_v4(), vec![line(product.id, 1)], pickup_delivery())
    .await
    .unwrap();

  let body_a = webhook_body(&first.transaction_ref, "success");
  let body_b = webhook_body(&second.transaction_ref, "success");
  let (a, b) = tokio::join!(app.deliver_webhook(&body_a), app.deliver_webhook(&body_b));

  assert_eq!(a.unwrap(), WebhookDisposition::Applied);
  assert_eq!(b.unwrap(), WebhookDisposition::Applied);
  for reference in [&first.transaction_ref, &second.transaction_ref] {
    let order = app.store.find_by_transaction_ref(reference).await.unwrap();
    assert_eq!(order.payment_status, PaymentStatus::Paid);
  }
  assert_eq!(app.store.stock_of(product.id), Some(0));
  let shortfalls: Vec<_> = app
    .store
    .alerts()
    .into_iter()
    .filter(|a| a.kind == AlertKind::StockShortfall)
    .collect();
  assert_eq!(shortfalls.len(), 1);
  assert_eq!(shortfalls[0].product_id, Some(product.id));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn racing_duplicate_deliveries_decrement_once() {
  let app = TestApp::new();
  let product = app.add_product("Stool", 2000, 5);
  let order = app
    .checkout(Uuid::new_v4(), vec![line(product.id, 2)], pickup_delivery())
    .await
    .unwrap();
  let body = webhook_body(&order.transaction_ref, "success");

  let results = futures_util::future::join_all((0..8).map(|_| app.deliver_webhook(&body))).await;

  let applied = results
    .into_iter()
    .map(|r| r.unwrap())
    .filter(|d| *d == WebhookDisposition::Applied)
    .count();
  assert_eq!(applied, 1);
  assert_eq!(app.store.stock_of(product.id), Some(3));
}

#[tokio::test]
async fn invalid_signature_is_rejected_before_any_lookup() {
  let app = TestApp::new();
  let product = app.add_product("Rug", 8000, 2);
  let order = app
    .checkout(Uuid::new_v4(), vec![line(product.id, 1)], pickup_delivery())
    .await
    .unwrap();
  let body = webhook_body(&order.transaction_ref, "success");
  let forged = signature::sign("not-the-secret", &body).unwrap();

  let wrong = app.deliver_raw_webhook(&body, Some(forged)).await;
  let missing = app.deliver_raw_webhook(&body, None).await;

  assert!(matches!(wrong, Err(AppError::Signature(_))));
  assert!(matches!(missing, Err(AppError::Signature(_))));
  let stored = app.store.find_by_transaction_ref(&order.transaction_ref).await.unwrap();
  assert_eq!(stored.payment_status, PaymentStatus::Pending);
  assert_eq!(app.store.stock_of(product.id), Some(2));
}

#[tokio::test]
async fn failure_webhook_marks_order_failed_without_stock_change() {
  let app = TestApp::new();
  let product = app.add_product("Bowl", 1200, 4);
  let order = app
    .checkout(Uuid::new_v4(), vec![line(product.id, 1)], pickup_delivery())
    .await
    .unwrap();

  let disposition = app
    .deliver_webhook(&webhook_body(&order.transaction_ref, "failed"))
    .await
    .unwrap();

  assert_eq!(disposition, WebhookDisposition::Applied);
  let stored = app.store.find_by_transaction_ref(&order.transaction_ref).await.unwrap();
  assert_eq!(stored.payment_status, PaymentStatus::Failed);
  assert!(stored.tracking_id.is_none());
  assert_eq!(app.store.stock_of(product.id), Some(4));
}

#[tokio::test]
async fn success_after_failure_stays_failed_and_alerts_once() {
  let app = TestApp::new();
  let product = app.add_product("Bowl", 1200, 4);
  let order = app
    .checkout(Uuid::new_v4(), vec![line(product.id, 1)], pickup_delivery())
    .await
    .unwrap();
  app
    .deliver_webhook(&webhook_body(&order.transaction_ref, "failed"))
    .await
    .unwrap();

  let success = webhook_body(&order.transaction_ref, "success");
  let disposition = app.deliver_webhook(&success).await.unwrap();
  let redelivered = app.deliver_webhook(&success).await.unwrap();

  assert_eq!(disposition, WebhookDisposition::FailedOrderTerminal);
  assert_eq!(redelivered, WebhookDisposition::FailedOrderTerminal);
  let stored = app.store.find_by_transaction_ref(&order.transaction_ref).await.unwrap();
  assert_eq!(stored.payment_status, PaymentStatus::Failed);
  assert_eq!(app.store.stock_of(product.id), Some(4));
  let alerts = app.store.alerts();
  assert_eq!(alerts.len(), 1);
  assert_eq!(alerts[0].kind, AlertKind::OrphanPayment);
}

#[tokio::test]
async fn metadata_order_ref_locates_order_when_reference_differs() {
  let app = TestApp::new();
  let product = app.add_product("Basket", 2500, 3);
  let order = app
    .checkout(Uuid::new_v4(), vec![line(product.id, 1)], pickup_delivery())
    .await
    .unwrap();
  let body = json!({
    "event": "charge.success",
    "data": {
      "reference": "GW-839201",
      "status": "success",
      "metadata": { "orderRef": order.transaction_ref }
    }
  })
  .to_string();

  let disposition = app.deliver_webhook(body.as_bytes()).await.unwrap();

  assert_eq!(disposition, WebhookDisposition::Applied);
  let stored = app.store.find_by_transaction_ref(&order.transaction_ref).await.unwrap();
  assert_eq!(stored.payment_status, PaymentStatus::Paid);
}

#[tokio::test]
async fn malformed_payload_with_valid_signature_is_a_validation_error() {
  let app = TestApp::new();
  let body = br#"{"data":{"status":"success"}}"#;
  let header = signature::sign(WEBHOOK_SECRET, body).unwrap();

  let result = app.deliver_raw_webhook(body, Some(header)).await;

  assert!(matches!(result, Err(AppError::Validation(_))));
}

#[tokio::test]
async fn checkout_prices_from_catalog_and_initializes_payment() {
  let app = TestApp::new();
  let product = app.add_product("Kente scarf", 1000, 10);
  app.add_shipping_rate("Lagos", "Ikeja", 500);
  let user = Uuid::new_v4();

  let order = app
    .checkout(user, vec![line(product.id, 2)], home_delivery("Lagos", "Ikeja"))
    .await
    .unwrap();

  assert_eq!(order.total, common::money("2650"));
  assert_eq!(order.user_id, user);
  let requests = app.gateway.requests();
  assert_eq!(requests.len(), 1);
  assert_eq!(requests[0].reference, order.transaction_ref);
  assert_eq!(requests[0].amount, 2650);
  assert_eq!(requests[0].email, "ada@example.com");
}

#[tokio::test]
async fn zero_total_checkout_is_rejected_without_creating_orders() {
  let app = TestApp::new();
  let freebie = app.add_product("Gift sleeve", 0, 5);

  for _ in 0..3 {
    let result = app
      .checkout(Uuid::new_v4(), vec![line(freebie.id, 1)], pickup_delivery())
      .await;
    assert!(matches!(result, Err(AppError::Validation(_))));
  }

  assert_eq!(app.store.order_count(), 0);
  assert!(app.gateway.requests().is_empty());
}

#[tokio::test]
async fn unknown_reference_redeliveries_share_one_alert() {
  let app = TestApp::new();
  let body = webhook_body("TX-ghost", "success");

  for _ in 0..3 {
    assert_eq!(app.deliver_webhook(&body).await.unwrap(), WebhookDisposition::OrderNotFound);
  }

  assert_eq!(app.store.alerts().len(), 1);
}

#[tokio::test]
async fn gateway_outage_leaves_order_pending_and_reports_upstream() {
  let app = TestApp::new();
  let product = app.add_product("Kente scarf", 1000, 10);
  app.gateway.set_unavailable(true);
  let user = Uuid::new_v4();

  let result = app.checkout(user, vec![line(product.id, 1)], pickup_delivery()).await;

  assert!(matches!(result, Err(AppError::Upstream { .. })));
  let orders = app.store.orders_for_user(user).await.unwrap();
  assert_eq!(orders.len(), 1);
  assert_eq!(orders[0].payment_status, PaymentStatus::Pending);
  assert!(app.gateway.requests().is_empty());
}

#[tokio::test]
async fn fulfillment_notifies_customer_on_each_step() {
  let app = TestApp::new();
  let product = app.add_product("Kente scarf", 1000, 10);
  let user = Uuid::new_v4();
  let order = app
    .checkout(user, vec![line(product.id, 1)], pickup_delivery())
    .await
    .unwrap();
  app
    .deliver_webhook(&webhook_body(&order.transaction_ref, "success"))
    .await
    .unwrap();

  let ctx = ContextData::new(FulfillmentCtxData::new(
    app.state.clone(),
    order.id,
    FulfillmentStatus::Shipped,
    "operator:test",
  ));
  app.state.flows.run(ctx.clone()).await.unwrap();
  assert!(ctx.read().notification_dispatched);

  // Notification delivery is spawned; give it a moment.
  for _ in 0..50 {
    if !app.store.notifications().is_empty() {
      break;
    }
    tokio::time::sleep(std::time::Duration::from_millis(10)).await;
  }
  let notifications = app.store.notifications();
  assert_eq!(notifications.len(), 1);
  assert_eq!(notifications[0].user_id, user);
  assert_eq!(notifications[0].title, "Your Order Has Been Shipped");
}

#[tokio::test]
async fn fulfillment_cannot_reset_to_processing() {
  let app = TestApp::new();
  let ctx = ContextData::new(FulfillmentCtxData::new(
    app.state.clone(),
    Uuid::new_v4(),
    FulfillmentStatus::Processing,
    "operator:test",
  ));

  let result = app.state.flows.run(ctx).await;

  assert!(matches!(result, Err(AppError::Conflict(_))));
}
