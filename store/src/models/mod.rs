// store/src/models/mod.rs

//! Records owned by the store: catalog entries, orders and the operator-facing
//! alert and notification rows.

pub mod alert;
pub mod discount;
pub mod notification;
pub mod order;
pub mod product;
pub mod webhook;

pub use alert::{AdminAlert, AlertKind, NewAlert};
pub use discount::{Discount, DiscountKind};
pub use notification::{NewNotification, Notification};
pub use order::{
  DeliveryDetails, DeliveryType, FulfillmentStatus, Order, OrderLine, PaymentOutcome, PaymentStatus,
};
pub use product::{Product, ShippingRate};
pub use webhook::WebhookEvent;
