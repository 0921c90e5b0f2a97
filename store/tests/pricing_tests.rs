// tests/pricing_tests.rs

mod common;

use chrono::{Duration, Utc};
use kobo_store::errors::AppError;
use kobo_store::models::{Discount, DiscountKind, Product, ShippingRate};
use kobo_store::pricing::{self, CartLine, CatalogSnapshot, DeliveryMode, PricingPolicy};
use rust_decimal::Decimal;
use common::money;

fn catalog_with(products: &[&Product]) -> CatalogSnapshot {
  let mut snapshot = CatalogSnapshot::default();
  for product in products {
    snapshot.products.insert(product.id, (*product).clone());
  }
  snapshot
}

fn home(state: &str, city: &str) -> DeliveryMode {
  DeliveryMode::Home {
    state: state.to_string(),
    city: city.to_string(),
  }
}

fn rate(state: &str, city: &str, fee: Decimal) -> ShippingRate {
  ShippingRate {
    state: state.to_string(),
    city: city.to_string(),
    fee,
  }
}

#[test]
fn home_delivery_uses_configured_city_rate() {
  let p1 = Product::new("Kente scarf", money("1000"), 10);
  let catalog = catalog_with(&[&p1]).with_shipping_rates([rate("Lagos", "Ikeja", money("500"))]);

  let quote = pricing::quote(
    &[common::line(p1.id, 2)],
    &home("Lagos", "Ikeja"),
    &catalog,
    Utc::now(),
    &PricingPolicy::default(),
  )
  .unwrap();

  assert_eq!(quote.subtotal, money("2000"));
  assert_eq!(quote.tax_amount, money("150"));
  assert_eq!(quote.shipping_fee, money("500"));
  assert_eq!(quote.total, money("2650"));
}

#[test]
fn pickup_is_never_charged_shipping() {
  let p1 = Product::new("Kente scarf", money("1000"), 10);
  let catalog = catalog_with(&[&p1]).with_shipping_rates([rate("Lagos", "Ikeja", money("500"))]);

  let quote = pricing::quote(
    &[common::line(p1.id, 2)],
    &DeliveryMode::Pickup,
    &catalog,
    Utc::now(),
    &PricingPolicy::default(),
  )
  .unwrap();

  assert_eq!(quote.shipping_fee, Decimal::ZERO);
  assert_eq!(quote.total, money("2150"));
}

#[test]
fn shipping_falls_back_from_city_to_state_to_default() {
  let p1 = Product::new("Mat", money("100"), 10);
  let catalog = catalog_with(&[&p1]).with_shipping_rates([
    rate("Lagos", "Ikeja", money("500")),
    rate("Lagos", ShippingRate::STATE_DEFAULT_CITY, money("800")),
  ]);
  let policy = PricingPolicy::default();
  let lines = [common::line(p1.id, 1)];

  let city = pricing::quote(&lines, &home("Lagos", "Ikeja"), &catalog, Utc::now(), &policy).unwrap();
  let state = pricing::quote(&lines, &home("Lagos", "Epe"), &catalog, Utc::now(), &policy).unwrap();
  let fallback = pricing::quote(&lines, &home("Kano", "Nassarawa"), &catalog, Utc::now(), &policy).unwrap();

  assert_eq!(city.shipping_fee, money("500"));
  assert_eq!(state.shipping_fee, money("800"));
  assert_eq!(fallback.shipping_fee, policy.default_shipping_fee);
}

#[test]
fn free_shipping_only_strictly_above_threshold() {
  let policy = PricingPolicy {
    free_shipping_threshold: money("5000"),
    ..PricingPolicy::default()
  };
  let p1 = Product::new("Lamp", money("2500"), 10);
  let catalog = catalog_with(&[&p1]).with_shipping_rates([rate("Oyo", "Ibadan", money("700"))]);

  let at_threshold = pricing::quote(&[common::line(p1.id, 2)], &home("Oyo", "Ibadan"), &catalog, Utc::now(), &policy).unwrap();
  let above = pricing::quote(&[common::line(p1.id, 3)], &home("Oyo", "Ibadan"), &catalog, Utc::now(), &policy).unwrap();

  assert_eq!(at_threshold.shipping_fee, money("700"));
  assert_eq!(above.shipping_fee, Decimal::ZERO);
}

#[test]
fn percentage_and_fixed_discounts_adjust_unit_price() {
  let shirt = Product::new("Shirt", money("4000"), 10);
  let cap = Product::new("Cap", money("1500"), 10);
  let pct = Discount::new(DiscountKind::Percentage(money("25")));
  let fixed = Discount::new(DiscountKind::Fixed(money("500")));
  let mut catalog = catalog_with(&[&shirt, &cap]);
  catalog.discounts.insert(pct.id, pct.clone());
  catalog.discounts.insert(fixed.id, fixed.clone());

  let lines = [
    CartLine {
      product_id: shirt.id,
      quantity: 1,
      discount_id: Some(pct.id),
    },
    CartLine {
      product_id: cap.id,
      quantity: 2,
      discount_id: Some(fixed.id),
    },
  ];
  let quote = pricing::quote(&lines, &DeliveryMode::Pickup, &catalog, Utc::now(), &PricingPolicy::default()).unwrap();

  assert_eq!(quote.lines[0].unit_price, money("3000"));
  assert_eq!(quote.lines[0].base_unit_price, money("4000"));
  assert_eq!(quote.lines[0].discount_id, Some(pct.id));
  assert_eq!(quote.lines[1].unit_price, money("1000"));
  assert_eq!(quote.subtotal, money("5000"));
}

#[test]
fn fixed_discount_larger_than_price_clamps_to_zero() {
  let sticker = Product::new("Sticker", money("300"), 10);
  let discount = Discount::new(DiscountKind::Fixed(money("1000")));
  let mut catalog = catalog_with(&[&sticker]);
  catalog.discounts.insert(discount.id, discount.clone());

  let quote = pricing::quote(
    &[CartLine {
      product_id: sticker.id,
      quantity: 3,
      discount_id: Some(discount.id),
    }],
    &DeliveryMode::Pickup,
    &catalog,
    Utc::now(),
    &PricingPolicy::default(),
  )
  .unwrap();

  assert_eq!(quote.lines[0].unit_price, Decimal::ZERO);
  assert_eq!(quote.total, Decimal::ZERO);
  assert!(pricing::gateway_amount(quote.total).is_err());
}

#[test]
fn expired_or_inactive_discount_is_ignored() {
  let bag = Product::new("Bag", money("2000"), 10);
  let now = Utc::now();
  let mut expired = Discount::new(DiscountKind::Percentage(money("50")));
  expired.ends_at = Some(now - Duration::days(1));
  let mut inactive = Discount::new(DiscountKind::Fixed(money("100")));
  inactive.is_active = false;
  let mut catalog = catalog_with(&[&bag]);
  catalog.discounts.insert(expired.id, expired.clone());
  catalog.discounts.insert(inactive.id, inactive.clone());

  for discount_id in [expired.id, inactive.id] {
    let quote = pricing::quote(
      &[CartLine {
        product_id: bag.id,
        quantity: 1,
        discount_id: Some(discount_id),
      }],
      &DeliveryMode::Pickup,
      &catalog,
      now,
      &PricingPolicy::default(),
    )
    .unwrap();
    assert_eq!(quote.lines[0].unit_price, money("2000"));
    assert_eq!(quote.lines[0].discount_id, None);
  }
}

#[test]
fn unknown_products_are_dropped_not_priced() {
  let known = Product::new("Known", money("1000"), 1);
  let ghost = uuid::Uuid::new_v4();
  let catalog = catalog_with(&[&known]);

  let quote = pricing::quote(
    &[common::line(known.id, 1), common::line(ghost, 4)],
    &DeliveryMode::Pickup,
    &catalog,
    Utc::now(),
    &PricingPolicy::default(),
  )
  .unwrap();

  assert_eq!(quote.lines.len(), 1);
  assert_eq!(quote.dropped_lines, vec![ghost]);
  assert_eq!(quote.subtotal, money("1000"));
}

#[test]
fn empty_cart_and_non_positive_quantity_are_rejected() {
  let p1 = Product::new("Mug", money("800"), 5);
  let catalog = catalog_with(&[&p1]);
  let policy = PricingPolicy::default();

  let empty = pricing::quote(&[], &DeliveryMode::Pickup, &catalog, Utc::now(), &policy);
  assert!(matches!(empty, Err(AppError::Validation(_))));

  let zero = pricing::quote(&[common::line(p1.id, 0)], &DeliveryMode::Pickup, &catalog, Utc::now(), &policy);
  assert!(matches!(zero, Err(AppError::Validation(_))));
}

#[test]
fn tax_is_rounded_half_away_from_zero() {
  let p1 = Product::new("Pen", money("10.10"), 50);
  let catalog = catalog_with(&[&p1]);

  // 10.10 * 0.075 = 0.7575
  let quote = pricing::quote(
    &[common::line(p1.id, 1)],
    &DeliveryMode::Pickup,
    &catalog,
    Utc::now(),
    &PricingPolicy::default(),
  )
  .unwrap();

  assert_eq!(quote.tax_amount, money("0.76"));
  assert_eq!(pricing::round_money(money("2.345")), money("2.35"));
  assert_eq!(pricing::gateway_amount(money("2650.50")).unwrap(), 2651);
}

#[test]
fn same_inputs_price_identically() {
  let p1 = Product::new("Chair", money("12999.99"), 3);
  let catalog = catalog_with(&[&p1]).with_shipping_rates([rate("Abuja", "Wuse", money("1200"))]);
  let now = Utc::now();
  let lines = [common::line(p1.id, 3)];

  let first = pricing::quote(&lines, &home("Abuja", "Wuse"), &catalog, now, &PricingPolicy::default()).unwrap();
  let second = pricing::quote(&lines, &home("Abuja", "Wuse"), &catalog, now, &PricingPolicy::default()).unwrap();

  assert_eq!(first, second);
}
