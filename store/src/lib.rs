// store/src/lib.rs

//! Checkout, payment reconciliation and fulfillment for the storefront.

pub mod config;
pub mod errors;
pub mod models;
pub mod pipelines;
pub mod pricing;
pub mod services;
pub mod state;
pub mod store;
pub mod web;
