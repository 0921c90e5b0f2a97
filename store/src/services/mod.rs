// store/src/services/mod.rs

pub mod gateway;
pub mod payment_mock;
pub mod references;
pub mod signature;

pub use gateway::{HttpGateway, InitializeRequest, PaymentGateway, PaymentSession};
pub use payment_mock::MockGateway;
