pub mod checkout_service;
pub mod coordinator;
pub mod order_service;
