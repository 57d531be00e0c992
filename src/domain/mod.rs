//! Entities, value objects and the ports the application layer depends on.

pub mod alert;
pub mod audit;
pub mod gateway;
pub mod ids;
pub mod money;
pub mod phone;
pub mod ports;
pub mod product;
pub mod transaction;
