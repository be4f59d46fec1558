pub mod common;
pub mod dashboard;
pub mod products;
