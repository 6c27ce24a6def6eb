pub mod carrier;
pub mod container_type;
pub mod destination;
pub mod order;
pub mod order_document;
pub mod supplier;

pub use order::{OrderStatus, StatusTone};
