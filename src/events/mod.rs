pub mod classifier;
pub mod decoder;
pub mod types;

pub use classifier::classify_side;
pub use decoder::{ decode_orders_matched, extract_order_fills };
pub use types::{ OrderFill, Side };
