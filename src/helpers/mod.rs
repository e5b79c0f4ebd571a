mod order_id;

pub use order_id::new_order_id;
