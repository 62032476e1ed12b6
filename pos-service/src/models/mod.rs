//! Local records mirrored from the processor.

mod order;
mod payment;

pub use order::{NewOrder, NewOrderItem, Order, OrderItem};
pub use payment::{NewPayment, Payment};
