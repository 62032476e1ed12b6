pub mod builder;
pub mod mapper;
pub mod metrics;
pub mod money;
pub mod orders;
pub mod payments;
pub mod repository;
pub mod square;

pub use metrics::{get_metrics, init_metrics};
pub use orders::OrderService;
pub use payments::PaymentService;
pub use repository::{InMemoryRepository, PgRepository, PosRepository};
pub use square::{PaymentProcessor, ProcessorError, SquareClient};
