//! Pipeline services: intake, routing and settlement

pub mod routing;
pub mod settlement;
pub mod transaction;

pub use routing::RoutingService;
pub use settlement::SettlementService;
pub use transaction::{CreateTransactionInput, TransactionService};
