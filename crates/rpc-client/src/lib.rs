pub mod classify;
pub mod coordinator_client;
pub mod error;
pub mod eth_client;
pub mod json_types;
pub mod traits;

pub use coordinator_client::CoordinatorClient;
pub use error::{CoordinatorError, RPCRequestError};
pub use eth_client::EthClient;
pub use traits::{CoordinatorApi, L1Client};
