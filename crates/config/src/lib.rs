mod config;
pub mod constants;

pub use config::{Config, ReconcilerConfig, RpcConfig, StoreConfig};
