pub mod client;
pub mod pool;
pub mod providers;
pub mod types;

pub use client::RpcClient;
pub use pool::RpcPool;
pub use providers::{ connect_providers, Provider };
pub use types::{ BlockTag, RawLog, TxReceipt };
