pub mod error;
mod service;
mod trainer;

pub use error::{Result, WorkerErr};
pub use service::{handle_conn, serve};
pub use trainer::{LocalTrainer, ShardTrainer};
