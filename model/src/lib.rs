mod data;
mod logistic;

pub use data::Shard;
pub use logistic::LogisticModel;
