use serde::{Deserialize, Serialize};

/// A full parameter snapshot pushed to a worker at the start of a round.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainRequest {
    pub round: u64,
    pub params: Vec<f32>,
}

/// A worker's locally trained parameters plus the number of samples
/// they were fitted on, used to weight the aggregation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainUpdate {
    pub params: Vec<f32>,
    pub sample_count: u64,
}

/// The application layer message for the entire system.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Msg {
    Train(TrainRequest),
    Update(TrainUpdate),
    Err(String),
}

impl Msg {
    /// Short tag used in logs and protocol errors.
    pub fn kind(&self) -> &'static str {
        match self {
            Msg::Train(_) => "train",
            Msg::Update(_) => "update",
            Msg::Err(_) => "err",
        }
    }
}
