use std::{fmt, io, net::SocketAddr};

use async_trait::async_trait;
use comms::msg::{Msg, TrainRequest};
use tokio::net::TcpStream;

pub use comms::msg::TrainUpdate;

/// Why one worker call produced no usable update. Recoverable at round
/// granularity: the worker is excluded from this round's aggregation and
/// nothing else.
#[derive(Debug)]
pub enum CallError {
    /// Connection refused, reset, or otherwise unreachable.
    Unavailable(io::Error),
    /// Decodable reply that violates the protocol schema.
    Malformed(String),
}

impl fmt::Display for CallError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unavailable(e) => write!(f, "worker unavailable: {e}"),
            Self::Malformed(detail) => write!(f, "malformed response: {detail}"),
        }
    }
}

impl std::error::Error for CallError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Unavailable(e) => Some(e),
            Self::Malformed(_) => None,
        }
    }
}

/// The remote trainer capability: one call per worker per round, pushing a
/// parameter snapshot and collecting locally trained parameters plus the
/// sample count behind them. The caller owns the timeout.
#[async_trait]
pub trait TrainerClient: Send {
    async fn train(&mut self, round: u64, params: &[f32]) -> Result<TrainUpdate, CallError>;
}

/// Calls a worker process over its TCP endpoint, one connection per round.
pub struct RemoteTrainer {
    addr: SocketAddr,
}

impl RemoteTrainer {
    pub fn new(addr: SocketAddr) -> Self {
        Self { addr }
    }
}

#[async_trait]
impl TrainerClient for RemoteTrainer {
    async fn train(&mut self, round: u64, params: &[f32]) -> Result<TrainUpdate, CallError> {
        let stream = TcpStream::connect(self.addr)
            .await
            .map_err(CallError::Unavailable)?;
        let (rx, tx) = stream.into_split();
        let (mut rx, mut tx) = comms::channel(rx, tx);

        let request = TrainRequest {
            round,
            params: params.to_vec(),
        };
        tx.send(&Msg::Train(request))
            .await
            .map_err(CallError::Unavailable)?;

        match rx.recv().await.map_err(CallError::Unavailable)? {
            Msg::Update(update) => {
                if update.params.len() != params.len() {
                    return Err(CallError::Malformed(format!(
                        "params length mismatch: got {}, expected {}",
                        update.params.len(),
                        params.len()
                    )));
                }
                Ok(update)
            }
            Msg::Err(detail) => Err(CallError::Unavailable(io::Error::other(detail))),
            other => Err(CallError::Malformed(format!(
                "unexpected message kind: {}",
                other.kind()
            ))),
        }
    }
}
