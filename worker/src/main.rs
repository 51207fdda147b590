use std::{env, io};

use log::info;
use tokio::{net::TcpListener, signal};

use worker::{ShardTrainer, serve};

const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_SAMPLES: usize = 1000;
const DEFAULT_FEATURES: usize = 8;

#[tokio::main]
async fn main() -> io::Result<()> {
    env_logger::init();

    let worker_id: u64 = env::var("WORKER_ID")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(0);

    let addr = format!(
        "{}:{}",
        env::var("HOST").unwrap_or_else(|_| DEFAULT_HOST.to_string()),
        env::var("PORT").map_err(io::Error::other)?,
    );

    let listener = TcpListener::bind(&addr).await?;
    info!("worker {worker_id} listening at {addr}");

    let trainer = ShardTrainer::new(worker_id, DEFAULT_SAMPLES, DEFAULT_FEATURES);

    tokio::select! {
        ret = serve(listener, trainer) => ret,
        _ = signal::ctrl_c() => {
            info!("received SIGTERM");
            Ok(())
        }
    }
}
