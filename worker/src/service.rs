use std::{io, sync::Arc};

use comms::{
    MsgReceiver, MsgSender,
    msg::{Msg, TrainUpdate},
};
use log::{debug, info, warn};
use parking_lot::Mutex;
use tokio::{
    io::{AsyncRead, AsyncWrite},
    net::TcpListener,
    task::{self, JoinSet},
};

use crate::{LocalTrainer, Result, WorkerErr};

/// Accepts orchestrator connections and serves train requests until the
/// listener fails. One task per connection; the trainer is shared since
/// rounds arrive sequentially anyway.
pub async fn serve<T: LocalTrainer>(listener: TcpListener, trainer: T) -> io::Result<()> {
    let trainer = Arc::new(Mutex::new(trainer));
    let mut tasks: JoinSet<Result<()>> = JoinSet::new();

    loop {
        tokio::select! {
            conn = listener.accept() => {
                let (stream, addr) = conn?;
                debug!("orchestrator connected from {addr}");

                let (rx, tx) = stream.into_split();
                let (rx, tx) = comms::channel(rx, tx);
                let trainer = trainer.clone();
                tasks.spawn(handle_conn(rx, tx, trainer));
            }

            Some(joined) = tasks.join_next() => {
                match joined {
                    Ok(Ok(())) => {}
                    Ok(Err(e)) => warn!("connection handler failed: {e}"),
                    Err(e) => warn!("connection task panicked: {e}"),
                }
            }
        }
    }
}

/// Serves one orchestrator connection: each `Train` snapshot is fitted on
/// the blocking pool and answered with an `Update` (or an `Err` report if
/// the snapshot is malformed). A clean remote close ends the handler.
pub async fn handle_conn<R, W, T>(
    mut rx: MsgReceiver<R>,
    mut tx: MsgSender<W>,
    trainer: Arc<Mutex<T>>,
) -> Result<()>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
    T: LocalTrainer,
{
    loop {
        let msg: Msg = match rx.recv().await {
            Ok(msg) => msg,
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
                info!("orchestrator disconnected");
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        };

        match msg {
            Msg::Train(req) => {
                debug!(round = req.round; "received parameter snapshot");

                let shared = trainer.clone();
                let outcome = task::spawn_blocking(move || {
                    shared.lock().train(req.round, &req.params)
                })
                .await
                .map_err(|e| io::Error::other(format!("train join error: {e}")))?;

                match outcome {
                    Ok((params, sample_count)) => {
                        let update = TrainUpdate {
                            params,
                            sample_count,
                        };
                        tx.send(&Msg::Update(update)).await?;
                    }
                    Err(err) => {
                        warn!("local training failed: {err}");
                        tx.send(&Msg::Err(err.to_string())).await?;
                    }
                }
            }

            other => {
                let err = WorkerErr::UnexpectedMessage { got: other.kind() };
                warn!("{err}");
                tx.send(&Msg::Err(err.to_string())).await?;
                return Err(err);
            }
        }
    }
}
