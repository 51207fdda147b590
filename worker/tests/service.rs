use std::sync::Arc;

use parking_lot::Mutex;
use tokio::io as tokio_io;

use comms::msg::{Msg, TrainRequest, TrainUpdate};
use worker::{ShardTrainer, handle_conn};

const FEATURES: usize = 4;
const SAMPLES: usize = 64;

fn spawn_handler(
    stream: tokio_io::DuplexStream,
) -> tokio::task::JoinHandle<worker::Result<()>> {
    let (rx, tx) = tokio_io::split(stream);
    let (rx, tx) = comms::channel(rx, tx);
    let trainer = Arc::new(Mutex::new(ShardTrainer::new(0, SAMPLES, FEATURES)));
    tokio::spawn(handle_conn(rx, tx, trainer))
}

#[tokio::test]
async fn serves_train_requests_until_disconnect() {
    let (wk_stream, orch_stream) = tokio_io::duplex(64 * 1024);
    let handler = spawn_handler(wk_stream);

    let (orch_rx, orch_tx) = tokio_io::split(orch_stream);
    let (mut rx, mut tx) = comms::channel(orch_rx, orch_tx);

    for round in 1..=2u64 {
        let request = TrainRequest {
            round,
            params: vec![0.0; FEATURES + 1],
        };
        tx.send(&Msg::Train(request)).await.unwrap();

        let msg: Msg = rx.recv().await.unwrap();
        match msg {
            Msg::Update(TrainUpdate {
                params,
                sample_count,
            }) => {
                assert_eq!(params.len(), FEATURES + 1);
                assert_eq!(sample_count, SAMPLES as u64);
            }
            other => panic!("unexpected msg: {other:?}"),
        }
    }

    // Closing our end reads as a clean disconnect on the worker side.
    drop(rx);
    drop(tx);
    handler.await.unwrap().unwrap();
}

#[tokio::test]
async fn malformed_snapshot_is_reported_not_fatal() {
    let (wk_stream, orch_stream) = tokio_io::duplex(64 * 1024);
    let handler = spawn_handler(wk_stream);

    let (orch_rx, orch_tx) = tokio_io::split(orch_stream);
    let (mut rx, mut tx) = comms::channel(orch_rx, orch_tx);

    let bad = TrainRequest {
        round: 1,
        params: vec![0.0; 2],
    };
    tx.send(&Msg::Train(bad)).await.unwrap();

    let msg: Msg = rx.recv().await.unwrap();
    match msg {
        Msg::Err(detail) => assert!(detail.contains("length mismatch"), "got: {detail}"),
        other => panic!("unexpected msg: {other:?}"),
    }

    // The connection survives a malformed round.
    let good = TrainRequest {
        round: 2,
        params: vec![0.0; FEATURES + 1],
    };
    tx.send(&Msg::Train(good)).await.unwrap();
    let msg: Msg = rx.recv().await.unwrap();
    assert!(matches!(msg, Msg::Update(_)), "got: {msg:?}");

    drop(rx);
    drop(tx);
    handler.await.unwrap().unwrap();
}

#[tokio::test]
async fn unexpected_message_kind_closes_connection() {
    let (wk_stream, orch_stream) = tokio_io::duplex(4096);
    let handler = spawn_handler(wk_stream);

    let (orch_rx, orch_tx) = tokio_io::split(orch_stream);
    let (mut rx, mut tx) = comms::channel(orch_rx, orch_tx);

    let update = TrainUpdate {
        params: vec![0.0; FEATURES + 1],
        sample_count: 1,
    };
    tx.send(&Msg::Update(update)).await.unwrap();

    let msg: Msg = rx.recv().await.unwrap();
    assert!(matches!(msg, Msg::Err(_)), "got: {msg:?}");

    assert!(handler.await.unwrap().is_err());
}
