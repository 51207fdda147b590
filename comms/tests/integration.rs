use std::io;

use tokio::io as tokio_io;

use comms::msg::{Msg, TrainRequest, TrainUpdate};

#[tokio::test]
async fn train_update_roundtrip_over_duplex() -> io::Result<()> {
    const BUF_SIZE: usize = 4096;

    let (orch_stream, wk_stream) = tokio_io::duplex(BUF_SIZE);

    // Orchestrator side
    let (orch_rx, orch_tx) = tokio_io::split(orch_stream);
    let (mut orch_rx, mut orch_tx) = comms::channel(orch_rx, orch_tx);

    // Worker side
    let (wk_rx, wk_tx) = tokio_io::split(wk_stream);
    let (mut wk_rx, mut wk_tx) = comms::channel(wk_rx, wk_tx);

    // 1) Orchestrator -> Worker: parameter snapshot
    let request = TrainRequest {
        round: 3,
        params: vec![1.0, 2.0, 3.0],
    };
    orch_tx.send(&Msg::Train(request)).await?;

    let msg: Msg = wk_rx.recv().await?;
    match msg {
        Msg::Train(req) => {
            assert_eq!(req.round, 3);
            assert_eq!(req.params, vec![1.0, 2.0, 3.0]);
        }
        other => panic!("unexpected msg: {other:?}"),
    }

    // 2) Worker -> Orchestrator: trained update
    let update = TrainUpdate {
        params: vec![1.5, 2.5, 3.5],
        sample_count: 1000,
    };
    wk_tx.send(&Msg::Update(update)).await?;

    let msg: Msg = orch_rx.recv().await?;
    match msg {
        Msg::Update(up) => {
            assert_eq!(up.params, vec![1.5, 2.5, 3.5]);
            assert_eq!(up.sample_count, 1000);
        }
        other => panic!("unexpected msg: {other:?}"),
    }

    Ok(())
}

#[tokio::test]
async fn error_report_crosses_the_wire() -> io::Result<()> {
    let (wk_stream, orch_stream) = tokio_io::duplex(512);

    let (wk_rx, wk_tx) = tokio_io::split(wk_stream);
    let (_wk_rx, mut wk_tx) = comms::channel(wk_rx, wk_tx);

    let (orch_rx, orch_tx) = tokio_io::split(orch_stream);
    let (mut orch_rx, _orch_tx) = comms::channel(orch_rx, orch_tx);

    wk_tx
        .send(&Msg::Err("params length mismatch".to_string()))
        .await?;

    let msg: Msg = orch_rx.recv().await?;
    match msg {
        Msg::Err(detail) => assert_eq!(detail, "params length mismatch"),
        other => panic!("unexpected msg: {other:?}"),
    }

    Ok(())
}

#[tokio::test]
async fn oversized_frame_is_rejected() {
    use tokio_io::AsyncWriteExt;

    let (a, b) = tokio_io::duplex(64);
    let (b_rx, b_tx) = tokio_io::split(b);
    let (mut rx, _tx) = comms::channel(b_rx, b_tx);

    // Hand-craft a frame header claiming an absurd payload size.
    let (_a_rx, mut a_tx) = tokio_io::split(a);
    a_tx.write_all(&u64::MAX.to_be_bytes()).await.unwrap();
    a_tx.flush().await.unwrap();

    let err = rx.recv::<Msg>().await.unwrap_err();
    assert_eq!(err.kind(), io::ErrorKind::InvalidData);
}
