use std::io;

use coordinator::Rendezvous;
use tokio::io as tokio_io;

use trainer::TrainerErr;
use trainer::collective::{Collective, ReduceOp, RemoteGroup};

const BUF_SIZE: usize = 4096;

type DuplexRx = tokio_io::ReadHalf<tokio_io::DuplexStream>;
type DuplexTx = tokio_io::WriteHalf<tokio_io::DuplexStream>;

/// Wires one in-memory connection into `service` and returns the trainer
/// side channel.
fn connect(
    service: &mut Rendezvous,
) -> (comms::SageReceiver<DuplexRx>, comms::SageSender<DuplexTx>) {
    let (coord_stream, trainer_stream) = tokio_io::duplex(BUF_SIZE);

    let (sv_rx, sv_tx) = tokio_io::split(coord_stream);
    let (sv_rx, sv_tx) = comms::channel(sv_rx, sv_tx);
    service.spawn(sv_rx, sv_tx);

    let (tr_rx, tr_tx) = tokio_io::split(trainer_stream);
    comms::channel(tr_rx, tr_tx)
}

#[tokio::test]
async fn three_trainers_agree_on_reductions() -> io::Result<()> {
    const WORLD: usize = 3;

    let mut service = Rendezvous::new(WORLD);
    let mut clients = Vec::new();
    for rank in 0..WORLD {
        let (rx, tx) = connect(&mut service);
        clients.push((rank, rx, tx));
    }

    let service_task = tokio::spawn(async move { service.run().await });

    let mut tasks = Vec::new();
    for (rank, rx, tx) in clients {
        tasks.push(tokio::spawn(async move {
            let mut group = RemoteGroup::join(rank, WORLD, rx, tx).await.unwrap();
            assert_eq!(group.rank(), rank);
            assert_eq!(group.world_size(), WORLD);

            let mut values = [rank as i64 * 10, -(rank as i64)];
            group.all_reduce(&mut values, ReduceOp::Max).await.unwrap();
            assert_eq!(values, [20, 0]);

            let mut sums = [1i64];
            group.all_reduce(&mut sums, ReduceOp::Sum).await.unwrap();
            assert_eq!(sums, [WORLD as i64]);

            group.barrier().await.unwrap();
            group.leave().await.unwrap();
        }));
    }

    for task in tasks {
        task.await.unwrap();
    }
    service_task.await.unwrap()?;

    Ok(())
}

#[tokio::test]
async fn out_of_range_rank_is_rejected() {
    let mut service = Rendezvous::new(1);
    let (rx, tx) = connect(&mut service);

    let service_task = tokio::spawn(async move { service.run().await });

    let mut group = RemoteGroup::join(5, 1, rx, tx).await.unwrap();
    let err = group.all_reduce(&mut [0], ReduceOp::Max).await.unwrap_err();
    assert!(matches!(err, TrainerErr::Rejected { .. }));

    assert!(service_task.await.unwrap().is_err());
}

#[tokio::test]
async fn duplicate_rank_is_rejected() {
    let mut service = Rendezvous::new(1);
    let (first_rx, first_tx) = connect(&mut service);
    let (second_rx, second_tx) = connect(&mut service);

    let service_task = tokio::spawn(async move { service.run().await });

    // First claim of rank 0 works; a completed reduction proves the join
    // was processed before the duplicate shows up.
    let mut first = RemoteGroup::join(0, 1, first_rx, first_tx).await.unwrap();
    let mut values = [42i64];
    first.all_reduce(&mut values, ReduceOp::Max).await.unwrap();
    assert_eq!(values, [42]);
    first.leave().await.unwrap();

    let mut second = RemoteGroup::join(0, 1, second_rx, second_tx)
        .await
        .unwrap();
    let err = second
        .all_reduce(&mut [0], ReduceOp::Max)
        .await
        .unwrap_err();
    assert!(matches!(err, TrainerErr::Rejected { .. }));

    assert!(service_task.await.unwrap().is_err());
}
