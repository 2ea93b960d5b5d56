use std::{env, io};

use log::info;
use tokio::{net::TcpStream, signal};

use trainer::{
    TrainLoop, TrainerConfig, config,
    collective::{LocalGroup, RemoteGroup},
    graph::InMemoryGraph,
    model::MajorityClass,
};

#[tokio::main]
async fn main() -> io::Result<()> {
    env_logger::init();

    let path = env::args()
        .nth(1)
        .ok_or_else(|| io::Error::other("usage: trainer <config.json>"))?;
    let cfg = config::load(&path).map_err(io::Error::other)?;

    match env::var("MODE").as_deref() {
        Ok("local") => run_local(cfg).await,
        _ => {
            tokio::select! {
                ret = run_remote(cfg) => ret,
                _ = signal::ctrl_c() => {
                    info!("received SIGTERM");
                    Ok(())
                }
            }
        }
    }
}

/// Runs the whole group inside this process over a `LocalGroup`.
async fn run_local(cfg: TrainerConfig) -> io::Result<()> {
    let world_size = cfg.world_size.get();
    let mut tasks = Vec::with_capacity(world_size);

    for (rank, mut group) in LocalGroup::group(world_size).into_iter().enumerate() {
        let mut cfg = cfg.clone();
        cfg.rank = rank;

        let (graph, runner) = build_backends(&cfg);
        tasks.push(tokio::spawn(async move {
            let lp = TrainLoop::new(cfg, graph, runner);
            lp.run(&mut group).await
        }));
    }

    let results = futures::future::try_join_all(tasks)
        .await
        .map_err(io::Error::other)?;

    for (rank, metrics) in results.into_iter().enumerate() {
        let metrics = metrics?;
        info!(
            "part {rank} finished: {} steps over {} epochs",
            metrics.steps, metrics.epochs
        );
    }

    Ok(())
}

/// Joins the coordinator-backed group and runs this worker's share.
async fn run_remote(cfg: TrainerConfig) -> io::Result<()> {
    let addr = env::var("COORD")
        .ok()
        .or_else(|| cfg.coordinator_addr.clone())
        .ok_or_else(|| io::Error::other("no coordinator address: set COORD or coordinator_addr"))?;

    let stream = TcpStream::connect(&addr).await?;
    let (rx, tx) = stream.into_split();
    let (rx, tx) = comms::channel(rx, tx);
    info!("connected to coordinator at {addr}");

    let mut group = RemoteGroup::join(cfg.rank, cfg.world_size.get(), rx, tx).await?;

    let (graph, runner) = build_backends(&cfg);
    let metrics = TrainLoop::new(cfg, graph, runner).run(&mut group).await?;
    group.leave().await?;

    info!(
        "trainer finished: {} steps over {} epochs",
        metrics.steps, metrics.epochs
    );

    Ok(())
}

/// Every worker builds the same graph from the shared seed; the masks are
/// then split by rank inside the loop.
fn build_backends(cfg: &TrainerConfig) -> (InMemoryGraph, MajorityClass) {
    let graph = InMemoryGraph::generate(
        cfg.graph.num_nodes.get(),
        cfg.graph.avg_degree.get(),
        cfg.graph.feature_dim.get(),
        cfg.graph.num_classes.get(),
        cfg.seed.unwrap_or_default(),
    );
    let runner = MajorityClass::new(cfg.graph.num_classes.get());

    (graph, runner)
}
