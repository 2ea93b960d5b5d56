use std::num::NonZeroUsize;

use trainer::collective::LocalGroup;
use trainer::config::{GraphConfig, TrainerConfig};
use trainer::graph::InMemoryGraph;
use trainer::model::MajorityClass;
use trainer::TrainLoop;

fn nz(n: usize) -> NonZeroUsize {
    NonZeroUsize::new(n).unwrap()
}

fn test_config(world_size: usize, num_nodes: usize) -> TrainerConfig {
    TrainerConfig {
        rank: 0,
        world_size: nz(world_size),
        epochs: nz(2),
        batch_size: nz(8),
        eval_batch_size: nz(64),
        fanouts: vec![2, 2],
        log_every: 10,
        eval_every: 1,
        seed: Some(7),
        coordinator_addr: None,
        graph: GraphConfig {
            num_nodes: nz(num_nodes),
            avg_degree: nz(4),
            feature_dim: nz(8),
            num_classes: nz(3),
        },
    }
}

fn build(cfg: &TrainerConfig) -> (InMemoryGraph, MajorityClass) {
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

#[tokio::test]
async fn standalone_run_completes_the_expected_steps() {
    // 100 nodes => 60 train ids => ceil(60 / 8) = 8 batches per epoch.
    let cfg = test_config(1, 100);
    let (graph, runner) = build(&cfg);
    let mut group = LocalGroup::group(1).remove(0);

    let metrics = TrainLoop::new(cfg, graph, runner)
        .run(&mut group)
        .await
        .unwrap();

    assert_eq!(metrics.epochs, 2);
    assert_eq!(metrics.steps, 16);
    assert_eq!(metrics.seeds, 120);
    assert!(metrics.inputs >= metrics.seeds);
}

#[tokio::test]
async fn uneven_shares_run_the_same_number_of_steps() {
    // 99 nodes => 59 train ids => shares of 30 and 29; the short worker
    // pads to 30, so both run ceil(30 / 8) = 4 batches per epoch.
    let cfg = test_config(2, 99);

    let mut tasks = Vec::new();
    for (rank, mut group) in LocalGroup::group(2).into_iter().enumerate() {
        let mut cfg = cfg.clone();
        cfg.rank = rank;
        let (graph, runner) = build(&cfg);

        tasks.push(tokio::spawn(async move {
            TrainLoop::new(cfg, graph, runner).run(&mut group).await
        }));
    }

    let mut step_counts = Vec::new();
    for task in tasks {
        let metrics = task.await.unwrap().unwrap();
        assert_eq!(metrics.epochs, 2);
        step_counts.push(metrics.steps);
    }

    assert_eq!(step_counts[0], step_counts[1]);
    assert_eq!(step_counts[0], 8);
}
