//! Concurrent creation and interruption streams against one registry.

mod common;

use std::collections::HashMap;
use std::sync::Arc;

use common::*;
use spotwatch_metrics::InterruptionCounter;
use spotwatch_pipeline::{InstanceRegistry, Pipeline, PipelineConfig};

const RESOURCES: usize = 64;
const CREATIONS: usize = 5_000;
const INTERRUPTIONS: usize = 2_000;

fn resource(i: usize) -> String {
    format!("projects/p/zones/z/instances/i-{}", i % RESOURCES)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_streams_match_sequential_replay() {
    let seed: Vec<(String, String)> = (0..RESOURCES)
        .map(|i| (resource(i), "seed-cluster".to_string()))
        .collect();
    let registry = InstanceRegistry::seeded(seed.iter().cloned().collect(), &Default::default());
    let counter = Arc::new(InterruptionCounter::new(false));

    let config = PipelineConfig {
        channel_capacity: 8,
        ..PipelineConfig::default()
    };
    let (inputs, handle) = Pipeline::new(config, registry.clone(), counter.clone()).start();

    let creations = inputs.creations;
    let producer_c = tokio::spawn(async move {
        for i in 0..CREATIONS {
            let cluster = format!("cluster-{}", i % 7);
            creations
                .send(creation(&format!("c{i}"), &resource(i * 31), &cluster))
                .await
                .unwrap();
        }
    });

    let interruptions = inputs.interruptions;
    let producer_i = tokio::spawn(async move {
        for i in 0..INTERRUPTIONS {
            // Every id is sent twice to exercise deduplication under load
            let msg = interruption(&format!("m{i}"), &resource(i));
            interruptions.send(msg.clone()).await.unwrap();
            interruptions.send(msg).await.unwrap();
        }
    });

    producer_c.await.unwrap();
    producer_i.await.unwrap();
    let report = handle.wait().await.unwrap();

    // Sequential replay of the creation stream
    let mut expected: HashMap<String, String> = seed.into_iter().collect();
    for i in 0..CREATIONS {
        expected.insert(resource(i * 31), format!("cluster-{}", i % 7));
    }

    assert_eq!(registry.snapshot(), expected);
    assert_eq!(report.creations.applied, CREATIONS as u64);
    assert_eq!(report.interruptions.received, 2 * INTERRUPTIONS as u64);
    assert_eq!(report.interruptions.duplicates, INTERRUPTIONS as u64);
    // Every resource is registered from the start and the grace period
    // outlives the test, so every distinct id resolves.
    assert_eq!(report.interruptions.applied, INTERRUPTIONS as u64);
    assert_eq!(counter.total(), INTERRUPTIONS as u64);
}
