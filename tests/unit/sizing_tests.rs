/*!
 * Tests for pool and batch sizing
 */

use catalogtl::app_config::PipelineConfig;
use catalogtl::pipeline::batcher::{batch_count, chunk_ids};
use catalogtl::pipeline::SizingPolicy;
use catalogtl::system_probe::FixedProbe;

fn ids(count: usize) -> Vec<String> {
    (0..count).map(|i| format!("id{}", i)).collect()
}

#[test]
fn test_rawBatchSize_withRamPressure_shouldStepDown() {
    assert_eq!(SizingPolicy::raw_batch_size(40.0), 50);
    assert_eq!(SizingPolicy::raw_batch_size(60.0), 25);
    assert_eq!(SizingPolicy::raw_batch_size(90.0), 10);
}

#[test]
fn test_plan_withDefaultCeiling_shouldCapBatchAndWorkers() {
    let policy = SizingPolicy::from_config(&PipelineConfig::default());

    let idle = policy.plan(&FixedProbe::new(16, 40.0));
    assert_eq!((idle.workers, idle.batch_size), (4, 20));

    let busy = policy.plan(&FixedProbe::new(2, 90.0));
    assert_eq!((busy.workers, busy.batch_size), (2, 10));
}

#[test]
fn test_plan_withOverrides_shouldUseFixedValues() {
    let config = PipelineConfig {
        worker_override: Some(3),
        batch_size_override: Some(7),
        ..PipelineConfig::default()
    };
    let plan = SizingPolicy::from_config(&config).plan_with_overrides(&FixedProbe::new(1, 95.0), &config);
    assert_eq!((plan.workers, plan.batch_size), (3, 7));
}

#[test]
fn test_chunkIds_with45Ids_batch20_shouldYield20_20_5() {
    let chunks = chunk_ids(ids(45), 20);
    let sizes: Vec<_> = chunks.iter().map(Vec::len).collect();
    assert_eq!(sizes, vec![20, 20, 5]);
    assert_eq!(chunks[2][4], "id44");
    assert_eq!(batch_count(45, 20), 3);
}

#[test]
fn test_chunkIds_withNoIds_shouldYieldNoBatches() {
    assert!(chunk_ids(Vec::new(), 20).is_empty());
    assert_eq!(batch_count(0, 20), 0);
}
