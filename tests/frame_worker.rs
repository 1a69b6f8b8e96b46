use std::time::{Duration, Instant};

use anyhow::{anyhow, Result};
use ndarray::{Array3, ArrayView4};

use grocersee::detect::ScriptedBox;
use grocersee::{
    Frame, FrameWorker, InferenceBackend, Pipeline, PipelineConfig, RecordingSpeaker,
    StubBackend, WorkerStats,
};

/// Stub backend that takes a while per frame.
struct SlowBackend {
    inner: StubBackend,
    delay: Duration,
}

impl InferenceBackend for SlowBackend {
    fn name(&self) -> &'static str {
        "slow-stub"
    }

    fn infer(&mut self, input: ArrayView4<'_, f32>) -> Result<Array3<f32>> {
        std::thread::sleep(self.delay);
        self.inner.infer(input)
    }
}

/// Fails every frame.
struct BrokenBackend;

impl InferenceBackend for BrokenBackend {
    fn name(&self) -> &'static str {
        "broken"
    }

    fn infer(&mut self, _input: ArrayView4<'_, f32>) -> Result<Array3<f32>> {
        Err(anyhow!("accelerator unavailable"))
    }
}

fn pipeline() -> Pipeline {
    Pipeline::new(&PipelineConfig::default(), Some(3)).expect("pipeline")
}

fn tomato_backend(pipeline: &Pipeline) -> StubBackend {
    let tomat = pipeline
        .labels()
        .iter()
        .position(|l| l == "tomat")
        .expect("tomat label");
    StubBackend::new(pipeline.labels().len()).with_scenes(vec![vec![ScriptedBox::new(
        [320.0, 240.0, 300.0, 300.0],
        tomat,
        0.9,
    )]])
}

fn frame(sequence: u64) -> Frame {
    Frame::solid(32, 24, sequence, [0, 0, 0]).expect("frame")
}

fn wait_idle(worker: &FrameWorker) -> WorkerStats {
    let deadline = Instant::now() + Duration::from_secs(10);
    loop {
        let stats = worker.stats();
        if stats.processed + stats.failed + stats.dropped == stats.offered
            || Instant::now() >= deadline
        {
            return stats;
        }
        std::thread::sleep(Duration::from_millis(10));
    }
}

#[test]
fn busy_worker_drops_stale_frames() -> Result<()> {
    let pipeline = pipeline();
    let backend = SlowBackend {
        inner: tomato_backend(&pipeline),
        delay: Duration::from_millis(200),
    };
    let speaker = RecordingSpeaker::new();
    let worker = FrameWorker::spawn(pipeline, backend, speaker.clone())?;

    for seq in 1..=6 {
        worker.offer(frame(seq))?;
    }

    let stats = wait_idle(&worker);
    assert_eq!(stats.offered, 6);
    assert!(stats.dropped >= 4, "stats: {:?}", stats);
    assert_eq!(stats.processed + stats.dropped, 6);
    assert_eq!(stats.failed, 0);

    let final_stats = worker.shutdown()?;
    assert_eq!(final_stats, stats);

    let transcript = speaker.transcript();
    assert_eq!(transcript.len() as u64, stats.processed);
    assert!(transcript
        .iter()
        .all(|u| u == "Terlihat tomat di depan Anda"));
    Ok(())
}

#[test]
fn every_frame_is_processed_when_not_busy() -> Result<()> {
    let pipeline = pipeline();
    let backend = tomato_backend(&pipeline);
    let speaker = RecordingSpeaker::new();
    let worker = FrameWorker::spawn(pipeline, backend, speaker.clone())?;

    for seq in 1..=3 {
        worker.offer(frame(seq))?;
        let stats = wait_idle(&worker);
        assert_eq!(stats.processed, seq);
    }
    let stats = worker.shutdown()?;
    assert_eq!(stats.dropped, 0);
    assert_eq!(speaker.transcript().len(), 3);
    Ok(())
}

#[test]
fn backend_failures_are_counted_and_not_spoken() -> Result<()> {
    let speaker = RecordingSpeaker::new();
    let worker = FrameWorker::spawn(pipeline(), BrokenBackend, speaker.clone())?;

    worker.offer(frame(1))?;
    let stats = wait_idle(&worker);
    assert_eq!(stats.failed, 1);
    assert_eq!(stats.processed, 0);

    worker.shutdown()?;
    assert!(speaker.transcript().is_empty());
    Ok(())
}
