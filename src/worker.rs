//! Background frame worker.
//!
//! The camera side offers frames into a [`LatestFrame`] slot; a single worker
//! thread takes the newest one, runs the pipeline and speaks the result. At
//! most one frame is in flight, and frames that arrive while it is busy
//! replace each other.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use anyhow::{anyhow, Context, Result};

use crate::detect::InferenceBackend;
use crate::frame::{Frame, LatestFrame};
use crate::pipeline::Pipeline;
use crate::speech::Speaker;

/// Worker counters. `offered = processed + failed + dropped` once idle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct WorkerStats {
    pub offered: u64,
    pub processed: u64,
    pub dropped: u64,
    pub failed: u64,
}

#[derive(Default)]
struct Counters {
    processed: AtomicU64,
    failed: AtomicU64,
}

pub struct FrameWorker {
    slot: Arc<LatestFrame>,
    counters: Arc<Counters>,
    handle: Option<JoinHandle<()>>,
}

impl FrameWorker {
    /// Warm up `backend`, then start the worker thread.
    pub fn spawn<B, S>(mut pipeline: Pipeline, mut backend: B, mut speaker: S) -> Result<Self>
    where
        B: InferenceBackend + 'static,
        S: Speaker + 'static,
    {
        backend
            .warm_up()
            .with_context(|| format!("{} backend warm-up failed", backend.name()))?;
        log::info!("frame worker using {} backend", backend.name());

        let slot = Arc::new(LatestFrame::new());
        let counters = Arc::new(Counters::default());

        let handle = {
            let slot = slot.clone();
            let counters = counters.clone();
            thread::Builder::new()
                .name("grocersee-worker".to_string())
                .spawn(move || {
                    let locale = pipeline.locale();
                    loop {
                        let frame = match slot.take() {
                            Ok(Some(frame)) => frame,
                            Ok(None) => break,
                            Err(e) => {
                                log::error!("frame worker stopping: {}", e);
                                break;
                            }
                        };
                        let report = match pipeline.run_frame(&mut backend, &frame) {
                            Ok(report) => report,
                            Err(e) => {
                                counters.failed.fetch_add(1, Ordering::Relaxed);
                                log::error!("frame {} failed: {:#}", frame.sequence, e);
                                continue;
                            }
                        };
                        counters.processed.fetch_add(1, Ordering::Relaxed);
                        if let Err(e) = speaker.speak(&report.utterance, locale) {
                            log::warn!("speech failed for frame {}: {:#}", frame.sequence, e);
                        }
                    }
                    log::debug!("frame worker exited");
                })
                .context("failed to spawn frame worker thread")?
        };

        Ok(Self {
            slot,
            counters,
            handle: Some(handle),
        })
    }

    /// Hand over the newest frame. Returns true when a pending frame was dropped.
    pub fn offer(&self, frame: Frame) -> Result<bool> {
        let sequence = frame.sequence;
        let replaced = self.slot.offer(frame)?;
        if replaced {
            log::warn!("pipeline busy, dropped frame before {}", sequence);
        }
        Ok(replaced)
    }

    pub fn stats(&self) -> WorkerStats {
        let slot = self.slot.stats();
        WorkerStats {
            offered: slot.offered,
            processed: self.counters.processed.load(Ordering::Relaxed),
            dropped: slot.dropped,
            failed: self.counters.failed.load(Ordering::Relaxed),
        }
    }

    /// Close the slot, wait for the in-flight frame, join the thread.
    pub fn shutdown(mut self) -> Result<WorkerStats> {
        self.stop()?;
        Ok(self.stats())
    }

    fn stop(&mut self) -> Result<()> {
        self.slot.close()?;
        if let Some(handle) = self.handle.take() {
            handle
                .join()
                .map_err(|_| anyhow!("frame worker thread panicked"))?;
        }
        Ok(())
    }
}

impl Drop for FrameWorker {
    fn drop(&mut self) {
        if let Err(e) = self.stop() {
            log::error!("frame worker shutdown failed: {}", e);
        }
    }
}
