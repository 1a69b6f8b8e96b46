//! grocersee - spoken grocery assistant loop
//!
//! Reads frames from a source, keeps only the newest one while the pipeline
//! is busy, and speaks one sentence per processed frame.

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use grocersee::detect::ScriptedBox;
use grocersee::speech::{ChangesOnly, HELP_PHRASE};
use grocersee::{
    open_source, FrameWorker, InferenceBackend, LogSpeaker, NmsProfile, Pipeline,
    PipelineConfig, SourceConfig, Speaker, StubBackend,
};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Frame source: `stub://<name>` or a local image file / directory.
    #[arg(long, default_value = "stub://shelf")]
    source: String,
    /// ONNX model path (requires the backend-tract feature).
    #[arg(long, env = "GROCERSEE_MODEL_PATH")]
    model: Option<PathBuf>,
    /// Frames per second fed to the worker.
    #[arg(long, default_value_t = 10)]
    fps: u32,
    /// Stop after this many frames (0 = until Ctrl-C).
    #[arg(long, default_value_t = 0)]
    frames: u64,
    /// Seed for centroid initialisation.
    #[arg(long)]
    seed: Option<u64>,
    /// NMS profile: loose or strict.
    #[arg(long)]
    profile: Option<NmsProfile>,
    /// Speak the usage hint once before starting.
    #[arg(long)]
    help_prompt: bool,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    if args.fps == 0 {
        return Err(anyhow!("fps must be >= 1"));
    }

    let mut cfg = PipelineConfig::load()?;
    if let Some(profile) = args.profile {
        cfg.set_nms_profile(profile);
    }
    if let Some(model) = args.model.clone() {
        cfg.model.path = Some(model);
    }

    let pipeline = Pipeline::new(&cfg, args.seed)?;
    let backend = build_backend(&cfg, pipeline.labels())?;

    let mut speaker: Box<dyn Speaker> = if cfg.speech.changes_only {
        Box::new(ChangesOnly::new(LogSpeaker::new()))
    } else {
        Box::new(LogSpeaker::new())
    };
    if args.help_prompt {
        speaker.speak(HELP_PHRASE, pipeline.locale())?;
    }

    let mut source = open_source(SourceConfig {
        uri: args.source.clone(),
        width: cfg.frame_width,
        height: cfg.frame_height,
    })?;

    let worker = FrameWorker::spawn(pipeline, backend, speaker)?;

    let running = Arc::new(AtomicBool::new(true));
    {
        let running = running.clone();
        ctrlc::set_handler(move || running.store(false, Ordering::SeqCst))
            .context("error setting Ctrl-C handler")?;
    }

    log::info!(
        "grocersee running: source={} fps={} nms={:?}",
        args.source,
        args.fps,
        cfg.nms_profile
    );

    let interval = Duration::from_secs_f64(1.0 / args.fps as f64);
    let mut last_health_log = Instant::now();
    let mut sent = 0u64;

    while running.load(Ordering::SeqCst) && (args.frames == 0 || sent < args.frames) {
        let tick = Instant::now();
        let frame = source.next_frame()?;
        worker.offer(frame)?;
        sent += 1;

        if last_health_log.elapsed() >= Duration::from_secs(5) {
            let stats = worker.stats();
            log::info!(
                "source={} captured={} processed={} dropped={} failed={}",
                source.stats().uri,
                source.stats().frames_captured,
                stats.processed,
                stats.dropped,
                stats.failed
            );
            last_health_log = Instant::now();
        }

        if let Some(rest) = interval.checked_sub(tick.elapsed()) {
            std::thread::sleep(rest);
        }
    }

    log::info!("stopping frame worker...");
    let stats = worker.shutdown()?;
    log::info!(
        "done: offered={} processed={} dropped={} failed={}",
        stats.offered,
        stats.processed,
        stats.dropped,
        stats.failed
    );
    Ok(())
}

fn build_backend(cfg: &PipelineConfig, labels: &[String]) -> Result<Box<dyn InferenceBackend>> {
    if let Some(path) = &cfg.model.path {
        #[cfg(feature = "backend-tract")]
        {
            let backend = grocersee::TractBackend::new(
                path,
                cfg.model.input_width,
                cfg.model.input_height,
            )?;
            return Ok(Box::new(backend));
        }
        #[cfg(not(feature = "backend-tract"))]
        {
            return Err(anyhow!(
                "model {} given but grocersee was built without the backend-tract feature",
                path.display()
            ));
        }
    }
    log::warn!("no model configured, using the scripted stub backend");
    Ok(Box::new(demo_backend(labels)))
}

/// A few shelf scenes for `stub://` runs, in model input coordinates.
fn demo_backend(labels: &[String]) -> StubBackend {
    let class = |name: &str| labels.iter().position(|l| l == name).unwrap_or(0);
    StubBackend::new(labels.len())
        .with_scenes(vec![
            vec![ScriptedBox::new([320.0, 300.0, 420.0, 380.0], class("tomat"), 0.92)],
            vec![
                ScriptedBox::new([100.0, 120.0, 90.0, 80.0], class("wortel"), 0.88),
                ScriptedBox::new([520.0, 140.0, 80.0, 90.0], class("ayam"), 0.81),
                ScriptedBox::new([300.0, 420.0, 70.0, 60.0], class("udang"), 0.76),
            ],
            Vec::new(),
        ])
        .with_padding(64)
}
