//! Frame sources.
//!
//! - `stub://<name>`: synthetic frames, no camera needed.
//! - a local image file, or a directory of images, replayed in a loop.
//!
//! Only local paths are accepted; URL schemes other than `stub://` are rejected.

mod image_file;
mod synthetic;

use anyhow::{anyhow, Result};

use crate::frame::Frame;

pub use image_file::ImageFileSource;
pub use synthetic::SyntheticSource;

/// Configuration for a frame source.
#[derive(Clone, Debug)]
pub struct SourceConfig {
    /// `stub://<name>` or a local path.
    pub uri: String,
    /// Width of synthetic frames.
    pub width: u32,
    /// Height of synthetic frames.
    pub height: u32,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            uri: "stub://shelf".to_string(),
            width: 640,
            height: 480,
        }
    }
}

/// Source counters.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SourceStats {
    pub frames_captured: u64,
    pub uri: String,
}

/// Produces camera frames.
pub trait FrameSource: Send {
    fn next_frame(&mut self) -> Result<Frame>;

    fn stats(&self) -> SourceStats;
}

impl<S: FrameSource + ?Sized> FrameSource for Box<S> {
    fn next_frame(&mut self) -> Result<Frame> {
        (**self).next_frame()
    }

    fn stats(&self) -> SourceStats {
        (**self).stats()
    }
}

/// Open the source named by `config.uri`.
pub fn open_source(config: SourceConfig) -> Result<Box<dyn FrameSource>> {
    if !is_local_uri(&config.uri) {
        return Err(anyhow!(
            "frame sources only support local paths or stub:// (got {})",
            config.uri
        ));
    }
    if config.uri.starts_with("stub://") {
        Ok(Box::new(SyntheticSource::new(config)?))
    } else {
        Ok(Box::new(ImageFileSource::open(&config.uri)?))
    }
}

fn is_local_uri(uri: &str) -> bool {
    if uri.trim().is_empty() {
        return false;
    }
    if uri.starts_with("stub://") {
        return true;
    }
    !uri.contains("://")
}
