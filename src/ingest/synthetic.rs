use anyhow::{anyhow, Result};

use super::{FrameSource, SourceConfig, SourceStats};
use crate::frame::Frame;

/// Synthetic source for `stub://` URIs.
///
/// Emits a shifting gradient; the scene changes every 50 frames.
pub struct SyntheticSource {
    config: SourceConfig,
    frame_count: u64,
    scene_state: u8,
}

impl SyntheticSource {
    pub fn new(config: SourceConfig) -> Result<Self> {
        if config.width == 0 || config.height == 0 {
            return Err(anyhow!(
                "synthetic frames must not be empty, got {}x{}",
                config.width,
                config.height
            ));
        }
        log::info!("SyntheticSource: opened {}", config.uri);
        Ok(Self {
            config,
            frame_count: 0,
            scene_state: 0,
        })
    }

    fn generate_pixels(&mut self) -> Vec<u8> {
        let pixel_count = self.config.width as usize * self.config.height as usize * 3;
        if self.frame_count % 50 == 0 {
            self.scene_state = self.scene_state.wrapping_add(1);
        }
        (0..pixel_count)
            .map(|i| ((i as u64 + self.frame_count + self.scene_state as u64) % 256) as u8)
            .collect()
    }
}

impl FrameSource for SyntheticSource {
    fn next_frame(&mut self) -> Result<Frame> {
        self.frame_count += 1;
        let pixels = self.generate_pixels();
        Frame::new(
            self.config.width,
            self.config.height,
            self.frame_count,
            pixels,
        )
    }

    fn stats(&self) -> SourceStats {
        SourceStats {
            frames_captured: self.frame_count,
            uri: self.config.uri.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frames_are_numbered_and_vary() -> Result<()> {
        let mut source = SyntheticSource::new(SourceConfig {
            uri: "stub://test".to_string(),
            width: 4,
            height: 2,
        })?;
        let a = source.next_frame()?;
        let b = source.next_frame()?;
        assert_eq!(a.sequence, 1);
        assert_eq!(b.sequence, 2);
        assert_eq!(a.pixels().len(), 24);
        assert_ne!(a.pixels(), b.pixels());
        assert_eq!(source.stats().frames_captured, 2);
        Ok(())
    }

    #[test]
    fn scene_advances_every_fifty_frames() -> Result<()> {
        let mut source = SyntheticSource::new(SourceConfig {
            uri: "stub://test".to_string(),
            width: 1,
            height: 1,
        })?;
        for _ in 0..49 {
            source.next_frame()?;
        }
        assert_eq!(source.scene_state, 0);
        source.next_frame()?;
        assert_eq!(source.scene_state, 1);
        for _ in 0..50 {
            source.next_frame()?;
        }
        assert_eq!(source.scene_state, 2);
        Ok(())
    }

    #[test]
    fn empty_dimensions_are_rejected() {
        let cfg = SourceConfig {
            width: 0,
            ..SourceConfig::default()
        };
        assert!(SyntheticSource::new(cfg).is_err());
    }
}
