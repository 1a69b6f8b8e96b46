//! Camera frames and the hand-off between the frame producer and the pipeline.
//!
//! - `Frame`: one RGB8 camera frame.
//! - `LatestFrame`: a one-slot buffer. A newer frame replaces a pending one
//!   instead of queueing behind it, so a slow pipeline drops frames rather
//!   than falling behind the camera.
//! - `prepare_input`: letterbox, resize and scale a frame into the `[1, 3, H, W]`
//!   tensor the detector expects.

use std::sync::{Condvar, Mutex};

use anyhow::{anyhow, Context, Result};
use image::imageops::{self, FilterType};
use image::{ImageBuffer, Rgb, RgbImage};
use ndarray::Array4;

/// One RGB8 frame, row-major, 3 bytes per pixel.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Frame {
    pub width: u32,
    pub height: u32,
    pub sequence: u64,
    pixels: Vec<u8>,
}

impl Frame {
    pub fn new(width: u32, height: u32, sequence: u64, pixels: Vec<u8>) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(anyhow!("frame must not be empty, got {}x{}", width, height));
        }
        let expected = (width as usize)
            .checked_mul(height as usize)
            .and_then(|v| v.checked_mul(3))
            .ok_or_else(|| anyhow!("frame dimensions overflow"))?;
        if pixels.len() != expected {
            return Err(anyhow!(
                "expected {} RGB bytes for {}x{}, received {}",
                expected,
                width,
                height,
                pixels.len()
            ));
        }
        Ok(Self {
            width,
            height,
            sequence,
            pixels,
        })
    }

    /// Uniform frame of one color.
    pub fn solid(width: u32, height: u32, sequence: u64, rgb: [u8; 3]) -> Result<Self> {
        let pixels = rgb
            .iter()
            .copied()
            .cycle()
            .take(width as usize * height as usize * 3)
            .collect();
        Self::new(width, height, sequence, pixels)
    }

    pub fn from_image(image: RgbImage, sequence: u64) -> Result<Self> {
        let (width, height) = image.dimensions();
        Self::new(width, height, sequence, image.into_raw())
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }
}

/// Pad to a square with black on the right/bottom, resize bilinearly to the
/// model input, scale to `0..=1`, lay out NCHW.
pub fn prepare_input(frame: &Frame, model_width: u32, model_height: u32) -> Result<Array4<f32>> {
    if model_width == 0 || model_height == 0 {
        return Err(anyhow!(
            "model input must not be empty, got {}x{}",
            model_width,
            model_height
        ));
    }
    let view: ImageBuffer<Rgb<u8>, &[u8]> =
        ImageBuffer::from_raw(frame.width, frame.height, frame.pixels())
            .context("frame buffer does not match its dimensions")?;

    let side = frame.width.max(frame.height);
    let mut padded = RgbImage::new(side, side);
    imageops::replace(&mut padded, &view, 0, 0);

    let resized = imageops::resize(&padded, model_width, model_height, FilterType::Triangle);
    let input = Array4::from_shape_fn(
        (1, 3, model_height as usize, model_width as usize),
        |(_, channel, y, x)| resized.get_pixel(x as u32, y as u32)[channel] as f32 / 255.0,
    );
    Ok(input)
}

/// Counters for a [`LatestFrame`] slot.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SlotStats {
    pub offered: u64,
    pub taken: u64,
    pub dropped: u64,
}

#[derive(Default)]
struct SlotState {
    pending: Option<Frame>,
    closed: bool,
    stats: SlotStats,
}

/// One-slot, overwrite-on-offer frame buffer.
#[derive(Default)]
pub struct LatestFrame {
    state: Mutex<SlotState>,
    ready: Condvar,
}

impl LatestFrame {
    pub fn new() -> Self {
        Self::default()
    }

    /// Offer a frame. Returns true when it replaced a frame nobody took.
    /// Frames offered after `close` are discarded.
    pub fn offer(&self, frame: Frame) -> Result<bool> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| anyhow!("frame slot lock poisoned"))?;
        if state.closed {
            return Ok(false);
        }
        state.stats.offered += 1;
        let replaced = state.pending.replace(frame).is_some();
        if replaced {
            state.stats.dropped += 1;
        }
        drop(state);
        self.ready.notify_one();
        Ok(replaced)
    }

    /// Block until a frame is pending, then take it. `None` once closed.
    pub fn take(&self) -> Result<Option<Frame>> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| anyhow!("frame slot lock poisoned"))?;
        loop {
            if let Some(frame) = state.pending.take() {
                state.stats.taken += 1;
                return Ok(Some(frame));
            }
            if state.closed {
                return Ok(None);
            }
            state = self
                .ready
                .wait(state)
                .map_err(|_| anyhow!("frame slot lock poisoned"))?;
        }
    }

    /// Take a pending frame without waiting.
    pub fn try_take(&self) -> Result<Option<Frame>> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| anyhow!("frame slot lock poisoned"))?;
        let frame = state.pending.take();
        if frame.is_some() {
            state.stats.taken += 1;
        }
        Ok(frame)
    }

    /// Stop accepting frames and wake a waiting consumer. A pending frame is discarded.
    pub fn close(&self) -> Result<()> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| anyhow!("frame slot lock poisoned"))?;
        state.closed = true;
        if state.pending.take().is_some() {
            state.stats.dropped += 1;
        }
        drop(state);
        self.ready.notify_all();
        Ok(())
    }

    pub fn stats(&self) -> SlotStats {
        self.state.lock().map(|s| s.stats).unwrap_or_default()
    }
}
