use anyhow::Result;

use crate::detect::Detection;
use crate::error::config_error;

/// Components per feature vector: `cx', cy', w', h', score`.
pub const FEATURE_DIM: usize = 5;

pub type FeatureVector = [f32; FEATURE_DIM];

const POSITION_WEIGHT: f32 = 1.5;
const SIZE_WEIGHT: f32 = 2.0;
const SCORE_WEIGHT: f32 = 1.0;

/// Maps detections into the clustering feature space.
///
/// Center and size are normalized against the frame and weighted so that
/// box size counts more than position when grouping.
#[derive(Clone, Copy, Debug)]
pub struct FeatureBuilder {
    frame_width: f32,
    frame_height: f32,
}

impl FeatureBuilder {
    pub fn new(frame_width: u32, frame_height: u32) -> Result<Self> {
        if frame_width == 0 || frame_height == 0 {
            return config_error(format!(
                "frame dimensions must be positive, got {}x{}",
                frame_width, frame_height
            ));
        }
        Ok(Self {
            frame_width: frame_width as f32,
            frame_height: frame_height as f32,
        })
    }

    pub fn frame_area(&self) -> f32 {
        self.frame_width * self.frame_height
    }

    pub fn feature(&self, det: &Detection) -> FeatureVector {
        let (cx, cy) = det.bbox.center();
        [
            cx / self.frame_width * POSITION_WEIGHT,
            cy / self.frame_height * POSITION_WEIGHT,
            det.bbox.width() / self.frame_width * SIZE_WEIGHT,
            det.bbox.height() / self.frame_height * SIZE_WEIGHT,
            det.score * SCORE_WEIGHT,
        ]
    }

    /// One vector per detection, same order.
    pub fn build(&self, detections: &[Detection]) -> Vec<FeatureVector> {
        detections.iter().map(|d| self.feature(d)).collect()
    }
}
