//! Greedy non-max suppression.

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::error::config_error;

/// Suppression parameters.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct NmsConfig {
    /// Maximum number of detections emitted.
    pub max_output: usize,
    /// Candidates overlapping a kept box with IoU at or above this are dropped.
    pub iou_threshold: f32,
    /// Candidates scoring below this are never emitted.
    pub score_threshold: f32,
}

/// Named parameter sets. The detector ships two operating modes and neither
/// is canonical, so both are selectable.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NmsProfile {
    /// Up to 500 boxes, score >= 0.2.
    #[default]
    Loose,
    /// Up to 100 boxes, score >= 0.5.
    Strict,
}

impl NmsProfile {
    pub fn config(self) -> NmsConfig {
        match self {
            NmsProfile::Loose => NmsConfig {
                max_output: 500,
                iou_threshold: 0.3,
                score_threshold: 0.2,
            },
            NmsProfile::Strict => NmsConfig {
                max_output: 100,
                iou_threshold: 0.3,
                score_threshold: 0.5,
            },
        }
    }
}

impl std::str::FromStr for NmsProfile {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "loose" => Ok(NmsProfile::Loose),
            "strict" => Ok(NmsProfile::Strict),
            other => config_error(format!(
                "unknown NMS profile '{}' (expected loose or strict)",
                other
            )),
        }
    }
}

impl Default for NmsConfig {
    fn default() -> Self {
        NmsProfile::default().config()
    }
}

impl NmsConfig {
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.iou_threshold) {
            return config_error(format!(
                "iou threshold must be within 0..=1, got {}",
                self.iou_threshold
            ));
        }
        if !self.score_threshold.is_finite() {
            return config_error("score threshold must be finite");
        }
        Ok(())
    }
}

/// IoU of two corner-form rows. Works for either corner order as long as
/// both rows use the same one.
pub fn iou(a: &[f32; 4], b: &[f32; 4]) -> f32 {
    let (a_lo0, a_hi0) = (a[0].min(a[2]), a[0].max(a[2]));
    let (a_lo1, a_hi1) = (a[1].min(a[3]), a[1].max(a[3]));
    let (b_lo0, b_hi0) = (b[0].min(b[2]), b[0].max(b[2]));
    let (b_lo1, b_hi1) = (b[1].min(b[3]), b[1].max(b[3]));

    let inter0 = (a_hi0.min(b_hi0) - a_lo0.max(b_lo0)).max(0.0);
    let inter1 = (a_hi1.min(b_hi1) - a_lo1.max(b_lo1)).max(0.0);
    let inter = inter0 * inter1;
    if inter <= 0.0 {
        return 0.0;
    }

    let area_a = (a_hi0 - a_lo0) * (a_hi1 - a_lo1);
    let area_b = (b_hi0 - b_lo0) * (b_hi1 - b_lo1);
    let union = area_a + area_b - inter;
    if union <= 0.0 {
        return 0.0;
    }
    inter / union
}

/// Greedy suppressor.
#[derive(Clone, Copy, Debug, Default)]
pub struct Suppressor {
    config: NmsConfig,
}

impl Suppressor {
    pub fn new(config: NmsConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &NmsConfig {
        &self.config
    }

    /// Indices of the retained candidates, highest score first.
    ///
    /// Equal scores keep input order, so the output is reproducible.
    pub fn suppress(&self, boxes: &[[f32; 4]], scores: &[f32]) -> Vec<usize> {
        let n = boxes.len().min(scores.len());
        let mut order: Vec<usize> = (0..n)
            .filter(|&i| scores[i] >= self.config.score_threshold)
            .collect();
        // Stable: ties stay in input order.
        order.sort_by(|&a, &b| {
            scores[b]
                .partial_cmp(&scores[a])
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        let mut kept: Vec<usize> = Vec::new();
        'candidates: for i in order {
            if kept.len() >= self.config.max_output {
                break;
            }
            for &k in &kept {
                if iou(&boxes[k], &boxes[i]) >= self.config.iou_threshold {
                    continue 'candidates;
                }
            }
            kept.push(i);
        }
        kept
    }
}
