use std::sync::Arc;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::analysis::categories::CategoryMap;
use crate::detect::Detection;
use crate::error::config_error;

pub const DEFAULT_FOCUS_THRESHOLD: f32 = 0.3;
pub const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 0.7;

/// What a frame shows, as far as the spoken summary is concerned.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "message_type", rename_all = "snake_case")]
pub enum FrameResult {
    NoDetection,
    SingleFocus { item: String },
    /// Categories in first-seen order, no duplicates.
    CategorySummary { categories: Vec<String> },
}

impl FrameResult {
    /// Serialized tag of this variant.
    pub fn tag(&self) -> &'static str {
        match self {
            FrameResult::NoDetection => "no_detection",
            FrameResult::SingleFocus { .. } => "single_focus",
            FrameResult::CategorySummary { .. } => "category_summary",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct FocusConfig {
    /// Dominant cluster salience must exceed this to count as a focus.
    pub focus_threshold: f32,
    /// Detections must score above this to contribute a category.
    pub confidence_threshold: f32,
}

impl Default for FocusConfig {
    fn default() -> Self {
        Self {
            focus_threshold: DEFAULT_FOCUS_THRESHOLD,
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
        }
    }
}

/// Salience of one cluster, in first-seen order.
#[derive(Clone, Debug, PartialEq)]
pub struct ClusterSalience {
    pub label: usize,
    pub salience: f32,
    pub members: Vec<usize>,
}

/// Turns clustered detections into a [`FrameResult`].
#[derive(Clone, Debug)]
pub struct FocusAnalyzer {
    config: FocusConfig,
    categories: Arc<CategoryMap>,
    frame_area: f32,
}

impl FocusAnalyzer {
    pub fn new(
        config: FocusConfig,
        categories: Arc<CategoryMap>,
        frame_width: u32,
        frame_height: u32,
    ) -> Result<Self> {
        if frame_width == 0 || frame_height == 0 {
            return config_error(format!(
                "frame dimensions must be positive, got {}x{}",
                frame_width, frame_height
            ));
        }
        for (name, value) in [
            ("focus_threshold", config.focus_threshold),
            ("confidence_threshold", config.confidence_threshold),
        ] {
            if !value.is_finite() || value < 0.0 {
                return config_error(format!("{} must be >= 0, got {}", name, value));
            }
        }
        Ok(Self {
            config,
            categories,
            frame_area: frame_width as f32 * frame_height as f32,
        })
    }

    pub fn categories(&self) -> &CategoryMap {
        &self.categories
    }

    /// Per-cluster salience: sum of (box area / frame area) * score.
    pub fn saliences(&self, detections: &[Detection], labels: &[usize]) -> Vec<ClusterSalience> {
        let mut clusters: Vec<ClusterSalience> = Vec::new();
        for (i, (det, &label)) in detections.iter().zip(labels).enumerate() {
            let weight = det.bbox.area() / self.frame_area * det.score;
            match clusters.iter_mut().find(|c| c.label == label) {
                Some(cluster) => {
                    cluster.salience += weight;
                    cluster.members.push(i);
                }
                None => clusters.push(ClusterSalience {
                    label,
                    salience: weight,
                    members: vec![i],
                }),
            }
        }
        clusters
    }

    pub fn analyze(&self, detections: &[Detection], labels: &[usize]) -> FrameResult {
        if detections.is_empty() {
            return FrameResult::NoDetection;
        }
        // A lone detection is the focus no matter how small it appears.
        if detections.len() == 1 {
            return FrameResult::SingleFocus {
                item: detections[0].label.clone(),
            };
        }

        let clusters = self.saliences(detections, labels);

        // Strict comparison: the first cluster seen wins a tie.
        let mut dominant: Option<&ClusterSalience> = None;
        let mut max_salience = 0.0f32;
        for cluster in &clusters {
            if cluster.salience > max_salience {
                max_salience = cluster.salience;
                dominant = Some(cluster);
            }
        }

        if let Some(cluster) = dominant {
            if cluster.salience > self.config.focus_threshold {
                let first = &detections[cluster.members[0]].label;
                let uniform = cluster
                    .members
                    .iter()
                    .all(|&i| &detections[i].label == first);
                if uniform {
                    log::debug!(
                        "dominant cluster {} salience {:.3} focused on {}",
                        cluster.label,
                        cluster.salience,
                        first
                    );
                    return FrameResult::SingleFocus {
                        item: first.clone(),
                    };
                }
            }
        }

        let mut categories: Vec<String> = Vec::new();
        for det in detections {
            if det.score > self.config.confidence_threshold {
                let category = self.categories.category_of(&det.label);
                if !categories.iter().any(|c| c == category) {
                    categories.push(category.to_string());
                }
            }
        }
        FrameResult::CategorySummary { categories }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn analyzer() -> FocusAnalyzer {
        FocusAnalyzer::new(
            FocusConfig::default(),
            Arc::new(CategoryMap::groceries()),
            640,
            480,
        )
        .unwrap()
    }

    #[test]
    fn no_detections_yield_no_detection() {
        assert_eq!(analyzer().analyze(&[], &[]), FrameResult::NoDetection);
    }

    #[test]
    fn single_detection_is_always_the_focus() {
        let dets = vec![Detection::new([0.0, 0.0, 5.0, 5.0], "jahe", 0.25)];
        assert_eq!(
            analyzer().analyze(&dets, &[0]),
            FrameResult::SingleFocus {
                item: "jahe".to_string()
            }
        );
    }

    #[test]
    fn large_uniform_cluster_is_the_focus() {
        // Two close-ups of cabbage filling most of the frame.
        let dets = vec![
            Detection::new([0.0, 0.0, 320.0, 480.0], "kubis", 0.9),
            Detection::new([320.0, 0.0, 640.0, 480.0], "kubis", 0.8),
        ];
        assert_eq!(
            analyzer().analyze(&dets, &[0, 0]),
            FrameResult::SingleFocus {
                item: "kubis".to_string()
            }
        );
    }

    #[test]
    fn mixed_dominant_cluster_falls_back_to_categories() {
        let dets = vec![
            Detection::new([0.0, 0.0, 320.0, 480.0], "kubis", 0.9),
            Detection::new([320.0, 0.0, 640.0, 480.0], "udang", 0.8),
            Detection::new([0.0, 0.0, 10.0, 10.0], "garam", 0.5),
        ];
        assert_eq!(
            analyzer().analyze(&dets, &[0, 0, 1]),
            FrameResult::CategorySummary {
                categories: vec!["sayuran".to_string(), "seafood".to_string()]
            }
        );
    }

    #[test]
    fn small_clusters_summarize_in_first_seen_order() {
        let dets = vec![
            Detection::new([0.0, 0.0, 50.0, 50.0], "udang", 0.9),
            Detection::new([500.0, 400.0, 560.0, 460.0], "tomat", 0.8),
            Detection::new([200.0, 200.0, 240.0, 240.0], "ikan", 0.95),
            Detection::new([300.0, 300.0, 340.0, 340.0], "sabun", 0.75),
        ];
        assert_eq!(
            analyzer().analyze(&dets, &[0, 1, 0, 1]),
            FrameResult::CategorySummary {
                categories: vec![
                    "seafood".to_string(),
                    "sayuran".to_string(),
                    "lainnya".to_string()
                ]
            }
        );
    }

    #[test]
    fn low_confidence_summary_can_be_empty() {
        let dets = vec![
            Detection::new([0.0, 0.0, 50.0, 50.0], "udang", 0.6),
            Detection::new([500.0, 400.0, 560.0, 460.0], "tomat", 0.7),
        ];
        assert_eq!(
            analyzer().analyze(&dets, &[0, 0]),
            FrameResult::CategorySummary { categories: vec![] }
        );
    }

    #[test]
    fn equal_salience_tie_goes_to_first_seen_cluster() {
        let dets = vec![
            Detection::new([0.0, 0.0, 320.0, 480.0], "kubis", 0.8),
            Detection::new([320.0, 0.0, 640.0, 480.0], "wortel", 0.8),
        ];
        assert_eq!(
            analyzer().analyze(&dets, &[1, 0]),
            FrameResult::SingleFocus {
                item: "kubis".to_string()
            }
        );
    }

    #[test]
    fn saliences_accumulate_per_cluster() {
        let dets = vec![
            Detection::new([0.0, 0.0, 64.0, 48.0], "a", 1.0),
            Detection::new([0.0, 0.0, 64.0, 48.0], "b", 0.5),
            Detection::new([0.0, 0.0, 64.0, 48.0], "c", 1.0),
        ];
        let s = analyzer().saliences(&dets, &[1, 0, 1]);
        assert_eq!(s.len(), 2);
        assert_eq!(s[0].label, 1);
        assert_eq!(s[0].members, vec![0, 2]);
        assert!((s[0].salience - 0.02).abs() < 1e-6);
        assert!((s[1].salience - 0.005).abs() < 1e-6);
    }

    #[test]
    fn zero_frame_is_rejected() {
        let r = FocusAnalyzer::new(
            FocusConfig::default(),
            Arc::new(CategoryMap::groceries()),
            640,
            0,
        );
        assert!(r.is_err());
    }

    #[test]
    fn frame_result_serializes_with_tag() {
        let r = FrameResult::SingleFocus {
            item: "tomat".to_string(),
        };
        let json = serde_json::to_value(&r).unwrap();
        assert_eq!(json["message_type"], "single_focus");
        assert_eq!(r.tag(), "single_focus");
    }
}
