//! K-means over detection features with automatic cluster count.
//!
//! The cluster count is a cheap bimodality probe: one group means the camera
//! is on one thing, two groups means items are spread across the frame. It is
//! picked per frame with an elbow test over the inertia of k = 1..=max_k.

use anyhow::Result;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::analysis::features::{FeatureVector, FEATURE_DIM};
use crate::error::config_error;

pub const DEFAULT_MAX_K: usize = 5;
pub const DEFAULT_MAX_ITERATIONS: usize = 100;

/// How the cluster count is chosen.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "mode", content = "k")]
pub enum KSelection {
    /// Elbow test on inertia drops; yields 1 or 2.
    #[default]
    Elbow,
    /// Always use this k, clamped to `1..=min(n, max_k)`.
    Fixed(usize),
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ClusterConfig {
    pub max_k: usize,
    pub max_iterations: usize,
    pub selection: KSelection,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            max_k: DEFAULT_MAX_K,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            selection: KSelection::Elbow,
        }
    }
}

impl ClusterConfig {
    pub fn validate(&self) -> Result<()> {
        if self.max_k == 0 {
            return config_error("max_k must be >= 1");
        }
        if self.max_iterations == 0 {
            return config_error("max_iterations must be >= 1");
        }
        if let KSelection::Fixed(k) = self.selection {
            if k == 0 || k > self.max_k {
                return config_error(format!(
                    "fixed k must be within 1..={}, got {}",
                    self.max_k, k
                ));
            }
        }
        Ok(())
    }
}

/// Result of one k-means run.
#[derive(Clone, Debug, PartialEq)]
pub struct KMeansRun {
    pub k: usize,
    pub labels: Vec<usize>,
    pub inertia: f32,
    pub iterations: usize,
}

/// Assignment returned for a frame.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Clustering {
    pub k: usize,
    /// One label per input vector, each in `0..k`.
    pub labels: Vec<usize>,
    /// Inertia for each k tried, starting at k = 1. Empty when clustering was skipped.
    pub inertias: Vec<f32>,
}

/// Seedable k-means clusterer.
///
/// The random source only seeds centroids. Construct with a fixed seed for
/// reproducible assignments; the generator advances across frames.
pub struct Clusterer {
    config: ClusterConfig,
    rng: StdRng,
}

impl Clusterer {
    pub fn new(config: ClusterConfig, seed: Option<u64>) -> Result<Self> {
        config.validate()?;
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Ok(Self { config, rng })
    }

    pub fn config(&self) -> &ClusterConfig {
        &self.config
    }

    /// Cluster `features`, picking k automatically.
    pub fn cluster(&mut self, features: &[FeatureVector]) -> Clustering {
        let n = features.len();
        if n < 2 {
            return Clustering {
                k: 1,
                labels: vec![0; n],
                inertias: Vec::new(),
            };
        }

        let max_k = n.min(self.config.max_k);
        let mut runs: Vec<KMeansRun> = Vec::with_capacity(max_k);
        for k in 1..=max_k {
            runs.push(self.kmeans(features, k));
        }
        let inertias: Vec<f32> = runs.iter().map(|r| r.inertia).collect();

        let k = match self.config.selection {
            KSelection::Elbow => elbow_k(&inertias),
            KSelection::Fixed(k) => k.clamp(1, max_k),
        };
        let chosen = runs.swap_remove(k - 1);
        log::debug!(
            "clustered {} detections into k={} (inertias {:?}, {} iterations)",
            n,
            k,
            inertias,
            chosen.iterations
        );
        Clustering {
            k,
            labels: chosen.labels,
            inertias,
        }
    }

    /// Plain k-means with random centroid seeding in `0..1` per component.
    pub fn kmeans(&mut self, features: &[FeatureVector], k: usize) -> KMeansRun {
        let n = features.len();
        let mut centroids: Vec<FeatureVector> = (0..k)
            .map(|_| {
                let mut c = [0.0f32; FEATURE_DIM];
                for v in c.iter_mut() {
                    *v = self.rng.gen::<f32>();
                }
                c
            })
            .collect();

        let mut labels = vec![0usize; n];
        let mut iterations = 0;
        let mut changed = true;

        while changed && iterations < self.config.max_iterations {
            changed = false;

            for (i, point) in features.iter().enumerate() {
                let nearest = nearest_centroid(point, &centroids);
                if labels[i] != nearest {
                    labels[i] = nearest;
                    changed = true;
                }
            }

            let means = cluster_means(features, &labels, k);
            for (centroid, mean) in centroids.iter_mut().zip(means) {
                // Empty clusters hold their previous centroid.
                if let Some(mean) = mean {
                    *centroid = mean;
                }
            }

            iterations += 1;
        }

        let inertia = inertia(features, &labels, k);
        KMeansRun {
            k,
            labels,
            inertia,
            iterations,
        }
    }
}

/// Elbow test: two clusters when the first two inertia drops are within 50%
/// of each other, else one.
pub fn elbow_k(inertias: &[f32]) -> usize {
    let diffs: Vec<f32> = inertias.windows(2).map(|w| w[1] - w[0]).collect();
    if diffs.len() > 1 && (diffs[0] - diffs[1]).abs() < 0.5 * diffs[0].abs() {
        2
    } else {
        1
    }
}

/// Sum of distances from each point to the mean of its cluster.
pub fn inertia(features: &[FeatureVector], labels: &[usize], k: usize) -> f32 {
    let means = cluster_means(features, labels, k);
    features
        .iter()
        .zip(labels)
        .map(|(point, &label)| match &means[label] {
            Some(mean) => euclidean(point, mean),
            None => 0.0,
        })
        .sum()
}

pub fn euclidean(a: &FeatureVector, b: &FeatureVector) -> f32 {
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f32>()
        .sqrt()
}

// Strict comparison: on equal distance the lower centroid index wins.
fn nearest_centroid(point: &FeatureVector, centroids: &[FeatureVector]) -> usize {
    let mut best = 0;
    let mut best_dist = f32::INFINITY;
    for (j, centroid) in centroids.iter().enumerate() {
        let dist = euclidean(point, centroid);
        if dist < best_dist {
            best_dist = dist;
            best = j;
        }
    }
    best
}

fn cluster_means(
    features: &[FeatureVector],
    labels: &[usize],
    k: usize,
) -> Vec<Option<FeatureVector>> {
    let mut sums = vec![[0.0f32; FEATURE_DIM]; k];
    let mut counts = vec![0usize; k];
    for (point, &label) in features.iter().zip(labels) {
        counts[label] += 1;
        for (s, v) in sums[label].iter_mut().zip(point) {
            *s += v;
        }
    }
    sums.into_iter()
        .zip(counts)
        .map(|(mut sum, count)| {
            if count == 0 {
                return None;
            }
            for s in sum.iter_mut() {
                *s /= count as f32;
            }
            Some(sum)
        })
        .collect()
}
