//! Frame analysis: features, clustering, focus.

mod categories;
mod cluster;
mod features;
mod focus;

pub use categories::{default_labels, Category, CategoryMap, DEFAULT_LABELS, OTHER_CATEGORY};
pub use cluster::{
    elbow_k, euclidean, inertia, ClusterConfig, Clusterer, Clustering, KMeansRun, KSelection,
    DEFAULT_MAX_ITERATIONS, DEFAULT_MAX_K,
};
pub use features::{FeatureBuilder, FeatureVector, FEATURE_DIM};
pub use focus::{
    ClusterSalience, FocusAnalyzer, FocusConfig, FrameResult, DEFAULT_CONFIDENCE_THRESHOLD,
    DEFAULT_FOCUS_THRESHOLD,
};
