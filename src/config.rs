use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::analysis::{
    default_labels, Category, ClusterConfig, FocusConfig, KSelection, DEFAULT_CONFIDENCE_THRESHOLD,
    DEFAULT_FOCUS_THRESHOLD, DEFAULT_MAX_ITERATIONS, DEFAULT_MAX_K,
};
use crate::detect::{BoxOrder, NmsConfig, NmsProfile};
use crate::error::{config_error, PipelineError};
use crate::speech::LOCALE;

const DEFAULT_FRAME_WIDTH: u32 = 640;
const DEFAULT_FRAME_HEIGHT: u32 = 480;
const DEFAULT_MODEL_WIDTH: u32 = 640;
const DEFAULT_MODEL_HEIGHT: u32 = 640;

#[derive(Debug, Deserialize, Default)]
struct PipelineConfigFile {
    frame: Option<FrameConfigFile>,
    model: Option<ModelConfigFile>,
    nms: Option<NmsConfigFile>,
    cluster: Option<ClusterConfigFile>,
    focus: Option<FocusConfigFile>,
    speech: Option<SpeechConfigFile>,
    seed: Option<u64>,
    categories: Option<Vec<Category>>,
}

#[derive(Debug, Deserialize, Default)]
struct FrameConfigFile {
    width: Option<u32>,
    height: Option<u32>,
}

#[derive(Debug, Deserialize, Default)]
struct ModelConfigFile {
    path: Option<PathBuf>,
    input_width: Option<u32>,
    input_height: Option<u32>,
    labels: Option<Vec<String>>,
    box_order: Option<BoxOrder>,
}

#[derive(Debug, Deserialize, Default)]
struct NmsConfigFile {
    profile: Option<NmsProfile>,
    max_output: Option<usize>,
    iou_threshold: Option<f32>,
    score_threshold: Option<f32>,
}

#[derive(Debug, Deserialize, Default)]
struct ClusterConfigFile {
    max_k: Option<usize>,
    max_iterations: Option<usize>,
    selection: Option<KSelection>,
}

#[derive(Debug, Deserialize, Default)]
struct FocusConfigFile {
    focus_threshold: Option<f32>,
    confidence_threshold: Option<f32>,
}

#[derive(Debug, Deserialize, Default)]
struct SpeechConfigFile {
    locale: Option<String>,
    changes_only: Option<bool>,
}

/// Fully resolved pipeline configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    pub frame_width: u32,
    pub frame_height: u32,
    pub model: ModelSettings,
    pub nms_profile: NmsProfile,
    pub nms: NmsConfig,
    pub cluster: ClusterConfig,
    pub focus: FocusConfig,
    pub speech: SpeechSettings,
    /// Fixed seed for centroid initialisation; `None` draws from entropy once.
    pub seed: Option<u64>,
    /// Replacement category table; `None` keeps the built-in grocery table.
    pub categories: Option<Vec<Category>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ModelSettings {
    pub path: Option<PathBuf>,
    pub input_width: u32,
    pub input_height: u32,
    pub labels: Vec<String>,
    pub box_order: BoxOrder,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SpeechSettings {
    pub locale: String,
    pub changes_only: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            frame_width: DEFAULT_FRAME_WIDTH,
            frame_height: DEFAULT_FRAME_HEIGHT,
            model: ModelSettings {
                path: None,
                input_width: DEFAULT_MODEL_WIDTH,
                input_height: DEFAULT_MODEL_HEIGHT,
                labels: default_labels(),
                box_order: BoxOrder::Xyxy,
            },
            nms_profile: NmsProfile::Loose,
            nms: NmsProfile::Loose.config(),
            cluster: ClusterConfig::default(),
            focus: FocusConfig::default(),
            speech: SpeechSettings {
                locale: LOCALE.to_string(),
                changes_only: true,
            },
            seed: None,
            categories: None,
        }
    }
}

impl PipelineConfig {
    /// Load from `GROCERSEE_CONFIG` (if set), apply env overrides, validate.
    pub fn load() -> Result<Self> {
        let config_path = std::env::var("GROCERSEE_CONFIG").ok();
        let file_cfg = match config_path.as_deref() {
            Some(path) if !path.trim().is_empty() => Some(read_config_file(Path::new(path))?),
            _ => None,
        };
        let mut cfg = Self::from_file(file_cfg.unwrap_or_default());
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Load a specific file, without env overrides.
    pub fn from_path(path: &Path) -> Result<Self> {
        let cfg = Self::from_file(read_config_file(path)?);
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: PipelineConfigFile) -> Self {
        let defaults = Self::default();

        let frame = file.frame.unwrap_or_default();
        let model = file.model.unwrap_or_default();
        let nms = file.nms.unwrap_or_default();
        let cluster = file.cluster.unwrap_or_default();
        let focus = file.focus.unwrap_or_default();
        let speech = file.speech.unwrap_or_default();

        let nms_profile = nms.profile.unwrap_or(defaults.nms_profile);
        let base = nms_profile.config();

        Self {
            frame_width: frame.width.unwrap_or(DEFAULT_FRAME_WIDTH),
            frame_height: frame.height.unwrap_or(DEFAULT_FRAME_HEIGHT),
            model: ModelSettings {
                path: model.path,
                input_width: model.input_width.unwrap_or(DEFAULT_MODEL_WIDTH),
                input_height: model.input_height.unwrap_or(DEFAULT_MODEL_HEIGHT),
                labels: model.labels.unwrap_or(defaults.model.labels),
                box_order: model.box_order.unwrap_or_default(),
            },
            nms_profile,
            nms: NmsConfig {
                max_output: nms.max_output.unwrap_or(base.max_output),
                iou_threshold: nms.iou_threshold.unwrap_or(base.iou_threshold),
                score_threshold: nms.score_threshold.unwrap_or(base.score_threshold),
            },
            cluster: ClusterConfig {
                max_k: cluster.max_k.unwrap_or(DEFAULT_MAX_K),
                max_iterations: cluster.max_iterations.unwrap_or(DEFAULT_MAX_ITERATIONS),
                selection: cluster.selection.unwrap_or_default(),
            },
            focus: FocusConfig {
                focus_threshold: focus.focus_threshold.unwrap_or(DEFAULT_FOCUS_THRESHOLD),
                confidence_threshold: focus
                    .confidence_threshold
                    .unwrap_or(DEFAULT_CONFIDENCE_THRESHOLD),
            },
            speech: SpeechSettings {
                locale: speech.locale.unwrap_or(defaults.speech.locale),
                changes_only: speech.changes_only.unwrap_or(defaults.speech.changes_only),
            },
            seed: file.seed,
            categories: file.categories,
        }
    }

    /// Switch NMS profile, discarding per-field overrides.
    pub fn set_nms_profile(&mut self, profile: NmsProfile) {
        self.nms_profile = profile;
        self.nms = profile.config();
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Some(width) = env_parse::<u32>("GROCERSEE_FRAME_WIDTH")? {
            self.frame_width = width;
        }
        if let Some(height) = env_parse::<u32>("GROCERSEE_FRAME_HEIGHT")? {
            self.frame_height = height;
        }
        if let Ok(profile) = std::env::var("GROCERSEE_NMS_PROFILE") {
            if !profile.trim().is_empty() {
                self.set_nms_profile(profile.parse()?);
            }
        }
        if let Some(seed) = env_parse::<u64>("GROCERSEE_SEED")? {
            self.seed = Some(seed);
        }
        if let Ok(path) = std::env::var("GROCERSEE_MODEL_PATH") {
            if !path.trim().is_empty() {
                self.model.path = Some(PathBuf::from(path));
            }
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.frame_width == 0 || self.frame_height == 0 {
            return config_error(format!(
                "frame dimensions must be positive, got {}x{}",
                self.frame_width, self.frame_height
            ));
        }
        if self.model.input_width == 0 || self.model.input_height == 0 {
            return config_error("model input size must be positive");
        }
        if self.model.labels.is_empty() {
            return config_error("label list must not be empty");
        }
        if self.speech.locale.trim().is_empty() {
            return config_error("speech locale must not be empty");
        }
        self.nms.validate()?;
        self.cluster.validate()?;
        Ok(())
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Result<Option<T>> {
    match std::env::var(key) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| PipelineError::configuration(format!("{} must be a number", key)).into()),
        _ => Ok(None),
    }
}

fn read_config_file(path: &Path) -> Result<PipelineConfigFile> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read config file {}: {}", path.display(), e))?;
    let is_toml = path
        .extension()
        .map(|ext| ext.eq_ignore_ascii_case("toml"))
        .unwrap_or(false);
    let cfg = if is_toml {
        toml::from_str(&raw).map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?
    } else {
        serde_json::from_str(&raw)
            .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?
    };
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_loose_profile() {
        let cfg = PipelineConfig::default();
        assert_eq!(cfg.frame_width, 640);
        assert_eq!(cfg.frame_height, 480);
        assert_eq!(cfg.model.labels.len(), 32);
        assert_eq!(cfg.nms.max_output, 500);
        assert_eq!(cfg.nms.score_threshold, 0.2);
        assert_eq!(cfg.cluster.max_k, 5);
        assert_eq!(cfg.speech.locale, "id");
        cfg.validate().unwrap();
    }

    #[test]
    fn profile_field_overrides_apply_on_top() {
        let file: PipelineConfigFile = toml::from_str(
            r#"
            [nms]
            profile = "strict"
            iou_threshold = 0.45
            "#,
        )
        .unwrap();
        let cfg = PipelineConfig::from_file(file);
        assert_eq!(cfg.nms_profile, NmsProfile::Strict);
        assert_eq!(cfg.nms.max_output, 100);
        assert_eq!(cfg.nms.score_threshold, 0.5);
        assert_eq!(cfg.nms.iou_threshold, 0.45);
    }

    #[test]
    fn zero_frame_dimension_fails_validation() {
        let cfg = PipelineConfig {
            frame_height: 0,
            ..PipelineConfig::default()
        };
        let err = cfg.validate().unwrap_err();
        assert!(err
            .downcast_ref::<PipelineError>()
            .map(PipelineError::is_configuration)
            .unwrap_or(false));
    }

    #[test]
    fn fixed_k_selection_parses() {
        let file: PipelineConfigFile = serde_json::from_str(
            r#"{"cluster": {"selection": {"mode": "fixed", "k": 3}}}"#,
        )
        .unwrap();
        let cfg = PipelineConfig::from_file(file);
        assert_eq!(cfg.cluster.selection, KSelection::Fixed(3));
    }
}
