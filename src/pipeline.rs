//! Frame pipeline: raw detector output in, one utterance out.
//!
//! Every stage is built once by [`Pipeline::new`] and reused across frames.
//! Decoding, suppression, features, focus and phrasing are pure. The only
//! state that changes between frames is the clusterer's generator: it keeps
//! advancing, so the same detections fed twice to one `Pipeline` may cluster
//! differently (and get a different k). Two pipelines built with the same
//! seed and fed the same frames agree frame by frame.

use std::sync::Arc;

use anyhow::{Context, Result};
use ndarray::ArrayView3;
use serde::Serialize;

use crate::analysis::{CategoryMap, Clusterer, FeatureBuilder, FocusAnalyzer, FrameResult};
use crate::config::PipelineConfig;
use crate::detect::{Detection, InferenceBackend, Suppressor, TensorDecoder};
use crate::error::config_error;
use crate::frame::{prepare_input, Frame};
use crate::speech::MessageGenerator;

/// Everything observed while processing one frame.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FrameReport {
    /// Candidates in the raw tensor, before suppression.
    pub candidates: usize,
    /// Kept detections, highest score first.
    pub detections: Vec<Detection>,
    pub k: usize,
    /// Cluster label per detection.
    pub cluster_labels: Vec<usize>,
    pub result: FrameResult,
    pub utterance: String,
}

pub struct Pipeline {
    labels: Vec<String>,
    model_width: u32,
    model_height: u32,
    decoder: TensorDecoder,
    suppressor: Suppressor,
    features: FeatureBuilder,
    clusterer: Clusterer,
    focus: FocusAnalyzer,
    messages: MessageGenerator,
}

impl Pipeline {
    /// Build all stages. `seed` takes precedence over `config.seed`.
    pub fn new(config: &PipelineConfig, seed: Option<u64>) -> Result<Self> {
        config.validate()?;
        let messages = MessageGenerator::new();
        if config.speech.locale != messages.locale() {
            return config_error(format!(
                "unsupported locale '{}', only '{}' is available",
                config.speech.locale,
                messages.locale()
            ));
        }

        let categories = match &config.categories {
            Some(table) => CategoryMap::new(table.clone())?,
            None => CategoryMap::groceries(),
        };
        let categories = Arc::new(categories);

        let decoder = TensorDecoder::new(config.model.labels.len(), config.model.box_order)?;
        let suppressor = Suppressor::new(config.nms)?;
        let features = FeatureBuilder::new(config.frame_width, config.frame_height)?;
        let clusterer = Clusterer::new(config.cluster, seed.or(config.seed))?;
        let focus = FocusAnalyzer::new(
            config.focus,
            categories,
            config.frame_width,
            config.frame_height,
        )?;

        log::debug!(
            "pipeline ready: {} labels, frame {}x{}, nms {:?}",
            config.model.labels.len(),
            config.frame_width,
            config.frame_height,
            config.nms
        );

        Ok(Self {
            labels: config.model.labels.clone(),
            model_width: config.model.input_width,
            model_height: config.model.input_height,
            decoder,
            suppressor,
            features,
            clusterer,
            focus,
            messages,
        })
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn locale(&self) -> &'static str {
        self.messages.locale()
    }

    pub fn categories(&self) -> &CategoryMap {
        self.focus.categories()
    }

    /// Decode and suppress one raw output tensor.
    pub fn detect(&self, output: ArrayView3<'_, f32>) -> Result<(usize, Vec<Detection>)> {
        let decoded = self.decoder.decode(output)?;
        let keep = self.suppressor.suppress(&decoded.boxes, &decoded.scores);
        let detections = decoded.gather(&keep, &self.labels);
        log::debug!(
            "decoded {} candidates, kept {}",
            decoded.len(),
            detections.len()
        );
        Ok((decoded.len(), detections))
    }

    /// Cluster, pick the focus and phrase it for already-suppressed detections.
    pub fn report(&mut self, candidates: usize, detections: Vec<Detection>) -> FrameReport {
        let features = self.features.build(&detections);
        let clustering = self.clusterer.cluster(&features);
        let result = self.focus.analyze(&detections, &clustering.labels);
        let labels: Vec<String> = detections.iter().map(|d| d.label.clone()).collect();
        let utterance = self.messages.generate(&result, &labels);
        log::debug!(
            "frame result {} (k={}, {} detections)",
            result.tag(),
            clustering.k,
            detections.len()
        );
        FrameReport {
            candidates,
            detections,
            k: clustering.k,
            cluster_labels: clustering.labels,
            result,
            utterance,
        }
    }

    pub fn analyze(&mut self, detections: &[Detection]) -> FrameResult {
        self.report(detections.len(), detections.to_vec()).result
    }

    pub fn describe(&mut self, detections: &[Detection]) -> String {
        self.report(detections.len(), detections.to_vec()).utterance
    }

    /// Full pass over one raw `[1, 4 + C, D]` tensor.
    pub fn process_output(&mut self, output: ArrayView3<'_, f32>) -> Result<FrameReport> {
        let (candidates, detections) = self.detect(output)?;
        Ok(self.report(candidates, detections))
    }

    /// Prepare `frame`, run `backend` on it, process the output.
    pub fn run_frame<B>(&mut self, backend: &mut B, frame: &Frame) -> Result<FrameReport>
    where
        B: InferenceBackend + ?Sized,
    {
        let input = prepare_input(frame, self.model_width, self.model_height)?;
        let output = backend.infer(input.view()).with_context(|| {
            format!(
                "{} backend failed on frame {}",
                backend.name(),
                frame.sequence
            )
        })?;
        self.process_output(output.view())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::Category;
    use crate::detect::{ScriptedBox, StubBackend};
    use crate::error::PipelineError;

    fn pipeline() -> Pipeline {
        Pipeline::new(&PipelineConfig::default(), Some(7)).unwrap()
    }

    fn label_index(pipeline: &Pipeline, label: &str) -> usize {
        pipeline.labels().iter().position(|l| l == label).unwrap()
    }

    #[test]
    fn stub_scene_runs_end_to_end() -> Result<()> {
        let mut pipeline = pipeline();
        let tomat = label_index(&pipeline, "tomat");
        let mut backend = StubBackend::new(pipeline.labels().len())
            .with_scenes(vec![vec![ScriptedBox::new(
                [320.0, 240.0, 300.0, 300.0],
                tomat,
                0.9,
            )]])
            .with_padding(10);
        let frame = Frame::solid(64, 48, 1, [0, 0, 0])?;
        let report = pipeline.run_frame(&mut backend, &frame)?;
        assert_eq!(report.candidates, 11);
        assert_eq!(report.detections.len(), 1);
        assert_eq!(
            report.result,
            FrameResult::SingleFocus {
                item: "tomat".to_string()
            }
        );
        assert_eq!(report.utterance, "Terlihat tomat di depan Anda");
        Ok(())
    }

    #[test]
    fn wrong_channel_count_is_a_configuration_error() {
        let mut pipeline = pipeline();
        let output = ndarray::Array3::<f32>::zeros((1, 10, 4));
        let err = pipeline.process_output(output.view()).unwrap_err();
        assert!(err
            .downcast_ref::<PipelineError>()
            .map(PipelineError::is_configuration)
            .unwrap_or(false));
    }

    #[test]
    fn unsupported_locale_is_rejected() {
        let mut config = PipelineConfig::default();
        config.speech.locale = "en".to_string();
        assert!(Pipeline::new(&config, None).is_err());
    }

    #[test]
    fn category_override_is_used() -> Result<()> {
        let mut config = PipelineConfig::default();
        config.categories = Some(vec![Category {
            name: "merah".to_string(),
            items: vec!["tomat".to_string(), "cabai_kecil".to_string()],
        }]);
        let pipeline = Pipeline::new(&config, Some(1))?;
        assert_eq!(pipeline.categories().category_of("tomat"), "merah");
        assert_eq!(pipeline.categories().category_of("wortel"), "lainnya");
        Ok(())
    }

    #[test]
    fn generator_state_carries_across_frames() {
        let detections = vec![
            Detection::new([0.0, 0.0, 60.0, 60.0], "tomat", 0.9),
            Detection::new([10.0, 5.0, 70.0, 65.0], "tomat", 0.8),
            Detection::new([500.0, 380.0, 620.0, 470.0], "ikan", 0.75),
        ];
        let mut a = pipeline();
        let mut b = pipeline();
        let a_first = a.report(3, detections.clone());
        let a_second = a.report(3, detections.clone());
        let b_first = b.report(3, detections.clone());
        let b_second = b.report(3, detections);
        // Same seed, same frame sequence: identical reports at each position.
        assert_eq!(a_first, b_first);
        assert_eq!(a_second, b_second);
        // Stages other than clustering do not depend on call order.
        assert_eq!(a_first.detections, a_second.detections);
    }

    #[test]
    fn describe_empty_frame() {
        assert_eq!(
            pipeline().describe(&[]),
            "Silakan arahkan kamera ke bahan makanan"
        );
    }
}
