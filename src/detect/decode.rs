//! YOLO output tensor decoding.
//!
//! A YOLOv8-style head emits `[1, 4 + C, D]`: four box channels
//! (`x_center, y_center, width, height`) followed by one confidence channel
//! per class, for each of `D` candidates. Decoding collapses the class
//! channels to one score and one class index per candidate and converts boxes
//! to corner form. Nothing is thresholded here.

use anyhow::Result;
use ndarray::{ArrayView3, Axis};

use crate::detect::result::{BBox, BoxOrder, Detection};
use crate::error::config_error;

/// Parallel per-candidate arrays produced by [`TensorDecoder::decode`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DecodedTensor {
    /// Corner-form rows in `order`.
    pub boxes: Vec<[f32; 4]>,
    /// Max over the class channels.
    pub scores: Vec<f32>,
    /// Arg-max over the class channels; first maximum wins.
    pub class_ids: Vec<usize>,
    pub order: BoxOrder,
}

impl DecodedTensor {
    pub fn len(&self) -> usize {
        self.scores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }

    /// Gather the kept candidates into detections, in `keep` order.
    pub fn gather(&self, keep: &[usize], labels: &[String]) -> Vec<Detection> {
        keep.iter()
            .filter_map(|&i| {
                let label = labels.get(self.class_ids[i])?;
                Some(Detection {
                    bbox: self.order.unpack(self.boxes[i]),
                    label: label.clone(),
                    score: self.scores[i],
                })
            })
            .collect()
    }
}

/// Decoder bound to one label set.
#[derive(Clone, Debug)]
pub struct TensorDecoder {
    num_classes: usize,
    order: BoxOrder,
}

impl TensorDecoder {
    pub fn new(num_classes: usize, order: BoxOrder) -> Result<Self> {
        if num_classes == 0 {
            return config_error("label list must not be empty");
        }
        Ok(Self { num_classes, order })
    }

    pub fn num_classes(&self) -> usize {
        self.num_classes
    }

    /// Channels the model output must carry.
    pub fn expected_channels(&self) -> usize {
        4 + self.num_classes
    }

    pub fn order(&self) -> BoxOrder {
        self.order
    }

    /// Check the tensor shape against the configured label set.
    pub fn check_shape(&self, shape: &[usize]) -> Result<()> {
        if shape.len() != 3 {
            return config_error(format!(
                "detector output must be rank 3 [1, {}, D], got shape {:?}",
                self.expected_channels(),
                shape
            ));
        }
        if shape[0] != 1 {
            return config_error(format!(
                "detector output batch must be 1, got {}",
                shape[0]
            ));
        }
        if shape[1] != self.expected_channels() {
            return config_error(format!(
                "detector output has {} channels but {} labels need {}",
                shape[1],
                self.num_classes,
                self.expected_channels()
            ));
        }
        Ok(())
    }

    pub fn decode(&self, output: ArrayView3<'_, f32>) -> Result<DecodedTensor> {
        self.check_shape(output.shape())?;

        let channels = output.index_axis(Axis(0), 0);
        let candidates = channels.len_of(Axis(1));
        let mut decoded = DecodedTensor {
            boxes: Vec::with_capacity(candidates),
            scores: Vec::with_capacity(candidates),
            class_ids: Vec::with_capacity(candidates),
            order: self.order,
        };

        for column in channels.axis_iter(Axis(1)) {
            let (cx, cy, w, h) = (column[0], column[1], column[2], column[3]);

            let mut best_class = 0usize;
            let mut best_score = f32::NEG_INFINITY;
            for (class_id, &score) in column.iter().skip(4).enumerate() {
                if score > best_score {
                    best_score = score;
                    best_class = class_id;
                }
            }

            let bbox = BBox::from_center(cx, cy, w, h);
            decoded
                .boxes
                .push(self.order.pack(bbox.x1, bbox.y1, bbox.x2, bbox.y2));
            decoded.scores.push(best_score);
            decoded.class_ids.push(best_class);
        }

        log::trace!("decoded {} candidates", decoded.len());
        Ok(decoded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PipelineError;
    use ndarray::Array3;

    fn tensor(num_classes: usize, columns: &[([f32; 4], usize, f32)]) -> Array3<f32> {
        let mut t = Array3::<f32>::zeros((1, 4 + num_classes, columns.len()));
        for (d, (xywh, class_id, score)) in columns.iter().enumerate() {
            for c in 0..4 {
                t[[0, c, d]] = xywh[c];
            }
            t[[0, 4 + class_id, d]] = *score;
        }
        t
    }

    #[test]
    fn spike_channel_sets_class_and_score() {
        let t = tensor(5, &[([150.0, 150.0, 100.0, 100.0], 3, 0.87)]);
        let decoder = TensorDecoder::new(5, BoxOrder::Xyxy).unwrap();
        let out = decoder.decode(t.view()).unwrap();

        assert_eq!(out.len(), 1);
        assert_eq!(out.class_ids[0], 3);
        assert_eq!(out.scores[0], 0.87);
        assert_eq!(out.boxes[0], [100.0, 100.0, 200.0, 200.0]);
    }

    #[test]
    fn yxyx_order_swaps_axes() {
        let t = tensor(2, &[([50.0, 20.0, 10.0, 4.0], 1, 0.5)]);
        let decoder = TensorDecoder::new(2, BoxOrder::Yxyx).unwrap();
        let out = decoder.decode(t.view()).unwrap();
        assert_eq!(out.boxes[0], [18.0, 45.0, 22.0, 55.0]);
    }

    #[test]
    fn boxes_match_center_form_conversion() {
        let xywh = [33.5, 71.25, 17.0, 9.5];
        let t = tensor(2, &[(xywh, 0, 0.6)]);
        let out = TensorDecoder::new(2, BoxOrder::Xyxy)
            .unwrap()
            .decode(t.view())
            .unwrap();
        let expected = BBox::from_center(xywh[0], xywh[1], xywh[2], xywh[3]);
        assert_eq!(BoxOrder::Xyxy.unpack(out.boxes[0]), expected);
    }

    #[test]
    fn tied_class_channels_pick_the_first() {
        let mut t = tensor(3, &[([0.0, 0.0, 1.0, 1.0], 2, 0.4)]);
        t[[0, 5, 0]] = 0.4;
        let decoder = TensorDecoder::new(3, BoxOrder::Xyxy).unwrap();
        let out = decoder.decode(t.view()).unwrap();
        assert_eq!(out.class_ids[0], 1);
    }

    #[test]
    fn channel_mismatch_is_a_configuration_error() {
        let t = Array3::<f32>::zeros((1, 36, 10));
        let decoder = TensorDecoder::new(31, BoxOrder::Xyxy).unwrap();
        let err = decoder.decode(t.view()).unwrap_err();
        let typed = err.downcast_ref::<PipelineError>().unwrap();
        assert!(typed.is_configuration());
    }

    #[test]
    fn batch_other_than_one_is_rejected() {
        let t = Array3::<f32>::zeros((2, 6, 3));
        let decoder = TensorDecoder::new(2, BoxOrder::Xyxy).unwrap();
        assert!(decoder.decode(t.view()).is_err());
    }

    #[test]
    fn empty_label_set_is_rejected() {
        assert!(TensorDecoder::new(0, BoxOrder::Xyxy).is_err());
    }

    #[test]
    fn zero_candidates_decode_to_nothing() {
        let t = Array3::<f32>::zeros((1, 6, 0));
        let decoder = TensorDecoder::new(2, BoxOrder::Xyxy).unwrap();
        assert!(decoder.decode(t.view()).unwrap().is_empty());
    }

    #[test]
    fn gather_maps_class_ids_to_labels() {
        let t = tensor(
            2,
            &[
                ([10.0, 10.0, 4.0, 4.0], 0, 0.3),
                ([50.0, 50.0, 4.0, 4.0], 1, 0.9),
            ],
        );
        let decoder = TensorDecoder::new(2, BoxOrder::Yxyx).unwrap();
        let out = decoder.decode(t.view()).unwrap();
        let labels = vec!["kubis".to_string(), "tomat".to_string()];
        let dets = out.gather(&[1, 0], &labels);
        assert_eq!(dets[0].label, "tomat");
        assert_eq!(dets[0].bbox.x1, 48.0);
        assert_eq!(dets[1].label, "kubis");
    }
}
