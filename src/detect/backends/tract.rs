#![cfg(feature = "backend-tract")]

use std::path::Path;

use anyhow::{anyhow, Context, Result};
use ndarray::{Array3, ArrayView4};
use tract_onnx::prelude::*;

use crate::detect::backend::InferenceBackend;

/// Tract-based backend for ONNX inference.
///
/// Loads a local YOLO export once and runs it on CPU. No network I/O.
pub struct TractBackend {
    model: TypedRunnableModel<TypedModel>,
    width: usize,
    height: usize,
}

impl TractBackend {
    /// Load an ONNX model from disk, fixing its input to `[1, 3, height, width]`.
    pub fn new<P: AsRef<Path>>(model_path: P, width: u32, height: u32) -> Result<Self> {
        let model_path = model_path.as_ref();
        let model = tract_onnx::onnx()
            .model_for_path(model_path)
            .with_context(|| format!("failed to load ONNX model from {}", model_path.display()))?
            .with_input_fact(
                0,
                InferenceFact::dt_shape(
                    f32::datum_type(),
                    tvec!(1, 3, height as usize, width as usize),
                ),
            )
            .context("failed to set input fact")?
            .into_optimized()
            .context("failed to optimize ONNX model")?
            .into_runnable()
            .context("failed to build runnable ONNX model")?;

        Ok(Self {
            model,
            width: width as usize,
            height: height as usize,
        })
    }

    fn build_input(&self, input: ArrayView4<'_, f32>) -> Result<Tensor> {
        let expected = [1, 3, self.height, self.width];
        if input.shape() != expected {
            return Err(anyhow!(
                "input tensor {:?} does not match model input {:?}",
                input.shape(),
                expected
            ));
        }
        let data: Vec<f32> = input.iter().copied().collect();
        Tensor::from_shape(&expected, &data).context("failed to build input tensor")
    }
}

impl InferenceBackend for TractBackend {
    fn name(&self) -> &'static str {
        "tract"
    }

    fn infer(&mut self, input: ArrayView4<'_, f32>) -> Result<Array3<f32>> {
        let input = self.build_input(input)?;
        let outputs = self
            .model
            .run(tvec!(input.into()))
            .context("ONNX inference failed")?;
        let output = outputs
            .first()
            .ok_or_else(|| anyhow!("model produced no outputs"))?;
        let view = output
            .to_array_view::<f32>()
            .context("model output tensor was not f32")?;
        let shape = view.shape();
        if shape.len() != 3 {
            return Err(anyhow!("model output has rank {}, expected 3", shape.len()));
        }
        let dims = (shape[0], shape[1], shape[2]);
        Array3::from_shape_vec(dims, view.iter().copied().collect())
            .context("failed to copy model output")
    }

    fn warm_up(&mut self) -> Result<()> {
        let blank = ndarray::Array4::<f32>::zeros((1, 3, self.height, self.width));
        self.infer(blank.view()).map(|_| ())
    }
}
