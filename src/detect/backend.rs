use anyhow::Result;
use ndarray::{Array3, ArrayView4};

/// Inference backend trait.
///
/// The network is opaque to the rest of the crate: a backend receives one
/// prepared input tensor (`[1, 3, H, W]`, values in `0..=1`) and returns the
/// raw detector head output (`[1, 4 + C, D]`). Decoding, suppression and
/// everything after it happen outside the backend.
pub trait InferenceBackend: Send {
    /// Backend identifier.
    fn name(&self) -> &'static str;

    /// Run the network on one prepared frame.
    fn infer(&mut self, input: ArrayView4<'_, f32>) -> Result<Array3<f32>>;

    /// Optional warm-up hook, run once before the first frame.
    fn warm_up(&mut self) -> Result<()> {
        Ok(())
    }
}

impl<B: InferenceBackend + ?Sized> InferenceBackend for Box<B> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn infer(&mut self, input: ArrayView4<'_, f32>) -> Result<Array3<f32>> {
        (**self).infer(input)
    }

    fn warm_up(&mut self) -> Result<()> {
        (**self).warm_up()
    }
}
