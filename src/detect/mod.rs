mod backend;
mod backends;
mod decode;
mod nms;
mod result;

pub use backend::InferenceBackend;
#[cfg(feature = "backend-tract")]
pub use backends::TractBackend;
pub use backends::{ScriptedBox, StubBackend};
pub use decode::{DecodedTensor, TensorDecoder};
pub use nms::{iou, NmsConfig, NmsProfile, Suppressor};
pub use result::{BBox, BoxOrder, Detection};
