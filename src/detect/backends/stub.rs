use anyhow::{anyhow, Result};
use ndarray::{Array3, ArrayView4};

use crate::detect::backend::InferenceBackend;

/// One scripted candidate: center-form box plus a single class spike.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScriptedBox {
    pub cx: f32,
    pub cy: f32,
    pub w: f32,
    pub h: f32,
    pub class_id: usize,
    pub score: f32,
}

impl ScriptedBox {
    pub fn new(xywh: [f32; 4], class_id: usize, score: f32) -> Self {
        Self {
            cx: xywh[0],
            cy: xywh[1],
            w: xywh[2],
            h: xywh[3],
            class_id,
            score,
        }
    }
}

/// Stub backend for tests and `stub://` runs.
///
/// Ignores the pixels and replays scripted scenes in a loop, one scene per
/// call. Every scene is padded with `padding` empty candidates so the tensor
/// looks like a real head with background anchors.
pub struct StubBackend {
    num_classes: usize,
    scenes: Vec<Vec<ScriptedBox>>,
    padding: usize,
    cursor: usize,
}

impl StubBackend {
    pub fn new(num_classes: usize) -> Self {
        Self {
            num_classes,
            scenes: vec![Vec::new()],
            padding: 0,
            cursor: 0,
        }
    }

    /// Replace the scene list. An empty list behaves like one empty scene.
    pub fn with_scenes(mut self, scenes: Vec<Vec<ScriptedBox>>) -> Self {
        self.scenes = if scenes.is_empty() {
            vec![Vec::new()]
        } else {
            scenes
        };
        self.cursor = 0;
        self
    }

    pub fn with_padding(mut self, padding: usize) -> Self {
        self.padding = padding;
        self
    }

    /// Render one scene into a `[1, 4 + C, D]` tensor.
    pub fn render(&self, scene: &[ScriptedBox]) -> Result<Array3<f32>> {
        let channels = 4 + self.num_classes;
        let mut out = Array3::<f32>::zeros((1, channels, scene.len() + self.padding));
        for (d, b) in scene.iter().enumerate() {
            if b.class_id >= self.num_classes {
                return Err(anyhow!(
                    "scripted class {} outside {} classes",
                    b.class_id,
                    self.num_classes
                ));
            }
            out[[0, 0, d]] = b.cx;
            out[[0, 1, d]] = b.cy;
            out[[0, 2, d]] = b.w;
            out[[0, 3, d]] = b.h;
            out[[0, 4 + b.class_id, d]] = b.score;
        }
        Ok(out)
    }
}

impl InferenceBackend for StubBackend {
    fn name(&self) -> &'static str {
        "stub"
    }

    fn infer(&mut self, _input: ArrayView4<'_, f32>) -> Result<Array3<f32>> {
        let scene = &self.scenes[self.cursor % self.scenes.len()];
        let out = self.render(scene)?;
        self.cursor = self.cursor.wrapping_add(1);
        Ok(out)
    }
}
