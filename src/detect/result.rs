use serde::{Deserialize, Serialize};

/// Corner order of decoded box rows.
///
/// The decoder emits rows in this order and the suppressor is agnostic to it;
/// gathering into `Detection` converts back to `x1, y1, x2, y2`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BoxOrder {
    #[default]
    Xyxy,
    Yxyx,
}

impl BoxOrder {
    /// Lay out corners in this order.
    pub fn pack(self, x1: f32, y1: f32, x2: f32, y2: f32) -> [f32; 4] {
        match self {
            BoxOrder::Xyxy => [x1, y1, x2, y2],
            BoxOrder::Yxyx => [y1, x1, y2, x2],
        }
    }

    /// Read a row laid out in this order back into a box.
    pub fn unpack(self, row: [f32; 4]) -> BBox {
        match self {
            BoxOrder::Xyxy => BBox::new(row[0], row[1], row[2], row[3]),
            BoxOrder::Yxyx => BBox::new(row[1], row[0], row[3], row[2]),
        }
    }
}

/// Axis-aligned box in pixel space, corners `x1, y1, x2, y2`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f32; 4]", into = "[f32; 4]")]
pub struct BBox {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
}

impl BBox {
    pub fn new(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// Build from center form, the way YOLO heads encode boxes.
    pub fn from_center(cx: f32, cy: f32, w: f32, h: f32) -> Self {
        let x1 = cx - w / 2.0;
        let y1 = cy - h / 2.0;
        Self::new(x1, y1, x1 + w, y1 + h)
    }

    pub fn width(&self) -> f32 {
        (self.x2 - self.x1).abs()
    }

    pub fn height(&self) -> f32 {
        (self.y2 - self.y1).abs()
    }

    pub fn center(&self) -> (f32, f32) {
        ((self.x1 + self.x2) / 2.0, (self.y1 + self.y2) / 2.0)
    }

    pub fn area(&self) -> f32 {
        self.width() * self.height()
    }
}

impl From<[f32; 4]> for BBox {
    fn from(v: [f32; 4]) -> Self {
        BBox::new(v[0], v[1], v[2], v[3])
    }
}

impl From<BBox> for [f32; 4] {
    fn from(b: BBox) -> Self {
        [b.x1, b.y1, b.x2, b.y2]
    }
}

/// One surviving detection of a frame.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    #[serde(rename = "box")]
    pub bbox: BBox,
    pub label: String,
    pub score: f32,
}

impl Detection {
    pub fn new(bbox: impl Into<BBox>, label: impl Into<String>, score: f32) -> Self {
        Self {
            bbox: bbox.into(),
            label: label.into(),
            score,
        }
    }
}
