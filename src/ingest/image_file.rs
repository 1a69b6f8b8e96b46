use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};

use super::{FrameSource, SourceStats};
use crate::frame::Frame;

const IMAGE_EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "png"];

/// Replays local still images as frames.
///
/// A file path yields that image forever; a directory yields its images in
/// file-name order, wrapping around. Images are decoded on every read.
pub struct ImageFileSource {
    uri: String,
    paths: Vec<PathBuf>,
    frame_count: u64,
}

impl ImageFileSource {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let paths = if path.is_dir() {
            let mut paths: Vec<PathBuf> = std::fs::read_dir(path)
                .with_context(|| format!("failed to read image directory {}", path.display()))?
                .filter_map(|entry| entry.ok().map(|e| e.path()))
                .filter(|p| is_image(p))
                .collect();
            paths.sort();
            paths
        } else if path.is_file() {
            vec![path.to_path_buf()]
        } else {
            return Err(anyhow!("image source {} does not exist", path.display()));
        };
        if paths.is_empty() {
            return Err(anyhow!("no images found in {}", path.display()));
        }
        log::info!(
            "ImageFileSource: {} image(s) from {}",
            paths.len(),
            path.display()
        );
        Ok(Self {
            uri: path.display().to_string(),
            paths,
            frame_count: 0,
        })
    }
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            IMAGE_EXTENSIONS
                .iter()
                .any(|known| ext.eq_ignore_ascii_case(known))
        })
        .unwrap_or(false)
}

impl FrameSource for ImageFileSource {
    fn next_frame(&mut self) -> Result<Frame> {
        let path = &self.paths[(self.frame_count % self.paths.len() as u64) as usize];
        let image = image::open(path)
            .with_context(|| format!("failed to decode image {}", path.display()))?
            .to_rgb8();
        self.frame_count += 1;
        Frame::from_image(image, self.frame_count)
    }

    fn stats(&self) -> SourceStats {
        SourceStats {
            frames_captured: self.frame_count,
            uri: self.uri.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    #[test]
    fn directory_images_cycle_in_name_order() -> Result<()> {
        let dir = tempfile::tempdir()?;
        RgbImage::from_pixel(3, 2, Rgb([10, 20, 30])).save(dir.path().join("b.png"))?;
        RgbImage::from_pixel(2, 2, Rgb([1, 2, 3])).save(dir.path().join("a.png"))?;
        std::fs::write(dir.path().join("notes.txt"), "ignored")?;

        let mut source = ImageFileSource::open(dir.path())?;
        let first = source.next_frame()?;
        let second = source.next_frame()?;
        let third = source.next_frame()?;
        assert_eq!((first.width, first.height), (2, 2));
        assert_eq!(&first.pixels()[..3], &[1, 2, 3]);
        assert_eq!((second.width, second.height), (3, 2));
        assert_eq!(third.pixels(), first.pixels());
        assert_eq!(third.sequence, 3);
        Ok(())
    }

    #[test]
    fn missing_path_is_an_error() {
        assert!(ImageFileSource::open("/nonexistent/grocersee/shelf.png").is_err());
    }

    #[test]
    fn empty_directory_is_an_error() -> Result<()> {
        let dir = tempfile::tempdir()?;
        assert!(ImageFileSource::open(dir.path()).is_err());
        Ok(())
    }
}
