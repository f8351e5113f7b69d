use crate::FlybyError;
use crate::logi;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AspectRatio {
    Landscape,
    Portrait,
}

impl AspectRatio {
    pub fn for_size(width: u32, height: u32) -> Self {
        if width >= height {
            AspectRatio::Landscape
        } else {
            AspectRatio::Portrait
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AspectRatio::Landscape => "16:9",
            AspectRatio::Portrait => "9:16",
        }
    }

    fn parts(self) -> (u64, u64) {
        match self {
            AspectRatio::Landscape => (16, 9),
            AspectRatio::Portrait => (9, 16),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropBox {
    pub left: u32,
    pub top: u32,
    pub width: u32,
    pub height: u32,
}

/// Largest centered box of the target ratio that fits inside `width` x `height`.
pub fn crop_box(width: u32, height: u32) -> Result<(CropBox, AspectRatio), FlybyError> {
    let aspect = AspectRatio::for_size(width, height);
    let (rw, rh) = aspect.parts();
    let (w, h) = (width as u64, height as u64);

    let (new_w, new_h) = if w * rh > h * rw {
        (h * rw / rh, h)
    } else {
        (w, w * rh / rw)
    };
    if new_w == 0 || new_h == 0 {
        return Err(FlybyError::DegenerateCrop { width, height });
    }

    let crop = CropBox {
        left: ((w - new_w) / 2) as u32,
        top: ((h - new_h) / 2) as u32,
        width: new_w as u32,
        height: new_h as u32,
    };
    Ok((crop, aspect))
}

#[derive(Debug, Clone)]
pub struct PreparedImage {
    pub path: PathBuf,
    pub width: u32,
    pub height: u32,
    pub aspect: AspectRatio,
}

pub fn crop_path_for(source: &Path) -> PathBuf {
    let name = source
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    source.with_file_name(format!("crop_{}", name))
}

pub fn crop_to_flyby_aspect(source: &Path) -> Result<PreparedImage> {
    let img = image::open(source)
        .with_context(|| format!("Failed to open image {}", source.display()))?;
    let (crop, aspect) = crop_box(img.width(), img.height())?;

    let out = crop_path_for(source);
    img.crop_imm(crop.left, crop.top, crop.width, crop.height)
        .save(&out)
        .with_context(|| format!("Failed to save cropped image {}", out.display()))?;

    logi(format!(
        "Cropped {} ({}x{}) -> {} ({}x{}, {})",
        source.display(),
        img.width(),
        img.height(),
        out.display(),
        crop.width,
        crop.height,
        aspect.as_str()
    ));

    Ok(PreparedImage {
        path: out,
        width: crop.width,
        height: crop.height,
        aspect,
    })
}

pub async fn prepare_image(source: &Path) -> Result<PreparedImage> {
    let source = source.to_path_buf();
    tokio::task::spawn_blocking(move || crop_to_flyby_aspect(&source))
        .await
        .context("Image crop task panicked")?
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    fn assert_ratio(crop: &CropBox, aspect: AspectRatio) {
        let (rw, rh) = aspect.parts();
        let (w, h) = (crop.width as u64, crop.height as u64);
        // Integer truncation can shave less than one unit off either side.
        let lhs = w * rh;
        let rhs = h * rw;
        assert!(lhs.abs_diff(rhs) < rw.max(rh), "{}x{} is not {}", w, h, aspect.as_str());
    }

    fn assert_centered(crop: &CropBox, width: u32, height: u32) {
        let right = width - crop.width - crop.left;
        let bottom = height - crop.height - crop.top;
        assert!(crop.left.abs_diff(right) <= 1);
        assert!(crop.top.abs_diff(bottom) <= 1);
    }

    #[test]
    fn crop_picks_orientation_and_stays_centered() {
        let sizes = [
            (1920, 1080),
            (4000, 3000),
            (3000, 4000),
            (1080, 1920),
            (1000, 1000),
            (5000, 1000),
            (1000, 5000),
            (641, 479),
            (17, 1),
        ];
        for (w, h) in sizes {
            let (crop, aspect) = crop_box(w, h).unwrap();
            let expected = if w >= h { AspectRatio::Landscape } else { AspectRatio::Portrait };
            assert_eq!(aspect, expected, "{}x{}", w, h);
            assert!(crop.width <= w && crop.height <= h);
            assert_ratio(&crop, aspect);
            assert_centered(&crop, w, h);
        }
    }

    #[test]
    fn already_sixteen_nine_is_untouched() {
        let (crop, aspect) = crop_box(1920, 1080).unwrap();
        assert_eq!(aspect, AspectRatio::Landscape);
        assert_eq!(crop, CropBox { left: 0, top: 0, width: 1920, height: 1080 });
    }

    #[test]
    fn four_three_loses_top_and_bottom() {
        let (crop, _) = crop_box(400, 300).unwrap();
        assert_eq!(crop, CropBox { left: 0, top: 37, width: 400, height: 225 });
    }

    #[test]
    fn tiny_image_is_degenerate() {
        assert!(matches!(crop_box(1, 1), Err(FlybyError::DegenerateCrop { .. })));
    }

    #[test]
    fn crop_path_is_a_prefixed_sibling() {
        assert_eq!(
            crop_path_for(Path::new("trees/oak.jpg")),
            PathBuf::from("trees/crop_oak.jpg")
        );
        assert_eq!(crop_path_for(Path::new("oak.png")), PathBuf::from("crop_oak.png"));
    }

    #[test]
    fn crop_writes_centered_pixels() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("tree.png");
        let img = RgbImage::from_fn(300, 400, |x, y| Rgb([x as u8, y as u8, 7]));
        img.save(&src).unwrap();

        let prepared = crop_to_flyby_aspect(&src).unwrap();
        assert_eq!(prepared.path, dir.path().join("crop_tree.png"));
        assert_eq!(prepared.aspect, AspectRatio::Portrait);
        assert_eq!((prepared.width, prepared.height), (225, 400));

        let out = image::open(&prepared.path).unwrap().to_rgb8();
        assert_eq!(out.dimensions(), (225, 400));
        // left margin is (300 - 225) / 2 = 37
        assert_eq!(out.get_pixel(0, 0), &Rgb([37, 0, 7]));
        assert_eq!(out.get_pixel(224, 10), &Rgb([(37 + 224) as u8, 10, 7]));
    }

    #[test]
    fn missing_source_fails() {
        let dir = tempfile::tempdir().unwrap();
        assert!(crop_to_flyby_aspect(&dir.path().join("nope.jpg")).is_err());
    }

    #[tokio::test]
    async fn prepare_runs_off_the_runtime_thread() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("wide.png");
        RgbImage::new(160, 120).save(&src).unwrap();
        let prepared = prepare_image(&src).await.unwrap();
        assert_eq!((prepared.width, prepared.height), (160, 90));
        assert!(prepared.path.exists());
    }
}
