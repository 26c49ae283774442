//! Side-by-side composition.
//!
//! Both eyes are cropped (never scaled) to the minimum common size,
//! anchored top-left, then drawn onto a single 2w x h canvas. The
//! placement is crossed on purpose: the right-eye crop fills the left
//! half and the left-eye crop fills the right half. The UV offsets in
//! `render::texture` assume exactly this layout to hand each eye its
//! own half back.

use crate::error::PipelineError;
use crate::pipeline::stereo::StereoPair;
use image::imageops;
use image::{ExtendedColorType, ImageEncoder, RgbaImage};
use std::io::Cursor;

/// One composited raster plus the per-eye crop dimensions it was
/// built from.
#[derive(Debug, Clone)]
pub struct Composite {
    pub image: RgbaImage,
    pub eye_width: u32,
    pub eye_height: u32,
}

impl Composite {
    /// Aspect ratio of one eye, computed from the post-crop
    /// dimensions. Physical quad sizing derives from this.
    pub fn aspect_ratio(&self) -> f32 {
        self.eye_width as f32 / self.eye_height as f32
    }

    /// Encodes the canvas as a PNG blob: lossless, so re-running the
    /// pipeline on identical input yields identical bytes.
    ///
    /// # Errors
    /// Fails with `Composition` if the encoder rejects the canvas.
    pub fn encode_png(&self) -> Result<Vec<u8>, PipelineError> {
        let mut out = Cursor::new(Vec::new());
        image::codecs::png::PngEncoder::new(&mut out)
            .write_image(
                self.image.as_raw(),
                self.image.width(),
                self.image.height(),
                ExtendedColorType::Rgba8,
            )
            .map_err(|e| PipelineError::Composition(format!("png encode: {e}")))?;
        Ok(out.into_inner())
    }
}

/// Builds the side-by-side canvas from a selected pair.
///
/// # Errors
/// Fails with `Composition` when either source raster has a
/// non-positive dimension or the canvas size is unrepresentable.
pub fn compose(pair: &StereoPair) -> Result<Composite, PipelineError> {
    let (lw, lh) = pair.left.dimensions();
    let (rw, rh) = pair.right.dimensions();
    if lw == 0 || lh == 0 || rw == 0 || rh == 0 {
        return Err(PipelineError::Composition(format!(
            "degenerate source dimensions {lw}x{lh} / {rw}x{rh}"
        )));
    }

    let eye_width = lw.min(rw);
    let eye_height = lh.min(rh);
    let canvas_width = eye_width
        .checked_mul(2)
        .ok_or_else(|| PipelineError::Composition("canvas width overflows".into()))?;

    let mut canvas = RgbaImage::new(canvas_width, eye_height);
    let right_crop = imageops::crop_imm(&pair.right, 0, 0, eye_width, eye_height);
    let left_crop = imageops::crop_imm(&pair.left, 0, 0, eye_width, eye_height);
    imageops::replace(&mut canvas, &*right_crop, 0, 0);
    imageops::replace(&mut canvas, &*left_crop, i64::from(eye_width), 0);

    Ok(Composite {
        image: canvas,
        eye_width,
        eye_height,
    })
}
