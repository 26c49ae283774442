//! Stereo pair selection.
//!
//! Eye assignment is a fixed vendor convention, never inferred from
//! image content: in a three-layer container the first layer is an
//! auxiliary preview and is discarded; the next layer is the right
//! eye and the last is the left eye. Two-layer containers use the
//! same relative order with nothing dropped.

use crate::error::PipelineError;
use image::RgbaImage;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Eye {
    Left,
    Right,
}

/// Both eyes of one photo. Either both rasters exist or selection
/// failed; no partial pair escapes this module.
#[derive(Debug, Clone)]
pub struct StereoPair {
    pub left: RgbaImage,
    pub right: RgbaImage,
}

/// Applies the layer-count convention. Counts outside {2, 3} fail
/// explicitly rather than guessing.
pub fn select_pair(mut layers: Vec<RgbaImage>) -> Result<StereoPair, PipelineError> {
    match layers.len() {
        3 => {
            layers.remove(0);
        }
        2 => {}
        n => return Err(PipelineError::NotStereoscopic { layers: n }),
    }

    let mut remaining = layers.into_iter();
    let right = remaining.next().expect("two layers remain");
    let left = remaining.next().expect("two layers remain");
    Ok(StereoPair { left, right })
}
