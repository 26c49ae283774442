//! Texture provisioning.
//!
//! The composite blob is uploaded to the GPU exactly once; the two
//! eye textures are configuration-distinct views over that shared
//! storage, each with its own sampler and UV window. Dropping one eye
//! leaves the other sampling normally; the storage itself is freed
//! when the last `Arc` goes away.

use crate::error::PipelineError;
use crate::pipeline::stereo::Eye;
use std::sync::Arc;

/// Both filter modes must stay linear for anisotropy to apply; 16 is
/// the ceiling wgpu guarantees on every backend that supports it.
const MAX_ANISOTROPY: u16 = 16;

/// Horizontal UV window selecting one half of the composite. The
/// composition is crossed (right eye drawn on the left half), so the
/// left eye samples offset 0.5 and the right eye samples offset 0.0.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EyeUv {
    pub repeat: [f32; 2],
    pub offset: [f32; 2],
}

impl EyeUv {
    pub fn for_eye(eye: Eye) -> Self {
        let offset_x = match eye {
            Eye::Left => 0.5,
            Eye::Right => 0.0,
        };
        Self {
            repeat: [0.5, 1.0],
            offset: [offset_x, 0.0],
        }
    }

    /// Maps a texture-local UV coordinate to the composite pixel it
    /// samples, given the per-eye crop dimensions.
    pub fn map_to_pixel(&self, u: f32, v: f32, eye_width: u32, eye_height: u32) -> (f32, f32) {
        let composite_width = (eye_width * 2) as f32;
        let composite_height = eye_height as f32;
        (
            (self.offset[0] + u * self.repeat[0]) * composite_width,
            (self.offset[1] + v * self.repeat[1]) * composite_height,
        )
    }
}

/// Seam between the pipeline and the rendering backend. The mesh
/// state machine only sees `Self::Textures`, so tests drive it with a
/// fake and never touch a GPU.
pub trait TextureProvisioner: Send + Sync + 'static {
    type Textures: Send + 'static;

    /// Decodes the composite blob and produces both eye textures.
    ///
    /// # Errors
    /// `TextureLoad` when the blob cannot be decoded or uploaded.
    fn provision(&self, blob: &[u8]) -> Result<Self::Textures, PipelineError>;
}

/// One eye's GPU handle: a view plus sampler state over the shared
/// composite storage.
#[derive(Debug)]
pub struct EyeTexture {
    storage: Arc<wgpu::Texture>,
    pub view: wgpu::TextureView,
    pub sampler: wgpu::Sampler,
    pub uv: EyeUv,
    pub eye: Eye,
}

impl EyeTexture {
    pub fn texture(&self) -> &wgpu::Texture {
        &self.storage
    }
}

#[derive(Debug)]
pub struct EyeTexturePair {
    pub left: EyeTexture,
    pub right: EyeTexture,
}

/// wgpu-backed provisioner. `Device`/`Queue` are internally
/// reference-counted, so this is cheap to clone into blocking tasks.
#[derive(Clone)]
pub struct WgpuTextures {
    device: wgpu::Device,
    queue: wgpu::Queue,
}

impl WgpuTextures {
    pub fn new(device: wgpu::Device, queue: wgpu::Queue) -> Self {
        Self { device, queue }
    }

    fn upload(&self, pixels: &[u8], width: u32, height: u32) -> wgpu::Texture {
        let texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("composite"),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            // Mip-map generation stays disabled; the eye quads are
            // sampled near 1:1 and mips would bleed across the seam.
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8UnormSrgb,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        self.queue.write_texture(
            texture.as_image_copy(),
            pixels,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(4 * width),
                rows_per_image: Some(height),
            },
            wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
        );
        texture
    }

    fn derive_eye(&self, storage: Arc<wgpu::Texture>, eye: Eye) -> EyeTexture {
        let view = storage.create_view(&wgpu::TextureViewDescriptor::default());
        let sampler = self.device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("eye sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Linear,
            anisotropy_clamp: MAX_ANISOTROPY,
            ..Default::default()
        });
        EyeTexture {
            storage,
            view,
            sampler,
            uv: EyeUv::for_eye(eye),
            eye,
        }
    }
}

impl TextureProvisioner for WgpuTextures {
    type Textures = EyeTexturePair;

    fn provision(&self, blob: &[u8]) -> Result<EyeTexturePair, PipelineError> {
        let decoded = image::load_from_memory(blob)
            .map_err(|e| PipelineError::TextureLoad(format!("composite blob: {e}")))?
            .to_rgba8();
        let (width, height) = decoded.dimensions();
        let storage = Arc::new(self.upload(decoded.as_raw(), width, height));
        Ok(EyeTexturePair {
            left: self.derive_eye(storage.clone(), Eye::Left),
            right: self.derive_eye(storage, Eye::Right),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn left_eye_samples_right_half() {
        let uv = EyeUv::for_eye(Eye::Left);
        assert_eq!(uv.repeat, [0.5, 1.0]);
        assert_eq!(uv.offset, [0.5, 0.0]);
    }

    #[test]
    fn right_eye_samples_left_half() {
        let uv = EyeUv::for_eye(Eye::Right);
        assert_eq!(uv.repeat, [0.5, 1.0]);
        assert_eq!(uv.offset, [0.0, 0.0]);
    }

    #[test]
    fn uv_round_trip_holds_at_boundaries() {
        let (w, h) = (3024u32, 3988u32);

        let left = EyeUv::for_eye(Eye::Left);
        assert_eq!(left.map_to_pixel(0.0, 0.0, w, h), (w as f32, 0.0));
        assert_eq!(
            left.map_to_pixel(1.0, 1.0, w, h),
            ((2 * w) as f32, h as f32)
        );

        let right = EyeUv::for_eye(Eye::Right);
        assert_eq!(right.map_to_pixel(0.0, 0.0, w, h), (0.0, 0.0));
        assert_eq!(right.map_to_pixel(1.0, 1.0, w, h), (w as f32, h as f32));
    }

    #[test]
    fn interior_uv_lands_inside_the_expected_half() {
        let (w, h) = (100u32, 50u32);
        let (x, y) = EyeUv::for_eye(Eye::Left).map_to_pixel(0.5, 0.5, w, h);
        assert_eq!((x, y), (150.0, 25.0));
        let (x, _) = EyeUv::for_eye(Eye::Right).map_to_pixel(0.5, 0.5, w, h);
        assert_eq!(x, 50.0);
    }
}
