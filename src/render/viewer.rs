//! Desktop presentation shell.
//!
//! Hosts the winit window and wgpu surface, forwards dropped files as
//! new image sources, mirrors mesh events into visuals, and renders:
//! the fallback placeholder (layer 0), a pulsing loading state, a
//! failure message, or the stereo pair. In-session the photo renders
//! as two per-eye passes, each gated by its render-layer mask;
//! outside a session the left eye serves as the monoscopic preview.

use anyhow::{Context, Result};
use crossbeam_channel as xchan;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use wgpu::util::DeviceExt;
use wgpu_glyph::ab_glyph::FontArc;
use wgpu_glyph::{GlyphBrush, GlyphBrushBuilder, HorizontalAlign, Layout, Section, Text, VerticalAlign};
use winit::{
    application::ApplicationHandler,
    dpi::PhysicalSize,
    event::{ElementState, WindowEvent},
    event_loop::{ActiveEventLoop, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    window::{Window, WindowAttributes, WindowId},
};

use crate::config::Configuration;
use crate::events::{MeshEvent, SetSource};
use crate::render::layers::{self, LayerMask};
use crate::render::texture::{EyeTexturePair, WgpuTextures};
use crate::session::{SessionController, SessionPhase};
use crate::source::ImageSource;

#[repr(C)]
#[derive(Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
struct Vertex {
    pos: [f32; 2],
    uv: [f32; 2],
}

const QUAD: [Vertex; 4] = [
    Vertex {
        pos: [-1.0, -1.0],
        uv: [0.0, 1.0],
    },
    Vertex {
        pos: [1.0, -1.0],
        uv: [1.0, 1.0],
    },
    Vertex {
        pos: [-1.0, 1.0],
        uv: [0.0, 0.0],
    },
    Vertex {
        pos: [1.0, 1.0],
        uv: [1.0, 0.0],
    },
];

#[repr(C)]
#[derive(Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
struct Params {
    scale: [f32; 2],
    uv_repeat: [f32; 2],
    uv_offset: [f32; 2],
    dim: f32,
    _pad: f32,
}

const FAILED_DIM: f32 = 0.35;

/// Runs the viewer on the calling thread until the window closes.
///
/// # Errors
/// Returns an error if the event loop cannot be created or run.
pub fn run(
    cfg: Configuration,
    source_tx: mpsc::Sender<SetSource>,
    mesh_rx: xchan::Receiver<MeshEvent<EyeTexturePair>>,
    gpu_tx: oneshot::Sender<WgpuTextures>,
    cancel: CancellationToken,
) -> Result<()> {
    let event_loop = EventLoop::new()?;
    let mut app = App::new(cfg, source_tx, mesh_rx, gpu_tx, cancel.clone());
    event_loop.run_app(&mut app)?;
    cancel.cancel();
    Ok(())
}

enum Visual {
    Fallback,
    Loading { since: Instant },
    Failed { message: String },
    Ready,
}

/// Per-drawable GPU state: its uniform buffer, bind group, and the
/// render layers it belongs to.
struct Slot {
    params: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
    mask: LayerMask,
}

struct PhotoQuad {
    // Keeps the pair alive for as long as the slots reference it.
    _textures: EyeTexturePair,
    width_m: f32,
    height_m: f32,
    left: Slot,
    right: Slot,
}

struct Gpu {
    _instance: wgpu::Instance,
    surface: wgpu::Surface<'static>,
    _adapter: wgpu::Adapter,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,

    pipeline: wgpu::RenderPipeline,
    bind_layout: wgpu::BindGroupLayout,
    vbuf: wgpu::Buffer,
    placeholder: Slot,

    glyph: Option<GlyphBrush<()>>,
    staging_belt: wgpu::util::StagingBelt,
}

struct App {
    cfg: Configuration,
    session: SessionController,
    visual: Visual,
    photo: Option<PhotoQuad>,

    window: Option<Arc<Window>>,
    gpu: Option<Gpu>,

    source_tx: mpsc::Sender<SetSource>,
    mesh_rx: xchan::Receiver<MeshEvent<EyeTexturePair>>,
    gpu_tx: Option<oneshot::Sender<WgpuTextures>>,
    cancel: CancellationToken,
}

impl App {
    fn new(
        cfg: Configuration,
        source_tx: mpsc::Sender<SetSource>,
        mesh_rx: xchan::Receiver<MeshEvent<EyeTexturePair>>,
        gpu_tx: oneshot::Sender<WgpuTextures>,
        cancel: CancellationToken,
    ) -> Self {
        let session = SessionController::new(cfg.fov.clone());
        Self {
            cfg,
            session,
            visual: Visual::Fallback,
            photo: None,
            window: None,
            gpu: None,
            source_tx,
            mesh_rx,
            gpu_tx: Some(gpu_tx),
            cancel,
        }
    }

    fn set_source(&self, source: Option<ImageSource>) {
        if self.source_tx.try_send(SetSource(source)).is_err() {
            warn!("mesh task is gone; ignoring source change");
        }
    }

    fn toggle_session(&mut self) {
        let next = match self.session.phase() {
            SessionPhase::NotInSession => SessionPhase::InSession,
            SessionPhase::InSession => SessionPhase::NotInSession,
        };
        if self.session.set_phase(next) {
            info!(phase = ?next, "session phase changed");
        }
    }

    fn apply_mesh_event(&mut self, event: MeshEvent<EyeTexturePair>) {
        match event {
            MeshEvent::Cleared => {
                self.visual = Visual::Fallback;
                self.photo = None;
            }
            MeshEvent::Loading => {
                self.visual = Visual::Loading {
                    since: Instant::now(),
                };
                // Release the previous pair now so GPU memory stays
                // bounded to one pair even while the next loads.
                self.photo = None;
            }
            MeshEvent::Ready {
                textures,
                width_m,
                height_m,
            } => {
                if let Some(gpu) = &self.gpu {
                    self.photo = Some(build_photo_quad(gpu, textures, width_m, height_m));
                    self.visual = Visual::Ready;
                }
            }
            MeshEvent::Failed { error } => {
                self.visual = Visual::Failed {
                    message: error.to_string(),
                };
                self.photo = None;
            }
        }
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        let attrs = WindowAttributes::default().with_title("spatial viewer");
        let window = Arc::new(event_loop.create_window(attrs).expect("create window"));
        self.window = Some(window.clone());

        let gpu = pollster::block_on(init_gpu(window.clone())).expect("GPU init");
        if let Some(tx) = self.gpu_tx.take() {
            let _ = tx.send(WgpuTextures::new(gpu.device.clone(), gpu.queue.clone()));
        }

        let PhysicalSize { width, height } = window.inner_size();
        self.session.handle_resize(width, height);
        self.gpu = Some(gpu);
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, window_id: WindowId, event: WindowEvent) {
        let Some(win) = &self.window else { return };
        if win.id() != window_id {
            return;
        }

        match event {
            WindowEvent::CloseRequested => {
                self.cancel.cancel();
                event_loop.exit();
            }
            WindowEvent::KeyboardInput { event, .. } => {
                if event.state != ElementState::Released {
                    return;
                }
                match event.physical_key {
                    PhysicalKey::Code(KeyCode::Escape | KeyCode::KeyQ) => {
                        self.cancel.cancel();
                        event_loop.exit();
                    }
                    PhysicalKey::Code(KeyCode::Enter) => self.toggle_session(),
                    PhysicalKey::Code(KeyCode::KeyX) => self.set_source(None),
                    _ => {}
                }
            }
            WindowEvent::DroppedFile(path) => {
                debug!(path = %path.display(), "file dropped");
                self.set_source(Some(ImageSource::from(path)));
            }
            WindowEvent::Resized(PhysicalSize { width, height }) => {
                self.session.handle_resize(width, height);
                if let Some(gpu) = &mut self.gpu
                    && width > 0
                    && height > 0
                {
                    gpu.config.width = width;
                    gpu.config.height = height;
                    gpu.surface.configure(&gpu.device, &gpu.config);
                }
            }
            WindowEvent::RedrawRequested => self.draw(),
            _ => {}
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        while let Ok(event) = self.mesh_rx.try_recv() {
            self.apply_mesh_event(event);
        }
        if let Some(win) = &self.window {
            win.request_redraw();
        }
    }
}

impl App {
    fn draw(&mut self) {
        let Some(gpu) = &self.gpu else { return };
        let Ok(frame) = gpu.surface.get_current_texture() else {
            return;
        };
        let view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let width = gpu.config.width as f32;
        let height = gpu.config.height as f32;
        let in_session = self.session.phase() == SessionPhase::InSession;

        // Per-eye passes cover half the surface each; the monoscopic
        // pass covers all of it.
        let passes: Vec<(f32, f32, LayerMask)> = if in_session {
            vec![
                (0.0, width / 2.0, LayerMask::only(layers::FALLBACK).with(layers::LEFT_EYE)),
                (width / 2.0, width / 2.0, LayerMask::only(layers::FALLBACK).with(layers::RIGHT_EYE)),
            ]
        } else {
            vec![(0.0, width, LayerMask::only(layers::FALLBACK).with(layers::LEFT_EYE))]
        };

        self.update_uniforms(in_session);

        let gpu = self.gpu.as_mut().expect("gpu initialized");
        let mut encoder = gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("viewer encoder"),
            });

        for (idx, (x, pass_width, pass_mask)) in passes.iter().enumerate() {
            let mut rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("eye pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    depth_slice: None,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        // Clears hit the whole attachment, so only the
                        // first pass may clear.
                        load: if idx == 0 {
                            wgpu::LoadOp::Clear(wgpu::Color::BLACK)
                        } else {
                            wgpu::LoadOp::Load
                        },
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            rpass.set_viewport(*x, 0.0, *pass_width, height, 0.0, 1.0);
            rpass.set_pipeline(&gpu.pipeline);
            rpass.set_vertex_buffer(0, gpu.vbuf.slice(..));

            let mut slots: Vec<&Slot> = Vec::new();
            match (&self.visual, &self.photo) {
                (Visual::Ready, Some(photo)) => {
                    slots.push(&photo.left);
                    slots.push(&photo.right);
                }
                _ => slots.push(&gpu.placeholder),
            }
            for slot in slots {
                if pass_mask.intersects(slot.mask) {
                    rpass.set_bind_group(0, &slot.bind_group, &[]);
                    rpass.draw(0..4, 0..1);
                }
            }
        }

        if let Visual::Failed { message } = &self.visual
            && let Some(glyph) = gpu.glyph.as_mut()
        {
            glyph.queue(Section {
                screen_position: (width / 2.0, height * 0.85),
                bounds: (width * 0.9, height),
                text: vec![
                    Text::new(&format!("Couldn't show this photo: {message}"))
                        .with_color([0.96, 0.76, 0.35, 1.0])
                        .with_scale(28.0),
                ],
                layout: Layout::default_single_line()
                    .h_align(HorizontalAlign::Center)
                    .v_align(VerticalAlign::Center),
                ..Section::default()
            });
            if let Err(e) = glyph.draw_queued(
                &gpu.device,
                &mut gpu.staging_belt,
                &mut encoder,
                &view,
                gpu.config.width,
                gpu.config.height,
            ) {
                warn!(error = %e, "failure overlay draw failed");
            }
        }

        gpu.staging_belt.finish();
        gpu.queue.submit([encoder.finish()]);
        gpu.staging_belt.recall();
        frame.present();
    }

    /// Writes per-slot uniforms for this frame: letterboxed quad
    /// scale for the eyes, pulse/dim factors for the placeholder.
    fn update_uniforms(&self, in_session: bool) {
        let Some(gpu) = &self.gpu else { return };
        let width = gpu.config.width as f32;
        let height = gpu.config.height as f32;
        let viewport_width = if in_session { width / 2.0 } else { width };

        let dim = match &self.visual {
            Visual::Loading { since } => {
                loading_pulse(since.elapsed(), self.cfg.loading_pulse_period)
            }
            Visual::Failed { .. } => FAILED_DIM,
            _ => 1.0,
        };
        write_params(
            &gpu.queue,
            &gpu.placeholder.params,
            Params {
                scale: [1.0, 1.0],
                uv_repeat: [1.0, 1.0],
                uv_offset: [0.0, 0.0],
                dim,
                _pad: 0.0,
            },
        );

        if let Some(photo) = &self.photo {
            let scale = quad_scale(
                viewport_width,
                height,
                photo.width_m,
                photo.height_m,
                self.session.pose().fov_deg,
                self.cfg.viewing_distance_m,
            );
            for (slot, uv) in [
                (&photo.left, photo._textures.left.uv),
                (&photo.right, photo._textures.right.uv),
            ] {
                write_params(
                    &gpu.queue,
                    &slot.params,
                    Params {
                        scale,
                        uv_repeat: uv.repeat,
                        uv_offset: uv.offset,
                        dim: 1.0,
                        _pad: 0.0,
                    },
                );
            }
        }
    }
}

fn write_params(queue: &wgpu::Queue, buffer: &wgpu::Buffer, params: Params) {
    queue.write_buffer(buffer, 0, bytemuck::bytes_of(&params));
}

async fn init_gpu(window: Arc<Window>) -> Result<Gpu> {
    let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor::default());
    let surface = instance
        .create_surface(window.clone())
        .context("create surface")?;

    let adapter = instance
        .request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: Some(&surface),
            force_fallback_adapter: false,
        })
        .await
        .context("no compatible GPU adapter found")?;

    let (device, queue) = adapter
        .request_device(&wgpu::DeviceDescriptor {
            label: Some("viewer device"),
            ..Default::default()
        })
        .await
        .context("request device")?;

    let caps = surface.get_capabilities(&adapter);
    let format = caps
        .formats
        .iter()
        .copied()
        .find(wgpu::TextureFormat::is_srgb)
        .unwrap_or(caps.formats[0]);
    let PhysicalSize { width, height } = window.inner_size();
    let config = wgpu::SurfaceConfiguration {
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        format,
        width: width.max(1),
        height: height.max(1),
        present_mode: wgpu::PresentMode::AutoVsync,
        alpha_mode: caps.alpha_modes[0],
        view_formats: vec![],
        desired_maximum_frame_latency: 1,
    };
    surface.configure(&device, &config);

    let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some("eye shader"),
        source: wgpu::ShaderSource::Wgsl(include_str!("shaders/eye.wgsl").into()),
    });

    let bind_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("eye bind layout"),
        entries: &[
            wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Texture {
                    sample_type: wgpu::TextureSampleType::Float { filterable: true },
                    view_dimension: wgpu::TextureViewDimension::D2,
                    multisampled: false,
                },
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: 1,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: 2,
                visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            },
        ],
    });

    let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("eye pipeline layout"),
        bind_group_layouts: &[&bind_layout],
        push_constant_ranges: &[],
    });

    let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some("eye pipeline"),
        layout: Some(&pipeline_layout),
        vertex: wgpu::VertexState {
            module: &shader,
            entry_point: Some("vs_main"),
            buffers: &[wgpu::VertexBufferLayout {
                array_stride: std::mem::size_of::<Vertex>() as u64,
                step_mode: wgpu::VertexStepMode::Vertex,
                attributes: &wgpu::vertex_attr_array![0 => Float32x2, 1 => Float32x2],
            }],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        },
        fragment: Some(wgpu::FragmentState {
            module: &shader,
            entry_point: Some("fs_main"),
            targets: &[Some(wgpu::ColorTargetState {
                format,
                blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        }),
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleStrip,
            strip_index_format: None,
            ..Default::default()
        },
        depth_stencil: None,
        multisample: wgpu::MultisampleState::default(),
        multiview: None,
        cache: None,
    });

    let vbuf = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some("quad"),
        contents: bytemuck::cast_slice(&QUAD),
        usage: wgpu::BufferUsages::VERTEX,
    });

    let placeholder = build_placeholder_slot(&device, &queue, &bind_layout);

    let glyph = load_overlay_font().map(|font| GlyphBrushBuilder::using_font(font).build(&device, format));
    if glyph.is_none() {
        warn!("no system font found; failure messages will not be rendered");
    }

    Ok(Gpu {
        _instance: instance,
        surface,
        _adapter: adapter,
        device,
        queue,
        config,
        pipeline,
        bind_layout,
        vbuf,
        placeholder,
        glyph,
        staging_belt: wgpu::util::StagingBelt::new(1024),
    })
}

/// The neutral stand-in for the 360-degree fallback sphere: a dusk
/// gradient with a horizon band, generated so the viewer needs no
/// bundled assets.
fn placeholder_image() -> image::RgbaImage {
    let (w, h) = (512u32, 256u32);
    image::RgbaImage::from_fn(w, h, |_, y| {
        let t = y as f32 / h as f32;
        let horizon = (-((t - 0.62) * 18.0).powi(2)).exp();
        let r = (18.0 + 30.0 * t + 60.0 * horizon) as u8;
        let g = (22.0 + 26.0 * t + 40.0 * horizon) as u8;
        let b = (38.0 + 34.0 * t + 30.0 * horizon) as u8;
        image::Rgba([r, g, b, 255])
    })
}

fn build_placeholder_slot(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    bind_layout: &wgpu::BindGroupLayout,
) -> Slot {
    let img = placeholder_image();
    let (width, height) = img.dimensions();
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("fallback"),
        size: wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: wgpu::TextureFormat::Rgba8UnormSrgb,
        usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        view_formats: &[],
    });
    queue.write_texture(
        texture.as_image_copy(),
        img.as_raw(),
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
    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
    let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
        label: Some("fallback sampler"),
        address_mode_u: wgpu::AddressMode::ClampToEdge,
        address_mode_v: wgpu::AddressMode::ClampToEdge,
        mag_filter: wgpu::FilterMode::Linear,
        min_filter: wgpu::FilterMode::Linear,
        ..Default::default()
    });
    make_slot(
        device,
        bind_layout,
        &view,
        &sampler,
        LayerMask::only(layers::FALLBACK),
        "fallback",
    )
}

fn make_slot(
    device: &wgpu::Device,
    bind_layout: &wgpu::BindGroupLayout,
    view: &wgpu::TextureView,
    sampler: &wgpu::Sampler,
    mask: LayerMask,
    label: &str,
) -> Slot {
    let params = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some(label),
        size: std::mem::size_of::<Params>() as u64,
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    });
    let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some(label),
        layout: bind_layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::TextureView(view),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::Sampler(sampler),
            },
            wgpu::BindGroupEntry {
                binding: 2,
                resource: params.as_entire_binding(),
            },
        ],
    });
    Slot {
        params,
        bind_group,
        mask,
    }
}

fn build_photo_quad(
    gpu: &Gpu,
    textures: EyeTexturePair,
    width_m: f32,
    height_m: f32,
) -> PhotoQuad {
    let left = make_slot(
        &gpu.device,
        &gpu.bind_layout,
        &textures.left.view,
        &textures.left.sampler,
        LayerMask::only(layers::LEFT_EYE),
        "left eye",
    );
    let right = make_slot(
        &gpu.device,
        &gpu.bind_layout,
        &textures.right.view,
        &textures.right.sampler,
        LayerMask::only(layers::RIGHT_EYE),
        "right eye",
    );
    PhotoQuad {
        _textures: textures,
        width_m,
        height_m,
        left,
        right,
    }
}

fn load_overlay_font() -> Option<FontArc> {
    let mut db = fontdb::Database::new();
    db.load_system_fonts();
    let id = db.query(&fontdb::Query {
        families: &[fontdb::Family::SansSerif],
        ..Default::default()
    })?;
    db.with_face_data(id, |data, index| {
        wgpu_glyph::ab_glyph::FontVec::try_from_vec_and_index(data.to_vec(), index).ok()
    })
    .flatten()
    .map(FontArc::new)
}

/// Projects a quad of physical metres at the configured viewing
/// distance under the camera FOV into NDC scale factors, then
/// letterboxes so the quad never spills out of the viewport.
pub fn quad_scale(
    viewport_width: f32,
    viewport_height: f32,
    width_m: f32,
    height_m: f32,
    fov_deg: f32,
    distance_m: f32,
) -> [f32; 2] {
    if viewport_width <= 0.0 || viewport_height <= 0.0 || distance_m <= 0.0 {
        return [1.0, 1.0];
    }
    let half_extent = distance_m * (fov_deg.to_radians() / 2.0).tan();
    if half_extent <= 0.0 {
        return [1.0, 1.0];
    }
    let sy = (height_m / 2.0) / half_extent;
    let viewport_aspect = viewport_width / viewport_height;
    let sx = sy * (width_m / height_m) / viewport_aspect;

    let overflow = sx.max(sy).max(1.0);
    [sx / overflow, sy / overflow]
}

/// Brightness pulse for the loading indicator; one full cycle per
/// period, always visible (never dims to black).
pub fn loading_pulse(elapsed: Duration, period: Duration) -> f32 {
    if period.is_zero() {
        return 1.0;
    }
    let phase = elapsed.as_secs_f32() / period.as_secs_f32();
    0.55 + 0.35 * (phase * std::f32::consts::TAU).sin()
}
