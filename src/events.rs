use crate::error::PipelineError;
use crate::source::ImageSource;

/// Replace (or clear) the image source driving the immersive mesh.
#[derive(Debug)]
pub struct SetSource(pub Option<ImageSource>);

/// State change pushed from the mesh task to the presentation layer.
/// `T` is whatever the texture provisioner produced, so tests can run
/// the full state machine without a GPU.
#[derive(Debug)]
pub enum MeshEvent<T> {
    /// No source set; show the neutral fallback.
    Cleared,
    /// A fresh pipeline run started for the current source.
    Loading,
    /// The run committed: both eye textures plus physical quad size.
    Ready {
        textures: T,
        width_m: f32,
        height_m: f32,
    },
    /// The run failed at some stage; distinct from `Loading`.
    Failed { error: PipelineError },
}
