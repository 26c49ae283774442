use thiserror::Error;

/// Failure taxonomy for one pipeline run. Any variant aborts the
/// remainder of the run; the mesh task decides what is user-visible.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The image source could not be read at all.
    #[error("source unreachable: {0}")]
    Fetch(#[from] std::io::Error),

    /// The container bytes are not a parseable layered image.
    #[error("undecodable container: {0}")]
    Decode(String),

    /// The container decoded but does not hold a usable stereo pair.
    #[error("not a stereoscopic photo ({layers} usable layers)")]
    NotStereoscopic { layers: usize },

    /// Side-by-side canvas composition failed.
    #[error("composition failed: {0}")]
    Composition(String),

    /// The composite blob could not be turned into GPU textures.
    #[error("texture upload failed: {0}")]
    TextureLoad(String),

    /// The run was superseded by a newer image source. Never shown to
    /// the viewer; the mesh task discards it silently.
    #[error("pipeline run superseded")]
    Superseded,

    /// A background stage panicked or was torn down mid-run.
    #[error("background stage failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl PipelineError {
    /// True for failures the viewer should present; `Superseded` runs
    /// are discarded without any state transition.
    pub fn is_user_visible(&self) -> bool {
        !matches!(self, Self::Superseded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_superseded_is_hidden_from_the_viewer() {
        assert!(!PipelineError::Superseded.is_user_visible());
        assert!(PipelineError::Decode("bad marker".into()).is_user_visible());
        assert!(PipelineError::NotStereoscopic { layers: 1 }.is_user_visible());
        assert!(PipelineError::TextureLoad("device lost".into()).is_user_visible());
    }
}
