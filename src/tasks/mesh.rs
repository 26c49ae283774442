//! Immersive mesh state machine.
//!
//! Owns the only mutable pipeline state in the system. Each accepted
//! source bumps a generation, cancels the in-flight run's token, and
//! spawns a fresh run chaining fetch, container decode, pair
//! selection, composition, blob encode, and texture provisioning.
//! A finished run is committed only while its generation is still
//! current, so a stale run can never overwrite newer state even if
//! its cancellation guard raced past.

use crate::config::Configuration;
use crate::error::PipelineError;
use crate::events::{MeshEvent, SetSource};
use crate::pipeline::{compose, container, stereo};
use crate::render::texture::TextureProvisioner;
use crate::source::{self, ImageSource};
use anyhow::Result;
use std::sync::Arc;
use tokio::select;
use tokio::sync::mpsc::Receiver;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    NoSource,
    Loading,
    Ready,
    Failed,
}

#[derive(Debug)]
struct ReadyPhoto<T> {
    textures: T,
    width_m: f32,
    height_m: f32,
}

pub async fn run<P: TextureProvisioner>(
    cfg: Configuration,
    mut source_rx: Receiver<SetSource>,
    provisioner: Arc<P>,
    to_viewer: crossbeam_channel::Sender<MeshEvent<P::Textures>>,
    cancel: CancellationToken,
) -> Result<()> {
    let mut state = PipelineState::NoSource;
    let mut generation: u64 = 0;
    let mut active: Option<CancellationToken> = None;
    let mut runs: JoinSet<(u64, Result<ReadyPhoto<P::Textures>, PipelineError>)> = JoinSet::new();

    loop {
        select! {
            _ = cancel.cancelled() => {
                if let Some(token) = active.take() {
                    token.cancel();
                }
                break;
            }

            maybe_source = source_rx.recv() => {
                let Some(SetSource(next)) = maybe_source else { break };
                generation += 1;
                if let Some(token) = active.take() {
                    token.cancel();
                }
                match next {
                    None => {
                        transition(&mut state, PipelineState::NoSource);
                        let _ = to_viewer.send(MeshEvent::Cleared);
                    }
                    Some(src) => {
                        transition(&mut state, PipelineState::Loading);
                        info!(source = %src, generation, "starting pipeline run");
                        let _ = to_viewer.send(MeshEvent::Loading);

                        let run_cancel = cancel.child_token();
                        active = Some(run_cancel.clone());
                        let provisioner = provisioner.clone();
                        let max_height_m = cfg.max_height_m;
                        runs.spawn(async move {
                            let outcome =
                                run_pipeline(src, max_height_m, provisioner, run_cancel).await;
                            (generation, outcome)
                        });
                    }
                }
            }

            Some(joined) = runs.join_next() => {
                let (run_generation, outcome) = match joined {
                    Ok(pair) => pair,
                    Err(e) => {
                        warn!(error = %e, "pipeline run aborted");
                        continue;
                    }
                };
                if run_generation != generation {
                    // Textures of the stale run are dropped here,
                    // releasing their GPU storage.
                    debug!(run_generation, generation, "discarding stale pipeline result");
                    continue;
                }
                match outcome {
                    Ok(ready) => {
                        transition(&mut state, PipelineState::Ready);
                        info!(
                            width_m = ready.width_m,
                            height_m = ready.height_m,
                            "photo ready"
                        );
                        let _ = to_viewer.send(MeshEvent::Ready {
                            textures: ready.textures,
                            width_m: ready.width_m,
                            height_m: ready.height_m,
                        });
                    }
                    Err(error) if !error.is_user_visible() => {
                        debug!(run_generation, "superseded run retired quietly");
                    }
                    Err(error) => {
                        transition(&mut state, PipelineState::Failed);
                        warn!(error = %error, "pipeline run failed");
                        let _ = to_viewer.send(MeshEvent::Failed { error });
                    }
                }
            }
        }
    }
    Ok(())
}

fn transition(state: &mut PipelineState, next: PipelineState) {
    if *state != next {
        debug!(from = ?*state, to = ?next, "pipeline state");
        *state = next;
    }
}

/// One full pipeline run. Stages execute strictly in order; the
/// cancellation guard between stages turns a superseded run's
/// remaining work into a no-op.
async fn run_pipeline<P: TextureProvisioner>(
    source: ImageSource,
    max_height_m: f32,
    provisioner: Arc<P>,
    cancel: CancellationToken,
) -> Result<ReadyPhoto<P::Textures>, PipelineError> {
    let bytes = source::fetch(&source).await?;
    guard(&cancel)?;

    let layers = tokio::task::spawn_blocking(move || container::decode_layers(&bytes)).await??;
    guard(&cancel)?;

    let pair = stereo::select_pair(layers)?;
    guard(&cancel)?;

    let composite = tokio::task::spawn_blocking(move || compose::compose(&pair)).await??;
    let aspect_ratio = composite.aspect_ratio();
    guard(&cancel)?;

    let blob = tokio::task::spawn_blocking(move || composite.encode_png()).await??;
    guard(&cancel)?;

    let textures = tokio::task::spawn_blocking(move || provisioner.provision(&blob)).await??;
    Ok(ReadyPhoto {
        textures,
        width_m: aspect_ratio * max_height_m,
        height_m: max_height_m,
    })
}

fn guard(cancel: &CancellationToken) -> Result<(), PipelineError> {
    if cancel.is_cancelled() {
        Err(PipelineError::Superseded)
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NullProvisioner;

    impl TextureProvisioner for NullProvisioner {
        type Textures = ();

        fn provision(&self, _blob: &[u8]) -> Result<(), PipelineError> {
            Ok(())
        }
    }

    #[test]
    fn guard_passes_until_cancelled() {
        let token = CancellationToken::new();
        assert!(guard(&token).is_ok());
        token.cancel();
        assert!(matches!(
            guard(&token).unwrap_err(),
            PipelineError::Superseded
        ));
    }

    #[tokio::test]
    async fn unreachable_source_fails_with_fetch() {
        let err = run_pipeline(
            ImageSource::parse("/no/such/photo.mpo"),
            2.0,
            Arc::new(NullProvisioner),
            CancellationToken::new(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, PipelineError::Fetch(_)));
    }

    #[tokio::test]
    async fn cancelled_run_stops_before_decoding() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("garbage.mpo");
        std::fs::write(&path, b"not a container").unwrap();

        let token = CancellationToken::new();
        token.cancel();
        let err = run_pipeline(
            ImageSource::Path(path),
            2.0,
            Arc::new(NullProvisioner),
            token,
        )
        .await
        .unwrap_err();
        // The guard fires before the decode stage can report its own
        // error.
        assert!(matches!(err, PipelineError::Superseded));
    }
}
