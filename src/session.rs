//! Immersive session tracking.
//!
//! The controller owns the camera pose and reacts to session edges:
//! entering a session leaves the pose alone (the immersive runtime
//! drives it), exiting resets rotation and position to the defaults
//! and recomputes the field of view from the current viewport aspect.
//! Pose changes are published on a watch channel so observers need no
//! knowledge of the windowing library.

use crate::config::FovConfig;
use tokio::sync::watch;
use tracing::debug;

pub const DEFAULT_ROTATION: [f32; 3] = [0.0, 0.0, 0.0];
pub const DEFAULT_POSITION_M: [f32; 3] = [0.0, 0.0, 0.0];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    NotInSession,
    InSession,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraPose {
    pub rotation: [f32; 3],
    pub position: [f32; 3],
    pub fov_deg: f32,
}

#[derive(Debug)]
pub struct SessionController {
    fov: FovConfig,
    phase: SessionPhase,
    pose: CameraPose,
    viewport_aspect: f32,
    pose_tx: watch::Sender<CameraPose>,
}

impl SessionController {
    pub fn new(fov: FovConfig) -> Self {
        let pose = CameraPose {
            rotation: DEFAULT_ROTATION,
            position: DEFAULT_POSITION_M,
            fov_deg: fov.initial_degrees,
        };
        let (pose_tx, _) = watch::channel(pose);
        Self {
            fov,
            phase: SessionPhase::NotInSession,
            pose,
            viewport_aspect: 1.0,
            pose_tx,
        }
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn pose(&self) -> CameraPose {
        self.pose
    }

    /// Change stream for observers outside the render loop (an
    /// immersive runtime driving the camera, head-tracking bridges).
    /// The windowing shell itself reads `pose()` synchronously each
    /// frame and does not subscribe.
    pub fn poses(&self) -> watch::Receiver<CameraPose> {
        self.pose_tx.subscribe()
    }

    /// Reports the current session phase. Returns true when the phase
    /// actually changed. Exiting a session resets the camera.
    pub fn set_phase(&mut self, phase: SessionPhase) -> bool {
        if self.phase == phase {
            return false;
        }
        self.phase = phase;
        if phase == SessionPhase::NotInSession {
            self.pose = CameraPose {
                rotation: DEFAULT_ROTATION,
                position: DEFAULT_POSITION_M,
                fov_deg: self.fov_for_current_aspect(),
            };
            debug!(fov = self.pose.fov_deg, "session ended; camera reset");
            let _ = self.pose_tx.send(self.pose);
        }
        true
    }

    /// Viewport resize. The FOV ramp only applies outside a session;
    /// while immersive the runtime owns the projection.
    pub fn handle_resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.viewport_aspect = width as f32 / height as f32;
        if self.phase == SessionPhase::NotInSession {
            self.pose.fov_deg = self.fov_for_current_aspect();
            let _ = self.pose_tx.send(self.pose);
        }
    }

    fn fov_for_current_aspect(&self) -> f32 {
        linear_scale(
            self.viewport_aspect,
            self.fov.narrow_aspect,
            self.fov.wide_aspect,
            self.fov.narrow_degrees,
            self.fov.wide_degrees,
        )
    }
}

/// Clamped linear interpolation between two experimentally chosen
/// endpoints.
pub fn linear_scale(factor: f32, min_in: f32, max_in: f32, min_out: f32, max_out: f32) -> f32 {
    let factor = factor.clamp(min_in, max_in);
    min_out + (max_out - min_out) * (factor - min_in) / (max_in - min_in)
}
