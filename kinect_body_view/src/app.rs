//! Top-level application loop.
//!
//! `AppState` owns the [`FrameOrchestrator`] and the host-side toggles.  It
//! consumes [`BodyFrame`]s in arrival order and hands the committed scene to
//! the viewer once per window refresh.

use std::sync::mpsc::{self, TryRecvError};

use anyhow::{Context, Result};
use body_frame::SensorRuntime;
use log::{info, warn};
use posture_calibration::{CalibrationPhase, Clock, SystemClock};
use skeleton_draw::Scene;

use crate::config::ViewConfig;
use crate::orchestrator::FrameOrchestrator;
use crate::sensor::{spawn_body_source, BodyFrame, SimBodySource, SimulatedSensor};
use crate::viewer::{HostInput, Viewer};

// ════════════════════════════════════════════════════════════════════════════
// AppState
// ════════════════════════════════════════════════════════════════════════════

pub struct AppState<C: Clock = SystemClock> {
    view:      FrameOrchestrator<C>,
    recording: bool,
    frames:    u64,
    /// Tracked bodies in the last frame; `None` if it carried no body data.
    tracked:   Option<usize>,
}

impl<C: Clock> AppState<C> {
    pub fn new(view: FrameOrchestrator<C>) -> Self {
        AppState { view, recording: false, frames: 0, tracked: None }
    }

    pub fn scene(&self)        -> &Scene { self.view.scene() }
    pub fn is_recording(&self) -> bool   { self.recording }
    pub fn frames(&self)       -> u64    { self.frames }

    pub fn handle_frame(&mut self, frame: BodyFrame) {
        self.frames += 1;
        let bodies = frame.bodies.as_deref();
        self.tracked = bodies.map(|b| b.iter().filter(|b| b.is_tracked).count());
        self.view.update_frame(bodies, self.recording);
    }

    pub fn handle_host(&mut self, input: HostInput) {
        if input.toggle_recording {
            self.recording = !self.recording;
            info!("recording {}", if self.recording { "started" } else { "stopped" });
        }
        if input.reset_calibration {
            self.view.reset_calibration();
        }
    }

    /// One-line summary for the viewer's status strip.
    pub fn status(&self) -> String {
        let bodies = match self.tracked {
            Some(n) => format!("bodies {}", n),
            None    => "no body data".to_string(),
        };
        let state = self.view.calibration();
        let calibration = match state.phase() {
            CalibrationPhase::Idle       => "calibration: idle".to_string(),
            CalibrationPhase::Holding    => {
                format!("calibration: holding {:.1}s", state.timer.elapsed.as_secs_f32())
            }
            CalibrationPhase::Calibrated => "calibration: done".to_string(),
        };
        let rec = if self.recording { "  |  REC" } else { "" };
        format!("frame {}  |  {}  |  {}{}", self.frames, bodies, calibration, rec)
    }
}

// ════════════════════════════════════════════════════════════════════════════
// run
// ════════════════════════════════════════════════════════════════════════════

pub fn run(cfg: ViewConfig) -> Result<()> {
    info!(
        "reference body {:?}, optimal depth {} m, optimal height {} m",
        cfg.reference_body, cfg.calibration.optimal_depth, cfg.calibration.optimal_height,
    );
    let sensor = SimulatedSensor::kinect_v2();

    let view = FrameOrchestrator::new(&sensor, cfg.calibration, cfg.reference_body, SystemClock::new())
        .context("initialising body view")?;

    let (sim_tx, sim_rx) = mpsc::channel();
    let source = SimBodySource::new(sim_rx, &sensor, &cfg.simulation)
        .context("initialising simulated body source")?;
    let frames = spawn_body_source(source);

    let mut viewer = Viewer::new(sensor.depth_frame_description(), &cfg.viewer, sim_tx)?;
    let mut app = AppState::new(view);

    while viewer.is_open() {
        // 1. Keyboard
        let host = viewer.poll_input();
        if host.quit {
            break;
        }
        app.handle_host(host);

        // 2. Drain sensor frames, oldest first
        loop {
            match frames.try_recv() {
                Ok(frame)                       => app.handle_frame(frame),
                Err(TryRecvError::Empty)        => break,
                Err(TryRecvError::Disconnected) => {
                    warn!("body source stopped after {} frames", app.frames());
                    return Ok(());
                }
            }
        }

        // 3. Present
        viewer.present(app.scene(), &app.status())?;
    }

    info!("viewer closed after {} frames", app.frames());
    Ok(())
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
