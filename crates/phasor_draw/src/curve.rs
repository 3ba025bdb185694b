//! The animated ODE curve: ties the trajectory engine, dot sampler,
//! rendering sink and playback scheduling together.
//!
//! Every external update tick flows through [`OdeCurve::update`]: the
//! update gate decides whether to re-integrate, dots are resampled and
//! rendered, any running playback is cancelled, and a restart is armed
//! after a settle delay when animation is enabled. Rapid successive
//! updates keep replacing the armed restart, so live parameter dragging
//! collapses into a single eventual playback start.

use crate::options::{CurveOptions, DisplayState};
use crate::surface::{MarkerStyle, Scale, Surface};
use crate::timeline::{FrameTick, TaskId, Timeline};
use anyhow::{Context, Result};
use phasor_core::sampler;
use phasor_core::scope::Scope;
use phasor_core::trajectory::{OdeTrajectory, State};
use std::ops::ControlFlow;
use tracing::debug;

/// Frame advance is expressed relative to a 60 Hz display: at speed 1 the
/// marker moves one trajectory sample per nominal frame.
const NOMINAL_FRAME_MS: f64 = 1000.0 / 60.0;

/// Transient playback state for one curve. Recreated on every update tick
/// that reaches a restart decision.
#[derive(Debug, Default)]
struct Animation {
    /// Continuous position in trajectory samples, wraps modulo length.
    frame_pos: f64,
    playing: bool,
    paused: bool,
    armed: Option<TaskId>,
    motion: Option<TaskId>,
    speed: f64,
    /// Marker styling fixed when the restart was armed; reused by resume.
    marker: Option<MarkerStyle>,
}

/// A curve whose geometry is the solution of a two-variable ODE system.
pub struct OdeCurve<S: Surface, C: Scale> {
    trajectory: OdeTrajectory,
    options: CurveOptions,
    surface: S,
    scale: C,
    dots: Vec<State>,
    /// (show_dots, spacing, trajectory version) of the current dot set.
    dot_key: Option<(bool, f64, u64)>,
    anim: Animation,
    changed: bool,
}

impl<S, C> OdeCurve<S, C>
where
    S: Surface + 'static,
    C: Scale + 'static,
{
    /// Builds the curve, validating the integration configuration. On
    /// failure the caller keeps its plain curve without ODE behavior.
    pub fn new(options: CurveOptions, surface: S, scale: C) -> Result<Self> {
        let trajectory = OdeTrajectory::new(options.trajectory.clone())
            .context("ODE curve configuration rejected")?;
        Ok(Self {
            trajectory,
            options,
            surface,
            scale,
            dots: Vec::new(),
            dot_key: None,
            anim: Animation::default(),
            changed: false,
        })
    }

    /// The single per-tick entry point. Returns whether the trajectory was
    /// regenerated, which the containing diagram uses as its redraw signal.
    pub fn update(
        &mut self,
        scope: &Scope,
        force: bool,
        timeline: &mut Timeline<Self>,
    ) -> bool {
        let changed = self.trajectory.update(scope, force);

        // Dynamic attributes are resolved every tick regardless of
        // staleness; they may depend on parameters the gate ignores.
        let display = DisplayState::resolve(&self.options, scope);

        let dot_key = (
            display.show_dots,
            display.dot_spacing,
            self.trajectory.version(),
        );
        if self.dot_key != Some(dot_key) {
            self.dots = if display.show_dots {
                sampler::sample(self.trajectory.data(), display.dot_spacing)
            } else {
                Vec::new()
            };
            self.dot_key = Some(dot_key);
        }

        if display.show_dots && !self.dots.is_empty() {
            let screen: Vec<(f64, f64)> = self
                .dots
                .iter()
                .map(|s| self.scale.to_screen(*s))
                .collect();
            self.surface.draw_dots(&screen, &display.dot_style);
        } else {
            self.surface.clear_dots();
        }

        // Any running playback and any pending restart die here; the
        // session is rebuilt from this tick's resolved attributes.
        self.cancel_motion(timeline);
        if let Some(id) = self.anim.armed.take() {
            timeline.cancel(id);
        }
        self.anim = Animation::default();

        if display.animation {
            self.anim.speed = display.speed;
            self.anim.marker = Some(display.marker_style.clone());
            let restart_delay_ms = display.restart_delay_ms;
            self.anim.armed = Some(timeline.after(restart_delay_ms, |curve, tl| {
                curve.anim.armed = None;
                curve.start_playback(tl);
            }));
            debug!(delay_ms = restart_delay_ms, "animation restart armed");
        }

        self.changed = changed;
        changed
    }

    /// Starts the motion loop, stopping any previous one first so at most
    /// one loop is ever live.
    pub fn start_playback(&mut self, timeline: &mut Timeline<Self>) {
        self.cancel_motion(timeline);
        if self.trajectory.data().is_empty() {
            return;
        }
        self.anim.frame_pos = 0.0;
        self.anim.paused = false;
        self.anim.playing = true;
        self.anim.motion =
            Some(timeline.every_frame(|curve, tick| curve.advance_frame(tick)));
    }

    fn advance_frame(&mut self, tick: FrameTick) -> ControlFlow<()> {
        if !self.anim.playing {
            return ControlFlow::Break(());
        }
        let len = self.trajectory.data().len();
        if len == 0 {
            return ControlFlow::Break(());
        }

        let advance = self.anim.speed * tick.dt_ms / NOMINAL_FRAME_MS;
        self.anim.frame_pos = (self.anim.frame_pos + advance).rem_euclid(len as f64);

        // rem_euclid of a tiny negative can round up to len exactly.
        let index = (self.anim.frame_pos.floor() as usize).min(len - 1);
        let pos = self.scale.to_screen(self.trajectory.data()[index]);
        if let Some(style) = &self.anim.marker {
            self.surface.move_marker(pos, style);
        }
        ControlFlow::Continue(())
    }

    /// Suspends playback, keeping the current frame position. The armed
    /// restart timer, if any, is unaffected.
    pub fn pause(&mut self, timeline: &mut Timeline<Self>) {
        if !self.anim.playing {
            return;
        }
        self.cancel_motion(timeline);
        self.anim.paused = true;
    }

    /// Resumes a paused playback from where it stopped, with the same
    /// marker styling.
    pub fn resume(&mut self, timeline: &mut Timeline<Self>) {
        if !self.anim.paused {
            return;
        }
        self.anim.paused = false;
        self.anim.playing = true;
        self.anim.motion =
            Some(timeline.every_frame(|curve, tick| curve.advance_frame(tick)));
    }

    /// Stops playback and removes the moving marker. Safe to call from any
    /// state, any number of times.
    pub fn stop(&mut self, timeline: &mut Timeline<Self>) {
        self.cancel_motion(timeline);
        if let Some(id) = self.anim.armed.take() {
            timeline.cancel(id);
        }
        self.anim.paused = false;
        self.anim.frame_pos = 0.0;
        self.surface.remove_marker();
    }

    fn cancel_motion(&mut self, timeline: &mut Timeline<Self>) {
        self.anim.playing = false;
        if let Some(id) = self.anim.motion.take() {
            timeline.cancel(id);
        }
    }

    // --- published results ---

    /// The full trajectory, in data coordinates.
    pub fn data(&self) -> &[State] {
        self.trajectory.data()
    }

    /// The sampled dot subset of the trajectory.
    pub fn dots(&self) -> &[State] {
        &self.dots
    }

    pub fn version(&self) -> u64 {
        self.trajectory.version()
    }

    /// Whether the last update regenerated the trajectory.
    pub fn changed(&self) -> bool {
        self.changed
    }

    /// Point-in-time sampling for external callers (label placement etc.).
    pub fn evaluate_at(&self, t: f64) -> Option<State> {
        self.trajectory.evaluate_at(t)
    }

    pub fn frame_pos(&self) -> f64 {
        self.anim.frame_pos
    }

    pub fn is_playing(&self) -> bool {
        self.anim.playing
    }

    pub fn is_paused(&self) -> bool {
        self.anim.paused
    }

    pub fn is_armed(&self) -> bool {
        self.anim.armed.is_some()
    }

    pub fn options(&self) -> &CurveOptions {
        &self.options
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }
}
