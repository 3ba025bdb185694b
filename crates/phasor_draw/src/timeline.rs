//! The injected scheduler behind curve playback.
//!
//! Instead of reaching for host timer and display-refresh callbacks
//! directly, a curve schedules work on a [`Timeline`]: a single-threaded
//! queue of cancellable one-shot tasks (the armed restart) and recurring
//! per-frame tasks (the motion loop), driven by whoever owns the display
//! cycle calling [`Timeline::tick`]. The clock is injected so playback is
//! fully testable with a [`VirtualClock`].

use std::cell::Cell;
use std::ops::ControlFlow;
use std::rc::Rc;
use std::time::Instant;

/// Handle to a scheduled task. Ids are allocated monotonically and never
/// reused.
pub type TaskId = u64;

/// Time source for the timeline, in milliseconds.
pub trait Clock {
    fn now_ms(&self) -> f64;
}

/// Wall-clock time since construction.
#[derive(Debug)]
pub struct SystemClock {
    epoch: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            epoch: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now_ms(&self) -> f64 {
        self.epoch.elapsed().as_secs_f64() * 1000.0
    }
}

/// Manually advanced clock for tests and headless drivers.
#[derive(Debug, Default)]
pub struct VirtualClock {
    now: Cell<f64>,
}

impl VirtualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, now_ms: f64) {
        self.now.set(now_ms);
    }

    pub fn advance(&self, delta_ms: f64) {
        self.now.set(self.now.get() + delta_ms);
    }
}

impl Clock for VirtualClock {
    fn now_ms(&self) -> f64 {
        self.now.get()
    }
}

/// Timing of one scheduler tick as seen by a frame task.
#[derive(Debug, Clone, Copy)]
pub struct FrameTick {
    pub now_ms: f64,
    /// Time since the previous tick; 0 on the first tick.
    pub dt_ms: f64,
}

type OneShotFn<Ctx> = Box<dyn FnOnce(&mut Ctx, &mut Timeline<Ctx>)>;
type FrameFn<Ctx> = Box<dyn FnMut(&mut Ctx, FrameTick) -> ControlFlow<()>>;

struct OneShot<Ctx> {
    id: TaskId,
    due_ms: f64,
    run: OneShotFn<Ctx>,
}

struct FrameTask<Ctx> {
    id: TaskId,
    run: FrameFn<Ctx>,
}

/// Single-threaded, cooperative task queue: one-shot delayed tasks plus
/// recurring frame tasks, all cancellable by handle.
///
/// `Ctx` is the driver context handed to every task (for Phasor, the curve
/// being animated). Tasks scheduled while a tick is running start on the
/// next tick; cancellation always takes effect no later than the next
/// dispatch of the cancelled task.
pub struct Timeline<Ctx> {
    clock: Rc<dyn Clock>,
    next_id: TaskId,
    one_shots: Vec<OneShot<Ctx>>,
    frames: Vec<FrameTask<Ctx>>,
    /// Ids cancelled while their task was detached for dispatch.
    cancelled: Vec<TaskId>,
    in_tick: bool,
    last_tick_ms: Option<f64>,
}

impl<Ctx> Timeline<Ctx> {
    pub fn new(clock: Rc<dyn Clock>) -> Self {
        Self {
            clock,
            next_id: 1,
            one_shots: Vec::new(),
            frames: Vec::new(),
            cancelled: Vec::new(),
            in_tick: false,
            last_tick_ms: None,
        }
    }

    pub fn now_ms(&self) -> f64 {
        self.clock.now_ms()
    }

    fn alloc_id(&mut self) -> TaskId {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Schedules a one-shot task `delay_ms` from now.
    pub fn after(
        &mut self,
        delay_ms: f64,
        run: impl FnOnce(&mut Ctx, &mut Timeline<Ctx>) + 'static,
    ) -> TaskId {
        let id = self.alloc_id();
        self.one_shots.push(OneShot {
            id,
            due_ms: self.clock.now_ms() + delay_ms.max(0.0),
            run: Box::new(run),
        });
        id
    }

    /// Registers a recurring frame task, fired on every tick until it
    /// returns `ControlFlow::Break` or is cancelled.
    pub fn every_frame(
        &mut self,
        run: impl FnMut(&mut Ctx, FrameTick) -> ControlFlow<()> + 'static,
    ) -> TaskId {
        let id = self.alloc_id();
        self.frames.push(FrameTask {
            id,
            run: Box::new(run),
        });
        id
    }

    /// Cancels a pending task. Unknown or already-finished ids are ignored,
    /// so a handle may be cancelled more than once.
    pub fn cancel(&mut self, id: TaskId) {
        self.one_shots.retain(|t| t.id != id);
        self.frames.retain(|t| t.id != id);
        if self.in_tick {
            self.cancelled.push(id);
        }
    }

    /// True while any task is scheduled.
    pub fn is_idle(&self) -> bool {
        self.one_shots.is_empty() && self.frames.is_empty()
    }

    /// Runs one scheduler tick: due one-shot tasks first (in scheduling
    /// order), then every frame task registered before this tick.
    pub fn tick(&mut self, ctx: &mut Ctx) {
        let now = self.clock.now_ms();
        let dt = self.last_tick_ms.map_or(0.0, |last| now - last);
        self.last_tick_ms = Some(now);

        self.in_tick = true;

        // Frame tasks added by tasks below start next tick.
        let pending_frames = std::mem::take(&mut self.frames);

        let mut due = Vec::new();
        let mut i = 0;
        while i < self.one_shots.len() {
            if self.one_shots[i].due_ms <= now {
                due.push(self.one_shots.remove(i));
            } else {
                i += 1;
            }
        }
        for task in due {
            if self.cancelled.contains(&task.id) {
                continue;
            }
            (task.run)(ctx, self);
        }

        let info = FrameTick {
            now_ms: now,
            dt_ms: dt,
        };
        let mut keep = Vec::with_capacity(pending_frames.len());
        for mut task in pending_frames {
            if self.cancelled.contains(&task.id) {
                continue;
            }
            if let ControlFlow::Continue(()) = (task.run)(ctx, info) {
                if !self.cancelled.contains(&task.id) {
                    keep.push(task);
                }
            }
        }
        // Surviving older tasks first, then anything registered this tick.
        let added = std::mem::take(&mut self.frames);
        keep.extend(
            added
                .into_iter()
                .filter(|t| !self.cancelled.contains(&t.id)),
        );
        self.frames = keep;

        self.cancelled.clear();
        self.in_tick = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[derive(Default)]
    struct Log {
        events: Vec<String>,
    }

    fn setup() -> (Rc<VirtualClock>, Timeline<Log>, Log) {
        let clock = Rc::new(VirtualClock::new());
        let timeline = Timeline::new(clock.clone() as Rc<dyn Clock>);
        (clock, timeline, Log::default())
    }

    #[test]
    fn one_shot_fires_once_at_its_due_time() {
        let (clock, mut timeline, mut log) = setup();
        timeline.after(100.0, |log: &mut Log, _| log.events.push("fired".into()));

        timeline.tick(&mut log);
        clock.set(99.0);
        timeline.tick(&mut log);
        assert!(log.events.is_empty());

        clock.set(100.0);
        timeline.tick(&mut log);
        assert_eq!(log.events, vec!["fired"]);

        clock.set(200.0);
        timeline.tick(&mut log);
        assert_eq!(log.events.len(), 1);
        assert!(timeline.is_idle());
    }

    #[test]
    fn cancelled_one_shot_never_fires() {
        let (clock, mut timeline, mut log) = setup();
        let id = timeline.after(50.0, |log: &mut Log, _| log.events.push("fired".into()));
        timeline.cancel(id);

        clock.set(500.0);
        timeline.tick(&mut log);
        assert!(log.events.is_empty());
    }

    #[test]
    fn cancel_and_rearm_collapse_to_one_firing() {
        let (clock, mut timeline, mut log) = setup();
        let first = timeline.after(100.0, |log: &mut Log, _| log.events.push("first".into()));

        clock.set(60.0);
        timeline.cancel(first);
        timeline.after(100.0, |log: &mut Log, _| log.events.push("second".into()));

        clock.set(120.0); // past the first deadline, before the second
        timeline.tick(&mut log);
        assert!(log.events.is_empty());

        clock.set(160.0);
        timeline.tick(&mut log);
        assert_eq!(log.events, vec!["second"]);
    }

    #[test]
    fn frame_tasks_see_tick_deltas() {
        let (clock, mut timeline, mut log) = setup();
        timeline.every_frame(|log: &mut Log, tick| {
            log.events.push(format!("{}", tick.dt_ms));
            ControlFlow::Continue(())
        });

        timeline.tick(&mut log);
        clock.advance(16.0);
        timeline.tick(&mut log);
        clock.advance(34.0);
        timeline.tick(&mut log);

        assert_eq!(log.events, vec!["0", "16", "34"]);
    }

    #[test]
    fn breaking_frame_task_is_removed() {
        let (_, mut timeline, mut log) = setup();
        timeline.every_frame(|log: &mut Log, _| {
            log.events.push("ran".into());
            ControlFlow::Break(())
        });

        timeline.tick(&mut log);
        timeline.tick(&mut log);
        assert_eq!(log.events, vec!["ran"]);
        assert!(timeline.is_idle());
    }

    #[test]
    fn one_shot_can_cancel_a_frame_task_before_it_runs_this_tick() {
        let (clock, mut timeline, mut log) = setup();
        let frame = timeline.every_frame(|log: &mut Log, _| {
            log.events.push("frame".into());
            ControlFlow::Continue(())
        });
        timeline.after(10.0, move |_: &mut Log, tl| tl.cancel(frame));

        clock.set(10.0);
        timeline.tick(&mut log);
        assert!(log.events.is_empty());
        assert!(timeline.is_idle());
    }

    #[test]
    fn frame_task_registered_by_a_one_shot_starts_next_tick() {
        let (clock, mut timeline, mut log) = setup();
        timeline.after(10.0, |_: &mut Log, tl| {
            tl.every_frame(|log: &mut Log, _| {
                log.events.push("frame".into());
                ControlFlow::Continue(())
            });
        });

        clock.set(10.0);
        timeline.tick(&mut log);
        assert!(log.events.is_empty());

        timeline.tick(&mut log);
        assert_eq!(log.events, vec!["frame"]);
    }

    #[test]
    fn task_ids_are_unique() {
        let (_, mut timeline, _) = setup();
        let a = timeline.after(1.0, |_: &mut Log, _| {});
        let b = timeline.every_frame(|_: &mut Log, _| ControlFlow::Continue(()));
        let c = timeline.after(1.0, |_: &mut Log, _| {});
        assert!(a != b && b != c && a != c);
    }

    #[test]
    fn virtual_clock_reports_set_time() {
        let (clock, timeline, _) = setup();
        clock.set(1234.5);
        assert_relative_eq!(timeline.now_ms(), 1234.5);
    }
}
