//! Frame driver.
//!
//! A [`Scheduler`] reads a [`TimeSource`] once per tick, hands the elapsed
//! time to [`Simulation::advance`] and presents the result to a
//! [`Renderer`]. Swapping in a [`ManualTimeSource`] makes a run fully
//! reproducible.

use std::time::{Duration, Instant};

use crate::{
    error::ClothError,
    render::{ClothFrame, Renderer},
    simulation::{FrameReport, Simulation},
};

/// A monotonically non-decreasing clock.
pub trait TimeSource {
    /// Time since some fixed epoch.
    fn now(&mut self) -> Duration;
}

/// Wall clock backed by [`Instant`].
#[derive(Debug, Clone, Copy)]
pub struct MonotonicTimeSource {
    epoch: Instant,
}

impl MonotonicTimeSource {
    pub fn new() -> Self {
        Self {
            epoch: Instant::now(),
        }
    }
}

impl Default for MonotonicTimeSource {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeSource for MonotonicTimeSource {
    fn now(&mut self) -> Duration {
        self.epoch.elapsed()
    }
}

/// A clock that only moves when told to.
#[derive(Debug, Clone, Copy, Default)]
pub struct ManualTimeSource {
    now: Duration,
}

impl ManualTimeSource {
    pub fn advance(&mut self, by: Duration) {
        self.now += by;
    }

    /// Jumps to `to`; times earlier than the current one are ignored.
    pub fn set(&mut self, to: Duration) {
        self.now = self.now.max(to);
    }
}

impl TimeSource for ManualTimeSource {
    fn now(&mut self) -> Duration {
        self.now
    }
}

impl<T: TimeSource + ?Sized> TimeSource for &mut T {
    fn now(&mut self) -> Duration {
        (**self).now()
    }
}

#[derive(Debug)]
pub struct Scheduler<T> {
    source: T,
    last: Option<Duration>,
}

impl<T: TimeSource> Scheduler<T> {
    pub fn new(source: T) -> Self {
        Self { source, last: None }
    }

    pub fn source(&self) -> &T {
        &self.source
    }

    pub fn source_mut(&mut self) -> &mut T {
        &mut self.source
    }

    /// Forgets the previous reading so the next tick starts from zero
    /// elapsed time (used after pausing or resetting).
    pub fn rebase(&mut self) {
        self.last = None;
    }

    /// Runs one tick: measure elapsed time, advance, present.
    ///
    /// The first tick after construction or [`Scheduler::rebase`] only
    /// records the time and advances by zero.
    ///
    /// ### Errors
    /// Errors from [`Simulation::advance`]; nothing is presented in that case.
    pub fn run_frame<R: Renderer + ?Sized>(
        &mut self,
        sim: &mut Simulation,
        renderer: &mut R,
    ) -> Result<FrameReport, ClothError> {
        let now = self.source.now();
        let elapsed = self
            .last
            .map_or(Duration::ZERO, |last| now.saturating_sub(last));
        self.last = Some(now);

        let report = sim.advance(elapsed)?;
        renderer.present(&ClothFrame::from_source(&*sim, report));
        Ok(report)
    }

    /// Runs `n` ticks and returns the report of the last one.
    pub fn run_frames<R: Renderer + ?Sized>(
        &mut self,
        n: usize,
        sim: &mut Simulation,
        renderer: &mut R,
    ) -> Result<FrameReport, ClothError> {
        let mut last = FrameReport::default();
        for _ in 0..n {
            last = self.run_frame(sim, renderer)?;
        }
        Ok(last)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::render::{FrameRecorder, NullRenderer, SurfaceSource};

    fn run_split(frames: &[Duration]) -> Simulation {
        let mut sim = Simulation::new(Config::default().with_size(6)).unwrap();
        let mut sched = Scheduler::new(ManualTimeSource::default());
        sched.run_frame(&mut sim, &mut NullRenderer).unwrap();
        for &f in frames {
            sched.source_mut().advance(f);
            sched.run_frame(&mut sim, &mut NullRenderer).unwrap();
        }
        sim
    }

    #[test]
    fn first_frame_advances_nothing() {
        let mut sim = Simulation::new(Config::default().with_size(3)).unwrap();
        let mut source = ManualTimeSource::default();
        source.set(Duration::from_secs(100));
        let mut sched = Scheduler::new(source);

        let report = sched.run_frame(&mut sim, &mut NullRenderer).unwrap();

        assert_eq!(report.substeps, 0);
    }

    #[test]
    fn result_does_not_depend_on_frame_split() {
        let a = run_split(&[Duration::from_millis(100); 4]);
        let b = run_split(&[
            Duration::from_micros(16_667),
            Duration::from_micros(33_333),
            Duration::from_micros(150_000),
            Duration::from_micros(200_000),
        ]);

        assert_eq!(a.steps_run(), 400);
        assert_eq!(b.steps_run(), 400);
        assert_eq!(a.positions(), b.positions());
    }

    #[test]
    fn long_frames_run_every_substep_by_default() {
        let one = run_split(&[Duration::from_secs(1)]);
        let split = run_split(&[Duration::from_millis(250); 4]);

        assert_eq!(one.steps_run(), 1000);
        assert_eq!(split.steps_run(), 1000);
        assert_eq!(one.positions(), split.positions());
    }

    #[test]
    fn presents_each_frame_after_update() {
        let mut sim = Simulation::new(Config::default().with_size(4)).unwrap();
        let mut sched = Scheduler::new(ManualTimeSource::default());
        let mut recorder = FrameRecorder::default();

        sched.run_frame(&mut sim, &mut recorder).unwrap();
        sched.source_mut().advance(Duration::from_millis(20));
        sched.run_frame(&mut sim, &mut recorder).unwrap();

        assert_eq!(recorder.frames.len(), 2);
        let last = recorder.last().unwrap();
        assert_eq!(last.report.substeps, 20);
        assert_eq!(last.positions, sim.positions());
        assert_eq!(last.triangle_count, 18);
    }

    #[test]
    fn rebase_skips_paused_time() {
        let mut sim = Simulation::new(Config::default().with_size(3)).unwrap();
        let mut sched = Scheduler::new(ManualTimeSource::default());
        sched.run_frame(&mut sim, &mut NullRenderer).unwrap();

        sched.source_mut().advance(Duration::from_secs(5));
        sched.rebase();
        let report = sched.run_frame(&mut sim, &mut NullRenderer).unwrap();

        assert_eq!(report.substeps, 0);
        assert_eq!(sim.steps_run(), 0);
    }

    #[test]
    fn run_frames_stops_on_divergence() {
        let cfg = Config::default()
            .with_size(4)
            .with_stiffness(1.0e9)
            .with_time_step(0.01);
        let mut sim = Simulation::new(cfg).unwrap();
        let mut source = ManualTimeSource::default();
        let mut recorder = FrameRecorder::default();

        let mut sched = Scheduler::new(&mut source);
        sched.run_frame(&mut sim, &mut recorder).unwrap();
        sched.source_mut().advance(Duration::from_secs(1));
        let err = sched.run_frames(3, &mut sim, &mut recorder).unwrap_err();

        assert!(matches!(err, ClothError::Diverged { .. }));
        assert_eq!(recorder.frames.len(), 1);
        assert_eq!(
            sched.run_frame(&mut sim, &mut recorder),
            Err(ClothError::Halted)
        );
    }
}
