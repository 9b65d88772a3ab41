//! Fixed-timestep bookkeeping.
//!
//! Frame times arrive as arbitrary [`Duration`]s; the clock turns them into
//! a whole number of fixed substeps and carries the remainder to the next
//! frame. All arithmetic is on integer nanoseconds, so a span `T` yields
//! `floor(T / dt)` substeps no matter how it is split into frames.

use std::time::Duration;

#[derive(Clone, Debug)]
pub struct SimulationClock {
    /// Fixed physics timestep.
    dt: Duration,
    /// Time received but not yet simulated (always `< dt`).
    leftover: Duration,
    /// Simulated time so far (`substeps * dt`).
    elapsed: Duration,
    /// Substeps handed out so far.
    substeps: u64,
    /// Substeps allowed per call to [`SimulationClock::advance`]; `0` = unbounded.
    max_per_frame: u64,
    /// Wall time discarded because of `max_per_frame`.
    dropped: Duration,
}

/// Outcome of one [`SimulationClock::advance`] call.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Advance {
    /// Substeps to run for this frame.
    pub substeps: u64,
    /// Time discarded because the per-frame cap was hit.
    pub dropped: Duration,
}

impl SimulationClock {
    /// Creates a clock ticking in steps of `time_step` seconds.
    ///
    /// The step is rounded down to whole nanoseconds and clamped to
    /// `[1 ns, Duration::MAX]`; [`crate::config::Config::validate`] rejects
    /// steps outside that range before they get here.
    ///
    /// ### Parameters
    /// - `time_step` - Fixed step in seconds.
    /// - `max_per_frame` - Substep cap per [`SimulationClock::advance`]; `0` = unbounded.
    pub fn new(time_step: f32, max_per_frame: u32) -> Self {
        let dt = Duration::try_from_secs_f64(f64::from(time_step))
            .unwrap_or(Duration::MAX)
            .max(Duration::from_nanos(1));
        Self {
            dt,
            leftover: Duration::ZERO,
            elapsed: Duration::ZERO,
            substeps: 0,
            max_per_frame: u64::from(max_per_frame),
            dropped: Duration::ZERO,
        }
    }

    /// Converts a frame's elapsed wall time into whole substeps.
    ///
    /// The remainder below one step is kept for the next call. If the
    /// per-frame cap is reached, the excess time is discarded and reported
    /// in [`Advance::dropped`].
    pub fn advance(&mut self, frame: Duration) -> Advance {
        let total = self.leftover.saturating_add(frame);
        let dt_ns = self.dt.as_nanos();
        let mut steps = u64::try_from(total.as_nanos() / dt_ns).unwrap_or(u64::MAX);
        self.leftover = nanos(total.as_nanos() % dt_ns);

        let mut dropped = Duration::ZERO;
        if self.max_per_frame > 0 && steps > self.max_per_frame {
            dropped = nanos(u128::from(steps - self.max_per_frame) * dt_ns);
            steps = self.max_per_frame;
        }

        self.substeps += steps;
        self.elapsed = nanos(u128::from(self.substeps) * dt_ns);
        self.dropped = self.dropped.saturating_add(dropped);

        Advance {
            substeps: steps,
            dropped,
        }
    }

    pub fn time_step(&self) -> Duration {
        self.dt
    }

    pub fn leftover(&self) -> Duration {
        self.leftover
    }

    /// Total simulated time.
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    /// Total substeps handed out.
    pub fn substeps(&self) -> u64 {
        self.substeps
    }

    /// Total wall time discarded by the per-frame cap.
    pub fn dropped(&self) -> Duration {
        self.dropped
    }
}

fn nanos(ns: u128) -> Duration {
    let secs = u64::try_from(ns / 1_000_000_000).unwrap_or(u64::MAX);
    Duration::new(secs, (ns % 1_000_000_000) as u32)
}
