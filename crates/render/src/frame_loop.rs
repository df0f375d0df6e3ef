//! Self-rescheduling frame loop.
//!
//! The loop is armed once with [`FrameLoop::start`]. Every scheduled frame runs
//! the caller's work and then re-arms the scheduler, so frames keep coming until
//! the [`StopSignal`] is raised (by the host, or by the loop itself once a frame
//! limit is reached). Frame `n` always completes before frame `n + 1` begins.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

/// Something that will invoke the next frame later, e.g. a window redraw request.
pub trait FrameScheduler {
    fn schedule(&mut self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    /// No frame pending.
    Idle,
    /// One frame pending with the scheduler.
    Scheduled,
    /// Stop was requested; nothing will be scheduled again.
    Stopped,
}

/// Cloneable handle that ends the loop before its next frame.
#[derive(Debug, Clone, Default)]
pub struct StopSignal(Arc<AtomicBool>);

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stop(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Handed to the per-frame work.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameTick {
    /// Zero-based frame number.
    pub index: u64,
    /// Wall-clock seconds since the loop was started. Never decreases.
    pub elapsed: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    /// The frame ran and the next one is scheduled.
    Rearmed,
    /// The loop is stopped; the frame may or may not have run.
    Stopped,
    /// Nothing was scheduled, so nothing ran.
    NotScheduled,
}

#[derive(Debug)]
pub struct FrameLoop {
    state: LoopState,
    stop: StopSignal,
    started_at: Instant,
    last_elapsed: f32,
    frames: u64,
    frame_limit: Option<u64>,
}

impl Default for FrameLoop {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameLoop {
    pub fn new() -> Self {
        Self {
            state: LoopState::Idle,
            stop: StopSignal::new(),
            started_at: Instant::now(),
            last_elapsed: 0.0,
            frames: 0,
            frame_limit: None,
        }
    }

    /// Raise the stop signal after `limit` frames have run.
    pub fn with_frame_limit(mut self, limit: Option<u64>) -> Self {
        self.frame_limit = limit;
        self
    }

    pub fn stop_signal(&self) -> StopSignal {
        self.stop.clone()
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    /// Frames produced so far.
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Idle → Scheduled. Returns false when already scheduled or stopped.
    pub fn start(&mut self, scheduler: &mut impl FrameScheduler) -> bool {
        if self.state != LoopState::Idle {
            return false;
        }
        if self.stop.is_stopped() {
            self.state = LoopState::Stopped;
            return false;
        }
        self.state = LoopState::Scheduled;
        self.started_at = Instant::now();
        self.last_elapsed = 0.0;
        scheduler.schedule();
        tracing::debug!("frame loop started");
        true
    }

    /// Run one scheduled frame, then re-arm unless stopped.
    ///
    /// `work` returns whether it produced a frame. Skipped frames are re-armed
    /// but do not advance the frame index or count toward the limit.
    pub fn run_frame(
        &mut self,
        scheduler: &mut impl FrameScheduler,
        work: impl FnOnce(FrameTick) -> bool,
    ) -> FrameOutcome {
        match self.state {
            LoopState::Scheduled => {}
            LoopState::Stopped => return FrameOutcome::Stopped,
            LoopState::Idle => return FrameOutcome::NotScheduled,
        }
        if self.stop.is_stopped() {
            return self.halt();
        }

        self.state = LoopState::Idle;
        let elapsed = self
            .started_at
            .elapsed()
            .as_secs_f32()
            .max(self.last_elapsed);
        self.last_elapsed = elapsed;
        let tick = FrameTick {
            index: self.frames,
            elapsed,
        };
        let produced = {
            let _span = tracing::trace_span!("frame", index = tick.index).entered();
            work(tick)
        };
        if produced {
            self.frames += 1;
        }

        if self.frame_limit.is_some_and(|limit| self.frames >= limit) {
            tracing::info!(frames = self.frames, "frame limit reached");
            self.stop.stop();
        }
        if self.stop.is_stopped() {
            return self.halt();
        }

        self.state = LoopState::Scheduled;
        scheduler.schedule();
        FrameOutcome::Rearmed
    }

    fn halt(&mut self) -> FrameOutcome {
        if self.state != LoopState::Stopped {
            tracing::debug!(frames = self.frames, "frame loop stopped");
        }
        self.state = LoopState::Stopped;
        FrameOutcome::Stopped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[derive(Default)]
    struct CountingScheduler {
        scheduled: usize,
    }

    impl FrameScheduler for CountingScheduler {
        fn schedule(&mut self) {
            self.scheduled += 1;
        }
    }

    #[test]
    fn frames_do_not_run_before_start() {
        let mut sched = CountingScheduler::default();
        let mut frame_loop = FrameLoop::new();
        let mut ran = false;
        let outcome = frame_loop.run_frame(&mut sched, |_| {
            ran = true;
            true
        });
        assert_eq!(outcome, FrameOutcome::NotScheduled);
        assert!(!ran);
        assert_eq!(sched.scheduled, 0);
    }

    #[test]
    fn start_arms_once() {
        let mut sched = CountingScheduler::default();
        let mut frame_loop = FrameLoop::new();
        assert!(frame_loop.start(&mut sched));
        assert!(!frame_loop.start(&mut sched));
        assert_eq!(frame_loop.state(), LoopState::Scheduled);
        assert_eq!(sched.scheduled, 1);
    }

    #[test]
    fn each_frame_rearms() {
        let mut sched = CountingScheduler::default();
        let mut frame_loop = FrameLoop::new();
        frame_loop.start(&mut sched);

        let mut indices = Vec::new();
        let mut last_elapsed = 0.0;
        for _ in 0..5 {
            let outcome = frame_loop.run_frame(&mut sched, |tick| {
                assert!(tick.elapsed >= last_elapsed);
                last_elapsed = tick.elapsed;
                indices.push(tick.index);
                true
            });
            assert_eq!(outcome, FrameOutcome::Rearmed);
            assert_eq!(frame_loop.state(), LoopState::Scheduled);
        }
        assert_eq!(indices, vec![0, 1, 2, 3, 4]);
        assert_eq!(sched.scheduled, 6);
        assert_eq!(frame_loop.frames(), 5);
    }

    #[test]
    fn clock_starts_when_the_loop_starts() {
        let mut sched = CountingScheduler::default();
        let mut frame_loop = FrameLoop::new();
        std::thread::sleep(Duration::from_millis(200));
        frame_loop.start(&mut sched);

        let mut first = f32::MAX;
        frame_loop.run_frame(&mut sched, |tick| {
            first = tick.elapsed;
            true
        });
        assert!(first < 0.15, "first frame saw {first}s of set-up time");
    }

    #[test]
    fn skipped_frames_do_not_count() {
        let mut sched = CountingScheduler::default();
        let mut frame_loop = FrameLoop::new().with_frame_limit(Some(2));
        frame_loop.start(&mut sched);

        let mut indices = Vec::new();
        for produced in [false, true, false, true] {
            frame_loop.run_frame(&mut sched, |tick| {
                indices.push(tick.index);
                produced
            });
        }
        assert_eq!(indices, vec![0, 0, 1, 1]);
        assert_eq!(frame_loop.frames(), 2);
        assert_eq!(frame_loop.state(), LoopState::Stopped);
        assert_eq!(sched.scheduled, 4);
    }

    #[test]
    fn stop_signal_ends_the_loop_before_the_next_frame() {
        let mut sched = CountingScheduler::default();
        let mut frame_loop = FrameLoop::new();
        let stop = frame_loop.stop_signal();
        frame_loop.start(&mut sched);
        frame_loop.run_frame(&mut sched, |_| true);

        stop.stop();
        let mut ran = false;
        let outcome = frame_loop.run_frame(&mut sched, |_| {
            ran = true;
            true
        });
        assert_eq!(outcome, FrameOutcome::Stopped);
        assert!(!ran);
        assert_eq!(frame_loop.state(), LoopState::Stopped);
        assert_eq!(sched.scheduled, 2);
        assert!(!frame_loop.start(&mut sched));
    }

    #[test]
    fn stop_raised_inside_a_frame_skips_rearm() {
        let mut sched = CountingScheduler::default();
        let mut frame_loop = FrameLoop::new();
        let stop = frame_loop.stop_signal();
        frame_loop.start(&mut sched);
        let outcome = frame_loop.run_frame(&mut sched, |_| {
            stop.stop();
            true
        });
        assert_eq!(outcome, FrameOutcome::Stopped);
        assert_eq!(frame_loop.frames(), 1);
        assert_eq!(sched.scheduled, 1);
    }

    #[test]
    fn frame_limit_stops_the_loop() {
        let mut sched = CountingScheduler::default();
        let mut frame_loop = FrameLoop::new().with_frame_limit(Some(3));
        let stop = frame_loop.stop_signal();
        frame_loop.start(&mut sched);

        let mut outcomes = Vec::new();
        for _ in 0..5 {
            outcomes.push(frame_loop.run_frame(&mut sched, |_| true));
        }
        assert_eq!(
            outcomes,
            vec![
                FrameOutcome::Rearmed,
                FrameOutcome::Rearmed,
                FrameOutcome::Stopped,
                FrameOutcome::Stopped,
                FrameOutcome::Stopped,
            ]
        );
        assert_eq!(frame_loop.frames(), 3);
        assert!(stop.is_stopped());
    }

    #[test]
    fn stopped_before_start() {
        let mut sched = CountingScheduler::default();
        let mut frame_loop = FrameLoop::new();
        frame_loop.stop_signal().stop();
        assert!(!frame_loop.start(&mut sched));
        assert_eq!(frame_loop.state(), LoopState::Stopped);
        assert_eq!(sched.scheduled, 0);
    }
}
