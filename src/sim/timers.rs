//! Wall-clock timers for a session
//!
//! Spawning, difficulty ramps, countdown steps, grace expiry and reverse zones
//! run off these timers rather than off the frame callback. Every timer has a
//! handle so the whole set can be cancelled when a session ends.

/// Shortest allowed repeat period
pub const MIN_PERIOD_MS: f64 = 1.0;

/// Handle returned when scheduling a timer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerHandle(u64);

/// Work a timer performs when it fires
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerTask {
    CountdownStep,
    GraceExpired,
    SpawnEntity,
    DifficultyRamp,
    ReverseZoneStart,
    ReverseZoneEnd,
}

#[derive(Debug, Clone)]
struct Timer {
    handle: TimerHandle,
    due_ms: f64,
    period_ms: Option<f64>,
    task: TimerTask,
}

/// Pending timers against a monotonic clock
#[derive(Debug, Clone, Default)]
pub struct TimerQueue {
    /// Time of the timer being fired, or the horizon once drained
    now_ms: f64,
    /// How far the clock has been advanced
    horizon_ms: f64,
    next_handle: u64,
    timers: Vec<Timer>,
}

impl TimerQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn now_ms(&self) -> f64 {
        self.now_ms
    }

    pub fn len(&self) -> usize {
        self.timers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timers.is_empty()
    }

    fn insert(&mut self, due_ms: f64, period_ms: Option<f64>, task: TimerTask) -> TimerHandle {
        let handle = TimerHandle(self.next_handle);
        self.next_handle += 1;
        self.timers.push(Timer {
            handle,
            due_ms,
            period_ms,
            task,
        });
        handle
    }

    /// Fire `task` once, `delay_ms` from now
    pub fn schedule_once(&mut self, delay_ms: f64, task: TimerTask) -> TimerHandle {
        self.insert(self.now_ms + delay_ms.max(0.0), None, task)
    }

    /// Fire `task` every `period_ms`, first after one period
    pub fn schedule_every(&mut self, period_ms: f64, task: TimerTask) -> TimerHandle {
        let period = period_ms.max(MIN_PERIOD_MS);
        self.insert(self.now_ms + period, Some(period), task)
    }

    /// Returns false if the handle had already fired or been cancelled
    pub fn cancel(&mut self, handle: TimerHandle) -> bool {
        let before = self.timers.len();
        self.timers.retain(|t| t.handle != handle);
        self.timers.len() != before
    }

    /// Drop every pending timer; returns how many were dropped
    pub fn cancel_all(&mut self) -> usize {
        let count = self.timers.len();
        self.timers.clear();
        count
    }

    pub fn is_pending(&self, handle: TimerHandle) -> bool {
        self.timers.iter().any(|t| t.handle == handle)
    }

    /// Move the clock forward. Time never runs backwards.
    ///
    /// Due timers are not fired here; drain them with [`pop_due`](Self::pop_due).
    pub fn advance(&mut self, dt_ms: f64) {
        if dt_ms > 0.0 {
            self.horizon_ms += dt_ms;
        }
        if !self.timers.iter().any(|t| t.due_ms <= self.horizon_ms) {
            self.now_ms = self.horizon_ms;
        }
    }

    /// Next timer due within the advanced clock, earliest first (ties by
    /// handle). The clock reads the timer's due time while it fires, so work
    /// scheduled from inside a task is relative to when the task was due.
    ///
    /// Repeating timers are re-armed one period later, so a long clock jump
    /// yields one firing per elapsed period.
    pub fn pop_due(&mut self) -> Option<(TimerHandle, TimerTask)> {
        let horizon = self.horizon_ms;
        let Some(index) = self
            .timers
            .iter()
            .enumerate()
            .filter(|(_, t)| t.due_ms <= horizon)
            .min_by(|(_, a), (_, b)| {
                a.due_ms
                    .total_cmp(&b.due_ms)
                    .then_with(|| a.handle.cmp(&b.handle))
            })
            .map(|(i, _)| i)
        else {
            self.now_ms = horizon;
            return None;
        };

        let timer = &mut self.timers[index];
        let fired = (timer.handle, timer.task);
        self.now_ms = self.now_ms.max(timer.due_ms);
        let period = timer.period_ms;
        match period {
            Some(period) => timer.due_ms += period,
            None => {
                self.timers.swap_remove(index);
            }
        }
        Some(fired)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drain(queue: &mut TimerQueue) -> Vec<TimerTask> {
        std::iter::from_fn(|| queue.pop_due().map(|(_, task)| task)).collect()
    }

    #[test]
    fn test_once_fires_once() {
        let mut queue = TimerQueue::new();
        queue.schedule_once(100.0, TimerTask::GraceExpired);
        queue.advance(99.0);
        assert!(drain(&mut queue).is_empty());
        queue.advance(1.0);
        assert_eq!(drain(&mut queue), vec![TimerTask::GraceExpired]);
        queue.advance(1000.0);
        assert!(drain(&mut queue).is_empty());
        assert!(queue.is_empty());
    }

    #[test]
    fn test_repeating_catches_up() {
        let mut queue = TimerQueue::new();
        queue.schedule_every(50.0, TimerTask::DifficultyRamp);
        queue.advance(175.0);
        assert_eq!(drain(&mut queue).len(), 3);
        queue.advance(25.0);
        assert_eq!(drain(&mut queue).len(), 1);
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn test_due_order() {
        let mut queue = TimerQueue::new();
        queue.schedule_once(30.0, TimerTask::SpawnEntity);
        queue.schedule_once(10.0, TimerTask::CountdownStep);
        queue.schedule_once(30.0, TimerTask::ReverseZoneEnd);
        queue.advance(40.0);
        assert_eq!(
            drain(&mut queue),
            vec![
                TimerTask::CountdownStep,
                TimerTask::SpawnEntity,
                TimerTask::ReverseZoneEnd
            ]
        );
    }

    #[test]
    fn test_cancel() {
        let mut queue = TimerQueue::new();
        let spawn = queue.schedule_once(10.0, TimerTask::SpawnEntity);
        let ramp = queue.schedule_every(10.0, TimerTask::DifficultyRamp);
        assert!(queue.cancel(spawn));
        assert!(!queue.cancel(spawn));
        assert!(queue.is_pending(ramp));
        queue.advance(10.0);
        assert_eq!(drain(&mut queue), vec![TimerTask::DifficultyRamp]);
        assert_eq!(queue.cancel_all(), 1);
        queue.advance(100.0);
        assert!(drain(&mut queue).is_empty());
    }

    #[test]
    fn test_rescheduling_inside_a_task_uses_due_time() {
        let mut queue = TimerQueue::new();
        queue.schedule_once(500.0, TimerTask::SpawnEntity);
        queue.advance(1600.0);
        let mut fired = 0;
        while let Some((_, task)) = queue.pop_due() {
            fired += 1;
            assert_eq!(queue.now_ms(), 500.0 * fired as f64);
            queue.schedule_once(500.0, task);
        }
        assert_eq!(fired, 3);
        assert_eq!(queue.now_ms(), 1600.0);
    }

    #[test]
    fn test_zero_period_is_bounded() {
        let mut queue = TimerQueue::new();
        queue.schedule_every(0.0, TimerTask::DifficultyRamp);
        queue.advance(5.0);
        assert_eq!(drain(&mut queue).len(), 5);
    }

    #[test]
    fn test_clock_is_monotonic() {
        let mut queue = TimerQueue::new();
        queue.advance(10.0);
        queue.advance(-5.0);
        assert_eq!(queue.now_ms(), 10.0);
    }
}
