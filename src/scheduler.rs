use crate::classifier::TimerHandle;

/// Deferred-callback capability the host lends to the tap engine.
///
/// `schedule` arms a one-shot timer `delay_ms` after `now_ms`; when it fires
/// the host calls [`TapEngine::timer_fired`](crate::TapEngine::timer_fired)
/// with the same handle. Cancelling a handle that already fired or was
/// already cancelled must be a no-op.
pub trait TapScheduler {
    fn schedule(&mut self, handle: TimerHandle, now_ms: u64, delay_ms: u64);
    fn cancel(&mut self, handle: TimerHandle);
}

/// Polled scheduler keeping at most one armed deadline.
///
/// Hosts without a native timer facility ask for [`deadline_ms`] after each
/// engine call and poll [`take_due`] with the current clock. Tests drive it
/// with a virtual clock the same way.
///
/// [`deadline_ms`]: DeadlineScheduler::deadline_ms
/// [`take_due`]: DeadlineScheduler::take_due
#[derive(Clone, Copy, Debug, Default)]
pub struct DeadlineScheduler {
    armed: Option<(u64, TimerHandle)>,
}

impl DeadlineScheduler {
    pub fn deadline_ms(&self) -> Option<u64> {
        self.armed.map(|(fire_at_ms, _)| fire_at_ms)
    }

    pub fn take_due(&mut self, now_ms: u64) -> Option<TimerHandle> {
        match self.armed {
            Some((fire_at_ms, handle)) if now_ms >= fire_at_ms => {
                self.armed = None;
                Some(handle)
            }
            _ => None,
        }
    }
}

impl TapScheduler for DeadlineScheduler {
    fn schedule(&mut self, handle: TimerHandle, now_ms: u64, delay_ms: u64) {
        self.armed = Some((now_ms.saturating_add(delay_ms), handle));
    }

    fn cancel(&mut self, handle: TimerHandle) {
        if self.armed.map(|(_, armed)| armed) == Some(handle) {
            self.armed = None;
        }
    }
}
