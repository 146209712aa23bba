use crate::classifier::{DispatchContext, Effect, TapHsm, TapHsmEvent};
use crate::scheduler::{DeadlineScheduler, TapScheduler};
use crate::{Gesture, PointerEvent, TimerHandle};

/// Tap disambiguation engine for one interactive surface.
///
/// Consumes the host's raw `touch_start`/`touch_end`/`tap`/`long_press`
/// callbacks, each stamped in milliseconds from one monotonic clock, and
/// produces at most one [`Gesture`] per call. A first tap is only a
/// candidate: its `SingleTap` is deferred through the scheduler and
/// surfaces via [`timer_fired`](Self::timer_fired) unless a second tap
/// lands inside the double-tap window first.
///
/// One engine per surface, created once for the surface's lifetime. All
/// state is private to the instance; calls must come from a single event
/// loop in host delivery order (touch-start, touch-end, tap). Out-of-order
/// delivery is not defended against.
pub struct TapEngine<S: TapScheduler> {
    machine: statig::blocking::StateMachine<TapHsm>,
    scheduler: S,
}

impl Default for TapEngine<DeadlineScheduler> {
    fn default() -> Self {
        Self::new(DeadlineScheduler::default())
    }
}

impl<S: TapScheduler> TapEngine<S> {
    pub fn new(scheduler: S) -> Self {
        Self {
            machine: TapHsm::machine(),
            scheduler,
        }
    }

    pub fn touch_start(&mut self, now_ms: u64) -> Option<Gesture> {
        self.dispatch(TapHsmEvent::TouchStart { now_ms })
    }

    pub fn touch_end(&mut self, now_ms: u64) -> Option<Gesture> {
        self.dispatch(TapHsmEvent::TouchEnd { now_ms })
    }

    pub fn tap(&mut self, now_ms: u64) -> Option<Gesture> {
        self.dispatch(TapHsmEvent::Tap { now_ms })
    }

    pub fn long_press(&mut self, now_ms: u64) -> Option<Gesture> {
        self.dispatch(TapHsmEvent::LongPress { now_ms })
    }

    /// Host timer callback for a previously scheduled deferred emission.
    /// Stale handles (already fired or cancelled) are ignored.
    pub fn timer_fired(&mut self, handle: TimerHandle) -> Option<Gesture> {
        self.dispatch(TapHsmEvent::TimerFired { handle })
    }

    /// Routes one timestamped pointer event to the matching entry point.
    pub fn handle(&mut self, now_ms: u64, event: PointerEvent) -> Option<Gesture> {
        match event {
            PointerEvent::TouchStart => self.touch_start(now_ms),
            PointerEvent::TouchEnd => self.touch_end(now_ms),
            PointerEvent::Tap => self.tap(now_ms),
            PointerEvent::LongPress => self.long_press(now_ms),
        }
    }

    pub fn scheduler(&self) -> &S {
        &self.scheduler
    }

    fn dispatch(&mut self, event: TapHsmEvent) -> Option<Gesture> {
        let mut context = DispatchContext::default();
        self.machine.handle_with_context(&event, &mut context);

        let mut gesture = None;
        for effect in context.finish().into_iter().flatten() {
            match effect {
                Effect::Emit(emitted) => {
                    log::debug!("tap: gesture={:?}", emitted);
                    gesture = Some(emitted);
                }
                Effect::Arm {
                    handle,
                    now_ms,
                    delay_ms,
                } => {
                    log::trace!("tap: arm handle={:?} delay_ms={}", handle, delay_ms);
                    self.scheduler.schedule(handle, now_ms, delay_ms);
                }
                Effect::Disarm(handle) => {
                    log::trace!("tap: disarm handle={:?}", handle);
                    self.scheduler.cancel(handle);
                }
            }
        }
        gesture
    }
}

impl TapEngine<DeadlineScheduler> {
    /// Deadline of the armed deferred emission, if any.
    pub fn deadline_ms(&self) -> Option<u64> {
        self.scheduler.deadline_ms()
    }

    /// Fires the deferred emission once its deadline has passed. Hosts on a
    /// polled loop call this with the current clock; tests drive it as a
    /// virtual clock.
    pub fn poll(&mut self, now_ms: u64) -> Option<Gesture> {
        let handle = self.scheduler.take_due(now_ms)?;
        self.timer_fired(handle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_engine() -> TapEngine<DeadlineScheduler> {
        TapEngine::default()
    }

    fn quick_tap(engine: &mut TapEngine<DeadlineScheduler>, start_ms: u64, tap_ms: u64) -> Option<Gesture> {
        assert_eq!(engine.touch_start(start_ms), None);
        assert_eq!(engine.touch_end(start_ms + 50), None);
        engine.tap(tap_ms)
    }

    #[test]
    fn single_tap_emits_after_window() {
        let mut engine = new_engine();

        assert_eq!(quick_tap(&mut engine, 0, 60), None);
        assert_eq!(engine.deadline_ms(), Some(360));

        assert_eq!(engine.poll(359), None);
        assert_eq!(engine.poll(360), Some(Gesture::SingleTap));
        assert_eq!(engine.deadline_ms(), None);
        assert_eq!(engine.poll(1_000), None);
    }

    #[test]
    fn double_tap_cancels_pending_single() {
        let mut engine = new_engine();

        assert_eq!(quick_tap(&mut engine, 0, 60), None);
        assert_eq!(quick_tap(&mut engine, 100, 200), Some(Gesture::DoubleTap));

        // The deferred single tap never fires.
        assert_eq!(engine.deadline_ms(), None);
        assert_eq!(engine.poll(1_000), None);
    }

    #[test]
    fn held_release_suppresses_tap_path() {
        let mut engine = new_engine();

        assert_eq!(engine.touch_start(0), None);
        assert_eq!(engine.touch_end(500), None);
        assert_eq!(engine.tap(510), None);
        assert_eq!(engine.deadline_ms(), None);
        assert_eq!(engine.poll(2_000), None);
    }

    #[test]
    fn window_boundaries_are_strict() {
        // Gap of exactly 300 ms stays on the single-tap path.
        let mut engine = new_engine();
        assert_eq!(quick_tap(&mut engine, 0, 60), None);
        assert_eq!(quick_tap(&mut engine, 300, 360), None);
        // Only the replacement emission fires, once.
        assert_eq!(engine.poll(360), None);
        assert_eq!(engine.poll(660), Some(Gesture::SingleTap));
        assert_eq!(engine.poll(2_000), None);

        // Held duration of exactly 350 ms is suppressed.
        let mut engine = new_engine();
        assert_eq!(engine.touch_start(0), None);
        assert_eq!(engine.touch_end(350), None);
        assert_eq!(engine.tap(360), None);
        assert_eq!(engine.deadline_ms(), None);
    }

    #[test]
    fn three_tap_sequence_yields_two_doubles() {
        let mut engine = new_engine();

        assert_eq!(quick_tap(&mut engine, 0, 60), None);
        assert_eq!(quick_tap(&mut engine, 100, 200), Some(Gesture::DoubleTap));
        // The third tap measures its gap against the second, not the first.
        assert_eq!(quick_tap(&mut engine, 300, 440), Some(Gesture::DoubleTap));
        assert_eq!(engine.poll(2_000), None);
    }

    #[test]
    fn long_press_ignores_tap_state() {
        let mut engine = new_engine();

        assert_eq!(quick_tap(&mut engine, 0, 60), None);
        assert_eq!(engine.long_press(200), Some(Gesture::LongPress));
        // The deferred single tap is untouched by the long press.
        assert_eq!(engine.poll(360), Some(Gesture::SingleTap));
    }

    #[test]
    fn stale_host_timer_is_ignored() {
        struct RecordingScheduler {
            armed: std::vec::Vec<TimerHandle>,
            cancelled: std::vec::Vec<TimerHandle>,
        }

        impl TapScheduler for RecordingScheduler {
            fn schedule(&mut self, handle: TimerHandle, _now_ms: u64, _delay_ms: u64) {
                self.armed.push(handle);
            }

            fn cancel(&mut self, handle: TimerHandle) {
                self.cancelled.push(handle);
            }
        }

        let mut engine = TapEngine::new(RecordingScheduler {
            armed: std::vec::Vec::new(),
            cancelled: std::vec::Vec::new(),
        });

        assert_eq!(engine.touch_start(0), None);
        assert_eq!(engine.touch_end(50), None);
        assert_eq!(engine.tap(60), None);
        let first = engine.scheduler().armed[0];

        // Second tap cancels the deferred emission before the host timer ran.
        assert_eq!(engine.touch_start(100), None);
        assert_eq!(engine.touch_end(150), None);
        assert_eq!(engine.tap(200), Some(Gesture::DoubleTap));
        assert_eq!(engine.scheduler().cancelled, std::vec![first]);

        // The host timer fires anyway; the handle is stale.
        assert_eq!(engine.timer_fired(first), None);
    }

    #[test]
    fn events_through_handle_match_direct_calls() {
        let mut engine = new_engine();

        assert_eq!(engine.handle(0, PointerEvent::TouchStart), None);
        assert_eq!(engine.handle(50, PointerEvent::TouchEnd), None);
        assert_eq!(engine.handle(60, PointerEvent::Tap), None);
        assert_eq!(engine.handle(70, PointerEvent::LongPress), Some(Gesture::LongPress));
        assert_eq!(engine.poll(360), Some(Gesture::SingleTap));
    }
}
