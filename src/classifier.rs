use statig::{blocking::IntoStateMachineExt as _, prelude::*};

// The deferral delay is the window itself: a tap is only a confirmed single
// tap once the double-tap window around it has closed.
pub(crate) const DOUBLE_TAP_WINDOW_MS: u64 = 300;
// A release this long means the contact was a long press; the host tap
// callback that trails it must not also count as a tap.
pub(crate) const HELD_TAP_SUPPRESS_MS: u64 = 350;

/// Gesture intent delivered to the host presentation layer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Gesture {
    SingleTap,
    DoubleTap,
    LongPress,
}

/// Raw pointer event as delivered by the host UI runtime. Each callback
/// carries a millisecond timestamp from one monotonic clock; per interaction
/// the host delivers touch-start, then touch-end, then (maybe) tap.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PointerEvent {
    TouchStart,
    TouchEnd,
    Tap,
    LongPress,
}

/// Opaque token identifying one armed deferred emission. Minted per arm so a
/// timer callback that raced a cancellation can be recognized as stale.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TimerHandle(u32);

#[derive(Clone, Copy, Debug)]
pub(crate) enum TapHsmEvent {
    TouchStart { now_ms: u64 },
    TouchEnd { now_ms: u64 },
    Tap { now_ms: u64 },
    LongPress { now_ms: u64 },
    TimerFired { handle: TimerHandle },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Effect {
    Emit(Gesture),
    Arm {
        handle: TimerHandle,
        now_ms: u64,
        delay_ms: u64,
    },
    Disarm(TimerHandle),
}

#[derive(Clone, Copy, Debug, Default)]
pub(crate) struct DispatchContext {
    effects: [Option<Effect>; 3],
}

impl DispatchContext {
    fn emit(&mut self, effect: Effect) {
        for slot in &mut self.effects {
            if slot.is_none() {
                *slot = Some(effect);
                return;
            }
        }
    }

    pub(crate) fn finish(self) -> [Option<Effect>; 3] {
        self.effects
    }
}

pub(crate) struct TapHsm {
    touch_start_ms: u64,
    touch_end_ms: u64,
    last_tap_ms: Option<u64>,
    pending: Option<TimerHandle>,
    next_handle: u32,
}

impl TapHsm {
    pub(crate) fn new() -> Self {
        Self {
            touch_start_ms: 0,
            touch_end_ms: 0,
            last_tap_ms: None,
            pending: None,
            next_handle: 0,
        }
    }

    pub(crate) fn machine() -> statig::blocking::StateMachine<TapHsm> {
        TapHsm::new().state_machine()
    }

    fn mint_handle(&mut self) -> TimerHandle {
        self.next_handle = self.next_handle.wrapping_add(1);
        TimerHandle(self.next_handle)
    }

    fn disarm_pending(&mut self, context: &mut DispatchContext) {
        if let Some(handle) = self.pending.take() {
            context.emit(Effect::Disarm(handle));
        }
    }

    // Shared by both states: a tap either confirms a double tap against the
    // previous one or becomes the next deferred single-tap candidate.
    fn classify_tap(&mut self, context: &mut DispatchContext, now_ms: u64) -> Outcome<State> {
        let held_ms = self.touch_end_ms.saturating_sub(self.touch_start_ms);
        if held_ms >= HELD_TAP_SUPPRESS_MS {
            // Tail of a long press; the host already took the long-press path.
            return Handled;
        }

        let previous_tap_ms = self.last_tap_ms.replace(now_ms);
        let gap_ms = previous_tap_ms.map(|t| now_ms.saturating_sub(t));

        match gap_ms {
            Some(gap_ms) if gap_ms < DOUBLE_TAP_WINDOW_MS => {
                self.disarm_pending(context);
                context.emit(Effect::Emit(Gesture::DoubleTap));
                Transition(State::idle())
            }
            _ => {
                // Candidate first tap. At most one deferred emission may be
                // armed, so any still-pending handle goes away first.
                self.disarm_pending(context);
                let handle = self.mint_handle();
                self.pending = Some(handle);
                context.emit(Effect::Arm {
                    handle,
                    now_ms,
                    delay_ms: DOUBLE_TAP_WINDOW_MS,
                });
                Transition(State::tap_pending())
            }
        }
    }
}

#[state_machine(initial = "State::idle()")]
impl TapHsm {
    #[state]
    fn idle(&mut self, context: &mut DispatchContext, event: &TapHsmEvent) -> Outcome<State> {
        match event {
            TapHsmEvent::TouchStart { now_ms } => {
                self.touch_start_ms = *now_ms;
                Handled
            }
            TapHsmEvent::TouchEnd { now_ms } => {
                self.touch_end_ms = *now_ms;
                Handled
            }
            TapHsmEvent::Tap { now_ms } => self.classify_tap(context, *now_ms),
            TapHsmEvent::LongPress { .. } => {
                context.emit(Effect::Emit(Gesture::LongPress));
                Handled
            }
            // No emission is armed; a late host timer callback is stale.
            TapHsmEvent::TimerFired { .. } => Handled,
        }
    }

    #[state]
    fn tap_pending(
        &mut self,
        context: &mut DispatchContext,
        event: &TapHsmEvent,
    ) -> Outcome<State> {
        match event {
            TapHsmEvent::TouchStart { now_ms } => {
                self.touch_start_ms = *now_ms;
                Handled
            }
            TapHsmEvent::TouchEnd { now_ms } => {
                self.touch_end_ms = *now_ms;
                Handled
            }
            TapHsmEvent::Tap { now_ms } => self.classify_tap(context, *now_ms),
            // Long press never touches tap state; the armed single-tap
            // emission stays armed.
            TapHsmEvent::LongPress { .. } => {
                context.emit(Effect::Emit(Gesture::LongPress));
                Handled
            }
            TapHsmEvent::TimerFired { handle } => {
                if self.pending == Some(*handle) {
                    self.pending = None;
                    context.emit(Effect::Emit(Gesture::SingleTap));
                    Transition(State::idle())
                } else {
                    Handled
                }
            }
        }
    }
}
