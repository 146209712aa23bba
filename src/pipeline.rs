//! Channel-driven pipeline for hosts running an async executor.
//!
//! Pointer frames go in through [`TAP_PIPELINE_INPUTS`], gesture intents come
//! out through [`TAP_GESTURES`]. The task owns the engine and services the
//! deferred single-tap emission itself by racing the input channel against
//! the armed deadline, so hosts only deal in frames and gestures. Frame
//! timestamps must be in the `embassy_time::Instant::as_millis` domain.

use embassy_futures::select::{select, Either};
use embassy_sync::{blocking_mutex::raw::CriticalSectionRawMutex, channel::Channel};
use embassy_time::{Instant, Timer};

use crate::engine::TapEngine;
use crate::scheduler::DeadlineScheduler;
use crate::{Gesture, PointerEvent};

/// One timestamped pointer event from the host input source.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PointerFrame {
    pub t_ms: u64,
    pub event: PointerEvent,
}

#[derive(Clone, Copy, Debug)]
pub enum TapPipelineInput {
    /// Discard classifier state and any queued gestures (surface teardown).
    Reset,
    Frame(PointerFrame),
}

pub static TAP_PIPELINE_INPUTS: Channel<CriticalSectionRawMutex, TapPipelineInput, 32> =
    Channel::new();
pub static TAP_GESTURES: Channel<CriticalSectionRawMutex, Gesture, 8> = Channel::new();

pub async fn tap_pipeline_task() {
    let mut engine = TapEngine::<DeadlineScheduler>::default();

    loop {
        let input = match engine.deadline_ms() {
            Some(fire_at_ms) => {
                match select(
                    TAP_PIPELINE_INPUTS.receive(),
                    Timer::at(Instant::from_millis(fire_at_ms)),
                )
                .await
                {
                    Either::First(input) => Some(input),
                    Either::Second(()) => None,
                }
            }
            None => Some(TAP_PIPELINE_INPUTS.receive().await),
        };

        match input {
            Some(TapPipelineInput::Reset) => {
                engine = TapEngine::default();
                while TAP_GESTURES.try_receive().is_ok() {}
            }
            Some(TapPipelineInput::Frame(frame)) => {
                if let Some(gesture) = engine.handle(frame.t_ms, frame.event) {
                    TAP_GESTURES.send(gesture).await;
                }
            }
            None => {
                let now_ms = Instant::now().as_millis();
                if let Some(gesture) = engine.poll(now_ms) {
                    TAP_GESTURES.send(gesture).await;
                }
            }
        }
    }
}

pub async fn push_pointer_frame(frame: PointerFrame) {
    // Preserve the ordered event stream; dropping frames desynchronizes the
    // touch-start/touch-end/tap bracket the classifier trusts.
    TAP_PIPELINE_INPUTS.send(TapPipelineInput::Frame(frame)).await;
}

pub fn request_tap_pipeline_reset() {
    while TAP_PIPELINE_INPUTS.try_receive().is_ok() {}
    let _ = TAP_PIPELINE_INPUTS.try_send(TapPipelineInput::Reset);
}
