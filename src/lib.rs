//! Disambiguates a raw touch event stream into single-tap, double-tap and
//! long-press gesture intents.
//!
//! The host UI runtime delivers `touch_start`/`touch_end`/`tap`/`long_press`
//! callbacks with monotonic millisecond timestamps; [`TapEngine`] applies the
//! 350 ms held-duration gate and the 300 ms inter-tap window, deferring a
//! first tap's `SingleTap` through a [`TapScheduler`] so it can be cancelled
//! if the second half of a double tap arrives in time.
//!
//! Hosts with an async executor can use the [`pipeline`] module instead of
//! wiring the engine and scheduler by hand.

#![cfg_attr(not(test), no_std)]

mod classifier;
mod engine;
mod scheduler;

#[cfg(feature = "pipeline")]
pub mod pipeline;

pub use classifier::{Gesture, PointerEvent, TimerHandle};
pub use engine::TapEngine;
pub use scheduler::{DeadlineScheduler, TapScheduler};
