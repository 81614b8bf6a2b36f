//! Alert Dispatching
//!
//! Turns the engine's alarm levels into discrete audio actions: repeated
//! warning beeps, a one-shot critical alarm, and an explicit silence. Sound
//! playback itself belongs to the consumer; this crate only decides when a
//! sound should fire.

mod dispatcher;

pub use dispatcher::{AlertAction, AlertConfig, AlertDispatcher};
