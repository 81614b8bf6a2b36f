//! Lock-Free Sample Queue
//!
//! SPSC ring buffer between the capture/detection producer and the engine
//! consumer. The engine must never see two interleaved ticks, so all samples
//! funnel through this single-consumer boundary and are ticked from one
//! thread only.

mod buffer;

pub use buffer::{SampleQueue, DEFAULT_CAPACITY};
