//! # Transport Layer
//!
//! In-memory media that carry encoded packets between simulated endpoints.
//!
//! ## Components
//! - **Air**: numbered radio channels of fixed-size, timestamped frames
//! - **Receiver**: a tuned listener that drains a channel into a frame queue
//! - **ReceiverTracker**: the set of known receivers

pub mod air;

pub use air::{frame_bytes, Air, AirFrame, Clock, MonotonicClock, Receiver, ReceiverTracker};
