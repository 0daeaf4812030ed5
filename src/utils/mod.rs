//! # Utility Modules
//!
//! Supporting utilities shared by the protocol components.
//!
//! ## Components
//! - **Metrics**: Thread-safe decoding counters

pub mod metrics;

pub use metrics::{Metrics, MetricsSnapshot};
