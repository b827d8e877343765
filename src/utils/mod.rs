//! # Utility Modules
//!
//! Supporting utilities shared by the transport and the handlers.
//!
//! ## Components
//! - **Stream cipher**: the RC4-family keystream behind encrypted listeners
//! - **Logging**: structured logging configuration
//! - **Metrics**: thread-safe observability counters

pub mod logging;
pub mod metrics;
pub mod rc4;

pub use metrics::{Metrics, MetricsSnapshot};
pub use rc4::StreamCipher;
