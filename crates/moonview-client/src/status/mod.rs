//! Derived print-status values
//!
//! Each UI consumer derives its own presentation values from raw status
//! deltas plus state-store reads. The building blocks here hold the
//! derivation state (last samples, monotonic guards) and nothing else;
//! [`PrintStatusTracker`] combines them into a ready-made
//! [`NotifyConsumer`](crate::NotifyConsumer) mirroring a print-status
//! panel.

pub mod fans;
pub mod flow;
pub mod layers;
pub mod progress;
pub mod tracker;

pub use fans::FanSpeeds;
pub use flow::FlowRateEstimator;
pub use layers::LayerProgress;
pub use progress::{format_duration, TimeProgress};
pub use tracker::PrintStatusTracker;
