//! guard-analysis crate
//!
//! Fee risk analysis: gas price sampling and statistics, contextual and
//! absolute classifiers, transaction resolution and polling, and report
//! assembly.

pub mod classify;
pub mod guard;
pub mod poller;
pub mod report;
pub mod resolver;
pub mod sampler;
pub mod stats;

pub use classify::{AbsoluteThreshold, ContextThresholds, FeeCheck, FeeVerdict};
pub use guard::{inspect, watch};
pub use poller::PollConfig;
pub use report::{RiskReport, TxState};
pub use sampler::SampleWindow;
