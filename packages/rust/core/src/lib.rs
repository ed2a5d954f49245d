//! Core pipeline orchestration and domain logic for VendorRisk.
//!
//! This crate ties together web search, source verification, the vector
//! index, and model scoring into the risk-analysis state machine driven by
//! [`RiskEngine`].

pub mod decision;
pub mod engine;
pub mod events;
pub mod pipeline;
mod prompts;
pub mod state;
mod steps;
pub mod vector;
pub mod verify;

pub use decision::{Recommendation, RiskScores, expected_recommendation};
pub use engine::RiskEngine;
pub use events::{ChannelProgress, FinalMode, PipelineEvent, ProgressReporter, SilentProgress, StageDetail};
pub use pipeline::Step;
pub use state::{Intent, PipelineState, Stage};
pub use vector::{VectorIndex, collection_name};
pub use verify::{TrustPolicy, Verification, data_confidence};

#[cfg(test)]
pub(crate) mod testing;
