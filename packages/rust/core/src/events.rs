//! Progress events and reporters.
//!
//! Every pipeline run reports through a [`ProgressReporter`]. The silent
//! reporter backs the request/response variant; [`ChannelProgress`] feeds
//! the streaming variant.

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::debug;

use vendorrisk_shared::{Criticality, RiskReport};

use crate::pipeline::Step;
use crate::state::Intent;

/// Step-specific detail attached to a `stage_complete` event.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StageDetail {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intent: Option<Intent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub criticality: Option<Criticality>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_count: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verified_count: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unverified_count: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stored_count: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_count: Option<usize>,
}

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinalMode {
    Chat,
    ClarificationNeeded,
    RiskReport,
}

/// One progress event, serialized with a `type` tag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PipelineEvent {
    StageStart {
        stage: Step,
        message: String,
    },
    StageComplete {
        stage: Step,
        message: String,
        #[serde(flatten)]
        detail: StageDetail,
    },
    Final {
        mode: FinalMode,
        assistant_reply: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        risk_report: Option<RiskReport>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        company_name: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        criticality: Option<Criticality>,
    },
    Error {
        message: String,
    },
    Done,
}

/// Receives pipeline events as they happen.
pub trait ProgressReporter: Send + Sync {
    fn report(&self, event: PipelineEvent);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn report(&self, _event: PipelineEvent) {}
}

/// Forwards events into an unbounded channel.
#[derive(Clone)]
pub struct ChannelProgress {
    tx: mpsc::UnboundedSender<PipelineEvent>,
}

impl ChannelProgress {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<PipelineEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl ProgressReporter for ChannelProgress {
    fn report(&self, event: PipelineEvent) {
        if self.tx.send(event).is_err() {
            debug!("progress receiver dropped");
        }
    }
}
