// src/pipeline/event_bus.rs
//
// Decoupled event system. The pipeline publishes what happened on each
// window; consumers drain the queue instead of reaching into engine state.
// The binary drains it once per frame and logs calibration and alert events;
// library users embedding the pipeline can drain it for WindowScored too.

use crate::types::{CongestionEvent, OverspeedEvent, ScoreResult, WindowSummary};
use std::collections::VecDeque;
use tracing::warn;

#[derive(Debug, Clone)]
pub enum PipelineEvent {
    WindowScored {
        frame_id: u64,
        timestamp_s: f64,
        summary: WindowSummary,
        result: ScoreResult,
    },

    BaselineCalibrated {
        frame_id: u64,
        windows_scored: u64,
    },

    CongestionAlert(CongestionEvent),

    OverspeedAlert(OverspeedEvent),
}

pub struct EventBus {
    events: VecDeque<PipelineEvent>,
    max_pending: usize,
}

impl EventBus {
    pub fn new(max_pending: usize) -> Self {
        let max_pending = max_pending.max(1);
        Self {
            events: VecDeque::with_capacity(max_pending),
            max_pending,
        }
    }

    pub fn publish(&mut self, event: PipelineEvent) {
        if self.events.len() >= self.max_pending {
            warn!(
                "Event bus full ({} events), dropping oldest",
                self.max_pending
            );
            self.events.pop_front();
        }
        self.events.push_back(event);
    }

    pub fn drain(&mut self) -> Vec<PipelineEvent> {
        self.events.drain(..).collect()
    }

    pub fn pending_count(&self) -> usize {
        self.events.len()
    }
}
