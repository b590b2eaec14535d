//! Sensation memory
//!
//! Local sensation captured the instant before the most recent load-applied
//! and load-removed events. Both vectors start at zero and only change at an
//! event, all 16 values at once.

use crate::event::{EventFlags, LoadTransition};
use crate::types::{SegmentValues, SEGMENT_COUNT};
use log::debug;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SensationMemory {
    /// Before the last load-applied event
    on: SegmentValues,
    /// Before the last load-removed event
    off: SegmentValues,
    /// Events recorded so far
    events: u32,
}

impl SensationMemory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the pre-event local sensation for a transition
    pub fn snapshot(&mut self, transition: LoadTransition, local_sensation: &SegmentValues) {
        match transition {
            LoadTransition::LoadApplied => self.on = *local_sensation,
            LoadTransition::LoadRemoved => self.off = *local_sensation,
        }
        self.events += 1;
        debug!(
            "sensation memory snapshot #{} on {}",
            self.events,
            transition.as_str()
        );
    }

    /// Baseline the individual forces are measured against
    pub fn baseline(&self, flags: EventFlags) -> SegmentValues {
        if flags.load_applied {
            self.on
        } else if flags.load_removed {
            self.off
        } else {
            [0.0; SEGMENT_COUNT]
        }
    }

    pub fn on(&self) -> &SegmentValues {
        &self.on
    }

    pub fn off(&self) -> &SegmentValues {
        &self.off
    }

    pub fn event_count(&self) -> u32 {
        self.events
    }

    /// Load memory from JSON
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Serialize memory to JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
