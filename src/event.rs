//! Load-change event detection
//!
//! Two level flags derived from a driving signal against a fixed threshold.
//! The rising edge of either flag is the discrete event the sensation memory
//! listens for. There is no hysteresis: a signal resting exactly on the
//! threshold clears both flags.

use serde::{Deserialize, Serialize};

/// Threshold the driving signal is compared against
pub const LOAD_THRESHOLD: f64 = 0.5;

/// Zero-crossing function handed to the integrator
pub fn indicator(signal: f64) -> f64 {
    signal - LOAD_THRESHOLD
}

/// Level outputs of the detector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EventFlags {
    pub load_applied: bool,
    pub load_removed: bool,
}

impl EventFlags {
    pub fn from_signal(signal: f64) -> Self {
        Self {
            load_applied: signal > LOAD_THRESHOLD,
            load_removed: signal < LOAD_THRESHOLD,
        }
    }
}

/// A flag that just rose
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadTransition {
    LoadApplied,
    LoadRemoved,
}

impl LoadTransition {
    pub fn as_str(&self) -> &'static str {
        match self {
            LoadTransition::LoadApplied => "load_applied",
            LoadTransition::LoadRemoved => "load_removed",
        }
    }
}

/// Edge detector over the driving signal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EventDetector {
    flags: EventFlags,
}

impl EventDetector {
    /// Start from the level implied by the initial signal without emitting an event
    pub fn new(initial_signal: f64) -> Self {
        Self {
            flags: EventFlags::from_signal(initial_signal),
        }
    }

    pub fn flags(&self) -> EventFlags {
        self.flags
    }

    /// Update the flags and report a rising edge, if any
    pub fn observe(&mut self, signal: f64) -> Option<LoadTransition> {
        let previous = self.flags;
        self.flags = EventFlags::from_signal(signal);
        if self.flags.load_applied && !previous.load_applied {
            Some(LoadTransition::LoadApplied)
        } else if self.flags.load_removed && !previous.load_removed {
            Some(LoadTransition::LoadRemoved)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_flags_from_signal() {
        assert_eq!(
            EventFlags::from_signal(1.0),
            EventFlags {
                load_applied: true,
                load_removed: false
            }
        );
        assert_eq!(
            EventFlags::from_signal(0.0),
            EventFlags {
                load_applied: false,
                load_removed: true
            }
        );
        // flutter edge case: both clear on the threshold
        assert_eq!(EventFlags::from_signal(0.5), EventFlags::default());
    }

    #[test]
    fn test_indicator_sign() {
        assert!(indicator(0.2) < 0.0);
        assert!(indicator(0.9) > 0.0);
        assert_eq!(indicator(0.5), 0.0);
    }

    #[test]
    fn test_rising_edges_only() {
        let mut detector = EventDetector::new(0.0);
        assert_eq!(detector.observe(0.1), None);
        assert_eq!(detector.observe(1.0), Some(LoadTransition::LoadApplied));
        assert_eq!(detector.observe(0.9), None);
        assert_eq!(detector.observe(0.0), Some(LoadTransition::LoadRemoved));
        assert_eq!(detector.observe(0.0), None);
    }

    #[test]
    fn test_resting_on_threshold_then_leaving() {
        let mut detector = EventDetector::new(1.0);
        assert_eq!(detector.observe(0.5), None);
        assert_eq!(detector.flags(), EventFlags::default());
        // re-entering the applied level is a fresh edge
        assert_eq!(detector.observe(0.8), Some(LoadTransition::LoadApplied));
    }

    #[test]
    fn test_initial_level_is_not_an_event() {
        let mut detector = EventDetector::new(1.0);
        assert!(detector.flags().load_applied);
        assert_eq!(detector.observe(1.0), None);
    }
}
