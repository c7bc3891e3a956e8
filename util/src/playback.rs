//! # Input playback module
//!
//! This module reads recorded operator input so that an autonomous run can be replayed cycle by
//! cycle. A recording is a text file of records of the form
//!
//! ```text
//! <cycle>: <json input snapshot>;
//! ```
//!
//! where `<cycle>` counts from zero at the start of playback. Cycles must be strictly
//! increasing. A cycle without a record repeats the snapshot of the most recent record, so a
//! recording only needs an entry when the input changes. Anything outside a record (blank lines,
//! `#` comments) is ignored.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use regex::RegexBuilder;
use std::collections::VecDeque;
use std::fs;
use std::path::Path;
use thiserror::Error;

// Internal
use comms_if::input::InputSnapshot;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A snapshot which is recorded to start at a specific cycle.
#[derive(Debug, Clone, Copy)]
struct Record {
    cycle: u64,
    snapshot: InputSnapshot,
}

/// A recorded sequence of input snapshots.
///
/// Call [`Playback::next_snapshot`] once per cycle to get the input for that cycle.
#[derive(Debug, Clone)]
pub struct Playback {
    records: VecDeque<Record>,

    /// The last cycle in the recording.
    last_cycle: u64,

    /// The cycle which will be returned by the next call to `next_snapshot`.
    cycle: u64,

    /// The snapshot currently being held.
    current: InputSnapshot,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum PlaybackError {
    #[error("Could not load the recording: {0}")]
    LoadError(std::io::Error),

    #[error("Could not build the record pattern: {0}")]
    PatternError(regex::Error),

    #[error("The recording is empty (or is so bad it can't be read)")]
    Empty,

    #[error("Recording contains an invalid cycle number: {0}")]
    InvalidCycle(String),

    #[error("Recording cycle {0} is not after the previous record's cycle")]
    OutOfOrder(u64),

    #[error("Recording contains an invalid snapshot at cycle {0}: {1}")]
    InvalidSnapshot(u64, serde_json::Error),
}

/// The result of advancing the playback by one cycle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PlaybackStep {
    /// The input for this cycle.
    Snapshot(InputSnapshot),

    /// The recording has been played to the end.
    End,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Playback {
    /// Load a recording from the given path.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, PlaybackError> {
        let text = fs::read_to_string(path).map_err(PlaybackError::LoadError)?;

        Self::parse(&text)
    }

    /// Parse a recording from a string.
    pub fn parse(text: &str) -> Result<Self, PlaybackError> {
        let mut records: VecDeque<Record> = VecDeque::new();

        let re = RegexBuilder::new(r"^\s*(\d+)\s*:\s*([^;]*);")
            .multi_line(true)
            .build()
            .map_err(PlaybackError::PatternError)?;

        for cap in re.captures_iter(text) {
            let (cycle_str, json) = match (cap.get(1), cap.get(2)) {
                (Some(c), Some(j)) => (c.as_str(), j.as_str()),
                _ => continue,
            };

            let cycle: u64 = cycle_str
                .parse()
                .map_err(|e: std::num::ParseIntError| PlaybackError::InvalidCycle(e.to_string()))?;

            if let Some(prev) = records.back() {
                if cycle <= prev.cycle {
                    return Err(PlaybackError::OutOfOrder(cycle));
                }
            }

            let snapshot: InputSnapshot = serde_json::from_str(json)
                .map_err(|e| PlaybackError::InvalidSnapshot(cycle, e))?;

            records.push_back(Record {
                cycle,
                snapshot: snapshot.sanitised(),
            });
        }

        let last_cycle = match records.back() {
            Some(r) => r.cycle,
            None => return Err(PlaybackError::Empty),
        };

        Ok(Self {
            records,
            last_cycle,
            cycle: 0,
            current: InputSnapshot::default(),
        })
    }

    /// Get the input for the next cycle, or `PlaybackStep::End` once the recording is exhausted.
    pub fn next_snapshot(&mut self) -> PlaybackStep {
        if self.cycle > self.last_cycle {
            return PlaybackStep::End;
        }

        while let Some(r) = self.records.front() {
            if r.cycle > self.cycle {
                break;
            }
            self.current = r.snapshot;
            self.records.pop_front();
        }

        self.cycle += 1;

        PlaybackStep::Snapshot(self.current)
    }

    /// Get the number of cycles in the recording.
    pub fn num_cycles(&self) -> u64 {
        self.last_cycle + 1
    }

    /// Get the number of cycles remaining.
    pub fn remaining_cycles(&self) -> u64 {
        (self.last_cycle + 1).saturating_sub(self.cycle)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use comms_if::input::{Axis, Button};

    const RECORDING: &str = r#"
# Drive forward then press A
0: {"axes": [0.0, 0.5, 0.0, 0.0, 0.0, 0.0]};
3: {"axes": [0.0, 0.0, 0.0, 0.0, 0.0, 0.0], "buttons": [true, false, false, false, false, false, false, false, false, false]};
"#;

    #[test]
    fn test_playback_holds_and_ends() {
        let mut pb = Playback::parse(RECORDING).unwrap();
        assert_eq!(pb.num_cycles(), 4);

        for _ in 0..3 {
            match pb.next_snapshot() {
                PlaybackStep::Snapshot(s) => {
                    assert_eq!(s.axis(Axis::LeftY), 0.5);
                    assert!(!s.button(Button::A));
                }
                PlaybackStep::End => panic!("Ended early"),
            }
        }

        match pb.next_snapshot() {
            PlaybackStep::Snapshot(s) => {
                assert_eq!(s.axis(Axis::LeftY), 0.0);
                assert!(s.button(Button::A));
            }
            PlaybackStep::End => panic!("Ended early"),
        }

        assert_eq!(pb.remaining_cycles(), 0);
        assert_eq!(pb.next_snapshot(), PlaybackStep::End);
        assert_eq!(pb.next_snapshot(), PlaybackStep::End);
    }

    #[test]
    fn test_playback_errors() {
        assert!(matches!(Playback::parse("# nothing"), Err(PlaybackError::Empty)));
        assert!(matches!(
            Playback::parse("2: {};\n1: {};"),
            Err(PlaybackError::OutOfOrder(1))
        ));
        assert!(matches!(
            Playback::parse("0: {\"axes\": 3};"),
            Err(PlaybackError::InvalidSnapshot(0, _))
        ));
    }
}
