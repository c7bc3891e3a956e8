//! # Vision target snapshot
//!
//! The vision coprocessor publishes, for each class of target it knows about, how many targets it
//! can see along with the bearing and range to the best one. The robot software only reads these
//! values, and must tolerate them being stale if the coprocessor has not updated them.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// The best target of a given class seen by the vision system.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisionTarget {
    /// Number of targets of this class in view.
    pub count: u32,

    /// Bearing from the robot's forward axis to the target, positive to the left.
    ///
    /// Units: degrees
    pub bearing_deg: f64,

    /// Range from the camera to the target.
    ///
    /// Units: meters
    pub range_m: f64,
}

/// The latest snapshot published by the vision system.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VisionTable {
    targets: HashMap<TargetClass, VisionTarget>,

    /// Time at which the snapshot was last updated, in session seconds.
    pub updated_s: Option<f64>,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// The classes of target the vision system reports on.
#[derive(Debug, Copy, Clone, Hash, PartialEq, Eq, Serialize, Deserialize)]
pub enum TargetClass {
    /// Yellow cone game piece
    Cone,

    /// Purple cube game piece
    Cube,

    /// Retroreflective tape on the scoring poles
    Reflective,

    /// Fiducial tag on the scoring shelves
    Tag,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl VisionTable {
    /// Record a new observation for the given class.
    pub fn update(&mut self, class: TargetClass, target: VisionTarget, time_s: f64) {
        self.targets.insert(class, target);
        self.updated_s = Some(time_s);
    }

    /// Get the target of the given class, if one is currently in view.
    ///
    /// A class that has never been published, that has a zero count, or whose bearing or range is
    /// not a finite number is reported as not in view.
    pub fn target(&self, class: TargetClass) -> Option<VisionTarget> {
        self.targets
            .get(&class)
            .copied()
            .filter(|t| t.count > 0 && t.bearing_deg.is_finite() && t.range_m.is_finite())
    }

    /// Forget all observations, for example when the coprocessor is restarted.
    pub fn clear(&mut self) {
        self.targets.clear();
        self.updated_s = None;
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_target_lookup() {
        let mut table = VisionTable::default();

        // Never published
        assert!(table.target(TargetClass::Cone).is_none());

        table.update(
            TargetClass::Cone,
            VisionTarget { count: 2, bearing_deg: -4.5, range_m: 1.2 },
            3.0,
        );
        table.update(
            TargetClass::Cube,
            VisionTarget { count: 0, bearing_deg: 0.0, range_m: 0.0 },
            3.0,
        );
        table.update(
            TargetClass::Tag,
            VisionTarget { count: 1, bearing_deg: f64::NAN, range_m: 2.0 },
            3.0,
        );

        assert_eq!(table.target(TargetClass::Cone).unwrap().bearing_deg, -4.5);
        assert!(table.target(TargetClass::Cube).is_none());
        assert!(table.target(TargetClass::Tag).is_none());
        assert_eq!(table.updated_s, Some(3.0));

        table.clear();
        assert!(table.target(TargetClass::Cone).is_none());
    }
}
