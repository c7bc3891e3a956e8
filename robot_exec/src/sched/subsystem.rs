//! Subsystem identities and the exclusive-ownership requirement set

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::fmt;

use comms_if::tm::TelemetrySink;
use serde::{Deserialize, Serialize};

use super::Tick;

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Number of subsystems on the robot.
pub const NUM_SUBSYSTEMS: usize = 6;

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Identity of every subsystem on the robot.
///
/// The discriminant is used as the bit index in [`Requirements`] and as the index into the
/// scheduler's lock registry, and the declaration order is the order in which periodic hooks run.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SubsystemId {
    Drivetrain = 0,
    Elevator = 1,
    Arm = 2,
    Wrist = 3,
    Turret = 4,
    Claw = 5,
}

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Set of subsystems a task needs exclusive access to.
#[derive(Copy, Clone, Default, PartialEq, Eq, Hash)]
pub struct Requirements(u8);

// ------------------------------------------------------------------------------------------------
// TRAITS
// ------------------------------------------------------------------------------------------------

/// A named owner of one or more actuator ports.
///
/// Subsystems live for the whole execution. Tasks command them during their own lifecycle calls,
/// and the scheduler calls [`Subsystem::periodic`] once per tick after every task has stepped.
pub trait Subsystem {
    /// Identity of this subsystem.
    fn id(&self) -> SubsystemId;

    /// Periodic update, typically reading sensors back into the subsystem's estimates.
    fn periodic(&mut self, tick: &Tick);

    /// Publish this subsystem's telemetry.
    fn publish(&self, _sink: &mut dyn TelemetrySink) {}
}

/// Container giving the scheduler access to every subsystem.
pub trait SubsystemSet {
    /// Call `f` on each subsystem, always in the same order.
    fn for_each_subsystem(&mut self, f: &mut dyn FnMut(&mut dyn Subsystem));
}

// ------------------------------------------------------------------------------------------------
// IMPLEMENTATIONS
// ------------------------------------------------------------------------------------------------

impl SubsystemId {
    /// All subsystems in periodic order.
    pub const ALL: [SubsystemId; NUM_SUBSYSTEMS] = [
        SubsystemId::Drivetrain,
        SubsystemId::Elevator,
        SubsystemId::Arm,
        SubsystemId::Wrist,
        SubsystemId::Turret,
        SubsystemId::Claw,
    ];

    /// Index of this subsystem in registries sized by [`NUM_SUBSYSTEMS`].
    pub fn index(self) -> usize {
        self as usize
    }

    /// Lower case name used in telemetry keys.
    pub fn key(self) -> &'static str {
        match self {
            SubsystemId::Drivetrain => "drivetrain",
            SubsystemId::Elevator => "elevator",
            SubsystemId::Arm => "arm",
            SubsystemId::Wrist => "wrist",
            SubsystemId::Turret => "turret",
            SubsystemId::Claw => "claw",
        }
    }

    fn bit(self) -> u8 {
        1 << (self as u8)
    }
}

impl Requirements {
    /// The empty set, tasks requiring nothing never conflict with anything.
    pub const NONE: Requirements = Requirements(0);

    /// Build a set from a list of subsystems.
    pub fn of(ids: &[SubsystemId]) -> Self {
        ids.iter().fold(Self::NONE, |r, id| r.with(*id))
    }

    /// This set with `id` added.
    pub fn with(self, id: SubsystemId) -> Self {
        Self(self.0 | id.bit())
    }

    pub fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    pub fn intersection(self, other: Self) -> Self {
        Self(self.0 & other.0)
    }

    pub fn contains(self, id: SubsystemId) -> bool {
        self.0 & id.bit() != 0
    }

    pub fn intersects(self, other: Self) -> bool {
        self.0 & other.0 != 0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Iterate the members of the set in [`SubsystemId`] order.
    pub fn iter(self) -> impl Iterator<Item = SubsystemId> {
        SubsystemId::ALL
            .iter()
            .copied()
            .filter(move |id| self.contains(*id))
    }
}

impl From<SubsystemId> for Requirements {
    fn from(id: SubsystemId) -> Self {
        Self::NONE.with(id)
    }
}

impl fmt::Debug for Requirements {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------
