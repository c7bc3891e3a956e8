//! Pneumatic claw subsystem

use comms_if::{
    eqpt::{EqptError, Solenoid},
    tm::TelemetrySink,
};
use log::debug;

use crate::sched::{Subsystem, SubsystemId, Tick};

/// A claw opened by extending a single solenoid.
pub struct Claw {
    solenoid: Box<dyn Solenoid>,
    open: bool,
}

impl Claw {
    /// Create a claw, closing it so the commanded and actual states agree.
    pub fn new(solenoid: Box<dyn Solenoid>) -> Result<Self, EqptError> {
        let mut claw = Self {
            solenoid,
            open: false,
        };
        claw.set(false)?;
        Ok(claw)
    }

    pub fn open(&mut self) -> Result<(), EqptError> {
        self.set(true)
    }

    pub fn close(&mut self) -> Result<(), EqptError> {
        self.set(false)
    }

    pub fn set(&mut self, open: bool) -> Result<(), EqptError> {
        self.solenoid.set(open)?;
        if open != self.open {
            debug!("Claw {}", if open { "opened" } else { "closed" });
        }
        self.open = open;
        Ok(())
    }

    /// Last commanded state of the claw.
    pub fn is_open(&self) -> bool {
        self.open
    }
}

impl Subsystem for Claw {
    fn id(&self) -> SubsystemId {
        SubsystemId::Claw
    }

    fn periodic(&mut self, _tick: &Tick) {}

    fn publish(&self, sink: &mut dyn TelemetrySink) {
        sink.publish_bool("claw/open", self.open);
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use comms_if::eqpt::loopback::LoopbackSolenoid;

    #[test]
    fn test_claw() {
        let sol = LoopbackSolenoid::new();
        let mut claw = Claw::new(Box::new(sol.clone())).unwrap();
        assert!(!claw.is_open());

        claw.open().unwrap();
        assert!(claw.is_open());
        assert_eq!(sol.get(), Ok(true));

        claw.close().unwrap();
        assert!(!claw.is_open());
        assert_eq!(sol.get(), Ok(false));
    }
}
