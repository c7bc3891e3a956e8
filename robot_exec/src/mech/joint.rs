//! Position controlled joint subsystem

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use comms_if::{
    eqpt::{ActuatorPort, LimitDir, RefKind},
    tm::TelemetrySink,
};
use log::{info, warn};
use ordered_float::OrderedFloat;
use util::maths::rem_euclid;

use super::{JointParams, MechError, PresetDir};
use crate::sched::{Subsystem, SubsystemId, Tick};

// ------------------------------------------------------------------------------------------------
// DATA STRUCTURES
// ------------------------------------------------------------------------------------------------

/// A single actuator under motion profiled position control.
pub struct Joint {
    id: SubsystemId,
    port: Box<dyn ActuatorPort>,
    params: JointParams,

    /// Presets within range, sorted ascending without duplicates.
    presets: Vec<f64>,

    target: Option<f64>,

    /// Last good position reading.
    position: f64,

    read_fault: bool,
}

// ------------------------------------------------------------------------------------------------
// IMPLEMENTATIONS
// ------------------------------------------------------------------------------------------------

impl Joint {
    /// Create a joint and push its soft limits to the port.
    ///
    /// A port refusing its soft limits is logged and the joint continues, limits are still
    /// applied to every target sent.
    pub fn new(
        id: SubsystemId,
        mut port: Box<dyn ActuatorPort>,
        params: JointParams,
    ) -> Result<Self, MechError> {
        if !(params.min_pos < params.max_pos) {
            return Err(MechError::InvalidLimits(id));
        }

        if !params.wrap {
            for (dir, value) in [
                (LimitDir::Forward, params.max_pos),
                (LimitDir::Reverse, params.min_pos),
            ]
            .iter()
            {
                if let Err(e) = port.set_soft_limit(*dir, true, *value) {
                    warn!(
                        "Could not set {:?} {:?} soft limit: {}, using device defaults",
                        id, dir, e
                    );
                }
            }
        }

        let mut presets: Vec<f64> = params
            .presets
            .iter()
            .copied()
            .filter(|p| p.is_finite() && *p >= params.min_pos && *p <= params.max_pos)
            .collect();
        if presets.len() != params.presets.len() {
            warn!("{:?} has presets outside its range, they are ignored", id);
        }
        presets.sort_by_key(|p| OrderedFloat(*p));
        presets.dedup();

        let position = port
            .get_position()
            .ok()
            .filter(|p| p.is_finite())
            .unwrap_or(params.min_pos);

        Ok(Self {
            id,
            port,
            params,
            presets,
            target: None,
            position,
            read_fault: false,
        })
    }

    pub fn id(&self) -> SubsystemId {
        self.id
    }

    /// Send the joint to `pos`, returning the target actually used.
    ///
    /// The target is clamped into the joint's range, or wrapped into it for continuous joints.
    pub fn set_target(&mut self, pos: f64) -> Result<f64, MechError> {
        if !pos.is_finite() {
            return Err(MechError::InvalidTarget(self.id, pos));
        }

        let target = self.constrain(pos);
        self.port
            .set_reference(RefKind::MotionProfile, target, self.params.slot)
            .map_err(|e| MechError::Eqpt(self.id, e))?;
        self.target = Some(target);

        Ok(target)
    }

    /// Hold the joint where it is now.
    pub fn hold(&mut self) -> Result<f64, MechError> {
        self.set_target(self.position)
    }

    pub fn target(&self) -> Option<f64> {
        self.target
    }

    /// Position of the joint. If the port cannot be read this is the last good reading.
    pub fn position(&self) -> f64 {
        self.position
    }

    /// True if the joint is within tolerance of its target, or has never been given one.
    pub fn at_target(&self) -> bool {
        self.target
            .map(|t| self.error_to(t).abs() <= self.params.tolerance)
            .unwrap_or(true)
    }

    /// Signed distance from the current position to `pos`, the shortest way round for continuous
    /// joints.
    pub fn error_to(&self, pos: f64) -> f64 {
        if self.params.wrap {
            let range = self.range();
            rem_euclid(pos - self.position + range / 2.0, range) - range / 2.0
        } else {
            pos - self.position
        }
    }

    pub fn presets(&self) -> &[f64] {
        &self.presets
    }

    /// The next preset in the given direction from the current position.
    ///
    /// Up gives the smallest preset above the position plus the tolerance, down the largest
    /// preset below the position minus the tolerance. There is no preset beyond either end.
    pub fn next_preset(&self, dir: PresetDir) -> Option<f64> {
        let tol = self.params.tolerance;
        match dir {
            PresetDir::Up => self
                .presets
                .iter()
                .copied()
                .find(|p| *p > self.position + tol),
            PresetDir::Down => self
                .presets
                .iter()
                .rev()
                .copied()
                .find(|p| *p < self.position - tol),
        }
    }

    fn range(&self) -> f64 {
        self.params.max_pos - self.params.min_pos
    }

    fn constrain(&self, pos: f64) -> f64 {
        if self.params.wrap {
            self.params.min_pos + rem_euclid(pos - self.params.min_pos, self.range())
        } else {
            pos.clamp(self.params.min_pos, self.params.max_pos)
        }
    }
}

impl Subsystem for Joint {
    fn id(&self) -> SubsystemId {
        self.id
    }

    fn periodic(&mut self, _tick: &Tick) {
        match self.port.get_position() {
            Ok(p) if p.is_finite() => {
                if self.read_fault {
                    info!("{:?} position recovered", self.id);
                }
                self.position = p;
                self.read_fault = false;
            }
            other => {
                if !self.read_fault {
                    warn!(
                        "{:?} position unavailable ({:?}), keeping last reading",
                        self.id, other
                    );
                }
                self.read_fault = true;
            }
        }
    }

    fn publish(&self, sink: &mut dyn TelemetrySink) {
        let key = self.id.key();
        sink.publish_number(&format!("{}/position", key), self.position);
        sink.publish_number(
            &format!("{}/target", key),
            self.target.unwrap_or(f64::NAN),
        );
        sink.publish_bool(&format!("{}/at_target", key), self.at_target());
        sink.publish_bool(&format!("{}/read_fault", key), self.read_fault);
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use comms_if::eqpt::{loopback::LoopbackPort, EqptError};
    use std::f64::consts::PI;

    fn params(presets: &[f64]) -> JointParams {
        JointParams {
            min_pos: 0.0,
            max_pos: 1.2,
            tolerance: 0.02,
            presets: presets.to_vec(),
            wrap: false,
            slot: 1,
        }
    }

    fn joint(params: JointParams) -> (Joint, LoopbackPort) {
        let port = LoopbackPort::new();
        let j = Joint::new(SubsystemId::Elevator, Box::new(port.clone()), params).unwrap();
        (j, port)
    }

    fn tick() -> Tick {
        Tick {
            index: 0,
            time_s: 0.0,
            dt_s: 0.02,
        }
    }

    #[test]
    fn test_soft_limits_and_clamp() {
        let (mut j, port) = joint(params(&[]));
        assert_eq!(port.state().soft_limits, [Some(1.2), Some(0.0)]);

        assert_eq!(j.set_target(2.0).unwrap(), 1.2);
        assert_eq!(
            port.state().last_ref,
            Some((RefKind::MotionProfile, 1.2, 1))
        );
        assert_eq!(j.set_target(-1.0).unwrap(), 0.0);
        assert!(matches!(
            j.set_target(f64::NAN),
            Err(MechError::InvalidTarget(SubsystemId::Elevator, _))
        ));
    }

    #[test]
    fn test_at_target() {
        let (mut j, _) = joint(params(&[]));
        assert!(j.at_target());

        j.set_target(0.5).unwrap();
        assert!(!j.at_target());

        // The loopback port jumps straight to the target
        j.periodic(&tick());
        assert!(j.at_target());
    }

    #[test]
    fn test_position_kept_on_fault() {
        let (mut j, port) = joint(params(&[]));
        j.set_target(0.4).unwrap();
        j.periodic(&tick());

        port.with_state(|s| {
            s.position = 0.9;
            s.read_fault = Some(EqptError::NotResponding);
        });
        j.periodic(&tick());
        assert_eq!(j.position(), 0.4);

        port.with_state(|s| s.read_fault = None);
        j.periodic(&tick());
        assert_eq!(j.position(), 0.9);
    }

    #[test]
    fn test_next_preset() {
        let (mut j, _) = joint(params(&[1.0, 0.0, 0.5, 0.5, 3.0]));

        // Out of range and duplicate presets are dropped, the rest sorted
        assert_eq!(j.presets(), &[0.0, 0.5, 1.0]);

        assert_eq!(j.next_preset(PresetDir::Up), Some(0.5));
        assert_eq!(j.next_preset(PresetDir::Down), None);

        // Sitting at a preset (within tolerance) steps past it
        j.set_target(0.51).unwrap();
        j.periodic(&tick());
        assert_eq!(j.next_preset(PresetDir::Up), Some(1.0));
        assert_eq!(j.next_preset(PresetDir::Down), Some(0.0));

        j.set_target(1.0).unwrap();
        j.periodic(&tick());
        assert_eq!(j.next_preset(PresetDir::Up), None);
        assert_eq!(j.next_preset(PresetDir::Down), Some(0.5));

        // Between presets
        j.set_target(0.7).unwrap();
        j.periodic(&tick());
        assert_eq!(j.next_preset(PresetDir::Up), Some(1.0));
        assert_eq!(j.next_preset(PresetDir::Down), Some(0.5));
    }

    #[test]
    fn test_wrapping_joint() {
        let port = LoopbackPort::new();
        let mut j = Joint::new(
            SubsystemId::Turret,
            Box::new(port.clone()),
            JointParams {
                min_pos: -PI,
                max_pos: PI,
                tolerance: 0.01,
                presets: vec![],
                wrap: true,
                slot: 0,
            },
        )
        .unwrap();

        // No soft limits on a continuous joint, targets wrapped instead of clamped
        assert_eq!(port.state().soft_limits, [None, None]);
        let t = j.set_target(1.5 * PI).unwrap();
        assert!((t + 0.5 * PI).abs() < 1e-9);

        // Either side of the seam is close
        port.with_state(|s| s.position = PI - 0.005);
        j.periodic(&tick());
        j.target = Some(-PI + 0.003);
        assert!(j.at_target());
        assert!((j.error_to(-PI + 0.003) - 0.008).abs() < 1e-9);
    }

    #[test]
    fn test_invalid_limits() {
        let mut p = params(&[]);
        p.max_pos = p.min_pos;
        assert!(matches!(
            Joint::new(SubsystemId::Arm, Box::new(LoopbackPort::new()), p),
            Err(MechError::InvalidLimits(SubsystemId::Arm))
        ));
    }
}
