//! Actuator driver seam.
//!
//! Drivers do no safety logic of their own; they are only ever handed
//! commands the gate has approved.

use serde::Serialize;

/// An approved command for the deterrent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ActuatorCommand {
    /// Pan angle in degrees.
    pub pan_deg: f32,
    /// Tilt angle in degrees; never positive.
    pub tilt_deg: f32,
    /// Granted on-time.
    pub duration_ms: u64,
}

/// Downstream actuator driver.
pub trait Actuator: Send {
    /// Point and switch on.
    fn apply(&mut self, command: &ActuatorCommand);

    /// Switch off. Must be idempotent.
    fn off(&mut self);

    /// Whether the emitter is on.
    fn is_on(&self) -> bool;
}

/// In-memory actuator used by replays and tests.
#[derive(Debug, Default, Clone)]
pub struct SimulatedActuator {
    current: Option<ActuatorCommand>,
    activations: u64,
    applied: Vec<ActuatorCommand>,
}

impl SimulatedActuator {
    /// Create an actuator that starts off.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Command currently applied.
    #[must_use]
    pub const fn current(&self) -> Option<&ActuatorCommand> {
        self.current.as_ref()
    }

    /// Off-to-on transitions seen.
    #[must_use]
    pub const fn activations(&self) -> u64 {
        self.activations
    }

    /// Every command applied, in order.
    #[must_use]
    pub fn applied(&self) -> &[ActuatorCommand] {
        &self.applied
    }
}

impl Actuator for SimulatedActuator {
    fn apply(&mut self, command: &ActuatorCommand) {
        if self.current.is_none() {
            self.activations += 1;
        }
        self.current = Some(*command);
        self.applied.push(*command);
    }

    fn off(&mut self) {
        self.current = None;
    }

    fn is_on(&self) -> bool {
        self.current.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simulated_actuator_counts_activations() {
        let mut actuator = SimulatedActuator::new();
        let command = ActuatorCommand {
            pan_deg: 1.0,
            tilt_deg: -5.0,
            duration_ms: 100,
        };
        actuator.apply(&command);
        actuator.apply(&command);
        assert_eq!(actuator.activations(), 1);
        actuator.off();
        actuator.off();
        assert!(!actuator.is_on());
        actuator.apply(&command);
        assert_eq!(actuator.activations(), 2);
        assert_eq!(actuator.applied().len(), 3);
    }
}
