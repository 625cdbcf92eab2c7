//! Safety enforcement between the decision step and the actuator.
//!
//! [`SafetyGate`] owns all safety state. Other components only report
//! detection liveness, heartbeats, the kill switch and voltage readings.

mod actuator;
mod clock;
mod gate;
mod watchdog;

pub use actuator::{Actuator, ActuatorCommand, SimulatedActuator};
pub use clock::{Clock, ManualClock, SystemClock};
pub use gate::{
    ActuationRequest, Decision, Denials, DenyReason, GateState, SafetyGate, SafetyStats,
    StateObserver,
};
pub use watchdog::{WatchdogMonitor, start_watchdog_monitor};
