//! Control tick: detection, decision, safety gate, actuator.
//!
//! The actuator is only ever driven with what the gate approved on the same
//! tick. Anything else (a denial, an off, no target) switches it off.

use super::detect::{DetectionPipeline, FrameReport};
use crate::config::Config;
use crate::error::Result;
use crate::frame::Frame;
use crate::safety::{Actuator, ActuatorCommand, ActuationRequest, Decision, GateState, SafetyGate};
use crate::targeting::{ActuationPolicy, Engagement};
use std::sync::Arc;
use tracing::{debug, info};

/// Outcome of one control tick.
#[derive(Debug, Clone)]
pub struct TickReport {
    /// Detection output for the frame.
    pub frame: FrameReport,
    /// Target selected by the policy, if any.
    pub engagement: Option<Engagement>,
    /// Gate decision for this tick.
    pub decision: Decision,
    /// Gate state after the tick.
    pub gate_state: GateState,
    /// Whether the actuator was left on.
    pub actuator_on: bool,
}

/// Runs the whole chain for each frame.
pub struct ControlLoop<A: Actuator> {
    pipeline: DetectionPipeline,
    policy: ActuationPolicy,
    gate: Arc<SafetyGate>,
    actuator: A,
    engagements: u64,
}

impl<A: Actuator> std::fmt::Debug for ControlLoop<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ControlLoop")
            .field("pipeline", &self.pipeline)
            .field("gate", &self.gate)
            .field("engagements", &self.engagements)
            .finish_non_exhaustive()
    }
}

impl<A: Actuator> ControlLoop<A> {
    /// Assemble a loop from already-built parts.
    pub fn new(pipeline: DetectionPipeline, gate: Arc<SafetyGate>, actuator: A) -> Self {
        let policy = ActuationPolicy::new(pipeline.dims(), &pipeline.config().targeting);
        Self {
            pipeline,
            policy,
            gate,
            actuator,
            engagements: 0,
        }
    }

    /// Build the detection pipeline from `config` and wire it to `gate`.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or buffers cannot
    /// be allocated.
    pub fn from_config(config: &Config, gate: Arc<SafetyGate>, actuator: A) -> Result<Self> {
        let pipeline = DetectionPipeline::new(config)?;
        Ok(Self::new(pipeline, gate, actuator))
    }

    /// Detection pipeline.
    #[must_use]
    pub const fn pipeline(&self) -> &DetectionPipeline {
        &self.pipeline
    }

    /// Shared safety gate.
    #[must_use]
    pub fn gate(&self) -> &Arc<SafetyGate> {
        &self.gate
    }

    /// Actuator driver.
    #[must_use]
    pub const fn actuator(&self) -> &A {
        &self.actuator
    }

    /// Ticks on which the actuator was driven.
    #[must_use]
    pub const fn engagements(&self) -> u64 {
        self.engagements
    }

    /// Process one frame end to end.
    pub fn tick(&mut self, frame: &Frame) -> TickReport {
        // The loop being alive is the heartbeat.
        self.gate.heartbeat();

        let report = self.pipeline.process(frame);
        self.gate
            .set_detection_active(!report.degraded && !report.detections.is_empty());

        let engagement = self.policy.decide(&report.detections);
        let request = engagement.map_or_else(ActuationRequest::off, |e| e.request);
        let decision = self.gate.check(&request);

        match (decision, engagement) {
            (Decision::Approved { duration_ms }, Some(target)) => {
                let command = ActuatorCommand {
                    pan_deg: target.angles.pan_deg,
                    tilt_deg: target.angles.tilt_deg,
                    duration_ms,
                };
                self.actuator.apply(&command);
                self.engagements += 1;
                debug!(
                    "Frame {}: engaging track {} at pan {:.1}, tilt {:.1} for {duration_ms} ms",
                    report.sequence, target.detection.track_id, command.pan_deg, command.tilt_deg
                );
            }
            (Decision::Denied(reasons), Some(target)) => {
                self.actuator.off();
                debug!(
                    "Frame {}: track {} denied ({reasons})",
                    report.sequence, target.detection.track_id
                );
            }
            _ => self.actuator.off(),
        }

        TickReport {
            frame: report,
            engagement,
            decision,
            gate_state: self.gate.state(),
            actuator_on: self.actuator.is_on(),
        }
    }

    /// Switch off and disarm. Safe to call more than once.
    pub fn shutdown(&mut self) {
        self.actuator.off();
        self.gate.actuator_off();
        self.gate.disarm();
        info!("Control loop stopped after {} engagements", self.engagements);
    }
}
