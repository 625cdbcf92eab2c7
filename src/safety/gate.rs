//! The safety gate: the single checkpoint every actuation request passes.
//!
//! All state lives behind one mutex so a heartbeat, a kill-switch toggle
//! and a check can never interleave. Every unknown or unreadable condition
//! resolves to "actuator off". Observers are always invoked after the lock
//! is released.

use super::clock::Clock;
use crate::config::SafetyConfig;
use crate::constants::safety::MAX_TILT_DEG;
use crate::error::{Error, Result};
use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, error, info, warn};

/// Gate state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GateState {
    /// Not armed; every request is denied.
    Disarmed,
    /// Armed, actuator off.
    ArmedIdle,
    /// Armed, actuator on under an approved request.
    ArmedActuating,
    /// Latched after a missed heartbeat.
    SafeModeWatchdog,
    /// Latched after a supply brownout.
    SafeModeBrownout,
}

impl GateState {
    /// Either latched safe mode.
    #[must_use]
    pub const fn is_safe_mode(self) -> bool {
        matches!(self, Self::SafeModeWatchdog | Self::SafeModeBrownout)
    }

    /// Armed, idle or actuating.
    #[must_use]
    pub const fn is_armed(self) -> bool {
        matches!(self, Self::ArmedIdle | Self::ArmedActuating)
    }
}

impl std::fmt::Display for GateState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Disarmed => write!(f, "disarmed"),
            Self::ArmedIdle => write!(f, "armed-idle"),
            Self::ArmedActuating => write!(f, "armed-actuating"),
            Self::SafeModeWatchdog => write!(f, "safe-mode-watchdog"),
            Self::SafeModeBrownout => write!(f, "safe-mode-brownout"),
        }
    }
}

/// An actuation request as produced by the decision step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ActuationRequest {
    /// Turn the actuator on (`true`) or off (`false`).
    pub enable: bool,
    /// Requested tilt; 0 is horizontal, negative is downward.
    pub tilt_deg: f32,
    /// Requested on-time.
    pub duration_ms: u64,
}

impl ActuationRequest {
    /// Request the actuator on.
    #[must_use]
    pub const fn engage(tilt_deg: f32, duration_ms: u64) -> Self {
        Self {
            enable: true,
            tilt_deg,
            duration_ms,
        }
    }

    /// Request the actuator off.
    #[must_use]
    pub const fn off() -> Self {
        Self {
            enable: false,
            tilt_deg: 0.0,
            duration_ms: 0,
        }
    }
}

/// One failed predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DenyReason {
    /// The gate is not armed.
    NotArmed,
    /// The detection pipeline is not active this cycle.
    NoDetection,
    /// Requested tilt points upward.
    TiltUpward,
    /// Continuous on-time ceiling reached.
    TimeExceeded,
    /// Kill switch engaged.
    KillSwitch,
    /// A safe mode is latched.
    SafeMode,
    /// Gate state could not be read.
    Fault,
}

impl DenyReason {
    const ALL: [Self; 7] = [
        Self::NotArmed,
        Self::NoDetection,
        Self::TiltUpward,
        Self::TimeExceeded,
        Self::KillSwitch,
        Self::SafeMode,
        Self::Fault,
    ];

    const fn bit(self) -> u8 {
        match self {
            Self::NotArmed => 1,
            Self::NoDetection => 1 << 1,
            Self::TiltUpward => 1 << 2,
            Self::TimeExceeded => 1 << 3,
            Self::KillSwitch => 1 << 4,
            Self::SafeMode => 1 << 5,
            Self::Fault => 1 << 6,
        }
    }
}

impl std::fmt::Display for DenyReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotArmed => write!(f, "not_armed"),
            Self::NoDetection => write!(f, "no_detection"),
            Self::TiltUpward => write!(f, "tilt_upward"),
            Self::TimeExceeded => write!(f, "time_exceeded"),
            Self::KillSwitch => write!(f, "kill_switch"),
            Self::SafeMode => write!(f, "safe_mode"),
            Self::Fault => write!(f, "fault"),
        }
    }
}

/// Set of failed predicates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct Denials(u8);

impl Denials {
    /// Single-reason set.
    #[must_use]
    pub const fn only(reason: DenyReason) -> Self {
        Self(reason.bit())
    }

    /// Add a reason.
    pub fn insert(&mut self, reason: DenyReason) {
        self.0 |= reason.bit();
    }

    /// Whether `reason` is present.
    #[must_use]
    pub const fn contains(self, reason: DenyReason) -> bool {
        self.0 & reason.bit() != 0
    }

    /// No predicate failed.
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Reasons in a fixed order.
    pub fn iter(self) -> impl Iterator<Item = DenyReason> {
        DenyReason::ALL.into_iter().filter(move |r| self.contains(*r))
    }
}

impl std::fmt::Display for Denials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, reason) in self.iter().enumerate() {
            if i > 0 {
                write!(f, "+")?;
            }
            write!(f, "{reason}")?;
        }
        Ok(())
    }
}

/// Outcome of [`SafetyGate::check`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Actuator may be on for at most `duration_ms`.
    Approved {
        /// Granted on-time, capped to the remaining continuous budget.
        duration_ms: u64,
    },
    /// An off request; always honoured.
    Off,
    /// Request refused; the actuator must be off.
    Denied(Denials),
}

impl Decision {
    /// Whether the actuator may be on.
    #[must_use]
    pub const fn is_approved(&self) -> bool {
        matches!(self, Self::Approved { .. })
    }
}

impl std::fmt::Display for Decision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Approved { duration_ms } => write!(f, "approved:{duration_ms}"),
            Self::Off => write!(f, "off"),
            Self::Denied(reasons) => write!(f, "denied:{reasons}"),
        }
    }
}

/// Audit counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SafetyStats {
    /// Enable requests checked.
    pub checks_performed: u64,
    /// Enable requests approved.
    pub checks_passed: u64,
    /// Enable requests denied.
    pub checks_failed: u64,
    /// Denials for not being armed.
    pub not_armed: u64,
    /// Denials for inactive detection.
    pub no_detection: u64,
    /// Denials for upward tilt.
    pub tilt_upward: u64,
    /// Denials and forced stops for the continuous-time ceiling.
    pub time_exceeded: u64,
    /// Denials for the kill switch.
    pub kill_switch: u64,
    /// Denials while latched.
    pub safe_mode: u64,
    /// Number of safe-mode latches.
    pub safe_mode_entries: u64,
    /// Milliseconds since the gate was created.
    pub uptime_ms: u64,
}

/// Callback invoked with `(from, to)` on each state transition.
pub type StateObserver = Arc<dyn Fn(GateState, GateState) + Send + Sync>;

struct GateInner {
    state: GateState,
    detection_active: bool,
    kill_switch: bool,
    tilt_deg: f32,
    actuating_since_ms: Option<u64>,
    on_time_ms: u64,
    deadline_ms: u64,
    budget_exhausted: bool,
    last_heartbeat_ms: u64,
    watchdog_warned: bool,
    voltage_mv: Option<u32>,
    voltage_warned: bool,
    stats: SafetyStats,
    created_ms: u64,
    observer: Option<StateObserver>,
    transitions: Vec<(GateState, GateState)>,
}

impl GateInner {
    fn set_state(&mut self, next: GateState) {
        if self.state != next {
            info!("Safety gate: {} -> {}", self.state, next);
            self.transitions.push((self.state, next));
            self.state = next;
        }
    }

    /// On-time since the last explicit off, including finished pulses.
    fn continuous_ms(&self, now: u64) -> u64 {
        let running = self
            .actuating_since_ms
            .map_or(0, |since| now.saturating_sub(since));
        self.on_time_ms + running
    }

    /// Close the running pulse at `at`; its on-time still counts.
    fn end_pulse(&mut self, at: u64) {
        if let Some(since) = self.actuating_since_ms.take() {
            self.on_time_ms += at.saturating_sub(since);
        }
        if self.state == GateState::ArmedActuating {
            self.set_state(GateState::ArmedIdle);
        }
    }

    /// Actuator is off for real: the continuous counter starts over.
    fn clear_on_time(&mut self) {
        self.actuating_since_ms = None;
        self.on_time_ms = 0;
    }

    /// Latch a safe mode; the first latch wins.
    fn latch(&mut self, mode: GateState) {
        if self.state.is_safe_mode() {
            return;
        }
        self.stats.safe_mode_entries += 1;
        self.clear_on_time();
        self.set_state(mode);
    }

    /// Enforce time-based rules that hold even without a check.
    fn refresh(&mut self, now: u64, config: &SafetyConfig) {
        let silence = now.saturating_sub(self.last_heartbeat_ms);
        if silence >= config.watchdog_timeout_ms {
            if !self.state.is_safe_mode() {
                error!("Watchdog: no heartbeat for {silence} ms, actuator forced off and safe mode latched");
            }
            self.latch(GateState::SafeModeWatchdog);
        } else if silence >= config.watchdog_warning_ms && !self.watchdog_warned {
            self.watchdog_warned = true;
            warn!(
                "Watchdog: no heartbeat for {silence} ms, {} ms remaining",
                config.watchdog_timeout_ms - silence
            );
        }

        if let Some(mv) = self.voltage_mv
            && mv < config.brownout_mv
        {
            if !self.state.is_safe_mode() {
                error!("Brownout at {mv} mV, actuator forced off and safe mode latched");
            }
            self.latch(GateState::SafeModeBrownout);
        }

        if self.state == GateState::ArmedActuating {
            if self.continuous_ms(now) >= config.max_continuous_ms {
                warn!(
                    "Continuous on-time reached {} ms, actuator forced off",
                    config.max_continuous_ms
                );
                self.budget_exhausted = true;
                self.stats.time_exceeded += 1;
                self.end_pulse(now);
            } else if now >= self.deadline_ms {
                // Expiry is not an off cycle; a back-to-back pulse continues the count.
                debug!("Approved duration elapsed, actuator idle");
                let deadline = self.deadline_ms;
                self.end_pulse(deadline);
            }
        }
    }
}

/// Fail-closed interlock between the decision step and the actuator.
pub struct SafetyGate {
    inner: Mutex<GateInner>,
    clock: Arc<dyn Clock>,
    config: SafetyConfig,
}

impl std::fmt::Debug for SafetyGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SafetyGate")
            .field("state", &self.state())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl SafetyGate {
    /// Create a disarmed gate. The watchdog window starts now.
    #[must_use]
    pub fn new(config: &SafetyConfig, clock: Arc<dyn Clock>) -> Self {
        let now = clock.now_ms();
        Self {
            inner: Mutex::new(GateInner {
                state: GateState::Disarmed,
                detection_active: false,
                kill_switch: false,
                tilt_deg: 0.0,
                actuating_since_ms: None,
                on_time_ms: 0,
                deadline_ms: 0,
                budget_exhausted: false,
                last_heartbeat_ms: now,
                watchdog_warned: false,
                voltage_mv: None,
                voltage_warned: false,
                stats: SafetyStats::default(),
                created_ms: now,
                observer: None,
                transitions: Vec::new(),
            }),
            clock,
            config: *config,
        }
    }

    /// Active ceilings.
    #[must_use]
    pub const fn config(&self) -> &SafetyConfig {
        &self.config
    }

    fn lock(&self) -> Option<MutexGuard<'_, GateInner>> {
        match self.inner.lock() {
            Ok(guard) => Some(guard),
            Err(_) => {
                error!("Safety gate state is poisoned; treating as actuator off");
                None
            }
        }
    }

    /// Release the lock, then report queued transitions.
    fn finish(mut guard: MutexGuard<'_, GateInner>) {
        let transitions = std::mem::take(&mut guard.transitions);
        let observer = guard.observer.clone();
        drop(guard);

        if let Some(observer) = observer {
            for (from, to) in transitions {
                observer(from, to);
            }
        }
    }

    /// Evaluate an actuation request.
    ///
    /// Denials are expected and silent: they are logged for audit and
    /// returned as [`Decision::Denied`], and any running actuation stops.
    pub fn check(&self, request: &ActuationRequest) -> Decision {
        if !request.enable {
            self.actuator_off();
            return Decision::Off;
        }

        let Some(mut inner) = self.lock() else {
            return Decision::Denied(Denials::only(DenyReason::Fault));
        };
        let now = self.clock.now_ms();
        inner.refresh(now, &self.config);
        inner.stats.checks_performed += 1;

        let mut denials = Denials::default();
        if inner.state.is_safe_mode() {
            denials.insert(DenyReason::SafeMode);
            inner.stats.safe_mode += 1;
        } else {
            if !inner.state.is_armed() {
                denials.insert(DenyReason::NotArmed);
                inner.stats.not_armed += 1;
            }
            if !inner.detection_active {
                denials.insert(DenyReason::NoDetection);
                inner.stats.no_detection += 1;
            }
            if inner.budget_exhausted || inner.continuous_ms(now) >= self.config.max_continuous_ms
            {
                denials.insert(DenyReason::TimeExceeded);
                inner.stats.time_exceeded += 1;
            }
            if inner.kill_switch {
                denials.insert(DenyReason::KillSwitch);
                inner.stats.kill_switch += 1;
            }
        }

        // Checked on its own, whatever else holds.
        if request.tilt_deg.is_nan() || request.tilt_deg > MAX_TILT_DEG {
            denials.insert(DenyReason::TiltUpward);
            inner.stats.tilt_upward += 1;
            warn!(
                "Actuation denied: upward tilt {:.3} deg requested",
                request.tilt_deg
            );
        }

        let decision = if denials.is_empty() {
            inner.actuating_since_ms.get_or_insert(now);
            let used = inner.continuous_ms(now);
            let granted = request
                .duration_ms
                .min(self.config.max_continuous_ms.saturating_sub(used));

            inner.tilt_deg = request.tilt_deg;
            inner.deadline_ms = now.saturating_add(granted);
            inner.set_state(GateState::ArmedActuating);
            inner.stats.checks_passed += 1;
            debug!(
                "Actuation approved: tilt {:.1} deg, {granted} ms (continuous {used} ms)",
                request.tilt_deg
            );
            Decision::Approved {
                duration_ms: granted,
            }
        } else {
            inner.stats.checks_failed += 1;
            if denials.contains(DenyReason::TimeExceeded) {
                inner.budget_exhausted = true;
            }
            inner.end_pulse(now);
            debug!("Actuation denied: {denials}");
            Decision::Denied(denials)
        };

        Self::finish(inner);
        decision
    }

    /// Explicitly turn the actuator off. Always allowed.
    ///
    /// This is the "off" half of an off/on cycle and resets the
    /// continuous-time counter.
    pub fn actuator_off(&self) {
        let Some(mut inner) = self.lock() else {
            return;
        };
        let now = self.clock.now_ms();
        inner.refresh(now, &self.config);
        inner.budget_exhausted = false;
        inner.clear_on_time();
        if inner.state == GateState::ArmedActuating {
            inner.set_state(GateState::ArmedIdle);
        }
        Self::finish(inner);
    }

    /// Record that the main loop is alive.
    ///
    /// Does not clear a latched safe mode.
    pub fn heartbeat(&self) {
        let Some(mut inner) = self.lock() else {
            return;
        };
        let now = self.clock.now_ms();
        // A heartbeat that arrives after the deadline is too late.
        inner.refresh(now, &self.config);
        inner.last_heartbeat_ms = now;
        inner.watchdog_warned = false;
        Self::finish(inner);
    }

    /// Periodic enforcement of the watchdog, brownout, duration and
    /// continuous-time rules.
    pub fn poll(&self) {
        let Some(mut inner) = self.lock() else {
            return;
        };
        let now = self.clock.now_ms();
        inner.refresh(now, &self.config);
        Self::finish(inner);
    }

    /// Arm the gate.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ArmRefused`] while a safe mode is latched or the
    /// kill switch is engaged.
    pub fn arm(&self) -> Result<()> {
        let Some(mut inner) = self.lock() else {
            return Err(Error::ArmRefused {
                reason: "safety state unavailable".to_string(),
            });
        };
        let now = self.clock.now_ms();
        inner.refresh(now, &self.config);

        let refusal = if inner.state.is_safe_mode() {
            Some(format!("{} is latched; manual reset required", inner.state))
        } else if inner.kill_switch {
            Some("kill switch is engaged".to_string())
        } else {
            None
        };

        if let Some(reason) = refusal {
            Self::finish(inner);
            warn!("Arm refused: {reason}");
            return Err(Error::ArmRefused { reason });
        }

        if inner.state == GateState::Disarmed {
            inner.set_state(GateState::ArmedIdle);
        }
        Self::finish(inner);
        Ok(())
    }

    /// Disarm the gate, forcing the actuator off. Safe modes stay latched.
    pub fn disarm(&self) {
        let Some(mut inner) = self.lock() else {
            return;
        };
        inner.clear_on_time();
        if inner.state.is_armed() {
            inner.set_state(GateState::Disarmed);
        }
        Self::finish(inner);
    }

    /// Set the kill switch. Engaging it forces the actuator off and disarms.
    pub fn set_kill_switch(&self, engaged: bool) {
        let Some(mut inner) = self.lock() else {
            return;
        };
        if inner.kill_switch != engaged {
            if engaged {
                warn!("Kill switch engaged");
            } else {
                info!("Kill switch released; gate stays disarmed");
            }
        }
        inner.kill_switch = engaged;
        if engaged && inner.state.is_armed() {
            inner.clear_on_time();
            inner.set_state(GateState::Disarmed);
        }
        Self::finish(inner);
    }

    /// Report whether detection is live for the current cycle.
    pub fn set_detection_active(&self, active: bool) {
        if let Some(mut inner) = self.lock() {
            inner.detection_active = active;
        }
    }

    /// Feed a supply voltage reading; `None` means no reading available.
    ///
    /// Without readings the brownout rule is inert.
    pub fn set_voltage(&self, voltage_mv: Option<u32>) {
        let Some(mut inner) = self.lock() else {
            return;
        };
        inner.voltage_mv = voltage_mv;

        match voltage_mv {
            Some(mv) if mv < self.config.voltage_warning_mv && mv >= self.config.brownout_mv => {
                if !inner.voltage_warned {
                    inner.voltage_warned = true;
                    warn!("Supply voltage low: {mv} mV");
                }
            }
            _ => inner.voltage_warned = false,
        }

        let now = self.clock.now_ms();
        inner.refresh(now, &self.config);
        Self::finish(inner);
    }

    /// Clear a latched safe mode and return to [`GateState::Disarmed`].
    ///
    /// Restarts the watchdog window. A no-op when no safe mode is latched.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ResetRefused`] if the supply is still below the
    /// brownout threshold.
    pub fn reset(&self) -> Result<()> {
        let Some(mut inner) = self.lock() else {
            return Err(Error::ResetRefused {
                reason: "safety state unavailable".to_string(),
            });
        };

        if !inner.state.is_safe_mode() {
            return Ok(());
        }

        if let Some(mv) = inner.voltage_mv
            && mv < self.config.brownout_mv
        {
            Self::finish(inner);
            let reason = format!("supply still at {mv} mV");
            warn!("Safe-mode reset refused: {reason}");
            return Err(Error::ResetRefused { reason });
        }

        inner.last_heartbeat_ms = self.clock.now_ms();
        inner.watchdog_warned = false;
        inner.budget_exhausted = false;
        inner.clear_on_time();
        inner.set_state(GateState::Disarmed);
        info!("Safe mode cleared by manual reset; gate is disarmed");
        Self::finish(inner);
        Ok(())
    }

    /// Install a state-transition observer.
    pub fn set_observer(&self, observer: impl Fn(GateState, GateState) + Send + Sync + 'static) {
        if let Some(mut inner) = self.lock() {
            inner.observer = Some(Arc::new(observer));
        }
    }

    /// Current state. An unreadable gate reports a latched watchdog.
    #[must_use]
    pub fn state(&self) -> GateState {
        self.lock()
            .map_or(GateState::SafeModeWatchdog, |inner| inner.state)
    }

    /// Whether a safe mode is latched.
    #[must_use]
    pub fn is_safe_mode(&self) -> bool {
        self.state().is_safe_mode()
    }

    /// Whether the gate is armed.
    #[must_use]
    pub fn is_armed(&self) -> bool {
        self.state().is_armed()
    }

    /// Whether the actuator is currently approved on.
    #[must_use]
    pub fn is_actuating(&self) -> bool {
        self.state() == GateState::ArmedActuating
    }

    /// Whether the kill switch is engaged.
    #[must_use]
    pub fn kill_switch_engaged(&self) -> bool {
        self.lock().is_none_or(|inner| inner.kill_switch)
    }

    /// Whether detection was reported active.
    #[must_use]
    pub fn detection_active(&self) -> bool {
        self.lock().is_some_and(|inner| inner.detection_active)
    }

    /// Tilt of the last approved request.
    #[must_use]
    pub fn commanded_tilt_deg(&self) -> f32 {
        self.lock().map_or(0.0, |inner| inner.tilt_deg)
    }

    /// Current continuous on-time.
    #[must_use]
    pub fn continuous_ms(&self) -> u64 {
        let now = self.clock.now_ms();
        self.lock().map_or(0, |inner| inner.continuous_ms(now))
    }

    /// Milliseconds until the watchdog deadline; 0 once missed.
    #[must_use]
    pub fn watchdog_remaining_ms(&self) -> u64 {
        let now = self.clock.now_ms();
        self.lock().map_or(0, |inner| {
            self.config
                .watchdog_timeout_ms
                .saturating_sub(now.saturating_sub(inner.last_heartbeat_ms))
        })
    }

    /// Whether the heartbeat is late enough to warn about.
    #[must_use]
    pub fn is_watchdog_warning(&self) -> bool {
        let now = self.clock.now_ms();
        self.lock().is_none_or(|inner| {
            now.saturating_sub(inner.last_heartbeat_ms) >= self.config.watchdog_warning_ms
        })
    }

    /// Last voltage reading.
    #[must_use]
    pub fn voltage_mv(&self) -> Option<u32> {
        self.lock().and_then(|inner| inner.voltage_mv)
    }

    /// Snapshot of the audit counters.
    #[must_use]
    pub fn stats(&self) -> SafetyStats {
        let now = self.clock.now_ms();
        self.lock().map_or_else(SafetyStats::default, |inner| SafetyStats {
            uptime_ms: now.saturating_sub(inner.created_ms),
            ..inner.stats
        })
    }
}
