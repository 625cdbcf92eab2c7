//! Integration tests for the safety gate.

use serial_test::serial;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::{Duration, Instant};
use vespa_guard::Error;
use vespa_guard::config::SafetyConfig;
use vespa_guard::safety::{
    ActuationRequest, Decision, DenyReason, GateState, ManualClock, SafetyGate,
    start_watchdog_monitor,
};

fn armed_gate() -> (Arc<SafetyGate>, ManualClock) {
    let clock = ManualClock::new(0);
    let gate = Arc::new(SafetyGate::new(
        &SafetyConfig::default(),
        Arc::new(clock.clone()),
    ));
    gate.arm().unwrap();
    gate.set_detection_active(true);
    (gate, clock)
}

fn engage() -> ActuationRequest {
    ActuationRequest::engage(-8.0, 2_000)
}

#[test]
fn test_every_failed_predicate_is_reported() {
    let clock = ManualClock::new(0);
    let gate = SafetyGate::new(&SafetyConfig::default(), Arc::new(clock));

    let Decision::Denied(denials) = gate.check(&ActuationRequest::engage(5.0, 1_000)) else {
        panic!("expected denial");
    };
    assert!(denials.contains(DenyReason::NotArmed));
    assert!(denials.contains(DenyReason::NoDetection));
    assert!(denials.contains(DenyReason::TiltUpward));
    assert!(!denials.contains(DenyReason::SafeMode));
}

#[test]
fn test_tilt_boundary() {
    let (gate, _) = armed_gate();
    assert!(gate.check(&ActuationRequest::engage(0.0, 500)).is_approved());
    assert!(!gate.check(&ActuationRequest::engage(0.01, 500)).is_approved());
    assert!(!gate.check(&ActuationRequest::engage(f32::NAN, 500)).is_approved());
    // The denial above stopped the actuator.
    assert_eq!(gate.state(), GateState::ArmedIdle);
}

#[test]
fn test_continuous_ceiling_requires_off_cycle() {
    let (gate, clock) = armed_gate();

    // Re-approve every 100 ms until the 10 s budget is gone.
    for step in 0..100u64 {
        clock.set(step * 100);
        let decision = gate.check(&engage());
        let remaining = 10_000 - step * 100;
        assert_eq!(
            decision,
            Decision::Approved {
                duration_ms: remaining.min(2_000)
            }
        );
    }

    clock.set(10_000);
    let decision = gate.check(&engage());
    assert!(matches!(decision, Decision::Denied(d) if d.contains(DenyReason::TimeExceeded)));
    assert!(!gate.is_actuating());

    // Still refused until the actuator has been explicitly off.
    clock.set(10_100);
    assert!(!gate.check(&engage()).is_approved());

    assert_eq!(gate.check(&ActuationRequest::off()), Decision::Off);
    assert_eq!(
        gate.check(&engage()),
        Decision::Approved { duration_ms: 2_000 }
    );
}

#[test]
fn test_back_to_back_pulses_share_the_ceiling() {
    let (gate, clock) = armed_gate();
    let pulse = ActuationRequest::engage(-5.0, 100);

    // Each pulse expires exactly when the next one is requested.
    for step in 0..100u64 {
        clock.set(step * 100);
        gate.heartbeat();
        assert_eq!(
            gate.check(&pulse),
            Decision::Approved { duration_ms: 100 },
            "pulse {step}"
        );
    }
    for step in 100..200u64 {
        clock.set(step * 100);
        gate.heartbeat();
        assert!(!gate.check(&pulse).is_approved(), "pulse {step}");
    }
    assert_eq!(gate.continuous_ms(), 10_000);

    gate.actuator_off();
    assert_eq!(gate.check(&pulse), Decision::Approved { duration_ms: 100 });
}

#[test]
fn test_watchdog_latch_and_manual_reset() {
    let (gate, clock) = armed_gate();
    let transitions = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&transitions);
    gate.set_observer(move |_, to| {
        if to == GateState::SafeModeWatchdog {
            seen.fetch_add(1, Ordering::SeqCst);
        }
    });

    clock.set(29_999);
    gate.poll();
    assert!(gate.is_watchdog_warning());
    assert_eq!(gate.watchdog_remaining_ms(), 1);
    assert!(gate.is_armed());

    clock.set(30_000);
    gate.heartbeat();
    assert_eq!(gate.state(), GateState::SafeModeWatchdog);
    assert_eq!(transitions.load(Ordering::SeqCst), 1);

    // Only the safe mode is reported while latched.
    let Decision::Denied(denials) = gate.check(&engage()) else {
        panic!("expected denial");
    };
    assert_eq!(denials.iter().collect::<Vec<_>>(), vec![DenyReason::SafeMode]);

    assert!(matches!(gate.arm(), Err(Error::ArmRefused { .. })));

    gate.reset().unwrap();
    assert_eq!(gate.state(), GateState::Disarmed);
    assert_eq!(gate.watchdog_remaining_ms(), 30_000);
    gate.arm().unwrap();
    assert!(gate.check(&engage()).is_approved());
    assert_eq!(gate.stats().safe_mode_entries, 1);
}

#[test]
fn test_brownout_latch_blocks_reset_until_recovered() {
    let (gate, _) = armed_gate();
    assert!(gate.check(&engage()).is_approved());

    gate.set_voltage(Some(4_400));
    assert_eq!(gate.state(), GateState::SafeModeBrownout);
    assert!(!gate.is_actuating());

    assert!(matches!(gate.reset(), Err(Error::ResetRefused { .. })));

    gate.set_voltage(Some(4_900));
    assert_eq!(gate.state(), GateState::SafeModeBrownout);
    gate.reset().unwrap();
    assert_eq!(gate.state(), GateState::Disarmed);
}

#[test]
fn test_kill_switch_disarms_and_blocks_arming() {
    let (gate, _) = armed_gate();
    assert!(gate.check(&engage()).is_approved());

    gate.set_kill_switch(true);
    assert_eq!(gate.state(), GateState::Disarmed);
    assert!(gate.arm().is_err());

    gate.set_kill_switch(false);
    assert_eq!(gate.state(), GateState::Disarmed);
    gate.arm().unwrap();
    assert!(gate.check(&engage()).is_approved());
}

#[test]
#[serial]
fn test_monitor_thread_latches_without_checks() {
    let (gate, clock) = armed_gate();
    let monitor = start_watchdog_monitor(Arc::clone(&gate), Duration::from_millis(5)).unwrap();

    clock.set(31_000);
    let deadline = Instant::now() + Duration::from_secs(5);
    while !gate.is_safe_mode() && Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(5));
    }
    drop(monitor);

    assert_eq!(gate.state(), GateState::SafeModeWatchdog);
}

#[test]
#[serial]
fn test_kill_switch_from_another_thread_stops_approvals() {
    let (gate, _) = armed_gate();
    let engaged = Arc::new(AtomicBool::new(false));
    let monitor = start_watchdog_monitor(Arc::clone(&gate), Duration::from_millis(1)).unwrap();

    let switch = {
        let gate = Arc::clone(&gate);
        let engaged = Arc::clone(&engaged);
        std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(20));
            gate.set_kill_switch(true);
            engaged.store(true, Ordering::SeqCst);
        })
    };

    let mut checks_after = 0;
    let deadline = Instant::now() + Duration::from_secs(5);
    while checks_after < 1_000 && Instant::now() < deadline {
        let seen = engaged.load(Ordering::SeqCst);
        let decision = gate.check(&engage());
        if seen {
            assert!(
                !decision.is_approved(),
                "approved after the kill switch was engaged"
            );
            checks_after += 1;
        }
    }
    switch.join().unwrap();
    drop(monitor);

    assert!(checks_after > 0);
    assert!(gate.kill_switch_engaged());
    assert_eq!(gate.state(), GateState::Disarmed);
}
