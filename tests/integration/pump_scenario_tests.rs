//! Pump timing scenarios driven through the public controller API.

use crate::mock_hw::{ActuatorCall, MockHardware};

use osmo::config::{DeviceConfig, PumpTiming};
use osmo::error::PumpError;
use osmo::pumps::{PumpController, PumpPhase};

fn make_controller() -> (PumpController, MockHardware) {
    let mut pumps = PumpController::new(&DeviceConfig::default());
    let mut hw = MockHardware::new();
    pumps.initialize(&mut hw);
    hw.clear();
    (pumps, hw)
}

// ── Activation plus cooldown gate availability ──────

#[test]
fn pump_unavailable_for_activation_plus_cooldown() {
    let (mut pumps, mut hw) = make_controller();
    pumps.activate(0, 0, false, &mut hw).unwrap();

    for t in (0..5_000).step_by(50) {
        pumps.tick(t, &mut hw);
        assert!(!pumps.is_available(0, t), "pump 0 available at t={t}");
    }
    pumps.tick(5_000, &mut hw);
    assert!(pumps.is_available(0, 5_000));
    assert_eq!(pumps.phase(0, 5_000), Ok(PumpPhase::Idle));
}

#[test]
fn output_follows_activation_window() {
    let (mut pumps, mut hw) = make_controller();
    pumps.activate(1, 0, false, &mut hw).unwrap();
    assert!(hw.pump_on(1));

    assert!(pumps.tick(1_999, &mut hw).is_empty());
    assert!(hw.pump_on(1));

    let expired = pumps.tick(2_000, &mut hw);
    assert_eq!(expired.as_slice(), &[1]);
    assert!(!hw.pump_on(1));
    assert_eq!(pumps.cooldown_remaining(1, 2_000), Ok(3_000));
}

// ── A busy pump keeps its original window ──────────

#[test]
fn second_activation_is_busy_and_keeps_window() {
    let (mut pumps, mut hw) = make_controller();
    pumps.activate(0, 0, false, &mut hw).unwrap();
    let writes = hw.pump_writes();

    assert_eq!(pumps.activate(0, 500, false, &mut hw), Err(PumpError::Busy));
    assert_eq!(hw.pump_writes(), writes, "busy activation must not touch outputs");
    assert_eq!(pumps.pump(0).unwrap().activation_started_at(), 0);

    // Still expires at the original deadline.
    assert_eq!(pumps.tick(2_000, &mut hw).as_slice(), &[0]);
}

#[test]
fn forced_reactivation_restarts_without_stacking() {
    let (mut pumps, mut hw) = make_controller();
    pumps.activate(0, 0, false, &mut hw).unwrap();
    pumps.activate(0, 500, true, &mut hw).unwrap();

    assert_eq!(pumps.pump(0).unwrap().activation_started_at(), 500);
    assert!(pumps.tick(2_499, &mut hw).is_empty());
    assert_eq!(pumps.tick(2_500, &mut hw).as_slice(), &[0]);
    assert!(pumps.is_available(0, 5_500));
}

#[test]
fn force_overrides_cooldown() {
    let (mut pumps, mut hw) = make_controller();
    pumps.activate(2, 0, false, &mut hw).unwrap();
    pumps.tick(2_000, &mut hw);
    assert_eq!(pumps.phase(2, 2_500), Ok(PumpPhase::Cooldown));

    pumps.activate(2, 2_500, true, &mut hw).unwrap();
    assert_eq!(pumps.phase(2, 2_500), Ok(PumpPhase::Active));
}

// ── Edge cases ───────────────────────────────────────────────

#[test]
fn out_of_range_ids_have_no_side_effects() {
    let (mut pumps, mut hw) = make_controller();
    assert_eq!(pumps.activate(4, 0, false, &mut hw), Err(PumpError::NotFound));
    assert_eq!(pumps.deactivate(99, 0, &mut hw), Err(PumpError::NotFound));
    assert_eq!(pumps.set_config(4, 1_000, 1_000), Err(PumpError::NotFound));
    assert_eq!(pumps.reset_config(8, &mut hw), Err(PumpError::NotFound));
    assert!(!pumps.is_available(4, 0));
    assert!(hw.calls.is_empty());
}

#[test]
fn deactivate_stamps_cooldown_even_when_idle() {
    let (mut pumps, mut hw) = make_controller();
    pumps.deactivate(3, 1_000, &mut hw).unwrap();
    assert_eq!(hw.last_call(), Some(&ActuatorCall::SetPump { pump_id: 3, on: false }));
    assert_eq!(pumps.cooldown_remaining(3, 1_000), Ok(3_000));
    assert!(pumps.is_available(3, 4_000));
}

#[test]
fn config_change_applies_to_next_cycle() {
    let (mut pumps, mut hw) = make_controller();
    pumps.activate(0, 0, false, &mut hw).unwrap();
    pumps.set_config(0, 10_000, 1_000).unwrap();

    // Running window keeps its latched 2000 ms.
    assert_eq!(pumps.tick(2_000, &mut hw).as_slice(), &[0]);
    // Cooldown is latched at stop, so the new 1000 ms applies.
    assert!(pumps.is_available(0, 3_000));

    pumps.activate(0, 3_000, false, &mut hw).unwrap();
    assert!(pumps.tick(12_999, &mut hw).is_empty());
    assert_eq!(pumps.tick(13_000, &mut hw).as_slice(), &[0]);
}

#[test]
fn reset_is_idempotent_and_clears_cooldown() {
    let (mut pumps, mut hw) = make_controller();
    pumps.set_config(1, 5_000, 5_000).unwrap();
    pumps.activate(1, 0, false, &mut hw).unwrap();

    pumps.reset_all_configs(&mut hw);
    assert!(!hw.pump_on(1));
    assert!(pumps.is_available(1, 0));
    assert_eq!(pumps.pump(1).unwrap().timing(), PumpTiming::default());

    let snapshot: Vec<_> = pumps.pumps().to_vec();
    pumps.reset_all_configs(&mut hw);
    assert_eq!(pumps.pumps(), snapshot.as_slice());
}

#[test]
fn pumps_are_independent() {
    let (mut pumps, mut hw) = make_controller();
    pumps.activate(0, 0, false, &mut hw).unwrap();
    pumps.activate(3, 100, false, &mut hw).unwrap();
    assert!(pumps.is_available(1, 100));
    assert!(pumps.is_available(2, 100));

    let expired = pumps.tick(2_100, &mut hw);
    assert_eq!(expired.as_slice(), &[0, 3]);
}
