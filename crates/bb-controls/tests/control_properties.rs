use bb_controls::{PIDController, PIDLoop, VoltageAverager};
use proptest::prelude::*;

fn rig_loop() -> PIDLoop {
    let pid = PIDController::new(0.0034, 0.0001722, 0.0003, 0.0, 5.0, 3.75).unwrap();
    PIDLoop::new(pid, 400.0).unwrap()
}

proptest! {
    #[test]
    fn output_always_within_limits(
        measurements in prop::collection::vec(-1.0e5..1.0e5f64, 1..200),
        dt in 0.01..5.0f64,
    ) {
        let mut pid = rig_loop();
        for m in measurements {
            let out = pid.step(m, dt).unwrap();
            prop_assert!((0.0..=5.0).contains(&out), "output {} out of range", out);
        }
    }

    #[test]
    fn averager_reflects_only_recent_values(
        values in prop::collection::vec(-10.0..10.0f64, 1..64),
        capacity in 1usize..16,
    ) {
        let mut avg = VoltageAverager::new(capacity);
        for &v in &values {
            avg.record(v);
        }
        let kept = values.len().min(capacity);
        let tail = &values[values.len() - kept..];
        let expected = tail.iter().sum::<f64>() / kept as f64;
        prop_assert_eq!(avg.len(), kept);
        prop_assert!((avg.average().unwrap() - expected).abs() < 1e-9);
    }
}

#[test]
fn output_holds_steady_at_setpoint() {
    let mut pid = rig_loop();
    let outputs: Vec<f64> = (0..50).map(|_| pid.step(400.0, 1.0).unwrap()).collect();
    let last = *outputs.last().unwrap();
    assert!((last - 3.75).abs() < 1e-12);
    assert!(outputs.windows(2).all(|w| (w[0] - w[1]).abs() < 1e-12));
}

#[test]
fn output_settles_after_measurement_reaches_setpoint() {
    let mut pid = rig_loop();
    // A disturbance followed by the flow returning to setpoint
    for _ in 0..5 {
        pid.step(380.0, 1.0).unwrap();
    }
    // First step back at setpoint carries the derivative of the recovery
    pid.step(400.0, 1.0).unwrap();
    let mut prev = pid.step(400.0, 1.0).unwrap();
    for _ in 0..20 {
        let out = pid.step(400.0, 1.0).unwrap();
        assert!((out - prev).abs() < 1e-12);
        prev = out;
    }
    // Integral remembers the disturbance
    assert!(prev > 3.75);
}

#[test]
fn closed_loop_drives_first_order_plant_to_setpoint() {
    // Flow responds linearly to voltage with unity lag per second
    let mut pid = rig_loop();
    let gain_lpm_per_volt = 110.0;
    let mut flow = 0.0;
    for _ in 0..5_000 {
        let volts = pid.step(flow, 1.0).unwrap();
        flow += (gain_lpm_per_volt * volts - flow) * 0.5;
    }
    assert!((flow - 400.0).abs() < 1.0, "flow settled at {flow}");
}
