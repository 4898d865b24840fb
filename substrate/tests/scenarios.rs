//! Black-box scenarios against the public `SimpleRuntime` surface, covering
//! the testable properties and concrete scenarios that don't need access to
//! the runtime's internal per-weight wiring.

use protogonos_substrate::{apply_cep_command, build_cep_command, saturate, SimpleRuntime, WEIGHT_LIMIT};
use protogonos_types::{Parameters, Pid, Spec};
use std::collections::HashMap;

fn spec(cpp_name: &str, cep_name: &str, fanin_pids: Vec<Pid>, params: Parameters) -> Spec {
    Spec {
        cpp_name: cpp_name.to_string(),
        cep_name: Some(cep_name.to_string()),
        cep_fanin_pids: fanin_pids,
        parameters: params,
        ..Default::default()
    }
}

// Invariant 1: saturate(apply(build("set_weight", [v], params), params)) == saturate(controlValue(v, params)).
#[test]
fn invariant_set_weight_round_trip_equals_saturated_control_value() {
    let params = Parameters::new().with("scale", 0.7);
    for v in [-2.0, -0.5, 0.0, 0.5, 1.5] {
        let (kind, signal) = build_cep_command("set_weight", &[v], &params).unwrap();
        let command = protogonos_types::CepCommand {
            from_pid: Pid::new("p"),
            to_pid: Pid::new("s"),
            kind,
            signal,
        };
        let applied = apply_cep_command(0.0, &command, &params).unwrap();
        let expected = saturate(protogonos_substrate::control_value(v, &params));
        assert!((applied - expected).abs() < 1e-12);
        assert!(applied <= WEIGHT_LIMIT && applied >= -WEIGHT_LIMIT);
    }
}

// S5: selective receive tolerates reordered arrival. At the runtime level,
// this shows up as the named-fan-in map producing the same result
// regardless of HashMap iteration order, since the runtime always projects
// by pid, never by insertion order.
#[tokio::test]
async fn s5_named_fanin_is_order_independent() {
    let fanin = vec![Pid::new("n1"), Pid::new("n2")];
    let params = Parameters::new().with("a", 0.2).with("b", 0.5).with("c", -0.1).with("n", 0.8);

    let mut a = SimpleRuntime::new(
        spec("set_weight", "set_abcn", fanin.clone(), params.clone()),
        1,
    )
    .await
    .unwrap();
    let mut b = SimpleRuntime::new(spec("set_weight", "set_abcn", fanin, params), 1)
        .await
        .unwrap();

    let mut map1 = HashMap::new();
    map1.insert(Pid::new("n1"), 0.2);
    map1.insert(Pid::new("n2"), 0.8);

    let mut map2 = HashMap::new();
    map2.insert(Pid::new("n2"), 0.8);
    map2.insert(Pid::new("n1"), 0.2);

    let weights_a = a.step(&[], Some(&map1)).await.unwrap();
    let weights_b = b.step(&[], Some(&map2)).await.unwrap();
    assert_eq!(weights_a, weights_b);
}

// Invariant 5: Step; Backup; Step*k; Restore yields the post-first-step vector.
#[tokio::test]
async fn invariant_backup_restore_round_trip_across_multiple_steps() {
    let mut runtime = SimpleRuntime::new(
        spec("set_weight", "delta_weight", vec![], Parameters::new().with("scale", 0.5)),
        2,
    )
    .await
    .unwrap();

    runtime.step(&[1.0, 3.0], None).await.unwrap();
    runtime.backup();
    let snapshot = runtime.weights().to_vec();

    for _ in 0..5 {
        runtime.step(&[0.9, 0.9], None).await.unwrap();
    }
    runtime.restore().unwrap();

    assert_eq!(runtime.weights(), snapshot.as_slice());
}

// Invariant 6: Terminate() twice never blocks and leaves state unchanged.
#[tokio::test]
async fn invariant_terminate_is_idempotent() {
    let mut runtime = SimpleRuntime::new(
        spec("set_weight", "delta_weight", vec![], Parameters::new()),
        1,
    )
    .await
    .unwrap();

    runtime.step(&[1.0], None).await.unwrap();
    let before = runtime.weights().to_vec();

    runtime.terminate().await;
    runtime.terminate().await;

    assert_eq!(runtime.weights(), before.as_slice());
    assert!(runtime.terminated());
    assert!(runtime.step(&[1.0], None).await.is_err());
}

// Reset zeroes every weight regardless of history.
#[tokio::test]
async fn reset_zeroes_all_weights() {
    let mut runtime = SimpleRuntime::new(
        spec("set_weight", "delta_weight", vec![], Parameters::new().with("scale", 0.5)),
        3,
    )
    .await
    .unwrap();

    runtime.step(&[1.0, 3.0], None).await.unwrap();
    assert!(runtime.weights().iter().any(|&w| w != 0.0));

    runtime.reset();
    assert_eq!(runtime.weights(), vec![0.0, 0.0, 0.0].as_slice());
}
