//! `BuildCEPCommand`/`ApplyCEPCommand`: the reference command surface for
//! `set_weight`, `delta_weight`/`set_iterative`, and `set_abcn`.

use crate::kernels::{control_value, saturate};
use protogonos_types::{CepCommand, CepCommandKind, Parameters, SubstrateError};

/// Builds the `(kind, signal)` pair for a CEP's output. The caller stamps
/// the envelope (`from_pid`/`to_pid`) once this returns.
pub fn build_cep_command(
    cep_name: &str,
    output: &[f64],
    params: &Parameters,
) -> Result<(CepCommandKind, Vec<f64>), SubstrateError> {
    match cep_name {
        "set_weight" => {
            require_width(cep_name, output, 1)?;
            Ok((CepCommandKind::SetWeight, vec![control_value(output[0], params)]))
        }
        "delta_weight" | "set_iterative" => {
            require_width(cep_name, output, 1)?;
            Ok((
                CepCommandKind::SetIterative,
                vec![control_value(output[0], params)],
            ))
        }
        "set_abcn" => {
            if output.is_empty() {
                return Err(SubstrateError::InvalidCepOutputWidth {
                    cep_name: cep_name.to_string(),
                    expected: ">=1",
                    got: 0,
                });
            }
            Ok((CepCommandKind::SetAbcn, output.to_vec()))
        }
        other => Err(SubstrateError::UnsupportedCepCommand {
            cep_name: other.to_string(),
        }),
    }
}

fn require_width(cep_name: &str, output: &[f64], expected: usize) -> Result<(), SubstrateError> {
    debug_assert_eq!(expected, 1, "only width-1 reference CEPs use require_width");
    if output.len() != expected {
        return Err(SubstrateError::InvalidCepOutputWidth {
            cep_name: cep_name.to_string(),
            expected: "1",
            got: output.len(),
        });
    }
    Ok(())
}

/// Applies a validated command to the current weight, returning the next
/// (already-saturated) weight.
pub fn apply_cep_command(
    current: f64,
    command: &CepCommand,
    params: &Parameters,
) -> Result<f64, SubstrateError> {
    match command.kind {
        CepCommandKind::SetWeight => {
            require_signal_width(command, 1)?;
            Ok(saturate(command.signal[0]))
        }
        CepCommandKind::SetIterative => {
            require_signal_width(command, 1)?;
            Ok(saturate(current + command.signal[0]))
        }
        CepCommandKind::SetAbcn => {
            if command.signal.is_empty() {
                return Err(SubstrateError::InvalidCepOutputWidth {
                    cep_name: "set_abcn".to_string(),
                    expected: ">=1",
                    got: 0,
                });
            }
            let effective = if command.signal.len() >= 5 {
                params.with_abcn(
                    command.signal[1],
                    command.signal[2],
                    command.signal[3],
                    command.signal[4],
                )
            } else {
                params.clone()
            };
            Ok(apply_set_abcn(current, command.signal[0], &effective))
        }
    }
}

fn require_signal_width(command: &CepCommand, expected: usize) -> Result<(), SubstrateError> {
    if command.signal.len() != expected {
        return Err(SubstrateError::InvalidCepOutputWidth {
            cep_name: command.kind.as_str().to_string(),
            expected: "1",
            got: command.signal.len(),
        });
    }
    Ok(())
}

/// `current + N * (A*control*current + B*control + C*current)`, saturated.
/// Falls back to plain `current + control` when A/B/C/N aren't all present.
fn apply_set_abcn(current: f64, signal0: f64, params: &Parameters) -> f64 {
    let control = control_value(signal0, params);
    if let Some((a, b, c, n)) = params.abcn() {
        saturate(current + n * (a * control * current + b * control + c * current))
    } else {
        saturate(current + control)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use protogonos_types::Pid;

    fn command(kind: CepCommandKind, signal: Vec<f64>) -> CepCommand {
        CepCommand {
            from_pid: Pid::new("p"),
            to_pid: Pid::new("s"),
            kind,
            signal,
        }
    }

    #[test]
    fn build_set_weight_requires_width_one() {
        let params = Parameters::new();
        assert!(build_cep_command("set_weight", &[1.0, 2.0], &params).is_err());
        let (kind, signal) = build_cep_command("set_weight", &[1.0], &params).unwrap();
        assert_eq!(kind, CepCommandKind::SetWeight);
        assert_eq!(signal, vec![1.0]);
    }

    #[test]
    fn build_unsupported_name_fails() {
        let err = build_cep_command("does_not_exist", &[1.0], &Parameters::new()).unwrap_err();
        assert!(matches!(err, SubstrateError::UnsupportedCepCommand { .. }));
    }

    #[test]
    fn apply_set_weight_is_idempotent() {
        let params = Parameters::new();
        let cmd = command(CepCommandKind::SetWeight, vec![1.0]);
        let next = apply_cep_command(0.0, &cmd, &params).unwrap();
        assert_eq!(next, 1.0);
        let next_again = apply_cep_command(next, &cmd, &params).unwrap();
        assert_eq!(next_again, 1.0);
    }

    #[test]
    fn apply_set_iterative_saturates_at_weight_limit() {
        let params = Parameters::new();
        let cmd = command(CepCommandKind::SetIterative, vec![10.0]);
        let first = apply_cep_command(0.0, &cmd, &params).unwrap();
        assert_eq!(first, crate::kernels::WEIGHT_LIMIT);
        let second = apply_cep_command(first, &cmd, &params).unwrap();
        assert_eq!(second, crate::kernels::WEIGHT_LIMIT);
    }

    #[test]
    fn apply_set_abcn_with_explicit_coefficients() {
        let params = Parameters::new()
            .with("a", 0.2)
            .with("b", 0.5)
            .with("c", -0.1)
            .with("n", 0.8);
        let cmd = command(CepCommandKind::SetAbcn, vec![1.0]);
        let first = apply_cep_command(0.0, &cmd, &params).unwrap();
        assert!((first - 0.4).abs() < 1e-9);
        let second = apply_cep_command(first, &cmd, &params).unwrap();
        assert!((second - 0.832).abs() < 1e-9);
    }

    #[test]
    fn apply_set_abcn_without_coefficients_adds_control() {
        let cmd = command(CepCommandKind::SetAbcn, vec![1.0]);
        let next = apply_cep_command(0.0, &cmd, &Parameters::new()).unwrap();
        assert_eq!(next, control_value(1.0, &Parameters::new()));
    }
}
