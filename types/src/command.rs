use crate::Pid;
use serde::{Deserialize, Serialize};

/// The kind of weight-update command a CEP can emit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CepCommandKind {
    SetWeight,
    SetIterative,
    SetAbcn,
}

impl CepCommandKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CepCommandKind::SetWeight => "set_weight",
            CepCommandKind::SetIterative => "set_iterative",
            CepCommandKind::SetAbcn => "set_abcn",
        }
    }
}

/// A weight-update command, addressed from a `CepProcess` to a substrate
/// mailbox. `from_pid`/`to_pid` form the envelope validated by the runtime
/// before the command is allowed to reach the mailbox.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CepCommand {
    pub from_pid: Pid,
    pub to_pid: Pid,
    pub kind: CepCommandKind,
    pub signal: Vec<f64>,
}
