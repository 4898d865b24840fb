use crate::Pid;
use thiserror::Error;

/// Externally observable error taxonomy for the substrate runtime.
///
/// Kinds map one-to-one onto the table in the substrate design: each variant
/// is either surfaced to the caller unchanged, or handled locally per the
/// recovery policy noted on the variant (see module docs at the call site).
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SubstrateError {
    #[error("cep output width invalid for `{cep_name}`: expected {expected}, got {got}")]
    InvalidCepOutputWidth {
        cep_name: String,
        expected: &'static str,
        got: usize,
    },

    #[error("unsupported cep command: `{cep_name}`")]
    UnsupportedCepCommand { cep_name: String },

    #[error("cep process already terminated")]
    CepProcessTerminated,

    #[error("forward from `{from}` is not in the configured fan-in set")]
    UnexpectedCepForwardSender { from: Pid },

    #[error("terminate from `{from}` rejected: not the owning pid")]
    UnexpectedCepTerminateSender { from: Pid },

    #[error("cep actor already terminated")]
    CepActorTerminated,

    #[error("cep actor not yet initialised")]
    CepActorUninitialised,

    #[error("cep actor already initialised")]
    CepActorAlreadyInitialised,

    #[error("init from `{from}` rejected: not the owning pid")]
    UnexpectedCepInitSender { from: Pid },

    #[error("missing cep actor for pid `{pid}`")]
    MissingCepActor { pid: Pid },

    #[error("missing cep fan-in relay for pid `{pid}`")]
    MissingCepFaninRelay { pid: Pid },

    #[error("missing substrate mailbox for weight {weight_index}")]
    MissingSubstrateMailbox { weight_index: usize },

    #[error("unexpected command sender: expected `{expected}`, got `{got}`")]
    UnexpectedCepCommandSender { expected: Pid, got: Pid },

    #[error("unexpected command target: expected `{expected}`, got `{got}`")]
    UnexpectedCepCommandTarget { expected: Pid, got: Pid },

    #[error("no substrate backup to restore from")]
    NoSubstrateBackup,

    #[error("substrate runtime already terminated")]
    SubstrateRuntimeTerminated,

    #[error("cep fan-in relay already terminated")]
    CepFaninRelayTerminated,

    #[error("substrate mailbox already terminated")]
    SubstrateMailboxTerminated,

    #[error("`{kind}` named `{name}` is already registered")]
    AlreadyRegistered { kind: &'static str, name: String },

    #[error("no `{kind}` registered under the name `{name}`")]
    UnknownComponent { kind: &'static str, name: String },

    #[error("step cancelled")]
    Cancelled,
}
