//! The plasticity substrate: the CPP/CEP registries and numeric kernels, the
//! CEP process/actor/relay stack, the per-weight command mailbox, and the
//! `SimpleRuntime` that wires them into one computation step.

pub mod actor;
mod command;
mod kernels;
mod mailbox;
pub mod metrics;
mod process;
mod registry;
mod relay;
mod runtime;

pub use command::{apply_cep_command, build_cep_command};
pub use kernels::{control_value, saturate, scale_value, CONTROL_THRESHOLD, WEIGHT_LIMIT};
pub use mailbox::SubstrateCommandMailbox;
pub use metrics::SubstrateMetrics;
pub use process::{CepOutcome, CepProcess, ProcessMessage};
pub use registry::{Cep, CepRegistry, Cpp, CppRegistry};
pub use relay::CepFaninRelay;
pub use runtime::SimpleRuntime;
