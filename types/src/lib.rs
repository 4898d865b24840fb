//! Shared schema types for protogonos.
//!
//! This crate defines the value types and error taxonomy shared between the
//! `substrate` and `cortex` crates: process identities, the command
//! envelope, the parameter bag, the runtime construction `Spec`, and the
//! externally observable error kinds.

mod command;
mod error;
mod params;
mod pid;
mod spec;

pub use command::{CepCommand, CepCommandKind};
pub use error::SubstrateError;
pub use params::Parameters;
pub use pid::Pid;
pub use spec::Spec;
