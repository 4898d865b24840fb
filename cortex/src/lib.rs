//! Boundary contracts for the collaborators that sit around the substrate:
//! sensors and actuators that read and write a scape, the morphology that
//! names which of them a given scape expects, the registry that resolves
//! them by name with a version handshake, and the tick loop that wires a
//! [`protogonos_substrate::SimpleRuntime`] to all three.

mod actuator;
mod error;
mod morphology;
mod registry;
mod sensor;
pub mod tick;

pub use actuator::Actuator;
pub use error::CortexError;
pub use morphology::{FixedMorphology, Morphology};
pub use registry::{ComponentRegistry, CODEC_VERSION, SCHEMA_VERSION};
pub use sensor::Sensor;
pub use tick::run_tick;
