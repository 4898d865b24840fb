//! The actuator boundary contract, mirroring [`crate::sensor::Sensor`].

use crate::CortexError;

/// Writes a fixed-width vector of scalars (typically the post-step weight
/// vector) back out to whatever scape context a concrete implementation is
/// wired to.
pub trait Actuator: Send + Sync {
    fn name(&self) -> &str;
    fn write(&self, values: &[f64]) -> Result<(), CortexError>;
}
