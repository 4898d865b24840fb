//! The sensor boundary contract. Concrete sensors (reading from a live
//! scape, a replay log, a simulator) are out of scope here — this crate only
//! fixes the interface the tick loop and the registry depend on.

use crate::CortexError;

/// Reads a fixed-width vector of scalars from whatever scape context a
/// concrete implementation is wired to.
pub trait Sensor: Send + Sync {
    fn name(&self) -> &str;
    fn read(&self) -> Result<Vec<f64>, CortexError>;
}
