//! A small named-component directory shared by sensors and actuators, with
//! the version handshake the boundary contract calls for: every registered
//! component is pinned to the current schema and codec version, and a scape
//! can only resolve components whose owning morphology actually lists them.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::CortexError;

pub const SCHEMA_VERSION: u32 = 1;
pub const CODEC_VERSION: u32 = 1;

struct Entry<T: ?Sized> {
    component: Arc<T>,
    schema_version: u32,
    codec_version: u32,
}

/// A registry of named components of type `T` (typically `dyn Sensor` or
/// `dyn Actuator`).
pub struct ComponentRegistry<T: ?Sized> {
    entries: RwLock<HashMap<String, Entry<T>>>,
}

impl<T: ?Sized> Default for ComponentRegistry<T> {
    fn default() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }
}

impl<T: ?Sized> ComponentRegistry<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a component at the current schema/codec version.
    pub fn register(&self, name: impl Into<String>, component: Arc<T>) -> Result<(), CortexError> {
        self.register_versioned(name, component, SCHEMA_VERSION, CODEC_VERSION)
    }

    pub fn register_versioned(
        &self,
        name: impl Into<String>,
        component: Arc<T>,
        schema_version: u32,
        codec_version: u32,
    ) -> Result<(), CortexError> {
        let name = name.into();
        let mut guard = self.entries.write().expect("component registry poisoned");
        if guard.contains_key(&name) {
            return Err(CortexError::AlreadyRegistered(name));
        }
        guard.insert(
            name,
            Entry {
                component,
                schema_version,
                codec_version,
            },
        );
        Ok(())
    }

    /// Resolves `name`, requiring it to appear in `allowed_names` (the
    /// calling morphology's own sensor or actuator list) and to match the
    /// current schema/codec version.
    pub fn resolve(&self, name: &str, allowed_names: &[String]) -> Result<Arc<T>, CortexError> {
        let guard = self.entries.read().expect("component registry poisoned");
        let entry = guard.get(name).ok_or_else(|| CortexError::NotFound(name.to_string()))?;

        if entry.schema_version != SCHEMA_VERSION || entry.codec_version != CODEC_VERSION {
            return Err(CortexError::VersionMismatch {
                name: name.to_string(),
                expected_schema: SCHEMA_VERSION,
                expected_codec: CODEC_VERSION,
                got_schema: entry.schema_version,
                got_codec: entry.codec_version,
            });
        }

        if !allowed_names.iter().any(|allowed| allowed == name) {
            return Err(CortexError::Incompatible {
                name: name.to_string(),
                scape: "<morphology>".to_string(),
            });
        }

        Ok(entry.component.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sensor::Sensor;

    struct Constant(f64);

    impl Sensor for Constant {
        fn name(&self) -> &str {
            "constant"
        }

        fn read(&self) -> Result<Vec<f64>, CortexError> {
            Ok(vec![self.0])
        }
    }

    #[test]
    fn resolves_when_listed_and_versions_match() {
        let registry: ComponentRegistry<dyn Sensor> = ComponentRegistry::new();
        registry.register("constant", Arc::new(Constant(0.5))).unwrap();

        let resolved = registry.resolve("constant", &["constant".to_string()]).unwrap();
        assert_eq!(resolved.read().unwrap(), vec![0.5]);
    }

    #[test]
    fn rejects_names_the_morphology_does_not_list() {
        let registry: ComponentRegistry<dyn Sensor> = ComponentRegistry::new();
        registry.register("constant", Arc::new(Constant(0.5))).unwrap();

        let err = match registry.resolve("constant", &["other".to_string()]) {
            Err(e) => e,
            Ok(_) => panic!("expected resolve to fail"),
        };
        assert!(matches!(err, CortexError::Incompatible { .. }));
    }

    #[test]
    fn rejects_unknown_names() {
        let registry: ComponentRegistry<dyn Sensor> = ComponentRegistry::new();
        let err = match registry.resolve("missing", &[]) {
            Err(e) => e,
            Ok(_) => panic!("expected resolve to fail"),
        };
        assert!(matches!(err, CortexError::NotFound(_)));
    }

    #[test]
    fn rejects_duplicate_registration() {
        let registry: ComponentRegistry<dyn Sensor> = ComponentRegistry::new();
        registry.register("constant", Arc::new(Constant(0.5))).unwrap();
        let err = registry.register("constant", Arc::new(Constant(0.1))).unwrap_err();
        assert!(matches!(err, CortexError::AlreadyRegistered(_)));
    }

    #[test]
    fn rejects_version_mismatch() {
        let registry: ComponentRegistry<dyn Sensor> = ComponentRegistry::new();
        registry
            .register_versioned("constant", Arc::new(Constant(0.5)), 2, 1)
            .unwrap();
        let err = match registry.resolve("constant", &["constant".to_string()]) {
            Err(e) => e,
            Ok(_) => panic!("expected resolve to fail"),
        };
        assert!(matches!(err, CortexError::VersionMismatch { .. }));
    }
}
