//! Name-keyed plug-in registries for CPPs and CEPs, and the default
//! components registered in one place (mirroring the "global plug-in
//! registry via package-init side effects" source pattern, reproduced here
//! as an explicit, result-returning registry rather than panic-on-conflict
//! side effects).

use crate::kernels::mean;
use protogonos_types::{Parameters, SubstrateError};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// Coordinate-Preprocessor: computes a control signal from raw inputs.
/// Stateless per step; constructed by the registry's factory.
pub trait Cpp: Send + Sync {
    fn name(&self) -> &str;

    /// Scalar reduction used as the fallback control signal.
    fn compute(&self, inputs: &[f64], params: &Parameters) -> f64;

    /// Vector-valued control signal, for CPPs that can produce one. `None`
    /// means this CPP is scalar-only; `SimpleRuntime::step` treats that the
    /// same as an empty vector output.
    fn compute_vector(&self, _inputs: &[f64], _params: &Parameters) -> Option<Vec<f64>> {
        None
    }
}

/// Coordinate-Postprocessor escape hatch: a custom CEP not part of the
/// reference command surface (`set_weight`/`set_iterative`/`set_abcn`).
/// Stateless per step.
pub trait Cep: Send + Sync {
    fn name(&self) -> &str;
    fn apply(&self, current: f64, delta: f64, params: &Parameters) -> f64;
}

struct SetWeightCpp;

impl Cpp for SetWeightCpp {
    fn name(&self) -> &str {
        "set_weight"
    }

    fn compute(&self, inputs: &[f64], _params: &Parameters) -> f64 {
        mean(inputs)
    }
}

/// A CPP that passes its inputs through unchanged as a vector, falling back
/// to their mean as a scalar. Useful for wiring multi-dimensional fan-in
/// directly from the CPP stage instead of relying on the input-as-fan-in
/// fallback.
struct IdentityVectorCpp;

impl Cpp for IdentityVectorCpp {
    fn name(&self) -> &str {
        "identity_vector"
    }

    fn compute(&self, inputs: &[f64], _params: &Parameters) -> f64 {
        mean(inputs)
    }

    fn compute_vector(&self, inputs: &[f64], _params: &Parameters) -> Option<Vec<f64>> {
        Some(inputs.to_vec())
    }
}

/// A registry of named CPP factories/instances, guarded by a reader-writer
/// lock: reads (the common case, one per step) never block each other;
/// writes only happen at registration time.
pub struct CppRegistry {
    inner: RwLock<HashMap<String, Arc<dyn Cpp>>>,
}

impl CppRegistry {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(HashMap::new()),
        }
    }

    /// A registry pre-populated with the built-in CPPs.
    pub fn with_defaults() -> Self {
        let registry = Self::new();
        registry
            .register(Arc::new(SetWeightCpp))
            .expect("default cpp registers exactly once");
        registry
            .register(Arc::new(IdentityVectorCpp))
            .expect("default cpp registers exactly once");
        registry
    }

    pub fn register(&self, cpp: Arc<dyn Cpp>) -> Result<(), SubstrateError> {
        let name = cpp.name().to_string();
        let mut guard = self.inner.write().expect("cpp registry lock poisoned");
        if guard.contains_key(&name) {
            return Err(SubstrateError::AlreadyRegistered { kind: "cpp", name });
        }
        guard.insert(name, cpp);
        Ok(())
    }

    pub fn resolve(&self, name: &str) -> Result<Arc<dyn Cpp>, SubstrateError> {
        self.inner
            .read()
            .expect("cpp registry lock poisoned")
            .get(name)
            .cloned()
            .ok_or_else(|| SubstrateError::UnknownComponent {
                kind: "cpp",
                name: name.to_string(),
            })
    }
}

impl Default for CppRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

/// A registry of named custom CEPs (the escape hatch for CEP names outside
/// the reference surface). Empty by default: the reference CEPs
/// (`set_weight`, `delta_weight`/`set_iterative`, `set_abcn`) are handled
/// directly by the command builder/applier and are never registered here.
pub struct CepRegistry {
    inner: RwLock<HashMap<String, Arc<dyn Cep>>>,
}

impl CepRegistry {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(HashMap::new()),
        }
    }

    pub fn register(&self, cep: Arc<dyn Cep>) -> Result<(), SubstrateError> {
        let name = cep.name().to_string();
        let mut guard = self.inner.write().expect("cep registry lock poisoned");
        if guard.contains_key(&name) {
            return Err(SubstrateError::AlreadyRegistered { kind: "cep", name });
        }
        guard.insert(name, cep);
        Ok(())
    }

    pub fn resolve(&self, name: &str) -> Result<Arc<dyn Cep>, SubstrateError> {
        self.inner
            .read()
            .expect("cep registry lock poisoned")
            .get(name)
            .cloned()
            .ok_or_else(|| SubstrateError::UnknownComponent {
                kind: "cep",
                name: name.to_string(),
            })
    }
}

impl Default for CepRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_set_weight_cpp_computes_mean() {
        let registry = CppRegistry::with_defaults();
        let cpp = registry.resolve("set_weight").unwrap();
        assert_eq!(cpp.compute(&[1.0, 3.0], &Parameters::new()), 2.0);
    }

    #[test]
    fn duplicate_registration_fails() {
        let registry = CppRegistry::new();
        registry.register(Arc::new(SetWeightCpp)).unwrap();
        let err = registry.register(Arc::new(SetWeightCpp)).unwrap_err();
        assert!(matches!(err, SubstrateError::AlreadyRegistered { .. }));
    }

    #[test]
    fn missing_name_fails() {
        let registry = CppRegistry::new();
        let err = match registry.resolve("nope") {
            Err(e) => e,
            Ok(_) => panic!("expected resolve to fail"),
        };
        assert!(matches!(err, SubstrateError::UnknownComponent { .. }));
    }
}
