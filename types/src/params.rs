use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A free-form parameter bag consumed by the numeric kernels (`scale`, and
/// the ABCN coefficients `A`/`B`/`C`/`N`). Keys are matched case-insensitively
/// and are stored lower-cased internally so `A` and `a` resolve identically.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct Parameters(HashMap<String, f64>);

impl Parameters {
    pub fn new() -> Self {
        Self(HashMap::new())
    }

    pub fn from_map(map: HashMap<String, f64>) -> Self {
        let mut out = HashMap::with_capacity(map.len());
        for (k, v) in map {
            out.insert(k.to_lowercase(), v);
        }
        Self(out)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: f64) {
        self.0.insert(key.into().to_lowercase(), value);
    }

    pub fn with(mut self, key: impl Into<String>, value: f64) -> Self {
        self.insert(key, value);
        self
    }

    pub fn get(&self, key: &str) -> Option<f64> {
        self.0.get(&key.to_lowercase()).copied()
    }

    /// Looks up the first alias present, for keys with multiple accepted
    /// spellings (e.g. `"a"` vs `"abcn_a"`).
    pub fn get_any(&self, aliases: &[&str]) -> Option<f64> {
        aliases.iter().find_map(|alias| self.get(alias))
    }

    pub fn scale(&self) -> Option<f64> {
        self.get("scale")
    }

    /// Reads the ABCN coefficients. Present iff all four of A, B, C, N are
    /// found under either their single-letter or `abcn_`-prefixed alias.
    pub fn abcn(&self) -> Option<(f64, f64, f64, f64)> {
        let a = self.get_any(&["a", "abcn_a"])?;
        let b = self.get_any(&["b", "abcn_b"])?;
        let c = self.get_any(&["c", "abcn_c"])?;
        let n = self.get_any(&["n", "abcn_n"])?;
        Some((a, b, c, n))
    }

    /// Returns a copy with the ABCN coefficients overridden (used when a
    /// `set_abcn` command carries its own coefficients in the signal).
    pub fn with_abcn(&self, a: f64, b: f64, c: f64, n: f64) -> Self {
        let mut next = self.clone();
        next.insert("a", a);
        next.insert("b", b);
        next.insert("c", c);
        next.insert("n", n);
        next
    }
}
