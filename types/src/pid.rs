use std::fmt;

/// Process identity used to address CEP actors, fan-in senders, and substrate
/// mailboxes. A thin string newtype so it can key `HashMap`s and be formatted
/// into the `"{id}_w{index}"` per-weight scoping suffix verbatim.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct Pid(String);

impl Pid {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Derives the per-weight scoped identity used to keep command envelopes
    /// disjoint across weights. `weight_index` is 0-based; the suffix is 1-based.
    pub fn scoped(&self, weight_index: usize) -> Pid {
        Pid(format!("{}_w{}", self.0, weight_index + 1))
    }
}

impl fmt::Display for Pid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Pid {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for Pid {
    fn from(value: String) -> Self {
        Self(value)
    }
}
