use crate::{Parameters, Pid};
use serde::{Deserialize, Serialize};

/// The construction surface for a [`SimpleRuntime`](../substrate index):
/// which CPP/CEP chain to wire, the fan-in topology, and the free-form
/// parameter bag. Deserializable so a runtime can be described in a config
/// file (see the `sim` crate).
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct Spec {
    pub cpp_name: String,
    pub cep_name: Option<String>,
    pub cep_names: Vec<String>,
    pub cep_fanin_pids: Vec<Pid>,
    pub cep_fanin_pids_by_cep: Vec<Vec<Pid>>,
    pub parameters: Parameters,
    pub dimensions: Vec<usize>,
}

impl Default for Spec {
    fn default() -> Self {
        Self {
            cpp_name: "set_weight".to_string(),
            cep_name: None,
            cep_names: Vec::new(),
            cep_fanin_pids: Vec::new(),
            cep_fanin_pids_by_cep: Vec::new(),
            parameters: Parameters::new(),
            dimensions: Vec::new(),
        }
    }
}

impl Spec {
    /// Resolves `cep_name`/`cep_names` into the ordered CEP chain. An empty
    /// configuration falls back to a single `delta_weight` stage.
    pub fn cep_chain(&self) -> Vec<String> {
        if !self.cep_names.is_empty() {
            return self.cep_names.clone();
        }
        if let Some(name) = &self.cep_name {
            return vec![name.clone()];
        }
        vec!["delta_weight".to_string()]
    }

    /// Resolves the global fan-in PID list. Empty configuration falls back
    /// to a single synthetic sender, `"cpp"`.
    pub fn fanin_pids(&self) -> Vec<Pid> {
        if self.cep_fanin_pids.is_empty() {
            vec![Pid::new("cpp")]
        } else {
            self.cep_fanin_pids.clone()
        }
    }

    /// Resolves the fan-in PIDs for one CEP stage in the chain: an explicit
    /// `cepFaninPIDsByCEP` override wins; otherwise `set_abcn` sees the full
    /// global fan-in list and every other reference CEP sees a single entry
    /// (the first global pid, or the synthetic `"cpp"` sender).
    pub fn fanin_pids_for(&self, cep_index: usize, cep_name: &str) -> Vec<Pid> {
        if let Some(explicit) = self
            .cep_fanin_pids_by_cep
            .get(cep_index)
            .filter(|pids| !pids.is_empty())
        {
            return explicit.clone();
        }
        let global = self.fanin_pids();
        if cep_name == "set_abcn" {
            global
        } else {
            vec![global.into_iter().next().unwrap_or_else(|| Pid::new("cpp"))]
        }
    }
}
