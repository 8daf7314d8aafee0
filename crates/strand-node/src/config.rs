use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use strand_aggregate::AggregateConfig;
use strand_dag::DagConfig;

use crate::error::{NodeError, NodeResult};

/// Node settings, usually read from a TOML file.
///
/// ```toml
/// store_path = "/var/lib/strand/graph.snapshot"
/// log_filter = "strand=debug"
///
/// [dag]
/// sync_timeout_ms = 10000
///
/// [aggregate]
/// on_mutation_error = "skip"
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    pub dag: DagConfig,
    pub aggregate: AggregateConfig,
    /// Snapshot file for the graph store. `None` keeps everything in memory.
    pub store_path: Option<PathBuf>,
    /// Filter for [`crate::init_tracing`].
    pub log_filter: String,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            dag: DagConfig::default(),
            aggregate: AggregateConfig::default(),
            store_path: None,
            log_filter: "info".into(),
        }
    }
}

impl NodeConfig {
    pub fn from_toml_str(s: &str) -> NodeResult<Self> {
        toml::from_str(s).map_err(|e| NodeError::Config(e.to_string()))
    }

    pub fn load(path: &Path) -> NodeResult<Self> {
        Self::from_toml_str(&std::fs::read_to_string(path)?)
    }

    pub fn to_toml_string(&self) -> NodeResult<String> {
        toml::to_string(self).map_err(|e| NodeError::Config(e.to_string()))
    }
}
