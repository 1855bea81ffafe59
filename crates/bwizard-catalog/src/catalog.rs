//! Catalog lookups.

use crate::types::{ClusterPolicy, GpuType, JobKind, NodeType, QueueDefinition};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CatalogError {
    #[error("Unknown queue: {0}")]
    UnknownQueue(String),
    #[error("Unknown GPU type: {0}")]
    UnknownGpuType(String),
    #[error("Duplicate {table} entry: {id}")]
    Duplicate { table: &'static str, id: String },
    #[error("Queue {queue} references unknown {table} entry {id}")]
    DanglingReference {
        queue: String,
        table: &'static str,
        id: String,
    },
}

/// Raw catalog tables, as produced by a catalog loader.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogTables {
    #[serde(default)]
    pub node_types: Vec<NodeType>,
    #[serde(default)]
    pub gpu_types: Vec<GpuType>,
    #[serde(default)]
    pub queues: Vec<QueueDefinition>,
    #[serde(default)]
    pub policy: ClusterPolicy,
}

/// Immutable, cross-checked cluster catalog.
///
/// Lookups on unknown identifiers return `None`; the `require_*` variants
/// turn that into a [`CatalogError`] for callers that must not continue.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "CatalogTables", into = "CatalogTables")]
pub struct ClusterCatalog {
    node_types: Vec<NodeType>,
    gpu_types: Vec<GpuType>,
    queues: Vec<QueueDefinition>,
    policy: ClusterPolicy,
}

impl TryFrom<CatalogTables> for ClusterCatalog {
    type Error = CatalogError;

    fn try_from(tables: CatalogTables) -> Result<Self, Self::Error> {
        Self::new(tables.node_types, tables.gpu_types, tables.queues, tables.policy)
    }
}

impl From<ClusterCatalog> for CatalogTables {
    fn from(catalog: ClusterCatalog) -> Self {
        Self {
            node_types: catalog.node_types,
            gpu_types: catalog.gpu_types,
            queues: catalog.queues,
            policy: catalog.policy,
        }
    }
}

/// Fail on the first identifier seen twice.
fn check_unique<'a>(
    table: &'static str,
    ids: impl Iterator<Item = &'a str>,
) -> Result<(), CatalogError> {
    let mut seen = HashSet::new();
    for id in ids {
        if !seen.insert(id) {
            return Err(CatalogError::Duplicate {
                table,
                id: id.to_string(),
            });
        }
    }
    Ok(())
}

impl ClusterCatalog {
    /// Build a catalog, rejecting duplicate ids and queue references to
    /// node or GPU types that do not exist.
    pub fn new(
        node_types: Vec<NodeType>,
        gpu_types: Vec<GpuType>,
        queues: Vec<QueueDefinition>,
        policy: ClusterPolicy,
    ) -> Result<Self, CatalogError> {
        check_unique("node type", node_types.iter().map(|n| n.id.as_str()))?;
        check_unique("GPU type", gpu_types.iter().map(|g| g.id.as_str()))?;
        check_unique("queue", queues.iter().map(|q| q.name.as_str()))?;

        for queue in &queues {
            if let Some(id) = queue
                .node_types
                .iter()
                .find(|id| !node_types.iter().any(|n| &n.id == *id))
            {
                return Err(CatalogError::DanglingReference {
                    queue: queue.name.clone(),
                    table: "node type",
                    id: id.clone(),
                });
            }
            if let Some(id) = queue
                .gpu_types
                .iter()
                .find(|id| !gpu_types.iter().any(|g| &g.id == *id))
            {
                return Err(CatalogError::DanglingReference {
                    queue: queue.name.clone(),
                    table: "GPU type",
                    id: id.clone(),
                });
            }
        }

        Ok(Self {
            node_types,
            gpu_types,
            queues,
            policy,
        })
    }

    pub fn node_type(&self, id: &str) -> Option<&NodeType> {
        self.node_types.iter().find(|n| n.id == id)
    }

    pub fn gpu_type(&self, id: &str) -> Option<&GpuType> {
        self.gpu_types.iter().find(|g| g.id == id)
    }

    pub fn queue(&self, name: &str) -> Option<&QueueDefinition> {
        self.queues.iter().find(|q| q.name == name)
    }

    pub fn require_gpu_type(&self, id: &str) -> Result<&GpuType, CatalogError> {
        self.gpu_type(id)
            .ok_or_else(|| CatalogError::UnknownGpuType(id.to_string()))
    }

    pub fn require_queue(&self, name: &str) -> Result<&QueueDefinition, CatalogError> {
        self.queue(name)
            .ok_or_else(|| CatalogError::UnknownQueue(name.to_string()))
    }

    pub fn node_types(&self) -> &[NodeType] {
        &self.node_types
    }

    pub fn gpu_types(&self) -> &[GpuType] {
        &self.gpu_types
    }

    pub fn queues(&self) -> &[QueueDefinition] {
        &self.queues
    }

    pub fn policy(&self) -> &ClusterPolicy {
        &self.policy
    }

    /// Queues accepting the given kind, in catalog order.
    pub fn queues_for_kind(&self, kind: JobKind) -> Vec<&QueueDefinition> {
        self.queues.iter().filter(|q| q.accepts(kind)).collect()
    }

    /// GPU types a queue offers. Empty for unknown or CPU-only queues.
    pub fn gpu_types_compatible_with(&self, queue_name: &str) -> Vec<&GpuType> {
        self.queue(queue_name)
            .map(|q| {
                q.gpu_types
                    .iter()
                    .filter_map(|id| self.gpu_type(id))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Node types a job in `queue` may land on. With no queue (or a queue
    /// that lists none) every node type is assignable.
    pub fn assignable_node_types(&self, queue: Option<&QueueDefinition>) -> Vec<&NodeType> {
        match queue {
            Some(q) if !q.node_types.is_empty() => q
                .node_types
                .iter()
                .filter_map(|id| self.node_type(id))
                .collect(),
            _ => self.node_types.iter().collect(),
        }
    }

    /// Largest slot count a single job can request in `queue`: the biggest
    /// assignable node, further capped by the queue's per-job limit.
    pub fn slot_ceiling(&self, queue: Option<&QueueDefinition>) -> Option<u32> {
        let node_max = self
            .assignable_node_types(queue)
            .iter()
            .map(|n| n.cores)
            .max();
        match (node_max, queue.and_then(|q| q.max_slots_per_job)) {
            (Some(cores), Some(cap)) => Some(cores.min(cap)),
            (Some(cores), None) => Some(cores),
            (None, cap) => cap,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(id: &str, cores: u32) -> NodeType {
        NodeType {
            id: id.to_string(),
            cpu_model: String::new(),
            cores,
            memory_gb: 256,
            node_count: 1,
            features: vec![],
        }
    }

    fn queue(name: &str, kinds: &[JobKind], nodes: &[&str]) -> QueueDefinition {
        QueueDefinition {
            name: name.to_string(),
            description: String::new(),
            allowed_kinds: kinds.to_vec(),
            default_runtime: None,
            max_runtime: None,
            max_slots_per_job: None,
            node_types: nodes.iter().map(|s| s.to_string()).collect(),
            gpu_types: vec![],
            application_profiles: vec![],
            cost_notes: String::new(),
        }
    }

    #[test]
    fn test_lookup_unknown_returns_none() {
        let catalog = ClusterCatalog::reference();
        assert!(catalog.queue("nope").is_none());
        assert!(catalog.gpu_type("nope").is_none());
        assert!(matches!(
            catalog.require_queue("nope"),
            Err(CatalogError::UnknownQueue(_))
        ));
    }

    #[test]
    fn test_duplicate_rejected() {
        let result = ClusterCatalog::new(
            vec![node("a", 8), node("a", 16)],
            vec![],
            vec![],
            ClusterPolicy::default(),
        );
        assert!(matches!(result, Err(CatalogError::Duplicate { .. })));
    }

    #[test]
    fn test_dangling_node_reference_rejected() {
        let result = ClusterCatalog::new(
            vec![node("a", 8)],
            vec![],
            vec![queue("q", &[JobKind::Cpu], &["b"])],
            ClusterPolicy::default(),
        );
        assert!(matches!(result, Err(CatalogError::DanglingReference { .. })));
    }

    #[test]
    fn test_slot_ceiling() {
        let mut capped = queue("capped", &[JobKind::Cpu], &["big"]);
        capped.max_slots_per_job = Some(24);
        let catalog = ClusterCatalog::new(
            vec![node("small", 16), node("big", 64)],
            vec![],
            vec![queue("smallq", &[JobKind::Cpu], &["small"]), capped],
            ClusterPolicy::default(),
        )
        .unwrap();

        assert_eq!(catalog.slot_ceiling(catalog.queue("smallq")), Some(16));
        assert_eq!(catalog.slot_ceiling(catalog.queue("capped")), Some(24));
        assert_eq!(catalog.slot_ceiling(None), Some(64));
    }

    #[test]
    fn test_queues_for_kind_keeps_order() {
        let catalog = ClusterCatalog::reference();
        let names: Vec<&str> = catalog
            .queues_for_kind(JobKind::Cpu)
            .iter()
            .map(|q| q.name.as_str())
            .collect();
        assert_eq!(names, vec!["interactive", "local", "short"]);
        let interactive: Vec<&str> = catalog
            .queues_for_kind(JobKind::Interactive)
            .iter()
            .map(|q| q.name.as_str())
            .collect();
        assert_eq!(interactive, vec!["interactive"]);
    }

    #[test]
    fn test_gpu_types_compatible_with() {
        let catalog = ClusterCatalog::reference();
        let ids: Vec<&str> = catalog
            .gpu_types_compatible_with("gpu_short")
            .iter()
            .map(|g| g.id.as_str())
            .collect();
        assert_eq!(ids, vec!["t4", "l4", "a100"]);
        assert!(catalog.gpu_types_compatible_with("local").is_empty());
        assert!(catalog.gpu_types_compatible_with("missing").is_empty());
    }

    #[test]
    fn test_catalog_json_round_trip() {
        let catalog = ClusterCatalog::reference();
        let json = serde_json::to_string(&catalog).unwrap();
        let back: ClusterCatalog = serde_json::from_str(&json).unwrap();
        assert_eq!(back.queues(), catalog.queues());
        assert_eq!(back.policy(), catalog.policy());
    }
}
