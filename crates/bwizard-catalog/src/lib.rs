//! Cluster catalog for bwizard.
//!
//! Read-only tables of node types, GPU types and queues, plus the
//! cluster-wide policy values the validation engine checks against.
//! The catalog is built once per process and passed by reference to every
//! engine function.

pub mod catalog;
pub mod reference;
pub mod types;

pub use catalog::{CatalogError, CatalogTables, ClusterCatalog};
pub use types::{ClusterPolicy, GpuType, JobKind, NodeType, QueueDefinition, UnknownJobKind};
