//! # Trellis
//!
//! A topology-aware placement engine for distributed workloads: given a
//! request for `N` identical units with a per-unit resource footprint,
//! trellis selects concrete host locations inside a labelled topology tree
//! (block, rack, host, ...) honouring a hard or soft containment
//! constraint while minimising topological spread.
//!
//! ## Features
//!
//! - **Topology tree**: folds node label values into a rooted domain tree
//! - **Capacity accounting**: aggregate free resources and per-unit fit
//!   counts per domain, with unit indivisibility across hosts
//! - **Required/Preferred containment**: hard single-domain placement, or
//!   soft placement that escalates one level at a time toward the root
//! - **Deterministic output**: largest-fit-first packing with
//!   lexicographic tie-breaks
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use trellis::{
//!     ClusterCache, NodeView, Resources, StaticNodeSource, TopologyRequest, TopologySpec,
//! };
//!
//! #[tokio::main]
//! async fn main() -> trellis::Result<()> {
//!     let nodes = vec![
//!         NodeView::new("a1", Resources::new().with("cpu", 4_000))
//!             .with_label("topology/rack", "r1")
//!             .with_label("kubernetes.io/hostname", "a1"),
//!     ];
//!     let cache = ClusterCache::new(Arc::new(StaticNodeSource::new(nodes)));
//!     let topology = cache.topology(
//!         "default",
//!         TopologySpec::new()
//!             .with_level("topology/rack")
//!             .with_level("kubernetes.io/hostname"),
//!     )?;
//!
//!     let snapshot = topology.snapshot().await?;
//!     let unit = Resources::new().with("cpu", 1_000);
//!     let request = TopologyRequest::Preferred("topology/rack".to_string());
//!     if let Some(assignment) = snapshot.find_topology_assignment(&request, &unit, 3)? {
//!         for domain in &assignment.domains {
//!             println!("{} -> {} units", domain.values.join("/"), domain.count);
//!         }
//!     }
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod error;
pub mod snapshot;
pub mod topology;
pub mod types;

// Re-exports for ergonomic API
pub use error::{Result, TrellisError};
pub use snapshot::{ClusterCache, NodeSource, Snapshot, StaticNodeSource, TopologyCache};
pub use topology::{
    DomainAssignment, TopologyAssignment, TopologyRequest, TopologySpec, MAX_LEVELS,
};
pub use types::{NodeName, NodeView, Resources};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::error::Result;
    pub use crate::snapshot::{ClusterCache, NodeSource, Snapshot, StaticNodeSource};
    pub use crate::topology::{TopologyAssignment, TopologyRequest, TopologySpec};
    pub use crate::types::{NodeView, Resources};
}
