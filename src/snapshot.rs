//! Snapshots and the cluster cache
//!
//! ## Table of Contents
//! - **NodeSource**: Trait for cluster node accessors
//! - **StaticNodeSource**: In-memory source (tests, embedders)
//! - **ClusterCache**: Registry of per-topology caches over one source
//! - **TopologyCache**: Builds read-only snapshots for one topology spec
//! - **Snapshot**: Immutable tree over which placements are computed
//!
//! A snapshot is taken once and never mutated; any number of placements
//! may run against it concurrently. Refreshing cluster state means taking
//! a new snapshot, not patching an old one.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use tracing::info;

use crate::error::Result;
use crate::topology::assignment::find_assignment;
use crate::topology::tree::{DomainTree, ROOT};
use crate::topology::{TopologyAssignment, TopologyRequest, TopologySpec};
use crate::types::{NodeView, Resources};

/// Trait for cluster node accessors
///
/// Implementations enumerate the nodes of a cluster as immutable views.
/// The engine treats each view as a black box and never writes back.
#[async_trait]
pub trait NodeSource: Send + Sync {
    /// List the current cluster nodes
    async fn list_nodes(&self) -> Result<Vec<NodeView>>;

    /// Source name for logging
    fn name(&self) -> &str;
}

/// In-memory node source
///
/// Serves a fixed node list. Useful for tests and for embedders that
/// already hold node views from their own cluster client.
#[derive(Debug, Default)]
pub struct StaticNodeSource {
    nodes: Vec<NodeView>,
}

impl StaticNodeSource {
    /// Create a source over a fixed node list
    pub fn new(nodes: Vec<NodeView>) -> Self {
        Self { nodes }
    }
}

#[async_trait]
impl NodeSource for StaticNodeSource {
    async fn list_nodes(&self) -> Result<Vec<NodeView>> {
        Ok(self.nodes.clone())
    }

    fn name(&self) -> &str {
        "static"
    }
}

/// Registry of per-topology caches sharing one node source
///
/// Mirrors the usual cluster-cache layering: one registry per cluster
/// accessor, one [`TopologyCache`] per topology configuration.
pub struct ClusterCache {
    /// The injected cluster accessor
    source: Arc<dyn NodeSource>,
    /// Named per-topology caches
    topologies: RwLock<HashMap<String, Arc<TopologyCache>>>,
}

impl ClusterCache {
    /// Create a registry over a node source
    pub fn new(source: Arc<dyn NodeSource>) -> Self {
        Self {
            source,
            topologies: RwLock::new(HashMap::new()),
        }
    }

    /// Get or create the cache for a named topology configuration
    ///
    /// The spec is validated on first use; a later call with the same name
    /// returns the existing cache and ignores the new spec.
    pub fn topology(&self, name: &str, spec: TopologySpec) -> Result<Arc<TopologyCache>> {
        if let Some(cache) = self.topologies.read().get(name) {
            return Ok(cache.clone());
        }
        let cache = Arc::new(TopologyCache::new(self.source.clone(), spec)?);
        Ok(self
            .topologies
            .write()
            .entry(name.to_string())
            .or_insert(cache)
            .clone())
    }

    /// Names of registered topology caches
    pub fn topology_names(&self) -> Vec<String> {
        self.topologies.read().keys().cloned().collect()
    }
}

/// Builds read-only snapshots for one topology configuration
pub struct TopologyCache {
    source: Arc<dyn NodeSource>,
    spec: TopologySpec,
}

impl TopologyCache {
    /// Create a cache; the spec is validated eagerly
    pub fn new(source: Arc<dyn NodeSource>, spec: TopologySpec) -> Result<Self> {
        spec.validate()?;
        Ok(Self { source, spec })
    }

    /// The topology configuration this cache serves
    pub fn spec(&self) -> &TopologySpec {
        &self.spec
    }

    /// Take a read-only snapshot of the cluster
    ///
    /// Lists nodes via the source, silently drops inadmissible ones, and
    /// builds the aggregated domain tree. The snapshot may be empty.
    pub async fn snapshot(&self) -> Result<Snapshot> {
        let nodes = self.source.list_nodes().await?;
        let listed = nodes.len();
        let tree = DomainTree::build(&self.spec, nodes);
        info!(
            source = self.source.name(),
            listed,
            admitted = tree.host_count(),
            levels = self.spec.depth(),
            "topology snapshot built"
        );
        Ok(Snapshot {
            tree,
            taken_at: Utc::now(),
        })
    }
}

/// Immutable view of the cluster topology at one point in time
///
/// All methods take `&self`; the snapshot owns the tree and the underlying
/// node views, and placements never mutate either.
pub struct Snapshot {
    tree: DomainTree,
    taken_at: DateTime<Utc>,
}

impl Snapshot {
    /// Find a placement for `count` units of `unit` under `request`
    ///
    /// Returns `Ok(None)` when no placement satisfies the request under
    /// this snapshot. Malformed requests fail fast with an error.
    pub fn find_topology_assignment(
        &self,
        request: &TopologyRequest,
        unit: &Resources,
        count: u32,
    ) -> Result<Option<TopologyAssignment>> {
        find_assignment(&self.tree, request, unit, count)
    }

    /// Number of admitted nodes
    pub fn node_count(&self) -> usize {
        self.tree.host_count()
    }

    /// Aggregate free resources across all admitted nodes
    pub fn free_capacity(&self) -> &Resources {
        &self.tree.domain(ROOT).free
    }

    /// Whether the snapshot admitted no nodes
    pub fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }

    /// The topology level keys, coarsest first
    pub fn levels(&self) -> &[String] {
        self.tree.levels()
    }

    /// When the snapshot was taken
    pub fn taken_at(&self) -> DateTime<Utc> {
        self.taken_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topology::MAX_LEVELS;

    fn fleet() -> Vec<NodeView> {
        vec![
            NodeView::new("a1", Resources::new().with("cpu", 1_000))
                .with_label("rack", "r1")
                .with_label("host", "a1")
                .with_label("zone", "zone-a"),
            NodeView::new("a2", Resources::new().with("cpu", 2_000))
                .with_label("rack", "r1")
                .with_label("host", "a2")
                .with_label("zone", "zone-a"),
            NodeView::new("b1", Resources::new().with("cpu", 1_000))
                .with_label("rack", "r2")
                .with_label("host", "b1")
                .with_label("zone", "zone-b"),
        ]
    }

    fn rack_host_spec() -> TopologySpec {
        TopologySpec::new().with_level("rack").with_level("host")
    }

    #[tokio::test]
    async fn snapshot_over_static_source() {
        let cache = ClusterCache::new(Arc::new(StaticNodeSource::new(fleet())));
        let topology = cache.topology("default", rack_host_spec()).unwrap();
        let snapshot = topology.snapshot().await.unwrap();

        assert_eq!(snapshot.node_count(), 3);
        assert!(!snapshot.is_empty());
        assert_eq!(snapshot.levels(), ["rack", "host"]);
        assert_eq!(snapshot.free_capacity().get("cpu"), 4_000);
    }

    #[tokio::test]
    async fn placement_through_the_public_surface() {
        let cache = ClusterCache::new(Arc::new(StaticNodeSource::new(fleet())));
        let topology = cache.topology("default", rack_host_spec()).unwrap();
        let snapshot = topology.snapshot().await.unwrap();

        let unit = Resources::new().with("cpu", 1_000);
        let request = TopologyRequest::Required("rack".to_string());
        let assignment = snapshot
            .find_topology_assignment(&request, &unit, 3)
            .unwrap()
            .unwrap();

        assert_eq!(assignment.total_count(), 3);
        // r1 holds 3 one-cpu units (a1: 1, a2: 2).
        assert!(assignment
            .domains
            .iter()
            .all(|domain| domain.values[0] == "r1"));
    }

    #[tokio::test]
    async fn node_filter_restricts_the_snapshot() {
        let cache = ClusterCache::new(Arc::new(StaticNodeSource::new(fleet())));

        let filtered = cache
            .topology(
                "zone-b-only",
                rack_host_spec().with_node_filter("zone", "zone-b"),
            )
            .unwrap();
        let snapshot = filtered.snapshot().await.unwrap();
        assert_eq!(snapshot.node_count(), 1);

        let unit = Resources::new().with("cpu", 1_000);
        let request = TopologyRequest::Required("host".to_string());
        let assignment = snapshot
            .find_topology_assignment(&request, &unit, 1)
            .unwrap()
            .unwrap();
        assert_eq!(assignment.domains[0].values, ["r2", "b1"]);
    }

    #[tokio::test]
    async fn mismatched_filter_empties_the_snapshot() {
        let cache = ClusterCache::new(Arc::new(StaticNodeSource::new(fleet())));
        let topology = cache
            .topology("nowhere", rack_host_spec().with_node_filter("zone", "zone-c"))
            .unwrap();
        let snapshot = topology.snapshot().await.unwrap();

        assert!(snapshot.is_empty());
        let unit = Resources::new().with("cpu", 1_000);
        let request = TopologyRequest::Required("rack".to_string());
        assert!(snapshot
            .find_topology_assignment(&request, &unit, 1)
            .unwrap()
            .is_none());
    }

    #[test]
    fn registry_returns_the_same_cache_for_a_name() {
        let cache = ClusterCache::new(Arc::new(StaticNodeSource::default()));
        let first = cache.topology("default", rack_host_spec()).unwrap();
        let second = cache.topology("default", rack_host_spec()).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.topology_names(), ["default"]);
    }

    #[test]
    fn invalid_spec_is_rejected_eagerly() {
        let cache = ClusterCache::new(Arc::new(StaticNodeSource::default()));
        assert!(cache.topology("empty", TopologySpec::new()).is_err());

        let too_deep =
            TopologySpec::new().with_levels((0..=MAX_LEVELS).map(|i| format!("level-{i}")));
        assert!(cache.topology("deep", too_deep).is_err());
    }
}
