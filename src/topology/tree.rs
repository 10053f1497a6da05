//! Topology domain tree
//!
//! Folds a flat list of node views into a rooted tree whose internal nodes
//! are topology domains and whose lowest level holds the admitted hosts.
//! The tree is built once per snapshot and never mutated afterwards; fit
//! counts are computed per call into a separate table so that concurrent
//! placements share the tree freely.

use tracing::debug;

use super::TopologySpec;
use crate::types::{NodeView, Resources};

/// Arena index of the synthetic root domain
pub(crate) const ROOT: usize = 0;

/// One domain in the tree
///
/// `depth` is zero for the root; a domain at depth `d` sits at level index
/// `d - 1` of the spec and its `values` path has length `d`. Only domains
/// at the lowest level reference hosts.
#[derive(Debug)]
pub(crate) struct Domain {
    pub(crate) depth: usize,
    pub(crate) values: Vec<String>,
    pub(crate) children: Vec<usize>,
    pub(crate) hosts: Vec<usize>,
    pub(crate) free: Resources,
}

impl Domain {
    fn new(depth: usize, values: Vec<String>) -> Self {
        Self {
            depth,
            values,
            children: Vec::new(),
            hosts: Vec::new(),
            free: Resources::new(),
        }
    }
}

/// Immutable topology tree over the admitted node views
///
/// Domains live in a flat arena; children always carry a larger arena index
/// than their parent, so a reverse index scan visits children before
/// parents. Hosts are indices into a flat node-view arena.
#[derive(Debug)]
pub(crate) struct DomainTree {
    levels: Vec<String>,
    domains: Vec<Domain>,
    by_depth: Vec<Vec<usize>>,
    hosts: Vec<NodeView>,
}

impl DomainTree {
    /// Build a tree from node views under the given spec
    ///
    /// Nodes missing a level label or failing the node filter are dropped
    /// silently (logged at debug). The spec must already be validated.
    pub(crate) fn build(spec: &TopologySpec, nodes: Vec<NodeView>) -> Self {
        let depth = spec.depth();
        let mut tree = Self {
            levels: spec.levels.clone(),
            domains: vec![Domain::new(0, Vec::new())],
            by_depth: vec![Vec::new(); depth + 1],
            hosts: Vec::new(),
        };
        tree.by_depth[0].push(ROOT);

        for node in nodes {
            let Some(path) = admit(&node, spec) else {
                continue;
            };
            let leaf = tree.insert_path(&path);
            let host_id = tree.hosts.len();
            tree.hosts.push(node);
            tree.domains[leaf].hosts.push(host_id);
        }

        tree.aggregate_free();
        tree
    }

    /// Walk the path from the root, creating missing domains
    fn insert_path(&mut self, path: &[String]) -> usize {
        let mut current = ROOT;
        for (i, value) in path.iter().enumerate() {
            let existing = self.domains[current]
                .children
                .iter()
                .copied()
                .find(|&child| self.domains[child].values.last() == Some(value));
            current = match existing {
                Some(child) => child,
                None => {
                    let id = self.domains.len();
                    self.domains.push(Domain::new(i + 1, path[..=i].to_vec()));
                    self.domains[current].children.push(id);
                    self.by_depth[i + 1].push(id);
                    id
                }
            };
        }
        current
    }

    /// Sum free resources bottom-up
    ///
    /// Children always follow their parent in the arena, so one reverse
    /// scan completes the aggregation.
    fn aggregate_free(&mut self) {
        for id in (0..self.domains.len()).rev() {
            let mut free = Resources::new();
            if self.domains[id].depth == self.depth() {
                for &host in &self.domains[id].hosts {
                    free.add(&self.hosts[host].free);
                }
            } else {
                for &child in &self.domains[id].children {
                    free.add(&self.domains[child].free);
                }
            }
            self.domains[id].free = free;
        }
    }

    /// Fit counts for one per-unit request, indexed by domain id
    ///
    /// A lowest-level domain fits the sum over its member hosts of whole
    /// units each host can supply; an internal domain fits the sum of its
    /// children. The internal count is never recomputed from the summed
    /// free vector, which keeps units indivisible across hosts.
    pub(crate) fn fit_counts(&self, unit: &Resources) -> Vec<u64> {
        let mut fits = vec![0u64; self.domains.len()];
        for id in (0..self.domains.len()).rev() {
            let domain = &self.domains[id];
            fits[id] = if domain.depth == self.depth() {
                domain
                    .hosts
                    .iter()
                    .map(|&host| self.hosts[host].free.units_fitting(unit))
                    .fold(0u64, u64::saturating_add)
            } else {
                domain
                    .children
                    .iter()
                    .map(|&child| fits[child])
                    .fold(0u64, u64::saturating_add)
            };
        }
        fits
    }

    pub(crate) fn levels(&self) -> &[String] {
        &self.levels
    }

    pub(crate) fn depth(&self) -> usize {
        self.levels.len()
    }

    pub(crate) fn level_index(&self, key: &str) -> Option<usize> {
        self.levels.iter().position(|level| level == key)
    }

    pub(crate) fn domain(&self, id: usize) -> &Domain {
        &self.domains[id]
    }

    /// Domain ids at a given depth (1-based; depth 0 is the root)
    pub(crate) fn domains_at_depth(&self, depth: usize) -> &[usize] {
        &self.by_depth[depth]
    }

    /// Number of admitted hosts
    pub(crate) fn host_count(&self) -> usize {
        self.hosts.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.hosts.is_empty()
    }
}

/// Resolve a node's level-value path, or reject it
fn admit(node: &NodeView, spec: &TopologySpec) -> Option<Vec<String>> {
    if !node.matches_labels(&spec.node_filter) {
        debug!(node = %node.name, "node excluded by label filter");
        return None;
    }
    let mut path = Vec::with_capacity(spec.depth());
    for level in &spec.levels {
        match node.label(level) {
            Some(value) => path.push(value.to_string()),
            None => {
                debug!(node = %node.name, %level, "node missing topology level label");
                return None;
            }
        }
    }
    Some(path)
}
