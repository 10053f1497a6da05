//! Core types for trellis placement
//!
//! ## Table of Contents
//! - **NodeName**: Stable identifier for cluster nodes
//! - **Resources**: Vector of named resource quantities
//! - **NodeView**: Read-only projection of a compute node

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;

/// Stable identifier for a cluster node (typically the hostname)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeName(String);

impl NodeName {
    /// Create a new node name
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Get the node name as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for NodeName {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for NodeName {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

/// Vector of named resource quantities
///
/// Quantities are non-negative integers in the resource's base unit
/// (millicores for cpu, bytes for memory). The map is ordered so that
/// serialized output is stable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resources(BTreeMap<String, u64>);

impl Resources {
    /// Create an empty resource vector
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a quantity, builder style
    pub fn with(mut self, name: impl Into<String>, quantity: u64) -> Self {
        self.0.insert(name.into(), quantity);
        self
    }

    /// Set a quantity in place
    pub fn set(&mut self, name: impl Into<String>, quantity: u64) {
        self.0.insert(name.into(), quantity);
    }

    /// Get a quantity, zero if the resource is absent
    pub fn get(&self, name: &str) -> u64 {
        self.0.get(name).copied().unwrap_or(0)
    }

    /// Check whether the vector names no resources
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate over `(name, quantity)` pairs in name order
    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.0.iter().map(|(name, quantity)| (name.as_str(), *quantity))
    }

    /// Pointwise addition of another vector into this one
    pub fn add(&mut self, other: &Resources) {
        for (name, quantity) in &other.0 {
            let entry = self.0.entry(name.clone()).or_insert(0);
            *entry = entry.saturating_add(*quantity);
        }
    }

    /// Check whether at least one quantity is positive
    pub fn has_positive(&self) -> bool {
        self.0.values().any(|quantity| *quantity > 0)
    }

    /// Number of whole units of `unit` this vector can supply
    ///
    /// Computed as the floor-min over the resources named by `unit`;
    /// resources this vector holds but `unit` does not request are ignored,
    /// and a zero quantity in `unit` imposes no constraint. Returns zero if
    /// `unit` names no positive quantity.
    pub fn units_fitting(&self, unit: &Resources) -> u64 {
        let mut fit: Option<u64> = None;
        for (name, quantity) in unit.iter() {
            if quantity == 0 {
                continue;
            }
            let supplied = self.get(name) / quantity;
            fit = Some(fit.map_or(supplied, |f| f.min(supplied)));
        }
        fit.unwrap_or(0)
    }
}

/// Read-only projection of a compute node
///
/// Carries the node's stable name, its topology label values, and its free
/// (allocatable) resource vector. Views are immutable once handed to a
/// snapshot; the engine never writes back.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeView {
    /// Stable node identifier
    pub name: NodeName,
    /// Label key-value pairs, including topology level values
    pub labels: HashMap<String, String>,
    /// Free (allocatable) resources on this node
    pub free: Resources,
}

impl NodeView {
    /// Create a new node view
    pub fn new(name: impl Into<NodeName>, free: Resources) -> Self {
        Self {
            name: name.into(),
            labels: HashMap::new(),
            free,
        }
    }

    /// Add a label, builder style
    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }

    /// Get a label value
    pub fn label(&self, key: &str) -> Option<&str> {
        self.labels.get(key).map(String::as_str)
    }

    /// Check that every `key -> value` pair of `filter` is present
    pub fn matches_labels(&self, filter: &HashMap<String, String>) -> bool {
        filter
            .iter()
            .all(|(key, value)| self.label(key) == Some(value.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resources_accessors() {
        let free = Resources::new().with("cpu", 4_000).with("memory", 1 << 30);
        assert_eq!(free.get("cpu"), 4_000);
        assert_eq!(free.get("memory"), 1 << 30);
        assert_eq!(free.get("nvidia.com/gpu"), 0);
        assert!(free.has_positive());
    }

    #[test]
    fn test_resources_add() {
        let mut total = Resources::new().with("cpu", 1_000);
        total.add(&Resources::new().with("cpu", 2_000).with("memory", 512));
        assert_eq!(total.get("cpu"), 3_000);
        assert_eq!(total.get("memory"), 512);
    }

    #[test]
    fn test_units_fitting_is_floor_min() {
        let free = Resources::new().with("cpu", 2_500).with("memory", 4_096);
        let unit = Resources::new().with("cpu", 1_000).with("memory", 1_024);
        // cpu allows 2 units, memory allows 4; cpu binds.
        assert_eq!(free.units_fitting(&unit), 2);
    }

    #[test]
    fn test_units_fitting_ignores_unrequested_resources() {
        let free = Resources::new().with("cpu", 3_000);
        let unit = Resources::new().with("cpu", 1_000).with("memory", 0);
        assert_eq!(free.units_fitting(&unit), 3);
    }

    #[test]
    fn test_units_fitting_missing_resource_is_zero() {
        let free = Resources::new().with("cpu", 3_000);
        let unit = Resources::new().with("memory", 1_024);
        assert_eq!(free.units_fitting(&unit), 0);
    }

    #[test]
    fn test_node_view_labels() {
        let node = NodeView::new("x1", Resources::new().with("cpu", 1_000))
            .with_label("zone", "zone-a")
            .with_label("rack", "r1");

        assert_eq!(node.label("zone"), Some("zone-a"));
        assert_eq!(node.label("region"), None);

        let mut filter = HashMap::new();
        filter.insert("zone".to_string(), "zone-a".to_string());
        assert!(node.matches_labels(&filter));

        filter.insert("rack".to_string(), "r2".to_string());
        assert!(!node.matches_labels(&filter));
    }
}
