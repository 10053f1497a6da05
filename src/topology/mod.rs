//! Topology-aware placement for workload units
//!
//! A full placement core comparable to the topology-aware scheduling found
//! in cluster managers, with:
//! - A multi-level topology tree folded from node label values
//! - Aggregate capacity and per-unit fit accounting per domain
//! - Hard ("required") and soft ("preferred") containment constraints
//! - Spread minimisation from the containment level down to hosts

pub(crate) mod assignment;
pub(crate) mod tree;

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Result, TrellisError};

/// Maximum number of topology levels a spec may declare
pub const MAX_LEVELS: usize = 8;

/// Topology configuration: ordered level keys plus an optional node filter
///
/// Levels are label keys ordered from coarsest to finest; the last level
/// denotes the host tier. The node filter, when non-empty, restricts the
/// snapshot to nodes carrying every listed `key -> value` pair.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TopologySpec {
    /// Ordered topology level keys, coarsest first
    pub levels: Vec<String>,
    /// Labels a node must carry to be admitted
    pub node_filter: HashMap<String, String>,
}

impl TopologySpec {
    /// Create an empty spec; add levels before use
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a topology level, builder style
    pub fn with_level(mut self, key: impl Into<String>) -> Self {
        self.levels.push(key.into());
        self
    }

    /// Append several topology levels at once
    pub fn with_levels<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.levels.extend(keys.into_iter().map(Into::into));
        self
    }

    /// Require a node label, builder style
    pub fn with_node_filter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.node_filter.insert(key.into(), value.into());
        self
    }

    /// Number of topology levels
    pub fn depth(&self) -> usize {
        self.levels.len()
    }

    /// Position of a level key within the spec
    pub fn level_index(&self, key: &str) -> Option<usize> {
        self.levels.iter().position(|level| level == key)
    }

    /// Validate the spec eagerly
    ///
    /// A spec must name between one and [`MAX_LEVELS`] levels, with no
    /// duplicate keys.
    pub fn validate(&self) -> Result<()> {
        if self.levels.is_empty() {
            return Err(TrellisError::config("topology requires at least one level"));
        }
        if self.levels.len() > MAX_LEVELS {
            return Err(TrellisError::config(format!(
                "topology declares {} levels, maximum is {}",
                self.levels.len(),
                MAX_LEVELS
            )));
        }
        for (i, level) in self.levels.iter().enumerate() {
            if self.levels[..i].contains(level) {
                return Err(TrellisError::config(format!(
                    "duplicate topology level {level:?}"
                )));
            }
        }
        Ok(())
    }
}

/// Containment constraint for a placement
///
/// Exactly one of the two modes applies; there is no mixed mode. Both name
/// a level key from the topology spec.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TopologyRequest {
    /// The entire placement must fit inside a single domain at this level
    Required(String),
    /// Fit inside a single domain at this level if possible, else escalate
    /// one level at a time toward the root
    Preferred(String),
}

impl TopologyRequest {
    /// The level key this request names
    pub fn level(&self) -> &str {
        match self {
            Self::Required(level) | Self::Preferred(level) => level,
        }
    }

    /// Whether the containment constraint is hard
    pub fn is_required(&self) -> bool {
        matches!(self, Self::Required(_))
    }
}

impl fmt::Display for TopologyRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Required(level) => write!(f, "required({level})"),
            Self::Preferred(level) => write!(f, "preferred({level})"),
        }
    }
}

/// One selected domain and the number of units it hosts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainAssignment {
    /// Full label-value path from the root, one entry per topology level
    pub values: Vec<String>,
    /// Units placed in this domain
    pub count: u32,
}

/// A complete placement for a unit-count request
///
/// `levels` echoes the topology spec's level keys; every domain path has
/// exactly that length. Counts sum to the requested unit count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopologyAssignment {
    /// The topology level keys, as configured
    pub levels: Vec<String>,
    /// Selected domains, largest count first
    pub domains: Vec<DomainAssignment>,
}

impl TopologyAssignment {
    /// Total units placed across all domains
    pub fn total_count(&self) -> u32 {
        self.domains.iter().map(|domain| domain.count).sum()
    }
}
