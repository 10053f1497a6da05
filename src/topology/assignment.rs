//! The assignment engine
//!
//! A constrained top-down descent over the domain tree. Objectives, in
//! priority order: feasibility, finest single-domain containment level,
//! fewest domains at the chosen level, fewest sub-domains recursively.
//!
//! The engine is a pure function over an immutable tree: fit counts are a
//! per-call table, no domain is mutated, and concurrent calls over one
//! snapshot are safe.

use tracing::debug;

use super::tree::{DomainTree, ROOT};
use super::{DomainAssignment, TopologyAssignment, TopologyRequest};
use crate::error::{Result, TrellisError};
use crate::types::Resources;

/// Find a placement for `count` units of `unit` under `request`
///
/// Returns `Ok(None)` when no placement satisfies the request; malformed
/// inputs fail fast with an error. Output is all-or-nothing.
pub(crate) fn find_assignment(
    tree: &DomainTree,
    request: &TopologyRequest,
    unit: &Resources,
    count: u32,
) -> Result<Option<TopologyAssignment>> {
    if count == 0 {
        return Err(TrellisError::request("unit count must be at least 1"));
    }
    if !unit.has_positive() {
        return Err(TrellisError::request(
            "per-unit request must name at least one positive quantity",
        ));
    }
    let level_index = tree.level_index(request.level()).ok_or_else(|| {
        TrellisError::request(format!(
            "level {:?} is not part of the topology",
            request.level()
        ))
    })?;

    let fits = tree.fit_counts(unit);
    let need = u64::from(count);

    // The containment depth is fixed for required requests; preferred
    // requests scan from the requested level toward the root and fall back
    // to the synthetic root, allowing a split across top-level domains.
    let containment = match request {
        TopologyRequest::Required(_) => {
            best_domain(tree, &fits, level_index + 1).filter(|&domain| fits[domain] >= need)
        }
        TopologyRequest::Preferred(_) => (1..=level_index + 1)
            .rev()
            .find_map(|depth| best_domain(tree, &fits, depth).filter(|&domain| fits[domain] >= need))
            .or_else(|| (fits[ROOT] >= need).then_some(ROOT)),
    };

    let Some(start) = containment else {
        debug!(%request, count, "no feasible containment domain");
        return Ok(None);
    };
    debug!(
        %request,
        count,
        domain = tree.domain(start).values.join("/"),
        "containment domain selected"
    );

    let mut picked: Vec<(Vec<String>, u32)> = Vec::new();
    descend(tree, &fits, start, count, &mut picked);

    picked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    Ok(Some(TopologyAssignment {
        levels: tree.levels().to_vec(),
        domains: picked
            .into_iter()
            .map(|(values, count)| DomainAssignment { values, count })
            .collect(),
    }))
}

/// The most capacious domain at a depth, smaller path winning ties
fn best_domain(tree: &DomainTree, fits: &[u64], depth: usize) -> Option<usize> {
    tree.domains_at_depth(depth)
        .iter()
        .copied()
        .max_by(|&a, &b| {
            fits[a]
                .cmp(&fits[b])
                .then_with(|| tree.domain(b).values.cmp(&tree.domain(a).values))
        })
}

/// Distribute `need` units below `id`, recording lowest-level domains
///
/// At each level the children are ordered by fit descending (path ascending
/// on ties) and the minimal prefix covering the remaining count is taken.
/// The caller guarantees `fits[id] >= need`, so the greedy walk always
/// terminates with nothing left over.
fn descend(
    tree: &DomainTree,
    fits: &[u64],
    id: usize,
    need: u32,
    out: &mut Vec<(Vec<String>, u32)>,
) {
    let domain = tree.domain(id);
    if domain.depth == tree.depth() {
        out.push((domain.values.clone(), need));
        return;
    }

    let mut children = domain.children.clone();
    children.sort_by(|&a, &b| {
        fits[b]
            .cmp(&fits[a])
            .then_with(|| tree.domain(a).values.cmp(&tree.domain(b).values))
    });

    let mut remaining = need;
    for child in children {
        if remaining == 0 {
            break;
        }
        let take = u64::from(remaining).min(fits[child]) as u32;
        if take == 0 {
            break;
        }
        descend(tree, fits, child, take, out);
        remaining -= take;
    }
    debug_assert_eq!(remaining, 0, "containment domain must cover the request");
}
