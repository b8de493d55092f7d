use std::collections::HashMap;

use tracing::debug;

use crate::bitmask::Mask;

/// A class of identical groups: the canonical (sorted) mask sequence and how
/// many times that group appeared in the problem.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CollapsedGroup {
    pub masks: Vec<Mask>,
    pub multiplicity: u32,
}

/// Partition groups into classes of identical mask multisets.
///
/// Two groups belong to the same class iff their sorted mask sequences are
/// equal. Positional order within the problem is lost here; downstream stages
/// do not rely on it. With `symmetry` off, every group stays its own class
/// with multiplicity 1.
pub fn collapse_groups(groups: &[Vec<Mask>], symmetry: bool) -> Vec<CollapsedGroup> {
    if !symmetry {
        return groups
            .iter()
            .map(|group| CollapsedGroup { masks: group.clone(), multiplicity: 1 })
            .collect();
    }

    let mut classes: Vec<CollapsedGroup> = Vec::new();
    let mut seen: HashMap<Vec<Mask>, usize> = HashMap::new();

    for group in groups {
        let mut canonical = group.clone();
        canonical.sort_unstable();

        match seen.get(&canonical) {
            Some(&at) => classes[at].multiplicity += 1,
            None => {
                seen.insert(canonical.clone(), classes.len());
                classes.push(CollapsedGroup { masks: canonical, multiplicity: 1 });
            }
        }
    }

    debug!(groups = groups.len(), classes = classes.len(), "collapsed duplicate groups");
    classes
}
