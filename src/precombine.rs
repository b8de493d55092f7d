use tracing::trace;

use crate::bitmask::{EMPTY, Mask};
use crate::collapse::CollapsedGroup;

/// Replace a collapsed group by the OR-unions of all unordered
/// `multiplicity`-subsets of pairwise-disjoint masks from the group.
///
/// The unordered subset is the canonical representative of the multiplicity
/// identical slots the group stands for; it is what keeps the downstream
/// search from counting permutations of indistinguishable choices. A
/// multiplicity larger than the group itself yields no unions at all, which
/// makes the whole problem infeasible.
pub fn precombine(group: &CollapsedGroup) -> Vec<Mask> {
    if group.multiplicity == 1 {
        return group.masks.clone();
    }
    if group.multiplicity as usize > group.masks.len() {
        return Vec::new();
    }

    let mut unions = Vec::new();
    combine_rec(&group.masks, group.multiplicity, 0, EMPTY, &mut unions);
    trace!(
        masks = group.masks.len(),
        multiplicity = group.multiplicity,
        unions = unions.len(),
        "precombined group"
    );
    unions
}

/// Strictly-increasing index walk: each level picks a mask at an index after
/// the previous pick, so every subset is visited exactly once.
fn combine_rec(masks: &[Mask], remaining: u32, start: usize, current: Mask, out: &mut Vec<Mask>) {
    if remaining == 0 {
        out.push(current);
        return;
    }
    for idx in start..masks.len() {
        let mask = masks[idx];
        if current.disjoint(mask) {
            combine_rec(masks, remaining - 1, idx + 1, current | mask, out);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collapsed(masks: &[u128], multiplicity: u32) -> CollapsedGroup {
        CollapsedGroup {
            masks: masks.iter().map(|&m| Mask::from_u128(m)).collect(),
            multiplicity,
        }
    }

    #[test]
    fn test_multiplicity_one_is_a_copy() {
        let group = collapsed(&[0b01, 0b10, 0b11], 1);
        assert_eq!(precombine(&group), group.masks);
    }

    #[test]
    fn test_pairs_of_disjoint_singles() {
        // four single-bit masks, multiplicity 2: all C(4,2) = 6 pairs survive
        let group = collapsed(&[0b0001, 0b0010, 0b0100, 0b1000], 2);
        let unions = precombine(&group);
        assert_eq!(unions.len(), 6);
        assert!(unions.iter().all(|u| u.popcnt() == 2));
        // strictly-increasing index discipline: no union may repeat
        let mut seen = unions.clone();
        seen.sort_unstable();
        seen.dedup();
        assert_eq!(seen.len(), 6);
    }

    #[test]
    fn test_overlapping_pairs_are_pruned() {
        let group = collapsed(&[0b011, 0b010, 0b100], 2);
        let unions = precombine(&group);
        // 0b011 & 0b010 overlap; the other two pairs are disjoint
        assert_eq!(unions.len(), 2);
        assert!(unions.contains(&Mask::from_u128(0b111)));
        assert!(unions.contains(&Mask::from_u128(0b110)));
    }

    #[test]
    fn test_multiplicity_exceeding_group_is_infeasible() {
        let group = collapsed(&[0b01, 0b10], 3);
        assert!(precombine(&group).is_empty());
    }

    #[test]
    fn test_triple_union() {
        let group = collapsed(&[0b0001, 0b0010, 0b0100, 0b1001], 3);
        let unions = precombine(&group);
        // {0,1,2} and {1,2,3}; {0,1,3} and {0,2,3} clash on bit 0
        assert_eq!(unions.len(), 2);
        assert!(unions.contains(&Mask::from_u128(0b0111)));
        assert!(unions.contains(&Mask::from_u128(0b1111)));
    }

    #[test]
    fn test_wide_masks() {
        let a = Mask::bit(10);
        let b = Mask::bit(90);
        let c = Mask::bit(100);
        let group = CollapsedGroup { masks: vec![a, b, c], multiplicity: 2 };
        let unions = precombine(&group);
        assert_eq!(unions.len(), 3);
        assert!(unions.contains(&(b | c)));
    }
}
