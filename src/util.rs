//! Small cartesian-product helper shared by the derivation resolver and
//! the crossing lowerer — both need to enumerate combinations of
//! per-slot choices in a fixed, declaration-order-derived sequence.

/// The cartesian product of `slots`, enumerated with the first slot
/// varying slowest and the last varying fastest (standard odometer
/// order), matching `spec.md` §4.6's "lexicographic over factors in
/// declared order".
pub fn cartesian_product<T: Clone>(slots: &[Vec<T>]) -> Vec<Vec<T>> {
    let mut result: Vec<Vec<T>> = vec![Vec::new()];
    for slot in slots {
        let mut next = Vec::with_capacity(result.len() * slot.len().max(1));
        for prefix in &result {
            for item in slot {
                let mut combo = prefix.clone();
                combo.push(item.clone());
                next.push(combo);
            }
        }
        result = next;
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn product_of_two_slots_enumerates_in_odometer_order() {
        let slots = vec![vec![0, 1], vec![10, 20]];
        let combos = cartesian_product(&slots);
        assert_eq!(
            combos,
            vec![vec![0, 10], vec![0, 20], vec![1, 10], vec![1, 20]]
        );
    }

    #[test]
    fn empty_slots_yields_one_empty_combination() {
        let slots: Vec<Vec<i32>> = vec![];
        assert_eq!(cartesian_product(&slots), vec![Vec::<i32>::new()]);
    }

    #[test]
    fn single_slot_passes_through() {
        let slots = vec![vec![1, 2, 3]];
        assert_eq!(cartesian_product(&slots), vec![vec![1], vec![2], vec![3]]);
    }
}
