//! Order-preserving de-duplication.

use std::collections::HashSet;
use std::hash::Hash;

/// Keep the first occurrence of every item, in input order.
///
/// Items are compared by `Eq`; for node handles that is node identity.
pub fn unique<T>(items: impl IntoIterator<Item = T>) -> Vec<T>
where
    T: Eq + Hash + Clone,
{
    let mut seen = HashSet::new();
    items
        .into_iter()
        .filter(|item| seen.insert(item.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn removes_later_duplicates() {
        assert_eq!(unique([1, 2, 1, 3, 2, 2]), vec![1, 2, 3]);
    }

    #[test]
    fn keeps_order_of_first_occurrence() {
        assert_eq!(unique(["b", "a", "b", "c", "a"]), vec!["b", "a", "c"]);
    }

    #[test]
    fn empty_input() {
        assert!(unique(Vec::<u8>::new()).is_empty());
    }

    #[test]
    fn does_not_mutate_the_source() {
        let source = vec![1, 1, 2];
        let deduped = unique(source.iter().copied());
        assert_eq!(source, vec![1, 1, 2]);
        assert_eq!(deduped, vec![1, 2]);
    }
}
