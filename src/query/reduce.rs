//! Ancestor-collapsing reduction over candidate roots.

use crate::tree::NodeTree;

/// One fold step: merge `candidate` into `acc` so that no retained node is
/// an ancestor of another.
///
/// - `candidate` contains an accumulated node: it takes that node's slot,
///   and any other accumulated descendants of `candidate` are dropped.
/// - An accumulated node contains `candidate`: `candidate` is dropped.
/// - Otherwise `candidate` is appended.
pub fn reduce_parents<T: NodeTree + ?Sized>(
    tree: &T,
    mut acc: Vec<T::Node>,
    candidate: T::Node,
) -> Vec<T::Node> {
    for slot in 0..acc.len() {
        if tree.contains(candidate, acc[slot]) {
            acc[slot] = candidate;
            let mut position = 0;
            acc.retain(|node| {
                let keep = position <= slot || !tree.contains(candidate, *node);
                position += 1;
                keep
            });
            return acc;
        }
        if tree.contains(acc[slot], candidate) {
            return acc;
        }
    }
    acc.push(candidate);
    acc
}

/// Fold a whole sequence through [`reduce_parents`].
pub fn reduce_all<T: NodeTree + ?Sized>(
    tree: &T,
    nodes: impl IntoIterator<Item = T::Node>,
) -> Vec<T::Node> {
    nodes
        .into_iter()
        .fold(Vec::new(), |acc, node| reduce_parents(tree, acc, node))
}
