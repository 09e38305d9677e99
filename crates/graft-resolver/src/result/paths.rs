//! Shortest "required by" paths from the root to a component.

use std::collections::{HashMap, VecDeque};
use std::hash::Hash;

/// Computes shortest paths from `root` over recorded dependents.
///
/// The first query walks the graph once, breadth-first from the root, and
/// keeps the resulting parent tree; later queries only follow it back up.
/// Recording another dependent drops the tree.
#[derive(Debug)]
pub struct PathCalculator<K> {
    root: K,
    /// `dependent -> components it depends on`, in recording order.
    dependencies: HashMap<K, Vec<K>>,
    /// Breadth-first parent of every component reachable from the root.
    tree: Option<HashMap<K, K>>,
}

impl<K: Clone + Eq + Hash> PathCalculator<K> {
    pub fn new(root: K) -> Self {
        Self {
            root,
            dependencies: HashMap::new(),
            tree: None,
        }
    }

    /// Record that `dependent` depends on `component`.
    pub fn add_dependent(&mut self, component: K, dependent: K) {
        let entry = self.dependencies.entry(dependent).or_default();
        if !entry.contains(&component) {
            entry.push(component);
            self.tree = None;
        }
    }

    /// Shortest path `[root, .., target]`, or `None` if `target` is unreachable.
    pub fn path_to(&mut self, target: &K) -> Option<Vec<K>> {
        let root = self.root.clone();
        let tree = self.tree.get_or_insert_with(|| build_tree(&root, &self.dependencies));

        let mut path = vec![target.clone()];
        let mut current = target;
        while *current != root {
            current = tree.get(current)?;
            path.push(current.clone());
        }
        path.reverse();
        Some(path)
    }
}

fn build_tree<K: Clone + Eq + Hash>(root: &K, dependencies: &HashMap<K, Vec<K>>) -> HashMap<K, K> {
    let mut parents: HashMap<K, K> = HashMap::new();
    let mut queue: VecDeque<&K> = VecDeque::from([root]);
    while let Some(current) = queue.pop_front() {
        for component in dependencies.get(current).into_iter().flatten() {
            if component == root || parents.contains_key(component) {
                continue;
            }
            parents.insert(component.clone(), current.clone());
            queue.push_back(component);
        }
    }
    parents
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_path_is_just_root() {
        let mut paths = PathCalculator::new("root");
        assert_eq!(paths.path_to(&"root"), Some(vec!["root"]));
    }

    #[test]
    fn picks_the_shortest_route() {
        let mut paths = PathCalculator::new("root");
        paths.add_dependent("a", "root");
        paths.add_dependent("b", "a");
        paths.add_dependent("c", "b");
        paths.add_dependent("c", "root");
        assert_eq!(paths.path_to(&"c"), Some(vec!["root", "c"]));
        assert_eq!(paths.path_to(&"b"), Some(vec!["root", "a", "b"]));
    }

    #[test]
    fn unreachable_component() {
        let mut paths = PathCalculator::new("root");
        paths.add_dependent("b", "a");
        assert_eq!(paths.path_to(&"b"), None);
        assert_eq!(paths.path_to(&"missing"), None);
    }

    #[test]
    fn cycles_terminate() {
        let mut paths = PathCalculator::new("root");
        paths.add_dependent("a", "root");
        paths.add_dependent("b", "a");
        paths.add_dependent("a", "b");
        paths.add_dependent("root", "b");
        assert_eq!(paths.path_to(&"b"), Some(vec!["root", "a", "b"]));
    }

    #[test]
    fn new_dependents_rebuild_the_tree() {
        let mut paths = PathCalculator::new("root");
        paths.add_dependent("a", "root");
        paths.add_dependent("b", "a");
        assert_eq!(paths.path_to(&"b"), Some(vec!["root", "a", "b"]));
        paths.add_dependent("b", "root");
        assert_eq!(paths.path_to(&"b"), Some(vec!["root", "b"]));
    }

    #[test]
    fn many_failures_below_a_shared_parent_share_one_walk() {
        // root <- p0..p499 <- s <- t0..t499
        let mut paths = PathCalculator::new(0u32);
        let shared = 1u32;
        for p in 10..510u32 {
            paths.add_dependent(p, 0);
            paths.add_dependent(shared, p);
        }
        for t in 1000..1500u32 {
            paths.add_dependent(t, shared);
        }

        for t in 1000..1500u32 {
            assert_eq!(paths.path_to(&t), Some(vec![0, 10, shared, t]));
        }
        // One tree covering every reachable component, built once.
        assert_eq!(paths.tree.as_ref().map(HashMap::len), Some(500 + 1 + 500));
    }
}
