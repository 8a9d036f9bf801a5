//! Statistics tables backing the MCTS search tree

use std::collections::{BTreeSet, HashMap};

use crate::State;

/// The search tree, stored as flat tables keyed by state.
///
/// There is no linked node graph: the edges of the tree are the entries of the
/// children table, and the statistics of a node are looked up by its state. A
/// state reached through several move orders therefore shares its statistics.
///
/// # Type Parameters
/// - `S`: The state type, implementing `State`.
#[derive(Debug, Clone)]
pub struct SearchTree<S: State>{
    /// Visit count of every state that appeared in a backpropagation.
    n: HashMap<S, u64>,
    /// Cumulative reward of every state that appeared in a backpropagation.
    q: HashMap<S, f64>,
    /// Known children of every expanded state.
    children: HashMap<S, BTreeSet<S>>
}

impl<S: State> Default for SearchTree<S>{
    fn default() -> Self{
        Self::new()
    }
}

impl<S: State> SearchTree<S>{
    /// Creates an empty tree with no expanded or visited state.
    #[inline]
    pub fn new() -> Self{
        SearchTree { n: HashMap::new(), q: HashMap::new(), children: HashMap::new() }
    }

    /// Gets the visit count of a state, `0` if it was never backpropagated.
    #[inline]
    pub fn visits(&self, state: &S) -> u64{
        self.n.get(state).copied().unwrap_or(0)
    }

    /// Gets the cumulative reward of a state, `0.0` if it was never backpropagated.
    #[inline]
    pub fn total_reward(&self, state: &S) -> f64{
        self.q.get(state).copied().unwrap_or(0.0)
    }

    /// Calculates the mean reward (reward per visit) of a state.
    ///
    /// # Returns
    /// `None` if the state has no recorded visit.
    #[inline]
    pub fn mean_reward(&self, state: &S) -> Option<f64>{
        match self.visits(state) {
            0 => None,
            n => Some(self.total_reward(state) / n as f64)
        }
    }

    /// Checks if a state has been expanded, even to an empty set of children.
    #[inline]
    pub fn is_expanded(&self, state: &S) -> bool{
        self.children.contains_key(state)
    }

    /// Gets the recorded children of a state, `None` if it was never expanded.
    #[inline]
    pub fn children(&self, state: &S) -> Option<&BTreeSet<S>>{
        self.children.get(state)
    }

    /// Iterates over the children of `state` that have not been expanded yet.
    ///
    /// Yields nothing when `state` itself is not expanded.
    pub fn unexplored<'a>(&'a self, state: &S) -> impl Iterator<Item = &'a S> + 'a{
        self.children
            .get(state)
            .into_iter()
            .flatten()
            .filter(move |child| !self.children.contains_key(*child))
    }

    /// Records the children of a state by calling `find_children` on it.
    ///
    /// Expansion is idempotent: an already expanded state is left untouched and
    /// `find_children` is not called again.
    ///
    /// # Returns
    /// `true` if the state was expanded by this call.
    pub fn expand(&mut self, state: &S) -> bool{
        if self.children.contains_key(state) {
            return false;
        }

        self.children.insert(state.clone(), state.find_children());
        true
    }

    /// Credits a rollout outcome to every state of a path.
    ///
    /// The path is walked from the leaf back to the root. Each state gets one
    /// more visit and `reward` added to its cumulative reward.
    ///
    /// # Parameters
    /// - `path`: States from the rollout root to the selected leaf.
    /// - `reward`: The reward returned by the simulation from the leaf.
    pub fn backpropagate(&mut self, path: &[S], reward: f64){
        for state in path.iter().rev() {
            *self.n.entry(state.clone()).or_insert(0) += 1;
            *self.q.entry(state.clone()).or_insert(0.0) += reward;
        }
    }

    /// Number of expanded states.
    #[inline]
    pub fn expanded_len(&self) -> usize{
        self.children.len()
    }

    /// Number of states with at least one recorded visit.
    #[inline]
    pub fn visited_len(&self) -> usize{
        self.n.len()
    }

    /// Checks if nothing has been expanded or visited yet.
    #[inline]
    pub fn is_empty(&self) -> bool{
        self.children.is_empty() && self.n.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{ChainState, CountingState};

    #[test]
    fn test_empty_tree(){
        let tree = SearchTree::<ChainState>::new();

        assert!(tree.is_empty());
        assert_eq!(tree.visits(&ChainState::Root), 0);
        assert_eq!(tree.total_reward(&ChainState::Root), 0.0);
        assert_eq!(tree.mean_reward(&ChainState::Root), None);
        assert!(!tree.is_expanded(&ChainState::Root));
        assert!(tree.children(&ChainState::Root).is_none());

        // reads must not create entries
        assert!(tree.is_empty());
    }

    #[test]
    fn test_expand(){
        let mut tree = SearchTree::<ChainState>::new();

        assert!(tree.expand(&ChainState::Step));
        assert!(tree.is_expanded(&ChainState::Step));

        let children = tree.children(&ChainState::Step).unwrap();
        assert_eq!(children.len(), 2);
        assert!(children.contains(&ChainState::Win));
        assert!(children.contains(&ChainState::Loss));

        assert_eq!(tree.expanded_len(), 1);
        assert_eq!(tree.visited_len(), 0);
    }

    #[test]
    fn test_expand_terminal_records_empty_set(){
        let mut tree = SearchTree::<ChainState>::new();

        assert!(tree.expand(&ChainState::Win));
        assert!(tree.is_expanded(&ChainState::Win));
        assert!(tree.children(&ChainState::Win).unwrap().is_empty());
    }

    #[test]
    fn test_expand_idempotent(){
        let mut tree = SearchTree::<CountingState>::new();
        let root = CountingState::root(3);

        assert!(tree.expand(&root));
        let first = tree.children(&root).unwrap().clone();

        assert!(!tree.expand(&root));
        let second = tree.children(&root).unwrap().clone();

        assert_eq!(first, second);
        assert_eq!(root.find_children_calls(), 1);
    }

    #[test]
    fn test_unexplored(){
        let mut tree = SearchTree::<ChainState>::new();

        assert_eq!(tree.unexplored(&ChainState::Step).count(), 0);

        tree.expand(&ChainState::Step);
        assert_eq!(tree.unexplored(&ChainState::Step).count(), 2);

        tree.expand(&ChainState::Loss);
        let unexplored: Vec<_> = tree.unexplored(&ChainState::Step).collect();
        assert_eq!(unexplored, vec![&ChainState::Win]);

        tree.expand(&ChainState::Win);
        assert_eq!(tree.unexplored(&ChainState::Step).count(), 0);
    }

    #[test]
    fn test_backpropagate_accumulates(){
        let mut tree = SearchTree::<ChainState>::new();
        let path = [ChainState::Root, ChainState::Step, ChainState::Win];

        tree.backpropagate(&path, 1.0);
        tree.backpropagate(&path[..2], 0.0);
        tree.backpropagate(&path[..1], 0.5);

        assert_eq!(tree.visits(&ChainState::Root), 3);
        assert_eq!(tree.total_reward(&ChainState::Root), 1.5);
        assert_eq!(tree.mean_reward(&ChainState::Root), Some(0.5));

        assert_eq!(tree.visits(&ChainState::Step), 2);
        assert_eq!(tree.total_reward(&ChainState::Step), 1.0);

        assert_eq!(tree.visits(&ChainState::Win), 1);
        assert_eq!(tree.total_reward(&ChainState::Win), 1.0);

        assert_eq!(tree.visits(&ChainState::Loss), 0);
        assert_eq!(tree.visited_len(), 3);

        // backpropagation never expands
        assert_eq!(tree.expanded_len(), 0);
    }
}
