//! Module defining the trait a puzzle state must implement to be searched by MCTS.

use std::{collections::BTreeSet, hash::Hash};

use rand::Rng;

/// Trait defining the interface for a puzzle state that can be searched with MCTS.
///
/// The engine never looks inside a state: it only asks for terminality, reward
/// and legal successors, and stores clones of states as keys of its statistics
/// tables. Two states representing the same configuration must therefore compare
/// equal and hash identically, whatever sequence of moves produced them.
///
/// `Ord` is required so that the children of a state have a stable iteration
/// order, which makes seeded searches reproducible.
pub trait State: Clone + Eq + Hash + Ord{
    /// Determines if no further move is legal from this state.
    ///
    /// A state is terminal when the puzzle is completely filled, or when it has
    /// reached a dead end. Which of those is a success is decided by `reward`.
    ///
    /// # Examples
    /// ```rust
    /// use uct_grid::State;
    /// use uct_grid::test_utils::ChainState;
    /// assert!(!ChainState::Root.is_terminal());
    /// assert!(ChainState::Win.is_terminal());
    /// ```
    fn is_terminal(&self) -> bool;

    /// Returns the score of a terminal state.
    ///
    /// This value is backpropagated as the outcome of a rollout, typically `1.0`
    /// for a valid complete solution and `0.0` otherwise.
    ///
    /// Only defined for terminal states. Calling it on a non-terminal state is a
    /// contract violation whose result is up to the implementation.
    fn reward(&self) -> f64;

    /// Returns every state reachable by one legal move from this state.
    ///
    /// The engine calls this at most once per state, when the state is expanded.
    /// An empty set means there is no legal continuation.
    ///
    /// # Examples
    /// ```rust
    /// use uct_grid::State;
    /// use uct_grid::test_utils::ChainState;
    /// let children = ChainState::Step.find_children();
    /// assert!(children.contains(&ChainState::Win));
    /// assert!(children.contains(&ChainState::Loss));
    /// ```
    fn find_children(&self) -> BTreeSet<Self>;

    /// Samples one legal next state.
    ///
    /// Used by the engine to advance a rollout and as a fallback choice when no
    /// statistics exist yet. Must be callable repeatedly and independently.
    ///
    /// # Parameters
    /// - `rng`: The random source owned by the engine. Implementations should draw
    ///          all their randomness from it so that seeded runs are reproducible.
    fn find_random_child<R: Rng + ?Sized>(&self, rng: &mut R) -> Self;
}
