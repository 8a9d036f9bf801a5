//! Test utilities for MCTS implementation

use std::{cell::Cell, cmp::Ordering, collections::BTreeSet, hash::{Hash, Hasher}, rc::Rc};

use rand::Rng;

use crate::State;

/// A three-step test puzzle.
///
/// `Root` has the single child `Step`, and `Step` has two terminal children:
/// `Win` (reward `1.0`) and `Loss` (reward `0.0`).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ChainState {
    Root,
    Step,
    Win,
    Loss,
}

impl State for ChainState {
    fn is_terminal(&self) -> bool {
        matches!(self, ChainState::Win | ChainState::Loss)
    }

    fn reward(&self) -> f64 {
        match self {
            ChainState::Win => 1.0,
            _ => 0.0,
        }
    }

    fn find_children(&self) -> BTreeSet<Self> {
        match self {
            ChainState::Root => BTreeSet::from([ChainState::Step]),
            ChainState::Step => BTreeSet::from([ChainState::Win, ChainState::Loss]),
            _ => BTreeSet::new(),
        }
    }

    fn find_random_child<R: Rng + ?Sized>(&self, rng: &mut R) -> Self {
        match self {
            ChainState::Root => ChainState::Step,
            ChainState::Step => {
                if rng.random_bool(0.5) { ChainState::Win } else { ChainState::Loss }
            }
            terminal => *terminal,
        }
    }
}

/// A complete binary tree of fixed depth that counts its `find_children` calls.
///
/// Nodes are numbered like a binary heap: the children of `id` are `2 * id` and
/// `2 * id + 1`. A leaf is worth `1.0` when its id is odd, `0.0` otherwise.
/// All states created from the same root share one call counter, which is
/// ignored by comparisons and hashing.
#[derive(Clone, Debug)]
pub struct CountingState {
    id: u64,
    depth: u32,
    max_depth: u32,
    calls: Rc<Cell<usize>>,
}

impl CountingState {
    /// Creates the root of a tree whose leaves are `max_depth` moves away.
    pub fn root(max_depth: u32) -> Self {
        CountingState {
            id: 1,
            depth: 0,
            max_depth,
            calls: Rc::new(Cell::new(0)),
        }
    }

    /// Total number of `find_children` calls made on states of this tree.
    pub fn find_children_calls(&self) -> usize {
        self.calls.get()
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn depth(&self) -> u32 {
        self.depth
    }

    fn child(&self, bit: u64) -> Self {
        CountingState {
            id: self.id * 2 + bit,
            depth: self.depth + 1,
            max_depth: self.max_depth,
            calls: Rc::clone(&self.calls),
        }
    }
}

impl PartialEq for CountingState {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && self.depth == other.depth
    }
}

impl Eq for CountingState {}

impl Hash for CountingState {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
        self.depth.hash(state);
    }
}

impl PartialOrd for CountingState {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for CountingState {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.depth, self.id).cmp(&(other.depth, other.id))
    }
}

impl State for CountingState {
    fn is_terminal(&self) -> bool {
        self.depth >= self.max_depth
    }

    fn reward(&self) -> f64 {
        (self.id % 2) as f64
    }

    fn find_children(&self) -> BTreeSet<Self> {
        self.calls.set(self.calls.get() + 1);

        if self.is_terminal() {
            BTreeSet::new()
        } else {
            BTreeSet::from([self.child(0), self.child(1)])
        }
    }

    fn find_random_child<R: Rng + ?Sized>(&self, rng: &mut R) -> Self {
        self.child(rng.random_range(0..2))
    }
}
