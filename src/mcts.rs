//! Implementation of Monte Carlo Tree Search (MCTS) with UCT selection.
//!
//! This module provides the search engine: selection with the Upper Confidence
//! Bound for Trees, expansion, uniform random rollouts and backpropagation. It
//! is generic over any type implementing `State` and keeps its statistics in a
//! `SearchTree` that lives as long as the engine, across moves.

use std::{collections::BTreeSet, fmt::Display};

use rand::{rngs::StdRng, seq::IteratorRandom};
use thiserror::Error;
use tracing::{debug, trace};

use crate::{utils, SearchTree, State};

/// Score given to a child with no recorded visit when choosing the best action.
///
/// Mean rewards are expected to be non-negative, so an unvisited child is only
/// chosen when every child is unvisited.
pub const UNVISITED_SCORE: f64 = -1.0;

/// Represents possible errors that can occur during MCTS operations.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum MctsError{
    /// An action was requested from a terminal state, where no move is legal.
    /// The caller must check `State::is_terminal` first.
    #[error("invalid operation on terminal state")]
    TerminalState,
    /// The state is not terminal but its expansion recorded no child. This is a
    /// violation of the `State` contract by the puzzle implementation.
    #[error("non-terminal state has no children")]
    NoChildren,
    /// The configuration was rejected by `MctsConfig::validate`.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String)
}

/// Result type for MCTS operations
pub type Result<T> = std::result::Result<T, MctsError>;

/// Configuration parameters for a Monte Carlo Tree Search (MCTS) instance.
///
/// Every parameter is fixed for the whole lifetime of the engine.
#[derive(Debug, Clone, PartialEq)]
pub struct MctsConfig{
    /// The exploration weight of the UCT formula.
    ///
    /// A higher value encourages more exploration of less-visited states, while a lower value
    /// prioritizes exploitation of states with a high mean reward.
    pub exploration_weight: f64,
    /// Number of rollouts run from the current state before each move of `solve`.
    pub number_path: usize,
    /// An optional seed for the random number generator.
    ///
    /// Providing a `Some(value)` makes the whole search reproducible. With `None`
    /// the generator is seeded from the operating system.
    pub seed: Option<u64>
}

impl MctsConfig{
    /// The default MCTS configuration.
    ///
    /// - `exploration_weight`: `1.0`.
    /// - `number_path`: `10` rollouts per move.
    /// - `seed`: `None`, runs are not reproducible.
    pub const DEFAULT: MctsConfig = MctsConfig{
        exploration_weight: 1.0,
        number_path: 10,
        seed: None
    };

    /// Sets the exploration weight.
    pub fn with_exploration_weight(mut self, exploration_weight: f64) -> Self{
        self.exploration_weight = exploration_weight;
        self
    }

    /// Sets the number of rollouts run before each move.
    pub fn with_number_path(mut self, number_path: usize) -> Self{
        self.number_path = number_path;
        self
    }

    /// Sets the random number generator seed.
    pub fn with_seed(mut self, seed: u64) -> Self{
        self.seed = Some(seed);
        self
    }

    /// Checks that the configuration can drive a search.
    ///
    /// # Returns
    /// `Err(MctsError::InvalidConfiguration(_))` if `number_path` is zero or if
    /// `exploration_weight` is negative or not finite.
    pub fn validate(&self) -> Result<()>{
        if self.number_path == 0 {
            return Err(MctsError::InvalidConfiguration("number_path must be positive".to_string()));
        }

        if !self.exploration_weight.is_finite() || self.exploration_weight < 0.0 {
            return Err(MctsError::InvalidConfiguration(
                format!("exploration_weight must be finite and non-negative, got {}", self.exploration_weight)
            ));
        }

        Ok(())
    }
}

impl Default for MctsConfig{
    fn default() -> Self{
        Self::DEFAULT
    }
}

/// The Upper Confidence Bound for Trees (UCT) score of a child.
///
/// `Q/N + exploration_weight * sqrt(ln(N_parent) / N)`
///
/// # Parameters
/// - `total_reward`: Cumulative reward `Q` of the child.
/// - `visits`: Visit count `N` of the child.
/// - `parent_visits`: Visit count of the parent.
/// - `exploration_weight`: The exploration weight from `MctsConfig`.
///
/// # Returns
/// The UCT score. A child with no visit scores `f64::INFINITY`.
///
/// # Examples
/// ```rust
/// use uct_grid::uct;
/// // same mean reward, the less visited child scores higher
/// assert!(uct(0.5, 1.0, 10.0, 1.0) > uct(4.5, 9.0, 10.0, 1.0));
/// ```
#[inline]
pub fn uct(total_reward: f64, visits: f64, parent_visits: f64, exploration_weight: f64) -> f64{
    if visits == 0.0 {
        return f64::INFINITY;
    }

    total_reward / visits + exploration_weight * (parent_visits.ln() / visits).sqrt()
}

/// Returns the candidate with the highest score, the first one on ties.
fn argmax<'a, S: 'a>(candidates: impl IntoIterator<Item = &'a S>, score: impl Fn(&S) -> f64) -> Option<&'a S>{
    let mut best: Option<(&'a S, f64)> = None;

    for candidate in candidates {
        let value = score(candidate);

        if best.map_or(true, |(_, best_value)| value > best_value) {
            best = Some((candidate, value));
        }
    }

    best.map(|(candidate, _)| candidate)
}

/// The Monte Carlo Tree Search engine.
///
/// The engine tracks a current root state, runs rollouts from it, and advances
/// it move after move until a terminal state is reached. Statistics gathered
/// from earlier roots are kept and reused when a state is met again.
///
/// # Type Parameters
/// - `S`: The state type that implements the `State` trait.
///
/// # Examples
/// ```rust
/// use uct_grid::{Mcts, MctsConfig, MctsError};
/// use uct_grid::test_utils::ChainState;
///
/// fn main() -> Result<(), MctsError> {
///     let config = MctsConfig::DEFAULT.with_seed(3);
///     let mut mcts = Mcts::from_config(ChainState::Root, &config)?;
///
///     let solved = mcts.solve_with(|state| println!("{:?}", state))?;
///     assert_eq!(solved, ChainState::Win);
///     Ok(())
/// }
/// ```
#[derive(Debug)]
pub struct Mcts<S: State>{
    root: S,
    tree: SearchTree<S>,
    config: MctsConfig,
    rng: StdRng
}

impl<S: State> Mcts<S>{
    /// Creates a new MCTS instance rooted at `root` with the default configuration.
    #[inline]
    pub fn new(root: S) -> Self{
        Self::with_valid_config(root, MctsConfig::DEFAULT)
    }

    /// Creates a new MCTS instance rooted at `root` from a specified configuration.
    ///
    /// # Returns
    /// `Err(MctsError::InvalidConfiguration(_))` if the configuration is rejected
    /// by `MctsConfig::validate`.
    pub fn from_config(root: S, config: &MctsConfig) -> Result<Self>{
        config.validate()?;
        Ok(Self::with_valid_config(root, config.clone()))
    }

    fn with_valid_config(root: S, config: MctsConfig) -> Self{
        Mcts {
            root,
            tree: SearchTree::new(),
            rng: utils::rng_from_seed(config.seed),
            config
        }
    }

    /// Gets the current root state.
    #[inline]
    pub fn root(&self) -> &S{
        &self.root
    }

    /// Gets the configuration of this instance.
    #[inline]
    pub fn config(&self) -> &MctsConfig{
        &self.config
    }

    /// Gets read access to the statistics tables.
    #[inline]
    pub fn tree(&self) -> &SearchTree<S>{
        &self.tree
    }

    #[inline]
    pub fn visits(&self, state: &S) -> u64{
        self.tree.visits(state)
    }

    #[inline]
    pub fn total_reward(&self, state: &S) -> f64{
        self.tree.total_reward(state)
    }

    #[inline]
    pub fn mean_reward(&self, state: &S) -> Option<f64>{
        self.tree.mean_reward(state)
    }

    #[inline]
    pub fn is_expanded(&self, state: &S) -> bool{
        self.tree.is_expanded(state)
    }

    #[inline]
    pub fn children(&self, state: &S) -> Option<&BTreeSet<S>>{
        self.tree.children(state)
    }

    /// Performs one full iteration of MCTS from the current root
    /// (selection, expansion, simulation, backpropagation).
    ///
    /// # Returns
    /// The reward of the terminal state reached by the simulation.
    #[inline]
    pub fn run_rollout(&mut self) -> f64{
        self.rollout().1
    }

    /// One iteration, also returning the selected path.
    fn rollout(&mut self) -> (Vec<S>, f64){
        let path = self.select();
        let leaf = path.last().unwrap_or(&self.root).clone();

        self.tree.expand(&leaf);
        let reward = self.simulate(&leaf);

        self.tree.backpropagate(&path, reward);
        trace!(depth = path.len(), reward, "rollout done");

        (path, reward)
    }

    /// Performs the selection phase of MCTS
    ///
    /// Descends from the root through expanded states using UCT. The descent stops
    /// on a state that is not expanded or has no child, or right after stepping on
    /// a child that is not expanded yet.
    ///
    /// # Returns
    /// The path from the root to the leaf to expand, both included.
    fn select(&mut self) -> Vec<S>{
        let mut path = Vec::new();
        let mut current = self.root.clone();

        loop {
            path.push(current.clone());

            if self.tree.children(&current).map_or(true, |children| children.is_empty()) {
                return path;
            }

            let unexplored = self.tree.unexplored(&current).choose(&mut self.rng).cloned();
            if let Some(child) = unexplored {
                path.push(child);
                return path;
            }

            match self.uct_select(&current) {
                Some(next) => current = next,
                None => return path
            }
        }
    }

    /// Picks the child of `state` with the highest UCT score.
    ///
    /// # Panics
    /// If a child of `state` has not been expanded. Selection only compares fully
    /// explored children, so this means the tree is corrupted.
    fn uct_select(&self, state: &S) -> Option<S>{
        let children = self.tree.children(state)?;

        assert!(
            children.iter().all(|child| self.tree.is_expanded(child)),
            "uct selection reached a child that was never expanded"
        );

        let parent_visits = self.tree.visits(state) as f64;
        let weight = self.config.exploration_weight;

        argmax(children, |child| {
            uct(self.tree.total_reward(child), self.tree.visits(child) as f64, parent_visits, weight)
        }).cloned()
    }

    /// Performs the simulation phase of MCTS
    ///
    /// Plays random moves from `leaf` until a terminal state. The statistics
    /// tables are not touched.
    fn simulate(&mut self, leaf: &S) -> f64{
        let mut state = leaf.clone();

        while !state.is_terminal() {
            state = state.find_random_child(&mut self.rng);
        }

        state.reward()
    }

    /// Chooses the next state to play from `state`.
    ///
    /// The child with the best mean reward is returned, without exploration term.
    /// Children never visited score `UNVISITED_SCORE`. Ties go to the first child
    /// in the children set order. If `state` was never expanded, a random child is
    /// returned instead.
    ///
    /// # Returns
    /// `Err(MctsError::TerminalState)` if `state` is terminal.
    /// `Err(MctsError::NoChildren)` if `state` was expanded without any child.
    pub fn choose_best_action(&mut self, state: &S) -> Result<S>{
        if state.is_terminal() {
            return Err(MctsError::TerminalState);
        }

        let Some(children) = self.tree.children(state) else {
            debug!("no statistics for the state, falling back to a random child");
            return Ok(state.find_random_child(&mut self.rng));
        };

        let tree = &self.tree;
        argmax(children, |child| tree.mean_reward(child).unwrap_or(UNVISITED_SCORE))
            .cloned()
            .ok_or(MctsError::NoChildren)
    }

    /// Moves the root to `next`. The statistics tables are kept.
    #[inline]
    pub fn advance(&mut self, next: S){
        self.root = next;
    }

    /// Runs `number_path` rollouts, then plays the best action from the root.
    ///
    /// # Returns
    /// The new root, or `Err(MctsError::TerminalState)` if the root is terminal.
    pub fn step(&mut self) -> Result<&S>{
        if self.root.is_terminal() {
            return Err(MctsError::TerminalState);
        }

        for _ in 0..self.config.number_path {
            self.run_rollout();
        }

        let root = self.root.clone();
        let next = self.choose_best_action(&root)?;

        debug!(
            visits = self.tree.visits(&next),
            mean_reward = self.tree.mean_reward(&next).unwrap_or(UNVISITED_SCORE),
            "action chosen"
        );

        self.advance(next);
        Ok(&self.root)
    }

    /// Plays moves until the root is terminal.
    ///
    /// # Parameters
    /// - `observer`: Called with the root before each batch of rollouts, e.g. to
    ///               display the progress.
    ///
    /// # Returns
    /// The terminal state reached, or `Err(MctsError::TerminalState)` if the root is
    /// already terminal.
    pub fn solve_with<F: FnMut(&S)>(&mut self, mut observer: F) -> Result<S>{
        if self.root.is_terminal() {
            return Err(MctsError::TerminalState);
        }

        let mut moves = 0usize;
        while !self.root.is_terminal() {
            observer(&self.root);
            self.step()?;
            moves += 1;
        }

        debug!(
            moves,
            reward = self.root.reward(),
            expanded = self.tree.expanded_len(),
            "terminal state reached"
        );

        Ok(self.root.clone())
    }
}

impl<S: State + Display> Mcts<S>{
    /// Plays moves until the root is terminal, logging every intermediate state.
    ///
    /// See `solve_with`.
    pub fn solve(&mut self) -> Result<S>{
        self.solve_with(|state| debug!("current state:\n{state}"))
    }
}
