//! A Rust library providing a Monte Carlo Tree Search (MCTS) engine with
//! UCT selection and uniform random rollouts.
//!
//! The search tree is not a graph of nodes: it is kept as flat tables keyed by
//! state (visit counts, cumulative rewards and known children). Any type
//! implementing `State` can be searched, and a Sudoku-like grid is provided as
//! a ready-made state.
//!
//! # Modules
//! - `state`: Defines the trait a searchable state implements.
//! - `tree`: Implements the statistics tables used by MCTS.
//! - `mcts`: Provides the MCTS engine and its solve loop.
//! - `sudoku`: A grid puzzle filled one cell at a time.
//! - `utils`: Contains general utility functions.
//! - `test_utils`: Provides small states for testing the MCTS engine.
//!
//! # Examples
//! ```rust
//! use uct_grid::{Mcts, MctsConfig, State, SudokuGrid};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let grid: SudokuGrid = "..34 3412 ..43 4321".parse()?;
//!     let config = MctsConfig::DEFAULT.with_number_path(20).with_seed(42);
//!     let mut mcts = Mcts::from_config(grid, &config)?;
//!
//!     // Run rollouts, play the best cell value, repeat until the grid is terminal
//!     let solved = mcts.solve_with(|grid| println!("{}", grid))?;
//!
//!     println!("{}", solved);
//!     assert_eq!(solved.reward(), 1.0);
//!     Ok(())
//! }
//! ```

mod tree;
mod state;
mod mcts;
mod sudoku;
pub mod utils;

#[doc(hidden)]
pub mod test_utils;

pub use tree::SearchTree;
pub use state::*;
pub use mcts::*;
pub use sudoku::*;
