//! A Sudoku-like grid, filled one cell at a time, implementing `State`.
//!
//! The grid has `box_size²` rows and columns, split in `box_size²` boxes of
//! `box_size × box_size` cells. A move writes a value in the first empty cell
//! (row-major order) that does not already appear in its row, column or box.

use std::{collections::BTreeSet, fmt, str::FromStr};

use rand::{seq::IndexedRandom, Rng};
use thiserror::Error;

use crate::State;

/// Largest supported box size. Values of a `5 × 5` box grid still fit in a `u8`.
pub const MAX_BOX_SIZE: usize = 5;

/// Errors raised when building a grid.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum GridError{
    #[error("box size must be between 1 and 5, got {0}")]
    InvalidBoxSize(usize),
    #[error("expected {expected} cells, got {actual}")]
    CellCount{ expected: usize, actual: usize },
    #[error("cell value {value} is out of range 0..={max}")]
    ValueOutOfRange{ value: u8, max: usize },
    #[error("{0} cells do not form a square grid of square boxes")]
    NotSquare(usize),
    #[error("unexpected character {0:?}")]
    InvalidCharacter(char)
}

/// A grid of cells, `0` meaning empty.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SudokuGrid{
    box_size: usize,
    cells: Vec<u8>
}

impl SudokuGrid{
    /// Creates a grid from its cells in row-major order.
    ///
    /// # Parameters
    /// - `box_size`: The side of a box. The grid side is `box_size²`.
    /// - `cells`: `box_size⁴` values, `0` for an empty cell.
    ///
    /// # Examples
    /// ```rust
    /// use uct_grid::SudokuGrid;
    /// let grid = SudokuGrid::new(2, vec![0; 16]).unwrap();
    /// assert_eq!(grid.side(), 4);
    /// ```
    pub fn new(box_size: usize, cells: Vec<u8>) -> Result<Self, GridError>{
        if box_size == 0 || box_size > MAX_BOX_SIZE {
            return Err(GridError::InvalidBoxSize(box_size));
        }

        let side = box_size * box_size;
        if cells.len() != side * side {
            return Err(GridError::CellCount{ expected: side * side, actual: cells.len() });
        }

        if let Some(&value) = cells.iter().find(|&&value| value as usize > side) {
            return Err(GridError::ValueOutOfRange{ value, max: side });
        }

        Ok(SudokuGrid { box_size, cells })
    }

    #[inline]
    pub fn box_size(&self) -> usize{
        self.box_size
    }

    /// Number of rows, and of columns.
    #[inline]
    pub fn side(&self) -> usize{
        self.box_size * self.box_size
    }

    #[inline]
    pub fn cells(&self) -> &[u8]{
        &self.cells
    }

    /// Gets the value at `row`, `col`, `0` if the cell is empty.
    #[inline]
    pub fn get(&self, row: usize, col: usize) -> u8{
        self.cells[row * self.side() + col]
    }

    /// Checks that every cell is filled.
    #[inline]
    pub fn is_full(&self) -> bool{
        !self.cells.contains(&0)
    }

    /// Index of the first empty cell in row-major order.
    #[inline]
    pub fn first_empty(&self) -> Option<usize>{
        self.cells.iter().position(|&value| value == 0)
    }

    /// Indices of the cells sharing a row, a column or a box with `index`,
    /// `index` included.
    fn peers(&self, index: usize) -> impl Iterator<Item = usize> + '_{
        let side = self.side();
        let (row, col) = (index / side, index % side);
        let (box_row, box_col) = (row - row % self.box_size, col - col % self.box_size);

        let row_cells = (0..side).map(move |c| row * side + c);
        let col_cells = (0..side).map(move |r| r * side + col);
        let box_cells = (0..self.box_size * self.box_size).map(move |k| {
            (box_row + k / self.box_size) * side + box_col + k % self.box_size
        });

        row_cells.chain(col_cells).chain(box_cells)
    }

    /// Values that can be written at `index` without repeating one of its peers.
    pub fn candidates(&self, index: usize) -> Vec<u8>{
        let mut used = vec![false; self.side() + 1];

        for peer in self.peers(index) {
            used[self.cells[peer] as usize] = true;
        }

        (1..=self.side() as u8).filter(|&value| !used[value as usize]).collect()
    }

    /// Checks that no filled value is repeated in a row, a column or a box.
    pub fn is_valid(&self) -> bool{
        (0..self.cells.len()).all(|index| {
            let value = self.cells[index];
            value == 0 || self.peers(index).filter(|&peer| peer != index).all(|peer| self.cells[peer] != value)
        })
    }

    /// Returns a copy of the grid with `value` written at `index`.
    fn with_value(&self, index: usize, value: u8) -> Self{
        let mut cells = self.cells.clone();
        cells[index] = value;
        SudokuGrid { box_size: self.box_size, cells }
    }
}

impl State for SudokuGrid{
    fn is_terminal(&self) -> bool{
        match self.first_empty() {
            Some(index) => self.candidates(index).is_empty(),
            None => true
        }
    }

    fn reward(&self) -> f64{
        if self.is_full() && self.is_valid() { 1.0 } else { 0.0 }
    }

    fn find_children(&self) -> BTreeSet<Self>{
        match self.first_empty() {
            Some(index) => self.candidates(index)
                .into_iter()
                .map(|value| self.with_value(index, value))
                .collect(),
            None => BTreeSet::new()
        }
    }

    fn find_random_child<R: Rng + ?Sized>(&self, rng: &mut R) -> Self{
        let Some(index) = self.first_empty() else {
            return self.clone();
        };

        match self.candidates(index).choose(rng) {
            Some(&value) => self.with_value(index, value),
            None => self.clone()
        }
    }
}

impl FromStr for SudokuGrid{
    type Err = GridError;

    /// Parses a grid written with one character per cell.
    ///
    /// Digits are values, `0` and `.` are empty cells, whitespace is ignored.
    /// The grid size is inferred from the number of cells, so only grids up to
    /// `9 × 9` can be written this way.
    fn from_str(s: &str) -> Result<Self, Self::Err>{
        let cells = s
            .chars()
            .filter(|c| !c.is_whitespace())
            .map(|c| match c {
                '.' => Ok(0),
                '0'..='9' => Ok(c as u8 - b'0'),
                other => Err(GridError::InvalidCharacter(other))
            })
            .collect::<Result<Vec<u8>, GridError>>()?;

        let side = integer_sqrt(cells.len()).ok_or(GridError::NotSquare(cells.len()))?;
        let box_size = integer_sqrt(side).ok_or(GridError::NotSquare(cells.len()))?;

        SudokuGrid::new(box_size, cells)
    }
}

fn integer_sqrt(n: usize) -> Option<usize>{
    (0..=n).take_while(|root| root * root <= n).find(|root| root * root == n)
}

impl fmt::Display for SudokuGrid{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result{
        for row in self.cells.chunks(self.side()) {
            let line: Vec<String> = row
                .iter()
                .map(|&value| if value == 0 { ".".to_string() } else { value.to_string() })
                .collect();
            writeln!(f, "{}", line.join(" "))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::{Mcts, MctsConfig, MctsError};

    use super::*;

    const SOLVED: &str = "
        534678912
        672195348
        198342567
        859761423
        426853791
        713924856
        961537284
        287419635
        345286179";

    // Two candidates for the first empty cell, both complete the grid.
    const TWO_WAYS: &str = "..34 3412 ..43 4321";

    #[test]
    fn test_parse() -> Result<(), GridError>{
        let grid: SudokuGrid = TWO_WAYS.parse()?;

        assert_eq!(grid.box_size(), 2);
        assert_eq!(grid.side(), 4);
        assert_eq!(grid.get(0, 2), 3);
        assert_eq!(grid.get(2, 0), 0);
        assert_eq!(grid.first_empty(), Some(0));
        assert!(!grid.is_full());
        Ok(())
    }

    #[test]
    fn test_parse_errors(){
        assert_eq!("12x4".parse::<SudokuGrid>(), Err(GridError::InvalidCharacter('x')));
        assert_eq!("12345".parse::<SudokuGrid>(), Err(GridError::NotSquare(5)));
        // 3 × 3 grid: the side is not a square
        assert_eq!("123456789".parse::<SudokuGrid>(), Err(GridError::NotSquare(9)));
        assert_eq!(".........5......".parse::<SudokuGrid>(), Err(GridError::ValueOutOfRange{ value: 5, max: 4 }));
    }

    #[test]
    fn test_new_errors(){
        assert_eq!(SudokuGrid::new(0, vec![]), Err(GridError::InvalidBoxSize(0)));
        assert_eq!(SudokuGrid::new(6, vec![]), Err(GridError::InvalidBoxSize(6)));
        assert_eq!(SudokuGrid::new(2, vec![0; 15]), Err(GridError::CellCount{ expected: 16, actual: 15 }));
    }

    #[test]
    fn test_candidates_and_children() -> Result<(), GridError>{
        let grid: SudokuGrid = TWO_WAYS.parse()?;

        assert_eq!(grid.candidates(0), vec![1, 2]);

        let children = grid.find_children();
        assert_eq!(children.len(), 2);
        for child in &children {
            assert_eq!(child.first_empty(), Some(1));
            assert!(child.get(0, 0) == 1 || child.get(0, 0) == 2);
        }
        Ok(())
    }

    #[test]
    fn test_random_child_is_a_child() -> Result<(), GridError>{
        let grid: SudokuGrid = TWO_WAYS.parse()?;
        let children = grid.find_children();
        let mut rng = crate::utils::rng_from_seed(Some(9));

        for _ in 0..10 {
            assert!(children.contains(&grid.find_random_child(&mut rng)));
        }
        Ok(())
    }

    #[test]
    fn test_full_grid_is_terminal() -> Result<(), GridError>{
        let grid: SudokuGrid = SOLVED.parse()?;

        assert!(grid.is_full());
        assert!(grid.is_valid());
        assert!(grid.is_terminal());
        assert_eq!(grid.reward(), 1.0);
        assert!(grid.find_children().is_empty());
        Ok(())
    }

    #[test]
    fn test_dead_end_is_terminal() -> Result<(), GridError>{
        // the first empty cell sees 1, 2, 3 in its row and 4 in its column
        let grid: SudokuGrid = "123. ...4 .... ....".parse()?;

        assert!(grid.candidates(3).is_empty());
        assert!(grid.is_terminal());
        assert_eq!(grid.reward(), 0.0);
        Ok(())
    }

    #[test]
    fn test_invalid_full_grid_scores_zero() -> Result<(), GridError>{
        let grid: SudokuGrid = "1234 1234 1234 1234".parse()?;

        assert!(grid.is_terminal());
        assert!(!grid.is_valid());
        assert_eq!(grid.reward(), 0.0);
        Ok(())
    }

    #[test]
    fn test_display() -> Result<(), GridError>{
        let grid: SudokuGrid = TWO_WAYS.parse()?;

        assert_eq!(grid.to_string(), ". . 3 4\n3 4 1 2\n. . 4 3\n4 3 2 1\n");
        Ok(())
    }

    #[test]
    fn test_solve_forced_cells() -> Result<(), Box<dyn std::error::Error>>{
        let solved: SudokuGrid = SOLVED.parse()?;

        let mut cells = solved.cells().to_vec();
        for index in [0, 40, 80] {
            cells[index] = 0;
        }
        let grid = SudokuGrid::new(3, cells)?;

        let mut mcts = Mcts::from_config(grid, &MctsConfig::DEFAULT.with_seed(1))?;
        assert_eq!(mcts.solve()?, solved);
        Ok(())
    }

    #[test]
    fn test_solve_with_choice() -> Result<(), Box<dyn std::error::Error>>{
        let grid: SudokuGrid = TWO_WAYS.parse()?;
        let mut mcts = Mcts::from_config(grid, &MctsConfig::DEFAULT.with_seed(17))?;
        let mut moves = 0;

        let solved = mcts.solve_with(|_| moves += 1)?;

        assert_eq!(moves, 4);
        assert!(solved.is_full());
        assert_eq!(solved.reward(), 1.0);
        Ok(())
    }

    #[test]
    fn test_solve_dead_end_fails() -> Result<(), GridError>{
        let grid: SudokuGrid = "123. ...4 .... ....".parse()?;
        let mut mcts = Mcts::new(grid);

        assert_eq!(mcts.solve(), Err(MctsError::TerminalState));
        Ok(())
    }
}
