//! Square travel-time matrices (minutes) and the fail-soft builder that
//! fills them from an external service.

mod builder;
mod service;

pub use builder::{CostMatrixBuilder, build_time_matrix};
pub use service::{GoogleDistanceMatrix, TravelTimeService};

use std::ops::Index;

use crate::{Error, Result, constants::SENTINEL_COST};

/// Row-major square matrix of non-negative travel costs.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CostMatrix {
    size: usize,
    cells: Vec<f64>,
}

impl CostMatrix {
    pub fn filled(size: usize, value: f64) -> Self {
        Self {
            size,
            cells: vec![value; size * size],
        }
    }

    pub fn zeros(size: usize) -> Self {
        Self::filled(size, 0.0)
    }

    /// Every edge maximally undesirable.
    pub fn sentinel(size: usize) -> Self {
        Self::filled(size, SENTINEL_COST)
    }

    /// Copies caller rows into a square matrix. Non-finite or negative
    /// cells become the sentinel cost. Ragged input is rejected.
    pub fn from_rows(rows: &[Vec<f64>]) -> Result<Self> {
        let size = rows.len();
        if let Some((idx, row)) = rows.iter().enumerate().find(|(_, r)| r.len() != size) {
            return Err(Error::malformed_matrix(
                size,
                format!("row {idx} has {} cells, expected {size}", row.len()),
            ));
        }

        let mut replaced = 0usize;
        let cells = rows
            .iter()
            .flatten()
            .map(|&v| {
                if v.is_finite() && v >= 0.0 {
                    v
                } else {
                    replaced += 1;
                    SENTINEL_COST
                }
            })
            .collect();

        if replaced > 0 {
            log::warn!("matrix: sanitized cells={replaced} size={size}");
        }

        Ok(Self { size, cells })
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Bounds-checked lookup.
    pub fn cost(&self, from: usize, to: usize) -> Option<f64> {
        if from < self.size && to < self.size {
            Some(self.cells[from * self.size + to])
        } else {
            None
        }
    }

    pub(crate) fn set(&mut self, from: usize, to: usize, value: f64) {
        self.cells[from * self.size + to] = value;
    }

    pub fn is_symmetric(&self) -> bool {
        (0..self.size).all(|i| ((i + 1)..self.size).all(|j| self[(i, j)] == self[(j, i)]))
    }

    pub fn rows(&self) -> Vec<Vec<f64>> {
        self.cells
            .chunks(self.size.max(1))
            .map(<[f64]>::to_vec)
            .collect()
    }
}

impl Index<(usize, usize)> for CostMatrix {
    type Output = f64;

    fn index(&self, (from, to): (usize, usize)) -> &Self::Output {
        &self.cells[from * self.size + to]
    }
}
