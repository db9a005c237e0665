use std::time::Instant;

use nalgebra::DMatrix;
use num_traits::{Bounded, Zero};
use tracing::trace;

use super::{AssignmentBackend, BackendSolution, SolveStatus};
use crate::error::{MatchError, Result};

const NAME: &str = "hungarian";

/// Munkres' algorithm on a square matrix of bank slots.
///
/// Every bank is expanded into one column per unit of capacity (never more
/// columns than there are seekers), then padded to a square. A real cell
/// costs `1 - weight`, padding costs `1`, so a minimum-cost perfect matching
/// is a maximum-weight capacitated assignment and seekers matched to padding
/// stay unassigned.
#[derive(Debug, Clone, Copy, Default)]
pub struct HungarianBackend;

impl AssignmentBackend for HungarianBackend {
    fn solve(
        &self,
        weights: &DMatrix<f64>,
        capacities: &[usize],
        deadline: Option<Instant>,
    ) -> Result<BackendSolution> {
        let (h, w) = weights.shape();
        if capacities.len() != w {
            return Err(MatchError::solver(
                NAME,
                format!("{} capacities for {w} banks", capacities.len()),
            ));
        }

        let slots: Vec<usize> = capacities
            .iter()
            .enumerate()
            .flat_map(|(bank, &capacity)| std::iter::repeat(bank).take(capacity.min(h)))
            .collect();
        if h == 0 || slots.is_empty() {
            return Ok(BackendSolution::unassigned(h, SolveStatus::Optimal));
        }

        let size = h.max(slots.len());
        let mut costs = DMatrix::from_fn(size, size, |row, col| {
            if row < h && col < slots.len() {
                1. - weights[(row, slots[col])]
            } else {
                1.
            }
        });
        trace!(seekers = h, slots = slots.len(), size, "hungarian matrix built");

        let (stars, status) = munkres(&mut costs, deadline)?;
        let assignment = stars
            .into_iter()
            .take(h)
            .map(|col| col.and_then(|col| slots.get(col).copied()))
            .collect();
        Ok(BackendSolution { assignment, status })
    }

    fn name(&self) -> &str {
        NAME
    }
}

/// Starred and primed zeros plus the current cover.
struct Marks {
    star_in_row: Vec<Option<usize>>,
    star_in_col: Vec<Option<usize>>,
    prime_in_row: Vec<Option<usize>>,
    covered_rows: Vec<bool>,
    covered_cols: Vec<bool>,
    stars: usize,
}

impl Marks {
    fn new(size: usize) -> Self {
        Self {
            star_in_row: vec![None; size],
            star_in_col: vec![None; size],
            prime_in_row: vec![None; size],
            covered_rows: vec![false; size],
            covered_cols: vec![false; size],
            stars: 0,
        }
    }

    fn star(&mut self, row: usize, col: usize) {
        self.star_in_row[row] = Some(col);
        self.star_in_col[col] = Some(row);
    }

    fn recover(&mut self) {
        self.prime_in_row.fill(None);
        self.covered_rows.fill(false);
        for (col, star) in self.star_in_col.iter().enumerate() {
            self.covered_cols[col] = star.is_some();
        }
    }
}

/// Minimum-cost perfect matching of a square cost matrix.
///
/// Returns the matched column per row. The matrix is reduced in place. If
/// `deadline` passes before every row holds a star, the stars found so far
/// are returned as a partial matching.
fn munkres(
    costs: &mut DMatrix<f64>,
    deadline: Option<Instant>,
) -> Result<(Vec<Option<usize>>, SolveStatus)> {
    let (h, w) = costs.shape();
    let mut marks = Marks::new(h);

    // subtract minimum value from each respective row
    costs.row_iter_mut().for_each(|mut r| {
        let min = r.min();
        r.add_scalar_mut(-min)
    });

    // subtract minimum value from each respective col
    costs.column_iter_mut().for_each(|mut c| {
        let min = c.min();
        c.add_scalar_mut(-min);
    });

    // star arbitrary zeroes on distinct rows and columns
    for col in 0..w {
        for row in 0..h {
            if marks.star_in_row[row].is_some() {
                continue;
            }
            if costs[(row, col)].is_zero() {
                marks.star(row, col);
                marks.covered_cols[col] = true;
                marks.stars += 1;
                break;
            }
        }
    }

    loop {
        if marks.stars == h {
            return Ok((marks.star_in_row, SolveStatus::Optimal));
        }
        if deadline.is_some_and(|d| Instant::now() >= d) {
            trace!(stars = marks.stars, size = h, "hungarian deadline reached");
            return Ok((marks.star_in_row, SolveStatus::TimeLimited));
        }

        match uncovered_zero(costs, &marks) {
            Some((row, col)) => match marks.star_in_row[row] {
                Some(star_col) => {
                    marks.covered_cols[star_col] = false;
                    marks.covered_rows[row] = true;
                    marks.prime_in_row[row] = Some(col);
                }
                None => {
                    augment(&mut marks, row, col)?;
                    marks.recover();
                }
            },
            None => shift_by_uncovered_min(costs, &marks),
        }
    }
}

fn uncovered_zero(costs: &DMatrix<f64>, marks: &Marks) -> Option<(usize, usize)> {
    let (h, w) = costs.shape();
    (0..w)
        .filter(|&col| !marks.covered_cols[col])
        .find_map(|col| {
            (0..h)
                .find(|&row| !marks.covered_rows[row] && costs[(row, col)].is_zero())
                .map(|row| (row, col))
        })
}

/// Flips the alternating prime/star path that starts at the primed zero `(row, col)`.
fn augment(marks: &mut Marks, row: usize, col: usize) -> Result<()> {
    let (mut row, mut col) = (row, col);
    loop {
        let displaced = marks.star_in_col[col];
        marks.star(row, col);
        let Some(star_row) = displaced else {
            break;
        };
        let Some(prime_col) = marks.prime_in_row[star_row] else {
            return Err(MatchError::solver(
                NAME,
                format!("starred zero in row {star_row} has no primed partner"),
            ));
        };
        marks.star_in_row[star_row] = None;
        row = star_row;
        col = prime_col;
    }
    marks.stars += 1;
    Ok(())
}

fn shift_by_uncovered_min(costs: &mut DMatrix<f64>, marks: &Marks) {
    let (h, w) = costs.shape();
    let mut min = <f64 as Bounded>::max_value();
    for col in (0..w).filter(|&col| !marks.covered_cols[col]) {
        for row in (0..h).filter(|&row| !marks.covered_rows[row]) {
            min = min.min(costs[(row, col)]);
        }
    }

    // subtract min from all uncovered rows
    costs.row_iter_mut().enumerate().for_each(|(i, mut r)| {
        if !marks.covered_rows[i] {
            r.add_scalar_mut(-min)
        }
    });

    // add min to all covered columns
    costs.column_iter_mut().enumerate().for_each(|(i, mut c)| {
        if marks.covered_cols[i] {
            c.add_scalar_mut(min);
        }
    });
}
