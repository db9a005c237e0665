//! Utility ceiling when capacities are ignored.

use nalgebra::DMatrix;

/// Sum over seekers of their best weight; zero when there are no banks.
pub fn global_bound(weights: &DMatrix<f64>) -> f64 {
    if weights.ncols() == 0 {
        return 0.;
    }
    weights.row_iter().map(|r| r.max()).sum()
}

/// Position of each seeker's top-weight bank, lowest position on ties.
pub fn best_banks(weights: &DMatrix<f64>) -> Vec<Option<usize>> {
    weights
        .row_iter()
        .map(|r| {
            r.iter()
                .enumerate()
                .fold(None, |best: Option<(usize, f64)>, (col, &w)| match best {
                    Some((_, top)) if top >= w => best,
                    _ => Some((col, w)),
                })
                .map(|(col, _)| col)
        })
        .collect()
}

/// Bank positions chosen first by more seekers than they can take.
///
/// When this is empty every seeker can have its top-weight bank and the
/// capacitated optimum reaches [`global_bound`].
pub fn contended_banks(weights: &DMatrix<f64>, capacities: &[usize]) -> Vec<usize> {
    let mut demand = vec![0usize; weights.ncols()];
    for col in best_banks(weights).into_iter().flatten() {
        demand[col] += 1;
    }
    demand
        .iter()
        .zip(capacities)
        .enumerate()
        .filter(|&(_, (&wanted, &capacity))| wanted > capacity)
        .map(|(col, _)| col)
        .collect()
}
