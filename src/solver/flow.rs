use std::collections::HashMap;
use std::time::Instant;

use nalgebra::DMatrix;
use rs_graph::linkedlistgraph::Edge as RsEdge;
use rs_graph::mcf::network_simplex;
use rs_graph::traits::FiniteGraph;
use rs_graph::{Buildable, Builder, IndexGraph, LinkedListGraph};
use tracing::trace;

use super::{AssignmentBackend, BackendSolution, SolveStatus};
use crate::error::{MatchError, Result};

const NAME: &str = "flow";

type Flow = i64;

/// Weights become integer arc costs in units of `2^-40`.
///
/// Pair weights are at most `1`, so a network with a million seekers still
/// keeps every path cost far inside `i64`.
const COST_SCALE: f64 = (1u64 << 40) as f64;

struct EdgeLabel {
    lower_bound: Flow,
    upper_bound: Flow,
    cost: Flow,
}

/// Min-cost flow on the seeker/bank network, solved by network simplex.
///
/// The network is `source -> seeker` (capacity 1), `seeker -> bank`
/// (capacity 1, cost `-weight`), `bank -> sink` (the bank's capacity) and a
/// free `source -> sink` bypass that carries every seeker left unassigned.
/// Source and sink are balanced by the number of seekers, so the minimum
/// cost flow is the maximum weight assignment.
///
/// Costs are rounded to multiples of `2^-40`; assignments whose weights
/// differ by less than that may be treated as equal. Network simplex cannot
/// be interrupted, so the deadline is only checked before the network is
/// built.
#[derive(Debug, Clone, Copy, Default)]
pub struct FlowBackend;

impl AssignmentBackend for FlowBackend {
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
        if h == 0 || capacities.iter().all(|&c| c == 0) {
            return Ok(BackendSolution::unassigned(h, SolveStatus::Optimal));
        }
        if deadline.is_some_and(|d| Instant::now() >= d) {
            trace!("flow deadline passed before solving");
            return Ok(BackendSolution::unassigned(h, SolveStatus::TimeLimited));
        }

        let seekers = Flow::try_from(h)
            .map_err(|_| MatchError::solver(NAME, format!("{h} seekers exceed the flow range")))?;

        let mut builder = LinkedListGraph::<u32>::new_builder();
        let source = builder.add_node();
        let sink = builder.add_node();
        let seeker_nodes: Vec<_> = (0..h).map(|_| builder.add_node()).collect();
        let bank_nodes: Vec<_> = (0..w).map(|_| builder.add_node()).collect();

        let mut edges: HashMap<RsEdge, EdgeLabel> = HashMap::new();
        // (edge, seeker position, bank position) of every assignment arc
        let mut pairs = Vec::new();

        for &node in &seeker_nodes {
            edges.insert(
                builder.add_edge(source, node),
                EdgeLabel {
                    lower_bound: 0,
                    upper_bound: 1,
                    cost: 0,
                },
            );
        }
        for (col, &node) in bank_nodes.iter().enumerate() {
            let capacity = capacities[col].min(h);
            if capacity == 0 {
                continue;
            }
            edges.insert(
                builder.add_edge(node, sink),
                EdgeLabel {
                    lower_bound: 0,
                    upper_bound: capacity as Flow,
                    cost: 0,
                },
            );
            for (row, &seeker) in seeker_nodes.iter().enumerate() {
                let edge = builder.add_edge(seeker, node);
                edges.insert(
                    edge,
                    EdgeLabel {
                        lower_bound: 0,
                        upper_bound: 1,
                        cost: -scaled(weights[(row, col)]),
                    },
                );
                pairs.push((edge, row, col));
            }
        }
        edges.insert(
            builder.add_edge(source, sink),
            EdgeLabel {
                lower_bound: 0,
                upper_bound: seekers,
                cost: 0,
            },
        );
        let graph = builder.into_graph();
        trace!(
            nodes = graph.num_nodes(),
            edges = graph.num_edges(),
            "flow network built"
        );

        let balance = |n| {
            if n == source {
                seekers
            } else if n == sink {
                -seekers
            } else {
                0
            }
        };

        let (_, flow) = network_simplex(
            &graph,
            balance,
            |e| edges[&e].lower_bound,
            |e| edges[&e].upper_bound,
            |e| edges[&e].cost,
        )
        .ok_or_else(|| MatchError::solver(NAME, "network simplex ended without an optimal solution"))?;

        let mut assignment = vec![None; h];
        for &(edge, row, col) in &pairs {
            if flow[graph.edge_id(edge)].1 > 0 {
                assignment[row] = Some(col);
            }
        }
        Ok(BackendSolution {
            assignment,
            status: SolveStatus::Optimal,
        })
    }

    fn name(&self) -> &str {
        NAME
    }
}

fn scaled(weight: f64) -> Flow {
    (weight * COST_SCALE).round() as Flow
}
