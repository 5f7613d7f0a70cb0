//! Inference entry points.
//!
//! Each function wires a graph, an algorithm and a query node to a schedule
//! and reads the query node's belief back out. The tree-based entry points
//! (`sum_product`, `max_product`, `max_sum`) require an acyclic graph and
//! fail with [`Error::GraphHasCycle`](crate::Error::GraphHasCycle)
//! otherwise; `loopy_belief_propagation` and `mean_field` run on arbitrary
//! graphs.

use std::collections::BTreeMap;

use fg_rv::{Float, RandomVariable};

use crate::{
    graph::{FactorGraph, NodeIndex, VariableIndex},
    schedule::{self, Algorithm},
    Error, Result,
};

/// The belief history of the flooding schedules: per query node, one belief
/// per iteration.
pub type BeliefHistory = BTreeMap<VariableIndex, Vec<RandomVariable>>;

/// The maximizing assignment recovered by back-tracking: per variable node,
/// the index of its MAP state.
pub type MapAssignment = BTreeMap<VariableIndex, usize>;

fn resolve_query(graph: &FactorGraph, query: Option<VariableIndex>) -> Result<VariableIndex> {
    match query {
        Some(query) => {
            graph.vnode(query)?;
            Ok(query)
        }
        None => graph.first_variable().ok_or(Error::NoVariables),
    }
}

/// Compute the marginal of `query` on a tree-structured graph with the
/// sum-product algorithm. Returns the normalized belief of the query node;
/// when `query` is `None` the first variable node by insertion order is
/// used.
pub fn sum_product(
    graph: &mut FactorGraph,
    query: Option<VariableIndex>,
) -> Result<RandomVariable> {
    let query = resolve_query(graph, query)?;
    graph.validate_factors()?;
    schedule::tree_schedule(graph, query.into(), Algorithm::SumProduct)?;
    graph.belief(query, true)
}

/// Belief propagation: an alias for [`sum_product`].
pub fn belief_propagation(
    graph: &mut FactorGraph,
    query: Option<VariableIndex>,
) -> Result<RandomVariable> {
    sum_product(graph, query)
}

/// Compute the setting of the variables with maximum probability on a
/// tree-structured graph. Returns the unnormalized maximum probability at
/// the query node together with the maximizing assignment of every variable
/// reached by back-tracking.
pub fn max_product(
    graph: &mut FactorGraph,
    query: Option<VariableIndex>,
) -> Result<(Float, MapAssignment)> {
    run_map(graph, query, Algorithm::MaxProduct)
}

/// The log-domain analog of [`max_product`]: messages are log masses and
/// the returned maximum is a log probability.
pub fn max_sum(
    graph: &mut FactorGraph,
    query: Option<VariableIndex>,
) -> Result<(Float, MapAssignment)> {
    run_map(graph, query, Algorithm::MaxSum)
}

fn run_map(
    graph: &mut FactorGraph,
    query: Option<VariableIndex>,
    algorithm: Algorithm,
) -> Result<(Float, MapAssignment)> {
    let query = resolve_query(graph, query)?;
    graph.validate_factors()?;
    let backward_path = schedule::tree_schedule(graph, query.into(), algorithm)?;
    let assignment = schedule::back_track(graph, query, &backward_path)?;
    let maximum = graph.belief(query, false)?.max()?;
    Ok((maximum, assignment))
}

/// Approximate the marginals of the `queries` on an arbitrary graph by
/// iterating the flooding schedule. Returns one normalized belief per query
/// node per iteration.
pub fn loopy_belief_propagation(
    graph: &mut FactorGraph,
    iterations: usize,
    queries: &[VariableIndex],
    order: Option<Vec<NodeIndex>>,
) -> Result<BeliefHistory> {
    graph.validate_factors()?;
    schedule::flooding_schedule(graph, Algorithm::SumProduct, iterations, queries, order)
}

/// Approximate the marginals of the `queries` with the mean-field
/// algorithm: variable nodes send their full beliefs, factor nodes send the
/// exponentiated expected log-factor. Discrete graphs only.
pub fn mean_field(
    graph: &mut FactorGraph,
    iterations: usize,
    queries: &[VariableIndex],
    order: Option<Vec<NodeIndex>>,
) -> Result<BeliefHistory> {
    graph.validate_factors()?;
    schedule::flooding_schedule(graph, Algorithm::MeanField, iterations, queries, order)
}
