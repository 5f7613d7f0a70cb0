//! Factor graphs and message passing inference.
//!
//! A factor graph is a bipartite graph of variable nodes and factor nodes
//! representing a factorized joint distribution. This crate builds the graph
//! on top of [`petgraph`], carries [`fg_rv`] random variables as messages on
//! its edges, and drives them with two schedules: a forward/backward tree
//! schedule for exact inference and a flooding schedule for loopy graphs.
//!
//! The named entry points live in [`inference`]: `sum_product`,
//! `max_product`, `max_sum`, `belief_propagation`,
//! `loopy_belief_propagation` and `mean_field`.

pub mod graph;
pub mod inference;
pub mod node;
pub mod schedule;

pub use fg_rv;

/// prelude module bringing the entire public API into scope
#[allow(unused_imports)]
pub mod prelude {
    pub use fg_rv::prelude::*;

    pub use super::{
        graph::{FactorGraph, FactorIndex, VariableIndex},
        inference::{
            belief_propagation, loopy_belief_propagation, max_product, max_sum, mean_field,
            sum_product,
        },
        node::{FNode, Node, VNode},
        schedule::Algorithm,
        Error, Result,
    };
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("edges must join a variable node and a factor node")]
    NotBipartite,
    #[error("the node is not part of the graph")]
    NoSuchNode,
    #[error("the nodes are not connected by an edge")]
    NoSuchEdge,
    #[error("the queried node is not a variable node")]
    QueryNotVariable,
    #[error("the graph contains no variable nodes")]
    NoVariables,
    #[error("the graph contains a cycle, but the tree schedule requires a tree")]
    GraphHasCycle,
    #[error("no factor has been assigned to factor node {0}")]
    FactorNotSet(String),
    #[error("the factor of node {0} is not defined over exactly its adjacent variables")]
    FactorDimsMismatch(String),
    #[error("the observation for variable {0} must be a distribution over exactly that variable")]
    InvalidObservation(String),
    #[error(transparent)]
    RandomVariable(#[from] fg_rv::RandomVariableError),
}

pub type Result<T> = std::result::Result<T, Error>;
