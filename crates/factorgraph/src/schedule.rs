//! Message passing schedules.
//!
//! Two schedules drive the node operators: the forward/backward tree
//! schedule computes exact single-pass beliefs on acyclic graphs, the
//! flooding schedule iterates Gauss–Seidel style sweeps for loopy graphs.
//! Both are single-threaded and synchronous; every message write happens
//! inside one schedule run.

use std::collections::{BTreeMap, HashSet};

use fg_rv::{RandomVariable, VariableId};
use log::debug;

use crate::{
    graph::{FactorGraph, NodeIndex, VariableIndex},
    node::Node,
    Error, Result,
};

/// The message passing algorithm a schedule runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Algorithm {
    /// Sum-product: exact marginals on trees.
    SumProduct,
    /// Max-product: MAP assignments via product-then-maximize.
    MaxProduct,
    /// Max-sum: the log-domain analog of max-product.
    MaxSum,
    /// Mean-field: variational approximation on loopy graphs.
    MeanField,
}

impl Algorithm {
    /// Whether this algorithm's messages live in the log domain.
    #[must_use]
    pub fn is_logarithmic(self) -> bool {
        matches!(self, Self::MaxSum)
    }
}

/// Compute the message `from -> to` with the operator of `algorithm`,
/// reading the current messages on the edges into `from`.
fn node_message(
    graph: &mut FactorGraph,
    from: NodeIndex,
    to: NodeIndex,
    algorithm: Algorithm,
) -> Result<RandomVariable> {
    // the mean-field message of a variable node is its full belief, so the
    // target's own message is not excluded there
    let exclude = if algorithm == Algorithm::MeanField && graph.node(from)?.is_variable() {
        None
    } else {
        Some(to)
    };
    let msgs = graph.incoming_messages(from, exclude)?;
    let target = VariableId(to.index());
    match graph.node_mut(from)? {
        Node::Variable(vnode) => match algorithm {
            Algorithm::SumProduct => vnode.spa(&msgs),
            Algorithm::MaxProduct => vnode.mpa(&msgs),
            Algorithm::MaxSum => vnode.msa(&msgs),
            Algorithm::MeanField => vnode.mf(&msgs),
        },
        Node::Factor(fnode) => match algorithm {
            Algorithm::SumProduct => fnode.spa(target, &msgs),
            Algorithm::MaxProduct => fnode.mpa(target, &msgs),
            Algorithm::MaxSum => fnode.msa(target, &msgs),
            Algorithm::MeanField => fnode.mf(target, &msgs),
        },
    }
}

/// The rooted depth-first edge list of the graph: `(parent, child)` pairs in
/// discovery order.
///
/// Fails with [`Error::GraphHasCycle`] when the depth-first search meets an
/// already visited node, since the tree schedule is only exact on acyclic
/// graphs.
pub fn dfs_edges(
    graph: &FactorGraph,
    root: NodeIndex,
) -> Result<Vec<(NodeIndex, NodeIndex)>> {
    struct Frame {
        node: NodeIndex,
        parent: Option<NodeIndex>,
        neighbors: Vec<NodeIndex>,
        next: usize,
        parent_skipped: bool,
    }

    let mut visited = HashSet::from([root]);
    let mut edges = Vec::new();
    let mut stack = vec![Frame {
        node: root,
        parent: None,
        neighbors: graph.neighbors(root),
        next: 0,
        parent_skipped: false,
    }];
    while let Some(frame) = stack.last_mut() {
        if frame.next >= frame.neighbors.len() {
            stack.pop();
            continue;
        }
        let neighbor = frame.neighbors[frame.next];
        frame.next += 1;
        // the edge back to the parent is skipped exactly once; meeting the
        // parent again means a parallel edge, i.e. a cycle
        if Some(neighbor) == frame.parent && !frame.parent_skipped {
            frame.parent_skipped = true;
            continue;
        }
        if !visited.insert(neighbor) {
            return Err(Error::GraphHasCycle);
        }
        let node = frame.node;
        edges.push((node, neighbor));
        stack.push(Frame {
            node: neighbor,
            parent: Some(node),
            neighbors: graph.neighbors(neighbor),
            next: 0,
            parent_skipped: false,
        });
    }
    Ok(edges)
}

/// Run the two-phase tree schedule rooted at `root`: a forward phase from
/// the leaves towards the root, then a backward phase outward again. After
/// both phases every directed edge reachable from the root carries its
/// converged message exactly once.
///
/// Returns the backward path (the depth-first edge list), which the
/// max-product back-tracking pass walks afterwards.
pub fn tree_schedule(
    graph: &mut FactorGraph,
    root: NodeIndex,
    algorithm: Algorithm,
) -> Result<Vec<(NodeIndex, NodeIndex)>> {
    let backward_path = dfs_edges(graph, root)?;
    let logarithmic = algorithm.is_logarithmic();
    debug!(
        "tree schedule: {algorithm:?} over {} edges rooted at {root:?}",
        backward_path.len()
    );
    for (parent, child) in backward_path.iter().rev() {
        let message = node_message(graph, *child, *parent, algorithm)?;
        graph.set_message(*child, *parent, message, logarithmic)?;
    }
    for (parent, child) in &backward_path {
        let message = node_message(graph, *parent, *child, algorithm)?;
        graph.set_message(*parent, *child, message, logarithmic)?;
    }
    Ok(backward_path)
}

/// Recover the maximizing assignment after a max-product or max-sum tree
/// pass: the root takes the mode of its own belief, every other variable
/// takes the state its downstream factor recorded while collapsing it.
pub fn back_track(
    graph: &FactorGraph,
    root: VariableIndex,
    backward_path: &[(NodeIndex, NodeIndex)],
) -> Result<BTreeMap<VariableIndex, usize>> {
    let mut assignment = BTreeMap::new();
    let msgs = graph.incoming_messages(root.0, None)?;
    let logarithmic = graph.incoming_logarithmic(root.0);
    assignment.insert(root, graph.vnode(root)?.argmax(&msgs, logarithmic)?);
    for (parent, child) in backward_path {
        if let Node::Factor(fnode) = graph.node(*child)? {
            if let Some(record) = fnode.record_for(VariableId(parent.index())) {
                for (&variable, &state) in record {
                    assignment.insert(variable.into(), state);
                }
            }
        }
    }
    Ok(assignment)
}

/// Run the flooding schedule: `iterations` sweeps over `order` (default:
/// all factor nodes, then all variable nodes), updating every outgoing
/// message of the visited node from the messages currently stored. Writes
/// become visible within the same sweep.
///
/// Returns, for every query node, its belief after each sweep.
pub fn flooding_schedule(
    graph: &mut FactorGraph,
    algorithm: Algorithm,
    iterations: usize,
    queries: &[VariableIndex],
    order: Option<Vec<NodeIndex>>,
) -> Result<BTreeMap<VariableIndex, Vec<RandomVariable>>> {
    let order = order.unwrap_or_else(|| graph.default_order());
    let logarithmic = algorithm.is_logarithmic();
    let mut history: BTreeMap<VariableIndex, Vec<RandomVariable>> =
        queries.iter().map(|q| (*q, Vec::new())).collect();
    for iteration in 0..iterations {
        debug!("flooding schedule: {algorithm:?} iteration {iteration}");
        for &node in &order {
            for neighbor in graph.neighbors(node) {
                let message = node_message(graph, node, neighbor, algorithm)?;
                graph.set_message(node, neighbor, message, logarithmic)?;
            }
        }
        for query in queries {
            let belief = graph.belief(*query, true)?;
            if let Some(beliefs) = history.get_mut(query) {
                beliefs.push(belief);
            }
        }
    }
    Ok(history)
}
