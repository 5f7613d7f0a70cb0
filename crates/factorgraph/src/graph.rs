//! The bipartite factor graph.
//!
//! An undirected graph of [`Node`]s whose edges carry two directed message
//! slots, one per direction. Both slots are initialized to the unity of the
//! incident variable's kind and are overwritten exclusively by the
//! schedules.

use fg_rv::{RandomVariable, VariableId};
use log::debug;
use petgraph::{visit::EdgeRef, Undirected};

use crate::{
    node::{FNode, Node, VNode},
    Error, Result,
};

/// The type used to represent indices into the nodes of the factorgraph.
pub type NodeIndex = petgraph::stable_graph::NodeIndex;
/// The type used to represent indices into the edges of the factorgraph.
pub type EdgeIndex = petgraph::stable_graph::EdgeIndex;
/// A factorgraph is an undirected graph
type Graph = petgraph::stable_graph::StableGraph<Node, Edge, Undirected, u32>;

/// A newtype used to enforce type safety of the indices of the factors in
/// the factorgraph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, derive_more::From)]
pub struct FactorIndex(pub NodeIndex);

/// A newtype used to enforce type safety of the indices of the variables in
/// the factorgraph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, derive_more::From)]
pub struct VariableIndex(pub NodeIndex);

impl VariableIndex {
    /// The dimension id this variable tags tensor axes with.
    #[must_use]
    pub fn id(self) -> VariableId {
        VariableId(self.0.index())
    }
}

impl From<VariableId> for VariableIndex {
    fn from(id: VariableId) -> Self {
        Self(NodeIndex::new(id.0))
    }
}

impl From<VariableIndex> for NodeIndex {
    fn from(index: VariableIndex) -> Self {
        index.0
    }
}

impl From<FactorIndex> for NodeIndex {
    fn from(index: FactorIndex) -> Self {
        index.0
    }
}

/// An edge between a variable node and a factor node, carrying one message
/// slot per direction.
#[derive(Debug)]
struct Edge {
    /// Message flowing from the edge's source endpoint to its target
    /// endpoint, in petgraph's orientation of the undirected edge.
    towards_target: RandomVariable,
    towards_source: RandomVariable,
    /// Whether the stored messages live in the log domain (max-sum).
    logarithmic: bool,
}

/// A factor graph: a bipartite graph consisting of two types of nodes,
/// factors and variables.
#[derive(Debug, Default)]
pub struct FactorGraph {
    /// The underlying graph data structure
    graph: Graph,
    /// The sequence in which variables are inserted is meaningful: it breaks
    /// ties deterministically (default query node, flooding order).
    /// `self.graph` does not capture this ordering, so an extra vector
    /// manages it.
    variable_indices: Vec<NodeIndex>,
    /// List of indices of the factors in the graph, in insertion order.
    factor_indices: Vec<NodeIndex>,
}

impl FactorGraph {
    /// Construct a new empty factorgraph
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(0, 0)
    }

    /// Construct a new empty factorgraph with the specified capacity for
    /// nodes and edges.
    #[must_use]
    pub fn with_capacity(nodes: usize, edges: usize) -> Self {
        Self {
            graph: Graph::with_capacity(nodes, edges),
            variable_indices: Vec::with_capacity(nodes),
            factor_indices: Vec::with_capacity(nodes),
        }
    }

    /// Adds a variable node to the factorgraph, assigning its dimension id.
    /// Returns the index of the variable in the factorgraph.
    pub fn add_variable(&mut self, variable: VNode) -> VariableIndex {
        let node_index = self.graph.add_node(Node::Variable(variable));
        self.variable_indices.push(node_index);
        self.graph[node_index]
            .as_variable_mut()
            .expect("just added the variable to the graph in the previous statement")
            .set_id(VariableId(node_index.index()));
        debug!("added a variable with node_index: {node_index:?} to the factorgraph");
        node_index.into()
    }

    /// Adds a factor node to the factorgraph.
    /// Returns the index of the factor in the factorgraph.
    pub fn add_factor(&mut self, factor: FNode) -> FactorIndex {
        let node_index = self.graph.add_node(Node::Factor(factor));
        self.factor_indices.push(node_index);
        debug!("added a factor with node_index: {node_index:?} to the factorgraph");
        node_index.into()
    }

    /// Connect a variable node and a factor node. The order of the
    /// arguments does not matter, but the edge must join one node of each
    /// type. Both message slots are initialized to the unity of the incident
    /// variable.
    pub fn add_edge(
        &mut self,
        a: impl Into<NodeIndex>,
        b: impl Into<NodeIndex>,
    ) -> Result<EdgeIndex> {
        let (a, b) = (a.into(), b.into());
        let variable = match (self.node(a)?, self.node(b)?) {
            (Node::Variable(v), Node::Factor(_)) | (Node::Factor(_), Node::Variable(v)) => v,
            _ => return Err(Error::NotBipartite),
        };
        let unity = variable.kind().unity(&[variable.id()]);
        self.insert_edge(a, b, unity)
    }

    /// Like [`Self::add_edge`], but with a caller-provided initial message in
    /// both slots. The init is stored as-is; it is the caller's
    /// responsibility that it is a distribution over the incident variable.
    pub fn add_edge_with_init(
        &mut self,
        a: impl Into<NodeIndex>,
        b: impl Into<NodeIndex>,
        init: RandomVariable,
    ) -> Result<EdgeIndex> {
        let (a, b) = (a.into(), b.into());
        match (self.node(a)?, self.node(b)?) {
            (Node::Variable(_), Node::Factor(_)) | (Node::Factor(_), Node::Variable(_)) => {}
            _ => return Err(Error::NotBipartite),
        }
        self.insert_edge(a, b, init)
    }

    fn insert_edge(&mut self, a: NodeIndex, b: NodeIndex, init: RandomVariable) -> Result<EdgeIndex> {
        let edge = Edge {
            towards_target: init.clone(),
            towards_source: init,
            logarithmic: false,
        };
        debug!("added an edge between {a:?} and {b:?}");
        Ok(self.graph.add_edge(a, b, edge))
    }

    pub fn node(&self, index: NodeIndex) -> Result<&Node> {
        self.graph.node_weight(index).ok_or(Error::NoSuchNode)
    }

    pub(crate) fn node_mut(&mut self, index: NodeIndex) -> Result<&mut Node> {
        self.graph.node_weight_mut(index).ok_or(Error::NoSuchNode)
    }

    /// The variable node at `index`.
    pub fn vnode(&self, index: VariableIndex) -> Result<&VNode> {
        self.node(index.0)?
            .as_variable()
            .ok_or(Error::QueryNotVariable)
    }

    /// Mutable access to the variable node at `index`, e.g. to observe it.
    pub fn vnode_mut(&mut self, index: VariableIndex) -> Result<&mut VNode> {
        self.node_mut(index.0)?
            .as_variable_mut()
            .ok_or(Error::QueryNotVariable)
    }

    /// Mutable access to the factor node at `index`, e.g. to assign its
    /// factor before inference begins.
    pub fn fnode_mut(&mut self, index: FactorIndex) -> Result<&mut FNode> {
        self.node_mut(index.0)?
            .as_factor_mut()
            .ok_or(Error::NoSuchNode)
    }

    /// All nodes adjacent to `node`, in edge insertion order.
    #[must_use]
    pub fn neighbors(&self, node: NodeIndex) -> Vec<NodeIndex> {
        let mut neighbors: Vec<NodeIndex> = self.graph.neighbors(node).collect();
        // petgraph yields the most recently connected neighbor first
        neighbors.reverse();
        neighbors
    }

    /// All nodes adjacent to `node` except those in `exclude`.
    #[must_use]
    pub fn neighbors_except(&self, node: NodeIndex, exclude: &[NodeIndex]) -> Vec<NodeIndex> {
        self.neighbors(node)
            .into_iter()
            .filter(|n| !exclude.contains(n))
            .collect()
    }

    /// The current messages on the edges into `node`, except the one sent by
    /// `exclude`.
    pub fn incoming_messages(
        &self,
        node: NodeIndex,
        exclude: Option<NodeIndex>,
    ) -> Result<Vec<RandomVariable>> {
        let mut msgs = Vec::new();
        for neighbor in self.neighbors(node) {
            if Some(neighbor) == exclude {
                continue;
            }
            msgs.push(self.get_message(neighbor, node)?.clone());
        }
        Ok(msgs)
    }

    /// The message currently stored on the directed edge `from -> to`.
    pub fn get_message(&self, from: NodeIndex, to: NodeIndex) -> Result<&RandomVariable> {
        let edge_index = self.graph.find_edge(from, to).ok_or(Error::NoSuchEdge)?;
        let (source, _) = self
            .graph
            .edge_endpoints(edge_index)
            .ok_or(Error::NoSuchEdge)?;
        let edge = self.graph.edge_weight(edge_index).ok_or(Error::NoSuchEdge)?;
        Ok(if source == from {
            &edge.towards_target
        } else {
            &edge.towards_source
        })
    }

    /// Store a message on the directed edge `from -> to`.
    pub fn set_message(
        &mut self,
        from: NodeIndex,
        to: NodeIndex,
        message: RandomVariable,
        logarithmic: bool,
    ) -> Result<()> {
        let edge_index = self.graph.find_edge(from, to).ok_or(Error::NoSuchEdge)?;
        let (source, _) = self
            .graph
            .edge_endpoints(edge_index)
            .ok_or(Error::NoSuchEdge)?;
        let edge = self
            .graph
            .edge_weight_mut(edge_index)
            .ok_or(Error::NoSuchEdge)?;
        if source == from {
            edge.towards_target = message;
        } else {
            edge.towards_source = message;
        }
        edge.logarithmic = logarithmic;
        Ok(())
    }

    /// Whether the messages arriving at `node` live in the log domain.
    pub(crate) fn incoming_logarithmic(&self, node: NodeIndex) -> bool {
        self.graph
            .edges(node)
            .next()
            .is_some_and(|edge| edge.weight().logarithmic)
    }

    /// The belief of the variable node at `index`: the product of all its
    /// incoming messages, optionally normalized.
    pub fn belief(&self, index: VariableIndex, normalize: bool) -> Result<RandomVariable> {
        let vnode = self.vnode(index)?;
        let msgs = self.incoming_messages(index.0, None)?;
        vnode.belief(&msgs, normalize, self.incoming_logarithmic(index.0))
    }

    /// The first variable node by insertion order, used as the
    /// deterministic default query node.
    #[must_use]
    pub fn first_variable(&self) -> Option<VariableIndex> {
        self.variable_indices.first().map(|&i| VariableIndex(i))
    }

    /// The default flooding order: all factor nodes, then all variable
    /// nodes, each in insertion order.
    #[must_use]
    pub fn default_order(&self) -> Vec<NodeIndex> {
        self.factor_indices
            .iter()
            .chain(self.variable_indices.iter())
            .copied()
            .collect()
    }

    /// Verify that every factor is defined over exactly the variables it is
    /// connected to.
    pub fn validate_factors(&self) -> Result<()> {
        for (index, fnode) in self.factors() {
            let mut dims: Vec<VariableId> = fnode.factor()?.dims().to_vec();
            dims.sort_unstable();
            let mut adjacent: Vec<VariableId> = self
                .neighbors(index.0)
                .iter()
                .map(|n| VariableId(n.index()))
                .collect();
            adjacent.sort_unstable();
            if dims != adjacent {
                return Err(Error::FactorDimsMismatch(fnode.label().to_string()));
            }
        }
        Ok(())
    }

    /// Number of nodes in the factorgraph
    ///
    /// **Computes in O(1) time**
    #[must_use]
    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    /// A count over the number of variables and factors in the factorgraph
    ///
    /// **Computes in O(1) time**
    #[must_use]
    pub fn node_count(&self) -> NodeCount {
        NodeCount {
            factors: self.factor_indices.len(),
            variables: self.variable_indices.len(),
        }
    }
}

/// Record type used to keep track of how many factors and variables there
/// are in the factorgraph.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NodeCount {
    pub factors: usize,
    pub variables: usize,
}

/// Iterator over the variables in the factorgraph.
///
/// Iterator element type is `(VariableIndex, &'a VNode)`.
///
/// Created with [`.variables()`][1]
///
/// [1]: FactorGraph::variables
pub struct Variables<'a> {
    graph: &'a Graph,
    variable_indices: std::slice::Iter<'a, NodeIndex>,
}

impl<'a> Iterator for Variables<'a> {
    type Item = (VariableIndex, &'a VNode);

    fn next(&mut self) -> Option<Self::Item> {
        let &index = self.variable_indices.next()?;
        let node = &self.graph[index];
        node.as_variable()
            .map(|variable| (VariableIndex(index), variable))
    }
}

/// Iterator over the factors in the factorgraph.
///
/// Iterator element type is `(FactorIndex, &'a FNode)`.
///
/// Created with [`.factors()`][1]
///
/// [1]: FactorGraph::factors
pub struct Factors<'a> {
    graph: &'a Graph,
    factor_indices: std::slice::Iter<'a, NodeIndex>,
}

impl<'a> Iterator for Factors<'a> {
    type Item = (FactorIndex, &'a FNode);

    fn next(&mut self) -> Option<Self::Item> {
        let &index = self.factor_indices.next()?;
        let node = &self.graph[index];
        node.as_factor().map(|factor| (FactorIndex(index), factor))
    }
}

impl FactorGraph {
    /// Returns an iterator over the variables in the factorgraph, in
    /// insertion order.
    #[inline]
    #[must_use]
    pub fn variables(&self) -> Variables<'_> {
        Variables {
            graph: &self.graph,
            variable_indices: self.variable_indices.iter(),
        }
    }

    /// Returns an iterator over the factors in the factorgraph, in insertion
    /// order.
    #[inline]
    #[must_use]
    pub fn factors(&self) -> Factors<'_> {
        Factors {
            graph: &self.graph,
            factor_indices: self.factor_indices.iter(),
        }
    }
}

impl std::ops::Index<VariableIndex> for FactorGraph {
    type Output = VNode;

    fn index(&self, index: VariableIndex) -> &Self::Output {
        self.graph[index.0]
            .as_variable()
            .expect("a VariableIndex always points at a variable node")
    }
}

impl std::ops::Index<FactorIndex> for FactorGraph {
    type Output = FNode;

    fn index(&self, index: FactorIndex) -> &Self::Output {
        self.graph[index.0]
            .as_factor()
            .expect("a FactorIndex always points at a factor node")
    }
}
