//! Graph adapter trait and the edge-list graph used to feed it.

use crate::{Error, Result};
use std::collections::HashMap;
use std::hash::Hash;

/// Read-only weighted adjacency view over dense node indices `0..node_count()`.
///
/// This matches the "CSR-style" representation the walk engine relies on:
/// a node has a contiguous neighbor list and a contiguous weight list,
/// with matching indices.
pub trait GraphView {
    fn node_count(&self) -> usize;

    /// Return `(neighbors, weights)` for a node.
    ///
    /// Requirements:
    /// - `neighbors.len() == weights.len()`
    /// - weights are finite and strictly positive
    /// - an unknown node yields two empty slices
    fn neighbors(&self, node: usize) -> (&[usize], &[f64]);

    fn has_node(&self, node: usize) -> bool {
        node < self.node_count()
    }

    fn out_degree(&self, node: usize) -> usize {
        self.neighbors(node).0.len()
    }
}

/// An adjacency-list graph built from labelled edges.
///
/// Node labels are opaque; each distinct label gets a dense index in first-seen order.
/// Neighbor lists are sorted by index.
#[derive(Debug, Clone)]
pub struct EdgeListGraph<N> {
    labels: Vec<N>,
    index: HashMap<N, usize>,
    adj: Vec<Vec<usize>>,
    wts: Vec<Vec<f64>>,
    directed: bool,
}

impl<N: Clone + Eq + Hash> EdgeListGraph<N> {
    pub fn builder(directed: bool, weighted: bool) -> GraphBuilder<N> {
        GraphBuilder::new(directed, weighted)
    }

    pub fn label(&self, node: usize) -> Option<&N> {
        self.labels.get(node)
    }

    pub fn labels(&self) -> &[N] {
        &self.labels
    }

    pub fn index_of(&self, label: &N) -> Option<usize> {
        self.index.get(label).copied()
    }

    pub fn is_directed(&self) -> bool {
        self.directed
    }

    /// Number of stored directed edges (an undirected edge counts twice unless it is a self-loop).
    pub fn edge_count(&self) -> usize {
        self.adj.iter().map(Vec::len).sum()
    }

    /// Weight of `source -> target`, if that edge exists.
    pub fn edge_weight(&self, source: usize, target: usize) -> Option<f64> {
        let nbrs = self.adj.get(source)?;
        nbrs.binary_search(&target).ok().map(|i| self.wts[source][i])
    }
}

impl<N> GraphView for EdgeListGraph<N> {
    fn node_count(&self) -> usize {
        self.adj.len()
    }

    fn neighbors(&self, node: usize) -> (&[usize], &[f64]) {
        let nbrs = self.adj.get(node).map(Vec::as_slice).unwrap_or(&[]);
        let wts = self.wts.get(node).map(Vec::as_slice).unwrap_or(&[]);
        (nbrs, wts)
    }
}

/// Accumulates edges and applies the directed/undirected and weighted/unweighted rules.
///
/// - unweighted: every edge weight is exactly 1, whatever the caller passed
/// - undirected: `(u, v, w)` also inserts `(v, u, w)`
/// - a repeated edge overwrites the weight recorded earlier
#[derive(Debug, Clone)]
pub struct GraphBuilder<N> {
    directed: bool,
    weighted: bool,
    labels: Vec<N>,
    index: HashMap<N, usize>,
    edges: Vec<HashMap<usize, f64>>,
}

impl<N: Clone + Eq + Hash> GraphBuilder<N> {
    pub fn new(directed: bool, weighted: bool) -> Self {
        Self {
            directed,
            weighted,
            labels: Vec::new(),
            index: HashMap::new(),
            edges: Vec::new(),
        }
    }

    /// Register a node; returns its dense index. Adding a node twice is a no-op.
    pub fn add_node(&mut self, label: N) -> usize {
        if let Some(&i) = self.index.get(&label) {
            return i;
        }
        let i = self.labels.len();
        self.index.insert(label.clone(), i);
        self.labels.push(label);
        self.edges.push(HashMap::new());
        i
    }

    pub fn add_edge(&mut self, source: N, target: N) -> &mut Self {
        let u = self.add_node(source);
        let v = self.add_node(target);
        self.insert(u, v, 1.0);
        self
    }

    /// Add an edge with an explicit weight. Unweighted builders record 1 instead.
    pub fn add_weighted_edge(&mut self, source: N, target: N, weight: f64) -> Result<&mut Self> {
        if !weight.is_finite() || weight <= 0.0 {
            return Err(Error::InvalidEdgeWeight(weight));
        }
        let u = self.add_node(source);
        let v = self.add_node(target);
        self.insert(u, v, if self.weighted { weight } else { 1.0 });
        Ok(self)
    }

    fn insert(&mut self, u: usize, v: usize, weight: f64) {
        self.edges[u].insert(v, weight);
        if !self.directed {
            self.edges[v].insert(u, weight);
        }
    }

    pub fn build(self) -> EdgeListGraph<N> {
        let mut adj = Vec::with_capacity(self.edges.len());
        let mut wts = Vec::with_capacity(self.edges.len());
        for out in self.edges {
            let mut pairs: Vec<(usize, f64)> = out.into_iter().collect();
            pairs.sort_unstable_by_key(|&(n, _)| n);
            adj.push(pairs.iter().map(|&(n, _)| n).collect());
            wts.push(pairs.iter().map(|&(_, w)| w).collect());
        }
        EdgeListGraph {
            labels: self.labels,
            index: self.index,
            adj,
            wts,
            directed: self.directed,
        }
    }
}

/// Borrowed-slice snapshot of a `petgraph::Graph`.
///
/// `petgraph` hands out neighbor iterators rather than slices, so the adjacency is
/// copied once. Undirected petgraph graphs report each edge from both endpoints;
/// parallel edges show up as repeated neighbors.
#[cfg(feature = "petgraph")]
#[derive(Debug, Clone)]
pub struct PetgraphView<N, E, Ty, Ix> {
    adj: Vec<Vec<usize>>,
    wts: Vec<Vec<f64>>,
    _marker: std::marker::PhantomData<fn() -> (N, E, Ty, Ix)>,
}

#[cfg(feature = "petgraph")]
impl<N, E, Ty, Ix> PetgraphView<N, E, Ty, Ix>
where
    E: Clone + Into<f64>,
    Ty: petgraph::EdgeType,
    Ix: petgraph::graph::IndexType,
{
    pub fn new(graph: &petgraph::Graph<N, E, Ty, Ix>) -> Self {
        use petgraph::visit::EdgeRef;

        let n = graph.node_count();
        let mut adj = Vec::with_capacity(n);
        let mut wts = Vec::with_capacity(n);
        for node in graph.node_indices() {
            let mut pairs: Vec<(usize, f64)> = graph
                .edges(node)
                .map(|e| {
                    let other = if e.source() == node { e.target() } else { e.source() };
                    (other.index(), e.weight().clone().into())
                })
                .collect();
            pairs.sort_by_key(|&(v, _)| v);
            adj.push(pairs.iter().map(|&(v, _)| v).collect());
            wts.push(pairs.iter().map(|&(_, w)| w).collect());
        }
        Self { adj, wts, _marker: std::marker::PhantomData }
    }
}


#[cfg(feature = "petgraph")]
impl<N, E, Ty, Ix> GraphView for PetgraphView<N, E, Ty, Ix>
where
    Ty: petgraph::EdgeType,
    Ix: petgraph::graph::IndexType,
{
    fn node_count(&self) -> usize {
        self.adj.len()
    }

    fn neighbors(&self, node: usize) -> (&[usize], &[f64]) {
        let nbrs = self.adj.get(node).map(Vec::as_slice).unwrap_or(&[]);
        let wts = self.wts.get(node).map(Vec::as_slice).unwrap_or(&[]);
        (nbrs, wts)
    }
}
