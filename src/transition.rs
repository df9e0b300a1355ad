//! Second-order (node2vec) transition model.
//!
//! For a walk that just moved `t -> v`, the next node `x` among `v`'s neighbors is drawn with
//! unnormalised weight
//!
//! - `w(v, x) / p` if `x == t` (return),
//! - `w(v, x)`     if `t -> x` is an edge (distance 1 from `t`),
//! - `w(v, x) / q` otherwise (distance 2, outward).
//!
//! Two samplers share this rule: [`TransitionModel`] compiles every first-step and every
//! per-edge distribution into alias tables up front (O(1) per step), while [`OnTheFlyModel`]
//! recomputes the weights of the current edge at every step and keeps no tables.

use crate::alias::AliasTable;
use crate::graph::GraphView;
use crate::{Error, Result};
use rand::Rng;
use std::ops::Range;
use tracing::debug;

/// Return (`p`) and in-out (`q`) parameters, both finite and strictly positive.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Bias {
    p: f64,
    q: f64,
}

impl Bias {
    pub fn new(p: f64, q: f64) -> Result<Self> {
        check_positive("p", p)?;
        check_positive("q", q)?;
        Ok(Self { p, q })
    }

    pub fn p(&self) -> f64 {
        self.p
    }

    pub fn q(&self) -> f64 {
        self.q
    }
}

impl Default for Bias {
    fn default() -> Self {
        Self { p: 1.0, q: 1.0 }
    }
}

pub(crate) fn check_positive(name: &'static str, value: f64) -> Result<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(Error::InvalidHyperparameter { name, value })
    }
}

/// Immutable CSR snapshot of a [`GraphView`] with every neighbor list sorted by index.
///
/// Edges are numbered `0..edge_count()` in (source, target) order; an edge id is what the
/// samplers use to find the conditioned table of the edge a walk just traversed.
#[derive(Debug, Clone)]
pub struct Adjacency {
    offsets: Vec<usize>,
    targets: Vec<usize>,
    weights: Vec<f64>,
}

impl Adjacency {
    /// Copy and validate a graph view.
    ///
    /// Fails with [`Error::MissingNode`] if a neighbor lies outside `0..node_count()` and with
    /// [`Error::InvalidEdgeWeight`] on a weight that is not finite and positive.
    pub fn from_view<G: GraphView + ?Sized>(graph: &G) -> Result<Self> {
        let n = graph.node_count();
        let mut offsets = Vec::with_capacity(n + 1);
        let mut targets = Vec::new();
        let mut weights = Vec::new();
        let mut pairs: Vec<(usize, f64)> = Vec::new();

        offsets.push(0);
        for v in 0..n {
            let (nbrs, wts) = graph.neighbors(v);
            debug_assert_eq!(nbrs.len(), wts.len());

            pairs.clear();
            for (&x, &w) in nbrs.iter().zip(wts) {
                if x >= n {
                    return Err(Error::MissingNode(x));
                }
                if !w.is_finite() || w <= 0.0 {
                    return Err(Error::InvalidEdgeWeight(w));
                }
                pairs.push((x, w));
            }
            pairs.sort_by_key(|&(x, _)| x);

            targets.extend(pairs.iter().map(|&(x, _)| x));
            weights.extend(pairs.iter().map(|&(_, w)| w));
            offsets.push(targets.len());
        }

        Ok(Self { offsets, targets, weights })
    }

    pub fn edge_count(&self) -> usize {
        self.targets.len()
    }

    /// Edge ids leaving `node`; empty for an unknown node.
    pub fn edge_range(&self, node: usize) -> Range<usize> {
        match (self.offsets.get(node), self.offsets.get(node + 1)) {
            (Some(&start), Some(&end)) => start..end,
            _ => 0..0,
        }
    }

    pub fn edge_target(&self, edge: usize) -> usize {
        self.targets[edge]
    }

    /// Id of the edge `source -> target`, if present.
    pub fn find_edge(&self, source: usize, target: usize) -> Option<usize> {
        let range = self.edge_range(source);
        let start = range.start;
        self.targets[range]
            .binary_search(&target)
            .ok()
            .map(|i| start + i)
    }
}

impl GraphView for Adjacency {
    fn node_count(&self) -> usize {
        self.offsets.len() - 1
    }

    fn neighbors(&self, node: usize) -> (&[usize], &[f64]) {
        let range = self.edge_range(node);
        (&self.targets[range.clone()], &self.weights[range])
    }
}

/// Fill `out` with the unnormalised node2vec weights over `cur`'s neighbors, given the
/// walk arrived at `cur` from `prev`.
///
/// Membership of `x` in `prev`'s neighborhood is a merge over the two sorted lists, so one
/// call costs O(deg(cur) + deg(prev)).
pub fn second_order_weights(
    adj: &Adjacency,
    prev: usize,
    cur: usize,
    bias: Bias,
    out: &mut Vec<f64>,
) {
    let (cur_nbrs, cur_wts) = adj.neighbors(cur);
    let (prev_nbrs, _) = adj.neighbors(prev);

    out.clear();
    let mut j = 0usize;
    for (&x, &w) in cur_nbrs.iter().zip(cur_wts) {
        while j < prev_nbrs.len() && prev_nbrs[j] < x {
            j += 1;
        }
        let weight = if x == prev {
            w / bias.p
        } else if j < prev_nbrs.len() && prev_nbrs[j] == x {
            w
        } else {
            w / bias.q
        };
        out.push(weight);
    }
}

/// One move of a walk: the node reached and the id of the edge used to reach it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Step {
    pub node: usize,
    pub edge: usize,
}

/// Draws walk steps. `None` means the current node has no outgoing edge.
pub trait TransitionSampler {
    fn adjacency(&self) -> &Adjacency;

    fn bias(&self) -> Bias;

    /// First move from `start`, proportional to outgoing edge weights.
    fn first_step<R: Rng + ?Sized>(&self, start: usize, rng: &mut R) -> Option<Step>;

    /// Next move after arriving via `arrived` from `prev`.
    ///
    /// `scratch` is a per-walk buffer; samplers that keep no tables use it for weights.
    fn next_step<R: Rng + ?Sized>(
        &self,
        prev: usize,
        arrived: Step,
        scratch: &mut Vec<f64>,
        rng: &mut R,
    ) -> Option<Step>;
}

/// Precomputed alias tables: one per node with outgoing edges, one per edge `(t, v)` whose
/// target `v` has outgoing edges.
#[derive(Debug, Clone)]
pub struct TransitionModel {
    adj: Adjacency,
    bias: Bias,
    node_tables: Vec<Option<AliasTable>>,
    edge_tables: Vec<Option<AliasTable>>,
}

impl TransitionModel {
    pub fn new<G: GraphView + ?Sized>(graph: &G, bias: Bias) -> Result<Self> {
        let adj = Adjacency::from_view(graph)?;
        let n = adj.node_count();

        let node_tables = (0..n)
            .map(|v| first_step_table(&adj, v))
            .collect::<Result<Vec<_>>>()?;

        let mut edge_tables = Vec::with_capacity(adj.edge_count());
        let mut buf = Vec::new();
        for t in 0..n {
            edge_tables.extend(conditioned_tables(&adj, bias, t, &mut buf)?);
        }

        let model = Self { adj, bias, node_tables, edge_tables };
        debug!(
            nodes = n,
            edges = model.adj.edge_count(),
            tables = model.table_count(),
            p = bias.p,
            q = bias.q,
            "built transition model"
        );
        Ok(model)
    }

    /// Same tables as [`TransitionModel::new`], built data-parallel over source nodes.
    #[cfg(feature = "parallel")]
    pub fn new_parallel<G: GraphView + ?Sized>(graph: &G, bias: Bias) -> Result<Self> {
        use rayon::prelude::*;

        let adj = Adjacency::from_view(graph)?;
        let n = adj.node_count();

        let node_tables = (0..n)
            .into_par_iter()
            .map(|v| first_step_table(&adj, v))
            .collect::<Result<Vec<_>>>()?;

        let per_node = (0..n)
            .into_par_iter()
            .map_init(Vec::new, |buf, t| conditioned_tables(&adj, bias, t, buf))
            .collect::<Result<Vec<_>>>()?;
        let edge_tables: Vec<Option<AliasTable>> = per_node.into_iter().flatten().collect();

        let model = Self { adj, bias, node_tables, edge_tables };
        debug!(
            nodes = n,
            edges = model.adj.edge_count(),
            tables = model.table_count(),
            "built transition model (parallel)"
        );
        Ok(model)
    }

    /// First-step distribution of `node`; `None` for a node with no outgoing edge.
    pub fn node_table(&self, node: usize) -> Option<&AliasTable> {
        self.node_tables.get(node)?.as_ref()
    }

    /// Distribution over `cur`'s neighbors after traversing `prev -> cur`.
    pub fn edge_table(&self, prev: usize, cur: usize) -> Option<&AliasTable> {
        let edge = self.adj.find_edge(prev, cur)?;
        self.edge_tables[edge].as_ref()
    }

    /// Total number of alias tables held.
    pub fn table_count(&self) -> usize {
        self.node_tables.iter().flatten().count() + self.edge_tables.iter().flatten().count()
    }
}

fn first_step_table(adj: &Adjacency, node: usize) -> Result<Option<AliasTable>> {
    let (nbrs, wts) = adj.neighbors(node);
    if nbrs.is_empty() {
        return Ok(None);
    }
    AliasTable::new(wts).map(Some)
}

fn conditioned_tables(
    adj: &Adjacency,
    bias: Bias,
    prev: usize,
    buf: &mut Vec<f64>,
) -> Result<Vec<Option<AliasTable>>> {
    adj.edge_range(prev)
        .map(|e| {
            let cur = adj.edge_target(e);
            if adj.out_degree(cur) == 0 {
                return Ok(None);
            }
            second_order_weights(adj, prev, cur, bias, buf);
            AliasTable::new(buf).map(Some)
        })
        .collect()
}

impl TransitionSampler for TransitionModel {
    fn adjacency(&self) -> &Adjacency {
        &self.adj
    }

    fn bias(&self) -> Bias {
        self.bias
    }

    fn first_step<R: Rng + ?Sized>(&self, start: usize, rng: &mut R) -> Option<Step> {
        let table = self.node_table(start)?;
        let edge = self.adj.edge_range(start).start + table.sample(rng);
        Some(Step { node: self.adj.edge_target(edge), edge })
    }

    fn next_step<R: Rng + ?Sized>(
        &self,
        _prev: usize,
        arrived: Step,
        _scratch: &mut Vec<f64>,
        rng: &mut R,
    ) -> Option<Step> {
        let table = self.edge_tables.get(arrived.edge)?.as_ref()?;
        let edge = self.adj.edge_range(arrived.node).start + table.sample(rng);
        Some(Step { node: self.adj.edge_target(edge), edge })
    }
}

/// Table-free sampler: weights are recomputed for every step and drawn by inverse CDF.
///
/// Memory is O(V + E) instead of O(sum of squared degrees); each step costs
/// O(deg(cur) + deg(prev)). The step distribution is the same as [`TransitionModel`]'s, but
/// the two consume randomness differently, so equal seeds do not give equal corpora across
/// samplers.
#[derive(Debug, Clone)]
pub struct OnTheFlyModel {
    adj: Adjacency,
    bias: Bias,
}

impl OnTheFlyModel {
    pub fn new<G: GraphView + ?Sized>(graph: &G, bias: Bias) -> Result<Self> {
        let adj = Adjacency::from_view(graph)?;
        debug!(
            nodes = adj.node_count(),
            edges = adj.edge_count(),
            "prepared on-the-fly transition sampler"
        );
        Ok(Self { adj, bias })
    }
}

impl TransitionSampler for OnTheFlyModel {
    fn adjacency(&self) -> &Adjacency {
        &self.adj
    }

    fn bias(&self) -> Bias {
        self.bias
    }

    fn first_step<R: Rng + ?Sized>(&self, start: usize, rng: &mut R) -> Option<Step> {
        let (nbrs, wts) = self.adj.neighbors(start);
        if nbrs.is_empty() {
            return None;
        }
        let edge = self.adj.edge_range(start).start + sample_cdf(rng, wts);
        Some(Step { node: self.adj.edge_target(edge), edge })
    }

    fn next_step<R: Rng + ?Sized>(
        &self,
        prev: usize,
        arrived: Step,
        scratch: &mut Vec<f64>,
        rng: &mut R,
    ) -> Option<Step> {
        let cur = arrived.node;
        if self.adj.out_degree(cur) == 0 {
            return None;
        }
        second_order_weights(&self.adj, prev, cur, self.bias, scratch);
        let edge = self.adj.edge_range(cur).start + sample_cdf(rng, scratch);
        Some(Step { node: self.adj.edge_target(edge), edge })
    }
}

fn sample_cdf<R: Rng + ?Sized>(rng: &mut R, weights: &[f64]) -> usize {
    debug_assert!(!weights.is_empty());
    if weights.len() == 1 {
        return 0;
    }

    let sum = weights.iter().sum::<f64>();
    if !(sum > 0.0) {
        return rng.random_range(0..weights.len());
    }

    let mut r = rng.random::<f64>() * sum;
    for (i, &w) in weights.iter().enumerate() {
        if r < w {
            return i;
        }
        r -= w;
    }
    weights.len() - 1
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::EdgeListGraph;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn assert_close(a: f64, b: f64, eps: f64) {
        assert!((a - b).abs() <= eps, "expected |{a} - {b}| <= {eps}");
    }

    fn undirected(edges: &[(u32, u32)]) -> EdgeListGraph<u32> {
        let mut b = EdgeListGraph::builder(false, false);
        for &(u, v) in edges {
            b.add_edge(u, v);
        }
        b.build()
    }

    #[test]
    fn bias_rejects_non_positive_and_non_finite() {
        assert!(Bias::new(1.0, 1.0).is_ok());
        assert!(matches!(
            Bias::new(0.0, 1.0),
            Err(Error::InvalidHyperparameter { name: "p", .. })
        ));
        assert!(matches!(
            Bias::new(1.0, -2.0),
            Err(Error::InvalidHyperparameter { name: "q", .. })
        ));
        assert!(Bias::new(f64::NAN, 1.0).is_err());
        assert!(Bias::new(1.0, f64::INFINITY).is_err());
    }

    #[test]
    fn weights_split_into_return_common_and_outward() {
        // 0 -- 1, 1 -- 2, 1 -- 3, 0 -- 2: at cur=1 from prev=0,
        // x=0 returns, x=2 is shared with 0, x=3 is outward.
        let g = undirected(&[(0, 1), (1, 2), (1, 3), (0, 2)]);
        let adj = Adjacency::from_view(&g).unwrap();
        let bias = Bias::new(2.0, 4.0).unwrap();

        let mut out = Vec::new();
        second_order_weights(&adj, 0, 1, bias, &mut out);
        assert_eq!(adj.neighbors(1).0, &[0, 2, 3]);
        assert_eq!(out, vec![0.5, 1.0, 0.25]);
    }

    #[test]
    fn weights_scale_edge_weights() {
        let mut b = EdgeListGraph::builder(false, true);
        b.add_weighted_edge(0u32, 1, 3.0).unwrap();
        b.add_weighted_edge(1, 2, 6.0).unwrap();
        let g = b.build();
        let adj = Adjacency::from_view(&g).unwrap();

        let mut out = Vec::new();
        second_order_weights(&adj, 0, 1, Bias::new(0.5, 2.0).unwrap(), &mut out);
        assert_eq!(out, vec![6.0, 3.0]);
    }

    #[test]
    fn directed_common_neighbor_uses_prev_out_edges() {
        // 0 -> 1, 1 -> 2, 1 -> 3, 0 -> 2 (and 3 -> 0, which must not make 3 "common").
        let mut b = EdgeListGraph::builder(true, false);
        b.add_edge(0u32, 1).add_edge(1, 2).add_edge(1, 3).add_edge(0, 2).add_edge(3, 0);
        let g = b.build();
        let adj = Adjacency::from_view(&g).unwrap();

        let mut out = Vec::new();
        second_order_weights(&adj, 0, 1, Bias::new(1.0, 2.0).unwrap(), &mut out);
        assert_eq!(out, vec![1.0, 0.5]);
    }

    #[test]
    fn conditioned_table_matches_line_graph_probabilities() {
        // 0 -- 1 -- 2 with p=0.5, q=2: from 0 at 1, weights [1/p, 1/q] => [0.8, 0.2].
        let g = undirected(&[(0, 1), (1, 2)]);
        let model = TransitionModel::new(&g, Bias::new(0.5, 2.0).unwrap()).unwrap();

        let t = model.edge_table(0, 1).unwrap();
        assert_close(t.probability(0), 0.8, 1e-12);
        assert_close(t.probability(1), 0.2, 1e-12);

        let t = model.edge_table(2, 1).unwrap();
        assert_close(t.probability(0), 0.2, 1e-12);
        assert_close(t.probability(1), 0.8, 1e-12);

        assert!(model.edge_table(0, 2).is_none());
        // 3 node tables + 4 directed edges.
        assert_eq!(model.table_count(), 7);
    }

    #[test]
    fn zero_outdegree_nodes_get_no_tables() {
        let mut b = EdgeListGraph::builder(true, false);
        b.add_edge(0u32, 1);
        b.add_node(2);
        let g = b.build();
        let model = TransitionModel::new(&g, Bias::default()).unwrap();

        assert!(model.node_table(0).is_some());
        assert!(model.node_table(1).is_none());
        assert!(model.node_table(2).is_none());
        assert!(model.edge_table(0, 1).is_none());

        let mut rng = ChaCha8Rng::seed_from_u64(0);
        assert_eq!(model.first_step(1, &mut rng), None);
        let step = model.first_step(0, &mut rng).unwrap();
        assert_eq!(step, Step { node: 1, edge: 0 });
        assert_eq!(model.next_step(0, step, &mut Vec::new(), &mut rng), None);
    }

    #[test]
    fn adjacency_rejects_out_of_range_neighbor() {
        struct Broken;
        impl GraphView for Broken {
            fn node_count(&self) -> usize {
                1
            }
            fn neighbors(&self, _node: usize) -> (&[usize], &[f64]) {
                (&[5][..], &[1.0][..])
            }
        }
        assert!(matches!(
            Adjacency::from_view(&Broken),
            Err(Error::MissingNode(5))
        ));
    }

    #[test]
    fn on_the_fly_and_precomputed_agree_in_distribution() {
        // Star with an extra chord: center 0, leaves 1..=3, chord 1 -- 2.
        let g = undirected(&[(0, 1), (0, 2), (0, 3), (1, 2)]);
        let bias = Bias::new(0.25, 4.0).unwrap();
        let pre = TransitionModel::new(&g, bias).unwrap();
        let otf = OnTheFlyModel::new(&g, bias).unwrap();

        let arrived = Step { node: 0, edge: pre.adjacency().find_edge(1, 0).unwrap() };
        let trials = 50_000usize;
        let mut a = [0usize; 4];
        let mut b = [0usize; 4];
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let mut scratch = Vec::new();
        for _ in 0..trials {
            a[pre.next_step(1, arrived, &mut scratch, &mut rng).unwrap().node] += 1;
            b[otf.next_step(1, arrived, &mut scratch, &mut rng).unwrap().node] += 1;
        }

        // From 1 at 0: x=1 -> 1/p = 4, x=2 common -> 1, x=3 outward -> 1/q = 0.25.
        let expected = [0.0, 4.0 / 5.25, 1.0 / 5.25, 0.25 / 5.25];
        for x in 0..4 {
            assert_close(a[x] as f64 / trials as f64, expected[x], 0.01);
            assert_close(b[x] as f64 / trials as f64, expected[x], 0.01);
        }
    }
}
