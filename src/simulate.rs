//! Walk simulation: `num_walks` shuffled passes over the start nodes, one walk per node per pass.

use crate::corpus::Corpus;
use crate::graph::GraphView;
use crate::transition::{check_positive, Bias, OnTheFlyModel, TransitionModel, TransitionSampler};
use crate::{Error, Result};
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct WalkConfig {
    /// Maximum walk length (in nodes).
    pub walk_length: usize,
    /// Number of passes over the start nodes (walks per node).
    pub num_walks: usize,
    /// Return parameter.
    pub p: f64,
    /// In-out parameter.
    pub q: f64,
    pub seed: u64,
}

impl Default for WalkConfig {
    fn default() -> Self {
        Self { walk_length: 80, num_walks: 10, p: 1.0, q: 1.0, seed: 42 }
    }
}

impl WalkConfig {
    pub fn validate(&self) -> Result<()> {
        if self.walk_length == 0 {
            return Err(Error::InvalidHyperparameter { name: "walk_length", value: 0.0 });
        }
        if self.num_walks == 0 {
            return Err(Error::InvalidHyperparameter { name: "num_walks", value: 0.0 });
        }
        check_positive("p", self.p)?;
        check_positive("q", self.q)
    }

    pub fn bias(&self) -> Result<Bias> {
        Bias::new(self.p, self.q)
    }
}

/// Owns a transition sampler for one run and turns it into a corpus.
#[derive(Debug, Clone)]
pub struct WalkSimulator<S> {
    sampler: S,
    config: WalkConfig,
}

impl WalkSimulator<TransitionModel> {
    /// Validate `config`, then preprocess every alias table of `graph`.
    pub fn precomputed<G: GraphView + ?Sized>(graph: &G, config: WalkConfig) -> Result<Self> {
        config.validate()?;
        let model = TransitionModel::new(graph, config.bias()?)?;
        Ok(Self { sampler: model, config })
    }

    #[cfg(feature = "parallel")]
    pub fn precomputed_parallel<G: GraphView + ?Sized>(graph: &G, config: WalkConfig) -> Result<Self> {
        config.validate()?;
        let model = TransitionModel::new_parallel(graph, config.bias()?)?;
        Ok(Self { sampler: model, config })
    }
}

impl WalkSimulator<OnTheFlyModel> {
    pub fn on_the_fly<G: GraphView + ?Sized>(graph: &G, config: WalkConfig) -> Result<Self> {
        config.validate()?;
        let model = OnTheFlyModel::new(graph, config.bias()?)?;
        Ok(Self { sampler: model, config })
    }
}

impl<S: TransitionSampler> WalkSimulator<S> {
    /// Wrap an existing sampler. Its `p`/`q` must match `config`.
    pub fn with_sampler(sampler: S, config: WalkConfig) -> Result<Self> {
        config.validate()?;
        let bias = sampler.bias();
        if bias.p() != config.p {
            return Err(Error::InvalidHyperparameter { name: "p", value: config.p });
        }
        if bias.q() != config.q {
            return Err(Error::InvalidHyperparameter { name: "q", value: config.q });
        }
        Ok(Self { sampler, config })
    }

    pub fn config(&self) -> &WalkConfig {
        &self.config
    }

    pub fn sampler(&self) -> &S {
        &self.sampler
    }

    pub fn into_sampler(self) -> S {
        self.sampler
    }

    /// Walks from every node of the graph.
    pub fn simulate(&self) -> Corpus {
        let n = self.sampler.adjacency().node_count();
        let mut walks = Vec::with_capacity(n * self.config.num_walks);
        self.run_passes((0..n).collect(), |w| walks.push(w.to_vec()));
        let corpus = Corpus::from(walks);
        debug!(
            walks = corpus.len(),
            tokens = corpus.token_count(),
            "simulated corpus"
        );
        corpus
    }

    /// Walks restricted to `start_nodes` (e.g. the nodes touched by a graph update).
    ///
    /// Every start node is checked before any walk is generated.
    pub fn simulate_from_nodes(&self, start_nodes: &[usize]) -> Result<Corpus> {
        self.check_start_nodes(start_nodes)?;
        let mut walks = Vec::with_capacity(start_nodes.len() * self.config.num_walks);
        self.run_passes(start_nodes.to_vec(), |w| walks.push(w.to_vec()));
        Ok(Corpus::from(walks))
    }

    /// Same walk sequence as [`WalkSimulator::simulate`], handed to `emit` one at a time
    /// instead of being collected. The slice is only valid for the duration of the call.
    pub fn simulate_streaming<F: FnMut(&[usize])>(&self, emit: F) {
        let n = self.sampler.adjacency().node_count();
        self.run_passes((0..n).collect(), emit);
    }

    pub fn simulate_from_nodes_streaming<F: FnMut(&[usize])>(
        &self,
        start_nodes: &[usize],
        emit: F,
    ) -> Result<()> {
        self.check_start_nodes(start_nodes)?;
        self.run_passes(start_nodes.to_vec(), emit);
        Ok(())
    }

    /// A single walk from `start`, drawing from `rng`.
    pub fn walk<R: Rng + ?Sized>(&self, start: usize, rng: &mut R) -> Result<Vec<usize>> {
        self.check_start_nodes(&[start])?;
        let mut walk = Vec::with_capacity(self.config.walk_length);
        self.walk_into(start, rng, &mut walk, &mut Vec::new());
        Ok(walk)
    }

    fn check_start_nodes(&self, start_nodes: &[usize]) -> Result<()> {
        let adj = self.sampler.adjacency();
        match start_nodes.iter().find(|&&s| !adj.has_node(s)) {
            Some(&missing) => Err(Error::MissingNode(missing)),
            None => Ok(()),
        }
    }

    fn run_passes<F: FnMut(&[usize])>(&self, mut epoch_nodes: Vec<usize>, mut emit: F) {
        let mut rng = ChaCha8Rng::seed_from_u64(self.config.seed);
        let mut walk = Vec::with_capacity(self.config.walk_length);
        let mut scratch = Vec::new();

        for _ in 0..self.config.num_walks {
            epoch_nodes.shuffle(&mut rng);
            for &node in &epoch_nodes {
                self.walk_into(node, &mut rng, &mut walk, &mut scratch);
                emit(&walk);
            }
        }
    }

    fn walk_into<R: Rng + ?Sized>(
        &self,
        start: usize,
        rng: &mut R,
        walk: &mut Vec<usize>,
        scratch: &mut Vec<f64>,
    ) {
        walk.clear();
        walk.push(start);
        if self.config.walk_length < 2 {
            return;
        }

        let Some(mut step) = self.sampler.first_step(start, rng) else {
            return;
        };
        walk.push(step.node);

        let mut prev = start;
        while walk.len() < self.config.walk_length {
            let Some(next) = self.sampler.next_step(prev, step, scratch, rng) else {
                break;
            };
            walk.push(next.node);
            prev = step.node;
            step = next;
        }
    }
}

#[cfg(feature = "parallel")]
impl<S: TransitionSampler + Sync> WalkSimulator<S> {
    /// Parallel variant of [`WalkSimulator::simulate`].
    ///
    /// Invariant: output is stable for a fixed `seed`, independent of Rayon thread count.
    /// It differs from the serial corpus because every pass shuffle and every walk draws
    /// from its own stream.
    pub fn simulate_parallel(&self) -> Corpus {
        let n = self.sampler.adjacency().node_count();
        self.parallel_passes((0..n).collect())
    }

    pub fn simulate_parallel_from_nodes(&self, start_nodes: &[usize]) -> Result<Corpus> {
        self.check_start_nodes(start_nodes)?;
        Ok(self.parallel_passes(start_nodes.to_vec()))
    }

    fn parallel_passes(&self, mut epoch_nodes: Vec<usize>) -> Corpus {
        use rayon::prelude::*;

        let seed = self.config.seed;
        let mut jobs: Vec<(u64, usize)> = Vec::with_capacity(epoch_nodes.len() * self.config.num_walks);
        for pass in 0..self.config.num_walks as u64 {
            let mut rng = ChaCha8Rng::seed_from_u64(mix64(seed ^ pass));
            epoch_nodes.shuffle(&mut rng);
            jobs.extend(epoch_nodes.iter().map(|&node| (pass, node)));
        }

        let walks: Vec<Vec<usize>> = jobs
            .par_iter()
            .enumerate()
            .map_init(Vec::new, |scratch, (i, &(pass, node))| {
                let mut rng = ChaCha8Rng::seed_from_u64(mix64(seed ^ (pass << 32) ^ i as u64));
                let mut walk = Vec::with_capacity(self.config.walk_length);
                self.walk_into(node, &mut rng, &mut walk, scratch);
                walk
            })
            .collect();

        debug!(walks = walks.len(), "simulated corpus (parallel)");
        Corpus::from(walks)
    }
}

#[cfg(feature = "parallel")]
fn mix64(mut x: u64) -> u64 {
    x ^= x >> 30;
    x = x.wrapping_mul(0xbf58476d1ce4e5b9);
    x ^= x >> 27;
    x = x.wrapping_mul(0x94d049bb133111eb);
    x ^= x >> 31;
    x
}
