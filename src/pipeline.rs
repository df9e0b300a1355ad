//! End-to-end glue: graph -> transition model -> corpus -> trainer.

use crate::corpus::Corpus;
use crate::embedding::{EmbeddingTrainer, Embeddings, SkipGramParams};
use crate::graph::{EdgeListGraph, GraphBuilder, GraphView};
use crate::simulate::{WalkConfig, WalkSimulator};
use crate::{Error, Result};
use std::fmt::Display;
use std::hash::Hash;
use tracing::info;

/// Every knob of a node2vec run.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Node2VecParams {
    pub dimensions: usize,
    pub walk_length: usize,
    pub num_walks: usize,
    pub window_size: usize,
    /// Trainer epochs.
    pub epochs: usize,
    /// Trainer threads; the walk engine itself is unaffected.
    pub workers: usize,
    pub p: f64,
    pub q: f64,
    pub weighted: bool,
    pub directed: bool,
    pub seed: u64,
}

impl Default for Node2VecParams {
    fn default() -> Self {
        Self {
            dimensions: 128,
            walk_length: 80,
            num_walks: 10,
            window_size: 10,
            epochs: 1,
            workers: 8,
            p: 1.0,
            q: 1.0,
            weighted: false,
            directed: false,
            seed: 1,
        }
    }
}

impl Node2VecParams {
    /// A builder that applies this run's directed/weighted rules.
    pub fn graph_builder<N: Clone + Eq + Hash>(&self) -> GraphBuilder<N> {
        GraphBuilder::new(self.directed, self.weighted)
    }

    pub fn walk_config(&self) -> WalkConfig {
        WalkConfig {
            walk_length: self.walk_length,
            num_walks: self.num_walks,
            p: self.p,
            q: self.q,
            seed: self.seed,
        }
    }

    pub fn skip_gram(&self) -> SkipGramParams {
        SkipGramParams {
            dimensions: self.dimensions,
            window_size: self.window_size,
            min_count: 0,
            epochs: self.epochs,
            seed: self.seed,
            workers: self.workers,
        }
    }

    /// Reject bad walk or trainer settings before any work starts.
    pub fn validate(&self) -> Result<()> {
        self.walk_config().validate()?;
        for (name, value) in [
            ("dimensions", self.dimensions),
            ("window_size", self.window_size),
            ("epochs", self.epochs),
            ("workers", self.workers),
        ] {
            if value == 0 {
                return Err(Error::InvalidHyperparameter { name, value: 0.0 });
            }
        }
        Ok(())
    }
}

/// Preprocess `graph` and simulate the full corpus.
pub fn generate_corpus<G: GraphView + ?Sized>(graph: &G, params: &Node2VecParams) -> Result<Corpus> {
    params.validate()?;
    let sim = WalkSimulator::precomputed(graph, params.walk_config())?;
    Ok(sim.simulate())
}

/// Run the whole pipeline and return the trainer's embeddings, keyed by node label.
pub fn run<N, T>(graph: &EdgeListGraph<N>, params: &Node2VecParams, trainer: &mut T) -> Result<Embeddings>
where
    N: Clone + Eq + Hash + Display,
    T: EmbeddingTrainer,
{
    info!(
        nodes = graph.node_count(),
        edges = graph.edge_count(),
        directed = params.directed,
        "starting node2vec run"
    );
    let corpus = generate_corpus(graph, params)?;
    let sentences = corpus.to_sentences(graph.labels())?;
    info!(walks = sentences.len(), "handing corpus to trainer");

    let embeddings = trainer
        .train(&sentences, &params.skip_gram())
        .map_err(|e| Error::Trainer(Box::new(e)))?;
    if embeddings.dimensions() != params.dimensions {
        return Err(Error::DimensionMismatch {
            expected: params.dimensions,
            got: embeddings.dimensions(),
        });
    }
    info!(tokens = embeddings.len(), "training finished");
    Ok(embeddings)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_follow_reference_run() {
        let p = Node2VecParams::default();
        assert_eq!(p.walk_config().walk_length, 80);
        assert_eq!(p.walk_config().num_walks, 10);
        assert_eq!(p.skip_gram().min_count, 0);
        assert_eq!(p.skip_gram().dimensions, 128);
        assert!(!p.directed && !p.weighted);
        assert!(p.validate().is_ok());
    }

    #[test]
    fn validate_rejects_zero_trainer_settings() {
        let p = Node2VecParams { window_size: 0, ..Node2VecParams::default() };
        assert!(matches!(
            p.validate(),
            Err(Error::InvalidHyperparameter { name: "window_size", .. })
        ));
        let p = Node2VecParams { q: 0.0, ..Node2VecParams::default() };
        assert!(p.validate().is_err());
    }

    #[test]
    fn graph_builder_respects_directed_flag() {
        let params = Node2VecParams { directed: true, ..Node2VecParams::default() };
        let mut b = params.graph_builder();
        b.add_edge(1u32, 2u32);
        let g = b.build();
        assert_eq!(g.edge_count(), 1);
        assert!(g.is_directed());
    }
}
