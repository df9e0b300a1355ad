//! `node2vec-walks`: second-order biased random walks for node embeddings.
//!
//! Pipeline: a [`GraphView`] is snapshotted once, [`TransitionModel`] compiles one alias table
//! per node (first step) and one per directed edge (second-order step), and
//! [`WalkSimulator`] runs `num_walks` shuffled passes over every node to produce a [`Corpus`].
//! The corpus is handed to an external [`EmbeddingTrainer`].
//!
//! Public invariants (must not drift):
//! - **Valid paths**: consecutive walk nodes are joined by an edge of the input graph.
//! - **Lengths**: every walk has `1..=walk_length` nodes, and is short only when it reached a
//!   node with no outgoing edge.
//! - **Coverage**: each pass starts exactly one walk at every start node.
//! - **Determinism**: identical graph + config + seed give identical corpora. Randomness
//!   comes from seeded `ChaCha8Rng` streams, never from a global generator.
//!
//! Swappable (allowed to change without breaking the contract):
//! - sampler strategy (precomputed alias tables vs on-the-fly weights)
//! - iteration strategy (serial vs parallel)

pub mod alias;
pub mod corpus;
pub mod embedding;
pub mod graph;
pub mod pipeline;
pub mod simulate;
pub mod transition;

pub use alias::AliasTable;
pub use corpus::Corpus;
pub use embedding::{EmbeddingTrainer, Embeddings, SkipGramParams};
pub use graph::{EdgeListGraph, GraphBuilder, GraphView};
#[cfg(feature = "petgraph")]
pub use graph::PetgraphView;
pub use pipeline::{generate_corpus, run, Node2VecParams};
pub use simulate::{WalkConfig, WalkSimulator};
pub use transition::{
    second_order_weights, Adjacency, Bias, OnTheFlyModel, Step, TransitionModel,
    TransitionSampler,
};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("distribution has no positive weight")]
    DegenerateDistribution,
    #[error("invalid hyperparameter `{name}`: {value}")]
    InvalidHyperparameter { name: &'static str, value: f64 },
    #[error("node {0} is not in the graph")]
    MissingNode(usize),
    #[error("invalid weight {weight} at index {index}")]
    InvalidWeight { index: usize, weight: f64 },
    #[error("edge weight must be finite and positive, got {0}")]
    InvalidEdgeWeight(f64),
    #[error("expected {expected}-dimensional vectors, got {got}")]
    DimensionMismatch { expected: usize, got: usize },
    #[error("unknown token: {0}")]
    UnknownToken(String),
    #[error("embedding trainer failed: {0}")]
    Trainer(#[source] Box<dyn std::error::Error + Send + Sync>),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
