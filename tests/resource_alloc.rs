use node2vec_walks::{GraphView, WalkConfig, WalkSimulator};
use stats_alloc::{Region, StatsAlloc, INSTRUMENTED_SYSTEM};
use std::alloc::System;

#[global_allocator]
static GLOBAL: &StatsAlloc<System> = &INSTRUMENTED_SYSTEM;

#[derive(Debug, Clone)]
struct Chain {
    adj: Vec<Vec<usize>>,
    wts: Vec<Vec<f64>>,
}

impl GraphView for Chain {
    fn node_count(&self) -> usize {
        self.adj.len()
    }

    fn neighbors(&self, node: usize) -> (&[usize], &[f64]) {
        let nbrs = self.adj.get(node).map(Vec::as_slice).unwrap_or(&[]);
        let wts = self.wts.get(node).map(Vec::as_slice).unwrap_or(&[]);
        (nbrs, wts)
    }
}

#[test]
fn streaming_walks_use_far_fewer_allocations_than_collecting() {
    // Collecting allocates per walk (the corpus Vec plus each walk Vec); streaming reuses
    // one walk buffer, so its allocation count should not grow with the number of walks.
    // Counted allocations rather than RSS keeps this portable.
    let n = 1_000usize;
    let mut adj = vec![Vec::new(); n];
    for i in 0..n {
        if i > 0 {
            adj[i].push(i - 1);
        }
        if i + 1 < n {
            adj[i].push(i + 1);
        }
    }
    let wts = adj.iter().map(|nbrs: &Vec<usize>| vec![1.0; nbrs.len()]).collect();
    let g = Chain { adj, wts };

    let config = WalkConfig { walk_length: 80, num_walks: 2, p: 1.0, q: 1.0, seed: 123 };
    let sim = WalkSimulator::precomputed(&g, config).unwrap();

    let r_collect = Region::new(&GLOBAL);
    let corpus = sim.simulate();
    let s_collect = r_collect.change();
    assert_eq!(corpus.len(), n * config.num_walks);

    let r_stream = Region::new(&GLOBAL);
    let mut count = 0usize;
    sim.simulate_streaming(|_w| {
        count += 1;
    });
    let s_stream = r_stream.change();
    assert_eq!(count, n * config.num_walks);

    let a_collect = s_collect.allocations;
    let a_stream = s_stream.allocations;
    assert!(
        a_stream * 10 < a_collect,
        "expected streaming allocations << collecting allocations (collect={a_collect}, stream={a_stream})"
    );
}
