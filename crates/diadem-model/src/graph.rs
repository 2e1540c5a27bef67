//! Moralized interaction graph over the model's variables.
//!
//! Vertices are variable ids; every factor scope induces a clique. The
//! graph supports the two operations ordering needs: scoring a candidate
//! (degree or fill-in count among remaining vertices) and eliminating it
//! (connect its neighborhood into a clique, then remove it).

use crate::diagram::Diagram;
use std::collections::BTreeSet;

#[derive(Debug, Clone)]
pub struct InteractionGraph {
    adj: Vec<BTreeSet<usize>>,
}

impl InteractionGraph {
    pub fn from_diagram(dg: &Diagram) -> Self {
        let mut adj = vec![BTreeSet::new(); dg.n_vars()];
        for factor in dg.factors() {
            let ids: Vec<usize> = factor.scope().iter().map(|v| v.id()).collect();
            for (i, &a) in ids.iter().enumerate() {
                for &b in &ids[i + 1..] {
                    adj[a].insert(b);
                    adj[b].insert(a);
                }
            }
        }
        Self { adj }
    }

    /// Remaining neighbors of `v`.
    pub fn neighbors(&self, v: usize) -> &BTreeSet<usize> {
        &self.adj[v]
    }

    /// Degree of `v` among remaining vertices.
    pub fn degree(&self, v: usize) -> usize {
        self.adj[v].len()
    }

    /// Number of fill edges eliminating `v` would introduce.
    pub fn fill_count(&self, v: usize) -> usize {
        let nbrs: Vec<usize> = self.adj[v].iter().copied().collect();
        let mut fill = 0;
        for (i, &a) in nbrs.iter().enumerate() {
            for &b in &nbrs[i + 1..] {
                if !self.adj[a].contains(&b) {
                    fill += 1;
                }
            }
        }
        fill
    }

    /// Eliminate `v`: connect its neighborhood into a clique and remove it.
    /// Returns the degree of `v` at elimination time.
    pub fn eliminate(&mut self, v: usize) -> usize {
        let nbrs: Vec<usize> = self.adj[v].iter().copied().collect();
        for (i, &a) in nbrs.iter().enumerate() {
            for &b in &nbrs[i + 1..] {
                self.adj[a].insert(b);
                self.adj[b].insert(a);
            }
        }
        for &n in &nbrs {
            self.adj[n].remove(&v);
        }
        self.adj[v].clear();
        nbrs.len()
    }
}
