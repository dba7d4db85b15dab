//! Minimum s-t cut on pixel graphs (Dinic's algorithm)
//!
//! Terminal links are stored as residual capacities on dedicated source and
//! sink nodes. Each undirected neighbour link is one pair of arcs sharing a
//! capacity in each direction, so arc `e` and its reverse are `e ^ 1`.

use std::collections::VecDeque;

const EPSILON: f64 = 1e-9;
const NONE: u32 = u32::MAX;

/// Flow network over `nodes` pixels plus a source and a sink
#[derive(Debug)]
pub struct FlowGraph {
    source: usize,
    sink: usize,
    head: Vec<u32>,
    next: Vec<u32>,
    to: Vec<u32>,
    capacity: Vec<f64>,
    /// Flow pushed while cancelling opposing terminal weights
    base_flow: f64,
    level: Vec<u32>,
}

impl FlowGraph {
    /// Create a graph for `nodes` pixel nodes with room for `edge_hint` neighbour links
    #[must_use]
    pub fn new(nodes: usize, edge_hint: usize) -> Self {
        let total = nodes + 2;
        let arcs = 2 * (edge_hint + nodes);
        Self {
            source: nodes,
            sink: nodes + 1,
            head: vec![NONE; total],
            next: Vec::with_capacity(arcs),
            to: Vec::with_capacity(arcs),
            capacity: Vec::with_capacity(arcs),
            base_flow: 0.0,
            level: vec![NONE; total],
        }
    }

    fn push_arc(&mut self, from: usize, to: usize, capacity: f64) {
        let index = self.to.len() as u32;
        self.to.push(to as u32);
        self.capacity.push(capacity);
        self.next.push(self.head[from]);
        self.head[from] = index;
    }

    /// Add an undirected link of weight `forward` from `a` to `b` and `backward` from `b` to `a`
    pub fn add_edge(&mut self, a: usize, b: usize, forward: f64, backward: f64) {
        self.push_arc(a, b, forward.max(0.0));
        self.push_arc(b, a, backward.max(0.0));
    }

    /// Connect `node` to the terminals
    ///
    /// Only the difference between the two weights affects the cut; the
    /// shared part is accounted as already-pushed flow.
    pub fn add_terminal_weights(&mut self, node: usize, from_source: f64, to_sink: f64) {
        self.base_flow += from_source.min(to_sink);
        let delta = from_source - to_sink;
        if delta > 0.0 {
            self.add_edge(self.source, node, delta, 0.0);
        } else if delta < 0.0 {
            self.add_edge(node, self.sink, -delta, 0.0);
        }
    }

    /// Run max-flow to completion and return the total flow value
    pub fn max_flow(&mut self) -> f64 {
        let mut flow = self.base_flow;
        while self.build_levels() {
            let mut cursor = self.head.clone();
            flow += self.blocking_flow(&mut cursor);
        }
        flow
    }

    /// After [`max_flow`](Self::max_flow): whether `node` stays connected to the source
    #[must_use]
    pub fn in_source_segment(&self, node: usize) -> bool {
        self.level.get(node).is_some_and(|&level| level != NONE)
    }

    /// Breadth-first layering from the source; true if the sink is reachable
    fn build_levels(&mut self) -> bool {
        self.level.fill(NONE);
        self.level[self.source] = 0;
        let mut queue = VecDeque::from([self.source]);

        while let Some(node) = queue.pop_front() {
            let next_level = self.level[node] + 1;
            let mut arc = self.head[node];
            while arc != NONE {
                let e = arc as usize;
                let target = self.to[e] as usize;
                if self.capacity[e] > EPSILON && self.level[target] == NONE {
                    self.level[target] = next_level;
                    queue.push_back(target);
                }
                arc = self.next[e];
            }
        }

        self.level[self.sink] != NONE
    }

    /// Saturate every shortest augmenting path in the current level graph
    fn blocking_flow(&mut self, cursor: &mut [u32]) -> f64 {
        let mut total = 0.0;
        let mut path: Vec<usize> = Vec::new();
        let mut nodes: Vec<usize> = vec![self.source];

        while let Some(&node) = nodes.last() {
            if node == self.sink {
                let bottleneck = path
                    .iter()
                    .map(|&e| self.capacity[e])
                    .fold(f64::INFINITY, f64::min);
                for &e in &path {
                    self.capacity[e] -= bottleneck;
                    self.capacity[e ^ 1] += bottleneck;
                }
                total += bottleneck;

                // retreat to the tail of the first saturated arc
                let saturated = path
                    .iter()
                    .position(|&e| self.capacity[e] <= EPSILON)
                    .unwrap_or(0);
                path.truncate(saturated);
                nodes.truncate(saturated + 1);
                continue;
            }

            let mut advanced = false;
            while cursor[node] != NONE {
                let e = cursor[node] as usize;
                let target = self.to[e] as usize;
                if self.capacity[e] > EPSILON && self.level[target] == self.level[node] + 1 {
                    path.push(e);
                    nodes.push(target);
                    advanced = true;
                    break;
                }
                cursor[node] = self.next[e];
            }

            if !advanced {
                // dead end: drop the node from this phase and back up
                self.level[node] = NONE;
                nodes.pop();
                if let Some(e) = path.pop() {
                    if let Some(&parent) = nodes.last() {
                        cursor[parent] = self.next[e];
                    }
                }
            }
        }

        total
    }
}
