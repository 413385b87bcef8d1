// src/traverse/topology.rs

//! Whole-graph analysis of file links with `petgraph`.

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;

use crate::pipeline::Pipeline;

fn file_graph(pipeline: &Pipeline) -> DiGraphMap<&str, ()> {
    let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();
    for id in pipeline.commands.keys() {
        graph.add_node(id.as_str());
    }
    for link in pipeline.links.values() {
        if link.as_path().is_none() {
            continue;
        }
        if pipeline.commands.contains_key(&link.source) && pipeline.commands.contains_key(&link.target) {
            graph.add_edge(link.source.as_str(), link.target.as_str(), ());
        }
    }
    graph
}

/// Command IDs in an order where every file link points forward, or
/// `Err(id)` naming a command on a cycle.
pub fn file_order(pipeline: &Pipeline) -> Result<Vec<&str>, String> {
    let graph = file_graph(pipeline);
    toposort(&graph, None).map_err(|cycle| cycle.node_id().to_string())
}

/// A command that lies on a cycle of file links, if any.
pub fn find_cycle(pipeline: &Pipeline) -> Option<String> {
    file_order(pipeline).err()
}
