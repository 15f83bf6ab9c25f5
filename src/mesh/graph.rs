//! Topology graph derived from runtime connectivity metadata.
//!
//! Turns the flat `{origin, tools[]}` connectivity list into the node/edge
//! shape the frontend renders. Roots are the agents that appear as nobody
//! else's tool; depth is the longest path from a root, so an agent reached
//! both directly and through an intermediary sits at its deepest level.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use super::proto::ConnectivityInfo;

#[derive(Debug, Serialize)]
pub struct NetworkGraph {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
}

#[derive(Debug, Serialize)]
pub struct GraphNode {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub data: NodeData,
    pub position: Position,
}

#[derive(Debug, Serialize)]
pub struct NodeData {
    pub label: String,
    pub depth: u32,
    pub parent: Option<String>,
    pub children: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

#[derive(Debug, Serialize)]
pub struct GraphEdge {
    pub id: String,
    pub source: String,
    pub target: String,
    pub animated: bool,
}

pub fn build_nodes_and_edges(info: &[ConnectivityInfo]) -> NetworkGraph {
    let mut origin_to_tools: BTreeMap<&str, &[String]> = BTreeMap::new();
    let mut all_nodes: BTreeSet<&str> = BTreeSet::new();
    let mut parent_map: BTreeMap<&str, &str> = BTreeMap::new();

    for entry in info {
        origin_to_tools.insert(entry.origin.as_str(), &entry.tools);
        all_nodes.insert(entry.origin.as_str());
        for tool in &entry.tools {
            all_nodes.insert(tool.as_str());
            parent_map.insert(tool.as_str(), entry.origin.as_str());
        }
    }

    // Deepest-path depth assignment, bounded by node count so cyclic
    // connectivity cannot loop forever.
    let max_depth = all_nodes.len() as u32;
    let mut depth_map: BTreeMap<&str, u32> = BTreeMap::new();
    let mut stack: Vec<(&str, u32)> = all_nodes
        .iter()
        .filter(|node| !parent_map.contains_key(*node))
        .map(|node| (*node, 0))
        .collect();

    while let Some((node, depth)) = stack.pop() {
        if depth > max_depth {
            continue;
        }
        let deeper = depth_map.get(node).is_none_or(|seen| *seen < depth);
        if deeper {
            depth_map.insert(node, depth);
            if let Some(tools) = origin_to_tools.get(node) {
                for child in tools.iter() {
                    stack.push((child.as_str(), depth + 1));
                }
            }
        }
    }

    let nodes = all_nodes
        .iter()
        .map(|node| GraphNode {
            id: node.to_string(),
            kind: "agent".to_string(),
            data: NodeData {
                label: node.to_string(),
                depth: depth_map.get(node).copied().unwrap_or(0),
                parent: parent_map.get(node).map(|p| p.to_string()),
                children: origin_to_tools
                    .get(node)
                    .map(|tools| tools.to_vec())
                    .unwrap_or_default(),
            },
            position: Position { x: 100, y: 100 },
        })
        .collect();

    let edges = origin_to_tools
        .iter()
        .flat_map(|(origin, tools)| {
            tools.iter().map(move |tool| GraphEdge {
                id: format!("{origin}-{tool}"),
                source: origin.to_string(),
                target: tool.to_string(),
                animated: true,
            })
        })
        .collect();

    NetworkGraph { nodes, edges }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(origin: &str, tools: &[&str]) -> ConnectivityInfo {
        ConnectivityInfo {
            origin: origin.to_string(),
            tools: tools.iter().map(|t| t.to_string()).collect(),
        }
    }

    #[test]
    fn builds_tree_with_depths_and_edges() {
        let connectivity = vec![
            info("Frontman", &["Router", "Search"]),
            info("Router", &["Billing"]),
        ];
        let graph = build_nodes_and_edges(&connectivity);

        assert_eq!(graph.nodes.len(), 4);
        let by_id: std::collections::HashMap<_, _> = graph
            .nodes
            .iter()
            .map(|n| (n.id.as_str(), &n.data))
            .collect();
        assert_eq!(by_id["Frontman"].depth, 0);
        assert_eq!(by_id["Frontman"].parent, None);
        assert_eq!(by_id["Router"].depth, 1);
        assert_eq!(by_id["Router"].parent.as_deref(), Some("Frontman"));
        assert_eq!(by_id["Billing"].depth, 2);

        assert_eq!(graph.edges.len(), 3);
        assert!(
            graph
                .edges
                .iter()
                .any(|e| e.id == "Frontman-Router" && e.animated)
        );
    }

    #[test]
    fn diamond_takes_deepest_path() {
        // Frontman -> A -> B and Frontman -> B: B sits at depth 2.
        let connectivity = vec![info("Frontman", &["A", "B"]), info("A", &["B"])];
        let graph = build_nodes_and_edges(&connectivity);
        let b = graph.nodes.iter().find(|n| n.id == "B").unwrap();
        assert_eq!(b.data.depth, 2);
    }

    #[test]
    fn cyclic_connectivity_terminates() {
        let connectivity = vec![info("A", &["B"]), info("B", &["A"])];
        let graph = build_nodes_and_edges(&connectivity);
        assert_eq!(graph.nodes.len(), 2);
        assert_eq!(graph.edges.len(), 2);
    }

    #[test]
    fn empty_connectivity_yields_empty_graph() {
        let graph = build_nodes_and_edges(&[]);
        assert!(graph.nodes.is_empty());
        assert!(graph.edges.is_empty());
    }
}
