use std::collections::{BTreeSet, HashMap, HashSet};

use covgate_sfapi::{MetadataComponentDependency, APEX_TRIGGER};
use tracing::debug;

struct Node {
    name: String,
    is_root: bool,
    refs: Vec<String>,
}

/// Expand the requested class/trigger names to the names of every component
/// they transitively reference, excluding the requested roots themselves.
///
/// Root matching is kind-aware: a trigger name only marks trigger-typed
/// nodes, a class name only non-trigger nodes. The walk is iterative with an
/// explicit visited set, so cycles and diamond references terminate and deep
/// graphs cannot exhaust the call stack. Output order is not significant;
/// names are returned sorted for determinism.
pub fn resolve_dependencies(
    edges: &[MetadataComponentDependency],
    classes: &[String],
    triggers: &[String],
) -> Vec<String> {
    let is_root = |is_trigger: bool, name: &str| {
        if is_trigger {
            triggers.iter().any(|t| t == name)
        } else {
            classes.iter().any(|c| c == name)
        }
    };

    let mut nodes: HashMap<String, Node> = HashMap::new();
    for edge in edges {
        // Roots are recognized on both sides of an edge; a requested
        // component may only ever appear as a reference.
        let ref_is_trigger = edge.ref_type == APEX_TRIGGER;
        nodes.entry(edge.ref_id.clone()).or_insert_with(|| Node {
            name: edge.ref_name.clone(),
            is_root: is_root(ref_is_trigger, &edge.ref_name),
            refs: Vec::new(),
        });

        let src_is_trigger = edge.component_type == APEX_TRIGGER;
        let node = nodes.entry(edge.id.clone()).or_insert_with(|| Node {
            name: edge.name.clone(),
            is_root: is_root(src_is_trigger, &edge.name),
            refs: Vec::new(),
        });
        node.refs.push(edge.ref_id.clone());
    }

    let mut visited: HashSet<&str> = HashSet::new();
    let mut stack: Vec<&str> = nodes
        .iter()
        .filter(|(_, node)| node.is_root)
        .map(|(id, _)| id.as_str())
        .collect();

    while let Some(id) = stack.pop() {
        if !visited.insert(id) {
            continue;
        }
        if let Some(node) = nodes.get(id) {
            for reference in &node.refs {
                if !visited.contains(reference.as_str()) {
                    stack.push(reference);
                }
            }
        }
    }

    let mut result = BTreeSet::new();
    for id in visited {
        if let Some(node) = nodes.get(id) {
            if !node.is_root {
                result.insert(node.name.clone());
            }
        }
    }

    debug!(
        roots = classes.len() + triggers.len(),
        resolved = result.len(),
        "dependency closure computed"
    );
    result.into_iter().collect()
}
