use std::collections::BTreeSet;

use super::DependencyGraphResult;
use crate::model::OfferingIdentity;

/// Render the edge map below `root` as an indented tree.
///
/// A unit already on the current path is printed with a `(cycle)` marker and
/// not expanded again.
pub fn render_dependency_tree(result: &DependencyGraphResult, root: &OfferingIdentity) -> String {
    let mut out = String::new();
    out.push_str(&format!("{root}\n"));
    let mut on_path = BTreeSet::new();
    on_path.insert(root.clone());

    // (node, depth, path-so-far)
    let mut stack: Vec<(&OfferingIdentity, usize, BTreeSet<OfferingIdentity>)> = result
        .edges
        .get(root)
        .map(|children| {
            children
                .iter()
                .rev()
                .map(|c| (c, 1, on_path.clone()))
                .collect()
        })
        .unwrap_or_default();

    while let Some((node, depth, path)) = stack.pop() {
        let indent = "  ".repeat(depth);
        if path.contains(node) {
            out.push_str(&format!("{indent}└─ {node} (cycle)\n"));
            continue;
        }
        out.push_str(&format!("{indent}└─ {node}\n"));
        if let Some(children) = result.edges.get(node) {
            let mut next = path.clone();
            next.insert(node.clone());
            for child in children.iter().rev() {
                stack.push((child, depth + 1, next.clone()));
            }
        }
    }
    out
}
