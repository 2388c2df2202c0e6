//! Plain-text rendering of tree nodes and entities for the CLI.

use sprig_core::{FullEntity, NodeKind, TreeNode};

/// One indented line per node, e.g. `  + Reports [bundle-4] (12)`.
pub fn render_node(node: &TreeNode, depth: usize) -> String {
    let indent = "  ".repeat(depth);
    let marker = match (node.node_type, node.has_children) {
        (NodeKind::Bundle, _) | (NodeKind::Asset, true) => '+',
        (NodeKind::Asset, false) => '-',
    };
    let mut line = format!("{indent}{marker} {} [{}]", node.name, node.id);
    if let Some(kind) = &node.asset_kind {
        line.push_str(&format!(" <{kind}>"));
    }
    if node.children_count > 0 {
        line.push_str(&format!(" ({})", node.children_count));
    }
    line
}

pub fn render_entity(entity: &FullEntity) -> String {
    match entity {
        FullEntity::Asset(asset) => {
            let preview: String = asset
                .text_content
                .as_deref()
                .unwrap_or_default()
                .chars()
                .take(80)
                .collect();
            format!("{} [asset-{}] <{}>\n  {}", asset.title, asset.id, asset.kind, preview)
        }
        FullEntity::Bundle(bundle) => format!(
            "{} [bundle-{}] assets={} bundles={}",
            bundle.name, bundle.id, bundle.asset_count, bundle.child_bundle_count
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sprig_core::NodeId;
    use sprig_test_utils::fixtures::{asset_node, bundle_node, make_asset};
    use std::sync::Arc;

    #[test]
    fn test_render_nested_asset() {
        let parent = NodeId::from("bundle-1");
        let line = render_node(&asset_node(7, Some(&parent)), 2);
        assert_eq!(line, "    - asset 7 [asset-7] <text>");
    }

    #[test]
    fn test_render_bundle_with_count() {
        let mut node = bundle_node(3, None);
        node.children_count = 12;
        assert_eq!(render_node(&node, 0), "+ bundle 3 [bundle-3] (12)");
    }

    #[test]
    fn test_render_asset_entity() {
        let text = render_entity(&FullEntity::Asset(Arc::new(make_asset(9))));
        assert!(text.starts_with("asset 9 [asset-9] <text>"));
        assert!(text.contains("full text of asset 9"));
    }
}
