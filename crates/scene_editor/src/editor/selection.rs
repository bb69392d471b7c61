use crate::scene::{NodeKey, SceneGraph};

/// Which node the user last clicked in the tree view
///
/// The clicked node is shown in the property panel and receives newly
/// created nodes as children.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Selection {
    clicked: Option<NodeKey>,
}

impl Selection {
    /// Clicked node, if any
    pub const fn clicked(&self) -> Option<NodeKey> {
        self.clicked
    }

    /// Mark a node as clicked
    pub fn click(&mut self, key: NodeKey) {
        self.clicked = Some(key);
    }

    /// Forget the clicked node
    pub fn clear(&mut self) {
        self.clicked = None;
    }

    /// Parent for new nodes: the clicked node if still live, else the root
    pub fn insertion_target(&self, graph: &SceneGraph) -> NodeKey {
        let root = graph.root();
        self.clicked
            .filter(|&key| key == root || graph.is_ancestor(root, key))
            .unwrap_or(root)
    }

    /// Whether deleting `key` takes the clicked node with it
    pub(crate) fn affected_by_delete(&self, graph: &SceneGraph, key: NodeKey) -> bool {
        self.clicked
            .is_some_and(|clicked| clicked == key || graph.is_ancestor(key, clicked))
    }

    pub(crate) fn refocus(&mut self, former_parent: Option<NodeKey>) {
        self.clicked = former_parent;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insertion_target_falls_back_to_root() {
        let mut graph = SceneGraph::new("R");
        let a = graph.create_node("A");
        graph.add_child(graph.root(), a).unwrap();

        let mut selection = Selection::default();
        assert_eq!(selection.insertion_target(&graph), graph.root());

        selection.click(a);
        assert_eq!(selection.insertion_target(&graph), a);

        graph.delete_node(a).unwrap();
        assert_eq!(selection.insertion_target(&graph), graph.root());
    }
}
