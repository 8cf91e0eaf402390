use super::builder::{BuildNode, NodeHandle};
use super::LinearBvhNode;

// Lays the tree out in pre-order. The first child of an interior node is
// always the next slot, only the second child's slot gets recorded.
// Returns the flattened array along with the number of slots consumed.
pub fn flatten(
    arena: &[BuildNode],
    root: NodeHandle,
    total_nodes: usize,
) -> (Vec<LinearBvhNode>, usize) {
    fn flatten_node(
        arena: &[BuildNode],
        handle: NodeHandle,
        nodes: &mut Vec<LinearBvhNode>,
    ) -> u32 {
        let slot = nodes.len();

        match arena[handle.index()] {
            BuildNode::Leaf { bounds, offset, count } => {
                nodes.push(LinearBvhNode::leaf(bounds, offset as u32, count as u16));
            },
            BuildNode::Interior { bounds, axis, children: [fst, snd] } => {
                // Placeholder until the second child's slot is known
                nodes.push(LinearBvhNode::interior(bounds, axis as u8, 0));

                flatten_node(arena, fst, nodes);

                let snd = flatten_node(arena, snd, nodes);

                nodes[slot] = LinearBvhNode::interior(bounds, axis as u8, snd);
            },
        }

        slot as u32
    }

    let mut nodes = Vec::with_capacity(total_nodes);

    flatten_node(arena, root, &mut nodes);

    let consumed = nodes.len();

    (nodes, consumed)
}
