use std::collections::VecDeque;
use std::fmt::{Debug, Formatter};
use bitcode::{Decode, Encode};
use math_k37::AABB;
use nab_k37::utils::ShortTypeName;
use smallvec::{smallvec, SmallVec};
use crate::{BroadPhase, NodeEntry};

#[derive(Clone, Copy, PartialEq, Eq, Debug, Encode, Decode)]
pub enum DebugBoundsKind
{
    Branch,
    Leaf,
}

// one node's AABB, tagged for an external debug renderer
#[derive(Clone, Copy, PartialEq, Debug, Encode, Decode)]
pub struct DebugBounds
{
    pub bounds: AABB,
    pub kind: DebugBoundsKind,
    pub is_static: bool,
}

impl<K: Copy + PartialEq> BroadPhase<K>
{
    /// Verify the whole structure: zero-or-two children, parent back-links,
    /// branch bounds/flags matching their children's union/OR, the tracked
    /// leaf counter, and arena/free-list accounting. Debug builds run this
    /// after every mutation; it is not a caller-facing error path.
    #[must_use]
    pub fn check_integrity(&self) -> bool
    {
        let mut reachable_leaves = 0;
        let mut reachable_nodes = 0;

        if self.root_index.is_some()
        {
            if self.nodes[self.root_index.0].parent_index.is_some()
            {
                return false;
            }

            let mut stack: SmallVec<[usize; 16]> = smallvec![self.root_index.0];
            while let Some(top) = stack.pop()
            {
                reachable_nodes += 1;
                let node = &self.nodes[top];
                match node.entry
                {
                    NodeEntry::Free => { return false; }
                    NodeEntry::Leaf(_) =>
                    {
                        if node.left_child_index.is_some() || node.right_child_index.is_some()
                        {
                            return false;
                        }
                        reachable_leaves += 1;
                    }
                    NodeEntry::Branch =>
                    {
                        let left_index = node.left_child_index;
                        let right_index = node.right_child_index;
                        if left_index.is_none() || right_index.is_none()
                        {
                            return false; // a branch always has both children
                        }

                        let left = &self.nodes[left_index.0];
                        let right = &self.nodes[right_index.0];
                        if left.parent_index.0 != top || right.parent_index.0 != top { return false; }
                        if node.bounds != left.bounds.unioned_with(right.bounds) { return false; }
                        if node.filter_flags != left.filter_flags.union_with(right.filter_flags) { return false; }
                        if node.is_static != (left.is_static || right.is_static) { return false; }

                        stack.push(left_index.0);
                        stack.push(right_index.0);
                    }
                }
            }
        }

        let free_slots = self.nodes.iter().filter(|n| matches!(n.entry, NodeEntry::Free)).count();

        reachable_leaves == self.leaf_count &&
        free_slots == self.free_list.len() &&
        reachable_nodes + free_slots == self.nodes.len()
    }

    /// Breadth-first export of every node's AABB for visualization.
    pub fn export_bounds(&self, out: &mut Vec<DebugBounds>)
    {
        if self.root_index.is_none()
        {
            return;
        }

        let mut queue = VecDeque::new();
        queue.push_back(self.root_index.0);
        while let Some(front) = queue.pop_front()
        {
            let node = &self.nodes[front];
            let kind = match node.entry
            {
                NodeEntry::Leaf(_) => DebugBoundsKind::Leaf,
                NodeEntry::Branch =>
                {
                    queue.push_back(node.left_child_index.0);
                    queue.push_back(node.right_child_index.0);
                    DebugBoundsKind::Branch
                }
                NodeEntry::Free => { continue; }
            };

            out.push(DebugBounds
            {
                bounds: node.bounds,
                kind,
                is_static: node.is_static,
            });
        }
    }
}
impl<K: Debug> Debug for BroadPhase<K>
{
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result
    {
        f.write_fmt(format_args!("{} ({} colliders)", Self::short_type_name(), self.leaf_count))?;
        if self.root_index.is_none()
        {
            return Ok(());
        }

        let mut stack = vec![(0usize, '^', self.root_index)];
        while let Some((depth, l_r, node_index)) = stack.pop()
        {
            if f.alternate()
            {
                f.write_fmt(format_args!("\n{:3}  ", node_index.0))?;
            }
            else
            {
                f.write_str("\n  ")?;
            }

            for i in 0..depth
            {
                f.write_str([" ┗━ ", "━━ "][i.min(1)])?;
            }

            let node = &self.nodes[node_index.0];
            f.write_fmt(format_args!("[{l_r}] {:?}", node.bounds))?;
            match &node.entry
            {
                NodeEntry::Leaf(key) =>
                {
                    let static_tag = if node.is_static { ", static" } else { "" };
                    f.write_fmt(format_args!(" (Leaf{static_tag}) key: {key:?} filter: {:#010x}", node.filter_flags.0))?;
                }
                NodeEntry::Branch =>
                {
                    stack.push((depth + 1, 'R', node.right_child_index));
                    stack.push((depth + 1, 'L', node.left_child_index));
                }
                NodeEntry::Free =>
                {
                    f.write_str(" (Free!)")?; // never reachable from the root
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests
{
    use glam::Vec3;
    use crate::FilterFlags;
    use super::*;

    fn boxes_at(centers: &[Vec3]) -> Vec<AABB>
    {
        centers.iter().map(|c| AABB::from_center_half_size(*c, Vec3::ONE)).collect()
    }

    #[test]
    fn export_tags_and_counts()
    {
        let store = boxes_at(&[Vec3::ZERO, Vec3::new(5.0, 0.0, 0.0), Vec3::new(0.0, 5.0, 0.0)]);
        let mut tree = BroadPhase::new();
        tree.insert(0, &store, false, FilterFlags::ALL);
        tree.insert(1, &store, true, FilterFlags::ALL);
        tree.insert(2, &store, false, FilterFlags::ALL);

        let mut exported = Vec::new();
        tree.export_bounds(&mut exported);

        // 3 leaves hang off 2 branches
        assert_eq!(exported.len(), 5);
        assert_eq!(exported.iter().filter(|b| b.kind == DebugBoundsKind::Leaf).count(), 3);
        assert_eq!(exported.iter().filter(|b| b.kind == DebugBoundsKind::Branch).count(), 2);

        // one static leaf, and every branch above it inherits the flag
        assert_eq!(exported.iter().filter(|b| b.kind == DebugBoundsKind::Leaf && b.is_static).count(), 1);
        assert!(exported.iter().any(|b| b.kind == DebugBoundsKind::Branch && b.is_static));

        // breadth-first: the root union comes out first
        assert!(exported[0].bounds.fully_contains(store[0]));
        assert!(exported[0].bounds.fully_contains(store[1]));
        assert!(exported[0].bounds.fully_contains(store[2]));
    }

    #[test]
    fn export_empty_tree()
    {
        let tree = BroadPhase::<usize>::new();
        let mut exported = Vec::new();
        tree.export_bounds(&mut exported);
        assert!(exported.is_empty());
    }

    #[test]
    fn integrity_catches_corruption()
    {
        let store = boxes_at(&[Vec3::ZERO, Vec3::new(5.0, 0.0, 0.0)]);
        let mut tree = BroadPhase::new();
        tree.insert(0, &store, false, FilterFlags::ALL);
        tree.insert(1, &store, false, FilterFlags::ALL);
        assert!(tree.check_integrity());

        // break the root's union invariant
        tree.nodes[tree.root_index.0].bounds = AABB::empty();
        assert!(!tree.check_integrity());
    }

    #[test]
    fn integrity_catches_count_drift()
    {
        let store = boxes_at(&[Vec3::ZERO]);
        let mut tree = BroadPhase::new();
        tree.insert(0, &store, false, FilterFlags::ALL);

        tree.leaf_count += 1;
        assert!(!tree.check_integrity());
    }

    #[test]
    fn dump_formatting()
    {
        let store = boxes_at(&[Vec3::ZERO, Vec3::new(5.0, 0.0, 0.0)]);
        let mut tree = BroadPhase::new();
        tree.insert(0, &store, false, FilterFlags::ALL);
        tree.insert(1, &store, true, FilterFlags::ALL);

        let dump = format!("{tree:#?}");
        assert!(dump.contains("(2 colliders)"));
        assert!(dump.contains("key: 0"));
        assert!(dump.contains("key: 1"));
        assert!(dump.contains(", static"));
    }
}
