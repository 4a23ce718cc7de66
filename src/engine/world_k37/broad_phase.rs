use std::cmp::Ordering;
use std::collections::BinaryHeap;
use math_k37::AABB;
use nab_k37::debug_panic;
use smallvec::{smallvec, SmallVec};
use crate::{ColliderStore, FilterFlags, NodeIndex};

pub const DEFAULT_MOVEMENT_MARGIN: f32 = 0.2;

// a potentially-overlapping pair; broad-phase candidates only, narrow phase must confirm.
// flags are captured when the pair is recorded, not re-validated every tick
#[derive(Clone, Copy, PartialEq, Debug)]
pub struct Contact<K>
{
    pub keys: [K; 2],
    pub filter_flags: [FilterFlags; 2],
    pub is_static: [bool; 2],
}

#[derive(Clone, Copy, Debug)]
pub(crate) enum NodeEntry<K>
{
    Free,
    Branch,
    Leaf(K),
}

pub(crate) struct Node<K>
{
    pub(crate) bounds: AABB, // fat for leaves, child union for branches
    pub(crate) parent_index: NodeIndex,
    pub(crate) left_child_index: NodeIndex,
    pub(crate) right_child_index: NodeIndex,
    pub(crate) filter_flags: FilterFlags, // OR of children for branches
    pub(crate) is_static: bool, // OR of children for branches
    pub(crate) entry: NodeEntry<K>,
}
impl<K> Node<K>
{
    fn leaf(key: K, bounds: AABB, is_static: bool, filter_flags: FilterFlags) -> Self
    {
        Self
        {
            bounds,
            parent_index: NodeIndex::none(),
            left_child_index: NodeIndex::none(),
            right_child_index: NodeIndex::none(),
            filter_flags,
            is_static,
            entry: NodeEntry::Leaf(key),
        }
    }

    // flags/bounds get refreshed by update_parent_data after splicing
    fn branch(bounds: AABB, parent_index: NodeIndex, left_child_index: NodeIndex, right_child_index: NodeIndex) -> Self
    {
        Self
        {
            bounds,
            parent_index,
            left_child_index,
            right_child_index,
            filter_flags: FilterFlags::NONE,
            is_static: false,
            entry: NodeEntry::Branch,
        }
    }

    fn free() -> Self
    {
        Self
        {
            bounds: AABB::empty(),
            parent_index: NodeIndex::none(),
            left_child_index: NodeIndex::none(),
            right_child_index: NodeIndex::none(),
            filter_flags: FilterFlags::NONE,
            is_static: false,
            entry: NodeEntry::Free,
        }
    }

    #[inline] pub(crate) fn is_leaf(&self) -> bool { matches!(self.entry, NodeEntry::Leaf(_)) }
}

// leaf queued for removal + reinsertion; holds a stable arena index, never a reference,
// so earlier removals in the batch cannot invalidate it
struct Reinsert<K>
{
    node: NodeIndex,
    key: K,
    filter_flags: FilterFlags,
    is_static: bool,
}

struct SiblingCandidate
{
    cost: f32, // direct + inherited
    inherited: f32,
    index: NodeIndex,
}
impl PartialEq for SiblingCandidate
{
    fn eq(&self, other: &Self) -> bool { self.cost.total_cmp(&other.cost) == Ordering::Equal }
}
impl Eq for SiblingCandidate { }
impl PartialOrd for SiblingCandidate
{
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> { Some(self.cmp(other)) }
}
impl Ord for SiblingCandidate
{
    // reversed so the BinaryHeap pops the cheapest candidate first
    fn cmp(&self, other: &Self) -> Ordering { other.cost.total_cmp(&self.cost) }
}

/// Dynamic AABB-tree broad phase over caller-owned colliders.
///
/// Leaves store fattened bounds so small motion does not restructure the tree;
/// drifted leaves are batch-reinserted by [`BroadPhase::update`]. `K` is an
/// opaque caller key resolved through a [`ColliderStore`].
pub struct BroadPhase<K>
{
    pub(crate) nodes: Vec<Node<K>>,
    pub(crate) free_list: Vec<NodeIndex>,
    pub(crate) root_index: NodeIndex,
    pub(crate) leaf_count: usize,
    movement_margin: f32,
    check_contacts: bool,
    contacts: Vec<Contact<K>>,
    pending_reinserts: Vec<Reinsert<K>>, // kept empty between updates, capacity tracks leaf_count
}
impl<K: Copy + PartialEq> BroadPhase<K>
{
    #[inline] #[must_use]
    pub fn new() -> Self { Self::with_movement_margin(DEFAULT_MOVEMENT_MARGIN) }

    #[must_use]
    pub fn with_movement_margin(movement_margin: f32) -> Self
    {
        Self
        {
            nodes: Vec::new(),
            free_list: Vec::new(),
            root_index: NodeIndex::none(),
            leaf_count: 0,
            movement_margin: movement_margin.max(0.0),
            check_contacts: true,
            contacts: Vec::new(),
            pending_reinserts: Vec::new(),
        }
    }

    #[inline] #[must_use] pub fn collider_count(&self) -> usize { self.leaf_count }
    #[inline] #[must_use] pub fn movement_margin(&self) -> f32 { self.movement_margin }

    // applies to subsequent (re)insertions; existing fat bounds keep their old margin
    #[inline]
    pub fn set_movement_margin(&mut self, movement_margin: f32)
    {
        self.movement_margin = movement_margin.max(0.0);
    }

    #[inline] #[must_use] pub fn potential_contacts(&self) -> &[Contact<K>] { &self.contacts }
    #[inline] #[must_use] pub fn is_checking_contacts(&self) -> bool { self.check_contacts }
    #[inline] pub fn set_checking_contacts(&mut self, check: bool) { self.check_contacts = check; }
    #[inline] pub fn toggle_contact_check(&mut self) -> bool { self.check_contacts = !self.check_contacts; self.check_contacts }

    /// Insert a leaf for `key`, fattening its current bounds by the movement
    /// margin. Returns false (and changes nothing) for degenerate bounds.
    pub fn insert(&mut self, key: K, store: &impl ColliderStore<K>, is_static: bool, filter_flags: FilterFlags) -> bool
    {
        let bounds = store.bounds(key);
        if bounds.is_degenerate()
        {
            return false;
        }

        self.insert_leaf(key, bounds, is_static, filter_flags);
        debug_assert!(self.check_integrity(), "broad-phase integrity broken after insert");
        true
    }

    fn insert_leaf(&mut self, key: K, collider_bounds: AABB, is_static: bool, filter_flags: FilterFlags)
    {
        let fat_bounds = collider_bounds.expanded(self.movement_margin);
        let leaf_index = self.alloc_node(Node::leaf(key, fat_bounds, is_static, filter_flags));

        self.leaf_count += 1;
        if self.pending_reinserts.capacity() < self.leaf_count
        {
            let grow = self.leaf_count - self.pending_reinserts.capacity();
            self.pending_reinserts.reserve(grow);
        }

        if self.root_index.is_none()
        {
            self.root_index = leaf_index;
        }
        else
        {
            let sibling_index = self.find_best_sibling(fat_bounds);

            // splice a new branch over the chosen sibling
            let old_parent_index = self.nodes[sibling_index.0].parent_index;
            let new_parent_index = self.alloc_node(Node::branch(
                fat_bounds.unioned_with(self.nodes[sibling_index.0].bounds),
                old_parent_index,
                sibling_index,
                leaf_index));

            if old_parent_index.is_some()
            {
                let old_parent = &mut self.nodes[old_parent_index.0];
                if old_parent.left_child_index == sibling_index { old_parent.left_child_index = new_parent_index; }
                else { old_parent.right_child_index = new_parent_index; }
            }
            else
            {
                // sibling was root
                self.root_index = new_parent_index;
            }
            self.nodes[sibling_index.0].parent_index = new_parent_index;
            self.nodes[leaf_index.0].parent_index = new_parent_index;

            self.update_parent_data(new_parent_index);
        }

        if self.check_contacts
        {
            self.record_contacts(leaf_index);
        }
    }

    // branch-and-bound over a min-heap ordered by total cost: direct cost is the area of
    // candidate ∪ incoming, inherited cost is the area growth the union forces on each
    // ancestor. O(log n) amortized; not guaranteed optimal and never rebalanced afterwards
    #[must_use]
    fn find_best_sibling(&self, incoming: AABB) -> NodeIndex
    {
        let incoming_area = incoming.surface_area();

        let mut best_index = self.root_index;
        let mut best_cost = self.nodes[self.root_index.0].bounds.unioned_with(incoming).surface_area();

        let mut queue = BinaryHeap::new();
        queue.push(SiblingCandidate { cost: best_cost, inherited: 0.0, index: self.root_index });

        while let Some(candidate) = queue.pop()
        {
            if candidate.cost < best_cost
            {
                best_cost = candidate.cost;
                best_index = candidate.index;
            }

            let node = &self.nodes[candidate.index.0];
            if node.is_leaf()
            {
                continue;
            }

            let direct = candidate.cost - candidate.inherited;
            let child_inherited = candidate.inherited + (direct - node.bounds.surface_area());

            // no descendant can beat incoming's own area plus what its ancestors charge
            if incoming_area + child_inherited >= best_cost
            {
                continue;
            }

            for child_index in [node.left_child_index, node.right_child_index]
            {
                let child_direct = self.nodes[child_index.0].bounds.unioned_with(incoming).surface_area();
                queue.push(SiblingCandidate
                {
                    cost: child_direct + child_inherited,
                    inherited: child_inherited,
                    index: child_index,
                });
            }
        }

        best_index
    }

    // re-establish the union/OR invariant along the ancestor chain
    fn update_parent_data(&mut self, mut node_index: NodeIndex)
    {
        while node_index.is_some()
        {
            let node = &self.nodes[node_index.0];
            let parent_index = node.parent_index;
            let left = &self.nodes[node.left_child_index.0];
            let right = &self.nodes[node.right_child_index.0];

            let bounds = left.bounds.unioned_with(right.bounds);
            let filter_flags = left.filter_flags.union_with(right.filter_flags);
            let is_static = left.is_static || right.is_static;

            let node = &mut self.nodes[node_index.0];
            node.bounds = bounds;
            node.filter_flags = filter_flags;
            node.is_static = is_static;

            node_index = parent_index;
        }
    }

    // whole-tree sweep for leaves overlapping the new leaf's fat bounds,
    // pruned by filter masks; static-static pairs are never candidates
    fn record_contacts(&mut self, leaf_index: NodeIndex)
    {
        let NodeEntry::Leaf(leaf_key) = self.nodes[leaf_index.0].entry else { return; };
        let leaf = &self.nodes[leaf_index.0];
        let leaf_bounds = leaf.bounds;
        let leaf_filter = leaf.filter_flags;
        let leaf_static = leaf.is_static;

        let mut stack: SmallVec<[usize; 16]> = smallvec![self.root_index.0];
        while let Some(top) = stack.pop()
        {
            if top == leaf_index.0 { continue; }

            let node = &self.nodes[top];
            if !node.filter_flags.intersects(leaf_filter) { continue; }
            if !node.bounds.overlaps(leaf_bounds) { continue; }

            match node.entry
            {
                NodeEntry::Leaf(other_key) =>
                {
                    if leaf_static && node.is_static { continue; }
                    let contact = Contact
                    {
                        keys: [leaf_key, other_key],
                        filter_flags: [leaf_filter, node.filter_flags],
                        is_static: [leaf_static, node.is_static],
                    };
                    self.contacts.push(contact);
                }
                NodeEntry::Branch =>
                {
                    stack.push(node.left_child_index.0);
                    stack.push(node.right_child_index.0);
                }
                NodeEntry::Free => { debug_panic!("free node reachable from broad-phase root"); }
            }
        }
    }

    /// Remove the leaf inserted for `key`. Returns false if no such leaf
    /// exists. The lookup is a linear identity scan, O(n).
    pub fn remove(&mut self, key: K) -> bool
    {
        let leaf_index = self.find_leaf(key);
        if leaf_index.is_none()
        {
            return false;
        }

        self.remove_leaf(leaf_index);
        debug_assert!(self.check_integrity(), "broad-phase integrity broken after remove");
        true
    }

    #[must_use]
    fn find_leaf(&self, key: K) -> NodeIndex
    {
        for (i, node) in self.nodes.iter().enumerate()
        {
            if let NodeEntry::Leaf(leaf_key) = node.entry
            {
                if leaf_key == key
                {
                    return NodeIndex::some(i);
                }
            }
        }
        NodeIndex::none()
    }

    fn remove_leaf(&mut self, leaf_index: NodeIndex)
    {
        let NodeEntry::Leaf(key) = self.nodes[leaf_index.0].entry else
        {
            debug_panic!("remove_leaf called on a non-leaf node");
            return;
        };

        self.leaf_count -= 1;

        if leaf_index == self.root_index
        {
            self.free_node(leaf_index);
            self.root_index = NodeIndex::none();
            self.contacts.clear();
            return;
        }

        let leaf = &self.nodes[leaf_index.0];
        let parent_index = leaf.parent_index;
        let parent = &self.nodes[parent_index.0];
        let gparent_index = parent.parent_index;
        let sibling_index =
            if parent.left_child_index == leaf_index { parent.right_child_index }
            else { parent.left_child_index };

        if gparent_index.is_some()
        {
            // destroy parent and replace w/ leaf sibling
            let gparent = &mut self.nodes[gparent_index.0];
            if gparent.left_child_index == parent_index { gparent.left_child_index = sibling_index; }
            else { gparent.right_child_index = sibling_index; }

            self.nodes[sibling_index.0].parent_index = gparent_index;
            self.free_node(parent_index);

            self.update_parent_data(gparent_index);
        }
        else
        {
            self.root_index = sibling_index;
            self.nodes[sibling_index.0].parent_index = NodeIndex::none();
            self.free_node(parent_index);
        }

        self.free_node(leaf_index);
        self.contacts.retain(|contact| contact.keys[0] != key && contact.keys[1] != key);
    }

    /// One tick of lazy reinsertion: every leaf whose current collider bounds
    /// escaped its fat bounds is removed and reinserted at a freshly chosen
    /// position, as one batch after the scan so the traversal never walks a
    /// half-mutated tree. Returns the number of leaves reinserted.
    pub fn update(&mut self, store: &impl ColliderStore<K>) -> usize
    {
        if self.root_index.is_none()
        {
            return 0;
        }

        let mut queued = std::mem::take(&mut self.pending_reinserts);
        debug_assert!(queued.is_empty());

        let mut stack: SmallVec<[usize; 16]> = smallvec![self.root_index.0];
        while let Some(top) = stack.pop()
        {
            let node = &self.nodes[top];
            match node.entry
            {
                NodeEntry::Leaf(key) =>
                {
                    // static leaves rarely drift but nothing exempts them here
                    if !node.bounds.fully_contains(store.bounds(key))
                    {
                        queued.push(Reinsert
                        {
                            node: NodeIndex::some(top),
                            key,
                            filter_flags: node.filter_flags,
                            is_static: node.is_static,
                        });
                    }
                }
                NodeEntry::Branch =>
                {
                    stack.push(node.left_child_index.0);
                    stack.push(node.right_child_index.0);
                }
                NodeEntry::Free => { debug_panic!("free node reachable from broad-phase root"); }
            }
        }

        // remove everything first; the queued arena indices stay valid because
        // removing one leaf never moves another leaf's slot
        for record in &queued
        {
            self.remove_leaf(record.node);
        }
        // then reinsert against the new positions; the old nodes are gone so the
        // sibling search runs on the tree as it now stands
        let reinserted = queued.len();
        for record in queued.drain(..)
        {
            self.insert_leaf(record.key, store.bounds(record.key), record.is_static, record.filter_flags);
        }
        self.pending_reinserts = queued;

        if reinserted > 0
        {
            log::debug!("broad-phase reinserted {reinserted} drifted leaves");
        }
        debug_assert!(self.check_integrity(), "broad-phase integrity broken after update");
        reinserted
    }

    /// Drop every node, contact, and pending record.
    pub fn clear(&mut self)
    {
        self.nodes.clear();
        self.free_list.clear();
        self.root_index = NodeIndex::none();
        self.leaf_count = 0;
        self.contacts.clear();
        self.pending_reinserts.clear();
    }

    #[must_use]
    fn alloc_node(&mut self, node: Node<K>) -> NodeIndex
    {
        match self.free_list.pop()
        {
            Some(index) =>
            {
                debug_assert!(matches!(self.nodes[index.0].entry, NodeEntry::Free));
                self.nodes[index.0] = node;
                index
            }
            None =>
            {
                self.nodes.push(node);
                NodeIndex::some(self.nodes.len() - 1)
            }
        }
    }

    fn free_node(&mut self, node_index: NodeIndex)
    {
        let node = &mut self.nodes[node_index.0];
        if matches!(node.entry, NodeEntry::Free)
        {
            debug_panic!("double free of broad-phase node {:?}", node_index);
            return;
        }

        *node = Node::free();
        self.free_list.push(node_index);
    }
}
impl<K: Copy + PartialEq> Default for BroadPhase<K>
{
    fn default() -> Self { Self::new() }
}
