use glam::Vec3;
use math_k37::{Frustum, Intersection, Intersects, Ray};
use smallvec::{smallvec, SmallVec};
use crate::{BroadPhase, ColliderStore, FilterFlags, NodeEntry};

#[derive(Clone, Copy, PartialEq, Debug)]
pub struct RayHit<K>
{
    pub key: K,
    pub distance: f32, // entry distance along the ray
}

impl<K: Copy + PartialEq> BroadPhase<K>
{
    /// Closest collider hit by the ray, by entry distance. Branches are pruned
    /// with a slab test on their bounds; leaves delegate to the store's own
    /// ray test. Children are visited in tree order, not near-to-far, so the
    /// whole relevant subtree is always walked.
    #[must_use]
    pub fn cast_ray(&self, ray: Ray, filter_flags: FilterFlags, store: &impl ColliderStore<K>) -> Option<RayHit<K>>
    {
        if self.root_index.is_none()
        {
            return None;
        }

        let mut best: Option<RayHit<K>> = None;
        let mut stack: SmallVec<[usize; 16]> = smallvec![self.root_index.0];
        while let Some(top) = stack.pop()
        {
            let node = &self.nodes[top];
            if !node.filter_flags.intersects(filter_flags) { continue; }
            if node.bounds.cast_ray(ray).is_none() { continue; }

            match node.entry
            {
                NodeEntry::Leaf(key) =>
                {
                    if let Some(distance) = store.cast_ray(key, ray)
                    {
                        if best.as_ref().map_or(true, |b| distance < b.distance)
                        {
                            best = Some(RayHit { key, distance });
                        }
                    }
                }
                NodeEntry::Branch =>
                {
                    stack.push(node.left_child_index.0);
                    stack.push(node.right_child_index.0);
                }
                NodeEntry::Free => { }
            }
        }

        best
    }

    /// Leaves whose fat bounds contain the point. `.next()` alone is the
    /// cheap existence check; draining collects every match.
    #[must_use]
    pub fn iter_containing_point(&self, point: Vec3, filter_flags: FilterFlags) -> IterContainingPoint<'_, K>
    {
        IterContainingPoint
        {
            tree: self,
            point,
            filter_flags,
            stack: self.root_stack(),
        }
    }

    /// Leaves relevant to the frustum: accepted when the frustum intersects
    /// their bounds, or when their bounds contain the frustum origin (the
    /// camera sitting inside a volume).
    #[must_use]
    pub fn iter_in_frustum<'t>(&'t self, frustum: &'t Frustum, filter_flags: FilterFlags) -> IterInFrustum<'t, K>
    {
        IterInFrustum
        {
            tree: self,
            frustum,
            filter_flags,
            stack: self.root_stack(),
        }
    }

    fn root_stack(&self) -> SmallVec<[usize; 16]>
    {
        if self.root_index.is_some() { smallvec![self.root_index.0] } else { SmallVec::new() }
    }
}

pub struct IterContainingPoint<'t, K>
{
    tree: &'t BroadPhase<K>,
    point: Vec3,
    filter_flags: FilterFlags,
    stack: SmallVec<[usize; 16]>,
}
impl<'t, K: Copy + PartialEq> Iterator for IterContainingPoint<'t, K>
{
    type Item = K;
    fn next(&mut self) -> Option<K>
    {
        while let Some(top) = self.stack.pop()
        {
            let node = &self.tree.nodes[top];
            if !node.filter_flags.intersects(self.filter_flags) { continue; }
            if !node.bounds.contains_point(self.point) { continue; }

            match node.entry
            {
                NodeEntry::Leaf(key) => { return Some(key); }
                NodeEntry::Branch =>
                {
                    self.stack.push(node.left_child_index.0);
                    self.stack.push(node.right_child_index.0);
                }
                NodeEntry::Free => { }
            }
        }

        None
    }
}

pub struct IterInFrustum<'t, K>
{
    tree: &'t BroadPhase<K>,
    frustum: &'t Frustum,
    filter_flags: FilterFlags,
    stack: SmallVec<[usize; 16]>,
}
impl<'t, K: Copy + PartialEq> Iterator for IterInFrustum<'t, K>
{
    type Item = K;
    fn next(&mut self) -> Option<K>
    {
        while let Some(top) = self.stack.pop()
        {
            let node = &self.tree.nodes[top];
            if !node.filter_flags.intersects(self.filter_flags) { continue; }

            let accepted =
                self.frustum.get_intersection(node.bounds) != Intersection::None ||
                node.bounds.contains_point(self.frustum.origin());
            if !accepted { continue; }

            match node.entry
            {
                NodeEntry::Leaf(key) => { return Some(key); }
                NodeEntry::Branch =>
                {
                    self.stack.push(node.left_child_index.0);
                    self.stack.push(node.right_child_index.0);
                }
                NodeEntry::Free => { }
            }
        }

        None
    }
}
