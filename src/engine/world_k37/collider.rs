use math_k37::{AABB, Ray};

// bitmask deciding which leaves are relevant to each other and to queries
#[derive(Clone, Copy, PartialEq, Eq, Default, Debug)]
pub struct FilterFlags(pub u32);
impl FilterFlags
{
    pub const NONE: Self = Self(0);
    pub const ALL: Self = Self(u32::MAX);

    #[inline] #[must_use] pub const fn intersects(self, rhs: Self) -> bool { (self.0 & rhs.0) != 0 }
    #[inline] #[must_use] pub const fn union_with(self, rhs: Self) -> Self { Self(self.0 | rhs.0) }
}

/// Read access to caller-owned collider geometry, keyed by the same opaque keys
/// handed to the broad phase. The broad phase never stores references into
/// caller memory; keys must stay resolvable until the matching leaf is removed.
pub trait ColliderStore<K>
{
    // current world-space bounds, unfattened
    fn bounds(&self, key: K) -> AABB;

    // entry distance along the ray; shaped colliders should override the slab-test fallback
    fn cast_ray(&self, key: K, ray: Ray) -> Option<f32>
    {
        self.bounds(key).cast_ray(ray)
    }
}

// plain boxes, keyed by index; useful as-is and for tests
impl ColliderStore<usize> for Vec<AABB>
{
    fn bounds(&self, key: usize) -> AABB { self[key] }
}
