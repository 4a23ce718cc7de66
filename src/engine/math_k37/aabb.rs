use bitcode::{Decode, Encode};
use glam::Vec3;
use crate::{Intersection, Intersects, Ray};

#[derive(Default, Debug, Clone, Copy, PartialEq, Encode, Decode)]
pub struct AABB
{
    pub min: Vec3,
    pub max: Vec3,
}
impl AABB
{
    pub const MIN_MAX: Self = Self { min: Vec3::MIN, max: Vec3::MAX }; // for 'universe' queries
    pub const MAX_MIN: Self = Self { min: Vec3::MAX, max: Vec3::MIN }; // for finding min volume

    #[inline] #[must_use] pub const fn new(min: Vec3, max: Vec3) -> Self { Self { min, max } }
    #[inline] #[must_use] pub const fn empty() -> Self { Self { min: Vec3::ZERO, max: Vec3::ZERO } }

    #[must_use]
    pub fn from_center_half_size(center: Vec3, half_size: Vec3) -> Self
    {
        Self { min: center - half_size, max: center + half_size }
    }

    #[inline] #[must_use] pub fn size(self) -> Vec3 { self.max - self.min }
    #[inline] #[must_use] pub fn half(self) -> Vec3 { (self.max - self.min) / 2.0 }
    #[inline] #[must_use] pub fn center(self) -> Vec3 { (self.min + self.max) / 2.0 }

    #[inline] #[must_use]
    pub fn volume(self) -> f32
    {
        let size = self.size();
        size.x * size.y * size.z
    }

    #[inline] #[must_use]
    pub fn surface_area(self) -> f32
    {
        let size = self.size();
        2.0 * (size.x * size.y + size.y * size.z + size.z * size.x)
    }

    #[inline] #[must_use]
    pub fn max_axis(self) -> f32
    {
        let size = self.size();
        size.x.max(size.y.max(size.z))
    }

    // min > max on any axis, or non-finite corners
    #[inline] #[must_use]
    pub fn is_degenerate(self) -> bool
    {
        !self.min.cmple(self.max).all() || !self.min.is_finite() || !self.max.is_finite()
    }

    #[inline]
    pub fn union_with(&mut self, other: Self)
    {
        *self = self.unioned_with(other);
    }

    #[inline] #[must_use]
    pub fn unioned_with(self, rhs: Self) -> Self
    {
        Self
        {
            min: self.min.min(rhs.min),
            max: self.max.max(rhs.max),
        }
    }

    // grow by a fixed margin on every axis
    #[inline] #[must_use]
    pub fn expanded(self, margin: f32) -> Self
    {
        Self
        {
            min: self.min - margin,
            max: self.max + margin,
        }
    }

    #[must_use]
    pub fn fully_contains(self, rhs: Self) -> bool
    {
        self.min.cmple(rhs.min).all() &&
        self.max.cmpge(rhs.max).all()
    }

    #[must_use]
    pub fn overlaps(self, rhs: Self) -> bool
    {
        self.min.cmple(rhs.max).all() &&
        self.max.cmpge(rhs.min).all()
    }

    #[inline] #[must_use]
    pub fn contains_point(self, point: Vec3) -> bool
    {
        self.min.cmple(point).all() &&
        self.max.cmpge(point).all()
    }

    #[must_use]
    pub fn corners(self) -> [Vec3; 8]
    {
        [
            Vec3::new(self.min.x, self.min.y, self.min.z),
            Vec3::new(self.max.x, self.min.y, self.min.z),
            Vec3::new(self.min.x, self.max.y, self.min.z),
            Vec3::new(self.max.x, self.max.y, self.min.z),
            Vec3::new(self.min.x, self.min.y, self.max.z),
            Vec3::new(self.max.x, self.min.y, self.max.z),
            Vec3::new(self.min.x, self.max.y, self.max.z),
            Vec3::new(self.max.x, self.max.y, self.max.z),
        ]
    }

    // slab test; returns the entry distance along the ray (0 if the ray starts inside)
    #[must_use]
    pub fn cast_ray(self, ray: Ray) -> Option<f32>
    {
        let inv_dir = ray.direction.recip();
        let t1 = (self.min - ray.origin) * inv_dir;
        let t2 = (self.max - ray.origin) * inv_dir;

        let t_near = t1.min(t2);
        let t_far = t1.max(t2);

        let t_enter = t_near.max_element().max(0.0);
        let t_exit = t_far.min_element();

        (t_enter <= t_exit).then_some(t_enter)
    }
}
impl Intersects<AABB> for AABB
{
    fn get_intersection(&self, other: AABB) -> Intersection
    {
        if !self.overlaps(other) { Intersection::None }
        else if self.fully_contains(other) { Intersection::FullyContained }
        else { Intersection::Overlapping }
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn empty()
    {
        let aabb = AABB::default();
        assert_eq!(aabb.size(), Vec3::ZERO);
        assert_eq!(aabb.center(), Vec3::ZERO);
        assert_eq!(aabb.volume(), 0.0);
        assert_eq!(aabb.surface_area(), 0.0);
        assert!(!aabb.is_degenerate());
    }

    #[test]
    fn sizes()
    {
        let aabb = AABB::new(Vec3::splat(-2.0), Vec3::splat(2.0));
        assert_eq!(aabb.size(), Vec3::splat(4.0));
        assert_eq!(aabb.center(), Vec3::ZERO);
        assert_eq!(aabb.volume(), 4.0f32.powi(3));
        assert_eq!(aabb.surface_area(), 4.0 * 4.0 * 6.0);

        assert_eq!(AABB::from_center_half_size(Vec3::ZERO, Vec3::splat(2.0)), aabb);
    }

    #[test]
    fn union()
    {
        let a = AABB::new(Vec3::ZERO, Vec3::new(1.0, 5.0, 3.0));
        let b = AABB::new(Vec3::ONE, Vec3::new(2.0, 3.0, 4.0));

        assert_eq!(a.unioned_with(b), AABB::new(Vec3::ZERO, Vec3::new(2.0, 5.0, 4.0)));

        let mut c = AABB::empty();
        c.union_with(a);
        assert_eq!(c, a);
    }

    #[test]
    fn expand()
    {
        let aabb = AABB::new(Vec3::ONE, Vec3::splat(2.0));
        let fat = aabb.expanded(0.5);
        assert_eq!(fat, AABB::new(Vec3::splat(0.5), Vec3::splat(2.5)));
        assert!(fat.fully_contains(aabb));
    }

    #[test]
    fn degenerate()
    {
        assert!(AABB::MAX_MIN.is_degenerate());
        assert!(AABB::new(Vec3::splat(f32::NAN), Vec3::ONE).is_degenerate());
        assert!(AABB::new(Vec3::ONE, Vec3::ZERO).is_degenerate());
        assert!(!AABB::new(Vec3::ZERO, Vec3::ZERO).is_degenerate());
        assert!(!AABB::MIN_MAX.is_degenerate());
    }

    #[test]
    fn fully_contains()
    {
        let inner = AABB::new(Vec3::ONE, Vec3::splat(3.0));
        let outer = AABB::new(Vec3::ZERO, Vec3::splat(4.0));
        assert!(outer.fully_contains(inner));
        assert!(!inner.fully_contains(outer));

        // touching edges
        let inner = outer;
        assert!(outer.fully_contains(inner));
        assert!(inner.fully_contains(outer));

        // overlap
        let inner = AABB::new(Vec3::ONE, Vec3::splat(5.0));
        assert!(!outer.fully_contains(inner));
        assert!(!inner.fully_contains(outer));

        // no overlap
        let inner = AABB::new(Vec3::splat(10.0), Vec3::splat(15.0));
        assert!(!outer.fully_contains(inner));
        assert!(!inner.fully_contains(outer));
    }

    #[test]
    fn overlaps()
    {
        let a = AABB::new(Vec3::ONE, Vec3::splat(3.0));
        let b = AABB::new(Vec3::ZERO, Vec3::splat(4.0));
        assert!(a.overlaps(b));
        assert!(b.overlaps(a));

        // touching edges
        let b = AABB::new(Vec3::splat(3.0), Vec3::splat(5.0));
        assert!(a.overlaps(b));
        assert!(b.overlaps(a));

        // no overlap
        let b = AABB::new(Vec3::splat(10.0), Vec3::splat(15.0));
        assert!(!a.overlaps(b));
        assert!(!b.overlaps(a));
    }

    #[test]
    fn intersection_classes()
    {
        let outer = AABB::new(Vec3::ZERO, Vec3::splat(4.0));
        assert_eq!(outer.get_intersection(AABB::new(Vec3::ONE, Vec3::splat(2.0))), Intersection::FullyContained);
        assert_eq!(outer.get_intersection(AABB::new(Vec3::ONE, Vec3::splat(5.0))), Intersection::Overlapping);
        assert_eq!(outer.get_intersection(AABB::new(Vec3::splat(10.0), Vec3::splat(11.0))), Intersection::None);
    }

    #[test]
    fn point_containment()
    {
        let aabb = AABB::new(Vec3::splat(-1.0), Vec3::ONE);
        assert!(aabb.contains_point(Vec3::ZERO));
        assert!(aabb.contains_point(Vec3::ONE)); // on the boundary
        assert!(!aabb.contains_point(Vec3::splat(1.1)));
    }

    #[test]
    fn corners()
    {
        let aabb = AABB::new(Vec3::ZERO, Vec3::ONE);
        let corners = aabb.corners();
        for corner in corners
        {
            assert!(aabb.contains_point(corner));
        }
        assert_eq!(corners[0], Vec3::ZERO);
        assert_eq!(corners[7], Vec3::ONE);
    }

    #[test]
    fn ray_cast()
    {
        let aabb = AABB::new(Vec3::new(4.0, -1.0, -1.0), Vec3::new(6.0, 1.0, 1.0));

        // straight through the middle
        let hit = aabb.cast_ray(Ray::new(Vec3::ZERO, Vec3::X));
        assert_eq!(hit, Some(4.0));

        // pointing away
        assert_eq!(aabb.cast_ray(Ray::new(Vec3::ZERO, -Vec3::X)), None);

        // parallel miss
        assert_eq!(aabb.cast_ray(Ray::new(Vec3::new(0.0, 5.0, 0.0), Vec3::X)), None);

        // starting inside
        let hit = aabb.cast_ray(Ray::new(Vec3::new(5.0, 0.5, 0.5), Vec3::X));
        assert_eq!(hit, Some(0.0));

        // diagonal
        let origin = Vec3::new(3.0, -2.0, 0.0);
        let direction = (Vec3::new(5.0, 0.0, 0.0) - origin).normalize();
        assert!(aabb.cast_ray(Ray::new(origin, direction)).is_some());
    }
}
