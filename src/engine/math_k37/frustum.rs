use std::fmt::{Debug, Formatter};
use glam::{Mat4, Vec3};
use nab_k37::utils::ShortTypeName;
use crate::{AABB, Facing, GetFacing, Intersection, Intersects, Plane};

#[derive(Clone, PartialEq)]
pub struct Frustum
{
    pub planes: [Plane; 6], // ordered left, right, top, bottom, near, far; normals point outward
    origin: Vec3,
}
impl Frustum
{
    pub const NULL: Frustum = Frustum { planes: [Plane::NULL; 6], origin: Vec3::ZERO }; // an invalid frustum acting as a placeholder

    // if input is projection, planes are in view space
    // if view projection, planes are in world space
    // origin is the apex (camera position) in the same space
    #[must_use]
    pub fn from_matrix(col_major_mtx: &Mat4, origin: Vec3) -> Self
    {
        let rows = col_major_mtx.transpose(); // glam stores in column-major
        let planes =
        [
            Plane::from(-(rows.w_axis + rows.x_axis)).normalized(), // left
            Plane::from(-(rows.w_axis - rows.x_axis)).normalized(), // right
            Plane::from(-(rows.w_axis - rows.y_axis)).normalized(), // top
            Plane::from(-(rows.w_axis + rows.y_axis)).normalized(), // bottom

            Plane::from(-rows.z_axis).normalized(), // near (0..1 clip depth)
            Plane::from(-(rows.w_axis - rows.z_axis)).normalized(), // far
        ];
        Self { planes, origin }
    }

    #[inline] #[must_use] pub fn left(&self) -> Plane { self.planes[0] }
    #[inline] #[must_use] pub fn right(&self) -> Plane { self.planes[1] }
    #[inline] #[must_use] pub fn top(&self) -> Plane { self.planes[2] }
    #[inline] #[must_use] pub fn bottom(&self) -> Plane { self.planes[3] }
    #[inline] #[must_use] pub fn near(&self) -> Plane { self.planes[4] }
    #[inline] #[must_use] pub fn far(&self) -> Plane { self.planes[5] }

    #[inline] #[must_use] pub fn origin(&self) -> Vec3 { self.origin }
}
impl Debug for Frustum
{
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result
    {
        f.debug_struct(Self::short_type_name())
            .field("left", &self.left())
            .field("right", &self.right())
            .field("top", &self.top())
            .field("bottom", &self.bottom())
            .field("near", &self.near())
            .field("far", &self.far())
            .field("origin", &self.origin)
            .finish()
    }
}
impl Intersects<Vec3> for Frustum
{
    fn get_intersection(&self, other: Vec3) -> Intersection
    {
        let mut inside = true;
        for p in &self.planes
        {
            inside &= matches!(p.get_facing(other), Facing::Behind | Facing::On);
        }
        match inside
        {
            true => Intersection::Overlapping,
            false => Intersection::None,
        }
    }
}
impl Intersects<AABB> for Frustum
{
    // conservative: a box hiding past a frustum corner can classify as overlapping
    fn get_intersection(&self, other: AABB) -> Intersection
    {
        let corners = other.corners();
        let mut fully_inside = true;
        for p in &self.planes
        {
            let mut in_front = 0;
            for corner in corners
            {
                if matches!(p.get_facing(corner), Facing::InFront)
                {
                    in_front += 1;
                }
            }

            if in_front == corners.len()
            {
                return Intersection::None;
            }
            if in_front > 0
            {
                fully_inside = false;
            }
        }

        match fully_inside
        {
            true => Intersection::FullyContained,
            false => Intersection::Overlapping,
        }
    }
}

#[cfg(test)]
mod tests
{
    use std::f32::consts::FRAC_PI_2;
    use super::*;

    // camera at the origin looking down +Z, 90 degree fov, near 1, far 10
    fn test_frustum() -> Frustum
    {
        let projection = Mat4::perspective_lh(FRAC_PI_2, 1.0, 1.0, 10.0);
        let view = Mat4::look_at_lh(Vec3::ZERO, Vec3::Z, Vec3::Y);
        Frustum::from_matrix(&(projection * view), Vec3::ZERO)
    }

    #[test]
    fn points()
    {
        let frustum = test_frustum();

        assert_eq!(frustum.get_intersection(Vec3::new(0.0, 0.0, 5.0)), Intersection::Overlapping);
        assert_eq!(frustum.get_intersection(Vec3::new(2.0, -1.0, 5.0)), Intersection::Overlapping);

        // behind the camera
        assert_eq!(frustum.get_intersection(Vec3::new(0.0, 0.0, -1.0)), Intersection::None);
        // before the near plane
        assert_eq!(frustum.get_intersection(Vec3::new(0.0, 0.0, 0.5)), Intersection::None);
        // past the far plane
        assert_eq!(frustum.get_intersection(Vec3::new(0.0, 0.0, 20.0)), Intersection::None);
        // outside the side planes
        assert_eq!(frustum.get_intersection(Vec3::new(50.0, 0.0, 5.0)), Intersection::None);
    }

    #[test]
    fn aabbs()
    {
        let frustum = test_frustum();

        let inside = AABB::from_center_half_size(Vec3::new(0.0, 0.0, 5.0), Vec3::ONE);
        assert_eq!(frustum.get_intersection(inside), Intersection::FullyContained);

        let past_far = AABB::from_center_half_size(Vec3::new(0.0, 0.0, 13.0), Vec3::ONE);
        assert_eq!(frustum.get_intersection(past_far), Intersection::None);

        let behind = AABB::from_center_half_size(Vec3::new(0.0, 0.0, -5.0), Vec3::ONE);
        assert_eq!(frustum.get_intersection(behind), Intersection::None);

        let straddling_near = AABB::from_center_half_size(Vec3::new(0.0, 0.0, 1.0), Vec3::splat(0.5));
        assert_eq!(frustum.get_intersection(straddling_near), Intersection::Overlapping);
    }

    #[test]
    fn origin_accessor()
    {
        let frustum = test_frustum();
        assert_eq!(frustum.origin(), Vec3::ZERO);
    }
}
