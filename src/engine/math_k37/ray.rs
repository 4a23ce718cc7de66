use glam::Vec3;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray
{
    pub origin: Vec3,
    pub direction: Vec3,
}
impl Ray
{
    // assumes normalized direction
    #[inline] #[must_use]
    pub fn new(origin: Vec3, direction: Vec3) -> Self { Self { origin, direction } }

    #[inline] #[must_use]
    pub fn point_at(self, distance: f32) -> Vec3 { self.origin + self.direction * distance }
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn point_at()
    {
        let ray = Ray::new(Vec3::ZERO, Vec3::X);
        assert_eq!(ray.point_at(0.0), Vec3::ZERO);
        assert_eq!(ray.point_at(2.5), Vec3::new(2.5, 0.0, 0.0));
    }
}
