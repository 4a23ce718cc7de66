use bitcode::{Decode, Encode};
use glam::{Vec3, Vec4, Vec4Swizzles};
use crate::{Facing, GetFacing};

const FACING_EPSILON: f32 = 1e-6;

// xyz is the normal, w is the signed offset; plane equation is n·p + w = 0
#[derive(Clone, Copy, PartialEq, Debug, Encode, Decode)]
pub struct Plane(pub Vec4);
impl Plane
{
    pub const NULL: Plane = Plane(Vec4::ZERO); // an invalid plane acting as a placeholder

    #[inline] #[must_use] pub fn new(normal: Vec3, offset: f32) -> Self { Self(normal.extend(offset)) }

    #[inline] #[must_use] pub fn normal(self) -> Vec3 { self.0.xyz() }
    #[inline] #[must_use] pub fn offset(self) -> f32 { self.0.w }

    #[inline] #[must_use]
    pub fn normalized(self) -> Self
    {
        Self(self.0 / self.0.xyz().length())
    }

    #[inline] #[must_use]
    pub fn signed_distance(self, point: Vec3) -> f32
    {
        self.normal().dot(point) + self.offset()
    }
}
impl From<Vec4> for Plane
{
    fn from(v: Vec4) -> Self { Self(v) }
}
impl GetFacing<Vec3> for Plane
{
    fn get_facing(&self, other: Vec3) -> Facing
    {
        let distance = self.signed_distance(other);
        if distance > FACING_EPSILON { Facing::InFront }
        else if distance < -FACING_EPSILON { Facing::Behind }
        else { Facing::On }
    }
}
