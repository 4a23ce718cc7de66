mod aabb;
pub use aabb::*;

mod plane;
pub use plane::*;

mod frustum;
pub use frustum::*;

mod ray;
pub use ray::*;

pub use geometry_tests::*;
