mod node_index;
pub use node_index::*;

mod collider;
pub use collider::*;

mod broad_phase;
pub use broad_phase::*;

mod queries;
pub use queries::*;

mod debug;
pub use debug::*;
