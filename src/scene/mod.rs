mod camera;
mod node;

pub use camera::{Camera, RenderHook};
pub use node::Node;
