pub mod context;
pub mod planner;
pub mod render;
pub mod script;
pub mod timeline;

pub use script::*;
pub use timeline::*;
