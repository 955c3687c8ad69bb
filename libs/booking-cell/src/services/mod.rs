pub mod backend;
pub mod flows;
pub mod normalize;
pub mod registry;

pub use backend::*;
pub use flows::*;
pub use registry::*;
