pub mod backend;
pub mod controller;
pub mod accumulator;
pub mod gateway;
pub mod finalizer;
pub mod session;

pub use backend::*;
pub use controller::*;
pub use accumulator::*;
pub use gateway::*;
pub use finalizer::*;
pub use session::*;
