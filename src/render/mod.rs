pub mod alpha;
pub mod cache;
pub mod outline;
pub mod renderer;
pub mod surface;
