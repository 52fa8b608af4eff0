pub mod debounce;
pub mod engine;
pub mod live;
pub mod relations;
pub mod sort;

pub use debounce::*;
pub use engine::*;
pub use live::*;
pub use relations::*;
pub use sort::*;
