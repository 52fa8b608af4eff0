pub mod document;
pub mod entity;
pub mod form;
pub mod store;
pub mod table;

pub use document::*;
pub use entity::*;
pub use form::*;
pub use store::*;
pub use table::*;
