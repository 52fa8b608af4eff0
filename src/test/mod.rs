mod catalog;
pub mod utils;
