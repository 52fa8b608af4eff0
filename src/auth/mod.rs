pub mod accounts;
pub mod authentication;
pub mod gate;
pub mod permissions;
pub mod user;

pub use accounts::*;
pub use authentication::*;
pub use gate::*;
pub use permissions::*;
pub use user::*;
