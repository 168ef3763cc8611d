//! API handlers organized by resource type.

mod comments;
mod posts;
mod social;
mod users;

pub use comments::*;
pub use posts::*;
pub use social::*;
pub use users::*;
