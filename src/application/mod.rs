//! Application services layer.

pub mod error;
pub mod pagination;
pub mod posts;
pub mod repos;
pub mod social;
pub mod users;
