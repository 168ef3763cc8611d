//! agora: social-graph REST backend fronted by a read-through response cache
//! with registry-based invalidation.

pub mod application;
pub mod cache;
pub mod config;
pub mod domain;
pub mod infra;
