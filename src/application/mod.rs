//! Application services: cache-aside access and CRUD orchestration.

pub mod cache;
pub mod codec;
pub mod crud;
pub mod error;
pub mod repos;
