//! SQLite Persistence - SQLite 数据库持久化实现

mod database;
mod image_repo;

pub use database::*;
pub use image_repo::*;
