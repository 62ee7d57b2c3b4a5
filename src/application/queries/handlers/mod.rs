//! Query Handlers 实现
//!
//! 所有 QueryHandler 的具体实现

mod image_handlers;

pub use image_handlers::*;
