//! Generation Context - 生成参数

mod params;

pub use params::{parse_extra, GenerationParams, RESERVED_KEYS};
