//! CLI Support - 批量客户端的条目收集与终端进度

mod items;
mod progress;

pub use items::{collect_items, CollectError, INPUT_IMAGE_EXTENSIONS};
pub use progress::IndicatifProgress;
