//! Model Adapter - 图像推理客户端实现

mod fake_model_client;
mod http_model_client;

pub use fake_model_client::{FakeBehavior, FakeModelClient, TINY_PNG};
pub use http_model_client::{HttpModelClient, HttpModelClientConfig};
