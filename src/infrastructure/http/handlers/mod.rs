//! HTTP Handlers

mod generate;
mod images;
mod ping;
mod upload;
mod websocket;

pub use generate::*;
pub use images::*;
pub use ping::*;
pub use upload::*;
pub use websocket::*;
