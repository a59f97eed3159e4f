//! # Utility functions and structs
//! Vulkanの本体には存在しないがあると便利なutilityの関数たち。

mod setup;
pub use setup::*;
mod command_buffer;
pub use command_buffer::*;
mod buffer;
pub use buffer::*;
mod auto_descriptor_pool;
pub use auto_descriptor_pool::*;
mod sync_objects;
pub use sync_objects::*;
