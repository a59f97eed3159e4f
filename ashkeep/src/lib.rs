//! Vulkanのオブジェクトの破棄順序と記録の手順を守らせるためのラッパーライブラリ。
//! Vulkanの各Objectを親オブジェクトと一緒に参照カウンタで管理して、参照がすべて破棄された際に
//! 親よりも先に自動で各種destroy処理を行うようにしたHandleが用意されている。
//!
//! 中心になるのは次の4つ。
//! - [`Handle`]: 生のVulkanハンドルと、共有所有する親オブジェクトと、破棄処理をまとめたもの
//! - [`DeviceMemoryHandle::map`]: 参照カウントで管理された冪等なメモリマップ
//! - [`CommandBufferHandle::begin`]から始まる記録スコープ (`RecordingScope` / `RenderPassScope`)
//! - [`utils::AutoDescriptorPool`]: 足りなくなると自動で増えるDescriptorSetのアロケータ
//!
//! 基本的にHandle系の構造体は元のVulkanのオブジェクトのメソッドを引き継いでいる。
//! Vulkanの標準以上の便利メソッドはutilsの中で提供する方針。
#![warn(missing_docs)]

mod error;
pub use error::*;
pub(crate) use error::VkResultExt;

pub mod handles;
pub use handles::*;

pub mod utils;

#[cfg(test)]
mod fake;
