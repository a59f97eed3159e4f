use ash::{prelude::VkResult, vk};
use thiserror::Error;

/// このクレートの操作が返すエラー
#[derive(Debug, Error)]
pub enum Error {
    /// Vulkanのオブジェクトの作成・割り当てが失敗した
    #[error("{call} failed: {result}")]
    ResourceCreationFailed {
        /// 失敗したVulkanの関数名
        call: &'static str,
        /// Vulkanが返したステータス
        result: vk::Result,
    },
    /// 作成以外のVulkanの呼び出しが失敗した
    #[error("{call} failed: {result}")]
    CallFailed {
        /// 失敗したVulkanの関数名
        call: &'static str,
        /// Vulkanが返したステータス
        result: vk::Result,
    },
    /// Vulkanのloaderを読み込めなかった
    #[error("failed to load the Vulkan loader: {0}")]
    LoaderUnavailable(String),
    /// 条件を満たすメモリタイプがなかった
    #[error("no memory type in {type_bits:#b} has {flags:?}")]
    NoSuitableMemoryType {
        /// 許可されているメモリタイプのbit
        type_bits: u32,
        /// 要求したプロパティ
        flags: vk::MemoryPropertyFlags,
    },
    /// 型では防げない使い方の誤り
    #[error("invalid usage: {0}")]
    InvalidUsage(#[from] InvalidUsage),
}

/// 実行時にチェックしている事前条件の違反
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum InvalidUsage {
    /// 記録中のCommandBufferに対してもう一度beginした
    #[error("command buffer is already recording")]
    AlreadyRecording,
    /// RenderPassが終わっていないのに記録を終えようとした
    #[error("a render pass is still active on this command buffer")]
    RenderPassActive,
    /// 生きている記録スコープがあるのにresetしようとした
    #[error("command buffer still has a live recording scope")]
    ScopeAlive,
    /// 記録が終わっていないCommandBufferをsubmitしようとした
    #[error("command buffer was submitted while still recording")]
    SubmitWhileRecording,
    /// メモリの確保範囲外をmapしようとした
    #[error("map of {size} bytes at offset {offset} exceeds allocation of {allocation_size} bytes")]
    MapOutOfBounds {
        /// 要求されたoffset
        offset: u64,
        /// 要求されたsize
        size: u64,
        /// 確保されているメモリのsize
        allocation_size: u64,
    },
    /// 存在しないメモリタイプを指定した
    #[error("memory type {0} does not exist on this device")]
    UnknownMemoryType(u32),
    /// host visibleではないメモリをmapしようとした
    #[error("memory type {0} is not host visible")]
    NotHostVisible(u32),
    /// mapされた範囲の外に読み書きしようとした
    #[error("access of {len} bytes at offset {offset} exceeds mapped view of {size} bytes")]
    ViewOutOfBounds {
        /// view内のoffset
        offset: u64,
        /// 読み書きしようとしたbyte数
        len: u64,
        /// viewのsize
        size: u64,
    },
    /// すでにメモリがbindされている
    #[error("memory is already bound to this resource")]
    MemoryAlreadyBound,
    /// 登録されていないDescriptorSetの型
    #[error("descriptor set type {0} is not registered")]
    UnknownDescriptorSetType(u32),
    /// すでに登録されているDescriptorSetの型
    #[error("descriptor set type {0} is already registered")]
    DescriptorSetTypeAlreadyRegistered(u32),
    /// 必要な拡張の関数がロードされていない
    #[error("{0} is not loaded on this device")]
    ExtensionNotLoaded(&'static str),
}

/// このクレートのResult型
pub type Result<T, E = Error> = std::result::Result<T, E>;

// ashのVkResultをこのクレートのエラーに変換する
pub(crate) trait VkResultExt<T> {
    fn created(self, call: &'static str) -> Result<T>;
    fn called(self, call: &'static str) -> Result<T>;
}
impl<T> VkResultExt<T> for VkResult<T> {
    fn created(self, call: &'static str) -> Result<T> {
        self.map_err(|result| Error::ResourceCreationFailed { call, result })
    }

    fn called(self, call: &'static str) -> Result<T> {
        self.map_err(|result| Error::CallFailed { call, result })
    }
}
