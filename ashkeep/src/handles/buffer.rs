//! 参照カウンタで管理して、参照がすべて破棄された際に
//! Bufferの破棄の処理まで行うBufferHandleを定義する。

use crate::{Handle, InvalidUsage, Result, VkResultExt};
use ash::vk;
use std::{fmt::Debug, ops::Deref, sync::OnceLock};

use super::shared::Shared;

struct BufferHandleData {
    // bufferはbindしたメモリより先に破棄する
    buffer: Handle<vk::Buffer, crate::DeviceHandle>,
    size: vk::DeviceSize,
    memory: OnceLock<crate::DeviceMemoryHandle>,
}

/// vk::Bufferを参照カウントで管理するためのハンドル
#[derive(Clone)]
pub struct BufferHandle(Shared<BufferHandleData>);
impl BufferHandle {
    pub(crate) fn new(
        device: crate::DeviceHandle,
        buffer_create_info: &vk::BufferCreateInfo,
    ) -> Result<Self> {
        // create buffer
        let buffer = unsafe {
            ash::Device::create_buffer(&device, buffer_create_info, None)
                .created("vkCreateBuffer")?
        };
        let buffer = Handle::new(
            buffer,
            |buffer, device: &crate::DeviceHandle| unsafe { device.destroy_buffer(buffer, None) },
            device,
        );
        Ok(Self(Shared::new(BufferHandleData {
            buffer,
            size: buffer_create_info.size,
            memory: OnceLock::new(),
        })))
    }

    // Bufferの関数

    /// Bufferのメモリ要件を取得する
    pub fn get_buffer_memory_requirements(&self) -> vk::MemoryRequirements {
        unsafe {
            self.device()
                .get_buffer_memory_requirements(self.0.buffer.raw())
        }
    }

    /// Bufferにメモリをbindする。
    /// bindしたメモリはBufferが破棄されるまで保持される。
    pub fn bind_memory(
        &self,
        memory: &crate::DeviceMemoryHandle,
        offset: vk::DeviceSize,
    ) -> Result<()> {
        if self.0.memory.get().is_some() {
            return Err(InvalidUsage::MemoryAlreadyBound.into());
        }
        unsafe {
            self.device()
                .bind_buffer_memory(self.0.buffer.raw(), **memory, offset)
                .called("vkBindBufferMemory")?;
        }
        self.0
            .memory
            .set(memory.clone())
            .map_err(|_| InvalidUsage::MemoryAlreadyBound.into())
    }

    /// bindされているメモリ
    pub fn memory(&self) -> Option<&crate::DeviceMemoryHandle> {
        self.0.memory.get()
    }

    /// 作成時に指定したサイズ
    pub fn size(&self) -> vk::DeviceSize {
        self.0.size
    }

    // raw

    /// DeviceHandleを取得する
    pub fn device(&self) -> crate::DeviceHandle {
        self.0.buffer.parents().clone()
    }
}

// Debugトレイトの実装
impl Debug for BufferHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BufferHandle").finish()
    }
}

// BufferHandleはvk::BufferにDerefする
impl Deref for BufferHandle {
    type Target = vk::Buffer;
    fn deref(&self) -> &Self::Target {
        &self.0.buffer
    }
}
