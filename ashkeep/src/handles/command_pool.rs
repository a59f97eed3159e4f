//! 参照カウンタで管理して、参照がすべて破棄された際に
//! CommandPoolの破棄の処理まで行うCommandPoolHandleを定義する。

use crate::{Handle, Result, VkResultExt};
use ash::vk;
use std::{fmt::Debug, ops::Deref};

use super::shared::Shared;

struct CommandPoolHandleData {
    command_pool: Handle<vk::CommandPool, crate::DeviceHandle>,
    queue_family_index: u32,
}

/// vk::CommandPoolを参照カウントで管理するためのハンドル
#[derive(Clone)]
pub struct CommandPoolHandle(Shared<CommandPoolHandleData>);
impl CommandPoolHandle {
    pub(crate) fn new(
        device: crate::DeviceHandle,
        command_pool_create_info: &vk::CommandPoolCreateInfo,
    ) -> Result<Self> {
        // create command pool
        let command_pool = unsafe {
            ash::Device::create_command_pool(&device, command_pool_create_info, None)
                .created("vkCreateCommandPool")?
        };
        let command_pool = Handle::new(
            command_pool,
            |pool, device: &crate::DeviceHandle| unsafe { device.destroy_command_pool(pool, None) },
            device,
        );
        Ok(Self(Shared::new(CommandPoolHandleData {
            command_pool,
            queue_family_index: command_pool_create_info.queue_family_index,
        })))
    }

    // CommandPoolの関数

    /// CommandBufferHandleを`count`個割り当てる。
    /// 各CommandBufferはこのCommandPoolを保持し、破棄時にこのCommandPoolへ返却される。
    pub fn allocate_command_buffers(
        &self,
        level: vk::CommandBufferLevel,
        count: u32,
    ) -> Result<Vec<crate::CommandBufferHandle>> {
        crate::CommandBufferHandle::allocate(self.device(), self.clone(), level, count)
    }

    /// 作成時に指定したQueueFamilyのindex
    pub fn queue_family_index(&self) -> u32 {
        self.0.queue_family_index
    }

    // raw

    /// DeviceHandleを取得する
    pub fn device(&self) -> crate::DeviceHandle {
        self.0.command_pool.parents().clone()
    }
}

// Debugトレイトの実装
impl Debug for CommandPoolHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandPoolHandle").finish()
    }
}

// CommandPoolHandleはvk::CommandPoolにDerefする
impl Deref for CommandPoolHandle {
    type Target = vk::CommandPool;
    fn deref(&self) -> &Self::Target {
        &self.0.command_pool
    }
}
