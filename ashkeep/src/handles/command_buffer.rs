//! 参照カウンタで管理して、参照がすべて破棄された際に
//! CommandBufferの破棄の処理まで行うCommandBufferHandleを定義する。
//!
//! CommandBufferは記録の状態を持ち、記録は[`CommandBufferHandle::begin`]で作る
//! [`crate::RecordingScope`]の中でだけ行える。

use crate::{Handle, InvalidUsage, Result, VkResultExt};
use ash::vk;
use std::{
    fmt::Debug,
    ops::Deref,
    sync::atomic::{AtomicU8, Ordering},
};

use super::shared::Shared;

/// CommandBufferの記録の状態
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum CommandBufferState {
    /// 記録していない
    Idle = 0,
    /// RecordingScopeが生きている
    Recording = 1,
    /// RenderPassScopeが生きている
    InRenderPass = 2,
}
impl CommandBufferState {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Recording,
            2 => Self::InRenderPass,
            _ => Self::Idle,
        }
    }
}

type CommandBufferParents = (crate::DeviceHandle, crate::CommandPoolHandle);

struct CommandBufferHandleData {
    command_buffer: Handle<vk::CommandBuffer, CommandBufferParents>,
    level: vk::CommandBufferLevel,
    state: AtomicU8,
}

/// vk::CommandBufferを参照カウントで管理するためのハンドル
#[derive(Clone)]
pub struct CommandBufferHandle(Shared<CommandBufferHandleData>);
impl CommandBufferHandle {
    pub(crate) fn allocate(
        device: crate::DeviceHandle,
        command_pool: crate::CommandPoolHandle,
        level: vk::CommandBufferLevel,
        count: u32,
    ) -> Result<Vec<Self>> {
        if count == 0 {
            return Ok(Vec::new());
        }
        let allocate_info = vk::CommandBufferAllocateInfo::builder()
            .command_pool(*command_pool)
            .level(level)
            .command_buffer_count(count);
        let command_buffers = unsafe {
            device
                .allocate_command_buffers(&allocate_info)
                .created("vkAllocateCommandBuffers")?
        };

        Ok(command_buffers
            .into_iter()
            .map(|command_buffer| {
                let command_buffer = Handle::new(
                    command_buffer,
                    |command_buffer, (device, pool): &CommandBufferParents| unsafe {
                        device.free_command_buffers(**pool, &[command_buffer])
                    },
                    (device.clone(), command_pool.clone()),
                );
                Self(Shared::new(CommandBufferHandleData {
                    command_buffer,
                    level,
                    state: AtomicU8::new(CommandBufferState::Idle as u8),
                }))
            })
            .collect())
    }

    // CommandBufferの関数

    /// 記録を開始する。
    /// 記録中のCommandBufferに対しては`InvalidUsage::AlreadyRecording`を返す。
    pub fn begin(&self, flags: vk::CommandBufferUsageFlags) -> Result<crate::RecordingScope> {
        self.begin_with(&vk::CommandBufferBeginInfo::builder().flags(flags))
    }

    /// Secondaryレベルの記録を開始する
    pub fn begin_secondary(
        &self,
        flags: vk::CommandBufferUsageFlags,
        inheritance_info: &vk::CommandBufferInheritanceInfo,
    ) -> Result<crate::RecordingScope> {
        self.begin_with(
            &vk::CommandBufferBeginInfo::builder()
                .flags(flags)
                .inheritance_info(inheritance_info),
        )
    }

    fn begin_with(&self, begin_info: &vk::CommandBufferBeginInfo) -> Result<crate::RecordingScope> {
        if !self.transition(CommandBufferState::Idle, CommandBufferState::Recording) {
            return Err(InvalidUsage::AlreadyRecording.into());
        }
        let result = unsafe {
            self.device()
                .begin_command_buffer(self.raw(), begin_info)
                .called("vkBeginCommandBuffer")
        };
        if let Err(error) = result {
            self.set_state(CommandBufferState::Idle);
            return Err(error);
        }
        log::trace!("begin recording {:?}", self.0.command_buffer);
        Ok(crate::RecordingScope::new(self.clone()))
    }

    /// CommandBufferをリセットする。
    /// 記録中は`InvalidUsage::ScopeAlive`を返す。
    pub fn reset(&self, flags: vk::CommandBufferResetFlags) -> Result<()> {
        if self.state() != CommandBufferState::Idle {
            return Err(InvalidUsage::ScopeAlive.into());
        }
        unsafe {
            self.device()
                .reset_command_buffer(self.raw(), flags)
                .called("vkResetCommandBuffer")
        }
    }

    /// 現在の記録の状態
    pub fn state(&self) -> CommandBufferState {
        CommandBufferState::from_u8(self.0.state.load(Ordering::Acquire))
    }

    /// CommandBufferのレベル
    pub fn level(&self) -> vk::CommandBufferLevel {
        self.0.level
    }

    pub(crate) fn transition(&self, from: CommandBufferState, to: CommandBufferState) -> bool {
        self.0
            .state
            .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub(crate) fn set_state(&self, state: CommandBufferState) {
        self.0.state.store(state as u8, Ordering::Release);
    }

    pub(crate) fn raw(&self) -> vk::CommandBuffer {
        self.0.command_buffer.raw()
    }

    // raw

    /// DeviceHandleを取得する
    pub fn device(&self) -> crate::DeviceHandle {
        self.0.command_buffer.parents().0.clone()
    }

    /// 割り当て元のCommandPoolHandleを取得する
    pub fn command_pool(&self) -> crate::CommandPoolHandle {
        self.0.command_buffer.parents().1.clone()
    }
}

// Debugトレイト実装
impl Debug for CommandBufferHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandBufferHandle")
            .field("state", &self.state())
            .finish()
    }
}

// CommandBufferHandleはvk::CommandBufferにDerefする
impl Deref for CommandBufferHandle {
    type Target = vk::CommandBuffer;
    fn deref(&self) -> &Self::Target {
        &self.0.command_buffer
    }
}
