//! 参照カウンタで管理して、参照がすべて破棄された際に
//! Fenceの破棄の処理まで行うFenceHandleを定義する。

use crate::{Error, Handle, Result, VkResultExt};
use ash::vk;
use std::{fmt::Debug, ops::Deref, time::Duration};

use super::shared::Shared;

// Vulkanのtimeoutはナノ秒のu64
pub(crate) fn timeout_nanos(timeout: Duration) -> u64 {
    u64::try_from(timeout.as_nanos()).unwrap_or(u64::MAX)
}

struct FenceHandleData {
    fence: Handle<vk::Fence, crate::DeviceHandle>,
}

/// vk::Fenceを参照カウントで管理するためのハンドル
#[derive(Clone)]
pub struct FenceHandle(Shared<FenceHandleData>);
impl FenceHandle {
    pub(crate) fn new(
        device: crate::DeviceHandle,
        fence_create_info: &vk::FenceCreateInfo,
    ) -> Result<Self> {
        // create fence
        let fence = unsafe {
            ash::Device::create_fence(&device, fence_create_info, None)
                .created("vkCreateFence")?
        };
        let fence = Handle::new(
            fence,
            |fence, device: &crate::DeviceHandle| unsafe { device.destroy_fence(fence, None) },
            device,
        );
        Ok(Self(Shared::new(FenceHandleData { fence })))
    }

    // Fenceの関数

    /// Fenceがシグナルされるまで最大`timeout`待機する。
    /// タイムアウトした場合は`Ok(false)`を返す。
    pub fn wait(&self, timeout: Duration) -> Result<bool> {
        let result = unsafe {
            ash::Device::wait_for_fences(
                &self.device(),
                &[self.0.fence.raw()],
                true,
                timeout_nanos(timeout),
            )
        };
        match result {
            Ok(()) => Ok(true),
            Err(vk::Result::TIMEOUT) => Ok(false),
            Err(result) => Err(Error::CallFailed {
                call: "vkWaitForFences",
                result,
            }),
        }
    }

    /// Fenceをリセットする
    pub fn reset(&self) -> Result<()> {
        unsafe {
            ash::Device::reset_fences(&self.device(), &[self.0.fence.raw()])
                .called("vkResetFences")
        }
    }

    /// Fenceがシグナルされているかどうか
    pub fn is_signaled(&self) -> Result<bool> {
        unsafe {
            self.device()
                .get_fence_status(self.0.fence.raw())
                .called("vkGetFenceStatus")
        }
    }

    // raw

    /// DeviceHandleを取得する
    pub fn device(&self) -> crate::DeviceHandle {
        self.0.fence.parents().clone()
    }
}

// Debugトレイトの実装
impl Debug for FenceHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FenceHandle").finish()
    }
}

// FenceHandleはvk::FenceにDerefする
impl Deref for FenceHandle {
    type Target = vk::Fence;
    fn deref(&self) -> &Self::Target {
        &self.0.fence
    }
}
