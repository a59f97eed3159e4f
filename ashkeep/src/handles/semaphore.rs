//! 参照カウンタで管理して、参照がすべて破棄された際に
//! Semaphoreの破棄の処理まで行うSemaphoreHandleを定義する。

use crate::{Handle, Result, VkResultExt};
use ash::vk;
use std::{fmt::Debug, ops::Deref};

use super::shared::Shared;

struct SemaphoreHandleData {
    semaphore: Handle<vk::Semaphore, crate::DeviceHandle>,
}

/// vk::Semaphoreを参照カウントで管理するためのハンドル
#[derive(Clone)]
pub struct SemaphoreHandle(Shared<SemaphoreHandleData>);
impl SemaphoreHandle {
    pub(crate) fn new(
        device: crate::DeviceHandle,
        semaphore_create_info: &vk::SemaphoreCreateInfo,
    ) -> Result<Self> {
        // create semaphore
        let semaphore = unsafe {
            ash::Device::create_semaphore(&device, semaphore_create_info, None)
                .created("vkCreateSemaphore")?
        };
        let semaphore = Handle::new(
            semaphore,
            |semaphore, device: &crate::DeviceHandle| unsafe {
                device.destroy_semaphore(semaphore, None)
            },
            device,
        );
        Ok(Self(Shared::new(SemaphoreHandleData { semaphore })))
    }

    /// DeviceHandleを取得する
    pub fn device(&self) -> crate::DeviceHandle {
        self.0.semaphore.parents().clone()
    }
}

impl Debug for SemaphoreHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SemaphoreHandle").finish()
    }
}

impl Deref for SemaphoreHandle {
    type Target = vk::Semaphore;
    fn deref(&self) -> &Self::Target {
        &self.0.semaphore
    }
}
