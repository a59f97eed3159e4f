//! 参照カウンタで管理して、参照がすべて破棄された際に
//! Samplerの破棄の処理まで行うSamplerHandleを定義する。

use crate::{Handle, Result, VkResultExt};
use ash::vk;
use std::{fmt::Debug, ops::Deref};

use super::shared::Shared;

struct SamplerHandleData {
    sampler: Handle<vk::Sampler, crate::DeviceHandle>,
}

/// vk::Samplerを参照カウントで管理するためのハンドル
#[derive(Clone)]
pub struct SamplerHandle(Shared<SamplerHandleData>);
impl SamplerHandle {
    pub(crate) fn new(
        device: crate::DeviceHandle,
        sampler_create_info: &vk::SamplerCreateInfo,
    ) -> Result<Self> {
        let sampler = unsafe {
            ash::Device::create_sampler(&device, sampler_create_info, None)
                .created("vkCreateSampler")?
        };
        let sampler = Handle::new(
            sampler,
            |sampler, device: &crate::DeviceHandle| unsafe { device.destroy_sampler(sampler, None) },
            device,
        );
        Ok(Self(Shared::new(SamplerHandleData { sampler })))
    }

    /// DeviceHandleを取得する
    pub fn device(&self) -> crate::DeviceHandle {
        self.0.sampler.parents().clone()
    }
}

impl Debug for SamplerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SamplerHandle").finish()
    }
}

impl Deref for SamplerHandle {
    type Target = vk::Sampler;
    fn deref(&self) -> &Self::Target {
        &self.0.sampler
    }
}
