//! 参照カウンタで管理して、参照がすべて破棄された際に
//! DescriptorSetLayoutの破棄の処理まで行うDescriptorSetLayoutHandleを定義する。

use crate::{Handle, Result, VkResultExt};
use ash::vk;
use std::{fmt::Debug, ops::Deref};

use super::shared::Shared;

struct DescriptorSetLayoutHandleData {
    descriptor_set_layout: Handle<vk::DescriptorSetLayout, crate::DeviceHandle>,
}

/// vk::DescriptorSetLayoutを参照カウントで管理するためのハンドル
#[derive(Clone)]
pub struct DescriptorSetLayoutHandle(Shared<DescriptorSetLayoutHandleData>);
impl DescriptorSetLayoutHandle {
    pub(crate) fn new(
        device: crate::DeviceHandle,
        descriptor_set_layout_create_info: &vk::DescriptorSetLayoutCreateInfo,
    ) -> Result<Self> {
        // create descriptor set layout
        let descriptor_set_layout = unsafe {
            ash::Device::create_descriptor_set_layout(&device, descriptor_set_layout_create_info, None)
                .created("vkCreateDescriptorSetLayout")?
        };
        let descriptor_set_layout = Handle::new(
            descriptor_set_layout,
            |layout, device: &crate::DeviceHandle| unsafe {
                device.destroy_descriptor_set_layout(layout, None)
            },
            device,
        );
        Ok(Self(Shared::new(DescriptorSetLayoutHandleData {
            descriptor_set_layout,
        })))
    }

    /// 同じDescriptorSetLayoutを指しているかどうか
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Shared::ptr_eq(&self.0, &other.0)
    }

    // raw

    /// DeviceHandleを取得する
    pub fn device(&self) -> crate::DeviceHandle {
        self.0.descriptor_set_layout.parents().clone()
    }
}

// Debugトレイトの実装
impl Debug for DescriptorSetLayoutHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DescriptorSetLayoutHandle").finish()
    }
}

// DescriptorSetLayoutHandleはvk::DescriptorSetLayoutにDerefする
impl Deref for DescriptorSetLayoutHandle {
    type Target = vk::DescriptorSetLayout;
    fn deref(&self) -> &Self::Target {
        &self.0.descriptor_set_layout
    }
}
