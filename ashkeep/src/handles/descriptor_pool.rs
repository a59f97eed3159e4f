//! 参照カウンタで管理して、参照がすべて破棄された際に
//! DescriptorPoolの破棄の処理まで行うDescriptorPoolHandleを定義する。

use crate::{Handle, Result, VkResultExt};
use ash::vk;
use std::{fmt::Debug, ops::Deref};

use super::shared::Shared;

struct DescriptorPoolHandleData {
    descriptor_pool: Handle<vk::DescriptorPool, crate::DeviceHandle>,
    flags: vk::DescriptorPoolCreateFlags,
    max_sets: u32,
}

/// vk::DescriptorPoolを参照カウントで管理するためのハンドル
#[derive(Clone)]
pub struct DescriptorPoolHandle(Shared<DescriptorPoolHandleData>);
impl DescriptorPoolHandle {
    pub(crate) fn new(
        device: crate::DeviceHandle,
        descriptor_pool_create_info: &vk::DescriptorPoolCreateInfo,
    ) -> Result<Self> {
        // create descriptor pool
        let descriptor_pool = unsafe {
            ash::Device::create_descriptor_pool(&device, descriptor_pool_create_info, None)
                .created("vkCreateDescriptorPool")?
        };
        let descriptor_pool = Handle::new(
            descriptor_pool,
            |pool, device: &crate::DeviceHandle| unsafe {
                device.destroy_descriptor_pool(pool, None)
            },
            device,
        );
        Ok(Self(Shared::new(DescriptorPoolHandleData {
            descriptor_pool,
            flags: descriptor_pool_create_info.flags,
            max_sets: descriptor_pool_create_info.max_sets,
        })))
    }

    // DescriptorPoolの関数

    /// `layouts`のそれぞれに対応するDescriptorSetHandleを割り当てる。
    /// poolがFREE_DESCRIPTOR_SETで作られていれば各setは破棄時にpoolへ返却され、
    /// そうでなければpoolの破棄と一緒に回収される。
    pub fn allocate_descriptor_sets(
        &self,
        layouts: &[crate::DescriptorSetLayoutHandle],
    ) -> Result<Vec<crate::DescriptorSetHandle>> {
        if layouts.is_empty() {
            return Ok(Vec::new());
        }
        let raw_layouts = layouts.iter().map(|layout| **layout).collect::<Vec<_>>();
        let allocate_info = vk::DescriptorSetAllocateInfo::builder()
            .descriptor_pool(self.0.descriptor_pool.raw())
            .set_layouts(&raw_layouts);
        let descriptor_sets = unsafe {
            self.device()
                .allocate_descriptor_sets(&allocate_info)
                .created("vkAllocateDescriptorSets")?
        };

        let freeable = self
            .0
            .flags
            .contains(vk::DescriptorPoolCreateFlags::FREE_DESCRIPTOR_SET);
        Ok(descriptor_sets
            .into_iter()
            .zip(layouts)
            .map(|(descriptor_set, layout)| {
                crate::DescriptorSetHandle::new(descriptor_set, self.clone(), layout.clone(), freeable)
            })
            .collect())
    }

    /// 作成時に指定した最大のset数
    pub fn max_sets(&self) -> u32 {
        self.0.max_sets
    }

    /// 作成時に指定したflags
    pub fn flags(&self) -> vk::DescriptorPoolCreateFlags {
        self.0.flags
    }

    // raw

    /// DeviceHandleを取得する
    pub fn device(&self) -> crate::DeviceHandle {
        self.0.descriptor_pool.parents().clone()
    }
}

// Debugトレイトの実装
impl Debug for DescriptorPoolHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DescriptorPoolHandle")
            .field("max_sets", &self.0.max_sets)
            .finish()
    }
}

// DescriptorPoolHandleはvk::DescriptorPoolにDerefする
impl Deref for DescriptorPoolHandle {
    type Target = vk::DescriptorPool;
    fn deref(&self) -> &Self::Target {
        &self.0.descriptor_pool
    }
}
