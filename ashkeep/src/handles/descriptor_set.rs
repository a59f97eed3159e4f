//! poolとlayoutを保持するDescriptorSetHandleを定義する。

use crate::Handle;
use ash::vk;
use std::{fmt::Debug, ops::Deref};

use super::shared::Shared;

type DescriptorSetParents = (crate::DescriptorPoolHandle, crate::DescriptorSetLayoutHandle);

struct DescriptorSetHandleData {
    descriptor_set: Handle<vk::DescriptorSet, DescriptorSetParents>,
}

/// vk::DescriptorSetを参照カウントで管理するためのハンドル。
/// 割り当て元のDescriptorPoolとDescriptorSetLayoutを保持する。
#[derive(Clone)]
pub struct DescriptorSetHandle(Shared<DescriptorSetHandleData>);
impl DescriptorSetHandle {
    pub(crate) fn new(
        descriptor_set: vk::DescriptorSet,
        pool: crate::DescriptorPoolHandle,
        layout: crate::DescriptorSetLayoutHandle,
        freeable: bool,
    ) -> Self {
        let descriptor_set = if freeable {
            Handle::new(
                descriptor_set,
                |descriptor_set, (pool, _): &DescriptorSetParents| unsafe {
                    if let Err(result) = pool
                        .device()
                        .free_descriptor_sets(**pool, &[descriptor_set])
                    {
                        log::error!("vkFreeDescriptorSets failed: {result}");
                    }
                },
                (pool, layout),
            )
        } else {
            Handle::borrowed(descriptor_set, (pool, layout))
        };
        Self(Shared::new(DescriptorSetHandleData { descriptor_set }))
    }

    /// 割り当て元のDescriptorPoolHandle
    pub fn pool(&self) -> &crate::DescriptorPoolHandle {
        &self.0.descriptor_set.parents().0
    }

    /// DescriptorSetLayoutHandle
    pub fn layout(&self) -> &crate::DescriptorSetLayoutHandle {
        &self.0.descriptor_set.parents().1
    }

    /// DeviceHandleを取得する
    pub fn device(&self) -> crate::DeviceHandle {
        self.pool().device()
    }
}

impl Debug for DescriptorSetHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DescriptorSetHandle").finish()
    }
}

impl Deref for DescriptorSetHandle {
    type Target = vk::DescriptorSet;
    fn deref(&self) -> &Self::Target {
        &self.0.descriptor_set
    }
}
