//! 参照カウンタで管理して、参照がすべて破棄された際に
//! PipelineLayoutの破棄の処理まで行うPipelineLayoutHandleを定義する。

use crate::{Handle, Result, VkResultExt};
use ash::vk;
use std::{fmt::Debug, ops::Deref};

use super::shared::Shared;

type PipelineLayoutParents = (crate::DeviceHandle, Vec<crate::DescriptorSetLayoutHandle>);

struct PipelineLayoutHandleData {
    pipeline_layout: Handle<vk::PipelineLayout, PipelineLayoutParents>,
}

/// vk::PipelineLayoutを参照カウントで管理するためのハンドル。
/// 使用するDescriptorSetLayoutを保持する。
#[derive(Clone)]
pub struct PipelineLayoutHandle(Shared<PipelineLayoutHandleData>);
impl PipelineLayoutHandle {
    pub(crate) fn new(
        device: crate::DeviceHandle,
        set_layouts: Vec<crate::DescriptorSetLayoutHandle>,
        push_constant_ranges: &[vk::PushConstantRange],
    ) -> Result<Self> {
        let raw_set_layouts = set_layouts.iter().map(|layout| **layout).collect::<Vec<_>>();
        let create_info = vk::PipelineLayoutCreateInfo::builder()
            .set_layouts(&raw_set_layouts)
            .push_constant_ranges(push_constant_ranges);

        // create pipeline layout
        let pipeline_layout = unsafe {
            ash::Device::create_pipeline_layout(&device, &create_info, None)
                .created("vkCreatePipelineLayout")?
        };
        let pipeline_layout = Handle::new(
            pipeline_layout,
            |layout, (device, _): &PipelineLayoutParents| unsafe {
                device.destroy_pipeline_layout(layout, None)
            },
            (device, set_layouts),
        );
        Ok(Self(Shared::new(PipelineLayoutHandleData { pipeline_layout })))
    }

    /// DescriptorSetLayoutHandleの一覧
    pub fn set_layouts(&self) -> &[crate::DescriptorSetLayoutHandle] {
        &self.0.pipeline_layout.parents().1
    }

    // raw

    /// DeviceHandleを取得する
    pub fn device(&self) -> crate::DeviceHandle {
        self.0.pipeline_layout.parents().0.clone()
    }
}

// Debugトレイトの実装
impl Debug for PipelineLayoutHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineLayoutHandle").finish()
    }
}

// PipelineLayoutHandleはvk::PipelineLayoutにDerefする
impl Deref for PipelineLayoutHandle {
    type Target = vk::PipelineLayout;
    fn deref(&self) -> &Self::Target {
        &self.0.pipeline_layout
    }
}
