//! 参照カウンタで管理して、参照がすべて破棄された際に
//! RenderPassの破棄の処理まで行うRenderPassHandleを定義する。

use crate::{Handle, Result, VkResultExt};
use ash::vk;
use std::{fmt::Debug, ops::Deref};

use super::shared::Shared;

struct RenderPassHandleData {
    render_pass: Handle<vk::RenderPass, crate::DeviceHandle>,
}

/// vk::RenderPassを参照カウントで管理するためのハンドル
#[derive(Clone)]
pub struct RenderPassHandle(Shared<RenderPassHandleData>);
impl RenderPassHandle {
    pub(crate) fn new(
        device: crate::DeviceHandle,
        render_pass_create_info: &vk::RenderPassCreateInfo,
    ) -> Result<Self> {
        let render_pass = unsafe {
            ash::Device::create_render_pass(&device, render_pass_create_info, None)
                .created("vkCreateRenderPass")?
        };
        let render_pass = Handle::new(
            render_pass,
            |render_pass, device: &crate::DeviceHandle| unsafe {
                device.destroy_render_pass(render_pass, None)
            },
            device,
        );
        Ok(Self(Shared::new(RenderPassHandleData { render_pass })))
    }

    /// DeviceHandleを取得する
    pub fn device(&self) -> crate::DeviceHandle {
        self.0.render_pass.parents().clone()
    }
}

// Debugトレイトの実装
impl Debug for RenderPassHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderPassHandle").finish()
    }
}

// RenderPassHandleはvk::RenderPassにDerefする
impl Deref for RenderPassHandle {
    type Target = vk::RenderPass;
    fn deref(&self) -> &Self::Target {
        &self.0.render_pass
    }
}
