//! 参照カウンタで管理して、参照がすべて破棄された際に
//! Framebufferの破棄の処理まで行うFramebufferHandleを定義する。

use crate::{Handle, Result, VkResultExt};
use ash::vk;
use std::{fmt::Debug, ops::Deref};

use super::shared::Shared;

type FramebufferParents = (
    crate::DeviceHandle,
    crate::RenderPassHandle,
    Vec<crate::ImageViewHandle>,
);

struct FramebufferHandleData {
    framebuffer: Handle<vk::Framebuffer, FramebufferParents>,
    extent: vk::Extent2D,
}

/// vk::Framebufferを参照カウントで管理するためのハンドル。
/// RenderPassとattachmentのImageViewを保持する。
#[derive(Clone)]
pub struct FramebufferHandle(Shared<FramebufferHandleData>);
impl FramebufferHandle {
    pub(crate) fn new(
        device: crate::DeviceHandle,
        render_pass: crate::RenderPassHandle,
        attachments: Vec<crate::ImageViewHandle>,
        extent: vk::Extent2D,
        layers: u32,
    ) -> Result<Self> {
        let raw_attachments = attachments.iter().map(|view| **view).collect::<Vec<_>>();
        let create_info = vk::FramebufferCreateInfo::builder()
            .render_pass(*render_pass)
            .attachments(&raw_attachments)
            .width(extent.width)
            .height(extent.height)
            .layers(layers);
        let framebuffer = unsafe {
            ash::Device::create_framebuffer(&device, &create_info, None)
                .created("vkCreateFramebuffer")?
        };
        let framebuffer = Handle::new(
            framebuffer,
            |framebuffer, (device, _, _): &FramebufferParents| unsafe {
                device.destroy_framebuffer(framebuffer, None)
            },
            (device, render_pass, attachments),
        );
        Ok(Self(Shared::new(FramebufferHandleData {
            framebuffer,
            extent,
        })))
    }

    /// Framebufferの大きさ
    pub fn extent(&self) -> vk::Extent2D {
        self.0.extent
    }

    /// RenderPassHandleを取得する
    pub fn render_pass(&self) -> crate::RenderPassHandle {
        self.0.framebuffer.parents().1.clone()
    }

    /// attachmentのImageViewHandle
    pub fn attachments(&self) -> &[crate::ImageViewHandle] {
        &self.0.framebuffer.parents().2
    }

    /// DeviceHandleを取得する
    pub fn device(&self) -> crate::DeviceHandle {
        self.0.framebuffer.parents().0.clone()
    }
}

impl Debug for FramebufferHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FramebufferHandle").finish()
    }
}

impl Deref for FramebufferHandle {
    type Target = vk::Framebuffer;
    fn deref(&self) -> &Self::Target {
        &self.0.framebuffer
    }
}
