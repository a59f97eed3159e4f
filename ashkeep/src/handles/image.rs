//! 参照カウンタで管理して、参照がすべて破棄された際に
//! Imageの破棄の処理まで行うImageHandleを定義する。
//! Swapchainのimageの場合は破棄はSwapchainに任せて、Swapchainの寿命を延ばすだけになる。

use crate::{Handle, InvalidUsage, Result, VkResultExt};
use ash::vk;
use std::{fmt::Debug, ops::Deref, sync::OnceLock};

use super::shared::Shared;

type ImageParents = (crate::DeviceHandle, Option<crate::SwapchainHandle>);

struct ImageHandleData {
    image: Handle<vk::Image, ImageParents>,
    memory: OnceLock<crate::DeviceMemoryHandle>,
}

/// vk::Imageを参照カウントで管理するためのハンドル
#[derive(Clone)]
pub struct ImageHandle(Shared<ImageHandleData>);
impl ImageHandle {
    pub(crate) fn new(
        device: crate::DeviceHandle,
        image_create_info: &vk::ImageCreateInfo,
    ) -> Result<Self> {
        // create image
        let image = unsafe {
            ash::Device::create_image(&device, image_create_info, None)
                .created("vkCreateImage")?
        };
        let image = Handle::new(
            image,
            |image, (device, _): &ImageParents| unsafe { device.destroy_image(image, None) },
            (device, None),
        );
        Ok(Self::from_handle(image))
    }

    // Swapchainが所有しているimage
    pub(crate) fn from_swapchain(
        device: crate::DeviceHandle,
        swapchain: crate::SwapchainHandle,
        image: vk::Image,
    ) -> Self {
        Self::from_handle(Handle::borrowed(image, (device, Some(swapchain))))
    }

    fn from_handle(image: Handle<vk::Image, ImageParents>) -> Self {
        Self(Shared::new(ImageHandleData {
            image,
            memory: OnceLock::new(),
        }))
    }

    // Imageの関数

    /// Imageのメモリ要件を取得する
    pub fn get_image_memory_requirements(&self) -> vk::MemoryRequirements {
        unsafe { self.device().get_image_memory_requirements(self.0.image.raw()) }
    }

    /// Imageにメモリをbindする。
    /// bindしたメモリはImageが破棄されるまで保持される。
    pub fn bind_memory(
        &self,
        memory: &crate::DeviceMemoryHandle,
        offset: vk::DeviceSize,
    ) -> Result<()> {
        if self.is_swapchain_image() || self.0.memory.get().is_some() {
            return Err(InvalidUsage::MemoryAlreadyBound.into());
        }
        unsafe {
            self.device()
                .bind_image_memory(self.0.image.raw(), **memory, offset)
                .called("vkBindImageMemory")?;
        }
        self.0
            .memory
            .set(memory.clone())
            .map_err(|_| InvalidUsage::MemoryAlreadyBound.into())
    }

    /// bindされているメモリ
    pub fn memory(&self) -> Option<&crate::DeviceMemoryHandle> {
        self.0.memory.get()
    }

    /// Swapchainのimageかどうか
    pub fn is_swapchain_image(&self) -> bool {
        self.0.image.parents().1.is_some()
    }

    // raw

    /// DeviceHandleを取得する
    pub fn device(&self) -> crate::DeviceHandle {
        self.0.image.parents().0.clone()
    }
}

// Debugトレイトの実装
impl Debug for ImageHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageHandle").finish()
    }
}

// ImageHandleはvk::ImageにDerefする
impl Deref for ImageHandle {
    type Target = vk::Image;
    fn deref(&self) -> &Self::Target {
        &self.0.image
    }
}
