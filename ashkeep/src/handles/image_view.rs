//! 参照カウンタで管理して、参照がすべて破棄された際に
//! ImageViewの破棄の処理まで行うImageViewHandleを定義する。

use crate::{Handle, Result, VkResultExt};
use ash::vk;
use std::{fmt::Debug, ops::Deref};

use super::shared::Shared;

type ImageViewParents = (crate::DeviceHandle, crate::ImageHandle);

struct ImageViewHandleData {
    image_view: Handle<vk::ImageView, ImageViewParents>,
}

/// vk::ImageViewを参照カウントで管理するためのハンドル。
/// 元のImageHandleを保持する。
#[derive(Clone)]
pub struct ImageViewHandle(Shared<ImageViewHandleData>);
impl ImageViewHandle {
    pub(crate) fn new(
        device: crate::DeviceHandle,
        image: crate::ImageHandle,
        image_view_create_info: &vk::ImageViewCreateInfo,
    ) -> Result<Self> {
        let mut create_info = *image_view_create_info;
        create_info.image = *image;

        // create image view
        let image_view = unsafe {
            ash::Device::create_image_view(&device, &create_info, None)
                .created("vkCreateImageView")?
        };
        let image_view = Handle::new(
            image_view,
            |image_view, (device, _): &ImageViewParents| unsafe {
                device.destroy_image_view(image_view, None)
            },
            (device, image),
        );
        Ok(Self(Shared::new(ImageViewHandleData { image_view })))
    }

    // raw

    /// DeviceHandleを取得する
    pub fn device(&self) -> crate::DeviceHandle {
        self.0.image_view.parents().0.clone()
    }

    /// ImageHandleを取得する
    pub fn image(&self) -> crate::ImageHandle {
        self.0.image_view.parents().1.clone()
    }
}

// Debugトレイトの実装
impl Debug for ImageViewHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageViewHandle").finish()
    }
}

// ImageViewHandleはvk::ImageViewにDerefする
impl Deref for ImageViewHandle {
    type Target = vk::ImageView;
    fn deref(&self) -> &Self::Target {
        &self.0.image_view
    }
}
