//! 参照カウンタで管理して、参照がすべて破棄された際に
//! Swapchainの破棄の処理まで行うSwapchainHandleを定義する。

use crate::{Error, Handle, Result, VkResultExt};
use ash::{prelude::VkResult, vk};
use std::{fmt::Debug, ops::Deref, time::Duration};

use super::shared::Shared;

type SwapchainParents = (crate::DeviceHandle, crate::SurfaceHandle);

struct SwapchainHandleData {
    swapchain: Handle<vk::SwapchainKHR, SwapchainParents>,
    format: vk::Format,
    extent: vk::Extent2D,
}

/// vk::SwapchainKHRを参照カウントで管理するためのハンドル
#[derive(Clone)]
pub struct SwapchainHandle(Shared<SwapchainHandleData>);
impl SwapchainHandle {
    pub(crate) fn new(
        device: crate::DeviceHandle,
        surface: crate::SurfaceHandle,
        swapchain_create_info: &vk::SwapchainCreateInfoKHR,
    ) -> Result<Self> {
        let mut create_info = *swapchain_create_info;
        create_info.surface = *surface;

        // create swapchain
        let loader = device.swapchain_loader()?.clone();
        let swapchain = unsafe {
            loader
                .create_swapchain(&create_info, None)
                .created("vkCreateSwapchainKHR")?
        };
        let swapchain = Handle::new(
            swapchain,
            move |swapchain, _: &SwapchainParents| unsafe {
                loader.destroy_swapchain(swapchain, None)
            },
            (device, surface),
        );
        Ok(Self(Shared::new(SwapchainHandleData {
            swapchain,
            format: create_info.image_format,
            extent: create_info.image_extent,
        })))
    }

    // Swapchainの関数

    /// Swapchainのimageを取得する。
    /// 各ImageHandleはこのSwapchainを保持し、破棄はSwapchainに任せる。
    pub fn get_images(&self) -> Result<Vec<crate::ImageHandle>> {
        let images = unsafe {
            self.device()
                .swapchain_loader()?
                .get_swapchain_images(self.0.swapchain.raw())
                .called("vkGetSwapchainImagesKHR")?
        };
        Ok(images
            .into_iter()
            .map(|image| crate::ImageHandle::from_swapchain(self.device(), self.clone(), image))
            .collect())
    }

    /// 次の表示イメージを取得する。
    /// 戻り値はimageのindexと、Swapchainがsuboptimalかどうか。
    /// `timeout`以内に取得できなければ`Ok(None)`を返す。
    pub fn acquire_next_image(
        &self,
        timeout: Duration,
        semaphore: Option<&crate::SemaphoreHandle>,
        fence: Option<&crate::FenceHandle>,
    ) -> Result<Option<(u32, bool)>> {
        let semaphore = semaphore.map(|s| **s).unwrap_or_default();
        let fence = fence.map(|f| **f).unwrap_or_default();
        let result = unsafe {
            self.device().swapchain_loader()?.acquire_next_image(
                self.0.swapchain.raw(),
                super::fence::timeout_nanos(timeout),
                semaphore,
                fence,
            )
        };
        acquired_image(result)
    }

    /// imageのformat
    pub fn format(&self) -> vk::Format {
        self.0.format
    }

    /// imageの大きさ
    pub fn extent(&self) -> vk::Extent2D {
        self.0.extent
    }

    // raw

    /// DeviceHandleを取得する
    pub fn device(&self) -> crate::DeviceHandle {
        self.0.swapchain.parents().0.clone()
    }

    /// SurfaceHandleを取得する
    pub fn surface(&self) -> crate::SurfaceHandle {
        self.0.swapchain.parents().1.clone()
    }
}

// TIMEOUTとNOT_READYはまだ取得できていないだけなのでNoneにする
fn acquired_image(result: VkResult<(u32, bool)>) -> Result<Option<(u32, bool)>> {
    match result {
        Ok(acquired) => Ok(Some(acquired)),
        Err(vk::Result::TIMEOUT | vk::Result::NOT_READY) => Ok(None),
        Err(result) => Err(Error::CallFailed {
            call: "vkAcquireNextImageKHR",
            result,
        }),
    }
}

// Debugトレイトの実装
impl Debug for SwapchainHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SwapchainHandle").finish()
    }
}

// SwapchainHandleはvk::SwapchainKHRにDerefする
impl Deref for SwapchainHandle {
    type Target = vk::SwapchainKHR;
    fn deref(&self) -> &Self::Target {
        &self.0.swapchain
    }
}
