//! 参照カウンタで管理して、参照がすべて破棄された際に
//! Surfaceの破棄の処理まで行うSurfaceHandleを定義する。

use crate::{Handle, Result, VkResultExt};
use ash::{extensions::khr::Surface, vk};
use std::{fmt::Debug, ops::Deref};

use super::shared::Shared;

struct SurfaceHandleData {
    surface: Handle<vk::SurfaceKHR, crate::InstanceHandle>,
    surface_loader: Surface,
}

/// vk::SurfaceKHRを参照カウントで管理するためのハンドル
#[derive(Clone)]
pub struct SurfaceHandle(Shared<SurfaceHandleData>);
impl SurfaceHandle {
    pub(crate) fn new(
        instance: crate::InstanceHandle,
        raw_display_handle: raw_window_handle::RawDisplayHandle,
        raw_window_handle: raw_window_handle::RawWindowHandle,
    ) -> Result<Self> {
        // surfaceの作成
        let surface_loader = Surface::new(instance.entry(), &instance);
        let surface = unsafe {
            ash_window::create_surface(
                instance.entry(),
                &instance,
                raw_display_handle,
                raw_window_handle,
                None,
            )
            .created("vkCreateSurfaceKHR")?
        };

        let loader = surface_loader.clone();
        let surface = Handle::new(
            surface,
            move |surface, _: &crate::InstanceHandle| unsafe {
                loader.destroy_surface(surface, None)
            },
            instance,
        );
        Ok(Self(Shared::new(SurfaceHandleData {
            surface,
            surface_loader,
        })))
    }

    // surfaceの関数

    /// PhysicalDeviceのQueueFamilyがSurfaceへのpresentをサポートしているか確認する
    pub fn get_physical_device_surface_support(
        &self,
        physical_device: vk::PhysicalDevice,
        queue_family_index: u32,
    ) -> Result<bool> {
        unsafe {
            self.0
                .surface_loader
                .get_physical_device_surface_support(
                    physical_device,
                    queue_family_index,
                    self.0.surface.raw(),
                )
                .called("vkGetPhysicalDeviceSurfaceSupportKHR")
        }
    }

    /// PhysicalDeviceのSurfaceのCapabilitiesを取得する
    pub fn get_physical_device_surface_capabilities(
        &self,
        physical_device: vk::PhysicalDevice,
    ) -> Result<vk::SurfaceCapabilitiesKHR> {
        unsafe {
            self.0
                .surface_loader
                .get_physical_device_surface_capabilities(physical_device, self.0.surface.raw())
                .called("vkGetPhysicalDeviceSurfaceCapabilitiesKHR")
        }
    }

    /// PhysicalDeviceのSurfaceのFormatsを取得する
    pub fn get_physical_device_surface_formats(
        &self,
        physical_device: vk::PhysicalDevice,
    ) -> Result<Vec<vk::SurfaceFormatKHR>> {
        unsafe {
            self.0
                .surface_loader
                .get_physical_device_surface_formats(physical_device, self.0.surface.raw())
                .called("vkGetPhysicalDeviceSurfaceFormatsKHR")
        }
    }

    /// PhysicalDeviceのSurfaceのPresentModesを取得する
    pub fn get_physical_device_surface_present_modes(
        &self,
        physical_device: vk::PhysicalDevice,
    ) -> Result<Vec<vk::PresentModeKHR>> {
        unsafe {
            self.0
                .surface_loader
                .get_physical_device_surface_present_modes(physical_device, self.0.surface.raw())
                .called("vkGetPhysicalDeviceSurfacePresentModesKHR")
        }
    }

    // raw

    /// InstanceHandleを取得する
    pub fn instance(&self) -> crate::InstanceHandle {
        self.0.surface.parents().clone()
    }
}

// Debugトレイトの実装
impl Debug for SurfaceHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SurfaceHandle").finish()
    }
}

// SurfaceHandleはvk::SurfaceKHRにDerefする
impl Deref for SurfaceHandle {
    type Target = vk::SurfaceKHR;
    fn deref(&self) -> &Self::Target {
        &self.0.surface
    }
}
