//! 参照カウンタで管理して、参照がすべて破棄された際に
//! ShaderModuleの破棄の処理まで行うShaderModuleHandleを定義する。

use crate::{Handle, Result, VkResultExt};
use ash::vk;
use std::{fmt::Debug, ops::Deref};

use super::shared::Shared;

struct ShaderModuleHandleData {
    shader_module: Handle<vk::ShaderModule, crate::DeviceHandle>,
}

/// vk::ShaderModuleを参照カウントで管理するためのハンドル
#[derive(Clone)]
pub struct ShaderModuleHandle(Shared<ShaderModuleHandleData>);
impl ShaderModuleHandle {
    pub(crate) fn new(device: crate::DeviceHandle, code: &[u32]) -> Result<Self> {
        let create_info = vk::ShaderModuleCreateInfo::builder().code(code);
        let shader_module = unsafe {
            ash::Device::create_shader_module(&device, &create_info, None)
                .created("vkCreateShaderModule")?
        };
        let shader_module = Handle::new(
            shader_module,
            |shader_module, device: &crate::DeviceHandle| unsafe {
                device.destroy_shader_module(shader_module, None)
            },
            device,
        );
        Ok(Self(Shared::new(ShaderModuleHandleData { shader_module })))
    }

    /// DeviceHandleを取得する
    pub fn device(&self) -> crate::DeviceHandle {
        self.0.shader_module.parents().clone()
    }
}

impl Debug for ShaderModuleHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShaderModuleHandle").finish()
    }
}

impl Deref for ShaderModuleHandle {
    type Target = vk::ShaderModule;
    fn deref(&self) -> &Self::Target {
        &self.0.shader_module
    }
}
