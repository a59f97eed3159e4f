//! 参照カウンタで管理して、参照がすべて破棄された際に
//! Deviceの破棄の処理まで行うDeviceHandleを定義する。
//!
//! DeviceHandleはash::Deviceの関数テーブルをひとつだけ持ち、
//! そのDeviceから作られるすべてのHandleが参照カウントでそれを共有する。

use crate::{Handle, InvalidUsage, Result, VkResultExt};
use ash::{extensions::khr::Swapchain, vk};
use std::{ffi::CStr, fmt::Debug, ops::Deref, time::Duration};

use super::shared::Shared;

struct DeviceHandleData {
    device_handle: Handle<vk::Device, Option<crate::InstanceHandle>>,
    device: ash::Device,
    physical_device: vk::PhysicalDevice,
    memory_properties: vk::PhysicalDeviceMemoryProperties,
    swapchain_loader: Option<Swapchain>,
}

/// ash::Deviceを参照カウントで管理するためのハンドル
#[derive(Clone)]
pub struct DeviceHandle(Shared<DeviceHandleData>);
impl DeviceHandle {
    pub(crate) fn new(
        instance: crate::InstanceHandle,
        physical_device: vk::PhysicalDevice,
        device_create_info: &vk::DeviceCreateInfo,
    ) -> Result<Self> {
        // create device
        let device = unsafe {
            ash::Instance::create_device(&instance, physical_device, device_create_info, None)
                .created("vkCreateDevice")?
        };
        let memory_properties = instance.get_physical_device_memory_properties(physical_device);

        // swapchain拡張が有効なときだけswapchain loaderを用意する
        let enabled_extensions: &[*const std::os::raw::c_char] =
            if device_create_info.enabled_extension_count == 0 {
                &[]
            } else {
                unsafe {
                    std::slice::from_raw_parts(
                        device_create_info.pp_enabled_extension_names,
                        device_create_info.enabled_extension_count as usize,
                    )
                }
            };
        let swapchain_enabled = enabled_extensions
            .iter()
            .any(|&name| unsafe { CStr::from_ptr(name) } == Swapchain::name());
        let swapchain_loader = swapchain_enabled.then(|| Swapchain::new(&instance, &device));

        log::debug!(
            "created device {:?} (swapchain: {})",
            device.handle(),
            swapchain_enabled
        );
        Ok(Self::from_parts(
            Some(instance),
            device,
            physical_device,
            memory_properties,
            swapchain_loader,
        ))
    }

    /// instanceの関数テーブルから直接Deviceの関数テーブルを読み込んでDeviceHandleを作る。
    /// swapchain拡張の関数は読み込まない。
    /// ## Safety
    /// `device`は`instance_fn`から作られた有効なVkDeviceでなければならない。
    /// 所有権はDeviceHandleに移り、最後の参照が破棄されるとvkDestroyDeviceされる。
    pub unsafe fn load(
        instance_fn: &vk::InstanceFnV1_0,
        device: vk::Device,
        physical_device: vk::PhysicalDevice,
        memory_properties: vk::PhysicalDeviceMemoryProperties,
    ) -> Self {
        let device = ash::Device::load(instance_fn, device);
        Self::from_parts(None, device, physical_device, memory_properties, None)
    }

    fn from_parts(
        instance: Option<crate::InstanceHandle>,
        device: ash::Device,
        physical_device: vk::PhysicalDevice,
        memory_properties: vk::PhysicalDeviceMemoryProperties,
        swapchain_loader: Option<Swapchain>,
    ) -> Self {
        let table = device.clone();
        let device_handle = Handle::new(
            device.handle(),
            move |_, _: &Option<crate::InstanceHandle>| unsafe {
                // GPUの処理が終わるまで待ってから破棄する
                if let Err(result) = table.device_wait_idle() {
                    log::error!("vkDeviceWaitIdle failed before destroying device: {result}");
                }
                table.destroy_device(None);
            },
            instance,
        );
        Self(Shared::new(DeviceHandleData {
            device_handle,
            device,
            physical_device,
            memory_properties,
            swapchain_loader,
        }))
    }

    // Deviceの関数

    // create系

    /// DeviceMemoryHandleを割り当てる
    pub fn allocate_memory(
        &self,
        size: vk::DeviceSize,
        memory_type_index: u32,
    ) -> Result<crate::DeviceMemoryHandle> {
        crate::DeviceMemoryHandle::allocate(self.clone(), size, memory_type_index)
    }

    /// BufferHandleを作成する
    pub fn create_buffer(
        &self,
        buffer_create_info: &vk::BufferCreateInfo,
    ) -> Result<crate::BufferHandle> {
        crate::BufferHandle::new(self.clone(), buffer_create_info)
    }

    /// ImageHandleを作成する
    pub fn create_image(&self, image_create_info: &vk::ImageCreateInfo) -> Result<crate::ImageHandle> {
        crate::ImageHandle::new(self.clone(), image_create_info)
    }

    /// ImageViewHandleを作成する。
    /// `image_view_create_info.image`は`image`で上書きされる。
    pub fn create_image_view(
        &self,
        image: &crate::ImageHandle,
        image_view_create_info: &vk::ImageViewCreateInfo,
    ) -> Result<crate::ImageViewHandle> {
        crate::ImageViewHandle::new(self.clone(), image.clone(), image_view_create_info)
    }

    /// SamplerHandleを作成する
    pub fn create_sampler(
        &self,
        sampler_create_info: &vk::SamplerCreateInfo,
    ) -> Result<crate::SamplerHandle> {
        crate::SamplerHandle::new(self.clone(), sampler_create_info)
    }

    /// SPIR-VのコードからShaderModuleHandleを作成する
    pub fn create_shader_module(&self, code: &[u32]) -> Result<crate::ShaderModuleHandle> {
        crate::ShaderModuleHandle::new(self.clone(), code)
    }

    /// RenderPassHandleを作成する
    pub fn create_render_pass(
        &self,
        render_pass_create_info: &vk::RenderPassCreateInfo,
    ) -> Result<crate::RenderPassHandle> {
        crate::RenderPassHandle::new(self.clone(), render_pass_create_info)
    }

    /// FramebufferHandleを作成する。
    /// render passとattachmentのImageViewはFramebufferが破棄されるまで保持される。
    pub fn create_framebuffer(
        &self,
        render_pass: &crate::RenderPassHandle,
        attachments: &[crate::ImageViewHandle],
        extent: vk::Extent2D,
        layers: u32,
    ) -> Result<crate::FramebufferHandle> {
        crate::FramebufferHandle::new(
            self.clone(),
            render_pass.clone(),
            attachments.to_vec(),
            extent,
            layers,
        )
    }

    /// DescriptorSetLayoutHandleを作成する
    pub fn create_descriptor_set_layout(
        &self,
        descriptor_set_layout_create_info: &vk::DescriptorSetLayoutCreateInfo,
    ) -> Result<crate::DescriptorSetLayoutHandle> {
        crate::DescriptorSetLayoutHandle::new(self.clone(), descriptor_set_layout_create_info)
    }

    /// DescriptorPoolHandleを作成する
    pub fn create_descriptor_pool(
        &self,
        descriptor_pool_create_info: &vk::DescriptorPoolCreateInfo,
    ) -> Result<crate::DescriptorPoolHandle> {
        crate::DescriptorPoolHandle::new(self.clone(), descriptor_pool_create_info)
    }

    /// PipelineLayoutHandleを作成する
    pub fn create_pipeline_layout(
        &self,
        set_layouts: &[crate::DescriptorSetLayoutHandle],
        push_constant_ranges: &[vk::PushConstantRange],
    ) -> Result<crate::PipelineLayoutHandle> {
        crate::PipelineLayoutHandle::new(self.clone(), set_layouts.to_vec(), push_constant_ranges)
    }

    /// GraphicsPipelineHandleを作成する。
    /// `create_info`のlayoutとrender_passは引数のHandleで上書きされる。
    pub fn create_graphics_pipeline(
        &self,
        layout: &crate::PipelineLayoutHandle,
        render_pass: &crate::RenderPassHandle,
        create_info: &vk::GraphicsPipelineCreateInfo,
    ) -> Result<crate::GraphicsPipelineHandle> {
        crate::GraphicsPipelineHandle::new(
            self.clone(),
            layout.clone(),
            render_pass.clone(),
            create_info,
        )
    }

    /// CommandPoolHandleを作成する
    pub fn create_command_pool(
        &self,
        command_pool_create_info: &vk::CommandPoolCreateInfo,
    ) -> Result<crate::CommandPoolHandle> {
        crate::CommandPoolHandle::new(self.clone(), command_pool_create_info)
    }

    /// SemaphoreHandleを作成する
    pub fn create_semaphore(
        &self,
        semaphore_create_info: &vk::SemaphoreCreateInfo,
    ) -> Result<crate::SemaphoreHandle> {
        crate::SemaphoreHandle::new(self.clone(), semaphore_create_info)
    }

    /// FenceHandleを作成する
    pub fn create_fence(&self, fence_create_info: &vk::FenceCreateInfo) -> Result<crate::FenceHandle> {
        crate::FenceHandle::new(self.clone(), fence_create_info)
    }

    /// SwapchainHandleを作成する。
    /// `swapchain_create_info.surface`は`surface`で上書きされる。
    pub fn create_swapchain(
        &self,
        surface: &crate::SurfaceHandle,
        swapchain_create_info: &vk::SwapchainCreateInfoKHR,
    ) -> Result<crate::SwapchainHandle> {
        crate::SwapchainHandle::new(self.clone(), surface.clone(), swapchain_create_info)
    }

    // 他のDeviceの関数

    /// Queueを取得する
    pub fn get_queue(&self, queue_family_index: u32, queue_index: u32) -> crate::Queue {
        let queue = unsafe {
            self.0
                .device
                .get_device_queue(queue_family_index, queue_index)
        };
        crate::Queue::new(self.clone(), queue, queue_family_index)
    }

    /// DescriptorSetの更新をする
    pub fn update_descriptor_sets(&self, write_descriptor_sets: &[vk::WriteDescriptorSet]) {
        unsafe {
            self.0
                .device
                .update_descriptor_sets(write_descriptor_sets, &[])
        }
    }

    /// DeviceのIdleを待機する
    pub fn wait_idle(&self) -> Result<()> {
        unsafe { self.0.device.device_wait_idle().called("vkDeviceWaitIdle") }
    }

    /// Fenceを待機する。
    /// タイムアウトした場合は`Ok(false)`を返す。
    pub fn wait_for_fences(
        &self,
        fences: &[crate::FenceHandle],
        wait_all: bool,
        timeout: Duration,
    ) -> Result<bool> {
        let fences = fences.iter().map(|fence| **fence).collect::<Vec<_>>();
        let result = unsafe {
            self.0
                .device
                .wait_for_fences(&fences, wait_all, super::fence::timeout_nanos(timeout))
        };
        match result {
            Ok(()) => Ok(true),
            Err(vk::Result::TIMEOUT) => Ok(false),
            Err(result) => Err(crate::Error::CallFailed {
                call: "vkWaitForFences",
                result,
            }),
        }
    }

    /// Fenceをリセットする
    pub fn reset_fences(&self, fences: &[crate::FenceHandle]) -> Result<()> {
        let fences = fences.iter().map(|fence| **fence).collect::<Vec<_>>();
        unsafe { self.0.device.reset_fences(&fences).called("vkResetFences") }
    }

    /// `type_bits`に含まれ、`flags`をすべて持つ最初のメモリタイプを探す。
    /// 見つからなければNone。
    pub fn find_memory_type_index(
        &self,
        type_bits: u32,
        flags: vk::MemoryPropertyFlags,
    ) -> Option<u32> {
        find_memory_type_index(&self.0.memory_properties, type_bits, flags)
    }

    /// physical device memory propertiesを取得する
    pub fn memory_properties(&self) -> &vk::PhysicalDeviceMemoryProperties {
        &self.0.memory_properties
    }

    // raw

    /// InstanceHandleを取得する。
    /// [`DeviceHandle::load`]で作った場合はNone。
    pub fn instance(&self) -> Option<crate::InstanceHandle> {
        self.0.device_handle.parents().clone()
    }

    /// vk::PhysicalDeviceを取得する
    pub fn physical_device(&self) -> vk::PhysicalDevice {
        self.0.physical_device
    }

    /// Swapchainの関数テーブルを取得する
    pub(crate) fn swapchain_loader(&self) -> Result<&Swapchain> {
        self.0
            .swapchain_loader
            .as_ref()
            .ok_or(InvalidUsage::ExtensionNotLoaded("VK_KHR_swapchain").into())
    }

    /// Deviceを取得する
    /// ## Safety
    /// 参照カウントの管理から中身を取り出すので注意。
    /// Handleが破棄されると、この関数で取り出したDeviceは無効になる。
    pub unsafe fn device_raw(&self) -> ash::Device {
        self.0.device.clone()
    }
}

/// メモリタイプの検索
pub(crate) fn find_memory_type_index(
    memory_properties: &vk::PhysicalDeviceMemoryProperties,
    type_bits: u32,
    flags: vk::MemoryPropertyFlags,
) -> Option<u32> {
    memory_properties.memory_types[..memory_properties.memory_type_count as usize]
        .iter()
        .enumerate()
        .find(|(index, memory_type)| {
            type_bits & (1 << index) != 0 && memory_type.property_flags.contains(flags)
        })
        .map(|(index, _)| index as u32)
}

// Debugトレイトの実装
impl Debug for DeviceHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceHandle").finish()
    }
}

// DeviceHandleはash::DeviceにDerefする
impl Deref for DeviceHandle {
    type Target = ash::Device;
    fn deref(&self) -> &Self::Target {
        &self.0.device
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake;

    fn properties(types: &[vk::MemoryPropertyFlags]) -> vk::PhysicalDeviceMemoryProperties {
        let mut properties = vk::PhysicalDeviceMemoryProperties {
            memory_type_count: types.len() as u32,
            ..Default::default()
        };
        for (slot, &property_flags) in properties.memory_types.iter_mut().zip(types) {
            slot.property_flags = property_flags;
        }
        properties
    }

    #[test]
    fn memory_type_must_be_allowed_and_have_every_flag() {
        let host = vk::MemoryPropertyFlags::HOST_VISIBLE | vk::MemoryPropertyFlags::HOST_COHERENT;
        let props = properties(&[
            vk::MemoryPropertyFlags::DEVICE_LOCAL,
            vk::MemoryPropertyFlags::HOST_VISIBLE,
            host,
            host,
        ]);

        assert_eq!(find_memory_type_index(&props, 0b1111, host), Some(2));
        assert_eq!(find_memory_type_index(&props, 0b1000, host), Some(3));
        assert_eq!(find_memory_type_index(&props, 0b0011, host), None);
        assert_eq!(
            find_memory_type_index(&props, 0b0001, vk::MemoryPropertyFlags::DEVICE_LOCAL),
            Some(0)
        );
    }

    #[test]
    fn types_past_the_reported_count_are_ignored() {
        let mut props = properties(&[vk::MemoryPropertyFlags::DEVICE_LOCAL]);
        props.memory_types[1].property_flags = vk::MemoryPropertyFlags::HOST_VISIBLE;
        assert_eq!(
            find_memory_type_index(&props, u32::MAX, vk::MemoryPropertyFlags::HOST_VISIBLE),
            None
        );
    }

    #[test]
    fn device_is_destroyed_after_last_reference() {
        let device = fake::device();
        let clone = device.clone();
        drop(device);
        assert_eq!(fake::count("vkDestroyDevice"), 0);
        drop(clone);
        assert_eq!(fake::count("vkDeviceWaitIdle"), 1);
        assert_eq!(fake::count("vkDestroyDevice"), 1);
    }

    #[test]
    fn swapchain_requires_the_extension() {
        let device = fake::device();
        assert!(matches!(
            device.swapchain_loader(),
            Err(crate::Error::InvalidUsage(InvalidUsage::ExtensionNotLoaded(
                "VK_KHR_swapchain"
            )))
        ));
    }

    #[test]
    fn fence_wait_reports_timeout_as_false() {
        let device = fake::device();
        let unsignaled = device
            .create_fence(&vk::FenceCreateInfo::default())
            .unwrap();
        let signaled = device
            .create_fence(
                &vk::FenceCreateInfo::builder()
                    .flags(vk::FenceCreateFlags::SIGNALED)
                    .build(),
            )
            .unwrap();

        assert!(!device
            .wait_for_fences(&[unsignaled.clone(), signaled.clone()], true, Duration::from_millis(1))
            .unwrap());
        assert!(device
            .wait_for_fences(&[unsignaled.clone(), signaled], false, Duration::ZERO)
            .unwrap());
        device.reset_fences(&[unsignaled.clone()]).unwrap();
        assert!(!unsignaled.wait(Duration::ZERO).unwrap());
    }
}
