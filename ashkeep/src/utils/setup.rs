use anyhow::{Context, Result};
use ash::{extensions::khr::Swapchain, vk};
use std::collections::BTreeSet;
use std::ffi::CString;

/// 必要なdevice拡張のリストを取得する関数
pub fn get_required_device_extensions(required_device_extensions: &[CString]) -> Vec<CString> {
    let mut required_device_extensions = required_device_extensions.to_vec();
    let swapchain = Swapchain::name().to_owned();
    if !required_device_extensions.contains(&swapchain) {
        required_device_extensions.push(swapchain);
    }
    required_device_extensions
}

/// 各種Queueのindexを格納する構造体
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueIndices {
    /// Graphics Queueのindex
    pub graphics_index: u32,
    /// Present Queueのindex
    pub present_index: u32,
}

/// QueueFamilyの一覧からGraphicsとPresentに使うindexを選ぶ関数。
/// 両方をサポートするfamilyがあればそれを優先する。
pub fn pick_queue_families(
    queue_families: &[vk::QueueFamilyProperties],
    mut present_support: impl FnMut(u32) -> Result<bool>,
) -> Result<Option<QueueIndices>> {
    let mut graphics_index = None;
    let mut present_index = None;
    for (i, queue_family) in queue_families.iter().enumerate() {
        let i = i as u32;
        let graphics = queue_family.queue_count > 0
            && queue_family.queue_flags.contains(vk::QueueFlags::GRAPHICS);
        let present = present_support(i)?;
        if graphics && present {
            return Ok(Some(QueueIndices {
                graphics_index: i,
                present_index: i,
            }));
        }
        if graphics && graphics_index.is_none() {
            graphics_index = Some(i);
        }
        if present && present_index.is_none() {
            present_index = Some(i);
        }
    }
    Ok(graphics_index
        .zip(present_index)
        .map(|(graphics_index, present_index)| QueueIndices {
            graphics_index,
            present_index,
        }))
}

/// 各種Queueのindexを取得する関数
pub fn get_queue_indices(
    instance: &crate::InstanceHandle,
    surface: &crate::SurfaceHandle,
    physical_device: vk::PhysicalDevice,
) -> Result<Option<QueueIndices>> {
    let queue_families = instance.get_physical_device_queue_family_properties(physical_device);
    pick_queue_families(&queue_families, |i| {
        Ok(surface.get_physical_device_surface_support(physical_device, i)?)
    })
}

/// 適当なphysical deviceを選択する関数。
/// 条件を満たす最初のphysical deviceを返す。
pub fn select_physical_device(
    instance: &crate::InstanceHandle,
    surface: &crate::SurfaceHandle,
    required_device_extensions: &[CString],
) -> Result<vk::PhysicalDevice> {
    let physical_devices = instance
        .enumerate_physical_devices()
        .context("failed to enumerate physical devices")?;

    // GraphicsとPresentをサポートしているQueueFamilyがある &&
    // 必要なデバイス拡張機能に対応している &&
    // swapchainに対応したフォーマット / presentationモードが一つ以上ある
    // ようなphysical deviceを選択する
    for physical_device in physical_devices {
        let is_queue_family_supported =
            get_queue_indices(instance, surface, physical_device)?.is_some();

        // デバイス拡張の確認
        let device_extensions = instance.enumerate_device_extension_names(physical_device)?;
        let is_device_extension_supported = required_device_extensions
            .iter()
            .all(|extension| device_extensions.contains(extension));

        // swapchainのサポート確認
        let is_swapchain_supported = !surface
            .get_physical_device_surface_formats(physical_device)?
            .is_empty()
            && !surface
                .get_physical_device_surface_present_modes(physical_device)?
                .is_empty();

        if is_queue_family_supported && is_device_extension_supported && is_swapchain_supported {
            let properties = instance.get_physical_device_properties(physical_device);
            let name = unsafe { std::ffi::CStr::from_ptr(properties.device_name.as_ptr()) };
            log::debug!("selected physical device {name:?}");
            return Ok(physical_device);
        }
    }
    anyhow::bail!("no suitable physical device")
}

/// deviceを作成する関数
pub fn create_device(
    instance: &crate::InstanceHandle,
    physical_device: vk::PhysicalDevice,
    queue_indices: &QueueIndices,
    required_device_extensions: &[CString],
) -> Result<crate::DeviceHandle> {
    // queue create info
    let unique_queue_families =
        BTreeSet::from([queue_indices.graphics_index, queue_indices.present_index]);
    let queue_priorities = [1.0_f32];
    let queue_create_infos = unique_queue_families
        .into_iter()
        .map(|queue_family| {
            vk::DeviceQueueCreateInfo::builder()
                .queue_family_index(queue_family)
                .queue_priorities(&queue_priorities)
                .build()
        })
        .collect::<Vec<_>>();

    // enable extension names
    let enable_extension_names = required_device_extensions
        .iter()
        .map(|s| s.as_ptr())
        .collect::<Vec<_>>();

    // device create info
    let physical_device_features = vk::PhysicalDeviceFeatures::default();
    let device_create_info = vk::DeviceCreateInfo::builder()
        .queue_create_infos(&queue_create_infos)
        .enabled_features(&physical_device_features)
        .enabled_extension_names(&enable_extension_names);

    // create device
    instance
        .create_device(physical_device, &device_create_info)
        .context("failed to create logical device")
}

/// 各種QueueをまとめたQueueHandles
#[derive(Debug, Clone)]
pub struct QueueHandles {
    /// Graphics Queue
    pub graphics: crate::Queue,
    /// Present Queue
    pub present: crate::Queue,
}

/// 各種QueueのQueueHandlesを取得する関数
pub fn get_queue_handles(device: &crate::DeviceHandle, queue_indices: &QueueIndices) -> QueueHandles {
    QueueHandles {
        graphics: device.get_queue(queue_indices.graphics_index, 0),
        present: device.get_queue(queue_indices.present_index, 0),
    }
}

/// graphics用のcommand poolを作成する関数
pub fn create_graphics_command_pool(
    device: &crate::DeviceHandle,
    queue_handles: &QueueHandles,
) -> Result<crate::CommandPoolHandle> {
    let command_pool_create_info = vk::CommandPoolCreateInfo::builder()
        .flags(vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER)
        .queue_family_index(queue_handles.graphics.queue_family_index());
    Ok(device.create_command_pool(&command_pool_create_info)?)
}

/// swapchainの関連オブジェクト
pub struct SwapchainObjects {
    /// SwapchainHandle
    pub swapchain: crate::SwapchainHandle,
    /// Swapchainのimages
    pub swapchain_images: Vec<crate::ImageHandle>,
    /// Swapchainのformat
    pub format: vk::Format,
    /// Swapchainのextent
    pub extent: vk::Extent2D,
}

/// surfaceのformatの選択。B8G8R8A8_UNORMがあればそれを使う。
pub fn choose_surface_format(surface_formats: &[vk::SurfaceFormatKHR]) -> Option<vk::SurfaceFormatKHR> {
    surface_formats
        .iter()
        .find(|surface_format| surface_format.format == vk::Format::B8G8R8A8_UNORM)
        .or_else(|| surface_formats.first())
        .copied()
}

/// surfaceのpresent modeの選択。MAILBOXがなければFIFO。
pub fn choose_present_mode(present_modes: &[vk::PresentModeKHR]) -> vk::PresentModeKHR {
    present_modes
        .iter()
        .copied()
        .find(|&present_mode| present_mode == vk::PresentModeKHR::MAILBOX)
        .unwrap_or(vk::PresentModeKHR::FIFO)
}

/// surfaceのextentの選択
pub fn choose_extent(capabilities: &vk::SurfaceCapabilitiesKHR, width: u32, height: u32) -> vk::Extent2D {
    if capabilities.current_extent.width != u32::MAX {
        capabilities.current_extent
    } else {
        vk::Extent2D {
            width: width.clamp(
                capabilities.min_image_extent.width,
                capabilities.max_image_extent.width,
            ),
            height: height.clamp(
                capabilities.min_image_extent.height,
                capabilities.max_image_extent.height,
            ),
        }
    }
}

/// image countの選択。max_image_countが0なら上限なし。
pub fn choose_image_count(capabilities: &vk::SurfaceCapabilitiesKHR) -> u32 {
    let image_count = capabilities.min_image_count + 1;
    if capabilities.max_image_count != 0 {
        image_count.min(capabilities.max_image_count)
    } else {
        image_count
    }
}

/// swapchainを作成する関数
pub fn create_swapchain_objects(
    width: u32,
    height: u32,
    surface: &crate::SurfaceHandle,
    physical_device: vk::PhysicalDevice,
    device: &crate::DeviceHandle,
) -> Result<SwapchainObjects> {
    let surface_capabilities = surface.get_physical_device_surface_capabilities(physical_device)?;
    let surface_formats = surface.get_physical_device_surface_formats(physical_device)?;
    let surface_present_modes = surface.get_physical_device_surface_present_modes(physical_device)?;

    let surface_format =
        choose_surface_format(&surface_formats).context("surface reports no formats")?;
    let surface_present_mode = choose_present_mode(&surface_present_modes);
    let surface_extent = choose_extent(&surface_capabilities, width, height);
    let image_count = choose_image_count(&surface_capabilities);

    // swapchainの作成
    let swapchain_create_info = vk::SwapchainCreateInfoKHR::builder()
        .min_image_count(image_count)
        .image_color_space(surface_format.color_space)
        .image_format(surface_format.format)
        .image_extent(surface_extent)
        .image_usage(vk::ImageUsageFlags::COLOR_ATTACHMENT | vk::ImageUsageFlags::TRANSFER_DST)
        .image_sharing_mode(vk::SharingMode::EXCLUSIVE)
        .pre_transform(surface_capabilities.current_transform)
        .composite_alpha(vk::CompositeAlphaFlagsKHR::OPAQUE)
        .present_mode(surface_present_mode)
        .image_array_layers(1)
        .clipped(true);
    let swapchain = device
        .create_swapchain(surface, &swapchain_create_info)
        .context("failed to create swapchain")?;

    // swapchainのimageの取得
    let swapchain_images = swapchain.get_images()?;

    Ok(SwapchainObjects {
        swapchain,
        swapchain_images,
        format: surface_format.format,
        extent: surface_extent,
    })
}
