//! 参照カウンタで管理して、参照がすべて破棄された際に
//! Instanceの破棄の処理まで行うInstanceHandleを定義する。

use crate::{Error, Handle, Result, VkResultExt};
use ash::{extensions::ext::DebugUtils, vk};
use std::{
    ffi::{CStr, CString},
    fmt::Debug,
    ops::Deref,
};

use super::shared::Shared;

#[cfg(feature = "validation")]
const ENABLE_VALIDATION_LAYERS: bool = true;
#[cfg(not(feature = "validation"))]
const ENABLE_VALIDATION_LAYERS: bool = false;

const VALIDATION: &CStr =
    unsafe { CStr::from_bytes_with_nul_unchecked(b"VK_LAYER_KHRONOS_validation\0") };

// debug utilsのコールバック関数
// 重要度に応じてlogのマクロに振り分ける
unsafe extern "system" fn vulkan_debug_utils_callback(
    message_severity: vk::DebugUtilsMessageSeverityFlagsEXT,
    message_types: vk::DebugUtilsMessageTypeFlagsEXT,
    p_callback_data: *const vk::DebugUtilsMessengerCallbackDataEXT,
    _p_user_data: *mut std::ffi::c_void,
) -> vk::Bool32 {
    let message = if p_callback_data.is_null() || (*p_callback_data).p_message.is_null() {
        std::borrow::Cow::Borrowed("<no message>")
    } else {
        CStr::from_ptr((*p_callback_data).p_message).to_string_lossy()
    };
    match message_severity {
        vk::DebugUtilsMessageSeverityFlagsEXT::ERROR => {
            log::error!("[{:?}] {}", message_types, message)
        }
        vk::DebugUtilsMessageSeverityFlagsEXT::WARNING => {
            log::warn!("[{:?}] {}", message_types, message)
        }
        vk::DebugUtilsMessageSeverityFlagsEXT::INFO => {
            log::debug!("[{:?}] {}", message_types, message)
        }
        _ => log::trace!("[{:?}] {}", message_types, message),
    }

    vk::FALSE
}

/// Instance作成時の設定
#[derive(Debug, Clone)]
pub struct InstanceConfig {
    /// アプリケーション名
    pub application_name: CString,
    /// アプリケーションのバージョン
    pub application_version: u32,
    /// 使用するVulkanのAPIバージョン
    pub api_version: u32,
    /// 追加で有効にするinstance拡張
    pub extensions: Vec<CString>,
    /// 追加で有効にするlayer
    pub layers: Vec<CString>,
}
impl Default for InstanceConfig {
    fn default() -> Self {
        Self {
            application_name: CStr::from_bytes_with_nul(b"ashkeep\0")
                .map(CStr::to_owned)
                .unwrap_or_default(),
            application_version: vk::make_api_version(0, 1, 0, 0),
            api_version: vk::API_VERSION_1_3,
            extensions: Vec::new(),
            layers: Vec::new(),
        }
    }
}

struct InstanceHandleData {
    // messengerはinstanceより先に破棄する
    debug_messenger: Handle<vk::DebugUtilsMessengerEXT>,
    instance_handle: Handle<vk::Instance, ash::Entry>,
    instance: ash::Instance,
}

/// ash::Instanceを参照カウントで管理するためのハンドル
#[derive(Clone)]
pub struct InstanceHandle(Shared<InstanceHandleData>);
impl InstanceHandle {
    /// Vulkanのloaderを読み込んでInstanceを作成する。
    /// `raw_display_handle`を渡すとsurfaceの作成に必要な拡張を有効にする。
    pub fn new(
        config: &InstanceConfig,
        raw_display_handle: Option<raw_window_handle::RawDisplayHandle>,
    ) -> Result<Self> {
        let entry = unsafe { ash::Entry::load()? };

        let app_info = vk::ApplicationInfo::builder()
            .application_name(&config.application_name)
            .application_version(config.application_version)
            .api_version(config.api_version);
        let mut debug_utils_messenger_create_info =
            vk::DebugUtilsMessengerCreateInfoEXT::builder()
                .message_severity(
                    vk::DebugUtilsMessageSeverityFlagsEXT::WARNING
                        | vk::DebugUtilsMessageSeverityFlagsEXT::ERROR,
                )
                .message_type(
                    vk::DebugUtilsMessageTypeFlagsEXT::GENERAL
                        | vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE
                        | vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION,
                )
                .pfn_user_callback(Some(vulkan_debug_utils_callback))
                .build();

        let mut extension_names = config
            .extensions
            .iter()
            .map(|name| name.as_ptr())
            .collect::<Vec<_>>();
        if let Some(raw_display_handle) = raw_display_handle {
            let required = ash_window::enumerate_required_extensions(raw_display_handle)
                .called("vkEnumerateInstanceExtensionProperties")?;
            extension_names.extend_from_slice(required);
        }
        let mut layer_names = config
            .layers
            .iter()
            .map(|name| name.as_ptr())
            .collect::<Vec<_>>();
        if ENABLE_VALIDATION_LAYERS {
            extension_names.push(DebugUtils::name().as_ptr());
            layer_names.push(VALIDATION.as_ptr());
        }

        let instance_create_info = vk::InstanceCreateInfo::builder()
            .application_info(&app_info)
            .enabled_extension_names(&extension_names)
            .enabled_layer_names(&layer_names);
        let instance_create_info = if ENABLE_VALIDATION_LAYERS {
            instance_create_info.push_next(&mut debug_utils_messenger_create_info)
        } else {
            instance_create_info
        };
        let instance = unsafe {
            entry
                .create_instance(&instance_create_info, None)
                .created("vkCreateInstance")?
        };
        log::debug!("created instance with api version {:#x}", config.api_version);

        let table = instance.clone();
        let instance_handle = Handle::new(
            instance.handle(),
            move |_, _: &ash::Entry| unsafe { table.destroy_instance(None) },
            entry.clone(),
        );

        // setup debug utils
        let debug_messenger = if ENABLE_VALIDATION_LAYERS {
            let debug_utils_loader = DebugUtils::new(&entry, &instance);
            let messenger = unsafe {
                debug_utils_loader
                    .create_debug_utils_messenger(&debug_utils_messenger_create_info, None)
                    .created("vkCreateDebugUtilsMessengerEXT")?
            };
            Handle::new(
                messenger,
                move |messenger, _: &()| unsafe {
                    debug_utils_loader.destroy_debug_utils_messenger(messenger, None)
                },
                (),
            )
        } else {
            Handle::default()
        };

        Ok(Self(Shared::new(InstanceHandleData {
            debug_messenger,
            instance_handle,
            instance,
        })))
    }

    // create系

    /// SurfaceHandleを作成する
    pub fn create_surface(
        &self,
        raw_display_handle: raw_window_handle::RawDisplayHandle,
        raw_window_handle: raw_window_handle::RawWindowHandle,
    ) -> Result<crate::SurfaceHandle> {
        crate::SurfaceHandle::new(self.clone(), raw_display_handle, raw_window_handle)
    }

    /// DeviceHandleを作成する
    pub fn create_device(
        &self,
        physical_device: vk::PhysicalDevice,
        device_create_info: &vk::DeviceCreateInfo,
    ) -> Result<crate::DeviceHandle> {
        crate::DeviceHandle::new(self.clone(), physical_device, device_create_info)
    }

    // instanceの各関数

    /// physical deviceを列挙する
    pub fn enumerate_physical_devices(&self) -> Result<Vec<vk::PhysicalDevice>> {
        unsafe {
            self.0
                .instance
                .enumerate_physical_devices()
                .called("vkEnumeratePhysicalDevices")
        }
    }

    /// physical deviceの対応しているdevice拡張の名前を列挙する
    pub fn enumerate_device_extension_names(
        &self,
        physical_device: vk::PhysicalDevice,
    ) -> Result<Vec<CString>> {
        let properties = unsafe {
            self.0
                .instance
                .enumerate_device_extension_properties(physical_device)
                .called("vkEnumerateDeviceExtensionProperties")?
        };
        Ok(properties
            .iter()
            .map(|property| unsafe { CStr::from_ptr(property.extension_name.as_ptr()).to_owned() })
            .collect())
    }

    /// QueueFamilyのプロパティを取得する
    pub fn get_physical_device_queue_family_properties(
        &self,
        physical_device: vk::PhysicalDevice,
    ) -> Vec<vk::QueueFamilyProperties> {
        unsafe {
            self.0
                .instance
                .get_physical_device_queue_family_properties(physical_device)
        }
    }

    /// メモリのプロパティを取得する
    pub fn get_physical_device_memory_properties(
        &self,
        physical_device: vk::PhysicalDevice,
    ) -> vk::PhysicalDeviceMemoryProperties {
        unsafe {
            self.0
                .instance
                .get_physical_device_memory_properties(physical_device)
        }
    }

    /// physical deviceのプロパティを取得する
    pub fn get_physical_device_properties(
        &self,
        physical_device: vk::PhysicalDevice,
    ) -> vk::PhysicalDeviceProperties {
        unsafe { self.0.instance.get_physical_device_properties(physical_device) }
    }

    /// 候補の中から、指定のtilingで指定のfeatureをすべて持つ最初のformatを探す。
    /// 見つからなければNone。
    pub fn find_supported_format(
        &self,
        physical_device: vk::PhysicalDevice,
        candidates: &[vk::Format],
        tiling: vk::ImageTiling,
        features: vk::FormatFeatureFlags,
    ) -> Option<vk::Format> {
        pick_supported_format(candidates, tiling, features, |format| unsafe {
            self.0
                .instance
                .get_physical_device_format_properties(physical_device, format)
        })
    }

    // raw

    /// ash::Entryを取得する
    pub fn entry(&self) -> &ash::Entry {
        self.0.instance_handle.parents()
    }

    /// ash::Instanceを取得する
    /// ## Safety
    /// 参照カウントの管理から中身を取り出すので注意。
    /// Handleが破棄されると、この関数で取り出したash::Instanceは無効になる。
    pub unsafe fn instance_raw(&self) -> ash::Instance {
        self.0.instance.clone()
    }

    /// debug messengerが有効かどうか
    pub fn has_debug_messenger(&self) -> bool {
        !self.0.debug_messenger.is_null()
    }
}

/// `properties_of`で得たformatのプロパティから、条件に合う最初の候補を選ぶ
pub(crate) fn pick_supported_format(
    candidates: &[vk::Format],
    tiling: vk::ImageTiling,
    features: vk::FormatFeatureFlags,
    mut properties_of: impl FnMut(vk::Format) -> vk::FormatProperties,
) -> Option<vk::Format> {
    candidates.iter().copied().find(|&format| {
        let properties = properties_of(format);
        match tiling {
            vk::ImageTiling::LINEAR => properties.linear_tiling_features.contains(features),
            vk::ImageTiling::OPTIMAL => properties.optimal_tiling_features.contains(features),
            _ => false,
        }
    })
}

// Debugトレイトの実装
impl Debug for InstanceHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InstanceHandle").finish()
    }
}

// InstanceHandleはash::InstanceにDerefする
impl Deref for InstanceHandle {
    type Target = ash::Instance;
    fn deref(&self) -> &Self::Target {
        &self.0.instance
    }
}

impl From<ash::LoadingError> for Error {
    fn from(error: ash::LoadingError) -> Self {
        Error::LoaderUnavailable(error.to_string())
    }
}
