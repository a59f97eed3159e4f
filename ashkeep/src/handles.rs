//! Vulkanの各Objectを参照カウンタで管理して、参照がすべて破棄された際に
//! 自動で各種destroy処理を行うようにしたラッパーの構造体の各種Handleを用意している。
//!
//! 各Handleは[`Handle`]で生のハンドルと親オブジェクトをまとめて持ち、
//! 破棄処理が親より先に走ることを保証している。

mod handle;
pub use handle::{Finalizer, Handle};
mod shared;

mod instance;
pub use instance::{InstanceConfig, InstanceHandle};
mod surface;
pub use surface::SurfaceHandle;
mod device;
pub use device::DeviceHandle;
mod device_memory;
pub use device_memory::{DeviceMemoryHandle, MemoryMap};
mod command_pool;
pub use command_pool::CommandPoolHandle;
mod command_buffer;
pub use command_buffer::{CommandBufferHandle, CommandBufferState};
mod recording;
pub use recording::{BoundResource, RecordingScope, RenderPassBeginInfo, RenderPassScope};
mod swapchain;
pub use swapchain::SwapchainHandle;
mod image;
pub use image::ImageHandle;
mod image_view;
pub use image_view::ImageViewHandle;
mod sampler;
pub use sampler::SamplerHandle;
mod buffer;
pub use buffer::BufferHandle;
mod shader_module;
pub use shader_module::ShaderModuleHandle;
mod render_pass;
pub use render_pass::RenderPassHandle;
mod framebuffer;
pub use framebuffer::FramebufferHandle;
mod descriptor_pool;
pub use descriptor_pool::DescriptorPoolHandle;
mod descriptor_set_layout;
pub use descriptor_set_layout::DescriptorSetLayoutHandle;
mod descriptor_set;
pub use descriptor_set::DescriptorSetHandle;
mod pipeline_layout;
pub use pipeline_layout::PipelineLayoutHandle;
mod graphics_pipeline;
pub use graphics_pipeline::GraphicsPipelineHandle;
mod semaphore;
pub use semaphore::SemaphoreHandle;
mod fence;
pub use fence::FenceHandle;
mod queue;
pub use queue::Queue;
