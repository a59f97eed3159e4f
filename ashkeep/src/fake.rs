//! テスト用のVulkanドライバのフェイク。
//!
//! vkGetDeviceProcAddrを差し替えてash::Deviceを読み込むので、GPUなしで
//! Handleの破棄順序やコマンドの記録順を確認できる。
//! 呼び出しの記録はスレッドごとに分かれているので、テスト同士は干渉しない。

use ash::vk::{self, Handle as _};
use std::{
    cell::RefCell,
    collections::HashMap,
    ffi::{c_char, c_void, CStr},
    sync::atomic::{AtomicU64, Ordering},
};

/// DEVICE_LOCALだけを持つメモリタイプ
pub(crate) const DEVICE_LOCAL_MEMORY_TYPE: u32 = 0;
/// HOST_VISIBLE | HOST_COHERENTのメモリタイプ
pub(crate) const HOST_VISIBLE_MEMORY_TYPE: u32 = 1;

struct Memory {
    bytes: Vec<u8>,
    mapped: bool,
}

struct DescriptorPool {
    max_sets: u32,
    allocated: u32,
    pool_sizes: Vec<vk::DescriptorPoolSize>,
}

#[derive(Default)]
struct Driver {
    calls: Vec<&'static str>,
    failures: HashMap<&'static str, vk::Result>,
    memories: HashMap<u64, Memory>,
    descriptor_pools: HashMap<u64, DescriptorPool>,
    fences: HashMap<u64, bool>,
}

thread_local! {
    static DRIVER: RefCell<Driver> = RefCell::new(Driver::default());
}

static NEXT_HANDLE: AtomicU64 = AtomicU64::new(0x1000);

fn next_handle() -> u64 {
    NEXT_HANDLE.fetch_add(1, Ordering::Relaxed)
}

fn with<R>(f: impl FnOnce(&mut Driver) -> R) -> R {
    DRIVER.with(|driver| f(&mut driver.borrow_mut()))
}

// 呼び出しを記録して、仕込まれた失敗があれば返す
fn enter(call: &'static str) -> Option<vk::Result> {
    with(|driver| {
        driver.calls.push(call);
        driver.failures.remove(call)
    })
}

/// このスレッドで`call`が呼ばれた回数
pub(crate) fn count(call: &str) -> usize {
    with(|driver| driver.calls.iter().filter(|&&c| c == call).count())
}

/// `calls`に含まれる呼び出しだけを呼ばれた順に返す
pub(crate) fn calls_matching(calls: &[&str]) -> Vec<&'static str> {
    with(|driver| {
        driver
            .calls
            .iter()
            .copied()
            .filter(|call| calls.contains(call))
            .collect()
    })
}

/// 次の`call`を`result`で失敗させる
pub(crate) fn fail_next(call: &'static str, result: vk::Result) {
    with(|driver| {
        driver.failures.insert(call, result);
    })
}

/// DescriptorPoolの作成時のmax_setsとpool sizes
pub(crate) fn descriptor_pool_info(
    pool: vk::DescriptorPool,
) -> Option<(u32, Vec<vk::DescriptorPoolSize>)> {
    with(|driver| {
        driver
            .descriptor_pools
            .get(&pool.as_raw())
            .map(|pool| (pool.max_sets, pool.pool_sizes.clone()))
    })
}

fn memory_properties() -> vk::PhysicalDeviceMemoryProperties {
    let mut memory_properties = vk::PhysicalDeviceMemoryProperties {
        memory_type_count: 2,
        memory_heap_count: 2,
        ..Default::default()
    };
    memory_properties.memory_types[DEVICE_LOCAL_MEMORY_TYPE as usize] = vk::MemoryType {
        property_flags: vk::MemoryPropertyFlags::DEVICE_LOCAL,
        heap_index: 0,
    };
    memory_properties.memory_types[HOST_VISIBLE_MEMORY_TYPE as usize] = vk::MemoryType {
        property_flags: vk::MemoryPropertyFlags::HOST_VISIBLE
            | vk::MemoryPropertyFlags::HOST_COHERENT,
        heap_index: 1,
    };
    memory_properties.memory_heaps[0] = vk::MemoryHeap {
        size: 1 << 30,
        flags: vk::MemoryHeapFlags::DEVICE_LOCAL,
    };
    memory_properties.memory_heaps[1] = vk::MemoryHeap {
        size: 1 << 28,
        flags: vk::MemoryHeapFlags::empty(),
    };
    memory_properties
}

/// フェイクのドライバにつながったDeviceHandle
pub(crate) fn device() -> crate::DeviceHandle {
    let instance_fn = vk::InstanceFnV1_0::load(|name: &CStr| {
        if name.to_bytes() == b"vkGetDeviceProcAddr" {
            get_device_proc_addr as *const c_void
        } else {
            std::ptr::null()
        }
    });
    unsafe {
        crate::DeviceHandle::load(
            &instance_fn,
            vk::Device::from_raw(next_handle()),
            vk::PhysicalDevice::from_raw(next_handle()),
            memory_properties(),
        )
    }
}

/// フェイクのDeviceから作ったprimaryのCommandBufferHandle
pub(crate) fn command_buffer() -> crate::CommandBufferHandle {
    let command_pool = device()
        .create_command_pool(
            &vk::CommandPoolCreateInfo::builder()
                .flags(vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER)
                .queue_family_index(0),
        )
        .unwrap();
    command_pool
        .allocate_command_buffers(vk::CommandBufferLevel::PRIMARY, 1)
        .unwrap()
        .pop()
        .unwrap()
}

unsafe extern "system" fn get_device_proc_addr(
    _device: vk::Device,
    name: *const c_char,
) -> vk::PFN_vkVoidFunction {
    let name = CStr::from_ptr(name).to_str().unwrap_or_default();
    let function: *const () = match name {
        "vkDestroyDevice" => destroy_device as *const (),
        "vkDeviceWaitIdle" => device_wait_idle as *const (),
        "vkGetDeviceQueue" => get_device_queue as *const (),
        "vkQueueSubmit" => queue_submit as *const (),
        "vkQueueWaitIdle" => queue_wait_idle as *const (),
        "vkAllocateMemory" => allocate_memory as *const (),
        "vkFreeMemory" => free_memory as *const (),
        "vkMapMemory" => map_memory as *const (),
        "vkUnmapMemory" => unmap_memory as *const (),
        "vkFlushMappedMemoryRanges" => flush_mapped_memory_ranges as *const (),
        "vkCreateBuffer" => create_buffer as *const (),
        "vkDestroyBuffer" => destroy_buffer as *const (),
        "vkGetBufferMemoryRequirements" => get_buffer_memory_requirements as *const (),
        "vkBindBufferMemory" => bind_buffer_memory as *const (),
        "vkCreateImage" => create_image as *const (),
        "vkDestroyImage" => destroy_image as *const (),
        "vkGetImageMemoryRequirements" => get_image_memory_requirements as *const (),
        "vkBindImageMemory" => bind_image_memory as *const (),
        "vkCreateImageView" => create_image_view as *const (),
        "vkDestroyImageView" => destroy_image_view as *const (),
        "vkCreateSampler" => create_sampler as *const (),
        "vkDestroySampler" => destroy_sampler as *const (),
        "vkCreateShaderModule" => create_shader_module as *const (),
        "vkDestroyShaderModule" => destroy_shader_module as *const (),
        "vkCreateRenderPass" => create_render_pass as *const (),
        "vkDestroyRenderPass" => destroy_render_pass as *const (),
        "vkCreateFramebuffer" => create_framebuffer as *const (),
        "vkDestroyFramebuffer" => destroy_framebuffer as *const (),
        "vkCreateDescriptorSetLayout" => create_descriptor_set_layout as *const (),
        "vkDestroyDescriptorSetLayout" => destroy_descriptor_set_layout as *const (),
        "vkCreateDescriptorPool" => create_descriptor_pool as *const (),
        "vkDestroyDescriptorPool" => destroy_descriptor_pool as *const (),
        "vkAllocateDescriptorSets" => allocate_descriptor_sets as *const (),
        "vkFreeDescriptorSets" => free_descriptor_sets as *const (),
        "vkUpdateDescriptorSets" => update_descriptor_sets as *const (),
        "vkCreatePipelineLayout" => create_pipeline_layout as *const (),
        "vkDestroyPipelineLayout" => destroy_pipeline_layout as *const (),
        "vkCreateGraphicsPipelines" => create_graphics_pipelines as *const (),
        "vkDestroyPipeline" => destroy_pipeline as *const (),
        "vkCreateCommandPool" => create_command_pool as *const (),
        "vkDestroyCommandPool" => destroy_command_pool as *const (),
        "vkAllocateCommandBuffers" => allocate_command_buffers as *const (),
        "vkFreeCommandBuffers" => free_command_buffers as *const (),
        "vkBeginCommandBuffer" => begin_command_buffer as *const (),
        "vkEndCommandBuffer" => end_command_buffer as *const (),
        "vkResetCommandBuffer" => reset_command_buffer as *const (),
        "vkCmdBeginRenderPass" => cmd_begin_render_pass as *const (),
        "vkCmdEndRenderPass" => cmd_end_render_pass as *const (),
        "vkCmdNextSubpass" => cmd_next_subpass as *const (),
        "vkCmdBindPipeline" => cmd_bind_pipeline as *const (),
        "vkCmdBindVertexBuffers" => cmd_bind_vertex_buffers as *const (),
        "vkCmdBindIndexBuffer" => cmd_bind_index_buffer as *const (),
        "vkCmdSetViewport" => cmd_set_viewport as *const (),
        "vkCmdSetScissor" => cmd_set_scissor as *const (),
        "vkCmdDraw" => cmd_draw as *const (),
        "vkCmdDrawIndexed" => cmd_draw_indexed as *const (),
        "vkCmdBindDescriptorSets" => cmd_bind_descriptor_sets as *const (),
        "vkCmdPushConstants" => cmd_push_constants as *const (),
        "vkCmdPipelineBarrier" => cmd_pipeline_barrier as *const (),
        "vkCmdCopyBuffer" => cmd_copy_buffer as *const (),
        "vkCmdCopyBufferToImage" => cmd_copy_buffer_to_image as *const (),
        "vkCmdClearColorImage" => cmd_clear_color_image as *const (),
        "vkCreateSemaphore" => create_semaphore as *const (),
        "vkDestroySemaphore" => destroy_semaphore as *const (),
        "vkCreateFence" => create_fence as *const (),
        "vkDestroyFence" => destroy_fence as *const (),
        "vkWaitForFences" => wait_for_fences as *const (),
        "vkResetFences" => reset_fences as *const (),
        "vkGetFenceStatus" => get_fence_status as *const (),
        _ => return None,
    };
    Some(std::mem::transmute::<*const (), unsafe extern "system" fn()>(
        function,
    ))
}

macro_rules! fake_create {
    ($name:ident, $call:literal, $info:ty, $handle:ty) => {
        unsafe extern "system" fn $name(
            _device: vk::Device,
            _create_info: *const $info,
            _allocator: *const vk::AllocationCallbacks,
            handle: *mut $handle,
        ) -> vk::Result {
            if let Some(result) = enter($call) {
                return result;
            }
            *handle = <$handle>::from_raw(next_handle());
            vk::Result::SUCCESS
        }
    };
}

macro_rules! fake_destroy {
    ($name:ident, $call:literal, $handle:ty) => {
        unsafe extern "system" fn $name(
            _device: vk::Device,
            _handle: $handle,
            _allocator: *const vk::AllocationCallbacks,
        ) {
            enter($call);
        }
    };
}

fake_create!(create_buffer, "vkCreateBuffer", vk::BufferCreateInfo, vk::Buffer);
fake_destroy!(destroy_buffer, "vkDestroyBuffer", vk::Buffer);
fake_create!(create_image, "vkCreateImage", vk::ImageCreateInfo, vk::Image);
fake_destroy!(destroy_image, "vkDestroyImage", vk::Image);
fake_create!(create_image_view, "vkCreateImageView", vk::ImageViewCreateInfo, vk::ImageView);
fake_destroy!(destroy_image_view, "vkDestroyImageView", vk::ImageView);
fake_create!(create_sampler, "vkCreateSampler", vk::SamplerCreateInfo, vk::Sampler);
fake_destroy!(destroy_sampler, "vkDestroySampler", vk::Sampler);
fake_create!(
    create_shader_module,
    "vkCreateShaderModule",
    vk::ShaderModuleCreateInfo,
    vk::ShaderModule
);
fake_destroy!(destroy_shader_module, "vkDestroyShaderModule", vk::ShaderModule);
fake_create!(create_render_pass, "vkCreateRenderPass", vk::RenderPassCreateInfo, vk::RenderPass);
fake_destroy!(destroy_render_pass, "vkDestroyRenderPass", vk::RenderPass);
fake_create!(
    create_framebuffer,
    "vkCreateFramebuffer",
    vk::FramebufferCreateInfo,
    vk::Framebuffer
);
fake_destroy!(destroy_framebuffer, "vkDestroyFramebuffer", vk::Framebuffer);
fake_create!(
    create_descriptor_set_layout,
    "vkCreateDescriptorSetLayout",
    vk::DescriptorSetLayoutCreateInfo,
    vk::DescriptorSetLayout
);
fake_destroy!(
    destroy_descriptor_set_layout,
    "vkDestroyDescriptorSetLayout",
    vk::DescriptorSetLayout
);
fake_create!(
    create_pipeline_layout,
    "vkCreatePipelineLayout",
    vk::PipelineLayoutCreateInfo,
    vk::PipelineLayout
);
fake_destroy!(destroy_pipeline_layout, "vkDestroyPipelineLayout", vk::PipelineLayout);
fake_destroy!(destroy_pipeline, "vkDestroyPipeline", vk::Pipeline);
fake_create!(
    create_command_pool,
    "vkCreateCommandPool",
    vk::CommandPoolCreateInfo,
    vk::CommandPool
);
fake_destroy!(destroy_command_pool, "vkDestroyCommandPool", vk::CommandPool);
fake_create!(create_semaphore, "vkCreateSemaphore", vk::SemaphoreCreateInfo, vk::Semaphore);
fake_destroy!(destroy_semaphore, "vkDestroySemaphore", vk::Semaphore);

// device

unsafe extern "system" fn destroy_device(
    _device: vk::Device,
    _allocator: *const vk::AllocationCallbacks,
) {
    enter("vkDestroyDevice");
}

unsafe extern "system" fn device_wait_idle(_device: vk::Device) -> vk::Result {
    enter("vkDeviceWaitIdle").unwrap_or(vk::Result::SUCCESS)
}

unsafe extern "system" fn get_device_queue(
    _device: vk::Device,
    _queue_family_index: u32,
    _queue_index: u32,
    queue: *mut vk::Queue,
) {
    enter("vkGetDeviceQueue");
    *queue = vk::Queue::from_raw(next_handle());
}

unsafe extern "system" fn queue_submit(
    _queue: vk::Queue,
    _submit_count: u32,
    _submits: *const vk::SubmitInfo,
    fence: vk::Fence,
) -> vk::Result {
    if let Some(result) = enter("vkQueueSubmit") {
        return result;
    }
    // フェイクのGPUは即座に処理を終える
    if fence != vk::Fence::null() {
        with(|driver| driver.fences.insert(fence.as_raw(), true));
    }
    vk::Result::SUCCESS
}

unsafe extern "system" fn queue_wait_idle(_queue: vk::Queue) -> vk::Result {
    enter("vkQueueWaitIdle").unwrap_or(vk::Result::SUCCESS)
}

// memory

unsafe extern "system" fn allocate_memory(
    _device: vk::Device,
    allocate_info: *const vk::MemoryAllocateInfo,
    _allocator: *const vk::AllocationCallbacks,
    memory: *mut vk::DeviceMemory,
) -> vk::Result {
    if let Some(result) = enter("vkAllocateMemory") {
        return result;
    }
    let raw = next_handle();
    let size = (*allocate_info).allocation_size as usize;
    with(|driver| {
        driver.memories.insert(
            raw,
            Memory {
                bytes: vec![0; size],
                mapped: false,
            },
        )
    });
    *memory = vk::DeviceMemory::from_raw(raw);
    vk::Result::SUCCESS
}

unsafe extern "system" fn free_memory(
    _device: vk::Device,
    memory: vk::DeviceMemory,
    _allocator: *const vk::AllocationCallbacks,
) {
    enter("vkFreeMemory");
    with(|driver| driver.memories.remove(&memory.as_raw()));
}

unsafe extern "system" fn map_memory(
    _device: vk::Device,
    memory: vk::DeviceMemory,
    offset: vk::DeviceSize,
    _size: vk::DeviceSize,
    _flags: vk::MemoryMapFlags,
    data: *mut *mut c_void,
) -> vk::Result {
    if let Some(result) = enter("vkMapMemory") {
        return result;
    }
    with(|driver| match driver.memories.get_mut(&memory.as_raw()) {
        // 二重のmapは不正
        Some(memory) if !memory.mapped && (offset as usize) < memory.bytes.len() => {
            memory.mapped = true;
            *data = memory.bytes.as_mut_ptr().add(offset as usize).cast();
            vk::Result::SUCCESS
        }
        _ => vk::Result::ERROR_MEMORY_MAP_FAILED,
    })
}

unsafe extern "system" fn unmap_memory(_device: vk::Device, memory: vk::DeviceMemory) {
    enter("vkUnmapMemory");
    with(|driver| {
        if let Some(memory) = driver.memories.get_mut(&memory.as_raw()) {
            memory.mapped = false;
        }
    });
}

unsafe extern "system" fn flush_mapped_memory_ranges(
    _device: vk::Device,
    _range_count: u32,
    _ranges: *const vk::MappedMemoryRange,
) -> vk::Result {
    enter("vkFlushMappedMemoryRanges").unwrap_or(vk::Result::SUCCESS)
}

fn memory_requirements() -> vk::MemoryRequirements {
    vk::MemoryRequirements {
        size: 256,
        alignment: 16,
        memory_type_bits: (1 << DEVICE_LOCAL_MEMORY_TYPE) | (1 << HOST_VISIBLE_MEMORY_TYPE),
    }
}

unsafe extern "system" fn get_buffer_memory_requirements(
    _device: vk::Device,
    _buffer: vk::Buffer,
    requirements: *mut vk::MemoryRequirements,
) {
    enter("vkGetBufferMemoryRequirements");
    *requirements = memory_requirements();
}

unsafe extern "system" fn bind_buffer_memory(
    _device: vk::Device,
    _buffer: vk::Buffer,
    _memory: vk::DeviceMemory,
    _offset: vk::DeviceSize,
) -> vk::Result {
    enter("vkBindBufferMemory").unwrap_or(vk::Result::SUCCESS)
}

unsafe extern "system" fn get_image_memory_requirements(
    _device: vk::Device,
    _image: vk::Image,
    requirements: *mut vk::MemoryRequirements,
) {
    enter("vkGetImageMemoryRequirements");
    *requirements = memory_requirements();
}

unsafe extern "system" fn bind_image_memory(
    _device: vk::Device,
    _image: vk::Image,
    _memory: vk::DeviceMemory,
    _offset: vk::DeviceSize,
) -> vk::Result {
    enter("vkBindImageMemory").unwrap_or(vk::Result::SUCCESS)
}

// descriptor

unsafe extern "system" fn create_descriptor_pool(
    _device: vk::Device,
    create_info: *const vk::DescriptorPoolCreateInfo,
    _allocator: *const vk::AllocationCallbacks,
    descriptor_pool: *mut vk::DescriptorPool,
) -> vk::Result {
    if let Some(result) = enter("vkCreateDescriptorPool") {
        return result;
    }
    let create_info = &*create_info;
    let pool_sizes = if create_info.pool_size_count == 0 {
        Vec::new()
    } else {
        std::slice::from_raw_parts(
            create_info.p_pool_sizes,
            create_info.pool_size_count as usize,
        )
        .to_vec()
    };
    let raw = next_handle();
    with(|driver| {
        driver.descriptor_pools.insert(
            raw,
            DescriptorPool {
                max_sets: create_info.max_sets,
                allocated: 0,
                pool_sizes,
            },
        )
    });
    *descriptor_pool = vk::DescriptorPool::from_raw(raw);
    vk::Result::SUCCESS
}

unsafe extern "system" fn destroy_descriptor_pool(
    _device: vk::Device,
    descriptor_pool: vk::DescriptorPool,
    _allocator: *const vk::AllocationCallbacks,
) {
    enter("vkDestroyDescriptorPool");
    with(|driver| driver.descriptor_pools.remove(&descriptor_pool.as_raw()));
}

unsafe extern "system" fn allocate_descriptor_sets(
    _device: vk::Device,
    allocate_info: *const vk::DescriptorSetAllocateInfo,
    descriptor_sets: *mut vk::DescriptorSet,
) -> vk::Result {
    if let Some(result) = enter("vkAllocateDescriptorSets") {
        return result;
    }
    let allocate_info = &*allocate_info;
    let count = allocate_info.descriptor_set_count;
    let reserved = with(|driver| {
        match driver
            .descriptor_pools
            .get_mut(&allocate_info.descriptor_pool.as_raw())
        {
            Some(pool) if pool.allocated + count <= pool.max_sets => {
                pool.allocated += count;
                true
            }
            _ => false,
        }
    });
    if !reserved {
        return vk::Result::ERROR_OUT_OF_POOL_MEMORY;
    }
    for i in 0..count as usize {
        *descriptor_sets.add(i) = vk::DescriptorSet::from_raw(next_handle());
    }
    vk::Result::SUCCESS
}

unsafe extern "system" fn free_descriptor_sets(
    _device: vk::Device,
    descriptor_pool: vk::DescriptorPool,
    descriptor_set_count: u32,
    _descriptor_sets: *const vk::DescriptorSet,
) -> vk::Result {
    if let Some(result) = enter("vkFreeDescriptorSets") {
        return result;
    }
    with(|driver| {
        if let Some(pool) = driver.descriptor_pools.get_mut(&descriptor_pool.as_raw()) {
            pool.allocated = pool.allocated.saturating_sub(descriptor_set_count);
        }
    });
    vk::Result::SUCCESS
}

unsafe extern "system" fn update_descriptor_sets(
    _device: vk::Device,
    _write_count: u32,
    _writes: *const vk::WriteDescriptorSet,
    _copy_count: u32,
    _copies: *const vk::CopyDescriptorSet,
) {
    enter("vkUpdateDescriptorSets");
}

// pipeline

unsafe extern "system" fn create_graphics_pipelines(
    _device: vk::Device,
    _pipeline_cache: vk::PipelineCache,
    create_info_count: u32,
    _create_infos: *const vk::GraphicsPipelineCreateInfo,
    _allocator: *const vk::AllocationCallbacks,
    pipelines: *mut vk::Pipeline,
) -> vk::Result {
    let failure = enter("vkCreateGraphicsPipelines");
    for i in 0..create_info_count as usize {
        *pipelines.add(i) = match failure {
            Some(_) => vk::Pipeline::null(),
            None => vk::Pipeline::from_raw(next_handle()),
        };
    }
    failure.unwrap_or(vk::Result::SUCCESS)
}

// command buffer

unsafe extern "system" fn allocate_command_buffers(
    _device: vk::Device,
    allocate_info: *const vk::CommandBufferAllocateInfo,
    command_buffers: *mut vk::CommandBuffer,
) -> vk::Result {
    if let Some(result) = enter("vkAllocateCommandBuffers") {
        return result;
    }
    for i in 0..(*allocate_info).command_buffer_count as usize {
        *command_buffers.add(i) = vk::CommandBuffer::from_raw(next_handle());
    }
    vk::Result::SUCCESS
}

unsafe extern "system" fn free_command_buffers(
    _device: vk::Device,
    _command_pool: vk::CommandPool,
    _command_buffer_count: u32,
    _command_buffers: *const vk::CommandBuffer,
) {
    enter("vkFreeCommandBuffers");
}

unsafe extern "system" fn begin_command_buffer(
    _command_buffer: vk::CommandBuffer,
    _begin_info: *const vk::CommandBufferBeginInfo,
) -> vk::Result {
    enter("vkBeginCommandBuffer").unwrap_or(vk::Result::SUCCESS)
}

unsafe extern "system" fn end_command_buffer(_command_buffer: vk::CommandBuffer) -> vk::Result {
    enter("vkEndCommandBuffer").unwrap_or(vk::Result::SUCCESS)
}

unsafe extern "system" fn reset_command_buffer(
    _command_buffer: vk::CommandBuffer,
    _flags: vk::CommandBufferResetFlags,
) -> vk::Result {
    enter("vkResetCommandBuffer").unwrap_or(vk::Result::SUCCESS)
}

unsafe extern "system" fn cmd_begin_render_pass(
    _command_buffer: vk::CommandBuffer,
    _begin_info: *const vk::RenderPassBeginInfo,
    _contents: vk::SubpassContents,
) {
    enter("vkCmdBeginRenderPass");
}

unsafe extern "system" fn cmd_end_render_pass(_command_buffer: vk::CommandBuffer) {
    enter("vkCmdEndRenderPass");
}

unsafe extern "system" fn cmd_next_subpass(
    _command_buffer: vk::CommandBuffer,
    _contents: vk::SubpassContents,
) {
    enter("vkCmdNextSubpass");
}

unsafe extern "system" fn cmd_bind_pipeline(
    _command_buffer: vk::CommandBuffer,
    _bind_point: vk::PipelineBindPoint,
    _pipeline: vk::Pipeline,
) {
    enter("vkCmdBindPipeline");
}

unsafe extern "system" fn cmd_bind_vertex_buffers(
    _command_buffer: vk::CommandBuffer,
    _first_binding: u32,
    _binding_count: u32,
    _buffers: *const vk::Buffer,
    _offsets: *const vk::DeviceSize,
) {
    enter("vkCmdBindVertexBuffers");
}

unsafe extern "system" fn cmd_bind_index_buffer(
    _command_buffer: vk::CommandBuffer,
    _buffer: vk::Buffer,
    _offset: vk::DeviceSize,
    _index_type: vk::IndexType,
) {
    enter("vkCmdBindIndexBuffer");
}

unsafe extern "system" fn cmd_set_viewport(
    _command_buffer: vk::CommandBuffer,
    _first_viewport: u32,
    _viewport_count: u32,
    _viewports: *const vk::Viewport,
) {
    enter("vkCmdSetViewport");
}

unsafe extern "system" fn cmd_set_scissor(
    _command_buffer: vk::CommandBuffer,
    _first_scissor: u32,
    _scissor_count: u32,
    _scissors: *const vk::Rect2D,
) {
    enter("vkCmdSetScissor");
}

unsafe extern "system" fn cmd_draw(
    _command_buffer: vk::CommandBuffer,
    _vertex_count: u32,
    _instance_count: u32,
    _first_vertex: u32,
    _first_instance: u32,
) {
    enter("vkCmdDraw");
}

unsafe extern "system" fn cmd_draw_indexed(
    _command_buffer: vk::CommandBuffer,
    _index_count: u32,
    _instance_count: u32,
    _first_index: u32,
    _vertex_offset: i32,
    _first_instance: u32,
) {
    enter("vkCmdDrawIndexed");
}

unsafe extern "system" fn cmd_bind_descriptor_sets(
    _command_buffer: vk::CommandBuffer,
    _bind_point: vk::PipelineBindPoint,
    _layout: vk::PipelineLayout,
    _first_set: u32,
    _descriptor_set_count: u32,
    _descriptor_sets: *const vk::DescriptorSet,
    _dynamic_offset_count: u32,
    _dynamic_offsets: *const u32,
) {
    enter("vkCmdBindDescriptorSets");
}

unsafe extern "system" fn cmd_push_constants(
    _command_buffer: vk::CommandBuffer,
    _layout: vk::PipelineLayout,
    _stage_flags: vk::ShaderStageFlags,
    _offset: u32,
    _size: u32,
    _values: *const c_void,
) {
    enter("vkCmdPushConstants");
}

#[allow(clippy::too_many_arguments)]
unsafe extern "system" fn cmd_pipeline_barrier(
    _command_buffer: vk::CommandBuffer,
    _src_stage_mask: vk::PipelineStageFlags,
    _dst_stage_mask: vk::PipelineStageFlags,
    _dependency_flags: vk::DependencyFlags,
    _memory_barrier_count: u32,
    _memory_barriers: *const vk::MemoryBarrier,
    _buffer_memory_barrier_count: u32,
    _buffer_memory_barriers: *const vk::BufferMemoryBarrier,
    _image_memory_barrier_count: u32,
    _image_memory_barriers: *const vk::ImageMemoryBarrier,
) {
    enter("vkCmdPipelineBarrier");
}

unsafe extern "system" fn cmd_copy_buffer(
    _command_buffer: vk::CommandBuffer,
    _src_buffer: vk::Buffer,
    _dst_buffer: vk::Buffer,
    _region_count: u32,
    _regions: *const vk::BufferCopy,
) {
    enter("vkCmdCopyBuffer");
}

unsafe extern "system" fn cmd_copy_buffer_to_image(
    _command_buffer: vk::CommandBuffer,
    _src_buffer: vk::Buffer,
    _dst_image: vk::Image,
    _dst_image_layout: vk::ImageLayout,
    _region_count: u32,
    _regions: *const vk::BufferImageCopy,
) {
    enter("vkCmdCopyBufferToImage");
}

unsafe extern "system" fn cmd_clear_color_image(
    _command_buffer: vk::CommandBuffer,
    _image: vk::Image,
    _image_layout: vk::ImageLayout,
    _color: *const vk::ClearColorValue,
    _range_count: u32,
    _ranges: *const vk::ImageSubresourceRange,
) {
    enter("vkCmdClearColorImage");
}

// fence

unsafe extern "system" fn create_fence(
    _device: vk::Device,
    create_info: *const vk::FenceCreateInfo,
    _allocator: *const vk::AllocationCallbacks,
    fence: *mut vk::Fence,
) -> vk::Result {
    if let Some(result) = enter("vkCreateFence") {
        return result;
    }
    let raw = next_handle();
    let signaled = (*create_info)
        .flags
        .contains(vk::FenceCreateFlags::SIGNALED);
    with(|driver| driver.fences.insert(raw, signaled));
    *fence = vk::Fence::from_raw(raw);
    vk::Result::SUCCESS
}

unsafe extern "system" fn destroy_fence(
    _device: vk::Device,
    fence: vk::Fence,
    _allocator: *const vk::AllocationCallbacks,
) {
    enter("vkDestroyFence");
    with(|driver| driver.fences.remove(&fence.as_raw()));
}

unsafe extern "system" fn wait_for_fences(
    _device: vk::Device,
    fence_count: u32,
    fences: *const vk::Fence,
    wait_all: vk::Bool32,
    _timeout: u64,
) -> vk::Result {
    if let Some(result) = enter("vkWaitForFences") {
        return result;
    }
    let fences = std::slice::from_raw_parts(fences, fence_count as usize);
    // フェイクのGPUでは待ってもfenceの状態は変わらない
    let satisfied = with(|driver| {
        let mut signaled = fences
            .iter()
            .map(|fence| driver.fences.get(&fence.as_raw()).copied().unwrap_or(false));
        if wait_all == vk::TRUE {
            signaled.all(|signaled| signaled)
        } else {
            signaled.any(|signaled| signaled)
        }
    });
    if satisfied {
        vk::Result::SUCCESS
    } else {
        vk::Result::TIMEOUT
    }
}

unsafe extern "system" fn reset_fences(
    _device: vk::Device,
    fence_count: u32,
    fences: *const vk::Fence,
) -> vk::Result {
    if let Some(result) = enter("vkResetFences") {
        return result;
    }
    let fences = std::slice::from_raw_parts(fences, fence_count as usize);
    with(|driver| {
        for fence in fences {
            driver.fences.insert(fence.as_raw(), false);
        }
    });
    vk::Result::SUCCESS
}

unsafe extern "system" fn get_fence_status(_device: vk::Device, fence: vk::Fence) -> vk::Result {
    if let Some(result) = enter("vkGetFenceStatus") {
        return result;
    }
    let signaled = with(|driver| driver.fences.get(&fence.as_raw()).copied());
    match signaled {
        Some(true) => vk::Result::SUCCESS,
        Some(false) => vk::Result::NOT_READY,
        None => vk::Result::ERROR_DEVICE_LOST,
    }
}
