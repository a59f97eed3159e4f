use crate::{utils::one_time_submit, Error, Result};
use ash::vk;
use std::time::Duration;

/// Bufferと、そこにbindしたメモリをまとめた構造体
#[derive(Debug, Clone)]
pub struct BufferObjects {
    /// BufferHandle
    pub buffer: crate::BufferHandle,
    /// bindしたDeviceMemoryHandle
    pub memory: crate::DeviceMemoryHandle,
}

/// Bufferを作成して専用のメモリを確保し、bindする関数
pub fn create_buffer_with_memory(
    device: &crate::DeviceHandle,
    buffer_size: u64,
    usage: vk::BufferUsageFlags,
    memory_property_flags: vk::MemoryPropertyFlags,
) -> Result<BufferObjects> {
    let buffer_create_info = vk::BufferCreateInfo::builder()
        .size(buffer_size)
        .usage(usage)
        .sharing_mode(vk::SharingMode::EXCLUSIVE);
    let buffer = device.create_buffer(&buffer_create_info)?;

    // bufferのメモリ確保
    let requirements = buffer.get_buffer_memory_requirements();
    let memory_type_index = device
        .find_memory_type_index(requirements.memory_type_bits, memory_property_flags)
        .ok_or(Error::NoSuitableMemoryType {
            type_bits: requirements.memory_type_bits,
            flags: memory_property_flags,
        })?;
    let memory = device.allocate_memory(requirements.size, memory_type_index)?;

    // bufferとメモリのバインド
    buffer.bind_memory(&memory, 0)?;

    Ok(BufferObjects { buffer, memory })
}

/// HostのBufferを作成する関数
pub fn create_host_buffer(
    device: &crate::DeviceHandle,
    buffer_size: u64,
    usage: vk::BufferUsageFlags,
) -> Result<BufferObjects> {
    create_buffer_with_memory(
        device,
        buffer_size,
        usage,
        vk::MemoryPropertyFlags::HOST_VISIBLE | vk::MemoryPropertyFlags::HOST_COHERENT,
    )
}

/// HostのBufferを作成し、データをコピーする関数
pub fn create_host_buffer_with_data<T: bytemuck::Pod>(
    device: &crate::DeviceHandle,
    data: &[T],
    usage: vk::BufferUsageFlags,
) -> Result<BufferObjects> {
    let buffer_size = std::mem::size_of_val(data) as u64;
    let objects = create_host_buffer(device, buffer_size, usage)?;

    // データのコピー
    let map = objects.memory.map(0, Some(buffer_size))?;
    map.write(0, data)?;

    Ok(objects)
}

/// DeviceLocalのBufferを作成する関数
pub fn create_device_local_buffer(
    device: &crate::DeviceHandle,
    buffer_size: u64,
    usage: vk::BufferUsageFlags,
) -> Result<BufferObjects> {
    create_buffer_with_memory(
        device,
        buffer_size,
        usage,
        vk::MemoryPropertyFlags::DEVICE_LOCAL,
    )
}

/// DeviceLocalのBufferを作成し、staging buffer経由でデータをコピーする関数
pub fn create_device_local_buffer_with_data<T: bytemuck::Pod>(
    queue: &crate::Queue,
    transfer_command_pool: &crate::CommandPoolHandle,
    data: &[T],
    usage: vk::BufferUsageFlags,
    timeout: Duration,
) -> Result<BufferObjects> {
    let device = queue.device();
    let buffer_size = std::mem::size_of_val(data) as u64;

    // staging bufferの作成
    let staging = create_host_buffer_with_data(&device, data, vk::BufferUsageFlags::TRANSFER_SRC)?;

    let objects = create_device_local_buffer(
        &device,
        buffer_size,
        usage | vk::BufferUsageFlags::TRANSFER_DST,
    )?;

    // staging bufferからコピー
    one_time_submit(queue, transfer_command_pool, timeout, |recording| {
        recording.copy_buffer(
            &staging.buffer,
            &objects.buffer,
            &[vk::BufferCopy::builder().size(buffer_size).build()],
        );
        Ok(())
    })?;

    Ok(objects)
}
