use crate::{utils::create_fence, Error, Result};
use ash::vk;
use std::time::Duration;

/// 指定したcommand_poolからPrimaryレベルのcommand bufferをひとつallocateする関数
pub fn allocate_command_buffer(
    command_pool: &crate::CommandPoolHandle,
) -> Result<crate::CommandBufferHandle> {
    command_pool
        .allocate_command_buffers(vk::CommandBufferLevel::PRIMARY, 1)?
        .pop()
        .ok_or(Error::ResourceCreationFailed {
            call: "vkAllocateCommandBuffers",
            result: vk::Result::ERROR_UNKNOWN,
        })
}

/// command bufferをリセットしてone time submit用にbeginする関数
pub fn begin_onetime_command_buffer(
    command_buffer: &crate::CommandBufferHandle,
) -> Result<crate::RecordingScope> {
    // reset command buffer
    command_buffer.reset(vk::CommandBufferResetFlags::RELEASE_RESOURCES)?;

    // begin command buffer
    command_buffer.begin(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT)
}

/// 使い捨てのcommand bufferに`record`でコマンドを積んでsubmitし、完了を待つ関数。
/// `timeout`以内に終わらなければQueueがIdleになるのを待ってから`CallFailed`の`TIMEOUT`を返す。
pub fn one_time_submit<F>(
    queue: &crate::Queue,
    command_pool: &crate::CommandPoolHandle,
    timeout: Duration,
    record: F,
) -> Result<()>
where
    F: FnOnce(&mut crate::RecordingScope) -> Result<()>,
{
    let command_buffer = allocate_command_buffer(command_pool)?;

    let mut recording = command_buffer.begin(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT)?;
    record(&mut recording)?;
    recording.end()?;

    let fence = create_fence(&queue.device())?;
    queue.submit(std::slice::from_ref(&command_buffer), &[], &[], Some(&fence))?;
    let signaled = fence.wait(timeout);
    if !matches!(signaled, Ok(true)) {
        // 完了していないsubmitが使っているfenceとcommand bufferはまだ破棄できない
        log::warn!("one time submit did not finish in {timeout:?}; waiting for queue idle");
        queue.wait_idle()?;
    }
    if !signaled? {
        return Err(Error::CallFailed {
            call: "vkWaitForFences",
            result: vk::Result::TIMEOUT,
        });
    }
    Ok(())
}

/// image barrierのコマンドを積むヘルパー関数
#[allow(clippy::too_many_arguments)]
pub fn cmd_image_barrier(
    recording: &mut crate::RecordingScope,
    src_stage_mask: vk::PipelineStageFlags,
    src_access_mask: vk::AccessFlags,
    old_layout: vk::ImageLayout,
    dst_stage_mask: vk::PipelineStageFlags,
    dst_access_mask: vk::AccessFlags,
    new_layout: vk::ImageLayout,
    image: &crate::ImageHandle,
) {
    // 画像レイアウト変更のコマンドのレコード
    let barrier = vk::ImageMemoryBarrier::builder()
        .src_access_mask(src_access_mask)
        .old_layout(old_layout)
        .dst_access_mask(dst_access_mask)
        .new_layout(new_layout)
        .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
        .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
        .subresource_range(
            vk::ImageSubresourceRange::builder()
                .aspect_mask(vk::ImageAspectFlags::COLOR)
                .base_mip_level(0)
                .level_count(1)
                .base_array_layer(0)
                .layer_count(1)
                .build(),
        )
        .image(**image)
        .build();
    recording.pipeline_barrier(
        src_stage_mask,
        dst_stage_mask,
        vk::DependencyFlags::empty(),
        &[],
        &[],
        std::slice::from_ref(&barrier),
    );
}
