//! Queueへのsubmitとpresentを行うQueueを定義する。
//! vk::Queueは破棄の必要がないので、Deviceを保持するだけの構造体になっている。

use crate::{InvalidUsage, Result, VkResultExt};
use ash::vk;
use std::ops::Deref;

/// vk::QueueとそのDeviceを保持する構造体
#[derive(Debug, Clone)]
pub struct Queue {
    device: crate::DeviceHandle,
    queue: vk::Queue,
    queue_family_index: u32,
}
impl Queue {
    pub(crate) fn new(device: crate::DeviceHandle, queue: vk::Queue, queue_family_index: u32) -> Self {
        Self {
            device,
            queue,
            queue_family_index,
        }
    }

    /// CommandBufferをsubmitする。
    /// 記録中のCommandBufferが含まれていれば`InvalidUsage::SubmitWhileRecording`を返す。
    pub fn submit(
        &self,
        command_buffers: &[crate::CommandBufferHandle],
        wait_semaphores: &[(&crate::SemaphoreHandle, vk::PipelineStageFlags)],
        signal_semaphores: &[&crate::SemaphoreHandle],
        fence: Option<&crate::FenceHandle>,
    ) -> Result<()> {
        if command_buffers
            .iter()
            .any(|command_buffer| command_buffer.state() != crate::CommandBufferState::Idle)
        {
            return Err(InvalidUsage::SubmitWhileRecording.into());
        }

        let raw_command_buffers = command_buffers
            .iter()
            .map(|command_buffer| **command_buffer)
            .collect::<Vec<_>>();
        let (raw_wait_semaphores, wait_stages): (Vec<_>, Vec<_>) = wait_semaphores
            .iter()
            .map(|(semaphore, stage)| (***semaphore, *stage))
            .unzip();
        let raw_signal_semaphores = signal_semaphores
            .iter()
            .map(|semaphore| ***semaphore)
            .collect::<Vec<_>>();
        let submit_info = vk::SubmitInfo::builder()
            .command_buffers(&raw_command_buffers)
            .wait_semaphores(&raw_wait_semaphores)
            .wait_dst_stage_mask(&wait_stages)
            .signal_semaphores(&raw_signal_semaphores)
            .build();
        unsafe {
            self.device
                .queue_submit(
                    self.queue,
                    &[submit_info],
                    fence.map(|fence| **fence).unwrap_or_default(),
                )
                .called("vkQueueSubmit")
        }
    }

    /// Swapchainのimageをpresentする。
    /// 戻り値はSwapchainがsuboptimalかどうか。
    pub fn present(
        &self,
        swapchain: &crate::SwapchainHandle,
        image_index: u32,
        wait_semaphores: &[&crate::SemaphoreHandle],
    ) -> Result<bool> {
        let raw_wait_semaphores = wait_semaphores
            .iter()
            .map(|semaphore| ***semaphore)
            .collect::<Vec<_>>();
        let swapchains = [**swapchain];
        let image_indices = [image_index];
        let present_info = vk::PresentInfoKHR::builder()
            .wait_semaphores(&raw_wait_semaphores)
            .swapchains(&swapchains)
            .image_indices(&image_indices);
        unsafe {
            self.device
                .swapchain_loader()?
                .queue_present(self.queue, &present_info)
                .called("vkQueuePresentKHR")
        }
    }

    /// QueueのIdleを待機する
    pub fn wait_idle(&self) -> Result<()> {
        unsafe {
            self.device
                .queue_wait_idle(self.queue)
                .called("vkQueueWaitIdle")
        }
    }

    /// QueueFamilyのindex
    pub fn queue_family_index(&self) -> u32 {
        self.queue_family_index
    }

    /// DeviceHandleを取得する
    pub fn device(&self) -> crate::DeviceHandle {
        self.device.clone()
    }
}

// Queueはvk::QueueにDerefする
impl Deref for Queue {
    type Target = vk::Queue;
    fn deref(&self) -> &Self::Target {
        &self.queue
    }
}
