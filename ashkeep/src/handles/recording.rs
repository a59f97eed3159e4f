//! CommandBufferへの記録を入れ子のスコープで管理する。
//!
//! - [`RecordingScope`]: begin_command_bufferからend_command_bufferまで
//! - [`RenderPassScope`]: cmd_begin_render_passからcmd_end_render_passまで
//!
//! RenderPassScopeはRecordingScopeを可変で借用するので、
//! RenderPassが終わる前に記録を終えることはコンパイル時に防がれる。
//! どちらのスコープもDropで自動的に終了する。

use crate::{CommandBufferState, InvalidUsage, Result, VkResultExt};
use ash::vk;
use std::fmt::Debug;

/// RenderPassScopeの開始に必要な情報
#[derive(Clone)]
pub struct RenderPassBeginInfo {
    /// 使用するRenderPass
    pub render_pass: crate::RenderPassHandle,
    /// 使用するFramebuffer
    pub framebuffer: crate::FramebufferHandle,
    /// 描画範囲
    pub render_area: vk::Rect2D,
    /// 各attachmentのクリア値
    pub clear_values: Vec<vk::ClearValue>,
    /// 最初のsubpassの内容
    pub contents: vk::SubpassContents,
}
impl RenderPassBeginInfo {
    /// Framebuffer全体を描画範囲にしたRenderPassBeginInfoを作る
    pub fn new(
        render_pass: &crate::RenderPassHandle,
        framebuffer: &crate::FramebufferHandle,
        clear_values: &[vk::ClearValue],
    ) -> Self {
        Self {
            render_pass: render_pass.clone(),
            framebuffer: framebuffer.clone(),
            render_area: vk::Rect2D {
                offset: vk::Offset2D { x: 0, y: 0 },
                extent: framebuffer.extent(),
            },
            clear_values: clear_values.to_vec(),
            contents: vk::SubpassContents::INLINE,
        }
    }
}

// vk::ClearValueはunionなのでDebugを持たない
impl Debug for RenderPassBeginInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderPassBeginInfo")
            .field("render_pass", &self.render_pass)
            .field("framebuffer", &self.framebuffer)
            .field("render_area", &self.render_area)
            .field("clear_values", &self.clear_values.len())
            .field("contents", &self.contents)
            .finish()
    }
}

/// RenderPassScopeが記録の間保持しているリソース
#[derive(Debug, Clone)]
pub enum BoundResource {
    /// 開始したRenderPass
    RenderPass(crate::RenderPassHandle),
    /// 開始したFramebuffer
    Framebuffer(crate::FramebufferHandle),
    /// bindしたGraphics Pipeline
    Pipeline(crate::GraphicsPipelineHandle),
    /// bindしたvertex bufferやindex buffer
    Buffer(crate::BufferHandle),
}

/// CommandBufferの記録中を表すスコープ。
/// [`crate::CommandBufferHandle::begin`]で作られる。
pub struct RecordingScope {
    command_buffer: crate::CommandBufferHandle,
    ended: bool,
}
impl RecordingScope {
    pub(crate) fn new(command_buffer: crate::CommandBufferHandle) -> Self {
        Self {
            command_buffer,
            ended: false,
        }
    }

    /// 記録しているCommandBufferHandle
    pub fn command_buffer(&self) -> &crate::CommandBufferHandle {
        &self.command_buffer
    }

    /// RenderPassを開始する。
    /// RenderPassとFramebufferはRenderPassScopeが終わるまで保持される。
    pub fn begin_render_pass(&mut self, info: RenderPassBeginInfo) -> Result<RenderPassScope<'_>> {
        // mem::forgetされたRenderPassScopeが残っている場合
        if !self
            .command_buffer
            .transition(CommandBufferState::Recording, CommandBufferState::InRenderPass)
        {
            return Err(InvalidUsage::RenderPassActive.into());
        }

        let begin_info = vk::RenderPassBeginInfo::builder()
            .render_pass(*info.render_pass)
            .framebuffer(*info.framebuffer)
            .render_area(info.render_area)
            .clear_values(&info.clear_values);
        unsafe {
            self.device().cmd_begin_render_pass(
                self.command_buffer.raw(),
                &begin_info,
                info.contents,
            );
        }
        log::trace!("begin render pass on {:?}", self.command_buffer);

        Ok(RenderPassScope {
            recording: self,
            kept_alive: vec![
                BoundResource::RenderPass(info.render_pass),
                BoundResource::Framebuffer(info.framebuffer),
            ],
            ended: false,
        })
    }

    /// pipeline barrierコマンドを積む
    pub fn pipeline_barrier(
        &mut self,
        src_stage_mask: vk::PipelineStageFlags,
        dst_stage_mask: vk::PipelineStageFlags,
        dependency_flags: vk::DependencyFlags,
        memory_barriers: &[vk::MemoryBarrier],
        buffer_memory_barriers: &[vk::BufferMemoryBarrier],
        image_memory_barriers: &[vk::ImageMemoryBarrier],
    ) {
        unsafe {
            self.device().cmd_pipeline_barrier(
                self.command_buffer.raw(),
                src_stage_mask,
                dst_stage_mask,
                dependency_flags,
                memory_barriers,
                buffer_memory_barriers,
                image_memory_barriers,
            )
        }
    }

    /// copy bufferコマンドを積む
    pub fn copy_buffer(
        &mut self,
        src_buffer: &crate::BufferHandle,
        dst_buffer: &crate::BufferHandle,
        regions: &[vk::BufferCopy],
    ) {
        unsafe {
            self.device().cmd_copy_buffer(
                self.command_buffer.raw(),
                **src_buffer,
                **dst_buffer,
                regions,
            )
        }
    }

    /// copy buffer to imageコマンドを積む
    pub fn copy_buffer_to_image(
        &mut self,
        src_buffer: &crate::BufferHandle,
        dst_image: &crate::ImageHandle,
        dst_image_layout: vk::ImageLayout,
        regions: &[vk::BufferImageCopy],
    ) {
        unsafe {
            self.device().cmd_copy_buffer_to_image(
                self.command_buffer.raw(),
                **src_buffer,
                **dst_image,
                dst_image_layout,
                regions,
            )
        }
    }

    /// clear color imageコマンドを積む
    pub fn clear_color_image(
        &mut self,
        image: &crate::ImageHandle,
        image_layout: vk::ImageLayout,
        clear_color: &vk::ClearColorValue,
        ranges: &[vk::ImageSubresourceRange],
    ) {
        unsafe {
            self.device().cmd_clear_color_image(
                self.command_buffer.raw(),
                **image,
                image_layout,
                clear_color,
                ranges,
            )
        }
    }

    /// DescriptorSetHandleをbindするコマンドを積む
    pub fn bind_descriptor_sets(
        &mut self,
        pipeline_bind_point: vk::PipelineBindPoint,
        pipeline_layout: &crate::PipelineLayoutHandle,
        first_set: u32,
        descriptor_sets: &[crate::DescriptorSetHandle],
        dynamic_offsets: &[u32],
    ) {
        let descriptor_sets = descriptor_sets
            .iter()
            .map(|descriptor_set| **descriptor_set)
            .collect::<Vec<_>>();
        unsafe {
            self.device().cmd_bind_descriptor_sets(
                self.command_buffer.raw(),
                pipeline_bind_point,
                **pipeline_layout,
                first_set,
                &descriptor_sets,
                dynamic_offsets,
            )
        }
    }

    /// PushConstantsを積むコマンドを積む
    pub fn push_constants<T: bytemuck::Pod>(
        &mut self,
        pipeline_layout: &crate::PipelineLayoutHandle,
        stage_flags: vk::ShaderStageFlags,
        offset: u32,
        values: &[T],
    ) {
        unsafe {
            self.device().cmd_push_constants(
                self.command_buffer.raw(),
                **pipeline_layout,
                stage_flags,
                offset,
                bytemuck::cast_slice(values),
            )
        }
    }

    /// 記録を終了する。
    /// RenderPassが終わっていなければ`InvalidUsage::RenderPassActive`を返す。
    /// その場合でもスコープのDropでRenderPassと記録は閉じられる。
    pub fn end(mut self) -> Result<()> {
        if self.command_buffer.state() == CommandBufferState::InRenderPass {
            return Err(InvalidUsage::RenderPassActive.into());
        }
        self.finish()
    }

    fn finish(&mut self) -> Result<()> {
        self.ended = true;
        let result = unsafe {
            self.device()
                .end_command_buffer(self.command_buffer.raw())
                .called("vkEndCommandBuffer")
        };
        // 失敗した場合もresetで回復できるようにIdleへ戻す
        self.command_buffer.set_state(CommandBufferState::Idle);
        log::trace!("end recording {:?}", self.command_buffer);
        result
    }

    fn device(&self) -> crate::DeviceHandle {
        self.command_buffer.device()
    }
}

// Debugトレイトの実装
impl Debug for RecordingScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordingScope")
            .field("command_buffer", &self.command_buffer)
            .finish()
    }
}

// Drop時に記録を終了する
impl Drop for RecordingScope {
    fn drop(&mut self) {
        if self.ended {
            return;
        }
        if self
            .command_buffer
            .transition(CommandBufferState::InRenderPass, CommandBufferState::Recording)
        {
            log::warn!(
                "render pass on {:?} was never ended; ending it with the recording",
                self.command_buffer
            );
            unsafe {
                self.device()
                    .cmd_end_render_pass(self.command_buffer.raw());
            }
        }
        if let Err(error) = self.finish() {
            log::error!("failed to end recording on drop: {error}");
        }
    }
}

/// RenderPassの記録中を表すスコープ。
/// [`RecordingScope::begin_render_pass`]で作られる。
///
/// bindしたpipelineやbufferはこのスコープが終わるまで保持される。
pub struct RenderPassScope<'a> {
    recording: &'a mut RecordingScope,
    kept_alive: Vec<BoundResource>,
    ended: bool,
}
impl<'a> RenderPassScope<'a> {
    /// 記録しているCommandBufferHandle
    pub fn command_buffer(&self) -> &crate::CommandBufferHandle {
        self.recording.command_buffer()
    }

    /// このスコープが保持しているリソース
    pub fn kept_alive(&self) -> &[BoundResource] {
        &self.kept_alive
    }

    /// Graphics Pipelineをbindするコマンドを積む
    pub fn bind_pipeline(&mut self, pipeline: &crate::GraphicsPipelineHandle) {
        unsafe {
            self.device().cmd_bind_pipeline(
                self.raw(),
                vk::PipelineBindPoint::GRAPHICS,
                **pipeline,
            )
        }
        self.kept_alive.push(BoundResource::Pipeline(pipeline.clone()));
    }

    /// vertex bufferをbindするコマンドを積む
    pub fn bind_vertex_buffers(
        &mut self,
        first_binding: u32,
        buffers: &[(&crate::BufferHandle, vk::DeviceSize)],
    ) {
        let (raw_buffers, offsets): (Vec<_>, Vec<_>) = buffers
            .iter()
            .map(|(buffer, offset)| (***buffer, *offset))
            .unzip();
        unsafe {
            self.device()
                .cmd_bind_vertex_buffers(self.raw(), first_binding, &raw_buffers, &offsets)
        }
        self.kept_alive.extend(
            buffers
                .iter()
                .map(|(buffer, _)| BoundResource::Buffer((*buffer).clone())),
        );
    }

    /// index bufferをbindするコマンドを積む
    pub fn bind_index_buffer(
        &mut self,
        buffer: &crate::BufferHandle,
        offset: vk::DeviceSize,
        index_type: vk::IndexType,
    ) {
        unsafe {
            self.device()
                .cmd_bind_index_buffer(self.raw(), **buffer, offset, index_type)
        }
        self.kept_alive.push(BoundResource::Buffer(buffer.clone()));
    }

    /// viewportを設定するコマンドを積む
    pub fn set_viewport(&mut self, first_viewport: u32, viewports: &[vk::Viewport]) {
        unsafe {
            self.device()
                .cmd_set_viewport(self.raw(), first_viewport, viewports)
        }
    }

    /// scissorを設定するコマンドを積む
    pub fn set_scissor(&mut self, first_scissor: u32, scissors: &[vk::Rect2D]) {
        unsafe {
            self.device()
                .cmd_set_scissor(self.raw(), first_scissor, scissors)
        }
    }

    /// drawコマンドを積む
    pub fn draw(
        &mut self,
        vertex_count: u32,
        instance_count: u32,
        first_vertex: u32,
        first_instance: u32,
    ) {
        unsafe {
            self.device().cmd_draw(
                self.raw(),
                vertex_count,
                instance_count,
                first_vertex,
                first_instance,
            )
        }
    }

    /// draw indexedコマンドを積む
    pub fn draw_indexed(
        &mut self,
        index_count: u32,
        instance_count: u32,
        first_index: u32,
        vertex_offset: i32,
        first_instance: u32,
    ) {
        unsafe {
            self.device().cmd_draw_indexed(
                self.raw(),
                index_count,
                instance_count,
                first_index,
                vertex_offset,
                first_instance,
            )
        }
    }

    /// 次のsubpassに進むコマンドを積む
    pub fn next_subpass(&mut self, contents: vk::SubpassContents) {
        unsafe { self.device().cmd_next_subpass(self.raw(), contents) }
    }

    /// DescriptorSetHandleをbindするコマンドを積む
    pub fn bind_descriptor_sets(
        &mut self,
        pipeline_layout: &crate::PipelineLayoutHandle,
        first_set: u32,
        descriptor_sets: &[crate::DescriptorSetHandle],
        dynamic_offsets: &[u32],
    ) {
        self.recording.bind_descriptor_sets(
            vk::PipelineBindPoint::GRAPHICS,
            pipeline_layout,
            first_set,
            descriptor_sets,
            dynamic_offsets,
        )
    }

    /// PushConstantsを積むコマンドを積む
    pub fn push_constants<T: bytemuck::Pod>(
        &mut self,
        pipeline_layout: &crate::PipelineLayoutHandle,
        stage_flags: vk::ShaderStageFlags,
        offset: u32,
        values: &[T],
    ) {
        self.recording
            .push_constants(pipeline_layout, stage_flags, offset, values)
    }

    /// RenderPassを終了する
    pub fn end(mut self) {
        self.finish();
    }

    fn finish(&mut self) {
        self.ended = true;
        unsafe { self.device().cmd_end_render_pass(self.raw()) }
        self.recording.command_buffer.set_state(CommandBufferState::Recording);
        log::trace!(
            "end render pass on {:?}, releasing {} resources",
            self.recording.command_buffer,
            self.kept_alive.len()
        );
    }

    fn raw(&self) -> vk::CommandBuffer {
        self.recording.command_buffer.raw()
    }

    fn device(&self) -> crate::DeviceHandle {
        self.recording.device()
    }
}

// Debugトレイトの実装
impl Debug for RenderPassScope<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderPassScope")
            .field("kept_alive", &self.kept_alive.len())
            .finish()
    }
}

// Drop時にRenderPassを終了する
impl Drop for RenderPassScope<'_> {
    fn drop(&mut self) {
        if !self.ended {
            self.finish();
        }
    }
}
