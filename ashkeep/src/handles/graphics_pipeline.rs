//! 参照カウンタで管理して、参照がすべて破棄された際に
//! Graphics Pipelineの破棄の処理まで行うGraphicsPipelineHandleを定義する。

use crate::{Error, Handle, Result};
use ash::vk;
use std::{fmt::Debug, ops::Deref};

use super::shared::Shared;

type GraphicsPipelineParents = (
    crate::DeviceHandle,
    crate::PipelineLayoutHandle,
    crate::RenderPassHandle,
);

struct GraphicsPipelineHandleData {
    pipeline: Handle<vk::Pipeline, GraphicsPipelineParents>,
    subpass: u32,
}

/// Graphics用のvk::Pipelineを参照カウントで管理するためのハンドル。
/// PipelineLayoutとRenderPassを保持する。
#[derive(Clone)]
pub struct GraphicsPipelineHandle(Shared<GraphicsPipelineHandleData>);
impl GraphicsPipelineHandle {
    pub(crate) fn new(
        device: crate::DeviceHandle,
        layout: crate::PipelineLayoutHandle,
        render_pass: crate::RenderPassHandle,
        create_info: &vk::GraphicsPipelineCreateInfo,
    ) -> Result<Self> {
        let mut create_info = *create_info;
        create_info.layout = *layout;
        create_info.render_pass = *render_pass;

        // create pipeline
        let pipeline = unsafe {
            device.create_graphics_pipelines(
                vk::PipelineCache::null(),
                std::slice::from_ref(&create_info),
                None,
            )
        };
        let pipeline = match pipeline {
            Ok(pipelines) => pipelines.into_iter().next().unwrap_or_default(),
            Err((pipelines, result)) => {
                // 一部だけ作られたpipelineは破棄しておく
                for pipeline in pipelines.into_iter().filter(|p| *p != vk::Pipeline::null()) {
                    unsafe { device.destroy_pipeline(pipeline, None) };
                }
                return Err(Error::ResourceCreationFailed {
                    call: "vkCreateGraphicsPipelines",
                    result,
                });
            }
        };

        let subpass = create_info.subpass;
        let pipeline = Handle::new(
            pipeline,
            |pipeline, (device, _, _): &GraphicsPipelineParents| unsafe {
                device.destroy_pipeline(pipeline, None)
            },
            (device, layout, render_pass),
        );
        Ok(Self(Shared::new(GraphicsPipelineHandleData { pipeline, subpass })))
    }

    /// PipelineLayoutHandleを取得する
    pub fn layout(&self) -> crate::PipelineLayoutHandle {
        self.0.pipeline.parents().1.clone()
    }

    /// RenderPassHandleを取得する
    pub fn render_pass(&self) -> crate::RenderPassHandle {
        self.0.pipeline.parents().2.clone()
    }

    /// このpipelineを使うsubpassのindex
    pub fn subpass(&self) -> u32 {
        self.0.subpass
    }

    /// DeviceHandleを取得する
    pub fn device(&self) -> crate::DeviceHandle {
        self.0.pipeline.parents().0.clone()
    }
}

impl Debug for GraphicsPipelineHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphicsPipelineHandle").finish()
    }
}

impl Deref for GraphicsPipelineHandle {
    type Target = vk::Pipeline;
    fn deref(&self) -> &Self::Target {
        &self.0.pipeline
    }
}
