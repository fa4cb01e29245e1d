//! Separable Gaussian blur over the bright pass and the tonemap composite.

use glam::Vec3;

use crate::state::PostProcessSettings;
use crate::uniforms::{UniformKind, UniformLayout};

use super::program::{set_named_float, set_named_int, PipelineOptions, ShaderProgram, UniformBlock};
use super::shaders;
use super::targets::{HdrTargets, PingPong, HDR_FORMAT};

/// Number of one-dimensional blur passes per frame.
pub const BLUR_ITERATIONS: usize = 10;

/// Five-tap kernel, centre first. Applied symmetrically.
pub const GAUSSIAN_WEIGHTS: [f32; 5] = [0.227027, 0.1945946, 0.1216216, 0.054054, 0.016216];

/// Rec. 709 luma used by the bright pass.
pub const LUMINANCE: Vec3 = Vec3::new(0.2126, 0.7152, 0.0722);
pub const BRIGHT_THRESHOLD: f32 = 1.0;

/// Input of one blur pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlurSource {
    BrightPass,
    PingPong(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlurPass {
    pub horizontal: bool,
    pub source: BlurSource,
    pub target: usize,
}

/// Ping-pong schedule: the first pass reads the bright pass, every later
/// pass reads what the previous one wrote, and the direction alternates
/// starting with horizontal.
pub fn blur_schedule(iterations: usize) -> Vec<BlurPass> {
    let mut passes: Vec<BlurPass> = Vec::with_capacity(iterations);
    for index in 0..iterations {
        let horizontal = index % 2 == 0;
        let source = match passes.last() {
            None => BlurSource::BrightPass,
            Some(previous) => BlurSource::PingPong(previous.target),
        };
        passes.push(BlurPass {
            horizontal,
            source,
            target: usize::from(horizontal),
        });
    }
    passes
}

/// Ping-pong buffer holding the blurred result; the bright pass itself when
/// no blur runs.
pub fn blur_output(iterations: usize) -> BlurSource {
    blur_schedule(iterations)
        .last()
        .map_or(BlurSource::BrightPass, |pass| BlurSource::PingPong(pass.target))
}

/// Bright-pass extraction as done by the scene shaders.
pub fn bright_pass(color: Vec3) -> Vec3 {
    if color.dot(LUMINANCE) > BRIGHT_THRESHOLD {
        color
    } else {
        Vec3::ZERO
    }
}

/// Reference of the composite shader for one pixel.
pub fn tonemap(hdr: Vec3, blurred: Vec3, settings: &PostProcessSettings) -> Vec3 {
    let hdr = if settings.bloom { hdr + blurred } else { hdr };
    let mapped = Vec3::ONE - (-hdr * settings.exposure).exp();
    mapped.powf(1.0 / settings.gamma)
}

fn blur_layout() -> UniformLayout {
    UniformLayout::new().with("horizontal", UniformKind::Int, 0)
}

fn composite_layout() -> UniformLayout {
    UniformLayout::new()
        .with("bloom", UniformKind::Int, 0)
        .with("exposure", UniformKind::Float, 4)
        .with("gamma", UniformKind::Float, 8)
}

fn texture_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Texture {
            sample_type: wgpu::TextureSampleType::Float { filterable: true },
            view_dimension: wgpu::TextureViewDimension::D2,
            multisampled: false,
        },
        count: None,
    }
}

fn sampler_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
        count: None,
    }
}

/// Blur and composite passes bound to one fixed set of targets.
pub struct BloomStage {
    blur_pipeline: wgpu::RenderPipeline,
    /// Index 0 drives vertical passes, index 1 horizontal ones. Every pass of
    /// a submission sees the same buffer contents, so each direction keeps
    /// its own block.
    blur_blocks: [UniformBlock; 2],
    bright_group: wgpu::BindGroup,
    ping_pong_groups: [wgpu::BindGroup; 2],
    composite_pipeline: wgpu::RenderPipeline,
    composite_block: UniformBlock,
    composite_group: wgpu::BindGroup,
    schedule: Vec<BlurPass>,
}

impl BloomStage {
    pub fn new(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        surface_format: wgpu::TextureFormat,
        targets: &HdrTargets,
        ping_pong: &PingPong,
    ) -> Self {
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("bloom-sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        let blur_program =
            ShaderProgram::new(device, "blur", &shaders::blur_shader(), blur_layout());
        let source_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("blur-source-layout"),
            entries: &[texture_entry(0), sampler_entry(1)],
        });
        let source_group = |label: &str, view: &wgpu::TextureView| {
            device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some(label),
                layout: &source_layout,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: wgpu::BindingResource::TextureView(view),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: wgpu::BindingResource::Sampler(&sampler),
                    },
                ],
            })
        };
        let bright_group = source_group("blur-from-bright", targets.bright.view());
        let ping_pong_groups = [
            source_group("blur-from-ping-pong-0", ping_pong.get(0).view()),
            source_group("blur-from-ping-pong-1", ping_pong.get(1).view()),
        ];
        let blur_pipeline = blur_program.create_pipeline(
            device,
            &PipelineOptions {
                label: "blur-pipeline",
                vertex_buffers: &[],
                extra_groups: &[&source_layout],
                targets: &[Some(HDR_FORMAT.into())],
                depth_stencil: None,
                cull_mode: None,
            },
        );
        let blur_blocks = [0, 1].map(|horizontal| {
            let mut block = blur_program.create_block(device);
            set_named_int(&mut block, "horizontal", horizontal);
            block.commit(queue);
            block
        });

        let composite_program = ShaderProgram::new(
            device,
            "composite",
            &shaders::composite_shader(),
            composite_layout(),
        );
        let composite_sources = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("composite-source-layout"),
            entries: &[texture_entry(0), texture_entry(1), sampler_entry(2)],
        });
        let schedule = blur_schedule(BLUR_ITERATIONS);
        let blurred = match blur_output(BLUR_ITERATIONS) {
            BlurSource::BrightPass => targets.bright.view(),
            BlurSource::PingPong(index) => ping_pong.get(index).view(),
        };
        let composite_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("composite-sources"),
            layout: &composite_sources,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(targets.scene.view()),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(blurred),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::Sampler(&sampler),
                },
            ],
        });
        let composite_pipeline = composite_program.create_pipeline(
            device,
            &PipelineOptions {
                label: "composite-pipeline",
                vertex_buffers: &[],
                extra_groups: &[&composite_sources],
                targets: &[Some(surface_format.into())],
                depth_stencil: None,
                cull_mode: None,
            },
        );
        let composite_block = composite_program.create_block(device);

        Self {
            blur_pipeline,
            blur_blocks,
            bright_group,
            ping_pong_groups,
            composite_pipeline,
            composite_block,
            composite_group,
            schedule,
        }
    }

    /// Blurs the bright pass and composites onto `output`.
    pub fn encode(
        &mut self,
        encoder: &mut wgpu::CommandEncoder,
        queue: &wgpu::Queue,
        ping_pong: &PingPong,
        settings: &PostProcessSettings,
        output: &wgpu::TextureView,
    ) {
        for pass in &self.schedule {
            let source = match pass.source {
                BlurSource::BrightPass => &self.bright_group,
                BlurSource::PingPong(index) => &self.ping_pong_groups[index % 2],
            };
            let block = &self.blur_blocks[usize::from(pass.horizontal)];
            fullscreen_pass(
                encoder,
                "blur-pass",
                ping_pong.get(pass.target).view(),
                &self.blur_pipeline,
                block.bind_group(),
                source,
            );
        }

        set_named_int(&mut self.composite_block, "bloom", i32::from(settings.bloom));
        set_named_float(&mut self.composite_block, "exposure", settings.exposure);
        set_named_float(&mut self.composite_block, "gamma", settings.gamma);
        self.composite_block.commit(queue);
        fullscreen_pass(
            encoder,
            "composite-pass",
            output,
            &self.composite_pipeline,
            self.composite_block.bind_group(),
            &self.composite_group,
        );
    }
}

fn fullscreen_pass(
    encoder: &mut wgpu::CommandEncoder,
    label: &str,
    target: &wgpu::TextureView,
    pipeline: &wgpu::RenderPipeline,
    uniforms: &wgpu::BindGroup,
    sources: &wgpu::BindGroup,
) {
    let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
        label: Some(label),
        color_attachments: &[Some(wgpu::RenderPassColorAttachment {
            view: target,
            depth_slice: None,
            resolve_target: None,
            ops: wgpu::Operations {
                load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                store: wgpu::StoreOp::Store,
            },
        })],
        depth_stencil_attachment: None,
        timestamp_writes: None,
        occlusion_query_set: None,
    });
    pass.set_pipeline(pipeline);
    pass.set_bind_group(0, uniforms, &[]);
    pass.set_bind_group(1, sources, &[]);
    pass.draw(0..3, 0..1);
}
