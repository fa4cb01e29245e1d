use std::ops::Range;
use std::path::{Path, PathBuf};

use glam::{Mat3, Mat4};
use image::imageops::FilterType;
use image::RgbaImage;
use wgpu::util::DeviceExt;

use crate::config::{load_skybox_vertices, ResourcePaths, SKYBOX_VERTEX_FLOATS};
use crate::uniforms::{transform_layout, TransformUniforms};

use super::program::{PipelineOptions, ShaderProgram, UniformBlock};
use super::shaders::SKYBOX_SHADER;
use super::targets::{DEPTH_FORMAT, HDR_FORMAT};
use super::texture::load_image;

/// Vertices of the secondary skybox that are drawn: a single face.
pub const CAT_FACE_VERTICES: Range<u32> = 30..36;
const SKYBOX_VERTEX_COUNT: u32 = (SKYBOX_VERTEX_FLOATS / 3) as u32;

/// Drops the translation of a view matrix so the skybox stays at infinity.
pub fn rotation_only(view: &Mat4) -> Mat4 {
    Mat4::from_mat3(Mat3::from_mat4(*view))
}

/// Six RGBA8 faces of equal square size, in +X, -X, +Y, -Y, +Z, -Z order.
#[derive(Debug, Clone, PartialEq)]
pub struct CubemapImage {
    size: u32,
    faces: [Vec<u8>; 6],
    loaded: usize,
}

impl CubemapImage {
    /// Loads every face, leaving unreadable ones transparent black.
    pub fn load(paths: &[PathBuf; 6]) -> Self {
        let faces = paths.each_ref().map(|path| match load_image(path) {
            Ok(face) => Some(face),
            Err(err) => {
                log::warn!("{err}; cubemap face left black");
                None
            }
        });
        Self::from_faces(faces)
    }

    /// Faces are scaled to the size of the first available one.
    pub fn from_faces(faces: [Option<RgbaImage>; 6]) -> Self {
        let size = faces
            .iter()
            .flatten()
            .next()
            .map_or(1, |face| face.width().max(face.height()).max(1));
        let loaded = faces.iter().flatten().count();
        let faces = faces.map(|face| match face {
            Some(face) if face.dimensions() == (size, size) => face.into_raw(),
            Some(face) => {
                image::imageops::resize(&face, size, size, FilterType::Triangle).into_raw()
            }
            None => vec![0; (size * size * 4) as usize],
        });
        Self {
            size,
            faces,
            loaded,
        }
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn face(&self, index: usize) -> &[u8] {
        &self.faces[index]
    }

    pub fn loaded_faces(&self) -> usize {
        self.loaded
    }
}

/// Cube texture on the GPU.
pub struct Cubemap {
    _texture: wgpu::Texture,
    view: wgpu::TextureView,
}

impl Cubemap {
    pub fn upload(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        label: &str,
        image: &CubemapImage,
    ) -> Self {
        let size = image.size();
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width: size,
                height: size,
                depth_or_array_layers: 6,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8Unorm,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        for layer in 0..6u32 {
            queue.write_texture(
                wgpu::TexelCopyTextureInfo {
                    texture: &texture,
                    mip_level: 0,
                    origin: wgpu::Origin3d { x: 0, y: 0, z: layer },
                    aspect: wgpu::TextureAspect::All,
                },
                image.face(layer as usize),
                wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(4 * size),
                    rows_per_image: Some(size),
                },
                wgpu::Extent3d {
                    width: size,
                    height: size,
                    depth_or_array_layers: 1,
                },
            );
        }
        let view = texture.create_view(&wgpu::TextureViewDescriptor {
            label: Some(label),
            dimension: Some(wgpu::TextureViewDimension::Cube),
            ..Default::default()
        });
        Self {
            _texture: texture,
            view,
        }
    }
}

struct SkyboxLayer {
    _cubemap: Cubemap,
    vertices: wgpu::Buffer,
    textures: wgpu::BindGroup,
    range: Range<u32>,
}

/// Environment cubemap followed by the alpha-blended cat trumpet face.
pub struct SkyboxStage {
    block: UniformBlock,
    transforms: TransformUniforms,
    opaque_pipeline: wgpu::RenderPipeline,
    blended_pipeline: wgpu::RenderPipeline,
    environment: SkyboxLayer,
    cat_trumpet: SkyboxLayer,
}

impl SkyboxStage {
    pub fn new(device: &wgpu::Device, queue: &wgpu::Queue, paths: &ResourcePaths) -> Self {
        let program = ShaderProgram::new(device, "skybox", SKYBOX_SHADER, transform_layout());
        let block = program.create_block(device);
        let transforms = TransformUniforms::resolve(&block);

        let texture_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("skybox-texture-layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::Cube,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("skybox-sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        let vertex_layout = wgpu::VertexBufferLayout {
            array_stride: (3 * std::mem::size_of::<f32>()) as u64,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &wgpu::vertex_attr_array![0 => Float32x3],
        };
        let depth_stencil = Some(wgpu::DepthStencilState {
            format: DEPTH_FORMAT,
            depth_write_enabled: false,
            depth_compare: wgpu::CompareFunction::LessEqual,
            stencil: Default::default(),
            bias: Default::default(),
        });
        let opaque: [Option<wgpu::ColorTargetState>; 2] =
            [Some(HDR_FORMAT.into()), Some(HDR_FORMAT.into())];
        let alpha_blended = Some(wgpu::ColorTargetState {
            format: HDR_FORMAT,
            blend: Some(wgpu::BlendState::ALPHA_BLENDING),
            write_mask: wgpu::ColorWrites::ALL,
        });
        let blended = [alpha_blended.clone(), alpha_blended];
        let pipeline = |label: &str, targets: &[Option<wgpu::ColorTargetState>]| {
            program.create_pipeline(
                device,
                &PipelineOptions {
                    label,
                    vertex_buffers: std::slice::from_ref(&vertex_layout),
                    extra_groups: &[&texture_layout],
                    targets,
                    depth_stencil: depth_stencil.clone(),
                    cull_mode: None,
                },
            )
        };
        let opaque_pipeline = pipeline("skybox-pipeline", &opaque);
        let blended_pipeline = pipeline("cat-trumpet-pipeline", &blended);

        let layer = |label: &str, vertices: &Path, faces: &[PathBuf; 6], range: Range<u32>| {
            let positions = load_skybox_vertices(vertices).unwrap_or_else(|err| {
                log::warn!("{err}; {label} geometry left empty");
                [0.0; SKYBOX_VERTEX_FLOATS]
            });
            let image = CubemapImage::load(faces);
            log::info!(
                "{label} cubemap: {} of 6 faces at {}px",
                image.loaded_faces(),
                image.size()
            );
            let cubemap = Cubemap::upload(device, queue, label, &image);
            let textures = device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some(label),
                layout: &texture_layout,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: wgpu::BindingResource::TextureView(&cubemap.view),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: wgpu::BindingResource::Sampler(&sampler),
                    },
                ],
            });
            SkyboxLayer {
                vertices: device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some(label),
                    contents: bytemuck::cast_slice(&positions),
                    usage: wgpu::BufferUsages::VERTEX,
                }),
                _cubemap: cubemap,
                textures,
                range,
            }
        };
        let environment = layer(
            "skybox",
            &paths.skybox_vertices(),
            &paths.skybox_faces(),
            0..SKYBOX_VERTEX_COUNT,
        );
        let cat_trumpet = layer(
            "cat-trumpet",
            &paths.cat_trumpet_vertices(),
            &paths.cat_trumpet_faces(),
            CAT_FACE_VERTICES,
        );

        Self {
            block,
            transforms,
            opaque_pipeline,
            blended_pipeline,
            environment,
            cat_trumpet,
        }
    }

    pub fn prepare(&mut self, queue: &wgpu::Queue, projection: &Mat4, view: &Mat4) {
        self.transforms
            .upload(&mut self.block, projection, &rotation_only(view));
        self.block.commit(queue);
    }

    pub fn draw_environment(&self, pass: &mut wgpu::RenderPass<'_>) {
        self.draw(pass, &self.opaque_pipeline, &self.environment);
    }

    pub fn draw_cat_trumpet(&self, pass: &mut wgpu::RenderPass<'_>) {
        self.draw(pass, &self.blended_pipeline, &self.cat_trumpet);
    }

    fn draw(
        &self,
        pass: &mut wgpu::RenderPass<'_>,
        pipeline: &wgpu::RenderPipeline,
        layer: &SkyboxLayer,
    ) {
        pass.set_pipeline(pipeline);
        pass.set_bind_group(0, self.block.bind_group(), &[]);
        pass.set_bind_group(1, &layer.textures, &[]);
        pass.set_vertex_buffer(0, layer.vertices.slice(..));
        pass.draw(layer.range.clone(), 0..1);
    }
}
