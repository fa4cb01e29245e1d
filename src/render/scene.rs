//! Geometry drawn into the HDR targets before the skyboxes: the lit forest
//! model and one self-lit cube per firefly.

use std::collections::HashMap;
use std::ops::Range;
use std::path::{Path, PathBuf};

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3};
use wgpu::util::DeviceExt;

use crate::config::ResourcePaths;
use crate::lights::PointLight;
use crate::material::MaterialLibrary;
use crate::mesh::{marker_cube, MeshData, MeshGroup, MeshVertex};
use crate::state::ProgramState;
use crate::uniforms::{
    lighting_layout, transform_layout, LightingUniforms, TransformUniforms, UniformLocation,
    UniformSink,
};

use super::program::{PipelineOptions, ShaderProgram, UniformBlock};
use super::shaders::{LIGHTING_SHADER, MARKER_SHADER};
use super::targets::{DEPTH_FORMAT, HDR_FORMAT};
use super::texture::{image_or_solid, Texture2d};

pub const MATERIAL_SHININESS: f32 = 128.0;
/// Diffuse colour of forest parts whose material names no usable texture.
pub const FALLBACK_FOREST_COLOR: Vec3 = Vec3::new(0.45, 0.55, 0.35);
/// Specular mask used when a material has no specular map.
pub const FALLBACK_SPECULAR: Vec3 = Vec3::ONE;

pub fn forest_model_matrix(position: Vec3, scale: f32) -> Mat4 {
    Mat4::from_translation(position) * Mat4::from_scale(Vec3::splat(scale))
}

fn opaque_depth() -> Option<wgpu::DepthStencilState> {
    Some(wgpu::DepthStencilState {
        format: DEPTH_FORMAT,
        depth_write_enabled: true,
        depth_compare: wgpu::CompareFunction::Less,
        stencil: Default::default(),
        bias: Default::default(),
    })
}

fn hdr_targets() -> [Option<wgpu::ColorTargetState>; 2] {
    [Some(HDR_FORMAT.into()), Some(HDR_FORMAT.into())]
}

struct MeshBuffers {
    vertex: wgpu::Buffer,
    index: wgpu::Buffer,
}

impl MeshBuffers {
    fn from_mesh(device: &wgpu::Device, mesh: &MeshData, label: &str) -> Self {
        let vertex = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{label}-vertices")),
            contents: bytemuck::cast_slice(&mesh.vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{label}-indices")),
            contents: bytemuck::cast_slice(&mesh.indices),
            usage: wgpu::BufferUsages::INDEX,
        });
        Self { vertex, index }
    }
}

/// Texture files and fallback colours for one material of the model.
#[derive(Debug, Clone, PartialEq)]
pub struct MaterialMaps {
    pub diffuse: Option<PathBuf>,
    pub diffuse_fallback: Vec3,
    pub specular: Option<PathBuf>,
}

impl MaterialMaps {
    /// A material missing from the library, or a group before any `usemtl`,
    /// gets no maps and the flat forest colour.
    pub fn for_group(group: &MeshGroup, library: &MaterialLibrary) -> Self {
        let material = group.material.as_deref().and_then(|name| library.get(name));
        Self {
            diffuse: material.and_then(|m| m.diffuse_map.clone()),
            diffuse_fallback: material
                .and_then(|m| m.diffuse_color)
                .unwrap_or(FALLBACK_FOREST_COLOR),
            specular: material.and_then(|m| m.specular_map.clone()),
        }
    }
}

/// Reads the model's material library; a missing or broken one leaves every
/// group on its fallback colour.
pub fn load_material_library(mesh: &MeshData, model_path: &Path) -> MaterialLibrary {
    let Some(path) = mesh.material_library_path(model_path) else {
        return MaterialLibrary::default();
    };
    match MaterialLibrary::load(&path) {
        Ok(library) => {
            log::info!("loaded {} ({} materials)", path.display(), library.len());
            library
        }
        Err(err) => {
            log::warn!("{err}; forest materials use flat colours");
            MaterialLibrary::default()
        }
    }
}

struct MaterialBinding {
    _diffuse: Texture2d,
    _specular: Texture2d,
    textures: wgpu::BindGroup,
}

struct ForestModel {
    buffers: MeshBuffers,
    materials: Vec<MaterialBinding>,
    /// Index range and material slot of every group, in file order.
    draws: Vec<(Range<u32>, usize)>,
}

/// The forest model, lit by the directional light and the firefly swarm.
pub struct ForestStage {
    block: UniformBlock,
    transforms: TransformUniforms,
    lighting: LightingUniforms,
    material_shininess: Option<UniformLocation>,
    pipeline: wgpu::RenderPipeline,
    model: Option<ForestModel>,
}

impl ForestStage {
    pub fn new(device: &wgpu::Device, queue: &wgpu::Queue, paths: &ResourcePaths) -> Self {
        let program = ShaderProgram::new(device, "forest", LIGHTING_SHADER, lighting_layout());
        let block = program.create_block(device);
        let texture_layout = material_layout(device);
        let vertex_layout = wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<MeshVertex>() as u64,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &wgpu::vertex_attr_array![
                0 => Float32x3,
                1 => Float32x3,
                2 => Float32x2
            ],
        };
        // Winding in the model is inconsistent, so nothing is culled.
        let pipeline = program.create_pipeline(
            device,
            &PipelineOptions {
                label: "forest-pipeline",
                vertex_buffers: &[vertex_layout],
                extra_groups: &[&texture_layout],
                targets: &hdr_targets(),
                depth_stencil: opaque_depth(),
                cull_mode: None,
            },
        );

        let model_path = paths.forest_model();
        let model = match MeshData::load_obj(&model_path) {
            Ok(mesh) => {
                log::info!(
                    "loaded {} ({} triangles, {} material groups)",
                    model_path.display(),
                    mesh.triangle_count(),
                    mesh.groups.len()
                );
                let library = load_material_library(&mesh, &model_path);
                Some(ForestModel::upload(device, queue, &texture_layout, &mesh, &library))
            }
            Err(err) => {
                log::warn!("{err}; the forest will not be drawn");
                None
            }
        };

        Self {
            transforms: TransformUniforms::resolve(&block),
            lighting: LightingUniforms::resolve(&block),
            material_shininess: block.location("material.shininess"),
            block,
            pipeline,
            model,
        }
    }

    /// Rewrites the whole lighting block for this frame. Returns the number of
    /// point lights the shader will see.
    pub fn prepare(
        &mut self,
        queue: &wgpu::Queue,
        state: &ProgramState,
        projection: &Mat4,
        view: &Mat4,
    ) -> usize {
        let block = &mut self.block;
        self.transforms.upload(block, projection, view);
        let model = forest_model_matrix(state.forest_position, state.forest_scale);
        self.transforms.upload_model(block, &model);
        if let Some(location) = self.material_shininess {
            block.set_float(location, MATERIAL_SHININESS);
        }
        let uploaded = self.lighting.upload(
            block,
            &state.dir_light,
            &state.point_lights,
            state.camera.position,
        );
        block.commit(queue);
        uploaded
    }

    pub fn draw(&self, pass: &mut wgpu::RenderPass<'_>) {
        let Some(model) = &self.model else {
            return;
        };
        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, self.block.bind_group(), &[]);
        pass.set_vertex_buffer(0, model.buffers.vertex.slice(..));
        pass.set_index_buffer(model.buffers.index.slice(..), wgpu::IndexFormat::Uint32);
        for (indices, slot) in &model.draws {
            pass.set_bind_group(1, &model.materials[*slot].textures, &[]);
            pass.draw_indexed(indices.clone(), 0, 0..1);
        }
    }
}

fn material_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    let texture = |binding| wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Texture {
            sample_type: wgpu::TextureSampleType::Float { filterable: true },
            view_dimension: wgpu::TextureViewDimension::D2,
            multisampled: false,
        },
        count: None,
    };
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("forest-material-layout"),
        entries: &[
            texture(0),
            texture(1),
            wgpu::BindGroupLayoutEntry {
                binding: 2,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                count: None,
            },
        ],
    })
}

/// Groups sharing a material name share one slot. Returns the slot of every
/// group and, per slot, the group that first named it.
pub fn material_slots(groups: &[MeshGroup]) -> (Vec<usize>, Vec<usize>) {
    let mut by_name: HashMap<Option<&str>, usize> = HashMap::new();
    let mut first_group = Vec::new();
    let slots = groups
        .iter()
        .enumerate()
        .map(|(index, group)| {
            *by_name.entry(group.material.as_deref()).or_insert_with(|| {
                first_group.push(index);
                first_group.len() - 1
            })
        })
        .collect();
    (slots, first_group)
}

impl ForestModel {
    fn upload(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        layout: &wgpu::BindGroupLayout,
        mesh: &MeshData,
        library: &MaterialLibrary,
    ) -> Self {
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("forest-sampler"),
            address_mode_u: wgpu::AddressMode::Repeat,
            address_mode_v: wgpu::AddressMode::Repeat,
            address_mode_w: wgpu::AddressMode::Repeat,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });
        let (slots, first_group) = material_slots(&mesh.groups);
        let materials = first_group
            .iter()
            .map(|&index| {
                let group = &mesh.groups[index];
                let label = group.material.as_deref().unwrap_or("forest-default");
                let maps = MaterialMaps::for_group(group, library);
                let diffuse = image_or_solid(maps.diffuse.as_deref(), maps.diffuse_fallback, label);
                let specular = image_or_solid(maps.specular.as_deref(), FALLBACK_SPECULAR, label);
                let diffuse = Texture2d::upload(device, queue, label, &diffuse);
                let specular = Texture2d::upload(device, queue, label, &specular);
                let textures = device.create_bind_group(&wgpu::BindGroupDescriptor {
                    label: Some(label),
                    layout,
                    entries: &[
                        wgpu::BindGroupEntry {
                            binding: 0,
                            resource: wgpu::BindingResource::TextureView(diffuse.view()),
                        },
                        wgpu::BindGroupEntry {
                            binding: 1,
                            resource: wgpu::BindingResource::TextureView(specular.view()),
                        },
                        wgpu::BindGroupEntry {
                            binding: 2,
                            resource: wgpu::BindingResource::Sampler(&sampler),
                        },
                    ],
                });
                MaterialBinding {
                    _diffuse: diffuse,
                    _specular: specular,
                    textures,
                }
            })
            .collect();
        let draws = mesh
            .groups
            .iter()
            .zip(slots)
            .map(|(group, slot)| (group.indices.clone(), slot))
            .collect();
        Self {
            buffers: MeshBuffers::from_mesh(device, mesh, "forest"),
            materials,
            draws,
        }
    }
}

/// Per-instance data of one light marker.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct MarkerInstance {
    pub position: [f32; 3],
    pub color: [f32; 3],
}

pub fn marker_instances(lights: &[PointLight]) -> Vec<MarkerInstance> {
    lights
        .iter()
        .map(|light| MarkerInstance {
            position: light.position.to_array(),
            color: light.marker_color().to_array(),
        })
        .collect()
}

/// Small cubes drawn at the current position of every point light.
pub struct MarkerStage {
    block: UniformBlock,
    transforms: TransformUniforms,
    pipeline: wgpu::RenderPipeline,
    vertices: wgpu::Buffer,
    indices: wgpu::Buffer,
    index_count: u32,
    instances: wgpu::Buffer,
    capacity: usize,
    instance_count: u32,
}

impl MarkerStage {
    pub fn new(device: &wgpu::Device, capacity: usize) -> Self {
        let program = ShaderProgram::new(device, "markers", MARKER_SHADER, transform_layout());
        let block = program.create_block(device);
        let layouts = [
            wgpu::VertexBufferLayout {
                array_stride: (3 * std::mem::size_of::<f32>()) as u64,
                step_mode: wgpu::VertexStepMode::Vertex,
                attributes: &wgpu::vertex_attr_array![0 => Float32x3],
            },
            wgpu::VertexBufferLayout {
                array_stride: std::mem::size_of::<MarkerInstance>() as u64,
                step_mode: wgpu::VertexStepMode::Instance,
                attributes: &wgpu::vertex_attr_array![1 => Float32x3, 2 => Float32x3],
            },
        ];
        let pipeline = program.create_pipeline(
            device,
            &PipelineOptions {
                label: "marker-pipeline",
                vertex_buffers: &layouts,
                extra_groups: &[],
                targets: &hdr_targets(),
                depth_stencil: opaque_depth(),
                cull_mode: Some(wgpu::Face::Back),
            },
        );

        let (positions, indices) = marker_cube();
        let vertices = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("marker-vertices"),
            contents: bytemuck::cast_slice(&positions),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index_count = indices.len() as u32;
        let indices = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("marker-indices"),
            contents: bytemuck::cast_slice(&indices),
            usage: wgpu::BufferUsages::INDEX,
        });
        let capacity = capacity.max(1);

        Self {
            transforms: TransformUniforms::resolve(&block),
            block,
            pipeline,
            vertices,
            indices,
            index_count,
            instances: Self::instance_buffer(device, capacity),
            capacity,
            instance_count: 0,
        }
    }

    fn instance_buffer(device: &wgpu::Device, capacity: usize) -> wgpu::Buffer {
        device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("marker-instances"),
            size: (capacity * std::mem::size_of::<MarkerInstance>()) as u64,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        })
    }

    pub fn prepare(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        lights: &[PointLight],
        projection: &Mat4,
        view: &Mat4,
    ) {
        self.transforms.upload(&mut self.block, projection, view);
        self.block.commit(queue);

        let instances = marker_instances(lights);
        if instances.len() > self.capacity {
            self.capacity = instances.len().next_power_of_two();
            self.instances = Self::instance_buffer(device, self.capacity);
        }
        if !instances.is_empty() {
            queue.write_buffer(&self.instances, 0, bytemuck::cast_slice(&instances));
        }
        self.instance_count = instances.len() as u32;
    }

    pub fn draw(&self, pass: &mut wgpu::RenderPass<'_>) {
        if self.instance_count == 0 {
            return;
        }
        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, self.block.bind_group(), &[]);
        pass.set_vertex_buffer(0, self.vertices.slice(..));
        pass.set_vertex_buffer(1, self.instances.slice(..));
        pass.set_index_buffer(self.indices.slice(..), wgpu::IndexFormat::Uint16);
        pass.draw_indexed(0..self.index_count, 0, 0..self.instance_count);
    }
}
