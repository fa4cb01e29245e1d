use std::num::NonZeroU64;
use std::sync::Arc;

use glam::{Mat4, Vec3};

use crate::uniforms::{UniformKind, UniformLayout, UniformLocation, UniformSink};

/// Compiled WGSL module together with the layout of its group 0 uniform block.
pub struct ShaderProgram {
    label: &'static str,
    module: wgpu::ShaderModule,
    uniform_group: wgpu::BindGroupLayout,
    uniforms: Arc<UniformLayout>,
}

/// Everything that varies between the pipelines built from one program.
pub struct PipelineOptions<'a> {
    pub label: &'a str,
    pub vertex_buffers: &'a [wgpu::VertexBufferLayout<'a>],
    /// Bind group layouts following the program's own uniform group.
    pub extra_groups: &'a [&'a wgpu::BindGroupLayout],
    pub targets: &'a [Option<wgpu::ColorTargetState>],
    pub depth_stencil: Option<wgpu::DepthStencilState>,
    pub cull_mode: Option<wgpu::Face>,
}

impl ShaderProgram {
    pub fn new(
        device: &wgpu::Device,
        label: &'static str,
        source: &str,
        uniforms: UniformLayout,
    ) -> Self {
        let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(label),
            source: wgpu::ShaderSource::Wgsl(source.into()),
        });
        let uniform_group = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some(&format!("{label}-uniform-layout")),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: NonZeroU64::new(u64::from(uniforms.size())),
                },
                count: None,
            }],
        });
        Self {
            label,
            module,
            uniform_group,
            uniforms: Arc::new(uniforms),
        }
    }

    pub fn uniforms(&self) -> &UniformLayout {
        &self.uniforms
    }

    /// Allocates a uniform buffer laid out for this program.
    pub fn create_block(&self, device: &wgpu::Device) -> UniformBlock {
        let data = UniformData::new(Arc::clone(&self.uniforms));
        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(&format!("{}-uniforms", self.label)),
            size: data.bytes().len() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(&format!("{}-uniform-group", self.label)),
            layout: &self.uniform_group,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            }],
        });
        UniformBlock {
            data,
            buffer,
            bind_group,
        }
    }

    pub fn create_pipeline(
        &self,
        device: &wgpu::Device,
        options: &PipelineOptions<'_>,
    ) -> wgpu::RenderPipeline {
        let mut groups = vec![&self.uniform_group];
        groups.extend_from_slice(options.extra_groups);
        let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some(options.label),
            bind_group_layouts: &groups,
            push_constant_ranges: &[],
        });
        device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some(options.label),
            layout: Some(&layout),
            vertex: wgpu::VertexState {
                module: &self.module,
                entry_point: Some("vs_main"),
                compilation_options: Default::default(),
                buffers: options.vertex_buffers,
            },
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: options.cull_mode,
                polygon_mode: wgpu::PolygonMode::Fill,
                ..Default::default()
            },
            depth_stencil: options.depth_stencil.clone(),
            multisample: wgpu::MultisampleState::default(),
            fragment: Some(wgpu::FragmentState {
                module: &self.module,
                entry_point: Some("fs_main"),
                compilation_options: Default::default(),
                targets: options.targets,
            }),
            multiview: None,
            cache: None,
        })
    }
}

/// CPU copy of a uniform block. Writes land at the offsets of the layout and
/// mark the block dirty until the next upload.
#[derive(Debug, Clone)]
pub struct UniformData {
    layout: Arc<UniformLayout>,
    bytes: Vec<u8>,
    dirty: bool,
}

impl UniformData {
    pub fn new(layout: Arc<UniformLayout>) -> Self {
        let size = layout.size().max(16) as usize;
        Self {
            layout,
            bytes: vec![0; size],
            dirty: true,
        }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Returns the bytes if anything changed since the last call.
    pub fn take_dirty(&mut self) -> Option<&[u8]> {
        if !std::mem::take(&mut self.dirty) {
            return None;
        }
        Some(&self.bytes)
    }

    fn write(&mut self, location: UniformLocation, expected: UniformKind, value: &[u8]) {
        if location.kind != expected {
            log::warn!(
                "uniform at offset {} is {:?}, ignoring {expected:?} write",
                location.offset,
                location.kind
            );
            return;
        }
        let start = location.offset as usize;
        if let Some(slot) = self.bytes.get_mut(start..start + value.len()) {
            slot.copy_from_slice(value);
            self.dirty = true;
        }
    }
}

impl UniformSink for UniformData {
    fn location(&self, name: &str) -> Option<UniformLocation> {
        self.layout.lookup(name)
    }

    fn set_int(&mut self, location: UniformLocation, value: i32) {
        self.write(location, UniformKind::Int, bytemuck::bytes_of(&value));
    }

    fn set_float(&mut self, location: UniformLocation, value: f32) {
        self.write(location, UniformKind::Float, bytemuck::bytes_of(&value));
    }

    fn set_vec3(&mut self, location: UniformLocation, value: Vec3) {
        self.write(location, UniformKind::Vec3, bytemuck::cast_slice(&value.to_array()));
    }

    fn set_mat4(&mut self, location: UniformLocation, value: &Mat4) {
        self.write(location, UniformKind::Mat4, bytemuck::cast_slice(&value.to_cols_array()));
    }
}

/// Uniform block backed by a GPU buffer and its bind group.
pub struct UniformBlock {
    data: UniformData,
    buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
}

impl UniformBlock {
    pub fn bind_group(&self) -> &wgpu::BindGroup {
        &self.bind_group
    }

    /// Queues the CPU copy for upload when it changed.
    pub fn commit(&mut self, queue: &wgpu::Queue) {
        if let Some(bytes) = self.data.take_dirty() {
            queue.write_buffer(&self.buffer, 0, bytes);
        }
    }
}

impl UniformSink for UniformBlock {
    fn location(&self, name: &str) -> Option<UniformLocation> {
        self.data.location(name)
    }

    fn set_int(&mut self, location: UniformLocation, value: i32) {
        self.data.set_int(location, value);
    }

    fn set_float(&mut self, location: UniformLocation, value: f32) {
        self.data.set_float(location, value);
    }

    fn set_vec3(&mut self, location: UniformLocation, value: Vec3) {
        self.data.set_vec3(location, value);
    }

    fn set_mat4(&mut self, location: UniformLocation, value: &Mat4) {
        self.data.set_mat4(location, value);
    }
}

/// Sets `name` if the program declares it.
pub fn set_named_int(sink: &mut impl UniformSink, name: &str, value: i32) {
    if let Some(location) = sink.location(name) {
        sink.set_int(location, value);
    }
}

pub fn set_named_float(sink: &mut impl UniformSink, name: &str, value: f32) {
    if let Some(location) = sink.location(name) {
        sink.set_float(location, value);
    }
}

pub fn set_named_vec3(sink: &mut impl UniformSink, name: &str, value: Vec3) {
    if let Some(location) = sink.location(name) {
        sink.set_vec3(location, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::uniforms::lighting_layout;

    fn f32_at(bytes: &[u8], offset: usize) -> f32 {
        bytemuck::pod_read_unaligned(&bytes[offset..offset + 4])
    }

    #[test]
    fn writes_land_at_layout_offsets() {
        let mut data = UniformData::new(Arc::new(lighting_layout()));
        let _ = data.take_dirty();

        set_named_vec3(&mut data, "point_lights[2].diffuse", Vec3::new(1.0, 2.0, 3.0));
        set_named_float(&mut data, "point_lights[2].quadratic", 0.5);
        set_named_int(&mut data, "point_light_count", 7);

        let bytes = data.take_dirty().unwrap().to_vec();
        let base = 288 + 2 * 64;
        assert_eq!(f32_at(&bytes, base + 32), 1.0);
        assert_eq!(f32_at(&bytes, base + 40), 3.0);
        assert_eq!(f32_at(&bytes, base + 44), 0.5);
        let count: i32 = bytemuck::pod_read_unaligned(&bytes[204..208]);
        assert_eq!(count, 7);
        assert!(data.take_dirty().is_none());
    }

    #[test]
    fn matrices_are_column_major() {
        let mut data = UniformData::new(Arc::new(lighting_layout()));
        let translation = Mat4::from_translation(Vec3::new(4.0, 5.0, 6.0));
        let location = data.location("model").unwrap();
        data.set_mat4(location, &translation);
        assert_eq!(f32_at(data.bytes(), 128 + 48), 4.0);
        assert_eq!(f32_at(data.bytes(), 128 + 56), 6.0);
    }

    #[test]
    fn mismatched_kind_is_ignored() {
        let mut data = UniformData::new(Arc::new(lighting_layout()));
        let _ = data.take_dirty();
        let location = data.location("material.shininess").unwrap();
        data.set_vec3(location, Vec3::ONE);
        assert!(!data.is_dirty());
    }

    #[test]
    fn unknown_names_do_nothing() {
        let mut data = UniformData::new(Arc::new(lighting_layout()));
        let _ = data.take_dirty();
        set_named_float(&mut data, "fog_density", 1.0);
        assert!(!data.is_dirty());
    }
}
