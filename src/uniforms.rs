//! Named uniform slots and the per-frame lighting upload.
//!
//! A shading program exposes its uniforms by name through [`UniformSink`].
//! Names are resolved to [`UniformLocation`]s once, when a program is
//! created, and every frame writes go straight to the cached locations.

use std::collections::HashMap;

use glam::{Mat4, Vec3};

use crate::lights::{DirectionalLight, PointLight};

/// Capacity of the point-light array declared by the lighting shader.
pub const MAX_POINT_LIGHTS: usize = 16;

/// Value type stored at a uniform location.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UniformKind {
    Int,
    Float,
    Vec3,
    Mat4,
}

impl UniformKind {
    pub const fn size(self) -> u32 {
        match self {
            UniformKind::Int | UniformKind::Float => 4,
            UniformKind::Vec3 => 12,
            UniformKind::Mat4 => 64,
        }
    }
}

/// Resolved address of a uniform: byte offset into the program's uniform block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UniformLocation {
    pub offset: u32,
    pub kind: UniformKind,
}

/// Write access to a shading program's uniforms.
///
/// Unknown names resolve to `None`; callers skip those writes without error.
pub trait UniformSink {
    fn location(&self, name: &str) -> Option<UniformLocation>;
    fn set_int(&mut self, location: UniformLocation, value: i32);
    fn set_float(&mut self, location: UniformLocation, value: f32);
    fn set_vec3(&mut self, location: UniformLocation, value: Vec3);
    fn set_mat4(&mut self, location: UniformLocation, value: &Mat4);
}

/// Name table of a uniform block, in WGSL layout.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UniformLayout {
    entries: HashMap<String, UniformLocation>,
    size: u32,
}

impl UniformLayout {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares `name` at `offset`, growing the block to a multiple of 16 bytes.
    pub fn with(mut self, name: impl Into<String>, kind: UniformKind, offset: u32) -> Self {
        let end = offset + kind.size();
        self.size = self.size.max(end.next_multiple_of(16));
        self.entries.insert(name.into(), UniformLocation { offset, kind });
        self
    }

    pub fn lookup(&self, name: &str) -> Option<UniformLocation> {
        self.entries.get(name).copied()
    }

    /// Byte size of the block, padded for uniform buffer binding.
    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }
}

const DIR_LIGHT_OFFSET: u32 = 224;
const POINT_LIGHTS_OFFSET: u32 = 288;
const POINT_LIGHT_STRIDE: u32 = 64;

/// Layout of the `Frame` block in the lit model shader.
pub fn lighting_layout() -> UniformLayout {
    let mut layout = transform_layout()
        .with("model", UniformKind::Mat4, 128)
        .with("view_position", UniformKind::Vec3, 192)
        .with("point_light_count", UniformKind::Int, 204)
        .with("material.shininess", UniformKind::Float, 208)
        .with("dir_light.direction", UniformKind::Vec3, DIR_LIGHT_OFFSET)
        .with("dir_light.ambient", UniformKind::Vec3, DIR_LIGHT_OFFSET + 16)
        .with("dir_light.diffuse", UniformKind::Vec3, DIR_LIGHT_OFFSET + 32)
        .with("dir_light.specular", UniformKind::Vec3, DIR_LIGHT_OFFSET + 48);
    for index in 0..MAX_POINT_LIGHTS {
        let base = POINT_LIGHTS_OFFSET + index as u32 * POINT_LIGHT_STRIDE;
        let field = |name: &str| format!("point_lights[{index}].{name}");
        layout = layout
            .with(field("position"), UniformKind::Vec3, base)
            .with(field("constant"), UniformKind::Float, base + 12)
            .with(field("ambient"), UniformKind::Vec3, base + 16)
            .with(field("linear"), UniformKind::Float, base + 28)
            .with(field("diffuse"), UniformKind::Vec3, base + 32)
            .with(field("quadratic"), UniformKind::Float, base + 44)
            .with(field("specular"), UniformKind::Vec3, base + 48);
    }
    layout
}

/// Layout shared by every program that only needs the camera matrices.
pub fn transform_layout() -> UniformLayout {
    UniformLayout::new()
        .with("projection", UniformKind::Mat4, 0)
        .with("view", UniformKind::Mat4, 64)
}

/// Cached locations for the camera matrices and, optionally, a model matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransformUniforms {
    projection: Option<UniformLocation>,
    view: Option<UniformLocation>,
    model: Option<UniformLocation>,
}

impl TransformUniforms {
    pub fn resolve(program: &impl UniformSink) -> Self {
        Self {
            projection: program.location("projection"),
            view: program.location("view"),
            model: program.location("model"),
        }
    }

    pub fn upload(&self, program: &mut impl UniformSink, projection: &Mat4, view: &Mat4) {
        if let Some(location) = self.projection {
            program.set_mat4(location, projection);
        }
        if let Some(location) = self.view {
            program.set_mat4(location, view);
        }
    }

    pub fn upload_model(&self, program: &mut impl UniformSink, model: &Mat4) {
        if let Some(location) = self.model {
            program.set_mat4(location, model);
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct DirLightSlot {
    direction: Option<UniformLocation>,
    ambient: Option<UniformLocation>,
    diffuse: Option<UniformLocation>,
    specular: Option<UniformLocation>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PointLightSlot {
    position: Option<UniformLocation>,
    ambient: Option<UniformLocation>,
    diffuse: Option<UniformLocation>,
    specular: Option<UniformLocation>,
    constant: Option<UniformLocation>,
    linear: Option<UniformLocation>,
    quadratic: Option<UniformLocation>,
}

/// Lighting uniforms of the main shading program, resolved once per program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LightingUniforms {
    view_position: Option<UniformLocation>,
    light_count: Option<UniformLocation>,
    dir_light: DirLightSlot,
    point_lights: Vec<PointLightSlot>,
}

impl LightingUniforms {
    pub fn resolve(program: &impl UniformSink) -> Self {
        let point_lights = (0..MAX_POINT_LIGHTS)
            .map(|index| {
                let at = |field: &str| program.location(&format!("point_lights[{index}].{field}"));
                PointLightSlot {
                    position: at("position"),
                    ambient: at("ambient"),
                    diffuse: at("diffuse"),
                    specular: at("specular"),
                    constant: at("constant"),
                    linear: at("linear"),
                    quadratic: at("quadratic"),
                }
            })
            .collect();
        Self {
            view_position: program.location("view_position"),
            light_count: program.location("point_light_count"),
            dir_light: DirLightSlot {
                direction: program.location("dir_light.direction"),
                ambient: program.location("dir_light.ambient"),
                diffuse: program.location("dir_light.diffuse"),
                specular: program.location("dir_light.specular"),
            },
            point_lights,
        }
    }

    /// Number of point lights the program can receive.
    pub fn capacity(&self) -> usize {
        self.point_lights.len()
    }

    /// Rewrites every lighting uniform for this frame and returns the number of
    /// point lights uploaded. Lights beyond the program's capacity are dropped.
    pub fn upload(
        &self,
        program: &mut impl UniformSink,
        dir_light: &DirectionalLight,
        point_lights: &[PointLight],
        view_position: Vec3,
    ) -> usize {
        let dir = &self.dir_light;
        set_vec3(program, dir.direction, dir_light.direction);
        set_vec3(program, dir.ambient, dir_light.ambient);
        set_vec3(program, dir.diffuse, dir_light.diffuse);
        set_vec3(program, dir.specular, dir_light.specular);

        let count = point_lights.len().min(self.capacity());
        for (slot, light) in self.point_lights.iter().zip(&point_lights[..count]) {
            set_vec3(program, slot.position, light.position);
            set_vec3(program, slot.ambient, light.ambient);
            set_vec3(program, slot.diffuse, light.diffuse);
            set_vec3(program, slot.specular, light.specular);
            set_float(program, slot.constant, light.constant);
            set_float(program, slot.linear, light.linear);
            set_float(program, slot.quadratic, light.quadratic);
        }

        set_vec3(program, self.view_position, view_position);
        if let Some(location) = self.light_count {
            program.set_int(location, count as i32);
        }
        count
    }
}

fn set_vec3(program: &mut impl UniformSink, location: Option<UniformLocation>, value: Vec3) {
    if let Some(location) = location {
        program.set_vec3(location, value);
    }
}

fn set_float(program: &mut impl UniformSink, location: Option<UniformLocation>, value: f32) {
    if let Some(location) = location {
        program.set_float(location, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq)]
    enum Written {
        Int(i32),
        Float(f32),
        Vec3(Vec3),
        Mat4(Mat4),
    }

    struct RecordingSink {
        layout: UniformLayout,
        writes: Vec<(UniformLocation, Written)>,
    }

    impl RecordingSink {
        fn new(layout: UniformLayout) -> Self {
            Self {
                layout,
                writes: Vec::new(),
            }
        }
    }

    impl UniformSink for RecordingSink {
        fn location(&self, name: &str) -> Option<UniformLocation> {
            self.layout.lookup(name)
        }
        fn set_int(&mut self, location: UniformLocation, value: i32) {
            self.writes.push((location, Written::Int(value)));
        }
        fn set_float(&mut self, location: UniformLocation, value: f32) {
            self.writes.push((location, Written::Float(value)));
        }
        fn set_vec3(&mut self, location: UniformLocation, value: Vec3) {
            self.writes.push((location, Written::Vec3(value)));
        }
        fn set_mat4(&mut self, location: UniformLocation, value: &Mat4) {
            self.writes.push((location, Written::Mat4(*value)));
        }
    }

    fn lights(count: usize, shift: f32) -> Vec<PointLight> {
        (0..count)
            .map(|i| PointLight {
                position: Vec3::new(i as f32, shift, 0.0),
                ambient: Vec3::splat(0.1),
                diffuse: Vec3::splat(0.5),
                specular: Vec3::ONE,
                constant: 1.0,
                linear: 0.09,
                quadratic: 0.032,
            })
            .collect()
    }

    #[test]
    fn layout_fits_the_shader_block() {
        let layout = lighting_layout();
        assert_eq!(layout.size(), 288 + 64 * MAX_POINT_LIGHTS as u32);
        assert_eq!(layout.len(), 6 + 4 + 7 * MAX_POINT_LIGHTS);
        let last = layout
            .lookup(&format!("point_lights[{}].specular", MAX_POINT_LIGHTS - 1))
            .unwrap();
        assert_eq!(last.offset + last.kind.size(), layout.size() - 4);
    }

    #[test]
    fn layout_entries_do_not_overlap() {
        let layout = lighting_layout();
        let mut spans: Vec<(u32, u32)> = layout
            .names()
            .map(|name| {
                let location = layout.lookup(name).unwrap();
                (location.offset, location.offset + location.kind.size())
            })
            .collect();
        spans.sort();
        for pair in spans.windows(2) {
            assert!(pair[0].1 <= pair[1].0, "overlap between {pair:?}");
        }
    }

    #[test]
    fn every_light_field_is_written_every_frame() {
        let mut sink = RecordingSink::new(lighting_layout());
        let uniforms = LightingUniforms::resolve(&sink);
        let dir = DirectionalLight::default();

        let first = lights(10, 0.0);
        let count = uniforms.upload(&mut sink, &dir, &first, Vec3::ZERO);
        assert_eq!(count, 10);
        let first_frame = std::mem::take(&mut sink.writes);

        let second = lights(10, 1.5);
        uniforms.upload(&mut sink, &dir, &second, Vec3::ZERO);
        let second_frame = std::mem::take(&mut sink.writes);

        assert_eq!(first_frame.len(), 4 + 7 * 10 + 2);
        let first_locations: Vec<_> = first_frame.iter().map(|(l, _)| *l).collect();
        let second_locations: Vec<_> = second_frame.iter().map(|(l, _)| *l).collect();
        assert_eq!(first_locations, second_locations);

        let position = sink.layout.lookup("point_lights[4].position").unwrap();
        let value_at = |frame: &[(UniformLocation, Written)]| {
            frame.iter().find(|(l, _)| *l == position).map(|(_, v)| *v)
        };
        assert_eq!(value_at(&first_frame), Some(Written::Vec3(Vec3::new(4.0, 0.0, 0.0))));
        assert_eq!(value_at(&second_frame), Some(Written::Vec3(Vec3::new(4.0, 1.5, 0.0))));

        let count_location = sink.layout.lookup("point_light_count").unwrap();
        assert!(second_frame.contains(&(count_location, Written::Int(10))));
    }

    #[test]
    fn lights_past_capacity_are_dropped() {
        let mut sink = RecordingSink::new(lighting_layout());
        let uniforms = LightingUniforms::resolve(&sink);
        let count = uniforms.upload(
            &mut sink,
            &DirectionalLight::default(),
            &lights(MAX_POINT_LIGHTS + 5, 0.0),
            Vec3::ZERO,
        );
        assert_eq!(count, MAX_POINT_LIGHTS);
    }

    #[test]
    fn unknown_uniforms_are_skipped() {
        let layout = UniformLayout::new().with("view_position", UniformKind::Vec3, 0);
        let mut sink = RecordingSink::new(layout);
        let uniforms = LightingUniforms::resolve(&sink);
        let count = uniforms.upload(
            &mut sink,
            &DirectionalLight::default(),
            &lights(3, 0.0),
            Vec3::new(1.0, 2.0, 3.0),
        );
        assert_eq!(count, 3);
        assert_eq!(sink.writes.len(), 1);
        assert_eq!(sink.writes[0].1, Written::Vec3(Vec3::new(1.0, 2.0, 3.0)));
    }

    #[test]
    fn transform_uniforms_skip_missing_model() {
        let mut sink = RecordingSink::new(transform_layout());
        let transforms = TransformUniforms::resolve(&sink);
        transforms.upload(&mut sink, &Mat4::IDENTITY, &Mat4::IDENTITY);
        transforms.upload_model(&mut sink, &Mat4::IDENTITY);
        assert_eq!(sink.writes.len(), 2);
    }
}
