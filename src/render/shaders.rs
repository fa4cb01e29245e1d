//! WGSL sources for every pass. Scene shaders write two targets: the HDR
//! colour and the bright part of it that feeds the blur.

/// Lit forest model. The `Frame` block mirrors `uniforms::lighting_layout`;
/// group 1 holds the diffuse and specular maps of the material being drawn.
pub const LIGHTING_SHADER: &str = r#"
struct Material {
    shininess: f32,
}

struct DirLight {
    direction: vec3<f32>,
    ambient: vec3<f32>,
    diffuse: vec3<f32>,
    specular: vec3<f32>,
}

struct PointLight {
    position: vec3<f32>,
    constant: f32,
    ambient: vec3<f32>,
    linear: f32,
    diffuse: vec3<f32>,
    quadratic: f32,
    specular: vec3<f32>,
}

struct Frame {
    projection: mat4x4<f32>,
    view: mat4x4<f32>,
    model: mat4x4<f32>,
    view_position: vec3<f32>,
    point_light_count: i32,
    material: Material,
    dir_light: DirLight,
    point_lights: array<PointLight, 16>,
}

@group(0) @binding(0)
var<uniform> frame: Frame;

@group(1) @binding(0)
var diffuse_map: texture_2d<f32>;
@group(1) @binding(1)
var specular_map: texture_2d<f32>;
@group(1) @binding(2)
var material_sampler: sampler;

struct VertexInput {
    @location(0) position: vec3<f32>,
    @location(1) normal: vec3<f32>,
    @location(2) tex_coords: vec2<f32>,
}

struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) world_position: vec3<f32>,
    @location(1) normal: vec3<f32>,
    @location(2) tex_coords: vec2<f32>,
}

struct Surface {
    normal: vec3<f32>,
    diffuse: vec3<f32>,
    specular: vec3<f32>,
}

struct SceneOutput {
    @location(0) color: vec4<f32>,
    @location(1) bright: vec4<f32>,
}

fn bright_part(color: vec3<f32>) -> vec4<f32> {
    let luminance = dot(color, vec3<f32>(0.2126, 0.7152, 0.0722));
    if luminance > 1.0 {
        return vec4<f32>(color, 1.0);
    }
    return vec4<f32>(0.0, 0.0, 0.0, 1.0);
}

@vertex
fn vs_main(input: VertexInput) -> VertexOutput {
    let world = frame.model * vec4<f32>(input.position, 1.0);
    let normal_matrix = mat3x3<f32>(
        frame.model[0].xyz,
        frame.model[1].xyz,
        frame.model[2].xyz,
    );
    var out: VertexOutput;
    out.clip_position = frame.projection * frame.view * world;
    out.world_position = world.xyz;
    out.normal = normal_matrix * input.normal;
    out.tex_coords = input.tex_coords;
    return out;
}

fn shade_directional(surface: Surface, view_dir: vec3<f32>) -> vec3<f32> {
    let light = frame.dir_light;
    let light_dir = normalize(-light.direction);
    let diff = max(dot(surface.normal, light_dir), 0.0);
    let halfway = normalize(light_dir + view_dir);
    let spec = pow(max(dot(surface.normal, halfway), 0.0), frame.material.shininess);
    let base = surface.diffuse;
    return light.ambient * base + light.diffuse * diff * base + light.specular * spec * surface.specular;
}

fn shade_point(index: i32, surface: Surface, position: vec3<f32>, view_dir: vec3<f32>) -> vec3<f32> {
    let light = frame.point_lights[index];
    let to_light = light.position - position;
    let dist = length(to_light);
    let light_dir = to_light / max(dist, 0.0001);
    let diff = max(dot(surface.normal, light_dir), 0.0);
    let halfway = normalize(light_dir + view_dir);
    let spec = pow(max(dot(surface.normal, halfway), 0.0), frame.material.shininess);
    let falloff = light.constant + light.linear * dist + light.quadratic * dist * dist;
    let attenuation = 1.0 / max(falloff, 0.0001);
    let base = surface.diffuse;
    let lit = light.ambient * base + light.diffuse * diff * base + light.specular * spec * surface.specular;
    return lit * attenuation;
}

@fragment
fn fs_main(input: VertexOutput) -> SceneOutput {
    // OBJ texture space has v pointing up.
    let uv = vec2<f32>(input.tex_coords.x, 1.0 - input.tex_coords.y);
    var surface: Surface;
    surface.normal = normalize(input.normal);
    surface.diffuse = textureSample(diffuse_map, material_sampler, uv).rgb;
    surface.specular = textureSample(specular_map, material_sampler, uv).rgb;
    let view_dir = normalize(frame.view_position - input.world_position);
    var color = shade_directional(surface, view_dir);
    let count = min(frame.point_light_count, 16);
    for (var i = 0; i < count; i = i + 1) {
        color += shade_point(i, surface, input.world_position, view_dir);
    }
    var out: SceneOutput;
    out.color = vec4<f32>(color, 1.0);
    out.bright = bright_part(color);
    return out;
}
"#;

/// Self-lit cubes drawn at each firefly.
pub const MARKER_SHADER: &str = r#"
struct Transforms {
    projection: mat4x4<f32>,
    view: mat4x4<f32>,
}

@group(0) @binding(0)
var<uniform> transforms: Transforms;

struct VertexInput {
    @location(0) position: vec3<f32>,
    @location(1) offset: vec3<f32>,
    @location(2) color: vec3<f32>,
}

struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) color: vec3<f32>,
}

struct SceneOutput {
    @location(0) color: vec4<f32>,
    @location(1) bright: vec4<f32>,
}

const MARKER_SCALE: f32 = 0.2;

@vertex
fn vs_main(input: VertexInput) -> VertexOutput {
    let world = vec4<f32>(input.position * MARKER_SCALE + input.offset, 1.0);
    var out: VertexOutput;
    out.clip_position = transforms.projection * transforms.view * world;
    out.color = input.color;
    return out;
}

@fragment
fn fs_main(input: VertexOutput) -> SceneOutput {
    let luminance = dot(input.color, vec3<f32>(0.2126, 0.7152, 0.0722));
    var out: SceneOutput;
    out.color = vec4<f32>(input.color, 1.0);
    out.bright = vec4<f32>(0.0, 0.0, 0.0, 1.0);
    if luminance > 1.0 {
        out.bright = vec4<f32>(input.color, 1.0);
    }
    return out;
}
"#;

/// Cubemap background. `view` carries rotation only, and depth is pinned to
/// the far plane.
pub const SKYBOX_SHADER: &str = r#"
struct Transforms {
    projection: mat4x4<f32>,
    view: mat4x4<f32>,
}

@group(0) @binding(0)
var<uniform> transforms: Transforms;

@group(1) @binding(0)
var sky_texture: texture_cube<f32>;
@group(1) @binding(1)
var sky_sampler: sampler;

struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) direction: vec3<f32>,
}

struct SceneOutput {
    @location(0) color: vec4<f32>,
    @location(1) bright: vec4<f32>,
}

@vertex
fn vs_main(@location(0) position: vec3<f32>) -> VertexOutput {
    let clip = transforms.projection * transforms.view * vec4<f32>(position, 1.0);
    var out: VertexOutput;
    out.clip_position = clip.xyww;
    out.direction = position;
    return out;
}

@fragment
fn fs_main(input: VertexOutput) -> SceneOutput {
    let sky = textureSample(sky_texture, sky_sampler, input.direction);
    let luminance = dot(sky.rgb, vec3<f32>(0.2126, 0.7152, 0.0722));
    var out: SceneOutput;
    out.color = sky;
    out.bright = vec4<f32>(0.0, 0.0, 0.0, sky.a);
    if luminance > 1.0 {
        out.bright = sky;
    }
    return out;
}
"#;

const FULLSCREEN_VERTEX: &str = r#"
struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) uv: vec2<f32>,
}

@vertex
fn vs_main(@builtin(vertex_index) index: u32) -> VertexOutput {
    let uv = vec2<f32>(f32((index << 1u) & 2u), f32(index & 2u));
    var out: VertexOutput;
    out.clip_position = vec4<f32>(uv * 2.0 - 1.0, 0.0, 1.0);
    out.uv = vec2<f32>(uv.x, 1.0 - uv.y);
    return out;
}
"#;

const BLUR_FRAGMENT: &str = r#"
struct Blur {
    horizontal: i32,
}

@group(0) @binding(0)
var<uniform> blur: Blur;

@group(1) @binding(0)
var source: texture_2d<f32>;
@group(1) @binding(1)
var source_sampler: sampler;

@fragment
fn fs_main(input: VertexOutput) -> @location(0) vec4<f32> {
    var weights = array<f32, 5>(0.227027, 0.1945946, 0.1216216, 0.054054, 0.016216);
    let texel = 1.0 / vec2<f32>(textureDimensions(source));
    var direction = vec2<f32>(0.0, texel.y);
    if blur.horizontal != 0 {
        direction = vec2<f32>(texel.x, 0.0);
    }
    let uv = input.uv;
    var result = textureSampleLevel(source, source_sampler, uv, 0.0).rgb * weights[0];
    for (var i = 1; i < 5; i = i + 1) {
        let offset = direction * f32(i);
        result += textureSampleLevel(source, source_sampler, uv + offset, 0.0).rgb * weights[i];
        result += textureSampleLevel(source, source_sampler, uv - offset, 0.0).rgb * weights[i];
    }
    return vec4<f32>(result, 1.0);
}
"#;

const COMPOSITE_FRAGMENT: &str = r#"
struct Composite {
    bloom: i32,
    exposure: f32,
    gamma: f32,
}

@group(0) @binding(0)
var<uniform> composite: Composite;

@group(1) @binding(0)
var scene_texture: texture_2d<f32>;
@group(1) @binding(1)
var bloom_texture: texture_2d<f32>;
@group(1) @binding(2)
var composite_sampler: sampler;

@fragment
fn fs_main(input: VertexOutput) -> @location(0) vec4<f32> {
    var hdr = textureSample(scene_texture, composite_sampler, input.uv).rgb;
    let glow = textureSample(bloom_texture, composite_sampler, input.uv).rgb;
    if composite.bloom != 0 {
        hdr += glow;
    }
    let mapped = vec3<f32>(1.0) - exp(-hdr * composite.exposure);
    return vec4<f32>(pow(mapped, vec3<f32>(1.0 / composite.gamma)), 1.0);
}
"#;

pub fn blur_shader() -> String {
    format!("{FULLSCREEN_VERTEX}{BLUR_FRAGMENT}")
}

pub fn composite_shader() -> String {
    format!("{FULLSCREEN_VERTEX}{COMPOSITE_FRAGMENT}")
}
