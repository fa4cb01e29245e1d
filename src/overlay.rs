//! Parameter-tuning overlay drawn with egui on top of the composited frame.

use std::ops::RangeInclusive;

use glam::Vec3;
use winit::event::WindowEvent;
use winit::window::Window;

use crate::lights::PointLight;
use crate::state::ProgramState;

/// Range of the exposure and gamma sliders. The composite pass itself does
/// not clamp.
pub const POST_PROCESS_RANGE: RangeInclusive<f32> = 0.1..=4.0;
pub const FOREST_SCALE_RANGE: RangeInclusive<f32> = 0.1..=4.0;
pub const ATTENUATION_RANGE: RangeInclusive<f32> = 0.0..=1.0;
pub const DIRECTION_RANGE: RangeInclusive<f32> = -10.0..=10.0;
pub const COLOR_RANGE: RangeInclusive<f32> = 0.0..=1.0;

struct PreparedFrame {
    paint_jobs: Vec<egui::ClippedPrimitive>,
    textures: egui::TexturesDelta,
    pixels_per_point: f32,
}

/// egui context plus its winit and wgpu integrations.
pub struct Overlay {
    context: egui::Context,
    winit: egui_winit::State,
    renderer: egui_wgpu::Renderer,
    prepared: Option<PreparedFrame>,
    to_free: Vec<egui::TextureId>,
}

impl Overlay {
    pub fn new(window: &Window, device: &wgpu::Device, format: wgpu::TextureFormat) -> Self {
        let context = egui::Context::default();
        let winit = egui_winit::State::new(
            context.clone(),
            egui::ViewportId::ROOT,
            window,
            Some(window.scale_factor() as f32),
            None,
            None,
        );
        let renderer =
            egui_wgpu::Renderer::new(device, format, egui_wgpu::RendererOptions::default());
        Self {
            context,
            winit,
            renderer,
            prepared: None,
            to_free: Vec::new(),
        }
    }

    /// Offers a window event to egui. Returns `true` when egui consumed it.
    pub fn on_window_event(&mut self, window: &Window, event: &WindowEvent) -> bool {
        self.winit.on_window_event(window, event).consumed
    }

    /// Runs the UI for this frame; widget edits land in `state` immediately.
    pub fn prepare(&mut self, window: &Window, state: &mut ProgramState) {
        let raw_input = self.winit.take_egui_input(window);
        let output = self.context.run(raw_input, |ctx| build_windows(ctx, state));
        self.winit
            .handle_platform_output(window, output.platform_output);
        let paint_jobs = self
            .context
            .tessellate(output.shapes, output.pixels_per_point);
        self.prepared = Some(PreparedFrame {
            paint_jobs,
            textures: output.textures_delta,
            pixels_per_point: output.pixels_per_point,
        });
    }

    /// Encodes the prepared UI over `target`. Returns command buffers egui
    /// needs submitted alongside `encoder`.
    pub fn paint(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
        target: &wgpu::TextureView,
        size_in_pixels: [u32; 2],
    ) -> Vec<wgpu::CommandBuffer> {
        let Some(frame) = self.prepared.take() else {
            return Vec::new();
        };
        let screen = egui_wgpu::ScreenDescriptor {
            size_in_pixels,
            pixels_per_point: frame.pixels_per_point,
        };
        for (id, delta) in &frame.textures.set {
            self.renderer.update_texture(device, queue, *id, delta);
        }
        let callbacks =
            self.renderer
                .update_buffers(device, queue, encoder, &frame.paint_jobs, &screen);
        {
            let pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("overlay-pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: target,
                    depth_slice: None,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Load,
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            let mut pass = pass.forget_lifetime();
            self.renderer.render(&mut pass, &frame.paint_jobs, &screen);
        }
        self.to_free.extend(frame.textures.free);
        callbacks
    }

    /// Releases textures egui dropped, once the frame using them is submitted.
    pub fn end_frame(&mut self) {
        for id in self.to_free.drain(..) {
            self.renderer.free_texture(&id);
        }
    }
}

/// Attenuation shared by the swarm, read from the template light.
pub fn swarm_attenuation(lights: &[PointLight]) -> (f32, f32, f32) {
    lights
        .first()
        .map_or((0.0, 0.0, 0.0), |light| (light.constant, light.linear, light.quadratic))
}

fn vec3_drag(ui: &mut egui::Ui, label: &str, value: &mut Vec3, range: RangeInclusive<f32>) {
    ui.horizontal(|ui| {
        for component in [&mut value.x, &mut value.y, &mut value.z] {
            ui.add(
                egui::DragValue::new(component)
                    .speed(0.05)
                    .range(range.clone())
                    .clamp_existing_to_range(false),
            );
        }
        ui.label(label);
    });
}

fn color_edit(ui: &mut egui::Ui, label: &str, value: &mut Vec3) {
    ui.horizontal(|ui| {
        let mut rgb = value.to_array();
        if ui.color_edit_button_rgb(&mut rgb).changed() {
            *value = Vec3::from_array(rgb);
        }
        ui.label(label);
    });
}

/// Lays out the "Scene", "Camera info", "Dirlight info" and "Bloom" windows.
pub fn build_windows(ctx: &egui::Context, state: &mut ProgramState) {
    egui::Window::new("Scene").show(ctx, |ui| {
        color_edit(ui, "clear colour", &mut state.clear_color);
        vec3_drag(ui, "forest position", &mut state.forest_position, -100.0..=100.0);
        ui.add(
            egui::Slider::new(&mut state.forest_scale, FOREST_SCALE_RANGE).text("forest scale"),
        );
        ui.separator();

        let (mut constant, mut linear, mut quadratic) = swarm_attenuation(&state.point_lights);
        let mut changed = false;
        changed |= ui
            .add(egui::Slider::new(&mut constant, ATTENUATION_RANGE).text("constant"))
            .changed();
        changed |= ui
            .add(egui::Slider::new(&mut linear, ATTENUATION_RANGE).text("linear"))
            .changed();
        changed |= ui
            .add(egui::Slider::new(&mut quadratic, ATTENUATION_RANGE).text("quadratic"))
            .changed();
        if changed {
            state.set_swarm_attenuation(constant, linear, quadratic);
        }
    });

    egui::Window::new("Camera info").show(ctx, |ui| {
        let camera = &state.camera;
        let (position, front) = (camera.position, camera.front());
        ui.label(format!(
            "position: ({:.2}, {:.2}, {:.2})",
            position.x, position.y, position.z
        ));
        ui.label(format!("yaw: {:.1}  pitch: {:.1}", camera.yaw(), camera.pitch()));
        ui.label(format!("front: ({:.2}, {:.2}, {:.2})", front.x, front.y, front.z));
        ui.checkbox(&mut state.camera_mouse_update_enabled, "mouse look");
    });

    egui::Window::new("Dirlight info").show(ctx, |ui| {
        let light = &mut state.dir_light;
        vec3_drag(ui, "direction", &mut light.direction, DIRECTION_RANGE);
        vec3_drag(ui, "ambient", &mut light.ambient, COLOR_RANGE);
        vec3_drag(ui, "diffuse", &mut light.diffuse, COLOR_RANGE);
        vec3_drag(ui, "specular", &mut light.specular, COLOR_RANGE);
    });

    egui::Window::new("Bloom").show(ctx, |ui| {
        let settings = &mut state.post_process;
        ui.checkbox(&mut settings.bloom, "bloom");
        ui.add(egui::Slider::new(&mut settings.exposure, POST_PROCESS_RANGE).text("exposure"));
        ui.add(egui::Slider::new(&mut settings.gamma, POST_PROCESS_RANGE).text("gamma"));
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::PostProcessSettings;

    #[test]
    fn idle_frame_leaves_state_untouched() {
        let ctx = egui::Context::default();
        let mut state = ProgramState::default();
        state.point_lights = vec![PointLight {
            constant: 1.0,
            linear: 0.09,
            quadratic: 0.032,
            ..PointLight::default()
        }];
        let before = state.clone();
        let _ = ctx.run(egui::RawInput::default(), |ctx| build_windows(ctx, &mut state));
        assert_eq!(state.point_lights, before.point_lights);
        assert_eq!(state.post_process, PostProcessSettings::default());
        assert_eq!(state.dir_light, before.dir_light);
        assert_eq!(state.forest_scale, before.forest_scale);
    }

    #[test]
    fn attenuation_comes_from_the_template_light() {
        let lights = [
            PointLight {
                constant: 1.0,
                linear: 0.5,
                quadratic: 0.25,
                ..PointLight::default()
            },
            PointLight::default(),
        ];
        assert_eq!(swarm_attenuation(&lights), (1.0, 0.5, 0.25));
        assert_eq!(swarm_attenuation(&[]), (0.0, 0.0, 0.0));
    }
}
