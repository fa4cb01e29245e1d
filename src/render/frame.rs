use std::sync::Arc;

use anyhow::Result;
use glam::{Mat4, Vec3};
use winit::dpi::PhysicalSize;
use winit::window::Window;

use crate::camera::Camera;
use crate::config::ResourcePaths;
use crate::firefly::SWARM_SIZE;
use crate::overlay::Overlay;
use crate::state::ProgramState;

use super::bloom::BloomStage;
use super::context::GpuContext;
use super::scene::{ForestStage, MarkerStage};
use super::skybox::SkyboxStage;
use super::targets::{create_targets, HdrTargets, PingPong};

pub const NEAR_PLANE: f32 = 0.1;
pub const FAR_PLANE: f32 = 100.0;

/// One draw recorded into the HDR pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SceneDraw {
    Forest,
    LightMarkers,
    Skybox,
    CatSkybox,
}

/// Skyboxes come last so depth testing hides them behind the geometry; the
/// cat trumpet face blends over the environment.
pub const SCENE_DRAW_ORDER: [SceneDraw; 4] = [
    SceneDraw::Forest,
    SceneDraw::LightMarkers,
    SceneDraw::Skybox,
    SceneDraw::CatSkybox,
];

/// Projection and view matrices for the current camera.
pub fn frame_matrices(camera: &Camera, aspect: f32) -> (Mat4, Mat4) {
    let projection = Mat4::perspective_rh(
        camera.zoom().to_radians(),
        aspect.max(0.01),
        NEAR_PLANE,
        FAR_PLANE,
    );
    (projection, camera.view_matrix())
}

/// Clear values of the scene and bright targets. Only the scene takes the
/// background colour; the bright target starts black so the blur sees
/// nothing but what the shaders wrote there.
pub fn hdr_clear_colors(background: Vec3) -> [wgpu::Color; 2] {
    let scene = wgpu::Color {
        r: f64::from(background.x),
        g: f64::from(background.y),
        b: f64::from(background.z),
        a: 1.0,
    };
    [scene, wgpu::Color::BLACK]
}

/// Owns every render stage and records one frame per call to [`Renderer::render`].
pub struct Renderer {
    context: GpuContext,
    targets: HdrTargets,
    ping_pong: PingPong,
    forest: ForestStage,
    markers: MarkerStage,
    skybox: SkyboxStage,
    bloom: BloomStage,
}

impl Renderer {
    pub async fn new(window: Arc<Window>, paths: &ResourcePaths) -> Result<Self> {
        let context = GpuContext::new(window).await?;
        let size = context.size();
        let (targets, ping_pong) = create_targets(&context.device, size.width, size.height);
        let forest = ForestStage::new(&context.device, &context.queue, paths);
        let markers = MarkerStage::new(&context.device, SWARM_SIZE);
        let skybox = SkyboxStage::new(&context.device, &context.queue, paths);
        let bloom = BloomStage::new(
            &context.device,
            &context.queue,
            context.format(),
            &targets,
            &ping_pong,
        );

        Ok(Self {
            context,
            targets,
            ping_pong,
            forest,
            markers,
            skybox,
            bloom,
        })
    }

    pub fn context(&self) -> &GpuContext {
        &self.context
    }

    pub fn window(&self) -> &Window {
        self.context.window()
    }

    /// Only the surface follows the window; the HDR and blur targets keep
    /// the size they were created with.
    pub fn resize(&mut self, new_size: PhysicalSize<u32>) {
        self.context.resize(new_size);
    }

    /// Size the offscreen targets were created with.
    pub fn target_size(&self) -> PhysicalSize<u32> {
        let extent = self.targets.extent();
        PhysicalSize::new(extent.width, extent.height)
    }

    pub fn reconfigure(&mut self) {
        self.context.reconfigure();
    }

    pub fn render(
        &mut self,
        state: &ProgramState,
        mut overlay: Option<&mut Overlay>,
    ) -> Result<(), wgpu::SurfaceError> {
        let output = self.context.current_texture()?;
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let device = &self.context.device;
        let queue = &self.context.queue;
        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("frame-encoder"),
        });

        let (projection, camera_view) =
            frame_matrices(&state.camera, self.context.aspect_ratio());
        let lights = self
            .forest
            .prepare(queue, state, &projection, &camera_view);
        log::trace!("frame lit by {lights} point lights");
        self.markers
            .prepare(device, queue, &state.point_lights, &projection, &camera_view);
        self.skybox.prepare(queue, &projection, &camera_view);

        {
            let [scene_clear, bright_clear] = hdr_clear_colors(state.clear_color);
            let attachment = |view, clear| {
                Some(wgpu::RenderPassColorAttachment {
                    view,
                    depth_slice: None,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(clear),
                        store: wgpu::StoreOp::Store,
                    },
                })
            };
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("hdr-pass"),
                color_attachments: &[
                    attachment(self.targets.scene.view(), scene_clear),
                    attachment(self.targets.bright.view(), bright_clear),
                ],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: self.targets.depth.view(),
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            for draw in SCENE_DRAW_ORDER {
                match draw {
                    SceneDraw::Forest => self.forest.draw(&mut pass),
                    SceneDraw::LightMarkers => self.markers.draw(&mut pass),
                    SceneDraw::Skybox => self.skybox.draw_environment(&mut pass),
                    SceneDraw::CatSkybox => self.skybox.draw_cat_trumpet(&mut pass),
                }
            }
        }

        self.bloom
            .encode(&mut encoder, queue, &self.ping_pong, &state.post_process, &view);

        let size = self.context.size();
        let mut command_buffers = match overlay.as_deref_mut() {
            Some(overlay) => {
                overlay.paint(device, queue, &mut encoder, &view, [size.width, size.height])
            }
            None => Vec::new(),
        };
        command_buffers.push(encoder.finish());
        queue.submit(command_buffers);
        output.present();

        if let Some(overlay) = overlay {
            overlay.end_frame();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn skyboxes_are_drawn_after_geometry() {
        let position = |draw| SCENE_DRAW_ORDER.iter().position(|d| *d == draw);
        assert!(position(SceneDraw::Forest) < position(SceneDraw::Skybox));
        assert!(position(SceneDraw::LightMarkers) < position(SceneDraw::Skybox));
        assert_eq!(SCENE_DRAW_ORDER.last(), Some(&SceneDraw::CatSkybox));
    }

    #[test]
    fn only_the_scene_target_is_cleared_to_the_background() {
        let [scene, bright] = hdr_clear_colors(Vec3::ONE);
        assert_eq!(
            scene,
            wgpu::Color {
                r: 1.0,
                g: 1.0,
                b: 1.0,
                a: 1.0
            }
        );
        assert_eq!(bright, wgpu::Color::BLACK);

        let [scene, _] = hdr_clear_colors(Vec3::new(0.25, 0.5, 0.75));
        assert_eq!((scene.r, scene.g, scene.b), (0.25, 0.5, 0.75));
    }

    #[test]
    fn projection_uses_camera_zoom_and_fixed_planes() {
        let camera = Camera::new(Vec3::new(0.0, 0.0, 3.0));
        let (projection, view) = frame_matrices(&camera, 1.6);
        let expected = Mat4::perspective_rh(
            camera.zoom().to_radians(),
            1.6,
            NEAR_PLANE,
            FAR_PLANE,
        );
        assert_eq!(projection, expected);
        assert_eq!(view, camera.view_matrix());

        let near = projection.project_point3(Vec3::new(0.0, 0.0, -NEAR_PLANE));
        let far = projection.project_point3(Vec3::new(0.0, 0.0, -FAR_PLANE));
        assert!(near.z.abs() < 1e-5);
        assert!((far.z - 1.0).abs() < 1e-5);
    }
}
