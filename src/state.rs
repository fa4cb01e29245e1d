use std::path::Path;

use glam::Vec3;

use crate::camera::Camera;
use crate::config::{read_text, LoadError, ResourcePaths, TokenReader};
use crate::lights::{self, DirectionalLight, PointLight};

/// Tonemapping and bloom controls shared by the overlay and the composite pass.
///
/// Values are passed through unvalidated; only the overlay widgets clamp them.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PostProcessSettings {
    pub bloom: bool,
    pub exposure: f32,
    pub gamma: f32,
}

impl Default for PostProcessSettings {
    fn default() -> Self {
        Self {
            bloom: true,
            exposure: 1.0,
            gamma: 1.0,
        }
    }
}

/// Startup values read from the program state file: `r g b overlay px py pz fx fy fz`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StateFile {
    pub clear_color: Vec3,
    pub overlay_enabled: bool,
    pub camera_position: Vec3,
    pub camera_front: Vec3,
}

impl StateFile {
    pub fn from_str(path: &Path, contents: &str) -> Result<Self, LoadError> {
        let mut reader = TokenReader::new(path, contents);
        Ok(Self {
            clear_color: reader.vec3("clear colour")?,
            overlay_enabled: reader.flag("overlay flag")?,
            camera_position: reader.vec3("camera position")?,
            camera_front: reader.vec3("camera front")?,
        })
    }

    pub fn load(path: &Path) -> Result<Self, LoadError> {
        Self::from_str(path, &read_text(path)?)
    }
}

/// Mutable root of everything the frame renders and the overlay edits.
#[derive(Debug, Clone)]
pub struct ProgramState {
    pub clear_color: Vec3,
    pub overlay_enabled: bool,
    pub camera: Camera,
    pub camera_mouse_update_enabled: bool,
    pub forest_position: Vec3,
    pub forest_scale: f32,
    pub dir_light: DirectionalLight,
    /// Light 0 is the template read from disk; the rest of the swarm copies it.
    pub point_lights: Vec<PointLight>,
    pub post_process: PostProcessSettings,
}

impl Default for ProgramState {
    fn default() -> Self {
        Self {
            clear_color: Vec3::ONE,
            overlay_enabled: false,
            camera: Camera::default(),
            camera_mouse_update_enabled: true,
            forest_position: Vec3::new(0.0, -5.0, 10.0),
            forest_scale: 1.0,
            dir_light: DirectionalLight::default(),
            point_lights: Vec::new(),
            post_process: PostProcessSettings::default(),
        }
    }
}

impl ProgramState {
    /// Builds the startup state, degrading to defaults for any unreadable file.
    pub fn load(paths: &ResourcePaths) -> Self {
        let mut state = Self::default();
        match StateFile::load(&paths.program_state()) {
            Ok(file) => state.apply_file(&file),
            Err(err) => log::warn!("{err}; keeping the default program state"),
        }
        state.dir_light = lights::load_or_default(&paths.dir_light(), DirectionalLight::load);
        state
            .point_lights
            .push(lights::load_or_default(&paths.point_light(), PointLight::load));
        state
    }

    /// Mouse look starts enabled exactly when the overlay starts hidden.
    pub fn apply_file(&mut self, file: &StateFile) {
        self.clear_color = file.clear_color;
        self.overlay_enabled = file.overlay_enabled;
        self.camera_mouse_update_enabled = !file.overlay_enabled;
        self.camera.position = file.camera_position;
        self.camera.look_along(file.camera_front);
    }

    /// Applies one attenuation triple to every light of the swarm.
    pub fn set_swarm_attenuation(&mut self, constant: f32, linear: f32, quadratic: f32) {
        for light in &mut self.point_lights {
            light.constant = constant;
            light.linear = linear;
            light.quadratic = quadratic;
        }
    }
}
