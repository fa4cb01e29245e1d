//! A walkable forest lit by a drifting swarm of fireflies.
//!
//! Scene state, the firefly walk and the uniform upload logic live in plain
//! modules that run without a GPU so they can be tested headless. The
//! [`render`] module turns that state into frames with wgpu and the
//! [`overlay`] module exposes it for live tuning through egui.

pub mod camera;
pub mod config;
pub mod firefly;
pub mod input;
pub mod lights;
pub mod material;
pub mod mesh;
pub mod overlay;
pub mod render;
pub mod state;
pub mod uniforms;

pub use camera::{Camera, CameraMovement};
pub use config::{LoadError, ResourcePaths};
pub use firefly::FireflySwarm;
pub use input::{Key, KeyCommand, KeyboardState};
pub use lights::{DirectionalLight, PointLight};
pub use overlay::Overlay;
pub use render::{GpuContext, Renderer};
pub use state::{PostProcessSettings, ProgramState};
pub use uniforms::{LightingUniforms, UniformSink};
