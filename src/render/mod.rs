//! wgpu rendering: HDR geometry pass, bloom blur and tonemapped composite.

pub mod bloom;
pub mod context;
pub mod frame;
pub mod program;
pub mod scene;
pub mod shaders;
pub mod skybox;
pub mod targets;
pub mod texture;

pub use context::GpuContext;
pub use frame::{frame_matrices, Renderer, SceneDraw, SCENE_DRAW_ORDER};
