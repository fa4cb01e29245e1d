//! Image decoding and plain 2D textures for model materials.

use std::path::Path;

use glam::Vec3;
use image::{Rgba, RgbaImage};

use crate::config::LoadError;

pub fn load_image(path: &Path) -> Result<RgbaImage, LoadError> {
    image::open(path)
        .map(|image| image.to_rgba8())
        .map_err(|source| LoadError::Image {
            path: path.to_path_buf(),
            source,
        })
}

/// Opaque 1x1 image of `color`, components clamped to `0..=1`.
pub fn solid_image(color: Vec3) -> RgbaImage {
    let [r, g, b] = color
        .clamp(Vec3::ZERO, Vec3::ONE)
        .to_array()
        .map(|c| (c * 255.0).round() as u8);
    RgbaImage::from_pixel(1, 1, Rgba([r, g, b, 255]))
}

/// Loads `path`, or stands in a single texel of `fallback` when there is no
/// map or it cannot be decoded.
pub fn image_or_solid(path: Option<&Path>, fallback: Vec3, what: &str) -> RgbaImage {
    let Some(path) = path else {
        return solid_image(fallback);
    };
    match load_image(path) {
        Ok(image) => image,
        Err(err) => {
            log::warn!("{err}; {what} uses a flat colour");
            solid_image(fallback)
        }
    }
}

pub struct Texture2d {
    _texture: wgpu::Texture,
    view: wgpu::TextureView,
}

impl Texture2d {
    pub fn upload(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        label: &str,
        image: &RgbaImage,
    ) -> Self {
        let (width, height) = image.dimensions();
        let size = wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        };
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8Unorm,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            image.as_raw(),
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(4 * width),
                rows_per_image: Some(height),
            },
            size,
        );
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self {
            _texture: texture,
            view,
        }
    }

    pub fn view(&self) -> &wgpu::TextureView {
        &self.view
    }
}
