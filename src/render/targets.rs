//! Offscreen render targets. They are allocated once, at the initial window
//! size, and outlive every resize of the surface.

/// Floating-point format of every HDR colour target.
pub const HDR_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba16Float;
pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth24Plus;

/// Colour texture that is rendered into and later sampled.
pub struct RenderTexture {
    _texture: wgpu::Texture,
    view: wgpu::TextureView,
}

impl RenderTexture {
    fn create(
        device: &wgpu::Device,
        label: &str,
        size: wgpu::Extent3d,
        format: wgpu::TextureFormat,
        usage: wgpu::TextureUsages,
    ) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage,
            view_formats: &[],
        });
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

pub fn target_extent(width: u32, height: u32) -> wgpu::Extent3d {
    wgpu::Extent3d {
        width: width.max(1),
        height: height.max(1),
        depth_or_array_layers: 1,
    }
}

const SAMPLED_TARGET: wgpu::TextureUsages =
    wgpu::TextureUsages::RENDER_ATTACHMENT.union(wgpu::TextureUsages::TEXTURE_BINDING);

/// Multi-target scene framebuffer: HDR colour, bright pass and depth.
pub struct HdrTargets {
    pub scene: RenderTexture,
    pub bright: RenderTexture,
    pub depth: RenderTexture,
    extent: wgpu::Extent3d,
}

impl HdrTargets {
    fn create(device: &wgpu::Device, extent: wgpu::Extent3d) -> Self {
        Self {
            scene: RenderTexture::create(device, "hdr-scene", extent, HDR_FORMAT, SAMPLED_TARGET),
            bright: RenderTexture::create(
                device,
                "hdr-bright",
                extent,
                HDR_FORMAT,
                SAMPLED_TARGET,
            ),
            depth: RenderTexture::create(
                device,
                "hdr-depth",
                extent,
                DEPTH_FORMAT,
                wgpu::TextureUsages::RENDER_ATTACHMENT,
            ),
            extent,
        }
    }

    pub fn extent(&self) -> wgpu::Extent3d {
        self.extent
    }
}

/// Pair of single-target framebuffers the blur alternates between.
pub struct PingPong {
    targets: [RenderTexture; 2],
}

impl PingPong {
    fn create(device: &wgpu::Device, extent: wgpu::Extent3d) -> Self {
        Self {
            targets: [0, 1].map(|index| {
                RenderTexture::create(
                    device,
                    &format!("ping-pong-{index}"),
                    extent,
                    HDR_FORMAT,
                    SAMPLED_TARGET,
                )
            }),
        }
    }

    pub fn get(&self, index: usize) -> &RenderTexture {
        &self.targets[index % 2]
    }
}

/// Creates the scene and blur framebuffers inside a validation error scope.
/// An incomplete framebuffer is reported and rendering carries on.
pub fn create_targets(device: &wgpu::Device, width: u32, height: u32) -> (HdrTargets, PingPong) {
    let extent = target_extent(width, height);
    device.push_error_scope(wgpu::ErrorFilter::Validation);
    let hdr = HdrTargets::create(device, extent);
    if let Some(err) = pollster::block_on(device.pop_error_scope()) {
        log::error!("scene framebuffer is not complete: {err}");
    }
    device.push_error_scope(wgpu::ErrorFilter::Validation);
    let ping_pong = PingPong::create(device, extent);
    if let Some(err) = pollster::block_on(device.pop_error_scope()) {
        log::error!("blur framebuffers are not complete: {err}");
    }
    log::info!(
        "offscreen targets allocated at {}x{}",
        extent.width,
        extent.height
    );
    (hdr, ping_pong)
}
