//! Texture capture module
//!
//! Holds the per-frame set of GPU textures and destination planes, and the
//! stage that copies rendered content into CPU-readable staging textures.

pub mod stage;

use crate::frame::PlaneTargets;
use crate::gpu::{DeviceContext, PixelFormat, TextureDesc};

/// Rendered depth image and the staging texture it is copied into.
pub struct DepthTextures<'a, C: DeviceContext> {
    pub staging: &'a C::Texture,
    pub rendered: &'a C::Texture,
    /// Format of the rendered depth texture
    pub format: PixelFormat,
}

impl<'a, C: DeviceContext> DepthTextures<'a, C> {
    pub fn new(staging: &'a C::Texture, rendered: &'a C::Texture, format: PixelFormat) -> Self {
        Self {
            staging,
            rendered,
            format,
        }
    }
}

impl<C: DeviceContext> Clone for DepthTextures<'_, C> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<C: DeviceContext> Copy for DepthTextures<'_, C> {}

/// Everything one capture request works on.
///
/// Textures and context are borrowed for the duration of the request only;
/// their lifetime is managed by whoever created them.
pub struct TextureSet<'a, C: DeviceContext> {
    pub context: &'a C,
    pub staging_color: &'a C::Texture,
    pub rendered_color: &'a C::Texture,
    pub depth: Option<DepthTextures<'a, C>>,
    /// Absent when the buffer was created without destination memory
    pub planes: Option<PlaneTargets<'a>>,
    /// Description of the rendered color texture (per slot)
    pub desc: TextureDesc,
}

impl<'a, C: DeviceContext> TextureSet<'a, C> {
    pub fn new(
        context: &'a C,
        staging_color: &'a C::Texture,
        rendered_color: &'a C::Texture,
        desc: TextureDesc,
    ) -> Self {
        Self {
            context,
            staging_color,
            rendered_color,
            depth: None,
            planes: None,
            desc,
        }
    }

    pub fn with_depth(mut self, depth: DepthTextures<'a, C>) -> Self {
        self.depth = Some(depth);
        self
    }

    pub fn with_planes(mut self, planes: PlaneTargets<'a>) -> Self {
        self.planes = Some(planes);
        self
    }
}
