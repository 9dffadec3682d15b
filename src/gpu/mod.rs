//! GPU device context abstraction
//!
//! The packer needs exactly three things from a device: copy a texture region
//! into a staging texture, map a staging texture for CPU read, and unmap it.
//! Everything else (device creation, texture lifetime) stays with the caller.

#[cfg(target_os = "windows")]
pub mod d3d11;
pub mod software;

use std::ops::Deref;

/// Pixel formats the packer knows how to name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PixelFormat {
    R8G8B8A8Unorm,
    R8G8B8A8Typeless,
    B8G8R8A8Unorm,
    R16Typeless,
    R16Unorm,
    D16Unorm,
    /// Raw platform format id with no mapping here
    Other(u32),
}

impl PixelFormat {
    /// Bytes per pixel, or `None` for formats this crate cannot address.
    pub fn bytes_per_pixel(self) -> Option<usize> {
        match self {
            PixelFormat::R8G8B8A8Unorm
            | PixelFormat::R8G8B8A8Typeless
            | PixelFormat::B8G8R8A8Unorm => Some(4),
            PixelFormat::R16Typeless | PixelFormat::R16Unorm | PixelFormat::D16Unorm => Some(2),
            PixelFormat::Other(_) => None,
        }
    }

    /// Formats accepted by the color conversion stage.
    pub fn is_packable_color(self) -> bool {
        matches!(
            self,
            PixelFormat::R8G8B8A8Unorm | PixelFormat::R8G8B8A8Typeless
        )
    }

    pub fn is_depth16(self) -> bool {
        matches!(
            self,
            PixelFormat::R16Typeless | PixelFormat::R16Unorm | PixelFormat::D16Unorm
        )
    }
}

/// Description of a 2D texture (or texture array), per slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextureDesc {
    pub width: u32,
    pub height: u32,
    pub array_size: u32,
    pub mip_levels: u32,
    pub format: PixelFormat,
}

impl TextureDesc {
    pub fn new(width: u32, height: u32, format: PixelFormat) -> Self {
        Self {
            width,
            height,
            array_size: 1,
            mip_levels: 1,
            format,
        }
    }

    pub fn with_array_size(mut self, array_size: u32) -> Self {
        self.array_size = array_size;
        self
    }

    pub fn with_mip_levels(mut self, mip_levels: u32) -> Self {
        self.mip_levels = mip_levels;
        self
    }
}

/// Subresource index of `mip_slice` in array slot `array_slice`.
///
/// Same numbering as `D3D11CalcSubresource`.
pub const fn calc_subresource(mip_slice: u32, array_slice: u32, mip_levels: u32) -> u32 {
    mip_slice + array_slice * mip_levels
}

/// CPU view of a mapped texture, as returned by [`DeviceContext::map_read`].
pub struct Mapped<M> {
    pub data: M,
    /// Bytes between the starts of two consecutive rows
    pub row_pitch: usize,
}

/// Minimal device context used by the capture and packing stages.
///
/// Commands submitted through `copy_subresource_region` must be visible to a
/// later `map_read` on the same context. Implementations are not expected to be
/// reentrant: one packing call at a time per context.
pub trait DeviceContext {
    type Texture;
    type Mapping<'a>: Deref<Target = [u8]>
    where
        Self: 'a;

    /// Copy the whole of `src_subresource` into subresource 0 of `dst`,
    /// placing its top-left corner at column `dst_x`.
    fn copy_subresource_region(
        &self,
        dst: &Self::Texture,
        dst_x: u32,
        src: &Self::Texture,
        src_subresource: u32,
    );

    /// Map subresource 0 of `texture` for reading.
    fn map_read<'a>(&'a self, texture: &'a Self::Texture)
    -> anyhow::Result<Mapped<Self::Mapping<'a>>>;

    fn unmap(&self, texture: &Self::Texture);
}

/// A mapped texture that is unmapped exactly once, when dropped.
pub struct MappedTexture<'a, C: DeviceContext + 'a> {
    context: &'a C,
    texture: &'a C::Texture,
    mapping: Option<C::Mapping<'a>>,
    row_pitch: usize,
}

impl<'a, C: DeviceContext + 'a> MappedTexture<'a, C> {
    pub fn map(context: &'a C, texture: &'a C::Texture) -> anyhow::Result<Self> {
        let Mapped { data, row_pitch } = context.map_read(texture)?;
        Ok(Self {
            context,
            texture,
            mapping: Some(data),
            row_pitch,
        })
    }

    pub fn bytes(&self) -> &[u8] {
        self.mapping.as_deref().unwrap_or(&[])
    }

    pub fn row_pitch(&self) -> usize {
        self.row_pitch
    }

    /// Check that `rows` rows of `row_bytes` bytes each are addressable.
    pub fn covers(&self, row_bytes: usize, rows: usize) -> bool {
        if rows == 0 {
            return true;
        }
        self.row_pitch >= row_bytes
            && self.bytes().len() >= self.row_pitch * (rows - 1) + row_bytes
    }
}

impl<'a, C: DeviceContext + 'a> Drop for MappedTexture<'a, C> {
    fn drop(&mut self) {
        // the CPU view must be gone before the texture is unmapped
        drop(self.mapping.take());
        self.context.unmap(self.texture);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::software::{SoftwareContext, SoftwareTexture};

    #[test]
    fn test_calc_subresource() {
        assert_eq!(calc_subresource(0, 0, 1), 0);
        assert_eq!(calc_subresource(0, 1, 1), 1);
        assert_eq!(calc_subresource(0, 1, 4), 4);
        assert_eq!(calc_subresource(2, 1, 4), 6);
    }

    #[test]
    fn test_format_classes() {
        assert!(PixelFormat::R8G8B8A8Unorm.is_packable_color());
        assert!(PixelFormat::R8G8B8A8Typeless.is_packable_color());
        assert!(!PixelFormat::B8G8R8A8Unorm.is_packable_color());
        assert!(PixelFormat::D16Unorm.is_depth16());
        assert_eq!(PixelFormat::Other(42).bytes_per_pixel(), None);
    }

    #[test]
    fn test_mapped_texture_unmaps_once() {
        let ctx = SoftwareContext::new();
        let tex = SoftwareTexture::new(
            "staging",
            TextureDesc::new(4, 2, PixelFormat::R8G8B8A8Unorm),
        );

        {
            let mapped = MappedTexture::map(&ctx, &tex).unwrap();
            assert_eq!(mapped.row_pitch(), 16);
            assert!(mapped.covers(16, 2));
            assert!(!mapped.covers(16, 3));
        }

        assert_eq!(ctx.map_count(&tex), 1);
        assert_eq!(ctx.unmap_count(&tex), 1);
    }
}
