//! Depth packing stage
//!
//! Second phase of packing. Each 16-bit sample is split in two: the high byte
//! goes to the luma depth band at full resolution, the low byte goes to the U
//! depth band once per 2x2 block. The V depth band keeps the spare-channel
//! bytes written by the color phase.

use super::color::ColorPacked;
use crate::frame::PlaneTargets;
use crate::gpu::{DeviceContext, MappedTexture, PixelFormat};
use crate::layout::PlaneLayout;

/// Planes after both phases, ready to be wrapped into a frame.
pub struct DepthPacked<'a> {
    pub(crate) planes: PlaneTargets<'a>,
    pub(crate) layout: PlaneLayout,
}

impl<'a> DepthPacked<'a> {
    pub fn layout(&self) -> &PlaneLayout {
        &self.layout
    }
}

#[inline]
pub fn split_sample(sample: u16) -> (u8, u8) {
    ((sample >> 8) as u8, sample as u8)
}

/// Map the staged depth texture and complete the depth bands of `color`.
///
/// Returns `None` when the texture cannot be mapped or does not cover the
/// layout. Panics when `format` is not a 16-bit single-channel format.
pub fn pack_depth<'a, C: DeviceContext>(
    context: &C,
    staging_depth: &C::Texture,
    format: PixelFormat,
    color: ColorPacked<'a>,
) -> Option<DepthPacked<'a>> {
    assert!(format.is_depth16(), "Unsupported depth format {:?}", format);
    let ColorPacked { planes, layout } = color;

    let mapped = match MappedTexture::map(context, staging_depth) {
        Ok(mapped) => mapped,
        Err(e) => {
            log::error!("Failed to map staging depth texture: {}", e);
            return None;
        }
    };

    let width = layout.width();
    let rows = layout.band_height();
    if !mapped.covers(width * 2, rows) {
        log::error!(
            "Staging depth texture (pitch {}, {} bytes) does not cover {}x{}",
            mapped.row_pitch(),
            mapped.bytes().len(),
            width,
            rows
        );
        return None;
    }

    let src = mapped.bytes();
    let pitch = mapped.row_pitch();
    let stride = layout.luma_stride();
    let luma_offset = layout.depth_luma_offset();
    let mut uv_write_index = layout.depth_chroma_offset();

    for y in 0..rows {
        let row = &src[y * pitch..y * pitch + width * 2];
        let luma = &mut planes.y[luma_offset + y * stride..luma_offset + y * stride + width];

        for (x, (sample, out)) in row.chunks_exact(2).zip(luma.iter_mut()).enumerate() {
            let (high, low) = split_sample(u16::from_le_bytes([sample[0], sample[1]]));
            *out = high;

            if y % 2 == 0 && x % 2 == 0 {
                planes.u[uv_write_index] = low;
                uv_write_index += 1;
            }
        }
    }

    Some(DepthPacked { planes, layout })
}
