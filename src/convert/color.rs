//! Color conversion stage
//!
//! First phase of packing: converts the staged color image into the color
//! band of every plane and loads the spare channel into the V depth band.

use super::argb::{ArgbImage, ArgbToI420, I420Planes};
use crate::frame::PlaneTargets;
use crate::gpu::{DeviceContext, MappedTexture, PixelFormat};
use crate::layout::PlaneLayout;

/// Byte of each RGBA pixel carried into the V plane.
pub const SPARE_CHANNEL: usize = 3;

/// Planes after the color phase. Only this token can start the depth phase,
/// so the spare-channel samples are always in place before depth is written.
pub struct ColorPacked<'a> {
    pub(crate) planes: PlaneTargets<'a>,
    pub(crate) layout: PlaneLayout,
}

impl<'a> ColorPacked<'a> {
    pub fn layout(&self) -> &PlaneLayout {
        &self.layout
    }
}

/// Map the staged color texture and fill the color band of `planes`.
///
/// Returns `None` when the texture cannot be mapped or its contents do not
/// cover the layout. Panics on an unsupported format or undersized planes,
/// both of which are setup errors on the caller's side.
pub fn convert_color<'a, C: DeviceContext>(
    context: &C,
    staging: &C::Texture,
    format: PixelFormat,
    layout: &PlaneLayout,
    planes: PlaneTargets<'a>,
    converter: &dyn ArgbToI420,
) -> Option<ColorPacked<'a>> {
    assert!(
        planes.fits(layout),
        "Destination planes too small for {}x{}",
        layout.width(),
        layout.height()
    );
    assert!(
        format.is_packable_color(),
        "Unsupported texture format {:?}",
        format
    );

    let mapped = match MappedTexture::map(context, staging) {
        Ok(mapped) => mapped,
        Err(e) => {
            log::error!("Failed to map staging color texture: {}", e);
            return None;
        }
    };

    let width = layout.width();
    let rows = layout.band_height();
    if !mapped.covers(width * 4, rows) {
        log::error!(
            "Staging color texture (pitch {}, {} bytes) does not cover {}x{}",
            mapped.row_pitch(),
            mapped.bytes().len(),
            width,
            rows
        );
        return None;
    }

    let src = ArgbImage {
        data: mapped.bytes(),
        stride: mapped.row_pitch(),
    };
    let mut dst = I420Planes {
        y: &mut *planes.y,
        stride_y: layout.luma_stride(),
        u: &mut *planes.u,
        stride_u: layout.chroma_stride(),
        v: &mut *planes.v,
        stride_v: layout.chroma_stride(),
    };
    if let Err(e) = converter.convert(&src, &mut dst, width, rows) {
        log::error!("i420 conversion failed: {}", e);
        debug_assert!(false, "i420 conversion failed: {e}");
    }

    copy_spare_channel(mapped.bytes(), mapped.row_pitch(), layout, &mut *planes.v);

    Some(ColorPacked {
        planes,
        layout: *layout,
    })
}

/// One spare-channel byte per 2x2 block, written row-major from the depth
/// chroma offset.
fn copy_spare_channel(src: &[u8], row_pitch: usize, layout: &PlaneLayout, v: &mut [u8]) {
    let mut write_index = layout.depth_chroma_offset();
    for y in (0..layout.band_height()).step_by(2) {
        let row = &src[y * row_pitch..];
        for x in (0..layout.width()).step_by(2) {
            v[write_index] = row[x * 4 + SPARE_CHANNEL];
            write_index += 1;
        }
    }
}
