//! Destination planes and the packed I420 frame view

pub mod pool;

pub use pool::{I420Buffer, PlanePool};

use crate::convert::DepthPacked;
use crate::layout::PlaneLayout;

/// Caller-owned destination memory for one packing call.
pub struct PlaneTargets<'a> {
    pub y: &'a mut [u8],
    pub u: &'a mut [u8],
    pub v: &'a mut [u8],
}

impl<'a> PlaneTargets<'a> {
    pub fn new(y: &'a mut [u8], u: &'a mut [u8], v: &'a mut [u8]) -> Self {
        Self { y, u, v }
    }

    /// Shorter-lived handle to the same memory.
    pub fn reborrow(&mut self) -> PlaneTargets<'_> {
        PlaneTargets {
            y: &mut *self.y,
            u: &mut *self.u,
            v: &mut *self.v,
        }
    }

    /// Whether every plane can hold what `layout` writes into it.
    pub fn fits(&self, layout: &PlaneLayout) -> bool {
        self.y.len() >= layout.luma_size()
            && self.u.len() >= layout.chroma_size()
            && self.v.len() >= layout.chroma_size()
    }
}

/// Planar YUV 4:2:0 frame over externally owned memory.
#[derive(Debug, Clone, Copy)]
pub struct I420Frame<'a> {
    width: usize,
    height: usize,
    y: &'a [u8],
    stride_y: usize,
    u: &'a [u8],
    stride_u: usize,
    v: &'a [u8],
    stride_v: usize,
}

impl<'a> I420Frame<'a> {
    #[allow(clippy::too_many_arguments)]
    pub fn wrap(
        width: usize,
        height: usize,
        y: &'a [u8],
        stride_y: usize,
        u: &'a [u8],
        stride_u: usize,
        v: &'a [u8],
        stride_v: usize,
    ) -> Self {
        Self {
            width,
            height,
            y,
            stride_y,
            u,
            stride_u,
            v,
            stride_v,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn data_y(&self) -> &'a [u8] {
        self.y
    }

    pub fn data_u(&self) -> &'a [u8] {
        self.u
    }

    pub fn data_v(&self) -> &'a [u8] {
        self.v
    }

    pub fn stride_y(&self) -> usize {
        self.stride_y
    }

    pub fn stride_u(&self) -> usize {
        self.stride_u
    }

    pub fn stride_v(&self) -> usize {
        self.stride_v
    }

    /// Write the three planes back to back, trimmed to the frame size.
    pub fn write_to(&self, out: &mut impl std::io::Write) -> std::io::Result<()> {
        let chroma_width = self.width.div_ceil(2);
        let chroma_height = self.height.div_ceil(2);
        write_plane(out, self.y, self.stride_y, self.width, self.height)?;
        write_plane(out, self.u, self.stride_u, chroma_width, chroma_height)?;
        write_plane(out, self.v, self.stride_v, chroma_width, chroma_height)
    }
}

/// Wrap fully packed planes into a frame view.
pub fn assemble(packed: DepthPacked<'_>) -> I420Frame<'_> {
    let DepthPacked { planes, layout } = packed;
    let y: &[u8] = planes.y;
    let u: &[u8] = planes.u;
    let v: &[u8] = planes.v;

    I420Frame::wrap(
        layout.width(),
        layout.height(),
        &y[..layout.luma_size()],
        layout.luma_stride(),
        &u[..layout.chroma_size()],
        layout.chroma_stride(),
        &v[..layout.chroma_size()],
        layout.chroma_stride(),
    )
}

fn write_plane(
    out: &mut impl std::io::Write,
    plane: &[u8],
    stride: usize,
    width: usize,
    rows: usize,
) -> std::io::Result<()> {
    for row in plane.chunks(stride).take(rows) {
        out.write_all(&row[..width.min(row.len())])?;
    }
    Ok(())
}
