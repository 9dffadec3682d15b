//! Consumer side of the packed layout
//!
//! Reads color, depth and spare-channel samples back out of a decoded frame
//! that follows [`PlaneLayout`].

use crate::frame::I420Frame;
use crate::layout::PlaneLayout;
use anyhow::{Result, anyhow};

pub struct DepthView<'a> {
    frame: I420Frame<'a>,
    layout: PlaneLayout,
}

impl<'a> DepthView<'a> {
    pub fn new(frame: I420Frame<'a>, layout: PlaneLayout) -> Result<Self> {
        if frame.width() != layout.width() || frame.height() != layout.height() {
            return Err(anyhow!(
                "Frame is {}x{}, layout expects {}x{}",
                frame.width(),
                frame.height(),
                layout.width(),
                layout.height()
            ));
        }
        if frame.stride_y() != layout.luma_stride()
            || frame.stride_u() != layout.chroma_stride()
            || frame.stride_v() != layout.chroma_stride()
        {
            return Err(anyhow!("Frame strides do not match the packed layout"));
        }
        if frame.data_y().len() < layout.luma_size()
            || frame.data_u().len() < layout.chroma_size()
            || frame.data_v().len() < layout.chroma_size()
        {
            return Err(anyhow!("Frame planes are shorter than the packed layout"));
        }
        Ok(Self { frame, layout })
    }

    pub fn layout(&self) -> &PlaneLayout {
        &self.layout
    }

    fn in_band(&self, x: usize, y: usize) -> bool {
        x < self.layout.width() && y < self.layout.band_height()
    }

    fn chroma_slot(&self, x: usize, y: usize) -> Option<usize> {
        if !self.in_band(x, y) || x % 2 != 0 || y % 2 != 0 {
            return None;
        }
        Some(self.layout.depth_chroma_offset() + self.layout.chroma_index(x, y))
    }

    /// Luma of row `y` of the color image.
    pub fn color_luma_row(&self, y: usize) -> Option<&'a [u8]> {
        if y >= self.layout.band_height() {
            return None;
        }
        let start = y * self.layout.luma_stride();
        Some(&self.frame.data_y()[start..start + self.layout.width()])
    }

    pub fn depth_high(&self, x: usize, y: usize) -> Option<u8> {
        if !self.in_band(x, y) {
            return None;
        }
        let at = self.layout.depth_luma_offset() + y * self.layout.luma_stride() + x;
        Some(self.frame.data_y()[at])
    }

    /// Low byte of the depth sample, kept only at even row and column.
    pub fn depth_low(&self, x: usize, y: usize) -> Option<u8> {
        self.chroma_slot(x, y).map(|at| self.frame.data_u()[at])
    }

    /// Full 16-bit depth, available at even row and column.
    pub fn depth(&self, x: usize, y: usize) -> Option<u16> {
        let high = self.depth_high(x, y)?;
        let low = self.depth_low(x, y)?;
        Some(u16::from_be_bytes([high, low]))
    }

    /// Spare color channel of pixel `(x, y)`, available at even row and column.
    pub fn spare(&self, x: usize, y: usize) -> Option<u8> {
        self.chroma_slot(x, y).map(|at| self.frame.data_v()[at])
    }

    /// High depth bytes of the whole band, row-major, `width` bytes per row.
    pub fn depth_map_high(&self) -> Vec<u8> {
        let width = self.layout.width();
        let stride = self.layout.luma_stride();
        let start = self.layout.depth_luma_offset();
        let mut out = Vec::with_capacity(width * self.layout.band_height());
        for y in 0..self.layout.band_height() {
            let row = start + y * stride;
            out.extend_from_slice(&self.frame.data_y()[row..row + width]);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::I420Buffer;
    use crate::layout::Topology;

    fn packed_by_hand(layout: PlaneLayout) -> I420Buffer {
        let mut buf = I420Buffer::black(layout);
        let planes = buf.targets();
        for y in 0..layout.band_height() {
            for x in 0..layout.width() {
                planes.y[y * layout.luma_stride() + x] = 10;
                planes.y[layout.depth_luma_offset() + y * layout.luma_stride() + x] =
                    (y * 8 + x) as u8;
                if x % 2 == 0 && y % 2 == 0 {
                    let at = layout.depth_chroma_offset() + layout.chroma_index(x, y);
                    planes.u[at] = 0xA0 + x as u8;
                    planes.v[at] = 0xB0 + y as u8;
                }
            }
        }
        buf
    }

    fn frame_of(buf: &I420Buffer) -> I420Frame<'_> {
        let layout = buf.layout();
        I420Frame::wrap(
            layout.width(),
            layout.height(),
            buf.y(),
            layout.luma_stride(),
            buf.u(),
            layout.chroma_stride(),
            buf.v(),
            layout.chroma_stride(),
        )
    }

    #[test]
    fn test_reads_packed_samples() {
        let layout = PlaneLayout::new(Topology::DoubleWide, 4, 4).unwrap();
        let buf = packed_by_hand(layout);
        let view = DepthView::new(frame_of(&buf), layout).unwrap();

        assert_eq!(view.color_luma_row(1), Some(&[10u8, 10, 10, 10][..]));
        assert_eq!(view.depth_high(3, 2), Some(19));
        assert_eq!(view.depth_low(2, 2), Some(0xA2));
        assert_eq!(view.depth(2, 0), Some(u16::from_be_bytes([2, 0xA2])));
        assert_eq!(view.spare(0, 2), Some(0xB2));
    }

    #[test]
    fn test_odd_positions_have_no_low_byte() {
        let layout = PlaneLayout::new(Topology::DoubleWide, 4, 4).unwrap();
        let buf = packed_by_hand(layout);
        let view = DepthView::new(frame_of(&buf), layout).unwrap();

        assert_eq!(view.depth_low(1, 0), None);
        assert_eq!(view.depth(0, 1), None);
        assert_eq!(view.spare(3, 3), None);
        assert!(view.depth_high(1, 1).is_some());
        assert_eq!(view.depth_high(4, 0), None);
        assert_eq!(view.depth_high(0, 4), None);
    }

    #[test]
    fn test_depth_map_high() {
        let layout = PlaneLayout::new(Topology::DoubleWide, 4, 2).unwrap();
        let buf = packed_by_hand(layout);
        let view = DepthView::new(frame_of(&buf), layout).unwrap();
        assert_eq!(view.depth_map_high(), vec![0, 1, 2, 3, 8, 9, 10, 11]);
    }

    #[test]
    fn test_layout_mismatch() {
        let layout = PlaneLayout::new(Topology::DoubleWide, 4, 4).unwrap();
        let other = PlaneLayout::new(Topology::StereoArray, 4, 4).unwrap();
        let buf = packed_by_hand(layout);
        assert!(DepthView::new(frame_of(&buf), other).is_err());
    }
}
