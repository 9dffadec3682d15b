//! 4-channel 8-bit to I420 conversion
//!
//! The default converter hands the work to `yuvutils-rs` (BT.601, limited
//! range). Other converters can be plugged in through [`ArgbToI420`].

use anyhow::{Result, anyhow};
use yuvutils_rs::{BufferStoreMut, YuvPlanarImageMut, YuvRange, YuvStandardMatrix, rgba_to_yuv420};

/// Source image for a conversion, 4 bytes per pixel in RGBA order.
pub struct ArgbImage<'a> {
    pub data: &'a [u8],
    pub stride: usize,
}

/// Destination planes with their strides.
pub struct I420Planes<'a> {
    pub y: &'a mut [u8],
    pub stride_y: usize,
    pub u: &'a mut [u8],
    pub stride_u: usize,
    pub v: &'a mut [u8],
    pub stride_v: usize,
}

/// Color conversion used by the packer.
pub trait ArgbToI420 {
    /// Convert the top-left `width` x `height` pixels of `src` into `dst`.
    fn convert(
        &self,
        src: &ArgbImage<'_>,
        dst: &mut I420Planes<'_>,
        width: usize,
        height: usize,
    ) -> Result<()>;
}

/// Default converter: BT.601 limited range through `yuvutils-rs`.
#[derive(Debug, Default, Clone, Copy)]
pub struct Bt601Converter;

impl ArgbToI420 for Bt601Converter {
    fn convert(
        &self,
        src: &ArgbImage<'_>,
        dst: &mut I420Planes<'_>,
        width: usize,
        height: usize,
    ) -> Result<()> {
        if width == 0 || height == 0 {
            return Err(anyhow!("Empty conversion {}x{}", width, height));
        }

        let mut planar_image = YuvPlanarImageMut {
            y_plane: BufferStoreMut::Borrowed(&mut *dst.y),
            y_stride: to_u32("Y stride", dst.stride_y)?,
            u_plane: BufferStoreMut::Borrowed(&mut *dst.u),
            u_stride: to_u32("U stride", dst.stride_u)?,
            v_plane: BufferStoreMut::Borrowed(&mut *dst.v),
            v_stride: to_u32("V stride", dst.stride_v)?,
            width: to_u32("width", width)?,
            height: to_u32("height", height)?,
        };

        rgba_to_yuv420(
            &mut planar_image,
            src.data,
            to_u32("source stride", src.stride)?,
            YuvRange::Limited,
            YuvStandardMatrix::Bt601,
        )
        .map_err(|e| anyhow!("yuv420 conversion of {}x{} failed: {:?}", width, height, e))
    }
}

fn to_u32(name: &str, value: usize) -> Result<u32> {
    u32::try_from(value).map_err(|_| anyhow!("{} {} does not fit in 32 bits", name, value))
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Integer rounding differs by at most one step between implementations.
    fn close(actual: u8, expected: u8) -> bool {
        actual.abs_diff(expected) <= 1
    }

    fn convert(data: &[u8], width: usize, height: usize) -> (Vec<u8>, Vec<u8>, Vec<u8>) {
        let (cw, ch) = (width / 2, height / 2);
        let (mut y, mut u, mut v) = (vec![0u8; width * height], vec![0u8; cw * ch], vec![0u8; cw * ch]);
        let src = ArgbImage {
            data,
            stride: width * 4,
        };
        let mut dst = I420Planes {
            y: &mut y,
            stride_y: width,
            u: &mut u,
            stride_u: cw,
            v: &mut v,
            stride_v: cw,
        };
        Bt601Converter.convert(&src, &mut dst, width, height).unwrap();
        (y, u, v)
    }

    #[test]
    fn test_uniform_red() {
        let data: Vec<u8> = [255u8, 0, 0, 128].iter().copied().cycle().take(4 * 4 * 4).collect();
        let (y, u, v) = convert(&data, 4, 4);
        assert!(y.iter().all(|&b| close(b, 82)), "{:?}", y);
        assert!(u.iter().all(|&b| close(b, 90)), "{:?}", u);
        assert!(v.iter().all(|&b| close(b, 240)), "{:?}", v);
    }

    #[test]
    fn test_limited_range_extremes() {
        let black = vec![0u8; 4 * 2 * 2];
        let (y, u, v) = convert(&black, 2, 2);
        assert!(y.iter().all(|&b| close(b, 16)));
        assert!(close(u[0], 128) && close(v[0], 128));

        let white = vec![255u8; 4 * 2 * 2];
        let (y, _, _) = convert(&white, 2, 2);
        assert!(y.iter().all(|&b| close(b, 235)));
    }

    #[test]
    fn test_chroma_follows_blocks() {
        // 2x2 blocks: red, white / black, white
        let block = |x: usize, y: usize| -> [u8; 4] {
            match (x / 2, y / 2) {
                (0, 0) => [255, 0, 0, 255],
                (0, 1) => [0, 0, 0, 255],
                _ => [255, 255, 255, 255],
            }
        };
        let mut data = Vec::new();
        for y in 0..4 {
            for x in 0..4 {
                data.extend_from_slice(&block(x, y));
            }
        }
        let (y, u, v) = convert(&data, 4, 4);

        assert!(close(y[0], 82) && close(y[2], 235) && close(y[8], 16));
        assert!(close(u[0], 90) && close(v[0], 240));
        for at in 1..4 {
            assert!(close(u[at], 128), "u[{}] = {}", at, u[at]);
            assert!(close(v[at], 128), "v[{}] = {}", at, v[at]);
        }
    }

    #[test]
    fn test_short_destination() {
        let data = vec![0u8; 64];
        let (mut y, mut u, mut v) = (vec![0u8; 15], vec![0u8; 4], vec![0u8; 4]);
        let src = ArgbImage {
            data: &data,
            stride: 16,
        };
        let mut dst = I420Planes {
            y: &mut y,
            stride_y: 4,
            u: &mut u,
            stride_u: 2,
            v: &mut v,
            stride_v: 2,
        };
        assert!(Bt601Converter.convert(&src, &mut dst, 4, 4).is_err());
    }
}
