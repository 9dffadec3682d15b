//! Capture stage
//!
//! Copies the rendered color (and depth) images into their staging textures.
//! Only GPU commands are issued here; the copies are waited on implicitly when
//! a later stage maps the staging textures.

use super::TextureSet;
use crate::gpu::{DeviceContext, calc_subresource};

/// Result of issuing the staging copies for one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureOutcome {
    /// Copies were issued; the staging textures will hold this frame
    Copied { copies: usize },
    /// Array size is neither 1 nor 2; nothing was copied
    Unsupported { array_size: u32 },
}

impl CaptureOutcome {
    pub fn is_copied(&self) -> bool {
        matches!(self, CaptureOutcome::Copied { .. })
    }
}

pub fn capture<C: DeviceContext>(set: &TextureSet<'_, C>) -> CaptureOutcome {
    let ctx = set.context;
    let desc = &set.desc;

    match desc.array_size {
        1 => {
            // double-wide texture, one region covers both eyes
            ctx.copy_subresource_region(set.staging_color, 0, set.rendered_color, 0);
            let mut copies = 1;

            if let Some(depth) = &set.depth {
                ctx.copy_subresource_region(depth.staging, 0, depth.rendered, 0);
                copies += 1;
            }

            CaptureOutcome::Copied { copies }
        }
        2 => {
            let left_eye = calc_subresource(0, 0, desc.mip_levels);
            let right_eye = calc_subresource(0, 1, desc.mip_levels);

            ctx.copy_subresource_region(set.staging_color, 0, set.rendered_color, left_eye);
            ctx.copy_subresource_region(
                set.staging_color,
                desc.width,
                set.rendered_color,
                right_eye,
            );
            let mut copies = 2;

            if let Some(depth) = &set.depth {
                ctx.copy_subresource_region(depth.staging, 0, depth.rendered, left_eye);
                ctx.copy_subresource_region(depth.staging, desc.width, depth.rendered, right_eye);
                copies += 2;
            }

            CaptureOutcome::Copied { copies }
        }
        array_size => {
            log::warn!(
                "Got frame with texture array size {}, only 1 (double-wide) and 2 (stereo) are supported",
                array_size
            );
            CaptureOutcome::Unsupported { array_size }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::DepthTextures;
    use crate::gpu::software::{CopyCall, SoftwareContext, SoftwareTexture};
    use crate::gpu::{PixelFormat, TextureDesc};

    fn call(dst: &str, dst_x: u32, src: &str, src_subresource: u32) -> CopyCall {
        CopyCall {
            dst: dst.into(),
            dst_x,
            src: src.into(),
            src_subresource,
        }
    }

    #[test]
    fn test_double_wide_single_copy() {
        let ctx = SoftwareContext::new();
        let desc = TextureDesc::new(8, 4, PixelFormat::R8G8B8A8Unorm);
        let rendered = SoftwareTexture::new("color", desc);
        let staging = SoftwareTexture::new("staging-color", desc);
        rendered.fill_rgba(0, |x, y| [x as u8, y as u8, 7, 9]);

        let set = TextureSet::new(&ctx, &staging, &rendered, desc);
        assert_eq!(capture(&set), CaptureOutcome::Copied { copies: 1 });
        assert_eq!(ctx.copies(), vec![call("staging-color", 0, "color", 0)]);
        assert_eq!(staging.slot_bytes(0), rendered.slot_bytes(0));
    }

    #[test]
    fn test_double_wide_with_depth() {
        let ctx = SoftwareContext::new();
        let desc = TextureDesc::new(4, 2, PixelFormat::R8G8B8A8Typeless);
        let depth_desc = TextureDesc::new(4, 2, PixelFormat::R16Typeless);
        let rendered = SoftwareTexture::new("color", desc);
        let staging = SoftwareTexture::new("staging-color", desc);
        let rendered_depth = SoftwareTexture::new("depth", depth_desc);
        let staging_depth = SoftwareTexture::new("staging-depth", depth_desc);

        let set = TextureSet::new(&ctx, &staging, &rendered, desc)
            .with_depth(DepthTextures::new(&staging_depth, &rendered_depth, depth_desc.format));
        assert_eq!(capture(&set), CaptureOutcome::Copied { copies: 2 });
        assert_eq!(
            ctx.copies(),
            vec![
                call("staging-color", 0, "color", 0),
                call("staging-depth", 0, "depth", 0),
            ]
        );
    }

    #[test]
    fn test_stereo_array_two_copies() {
        let ctx = SoftwareContext::new();
        let desc = TextureDesc::new(4, 2, PixelFormat::R8G8B8A8Unorm)
            .with_array_size(2)
            .with_mip_levels(3);
        let rendered = SoftwareTexture::new("eyes", desc);
        let staging = SoftwareTexture::new(
            "staging-color",
            TextureDesc::new(8, 2, PixelFormat::R8G8B8A8Unorm),
        );
        rendered.fill_rgba(0, |_, _| [1, 1, 1, 1]);
        rendered.fill_rgba(1, |_, _| [2, 2, 2, 2]);

        let set = TextureSet::new(&ctx, &staging, &rendered, desc);
        assert!(capture(&set).is_copied());
        assert_eq!(
            ctx.copies(),
            vec![
                call("staging-color", 0, "eyes", 0),
                call("staging-color", 4, "eyes", 3),
            ]
        );

        let row = &staging.slot_bytes(0)[..32];
        assert!(row[..16].iter().all(|&b| b == 1));
        assert!(row[16..].iter().all(|&b| b == 2));
    }

    #[test]
    fn test_unsupported_array_size() {
        for array_size in [0, 3, 6] {
            let ctx = SoftwareContext::new();
            let desc =
                TextureDesc::new(4, 2, PixelFormat::R8G8B8A8Unorm).with_array_size(array_size);
            let rendered = SoftwareTexture::new("color", desc);
            let staging = SoftwareTexture::new("staging-color", desc);

            let set = TextureSet::new(&ctx, &staging, &rendered, desc);
            assert_eq!(capture(&set), CaptureOutcome::Unsupported { array_size });
            assert!(ctx.copies().is_empty());
        }
    }
}
