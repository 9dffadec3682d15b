//! Native frame buffer over GPU textures
//!
//! A [`DepthFrameBuffer`] describes one rendered frame that still lives on the
//! GPU. Calling [`DepthFrameBuffer::to_i420`] copies it to staging memory and
//! packs color and depth into the caller's planes.

use crate::capture::stage::{CaptureOutcome, capture};
use crate::capture::{DepthTextures, TextureSet};
use crate::convert::{ArgbToI420, Bt601Converter, convert_color, pack_depth};
use crate::frame::{I420Frame, PlaneTargets, assemble};
use crate::gpu::{DeviceContext, PixelFormat, TextureDesc};
use crate::layout::{PlaneLayout, Topology};
use crate::utils::perf::{PackStats, PackStep};
use std::sync::Arc;
use std::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferKind {
    /// Pixels are on the GPU until converted
    Native,
    I420,
}

pub struct DepthFrameBuffer<'a, C: DeviceContext> {
    set: TextureSet<'a, C>,
    layout: Option<PlaneLayout>,
    width: usize,
    height: usize,
    converter: Box<dyn ArgbToI420 + 'a>,
    stats: Option<Arc<PackStats>>,
}

impl<'a, C: DeviceContext> DepthFrameBuffer<'a, C> {
    /// Color-only buffer without destination memory.
    ///
    /// Such a buffer can describe a frame but cannot be converted:
    /// [`to_i420`](Self::to_i420) panics on it.
    pub fn new(
        context: &'a C,
        staging_texture: &'a C::Texture,
        rendered_image: &'a C::Texture,
        width: u32,
        height: u32,
        format: PixelFormat,
    ) -> Self {
        let desc = TextureDesc::new(width, height, format);
        Self {
            set: TextureSet::new(context, staging_texture, rendered_image, desc),
            layout: None,
            width: width as usize,
            height: height as usize,
            converter: Box::new(Bt601Converter),
            stats: None,
        }
    }

    /// Buffer packing color and depth into `planes`.
    ///
    /// `desc` describes the rendered color texture per slot. Array sizes other
    /// than 1 and 2 are accepted here and rejected per frame by `to_i420`.
    ///
    /// # Panics
    /// If the slot size cannot be packed (odd or empty dimensions).
    pub fn with_depth(
        context: &'a C,
        staging_texture: &'a C::Texture,
        rendered_image: &'a C::Texture,
        depth: Option<DepthTextures<'a, C>>,
        planes: PlaneTargets<'a>,
        desc: TextureDesc,
    ) -> Self {
        let layout = Topology::from_array_size(desc.array_size).map(|topology| {
            match PlaneLayout::new(topology, desc.width, desc.height) {
                Ok(layout) => layout,
                Err(e) => panic!("Cannot pack rendered image: {}", e),
            }
        });

        let width = match layout {
            Some(layout) => layout.width(),
            None => desc.width as usize,
        };

        let mut set =
            TextureSet::new(context, staging_texture, rendered_image, desc).with_planes(planes);
        set.depth = depth;

        Self {
            set,
            layout,
            width,
            height: desc.height as usize * 2,
            converter: Box::new(Bt601Converter),
            stats: None,
        }
    }

    pub fn with_converter(mut self, converter: impl ArgbToI420 + 'a) -> Self {
        self.converter = Box::new(converter);
        self
    }

    pub fn with_stats(mut self, stats: Arc<PackStats>) -> Self {
        self.stats = Some(stats);
        self
    }

    pub fn kind(&self) -> BufferKind {
        BufferKind::Native
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn layout(&self) -> Option<&PlaneLayout> {
        self.layout.as_ref()
    }

    /// Copy the rendered textures to staging memory and pack them.
    ///
    /// Returns `None` when the frame cannot be produced this time: unsupported
    /// array size, a failed map, or no depth textures. The caller is expected
    /// to try again with the next frame.
    ///
    /// # Panics
    /// If the buffer has no destination planes, or the color format is not
    /// 8-bit RGBA.
    pub fn to_i420(&mut self) -> Option<I420Frame<'_>> {
        // if the user didn't pass in destination planes, converting is not supported
        assert!(
            self.set.planes.is_some(),
            "to_i420 needs destination planes"
        );

        let started = Instant::now();
        let outcome = capture(&self.set);
        self.record_step(PackStep::Capture, started);

        if let CaptureOutcome::Unsupported { .. } = outcome {
            if let Some(stats) = &self.stats {
                stats.record_unsupported_topology();
            }
            return None;
        }
        let layout = self.layout?;

        let Some(depth) = self.set.depth else {
            log::warn!("Depth packing requested without depth textures");
            if let Some(stats) = &self.stats {
                stats.record_missing_depth();
            }
            return None;
        };

        let context = self.set.context;
        let staging_color = self.set.staging_color;
        let format = self.set.desc.format;
        let stats = self.stats.clone();
        let planes = self.set.planes.as_mut()?.reborrow();

        let started = Instant::now();
        let color = convert_color(
            context,
            staging_color,
            format,
            &layout,
            planes,
            self.converter.as_ref(),
        );
        record(&stats, PackStep::Color, started);
        let Some(color) = color else {
            if let Some(stats) = &stats {
                stats.record_map_failure();
            }
            return None;
        };

        let started = Instant::now();
        let packed = pack_depth(context, depth.staging, depth.format, color);
        record(&stats, PackStep::Depth, started);
        let Some(packed) = packed else {
            if let Some(stats) = &stats {
                stats.record_map_failure();
            }
            return None;
        };

        if let Some(stats) = &stats {
            stats.record_frame();
        }
        Some(assemble(packed))
    }

    fn record_step(&self, step: PackStep, started: Instant) {
        record(&self.stats, step, started);
    }
}

fn record(stats: &Option<Arc<PackStats>>, step: PackStep, started: Instant) {
    if let Some(stats) = stats {
        stats.record_step(step, started.elapsed());
    }
}
