//! Plane layout of a packed color + depth frame
//!
//! ```text
//! +-----------------------+
//! |       Y color         |  width x height/2
//! +-----------------------+
//! |       Y depth         |  width x height/2 (high byte of each sample)
//! +-----------+-----------+
//! |  U color  |  V color  |  width/2 x height/4 each
//! +-----------+-----------+
//! |  U depth  |  V spare  |  width/2 x height/4 each
//! +-----------+-----------+
//! ```
//!
//! U and V live in separate buffers; both use the same depth offset.

use crate::gpu::TextureDesc;
use anyhow::{Result, anyhow};
use serde::Deserialize;
use std::fmt;
use std::str::FromStr;

/// How the source images are arranged on the GPU.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
pub enum Topology {
    /// A single texture holding both eyes side by side (array size 1)
    #[serde(rename = "mono")]
    DoubleWide,
    /// A two-slot texture array, one eye per slot (array size 2)
    #[serde(rename = "stereo")]
    StereoArray,
}

impl Topology {
    pub fn from_array_size(array_size: u32) -> Option<Self> {
        match array_size {
            1 => Some(Topology::DoubleWide),
            2 => Some(Topology::StereoArray),
            _ => None,
        }
    }

    pub fn array_size(self) -> u32 {
        match self {
            Topology::DoubleWide => 1,
            Topology::StereoArray => 2,
        }
    }
}

impl fmt::Display for Topology {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Topology::DoubleWide => write!(f, "mono"),
            Topology::StereoArray => write!(f, "stereo"),
        }
    }
}

impl FromStr for Topology {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "mono" => Ok(Topology::DoubleWide),
            "stereo" => Ok(Topology::StereoArray),
            other => Err(anyhow!("Unknown topology '{}'", other)),
        }
    }
}

/// Sizes and offsets of the packed planes, derived from the source topology.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaneLayout {
    topology: Topology,
    slot_width: usize,
    slot_height: usize,
    width: usize,
    height: usize,
    luma_stride: usize,
    chroma_stride: usize,
    depth_luma_offset: usize,
    depth_chroma_offset: usize,
}

impl PlaneLayout {
    /// Layout for slots of `slot_width` x `slot_height` pixels.
    ///
    /// For [`Topology::DoubleWide`] the slot width already covers both eyes.
    pub fn new(topology: Topology, slot_width: u32, slot_height: u32) -> Result<Self> {
        if slot_width == 0 || slot_height == 0 {
            return Err(anyhow!("Empty source slot {}x{}", slot_width, slot_height));
        }
        let slot_width = slot_width as usize;
        let slot_height = slot_height as usize;

        let width = match topology {
            Topology::DoubleWide => slot_width,
            Topology::StereoArray => slot_width * 2,
        };
        let height = slot_height * 2;

        // 4:2:0 needs whole 2x2 blocks in each band
        if width % 2 != 0 || slot_height % 2 != 0 {
            return Err(anyhow!(
                "Packed layout needs even dimensions, got {}x{} ({})",
                width,
                slot_height,
                topology
            ));
        }

        let luma_stride = width;
        let chroma_stride = luma_stride / 2;

        Ok(Self {
            topology,
            slot_width,
            slot_height,
            width,
            height,
            luma_stride,
            chroma_stride,
            depth_luma_offset: luma_stride * (height / 2),
            depth_chroma_offset: chroma_stride * (height / 4),
        })
    }

    /// Layout for a rendered texture description, if its array size is supported.
    pub fn from_desc(desc: &TextureDesc) -> Result<Self> {
        let topology = Topology::from_array_size(desc.array_size)
            .ok_or_else(|| anyhow!("Unsupported texture array size {}", desc.array_size))?;
        Self::new(topology, desc.width, desc.height)
    }

    pub fn topology(&self) -> Topology {
        self.topology
    }

    pub fn slot_width(&self) -> usize {
        self.slot_width
    }

    pub fn slot_height(&self) -> usize {
        self.slot_height
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn luma_stride(&self) -> usize {
        self.luma_stride
    }

    pub fn chroma_stride(&self) -> usize {
        self.chroma_stride
    }

    /// Rows in the color band, and likewise in the depth band.
    pub fn band_height(&self) -> usize {
        self.height / 2
    }

    /// Chroma rows belonging to the color band.
    pub fn chroma_band_height(&self) -> usize {
        self.height / 4
    }

    /// First luma byte of the depth band.
    pub fn depth_luma_offset(&self) -> usize {
        self.depth_luma_offset
    }

    /// First U (and V) byte past the color chroma.
    pub fn depth_chroma_offset(&self) -> usize {
        self.depth_chroma_offset
    }

    pub fn luma_size(&self) -> usize {
        self.luma_stride * self.height
    }

    pub fn chroma_size(&self) -> usize {
        self.chroma_stride * (self.height / 2)
    }

    /// Index of the 4:2:0 sample covering pixel `(x, y)` within one chroma band.
    pub fn chroma_index(&self, x: usize, y: usize) -> usize {
        (y / 2) * self.chroma_stride + x / 2
    }
}
