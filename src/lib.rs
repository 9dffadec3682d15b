//! Packs a rendered color image and its 16-bit depth into one I420 frame, so
//! an ordinary video pipeline can carry the depth without protocol changes.
//!
//! Flow for one frame:
//! 1. [`capture::stage`] copies the rendered textures into staging textures
//! 2. [`convert::color`] converts color into the top half of the planes
//! 3. [`convert::depth`] splits depth into the bottom half
//! 4. [`frame::assemble`] wraps the planes into an [`frame::I420Frame`]
//!
//! [`buffer::DepthFrameBuffer`] runs all four; [`unpack::DepthView`] reads the
//! result back on the receiving side.

pub mod buffer;
pub mod capture;
pub mod config;
pub mod convert;
pub mod frame;
pub mod gpu;
pub mod layout;
pub mod unpack;
pub mod utils;

pub use buffer::{BufferKind, DepthFrameBuffer};
pub use frame::{I420Frame, PlaneTargets};
pub use layout::{PlaneLayout, Topology};
