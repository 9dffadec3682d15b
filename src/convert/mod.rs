//! Two-phase packing of staged textures into destination planes
//!
//! [`color::convert_color`] must run before [`depth::pack_depth`]: the color
//! phase owns the V depth band, the depth phase only completes Y and U. The
//! token types enforce that order.

pub mod argb;
pub mod color;
pub mod depth;

pub use argb::{ArgbToI420, Bt601Converter};
pub use color::{ColorPacked, convert_color};
pub use depth::{DepthPacked, pack_depth};
