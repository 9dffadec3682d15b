//! CPU-backed device context
//!
//! Stands in for a real GPU: textures are plain byte vectors, copies are
//! row-by-row memcpys, and mapping hands out a borrow of the slot storage.
//! Every command is recorded so callers can inspect what the packer asked for.

use super::{DeviceContext, Mapped, TextureDesc};
use anyhow::anyhow;
use std::cell::{Cell, Ref, RefCell};
use std::collections::{HashMap, HashSet};

/// Texture living in host memory. Only mip level 0 of each array slot is stored.
pub struct SoftwareTexture {
    label: String,
    desc: TextureDesc,
    row_pitch: usize,
    slots: Vec<RefCell<Vec<u8>>>,
    mapped: Cell<bool>,
}

impl SoftwareTexture {
    pub fn new(label: impl Into<String>, desc: TextureDesc) -> Self {
        let row_pitch = desc.width as usize * desc.format.bytes_per_pixel().unwrap_or(0);
        Self::with_pitch(label.into(), desc, row_pitch)
    }

    /// Same texture with `padding` extra bytes at the end of every row, the way
    /// drivers often align staging rows.
    pub fn with_row_padding(self, padding: usize) -> Self {
        let row_pitch = self.row_pitch + padding;
        Self::with_pitch(self.label, self.desc, row_pitch)
    }

    fn with_pitch(label: String, desc: TextureDesc, row_pitch: usize) -> Self {
        let slot_len = row_pitch * desc.height as usize;
        let slots = (0..desc.array_size.max(1))
            .map(|_| RefCell::new(vec![0u8; slot_len]))
            .collect();
        Self {
            label,
            desc,
            row_pitch,
            slots,
            mapped: Cell::new(false),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn desc(&self) -> &TextureDesc {
        &self.desc
    }

    pub fn row_pitch(&self) -> usize {
        self.row_pitch
    }

    pub fn is_mapped(&self) -> bool {
        self.mapped.get()
    }

    /// Overwrite every pixel of array slot `slot`; `f` gets `(x, y)` and the pixel bytes.
    pub fn fill_with(&self, slot: u32, mut f: impl FnMut(u32, u32, &mut [u8])) {
        let Some(bpp) = self.desc.format.bytes_per_pixel() else {
            return;
        };
        let Some(storage) = self.slots.get(slot as usize) else {
            return;
        };
        let mut storage = storage.borrow_mut();
        for y in 0..self.desc.height {
            let row = y as usize * self.row_pitch;
            for x in 0..self.desc.width {
                let at = row + x as usize * bpp;
                f(x, y, &mut storage[at..at + bpp]);
            }
        }
    }

    pub fn fill_rgba(&self, slot: u32, f: impl Fn(u32, u32) -> [u8; 4]) {
        self.fill_with(slot, |x, y, px| px.copy_from_slice(&f(x, y)));
    }

    /// Fill a 16-bit texture; samples are stored little-endian.
    pub fn fill_depth(&self, slot: u32, f: impl Fn(u32, u32) -> u16) {
        self.fill_with(slot, |x, y, px| px.copy_from_slice(&f(x, y).to_le_bytes()));
    }

    /// Snapshot of array slot `slot`.
    pub fn slot_bytes(&self, slot: u32) -> Vec<u8> {
        self.slots
            .get(slot as usize)
            .map(|s| s.borrow().clone())
            .unwrap_or_default()
    }
}

/// One recorded `copy_subresource_region` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopyCall {
    pub dst: String,
    pub dst_x: u32,
    pub src: String,
    pub src_subresource: u32,
}

/// Device context executing everything on the CPU.
///
/// Not `Sync`: like a real immediate context it must not be shared between
/// concurrent packing calls.
#[derive(Default)]
pub struct SoftwareContext {
    copies: RefCell<Vec<CopyCall>>,
    maps: RefCell<HashMap<String, usize>>,
    unmaps: RefCell<HashMap<String, usize>>,
    failing: RefCell<HashSet<String>>,
}

impl SoftwareContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every later `map_read` of `texture` fail.
    pub fn fail_maps_of(&self, texture: &SoftwareTexture) {
        self.failing.borrow_mut().insert(texture.label.clone());
    }

    pub fn copies(&self) -> Vec<CopyCall> {
        self.copies.borrow().clone()
    }

    pub fn map_count(&self, texture: &SoftwareTexture) -> usize {
        self.maps.borrow().get(&texture.label).copied().unwrap_or(0)
    }

    pub fn unmap_count(&self, texture: &SoftwareTexture) -> usize {
        self.unmaps.borrow().get(&texture.label).copied().unwrap_or(0)
    }
}

impl DeviceContext for SoftwareContext {
    type Texture = SoftwareTexture;
    type Mapping<'a> = Ref<'a, [u8]>;

    fn copy_subresource_region(
        &self,
        dst: &SoftwareTexture,
        dst_x: u32,
        src: &SoftwareTexture,
        src_subresource: u32,
    ) {
        self.copies.borrow_mut().push(CopyCall {
            dst: dst.label.clone(),
            dst_x,
            src: src.label.clone(),
            src_subresource,
        });

        let mip_levels = src.desc.mip_levels.max(1);
        if src_subresource % mip_levels != 0 {
            log::warn!(
                "{}: only mip 0 is backed, ignoring copy of subresource {}",
                src.label,
                src_subresource
            );
            return;
        }
        let slot = (src_subresource / mip_levels) as usize;

        let bpp = match (src.desc.format.bytes_per_pixel(), dst.desc.format.bytes_per_pixel()) {
            (Some(a), Some(b)) if a == b => a,
            _ => {
                log::warn!(
                    "Incompatible copy {:?} -> {:?}",
                    src.desc.format,
                    dst.desc.format
                );
                return;
            }
        };
        if std::ptr::eq(src, dst) || dst.is_mapped() {
            log::warn!("Copy into {} rejected while it is busy", dst.label);
            return;
        }
        let (Some(src_slot), Some(dst_slot)) = (src.slots.get(slot), dst.slots.first()) else {
            log::warn!("Copy from missing slot {} of {}", slot, src.label);
            return;
        };

        let width = src.desc.width.min(dst.desc.width.saturating_sub(dst_x)) as usize;
        let rows = src.desc.height.min(dst.desc.height) as usize;
        let src_bytes = src_slot.borrow();
        let mut dst_bytes = dst_slot.borrow_mut();
        for y in 0..rows {
            let from = y * src.row_pitch;
            let to = y * dst.row_pitch + dst_x as usize * bpp;
            dst_bytes[to..to + width * bpp].copy_from_slice(&src_bytes[from..from + width * bpp]);
        }
    }

    fn map_read<'a>(&'a self, texture: &'a SoftwareTexture) -> anyhow::Result<Mapped<Ref<'a, [u8]>>> {
        if self.failing.borrow().contains(&texture.label) {
            return Err(anyhow!("Map of {} failed", texture.label));
        }
        if texture.mapped.replace(true) {
            return Err(anyhow!("{} is already mapped", texture.label));
        }
        *self.maps.borrow_mut().entry(texture.label.clone()).or_default() += 1;

        let data = Ref::map(texture.slots[0].borrow(), |v| v.as_slice());
        Ok(Mapped {
            data,
            row_pitch: texture.row_pitch,
        })
    }

    fn unmap(&self, texture: &SoftwareTexture) {
        if !texture.mapped.replace(false) {
            log::debug!("Unmap of {} which was not mapped", texture.label);
        }
        *self.unmaps.borrow_mut().entry(texture.label.clone()).or_default() += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::{PixelFormat, calc_subresource};

    #[test]
    fn test_copy_places_slot_at_offset() {
        let ctx = SoftwareContext::new();
        let src = SoftwareTexture::new(
            "eyes",
            TextureDesc::new(2, 2, PixelFormat::R16Typeless).with_array_size(2),
        );
        let dst = SoftwareTexture::new("staging", TextureDesc::new(4, 2, PixelFormat::R16Typeless));
        src.fill_depth(0, |_, _| 0x1111);
        src.fill_depth(1, |_, _| 0x2222);

        ctx.copy_subresource_region(&dst, 0, &src, calc_subresource(0, 0, 1));
        ctx.copy_subresource_region(&dst, 2, &src, calc_subresource(0, 1, 1));

        let bytes = dst.slot_bytes(0);
        let samples: Vec<u16> = bytes
            .chunks_exact(2)
            .map(|c| u16::from_le_bytes([c[0], c[1]]))
            .collect();
        assert_eq!(samples, vec![0x1111, 0x1111, 0x2222, 0x2222, 0x1111, 0x1111, 0x2222, 0x2222]);
        assert_eq!(ctx.copies().len(), 2);
        assert_eq!(ctx.copies()[1].dst_x, 2);
    }

    #[test]
    fn test_padded_rows() {
        let tex = SoftwareTexture::new("padded", TextureDesc::new(2, 2, PixelFormat::R8G8B8A8Unorm))
            .with_row_padding(8);
        assert_eq!(tex.row_pitch(), 16);
        tex.fill_rgba(0, |x, y| [x as u8, y as u8, 0, 0]);
        let bytes = tex.slot_bytes(0);
        assert_eq!(&bytes[16..20], &[0, 1, 0, 0]);
        assert_eq!(&bytes[8..16], &[0; 8]);
    }

    #[test]
    fn test_failing_map() {
        let ctx = SoftwareContext::new();
        let tex = SoftwareTexture::new("staging", TextureDesc::new(2, 2, PixelFormat::R16Unorm));
        ctx.fail_maps_of(&tex);
        assert!(ctx.map_read(&tex).is_err());
        assert_eq!(ctx.map_count(&tex), 0);
        assert!(!tex.is_mapped());
    }

    #[test]
    fn test_double_map_rejected() {
        let ctx = SoftwareContext::new();
        let tex = SoftwareTexture::new("staging", TextureDesc::new(2, 2, PixelFormat::R16Unorm));
        let first = ctx.map_read(&tex).unwrap();
        assert!(ctx.map_read(&tex).is_err());
        drop(first);
        ctx.unmap(&tex);
        assert!(ctx.map_read(&tex).is_ok());
    }
}
