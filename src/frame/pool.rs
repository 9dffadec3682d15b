use super::PlaneTargets;
use crate::buffer::BufferKind;
use crate::layout::PlaneLayout;
use std::collections::VecDeque;

/// Owned Y/U/V planes sized for one packed frame.
pub struct I420Buffer {
    layout: PlaneLayout,
    y: Vec<u8>,
    u: Vec<u8>,
    v: Vec<u8>,
}

impl I420Buffer {
    /// Black frame: luma 0, chroma 128.
    pub fn black(layout: PlaneLayout) -> Self {
        Self {
            layout,
            y: vec![0u8; layout.luma_size()],
            u: vec![128u8; layout.chroma_size()],
            v: vec![128u8; layout.chroma_size()],
        }
    }

    pub fn layout(&self) -> &PlaneLayout {
        &self.layout
    }

    /// Pixels already live in CPU memory as I420.
    pub fn kind(&self) -> BufferKind {
        BufferKind::I420
    }

    pub fn targets(&mut self) -> PlaneTargets<'_> {
        PlaneTargets::new(&mut self.y, &mut self.u, &mut self.v)
    }

    pub fn y(&self) -> &[u8] {
        &self.y
    }

    pub fn u(&self) -> &[u8] {
        &self.u
    }

    pub fn v(&self) -> &[u8] {
        &self.v
    }
}

/// Pool of destination buffers, so steady-state packing does not allocate.
///
/// - Pre-allocates `initial` buffers on creation
/// - Reuses buffers via put()/take() cycle
/// - Falls back to allocation if the pool is exhausted
pub struct PlanePool {
    buffers: VecDeque<I420Buffer>,
    layout: PlaneLayout,
    capacity: usize,
}

impl PlanePool {
    pub fn new(layout: PlaneLayout, initial: usize) -> Self {
        let mut buffers = VecDeque::with_capacity(initial);
        for _ in 0..initial {
            buffers.push_back(I420Buffer::black(layout));
        }

        Self {
            buffers,
            layout,
            capacity: initial.max(1) * 2,
        }
    }

    pub fn layout(&self) -> &PlaneLayout {
        &self.layout
    }

    pub fn available(&self) -> usize {
        self.buffers.len()
    }

    /// Take a writable buffer from the pool or allocate a new one if necessary.
    #[inline]
    pub fn take(&mut self) -> I420Buffer {
        self.buffers
            .pop_front()
            .unwrap_or_else(|| I420Buffer::black(self.layout))
    }

    /// Put a buffer back after it was used.
    #[inline]
    pub fn put(&mut self, buffer: I420Buffer) {
        // buffers from another layout (resolution change) are dropped
        if buffer.layout == self.layout && self.buffers.len() < self.capacity {
            self.buffers.push_back(buffer);
        }
    }
}
