//! Circular buffer of pyramid-level frames.

use ndarray::{Array4, ArrayView3, ArrayView4, Axis};

use super::ProcessingError;

/// Fixed-capacity circular store of one `(rows, cols, channels)` image per
/// time step, backed by a single contiguous `(time, rows, cols, channels)`
/// array.
///
/// The array is allocated once and overwritten in place; only the cursor
/// moves.
#[derive(Debug, Clone)]
pub struct FrameBuffer {
    data: Array4<f64>,
    write_index: usize,
    samples_written: u64,
}

impl FrameBuffer {
    /// Allocate a zeroed buffer of `capacity` slots.
    pub fn new(
        capacity: usize,
        rows: usize,
        cols: usize,
        channels: usize,
    ) -> Result<Self, ProcessingError> {
        if capacity == 0 || rows == 0 || cols == 0 || channels == 0 {
            return Err(ProcessingError::InvalidDimensions(format!(
                "frame buffer needs non-zero extents, got {capacity} x {rows} x {cols} x {channels}"
            )));
        }
        Ok(Self {
            data: Array4::zeros((capacity, rows, cols, channels)),
            write_index: 0,
            samples_written: 0,
        })
    }

    /// Store `image` in the slot under the cursor. Does not move the cursor.
    pub fn write(&mut self, image: ArrayView3<f64>) -> Result<(), ProcessingError> {
        let expected = self.slot_shape();
        let actual = image.dim();
        if expected != actual {
            return Err(ProcessingError::ShapeMismatch { expected, actual });
        }
        self.data
            .index_axis_mut(Axis(0), self.write_index)
            .assign(&image);
        self.samples_written += 1;
        Ok(())
    }

    /// Move the cursor to the next slot, wrapping at capacity.
    pub fn advance(&mut self) {
        self.write_index = (self.write_index + 1) % self.capacity();
    }

    pub fn write_index(&self) -> usize {
        self.write_index
    }

    /// Number of time slots.
    pub fn capacity(&self) -> usize {
        self.data.len_of(Axis(0))
    }

    /// `(rows, cols, channels)` of every slot.
    pub fn slot_shape(&self) -> (usize, usize, usize) {
        let (_, rows, cols, channels) = self.data.dim();
        (rows, cols, channels)
    }

    /// Total writes since construction.
    pub fn samples_written(&self) -> u64 {
        self.samples_written
    }

    /// Whether every slot holds a real sample (the window has filled once).
    pub fn is_warm(&self) -> bool {
        self.samples_written >= self.capacity() as u64
    }

    /// The whole `(time, rows, cols, channels)` array.
    pub fn data(&self) -> ArrayView4<'_, f64> {
        self.data.view()
    }

    pub fn slot(&self, index: usize) -> Option<ArrayView3<'_, f64>> {
        (index < self.capacity()).then(|| self.data.index_axis(Axis(0), index))
    }
}
