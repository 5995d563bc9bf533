//! Gaussian pyramid with a separable 5-tap binomial kernel.
//!
//! Images are `(rows, cols, channels)` arrays of `f64`. Downsampling blurs
//! with [`GAUSSIAN_5TAP`] and keeps every even row and column, so an axis of
//! length `n` becomes `ceil(n / 2)`. Upsampling doubles each axis by zero
//! insertion followed by the same kernel scaled by 2 per axis. Border samples
//! reflect around the edge pixel (reflect-101).

use ndarray::{s, Array3, ArrayView3, Axis};

use super::ProcessingError;

/// Binomial approximation of a Gaussian, sums to 1.
pub const GAUSSIAN_5TAP: [f64; 5] = [
    1.0 / 16.0,
    4.0 / 16.0,
    6.0 / 16.0,
    4.0 / 16.0,
    1.0 / 16.0,
];

/// Levels of a Gaussian pyramid; index 0 is the input image.
#[derive(Debug, Clone)]
pub struct Pyramid {
    levels: Vec<Array3<f64>>,
}

impl Pyramid {
    /// Blur-and-halve `image` `levels` times, producing `levels + 1` entries.
    pub fn build(image: ArrayView3<f64>, levels: usize) -> Result<Self, ProcessingError> {
        let (rows, cols, _) = image.dim();
        level_shape(rows, cols, levels)?;

        let mut pyramid = Vec::with_capacity(levels + 1);
        pyramid.push(image.to_owned());
        for _ in 0..levels {
            let next = pyr_down(pyramid[pyramid.len() - 1].view())?;
            pyramid.push(next);
        }
        Ok(Self { levels: pyramid })
    }

    /// Number of entries (`levels + 1`).
    pub fn len(&self) -> usize {
        self.levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    pub fn level(&self, index: usize) -> Option<&Array3<f64>> {
        self.levels.get(index)
    }

    /// The most downsampled entry.
    pub fn deepest(&self) -> ArrayView3<'_, f64> {
        self.levels[self.levels.len() - 1].view()
    }

    /// Upsample entry `index` `levels` times and crop to `width x height`.
    ///
    /// Reproducing the original image needs `index == levels`, the deepest
    /// entry; a shallower entry upsampled `levels` times is a zoomed corner.
    pub fn reconstruct(
        &self,
        index: usize,
        levels: usize,
        width: usize,
        height: usize,
    ) -> Result<Array3<f64>, ProcessingError> {
        let level = self.levels.get(index).ok_or_else(|| {
            ProcessingError::InvalidDimensions(format!(
                "pyramid index {index} out of range (pyramid has {} levels)",
                self.levels.len()
            ))
        })?;
        reconstruct(level.view(), levels, width, height)
    }

    pub fn into_levels(self) -> Vec<Array3<f64>> {
        self.levels
    }
}

/// Shape `(rows, cols)` of the deepest level after `levels` downsamples.
///
/// Errors when the image is empty or an axis shorter than 2 pixels would
/// have to be halved.
pub fn level_shape(rows: usize, cols: usize, levels: usize) -> Result<(usize, usize), ProcessingError> {
    if rows == 0 || cols == 0 {
        return Err(ProcessingError::InvalidDimensions(format!(
            "image is {cols}x{rows}, both axes must be non-empty"
        )));
    }

    let (mut r, mut c) = (rows, cols);
    for step in 0..levels {
        if r < 2 || c < 2 {
            return Err(ProcessingError::InvalidDimensions(format!(
                "{levels} pyramid levels do not fit a {cols}x{rows} image \
                 (level {step} is already {c}x{r})"
            )));
        }
        r = r.div_ceil(2);
        c = c.div_ceil(2);
    }
    Ok((r, c))
}

/// Upsample a single pyramid level `levels` times and crop the result to
/// `width x height`.
///
/// Upsampling a level of a `width x height` image overshoots by at most one
/// pixel per step; the crop restores the exact working resolution.
pub fn reconstruct(
    level: ArrayView3<f64>,
    levels: usize,
    width: usize,
    height: usize,
) -> Result<Array3<f64>, ProcessingError> {
    let mut image = level.to_owned();
    for _ in 0..levels {
        image = pyr_up(image.view());
    }

    let (rows, cols, _) = image.dim();
    if rows < height || cols < width {
        return Err(ProcessingError::InvalidDimensions(format!(
            "reconstructed image is {cols}x{rows}, smaller than the {width}x{height} crop"
        )));
    }

    Ok(image.slice(s![..height, ..width, ..]).to_owned())
}

/// Blur with [`GAUSSIAN_5TAP`] and drop every odd row and column.
pub fn pyr_down(image: ArrayView3<f64>) -> Result<Array3<f64>, ProcessingError> {
    let (rows, cols, _) = image.dim();
    if rows < 2 || cols < 2 {
        return Err(ProcessingError::InvalidDimensions(format!(
            "cannot downsample a {cols}x{rows} image"
        )));
    }
    let rows_done = downsample_axis(image, Axis(0));
    Ok(downsample_axis(rows_done.view(), Axis(1)))
}

/// Double both axes.
pub fn pyr_up(image: ArrayView3<f64>) -> Array3<f64> {
    let rows_done = upsample_axis(image, Axis(0));
    upsample_axis(rows_done.view(), Axis(1))
}

fn downsample_axis(image: ArrayView3<f64>, axis: Axis) -> Array3<f64> {
    let n = image.len_of(axis);
    let out_len = n.div_ceil(2);
    let mut shape = image.raw_dim();
    shape[axis.index()] = out_len;

    let mut out = Array3::zeros(shape);
    for i in 0..out_len {
        let center = 2 * i as isize;
        let mut lane = out.index_axis_mut(axis, i);
        for (tap, &weight) in GAUSSIAN_5TAP.iter().enumerate() {
            let src = reflect101(center + tap as isize - 2, n);
            lane.scaled_add(weight, &image.index_axis(axis, src));
        }
    }
    out
}

// Zero insertion convolved with 2 * GAUSSIAN_5TAP:
//   out[2i]   = (src[i-1] + 6 src[i] + src[i+1]) / 8
//   out[2i+1] = (src[i] + src[i+1]) / 2
fn upsample_axis(image: ArrayView3<f64>, axis: Axis) -> Array3<f64> {
    let n = image.len_of(axis);
    let mut shape = image.raw_dim();
    shape[axis.index()] = 2 * n;

    let mut out = Array3::zeros(shape);
    for i in 0..n {
        let prev = image.index_axis(axis, reflect101(i as isize - 1, n));
        let here = image.index_axis(axis, i);
        let next = image.index_axis(axis, reflect101(i as isize + 1, n));

        {
            let mut even = out.index_axis_mut(axis, 2 * i);
            even.scaled_add(1.0 / 8.0, &prev);
            even.scaled_add(6.0 / 8.0, &here);
            even.scaled_add(1.0 / 8.0, &next);
        }
        let mut odd = out.index_axis_mut(axis, 2 * i + 1);
        odd.scaled_add(0.5, &here);
        odd.scaled_add(0.5, &next);
    }
    out
}

/// Reflect an out-of-range index around the edge sample (`dcb|abcd|cba`).
fn reflect101(i: isize, n: usize) -> usize {
    if n == 1 {
        return 0;
    }
    let n = n as isize;
    let period = 2 * (n - 1);
    let mut i = i.rem_euclid(period);
    if i >= n {
        i = period - i;
    }
    i as usize
}
