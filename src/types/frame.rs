//! Camera frame and face region types

use image::RgbImage;
use ndarray::{Array3, ArrayView3};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::processing::ProcessingError;

// ============================================================================
// Bounding Box
// ============================================================================

/// Face region in frame-pixel coordinates.
///
/// `x`/`y` may be negative or run past the frame edge; [`Frame::crop`]
/// clamps the box to the frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: i64,
    pub y: i64,
    pub width: u32,
    pub height: u32,
}

impl BoundingBox {
    pub fn new(x: i64, y: i64, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Intersection with a `frame_width x frame_height` frame as
    /// `(col_start, row_start, col_end, row_end)`, or `None` if empty.
    pub fn clamp_to(&self, frame_width: usize, frame_height: usize) -> Option<(usize, usize, usize, usize)> {
        let clamp = |v: i64, max: usize| v.clamp(0, max as i64) as usize;
        let x0 = clamp(self.x, frame_width);
        let y0 = clamp(self.y, frame_height);
        let x1 = clamp(self.x.saturating_add(i64::from(self.width)), frame_width);
        let y1 = clamp(self.y.saturating_add(i64::from(self.height)), frame_height);
        (x1 > x0 && y1 > y0).then_some((x0, y0, x1, y1))
    }
}

impl std::fmt::Display for BoundingBox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{},{} {}x{}", self.x, self.y, self.width, self.height)
    }
}

/// Parses `X,Y,W,H`.
impl FromStr for BoundingBox {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let fields: Vec<&str> = s.split(',').map(str::trim).collect();
        if fields.len() != 4 {
            return Err(format!("expected X,Y,W,H, got '{s}'"));
        }
        let x = fields[0]
            .parse::<i64>()
            .map_err(|e| format!("invalid x '{}': {e}", fields[0]))?;
        let y = fields[1]
            .parse::<i64>()
            .map_err(|e| format!("invalid y '{}': {e}", fields[1]))?;
        let width = fields[2]
            .parse::<u32>()
            .map_err(|e| format!("invalid width '{}': {e}", fields[2]))?;
        let height = fields[3]
            .parse::<u32>()
            .map_err(|e| format!("invalid height '{}': {e}", fields[3]))?;
        Ok(Self::new(x, y, width, height))
    }
}

// ============================================================================
// Frame
// ============================================================================

/// A decoded frame stored as `(rows, cols, channels)` bytes.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pixels: Array3<u8>,
    /// Sequence number assigned by the capture source
    pub index: u64,
    /// Capture time relative to stream start (ms)
    pub timestamp_ms: u64,
}

impl Frame {
    pub fn new(pixels: Array3<u8>, index: u64, timestamp_ms: u64) -> Self {
        Self {
            pixels,
            index,
            timestamp_ms,
        }
    }

    /// Uniform frame, mostly useful for tests and synthetic capture.
    pub fn filled(width: usize, height: usize, channels: usize, value: u8) -> Self {
        Self::new(Array3::from_elem((height, width, channels), value), 0, 0)
    }

    pub fn from_rgb_image(image: &RgbImage, index: u64, timestamp_ms: u64) -> Result<Self, ProcessingError> {
        let (width, height) = image.dimensions();
        let pixels = Array3::from_shape_vec(
            (height as usize, width as usize, 3),
            image.as_raw().clone(),
        )
        .map_err(|e| ProcessingError::InvalidDimensions(e.to_string()))?;
        Ok(Self::new(pixels, index, timestamp_ms))
    }

    /// Encode as an 8-bit RGB image; `None` unless the frame has 3 channels.
    pub fn to_rgb_image(&self) -> Option<RgbImage> {
        if self.channels() != 3 {
            return None;
        }
        let raw: Vec<u8> = self.pixels.iter().copied().collect();
        RgbImage::from_raw(self.width() as u32, self.height() as u32, raw)
    }

    pub fn width(&self) -> usize {
        self.pixels.dim().1
    }

    pub fn height(&self) -> usize {
        self.pixels.dim().0
    }

    pub fn channels(&self) -> usize {
        self.pixels.dim().2
    }

    pub fn is_empty(&self) -> bool {
        self.pixels.is_empty()
    }

    pub fn pixels(&self) -> ArrayView3<'_, u8> {
        self.pixels.view()
    }

    /// Cut out `region`, clamped to the frame.
    pub fn crop(&self, region: &BoundingBox) -> Result<Frame, ProcessingError> {
        let (x0, y0, x1, y1) = region
            .clamp_to(self.width(), self.height())
            .ok_or(ProcessingError::RegionOutOfBounds {
                x: region.x,
                y: region.y,
                width: region.width,
                height: region.height,
                frame_width: self.width(),
                frame_height: self.height(),
            })?;

        let pixels = self
            .pixels
            .slice(ndarray::s![y0..y1, x0..x1, ..])
            .to_owned();
        Ok(Frame::new(pixels, self.index, self.timestamp_ms))
    }

    /// Bilinear resize with pixel-centre alignment.
    pub fn resize(&self, width: usize, height: usize) -> Result<Frame, ProcessingError> {
        if self.is_empty() {
            return Err(ProcessingError::EmptyFrame);
        }
        if width == 0 || height == 0 {
            return Err(ProcessingError::InvalidDimensions(format!(
                "cannot resize to {width}x{height}"
            )));
        }
        if width == self.width() && height == self.height() {
            return Ok(self.clone());
        }

        let rows = sample_positions(self.height(), height);
        let cols = sample_positions(self.width(), width);
        let channels = self.channels();
        let src = &self.pixels;

        let pixels = Array3::from_shape_fn((height, width, channels), |(r, c, ch)| {
            let (r0, r1, wr) = rows[r];
            let (c0, c1, wc) = cols[c];
            let top = f64::from(src[[r0, c0, ch]]) * (1.0 - wc) + f64::from(src[[r0, c1, ch]]) * wc;
            let bottom = f64::from(src[[r1, c0, ch]]) * (1.0 - wc) + f64::from(src[[r1, c1, ch]]) * wc;
            saturate_u8(top * (1.0 - wr) + bottom * wr)
        });

        Ok(Frame::new(pixels, self.index, self.timestamp_ms))
    }

    pub fn to_f64(&self) -> Array3<f64> {
        self.pixels.mapv(f64::from)
    }

    /// Absolute value, rounded and saturated to `0..=255`.
    pub fn from_f64_saturating(values: ArrayView3<f64>, index: u64, timestamp_ms: u64) -> Self {
        Self::new(values.mapv(|v| saturate_u8(v.abs())), index, timestamp_ms)
    }
}

/// For each destination index: `(lower source, upper source, upper weight)`.
fn sample_positions(src_len: usize, dst_len: usize) -> Vec<(usize, usize, f64)> {
    let scale = src_len as f64 / dst_len as f64;
    let last = src_len - 1;
    (0..dst_len)
        .map(|d| {
            let pos = ((d as f64 + 0.5) * scale - 0.5).max(0.0);
            let lower = (pos.floor() as usize).min(last);
            let upper = (lower + 1).min(last);
            let weight = if lower == last { 0.0 } else { pos - lower as f64 };
            (lower, upper, weight)
        })
        .collect()
}

fn saturate_u8(v: f64) -> u8 {
    if v.is_nan() {
        return 0;
    }
    v.round().clamp(0.0, 255.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp(width: usize, height: usize) -> Frame {
        let pixels = Array3::from_shape_fn((height, width, 3), |(r, c, ch)| ((r * 10 + c + ch) % 256) as u8);
        Frame::new(pixels, 7, 700)
    }

    #[test]
    fn test_crop_inside_frame() {
        let frame = ramp(20, 10);
        let cropped = frame.crop(&BoundingBox::new(2, 3, 5, 4)).expect("crop");

        assert_eq!((cropped.width(), cropped.height()), (5, 4));
        assert_eq!(cropped.pixels()[[0, 0, 0]], frame.pixels()[[3, 2, 0]]);
        assert_eq!(cropped.index, 7);
    }

    #[test]
    fn test_crop_clamps_partial_overlap() {
        let frame = ramp(20, 10);
        let cropped = frame.crop(&BoundingBox::new(-5, 8, 10, 10)).expect("crop");
        assert_eq!((cropped.width(), cropped.height()), (5, 2));
    }

    #[test]
    fn test_crop_outside_frame_fails() {
        let frame = ramp(20, 10);
        let err = frame.crop(&BoundingBox::new(50, 50, 10, 10)).unwrap_err();
        assert!(matches!(err, ProcessingError::RegionOutOfBounds { .. }));
    }

    #[test]
    fn test_crop_with_extreme_origin_does_not_overflow() {
        let frame = ramp(10, 10);

        let far: BoundingBox = "9223372036854775800,0,100,10".parse().expect("parse");
        let err = frame.crop(&far).unwrap_err();
        assert!(matches!(err, ProcessingError::RegionOutOfBounds { .. }));

        let below = BoundingBox::new(i64::MIN, i64::MIN, u32::MAX, u32::MAX);
        let err = frame.crop(&below).unwrap_err();
        assert!(matches!(err, ProcessingError::RegionOutOfBounds { .. }));

        let huge = BoundingBox::new(2, 3, u32::MAX, u32::MAX);
        let cropped = frame.crop(&huge).expect("clamped crop");
        assert_eq!((cropped.width(), cropped.height()), (8, 7));
    }

    #[test]
    fn test_resize_same_size_is_identity() {
        let frame = ramp(16, 12);
        assert_eq!(frame.resize(16, 12).expect("resize"), frame);
    }

    #[test]
    fn test_resize_uniform_stays_uniform() {
        let frame = Frame::filled(64, 48, 3, 131);
        let resized = frame.resize(160, 120).expect("resize");
        assert_eq!((resized.width(), resized.height(), resized.channels()), (160, 120, 3));
        assert!(resized.pixels().iter().all(|&v| v == 131));
    }

    #[test]
    fn test_resize_downscale_averages_neighbours() {
        let pixels = Array3::from_shape_fn((2, 2, 1), |(_, c, _)| if c == 0 { 0 } else { 100 });
        let frame = Frame::new(pixels, 0, 0);
        let resized = frame.resize(1, 1).expect("resize");
        assert_eq!(resized.pixels()[[0, 0, 0]], 50);
    }

    #[test]
    fn test_saturating_conversion() {
        let values = Array3::from_shape_vec((1, 4, 1), vec![-12.4, 300.0, 127.5, f64::NAN]).expect("shape");
        let frame = Frame::from_f64_saturating(values.view(), 0, 0);
        let got: Vec<u8> = frame.pixels().iter().copied().collect();
        assert_eq!(got, vec![12, 255, 128, 0]);
    }

    #[test]
    fn test_rgb_image_round_trip_dimensions() {
        let frame = ramp(8, 6);
        let image = frame.to_rgb_image().expect("rgb");
        assert_eq!(image.dimensions(), (8, 6));
        let back = Frame::from_rgb_image(&image, 7, 700).expect("frame");
        assert_eq!(back, frame);
    }

    #[test]
    fn test_bounding_box_parse() {
        let parsed: BoundingBox = "10, 20,30,40".parse().expect("parse");
        assert_eq!(parsed, BoundingBox::new(10, 20, 30, 40));
        assert!("10,20,30".parse::<BoundingBox>().is_err());
        assert!("a,b,c,d".parse::<BoundingBox>().is_err());
    }
}
