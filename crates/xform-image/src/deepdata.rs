//! Storage for "deep" pixels: variable-length per-pixel sample lists.
//!
//! A deep image stores, for every pixel, `nsamples` samples of `nchannels`
//! channel values each. Sample counts vary per pixel and must be allocated
//! before values are written. Allocation (`set_samples`) takes `&mut self`
//! and is **not** thread-safe; value reads and writes address samples that
//! already exist.
//!
//! Samples are stored as raw 32-bit patterns so float channels and unsigned
//! integer channels (ids, counts) share one buffer without lossy
//! reinterpretation; the accessor chosen must match the channel's declared
//! format.
//!
//! # Example
//!
//! ```rust
//! use xform_core::DataFormat;
//! use xform_image::DeepData;
//!
//! let mut deep = DeepData::new(4, vec![DataFormat::F32, DataFormat::U32]);
//! deep.set_samples(0, 2);
//! deep.set_deep_value(0, 0, 1, 0.25);
//! deep.set_deep_value_uint(0, 1, 1, 42);
//! assert_eq!(deep.deep_value(0, 0, 1), 0.25);
//! assert_eq!(deep.deep_value_uint(0, 1, 1), 42);
//! ```

use xform_core::{DataFormat, ImageSpec};

/// Deep pixel storage: per-pixel sample counts plus raw sample values.
#[derive(Debug, Clone, Default)]
pub struct DeepData {
    npixels: usize,
    channeltypes: Vec<DataFormat>,
    nsamples: Vec<u32>,
    /// Per-pixel raw values, channel-major: index `c * nsamples + s`.
    data: Vec<Vec<u32>>,
}

impl DeepData {
    /// Creates deep storage for `npixels` pixels with the given per-channel
    /// formats. All sample counts start at zero.
    pub fn new(npixels: usize, channeltypes: Vec<DataFormat>) -> Self {
        Self {
            npixels,
            channeltypes,
            nsamples: vec![0; npixels],
            data: vec![Vec::new(); npixels],
        }
    }

    /// Creates deep storage matching an image spec's data window and
    /// channel formats.
    pub fn from_spec(spec: &ImageSpec) -> Self {
        let npixels = spec.npixels() as usize;
        let channeltypes = (0..spec.nchannels as usize)
            .map(|c| spec.channelformat(c))
            .collect();
        Self::new(npixels, channeltypes)
    }

    /// Number of pixels.
    #[inline]
    pub fn pixels(&self) -> usize {
        self.npixels
    }

    /// Number of channels per sample.
    #[inline]
    pub fn channels(&self) -> usize {
        self.channeltypes.len()
    }

    /// Declared format of channel `c`.
    pub fn channeltype(&self, c: usize) -> DataFormat {
        self.channeltypes.get(c).copied().unwrap_or(DataFormat::F32)
    }

    /// Sample count of `pixel`.
    #[inline]
    pub fn samples(&self, pixel: usize) -> u32 {
        self.nsamples.get(pixel).copied().unwrap_or(0)
    }

    /// Sets the sample count of `pixel`, reallocating its value storage.
    /// Existing values of that pixel are discarded.
    ///
    /// Not thread-safe; callers performing parallel value copies must finish
    /// all allocation first.
    pub fn set_samples(&mut self, pixel: usize, nsamples: u32) {
        if pixel >= self.npixels {
            return;
        }
        self.nsamples[pixel] = nsamples;
        self.data[pixel] = vec![0u32; nsamples as usize * self.channeltypes.len()];
    }

    #[inline]
    fn idx(&self, pixel: usize, c: usize, s: usize) -> Option<usize> {
        let n = self.samples(pixel) as usize;
        if s < n && c < self.channeltypes.len() {
            Some(c * n + s)
        } else {
            None
        }
    }

    /// Reads sample `s` of channel `c` as a float.
    pub fn deep_value(&self, pixel: usize, c: usize, s: usize) -> f32 {
        match self.idx(pixel, c, s) {
            Some(i) => {
                let bits = self.data[pixel][i];
                if self.channeltype(c) == DataFormat::U32 {
                    bits as f32
                } else {
                    f32::from_bits(bits)
                }
            }
            None => 0.0,
        }
    }

    /// Reads sample `s` of channel `c` as an unsigned integer.
    pub fn deep_value_uint(&self, pixel: usize, c: usize, s: usize) -> u32 {
        match self.idx(pixel, c, s) {
            Some(i) => {
                let bits = self.data[pixel][i];
                if self.channeltype(c) == DataFormat::U32 {
                    bits
                } else {
                    f32::from_bits(bits) as u32
                }
            }
            None => 0,
        }
    }

    /// Writes sample `s` of channel `c` from a float.
    pub fn set_deep_value(&mut self, pixel: usize, c: usize, s: usize, value: f32) {
        if let Some(i) = self.idx(pixel, c, s) {
            self.data[pixel][i] = if self.channeltype(c) == DataFormat::U32 {
                value.max(0.0) as u32
            } else {
                value.to_bits()
            };
        }
    }

    /// Writes sample `s` of channel `c` from an unsigned integer.
    pub fn set_deep_value_uint(&mut self, pixel: usize, c: usize, s: usize, value: u32) {
        if let Some(i) = self.idx(pixel, c, s) {
            self.data[pixel][i] = if self.channeltype(c) == DataFormat::U32 {
                value
            } else {
                (value as f32).to_bits()
            };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allocation() {
        let mut deep = DeepData::new(6, vec![DataFormat::F32]);
        assert_eq!(deep.pixels(), 6);
        assert_eq!(deep.samples(3), 0);
        deep.set_samples(3, 5);
        assert_eq!(deep.samples(3), 5);
        // Reallocation discards old values.
        deep.set_deep_value(3, 0, 4, 1.5);
        deep.set_samples(3, 2);
        assert_eq!(deep.deep_value(3, 0, 1), 0.0);
    }

    #[test]
    fn test_float_and_uint_channels() {
        let mut deep = DeepData::new(1, vec![DataFormat::F16, DataFormat::U32]);
        deep.set_samples(0, 3);
        deep.set_deep_value(0, 0, 2, -0.75);
        deep.set_deep_value_uint(0, 1, 2, 7_000_000);
        assert_eq!(deep.deep_value(0, 0, 2), -0.75);
        assert_eq!(deep.deep_value_uint(0, 1, 2), 7_000_000);
        // Cross-format access converts numerically.
        assert_eq!(deep.deep_value(0, 1, 2), 7_000_000.0);
    }

    #[test]
    fn test_out_of_range_is_zero() {
        let deep = DeepData::new(2, vec![DataFormat::F32]);
        assert_eq!(deep.deep_value(0, 0, 0), 0.0);
        assert_eq!(deep.deep_value(9, 0, 0), 0.0);
        assert_eq!(deep.deep_value_uint(0, 3, 0), 0);
    }

    #[test]
    fn test_from_spec() {
        use xform_core::ImageSpec;
        let mut spec = ImageSpec::new(4, 2, 2, DataFormat::F32);
        spec.deep = true;
        spec.channel_formats = vec![DataFormat::F32, DataFormat::U32];
        let deep = DeepData::from_spec(&spec);
        assert_eq!(deep.pixels(), 8);
        assert_eq!(deep.channeltype(1), DataFormat::U32);
    }
}
