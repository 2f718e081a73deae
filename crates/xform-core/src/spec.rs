//! Image specification: geometry, channels, pixel format.
//!
//! [`ImageSpec`] is the "header" of an image buffer. It carries two windows:
//!
//! - the **data window** (`x`, `y`, `z`, `width`, `height`, `depth`) - the
//!   region for which pixels are actually stored;
//! - the **display window** (`full_x`, `full_y`, `full_width`, `full_height`)
//!   - the canonical frame of the image, which defines the NDC coordinate
//!   system used by scaled resampling.
//!
//! VFX workflows routinely use overscan, where the data window extends past
//! the display window, or crops, where it covers only part of it.
//!
//! ```text
//! ┌─────────────────────────────┐
//! │       Display window        │
//! │   ┌───────────────────┐     │
//! │   │    Data window    │     │
//! │   │  (stored pixels)  │     │
//! │   └───────────────────┘     │
//! └─────────────────────────────┘
//! ```

use crate::format::DataFormat;
use crate::roi::Roi;

/// Description of an image's geometry, channels, and pixel format.
///
/// # Example
///
/// ```rust
/// use xform_core::{DataFormat, ImageSpec};
///
/// let spec = ImageSpec::new(1920, 1080, 4, DataFormat::F16);
/// assert_eq!(spec.roi(), spec.roi_full());
/// assert_eq!(spec.channelformat(2), DataFormat::F16);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct ImageSpec {
    /// X origin of the data window.
    pub x: i32,
    /// Y origin of the data window.
    pub y: i32,
    /// Z origin of the data window.
    pub z: i32,
    /// Data window width in pixels.
    pub width: u32,
    /// Data window height in pixels.
    pub height: u32,
    /// Data window depth (1 for 2D images).
    pub depth: u32,
    /// X origin of the display (full) window.
    pub full_x: i32,
    /// Y origin of the display (full) window.
    pub full_y: i32,
    /// Display window width.
    pub full_width: u32,
    /// Display window height.
    pub full_height: u32,
    /// Number of channels per pixel.
    pub nchannels: u8,
    /// Data format shared by all channels unless overridden.
    pub format: DataFormat,
    /// Optional channel names (e.g. `["R", "G", "B", "A"]`).
    pub channel_names: Vec<String>,
    /// Optional per-channel format overrides (deep images use these).
    pub channel_formats: Vec<DataFormat>,
    /// Whether pixels hold variable-length deep sample lists.
    pub deep: bool,
}

impl ImageSpec {
    /// Creates a spec with data and display windows both at the origin with
    /// the given size.
    pub fn new(width: u32, height: u32, nchannels: u8, format: DataFormat) -> Self {
        Self {
            x: 0,
            y: 0,
            z: 0,
            width,
            height,
            depth: 1,
            full_x: 0,
            full_y: 0,
            full_width: width,
            full_height: height,
            nchannels,
            format,
            channel_names: Vec::new(),
            channel_formats: Vec::new(),
            deep: false,
        }
    }

    /// RGB spec, F16 (the VFX interchange default).
    pub fn rgb(width: u32, height: u32) -> Self {
        let mut spec = Self::new(width, height, 3, DataFormat::F16);
        spec.channel_names = vec!["R".into(), "G".into(), "B".into()];
        spec
    }

    /// RGBA spec, F16.
    pub fn rgba(width: u32, height: u32) -> Self {
        let mut spec = Self::new(width, height, 4, DataFormat::F16);
        spec.channel_names = vec!["R".into(), "G".into(), "B".into(), "A".into()];
        spec
    }

    /// Single-channel spec, F16.
    pub fn gray(width: u32, height: u32) -> Self {
        let mut spec = Self::new(width, height, 1, DataFormat::F16);
        spec.channel_names = vec!["Y".into()];
        spec
    }

    /// The data window as a region, with the full channel range.
    pub fn roi(&self) -> Roi {
        Roi::new(
            self.x,
            self.x + self.width as i32,
            self.y,
            self.y + self.height as i32,
            self.z,
            self.z + self.depth.max(1) as i32,
            0,
            self.nchannels as i32,
        )
    }

    /// The display window as a region, with the full channel range.
    pub fn roi_full(&self) -> Roi {
        Roi::new(
            self.full_x,
            self.full_x + self.full_width as i32,
            self.full_y,
            self.full_y + self.full_height as i32,
            self.z,
            self.z + self.depth.max(1) as i32,
            0,
            self.nchannels as i32,
        )
    }

    /// Sets the data window from a region. Channel range is ignored.
    pub fn set_roi(&mut self, roi: Roi) {
        self.x = roi.xbegin;
        self.y = roi.ybegin;
        self.z = roi.zbegin;
        self.width = roi.width() as u32;
        self.height = roi.height() as u32;
        self.depth = roi.depth().max(1) as u32;
    }

    /// Sets the display window from a region. Channel range is ignored.
    pub fn set_roi_full(&mut self, roi: Roi) {
        self.full_x = roi.xbegin;
        self.full_y = roi.ybegin;
        self.full_width = roi.width() as u32;
        self.full_height = roi.height() as u32;
    }

    /// Format of channel `c`, honoring per-channel overrides.
    pub fn channelformat(&self, c: usize) -> DataFormat {
        self.channel_formats.get(c).copied().unwrap_or(self.format)
    }

    /// Returns `true` for volumetric (depth > 1) images.
    #[inline]
    pub fn is_volume(&self) -> bool {
        self.depth > 1
    }

    /// Total pixel count of the data window.
    #[inline]
    pub fn npixels(&self) -> u64 {
        self.width as u64 * self.height as u64 * self.depth.max(1) as u64
    }
}

impl Default for ImageSpec {
    fn default() -> Self {
        Self::new(0, 0, 0, DataFormat::F32)
    }
}

impl std::fmt::Display for ImageSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}x{}{} {} {}ch{}",
            self.width,
            self.height,
            if self.depth > 1 {
                format!("x{}", self.depth)
            } else {
                String::new()
            },
            self.format,
            self.nchannels,
            if self.deep { " deep" } else { "" },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_windows_start_equal() {
        let spec = ImageSpec::new(640, 480, 3, DataFormat::F32);
        assert_eq!(spec.roi(), spec.roi_full());
        assert_eq!(spec.roi().width(), 640);
    }

    #[test]
    fn test_set_roi() {
        let mut spec = ImageSpec::new(640, 480, 3, DataFormat::F32);
        spec.set_roi(Roi::new_2d(-8, 648, -8, 488));
        assert_eq!(spec.x, -8);
        assert_eq!(spec.width, 656);
        // Display window untouched.
        assert_eq!(spec.full_width, 640);
    }

    #[test]
    fn test_channelformat_override() {
        let mut spec = ImageSpec::new(4, 4, 3, DataFormat::F32);
        spec.channel_formats = vec![DataFormat::F32, DataFormat::F32, DataFormat::U32];
        assert_eq!(spec.channelformat(0), DataFormat::F32);
        assert_eq!(spec.channelformat(2), DataFormat::U32);
        // Out of range falls back to the shared format.
        assert_eq!(spec.channelformat(7), DataFormat::F32);
    }

    #[test]
    fn test_constructors() {
        let rgba = ImageSpec::rgba(16, 8);
        assert_eq!(rgba.nchannels, 4);
        assert_eq!(rgba.format, DataFormat::F16);
        assert_eq!(rgba.channel_names[3], "A");
        assert!(!rgba.is_volume());
        let rgb = ImageSpec::rgb(16, 8);
        assert_eq!(rgb.nchannels, 3);
        let gray = ImageSpec::gray(16, 8);
        assert_eq!(gray.nchannels, 1);
        assert_eq!(gray.channel_names[0], "Y");
    }
}
