//! Filtered geometric operations: warp, resize, fit, rotate, resample.
//!
//! Every operation comes in two forms: an in-place form writing into a
//! caller-provided destination (`*_into`), and a return form allocating a
//! fresh [`ImageBuf`]. The in-place forms prepare the destination themselves:
//! an uninitialized destination is allocated from the source spec with the
//! computed region as its data window.
//!
//! Failures are reported twice, deliberately: as the returned [`Error`] and
//! as a message recorded on the destination buffer.
//!
//! # Example
//!
//! ```rust
//! use xform_core::{DataFormat, ImageSpec, Roi};
//! use xform_image::{resize, FilterSpec, ImageBuf, InitializePixels};
//!
//! let src = ImageBuf::new(ImageSpec::new(4, 4, 3, DataFormat::F32), InitializePixels::Yes);
//! let dst = resize(
//!     &src,
//!     FilterSpec::Name { name: "triangle", width: None },
//!     Some(Roi::new_2d(0, 8, 0, 8)),
//!     1,
//! )
//! .unwrap();
//! assert_eq!(dst.width(), 8);
//! ```

mod dual;
mod fit;
pub mod parallel;
mod resample;
mod resize;
mod sample;
mod warp;

pub use fit::{fit, fit_into, FillMode};
pub use parallel::parallel_image;
pub use resample::{resample, resample_into};
pub use resize::{resize, resize_into};
pub use warp::{
    rotate, rotate_around, rotate_around_into, rotate_into, transform_roi, warp, warp_into,
};

use std::borrow::Cow;

use xform_core::Roi;

use crate::error::{Error, Result};
use crate::filter::{find_desc, Filter2D};
use crate::imagebuf::ImageBuf;

// ========================================================================
// Filter selection
// ========================================================================

/// How an operation should obtain its reconstruction filter.
#[derive(Debug, Clone, Copy, Default)]
pub enum FilterSpec<'a> {
    /// Let the operation pick its default (ratio-aware for resize and fit,
    /// `lanczos3` at width 6 for warp and rotate).
    #[default]
    Auto,
    /// Look up a catalog filter by name. Without an explicit width, the
    /// filter's nominal width is widened by `max(1, ratio)` per axis so that
    /// downsampling stays antialiased.
    Name {
        /// Catalog name, e.g. `"lanczos3"`.
        name: &'a str,
        /// Explicit full width overriding the default sizing on both axes.
        width: Option<f32>,
    },
    /// Use this exact filter.
    Filter(&'a Filter2D),
}

/// Resolves the filter for warp-family operations (no scale ratios).
pub(crate) fn resolve_warp_filter<'a>(spec: &FilterSpec<'a>) -> Result<Cow<'a, Filter2D>> {
    match spec {
        FilterSpec::Filter(f) => Ok(Cow::Borrowed(*f)),
        FilterSpec::Auto => create_named("lanczos3", 6.0, 6.0),
        FilterSpec::Name { name, width } => {
            let desc = find_desc(name).ok_or_else(|| Error::UnknownFilter((*name).into()))?;
            let w = width.unwrap_or(desc.width);
            create_named(name, w, w)
        }
    }
}

/// Resolves the filter for scaled operations. `wratio`/`hratio` are
/// destination-over-source full-window ratios; values below 1 mean
/// minification.
pub(crate) fn resolve_resize_filter<'a>(
    spec: &FilterSpec<'a>,
    wratio: f32,
    hratio: f32,
) -> Result<Cow<'a, Filter2D>> {
    match spec {
        FilterSpec::Filter(f) => Ok(Cow::Borrowed(*f)),
        FilterSpec::Auto => {
            let name = if wratio > 1.0 || hratio > 1.0 {
                "blackman-harris"
            } else {
                "lanczos3"
            };
            sized_named(name, None, wratio, hratio)
        }
        FilterSpec::Name { name, width } => sized_named(name, *width, wratio, hratio),
    }
}

fn sized_named(
    name: &str,
    width: Option<f32>,
    wratio: f32,
    hratio: f32,
) -> Result<Cow<'static, Filter2D>> {
    let desc = find_desc(name).ok_or_else(|| Error::UnknownFilter(name.into()))?;
    let w = width.unwrap_or(desc.width * wratio.max(1.0));
    let h = width.unwrap_or(desc.width * hratio.max(1.0));
    create_named(name, w, h)
}

fn create_named(name: &str, width: f32, height: f32) -> Result<Cow<'static, Filter2D>> {
    Filter2D::create(name, width, height)
        .map(Cow::Owned)
        .ok_or_else(|| Error::UnknownFilter(name.into()))
}

// ========================================================================
// Destination preparation
// ========================================================================

pub(crate) const NO_SUPPORT_VOLUME: u32 = 1 << 0;
pub(crate) const NO_COPY_ROI_FULL: u32 = 1 << 1;
pub(crate) const SUPPORT_DEEP: u32 = 1 << 2;

/// Prepares a destination for an operation.
///
/// Resolves the region (`None` means the destination's data window when the
/// destination is initialized, otherwise the source's), clamps its
/// channel range, enforces the volume/deep gates, and allocates an
/// uninitialized destination from the source spec: the computed region
/// becomes its data window, and its display window copies the source's
/// unless [`NO_COPY_ROI_FULL`] is set, in which case it equals the region.
pub(crate) fn prep(
    roi: Option<Roi>,
    dst: &mut ImageBuf,
    src: &ImageBuf,
    flags: u32,
) -> Result<Roi> {
    if !src.initialized() {
        return Err(Error::IncompatibleSpec("source image is uninitialized".into()));
    }
    if let Some(msg) = src.geterror() {
        return Err(Error::Buffer(msg));
    }
    let mut roi = match roi {
        Some(r) => r,
        None if dst.initialized() => dst.roi(),
        None => src.roi(),
    };
    if !roi.defined() {
        return Err(Error::IncompatibleSpec(format!("region {roi} is empty")));
    }
    roi.chbegin = roi.chbegin.max(0);
    roi.chend = roi.chend.min(src.nchannels() as i32);

    if flags & NO_SUPPORT_VOLUME != 0 && (roi.depth() > 1 || src.spec().is_volume()) {
        return Err(Error::UnsupportedGeometry(
            "volumes are not supported by this operation".into(),
        ));
    }
    if src.deep() && flags & SUPPORT_DEEP == 0 {
        return Err(Error::UnsupportedGeometry(
            "deep images are not supported by this operation".into(),
        ));
    }

    if !dst.initialized() {
        let mut spec = src.spec().clone();
        spec.set_roi(roi);
        if flags & NO_COPY_ROI_FULL != 0 {
            spec.set_roi_full(roi);
        }
        dst.reset(spec);
    } else {
        if flags & NO_SUPPORT_VOLUME != 0 && dst.spec().is_volume() {
            return Err(Error::UnsupportedGeometry(
                "volumes are not supported by this operation".into(),
            ));
        }
        if dst.deep() != src.deep() {
            return Err(Error::IncompatibleSpec(
                "source and destination deep/flat kinds do not match".into(),
            ));
        }
        if dst.deep() && flags & SUPPORT_DEEP == 0 {
            return Err(Error::UnsupportedGeometry(
                "deep images are not supported by this operation".into(),
            ));
        }
        roi.chend = roi.chend.min(dst.nchannels() as i32);
    }
    Ok(roi)
}

// ========================================================================
// Shared helpers
// ========================================================================

/// Splits a continuous coordinate into its integer floor and fraction.
#[inline]
pub(crate) fn floorfrac(v: f32) -> (i32, f32) {
    let f = v.floor();
    (f as i32, v - f)
}

/// Records an operation failure on the destination buffer.
pub(crate) fn record_error(dst: &ImageBuf, result: &Result<()>) {
    if let Err(e) = result {
        dst.error(e.to_string());
    }
}

// ========================================================================
// Pixel-type dispatch
// ========================================================================

// Expands a kernel call over all source formats with the destination type
// fixed. The counterpart of the original's common-type dispatch: every
// (destination, source) scalar pair gets its own monomorphized kernel.
macro_rules! dispatch_src {
    ($D:ty, $srcfmt:expr, $kern:ident, ($($arg:expr),* $(,)?)) => {
        match $srcfmt {
            xform_core::DataFormat::U8 => $kern::<$D, u8>($($arg),*),
            xform_core::DataFormat::U16 => $kern::<$D, u16>($($arg),*),
            xform_core::DataFormat::U32 => $kern::<$D, u32>($($arg),*),
            xform_core::DataFormat::F16 => $kern::<$D, half::f16>($($arg),*),
            xform_core::DataFormat::F32 => $kern::<$D, f32>($($arg),*),
            xform_core::DataFormat::F64 => $kern::<$D, f64>($($arg),*),
        }
    };
}

macro_rules! dispatch_types2 {
    ($dstfmt:expr, $srcfmt:expr, $kern:ident, ($($arg:expr),* $(,)?)) => {{
        let src_format = $srcfmt;
        match $dstfmt {
            xform_core::DataFormat::U8 =>
                crate::algo::dispatch_src!(u8, src_format, $kern, ($($arg),*)),
            xform_core::DataFormat::U16 =>
                crate::algo::dispatch_src!(u16, src_format, $kern, ($($arg),*)),
            xform_core::DataFormat::U32 =>
                crate::algo::dispatch_src!(u32, src_format, $kern, ($($arg),*)),
            xform_core::DataFormat::F16 =>
                crate::algo::dispatch_src!(half::f16, src_format, $kern, ($($arg),*)),
            xform_core::DataFormat::F32 =>
                crate::algo::dispatch_src!(f32, src_format, $kern, ($($arg),*)),
            xform_core::DataFormat::F64 =>
                crate::algo::dispatch_src!(f64, src_format, $kern, ($($arg),*)),
        }
    }};
}

pub(crate) use {dispatch_src, dispatch_types2};
