//! # xform-image
//!
//! Filtered 2D image resampling: affine warps, scaled resizes,
//! aspect-preserving fits, rotation, and fast nearest/bilinear resampling
//! over typed in-memory image buffers.
//!
//! # Modules
//!
//! - [`imagebuf`] - The [`ImageBuf`] pixel container: typed storage, wrap
//!   modes, interpolation, deep samples
//! - [`filter`] - The named reconstruction filter catalog ([`Filter2D`])
//! - [`deepdata`] - Variable-per-pixel deep sample storage
//! - [`algo`] - The operations: [`warp`], [`resize`], [`fit`], [`rotate`],
//!   [`resample`] and friends
//!
//! # Example
//!
//! ```rust
//! use xform_core::{DataFormat, ImageSpec, Roi};
//! use xform_image::{fit, resize, FillMode, FilterSpec, ImageBuf, InitializePixels};
//!
//! let src = ImageBuf::new(ImageSpec::new(64, 48, 3, DataFormat::F32), InitializePixels::Yes);
//!
//! // Scale to 32x24 with the ratio-aware default filter.
//! let half = resize(&src, FilterSpec::Auto, Some(Roi::new_2d(0, 32, 0, 24)), 0).unwrap();
//! assert_eq!((half.width(), half.height()), (32, 24));
//!
//! // Letterbox into a square frame.
//! let boxed = fit(
//!     &src,
//!     FilterSpec::Auto,
//!     FillMode::Letterbox,
//!     false,
//!     Some(Roi::new_2d(0, 32, 0, 32)),
//!     0,
//! )
//! .unwrap();
//! assert_eq!(boxed.spec().full_height, 32);
//! ```
//!
//! # Concurrency
//!
//! Every operation takes an `nthreads` argument: `0` uses the library's
//! default worker pool, `1` forces serial execution, and any other count
//! runs on a dedicated pool of that size. Destinations are partitioned into
//! disjoint tiles with no shared mutable state, so parallel results are
//! bit-identical to serial ones.

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod algo;
pub mod deepdata;
pub mod error;
pub mod filter;
pub mod imagebuf;

pub use algo::{
    fit, fit_into, parallel_image, resample, resample_into, resize, resize_into, rotate,
    rotate_around, rotate_around_into, rotate_into, transform_roi, warp, warp_into, FillMode,
    FilterSpec,
};
pub use deepdata::DeepData;
pub use error::{Error, Result};
pub use filter::{filter_descs, find_desc, Filter2D, FilterDesc};
pub use imagebuf::{ImageBuf, InitializePixels, WrapMode};

pub use xform_core::{DataFormat, ImageSpec, Matrix33, Roi};
