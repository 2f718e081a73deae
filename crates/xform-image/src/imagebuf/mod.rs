//! In-memory image buffer with typed storage and wrap-mode pixel access.
//!
//! [`ImageBuf`] owns an [`ImageSpec`] plus densely packed pixel storage in
//! the spec's format (or deep sample lists for deep images). Access comes in
//! two flavors:
//!
//! - a dynamic `f32` API ([`ImageBuf::getpixel`], [`ImageBuf::setpixel`],
//!   [`ImageBuf::interppixel`]) that converts on the fly, used by tests and
//!   cold paths;
//! - typed views (`SrcView<S>` / `DstView<D>`, crate-internal) that the
//!   monomorphized resampling kernels read and write through.
//!
//! # Concurrency contract
//!
//! `ImageBuf` is `Sync`. Concurrent *reads* are always safe. Concurrent
//! *writes* happen only through `DstView`, whose unsafe constructor
//! establishes the contract that each worker writes a disjoint set of
//! pixels; the tile dispatcher upholds this by construction. Safe `&mut`
//! methods remain available for serial mutation.
//!
//! # Example
//!
//! ```rust
//! use xform_core::{DataFormat, ImageSpec};
//! use xform_image::{ImageBuf, InitializePixels, WrapMode};
//!
//! let spec = ImageSpec::new(16, 16, 3, DataFormat::F32);
//! let mut buf = ImageBuf::new(spec, InitializePixels::Yes);
//! buf.setpixel(4, 4, 0, &[1.0, 0.5, 0.25]);
//!
//! let mut pixel = [0.0f32; 3];
//! buf.getpixel(4, 4, 0, &mut pixel, WrapMode::Black);
//! assert_eq!(pixel, [1.0, 0.5, 0.25]);
//! ```

mod iterators;
mod storage;

pub use iterators::{PixelIterator, TileIterator};
pub use storage::{Accumulator, PixelScalar, PixelStorage};

use std::cell::UnsafeCell;
use std::sync::Mutex;

use xform_core::{DataFormat, ImageSpec, Roi};

/// Controls whether pixels are zero-initialized on allocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InitializePixels {
    /// Leave allocation to the storage default.
    No,
    /// Zero all pixels.
    #[default]
    Yes,
}

/// Policy for synthesizing pixel reads outside the data window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WrapMode {
    /// Resolves to [`WrapMode::Black`].
    #[default]
    Default,
    /// Out-of-bounds reads are zero.
    Black,
    /// Out-of-bounds reads clamp to the nearest edge pixel.
    Clamp,
    /// The image tiles periodically.
    Periodic,
    /// The image reflects at its edges.
    Mirror,
}

impl WrapMode {
    /// Resolves local (origin-relative) coordinates under this wrap mode.
    ///
    /// Returns `None` when the read should synthesize black.
    #[inline]
    pub fn wrap(&self, x: i32, y: i32, width: i32, height: i32) -> Option<(i32, i32)> {
        if width <= 0 || height <= 0 {
            return None;
        }
        match self {
            WrapMode::Default | WrapMode::Black => {
                if x >= 0 && x < width && y >= 0 && y < height {
                    Some((x, y))
                } else {
                    None
                }
            }
            WrapMode::Clamp => Some((x.clamp(0, width - 1), y.clamp(0, height - 1))),
            WrapMode::Periodic => Some((x.rem_euclid(width), y.rem_euclid(height))),
            WrapMode::Mirror => Some((mirror_coord(x, width), mirror_coord(y, height))),
        }
    }
}

fn mirror_coord(c: i32, size: i32) -> i32 {
    let c = c.rem_euclid(2 * size);
    if c >= size {
        2 * size - c - 1
    } else {
        c
    }
}

/// An in-memory image: spec, pixels, and a last-error slot.
pub struct ImageBuf {
    spec: ImageSpec,
    pixels: UnsafeCell<PixelStorage>,
    error: Mutex<Option<String>>,
}

// Reads are lock-free over immutable storage; writes go through &mut self or
// through DstView / deep_mut_unsync, whose constructors carry the
// disjoint-tiles contract.
unsafe impl Send for ImageBuf {}
unsafe impl Sync for ImageBuf {}

impl Default for ImageBuf {
    fn default() -> Self {
        Self::new_uninit()
    }
}

impl Clone for ImageBuf {
    fn clone(&self) -> Self {
        Self {
            spec: self.spec.clone(),
            pixels: UnsafeCell::new(self.storage().clone()),
            error: Mutex::new(None),
        }
    }
}

impl std::fmt::Debug for ImageBuf {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageBuf")
            .field("spec", &self.spec.to_string())
            .field("initialized", &self.initialized())
            .finish()
    }
}

impl ImageBuf {
    /// Creates an uninitialized buffer; a later [`ImageBuf::reset`] (or an
    /// operation's destination preparation) gives it storage.
    pub fn new_uninit() -> Self {
        Self {
            spec: ImageSpec::default(),
            pixels: UnsafeCell::new(PixelStorage::Empty),
            error: Mutex::new(None),
        }
    }

    /// Creates a buffer with allocated storage for `spec`.
    pub fn new(spec: ImageSpec, _zero: InitializePixels) -> Self {
        let pixels = PixelStorage::allocate(&spec);
        Self {
            spec,
            pixels: UnsafeCell::new(pixels),
            error: Mutex::new(None),
        }
    }

    /// Drops any existing pixels and reallocates storage for `spec`.
    pub fn reset(&mut self, spec: ImageSpec) {
        *self.pixels.get_mut() = PixelStorage::allocate(&spec);
        self.spec = spec;
    }

    #[inline]
    pub(crate) fn storage(&self) -> &PixelStorage {
        // Sound under the concurrency contract in the module docs.
        unsafe { &*self.pixels.get() }
    }

    /// Returns `true` once the buffer has pixel storage.
    pub fn initialized(&self) -> bool {
        !self.storage().is_empty()
    }

    // =====================================================================
    // Spec access
    // =====================================================================

    /// The image specification.
    #[inline]
    pub fn spec(&self) -> &ImageSpec {
        &self.spec
    }

    /// Data window region.
    pub fn roi(&self) -> Roi {
        self.spec.roi()
    }

    /// Display window region.
    pub fn roi_full(&self) -> Roi {
        self.spec.roi_full()
    }

    /// Data window width.
    #[inline]
    pub fn width(&self) -> u32 {
        self.spec.width
    }

    /// Data window height.
    #[inline]
    pub fn height(&self) -> u32 {
        self.spec.height
    }

    /// Channels per pixel.
    #[inline]
    pub fn nchannels(&self) -> u8 {
        self.spec.nchannels
    }

    /// First column of the data window.
    #[inline]
    pub fn xbegin(&self) -> i32 {
        self.spec.x
    }

    /// One past the last column of the data window.
    #[inline]
    pub fn xend(&self) -> i32 {
        self.spec.x + self.spec.width as i32
    }

    /// First row of the data window.
    #[inline]
    pub fn ybegin(&self) -> i32 {
        self.spec.y
    }

    /// One past the last row of the data window.
    #[inline]
    pub fn yend(&self) -> i32 {
        self.spec.y + self.spec.height as i32
    }

    /// Pixel storage format.
    #[inline]
    pub fn format(&self) -> DataFormat {
        self.spec.format
    }

    /// Whether this is a deep image.
    #[inline]
    pub fn deep(&self) -> bool {
        self.spec.deep
    }

    /// Moves the data window origin without touching pixels. The Fitter uses
    /// this to seat a resized image inside a larger display window.
    pub fn set_origin(&mut self, x: i32, y: i32) {
        self.spec.x = x;
        self.spec.y = y;
    }

    /// Replaces the display window.
    pub fn set_roi_full(&mut self, roi: Roi) {
        self.spec.set_roi_full(roi);
    }

    // =====================================================================
    // Error slot
    // =====================================================================

    /// Records an error message on this buffer (replacing any previous one).
    pub fn error(&self, msg: impl Into<String>) {
        if let Ok(mut slot) = self.error.lock() {
            *slot = Some(msg.into());
        }
    }

    /// The last recorded error message, if any.
    pub fn geterror(&self) -> Option<String> {
        self.error.lock().ok().and_then(|slot| slot.clone())
    }

    /// Returns `true` if an error message is recorded.
    pub fn has_error(&self) -> bool {
        self.error.lock().map(|slot| slot.is_some()).unwrap_or(false)
    }

    /// Clears the error slot.
    pub fn clear_error(&self) {
        if let Ok(mut slot) = self.error.lock() {
            *slot = None;
        }
    }

    // =====================================================================
    // Dynamic (f32) pixel access
    // =====================================================================

    /// Flat channel-0 index of `(x, y, z)` if inside the data window.
    #[inline]
    fn pixel_index(&self, x: i32, y: i32, z: i32) -> Option<usize> {
        let spec = &self.spec;
        let lx = x - spec.x;
        let ly = y - spec.y;
        let lz = z - spec.z;
        if lx < 0
            || ly < 0
            || lz < 0
            || lx >= spec.width as i32
            || ly >= spec.height as i32
            || lz >= spec.depth.max(1) as i32
        {
            return None;
        }
        let pix = (lz as usize * spec.height as usize + ly as usize) * spec.width as usize
            + lx as usize;
        Some(pix * spec.nchannels as usize)
    }

    /// Reads one channel with the given wrap mode.
    pub fn getchannel(&self, x: i32, y: i32, z: i32, c: usize, wrap: WrapMode) -> f32 {
        if c >= self.spec.nchannels as usize {
            return 0.0;
        }
        let spec = &self.spec;
        match wrap.wrap(x - spec.x, y - spec.y, spec.width as i32, spec.height as i32) {
            Some((lx, ly)) => match self.pixel_index(lx + spec.x, ly + spec.y, z) {
                Some(idx) => self.storage().get_channel(idx + c),
                None => 0.0,
            },
            None => 0.0,
        }
    }

    /// Reads all channels of a pixel into `pixel`, converting to `f32`.
    pub fn getpixel(&self, x: i32, y: i32, z: i32, pixel: &mut [f32], wrap: WrapMode) {
        for p in pixel.iter_mut() {
            *p = 0.0;
        }
        let spec = &self.spec;
        let resolved = wrap.wrap(x - spec.x, y - spec.y, spec.width as i32, spec.height as i32);
        if let Some((lx, ly)) = resolved {
            if let Some(idx) = self.pixel_index(lx + spec.x, ly + spec.y, z) {
                let n = (spec.nchannels as usize).min(pixel.len());
                let storage = self.storage();
                for (c, p) in pixel.iter_mut().take(n).enumerate() {
                    *p = storage.get_channel(idx + c);
                }
            }
        }
    }

    /// Writes all channels of a pixel from `f32` values. Writes outside the
    /// data window are ignored.
    pub fn setpixel(&mut self, x: i32, y: i32, z: i32, pixel: &[f32]) {
        if let Some(idx) = self.pixel_index(x, y, z) {
            let n = (self.spec.nchannels as usize).min(pixel.len());
            let storage = self.pixels.get_mut();
            for (c, v) in pixel.iter().take(n).enumerate() {
                storage.set_channel(idx + c, *v);
            }
        }
    }

    /// Bilinear interpolation at continuous coordinates, where pixel centers
    /// sit at half-integer positions: `interppixel(x + 0.5, y + 0.5, ..)`
    /// reproduces pixel `(x, y)` exactly.
    pub fn interppixel(&self, x: f32, y: f32, pixel: &mut [f32], wrap: WrapMode) {
        let xs = x - 0.5;
        let ys = y - 0.5;
        let x0 = xs.floor();
        let y0 = ys.floor();
        let fx = xs - x0;
        let fy = ys - y0;
        let (x0, y0) = (x0 as i32, y0 as i32);

        let nch = self.spec.nchannels as usize;
        let mut p00 = vec![0.0f32; nch];
        let mut p10 = vec![0.0f32; nch];
        let mut p01 = vec![0.0f32; nch];
        let mut p11 = vec![0.0f32; nch];
        self.getpixel(x0, y0, 0, &mut p00, wrap);
        self.getpixel(x0 + 1, y0, 0, &mut p10, wrap);
        self.getpixel(x0, y0 + 1, 0, &mut p01, wrap);
        self.getpixel(x0 + 1, y0 + 1, 0, &mut p11, wrap);

        for (c, p) in pixel.iter_mut().take(nch).enumerate() {
            let top = p00[c] * (1.0 - fx) + p10[c] * fx;
            let bottom = p01[c] * (1.0 - fx) + p11[c] * fx;
            *p = top * (1.0 - fy) + bottom * fy;
        }
    }

    /// Copies pixels from `src` over the given region (default: this
    /// buffer's data window), converting formats as needed.
    pub fn copy_pixels(&mut self, src: &ImageBuf, roi: Option<Roi>) {
        let roi = roi.unwrap_or_else(|| self.roi());
        let nch = self.spec.nchannels as usize;
        let mut pixel = vec![0.0f32; nch];
        for z in roi.zbegin..roi.zend {
            for y in roi.ybegin..roi.yend {
                for x in roi.xbegin..roi.xend {
                    src.getpixel(x, y, z, &mut pixel, WrapMode::Black);
                    self.setpixel(x, y, z, &pixel);
                }
            }
        }
    }

    // =====================================================================
    // Deep access
    // =====================================================================

    #[inline]
    fn deep_pixel_index(&self, x: i32, y: i32) -> Option<usize> {
        let spec = &self.spec;
        let lx = x - spec.x;
        let ly = y - spec.y;
        if lx < 0 || ly < 0 || lx >= spec.width as i32 || ly >= spec.height as i32 {
            None
        } else {
            Some(ly as usize * spec.width as usize + lx as usize)
        }
    }

    /// Sample count of a deep pixel (0 outside the data window or for flat
    /// images).
    pub fn deep_samples(&self, x: i32, y: i32) -> u32 {
        match (self.deep_pixel_index(x, y), self.storage().deep()) {
            (Some(p), Some(d)) => d.samples(p),
            _ => 0,
        }
    }

    /// Allocates the sample count of a deep pixel. Serial only.
    pub fn set_deep_samples(&mut self, x: i32, y: i32, nsamples: u32) {
        if let Some(p) = self.deep_pixel_index(x, y) {
            if let Some(d) = self.pixels.get_mut().deep_mut() {
                d.set_samples(p, nsamples);
            }
        }
    }

    /// Reads a deep sample as a float.
    pub fn deep_value(&self, x: i32, y: i32, c: usize, sample: usize) -> f32 {
        match (self.deep_pixel_index(x, y), self.storage().deep()) {
            (Some(p), Some(d)) => d.deep_value(p, c, sample),
            _ => 0.0,
        }
    }

    /// Reads a deep sample as an unsigned integer.
    pub fn deep_value_uint(&self, x: i32, y: i32, c: usize, sample: usize) -> u32 {
        match (self.deep_pixel_index(x, y), self.storage().deep()) {
            (Some(p), Some(d)) => d.deep_value_uint(p, c, sample),
            _ => 0,
        }
    }

    /// Writes a deep sample from a float.
    pub fn set_deep_value(&mut self, x: i32, y: i32, c: usize, sample: usize, value: f32) {
        if let Some(p) = self.deep_pixel_index(x, y) {
            if let Some(d) = self.pixels.get_mut().deep_mut() {
                d.set_deep_value(p, c, sample, value);
            }
        }
    }

    /// Writes a deep sample from an unsigned integer.
    pub fn set_deep_value_uint(&mut self, x: i32, y: i32, c: usize, sample: usize, value: u32) {
        if let Some(p) = self.deep_pixel_index(x, y) {
            if let Some(d) = self.pixels.get_mut().deep_mut() {
                d.set_deep_value_uint(p, c, sample, value);
            }
        }
    }

    /// Deep sample write through a shared reference, for the tile-parallel
    /// value-copy pass.
    ///
    /// # Safety
    ///
    /// Callers must guarantee that concurrent writers touch disjoint pixels
    /// and that no sample allocation happens concurrently.
    pub(crate) unsafe fn set_deep_value_unsync(
        &self,
        x: i32,
        y: i32,
        c: usize,
        sample: usize,
        value: f32,
    ) {
        if let Some(p) = self.deep_pixel_index(x, y) {
            if let Some(d) = (*self.pixels.get()).deep_mut() {
                d.set_deep_value(p, c, sample, value);
            }
        }
    }

    /// Unsigned variant of [`ImageBuf::set_deep_value_unsync`].
    ///
    /// # Safety
    ///
    /// Same contract as [`ImageBuf::set_deep_value_unsync`].
    pub(crate) unsafe fn set_deep_value_uint_unsync(
        &self,
        x: i32,
        y: i32,
        c: usize,
        sample: usize,
        value: u32,
    ) {
        if let Some(p) = self.deep_pixel_index(x, y) {
            if let Some(d) = (*self.pixels.get()).deep_mut() {
                d.set_deep_value_uint(p, c, sample, value);
            }
        }
    }

    // =====================================================================
    // Typed views
    // =====================================================================

    /// Borrows a typed read view, or `None` when the storage format does not
    /// match `S` (deep buffers never match).
    pub(crate) fn src_view<S: PixelScalar>(&self) -> Option<SrcView<'_, S>> {
        let data = S::slice_of(self.storage())?;
        let spec = &self.spec;
        Some(SrcView {
            data,
            x0: spec.x,
            y0: spec.y,
            w: spec.width as i32,
            h: spec.height as i32,
            nch: spec.nchannels as usize,
        })
    }

    /// Borrows a typed write view over this buffer's storage.
    ///
    /// # Safety
    ///
    /// The caller promises that all concurrent writers obtained from this
    /// buffer write disjoint pixels, and that no reader observes the written
    /// region until the operation completes.
    pub(crate) unsafe fn dst_view<D: PixelScalar>(&self) -> Option<DstView<D>> {
        let storage = &mut *self.pixels.get();
        let data = D::slice_of_mut(storage)?;
        let spec = &self.spec;
        Some(DstView {
            ptr: data.as_mut_ptr(),
            x0: spec.x,
            y0: spec.y,
            w: spec.width as i32,
            h: spec.height as i32,
            nch: spec.nchannels as usize,
        })
    }
}

/// Typed read-only view over a flat (non-deep) buffer's 2D plane.
pub(crate) struct SrcView<'a, S> {
    data: &'a [S],
    x0: i32,
    y0: i32,
    w: i32,
    h: i32,
    nch: usize,
}

impl<'a, S: PixelScalar> SrcView<'a, S> {
    /// First column of the data window.
    #[inline]
    pub fn xbegin(&self) -> i32 {
        self.x0
    }

    /// One past the last column.
    #[inline]
    pub fn xend(&self) -> i32 {
        self.x0 + self.w
    }

    /// First row of the data window.
    #[inline]
    pub fn ybegin(&self) -> i32 {
        self.y0
    }

    /// One past the last row.
    #[inline]
    pub fn yend(&self) -> i32 {
        self.y0 + self.h
    }

    /// Channels per pixel.
    #[inline]
    pub fn nchannels(&self) -> usize {
        self.nch
    }

    /// Channel slice of the pixel at `(x, y)` under `wrap`; `None` means the
    /// read synthesizes black.
    #[inline]
    pub fn pixel(&self, x: i32, y: i32, wrap: WrapMode) -> Option<&[S]> {
        let (lx, ly) = wrap.wrap(x - self.x0, y - self.y0, self.w, self.h)?;
        let idx = (ly as usize * self.w as usize + lx as usize) * self.nch;
        Some(&self.data[idx..idx + self.nch])
    }

    /// Bilinear interpolation with half-integer pixel centers, writing `f32`
    /// channel values into `out`.
    pub fn interp(&self, x: f32, y: f32, wrap: WrapMode, out: &mut [f32]) {
        let xs = x - 0.5;
        let ys = y - 0.5;
        let x0 = xs.floor();
        let y0 = ys.floor();
        let fx = xs - x0;
        let fy = ys - y0;
        let (x0, y0) = (x0 as i32, y0 as i32);

        for v in out.iter_mut() {
            *v = 0.0;
        }
        let corners = [
            (self.pixel(x0, y0, wrap), (1.0 - fx) * (1.0 - fy)),
            (self.pixel(x0 + 1, y0, wrap), fx * (1.0 - fy)),
            (self.pixel(x0, y0 + 1, wrap), (1.0 - fx) * fy),
            (self.pixel(x0 + 1, y0 + 1, wrap), fx * fy),
        ];
        for (pix, w) in corners {
            if let Some(p) = pix {
                for (c, v) in out.iter_mut().take(self.nch.min(p.len())).enumerate() {
                    *v += w * p[c].to_f32();
                }
            }
        }
    }
}

/// Typed write view over a flat buffer, shared across tile workers.
///
/// Writes go through a raw pointer; the unsafe constructor
/// ([`ImageBuf::dst_view`]) carries the disjoint-tiles contract that makes
/// the `Sync` impl sound.
pub(crate) struct DstView<D> {
    ptr: *mut D,
    x0: i32,
    y0: i32,
    w: i32,
    h: i32,
    nch: usize,
}

unsafe impl<D: PixelScalar> Send for DstView<D> {}
unsafe impl<D: PixelScalar> Sync for DstView<D> {}

impl<D: PixelScalar> DstView<D> {
    /// Writes channel `c` of the pixel at `(x, y)`. Writes outside the data
    /// window or channel range are dropped.
    #[inline]
    pub fn set(&self, x: i32, y: i32, c: usize, v: D) {
        let lx = x - self.x0;
        let ly = y - self.y0;
        if lx < 0 || ly < 0 || lx >= self.w || ly >= self.h || c >= self.nch {
            return;
        }
        let idx = (ly as usize * self.w as usize + lx as usize) * self.nch + c;
        unsafe { *self.ptr.add(idx) = v }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gradient(w: u32, h: u32) -> ImageBuf {
        let spec = ImageSpec::new(w, h, 1, DataFormat::F32);
        let mut buf = ImageBuf::new(spec, InitializePixels::Yes);
        for y in 0..h as i32 {
            for x in 0..w as i32 {
                buf.setpixel(x, y, 0, &[(x + y * w as i32) as f32]);
            }
        }
        buf
    }

    #[test]
    fn test_get_set_roundtrip() {
        let mut buf = ImageBuf::new(ImageSpec::new(8, 8, 3, DataFormat::F32), InitializePixels::Yes);
        buf.setpixel(2, 5, 0, &[0.1, 0.2, 0.3]);
        let mut p = [0.0f32; 3];
        buf.getpixel(2, 5, 0, &mut p, WrapMode::Black);
        assert_eq!(p, [0.1, 0.2, 0.3]);
        assert_eq!(buf.getchannel(2, 5, 0, 1, WrapMode::Black), 0.2);
        assert_eq!(buf.getchannel(2, 5, 0, 7, WrapMode::Black), 0.0);
    }

    #[test]
    fn test_wrap_modes() {
        let buf = gradient(4, 4);
        let mut p = [0.0f32];
        buf.getpixel(-1, 0, 0, &mut p, WrapMode::Black);
        assert_eq!(p[0], 0.0);
        buf.getpixel(-1, 0, 0, &mut p, WrapMode::Clamp);
        assert_eq!(p[0], 0.0); // clamps to pixel (0, 0)
        buf.getpixel(-1, 2, 0, &mut p, WrapMode::Clamp);
        assert_eq!(p[0], 8.0);
        buf.getpixel(4, 0, 0, &mut p, WrapMode::Periodic);
        assert_eq!(p[0], 0.0); // wraps to column 0
        buf.getpixel(-1, 0, 0, &mut p, WrapMode::Mirror);
        assert_eq!(p[0], 0.0); // reflects to column 0
        buf.getpixel(-2, 0, 0, &mut p, WrapMode::Mirror);
        assert_eq!(p[0], 1.0);
    }

    #[test]
    fn test_offset_data_window() {
        let mut spec = ImageSpec::new(4, 4, 1, DataFormat::F32);
        spec.x = 10;
        spec.y = 20;
        let mut buf = ImageBuf::new(spec, InitializePixels::Yes);
        buf.setpixel(10, 20, 0, &[7.0]);
        let mut p = [0.0f32];
        buf.getpixel(10, 20, 0, &mut p, WrapMode::Black);
        assert_eq!(p[0], 7.0);
        // (0, 0) is outside the data window.
        buf.getpixel(0, 0, 0, &mut p, WrapMode::Black);
        assert_eq!(p[0], 0.0);
    }

    #[test]
    fn test_interppixel_centers() {
        let buf = gradient(4, 4);
        let mut p = [0.0f32];
        // Sampling at a pixel center reproduces the pixel.
        buf.interppixel(1.5, 2.5, &mut p, WrapMode::Clamp);
        assert!((p[0] - 9.0).abs() < 1e-5);
        // Halfway between two horizontal neighbors averages them.
        buf.interppixel(2.0, 0.5, &mut p, WrapMode::Clamp);
        assert!((p[0] - 1.5).abs() < 1e-5);
    }

    #[test]
    fn test_error_slot() {
        let buf = ImageBuf::new_uninit();
        assert!(!buf.has_error());
        buf.error("something failed");
        assert_eq!(buf.geterror().as_deref(), Some("something failed"));
        buf.clear_error();
        assert!(!buf.has_error());
    }

    #[test]
    fn test_src_view_typed_reads() {
        let buf = gradient(4, 2);
        let view = buf.src_view::<f32>().unwrap();
        assert_eq!(view.pixel(3, 1, WrapMode::Black).unwrap()[0], 7.0);
        assert!(view.pixel(4, 1, WrapMode::Black).is_none());
        assert_eq!(view.pixel(4, 1, WrapMode::Clamp).unwrap()[0], 7.0);
        // Format mismatch yields no view.
        assert!(buf.src_view::<half::f16>().is_none());
    }

    #[test]
    fn test_dst_view_writes() {
        let buf = ImageBuf::new(ImageSpec::new(4, 4, 2, DataFormat::F32), InitializePixels::Yes);
        let view = unsafe { buf.dst_view::<f32>() }.unwrap();
        view.set(1, 2, 1, 5.0);
        view.set(9, 9, 0, 1.0); // dropped
        let mut p = [0.0f32; 2];
        buf.getpixel(1, 2, 0, &mut p, WrapMode::Black);
        assert_eq!(p, [0.0, 5.0]);
    }

    #[test]
    fn test_deep_buffer() {
        let mut spec = ImageSpec::new(2, 2, 2, DataFormat::F32);
        spec.deep = true;
        spec.channel_formats = vec![DataFormat::F32, DataFormat::U32];
        let mut buf = ImageBuf::new(spec, InitializePixels::Yes);
        assert!(buf.deep());
        buf.set_deep_samples(1, 1, 3);
        buf.set_deep_value(1, 1, 0, 2, 0.5);
        buf.set_deep_value_uint(1, 1, 1, 2, 99);
        assert_eq!(buf.deep_samples(1, 1), 3);
        assert_eq!(buf.deep_value(1, 1, 0, 2), 0.5);
        assert_eq!(buf.deep_value_uint(1, 1, 1, 2), 99);
        assert_eq!(buf.deep_samples(0, 0), 0);
    }

    #[test]
    fn test_copy_pixels_converts() {
        let src = gradient(4, 4);
        let spec = ImageSpec::new(4, 4, 1, DataFormat::F16);
        let mut dst = ImageBuf::new(spec, InitializePixels::Yes);
        dst.copy_pixels(&src, None);
        let mut p = [0.0f32];
        dst.getpixel(3, 3, 0, &mut p, WrapMode::Black);
        assert_eq!(p[0], 15.0);
    }
}
