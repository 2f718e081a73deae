//! Aspect-preserving fit into a target frame.

use xform_core::{Matrix33, Roi};

use crate::error::Result;
use crate::imagebuf::{ImageBuf, WrapMode};

use super::resize::resize_with_filter;
use super::warp::warp_impl;
use super::{
    prep, record_error, resolve_resize_filter, FilterSpec, NO_COPY_ROI_FULL, NO_SUPPORT_VOLUME,
};

/// Which axis anchors an aspect-preserving fit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FillMode {
    /// Pick [`FillMode::Height`] or [`FillMode::Width`] automatically so the
    /// whole image fits inside the target, padding the other axis.
    #[default]
    Letterbox,
    /// Scale so the source's full height fills the target height.
    Height,
    /// Scale so the source's full width fills the target width.
    Width,
}

impl From<&str> for FillMode {
    fn from(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "height" => FillMode::Height,
            "width" => FillMode::Width,
            _ => FillMode::Letterbox,
        }
    }
}

/// Resizes `src` to fit inside the target region while preserving its
/// aspect ratio, centering it on the padded axis.
///
/// With `exact` set, a sub-pixel scale+translate warp (black wrap, edge
/// clamping on) preserves the aspect ratio and centering exactly, at the
/// cost of slightly soft edges when the scaled size is not a whole number of
/// pixels. Otherwise the image is resized to the nearest integer size and
/// seated inside the target display window via data-window offsets; if that
/// size and origin already match the source, the pixels are copied through
/// untouched.
pub fn fit_into(
    dst: &mut ImageBuf,
    src: &ImageBuf,
    filter: FilterSpec<'_>,
    fillmode: FillMode,
    exact: bool,
    roi: Option<Roi>,
    nthreads: usize,
) -> Result<()> {
    tracing::debug!(?fillmode, exact, nthreads, "fit");
    let result = fit_impl(dst, src, filter, fillmode, exact, roi, nthreads);
    record_error(dst, &result);
    result
}

fn fit_impl(
    dst: &mut ImageBuf,
    src: &ImageBuf,
    filter: FilterSpec<'_>,
    fillmode: FillMode,
    exact: bool,
    roi: Option<Roi>,
    nthreads: usize,
) -> Result<()> {
    let roi = prep(roi, dst, src, NO_SUPPORT_VOLUME | NO_COPY_ROI_FULL)?;
    let sspec = src.spec().clone();
    if sspec.full_width == 0 || sspec.full_height == 0 {
        return Err(crate::error::Error::IncompatibleSpec(
            "fit requires a non-empty source display window".into(),
        ));
    }
    let nchannels = sspec.nchannels as i32;

    let fit_full_width = roi.width();
    let fit_full_height = roi.height();
    let fit_full_x = roi.xbegin;
    let fit_full_y = roi.ybegin;
    let oldaspect = sspec.full_width as f32 / sspec.full_height as f32;
    let newaspect = fit_full_width as f32 / fit_full_height as f32;

    let mut resize_full_width = fit_full_width;
    let mut resize_full_height = fit_full_height;
    let mut xoffset = 0i32;
    let mut yoffset = 0i32;
    let mut xoff = 0.0f32;
    let mut yoff = 0.0f32;
    let mut scale = 1.0f32;

    let mode = match fillmode {
        FillMode::Letterbox => {
            if newaspect >= oldaspect {
                // Same or wider than the source: fill the height.
                FillMode::Height
            } else {
                FillMode::Width
            }
        }
        m => m,
    };
    match mode {
        FillMode::Height => {
            resize_full_width = (resize_full_height as f32 * oldaspect + 0.5) as i32;
            xoffset = (fit_full_width - resize_full_width) / 2;
            scale = fit_full_height as f32 / sspec.full_height as f32;
            xoff = (fit_full_width as f32 - scale * sspec.full_width as f32) / 2.0;
        }
        FillMode::Width => {
            resize_full_height = (resize_full_width as f32 / oldaspect + 0.5) as i32;
            yoffset = (fit_full_height - resize_full_height) / 2;
            scale = fit_full_width as f32 / sspec.full_width as f32;
            yoff = (fit_full_height as f32 - scale * sspec.full_height as f32) / 2.0;
        }
        FillMode::Letterbox => unreachable!("letterbox resolves to height or width above"),
    }

    let wratio = resize_full_width as f32 / sspec.full_width as f32;
    let hratio = resize_full_height as f32 / sspec.full_height as f32;
    let filter = resolve_resize_filter(&filter, wratio, hratio)?;

    let newroi = Roi::new(
        fit_full_x,
        fit_full_x + fit_full_width,
        fit_full_y,
        fit_full_y + fit_full_height,
        0,
        1,
        0,
        nchannels,
    );

    if exact {
        let m = Matrix33::new([[scale, 0.0, 0.0], [0.0, scale, 0.0], [xoff, yoff, 1.0]]);
        let mut newspec = sspec.clone();
        newspec.set_roi(newroi);
        newspec.set_roi_full(newroi);
        dst.reset(newspec);
        warp_impl(
            dst,
            src,
            &m,
            filter.as_ref(),
            false,
            WrapMode::Black,
            true,
            None,
            nthreads,
        )
    } else {
        if resize_full_width != sspec.full_width as i32
            || resize_full_height != sspec.full_height as i32
            || fit_full_x != sspec.full_x
            || fit_full_y != sspec.full_y
        {
            let resizeroi = Roi::new(
                fit_full_x,
                fit_full_x + resize_full_width,
                fit_full_y,
                fit_full_y + resize_full_height,
                0,
                1,
                0,
                nchannels,
            );
            let mut newspec = sspec.clone();
            newspec.set_roi(resizeroi);
            newspec.set_roi_full(resizeroi);
            dst.reset(newspec);
            resize_with_filter(dst, src, filter.as_ref(), resizeroi, nthreads)?;
        } else {
            // Already the right size; pass the pixels through.
            dst.reset(sspec.clone());
            dst.copy_pixels(src, None);
        }
        dst.set_roi_full(newroi);
        dst.set_origin(xoffset, yoffset);
        Ok(())
    }
}

/// Return form of [`fit_into`].
pub fn fit(
    src: &ImageBuf,
    filter: FilterSpec<'_>,
    fillmode: FillMode,
    exact: bool,
    roi: Option<Roi>,
    nthreads: usize,
) -> Result<ImageBuf> {
    let mut dst = ImageBuf::new_uninit();
    match fit_into(&mut dst, src, filter, fillmode, exact, roi, nthreads) {
        Ok(()) => Ok(dst),
        Err(e) => {
            if !dst.has_error() {
                dst.error("fit() error");
            }
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imagebuf::InitializePixels;
    use xform_core::{DataFormat, ImageSpec};

    fn filled(w: u32, h: u32, value: f32) -> ImageBuf {
        let mut buf =
            ImageBuf::new(ImageSpec::new(w, h, 1, DataFormat::F32), InitializePixels::Yes);
        for y in 0..h as i32 {
            for x in 0..w as i32 {
                buf.setpixel(x, y, 0, &[value]);
            }
        }
        buf
    }

    fn pixel1(buf: &ImageBuf, x: i32, y: i32) -> f32 {
        let mut p = [0.0f32];
        buf.getpixel(x, y, 0, &mut p, WrapMode::Black);
        p[0]
    }

    #[test]
    fn test_fillmode_from_str() {
        assert_eq!(FillMode::from("height"), FillMode::Height);
        assert_eq!(FillMode::from("Width"), FillMode::Width);
        assert_eq!(FillMode::from("letterbox"), FillMode::Letterbox);
        assert_eq!(FillMode::from("garbage"), FillMode::Letterbox);
    }

    #[test]
    fn test_letterbox_wide_into_square() {
        // 8x4 (aspect 2) into 4x4: width mode, resized to 4x2, centered
        // vertically one row down.
        let src = filled(8, 4, 0.5);
        let dst = fit(
            &src,
            FilterSpec::Auto,
            FillMode::Letterbox,
            false,
            Some(Roi::new_2d(0, 4, 0, 4)),
            1,
        )
        .unwrap();
        let spec = dst.spec();
        assert_eq!((spec.full_width, spec.full_height), (4, 4));
        assert_eq!((spec.width, spec.height), (4, 2));
        assert_eq!((spec.x, spec.y), (0, 1));
        for x in 0..4 {
            assert!((pixel1(&dst, x, 1) - 0.5).abs() < 1e-5);
        }
    }

    #[test]
    fn test_letterbox_tall_into_square() {
        // 4x8 into 4x4: height mode, resized to 2x4, centered horizontally.
        let src = filled(4, 8, 0.25);
        let dst = fit(
            &src,
            FilterSpec::Auto,
            FillMode::Letterbox,
            false,
            Some(Roi::new_2d(0, 4, 0, 4)),
            1,
        )
        .unwrap();
        let spec = dst.spec();
        assert_eq!((spec.width, spec.height), (2, 4));
        assert_eq!((spec.x, spec.y), (1, 0));
    }

    #[test]
    fn test_fit_to_own_window_is_copy() {
        let mut src =
            ImageBuf::new(ImageSpec::new(6, 4, 1, DataFormat::F32), InitializePixels::Yes);
        for y in 0..4 {
            for x in 0..6 {
                src.setpixel(x, y, 0, &[(x + y * 6) as f32 / 24.0]);
            }
        }
        for mode in [FillMode::Letterbox, FillMode::Height, FillMode::Width] {
            let dst = fit(
                &src,
                FilterSpec::Auto,
                mode,
                false,
                Some(Roi::new_2d(0, 6, 0, 4)),
                1,
            )
            .unwrap();
            assert_eq!(dst.spec().width, 6);
            assert_eq!(dst.spec().height, 4);
            assert_eq!((dst.spec().x, dst.spec().y), (0, 0));
            for y in 0..4 {
                for x in 0..6 {
                    assert_eq!(pixel1(&src, x, y), pixel1(&dst, x, y), "mode {mode:?}");
                }
            }
        }
    }

    #[test]
    fn test_exact_fit_runs_warp() {
        // Exact mode keeps the full target as the data window and fills the
        // scaled region with the source constant.
        let src = filled(8, 4, 0.75);
        let dst = fit(
            &src,
            FilterSpec::Auto,
            FillMode::Letterbox,
            true,
            Some(Roi::new_2d(0, 4, 0, 4)),
            1,
        )
        .unwrap();
        let spec = dst.spec();
        assert_eq!((spec.width, spec.height), (4, 4));
        assert_eq!((spec.full_width, spec.full_height), (4, 4));
        // The vertical center row lies inside the scaled image.
        for x in 0..4 {
            let v = pixel1(&dst, x, 2);
            assert!(
                (v - 0.75).abs() < 1e-3,
                "center row pixel ({x}, 2) = {v}"
            );
        }
        // Every pixel is the constant or letterbox black, nothing else.
        for y in 0..4 {
            for x in 0..4 {
                let v = pixel1(&dst, x, y);
                assert!(v.abs() < 1e-3 || (v - 0.75).abs() < 1e-3, "pixel ({x},{y}) = {v}");
            }
        }
    }

    #[test]
    fn test_square_into_wide_copy_with_offset() {
        // 4x4 into 8x4: the resize size equals the source, so pixels copy
        // through and only the windows shift.
        let src = filled(4, 4, 1.0);
        let dst = fit(
            &src,
            FilterSpec::Auto,
            FillMode::Letterbox,
            false,
            Some(Roi::new_2d(0, 8, 0, 4)),
            1,
        )
        .unwrap();
        let spec = dst.spec();
        assert_eq!((spec.full_width, spec.full_height), (8, 4));
        assert_eq!((spec.width, spec.height), (4, 4));
        assert_eq!((spec.x, spec.y), (2, 0));
        assert!((pixel1(&dst, 2, 0) - 1.0).abs() < 1e-6);
    }
}
