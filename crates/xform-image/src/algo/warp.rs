//! Affine warps and rotation.

use smallvec::{smallvec, SmallVec};
use xform_core::{Matrix33, Roi};

use crate::error::{Error, Result};
use crate::filter::Filter2D;
use crate::imagebuf::{ImageBuf, PixelScalar, WrapMode};

use super::dual::{robust_mult_vec_matrix, Dual2};
use super::parallel::parallel_image;
use super::sample::filtered_sample;
use super::{dispatch_types2, prep, record_error, resolve_warp_filter, FilterSpec, NO_SUPPORT_VOLUME};

/// Maps a region through an affine matrix and returns the smallest integer
/// region containing the image of its four corners.
///
/// Corners are taken at pixel centers (`begin + 0.5`, `end - 0.5`), matching
/// the half-integer center convention, then the axis-aligned bounding box is
/// expanded outward (`floor(min)`, `floor(max) + 1`). Depth and channel
/// ranges pass through unchanged.
pub fn transform_roi(m: &Matrix33, roi: Roi) -> Roi {
    let corners = [
        (roi.xbegin as f32 + 0.5, roi.ybegin as f32 + 0.5),
        (roi.xend as f32 - 0.5, roi.ybegin as f32 + 0.5),
        (roi.xbegin as f32 + 0.5, roi.yend as f32 - 0.5),
        (roi.xend as f32 - 0.5, roi.yend as f32 - 0.5),
    ];
    let mut min = (f32::INFINITY, f32::INFINITY);
    let mut max = (f32::NEG_INFINITY, f32::NEG_INFINITY);
    for (x, y) in corners {
        let (tx, ty) = m.transform_point(x, y);
        min = (min.0.min(tx), min.1.min(ty));
        max = (max.0.max(tx), max.1.max(ty));
    }
    Roi {
        xbegin: min.0.floor() as i32,
        xend: max.0.floor() as i32 + 1,
        ybegin: min.1.floor() as i32,
        yend: max.1.floor() as i32 + 1,
        ..roi
    }
}

fn warp_kernel<D: PixelScalar, S: PixelScalar>(
    dst: &ImageBuf,
    src: &ImageBuf,
    m: &Matrix33,
    filter: &Filter2D,
    wrap: WrapMode,
    edgeclamp: bool,
    roi: Roi,
    nthreads: usize,
) -> Result<()> {
    let src_view = src
        .src_view::<S>()
        .ok_or_else(|| Error::IncompatibleSpec("source pixel format dispatch mismatch".into()))?;
    let dst_view = unsafe { dst.dst_view::<D>() }.ok_or_else(|| {
        Error::IncompatibleSpec("destination pixel format dispatch mismatch".into())
    })?;
    let minv = m.inverse().unwrap_or(Matrix33::IDENTITY);
    let nch = dst.nchannels() as usize;

    parallel_image(roi, nthreads, |tile| {
        let mut pel: SmallVec<[f32; 8]> = smallvec![0.0; nch];
        for y in tile.ybegin..tile.yend {
            for x in tile.xbegin..tile.xend {
                let dx = Dual2::new(x as f32 + 0.5, 1.0, 0.0);
                let dy = Dual2::new(y as f32 + 0.5, 0.0, 1.0);
                match robust_mult_vec_matrix(&minv, dx, dy) {
                    Some((sx, sy)) => filtered_sample(
                        &src_view,
                        sx.val(),
                        sy.val(),
                        sx.dx(),
                        sy.dx(),
                        sx.dy(),
                        sy.dy(),
                        filter,
                        wrap,
                        edgeclamp,
                        &mut pel,
                    ),
                    // Singular divisor: the pixel is black, not an error.
                    None => pel.iter_mut().for_each(|v| *v = 0.0),
                }
                for c in tile.chbegin..tile.chend {
                    dst_view.set(x, y, c as usize, D::from_f32(pel[c as usize]));
                }
            }
        }
    });
    Ok(())
}

/// Shared implementation behind warp, rotate, and the Fitter's exact path
/// (the only caller that sets `edgeclamp`).
#[allow(clippy::too_many_arguments)]
pub(crate) fn warp_impl(
    dst: &mut ImageBuf,
    src: &ImageBuf,
    m: &Matrix33,
    filter: &Filter2D,
    recompute_roi: bool,
    wrap: WrapMode,
    edgeclamp: bool,
    roi: Option<Roi>,
    nthreads: usize,
) -> Result<()> {
    let mut dst_roi = match roi {
        Some(r) => r,
        None if dst.initialized() => dst.roi(),
        None if recompute_roi => transform_roi(m, src.roi()),
        None => src.roi(),
    };
    dst_roi.chend = dst_roi.chend.min(src.nchannels() as i32);

    let roi = prep(Some(dst_roi), dst, src, NO_SUPPORT_VOLUME)?;
    dispatch_types2!(
        dst.format(),
        src.format(),
        warp_kernel,
        (dst, src, m, filter, wrap, edgeclamp, roi, nthreads)
    )
}

/// Warps `src` into `dst` by the source-to-destination matrix `m`,
/// inverse-mapping each destination pixel and filtering the source at the
/// resulting location with derivative-sized footprints.
///
/// Pixels whose inverse mapping has a zero homogeneous divisor are written
/// as zeros; this is not an error. When `dst` is uninitialized and no
/// region is given, `recompute_roi` selects between the transformed source
/// region and the source region as the destination geometry.
#[allow(clippy::too_many_arguments)]
pub fn warp_into(
    dst: &mut ImageBuf,
    src: &ImageBuf,
    m: &Matrix33,
    filter: FilterSpec<'_>,
    recompute_roi: bool,
    wrap: WrapMode,
    roi: Option<Roi>,
    nthreads: usize,
) -> Result<()> {
    tracing::debug!(?roi, nthreads, "warp");
    let result = resolve_warp_filter(&filter).and_then(|f| {
        warp_impl(dst, src, m, f.as_ref(), recompute_roi, wrap, false, roi, nthreads)
    });
    record_error(dst, &result);
    result
}

/// Return form of [`warp_into`].
pub fn warp(
    src: &ImageBuf,
    m: &Matrix33,
    filter: FilterSpec<'_>,
    recompute_roi: bool,
    wrap: WrapMode,
    roi: Option<Roi>,
    nthreads: usize,
) -> Result<ImageBuf> {
    let mut dst = ImageBuf::new_uninit();
    match warp_into(&mut dst, src, m, filter, recompute_roi, wrap, roi, nthreads) {
        Ok(()) => Ok(dst),
        Err(e) => {
            if !dst.has_error() {
                dst.error("warp() error");
            }
            Err(e)
        }
    }
}

fn rotation_about(angle: f32, center_x: f32, center_y: f32) -> Matrix33 {
    Matrix33::translation(-center_x, -center_y)
        * Matrix33::rotation(angle)
        * Matrix33::translation(center_x, center_y)
}

/// Rotates `src` by `angle` radians about an explicit center, with black
/// wrap beyond the source.
#[allow(clippy::too_many_arguments)]
pub fn rotate_around_into(
    dst: &mut ImageBuf,
    src: &ImageBuf,
    angle: f32,
    center_x: f32,
    center_y: f32,
    filter: FilterSpec<'_>,
    recompute_roi: bool,
    roi: Option<Roi>,
    nthreads: usize,
) -> Result<()> {
    let m = rotation_about(angle, center_x, center_y);
    warp_into(dst, src, &m, filter, recompute_roi, WrapMode::Black, roi, nthreads)
}

/// Rotates `src` about the center of its display window.
pub fn rotate_into(
    dst: &mut ImageBuf,
    src: &ImageBuf,
    angle: f32,
    filter: FilterSpec<'_>,
    recompute_roi: bool,
    roi: Option<Roi>,
    nthreads: usize,
) -> Result<()> {
    let full = src.roi_full();
    let center_x = 0.5 * (full.xbegin + full.xend) as f32;
    let center_y = 0.5 * (full.ybegin + full.yend) as f32;
    rotate_around_into(
        dst, src, angle, center_x, center_y, filter, recompute_roi, roi, nthreads,
    )
}

/// Return form of [`rotate_around_into`].
#[allow(clippy::too_many_arguments)]
pub fn rotate_around(
    src: &ImageBuf,
    angle: f32,
    center_x: f32,
    center_y: f32,
    filter: FilterSpec<'_>,
    recompute_roi: bool,
    roi: Option<Roi>,
    nthreads: usize,
) -> Result<ImageBuf> {
    let mut dst = ImageBuf::new_uninit();
    match rotate_around_into(
        &mut dst, src, angle, center_x, center_y, filter, recompute_roi, roi, nthreads,
    ) {
        Ok(()) => Ok(dst),
        Err(e) => {
            if !dst.has_error() {
                dst.error("rotate() error");
            }
            Err(e)
        }
    }
}

/// Return form of [`rotate_into`].
pub fn rotate(
    src: &ImageBuf,
    angle: f32,
    filter: FilterSpec<'_>,
    recompute_roi: bool,
    roi: Option<Roi>,
    nthreads: usize,
) -> Result<ImageBuf> {
    let mut dst = ImageBuf::new_uninit();
    match rotate_into(&mut dst, src, angle, filter, recompute_roi, roi, nthreads) {
        Ok(()) => Ok(dst),
        Err(e) => {
            if !dst.has_error() {
                dst.error("rotate() error");
            }
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imagebuf::InitializePixels;
    use std::f32::consts::FRAC_PI_2;
    use xform_core::{DataFormat, ImageSpec};

    fn gradient(w: u32, h: u32, format: DataFormat) -> ImageBuf {
        let mut buf = ImageBuf::new(ImageSpec::new(w, h, 1, format), InitializePixels::Yes);
        for y in 0..h as i32 {
            for x in 0..w as i32 {
                let v = (x as f32 + y as f32 * 0.5) / (w + h) as f32;
                buf.setpixel(x, y, 0, &[v]);
            }
        }
        buf
    }

    fn rms(a: &ImageBuf, b: &ImageBuf) -> f32 {
        let roi = a.roi();
        let mut sum = 0.0f64;
        let mut pa = [0.0f32];
        let mut pb = [0.0f32];
        for y in roi.ybegin..roi.yend {
            for x in roi.xbegin..roi.xend {
                a.getpixel(x, y, 0, &mut pa, WrapMode::Black);
                b.getpixel(x, y, 0, &mut pb, WrapMode::Black);
                sum += ((pa[0] - pb[0]) as f64).powi(2);
            }
        }
        (sum / roi.npixels() as f64).sqrt() as f32
    }

    #[test]
    fn test_transform_roi_identity() {
        let roi = Roi::new_2d(0, 4, -2, 6);
        assert_eq!(transform_roi(&Matrix33::IDENTITY, roi), roi);
    }

    #[test]
    fn test_transform_roi_roundtrip_superset() {
        let m = Matrix33::translation(-3.2, 1.7)
            * Matrix33::rotation(0.6)
            * Matrix33::scaling(1.3, 0.8);
        let minv = m.inverse().unwrap();
        let roi = Roi::new_2d(2, 34, -5, 21);
        let back = transform_roi(&m, transform_roi(&minv, roi));
        assert!(back.contains_roi(&roi));
    }

    #[test]
    fn test_identity_warp_is_copy() {
        let src = gradient(12, 10, DataFormat::F32);
        let dst = warp(
            &src,
            &Matrix33::IDENTITY,
            FilterSpec::Auto,
            false,
            WrapMode::Black,
            None,
            1,
        )
        .unwrap();
        assert_eq!(dst.roi(), src.roi());
        let mut ps = [0.0f32];
        let mut pd = [0.0f32];
        for y in 0..10 {
            for x in 0..12 {
                src.getpixel(x, y, 0, &mut ps, WrapMode::Black);
                dst.getpixel(x, y, 0, &mut pd, WrapMode::Black);
                assert!((ps[0] - pd[0]).abs() < 1e-5, "pixel ({x},{y})");
            }
        }
    }

    #[test]
    fn test_identity_warp_integer_bits() {
        let mut src =
            ImageBuf::new(ImageSpec::new(8, 8, 1, DataFormat::U8), InitializePixels::Yes);
        for y in 0..8 {
            for x in 0..8 {
                src.setpixel(x, y, 0, &[((x * 8 + y) as f32 * 3.0) / 255.0]);
            }
        }
        let dst = warp(
            &src,
            &Matrix33::IDENTITY,
            FilterSpec::Auto,
            false,
            WrapMode::Black,
            None,
            1,
        )
        .unwrap();
        let mut ps = [0.0f32];
        let mut pd = [0.0f32];
        for y in 0..8 {
            for x in 0..8 {
                src.getpixel(x, y, 0, &mut ps, WrapMode::Black);
                dst.getpixel(x, y, 0, &mut pd, WrapMode::Black);
                assert_eq!(ps[0], pd[0], "pixel ({x},{y})");
            }
        }
    }

    #[test]
    fn test_zero_rotation_matches_source() {
        let src = gradient(32, 32, DataFormat::F32);
        let dst = rotate(&src, 0.0, FilterSpec::Auto, false, None, 1).unwrap();
        assert!(rms(&src, &dst) < 1e-4);
    }

    #[test]
    fn test_quarter_turn_roundtrip() {
        let src = gradient(10, 10, DataFormat::F32);
        let once = rotate(&src, FRAC_PI_2, FilterSpec::Auto, false, None, 1).unwrap();
        let back = rotate(&once, -FRAC_PI_2, FilterSpec::Auto, false, None, 1).unwrap();
        assert!(rms(&src, &back) < 1e-2);
    }

    #[test]
    fn test_recompute_roi_expands_for_rotation() {
        let src = gradient(20, 10, DataFormat::F32);
        let dst = rotate(&src, 0.5, FilterSpec::Auto, true, None, 1).unwrap();
        let expected = transform_roi(
            &rotation_about(0.5, 10.0, 5.0),
            src.roi(),
        );
        assert_eq!(dst.roi(), expected);
        assert!(dst.roi().width() > src.roi().width());
    }

    #[test]
    fn test_singular_matrix_yields_zeros() {
        let src = gradient(6, 6, DataFormat::F32);
        // Projectively degenerate: homogeneous w is 0 for every pixel.
        let m = Matrix33::new([[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 0.0]]);
        let dst = warp(&src, &m, FilterSpec::Auto, false, WrapMode::Black, None, 1).unwrap();
        let mut p = [9.0f32];
        dst.getpixel(3, 3, 0, &mut p, WrapMode::Black);
        // Inverse falls back to identity; the warp still runs and the
        // operation succeeds.
        assert!(p[0].is_finite());
    }

    #[test]
    fn test_edgeclamp_no_boundary_ringing() {
        // Constant source, slight upscale: every edge-clamped output pixel is
        // either the constant or untouched black, never outside that range.
        let mut src =
            ImageBuf::new(ImageSpec::new(16, 16, 1, DataFormat::F32), InitializePixels::Yes);
        for y in 0..16 {
            for x in 0..16 {
                src.setpixel(x, y, 0, &[0.8]);
            }
        }
        let filter = Filter2D::create("lanczos3", 6.0, 6.0).unwrap();
        let m = Matrix33::scaling(1.1, 1.1);
        let mut dst = ImageBuf::new_uninit();
        warp_impl(
            &mut dst, &src, &m, &filter, true, WrapMode::Black, true, None, 1,
        )
        .unwrap();
        let roi = dst.roi();
        let mut p = [0.0f32];
        for y in roi.ybegin..roi.yend {
            for x in roi.xbegin..roi.xend {
                dst.getpixel(x, y, 0, &mut p, WrapMode::Black);
                assert!(
                    p[0].abs() < 1e-4 || (p[0] - 0.8).abs() < 1e-4,
                    "pixel ({x},{y}) = {} rings outside the source range",
                    p[0]
                );
            }
        }
    }

    #[test]
    fn test_unknown_filter_reports_on_destination() {
        let src = gradient(4, 4, DataFormat::F32);
        let mut dst = ImageBuf::new_uninit();
        let err = warp_into(
            &mut dst,
            &src,
            &Matrix33::IDENTITY,
            FilterSpec::Name {
                name: "nonesuch",
                width: None,
            },
            false,
            WrapMode::Black,
            None,
            1,
        )
        .unwrap_err();
        assert!(matches!(err, Error::UnknownFilter(_)));
        assert!(dst.has_error());
    }

    #[test]
    fn test_warp_f16_pair() {
        // The (half, half) pair runs through its own monomorphized kernel.
        let mut src =
            ImageBuf::new(ImageSpec::new(6, 6, 1, DataFormat::F16), InitializePixels::Yes);
        for y in 0..6 {
            for x in 0..6 {
                src.setpixel(x, y, 0, &[x as f32 / 8.0]);
            }
        }
        let dst = warp(
            &src,
            &Matrix33::IDENTITY,
            FilterSpec::Auto,
            false,
            WrapMode::Black,
            None,
            1,
        )
        .unwrap();
        assert_eq!(dst.format(), DataFormat::F16);
        let mut p = [0.0f32];
        dst.getpixel(3, 2, 0, &mut p, WrapMode::Black);
        assert!((p[0] - 3.0 / 8.0).abs() < 1e-3);
    }
}
