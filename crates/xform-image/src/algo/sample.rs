//! Derivative-guided filtered sampling.

use crate::filter::Filter2D;
use crate::imagebuf::{PixelScalar, SrcView, WrapMode};

/// Computes one filtered source sample at `(s, t)` with spatial derivatives
/// `(dsdx, dtdx, dsdy, dtdy)` describing how a unit destination step moves
/// the sample point.
///
/// The footprint is isotropic per axis: each axis uses the larger of its two
/// partials, floored at one source pixel, so minification low-pass filters
/// while magnification reduces to pure reconstruction. With `edgeclamp`, the
/// support rectangle is clamped to the source data window before iteration,
/// which keeps negative-lobe filters from ringing against the black beyond
/// the image boundary; the wrap mode itself is not altered.
///
/// `result` receives one value per destination channel; channels beyond the
/// source's count stay zero. If the footprint's weights sum to zero the
/// result is all zeros.
#[allow(clippy::too_many_arguments)]
pub(crate) fn filtered_sample<S: PixelScalar>(
    src: &SrcView<'_, S>,
    s: f32,
    t: f32,
    dsdx: f32,
    dtdx: f32,
    dsdy: f32,
    dtdy: f32,
    filter: &Filter2D,
    wrap: WrapMode,
    edgeclamp: bool,
    result: &mut [f32],
) {
    let ds = 1.0f32.max(dsdx.abs()).max(dsdy.abs());
    let dt = 1.0f32.max(dtdx.abs()).max(dtdy.abs());
    let ds_inv = 1.0 / ds;
    let dt_inv = 1.0 / dt;
    let filterrad_s = 0.5 * ds * filter.width();
    let filterrad_t = 0.5 * dt * filter.height();
    let mut smin = (s - filterrad_s).floor() as i32;
    let mut smax = (s + filterrad_s).ceil() as i32;
    let mut tmin = (t - filterrad_t).floor() as i32;
    let mut tmax = (t + filterrad_t).ceil() as i32;
    if edgeclamp {
        smin = smin.clamp(src.xbegin(), src.xend());
        smax = smax.clamp(src.xbegin(), src.xend());
        tmin = tmin.clamp(src.ybegin(), src.yend());
        tmax = tmax.clamp(src.ybegin(), src.yend());
    }

    for v in result.iter_mut() {
        *v = 0.0;
    }
    let nc = src.nchannels().min(result.len());
    let mut total_w = 0.0f32;
    for j in tmin..tmax {
        for i in smin..smax {
            let w = filter.eval(
                ds_inv * (i as f32 + 0.5 - s),
                dt_inv * (j as f32 + 0.5 - t),
            );
            total_w += w;
            if w != 0.0 {
                if let Some(p) = src.pixel(i, j, wrap) {
                    for (c, v) in result.iter_mut().take(nc).enumerate() {
                        *v += w * p[c].to_f32();
                    }
                }
            }
        }
    }
    if total_w > 0.0 {
        for v in result.iter_mut().take(nc) {
            *v /= total_w;
        }
    } else {
        for v in result.iter_mut() {
            *v = 0.0;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imagebuf::{ImageBuf, InitializePixels};
    use xform_core::{DataFormat, ImageSpec};

    fn constant(w: u32, h: u32, value: f32) -> ImageBuf {
        let mut buf =
            ImageBuf::new(ImageSpec::new(w, h, 1, DataFormat::F32), InitializePixels::Yes);
        for y in 0..h as i32 {
            for x in 0..w as i32 {
                buf.setpixel(x, y, 0, &[value]);
            }
        }
        buf
    }

    #[test]
    fn test_unit_derivatives_at_center_copy_pixel() {
        let mut buf = constant(9, 9, 0.0);
        buf.setpixel(4, 4, 0, &[1.0]);
        let view = buf.src_view::<f32>().unwrap();
        let filter = Filter2D::create("lanczos3", 6.0, 6.0).unwrap();
        let mut out = [0.0f32];
        filtered_sample(
            &view, 4.5, 4.5, 1.0, 0.0, 0.0, 1.0, &filter, WrapMode::Black, false, &mut out,
        );
        // At an exact pixel center the lanczos taps vanish at all other pixels.
        assert!((out[0] - 1.0).abs() < 1e-4);
    }

    #[test]
    fn test_constant_source_is_preserved() {
        let buf = constant(8, 8, 0.6);
        let view = buf.src_view::<f32>().unwrap();
        let filter = Filter2D::create("gaussian", 3.0, 3.0).unwrap();
        let mut out = [0.0f32];
        filtered_sample(
            &view, 3.7, 4.2, 1.0, 0.0, 0.0, 1.0, &filter, WrapMode::Clamp, false, &mut out,
        );
        assert!((out[0] - 0.6).abs() < 1e-5);
    }

    #[test]
    fn test_minification_widens_footprint() {
        // Left half black, right half white; shrinking 4x at the seam
        // averages broadly rather than point sampling.
        let mut buf = constant(16, 4, 0.0);
        for y in 0..4 {
            for x in 8..16 {
                buf.setpixel(x, y, 0, &[1.0]);
            }
        }
        let view = buf.src_view::<f32>().unwrap();
        let filter = Filter2D::create("triangle", 2.0, 2.0).unwrap();
        let mut out = [0.0f32];
        filtered_sample(
            &view, 8.0, 2.0, 4.0, 0.0, 0.0, 1.0, &filter, WrapMode::Clamp, false, &mut out,
        );
        assert!(out[0] > 0.25 && out[0] < 0.75);
    }

    #[test]
    fn test_edgeclamp_keeps_boundary_in_range() {
        // Near the border with black wrap, an unclamped support dims the
        // result; the clamped support keeps a constant image constant.
        let buf = constant(8, 8, 0.8);
        let view = buf.src_view::<f32>().unwrap();
        let filter = Filter2D::create("lanczos3", 6.0, 6.0).unwrap();
        let mut clamped = [0.0f32];
        filtered_sample(
            &view, 0.2, 4.0, 1.0, 0.0, 0.0, 1.0, &filter, WrapMode::Black, true, &mut clamped,
        );
        assert!((clamped[0] - 0.8).abs() < 1e-4);
        let mut open = [0.0f32];
        filtered_sample(
            &view, 0.2, 4.0, 1.0, 0.0, 0.0, 1.0, &filter, WrapMode::Black, false, &mut open,
        );
        assert!(open[0] < 0.8 + 1e-4);
        assert!((open[0] - 0.8).abs() > 1e-3);
    }

    #[test]
    fn test_empty_footprint_is_zero() {
        let buf = constant(4, 4, 0.5);
        let view = buf.src_view::<f32>().unwrap();
        let filter = Filter2D::create("box", 1.0, 1.0).unwrap();
        let mut out = [0.0f32];
        // Support entirely left of the image; edgeclamp collapses it empty.
        filtered_sample(
            &view, -10.0, 2.0, 1.0, 0.0, 0.0, 1.0, &filter, WrapMode::Black, true, &mut out,
        );
        assert_eq!(out[0], 0.0);
    }
}
