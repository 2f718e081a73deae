//! Scaled resize between display windows.
//!
//! Coordinates run through NDC: destination pixel `(x, y)` maps to
//! `s = (x - full_x + 0.5) / full_width` in `[0, 1]`, which lands in the
//! source display window at `src_xf = src_full_x + s * src_full_width`.
//! Separable filters take a fast path with pre-tabulated, pre-normalized
//! horizontal tap weights per destination column and per-scanline vertical
//! taps; non-separable filters evaluate the 2D kernel per source pixel and
//! normalize at the end.

use smallvec::{smallvec, SmallVec};
use xform_core::Roi;

use crate::error::{Error, Result};
use crate::filter::Filter2D;
use crate::imagebuf::{Accumulator, ImageBuf, PixelScalar, WrapMode};

use super::parallel::parallel_image;
use super::{
    dispatch_types2, floorfrac, prep, record_error, resolve_resize_filter, FilterSpec,
    NO_COPY_ROI_FULL, NO_SUPPORT_VOLUME,
};

fn resize_kernel<D: PixelScalar, S: PixelScalar>(
    dst: &ImageBuf,
    src: &ImageBuf,
    filter: &Filter2D,
    roi: Roi,
    nthreads: usize,
) -> Result<()> {
    let src_view = src
        .src_view::<S>()
        .ok_or_else(|| Error::IncompatibleSpec("source pixel format dispatch mismatch".into()))?;
    let dst_view = unsafe { dst.dst_view::<D>() }.ok_or_else(|| {
        Error::IncompatibleSpec("destination pixel format dispatch mismatch".into())
    })?;
    let sspec = src.spec();
    let dspec = dst.spec();
    let nch = dspec.nchannels as usize;

    let srcfx = sspec.full_x as f32;
    let srcfy = sspec.full_y as f32;
    let srcfw = sspec.full_width as f32;
    let srcfh = sspec.full_height as f32;
    let dstfx = dspec.full_x as f32;
    let dstfy = dspec.full_y as f32;
    let dstfw = dspec.full_width as f32;
    let dstfh = dspec.full_height as f32;

    // Ratios above 1 magnify (smooth interpolation); below 1 minify, where
    // the widened footprint must low-pass the source.
    let xratio = dstfw / srcfw;
    let yratio = dstfh / srcfh;
    let dstpixelwidth = 1.0 / dstfw;
    let dstpixelheight = 1.0 / dstfh;

    // Integer filter radius in source pixels: the support is
    // [src_x - radi, src_x + radi] x [src_y - radj, src_y + radj].
    let radi = (filter.width() * 0.5 / xratio).ceil() as i32;
    let radj = (filter.height() * 0.5 / yratio).ceil() as i32;
    let xtaps = (2 * radi + 1) as usize;
    let ytaps = (2 * radj + 1) as usize;
    let separable = filter.separable();

    parallel_image(roi, nthreads, |tile| {
        let mut pel: SmallVec<[D::Accum; 8]> = smallvec![<D::Accum>::default(); nch];
        let mut yfiltval = vec![0.0f32; ytaps];

        if separable {
            // Horizontal tap weights are identical down a column, so
            // tabulate (and normalize) them once per destination column.
            let tile_width = tile.width() as usize;
            let mut xfiltval_all = vec![0.0f32; xtaps * tile_width];
            for x in tile.xbegin..tile.xend {
                let col = (x - tile.xbegin) as usize;
                let s = (x as f32 - dstfx + 0.5) * dstpixelwidth;
                let (_, xfrac) = floorfrac(srcfx + s * srcfw);
                let taps = &mut xfiltval_all[col * xtaps..(col + 1) * xtaps];
                let mut total = 0.0f32;
                for (i, tap) in taps.iter_mut().enumerate() {
                    let w = filter.xfilt(xratio * ((i as i32 - radi) as f32 - (xfrac - 0.5)));
                    *tap = w;
                    total += w;
                }
                if total != 0.0 {
                    for tap in taps.iter_mut() {
                        *tap /= total;
                    }
                }
            }

            for y in tile.ybegin..tile.yend {
                let t = (y as f32 - dstfy + 0.5) * dstpixelheight;
                let (src_y, yfrac) = floorfrac(srcfy + t * srcfh);
                // Vertical taps are shared by the whole scanline.
                let mut totalweight_y = 0.0f32;
                for (j, tap) in yfiltval.iter_mut().enumerate() {
                    let w = filter.yfilt(yratio * ((j as i32 - radj) as f32 - (yfrac - 0.5)));
                    *tap = w;
                    totalweight_y += w;
                }
                if totalweight_y != 0.0 {
                    for tap in yfiltval.iter_mut() {
                        *tap /= totalweight_y;
                    }
                }

                for x in tile.xbegin..tile.xend {
                    let col = (x - tile.xbegin) as usize;
                    let s = (x as f32 - dstfx + 0.5) * dstpixelwidth;
                    let (src_x, _) = floorfrac(srcfx + s * srcfw);
                    for p in pel.iter_mut() {
                        *p = <D::Accum>::default();
                    }
                    let xtapvals = &xfiltval_all[col * xtaps..(col + 1) * xtaps];
                    let totalweight_x: f32 = xtapvals.iter().sum();
                    if totalweight_x != 0.0 {
                        for (j, &wy) in yfiltval.iter().enumerate() {
                            if wy == 0.0 {
                                // Zero-weight scanline; with large downsample
                                // ratios most vertical taps vanish.
                                continue;
                            }
                            let sy = src_y - radj + j as i32;
                            for (i, &wx) in xtapvals.iter().enumerate() {
                                let w = wy * wx;
                                if w != 0.0 {
                                    let sx = src_x - radi + i as i32;
                                    if let Some(p) = src_view.pixel(sx, sy, WrapMode::Clamp) {
                                        let w = <D::Accum>::from_f32(w);
                                        for (c, v) in
                                            pel.iter_mut().take(p.len().min(nch)).enumerate()
                                        {
                                            *v += w * p[c].to_accum();
                                        }
                                    }
                                }
                            }
                        }
                    }
                    // Both tap sets are pre-normalized, so pel is final.
                    if totalweight_y == 0.0 {
                        for c in tile.chbegin..tile.chend {
                            dst_view.set(x, y, c as usize, D::from_f32(0.0));
                        }
                    } else {
                        for c in tile.chbegin..tile.chend {
                            dst_view.set(x, y, c as usize, D::from_accum(pel[c as usize]));
                        }
                    }
                }
            }
        } else {
            // General path: evaluate the 2D kernel per source pixel and
            // normalize by the accumulated weight.
            for y in tile.ybegin..tile.yend {
                let t = (y as f32 - dstfy + 0.5) * dstpixelheight;
                let (src_y, yfrac) = floorfrac(srcfy + t * srcfh);
                for x in tile.xbegin..tile.xend {
                    let s = (x as f32 - dstfx + 0.5) * dstpixelwidth;
                    let (src_x, xfrac) = floorfrac(srcfx + s * srcfw);
                    for p in pel.iter_mut() {
                        *p = <D::Accum>::default();
                    }
                    let mut totalweight = 0.0f32;
                    for j in -radj..=radj {
                        for i in -radi..=radi {
                            let w = filter.eval(
                                xratio * (i as f32 - (xfrac - 0.5)),
                                yratio * (j as f32 - (yfrac - 0.5)),
                            );
                            if w != 0.0 {
                                totalweight += w;
                                if let Some(p) =
                                    src_view.pixel(src_x + i, src_y + j, WrapMode::Clamp)
                                {
                                    let w = <D::Accum>::from_f32(w);
                                    for (c, v) in
                                        pel.iter_mut().take(p.len().min(nch)).enumerate()
                                    {
                                        *v += w * p[c].to_accum();
                                    }
                                }
                            }
                        }
                    }
                    if totalweight == 0.0 {
                        for c in tile.chbegin..tile.chend {
                            dst_view.set(x, y, c as usize, D::from_f32(0.0));
                        }
                    } else {
                        let norm = <D::Accum>::from_f32(totalweight);
                        for c in tile.chbegin..tile.chend {
                            dst_view.set(x, y, c as usize, D::from_accum(pel[c as usize] / norm));
                        }
                    }
                }
            }
        }
    });
    Ok(())
}

/// Runs the resize kernel with an already-resolved filter. The Fitter's
/// non-exact path enters here directly.
pub(crate) fn resize_with_filter(
    dst: &ImageBuf,
    src: &ImageBuf,
    filter: &Filter2D,
    roi: Roi,
    nthreads: usize,
) -> Result<()> {
    dispatch_types2!(
        dst.format(),
        src.format(),
        resize_kernel,
        (dst, src, filter, roi, nthreads)
    )
}

/// Resizes the source display window onto the destination display window.
///
/// An uninitialized destination is allocated with both its data and display
/// windows equal to `roi`, so passing `Roi::new_2d(0, w, 0, h)` resizes to
/// `w` x `h`. The scale ratios come from the two display windows; the wrap
/// mode is fixed to clamp.
pub fn resize_into(
    dst: &mut ImageBuf,
    src: &ImageBuf,
    filter: FilterSpec<'_>,
    roi: Option<Roi>,
    nthreads: usize,
) -> Result<()> {
    tracing::debug!(?roi, nthreads, "resize");
    let result = (|| {
        let roi = prep(roi, dst, src, NO_SUPPORT_VOLUME | NO_COPY_ROI_FULL)?;
        let sspec = src.spec();
        let dspec = dst.spec();
        if sspec.full_width == 0
            || sspec.full_height == 0
            || dspec.full_width == 0
            || dspec.full_height == 0
        {
            return Err(Error::IncompatibleSpec(
                "resize requires non-empty display windows".into(),
            ));
        }
        let wratio = dspec.full_width as f32 / sspec.full_width as f32;
        let hratio = dspec.full_height as f32 / sspec.full_height as f32;
        let filter = resolve_resize_filter(&filter, wratio, hratio)?;
        resize_with_filter(dst, src, filter.as_ref(), roi, nthreads)
    })();
    record_error(dst, &result);
    result
}

/// Return form of [`resize_into`].
pub fn resize(
    src: &ImageBuf,
    filter: FilterSpec<'_>,
    roi: Option<Roi>,
    nthreads: usize,
) -> Result<ImageBuf> {
    let mut dst = ImageBuf::new_uninit();
    match resize_into(&mut dst, src, filter, roi, nthreads) {
        Ok(()) => Ok(dst),
        Err(e) => {
            if !dst.has_error() {
                dst.error("resize() error");
            }
            Err(e)
        }
    }
}
