//! Fast unfiltered resampling: nearest neighbor or bilinear.

use smallvec::{smallvec, SmallVec};
use xform_core::{DataFormat, Roi};

use crate::error::{Error, Result};
use crate::imagebuf::{ImageBuf, PixelIterator, PixelScalar, WrapMode};

use super::parallel::parallel_image;
use super::{
    dispatch_types2, floorfrac, prep, record_error, NO_COPY_ROI_FULL, NO_SUPPORT_VOLUME,
    SUPPORT_DEEP,
};

/// NDC mapping shared by the flat and deep paths: destination pixel
/// coordinates to continuous source coordinates.
#[derive(Clone, Copy)]
struct ResampleMap {
    srcfx: f32,
    srcfy: f32,
    srcfw: f32,
    srcfh: f32,
    dstfx: f32,
    dstfy: f32,
    dstpixelwidth: f32,
    dstpixelheight: f32,
}

impl ResampleMap {
    fn new(dst: &ImageBuf, src: &ImageBuf) -> Self {
        let sspec = src.spec();
        let dspec = dst.spec();
        Self {
            srcfx: sspec.full_x as f32,
            srcfy: sspec.full_y as f32,
            srcfw: sspec.full_width as f32,
            srcfh: sspec.full_height as f32,
            dstfx: dspec.full_x as f32,
            dstfy: dspec.full_y as f32,
            dstpixelwidth: 1.0 / dspec.full_width as f32,
            dstpixelheight: 1.0 / dspec.full_height as f32,
        }
    }

    #[inline]
    fn src_x(&self, x: i32) -> f32 {
        let s = (x as f32 - self.dstfx + 0.5) * self.dstpixelwidth;
        self.srcfx + s * self.srcfw
    }

    #[inline]
    fn src_y(&self, y: i32) -> f32 {
        let t = (y as f32 - self.dstfy + 0.5) * self.dstpixelheight;
        self.srcfy + t * self.srcfh
    }
}

fn resample_kernel<D: PixelScalar, S: PixelScalar>(
    dst: &ImageBuf,
    src: &ImageBuf,
    interpolate: bool,
    roi: Roi,
    nthreads: usize,
) -> Result<()> {
    let src_view = src
        .src_view::<S>()
        .ok_or_else(|| Error::IncompatibleSpec("source pixel format dispatch mismatch".into()))?;
    let dst_view = unsafe { dst.dst_view::<D>() }.ok_or_else(|| {
        Error::IncompatibleSpec("destination pixel format dispatch mismatch".into())
    })?;
    let map = ResampleMap::new(dst, src);
    let nch = dst.nchannels() as usize;

    parallel_image(roi, nthreads, |tile| {
        let mut pel: SmallVec<[f32; 8]> = smallvec![0.0; nch];
        for y in tile.ybegin..tile.yend {
            let src_yf = map.src_y(y);
            let (src_y, _) = floorfrac(src_yf);
            for x in tile.xbegin..tile.xend {
                let src_xf = map.src_x(x);
                let (src_x, _) = floorfrac(src_xf);
                if interpolate {
                    src_view.interp(src_xf, src_yf, WrapMode::Clamp, &mut pel);
                    for c in tile.chbegin..tile.chend {
                        dst_view.set(x, y, c as usize, D::from_f32(pel[c as usize]));
                    }
                } else {
                    match src_view.pixel(src_x, src_y, WrapMode::Black) {
                        Some(p) => {
                            for c in tile.chbegin..tile.chend {
                                let c = c as usize;
                                let v = p.get(c).map_or(0.0, |s| s.to_f64());
                                dst_view.set(x, y, c, D::from_f64(v));
                            }
                        }
                        None => {
                            for c in tile.chbegin..tile.chend {
                                dst_view.set(x, y, c as usize, D::from_f32(0.0));
                            }
                        }
                    }
                }
            }
        }
    });
    Ok(())
}

/// Deep resample: a serial pass allocates every destination pixel's sample
/// count (deep allocation is not thread-safe), then a tile-parallel pass
/// copies the per-sample values, using the unsigned accessor for channels
/// declared `U32`.
fn resample_deep(
    dst: &mut ImageBuf,
    src: &ImageBuf,
    roi: Roi,
    nthreads: usize,
) -> Result<()> {
    let map = ResampleMap::new(dst, src);

    for (x, y, _z) in PixelIterator::new(roi) {
        let (src_x, _) = floorfrac(map.src_x(x));
        let (src_y, _) = floorfrac(map.src_y(y));
        let nsamples = src.deep_samples(src_x, src_y);
        dst.set_deep_samples(x, y, nsamples);
    }

    let uint_channel: Vec<bool> = (0..dst.nchannels() as usize)
        .map(|c| dst.spec().channelformat(c) == DataFormat::U32)
        .collect();
    let dst_ref = &*dst;
    parallel_image(roi, nthreads, |tile| {
        for y in tile.ybegin..tile.yend {
            let (src_y, _) = floorfrac(map.src_y(y));
            for x in tile.xbegin..tile.xend {
                let (src_x, _) = floorfrac(map.src_x(x));
                let nsamples = dst_ref.deep_samples(x, y) as usize;
                for c in tile.chbegin..tile.chend {
                    let c = c as usize;
                    // Disjoint tiles; counts were allocated serially above.
                    unsafe {
                        if uint_channel[c] {
                            for samp in 0..nsamples {
                                dst_ref.set_deep_value_uint_unsync(
                                    x,
                                    y,
                                    c,
                                    samp,
                                    src.deep_value_uint(src_x, src_y, c, samp),
                                );
                            }
                        } else {
                            for samp in 0..nsamples {
                                dst_ref.set_deep_value_unsync(
                                    x,
                                    y,
                                    c,
                                    samp,
                                    src.deep_value(src_x, src_y, c, samp),
                                );
                            }
                        }
                    }
                }
            }
        }
    });
    Ok(())
}

/// Resamples the source display window onto the destination display window
/// without filtering: bilinear interpolation under clamp when `interpolate`
/// is set, nearest neighbor otherwise. The cheap alternative to resize.
///
/// Deep sources are supported: the destination inherits each pixel's sample
/// count from its nearest source pixel, then copies the samples.
pub fn resample_into(
    dst: &mut ImageBuf,
    src: &ImageBuf,
    interpolate: bool,
    roi: Option<Roi>,
    nthreads: usize,
) -> Result<()> {
    tracing::debug!(interpolate, nthreads, "resample");
    let result = (|| {
        let roi = prep(
            roi,
            dst,
            src,
            NO_SUPPORT_VOLUME | NO_COPY_ROI_FULL | SUPPORT_DEEP,
        )?;
        if dst.spec().full_width == 0 || dst.spec().full_height == 0 {
            return Err(Error::IncompatibleSpec(
                "resample requires a non-empty display window".into(),
            ));
        }
        if dst.deep() {
            resample_deep(dst, src, roi, nthreads)
        } else {
            dispatch_types2!(
                dst.format(),
                src.format(),
                resample_kernel,
                (dst, src, interpolate, roi, nthreads)
            )
        }
    })();
    record_error(dst, &result);
    result
}

/// Return form of [`resample_into`].
pub fn resample(
    src: &ImageBuf,
    interpolate: bool,
    roi: Option<Roi>,
    nthreads: usize,
) -> Result<ImageBuf> {
    let mut dst = ImageBuf::new_uninit();
    match resample_into(&mut dst, src, interpolate, roi, nthreads) {
        Ok(()) => Ok(dst),
        Err(e) => {
            if !dst.has_error() {
                dst.error("resample() error");
            }
            Err(e)
        }
    }
}
