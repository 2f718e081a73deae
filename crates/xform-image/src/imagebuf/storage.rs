//! Typed pixel storage backends and the scalar traits the kernels
//! monomorphize over.

use half::f16;
use xform_core::{DataFormat, ImageSpec};

use crate::deepdata::DeepData;

/// Accumulator scalar for filtered sums.
///
/// `f32` for every destination type except `f64`, which accumulates in
/// double precision.
pub trait Accumulator:
    Copy
    + Default
    + std::ops::AddAssign
    + std::ops::Mul<Output = Self>
    + std::ops::Div<Output = Self>
    + Send
    + Sync
    + 'static
{
    /// Converts from `f32`.
    fn from_f32(v: f32) -> Self;
    /// Converts to `f32`.
    fn to_f32(self) -> f32;
    /// Converts from `f64`.
    fn from_f64(v: f64) -> Self;
    /// Converts to `f64`.
    fn to_f64(self) -> f64;
}

impl Accumulator for f32 {
    #[inline]
    fn from_f32(v: f32) -> Self {
        v
    }
    #[inline]
    fn to_f32(self) -> f32 {
        self
    }
    #[inline]
    fn from_f64(v: f64) -> Self {
        v as f32
    }
    #[inline]
    fn to_f64(self) -> f64 {
        self as f64
    }
}

impl Accumulator for f64 {
    #[inline]
    fn from_f32(v: f32) -> Self {
        v as f64
    }
    #[inline]
    fn to_f32(self) -> f32 {
        self as f32
    }
    #[inline]
    fn from_f64(v: f64) -> Self {
        v
    }
    #[inline]
    fn to_f64(self) -> f64 {
        self
    }
}

/// A channel scalar type that pixel buffers can store.
///
/// The resampling kernels are generic over a `(destination, source)` pair of
/// these; the dispatch table in `algo` selects the monomorphized instance
/// from the buffers' runtime [`DataFormat`]s.
pub trait PixelScalar: Copy + Send + Sync + 'static {
    /// The runtime format tag this type stores.
    const FORMAT: DataFormat;
    /// Accumulator used when this type is the destination of a filtered sum.
    type Accum: Accumulator;

    /// Converts to a normalized / numeric `f32`.
    fn to_f32(self) -> f32;
    /// Converts from `f32`, clamping and rounding as the format requires.
    fn from_f32(v: f32) -> Self;

    /// Converts to `f64`. Only `f64` storage overrides this losslessly.
    #[inline]
    fn to_f64(self) -> f64 {
        self.to_f32() as f64
    }
    /// Converts from `f64`.
    #[inline]
    fn from_f64(v: f64) -> Self {
        Self::from_f32(v as f32)
    }

    /// Converts into an accumulator scalar.
    #[inline]
    fn to_accum<A: Accumulator>(self) -> A {
        A::from_f64(self.to_f64())
    }
    /// Converts an accumulated value back to storage.
    #[inline]
    fn from_accum(a: Self::Accum) -> Self {
        Self::from_f64(a.to_f64())
    }

    /// Borrows the matching typed slice out of storage, or `None` if the
    /// storage holds a different format.
    fn slice_of(storage: &PixelStorage) -> Option<&[Self]>
    where
        Self: Sized;

    /// Mutable variant of [`PixelScalar::slice_of`].
    fn slice_of_mut(storage: &mut PixelStorage) -> Option<&mut [Self]>
    where
        Self: Sized;
}

macro_rules! impl_pixel_scalar {
    ($ty:ty, $fmt:ident, $variant:ident, $accum:ty,
     to_f32: $to:expr, from_f32: $from:expr) => {
        impl PixelScalar for $ty {
            const FORMAT: DataFormat = DataFormat::$fmt;
            type Accum = $accum;

            #[inline]
            fn to_f32(self) -> f32 {
                ($to)(self)
            }

            #[inline]
            fn from_f32(v: f32) -> Self {
                ($from)(v)
            }

            fn slice_of(storage: &PixelStorage) -> Option<&[Self]> {
                match storage {
                    PixelStorage::$variant(data) => Some(data),
                    _ => None,
                }
            }

            fn slice_of_mut(storage: &mut PixelStorage) -> Option<&mut [Self]> {
                match storage {
                    PixelStorage::$variant(data) => Some(data),
                    _ => None,
                }
            }
        }
    };
}

// Integer conversions round to nearest so value-preserving transforms
// (identity warp, 1:1 resize) are bit-exact for integer pixels.
impl_pixel_scalar!(u8, U8, U8, f32,
    to_f32: |v: u8| v as f32 / 255.0,
    from_f32: |v: f32| (v.clamp(0.0, 1.0) * 255.0).round() as u8);

impl_pixel_scalar!(u16, U16, U16, f32,
    to_f32: |v: u16| v as f32 / 65535.0,
    from_f32: |v: f32| (v.clamp(0.0, 1.0) * 65535.0).round() as u16);

impl_pixel_scalar!(u32, U32, U32, f32,
    to_f32: |v: u32| v as f32,
    from_f32: |v: f32| v.max(0.0).round() as u32);

impl_pixel_scalar!(f16, F16, F16, f32,
    to_f32: |v: f16| v.to_f32(),
    from_f32: f16::from_f32);

impl_pixel_scalar!(f32, F32, F32, f32,
    to_f32: |v: f32| v,
    from_f32: |v: f32| v);

// f64 is written out by hand so its f64 conversions stay lossless instead of
// routing through f32 like the defaults do.
impl PixelScalar for f64 {
    const FORMAT: DataFormat = DataFormat::F64;
    type Accum = f64;

    #[inline]
    fn to_f32(self) -> f32 {
        self as f32
    }

    #[inline]
    fn from_f32(v: f32) -> Self {
        v as f64
    }

    #[inline]
    fn to_f64(self) -> f64 {
        self
    }

    #[inline]
    fn from_f64(v: f64) -> Self {
        v
    }

    fn slice_of(storage: &PixelStorage) -> Option<&[Self]> {
        match storage {
            PixelStorage::F64(data) => Some(data),
            _ => None,
        }
    }

    fn slice_of_mut(storage: &mut PixelStorage) -> Option<&mut [Self]> {
        match storage {
            PixelStorage::F64(data) => Some(data),
            _ => None,
        }
    }
}

/// Pixel storage for an image buffer: one owned, densely packed buffer in
/// the spec's format, or deep per-pixel sample lists.
#[derive(Debug, Clone, Default)]
pub enum PixelStorage {
    /// No pixel data.
    #[default]
    Empty,
    /// Unsigned 8-bit channels.
    U8(Vec<u8>),
    /// Unsigned 16-bit channels.
    U16(Vec<u16>),
    /// Unsigned 32-bit channels.
    U32(Vec<u32>),
    /// Half-float channels.
    F16(Vec<f16>),
    /// Single-precision channels.
    F32(Vec<f32>),
    /// Double-precision channels.
    F64(Vec<f64>),
    /// Deep per-pixel sample lists.
    Deep(DeepData),
}

impl PixelStorage {
    /// Allocates zeroed storage for the given spec.
    pub fn allocate(spec: &ImageSpec) -> Self {
        let total = spec.npixels() as usize * spec.nchannels as usize;
        if spec.deep {
            return Self::Deep(DeepData::from_spec(spec));
        }
        if total == 0 {
            return Self::Empty;
        }
        match spec.format {
            DataFormat::U8 => Self::U8(vec![0; total]),
            DataFormat::U16 => Self::U16(vec![0; total]),
            DataFormat::U32 => Self::U32(vec![0; total]),
            DataFormat::F16 => Self::F16(vec![f16::ZERO; total]),
            DataFormat::F32 => Self::F32(vec![0.0; total]),
            DataFormat::F64 => Self::F64(vec![0.0; total]),
        }
    }

    /// Returns `true` if no pixel data is held.
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    /// Deep storage, if this buffer is deep.
    pub fn deep(&self) -> Option<&DeepData> {
        match self {
            Self::Deep(d) => Some(d),
            _ => None,
        }
    }

    /// Mutable deep storage.
    pub fn deep_mut(&mut self) -> Option<&mut DeepData> {
        match self {
            Self::Deep(d) => Some(d),
            _ => None,
        }
    }

    /// Reads one channel value at flat index `idx` as `f32`.
    pub fn get_channel(&self, idx: usize) -> f32 {
        match self {
            Self::Empty | Self::Deep(_) => 0.0,
            Self::U8(d) => d.get(idx).map_or(0.0, |v| v.to_f32()),
            Self::U16(d) => d.get(idx).map_or(0.0, |v| v.to_f32()),
            Self::U32(d) => d.get(idx).map_or(0.0, |v| v.to_f32()),
            Self::F16(d) => d.get(idx).map_or(0.0, |v| v.to_f32()),
            Self::F32(d) => d.get(idx).copied().unwrap_or(0.0),
            Self::F64(d) => d.get(idx).map_or(0.0, |v| *v as f32),
        }
    }

    /// Writes one channel value at flat index `idx` from `f32`.
    pub fn set_channel(&mut self, idx: usize, v: f32) {
        match self {
            Self::Empty | Self::Deep(_) => {}
            Self::U8(d) => {
                if let Some(p) = d.get_mut(idx) {
                    *p = u8::from_f32(v);
                }
            }
            Self::U16(d) => {
                if let Some(p) = d.get_mut(idx) {
                    *p = u16::from_f32(v);
                }
            }
            Self::U32(d) => {
                if let Some(p) = d.get_mut(idx) {
                    *p = u32::from_f32(v);
                }
            }
            Self::F16(d) => {
                if let Some(p) = d.get_mut(idx) {
                    *p = f16::from_f32(v);
                }
            }
            Self::F32(d) => {
                if let Some(p) = d.get_mut(idx) {
                    *p = v;
                }
            }
            Self::F64(d) => {
                if let Some(p) = d.get_mut(idx) {
                    *p = v as f64;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allocate_formats() {
        let spec = ImageSpec::new(4, 4, 3, DataFormat::U16);
        match PixelStorage::allocate(&spec) {
            PixelStorage::U16(d) => assert_eq!(d.len(), 48),
            other => panic!("expected U16 storage, got {other:?}"),
        }
        let empty = PixelStorage::allocate(&ImageSpec::default());
        assert!(empty.is_empty());
    }

    #[test]
    fn test_channel_roundtrip() {
        let spec = ImageSpec::new(2, 2, 1, DataFormat::U8);
        let mut s = PixelStorage::allocate(&spec);
        s.set_channel(3, 0.5);
        // 0.5 * 255 rounds to 128.
        assert!((s.get_channel(3) - 128.0 / 255.0).abs() < 1e-6);
    }

    #[test]
    fn test_integer_rounding_roundtrip() {
        for v in [0u8, 1, 127, 128, 200, 255] {
            assert_eq!(u8::from_f32(v.to_f32()), v);
        }
        for v in [0u16, 1, 32767, 65535] {
            assert_eq!(u16::from_f32(v.to_f32()), v);
        }
    }

    #[test]
    fn test_typed_slice_extraction() {
        let spec = ImageSpec::new(2, 2, 1, DataFormat::F32);
        let s = PixelStorage::allocate(&spec);
        assert!(f32::slice_of(&s).is_some());
        assert!(f16::slice_of(&s).is_none());
    }

    #[test]
    fn test_f64_stays_double() {
        // f64 destinations accumulate in double precision and convert
        // losslessly through the f64 path.
        let a: <f64 as PixelScalar>::Accum = Accumulator::from_f64(1e-300);
        assert!(Accumulator::to_f64(a) != 0.0);
        let v = 1.0 + 1e-12_f64;
        assert_eq!(f64::from_accum(v), v);
        assert_eq!(
            <f64 as PixelScalar>::from_f64(PixelScalar::to_f64(v)),
            v
        );
    }
}
