//! Scalars with partial derivatives for derivative-guided sampling.
//!
//! [`Dual2`] augments a value with its partials with respect to the two
//! destination axes. Pushing the destination pixel center through the
//! inverse warp as dual numbers yields, for free, how a unit destination
//! step moves the source sample point, which is exactly what the sampler
//! needs to size its footprint.

use xform_core::Matrix33;

/// A scalar with partial derivatives w.r.t. destination x and y.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Dual2 {
    val: f32,
    dx: f32,
    dy: f32,
}

impl Dual2 {
    pub fn new(val: f32, dx: f32, dy: f32) -> Self {
        Self { val, dx, dy }
    }

    #[inline]
    pub fn val(&self) -> f32 {
        self.val
    }

    #[inline]
    pub fn dx(&self) -> f32 {
        self.dx
    }

    #[inline]
    pub fn dy(&self) -> f32 {
        self.dy
    }
}

impl From<f32> for Dual2 {
    fn from(val: f32) -> Self {
        Self::new(val, 0.0, 0.0)
    }
}

impl std::ops::Add for Dual2 {
    type Output = Dual2;

    #[inline]
    fn add(self, rhs: Dual2) -> Dual2 {
        Dual2::new(self.val + rhs.val, self.dx + rhs.dx, self.dy + rhs.dy)
    }
}

impl std::ops::Add<f32> for Dual2 {
    type Output = Dual2;

    #[inline]
    fn add(self, rhs: f32) -> Dual2 {
        Dual2::new(self.val + rhs, self.dx, self.dy)
    }
}

impl std::ops::Mul<f32> for Dual2 {
    type Output = Dual2;

    #[inline]
    fn mul(self, rhs: f32) -> Dual2 {
        Dual2::new(self.val * rhs, self.dx * rhs, self.dy * rhs)
    }
}

impl std::ops::Mul for Dual2 {
    type Output = Dual2;

    // Product rule.
    #[inline]
    fn mul(self, rhs: Dual2) -> Dual2 {
        Dual2::new(
            self.val * rhs.val,
            self.val * rhs.dx + self.dx * rhs.val,
            self.val * rhs.dy + self.dy * rhs.val,
        )
    }
}

impl std::ops::Div for Dual2 {
    type Output = Dual2;

    // Quotient rule.
    #[inline]
    fn div(self, rhs: Dual2) -> Dual2 {
        let binv = 1.0 / rhs.val;
        let q = self.val * binv;
        Dual2::new(
            q,
            binv * (self.dx - q * rhs.dx),
            binv * (self.dy - q * rhs.dy),
        )
    }
}

/// Transforms a 2D point with derivatives through a 3x3 matrix in row-vector
/// convention, guarding the projective divide: a zero homogeneous coordinate
/// returns `None`, and the caller emits black for that pixel.
pub(crate) fn robust_mult_vec_matrix(m: &Matrix33, x: Dual2, y: Dual2) -> Option<(Dual2, Dual2)> {
    let mm = &m.m;
    let a = x * mm[0][0] + y * mm[1][0] + mm[2][0];
    let b = x * mm[0][1] + y * mm[1][1] + mm[2][1];
    let w = x * mm[0][2] + y * mm[1][2] + mm[2][2];
    if w.val() != 0.0 {
        Some((a / w, b / w))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arithmetic() {
        let x = Dual2::new(3.0, 1.0, 0.0);
        let y = Dual2::new(2.0, 0.0, 1.0);
        let p = x * y;
        assert_eq!(p.val(), 6.0);
        assert_eq!(p.dx(), 2.0); // d(xy)/dx = y
        assert_eq!(p.dy(), 3.0); // d(xy)/dy = x
        let s = x + y + 1.0;
        assert_eq!((s.val(), s.dx(), s.dy()), (6.0, 1.0, 1.0));
    }

    #[test]
    fn test_quotient_rule() {
        let x = Dual2::new(6.0, 1.0, 0.0);
        let y = Dual2::new(2.0, 0.0, 1.0);
        let q = x / y;
        assert_eq!(q.val(), 3.0);
        assert!((q.dx() - 0.5).abs() < 1e-6); // 1/y
        assert!((q.dy() + 1.5).abs() < 1e-6); // -x/y^2
    }

    #[test]
    fn test_affine_transform_derivatives() {
        // Pure scale: derivatives are the scale factors.
        let m = Matrix33::scaling(2.0, 0.5);
        let (sx, sy) = robust_mult_vec_matrix(
            &m,
            Dual2::new(4.0, 1.0, 0.0),
            Dual2::new(8.0, 0.0, 1.0),
        )
        .unwrap();
        assert_eq!(sx.val(), 8.0);
        assert_eq!(sy.val(), 4.0);
        assert_eq!((sx.dx(), sx.dy()), (2.0, 0.0));
        assert_eq!((sy.dx(), sy.dy()), (0.0, 0.5));
    }

    #[test]
    fn test_singular_divisor_is_none() {
        // Last column all zero makes w == 0 everywhere.
        let m = Matrix33::new([[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 0.0]]);
        let out = robust_mult_vec_matrix(
            &m,
            Dual2::new(3.0, 1.0, 0.0),
            Dual2::new(4.0, 0.0, 1.0),
        );
        assert!(out.is_none());
    }
}
