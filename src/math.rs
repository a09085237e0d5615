//! Deterministic Fixed-Point Mathematics
//!
//! Bit-exact arithmetic for the 2D world. Every operation produces identical
//! results on x86, ARM, WASM or any other target: there is no IEEE 754 in the
//! simulation path.
//!
//! # Types
//!
//! - `Fix128` (I64F64): 128-bit fixed-point, 64 integer bits, 64 fractional bits
//! - `Vec2Fix`: 2D vector using `Fix128` components
//!
//! # Rounding Rules
//!
//! - Multiplication and division truncate toward zero.
//! - Square root runs Newton iterations down from a power-of-two upper bound
//!   until they stop decreasing.
//! - Sine and cosine reduce the angle to `[-π/2, π/2]` and sum a fixed number
//!   of Taylor terms.
//!
//! Solver output depends on these rules, so replays are bit-exact only
//! against the same rules.

use core::fmt;
use core::ops::{Add, AddAssign, Div, Mul, Neg, Sub, SubAssign};

const FRAC_BITS: u32 = 64;
const FRAC_MASK: u128 = (1u128 << FRAC_BITS) - 1;
const TWO_POW_64: f64 = 18_446_744_073_709_551_616.0;
const TAYLOR_TERMS: i64 = 14;

// ============================================================================
// Fix128 (I64F64) - 128-bit Fixed-Point Number
// ============================================================================

/// 128-bit fixed-point number (64 integer bits, 64 fractional bits)
///
/// Internal representation: `value = bits / 2^64`
///
/// - Range: ±9.2 × 10^18
/// - Precision: ~5.4 × 10^-20
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct Fix128 {
    bits: i128,
}

impl Fix128 {
    /// Zero constant
    pub const ZERO: Self = Self { bits: 0 };

    /// One constant (1.0)
    pub const ONE: Self = Self { bits: 1 << FRAC_BITS };

    /// Negative one (-1.0)
    pub const NEG_ONE: Self = Self {
        bits: -(1 << FRAC_BITS),
    };

    /// One half (0.5)
    pub const HALF: Self = Self {
        bits: 1 << (FRAC_BITS - 1),
    };

    /// Smallest positive value (2^-64)
    pub const EPSILON: Self = Self { bits: 1 };

    /// Pi (π) to full precision
    pub const PI: Self = Self::from_raw(3, 0x243F_6A88_85A3_08D3);

    /// Half Pi (π/2)
    pub const HALF_PI: Self = Self::from_raw(1, 0x921F_B544_42D1_8469);

    /// Two Pi (2π)
    pub const TWO_PI: Self = Self::from_raw(6, 0x487E_D511_0B46_11A6);

    /// Create from integer
    #[inline]
    #[must_use]
    pub const fn from_int(n: i64) -> Self {
        Self {
            bits: (n as i128) << FRAC_BITS,
        }
    }

    /// Create from raw parts (hi = integer part, lo = fraction)
    #[inline]
    #[must_use]
    pub const fn from_raw(hi: i64, lo: u64) -> Self {
        Self {
            bits: ((hi as i128) << FRAC_BITS) | lo as i128,
        }
    }

    /// Create from the raw two's complement bit pattern.
    #[inline]
    #[must_use]
    pub const fn from_bits(bits: i128) -> Self {
        Self { bits }
    }

    /// Raw two's complement bit pattern, for bit-exact comparisons.
    #[inline]
    #[must_use]
    pub const fn to_bits(self) -> i128 {
        self.bits
    }

    /// Create from fraction (numerator / denominator), truncated toward zero.
    ///
    /// A zero denominator yields zero.
    #[inline]
    #[must_use]
    pub const fn from_ratio(num: i64, denom: i64) -> Self {
        if denom == 0 {
            return Self::ZERO;
        }
        Self {
            bits: ((num as i128) << FRAC_BITS) / denom as i128,
        }
    }

    /// Create from f64 (for scene setup only; the conversion itself is the
    /// only place a float enters).
    #[must_use]
    pub fn from_f64(value: f64) -> Self {
        Self {
            bits: (value * TWO_POW_64) as i128,
        }
    }

    /// Convert to f64 (debugging and assertions only)
    #[must_use]
    pub fn to_f64(self) -> f64 {
        self.bits as f64 / TWO_POW_64
    }

    /// Check if zero
    #[inline]
    #[must_use]
    pub const fn is_zero(self) -> bool {
        self.bits == 0
    }

    /// Check if negative
    #[inline]
    #[must_use]
    pub const fn is_negative(self) -> bool {
        self.bits < 0
    }

    /// Check if strictly positive
    #[inline]
    #[must_use]
    pub const fn is_positive(self) -> bool {
        self.bits > 0
    }

    /// Absolute value
    #[inline]
    #[must_use]
    pub const fn abs(self) -> Self {
        Self {
            bits: self.bits.wrapping_abs(),
        }
    }

    /// Floor (round toward negative infinity)
    #[inline]
    #[must_use]
    pub const fn floor(self) -> Self {
        Self {
            bits: self.bits & !(FRAC_MASK as i128),
        }
    }

    /// Divide by 2 (arithmetic shift)
    #[inline]
    #[must_use]
    pub const fn half(self) -> Self {
        Self {
            bits: self.bits >> 1,
        }
    }

    /// `self * self`
    #[inline]
    #[must_use]
    pub fn square(self) -> Self {
        self * self
    }

    /// Square root (Newton-Raphson from a power-of-two upper bound).
    ///
    /// Returns zero for zero and negative inputs.
    #[must_use]
    pub fn sqrt(self) -> Self {
        if self.bits <= 0 {
            return Self::ZERO;
        }

        let bit_len = 128 - (self.bits as u128).leading_zeros() as i32;
        let exponent = bit_len - FRAC_BITS as i32;
        let shift = FRAC_BITS as i32 + exponent.div_euclid(2) + 1;
        let mut x = Self {
            bits: 1i128 << shift,
        };

        // The iterates decrease strictly until they reach the root.
        loop {
            let next = (x + self / x).half();
            if next >= x {
                break;
            }
            x = next;
        }

        // Truncation can leave x one unit off: settle on the largest x with
        // x * x <= self.
        while x * x > self {
            x -= Self::EPSILON;
        }
        while (x + Self::EPSILON).square() <= self {
            x += Self::EPSILON;
        }
        x
    }

    /// Sine
    #[must_use]
    pub fn sin(self) -> Self {
        self.sin_cos().0
    }

    /// Cosine
    #[must_use]
    pub fn cos(self) -> Self {
        self.sin_cos().1
    }

    /// Simultaneous sine and cosine.
    #[must_use]
    pub fn sin_cos(self) -> (Self, Self) {
        // Reduce to [-π, π)
        let turns = ((self + Self::PI) / Self::TWO_PI).floor();
        let mut theta = self - Self::TWO_PI * turns;

        // Fold into [-π/2, π/2]; cosine changes sign, sine does not.
        let mut flip = false;
        if theta > Self::HALF_PI {
            theta = Self::PI - theta;
            flip = true;
        } else if theta < -Self::HALF_PI {
            theta = -Self::PI - theta;
            flip = true;
        }

        let (sin, cos) = taylor_sin_cos(theta);
        if flip {
            (sin, -cos)
        } else {
            (sin, cos)
        }
    }
}

fn taylor_sin_cos(x: Fix128) -> (Fix128, Fix128) {
    let x2 = x * x;
    let mut sin = x;
    let mut cos = Fix128::ONE;
    let mut sin_term = x;
    let mut cos_term = Fix128::ONE;

    for k in 1..=TAYLOR_TERMS {
        let n = 2 * k;
        cos_term = -(cos_term * x2) / Fix128::from_int((n - 1) * n);
        sin_term = -(sin_term * x2) / Fix128::from_int(n * (n + 1));
        cos += cos_term;
        sin += sin_term;
    }

    (sin, cos)
}

#[inline]
fn with_sign(magnitude: u128, negative: bool) -> Fix128 {
    let bits = magnitude as i128;
    Fix128 {
        bits: if negative { bits.wrapping_neg() } else { bits },
    }
}

impl Add for Fix128 {
    type Output = Self;

    #[inline]
    fn add(self, rhs: Self) -> Self {
        Self {
            bits: self.bits.wrapping_add(rhs.bits),
        }
    }
}

impl Sub for Fix128 {
    type Output = Self;

    #[inline]
    fn sub(self, rhs: Self) -> Self {
        Self {
            bits: self.bits.wrapping_sub(rhs.bits),
        }
    }
}

impl Mul for Fix128 {
    type Output = Self;

    fn mul(self, rhs: Self) -> Self {
        // |a| * |b| >> 64 assembled from 64-bit limbs:
        // (ah*bh << 64) + ah*bl + al*bh + (al*bl >> 64)
        let negative = (self.bits < 0) != (rhs.bits < 0);
        let a = self.bits.unsigned_abs();
        let b = rhs.bits.unsigned_abs();
        let (a_hi, a_lo) = (a >> FRAC_BITS, a & FRAC_MASK);
        let (b_hi, b_lo) = (b >> FRAC_BITS, b & FRAC_MASK);

        let magnitude = (a_hi.wrapping_mul(b_hi) << FRAC_BITS)
            .wrapping_add(a_hi.wrapping_mul(b_lo))
            .wrapping_add(a_lo.wrapping_mul(b_hi))
            .wrapping_add((a_lo * b_lo) >> FRAC_BITS);

        with_sign(magnitude, negative)
    }
}

impl Div for Fix128 {
    type Output = Self;

    fn div(self, rhs: Self) -> Self {
        if rhs.bits == 0 {
            return Self::ZERO;
        }

        let negative = (self.bits < 0) != (rhs.bits < 0);
        let a = self.bits.unsigned_abs();
        let b = rhs.bits.unsigned_abs();

        // Integer quotient, then 64 fraction bits by restoring long division.
        // remainder < b <= 2^127, so the shift never overflows.
        let mut remainder = a % b;
        let mut fraction: u128 = 0;
        for _ in 0..FRAC_BITS {
            remainder <<= 1;
            fraction <<= 1;
            if remainder >= b {
                remainder -= b;
                fraction |= 1;
            }
        }

        with_sign(((a / b) << FRAC_BITS) | fraction, negative)
    }
}

impl Neg for Fix128 {
    type Output = Self;

    #[inline]
    fn neg(self) -> Self {
        Self {
            bits: self.bits.wrapping_neg(),
        }
    }
}

impl AddAssign for Fix128 {
    #[inline]
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl SubAssign for Fix128 {
    #[inline]
    fn sub_assign(&mut self, rhs: Self) {
        *self = *self - rhs;
    }
}

impl fmt::Debug for Fix128 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fix128({})", self.to_f64())
    }
}

impl fmt::Display for Fix128 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_f64())
    }
}

// ============================================================================
// Vec2Fix: 2D Vector
// ============================================================================

/// 2D vector using [`Fix128`] components.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Vec2Fix {
    /// X component
    pub x: Fix128,
    /// Y component
    pub y: Fix128,
}

impl Vec2Fix {
    /// Zero vector (0, 0)
    pub const ZERO: Self = Self {
        x: Fix128::ZERO,
        y: Fix128::ZERO,
    };

    /// Unit X vector (1, 0)
    pub const UNIT_X: Self = Self {
        x: Fix128::ONE,
        y: Fix128::ZERO,
    };

    /// Unit Y vector (0, 1)
    pub const UNIT_Y: Self = Self {
        x: Fix128::ZERO,
        y: Fix128::ONE,
    };

    /// Create a new 2D vector.
    #[inline]
    #[must_use]
    pub const fn new(x: Fix128, y: Fix128) -> Self {
        Self { x, y }
    }

    /// Create from integer components.
    #[inline]
    #[must_use]
    pub const fn from_int(x: i64, y: i64) -> Self {
        Self {
            x: Fix128::from_int(x),
            y: Fix128::from_int(y),
        }
    }

    /// Create from f64 components (scene setup only).
    #[must_use]
    pub fn from_f64(x: f64, y: f64) -> Self {
        Self {
            x: Fix128::from_f64(x),
            y: Fix128::from_f64(y),
        }
    }

    /// Squared length (avoids sqrt).
    #[inline]
    #[must_use]
    pub fn length_squared(self) -> Fix128 {
        self.x * self.x + self.y * self.y
    }

    /// Length (magnitude).
    #[inline]
    #[must_use]
    pub fn length(self) -> Fix128 {
        self.length_squared().sqrt()
    }

    /// Normalize to unit length. Returns `ZERO` for zero-length vectors.
    #[must_use]
    pub fn normalize(self) -> Self {
        let len = self.length();
        if len.is_zero() {
            Self::ZERO
        } else {
            self / len
        }
    }

    /// Dot product.
    #[inline]
    #[must_use]
    pub fn dot(self, rhs: Self) -> Fix128 {
        self.x * rhs.x + self.y * rhs.y
    }

    /// 2D cross product (returns a scalar: `a.x * b.y - a.y * b.x`).
    #[inline]
    #[must_use]
    pub fn cross(self, rhs: Self) -> Fix128 {
        self.x * rhs.y - self.y * rhs.x
    }

    /// Perpendicular vector (90 degrees counter-clockwise): `(-y, x)`.
    ///
    /// `r.perpendicular() * w` is the velocity of point `r` on a body
    /// spinning at `w`.
    #[inline]
    #[must_use]
    pub fn perpendicular(self) -> Self {
        Self {
            x: -self.y,
            y: self.x,
        }
    }

    /// Rotate by precomputed sine and cosine.
    #[inline]
    #[must_use]
    pub fn rotate_by(self, sin: Fix128, cos: Fix128) -> Self {
        Self {
            x: self.x * cos - self.y * sin,
            y: self.x * sin + self.y * cos,
        }
    }

    /// Rotate by an angle (radians, counter-clockwise).
    #[must_use]
    pub fn rotate(self, angle: Fix128) -> Self {
        let (sin, cos) = angle.sin_cos();
        self.rotate_by(sin, cos)
    }

    /// Component-wise minimum.
    #[inline]
    #[must_use]
    pub fn min(self, rhs: Self) -> Self {
        Self {
            x: self.x.min(rhs.x),
            y: self.y.min(rhs.y),
        }
    }

    /// Component-wise maximum.
    #[inline]
    #[must_use]
    pub fn max(self, rhs: Self) -> Self {
        Self {
            x: self.x.max(rhs.x),
            y: self.y.max(rhs.y),
        }
    }

    /// Scale by a scalar.
    #[inline]
    #[must_use]
    pub fn scale(self, s: Fix128) -> Self {
        Self {
            x: self.x * s,
            y: self.y * s,
        }
    }
}

impl Add for Vec2Fix {
    type Output = Self;

    #[inline]
    fn add(self, rhs: Self) -> Self {
        Self {
            x: self.x + rhs.x,
            y: self.y + rhs.y,
        }
    }
}

impl Sub for Vec2Fix {
    type Output = Self;

    #[inline]
    fn sub(self, rhs: Self) -> Self {
        Self {
            x: self.x - rhs.x,
            y: self.y - rhs.y,
        }
    }
}

impl Mul<Fix128> for Vec2Fix {
    type Output = Self;

    #[inline]
    fn mul(self, rhs: Fix128) -> Self {
        self.scale(rhs)
    }
}

impl Div<Fix128> for Vec2Fix {
    type Output = Self;

    #[inline]
    fn div(self, rhs: Fix128) -> Self {
        Self {
            x: self.x / rhs,
            y: self.y / rhs,
        }
    }
}

impl Neg for Vec2Fix {
    type Output = Self;

    #[inline]
    fn neg(self) -> Self {
        Self {
            x: -self.x,
            y: -self.y,
        }
    }
}

impl AddAssign for Vec2Fix {
    #[inline]
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl SubAssign for Vec2Fix {
    #[inline]
    fn sub_assign(&mut self, rhs: Self) {
        *self = *self - rhs;
    }
}

// ============================================================================
// Tests
// ============================================================================
