//! Fixed-point math utilities for deterministic navigation.
//!
//! All navigation math uses fixed-point arithmetic so that every client
//! computes bit-identical positions, headings and speeds. Trigonometry is
//! done with a CORDIC kernel (shifts and adds only) instead of the
//! platform float library.

use fixed::types::I32F32;
use serde::{Deserialize, Serialize};

/// Fixed-point number type for all simulation math.
///
/// Uses 32 bits for integer part and 32 bits for fractional part.
/// Range: approximately -2,147,483,648 to 2,147,483,647
/// Precision: approximately 0.00000000023
pub type Fixed = I32F32;

/// Largest component for which `x² + y²` is computed directly.
const DIRECT_LENGTH_LIMIT: Fixed = Fixed::from_bits(16_384 << 32);

/// Half a turn, in radians.
pub const PI: Fixed = Fixed::from_bits(13_493_037_705);

/// A full turn, in radians.
pub const TAU: Fixed = Fixed::from_bits(26_986_075_409);

/// A quarter turn, in radians.
pub const FRAC_PI_2: Fixed = Fixed::from_bits(6_746_518_852);

/// 0.5
pub const HALF: Fixed = Fixed::from_bits(1 << 31);

/// CORDIC gain compensation: product of `1 / sqrt(1 + 2^-2i)` over all iterations.
const CORDIC_GAIN_INV: Fixed = Fixed::from_bits(2_608_131_496);

const CORDIC_ITERATIONS: usize = 32;

/// `atan(2^-i)` for each CORDIC iteration.
const ATAN_TABLE: [Fixed; CORDIC_ITERATIONS] = [
    Fixed::from_bits(3_373_259_426),
    Fixed::from_bits(1_991_351_318),
    Fixed::from_bits(1_052_175_346),
    Fixed::from_bits(534_100_635),
    Fixed::from_bits(268_086_748),
    Fixed::from_bits(134_174_063),
    Fixed::from_bits(67_103_403),
    Fixed::from_bits(33_553_749),
    Fixed::from_bits(16_777_131),
    Fixed::from_bits(8_388_597),
    Fixed::from_bits(4_194_303),
    Fixed::from_bits(2_097_152),
    Fixed::from_bits(1_048_576),
    Fixed::from_bits(524_288),
    Fixed::from_bits(262_144),
    Fixed::from_bits(131_072),
    Fixed::from_bits(65_536),
    Fixed::from_bits(32_768),
    Fixed::from_bits(16_384),
    Fixed::from_bits(8_192),
    Fixed::from_bits(4_096),
    Fixed::from_bits(2_048),
    Fixed::from_bits(1_024),
    Fixed::from_bits(512),
    Fixed::from_bits(256),
    Fixed::from_bits(128),
    Fixed::from_bits(64),
    Fixed::from_bits(32),
    Fixed::from_bits(16),
    Fixed::from_bits(8),
    Fixed::from_bits(4),
    Fixed::from_bits(2),
];

/// Fixed-point 2D vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Vec2Fixed {
    /// X coordinate.
    #[serde(with = "fixed_serde")]
    pub x: Fixed,
    /// Y coordinate (screen convention: grows southwards).
    #[serde(with = "fixed_serde")]
    pub y: Fixed,
}

/// Serde support for fixed-point numbers.
///
/// Serializes fixed-point numbers as their raw bit representation (i64)
/// to preserve exact precision across serialization boundaries.
pub mod fixed_serde {
    use super::Fixed;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    /// Serialize a fixed-point number as its raw bit representation.
    pub fn serialize<S>(value: &Fixed, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        value.to_bits().serialize(serializer)
    }

    /// Deserialize a fixed-point number from its raw bit representation.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Fixed, D::Error>
    where
        D: Deserializer<'de>,
    {
        let bits = i64::deserialize(deserializer)?;
        Ok(Fixed::from_bits(bits))
    }

    /// Serde support for `Vec<Fixed>` as raw bits.
    pub mod vec {
        use super::Fixed;
        use serde::{Deserialize, Deserializer, Serialize, Serializer};

        /// Serialize a list of fixed-point numbers as raw bits.
        pub fn serialize<S>(values: &[Fixed], serializer: S) -> Result<S::Ok, S::Error>
        where
            S: Serializer,
        {
            let bits: Vec<i64> = values.iter().map(|v| v.to_bits()).collect();
            bits.serialize(serializer)
        }

        /// Deserialize a list of fixed-point numbers from raw bits.
        pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<Fixed>, D::Error>
        where
            D: Deserializer<'de>,
        {
            let bits = Vec::<i64>::deserialize(deserializer)?;
            Ok(bits.into_iter().map(Fixed::from_bits).collect())
        }
    }
}

/// Serde support for fixed-point numbers written as decimals.
///
/// Used for hand-authored data files (`speeds: [8.0, 5.0]`). The decimal
/// is converted once at load time, so every client that loads the same
/// file gets the same bits.
pub mod fixed_decimal_serde {
    use super::Fixed;
    use serde::{Deserialize, Deserializer, Serializer};

    /// Serialize a fixed-point number as a decimal.
    pub fn serialize<S>(value: &Fixed, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_f64(value.to_num::<f64>())
    }

    /// Deserialize a fixed-point number from a decimal.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Fixed, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = f64::deserialize(deserializer)?;
        Fixed::checked_from_num(value)
            .ok_or_else(|| serde::de::Error::custom(format!("{value} is out of fixed-point range")))
    }

    /// Serde support for `Vec<Fixed>` written as decimals.
    pub mod vec {
        use super::Fixed;
        use serde::ser::SerializeSeq;
        use serde::{Deserialize, Deserializer, Serializer};

        /// Serialize a list of fixed-point numbers as decimals.
        pub fn serialize<S>(values: &[Fixed], serializer: S) -> Result<S::Ok, S::Error>
        where
            S: Serializer,
        {
            let mut seq = serializer.serialize_seq(Some(values.len()))?;
            for value in values {
                seq.serialize_element(&value.to_num::<f64>())?;
            }
            seq.end()
        }

        /// Deserialize a list of fixed-point numbers from decimals.
        pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<Fixed>, D::Error>
        where
            D: Deserializer<'de>,
        {
            let values = Vec::<f64>::deserialize(deserializer)?;
            values
                .into_iter()
                .map(|value| {
                    Fixed::checked_from_num(value).ok_or_else(|| {
                        serde::de::Error::custom(format!("{value} is out of fixed-point range"))
                    })
                })
                .collect()
        }
    }
}

impl Vec2Fixed {
    /// Create a new fixed-point vector.
    #[must_use]
    pub const fn new(x: Fixed, y: Fixed) -> Self {
        Self { x, y }
    }

    /// Zero vector.
    pub const ZERO: Self = Self {
        x: Fixed::ZERO,
        y: Fixed::ZERO,
    };

    /// Create a vector from integer coordinates.
    #[must_use]
    pub fn from_ints(x: i32, y: i32) -> Self {
        Self::new(Fixed::from_num(x), Fixed::from_num(y))
    }

    /// Unit vector pointing along `angle` (radians, measured from +x towards +y).
    #[must_use]
    pub fn from_angle(angle: Fixed) -> Self {
        let (sin, cos) = sin_cos(angle);
        Self::new(cos, sin)
    }

    /// Angle of this vector in `[-PI, PI]`.
    #[must_use]
    pub fn angle(self) -> Fixed {
        atan2(self.y, self.x)
    }

    /// Calculate squared distance (avoids sqrt for comparisons).
    ///
    /// Saturates at [`Fixed::MAX`] for separations beyond about 46k units,
    /// so far points still compare as far.
    #[must_use]
    pub fn distance_squared(self, other: Self) -> Fixed {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx.saturating_mul(dx).saturating_add(dy.saturating_mul(dy))
    }

    /// Euclidean distance between two points.
    #[must_use]
    pub fn distance(self, other: Self) -> Fixed {
        (self - other).length()
    }

    /// Length of the vector.
    ///
    /// Large vectors are measured as `hi * sqrt(1 + (lo / hi)²)` so the
    /// squares stay in range.
    #[must_use]
    pub fn length(self) -> Fixed {
        let ax = self.x.saturating_abs();
        let ay = self.y.saturating_abs();
        let (hi, lo) = if ax >= ay { (ax, ay) } else { (ay, ax) };

        if hi < DIRECT_LENGTH_LIMIT {
            return fixed_sqrt(self.dot(self));
        }

        let ratio = lo / hi;
        hi.saturating_mul(fixed_sqrt(Fixed::ONE + ratio * ratio))
    }

    /// Calculate Manhattan distance.
    #[must_use]
    pub fn manhattan_distance(self, other: Self) -> Fixed {
        (self.x - other.x).abs() + (self.y - other.y).abs()
    }

    /// Dot product of two vectors.
    #[must_use]
    pub fn dot(self, other: Self) -> Fixed {
        self.x * other.x + self.y * other.y
    }

    /// Linearly interpolate between two vectors.
    #[must_use]
    pub fn lerp(self, other: Self, t: Fixed) -> Self {
        Self {
            x: self.x + (other.x - self.x) * t,
            y: self.y + (other.y - self.y) * t,
        }
    }

    /// Perpendicular vector, rotated a quarter turn clockwise on screen.
    #[must_use]
    pub fn perpendicular(self) -> Self {
        Self::new(self.y, -self.x)
    }

    /// Check whether both components are zero.
    #[must_use]
    pub fn is_zero(self) -> bool {
        self.x == Fixed::ZERO && self.y == Fixed::ZERO
    }

    /// Normalize vector using fixed-point math.
    ///
    /// The zero vector normalizes to itself.
    #[must_use]
    pub fn normalize(self) -> Self {
        let len = self.length();
        if len == Fixed::ZERO {
            return Self::ZERO;
        }

        Self::new(self.x / len, self.y / len)
    }
}

/// Computes the square root of a fixed-point number using binary search.
///
/// Runs enough iterations to resolve every fractional bit of the result.
#[must_use]
pub fn fixed_sqrt(value: Fixed) -> Fixed {
    if value <= Fixed::ZERO {
        return Fixed::ZERO;
    }

    // Invariant: low² <= value < high².
    let mut low = Fixed::ZERO;
    let mut high = value.max(Fixed::ONE).saturating_add(Fixed::ONE);

    for _ in 0..64 {
        let mid = low + (high - low) / Fixed::from_num(2);
        if mid == low {
            break;
        }
        let mid_sq = mid.saturating_mul(mid);

        if mid_sq <= value {
            low = mid;
        } else {
            high = mid;
        }
    }

    low
}

/// Wrap an angle into `[-PI, PI]`.
#[must_use]
pub fn wrap_angle(mut radians: Fixed) -> Fixed {
    while radians < -PI {
        radians += TAU;
    }
    while radians > PI {
        radians -= TAU;
    }
    radians
}

/// Four-quadrant arctangent of `y / x`, in `[-PI, PI]`.
///
/// `atan2(0, 0)` is defined as zero.
#[must_use]
pub fn atan2(y: Fixed, x: Fixed) -> Fixed {
    if x == Fixed::ZERO && y == Fixed::ZERO {
        return Fixed::ZERO;
    }

    // Bring the larger component into [2^14, 2^16) so the shifts below
    // neither overflow nor run out of significant bits.
    let (mut x, mut y) = (x, y);
    let upper = Fixed::from_num(1 << 16);
    let lower = Fixed::from_num(1 << 14);
    let mut magnitude = x.saturating_abs().max(y.saturating_abs());
    while magnitude >= upper {
        x >>= 1u32;
        y >>= 1u32;
        magnitude >>= 1u32;
    }
    while magnitude < lower {
        x <<= 1u32;
        y <<= 1u32;
        magnitude <<= 1u32;
    }

    // Rotate into the right half-plane.
    let mut angle = Fixed::ZERO;
    if x < Fixed::ZERO {
        if y >= Fixed::ZERO {
            (x, y) = (y, -x);
            angle = FRAC_PI_2;
        } else {
            (x, y) = (-y, x);
            angle = -FRAC_PI_2;
        }
    }

    for (i, step) in ATAN_TABLE.iter().enumerate() {
        let shift = i as u32;
        let (x_shifted, y_shifted) = (x >> shift, y >> shift);
        if y > Fixed::ZERO {
            x += y_shifted;
            y -= x_shifted;
            angle += *step;
        } else {
            x -= y_shifted;
            y += x_shifted;
            angle -= *step;
        }
    }

    angle
}

/// Sine and cosine of an angle in radians, returned as `(sin, cos)`.
#[must_use]
pub fn sin_cos(angle: Fixed) -> (Fixed, Fixed) {
    let mut angle = wrap_angle(angle);
    let mut flip = false;
    if angle > FRAC_PI_2 {
        angle -= PI;
        flip = true;
    } else if angle < -FRAC_PI_2 {
        angle += PI;
        flip = true;
    }

    let mut x = CORDIC_GAIN_INV;
    let mut y = Fixed::ZERO;
    let mut z = angle;
    for (i, step) in ATAN_TABLE.iter().enumerate() {
        let shift = i as u32;
        let (x_shifted, y_shifted) = (x >> shift, y >> shift);
        if z >= Fixed::ZERO {
            x -= y_shifted;
            y += x_shifted;
            z -= *step;
        } else {
            x += y_shifted;
            y -= x_shifted;
            z += *step;
        }
    }

    if flip {
        (-y, -x)
    } else {
        (y, x)
    }
}

impl std::ops::Add for Vec2Fixed {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self {
            x: self.x + rhs.x,
            y: self.y + rhs.y,
        }
    }
}

impl std::ops::Sub for Vec2Fixed {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self {
            x: self.x - rhs.x,
            y: self.y - rhs.y,
        }
    }
}

impl std::ops::Neg for Vec2Fixed {
    type Output = Self;

    fn neg(self) -> Self::Output {
        Self {
            x: -self.x,
            y: -self.y,
        }
    }
}

impl std::ops::Mul<Fixed> for Vec2Fixed {
    type Output = Self;

    fn mul(self, rhs: Fixed) -> Self::Output {
        Self {
            x: self.x * rhs,
            y: self.y * rhs,
        }
    }
}

impl std::ops::AddAssign for Vec2Fixed {
    fn add_assign(&mut self, rhs: Self) {
        self.x += rhs.x;
        self.y += rhs.y;
    }
}

impl std::ops::SubAssign for Vec2Fixed {
    fn sub_assign(&mut self, rhs: Self) {
        self.x -= rhs.x;
        self.y -= rhs.y;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixed(n: i32) -> Fixed {
        Fixed::from_num(n)
    }

    fn close(a: Fixed, b: Fixed) -> bool {
        (a - b).abs() < Fixed::from_num(1) / Fixed::from_num(100_000)
    }

    #[test]
    fn test_vec2_distance_squared() {
        let a = Vec2Fixed::new(fixed(3), fixed(0));
        let b = Vec2Fixed::new(fixed(0), fixed(4));
        // 3² + 4² = 25
        assert_eq!(a.distance_squared(b), fixed(25));
        assert_eq!(a.distance(b), fixed(5));
    }

    #[test]
    fn test_far_points_measure_without_overflow() {
        let origin = Vec2Fixed::ZERO;
        let far = Vec2Fixed::from_ints(50_000, 0);
        assert_eq!(origin.distance_squared(far), Fixed::MAX);
        assert_eq!(origin.distance(far), fixed(50_000));
        assert_eq!(far.normalize(), Vec2Fixed::new(Fixed::ONE, Fixed::ZERO));

        let diagonal = Vec2Fixed::from_ints(30_000, 40_000);
        assert!((diagonal.length() - fixed(50_000)).abs() < fixed(1));
        assert!(close(diagonal.normalize().length(), Fixed::ONE));
    }

    #[test]
    fn test_fixed_determinism() {
        let a = Fixed::from_num(1) / Fixed::from_num(3);
        let b = Fixed::from_num(1) / Fixed::from_num(3);
        assert_eq!(a, b);
        assert_eq!(atan2(a, b), atan2(a, b));
        assert_eq!(sin_cos(a), sin_cos(b));
    }

    #[test]
    fn test_vec2_dot() {
        let a = Vec2Fixed::new(fixed(2), fixed(3));
        let b = Vec2Fixed::new(fixed(4), fixed(-1));
        assert_eq!(a.dot(b), fixed(5));
    }

    #[test]
    fn test_vec2_lerp() {
        let a = Vec2Fixed::ZERO;
        let b = Vec2Fixed::from_ints(10, 20);
        assert_eq!(a.lerp(b, HALF), Vec2Fixed::from_ints(5, 10));
    }

    #[test]
    fn test_vec2_normalize() {
        let norm = Vec2Fixed::from_ints(3, 4).normalize();
        assert!(close(norm.x, Fixed::from_num(0.6)));
        assert!(close(norm.y, Fixed::from_num(0.8)));
        assert!(close(norm.length(), Fixed::ONE));
    }

    #[test]
    fn test_normalize_axis_aligned_is_exact() {
        assert_eq!(
            Vec2Fixed::from_ints(100, 0).normalize(),
            Vec2Fixed::new(Fixed::ONE, Fixed::ZERO)
        );
        assert_eq!(Vec2Fixed::ZERO.normalize(), Vec2Fixed::ZERO);
    }

    #[test]
    fn test_sqrt_perfect_squares() {
        for n in [0, 1, 4, 9, 144, 10_000, 1_000_000] {
            let root = fixed_sqrt(Fixed::from_num(n));
            assert_eq!(root * root, Fixed::from_num(n), "sqrt({n})");
        }
    }

    #[test]
    fn test_atan2_quadrants() {
        let cases = [
            (1, 0, 0.0),
            (1, 1, std::f64::consts::FRAC_PI_4),
            (0, 1, std::f64::consts::FRAC_PI_2),
            (-1, 1, 3.0 * std::f64::consts::FRAC_PI_4),
            (-1, 0, std::f64::consts::PI),
            (-1, -1, -3.0 * std::f64::consts::FRAC_PI_4),
            (0, -1, -std::f64::consts::FRAC_PI_2),
            (1, -1, -std::f64::consts::FRAC_PI_4),
        ];
        for (x, y, expected) in cases {
            let angle = atan2(fixed(y), fixed(x));
            assert!(
                close(angle, Fixed::from_num(expected)),
                "atan2({y}, {x}) = {angle}, expected {expected}"
            );
        }
        assert_eq!(atan2(Fixed::ZERO, Fixed::ZERO), Fixed::ZERO);
    }

    #[test]
    fn test_atan2_is_scale_invariant_for_large_and_small_vectors() {
        let base = atan2(fixed(3), fixed(-4));
        let large = atan2(fixed(30_000), fixed(-40_000));
        let small = atan2(Fixed::from_num(0.003), Fixed::from_num(-0.004));
        assert!(close(base, large));
        assert!(close(base, small));
    }

    #[test]
    fn test_sin_cos_known_angles() {
        let (s, c) = sin_cos(Fixed::ZERO);
        assert!(close(s, Fixed::ZERO) && close(c, Fixed::ONE));

        let (s, c) = sin_cos(FRAC_PI_2);
        assert!(close(s, Fixed::ONE) && close(c, Fixed::ZERO));

        let (s, c) = sin_cos(PI);
        assert!(close(s, Fixed::ZERO) && close(c, -Fixed::ONE));

        let (s, c) = sin_cos(-FRAC_PI_2);
        assert!(close(s, -Fixed::ONE) && close(c, Fixed::ZERO));

        // Angles outside [-PI, PI] wrap.
        let (s, c) = sin_cos(TAU + FRAC_PI_2);
        assert!(close(s, Fixed::ONE) && close(c, Fixed::ZERO));
    }

    #[test]
    fn test_from_angle_round_trips_through_angle() {
        for degrees in [-170, -90, -45, 0, 30, 89, 135, 179] {
            let radians = Fixed::from_num(degrees) * PI / Fixed::from_num(180);
            let v = Vec2Fixed::from_angle(radians);
            assert!(close(v.length(), Fixed::ONE));
            assert!(close(v.angle(), radians), "{degrees} degrees");
        }
    }

    #[test]
    fn test_wrap_angle() {
        assert_eq!(wrap_angle(Fixed::ZERO), Fixed::ZERO);
        assert!(close(wrap_angle(PI + FRAC_PI_2), -FRAC_PI_2));
        assert!(close(wrap_angle(-PI - FRAC_PI_2), FRAC_PI_2));
        assert_eq!(wrap_angle(PI), PI);
    }

    #[test]
    fn test_vector_operators() {
        let mut v = Vec2Fixed::from_ints(1, 2);
        v += Vec2Fixed::from_ints(3, 4);
        assert_eq!(v, Vec2Fixed::from_ints(4, 6));
        v -= Vec2Fixed::from_ints(1, 1);
        assert_eq!(v, Vec2Fixed::from_ints(3, 5));
        assert_eq!(v * fixed(2), Vec2Fixed::from_ints(6, 10));
        assert_eq!(-v, Vec2Fixed::from_ints(-3, -5));
        assert_eq!(v.perpendicular(), Vec2Fixed::from_ints(5, -3));
    }
}
