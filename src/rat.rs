// src/rat.rs

// Exact rational arithmetic over arbitrary-precision integers.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use num_bigint::BigInt;
use num_integer::Integer;
use num_rational::BigRational;
use num_traits::{One, Signed, ToPrimitive, Zero};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{Result, UserError, ValueError};

/// Largest denominator `approx` will scan. The scan is linear in the denominator.
pub const MAX_APPROX_DENOM: u64 = 4096;

/// A fraction `num / denom`. The sign may sit on either field and the value is
/// not kept in lowest terms unless `simplify` is called; every arithmetic
/// operation returns a simplified result.
#[derive(Debug, Clone)]
pub struct Rational {
    pub num: BigInt,
    pub denom: BigInt,
}

/// Mixed-number form `integer + num/denom` with `0 <= num < denom`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProperFraction {
    pub integer: BigInt,
    pub num: BigInt,
    pub denom: BigInt,
}

// --- Free Helpers ---

/// Euclid's algorithm. `gcd(a, 0) == |a|`.
pub fn gcd(a: &BigInt, b: &BigInt) -> BigInt {
    let mut a = a.abs();
    let mut b = b.abs();
    while !b.is_zero() {
        let r = &a % &b;
        a = b;
        b = r;
    }
    a
}

/// Splits a finite float into an integer mantissa and binary exponent such
/// that `mantissa * 2^exponent == x` exactly. The mantissa is odd unless `x` is zero.
pub fn frexp(x: f64) -> (i64, i32) {
    if x == 0.0 {
        return (0, 0);
    }
    let bits = x.to_bits();
    let sign: i64 = if bits >> 63 == 0 { 1 } else { -1 };
    let biased = ((bits >> 52) & 0x7ff) as i32;
    let fraction = (bits & 0x000f_ffff_ffff_ffff) as i64;

    let (mut mantissa, mut exponent) = if biased == 0 {
        // Subnormal: no implicit leading bit.
        (fraction, -1074)
    } else {
        (fraction | (1 << 52), biased - 1075)
    };
    while mantissa & 1 == 0 {
        mantissa >>= 1;
        exponent += 1;
    }
    (sign * mantissa, exponent)
}

/// `x * 2^exp`, applied in steps so no intermediate power of two overflows.
pub fn ldexp(mut x: f64, mut exp: i32) -> f64 {
    while exp > 1000 && x.is_finite() && x != 0.0 {
        x *= 2f64.powi(1000);
        exp -= 1000;
    }
    while exp < -1000 && x.is_finite() && x != 0.0 {
        x *= 2f64.powi(-1000);
        exp += 1000;
    }
    if x == 0.0 || !x.is_finite() {
        return x;
    }
    x * 2f64.powi(exp)
}

/// Converts an integer-valued float to an exact integer.
pub fn float_to_integer(x: f64) -> Result<BigInt> {
    if !x.is_finite() || x.fract() != 0.0 {
        return Err(ValueError::NotAnInteger(x.to_string()).into());
    }
    Rational::from_float(x)?.to_integer()
}

// --- Rational ---

impl Rational {
    pub fn new(num: impl Into<BigInt>, denom: impl Into<BigInt>) -> Result<Self> {
        let denom = denom.into();
        if denom.is_zero() {
            return Err(UserError::DivisionByZero);
        }
        Ok(Self { num: num.into(), denom })
    }

    pub fn from_integer(n: impl Into<BigInt>) -> Self {
        Self { num: n.into(), denom: BigInt::one() }
    }

    pub fn zero() -> Self {
        Self::from_integer(0)
    }

    pub fn is_zero(&self) -> bool {
        self.num.is_zero()
    }

    pub fn is_negative(&self) -> bool {
        self.num.is_negative() != self.denom.is_negative() && !self.num.is_zero()
    }

    pub fn is_integer(&self) -> bool {
        (&self.num % &self.denom).is_zero()
    }

    /// Lowest terms with a positive denominator.
    pub fn simplify(&self) -> Rational {
        if self.num.is_zero() {
            return Rational::zero();
        }
        let g = gcd(&self.num, &self.denom);
        let (mut num, mut denom) = (&self.num / &g, &self.denom / &g);
        if denom.is_negative() {
            num = -num;
            denom = -denom;
        }
        Rational { num, denom }
    }

    pub fn add(&self, other: &Rational) -> Rational {
        Rational {
            num: &self.num * &other.denom + &other.num * &self.denom,
            denom: &self.denom * &other.denom,
        }
        .simplify()
    }

    pub fn sub(&self, other: &Rational) -> Rational {
        self.add(&other.neg())
    }

    pub fn mul(&self, other: &Rational) -> Rational {
        Rational {
            num: &self.num * &other.num,
            denom: &self.denom * &other.denom,
        }
        .simplify()
    }

    pub fn div(&self, other: &Rational) -> Result<Rational> {
        Ok(self.mul(&other.inv()?))
    }

    pub fn inv(&self) -> Result<Rational> {
        if self.is_zero() {
            return Err(UserError::DivisionByZero);
        }
        Ok(Rational { num: self.denom.clone(), denom: self.num.clone() }.simplify())
    }

    pub fn neg(&self) -> Rational {
        Rational { num: -&self.num, denom: self.denom.clone() }
    }

    pub fn abs(&self) -> Rational {
        Rational { num: self.num.abs(), denom: self.denom.abs() }
    }

    /// Largest integer not greater than the value.
    pub fn floor_integer(&self) -> BigInt {
        let r = self.simplify();
        r.num.div_floor(&r.denom)
    }

    pub fn floor(&self) -> Rational {
        Rational::from_integer(self.floor_integer())
    }

    pub fn ceil(&self) -> Rational {
        Rational::from_integer(-self.neg().floor_integer())
    }

    pub fn to_integer(&self) -> Result<BigInt> {
        let r = self.simplify();
        if !r.denom.is_one() {
            return Err(ValueError::NotAnInteger(r.to_string()).into());
        }
        Ok(r.num)
    }

    // --- Mixed Numbers ---

    /// Floor-based split, so `integer` carries the sign and `0 <= num < denom`.
    pub fn to_proper(&self) -> ProperFraction {
        let r = self.simplify();
        let (integer, num) = r.num.div_mod_floor(&r.denom);
        ProperFraction { integer, num, denom: r.denom }
    }

    pub fn from_proper(p: &ProperFraction) -> Result<Rational> {
        Rational::new(&p.integer * &p.denom + &p.num, p.denom.clone())
    }

    // --- Float Conversion ---

    /// Exact conversion of any finite double.
    pub fn from_float(x: f64) -> Result<Rational> {
        if !x.is_finite() {
            return Err(ValueError::NotARatio(x.to_string()).into());
        }
        let (mantissa, exponent) = frexp(x);
        let mantissa = BigInt::from(mantissa);
        let r = if exponent >= 0 {
            Rational::from_integer(mantissa << exponent as usize)
        } else {
            Rational { num: mantissa, denom: BigInt::one() << (-exponent) as usize }
        };
        Ok(r.simplify())
    }

    /// Nearest double, rounded once (ties to even), subnormals included.
    pub fn to_float(&self) -> f64 {
        let r = self.simplify();
        if r.num.is_zero() {
            return 0.0;
        }
        let negative = r.num.is_negative();
        BigRational::new_raw(r.num, r.denom)
            .to_f64()
            .unwrap_or(if negative { f64::NEG_INFINITY } else { f64::INFINITY })
    }

    /// Nearest fraction with the fixed denominator `denom`. The whole part is
    /// kept and the numerators `0..=denom` of the fractional part are scanned,
    /// ties going to the smaller numerator.
    pub fn approx(&self, denom: u64) -> Result<Rational> {
        if denom == 0 {
            return Err(UserError::DivisionByZero);
        }
        if denom > MAX_APPROX_DENOM {
            return Err(UserError::DenominatorTooLarge(denom));
        }
        let whole = self.floor_integer();
        let frac = self.sub(&Rational::from_integer(whole.clone()));
        let d = BigInt::from(denom);

        let mut best = BigInt::zero();
        let mut best_err = frac.abs();
        for n in 1..=denom {
            let candidate = Rational { num: BigInt::from(n), denom: d.clone() };
            let err = frac.sub(&candidate).abs();
            if err < best_err {
                best = BigInt::from(n);
                best_err = err;
            }
        }
        Ok(Rational { num: whole * &d + best, denom: d })
    }

    /// Normalized `(num, denom)` with a positive denominator, for comparison.
    fn signed_parts(&self) -> (BigInt, BigInt) {
        if self.denom.is_negative() {
            (-&self.num, -&self.denom)
        } else {
            (self.num.clone(), self.denom.clone())
        }
    }
}

impl From<i32> for Rational {
    fn from(n: i32) -> Self {
        Rational::from_integer(n)
    }
}

impl From<i64> for Rational {
    fn from(n: i64) -> Self {
        Rational::from_integer(n)
    }
}

impl From<BigInt> for Rational {
    fn from(n: BigInt) -> Self {
        Rational::from_integer(n)
    }
}

/// Parses `7`, `-4.25`, `3/4` and the mixed form `2_1/8`, all exactly.
impl FromStr for Rational {
    type Err = UserError;

    fn from_str(text: &str) -> Result<Self> {
        let bad = || UserError::Value(ValueError::NotARatio(text.to_string()));
        let int = |digits: &str| -> Result<BigInt> {
            if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
                return Err(bad());
            }
            digits.parse().map_err(|_| bad())
        };

        let (negative, body) = match text.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, text),
        };
        let value = if let Some((whole, frac)) = body.split_once('.') {
            if whole.is_empty() && frac.is_empty() {
                return Err(bad());
            }
            let whole = if whole.is_empty() { BigInt::zero() } else { int(whole)? };
            let scale = BigInt::from(10u32).pow(frac.len() as u32);
            let frac = if frac.is_empty() { BigInt::zero() } else { int(frac)? };
            Rational::new(whole * &scale + frac, scale)?
        } else if let Some((head, denom)) = body.split_once('/') {
            let (whole, num) = match head.split_once('_') {
                Some((whole, num)) => (int(whole)?, int(num)?),
                None => (BigInt::zero(), int(head)?),
            };
            let denom = int(denom)?;
            Rational::new(whole * &denom + num, denom)?
        } else {
            Rational::from_integer(int(body)?)
        };

        let value = if negative { value.neg() } else { value };
        Ok(value.simplify())
    }
}

// Equality is equality of the values, not of the fields: 2/4 == 1/2 == -1/-2.
impl PartialEq for Rational {
    fn eq(&self, other: &Self) -> bool {
        &self.num * &other.denom == &other.num * &self.denom
    }
}

impl Eq for Rational {}

impl PartialOrd for Rational {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Rational {
    fn cmp(&self, other: &Self) -> Ordering {
        let (an, ad) = self.signed_parts();
        let (bn, bd) = other.signed_parts();
        (an * bd).cmp(&(bn * ad))
    }
}

impl fmt::Display for Rational {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let r = self.simplify();
        if r.denom.is_one() {
            write!(f, "{}", r.num)
        } else {
            write!(f, "{}/{}", r.num, r.denom)
        }
    }
}

impl fmt::Display for ProperFraction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Show the magnitude as a mixed number: -7/2 is "-3 1/2", not "-4 1/2".
        let value = Rational {
            num: &self.integer * &self.denom + &self.num,
            denom: self.denom.clone(),
        };
        let sign = if value.is_negative() { "-" } else { "" };
        let magnitude = value.abs().to_proper();
        match (magnitude.integer.is_zero(), magnitude.num.is_zero()) {
            (_, true) => write!(f, "{}{}", sign, magnitude.integer),
            (true, false) => write!(f, "{}{}/{}", sign, magnitude.num, magnitude.denom),
            (false, false) => write!(
                f,
                "{}{} {}/{}",
                sign, magnitude.integer, magnitude.num, magnitude.denom
            ),
        }
    }
}

// --- Serialization ---

/// Serde adapter writing a `BigInt` as a decimal string.
pub mod decimal {
    use num_bigint::BigInt;
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(n: &BigInt, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&n.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<BigInt, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(D::Error::custom)
    }
}

// JSON has no bignum literal, so both fields travel as decimal strings.
#[derive(Serialize, Deserialize)]
struct RationalRepr {
    num: String,
    denom: String,
}

impl Serialize for Rational {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        RationalRepr { num: self.num.to_string(), denom: self.denom.to_string() }
            .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Rational {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        use serde::de::Error;

        let repr = RationalRepr::deserialize(deserializer)?;
        let num: BigInt = repr.num.parse().map_err(D::Error::custom)?;
        let denom: BigInt = repr.denom.parse().map_err(D::Error::custom)?;
        Rational::new(num, denom).map_err(D::Error::custom)
    }
}
