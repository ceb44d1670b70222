// sigsynth -- composable signal synthesis driven by text scores
// Copyright (C) 2021  Fabian Thorand
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation.
//
// A copy of the license can be found in the LICENSE file in the root of
// this repository.

//! Exact fractions, used for note durations measured in bars.

use std::{cmp::Ordering, fmt, iter, ops};

type Int = i64;

/// A fraction in lowest terms with a positive denominator.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct Rational {
    num: Int,
    denom: Int,
}

impl Rational {
    /// Create a rational from a fraction that need not be in lowest terms.
    ///
    /// # Panic
    ///
    /// Panics if the denominator is zero. Use [`Rational::checked_new`] for untrusted input.
    ///
    /// # Examples
    ///
    /// ```
    /// use sigsynth::rational::*;
    ///
    /// assert_eq!(Rational::new(6, 8), Rational::new(3, 4));
    /// assert_eq!(Rational::new(3, -4).numerator(), -3);
    /// assert_eq!(Rational::new(-3, -4).denominator(), 4);
    /// ```
    pub fn new(num: Int, denom: Int) -> Rational {
        assert_ne!(denom, 0, "Denominator must not be zero");
        Self::normalized(num, denom)
    }

    /// Like [`Rational::new`], but returns `None` for a zero denominator.
    pub fn checked_new(num: Int, denom: Int) -> Option<Rational> {
        if denom == 0 {
            None
        } else {
            Some(Self::normalized(num, denom))
        }
    }

    fn normalized(num: Int, denom: Int) -> Rational {
        let div = gcd(num, denom).max(1);
        let sign = if denom < 0 { -1 } else { 1 };
        Rational {
            num: sign * num / div,
            denom: sign * denom / div,
        }
    }

    pub fn int(value: Int) -> Rational {
        Rational {
            num: value,
            denom: 1,
        }
    }

    pub fn zero() -> Rational {
        Self::int(0)
    }

    pub fn one() -> Rational {
        Self::int(1)
    }

    /// The fraction `1/n`.
    pub fn nth(n: Int) -> Rational {
        Rational::new(1, n)
    }

    pub fn recip(self) -> Rational {
        Rational::new(self.denom, self.num)
    }

    pub fn numerator(self) -> Int {
        self.num
    }

    pub fn denominator(self) -> Int {
        self.denom
    }

    pub fn as_f64(self) -> f64 {
        self.num as f64 / self.denom as f64
    }

    /// Addition that returns `None` instead of overflowing.
    pub fn checked_add(self, rhs: Rational) -> Option<Rational> {
        let num = self
            .num
            .checked_mul(rhs.denom)?
            .checked_add(self.denom.checked_mul(rhs.num)?)?;
        let denom = self.denom.checked_mul(rhs.denom)?;
        Some(Self::normalized(num, denom))
    }
}

/// # Examples
///
/// ```
/// use sigsynth::rational::*;
///
/// assert_eq!(Rational::new(1, 4) + Rational::new(1, 8), Rational::new(3, 8));
/// assert_eq!(Rational::new(1, 2) + Rational::new(-3, 4), Rational::new(-1, 4));
/// ```
impl ops::Add for Rational {
    type Output = Rational;

    fn add(self, rhs: Rational) -> Rational {
        Rational::new(self.num * rhs.denom + rhs.num * self.denom, self.denom * rhs.denom)
    }
}

impl ops::Sub for Rational {
    type Output = Rational;

    fn sub(self, rhs: Rational) -> Rational {
        self + -rhs
    }
}

impl ops::Mul for Rational {
    type Output = Rational;

    fn mul(self, rhs: Rational) -> Rational {
        Rational::new(self.num * rhs.num, self.denom * rhs.denom)
    }
}

impl ops::Mul<Int> for Rational {
    type Output = Rational;

    fn mul(self, rhs: Int) -> Rational {
        Rational::new(self.num * rhs, self.denom)
    }
}

impl ops::Div for Rational {
    type Output = Rational;

    fn div(self, rhs: Rational) -> Rational {
        self * rhs.recip()
    }
}

impl ops::Neg for Rational {
    type Output = Rational;

    fn neg(self) -> Rational {
        Rational {
            num: -self.num,
            denom: self.denom,
        }
    }
}

impl ops::AddAssign for Rational {
    fn add_assign(&mut self, rhs: Rational) {
        *self = *self + rhs;
    }
}

impl ops::SubAssign for Rational {
    fn sub_assign(&mut self, rhs: Rational) {
        *self = *self - rhs;
    }
}

impl iter::Sum for Rational {
    fn sum<I: Iterator<Item = Rational>>(iter: I) -> Rational {
        iter.fold(Rational::zero(), |acc, x| acc + x)
    }
}

impl PartialOrd for Rational {
    fn partial_cmp(&self, other: &Rational) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// ```
/// use sigsynth::rational::*;
///
/// assert!(Rational::new(3, 8) < Rational::new(1, 2));
/// assert!(Rational::new(-1, 2) < Rational::zero());
/// ```
impl Ord for Rational {
    fn cmp(&self, other: &Rational) -> Ordering {
        // denominators are positive, so cross multiplying keeps the order
        (self.num * other.denom).cmp(&(other.num * self.denom))
    }
}

impl fmt::Display for Rational {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.denom == 1 {
            write!(f, "{}", self.num)
        } else {
            write!(f, "{}/{}", self.num, self.denom)
        }
    }
}

/// Greatest common divisor, always non-negative.
///
/// ```
/// use sigsynth::rational::gcd;
///
/// assert_eq!(gcd(12, 18), 6);
/// assert_eq!(gcd(-4, 6), 2);
/// assert_eq!(gcd(0, 7), 7);
/// assert_eq!(gcd(0, 0), 0);
/// ```
pub fn gcd(a: Int, b: Int) -> Int {
    let (mut a, mut b) = (a.abs(), b.abs());
    while b != 0 {
        let r = a % b;
        a = b;
        b = r;
    }
    a
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn checked_construction() {
        assert_eq!(Rational::checked_new(1, 0), None);
        assert_eq!(Rational::checked_new(0, -5), Some(Rational::zero()));
        assert_eq!(Rational::checked_new(4, -6), Some(Rational::new(-2, 3)));
    }

    #[test]
    fn arithmetic() {
        let third = Rational::nth(3);
        assert_eq!(third * 3, Rational::one());
        assert_eq!(third - Rational::nth(2), Rational::new(-1, 6));
        assert_eq!(Rational::new(3, 4) / Rational::new(3, 8), Rational::int(2));
        assert_eq!(Rational::new(2, 3).recip(), Rational::new(3, 2));
        assert_eq!(
            vec![Rational::nth(2), Rational::nth(4), Rational::nth(4)]
                .into_iter()
                .sum::<Rational>(),
            Rational::one()
        );
        assert_eq!(Rational::new(3, 8).as_f64(), 0.375);
    }

    #[test]
    fn overflow_is_detected() {
        let tiny = Rational::nth(Int::MAX);
        assert_eq!(tiny.checked_add(Rational::nth(Int::MAX - 1)), None);
        assert_eq!(
            Rational::nth(2).checked_add(Rational::nth(3)),
            Some(Rational::new(5, 6))
        );
    }

    #[test]
    fn display() {
        assert_eq!(Rational::new(6, 4).to_string(), "3/2");
        assert_eq!(Rational::int(-2).to_string(), "-2");
    }
}
