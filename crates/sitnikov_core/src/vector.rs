//! Dense phase-space vectors.
//!
//! The additive identity is a dimensionless sentinel so that `zero()` can be
//! produced without knowing the dimension of the problem. Every binary
//! operation handles the sentinel before it compares lengths.
//!
//! Length mismatches between two non-sentinel vectors are rejected in every
//! build profile: the `try_*` methods return [`IntegratorError::InvalidArgument`],
//! the operators panic with the same message.

use crate::error::{IntegratorError, Result};
use crate::traits::{Field, LinearSpace};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Index, IndexMut, Mul, Neg, Sub};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vector<T> {
    coords: Vec<T>,
    #[serde(default)]
    is_zero: bool,
}

impl<T: Field> Vector<T> {
    pub fn new(coords: Vec<T>) -> Self {
        Self {
            coords,
            is_zero: false,
        }
    }

    /// A genuine vector of `dim` zero coordinates (not the sentinel).
    pub fn zeros(dim: usize) -> Self {
        Self::new(vec![T::zero(); dim])
    }

    /// The single-entry vector `[1]`.
    pub fn unit() -> Self {
        Self::new(vec![T::one()])
    }

    pub fn is_sentinel(&self) -> bool {
        self.is_zero
    }

    pub fn len(&self) -> usize {
        self.coords.len()
    }

    pub fn is_empty(&self) -> bool {
        self.coords.is_empty()
    }

    pub fn as_slice(&self) -> &[T] {
        &self.coords
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.coords.iter()
    }

    pub fn into_vec(self) -> Vec<T> {
        self.coords
    }

    pub fn try_add(self, rhs: Self) -> Result<Self> {
        if self.is_zero {
            return Ok(rhs);
        }
        if rhs.is_zero {
            return Ok(self);
        }
        if self.len() != rhs.len() {
            return Err(IntegratorError::dimension_mismatch(self.len(), rhs.len()));
        }

        let mut coords = self.coords;
        for (a, b) in coords.iter_mut().zip(rhs.coords) {
            *a = *a + b;
        }
        Ok(Self::new(coords))
    }

    pub fn try_sub(self, rhs: Self) -> Result<Self> {
        self.try_add(rhs.negated())
    }

    pub fn try_dot(&self, rhs: &Self) -> Result<T> {
        if self.is_zero || rhs.is_zero {
            return Ok(T::zero());
        }
        if self.len() != rhs.len() {
            return Err(IntegratorError::dimension_mismatch(self.len(), rhs.len()));
        }

        Ok(self
            .coords
            .iter()
            .zip(&rhs.coords)
            .fold(T::zero(), |acc, (&a, &b)| acc + a * b))
    }

    /// Dot product. Panics on a dimension mismatch, see [`Vector::try_dot`].
    pub fn dot(&self, rhs: &Self) -> T {
        match self.try_dot(rhs) {
            Ok(value) => value,
            Err(err) => panic!("{err}"),
        }
    }
}

impl<T: Field> LinearSpace for Vector<T> {
    type Scalar = T;

    fn zero() -> Self {
        Self {
            coords: Vec::new(),
            is_zero: true,
        }
    }

    fn plus(self, rhs: Self) -> Self {
        match self.try_add(rhs) {
            Ok(sum) => sum,
            Err(err) => panic!("{err}"),
        }
    }

    fn scale(self, k: T) -> Self {
        if self.is_zero {
            return self;
        }
        let mut coords = self.coords;
        for value in coords.iter_mut() {
            *value = *value * k;
        }
        Self::new(coords)
    }
}

impl<T: Field> Add for Vector<T> {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        self.plus(rhs)
    }
}

impl<T: Field> Sub for Vector<T> {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        self.minus(rhs)
    }
}

impl<T: Field> Neg for Vector<T> {
    type Output = Self;
    fn neg(self) -> Self {
        self.negated()
    }
}

impl<T: Field> Mul<T> for Vector<T> {
    type Output = Self;
    fn mul(self, rhs: T) -> Self {
        self.scale(rhs)
    }
}

macro_rules! impl_left_scalar_mul {
    ($($t:ty),*) => {
        $(
            impl Mul<Vector<$t>> for $t {
                type Output = Vector<$t>;
                fn mul(self, rhs: Vector<$t>) -> Vector<$t> {
                    rhs.scale(self)
                }
            }
        )*
    };
}

impl_left_scalar_mul!(f32, f64);

impl<T> Index<usize> for Vector<T> {
    type Output = T;
    fn index(&self, index: usize) -> &T {
        &self.coords[index]
    }
}

impl<T> IndexMut<usize> for Vector<T> {
    fn index_mut(&mut self, index: usize) -> &mut T {
        &mut self.coords[index]
    }
}

impl<T: Field> From<Vec<T>> for Vector<T> {
    fn from(coords: Vec<T>) -> Self {
        Self::new(coords)
    }
}

impl<T: Field, const N: usize> From<[T; N]> for Vector<T> {
    fn from(coords: [T; N]) -> Self {
        Self::new(coords.to_vec())
    }
}

impl<T: Field> FromIterator<T> for Vector<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl<T: fmt::Display> fmt::Display for Vector<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, value) in self.coords.iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            write!(f, "{value}")?;
        }
        Ok(())
    }
}
