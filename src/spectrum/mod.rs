use crate::Float;
use std::ops::{Index, IndexMut};

/// Linear RGB color, used for radiance, path throughput and albedo alike.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Spectrum(pub [Float; 3]);

impl Spectrum {

    #[inline]
    pub fn new_with<F: FnMut(usize) -> Float>(mut init: F) -> Self {
        Self([init(0), init(1), init(2)])
    }

    #[inline]
    pub fn zip<F: Fn(Float, Float) -> Float>(&self, other: &Self, f: F) -> Self {
        Self::new_with(|i| f(self[i], other[i]))
    }

    pub fn uniform(val: Float) -> Self {
        Self([val; 3])
    }

    pub fn black() -> Self {
        Self::uniform(0.0)
    }

    pub fn map<F: Fn(Float) -> Float>(&self, f: F) -> Self {
        Self::new_with(|i| f(self[i]))
    }

    pub fn is_black(&self) -> bool {
        self.0.iter().all(|&x| x == 0.0)
    }

    pub fn has_nans(&self) -> bool {
        self.0.iter().any(|&x| x.is_nan())
    }

    pub fn max_component_value(&self) -> Float {
        self.0.iter().cloned().fold(Float::MIN, Float::max)
    }

    pub fn lerp(t: Float, s1: Self, s2: Self) -> Self {
        (1.0 - t) * s1 + t * s2
    }

    pub fn clamp(self, low: Float, high: Float) -> Self {
        self.map(|x| x.clamp(low, high))
    }

    pub fn into_array(self) -> [Float; 3] {
        self.0
    }
}

impl Index<usize> for Spectrum {
    type Output = Float;

    fn index(&self, index: usize) -> &Self::Output {
        &self.0[index]
    }
}

impl IndexMut<usize> for Spectrum {
    fn index_mut(&mut self, index: usize) -> &mut Self::Output {
        &mut self.0[index]
    }
}

impl From<[Float; 3]> for Spectrum {
    fn from(a: [Float; 3]) -> Self {
        Self(a)
    }
}

impl From<Float> for Spectrum {
    fn from(x: Float) -> Self {
        Self::uniform(x)
    }
}

impl From<Spectrum> for [Float; 3] {
    fn from(s: Spectrum) -> Self {
        s.0
    }
}

impl std::iter::Sum for Spectrum {
    fn sum<I: Iterator<Item=Self>>(iter: I) -> Self {
        iter.fold(Self::uniform(0.0), std::ops::Add::add)
    }
}

impl std::ops::Neg for Spectrum {
    type Output = Self;

    fn neg(self) -> Self::Output {
        self.map(|x| -x)
    }
}

macro_rules! impl_op {
    ($op:ident, $name:ident, $sym:tt) => {
        impl std::ops::$op for Spectrum {
            type Output = Self;

            fn $name(self, rhs: Self) -> Self::Output {
                Self::zip(&self, &rhs, |x, y| x $sym y)
            }
        }

        impl std::ops::$op<Float> for Spectrum {
            type Output = Self;

            fn $name(self, rhs: Float) -> Self::Output {
                Self::new_with(|i| self[i] $sym rhs)
            }
        }

        impl std::ops::$op<Spectrum> for Float {
            type Output = Spectrum;

            fn $name(self, rhs: Spectrum) -> Self::Output {
                Spectrum::new_with(|i| self $sym rhs[i])
            }
        }
    }
}

macro_rules! impl_assign_op {
    ($op:ident, $name:ident, $sym:tt) => {
        impl std::ops::$op for Spectrum {
            fn $name(&mut self, rhs: Self) {
                for i in 0..3 {
                    self[i] $sym rhs[i];
                }
            }
        }

        impl std::ops::$op<Float> for Spectrum {
            fn $name(&mut self, rhs: Float) {
                for i in 0..3 {
                    self[i] $sym rhs;
                }
            }
        }
    }
}

impl_op!(Add, add, +);
impl_op!(Sub, sub, -);
impl_op!(Mul, mul, *);
impl_op!(Div, div, /);
impl_assign_op!(AddAssign, add_assign, +=);
impl_assign_op!(SubAssign, sub_assign, -=);
impl_assign_op!(MulAssign, mul_assign, *=);
impl_assign_op!(DivAssign, div_assign, /=);


#[cfg(test)]
mod tests {
    use super::*;


    #[test]
    fn test_iter_sum() {
        let spectra = vec![Spectrum::uniform(1.0), Spectrum::from([0.0, 1.0, 0.5])];
        let sum: Spectrum = spectra.into_iter().sum();
        assert_eq!(sum, Spectrum::from([1.0, 2.0, 1.5]));
    }

    #[test]
    fn test_component_mul() {
        let throughput = Spectrum::from([0.5, 0.25, 1.0]);
        let color = Spectrum::uniform(2.0);
        assert_eq!(throughput * color, Spectrum::from([1.0, 0.5, 2.0]));
        assert_eq!(0.5 * color, Spectrum::uniform(1.0));
    }
}
