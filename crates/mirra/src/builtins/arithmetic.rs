//! Reflection of the primitive numeric types, `bool` and `char`
//!
//! Every arithmetic type converts to, constructs from, and compares against
//! every other one. Conversions follow `as` casts. Comparisons are exact:
//! a negative signed value is less than every unsigned value, whatever the
//! widths involved.

use crate::any::Any;
use crate::database::Database;
use crate::factory::TypeFactory;
use crate::flags::TypeFlags;
use crate::reflect::Reflect;
use crate::tables::CompareOps;
use std::any::TypeId;
use std::cmp::Ordering;
use std::sync::Arc;

/// Common representation every arithmetic value widens to
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum Number {
    Signed(i128),
    Unsigned(u128),
    Float(f64),
}

impl Number {
    fn compare(self, other: Number) -> Option<Ordering> {
        use Number::*;

        match (self, other) {
            (Signed(a), Signed(b)) => Some(a.cmp(&b)),
            (Unsigned(a), Unsigned(b)) => Some(a.cmp(&b)),
            (Signed(a), Unsigned(b)) => {
                if a < 0 {
                    Some(Ordering::Less)
                } else {
                    Some((a as u128).cmp(&b))
                }
            }
            (Unsigned(_), Signed(_)) => other.compare(self).map(Ordering::reverse),
            (Float(a), Float(b)) => a.partial_cmp(&b),
            (Float(a), Signed(b)) => a.partial_cmp(&(b as f64)),
            (Float(a), Unsigned(b)) => a.partial_cmp(&(b as f64)),
            (Signed(_) | Unsigned(_), Float(_)) => other.compare(self).map(Ordering::reverse),
        }
    }
}

/// A primitive that round-trips through [`Number`]
pub(crate) trait Arithmetic: Reflect + Copy + Default + Send + Sync {
    fn to_number(self) -> Number;
    fn from_number(number: Number) -> Self;
}

macro_rules! integers {
    ($($ty:ty => $variant:ident as $wide:ty, $flag:ident;)*) => {
        $(
            impl Arithmetic for $ty {
                fn to_number(self) -> Number {
                    Number::$variant(self as $wide)
                }

                fn from_number(number: Number) -> Self {
                    match number {
                        Number::Signed(v) => v as $ty,
                        Number::Unsigned(v) => v as $ty,
                        Number::Float(v) => v as $ty,
                    }
                }
            }

            impl Reflect for $ty {
                const FLAGS: TypeFlags = TypeFlags::ARITHMETIC.union(TypeFlags::$flag);

                fn init(factory: &TypeFactory<Self>) {
                    register_arithmetic(factory);
                }
            }
        )*
    };
}

integers! {
    i8 => Signed as i128, SIGNED_INTEGRAL;
    i16 => Signed as i128, SIGNED_INTEGRAL;
    i32 => Signed as i128, SIGNED_INTEGRAL;
    i64 => Signed as i128, SIGNED_INTEGRAL;
    i128 => Signed as i128, SIGNED_INTEGRAL;
    isize => Signed as i128, SIGNED_INTEGRAL;
    u8 => Unsigned as u128, UNSIGNED_INTEGRAL;
    u16 => Unsigned as u128, UNSIGNED_INTEGRAL;
    u32 => Unsigned as u128, UNSIGNED_INTEGRAL;
    u64 => Unsigned as u128, UNSIGNED_INTEGRAL;
    u128 => Unsigned as u128, UNSIGNED_INTEGRAL;
    usize => Unsigned as u128, UNSIGNED_INTEGRAL;
}

macro_rules! floats {
    ($($ty:ty),*) => {
        $(
            impl Arithmetic for $ty {
                fn to_number(self) -> Number {
                    Number::Float(self as f64)
                }

                fn from_number(number: Number) -> Self {
                    match number {
                        Number::Signed(v) => v as $ty,
                        Number::Unsigned(v) => v as $ty,
                        Number::Float(v) => v as $ty,
                    }
                }
            }

            impl Reflect for $ty {
                const FLAGS: TypeFlags = TypeFlags::ARITHMETIC;

                fn init(factory: &TypeFactory<Self>) {
                    register_arithmetic(factory);
                }
            }
        )*
    };
}

floats!(f32, f64);

impl Arithmetic for bool {
    fn to_number(self) -> Number {
        Number::Unsigned(self as u128)
    }

    fn from_number(number: Number) -> Self {
        match number {
            Number::Signed(v) => v != 0,
            Number::Unsigned(v) => v != 0,
            Number::Float(v) => v != 0.0,
        }
    }
}

impl Reflect for bool {
    const FLAGS: TypeFlags = TypeFlags::ARITHMETIC.union(TypeFlags::UNSIGNED_INTEGRAL);

    fn init(factory: &TypeFactory<Self>) {
        register_arithmetic(factory);
    }
}

impl Arithmetic for char {
    fn to_number(self) -> Number {
        Number::Unsigned(u128::from(u32::from(self)))
    }

    fn from_number(number: Number) -> Self {
        let code = match number {
            Number::Signed(v) => v as u32,
            Number::Unsigned(v) => v as u32,
            Number::Float(v) => v as u32,
        };
        char::from_u32(code).unwrap_or_default()
    }
}

impl Reflect for char {
    const FLAGS: TypeFlags = TypeFlags::ARITHMETIC.union(TypeFlags::UNSIGNED_INTEGRAL);

    fn init(factory: &TypeFactory<Self>) {
        register_arithmetic(factory);
    }
}

fn numeric<T: Arithmetic, U: Arithmetic>(a: &Any<'_>, b: &Any<'_>) -> Option<Ordering> {
    let (x, y) = (a.as_type::<T>()?, b.as_type::<U>()?);
    x.to_number().compare(y.to_number())
}

fn numeric_eq<T: Arithmetic, U: Arithmetic>(a: &Any<'_>, b: &Any<'_>) -> bool {
    numeric::<T, U>(a, b) == Some(Ordering::Equal)
}

fn numeric_ne<T: Arithmetic, U: Arithmetic>(a: &Any<'_>, b: &Any<'_>) -> bool {
    numeric::<T, U>(a, b) != Some(Ordering::Equal)
}

fn numeric_lt<T: Arithmetic, U: Arithmetic>(a: &Any<'_>, b: &Any<'_>) -> bool {
    numeric::<T, U>(a, b) == Some(Ordering::Less)
}

fn numeric_le<T: Arithmetic, U: Arithmetic>(a: &Any<'_>, b: &Any<'_>) -> bool {
    matches!(numeric::<T, U>(a, b), Some(Ordering::Less | Ordering::Equal))
}

fn numeric_gt<T: Arithmetic, U: Arithmetic>(a: &Any<'_>, b: &Any<'_>) -> bool {
    numeric::<T, U>(a, b) == Some(Ordering::Greater)
}

fn numeric_ge<T: Arithmetic, U: Arithmetic>(a: &Any<'_>, b: &Any<'_>) -> bool {
    matches!(numeric::<T, U>(a, b), Some(Ordering::Greater | Ordering::Equal))
}

fn numeric_ops<T: Arithmetic, U: Arithmetic>() -> CompareOps {
    CompareOps {
        eq: Some(numeric_eq::<T, U>),
        ne: Some(numeric_ne::<T, U>),
        lt: Some(numeric_lt::<T, U>),
        le: Some(numeric_le::<T, U>),
        gt: Some(numeric_gt::<T, U>),
        ge: Some(numeric_ge::<T, U>),
    }
}

/// Convert, construct and compare between `T` and `U`
fn link<T: Arithmetic, U: Arithmetic>(factory: &TypeFactory<T>) {
    if TypeId::of::<T>() != TypeId::of::<U>() {
        factory
            .make_convertible_with::<U, _>(|value: &T| U::from_number(value.to_number()))
            .make_constructible::<(U,), _>(|(value,)| T::from_number(value.to_number()));
    }
    factory.register_comparator::<U>(numeric_ops::<T, U>());
}

macro_rules! link_all {
    ($factory:ident; $($ty:ty),*) => {
        $(link::<_, $ty>($factory);)*
    };
}

fn register_arithmetic<T: Arithmetic>(factory: &TypeFactory<T>) {
    factory.make_default_constructible().make_copyable();
    link_all!(factory;
        bool, char, i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize, f32, f64);
}

/// Reflect every arithmetic type
pub(crate) fn preload(db: &Arc<Database>) {
    // One reflection pulls in the rest through the links
    db.type_of::<i32>();
}
