//! Category flags for types and state flags for `Any`

use std::fmt;
use std::ops::{BitAnd, BitOr};

/// Category flags of a reflected type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct TypeFlags(u16);

impl TypeFlags {
    /// No category
    pub const NONE: Self = Self(0x000);
    /// The unit type `()`
    pub const VOID: Self = Self(0x001);
    /// A null-pointer type
    pub const NULL: Self = Self(0x002);
    /// An enumeration
    pub const ENUM: Self = Self(0x004);
    /// A struct or other nominal aggregate
    pub const CLASS: Self = Self(0x008);
    /// A raw pointer
    pub const POINTER: Self = Self(0x010);
    /// A type that cannot be instantiated
    pub const ABSTRACT: Self = Self(0x020);
    /// A signed integer
    pub const SIGNED_INTEGRAL: Self = Self(0x040);
    /// An unsigned integer (including `bool` and `char`)
    pub const UNSIGNED_INTEGRAL: Self = Self(0x080);
    /// Any arithmetic type (integers, floats, `bool`, `char`)
    pub const ARITHMETIC: Self = Self(0x100);

    /// Create from raw bits
    pub const fn from_bits(bits: u16) -> Self {
        Self(bits)
    }

    /// Get raw bits
    pub const fn bits(&self) -> u16 {
        self.0
    }

    /// Check if all bits of `other` are set
    pub const fn contains(&self, other: Self) -> bool {
        (self.0 & other.0) == other.0
    }

    /// Check if any bit of `other` is set
    pub const fn intersects(&self, other: Self) -> bool {
        (self.0 & other.0) != 0
    }

    /// Union of flags
    pub const fn union(&self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    /// Difference (remove flags)
    pub const fn difference(&self, other: Self) -> Self {
        Self(self.0 & !other.0)
    }

    /// Check if no flag is set
    pub const fn is_empty(&self) -> bool {
        self.0 == 0
    }
}

impl BitOr for TypeFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        self.union(rhs)
    }
}

impl BitAnd for TypeFlags {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self {
        Self(self.0 & rhs.0)
    }
}

impl fmt::Display for TypeFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const NAMES: [(TypeFlags, &str); 9] = [
            (TypeFlags::VOID, "VOID"),
            (TypeFlags::NULL, "NULL"),
            (TypeFlags::ENUM, "ENUM"),
            (TypeFlags::CLASS, "CLASS"),
            (TypeFlags::POINTER, "POINTER"),
            (TypeFlags::ABSTRACT, "ABSTRACT"),
            (TypeFlags::SIGNED_INTEGRAL, "SIGNED_INTEGRAL"),
            (TypeFlags::UNSIGNED_INTEGRAL, "UNSIGNED_INTEGRAL"),
            (TypeFlags::ARITHMETIC, "ARITHMETIC"),
        ];

        if self.is_empty() {
            return f.write_str("NONE");
        }
        let mut first = true;
        for (flag, name) in NAMES {
            if self.contains(flag) {
                if !first {
                    f.write_str(" | ")?;
                }
                f.write_str(name)?;
                first = false;
            }
        }
        Ok(())
    }
}

/// State flags of an [`Any`](crate::Any), stored in the last byte of its buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(transparent)]
pub struct AnyFlags(u8);

impl AnyFlags {
    /// No flag: a mutable borrow (or an empty Any)
    pub const NONE: Self = Self(0x00);
    /// The managed object must not be written through this Any
    pub const CONST: Self = Self(0x01);
    /// The value lives inside the Any's inline buffer
    pub const VALUE: Self = Self(0x02);
    /// The Any destroys the managed object when dropped
    pub const OWNED: Self = Self(0x04);

    /// Create from raw bits
    pub const fn from_bits(bits: u8) -> Self {
        Self(bits)
    }

    /// Get raw bits
    pub const fn bits(&self) -> u8 {
        self.0
    }

    /// Check if all bits of `other` are set
    pub const fn contains(&self, other: Self) -> bool {
        (self.0 & other.0) == other.0
    }

    /// Union of flags
    pub const fn union(&self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    /// Difference (remove flags)
    pub const fn difference(&self, other: Self) -> Self {
        Self(self.0 & !other.0)
    }
}

impl BitOr for AnyFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        self.union(rhs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_flags_ops() {
        let flags = TypeFlags::ARITHMETIC | TypeFlags::SIGNED_INTEGRAL;
        assert!(flags.contains(TypeFlags::ARITHMETIC));
        assert!(flags.intersects(TypeFlags::SIGNED_INTEGRAL | TypeFlags::UNSIGNED_INTEGRAL));
        assert!(!flags.contains(TypeFlags::CLASS));
        assert_eq!(flags.difference(TypeFlags::ARITHMETIC), TypeFlags::SIGNED_INTEGRAL);
        assert!(TypeFlags::NONE.is_empty());
    }

    #[test]
    fn test_type_flags_display() {
        assert_eq!(TypeFlags::NONE.to_string(), "NONE");
        assert_eq!(
            (TypeFlags::ARITHMETIC | TypeFlags::SIGNED_INTEGRAL).to_string(),
            "SIGNED_INTEGRAL | ARITHMETIC"
        );
    }

    #[test]
    fn test_any_flags_ops() {
        let flags = AnyFlags::VALUE | AnyFlags::OWNED;
        assert!(flags.contains(AnyFlags::OWNED));
        assert!(!flags.contains(AnyFlags::CONST));
        assert_eq!(flags.difference(AnyFlags::VALUE), AnyFlags::OWNED);
        assert_eq!(AnyFlags::from_bits(flags.bits()), flags);
    }
}
