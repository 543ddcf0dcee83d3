//! The comparable facet
//!
//! Bound automatically on every type that registers a comparator. Its slots
//! dispatch on the pair of operand types: the left type's comparator for the
//! right type, then the right type's comparator with operands swapped, then
//! the left type's comparators after casting the right operand.

use super::{Facet, FacetRef};
use crate::any::Any;
use crate::error::FacetError;
use crate::handle::TypeHandle;
use crate::tables::{CompareFn, CompareOp, CompareOps};
use std::sync::Arc;

/// Vtable of the comparable facet
#[derive(Debug, Clone, Copy, Default)]
pub struct ComparableVTable {
    /// One predicate per operator
    pub ops: CompareOps,
}

impl ComparableVTable {
    /// The predicate for `op`
    pub fn get(&self, op: CompareOp) -> Option<CompareFn> {
        self.ops.get(op)
    }
}

pub(crate) fn dispatch_vtable() -> ComparableVTable {
    ComparableVTable {
        ops: CompareOps {
            eq: Some(dispatch_eq),
            ne: Some(dispatch_ne),
            lt: Some(dispatch_lt),
            le: Some(dispatch_le),
            gt: Some(dispatch_gt),
            ge: Some(dispatch_ge),
        },
    }
}

fn dispatch_eq(a: &Any<'_>, b: &Any<'_>) -> bool {
    dispatch(CompareOp::Eq, a, b)
}

fn dispatch_ne(a: &Any<'_>, b: &Any<'_>) -> bool {
    dispatch(CompareOp::Ne, a, b)
}

fn dispatch_lt(a: &Any<'_>, b: &Any<'_>) -> bool {
    dispatch(CompareOp::Lt, a, b)
}

fn dispatch_le(a: &Any<'_>, b: &Any<'_>) -> bool {
    dispatch(CompareOp::Le, a, b)
}

fn dispatch_gt(a: &Any<'_>, b: &Any<'_>) -> bool {
    dispatch(CompareOp::Gt, a, b)
}

fn dispatch_ge(a: &Any<'_>, b: &Any<'_>) -> bool {
    dispatch(CompareOp::Ge, a, b)
}

fn dispatch(op: CompareOp, a: &Any<'_>, b: &Any<'_>) -> bool {
    let left = a.type_handle();
    let right = b.type_handle();

    if let Some(ops) = left.comparator(right.name()) {
        return ops.get(op).is_some_and(|f| f(a, b));
    }
    if let Some(ops) = right.comparator(left.name()) {
        return ops.get(op.swapped()).is_some_and(|f| f(b, a));
    }

    let mut targets: Vec<TypeHandle> = left.comparable_types();
    // Prefer comparing as the left type itself
    if let Some(pos) = targets.iter().position(|t| t == left) {
        let own = targets.remove(pos);
        targets.insert(0, own);
    }
    for target in targets {
        let converted = b.try_cast(&target);
        if converted.is_empty() {
            continue;
        }
        if let Some(ops) = left.comparator(target.name()) {
            return ops.get(op).is_some_and(|f| f(a, &converted));
        }
    }
    false
}

/// Six-way comparison of a value against other values
pub struct Comparable<'a>(FacetRef<'a, ComparableVTable>);

impl<'a> Facet<'a> for Comparable<'a> {
    type VTable = ComparableVTable;

    fn from_parts(object: Any<'a>, vtable: Option<Arc<ComparableVTable>>, owner: TypeHandle) -> Self {
        Self(FacetRef::new(object, vtable, owner))
    }
}

impl Comparable<'_> {
    /// Evaluate `object op other`
    pub fn compare(&self, op: CompareOp, other: &Any<'_>) -> Result<bool, FacetError> {
        let function = match op {
            CompareOp::Eq => "Comparable::eq",
            CompareOp::Ne => "Comparable::ne",
            CompareOp::Lt => "Comparable::lt",
            CompareOp::Le => "Comparable::le",
            CompareOp::Gt => "Comparable::gt",
            CompareOp::Ge => "Comparable::ge",
        };
        let predicate = self.0.slot(function, |v| v.get(op))?;
        Ok(predicate(&self.0.view(), other))
    }

    /// `object == other`
    pub fn equal(&self, other: &Any<'_>) -> Result<bool, FacetError> {
        self.compare(CompareOp::Eq, other)
    }

    /// `object != other`
    pub fn not_equal(&self, other: &Any<'_>) -> Result<bool, FacetError> {
        self.compare(CompareOp::Ne, other)
    }

    /// `object < other`
    pub fn less(&self, other: &Any<'_>) -> Result<bool, FacetError> {
        self.compare(CompareOp::Lt, other)
    }

    /// `object <= other`
    pub fn less_equal(&self, other: &Any<'_>) -> Result<bool, FacetError> {
        self.compare(CompareOp::Le, other)
    }

    /// `object > other`
    pub fn greater(&self, other: &Any<'_>) -> Result<bool, FacetError> {
        self.compare(CompareOp::Gt, other)
    }

    /// `object >= other`
    pub fn greater_equal(&self, other: &Any<'_>) -> Result<bool, FacetError> {
        self.compare(CompareOp::Ge, other)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::Database;

    #[test]
    fn test_direct_and_swapped() {
        let db = Database::new();
        let text = Any::new_in(&db, String::from("abc"));
        let slice = Any::new_in(&db, "abc");
        assert!(text.facet::<Comparable<'_>>().equal(&slice).unwrap());
        // &str has no comparator for String; String's is used swapped
        assert!(slice == text);
    }

    #[test]
    fn test_no_comparator() {
        struct Opaque;
        impl crate::reflect::Reflect for Opaque {}

        let db = Database::new();
        let a = Any::new_in(&db, Opaque);
        let b = Any::new_in(&db, Opaque);
        let err = a.facet::<Comparable<'_>>().equal(&b).unwrap_err();
        assert_eq!(err.function, "Comparable::eq");
        // Neither relation holds when nothing is registered
        assert!(!(a == b));
        assert!(!(a != b));
    }

    #[test]
    fn test_cross_arithmetic() {
        let db = Database::new();
        assert!(Any::new_in(&db, 1i32) == Any::new_in(&db, 1.0f64));
        assert!(Any::new_in(&db, -1i64) < Any::new_in(&db, 0u64));
        assert!(Any::new_in(&db, u64::MAX) > Any::new_in(&db, -1i8));
        assert!(Any::new_in(&db, 2.5f32) >= Any::new_in(&db, 2u8));
    }
}
