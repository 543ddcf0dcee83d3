//! Declarative filtering of a database's types
//!
//! A [`Query`] starts from every type reflected in its database and narrows
//! the set with each predicate added. Predicates run against a snapshot of
//! the type list, outside the database lock.

use crate::any::Any;
use crate::args::ArgSpec;
use crate::database::Database;
use crate::handle::TypeHandle;
use crate::reflect::Reflect;
use crate::tables::CompareOp;
use std::fmt;
use std::sync::Arc;

type Predicate = Box<dyn Fn(&TypeHandle) -> bool>;

/// A chain of predicates over the types of a database
pub struct Query {
    db: Arc<Database>,
    predicates: Vec<Predicate>,
}

impl Query {
    pub(crate) fn new(db: Arc<Database>) -> Self {
        Self {
            db,
            predicates: Vec::new(),
        }
    }

    /// Keep types for which `predicate` holds
    pub fn satisfies(mut self, predicate: impl Fn(&TypeHandle) -> bool + 'static) -> Self {
        self.predicates.push(Box::new(predicate));
        self
    }

    // ===== Categories =====

    /// Keep enumerations
    pub fn is_enum(self) -> Self {
        self.satisfies(TypeHandle::is_enum)
    }

    /// Keep struct-like types
    pub fn is_class(self) -> Self {
        self.satisfies(TypeHandle::is_class)
    }

    /// Keep types flagged abstract
    pub fn is_abstract(self) -> Self {
        self.satisfies(TypeHandle::is_abstract)
    }

    /// Keep raw pointer types
    pub fn is_pointer(self) -> Self {
        self.satisfies(TypeHandle::is_pointer)
    }

    /// Keep signed and unsigned integral types
    pub fn is_integral(self) -> Self {
        self.satisfies(TypeHandle::is_integral)
    }

    /// Keep signed integral types
    pub fn is_signed_integral(self) -> Self {
        self.satisfies(TypeHandle::is_signed_integral)
    }

    /// Keep unsigned integral types
    pub fn is_unsigned_integral(self) -> Self {
        self.satisfies(TypeHandle::is_unsigned_integral)
    }

    /// Keep arithmetic types
    pub fn is_arithmetic(self) -> Self {
        self.satisfies(TypeHandle::is_arithmetic)
    }

    /// Keep array types
    pub fn is_array(self) -> Self {
        self.satisfies(TypeHandle::is_array)
    }

    // ===== Tables =====

    /// Keep types carrying an attribute of the named type
    pub fn has_attribute(self, type_name: &str) -> Self {
        let type_name = type_name.to_string();
        self.satisfies(move |ty| ty.has_attribute(&type_name))
    }

    /// Keep types carrying an attribute of type `A`
    pub fn has_attribute_of<A: Reflect>(self) -> Self {
        self.satisfies(|ty| ty.has_attribute(A::type_name()))
    }

    /// Keep types with an enumerator of this name
    pub fn has_enumeration(self, name: &str) -> Self {
        let name = name.to_string();
        self.satisfies(move |ty| ty.has_enumeration(&name))
    }

    /// Keep types with an enumerator equal to `value`
    pub fn has_enumeration_value(self, value: Any<'static>) -> Self {
        self.satisfies(move |ty| ty.has_enumeration_value(&value))
    }

    /// Keep types implementing the named facet vtable
    pub fn implements_facet(self, vtable_name: &str) -> Self {
        let vtable_name = vtable_name.to_string();
        self.satisfies(move |ty| ty.implements_facet(&vtable_name))
    }

    /// Keep types implementing vtable `V`
    pub fn implements<V: 'static>(self) -> Self {
        self.satisfies(|ty| ty.implements::<V>())
    }

    /// Keep descendants of `base`
    pub fn inherits_from(self, base: &TypeHandle) -> Self {
        let base = base.clone();
        self.satisfies(move |ty| ty.inherits_from(&base))
    }

    /// Keep descendants of the named type
    pub fn inherits_from_name(self, name: &str) -> Self {
        let name = name.to_string();
        self.satisfies(move |ty| ty.inherits_from_name(&name))
    }

    /// Keep types with a constructor accepting `args`
    pub fn constructible_from(self, args: &[ArgSpec]) -> Self {
        let args = args.to_vec();
        self.satisfies(move |ty| ty.constructible_from(&args))
    }

    /// Keep types convertible to `target`
    pub fn convertible_to(self, target: &TypeHandle) -> Self {
        let target = target.clone();
        self.satisfies(move |ty| ty.convertible_to(&target))
    }

    /// Keep types that can stand in for `target`
    pub fn compatible_with(self, target: &TypeHandle) -> Self {
        let target = target.clone();
        self.satisfies(move |ty| ty.compatible_with(&target))
    }

    // ===== Comparisons =====

    /// Keep types `t` for which `t op other` is registered
    pub fn comparable_with(self, other: &TypeHandle, op: CompareOp) -> Self {
        let other = other.clone();
        self.satisfies(move |ty| ty.comparable_with(&other, op))
    }

    /// Keep types equality-comparable with `other`
    pub fn comparable_eq_with(self, other: &TypeHandle) -> Self {
        self.comparable_with(other, CompareOp::Eq)
    }

    /// Keep types less-than-comparable with `other`
    pub fn comparable_lt_with(self, other: &TypeHandle) -> Self {
        self.comparable_with(other, CompareOp::Lt)
    }

    /// Keep types less-or-equal-comparable with `other`
    pub fn comparable_le_with(self, other: &TypeHandle) -> Self {
        self.comparable_with(other, CompareOp::Le)
    }

    /// Keep types greater-than-comparable with `other`
    pub fn comparable_gt_with(self, other: &TypeHandle) -> Self {
        self.comparable_with(other, CompareOp::Gt)
    }

    /// Keep types greater-or-equal-comparable with `other`
    pub fn comparable_ge_with(self, other: &TypeHandle) -> Self {
        self.comparable_with(other, CompareOp::Ge)
    }

    // ===== Results =====

    /// The matching types, sorted by name
    pub fn types(&self) -> Vec<TypeHandle> {
        self.db
            .types()
            .into_iter()
            .filter(|ty| self.predicates.iter().all(|p| p(ty)))
            .collect()
    }

    /// Number of matching types
    pub fn count(&self) -> usize {
        self.types().len()
    }
}

impl fmt::Debug for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Query")
            .field("predicates", &self.predicates.len())
            .finish()
    }
}
