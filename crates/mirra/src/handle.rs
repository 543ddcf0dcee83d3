//! Lightweight handles to reflected types
//!
//! A handle pairs a descriptor with the database it belongs to. Table reads
//! take a snapshot of the entries they need and release the table lock before
//! resolving names or running registered code.

use crate::any::Any;
use crate::args::{self, ArgSpec};
use crate::database::Database;
use crate::descriptor::TypeDescriptor;
use crate::error::ConstructorError;
use crate::facet::Facet;
use crate::flags::TypeFlags;
use crate::tables::{BaseEntry, CompareOp, CompareOps, Constructor, ConvertFn, CopyOps, VTableRef};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// A handle to a reflected type, or an invalid handle
///
/// Handles compare equal exactly when they refer to the same descriptor.
/// A handle also compares equal to a string holding its type's name.
#[derive(Clone, Default)]
pub struct TypeHandle {
    inner: Option<HandleInner>,
}

#[derive(Clone)]
struct HandleInner {
    descriptor: Arc<TypeDescriptor>,
    database: Arc<Database>,
}

impl TypeHandle {
    pub(crate) fn new(descriptor: Arc<TypeDescriptor>, database: Arc<Database>) -> Self {
        Self {
            inner: Some(HandleInner {
                descriptor,
                database,
            }),
        }
    }

    /// A handle referring to no type
    pub const fn invalid() -> Self {
        Self { inner: None }
    }

    /// Check if this handle refers to a type
    pub fn is_valid(&self) -> bool {
        self.inner.is_some()
    }

    pub(crate) fn descriptor(&self) -> Option<&Arc<TypeDescriptor>> {
        self.inner.as_ref().map(|inner| &inner.descriptor)
    }

    /// The database this type was reflected in
    pub fn database(&self) -> Option<&Arc<Database>> {
        self.inner.as_ref().map(|inner| &inner.database)
    }

    /// Resolve a type name in this handle's database
    pub(crate) fn resolve(&self, name: &str) -> TypeHandle {
        match self.database() {
            Some(db) => db.get_type(name),
            None => TypeHandle::invalid(),
        }
    }

    // ===== Static facts =====

    /// Type name, or an empty string for an invalid handle
    pub fn name(&self) -> &'static str {
        self.descriptor().map_or("", |d| d.name)
    }

    /// Category flags
    pub fn flags(&self) -> TypeFlags {
        self.descriptor().map_or(TypeFlags::NONE, |d| d.flags)
    }

    /// Size in bytes
    pub fn size(&self) -> usize {
        self.descriptor().map_or(0, |d| d.size)
    }

    /// Alignment in bytes
    pub fn align(&self) -> usize {
        self.descriptor().map_or(0, |d| d.align)
    }

    /// Number of elements for array types, else 0
    pub fn extent(&self) -> usize {
        self.descriptor().map_or(0, |d| d.extent)
    }

    /// Check if this is the unit type
    pub fn is_void(&self) -> bool {
        self.flags().contains(TypeFlags::VOID)
    }

    /// Check if this is an enumeration
    pub fn is_enum(&self) -> bool {
        self.flags().contains(TypeFlags::ENUM)
    }

    /// Check if this is a struct-like type
    pub fn is_class(&self) -> bool {
        self.flags().contains(TypeFlags::CLASS)
    }

    /// Check if this type is flagged abstract
    pub fn is_abstract(&self) -> bool {
        self.flags().contains(TypeFlags::ABSTRACT)
    }

    /// Check if this is a raw pointer type
    pub fn is_pointer(&self) -> bool {
        self.flags().contains(TypeFlags::POINTER)
    }

    /// Check if this is an array type
    pub fn is_array(&self) -> bool {
        self.extent() > 0
    }

    /// Check if this is an arithmetic type
    pub fn is_arithmetic(&self) -> bool {
        self.flags().contains(TypeFlags::ARITHMETIC)
    }

    /// Check if this is a signed or unsigned integral type
    pub fn is_integral(&self) -> bool {
        self.flags()
            .intersects(TypeFlags::SIGNED_INTEGRAL | TypeFlags::UNSIGNED_INTEGRAL)
    }

    /// Check if this is a signed integral type
    pub fn is_signed_integral(&self) -> bool {
        self.flags().contains(TypeFlags::SIGNED_INTEGRAL)
    }

    /// Check if this is an unsigned integral type
    pub fn is_unsigned_integral(&self) -> bool {
        self.flags().contains(TypeFlags::UNSIGNED_INTEGRAL)
    }

    /// The pointee type, or an invalid handle
    pub fn remove_pointer(&self) -> TypeHandle {
        match &self.inner {
            Some(inner) => (inner.descriptor.remove_pointer)(&inner.database).unwrap_or_default(),
            None => TypeHandle::invalid(),
        }
    }

    /// The element type, or an invalid handle
    pub fn remove_extent(&self) -> TypeHandle {
        match &self.inner {
            Some(inner) => (inner.descriptor.remove_extent)(&inner.database).unwrap_or_default(),
            None => TypeHandle::invalid(),
        }
    }

    // ===== Copy =====

    pub(crate) fn copy_ops(&self) -> Option<CopyOps> {
        self.descriptor().and_then(|d| d.tables().copy)
    }

    /// Check if values of this type can be copied
    pub fn is_copyable(&self) -> bool {
        self.copy_ops().is_some()
    }

    // ===== Inheritance =====

    pub(crate) fn base_entries(&self) -> Vec<BaseEntry> {
        self.descriptor()
            .map(|d| d.tables().bases.clone())
            .unwrap_or_default()
    }

    /// Direct parents, in registration order
    pub fn parents(&self) -> Vec<TypeHandle> {
        self.base_entries()
            .into_iter()
            .map(|base| self.resolve(base.name))
            .filter(TypeHandle::is_valid)
            .collect()
    }

    /// Check if `base` is a direct or indirect parent
    pub fn inherits_from(&self, base: &TypeHandle) -> bool {
        base.is_valid() && self.inherits_from_name(base.name())
    }

    /// Check if the named type is a direct or indirect parent
    pub fn inherits_from_name(&self, name: &str) -> bool {
        self.base_entries()
            .into_iter()
            .any(|base| base.name == name || self.resolve(base.name).inherits_from_name(name))
    }

    /// Walk the base graph to `target`, adjusting `ptr` along the way
    pub(crate) fn upcast_ptr(&self, target: &str, ptr: *const u8) -> Option<*const u8> {
        for base in self.base_entries() {
            let base_ptr = unsafe { (base.upcast)(ptr) };
            if base.name == target {
                return Some(base_ptr);
            }
            if let Some(found) = self.resolve(base.name).upcast_ptr(target, base_ptr) {
                return Some(found);
            }
        }
        None
    }

    /// Mutable counterpart of [`TypeHandle::upcast_ptr`]
    pub(crate) fn upcast_ptr_mut(&self, target: &str, ptr: *mut u8) -> Option<*mut u8> {
        for base in self.base_entries() {
            let base_ptr = unsafe { (base.upcast_mut)(ptr) };
            if base.name == target {
                return Some(base_ptr);
            }
            if let Some(found) = self.resolve(base.name).upcast_ptr_mut(target, base_ptr) {
                return Some(found);
            }
        }
        None
    }

    // ===== Conversions =====

    pub(crate) fn conversion(&self, target: &str) -> Option<ConvertFn> {
        self.descriptor()
            .and_then(|d| d.tables().conversions.get(target).cloned())
    }

    /// Types this type has a direct conversion to, sorted by name
    pub fn conversions(&self) -> Vec<TypeHandle> {
        let mut names: Vec<&'static str> = self
            .descriptor()
            .map(|d| d.tables().conversions.keys().copied().collect())
            .unwrap_or_default();
        names.sort_unstable();
        names.into_iter().map(|name| self.resolve(name)).collect()
    }

    /// Check if a conversion to `target` is registered here or on a parent
    pub fn convertible_to(&self, target: &TypeHandle) -> bool {
        target.is_valid() && self.convertible_to_name(target.name())
    }

    pub(crate) fn convertible_to_name(&self, target: &str) -> bool {
        self.conversion(target).is_some()
            || self
                .base_entries()
                .into_iter()
                .any(|base| self.resolve(base.name).convertible_to_name(target))
    }

    /// Check if a value of this type can stand in for `target`: same type,
    /// a parent, or convertible
    pub fn compatible_with(&self, target: &TypeHandle) -> bool {
        self.is_valid()
            && (self == target || self.inherits_from(target) || self.convertible_to(target))
    }

    // ===== Construction =====

    pub(crate) fn constructor_entries(&self) -> Vec<Constructor> {
        self.descriptor()
            .map(|d| d.tables().constructors.clone())
            .unwrap_or_default()
    }

    /// Argument lists of every registered constructor, in registration order
    pub fn constructors(&self) -> Vec<Vec<ArgSpec>> {
        self.descriptor()
            .map(|d| d.tables().constructors.iter().map(|c| c.args.clone()).collect())
            .unwrap_or_default()
    }

    /// Check if some constructor accepts arguments shaped like `args`
    pub fn constructible_from(&self, args: &[ArgSpec]) -> bool {
        match self.database() {
            Some(db) => args::resolve(db, &self.constructor_entries(), args).is_some(),
            None => false,
        }
    }

    /// Check if a constructor taking no arguments is registered
    pub fn is_default_constructible(&self) -> bool {
        self.constructible_from(&[])
    }

    /// Construct a new owned value from `args`
    ///
    /// The first constructor whose signature matches exactly wins; otherwise
    /// the first compatible one. An argument that cannot be converted at call
    /// time counts as no match.
    pub fn construct(&self, args: &[Any<'_>]) -> Result<Any<'static>, ConstructorError> {
        let specs: Vec<ArgSpec> = args.iter().map(Any::arg_spec).collect();
        let db = self.database().ok_or_else(|| self.constructor_error(&specs))?;
        let constructors = self.constructor_entries();
        args::resolve(db, &constructors, &specs)
            .and_then(|ctor| (ctor.alloc)(db, args))
            .ok_or_else(|| self.constructor_error(&specs))
    }

    /// Construct a value into caller-provided memory
    ///
    /// # Safety
    ///
    /// `dst` must be valid for writes of this type's size and aligned to its
    /// alignment. On success the caller owns the value written there.
    pub unsafe fn construct_in_place(
        &self,
        dst: *mut u8,
        args: &[Any<'_>],
    ) -> Result<(), ConstructorError> {
        let specs: Vec<ArgSpec> = args.iter().map(Any::arg_spec).collect();
        let db = self.database().ok_or_else(|| self.constructor_error(&specs))?;
        let constructors = self.constructor_entries();
        args::resolve(db, &constructors, &specs)
            .and_then(|ctor| (ctor.in_place)(dst, args))
            .ok_or_else(|| self.constructor_error(&specs))
    }

    fn constructor_error(&self, args: &[ArgSpec]) -> ConstructorError {
        ConstructorError {
            type_name: self.name().to_string(),
            args: args.to_vec(),
        }
    }

    // ===== Comparison =====

    pub(crate) fn comparator(&self, other: &str) -> Option<CompareOps> {
        self.descriptor()
            .and_then(|d| d.tables().comparators.get(other).copied())
    }

    /// Types this type has comparators registered against, sorted by name
    pub fn comparable_types(&self) -> Vec<TypeHandle> {
        let mut names: Vec<&'static str> = self
            .descriptor()
            .map(|d| d.tables().comparators.keys().copied().collect())
            .unwrap_or_default();
        names.sort_unstable();
        names.into_iter().map(|name| self.resolve(name)).collect()
    }

    /// Check if `self op other` can be evaluated directly or with operands
    /// swapped
    pub fn comparable_with(&self, other: &TypeHandle, op: CompareOp) -> bool {
        if !self.is_valid() || !other.is_valid() {
            return false;
        }
        let direct = self
            .comparator(other.name())
            .and_then(|ops| ops.get(op))
            .is_some();
        direct
            || other
                .comparator(self.name())
                .and_then(|ops| ops.get(op.swapped()))
                .is_some()
    }

    // ===== Enumerators =====

    /// Enumerator names, in registration order
    pub fn enumerations(&self) -> Vec<String> {
        self.descriptor()
            .map(|d| d.tables().enumerators.iter().map(|e| e.name.clone()).collect())
            .unwrap_or_default()
    }

    /// Check if an enumerator with this name is registered
    pub fn has_enumeration(&self, name: &str) -> bool {
        self.descriptor()
            .is_some_and(|d| d.tables().enumerators.iter().any(|e| e.name == name))
    }

    /// A copy of the named enumerator's value, or an empty Any
    pub fn enumerate(&self, name: &str) -> Any<'static> {
        let Some(inner) = &self.inner else {
            return Any::empty();
        };
        let value = inner
            .descriptor
            .tables()
            .enumerators
            .iter()
            .find(|e| e.name == name)
            .map(|e| e.value.clone());
        value.map_or_else(Any::empty, |v| v.to_any(&inner.database))
    }

    /// The name of the first enumerator equal to `value`
    pub fn enumerator_name(&self, value: &Any<'_>) -> Option<String> {
        let inner = self.inner.as_ref()?;
        let enumerators = inner.descriptor.tables().enumerators.clone();
        enumerators
            .into_iter()
            .find(|e| e.value.with_borrowed(&inner.database, |stored| stored == value))
            .map(|e| e.name)
    }

    /// Check if some enumerator equals `value`
    pub fn has_enumeration_value(&self, value: &Any<'_>) -> bool {
        self.enumerator_name(value).is_some()
    }

    // ===== Attributes =====

    /// Attribute types, sorted by name
    pub fn attributes(&self) -> Vec<TypeHandle> {
        let mut names: Vec<&'static str> = self
            .descriptor()
            .map(|d| d.tables().attributes.keys().copied().collect())
            .unwrap_or_default();
        names.sort_unstable();
        names.into_iter().map(|name| self.resolve(name)).collect()
    }

    /// Check if an attribute of the named type is attached
    pub fn has_attribute(&self, type_name: &str) -> bool {
        self.descriptor()
            .is_some_and(|d| d.tables().attributes.contains_key(type_name))
    }

    /// A copy of the attribute of the named type, or an empty Any
    pub fn attribute(&self, type_name: &str) -> Any<'static> {
        let Some(inner) = &self.inner else {
            return Any::empty();
        };
        let value = inner.descriptor.tables().attributes.get(type_name).cloned();
        value.map_or_else(Any::empty, |v| v.to_any(&inner.database))
    }

    // ===== Facets =====

    /// Names of the facet vtables registered directly on this type, sorted
    pub fn facets(&self) -> Vec<&'static str> {
        let mut names: Vec<&'static str> = self
            .descriptor()
            .map(|d| d.tables().facets.keys().copied().collect())
            .unwrap_or_default();
        names.sort_unstable();
        names
    }

    /// Find the named vtable here or on a parent, with the type that owns it
    pub(crate) fn find_facet(&self, name: &str) -> Option<(VTableRef, TypeHandle)> {
        let own = self
            .descriptor()
            .and_then(|d| d.tables().facets.get(name).cloned());
        if let Some(vtable) = own {
            return Some((vtable, self.clone()));
        }
        self.base_entries()
            .into_iter()
            .find_map(|base| self.resolve(base.name).find_facet(name))
    }

    /// Check if the named facet vtable is available here or on a parent
    pub fn implements_facet(&self, vtable_name: &str) -> bool {
        self.find_facet(vtable_name).is_some()
    }

    /// Check if vtable type `V` is available here or on a parent
    pub fn implements<V: 'static>(&self) -> bool {
        self.implements_facet(std::any::type_name::<V>())
    }

    /// Wrap `object` in facet `F`, resolving the vtable through this type
    ///
    /// An unbound facet is returned if this type does not implement `F`; its
    /// functions then fail with a `FacetError`.
    pub fn facet<'a, F: Facet<'a>>(&self, object: Any<'a>) -> F {
        match self.find_facet(F::vtable_name()) {
            Some((vtable, owner)) => F::from_parts(object, vtable.downcast().ok(), owner),
            None => F::from_parts(object, None, self.clone()),
        }
    }
}

impl PartialEq for TypeHandle {
    fn eq(&self, other: &Self) -> bool {
        match (&self.inner, &other.inner) {
            (Some(a), Some(b)) => Arc::ptr_eq(&a.descriptor, &b.descriptor),
            (None, None) => true,
            _ => false,
        }
    }
}

impl Eq for TypeHandle {}

impl PartialEq<str> for TypeHandle {
    fn eq(&self, other: &str) -> bool {
        self.is_valid() && self.name() == other
    }
}

impl PartialEq<&str> for TypeHandle {
    fn eq(&self, other: &&str) -> bool {
        self == *other
    }
}

impl Hash for TypeHandle {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.descriptor().map(Arc::as_ptr).hash(state);
    }
}

impl PartialOrd for TypeHandle {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TypeHandle {
    fn cmp(&self, other: &Self) -> Ordering {
        self.name().cmp(other.name()).then_with(|| {
            let a = self.descriptor().map(Arc::as_ptr);
            let b = other.descriptor().map(Arc::as_ptr);
            a.cmp(&b)
        })
    }
}

impl fmt::Debug for TypeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_valid() {
            write!(f, "TypeHandle({})", self.name())
        } else {
            f.write_str("TypeHandle(<invalid>)")
        }
    }
}

impl fmt::Display for TypeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_valid() {
            f.write_str(self.name())
        } else {
            f.write_str("<invalid>")
        }
    }
}
