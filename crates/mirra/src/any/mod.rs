//! Type-erased values
//!
//! An [`Any`] holds either a value it owns or a borrow of a value owned
//! elsewhere, together with the value's [`TypeHandle`]. Owned values small
//! enough for the inline buffer are stored in place; larger ones are boxed.
//! The lifetime parameter bounds borrows: an owning `Any` is `Any<'static>`.

pub(crate) mod storage;

use crate::args::ArgSpec;
use crate::database::Database;
use crate::error::{CastError, CopyError};
use crate::facet::{Comparable, Facet, FacetGroup, VTableList};
use crate::flags::AnyFlags;
use crate::handle::TypeHandle;
use crate::instance::database_instance;
use crate::reflect::Reflect;
use crate::tables::CompareOp;
use std::any::TypeId;
use std::cmp::Ordering;
use std::fmt;
use std::marker::PhantomData;
use std::mem;
use std::ptr;
use std::sync::Arc;
use storage::Storage;

/// A type-erased value or borrow
pub struct Any<'a> {
    ty: TypeHandle,
    storage: Storage,
    _marker: PhantomData<(&'a (), *const ())>,
}

impl Any<'static> {
    /// Own `value`, reflecting `T` in the current database
    pub fn new<T: Reflect>(value: T) -> Self {
        Self::new_in(&database_instance(), value)
    }

    /// Own `value`, reflecting `T` in `db`
    pub fn new_in<T: Reflect>(db: &Arc<Database>, value: T) -> Self {
        let ty = db.type_of::<T>();
        let storage = if storage::fits::<T>() {
            Storage::inline(value)
        } else {
            let ptr = Box::into_raw(Box::new(value)).cast::<u8>();
            Storage::remote(ptr, Some(drop_box::<T>), AnyFlags::OWNED)
        };
        Self::from_storage(ty, storage)
    }

    /// Take ownership of the object at `ptr`, released with `deleter`
    ///
    /// # Safety
    ///
    /// `ptr` must point to a live value of type `ty` that nothing else
    /// releases, and `deleter` must be the matching way to destroy it.
    pub unsafe fn adopt(ty: TypeHandle, ptr: *mut u8, deleter: unsafe fn(*mut u8)) -> Self {
        if !ty.is_valid() || ptr.is_null() {
            return Self::empty();
        }
        Self::from_storage(ty, Storage::remote(ptr, Some(deleter), AnyFlags::OWNED))
    }

    /// Copy the value of type `ty` at `src` into a new owned Any
    ///
    /// # Safety
    ///
    /// `src` must point to a live value of type `ty`.
    pub unsafe fn copy_from_raw(ty: TypeHandle, src: *const u8) -> Result<Self, CopyError> {
        let Some(descriptor) = ty.descriptor().cloned() else {
            return Ok(Self::empty());
        };
        let ops = ty.copy_ops().ok_or_else(|| CopyError {
            type_name: ty.name().to_string(),
        })?;
        let storage = if descriptor.inline {
            let mut storage = Storage::inline_uninit();
            (ops.clone_into)(src, storage.ptr_mut());
            storage
        } else {
            let ptr = (ops.clone_boxed)(src);
            Storage::remote(ptr, Some(descriptor.drop_boxed), AnyFlags::OWNED)
        };
        Ok(Self::from_storage(ty, storage))
    }
}

impl<'a> Any<'a> {
    /// An Any managing nothing
    pub const fn empty() -> Self {
        Self {
            ty: TypeHandle::invalid(),
            storage: Storage::empty(),
            _marker: PhantomData,
        }
    }

    fn from_storage(ty: TypeHandle, storage: Storage) -> Self {
        Self {
            ty,
            storage,
            _marker: PhantomData,
        }
    }

    /// A borrow of `ptr` as type `ty`
    ///
    /// Callers guarantee `ptr` addresses a live `ty` for `'a`.
    pub(crate) unsafe fn borrowed(ty: TypeHandle, ptr: *mut u8, is_const: bool) -> Self {
        if !ty.is_valid() || ptr.is_null() {
            return Self::empty();
        }
        let flags = if is_const {
            AnyFlags::CONST
        } else {
            AnyFlags::NONE
        };
        Self::from_storage(ty, Storage::remote(ptr, None, flags))
    }

    /// Borrow `value` read-only, reflecting `T` in the current database
    pub fn from_ref<T: Reflect>(value: &'a T) -> Self {
        Self::from_ref_in(&database_instance(), value)
    }

    /// Borrow `value` read-only, reflecting `T` in `db`
    pub fn from_ref_in<T: Reflect>(db: &Arc<Database>, value: &'a T) -> Self {
        let ptr = (value as *const T).cast::<u8>().cast_mut();
        unsafe { Self::borrowed(db.type_of::<T>(), ptr, true) }
    }

    /// Borrow `value` mutably, reflecting `T` in the current database
    pub fn from_mut<T: Reflect>(value: &'a mut T) -> Self {
        Self::from_mut_in(&database_instance(), value)
    }

    /// Borrow `value` mutably, reflecting `T` in `db`
    pub fn from_mut_in<T: Reflect>(db: &Arc<Database>, value: &'a mut T) -> Self {
        let ptr = (value as *mut T).cast::<u8>();
        unsafe { Self::borrowed(db.type_of::<T>(), ptr, false) }
    }

    /// Borrow the object of type `ty` at `ptr` mutably
    ///
    /// # Safety
    ///
    /// `ptr` must point to a live value of type `ty` that is not otherwise
    /// accessed for `'a`.
    pub unsafe fn from_raw(ty: TypeHandle, ptr: *mut u8) -> Self {
        Self::borrowed(ty, ptr, false)
    }

    /// Borrow the object of type `ty` at `ptr` read-only
    ///
    /// # Safety
    ///
    /// `ptr` must point to a live value of type `ty` that is not mutated
    /// for `'a`.
    pub unsafe fn from_raw_const(ty: TypeHandle, ptr: *const u8) -> Self {
        Self::borrowed(ty, ptr.cast_mut(), true)
    }

    // ===== State =====

    /// Type of the managed value; invalid when empty
    pub fn type_handle(&self) -> &TypeHandle {
        &self.ty
    }

    /// Name of the managed type, or an empty string
    pub fn type_name(&self) -> &'static str {
        self.ty.name()
    }

    /// State flags
    pub fn flags(&self) -> AnyFlags {
        self.storage.flags()
    }

    /// Check if nothing is managed
    pub fn is_empty(&self) -> bool {
        !self.ty.is_valid()
    }

    /// Check if writes through this Any are disallowed
    pub fn is_const(&self) -> bool {
        self.flags().contains(AnyFlags::CONST)
    }

    /// Check if the managed value is owned by this Any
    pub fn is_owned(&self) -> bool {
        !self.is_empty() && self.flags().contains(AnyFlags::OWNED)
    }

    /// Check if this Any borrows a value owned elsewhere
    pub fn is_ref(&self) -> bool {
        !self.is_empty() && !self.flags().contains(AnyFlags::OWNED)
    }

    /// Check if the managed value lives in the inline buffer
    pub fn is_inline(&self) -> bool {
        !self.is_empty() && self.storage.is_inline()
    }

    /// Read-only address of the managed value, or null
    pub fn cdata(&self) -> *const u8 {
        if self.is_empty() {
            ptr::null()
        } else {
            self.storage.ptr()
        }
    }

    /// Mutable address of the managed value, or null if empty or const
    pub fn data(&mut self) -> *mut u8 {
        if self.is_empty() || self.is_const() {
            ptr::null_mut()
        } else {
            self.storage.ptr_mut()
        }
    }

    /// How this Any presents itself as a constructor argument
    pub fn arg_spec(&self) -> ArgSpec {
        ArgSpec::new(self.ty.name(), self.is_const(), self.is_owned())
    }

    // ===== Typed access =====

    /// Check if the managed value is exactly a `T`
    pub fn is<T: Reflect>(&self) -> bool {
        self.ty
            .descriptor()
            .is_some_and(|d| d.type_id == TypeId::of::<T>() && d.name == T::type_name())
    }

    /// The value, if it is exactly a `T`
    pub fn get<T: Reflect>(&self) -> Option<&T> {
        if self.is::<T>() {
            Some(unsafe { &*self.storage.ptr().cast::<T>() })
        } else {
            None
        }
    }

    /// The value mutably, if it is exactly a `T` and not const
    pub fn get_mut<T: Reflect>(&mut self) -> Option<&mut T> {
        if self.is::<T>() && !self.is_const() {
            Some(unsafe { &mut *self.storage.ptr_mut().cast::<T>() })
        } else {
            None
        }
    }

    fn typed_ptr<T: Reflect>(&self) -> Option<*const u8> {
        if self.is_empty() {
            return None;
        }
        if self.is::<T>() {
            return Some(self.storage.ptr());
        }
        self.ty.upcast_ptr(T::type_name(), self.storage.ptr())
    }

    fn typed_ptr_mut<T: Reflect>(&mut self) -> Option<*mut u8> {
        if self.is_empty() || self.is_const() {
            return None;
        }
        let ptr = self.storage.ptr_mut();
        if self.is::<T>() {
            return Some(ptr);
        }
        self.ty.upcast_ptr_mut(T::type_name(), ptr)
    }

    /// The value as a `T`, directly or through registered parents
    pub fn as_type<T: Reflect>(&self) -> Option<&T> {
        self.typed_ptr::<T>().map(|p| unsafe { &*p.cast::<T>() })
    }

    /// Mutable counterpart of [`Any::as_type`]
    pub fn as_type_mut<T: Reflect>(&mut self) -> Option<&mut T> {
        self.typed_ptr_mut::<T>().map(|p| unsafe { &mut *p.cast::<T>() })
    }

    /// Turn a borrowing Any into a plain reference
    ///
    /// Returns `None` for owned values, which die with the Any.
    pub fn into_ref<T: Reflect>(self) -> Option<&'a T> {
        if self.is_owned() {
            return None;
        }
        self.typed_ptr::<T>().map(|p| unsafe { &*p.cast::<T>() })
    }

    /// Turn a mutable borrowing Any into a plain mutable reference
    pub fn into_mut<T: Reflect>(mut self) -> Option<&'a mut T> {
        if self.is_owned() {
            return None;
        }
        self.typed_ptr_mut::<T>().map(|p| unsafe { &mut *p.cast::<T>() })
    }

    // ===== Borrows, copies and moves =====

    /// A read-only borrow of the managed value
    pub fn by_ref(&self) -> Any<'_> {
        if self.is_empty() {
            return Any::empty();
        }
        unsafe { Any::borrowed(self.ty.clone(), self.storage.ptr().cast_mut(), true) }
    }

    /// A borrow keeping this Any's const-qualification
    pub fn by_mut(&mut self) -> Any<'_> {
        if self.is_empty() {
            return Any::empty();
        }
        let is_const = self.is_const();
        let ptr = self.storage.ptr_mut();
        unsafe { Any::borrowed(self.ty.clone(), ptr, is_const) }
    }

    /// Copy the managed value into a new owned Any
    pub fn try_clone(&self) -> Result<Any<'static>, CopyError> {
        if self.is_empty() {
            return Ok(Any::empty());
        }
        unsafe { Any::copy_from_raw(self.ty.clone(), self.storage.ptr()) }
    }

    /// Copy `other`'s value into this Any
    ///
    /// An owned mutable value of the same type is assigned in place;
    /// otherwise the current value is released and replaced by a copy.
    pub fn assign_from(&mut self, other: &Any<'_>) -> Result<(), CopyError> {
        if other.is_empty() {
            self.reset();
            return Ok(());
        }
        if self.is_owned() && !self.is_const() && self.ty == other.ty {
            if let Some(ops) = self.ty.copy_ops() {
                unsafe { (ops.clone_assign)(other.storage.ptr(), self.storage.ptr_mut()) };
                return Ok(());
            }
        }
        let copy = other.try_clone()?;
        *self = copy;
        Ok(())
    }

    /// Move the managed value out, leaving this Any empty
    pub fn take(&mut self) -> Any<'a> {
        mem::replace(self, Any::empty())
    }

    /// Release the managed value, leaving this Any empty
    pub fn reset(&mut self) {
        self.release();
    }

    fn release(&mut self) {
        let flags = self.storage.flags();
        if flags.contains(AnyFlags::OWNED) {
            if let Some(descriptor) = self.ty.descriptor() {
                if self.storage.is_inline() {
                    unsafe { (descriptor.drop_in_place)(self.storage.ptr_mut()) };
                } else {
                    let remote = self.storage.remote_parts();
                    if let Some(deleter) = remote.deleter {
                        unsafe { deleter(remote.ptr) };
                    }
                }
            }
        }
        self.storage = Storage::empty();
        self.ty = TypeHandle::invalid();
    }

    // ===== Casts =====

    /// View the value as `to`; empty if no route exists
    ///
    /// The result is read-only. Routes are tried in order: same type,
    /// registered parent, registered conversion, then the same search from
    /// each parent.
    pub fn try_cast(&self, to: &TypeHandle) -> Any<'_> {
        if self.is_empty() || !to.is_valid() {
            return Any::empty();
        }
        unsafe { cast_view(&self.ty, self.storage.ptr().cast_mut(), true, to) }.unwrap_or_default()
    }

    /// View the value as `to`, keeping const-qualification; empty if no route
    pub fn try_cast_mut(&mut self, to: &TypeHandle) -> Any<'_> {
        if self.is_empty() || !to.is_valid() {
            return Any::empty();
        }
        let is_const = self.is_const();
        let ptr = self.storage.ptr_mut();
        unsafe { cast_view(&self.ty, ptr, is_const, to) }.unwrap_or_default()
    }

    /// View the value as `to`
    ///
    /// An empty Any or an invalid target yields an empty result.
    pub fn cast(&self, to: &TypeHandle) -> Result<Any<'_>, CastError> {
        if self.is_empty() || !to.is_valid() {
            return Ok(Any::empty());
        }
        unsafe { cast_view(&self.ty, self.storage.ptr().cast_mut(), true, to) }
            .ok_or_else(|| self.cast_error(to))
    }

    /// Mutable counterpart of [`Any::cast`]
    pub fn cast_mut(&mut self, to: &TypeHandle) -> Result<Any<'_>, CastError> {
        if self.is_empty() || !to.is_valid() {
            return Ok(Any::empty());
        }
        let is_const = self.is_const();
        let ptr = self.storage.ptr_mut();
        match unsafe { cast_view(&self.ty, ptr, is_const, to) } {
            Some(view) => Ok(view),
            None => Err(self.cast_error(to)),
        }
    }

    fn cast_error(&self, to: &TypeHandle) -> CastError {
        CastError {
            from: self.ty.name().to_string(),
            to: to.name().to_string(),
        }
    }

    // ===== Facets =====

    /// Facet `F` over a read-only borrow of the value
    pub fn facet<'s, F: Facet<'s>>(&'s self) -> F {
        self.ty.facet(self.by_ref())
    }

    /// Facet `F` over a borrow keeping const-qualification
    pub fn facet_mut<'s, F: Facet<'s>>(&'s mut self) -> F {
        let ty = self.ty.clone();
        ty.facet(self.by_mut())
    }

    /// Facet `F` taking over this Any
    pub fn into_facet<F: Facet<'a>>(self) -> F {
        let ty = self.ty.clone();
        ty.facet(self)
    }

    /// Several facets over one read-only borrow
    pub fn facet_group<'s, L: VTableList>(&'s self) -> FacetGroup<'s> {
        FacetGroup::new::<L>(self.by_ref())
    }

    // ===== Comparison =====

    /// Evaluate `self op other`
    ///
    /// Empty values are equal to each other and less than any value. A
    /// comparison nobody registered is `false`.
    pub fn compare(&self, other: &Any<'_>, op: CompareOp) -> bool {
        use CompareOp::*;

        match (self.is_empty(), other.is_empty()) {
            (true, true) => matches!(op, Eq | Le | Ge),
            (false, true) => matches!(op, Ne | Gt | Ge),
            (true, false) => matches!(op, Ne | Lt | Le),
            (false, false) => self
                .facet::<Comparable<'_>>()
                .compare(op, other)
                .unwrap_or(false),
        }
    }
}

/// Find a route from `(ty, ptr)` to `to`
///
/// # Safety
///
/// `ptr` must address a live `ty`, valid for the returned lifetime and
/// writable unless `is_const`.
unsafe fn cast_view<'v>(
    ty: &TypeHandle,
    ptr: *mut u8,
    is_const: bool,
    to: &TypeHandle,
) -> Option<Any<'v>> {
    if ty == to {
        return Some(Any::borrowed(ty.clone(), ptr, is_const));
    }

    let upcast = if is_const {
        ty.upcast_ptr(to.name(), ptr).map(<*const u8>::cast_mut)
    } else {
        ty.upcast_ptr_mut(to.name(), ptr)
    };
    if let Some(base_ptr) = upcast {
        return Some(Any::borrowed(to.clone(), base_ptr, is_const));
    }

    if let Some(convert) = ty.conversion(to.name()) {
        let source = Any::borrowed(ty.clone(), ptr, true);
        if let Some(converted) = convert(&source) {
            return Some(converted);
        }
    }

    for base in ty.base_entries() {
        let base_ty = ty.resolve(base.name);
        let base_ptr = if is_const {
            (base.upcast)(ptr).cast_mut()
        } else {
            (base.upcast_mut)(ptr)
        };
        if let Some(found) = cast_view(&base_ty, base_ptr, is_const, to) {
            return Some(found);
        }
    }
    None
}

unsafe fn drop_box<T>(ptr: *mut u8) {
    drop(Box::from_raw(ptr.cast::<T>()));
}

impl Drop for Any<'_> {
    fn drop(&mut self) {
        self.release();
    }
}

impl Default for Any<'_> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<'a, 'b> PartialEq<Any<'b>> for Any<'a> {
    fn eq(&self, other: &Any<'b>) -> bool {
        self.compare(other, CompareOp::Eq)
    }

    #[allow(clippy::partialeq_ne_impl)]
    fn ne(&self, other: &Any<'b>) -> bool {
        self.compare(other, CompareOp::Ne)
    }
}

impl<'a, 'b> PartialOrd<Any<'b>> for Any<'a> {
    fn partial_cmp(&self, other: &Any<'b>) -> Option<Ordering> {
        if self.compare(other, CompareOp::Eq) {
            Some(Ordering::Equal)
        } else if self.compare(other, CompareOp::Lt) {
            Some(Ordering::Less)
        } else if self.compare(other, CompareOp::Gt) {
            Some(Ordering::Greater)
        } else {
            None
        }
    }

    fn lt(&self, other: &Any<'b>) -> bool {
        self.compare(other, CompareOp::Lt)
    }

    fn le(&self, other: &Any<'b>) -> bool {
        self.compare(other, CompareOp::Le)
    }

    fn gt(&self, other: &Any<'b>) -> bool {
        self.compare(other, CompareOp::Gt)
    }

    fn ge(&self, other: &Any<'b>) -> bool {
        self.compare(other, CompareOp::Ge)
    }
}

impl fmt::Debug for Any<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("Any(<empty>)");
        }
        f.debug_struct("Any")
            .field("type", &self.ty.name())
            .field("const", &self.is_const())
            .field("owned", &self.is_owned())
            .field("inline", &self.is_inline())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};

    static DROPS: AtomicUsize = AtomicUsize::new(0);

    struct Noisy(#[allow(dead_code)] u8);

    impl Drop for Noisy {
        fn drop(&mut self) {
            DROPS.fetch_add(1, AtomicOrdering::SeqCst);
        }
    }

    impl Reflect for Noisy {}

    #[test]
    fn test_empty() {
        let mut any = Any::empty();
        assert!(any.is_empty());
        assert!(!any.is_ref());
        assert!(any.cdata().is_null());
        assert!(any.data().is_null());
        assert!(any.get::<i32>().is_none());
        assert!(!any.type_handle().is_valid());
    }

    #[test]
    fn test_inline_and_boxed_values() {
        let db = Database::new();
        let small = Any::new_in(&db, 42u32);
        assert!(small.is_inline());
        assert!(small.is_owned());
        assert_eq!(small.get::<u32>(), Some(&42));

        let large = Any::new_in(&db, [7u64; 4]);
        assert!(!large.is_inline());
        assert!(!large.is_ref());
        assert_eq!(large.get::<[u64; 4]>(), Some(&[7u64; 4]));
    }

    #[test]
    fn test_borrows() {
        let db = Database::new();
        let mut value = 5i64;
        {
            let view = Any::from_ref_in(&db, &value);
            assert!(view.is_ref());
            assert!(view.is_const());
            assert_eq!(view.cdata(), (&value as *const i64).cast::<u8>());
        }
        {
            let mut view = Any::from_mut_in(&db, &mut value);
            assert!(!view.is_const());
            *view.get_mut::<i64>().unwrap() = 6;
        }
        assert_eq!(value, 6);

        let owned = Any::new_in(&db, 1i64);
        let mut view = owned.by_ref();
        assert!(view.is_const());
        assert!(view.get_mut::<i64>().is_none());
        assert!(view.data().is_null());
    }

    #[test]
    fn test_drop_runs_once() {
        let db = Database::new();
        let before = DROPS.load(AtomicOrdering::SeqCst);
        {
            let owned = Any::new_in(&db, Noisy(1));
            let _view = owned.by_ref();
        }
        assert_eq!(DROPS.load(AtomicOrdering::SeqCst) - before, 1);

        let mut owned = Any::new_in(&db, Noisy(2));
        let moved = owned.take();
        assert!(owned.is_empty());
        drop(moved);
        assert_eq!(DROPS.load(AtomicOrdering::SeqCst) - before, 2);
    }

    #[test]
    fn test_copy_requires_registration() {
        let db = Database::new();
        let noisy = Any::new_in(&db, Noisy(3));
        let err = noisy.try_clone().unwrap_err();
        assert_eq!(err.type_name, std::any::type_name::<Noisy>());

        let text = Any::new_in(&db, String::from("copy me"));
        let copy = text.try_clone().unwrap();
        assert_eq!(copy.get::<String>().map(String::as_str), Some("copy me"));
        assert_ne!(copy.cdata(), text.cdata());
    }

    #[test]
    fn test_assign_in_place() {
        let db = Database::new();
        let mut target = Any::new_in(&db, String::from("old"));
        let source = Any::new_in(&db, String::from("new"));
        let before = target.cdata();
        target.assign_from(&source).unwrap();
        assert_eq!(target.cdata(), before);
        assert_eq!(target.get::<String>().unwrap(), "new");

        target.assign_from(&Any::new_in(&db, 3u8)).unwrap();
        assert_eq!(target.get::<u8>(), Some(&3));
    }

    #[test]
    fn test_cast_identity_and_conversion() {
        let db = Database::new();
        let one = Any::new_in(&db, 1i32);

        let same = one.cast(&db.type_of::<i32>()).unwrap();
        assert!(same.is_ref());
        assert_eq!(same.cdata(), one.cdata());

        let double = one.cast(&db.type_of::<f64>()).unwrap();
        assert!(double.is_owned());
        assert_eq!(double.get::<f64>(), Some(&1.0));

        let err = one.cast(&db.type_of::<String>()).unwrap_err();
        assert_eq!(err.from, "i32");
        assert!(one.try_cast(&db.type_of::<String>()).is_empty());
        assert!(one.cast(&TypeHandle::invalid()).unwrap().is_empty());
    }

    #[test]
    fn test_empty_ordering() {
        let db = Database::new();
        let empty = Any::empty();
        let one = Any::new_in(&db, 1i32);
        assert!(empty == Any::empty());
        assert!(one > empty);
        assert!(empty < one);
        assert!(one != empty);
        assert_eq!(one.partial_cmp(&empty), Some(Ordering::Greater));
    }

    #[test]
    fn test_into_ref_rejects_owned() {
        let db = Database::new();
        let owned = Any::new_in(&db, 9u8);
        assert!(owned.into_ref::<u8>().is_none());

        let value = 9u8;
        let view = Any::from_ref_in(&db, &value);
        assert_eq!(view.into_ref::<u8>(), Some(&9));
    }
}
