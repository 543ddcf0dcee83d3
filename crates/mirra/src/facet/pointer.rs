//! The pointer-like facet, bound on raw pointers and `Box`

use super::{Facet, FacetRef, ImplFacet};
use crate::any::Any;
use crate::error::FacetError;
use crate::handle::TypeHandle;
use crate::reflect::Reflect;
use std::sync::Arc;

/// Vtable of the pointer-like facet
pub struct PointerVTable {
    /// Type of the pointee
    pub element_type: Option<fn(&Any<'_>) -> TypeHandle>,
    /// Check for null
    pub empty: Option<fn(&Any<'_>) -> bool>,
    /// The address as an owned `*const T`
    pub get: Option<fn(&Any<'_>) -> Any<'static>>,
    /// The address as a byte pointer
    pub data: Option<fn(&Any<'_>) -> *const u8>,
    /// A borrow of the pointee
    pub deref: Option<fn(Any<'_>) -> Any<'_>>,
}

/// Access to the pointee of a pointer-like value
pub struct PointerLike<'a>(FacetRef<'a, PointerVTable>);

impl<'a> Facet<'a> for PointerLike<'a> {
    type VTable = PointerVTable;

    fn from_parts(object: Any<'a>, vtable: Option<Arc<PointerVTable>>, owner: TypeHandle) -> Self {
        Self(FacetRef::new(object, vtable, owner))
    }
}

impl PointerLike<'_> {
    /// Check if the facet is bound
    pub fn is_bound(&self) -> bool {
        self.0.is_bound()
    }

    /// Type of the pointee
    pub fn element_type(&self) -> Result<TypeHandle, FacetError> {
        let f = self.0.slot("PointerLike::element_type", |v| v.element_type)?;
        Ok(f(&self.0.view()))
    }

    /// Check if the pointer is null
    pub fn is_null(&self) -> Result<bool, FacetError> {
        let f = self.0.slot("PointerLike::empty", |v| v.empty)?;
        Ok(f(&self.0.view()))
    }

    /// The address, as an owned `*const T`
    pub fn get(&self) -> Result<Any<'static>, FacetError> {
        let f = self.0.slot("PointerLike::get", |v| v.get)?;
        Ok(f(&self.0.view()))
    }

    /// The address as a byte pointer
    pub fn data(&self) -> Result<*const u8, FacetError> {
        let f = self.0.slot("PointerLike::data", |v| v.data)?;
        Ok(f(&self.0.view()))
    }

    /// Borrow the pointee
    ///
    /// Null pointers give an empty Any.
    ///
    /// # Safety
    ///
    /// For raw pointers the pointee must be live, and not mutated elsewhere
    /// while the returned borrow exists. `Box` pointees are always safe.
    pub unsafe fn deref(&self) -> Result<Any<'_>, FacetError> {
        let f = self.0.slot("PointerLike::deref", |v| v.deref)?;
        Ok(f(self.0.view()))
    }
}

fn pointee_type<T: Reflect>(any: &Any<'_>) -> TypeHandle {
    match any.type_handle().database() {
        Some(db) => db.type_of::<T>(),
        None => TypeHandle::invalid(),
    }
}

fn address_any<T: Reflect>(any: &Any<'_>, address: *const u8) -> Any<'static> {
    match any.type_handle().database() {
        Some(db) => Any::new_in(db, address.cast::<T>()),
        None => Any::empty(),
    }
}

fn const_address<T: Reflect>(any: &Any<'_>) -> *const u8 {
    any.get::<*const T>().map_or(std::ptr::null(), |p| p.cast())
}

fn mut_address<T: Reflect>(any: &Any<'_>) -> *const u8 {
    any.get::<*mut T>().map_or(std::ptr::null(), |p| p.cast_const().cast())
}

fn const_is_null<T: Reflect>(any: &Any<'_>) -> bool {
    const_address::<T>(any).is_null()
}

fn mut_is_null<T: Reflect>(any: &Any<'_>) -> bool {
    mut_address::<T>(any).is_null()
}

fn const_get<T: Reflect>(any: &Any<'_>) -> Any<'static> {
    address_any::<T>(any, const_address::<T>(any))
}

fn mut_get<T: Reflect>(any: &Any<'_>) -> Any<'static> {
    address_any::<T>(any, mut_address::<T>(any))
}

fn const_deref<T: Reflect>(view: Any<'_>) -> Any<'_> {
    let ty = pointee_type::<T>(&view);
    let address = const_address::<T>(&view);
    // Safety is the caller's obligation, see `PointerLike::deref`.
    unsafe { Any::from_raw_const(ty, address) }
}

fn mut_deref<T: Reflect>(view: Any<'_>) -> Any<'_> {
    let ty = pointee_type::<T>(&view);
    let address = mut_address::<T>(&view).cast_mut();
    unsafe { Any::from_raw(ty, address) }
}

impl<T: Reflect> ImplFacet<PointerVTable> for *const T {
    fn vtable() -> PointerVTable {
        PointerVTable {
            element_type: Some(pointee_type::<T>),
            empty: Some(const_is_null::<T>),
            get: Some(const_get::<T>),
            data: Some(const_address::<T>),
            deref: Some(const_deref::<T>),
        }
    }
}

impl<T: Reflect> ImplFacet<PointerVTable> for *mut T {
    fn vtable() -> PointerVTable {
        PointerVTable {
            element_type: Some(pointee_type::<T>),
            empty: Some(mut_is_null::<T>),
            get: Some(mut_get::<T>),
            data: Some(mut_address::<T>),
            deref: Some(mut_deref::<T>),
        }
    }
}

fn box_address<T: Reflect + Clone>(any: &Any<'_>) -> *const u8 {
    any.get::<Box<T>>()
        .map_or(std::ptr::null(), |b| (&**b as *const T).cast())
}

fn box_is_null<T: Reflect + Clone>(_any: &Any<'_>) -> bool {
    false
}

fn box_get<T: Reflect + Clone>(any: &Any<'_>) -> Any<'static> {
    address_any::<T>(any, box_address::<T>(any))
}

fn box_deref<T: Reflect + Clone>(view: Any<'_>) -> Any<'_> {
    let Some(db) = view.type_handle().database().cloned() else {
        return Any::empty();
    };
    match view.into_ref::<Box<T>>() {
        Some(boxed) => Any::from_ref_in(&db, &**boxed),
        None => Any::empty(),
    }
}

impl<T: Reflect + Clone> ImplFacet<PointerVTable> for Box<T> {
    fn vtable() -> PointerVTable {
        PointerVTable {
            element_type: Some(pointee_type::<T>),
            empty: Some(box_is_null::<T>),
            get: Some(box_get::<T>),
            data: Some(box_address::<T>),
            deref: Some(box_deref::<T>),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::Database;

    #[test]
    fn test_raw_pointer() {
        let db = Database::new();
        let mut value = 10i32;
        let ptr: *mut i32 = &mut value;
        let any = Any::new_in(&db, ptr);

        let facet = any.facet::<PointerLike<'_>>();
        assert_eq!(facet.element_type().unwrap(), db.type_of::<i32>());
        assert!(!facet.is_null().unwrap());
        assert_eq!(facet.data().unwrap(), ptr.cast_const().cast::<u8>());
        assert_eq!(
            facet.get().unwrap().get::<*const i32>().copied(),
            Some(ptr.cast_const())
        );

        let mut pointee = unsafe { facet.deref() }.unwrap();
        *pointee.get_mut::<i32>().unwrap() = 11;
        drop(pointee);
        drop(facet);
        assert_eq!(value, 11);
    }

    #[test]
    fn test_null_pointer() {
        let db = Database::new();
        let any = Any::new_in(&db, std::ptr::null::<u8>());
        let facet = any.facet::<PointerLike<'_>>();
        assert!(facet.is_null().unwrap());
        assert!(unsafe { facet.deref() }.unwrap().is_empty());
    }

    #[test]
    fn test_box() {
        let db = Database::new();
        let boxed = Any::new_in(&db, Box::new(String::from("boxed")));
        let facet = boxed.facet::<PointerLike<'_>>();
        let pointee = unsafe { facet.deref() }.unwrap();
        assert!(pointee.is_const());
        assert_eq!(pointee.get::<String>().map(String::as_str), Some("boxed"));
    }
}
