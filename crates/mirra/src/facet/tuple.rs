//! The tuple-like facet, bound on tuples and arrays

use super::{Facet, FacetRef, ImplFacet};
use crate::any::Any;
use crate::database::Database;
use crate::error::FacetError;
use crate::handle::TypeHandle;
use crate::reflect::Reflect;
use std::sync::Arc;

/// Vtable of the tuple-like facet
pub struct TupleVTable {
    /// Number of elements
    pub size: Option<fn(&Any<'_>) -> usize>,
    /// Type of element `i`
    pub element_type: Option<fn(&Any<'_>, usize) -> TypeHandle>,
    /// Borrow element `i`, keeping the view's const-qualification
    pub get: Option<fn(Any<'_>, usize) -> Any<'_>>,
}

/// Indexed access to the elements of a fixed-size aggregate
pub struct TupleLike<'a>(FacetRef<'a, TupleVTable>);

impl<'a> Facet<'a> for TupleLike<'a> {
    type VTable = TupleVTable;

    fn from_parts(object: Any<'a>, vtable: Option<Arc<TupleVTable>>, owner: TypeHandle) -> Self {
        Self(FacetRef::new(object, vtable, owner))
    }
}

impl TupleLike<'_> {
    /// Check if the facet is bound
    pub fn is_bound(&self) -> bool {
        self.0.is_bound()
    }

    /// Number of elements
    pub fn len(&self) -> Result<usize, FacetError> {
        let f = self.0.slot("TupleLike::size", |v| v.size)?;
        Ok(f(&self.0.view()))
    }

    /// Check if there are no elements
    pub fn is_empty(&self) -> Result<bool, FacetError> {
        Ok(self.len()? == 0)
    }

    /// Type of element `index`, invalid when out of range
    pub fn element_type(&self, index: usize) -> Result<TypeHandle, FacetError> {
        let f = self.0.slot("TupleLike::element_type", |v| v.element_type)?;
        Ok(f(&self.0.view(), index))
    }

    /// Read-only borrow of element `index`, empty when out of range
    pub fn get(&self, index: usize) -> Result<Any<'_>, FacetError> {
        let f = self.0.slot("TupleLike::get", |v| v.get)?;
        Ok(f(self.0.view(), index))
    }

    /// Borrow of element `index` that is mutable unless the object is const
    pub fn get_mut(&mut self, index: usize) -> Result<Any<'_>, FacetError> {
        let f = self.0.slot("TupleLike::get", |v| v.get)?;
        Ok(f(self.0.view_mut(), index))
    }

    /// Element 0
    pub fn first(&self) -> Result<Any<'_>, FacetError> {
        self.get(0)
    }

    /// Element 1
    pub fn second(&self) -> Result<Any<'_>, FacetError> {
        self.get(1)
    }
}

fn database_of(any: &Any<'_>) -> Option<Arc<Database>> {
    any.type_handle().database().cloned()
}

macro_rules! impl_tuple_facet {
    ($size:literal; $($name:ident : $idx:tt),+) => {
        impl<$($name: Reflect + Clone),+> ImplFacet<TupleVTable> for ($($name,)+) {
            fn vtable() -> TupleVTable {
                fn size<$($name),+>(_: &Any<'_>) -> usize {
                    $size
                }

                fn element_type<$($name: Reflect),+>(any: &Any<'_>, index: usize) -> TypeHandle {
                    let Some(db) = database_of(any) else {
                        return TypeHandle::invalid();
                    };
                    match index {
                        $($idx => db.type_of::<$name>(),)+
                        _ => TypeHandle::invalid(),
                    }
                }

                fn get<$($name: Reflect + Clone),+>(view: Any<'_>, index: usize) -> Any<'_> {
                    let Some(db) = database_of(&view) else {
                        return Any::empty();
                    };
                    if view.is_const() {
                        match view.into_ref::<($($name,)+)>() {
                            Some(tuple) => match index {
                                $($idx => Any::from_ref_in(&db, &tuple.$idx),)+
                                _ => Any::empty(),
                            },
                            None => Any::empty(),
                        }
                    } else {
                        match view.into_mut::<($($name,)+)>() {
                            Some(tuple) => match index {
                                $($idx => Any::from_mut_in(&db, &mut tuple.$idx),)+
                                _ => Any::empty(),
                            },
                            None => Any::empty(),
                        }
                    }
                }

                TupleVTable {
                    size: Some(size::<$($name),+>),
                    element_type: Some(element_type::<$($name),+>),
                    get: Some(get::<$($name),+>),
                }
            }
        }
    };
}

impl_tuple_facet!(1; A: 0);
impl_tuple_facet!(2; A: 0, B: 1);
impl_tuple_facet!(3; A: 0, B: 1, C: 2);
impl_tuple_facet!(4; A: 0, B: 1, C: 2, D: 3);

fn array_size<T, const N: usize>(_: &Any<'_>) -> usize {
    N
}

fn array_element_type<T: Reflect, const N: usize>(any: &Any<'_>, index: usize) -> TypeHandle {
    match database_of(any) {
        Some(db) if index < N => db.type_of::<T>(),
        _ => TypeHandle::invalid(),
    }
}

fn array_get<T: Reflect + Clone, const N: usize>(view: Any<'_>, index: usize) -> Any<'_> {
    let Some(db) = database_of(&view) else {
        return Any::empty();
    };
    if view.is_const() {
        view.into_ref::<[T; N]>()
            .and_then(|array| array.get(index))
            .map_or_else(Any::empty, |element| Any::from_ref_in(&db, element))
    } else {
        view.into_mut::<[T; N]>()
            .and_then(|array| array.get_mut(index))
            .map_or_else(Any::empty, |element| Any::from_mut_in(&db, element))
    }
}

impl<T: Reflect + Clone, const N: usize> ImplFacet<TupleVTable> for [T; N] {
    fn vtable() -> TupleVTable {
        TupleVTable {
            size: Some(array_size::<T, N>),
            element_type: Some(array_element_type::<T, N>),
            get: Some(array_get::<T, N>),
        }
    }
}
