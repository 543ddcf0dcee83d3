//! Facets: typed interfaces over erased values
//!
//! A facet pairs an [`Any`] with a vtable of optional function slots. Types
//! bind vtables through [`TypeFactory::facet`](crate::TypeFactory::facet);
//! a vtable bound on a parent is found from any descendant, and calls then
//! see the value as that parent. Calling an unbound slot, or any slot of a
//! facet whose type binds no vtable, yields a [`FacetError`].

pub(crate) mod comparable;
mod group;
mod pointer;
mod range;
mod string;
mod tuple;

pub use comparable::{Comparable, ComparableVTable};
pub use group::{FacetGroup, VTableList};
pub use pointer::{PointerLike, PointerVTable};
pub use range::{Cursor, RangeIter, RangeLike, RangeValues, RangeVTable};
pub use string::{StringLike, StringVTable};
pub use tuple::{TupleLike, TupleVTable};

use crate::any::Any;
use crate::error::FacetError;
use crate::handle::TypeHandle;
use std::sync::Arc;

/// A facet type over values borrowed for `'a`
pub trait Facet<'a>: Sized {
    /// The vtable this facet calls through
    type VTable: Send + Sync + 'static;

    /// Assemble the facet from its object, its vtable (if bound) and the type
    /// the vtable was bound on
    fn from_parts(object: Any<'a>, vtable: Option<Arc<Self::VTable>>, owner: TypeHandle) -> Self;

    /// Registry key of the vtable
    fn vtable_name() -> &'static str {
        std::any::type_name::<Self::VTable>()
    }
}

/// `Self` provides the facet vtable `V`
pub trait ImplFacet<V> {
    /// Build the vtable
    fn vtable() -> V;
}

/// The common state of every facet: object, vtable and owning type
pub struct FacetRef<'a, V> {
    object: Any<'a>,
    vtable: Option<Arc<V>>,
    owner: TypeHandle,
}

impl<'a, V> FacetRef<'a, V> {
    /// Assemble from parts
    pub fn new(object: Any<'a>, vtable: Option<Arc<V>>, owner: TypeHandle) -> Self {
        Self {
            object,
            vtable,
            owner,
        }
    }

    /// The wrapped object
    pub fn object(&self) -> &Any<'a> {
        &self.object
    }

    /// Give the wrapped object back
    pub fn into_object(self) -> Any<'a> {
        self.object
    }

    /// The vtable, if bound
    pub fn vtable(&self) -> Option<&V> {
        self.vtable.as_deref()
    }

    /// Check if a vtable is bound
    pub fn is_bound(&self) -> bool {
        self.vtable.is_some()
    }

    /// The type the vtable was bound on
    pub fn owner(&self) -> &TypeHandle {
        &self.owner
    }

    /// A read-only view of the object as the owning type
    pub fn view(&self) -> Any<'_> {
        if self.object.type_handle() == &self.owner {
            self.object.by_ref()
        } else {
            self.object.try_cast(&self.owner)
        }
    }

    /// A view of the object as the owning type, keeping const-qualification
    pub fn view_mut(&mut self) -> Any<'_> {
        if self.object.type_handle() == &self.owner {
            self.object.by_mut()
        } else {
            let owner = self.owner.clone();
            self.object.try_cast_mut(&owner)
        }
    }

    /// Fetch a slot, failing with `function` as the error name if unbound
    pub fn slot<S>(
        &self,
        function: &'static str,
        select: impl FnOnce(&V) -> Option<S>,
    ) -> Result<S, FacetError> {
        self.vtable
            .as_deref()
            .and_then(select)
            .ok_or(FacetError::new(function))
    }
}
