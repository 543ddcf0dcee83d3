//! Several facets sharing one borrowed value

use super::Facet;
use crate::any::Any;
use crate::handle::TypeHandle;
use crate::tables::VTableRef;
use std::any::type_name;

/// A tuple of facet vtable types
pub trait VTableList {
    /// Registry keys of the member vtables, in order
    fn names() -> Vec<&'static str>;
}

macro_rules! impl_vtable_list {
    ($($name:ident),+) => {
        impl<$($name: Send + Sync + 'static),+> VTableList for ($($name,)+) {
            fn names() -> Vec<&'static str> {
                vec![$(type_name::<$name>()),+]
            }
        }
    };
}

impl_vtable_list!(A);
impl_vtable_list!(A, B);
impl_vtable_list!(A, B, C);
impl_vtable_list!(A, B, C, D);

struct Member {
    name: &'static str,
    bound: Option<(VTableRef, TypeHandle)>,
}

/// One borrowed value with a vtable slot per member facet
///
/// Members are resolved once, when the group is built. A member the value's
/// type does not implement stays unbound and fails only when called.
pub struct FacetGroup<'a> {
    object: Any<'a>,
    members: Vec<Member>,
}

impl<'a> FacetGroup<'a> {
    pub(crate) fn new<L: VTableList>(object: Any<'a>) -> Self {
        let ty = object.type_handle().clone();
        let members = L::names()
            .into_iter()
            .map(|name| Member {
                name,
                bound: ty.find_facet(name),
            })
            .collect();
        Self { object, members }
    }

    /// The shared value
    pub fn object(&self) -> &Any<'a> {
        &self.object
    }

    /// Check if the member with vtable `V` is bound
    pub fn implements<V: 'static>(&self) -> bool {
        let name = type_name::<V>();
        self.members
            .iter()
            .any(|m| m.name == name && m.bound.is_some())
    }

    /// Check if every member is bound
    pub fn is_complete(&self) -> bool {
        self.members.iter().all(|m| m.bound.is_some())
    }

    /// The member facet `F` over the shared value
    ///
    /// A facet outside the group, or a member that is not bound, is returned
    /// unbound.
    pub fn get<'s, F: Facet<'s>>(&'s self) -> F {
        let name = F::vtable_name();
        let bound = self
            .members
            .iter()
            .find(|m| m.name == name)
            .and_then(|m| m.bound.clone());
        match bound {
            Some((vtable, owner)) => F::from_parts(self.object.by_ref(), vtable.downcast().ok(), owner),
            None => F::from_parts(self.object.by_ref(), None, self.object.type_handle().clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::Database;
    use crate::facet::{
        Comparable, ComparableVTable, PointerLike, PointerVTable, RangeLike, RangeVTable, StringLike,
        StringVTable,
    };

    #[test]
    fn test_members_share_one_value() {
        let db = Database::new();
        let text = Any::new_in(&db, String::from("abc"));
        let group = text.facet_group::<(StringVTable<u8>, ComparableVTable)>();

        assert!(group.is_complete());
        assert!(group.implements::<StringVTable<u8>>());
        assert_eq!(group.get::<StringLike<'_>>().len().unwrap(), 3);
        let other = Any::new_in(&db, String::from("abd"));
        assert!(group.get::<Comparable<'_>>().less(&other).unwrap());
        assert_eq!(group.object().cdata(), text.cdata());
    }

    #[test]
    fn test_missing_member_fails_on_use() {
        let db = Database::new();
        let values = Any::new_in(&db, vec![1u8, 2]);
        let group = values.facet_group::<(RangeVTable, PointerVTable)>();

        assert!(!group.is_complete());
        assert!(group.implements::<RangeVTable>());
        assert!(!group.implements::<PointerVTable>());
        assert_eq!(group.get::<RangeLike<'_>>().len().unwrap(), 2);
        let err = group.get::<PointerLike<'_>>().is_null().unwrap_err();
        assert_eq!(err.function, "PointerLike::empty");
    }
}
