//! Reflection of the unit type, strings, containers, tuples and pointers

use crate::database::Database;
use crate::facet::{PointerVTable, RangeVTable, StringVTable, TupleVTable};
use crate::factory::TypeFactory;
use crate::flags::TypeFlags;
use crate::handle::TypeHandle;
use crate::reflect::Reflect;
use std::collections::{BTreeSet, VecDeque};
use std::ffi::CString;
use std::ptr;
use std::sync::Arc;

impl Reflect for () {
    const FLAGS: TypeFlags = TypeFlags::VOID;

    fn init(factory: &TypeFactory<Self>) {
        factory
            .make_default_constructible()
            .make_copyable()
            .make_comparable::<()>();
    }
}

impl Reflect for String {
    fn init(factory: &TypeFactory<Self>) {
        factory
            .make_default_constructible()
            .make_copyable()
            .make_constructible_from::<&'static str>()
            .make_comparable::<String>()
            .make_equality_comparable::<&'static str>()
            .facet::<StringVTable<u8>>();
    }
}

impl Reflect for &'static str {
    const FLAGS: TypeFlags = TypeFlags::NONE;

    fn init(factory: &TypeFactory<Self>) {
        factory
            .make_default_constructible()
            .make_copyable()
            .make_convertible::<String>()
            .make_comparable::<&'static str>()
            .facet::<StringVTable<u8>>();
    }
}

impl Reflect for CString {
    fn init(factory: &TypeFactory<Self>) {
        factory
            .make_default_constructible()
            .make_copyable()
            .make_comparable::<CString>()
            .facet::<StringVTable<u8>>();
    }
}

impl<T: Reflect + Clone> Reflect for Vec<T> {
    fn init(factory: &TypeFactory<Self>) {
        factory.database().type_of::<T>();
        factory
            .make_default_constructible()
            .make_copyable()
            .facet::<RangeVTable>();
    }
}

impl<T: Reflect + Clone> Reflect for VecDeque<T> {
    fn init(factory: &TypeFactory<Self>) {
        factory.database().type_of::<T>();
        factory
            .make_default_constructible()
            .make_copyable()
            .facet::<RangeVTable>();
    }
}

impl<T: Reflect + Clone + Ord> Reflect for BTreeSet<T> {
    fn init(factory: &TypeFactory<Self>) {
        factory.database().type_of::<T>();
        factory
            .make_default_constructible()
            .make_copyable()
            .make_comparable::<BTreeSet<T>>()
            .facet::<RangeVTable>();
    }
}

impl<T: Reflect + Clone, const N: usize> Reflect for [T; N] {
    const FLAGS: TypeFlags = TypeFlags::NONE;
    const EXTENT: usize = N;

    fn remove_extent(db: &Arc<Database>) -> Option<TypeHandle> {
        Some(db.type_of::<T>())
    }

    fn init(factory: &TypeFactory<Self>) {
        factory
            .make_copyable()
            .facet::<TupleVTable>()
            .facet::<RangeVTable>();
    }
}

macro_rules! reflect_tuple {
    ($($name:ident),+) => {
        impl<$($name: Reflect + Clone),+> Reflect for ($($name,)+) {
            fn init(factory: &TypeFactory<Self>) {
                $(factory.database().type_of::<$name>();)+
                factory.make_copyable().facet::<TupleVTable>();
            }
        }
    };
}

reflect_tuple!(A);
reflect_tuple!(A, B);
reflect_tuple!(A, B, C);
reflect_tuple!(A, B, C, D);

impl<T: Reflect> Reflect for *const T {
    const FLAGS: TypeFlags = TypeFlags::POINTER;

    fn remove_pointer(db: &Arc<Database>) -> Option<TypeHandle> {
        Some(db.type_of::<T>())
    }

    fn init(factory: &TypeFactory<Self>) {
        factory
            .make_constructible::<(), _>(|()| ptr::null())
            .make_copyable()
            .make_comparable::<*const T>()
            .facet::<PointerVTable>();
    }
}

impl<T: Reflect> Reflect for *mut T {
    const FLAGS: TypeFlags = TypeFlags::POINTER;

    fn remove_pointer(db: &Arc<Database>) -> Option<TypeHandle> {
        Some(db.type_of::<T>())
    }

    fn init(factory: &TypeFactory<Self>) {
        factory
            .make_constructible::<(), _>(|()| ptr::null_mut())
            .make_copyable()
            .make_convertible_with::<*const T, _>(|p: &*mut T| p.cast_const())
            .make_comparable::<*mut T>()
            .facet::<PointerVTable>();
    }
}

impl<T: Reflect + Clone> Reflect for Box<T> {
    fn init(factory: &TypeFactory<Self>) {
        factory.database().type_of::<T>();
        factory.make_copyable().facet::<PointerVTable>();
    }
}

#[cfg(test)]
mod tests {
    use crate::any::Any;
    use crate::database::Database;
    use crate::flags::TypeFlags;

    #[test]
    fn test_unit() {
        let db = Database::new();
        let unit = db.type_of::<()>();
        assert!(unit.is_void());
        assert_eq!(unit.size(), 0);
        assert!(Any::new_in(&db, ()) == unit.construct(&[]).unwrap());
    }

    #[test]
    fn test_string_from_str() {
        let db = Database::new();
        let ty = db.type_of::<String>();
        let built = ty.construct(&[Any::new_in(&db, "built")]).unwrap();
        assert_eq!(built.get::<String>().map(String::as_str), Some("built"));

        let slice = Any::new_in(&db, "cast");
        let owned = slice.cast(&ty).unwrap();
        assert!(owned.is_owned());
        assert_eq!(owned.get::<String>().map(String::as_str), Some("cast"));
    }

    #[test]
    fn test_array_links() {
        let db = Database::new();
        let ty = db.type_of::<[u16; 3]>();
        assert!(ty.is_array());
        assert_eq!(ty.extent(), 3);
        assert_eq!(ty.remove_extent(), db.type_of::<u16>());
        assert!(!db.type_of::<Vec<u16>>().is_array());
    }

    #[test]
    fn test_pointer_links() {
        let db = Database::new();
        let ty = db.type_of::<*mut f32>();
        assert_eq!(ty.flags(), TypeFlags::POINTER);
        assert_eq!(ty.remove_pointer(), db.type_of::<f32>());
        assert!(ty.convertible_to(&db.type_of::<*const f32>()));

        let null = ty.construct(&[]).unwrap();
        assert!(null.get::<*mut f32>().is_some_and(|p| p.is_null()));
    }

    #[test]
    fn test_containers_reflect_elements() {
        let db = Database::new();
        db.type_of::<Vec<(u8, char)>>();
        assert!(db.contains(std::any::type_name::<(u8, char)>()));
        assert!(db.contains("char"));
    }
}
