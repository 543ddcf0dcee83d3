//! Registration of runtime type facts
//!
//! A [`TypeFactory`] is the only way to mutate a descriptor's tables. Every
//! method reflects the types it mentions first, then takes the table lock for
//! the single insertion. Re-registering an entry replaces it.

use crate::any::Any;
use crate::args::ArgList;
use crate::database::Database;
use crate::descriptor::TypeDescriptor;
use crate::facet::comparable::{dispatch_vtable, ComparableVTable};
use crate::facet::ImplFacet;
use crate::handle::TypeHandle;
use crate::reflect::{Inherits, Reflect};
use crate::tables::{
    alloc_fn, convert_fn, in_place_fn, BaseEntry, CompareOps, Constructor, CopyOps, Enumerator,
    StoredValue, TypeTables, VTableRef,
};
use std::marker::PhantomData;
use std::ptr;
use std::sync::Arc;

/// Registers constructors, conversions, parents, comparators, enumerators,
/// attributes and facets for `T`
pub struct TypeFactory<T: Reflect> {
    database: Arc<Database>,
    descriptor: Arc<TypeDescriptor>,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Reflect> TypeFactory<T> {
    pub(crate) fn new(database: Arc<Database>, descriptor: Arc<TypeDescriptor>) -> Self {
        Self {
            database,
            descriptor,
            _marker: PhantomData,
        }
    }

    /// The database `T` is reflected in
    pub fn database(&self) -> &Arc<Database> {
        &self.database
    }

    /// Handle to `T`
    pub fn handle(&self) -> TypeHandle {
        TypeHandle::new(Arc::clone(&self.descriptor), Arc::clone(&self.database))
    }

    fn update(&self, f: impl FnOnce(&mut TypeTables)) -> &Self {
        let mut tables = self.descriptor.tables_mut();
        f(&mut *tables);
        drop(tables);
        self
    }

    /// Register `U` as a direct parent of `T`
    pub fn add_parent<U: Reflect>(&self) -> &Self
    where
        T: Inherits<U>,
    {
        self.database.type_of::<U>();
        let entry = BaseEntry::of::<T, U>();
        self.update(|tables| match tables.bases.iter_mut().find(|b| b.name == entry.name) {
            Some(existing) => *existing = entry,
            None => tables.bases.push(entry),
        })
    }

    /// Register a conversion to `U` through `Into`
    pub fn make_convertible<U: Reflect>(&self) -> &Self
    where
        T: Clone + Into<U>,
    {
        self.make_convertible_with::<U, _>(|value: &T| value.clone().into())
    }

    /// Register a conversion to `U` through `convert`
    pub fn make_convertible_with<U, F>(&self, convert: F) -> &Self
    where
        U: Reflect,
        F: Fn(&T) -> U + Send + Sync + 'static,
    {
        self.make_convertible_fallible::<U, _>(move |value| Some(convert(value)))
    }

    /// Register a conversion to `U` that may fail at call time
    pub fn make_convertible_fallible<U, F>(&self, convert: F) -> &Self
    where
        U: Reflect,
        F: Fn(&T) -> Option<U> + Send + Sync + 'static,
    {
        self.database.type_of::<U>();
        let convert = convert_fn(move |source| {
            let value = source.as_type::<T>()?;
            let db = source.type_handle().database()?;
            Some(Any::new_in(db, convert(value)?))
        });
        self.update(|tables| {
            tables.conversions.insert(U::type_name(), convert);
        })
    }

    /// Register the no-argument constructor from `Default`
    pub fn make_default_constructible(&self) -> &Self
    where
        T: Default,
    {
        self.make_constructible::<(), _>(|()| T::default())
    }

    /// Register copy operations and the copy constructor from `Clone`
    pub fn make_copyable(&self) -> &Self
    where
        T: Clone,
    {
        self.update(|tables| tables.copy = Some(CopyOps::of::<T>()));
        self.make_constructible::<(T,), _>(|(value,)| value)
    }

    /// Register a one-argument constructor from `From<A>`
    pub fn make_constructible_from<A>(&self) -> &Self
    where
        A: Reflect + Clone,
        T: From<A>,
    {
        self.make_constructible::<(A,), _>(|(arg,)| T::from(arg))
    }

    /// Register a constructor taking `Args`
    pub fn make_constructible<Args, F>(&self, construct: F) -> &Self
    where
        Args: ArgList,
        F: Fn(Args) -> T + Send + Sync + 'static,
    {
        self.make_constructible_fallible::<Args, _>(move |args| Some(construct(args)))
    }

    /// Register a constructor taking `Args` that may reject its arguments
    ///
    /// A rejected call fails like a call no constructor matched.
    pub fn make_constructible_fallible<Args, F>(&self, construct: F) -> &Self
    where
        Args: ArgList,
        F: Fn(Args) -> Option<T> + Send + Sync + 'static,
    {
        Args::reflect(&self.database);
        let construct = Arc::new(construct);

        let boxed = Arc::clone(&construct);
        let alloc = alloc_fn(move |db, args| {
            let value = boxed(Args::extract(args)?)?;
            Some(Any::new_in(db, value))
        });

        let in_place = in_place_fn(move |dst, args| {
            let value = construct(Args::extract(args)?)?;
            unsafe { ptr::write(dst.cast::<T>(), value) };
            Some(())
        });

        let constructor = Constructor {
            args: Args::specs(),
            alloc,
            in_place,
        };
        self.update(|tables| {
            match tables
                .constructors
                .iter_mut()
                .find(|c| c.args == constructor.args)
            {
                Some(existing) => *existing = constructor,
                None => tables.constructors.push(constructor),
            }
        })
    }

    /// Register the comparison predicates against `U`
    ///
    /// Also binds the comparable facet, so `Any` comparisons dispatch here.
    pub fn register_comparator<U: Reflect>(&self, ops: CompareOps) -> &Self {
        self.database.type_of::<U>();
        self.update(|tables| {
            tables.comparators.insert(U::type_name(), ops);
            tables
                .facets
                .entry(std::any::type_name::<ComparableVTable>())
                .or_insert_with(|| Arc::new(dispatch_vtable()) as VTableRef);
        })
    }

    /// Register all six comparisons against `U`
    pub fn make_comparable<U: Reflect>(&self) -> &Self
    where
        T: PartialOrd<U>,
    {
        self.register_comparator::<U>(CompareOps::ordering::<T, U>())
    }

    /// Register `==` and `!=` against `U`
    pub fn make_equality_comparable<U: Reflect>(&self) -> &Self
    where
        T: PartialEq<U>,
    {
        self.register_comparator::<U>(CompareOps::equality::<T, U>())
    }

    /// Tie an enum to its underlying integer type
    ///
    /// Registers the conversion to `U`, the checked constructor from `U`, and
    /// comparisons against `U`.
    pub fn underlying<U>(&self) -> &Self
    where
        U: Reflect + Copy + PartialOrd,
        T: Copy + Into<U> + TryFrom<U>,
    {
        self.make_convertible_with::<U, _>(|value: &T| (*value).into())
            .make_constructible_fallible::<(U,), _>(|(raw,)| T::try_from(raw).ok())
            .register_comparator::<U>(CompareOps::projected::<T, U>())
    }

    /// Register a named enumerator value
    pub fn enumerate<V>(&self, name: &str, value: V) -> &Self
    where
        V: Reflect + Clone + Send + Sync,
    {
        self.database.type_of::<V>();
        let enumerator = Enumerator {
            name: name.to_string(),
            value: StoredValue::new(value),
        };
        self.update(|tables| {
            match tables
                .enumerators
                .iter_mut()
                .find(|e| e.name == enumerator.name)
            {
                Some(existing) => *existing = enumerator,
                None => tables.enumerators.push(enumerator),
            }
        })
    }

    /// Attach an attribute value, keyed by its type
    pub fn attribute<V>(&self, value: V) -> &Self
    where
        V: Reflect + Clone + Send + Sync,
    {
        self.database.type_of::<V>();
        let stored = StoredValue::new(value);
        self.update(|tables| {
            tables.attributes.insert(V::type_name(), stored);
        })
    }

    /// Bind the facet vtable `V` provided by `T`
    pub fn facet<V>(&self) -> &Self
    where
        V: Send + Sync + 'static,
        T: ImplFacet<V>,
    {
        self.facet_with(T::vtable())
    }

    /// Bind an explicit facet vtable
    pub fn facet_with<V>(&self, vtable: V) -> &Self
    where
        V: Send + Sync + 'static,
    {
        let vtable: VTableRef = Arc::new(vtable);
        self.update(|tables| {
            tables.facets.insert(std::any::type_name::<V>(), vtable);
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::args::ArgSpec;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Level {
        Low = 1,
        High = 2,
    }

    impl From<Level> for i32 {
        fn from(level: Level) -> i32 {
            level as i32
        }
    }

    impl TryFrom<i32> for Level {
        type Error = ();

        fn try_from(raw: i32) -> Result<Self, ()> {
            match raw {
                1 => Ok(Level::Low),
                2 => Ok(Level::High),
                _ => Err(()),
            }
        }
    }

    impl Reflect for Level {
        const FLAGS: crate::flags::TypeFlags = crate::flags::TypeFlags::ENUM;

        fn init(factory: &TypeFactory<Self>) {
            factory
                .underlying::<i32>()
                .enumerate("Low", Level::Low)
                .enumerate("High", Level::High);
        }
    }

    #[derive(Clone, Debug, PartialEq)]
    struct Point {
        x: i32,
        y: i32,
    }

    impl Reflect for Point {}

    #[test]
    fn test_constructors_replace_same_signature() {
        let db = Database::new();
        let factory = db.reflect::<Point>();
        factory.make_constructible::<(i32, i32), _>(|(x, y)| Point { x, y });
        factory.make_constructible::<(i32, i32), _>(|(x, y)| Point { x: y, y: x });

        let ty = factory.handle();
        assert_eq!(ty.constructors().len(), 1);

        let point = ty
            .construct(&[Any::new_in(&db, 1i32), Any::new_in(&db, 2i32)])
            .unwrap();
        assert_eq!(point.get::<Point>(), Some(&Point { x: 2, y: 1 }));
    }

    #[test]
    fn test_construct_with_conversion() {
        let db = Database::new();
        let factory = db.reflect::<Point>();
        factory.make_constructible::<(i32, i32), _>(|(x, y)| Point { x, y });

        let ty = factory.handle();
        assert!(ty.constructible_from(&[ArgSpec::value::<u8>(), ArgSpec::value::<i64>()]));
        let point = ty
            .construct(&[Any::new_in(&db, 3u8), Any::new_in(&db, 4i64)])
            .unwrap();
        assert_eq!(point.get::<Point>(), Some(&Point { x: 3, y: 4 }));

        let err = ty.construct(&[Any::new_in(&db, 1i32)]).unwrap_err();
        assert_eq!(err.args, vec![ArgSpec::value::<i32>()]);
    }

    #[test]
    fn test_construct_in_place() {
        let db = Database::new();
        let factory = db.reflect::<Point>();
        factory.make_constructible::<(i32, i32), _>(|(x, y)| Point { x, y });

        let mut slot = std::mem::MaybeUninit::<Point>::uninit();
        unsafe {
            factory
                .handle()
                .construct_in_place(
                    slot.as_mut_ptr().cast(),
                    &[Any::new_in(&db, 5i32), Any::new_in(&db, 6i32)],
                )
                .unwrap();
            assert_eq!(slot.assume_init(), Point { x: 5, y: 6 });
        }
    }

    #[test]
    fn test_enum_underlying() {
        let db = Database::new();
        let ty = db.type_of::<Level>();

        assert!(ty.is_enum());
        assert_eq!(ty.enumerations(), vec!["Low", "High"]);
        assert_eq!(ty.enumerate("High").get::<Level>(), Some(&Level::High));
        assert!(ty.enumerate("Medium").is_empty());

        let high = Any::new_in(&db, Level::High);
        assert_eq!(high.cast(&db.type_of::<i32>()).unwrap().get::<i32>(), Some(&2));
        assert!(high == Any::new_in(&db, 2i32));
        assert!(high > Any::new_in(&db, 1i32));
        assert_eq!(ty.enumerator_name(&high).as_deref(), Some("High"));

        let low = ty.construct(&[Any::new_in(&db, 1i32)]).unwrap();
        assert_eq!(low.get::<Level>(), Some(&Level::Low));
        assert!(ty.construct(&[Any::new_in(&db, 7i32)]).is_err());
    }

    #[test]
    fn test_attributes() {
        let db = Database::new();
        db.reflect::<Point>().attribute(String::from("serializable"));

        let ty = db.type_of::<Point>();
        assert!(ty.has_attribute(std::any::type_name::<String>()));
        let attr = ty.attribute(std::any::type_name::<String>());
        assert_eq!(attr.get::<String>().map(String::as_str), Some("serializable"));
        assert!(ty.attribute("u8").is_empty());
    }
}
