//! Type descriptors
//!
//! A descriptor holds the immutable facts about one Rust type plus the
//! mutable tables its initialiser fills in. Descriptors are created by the
//! database on first reflection and live as long as the database does.

use crate::any::storage;
use crate::database::Database;
use crate::factory::TypeFactory;
use crate::flags::TypeFlags;
use crate::handle::TypeHandle;
use crate::reflect::Reflect;
use crate::tables::TypeTables;
use mirra_sync::{Locked, ReadGuard, WriteGuard};
use std::any::TypeId;
use std::fmt;
use std::mem;
use std::ptr;
use std::sync::Arc;

type LinkFn = fn(&Arc<Database>) -> Option<TypeHandle>;
type InitFn = fn(&Arc<Database>, &Arc<TypeDescriptor>);

pub(crate) struct TypeDescriptor {
    pub name: &'static str,
    pub type_id: TypeId,
    pub flags: TypeFlags,
    pub size: usize,
    pub align: usize,
    pub extent: usize,
    /// Values of this type are stored inside an `Any`'s buffer
    pub inline: bool,

    pub remove_pointer: LinkFn,
    pub remove_extent: LinkFn,

    /// Drop the value at the pointer in place
    pub drop_in_place: unsafe fn(*mut u8),
    /// Drop and free a value allocated with `Box`
    pub drop_boxed: unsafe fn(*mut u8),

    initializer: InitFn,
    tables: Locked<TypeTables>,
}

impl TypeDescriptor {
    pub(crate) fn new<T: Reflect>(spin_limit: u32) -> Self {
        Self {
            name: T::type_name(),
            type_id: TypeId::of::<T>(),
            flags: T::FLAGS,
            size: mem::size_of::<T>(),
            align: mem::align_of::<T>(),
            extent: T::EXTENT,
            inline: storage::fits::<T>(),
            remove_pointer: T::remove_pointer,
            remove_extent: T::remove_extent,
            drop_in_place: drop_in_place::<T>,
            drop_boxed: drop_boxed::<T>,
            initializer: initialize::<T>,
            tables: Locked::with_spin_limit(TypeTables::default(), spin_limit),
        }
    }

    /// Run the type's initialiser against `db`
    pub(crate) fn initialize(self: &Arc<Self>, db: &Arc<Database>) {
        (self.initializer)(db, self)
    }

    /// Clear every table and run the initialiser again
    ///
    /// Other threads reading the tables wait until the initialiser has
    /// refilled them.
    pub(crate) fn reset(self: &Arc<Self>, db: &Arc<Database>) {
        let _exclusive = self.tables.lock().write();
        let previous = mem::take(&mut *self.tables.write());
        // Table entries may own user closures; drop them outside the data guard.
        drop(previous);
        self.initialize(db);
    }

    pub(crate) fn tables(&self) -> ReadGuard<'_, TypeTables> {
        self.tables.read()
    }

    pub(crate) fn tables_mut(&self) -> WriteGuard<'_, TypeTables> {
        self.tables.write()
    }
}

impl fmt::Debug for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeDescriptor")
            .field("name", &self.name)
            .field("flags", &self.flags)
            .field("size", &self.size)
            .field("align", &self.align)
            .field("extent", &self.extent)
            .field("inline", &self.inline)
            .field("registered", &!self.tables().is_empty())
            .finish_non_exhaustive()
    }
}

fn initialize<T: Reflect>(db: &Arc<Database>, descriptor: &Arc<TypeDescriptor>) {
    let factory = TypeFactory::<T>::new(Arc::clone(db), Arc::clone(descriptor));
    T::init(&factory);
}

unsafe fn drop_in_place<T>(ptr: *mut u8) {
    ptr::drop_in_place(ptr.cast::<T>());
}

unsafe fn drop_boxed<T>(ptr: *mut u8) {
    drop(Box::from_raw(ptr.cast::<T>()));
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Plain {
        _a: u64,
        _b: u32,
    }

    impl Reflect for Plain {}

    #[test]
    fn test_static_facts() {
        let descriptor = TypeDescriptor::new::<Plain>(12);
        assert_eq!(descriptor.name, std::any::type_name::<Plain>());
        assert_eq!(descriptor.flags, TypeFlags::CLASS);
        assert_eq!(descriptor.size, 16);
        assert_eq!(descriptor.align, 8);
        assert_eq!(descriptor.extent, 0);
        assert!(descriptor.inline);
        assert!(descriptor.tables().is_empty());
    }

    #[test]
    fn test_large_types_are_not_inline() {
        struct Large([u64; 3]);
        impl Reflect for Large {}

        let descriptor = TypeDescriptor::new::<Large>(12);
        assert_eq!(descriptor.size, 24);
        assert!(!descriptor.inline);
    }
}
