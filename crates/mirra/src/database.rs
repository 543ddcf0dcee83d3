//! The type database
//!
//! A database maps type names to descriptors. Reflection is idempotent: the
//! first reflection of a type inserts its descriptor and runs its initialiser
//! under the database's exclusive lock, later reflections are lookups.
//!
//! The exclusive lock is recursive, so initialisers may reflect further types
//! (their parents, argument types, element types...) on the same thread.

use crate::builtins;
use crate::descriptor::TypeDescriptor;
use crate::factory::TypeFactory;
use crate::handle::TypeHandle;
use crate::options::DatabaseOptions;
use crate::query::Query;
use crate::reflect::Reflect;
use mirra_sync::Locked;
use rustc_hash::FxHashMap;
use std::fmt;
use std::sync::Arc;

/// A registry of type descriptors keyed by name
pub struct Database {
    types: Locked<FxHashMap<&'static str, Arc<TypeDescriptor>>>,
    options: DatabaseOptions,
}

impl Database {
    /// Create an empty database with default options
    pub fn new() -> Arc<Self> {
        Self::with_options(DatabaseOptions::default())
    }

    /// Create a database with the given options
    pub fn with_options(options: DatabaseOptions) -> Arc<Self> {
        let db = Arc::new(Self {
            types: Locked::with_spin_limit(FxHashMap::default(), options.spin_limit),
            options,
        });
        if db.options.preload_builtins {
            builtins::preload(&db);
        }
        db
    }

    /// Options this database was created with
    pub fn options(&self) -> &DatabaseOptions {
        &self.options
    }

    /// Reflect `T` and return a factory for registering additional facts
    pub fn reflect<T: Reflect>(self: &Arc<Self>) -> TypeFactory<T> {
        TypeFactory::new(Arc::clone(self), self.descriptor::<T>())
    }

    /// Reflect `T` and return its handle
    pub fn type_of<T: Reflect>(self: &Arc<Self>) -> TypeHandle {
        TypeHandle::new(self.descriptor::<T>(), Arc::clone(self))
    }

    /// Look up an already reflected type by name
    ///
    /// Returns an invalid handle if no such type has been reflected.
    pub fn get_type(self: &Arc<Self>, name: &str) -> TypeHandle {
        match self.types.read().get(name) {
            Some(descriptor) => TypeHandle::new(Arc::clone(descriptor), Arc::clone(self)),
            None => TypeHandle::invalid(),
        }
    }

    /// Check if a type with this name has been reflected
    pub fn contains(&self, name: &str) -> bool {
        self.types.read().contains_key(name)
    }

    /// Number of reflected types
    pub fn len(&self) -> usize {
        self.types.read().len()
    }

    /// Check if no type has been reflected
    pub fn is_empty(&self) -> bool {
        self.types.read().is_empty()
    }

    /// Handles for every reflected type, sorted by name
    pub fn types(self: &Arc<Self>) -> Vec<TypeHandle> {
        let mut descriptors: Vec<Arc<TypeDescriptor>> =
            self.types.read().values().cloned().collect();
        descriptors.sort_by_key(|d| d.name);
        descriptors
            .into_iter()
            .map(|d| TypeHandle::new(d, Arc::clone(self)))
            .collect()
    }

    /// Start a query over this database
    pub fn query(self: &Arc<Self>) -> Query {
        Query::new(Arc::clone(self))
    }

    /// Clear `T`'s tables and rerun its initialiser
    ///
    /// Returns `false` if `T` was never reflected here.
    pub fn reset<T: Reflect>(self: &Arc<Self>) -> bool {
        self.reset_type(T::type_name())
    }

    /// Clear the named type's tables and rerun its initialiser
    pub fn reset_type(self: &Arc<Self>, name: &str) -> bool {
        let _exclusive = self.types.lock().write();
        let descriptor = self.types.read().get(name).cloned();
        match descriptor {
            Some(descriptor) => {
                tracing::debug!(type_name = descriptor.name, "Resetting type");
                descriptor.reset(self);
                true
            }
            None => false,
        }
    }

    /// Reset every reflected type
    pub fn reset_all(self: &Arc<Self>) {
        let _exclusive = self.types.lock().write();
        let descriptors: Vec<Arc<TypeDescriptor>> = self.types.read().values().cloned().collect();
        tracing::debug!(count = descriptors.len(), "Resetting all types");
        for descriptor in descriptors {
            descriptor.reset(self);
        }
    }

    /// The descriptor for `T`, reflecting it if needed
    pub(crate) fn descriptor<T: Reflect>(self: &Arc<Self>) -> Arc<TypeDescriptor> {
        let name = T::type_name();
        if let Some(found) = self.types.read().get(name) {
            return Arc::clone(found);
        }

        // Hold the exclusive lock across insertion and initialisation so no
        // other thread observes a half-initialised descriptor.
        let _exclusive = self.types.lock().write();
        if let Some(found) = self.types.read().get(name).cloned() {
            return found;
        }

        let descriptor = Arc::new(TypeDescriptor::new::<T>(self.options.spin_limit));
        self.types.write().insert(name, Arc::clone(&descriptor));
        tracing::debug!(type_name = name, "Reflecting type");
        descriptor.initialize(self);
        descriptor
    }
}

impl fmt::Debug for Database {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Database")
            .field("types", &self.len())
            .field("options", &self.options)
            .finish()
    }
}
