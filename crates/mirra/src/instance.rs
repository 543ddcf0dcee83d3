//! The process-wide database instance
//!
//! Free functions such as [`type_of`] and [`Any::new`](crate::Any::new) go
//! through this slot. Swapping it only affects lookups made afterwards:
//! handles and values created earlier keep their own database alive.

use crate::database::Database;
use crate::factory::TypeFactory;
use crate::handle::TypeHandle;
use crate::query::Query;
use crate::reflect::Reflect;
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use std::mem;
use std::sync::Arc;

static INSTANCE: Lazy<RwLock<Arc<Database>>> = Lazy::new(|| RwLock::new(Database::new()));

/// The current process-wide database
pub fn database_instance() -> Arc<Database> {
    Arc::clone(&INSTANCE.read())
}

/// Replace the process-wide database, returning the previous one
pub fn set_database_instance(db: Arc<Database>) -> Arc<Database> {
    let previous = mem::replace(&mut *INSTANCE.write(), db);
    tracing::debug!(types = previous.len(), "Replaced database instance");
    previous
}

/// Reflect `T` in the current database and return its handle
pub fn type_of<T: Reflect>() -> TypeHandle {
    database_instance().type_of::<T>()
}

/// Look up a type by name in the current database
pub fn get_type(name: &str) -> TypeHandle {
    database_instance().get_type(name)
}

/// Reflect `T` in the current database and return its factory
pub fn reflect<T: Reflect>() -> TypeFactory<T> {
    database_instance().reflect::<T>()
}

/// Reset `T` in the current database
pub fn reset<T: Reflect>() -> bool {
    database_instance().reset::<T>()
}

/// Start a query over the current database
pub fn query() -> Query {
    database_instance().query()
}
