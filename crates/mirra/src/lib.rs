//! Mirra runtime reflection
//!
//! This crate describes Rust types at runtime and manipulates their values
//! without static knowledge of them:
//! - **Database**: a name-keyed registry of type descriptors, populated lazily
//!   through each type's [`Reflect::init`] (`database`, `instance` modules)
//! - **Type handles**: the inspection API over a descriptor: flags, parents,
//!   conversions, constructors, comparators, enumerators, attributes (`handle`)
//! - **Any**: a type-erased owned value or borrow with small-value
//!   optimisation, casts along parents and conversions (`any` module)
//! - **Facets**: vtable-based capabilities bound per type, with built-in
//!   comparable, pointer-like, tuple-like, string-like and range-like facets
//! - **Queries**: declarative filtering of a database's types (`query`)
//!
//! # Example
//!
//! ```rust,ignore
//! use mirra::{Any, Database, Reflect, TypeFactory};
//!
//! #[derive(Clone)]
//! struct Meters(f64);
//!
//! impl Reflect for Meters {
//!     fn init(factory: &TypeFactory<Self>) {
//!         factory
//!             .make_copyable()
//!             .make_constructible::<(f64,), _>(|(v,)| Meters(v))
//!             .make_convertible_with::<f64, _>(|m: &Meters| m.0);
//!     }
//! }
//!
//! let db = Database::new();
//! let ty = db.type_of::<Meters>();
//! let value = ty.construct(&[Any::new_in(&db, 3i32)]).unwrap();
//! assert!(value.cast(&db.type_of::<f64>()).unwrap() == Any::new_in(&db, 3.0f64));
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

// ============================================================================
// Core Modules
// ============================================================================

mod any;
mod args;
mod builtins;
mod database;
mod descriptor;
mod error;
mod factory;
mod flags;
mod handle;
mod instance;
mod options;
mod query;
mod reflect;
mod tables;

pub mod facet;

// ============================================================================
// Re-exports
// ============================================================================

pub use any::Any;
pub use args::{arg_compatible, args_compatible, args_exact, ArgList, ArgSpec};
pub use database::Database;
pub use error::{CastError, ConstructorError, CopyError, Error, FacetError, Result};
pub use facet::{Facet, FacetGroup, FacetRef, ImplFacet};
pub use factory::TypeFactory;
pub use flags::{AnyFlags, TypeFlags};
pub use handle::TypeHandle;
pub use instance::{database_instance, get_type, query, reflect, reset, set_database_instance, type_of};
pub use options::DatabaseOptions;
pub use query::Query;
pub use reflect::{Inherits, Reflect};
pub use tables::{CompareFn, CompareOp, CompareOps};
