//! The `Reflect` trait: how a Rust type enters a type database

use crate::database::Database;
use crate::factory::TypeFactory;
use crate::flags::TypeFlags;
use crate::handle::TypeHandle;
use std::sync::Arc;

/// A type that can be described by a [`Database`]
///
/// The associated constants and the link functions are the compile-time
/// facts of a type. [`Reflect::init`] runs once per database, the first time
/// the type is reflected there (and again after a reset), and registers the
/// type's runtime facts through a [`TypeFactory`].
///
/// ```ignore
/// struct Counter(i32);
///
/// impl Reflect for Counter {
///     fn init(factory: &TypeFactory<Self>) {
///         factory.make_constructible::<(i32,), _>(|(v,)| Counter(v));
///     }
/// }
/// ```
pub trait Reflect: Sized + 'static {
    /// Category flags
    const FLAGS: TypeFlags = TypeFlags::CLASS;

    /// Number of elements if this is an array type, else 0
    const EXTENT: usize = 0;

    /// The unique name of this type
    fn type_name() -> &'static str {
        std::any::type_name::<Self>()
    }

    /// The pointee type, for pointer types
    fn remove_pointer(_db: &Arc<Database>) -> Option<TypeHandle> {
        None
    }

    /// The element type, for array types
    fn remove_extent(_db: &Arc<Database>) -> Option<TypeHandle> {
        None
    }

    /// Register runtime facts (constructors, conversions, facets, ...)
    fn init(_factory: &TypeFactory<Self>) {}
}

/// `Self` contains a `U` it can be viewed as
///
/// Registering `U` as a parent with [`TypeFactory::add_parent`] lets an `Any`
/// holding `Self` be cast to `U` without copying.
pub trait Inherits<U> {
    /// View as the parent
    fn upcast(&self) -> &U;

    /// Mutable view as the parent
    fn upcast_mut(&mut self) -> &mut U;
}
