//! Constructor arguments and overload resolution

use crate::any::Any;
use crate::database::Database;
use crate::reflect::Reflect;
use crate::tables::Constructor;
use std::fmt;
use std::sync::Arc;

/// The shape of one constructor argument
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ArgSpec {
    /// Name of the argument's type
    pub type_name: &'static str,
    /// The argument is read-only
    pub is_const: bool,
    /// The argument is passed by value rather than borrowed
    pub by_value: bool,
}

impl ArgSpec {
    /// Create a new argument spec
    pub const fn new(type_name: &'static str, is_const: bool, by_value: bool) -> Self {
        Self {
            type_name,
            is_const,
            by_value,
        }
    }

    /// An owned `T`
    pub fn value<T: Reflect>() -> Self {
        Self::new(T::type_name(), false, true)
    }

    /// A read-only borrow of `T`
    pub fn shared<T: Reflect>() -> Self {
        Self::new(T::type_name(), true, false)
    }

    /// A mutable borrow of `T`
    pub fn exclusive<T: Reflect>() -> Self {
        Self::new(T::type_name(), false, false)
    }
}

impl fmt::Display for ArgSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.by_value, self.is_const) {
            (true, _) => f.write_str(self.type_name),
            (false, true) => write!(f, "&{}", self.type_name),
            (false, false) => write!(f, "&mut {}", self.type_name),
        }
    }
}

/// A tuple of constructor arguments
///
/// Implemented for tuples of up to six `Reflect + Clone` elements. Arguments
/// are extracted as the exact type when possible and through a cast
/// otherwise.
pub trait ArgList: Sized + 'static {
    /// Argument shapes, all by value
    fn specs() -> Vec<ArgSpec>;

    /// Reflect every element type in `db`
    fn reflect(db: &Arc<Database>);

    /// Build the tuple from erased arguments
    fn extract(args: &[Any<'_>]) -> Option<Self>;
}

fn fetch<A: Reflect + Clone>(arg: &Any<'_>) -> Option<A> {
    if let Some(value) = arg.as_type::<A>() {
        return Some(value.clone());
    }
    let target = arg.type_handle().database()?.type_of::<A>();
    let converted = arg.try_cast(&target);
    converted.get::<A>().cloned()
}

impl ArgList for () {
    fn specs() -> Vec<ArgSpec> {
        Vec::new()
    }

    fn reflect(_db: &Arc<Database>) {}

    fn extract(args: &[Any<'_>]) -> Option<Self> {
        args.is_empty().then_some(())
    }
}

macro_rules! impl_arg_list {
    ($($name:ident : $idx:tt),+) => {
        impl<$($name: Reflect + Clone),+> ArgList for ($($name,)+) {
            fn specs() -> Vec<ArgSpec> {
                vec![$(ArgSpec::value::<$name>()),+]
            }

            fn reflect(db: &Arc<Database>) {
                $(db.type_of::<$name>();)+
            }

            fn extract(args: &[Any<'_>]) -> Option<Self> {
                if args.len() != [$(stringify!($name)),+].len() {
                    return None;
                }
                Some(($(fetch::<$name>(&args[$idx])?,)+))
            }
        }
    };
}

impl_arg_list!(A: 0);
impl_arg_list!(A: 0, B: 1);
impl_arg_list!(A: 0, B: 1, C: 2);
impl_arg_list!(A: 0, B: 1, C: 2, D: 3);
impl_arg_list!(A: 0, B: 1, C: 2, D: 3, E: 4);
impl_arg_list!(A: 0, B: 1, C: 2, D: 3, E: 4, F: 5);

/// Check if an actual argument may bind to an expected parameter
///
/// The types must be equal, or the actual type must have the expected one
/// as a parent or be convertible to it. A read-only argument cannot bind to
/// a mutable borrow.
pub fn arg_compatible(db: &Arc<Database>, expected: &ArgSpec, actual: &ArgSpec) -> bool {
    if expected == actual {
        return true;
    }
    let const_ok = expected.by_value || expected.is_const || !actual.is_const;
    if !const_ok {
        return false;
    }
    if expected.type_name == actual.type_name {
        return true;
    }
    let from = db.get_type(actual.type_name);
    let to = db.get_type(expected.type_name);
    from.inherits_from(&to) || from.convertible_to(&to)
}

/// Check if two argument lists match position by position
pub fn args_compatible(db: &Arc<Database>, expected: &[ArgSpec], actual: &[ArgSpec]) -> bool {
    expected.len() == actual.len()
        && expected
            .iter()
            .zip(actual)
            .all(|(e, a)| arg_compatible(db, e, a))
}

/// Check if two argument lists are identical
///
/// By-value arguments match regardless of const-qualification: the callee
/// receives its own copy either way.
pub fn args_exact(expected: &[ArgSpec], actual: &[ArgSpec]) -> bool {
    expected.len() == actual.len()
        && expected.iter().zip(actual).all(|(e, a)| {
            e.type_name == a.type_name
                && e.by_value == a.by_value
                && (e.by_value || e.is_const == a.is_const)
        })
}

/// Pick the constructor for `actual`: the first exact match, else the first
/// compatible one
pub(crate) fn resolve<'c>(
    db: &Arc<Database>,
    constructors: &'c [Constructor],
    actual: &[ArgSpec],
) -> Option<&'c Constructor> {
    if let Some(exact) = constructors.iter().find(|c| args_exact(&c.args, actual)) {
        tracing::trace!(args = actual.len(), "Resolved exact constructor");
        return Some(exact);
    }
    let compatible = constructors
        .iter()
        .find(|c| args_compatible(db, &c.args, actual));
    if compatible.is_some() {
        tracing::trace!(args = actual.len(), "Resolved compatible constructor");
    } else {
        tracing::trace!(args = actual.len(), "No matching constructor");
    }
    compatible
}
