//! Error types raised by casts, copies, facets and constructors

use crate::args::ArgSpec;
use thiserror::Error;

/// Result type for fallible reflection operations
pub type Result<T> = std::result::Result<T, Error>;

/// An `Any` could not be represented as, or converted to, the requested type
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Cannot cast {from} to {to}")]
pub struct CastError {
    /// Name of the managed type
    pub from: String,
    /// Name of the requested type
    pub to: String,
}

/// A copy was requested for a type without a registered copy constructor
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Type {type_name} is not copy constructible")]
pub struct CopyError {
    /// Name of the managed type
    pub type_name: String,
}

/// A facet function was invoked whose vtable or slot is unbound
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Facet function {function} is not bound")]
pub struct FacetError {
    /// Qualified name of the facet function, e.g. `PointerLike::deref`
    pub function: &'static str,
}

impl FacetError {
    /// Create an error for the named facet function
    pub const fn new(function: &'static str) -> Self {
        Self { function }
    }
}

/// No constructor accepted the given argument list
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("No constructor of {type_name} accepts ({})", join_args(.args))]
pub struct ConstructorError {
    /// Name of the type being constructed
    pub type_name: String,
    /// Argument list that was attempted
    pub args: Vec<ArgSpec>,
}

fn join_args(args: &[ArgSpec]) -> String {
    args.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Any error raised by this crate
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// Cast failure
    #[error(transparent)]
    Cast(#[from] CastError),

    /// Copy failure
    #[error(transparent)]
    Copy(#[from] CopyError),

    /// Unbound facet function
    #[error(transparent)]
    Facet(#[from] FacetError),

    /// Constructor resolution failure
    #[error(transparent)]
    Constructor(#[from] ConstructorError),
}
