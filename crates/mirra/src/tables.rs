//! Per-type registration tables
//!
//! Every table entry refers to other types by name only. Entries never hold a
//! database or a descriptor, so a descriptor can never keep its own database
//! alive.

use crate::any::Any;
use crate::args::ArgSpec;
use crate::database::Database;
use crate::reflect::{Inherits, Reflect};
use rustc_hash::FxHashMap;
use std::any::Any as StdAny;
use std::ptr;
use std::sync::Arc;

/// Comparison predicate between two values
pub type CompareFn = fn(&Any<'_>, &Any<'_>) -> bool;

pub(crate) type ConvertFn = Arc<dyn Fn(&Any<'_>) -> Option<Any<'static>> + Send + Sync>;
pub(crate) type AllocFn =
    Arc<dyn Fn(&Arc<Database>, &[Any<'_>]) -> Option<Any<'static>> + Send + Sync>;
pub(crate) type InPlaceFn = Arc<dyn Fn(*mut u8, &[Any<'_>]) -> Option<()> + Send + Sync>;
pub(crate) type VTableRef = Arc<dyn StdAny + Send + Sync>;

pub(crate) fn convert_fn<F>(f: F) -> ConvertFn
where
    F: Fn(&Any<'_>) -> Option<Any<'static>> + Send + Sync + 'static,
{
    Arc::new(f)
}

pub(crate) fn alloc_fn<F>(f: F) -> AllocFn
where
    F: Fn(&Arc<Database>, &[Any<'_>]) -> Option<Any<'static>> + Send + Sync + 'static,
{
    Arc::new(f)
}

pub(crate) fn in_place_fn<F>(f: F) -> InPlaceFn
where
    F: Fn(*mut u8, &[Any<'_>]) -> Option<()> + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Copy operations for a clonable type
#[derive(Clone, Copy)]
pub(crate) struct CopyOps {
    /// Clone `src` into uninitialised memory at `dst`
    pub clone_into: unsafe fn(*const u8, *mut u8),
    /// Clone `src` into a fresh heap allocation
    pub clone_boxed: unsafe fn(*const u8) -> *mut u8,
    /// Clone `src` over the live value at `dst`
    pub clone_assign: unsafe fn(*const u8, *mut u8),
}

impl CopyOps {
    pub(crate) fn of<T: Clone>() -> Self {
        Self {
            clone_into: clone_into::<T>,
            clone_boxed: clone_boxed::<T>,
            clone_assign: clone_assign::<T>,
        }
    }
}

unsafe fn clone_into<T: Clone>(src: *const u8, dst: *mut u8) {
    ptr::write(dst.cast::<T>(), (*src.cast::<T>()).clone());
}

unsafe fn clone_boxed<T: Clone>(src: *const u8) -> *mut u8 {
    Box::into_raw(Box::new((*src.cast::<T>()).clone())).cast::<u8>()
}

unsafe fn clone_assign<T: Clone>(src: *const u8, dst: *mut u8) {
    (*dst.cast::<T>()).clone_from(&*src.cast::<T>());
}

/// A direct parent and the address adjustments to reach it
#[derive(Clone, Copy)]
pub(crate) struct BaseEntry {
    pub name: &'static str,
    pub upcast: unsafe fn(*const u8) -> *const u8,
    pub upcast_mut: unsafe fn(*mut u8) -> *mut u8,
}

impl BaseEntry {
    pub(crate) fn of<T: Inherits<U>, U: Reflect>() -> Self {
        Self {
            name: U::type_name(),
            upcast: upcast::<T, U>,
            upcast_mut: upcast_mut::<T, U>,
        }
    }
}

unsafe fn upcast<T: Inherits<U>, U>(ptr: *const u8) -> *const u8 {
    let derived = &*ptr.cast::<T>();
    (derived.upcast() as *const U).cast::<u8>()
}

unsafe fn upcast_mut<T: Inherits<U>, U>(ptr: *mut u8) -> *mut u8 {
    let derived = &mut *ptr.cast::<T>();
    (derived.upcast_mut() as *mut U).cast::<u8>()
}

/// A registered constructor
#[derive(Clone)]
pub(crate) struct Constructor {
    pub args: Vec<ArgSpec>,
    pub alloc: AllocFn,
    pub in_place: InPlaceFn,
}

/// Which comparison to perform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompareOp {
    /// `==`
    Eq,
    /// `!=`
    Ne,
    /// `<`
    Lt,
    /// `<=`
    Le,
    /// `>`
    Gt,
    /// `>=`
    Ge,
}

impl CompareOp {
    /// The operator that gives the same answer with operands swapped
    pub fn swapped(self) -> Self {
        match self {
            CompareOp::Eq => CompareOp::Eq,
            CompareOp::Ne => CompareOp::Ne,
            CompareOp::Lt => CompareOp::Gt,
            CompareOp::Le => CompareOp::Ge,
            CompareOp::Gt => CompareOp::Lt,
            CompareOp::Ge => CompareOp::Le,
        }
    }
}

/// The comparison predicates registered between a type and one other type
///
/// Unset slots mean the comparison is not available.
#[derive(Debug, Clone, Copy, Default)]
pub struct CompareOps {
    /// Equality
    pub eq: Option<CompareFn>,
    /// Inequality
    pub ne: Option<CompareFn>,
    /// Less than
    pub lt: Option<CompareFn>,
    /// Less than or equal
    pub le: Option<CompareFn>,
    /// Greater than
    pub gt: Option<CompareFn>,
    /// Greater than or equal
    pub ge: Option<CompareFn>,
}

impl CompareOps {
    /// Equality and inequality through `PartialEq`
    pub fn equality<T, U>() -> Self
    where
        T: Reflect + PartialEq<U>,
        U: Reflect,
    {
        Self {
            eq: Some(pair_eq::<T, U>),
            ne: Some(pair_ne::<T, U>),
            ..Self::default()
        }
    }

    /// All six comparisons through `PartialEq` and `PartialOrd`
    pub fn ordering<T, U>() -> Self
    where
        T: Reflect + PartialOrd<U>,
        U: Reflect,
    {
        Self {
            lt: Some(pair_lt::<T, U>),
            le: Some(pair_le::<T, U>),
            gt: Some(pair_gt::<T, U>),
            ge: Some(pair_ge::<T, U>),
            ..Self::equality::<T, U>()
        }
    }

    /// Comparisons of `T` against `U` after projecting `T` into `U`
    pub fn projected<T, U>() -> Self
    where
        T: Reflect + Copy + Into<U>,
        U: Reflect + PartialOrd,
    {
        Self {
            eq: Some(projected_eq::<T, U>),
            ne: Some(projected_ne::<T, U>),
            lt: Some(projected_lt::<T, U>),
            le: Some(projected_le::<T, U>),
            gt: Some(projected_gt::<T, U>),
            ge: Some(projected_ge::<T, U>),
        }
    }

    /// The predicate for `op`, if registered
    pub fn get(&self, op: CompareOp) -> Option<CompareFn> {
        match op {
            CompareOp::Eq => self.eq,
            CompareOp::Ne => self.ne,
            CompareOp::Lt => self.lt,
            CompareOp::Le => self.le,
            CompareOp::Gt => self.gt,
            CompareOp::Ge => self.ge,
        }
    }
}

macro_rules! pair_predicates {
    ($($name:ident => $op:tt, $bound:ident;)*) => {
        $(
            fn $name<T: Reflect + $bound<U>, U: Reflect>(a: &Any<'_>, b: &Any<'_>) -> bool {
                match (a.as_type::<T>(), b.as_type::<U>()) {
                    (Some(x), Some(y)) => x $op y,
                    _ => false,
                }
            }
        )*
    };
}

pair_predicates! {
    pair_eq => ==, PartialEq;
    pair_ne => !=, PartialEq;
    pair_lt => <, PartialOrd;
    pair_le => <=, PartialOrd;
    pair_gt => >, PartialOrd;
    pair_ge => >=, PartialOrd;
}

macro_rules! projected_predicates {
    ($($name:ident => $op:tt;)*) => {
        $(
            fn $name<T, U>(a: &Any<'_>, b: &Any<'_>) -> bool
            where
                T: Reflect + Copy + Into<U>,
                U: Reflect + PartialOrd,
            {
                match (a.as_type::<T>(), b.as_type::<U>()) {
                    (Some(x), Some(y)) => Into::<U>::into(*x) $op *y,
                    _ => false,
                }
            }
        )*
    };
}

projected_predicates! {
    projected_eq => ==;
    projected_ne => !=;
    projected_lt => <;
    projected_le => <=;
    projected_gt => >;
    projected_ge => >=;
}

/// A value stored in a type's tables (enumerator or attribute)
#[derive(Clone)]
pub(crate) struct StoredValue {
    pub type_name: &'static str,
    value: Arc<dyn StdAny + Send + Sync>,
    materialize: fn(&Arc<Database>, &(dyn StdAny + Send + Sync)) -> Any<'static>,
}

impl StoredValue {
    pub(crate) fn new<V: Reflect + Clone + Send + Sync>(value: V) -> Self {
        Self {
            type_name: V::type_name(),
            value: Arc::new(value),
            materialize: materialize::<V>,
        }
    }

    /// An owned copy of the value
    pub(crate) fn to_any(&self, db: &Arc<Database>) -> Any<'static> {
        (self.materialize)(db, &*self.value)
    }

    /// Run `f` with a borrowed view of the value
    pub(crate) fn with_borrowed<R>(
        &self,
        db: &Arc<Database>,
        f: impl FnOnce(&Any<'_>) -> R,
    ) -> R {
        let ty = db.get_type(self.type_name);
        let ptr = (&*self.value as *const (dyn StdAny + Send + Sync)).cast::<u8>();
        // The Arc keeps the value alive for the duration of `f`.
        let view = unsafe { Any::from_raw_const(ty, ptr) };
        f(&view)
    }
}

fn materialize<V: Reflect + Clone>(
    db: &Arc<Database>,
    value: &(dyn StdAny + Send + Sync),
) -> Any<'static> {
    match value.downcast_ref::<V>() {
        Some(v) => Any::new_in(db, v.clone()),
        None => Any::empty(),
    }
}

/// A named enumerator value
#[derive(Clone)]
pub(crate) struct Enumerator {
    pub name: String,
    pub value: StoredValue,
}

/// All registration tables of one type
#[derive(Clone, Default)]
pub(crate) struct TypeTables {
    pub copy: Option<CopyOps>,
    pub bases: Vec<BaseEntry>,
    pub conversions: FxHashMap<&'static str, ConvertFn>,
    pub constructors: Vec<Constructor>,
    pub comparators: FxHashMap<&'static str, CompareOps>,
    pub enumerators: Vec<Enumerator>,
    pub attributes: FxHashMap<&'static str, StoredValue>,
    pub facets: FxHashMap<&'static str, VTableRef>,
}

impl TypeTables {
    pub(crate) fn is_empty(&self) -> bool {
        self.copy.is_none()
            && self.bases.is_empty()
            && self.conversions.is_empty()
            && self.constructors.is_empty()
            && self.comparators.is_empty()
            && self.enumerators.is_empty()
            && self.attributes.is_empty()
            && self.facets.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compare_op_swapped() {
        assert_eq!(CompareOp::Lt.swapped(), CompareOp::Gt);
        assert_eq!(CompareOp::Ge.swapped(), CompareOp::Le);
        assert_eq!(CompareOp::Eq.swapped(), CompareOp::Eq);
    }

    #[test]
    fn test_equality_ops_leave_ordering_unset() {
        let ops = CompareOps::equality::<String, String>();
        assert!(ops.get(CompareOp::Eq).is_some());
        assert!(ops.get(CompareOp::Ne).is_some());
        assert!(ops.get(CompareOp::Lt).is_none());
        assert!(ops.get(CompareOp::Ge).is_none());
    }

    #[test]
    fn test_copy_ops_clone_string() {
        let ops = CopyOps::of::<String>();
        let src = String::from("mirra");
        unsafe {
            let boxed = (ops.clone_boxed)((&src as *const String).cast());
            let boxed = Box::from_raw(boxed.cast::<String>());
            assert_eq!(*boxed, "mirra");

            let mut dst = String::from("old");
            (ops.clone_assign)((&src as *const String).cast(), (&mut dst as *mut String).cast());
            assert_eq!(dst, "mirra");
        }
    }

    #[test]
    fn test_default_tables_are_empty() {
        assert!(TypeTables::default().is_empty());
    }
}
