//! The range-like facet and its type-erased iterators
//!
//! A [`RangeIter`] wraps a boxed [`Cursor`]. Every cursor can read the
//! current element and step forward; cursors over contiguous storage also
//! step back, jump and measure distances. The rest report a [`FacetError`].

use super::{Facet, FacetRef, ImplFacet};
use crate::any::Any;
use crate::database::Database;
use crate::error::FacetError;
use crate::handle::TypeHandle;
use crate::reflect::Reflect;
use std::collections::{btree_set, BTreeSet, VecDeque};
use std::fmt;
use std::sync::Arc;

/// A position inside a range
pub trait Cursor<'a> {
    /// Index of the current element; the range length once past the end
    fn position(&self) -> usize;

    /// Read-only borrow of the current element, empty past the end
    fn get(&self) -> Any<'a>;

    /// Step to the next element
    fn increment(&mut self);

    /// Duplicate this cursor
    fn boxed_clone(&self) -> Box<dyn Cursor<'a> + 'a>;

    /// Step to the previous element
    fn decrement(&mut self) -> Result<(), FacetError> {
        Err(FacetError::new("RangeIter::decrement"))
    }

    /// Move by `n` elements
    fn advance(&mut self, n: isize) -> Result<(), FacetError> {
        if n < 0 {
            return Err(FacetError::new("RangeIter::advance"));
        }
        for _ in 0..n {
            self.increment();
        }
        Ok(())
    }

    /// Signed distance from `other` to this cursor
    fn distance(&self, _other: &dyn Cursor<'a>) -> Result<isize, FacetError> {
        Err(FacetError::new("RangeIter::distance"))
    }
}

/// A type-erased iterator over a range
pub struct RangeIter<'a> {
    cursor: Box<dyn Cursor<'a> + 'a>,
}

impl<'a> RangeIter<'a> {
    /// Wrap a cursor
    pub fn new(cursor: impl Cursor<'a> + 'a) -> Self {
        Self {
            cursor: Box::new(cursor),
        }
    }

    /// An iterator over nothing
    pub fn empty() -> Self {
        Self::new(EmptyCursor)
    }

    /// The current element, empty past the end
    pub fn get(&self) -> Any<'a> {
        self.cursor.get()
    }

    /// Index of the current element
    pub fn position(&self) -> usize {
        self.cursor.position()
    }

    /// Pre-increment
    pub fn inc(&mut self) -> &mut Self {
        self.cursor.increment();
        self
    }

    /// Post-increment: step forward, returning the previous position
    pub fn post_inc(&mut self) -> Self {
        let previous = self.clone();
        self.cursor.increment();
        previous
    }

    /// Pre-decrement
    pub fn dec(&mut self) -> Result<&mut Self, FacetError> {
        self.cursor.decrement()?;
        Ok(self)
    }

    /// Post-decrement: step back, returning the previous position
    pub fn post_dec(&mut self) -> Result<Self, FacetError> {
        let previous = self.clone();
        self.cursor.decrement()?;
        Ok(previous)
    }

    /// Move forward by `n`, or back for negative `n`
    pub fn advance(&mut self, n: isize) -> Result<&mut Self, FacetError> {
        self.cursor.advance(n)?;
        Ok(self)
    }

    /// Move back by `n`
    pub fn retreat(&mut self, n: isize) -> Result<&mut Self, FacetError> {
        self.cursor.advance(-n)?;
        Ok(self)
    }

    /// `self - other`
    pub fn distance(&self, other: &RangeIter<'a>) -> Result<isize, FacetError> {
        self.cursor.distance(other.cursor.as_ref())
    }
}

impl Clone for RangeIter<'_> {
    fn clone(&self) -> Self {
        Self {
            cursor: self.cursor.boxed_clone(),
        }
    }
}

impl PartialEq for RangeIter<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.position() == other.position()
    }
}

impl fmt::Debug for RangeIter<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RangeIter")
            .field("position", &self.position())
            .finish()
    }
}

struct EmptyCursor;

impl<'a> Cursor<'a> for EmptyCursor {
    fn position(&self) -> usize {
        0
    }

    fn get(&self) -> Any<'a> {
        Any::empty()
    }

    fn increment(&mut self) {}

    fn boxed_clone(&self) -> Box<dyn Cursor<'a> + 'a> {
        Box::new(EmptyCursor)
    }

    fn decrement(&mut self) -> Result<(), FacetError> {
        Ok(())
    }

    fn advance(&mut self, _n: isize) -> Result<(), FacetError> {
        Ok(())
    }

    fn distance(&self, other: &dyn Cursor<'a>) -> Result<isize, FacetError> {
        Ok(-(other.position() as isize))
    }
}

/// Random-access cursor over storage split into at most two slices
struct SliceCursor<'a, T> {
    db: Arc<Database>,
    head: &'a [T],
    tail: &'a [T],
    pos: usize,
}

impl<T> SliceCursor<'_, T> {
    fn len(&self) -> usize {
        self.head.len() + self.tail.len()
    }
}

impl<'a, T: Reflect> Cursor<'a> for SliceCursor<'a, T> {
    fn position(&self) -> usize {
        self.pos
    }

    fn get(&self) -> Any<'a> {
        let element = if self.pos < self.head.len() {
            self.head.get(self.pos)
        } else {
            self.tail.get(self.pos - self.head.len())
        };
        element.map_or_else(Any::empty, |e| Any::from_ref_in(&self.db, e))
    }

    fn increment(&mut self) {
        self.pos = (self.pos + 1).min(self.len());
    }

    fn boxed_clone(&self) -> Box<dyn Cursor<'a> + 'a> {
        Box::new(SliceCursor {
            db: self.db.clone(),
            head: self.head,
            tail: self.tail,
            pos: self.pos,
        })
    }

    fn decrement(&mut self) -> Result<(), FacetError> {
        self.pos = self.pos.saturating_sub(1);
        Ok(())
    }

    fn advance(&mut self, n: isize) -> Result<(), FacetError> {
        let target = self.pos as isize + n;
        self.pos = target.clamp(0, self.len() as isize) as usize;
        Ok(())
    }

    fn distance(&self, other: &dyn Cursor<'a>) -> Result<isize, FacetError> {
        Ok(self.pos as isize - other.position() as isize)
    }
}

/// Forward-only cursor over an ordered set
struct SetCursor<'a, T> {
    db: Arc<Database>,
    iter: btree_set::Iter<'a, T>,
    current: Option<&'a T>,
    pos: usize,
}

impl<'a, T: Reflect> Cursor<'a> for SetCursor<'a, T> {
    fn position(&self) -> usize {
        self.pos
    }

    fn get(&self) -> Any<'a> {
        self.current
            .map_or_else(Any::empty, |e| Any::from_ref_in(&self.db, e))
    }

    fn increment(&mut self) {
        if self.current.is_some() {
            self.current = self.iter.next();
            self.pos += 1;
        }
    }

    fn boxed_clone(&self) -> Box<dyn Cursor<'a> + 'a> {
        Box::new(SetCursor {
            db: self.db.clone(),
            iter: self.iter.clone(),
            current: self.current,
            pos: self.pos,
        })
    }
}

/// Vtable of the range-like facet
pub struct RangeVTable {
    /// Type of the elements
    pub value_type: Option<fn(&Any<'_>) -> TypeHandle>,
    /// Number of elements
    pub size: Option<fn(&Any<'_>) -> usize>,
    /// Iterator at the first element
    pub begin: Option<fn(Any<'_>) -> RangeIter<'_>>,
    /// Iterator past the last element
    pub end: Option<fn(Any<'_>) -> RangeIter<'_>>,
}

/// Read-only iteration over the elements of a container
pub struct RangeLike<'a>(FacetRef<'a, RangeVTable>);

impl<'a> Facet<'a> for RangeLike<'a> {
    type VTable = RangeVTable;

    fn from_parts(object: Any<'a>, vtable: Option<Arc<RangeVTable>>, owner: TypeHandle) -> Self {
        Self(FacetRef::new(object, vtable, owner))
    }
}

impl RangeLike<'_> {
    /// Check if the facet is bound
    pub fn is_bound(&self) -> bool {
        self.0.is_bound()
    }

    /// Type of the elements
    pub fn value_type(&self) -> Result<TypeHandle, FacetError> {
        let f = self.0.slot("RangeLike::value_type", |v| v.value_type)?;
        Ok(f(&self.0.view()))
    }

    /// Number of elements
    pub fn len(&self) -> Result<usize, FacetError> {
        let f = self.0.slot("RangeLike::size", |v| v.size)?;
        Ok(f(&self.0.view()))
    }

    /// Check for no elements
    pub fn is_empty(&self) -> Result<bool, FacetError> {
        Ok(self.len()? == 0)
    }

    /// Iterator at the first element
    pub fn begin(&self) -> Result<RangeIter<'_>, FacetError> {
        let f = self.0.slot("RangeLike::begin", |v| v.begin)?;
        Ok(f(self.0.view()))
    }

    /// Iterator past the last element
    pub fn end(&self) -> Result<RangeIter<'_>, FacetError> {
        let f = self.0.slot("RangeLike::end", |v| v.end)?;
        Ok(f(self.0.view()))
    }

    /// Element `index`, empty when out of range
    pub fn at(&self, index: usize) -> Result<Any<'_>, FacetError> {
        let mut it = self.begin()?;
        it.advance(index as isize)?;
        Ok(it.get())
    }

    /// A Rust iterator over the elements
    pub fn iter(&self) -> Result<RangeValues<'_>, FacetError> {
        Ok(RangeValues {
            current: self.begin()?,
            end: self.end()?,
        })
    }
}

/// Iterator adapter produced by [`RangeLike::iter`]
pub struct RangeValues<'a> {
    current: RangeIter<'a>,
    end: RangeIter<'a>,
}

impl<'a> Iterator for RangeValues<'a> {
    type Item = Any<'a>;

    fn next(&mut self) -> Option<Any<'a>> {
        if self.current == self.end {
            return None;
        }
        Some(self.current.post_inc().get())
    }
}

/// Containers whose elements live in at most two contiguous runs
trait Slices<T> {
    fn slices(&self) -> (&[T], &[T]);
}

impl<T> Slices<T> for Vec<T> {
    fn slices(&self) -> (&[T], &[T]) {
        (self.as_slice(), &[])
    }
}

impl<T> Slices<T> for VecDeque<T> {
    fn slices(&self) -> (&[T], &[T]) {
        self.as_slices()
    }
}

impl<T, const N: usize> Slices<T> for [T; N] {
    fn slices(&self) -> (&[T], &[T]) {
        (self.as_slice(), &[])
    }
}

fn element_type<T: Reflect>(any: &Any<'_>) -> TypeHandle {
    match any.type_handle().database() {
        Some(db) => db.type_of::<T>(),
        None => TypeHandle::invalid(),
    }
}

fn sequence_size<R: Reflect + Slices<T>, T>(any: &Any<'_>) -> usize {
    any.as_type::<R>().map_or(0, |r| {
        let (head, tail) = r.slices();
        head.len() + tail.len()
    })
}

fn sequence_cursor<R: Reflect + Slices<T>, T: Reflect>(view: Any<'_>, at_end: bool) -> RangeIter<'_> {
    let Some(db) = view.type_handle().database().cloned() else {
        return RangeIter::empty();
    };
    let Some(range) = view.into_ref::<R>() else {
        return RangeIter::empty();
    };
    let (head, tail) = range.slices();
    let pos = if at_end { head.len() + tail.len() } else { 0 };
    RangeIter::new(SliceCursor { db, head, tail, pos })
}

fn sequence_begin<R: Reflect + Slices<T>, T: Reflect>(view: Any<'_>) -> RangeIter<'_> {
    sequence_cursor::<R, T>(view, false)
}

fn sequence_end<R: Reflect + Slices<T>, T: Reflect>(view: Any<'_>) -> RangeIter<'_> {
    sequence_cursor::<R, T>(view, true)
}

fn sequence_vtable<R: Reflect + Slices<T>, T: Reflect>() -> RangeVTable {
    RangeVTable {
        value_type: Some(element_type::<T>),
        size: Some(sequence_size::<R, T>),
        begin: Some(sequence_begin::<R, T>),
        end: Some(sequence_end::<R, T>),
    }
}

impl<T: Reflect + Clone> ImplFacet<RangeVTable> for Vec<T> {
    fn vtable() -> RangeVTable {
        sequence_vtable::<Vec<T>, T>()
    }
}

impl<T: Reflect + Clone> ImplFacet<RangeVTable> for VecDeque<T> {
    fn vtable() -> RangeVTable {
        sequence_vtable::<VecDeque<T>, T>()
    }
}

impl<T: Reflect + Clone, const N: usize> ImplFacet<RangeVTable> for [T; N] {
    fn vtable() -> RangeVTable {
        sequence_vtable::<[T; N], T>()
    }
}

fn set_size<T: Reflect + Clone + Ord>(any: &Any<'_>) -> usize {
    any.as_type::<BTreeSet<T>>().map_or(0, BTreeSet::len)
}

fn set_cursor<T: Reflect + Clone + Ord>(view: Any<'_>, at_end: bool) -> RangeIter<'_> {
    let Some(db) = view.type_handle().database().cloned() else {
        return RangeIter::empty();
    };
    let Some(set) = view.into_ref::<BTreeSet<T>>() else {
        return RangeIter::empty();
    };
    let mut iter = set.iter();
    let (current, pos) = if at_end {
        (None, set.len())
    } else {
        (iter.next(), 0)
    };
    RangeIter::new(SetCursor {
        db,
        iter,
        current,
        pos,
    })
}

fn set_begin<T: Reflect + Clone + Ord>(view: Any<'_>) -> RangeIter<'_> {
    set_cursor::<T>(view, false)
}

fn set_end<T: Reflect + Clone + Ord>(view: Any<'_>) -> RangeIter<'_> {
    set_cursor::<T>(view, true)
}

impl<T: Reflect + Clone + Ord> ImplFacet<RangeVTable> for BTreeSet<T> {
    fn vtable() -> RangeVTable {
        RangeVTable {
            value_type: Some(element_type::<T>),
            size: Some(set_size::<T>),
            begin: Some(set_begin::<T>),
            end: Some(set_end::<T>),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect_i32(range: &RangeLike<'_>) -> Vec<i32> {
        range
            .iter()
            .unwrap()
            .map(|e| *e.get::<i32>().unwrap())
            .collect()
    }

    #[test]
    fn test_vec_random_access() {
        let db = Database::new();
        let values = Any::new_in(&db, vec![10i32, 20, 30]);
        let range = values.facet::<RangeLike<'_>>();

        assert_eq!(range.len().unwrap(), 3);
        assert_eq!(range.value_type().unwrap(), db.type_of::<i32>());
        assert_eq!(collect_i32(&range), vec![10, 20, 30]);
        assert_eq!(range.at(1).unwrap().get::<i32>(), Some(&20));
        assert!(range.at(3).unwrap().is_empty());

        let begin = range.begin().unwrap();
        let mut end = range.end().unwrap();
        assert_eq!(end.distance(&begin).unwrap(), 3);
        end.dec().unwrap();
        assert_eq!(end.get().get::<i32>(), Some(&30));
        end.retreat(2).unwrap();
        assert_eq!(end, begin);
    }

    #[test]
    fn test_post_increment() {
        let db = Database::new();
        let values = Any::new_in(&db, vec![1i32, 2]);
        let range = values.facet::<RangeLike<'_>>();
        let mut it = range.begin().unwrap();
        let previous = it.post_inc();
        assert_eq!(previous.get().get::<i32>(), Some(&1));
        assert_eq!(it.get().get::<i32>(), Some(&2));
    }

    #[test]
    fn test_deque_wraps() {
        let db = Database::new();
        let mut deque = VecDeque::with_capacity(4);
        deque.push_back(2i32);
        deque.push_back(3);
        deque.push_front(1);
        let values = Any::new_in(&db, deque);
        let range = values.facet::<RangeLike<'_>>();
        assert_eq!(collect_i32(&range), vec![1, 2, 3]);
    }

    #[test]
    fn test_set_is_forward_only() {
        let db = Database::new();
        let set: BTreeSet<i32> = [3, 1, 2].into_iter().collect();
        let values = Any::new_in(&db, set);
        let range = values.facet::<RangeLike<'_>>();
        assert_eq!(collect_i32(&range), vec![1, 2, 3]);

        let mut it = range.begin().unwrap();
        assert_eq!(it.dec().unwrap_err().function, "RangeIter::decrement");
        assert!(it.distance(&range.end().unwrap()).is_err());
        it.advance(2).unwrap();
        assert_eq!(it.get().get::<i32>(), Some(&3));
    }

    #[test]
    fn test_empty_range() {
        let db = Database::new();
        let values = Any::new_in(&db, Vec::<i32>::new());
        let range = values.facet::<RangeLike<'_>>();
        assert!(range.is_empty().unwrap());
        assert_eq!(range.begin().unwrap(), range.end().unwrap());
        assert_eq!(range.iter().unwrap().count(), 0);
    }
}
