//! The string-like facet, generic over the character unit

use super::{Facet, FacetRef, ImplFacet};
use crate::any::Any;
use crate::error::FacetError;
use crate::handle::TypeHandle;
use std::ffi::CString;
use std::sync::Arc;

/// Vtable of the string-like facet over units of `C`
pub struct StringVTable<C: 'static> {
    /// Check for zero length
    pub empty: Option<fn(&Any<'_>) -> bool>,
    /// Length in units of `C`
    pub size: Option<fn(&Any<'_>) -> usize>,
    /// Address of the first unit
    pub data: Option<fn(&Any<'_>) -> *const C>,
    /// Address of a nul-terminated copy of the contents
    pub c_str: Option<fn(&Any<'_>) -> *const C>,
}

/// Read-only access to the characters of a string-like value
pub struct StringLike<'a, C: 'static = u8>(FacetRef<'a, StringVTable<C>>);

impl<'a, C: 'static> Facet<'a> for StringLike<'a, C> {
    type VTable = StringVTable<C>;

    fn from_parts(object: Any<'a>, vtable: Option<Arc<StringVTable<C>>>, owner: TypeHandle) -> Self {
        Self(FacetRef::new(object, vtable, owner))
    }
}

impl<C: 'static> StringLike<'_, C> {
    /// Check if the facet is bound
    pub fn is_bound(&self) -> bool {
        self.0.is_bound()
    }

    /// Check for zero length
    pub fn is_empty(&self) -> Result<bool, FacetError> {
        let f = self.0.slot("StringLike::empty", |v| v.empty)?;
        Ok(f(&self.0.view()))
    }

    /// Length in units
    pub fn len(&self) -> Result<usize, FacetError> {
        let f = self.0.slot("StringLike::size", |v| v.size)?;
        Ok(f(&self.0.view()))
    }

    /// Address of the first unit
    pub fn data(&self) -> Result<*const C, FacetError> {
        let f = self.0.slot("StringLike::data", |v| v.data)?;
        Ok(f(&self.0.view()))
    }

    /// Address of the nul-terminated contents
    pub fn c_str(&self) -> Result<*const C, FacetError> {
        let f = self.0.slot("StringLike::c_str", |v| v.c_str)?;
        Ok(f(&self.0.view()))
    }

    /// The units as a slice
    pub fn as_slice(&self) -> Result<&[C], FacetError> {
        let data = self.data()?;
        let len = self.len()?;
        if data.is_null() || len == 0 {
            return Ok(&[]);
        }
        // The units belong to the object, which outlives the borrow of self.
        Ok(unsafe { std::slice::from_raw_parts(data, len) })
    }
}

impl StringLike<'_, u8> {
    /// The contents decoded as UTF-8, replacing invalid sequences
    pub fn to_string_lossy(&self) -> Result<String, FacetError> {
        Ok(String::from_utf8_lossy(self.as_slice()?).into_owned())
    }
}

fn string_empty(any: &Any<'_>) -> bool {
    any.get::<String>().map_or(true, String::is_empty)
}

fn string_size(any: &Any<'_>) -> usize {
    any.get::<String>().map_or(0, String::len)
}

fn string_data(any: &Any<'_>) -> *const u8 {
    any.get::<String>().map_or(std::ptr::null(), |s| s.as_ptr())
}

impl ImplFacet<StringVTable<u8>> for String {
    fn vtable() -> StringVTable<u8> {
        StringVTable {
            empty: Some(string_empty),
            size: Some(string_size),
            data: Some(string_data),
            c_str: None,
        }
    }
}

fn str_empty(any: &Any<'_>) -> bool {
    any.get::<&'static str>().map_or(true, |s| s.is_empty())
}

fn str_size(any: &Any<'_>) -> usize {
    any.get::<&'static str>().map_or(0, |s| s.len())
}

fn str_data(any: &Any<'_>) -> *const u8 {
    any.get::<&'static str>().map_or(std::ptr::null(), |s| s.as_ptr())
}

impl ImplFacet<StringVTable<u8>> for &'static str {
    fn vtable() -> StringVTable<u8> {
        StringVTable {
            empty: Some(str_empty),
            size: Some(str_size),
            data: Some(str_data),
            c_str: None,
        }
    }
}

fn cstring_empty(any: &Any<'_>) -> bool {
    any.get::<CString>().map_or(true, |s| s.as_bytes().is_empty())
}

fn cstring_size(any: &Any<'_>) -> usize {
    any.get::<CString>().map_or(0, |s| s.as_bytes().len())
}

fn cstring_data(any: &Any<'_>) -> *const u8 {
    any.get::<CString>()
        .map_or(std::ptr::null(), |s| s.as_bytes().as_ptr())
}

fn cstring_c_str(any: &Any<'_>) -> *const u8 {
    any.get::<CString>()
        .map_or(std::ptr::null(), |s| s.as_ptr().cast())
}

impl ImplFacet<StringVTable<u8>> for CString {
    fn vtable() -> StringVTable<u8> {
        StringVTable {
            empty: Some(cstring_empty),
            size: Some(cstring_size),
            data: Some(cstring_data),
            c_str: Some(cstring_c_str),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::Database;
    use std::ffi::CStr;

    #[test]
    fn test_owned_string() {
        let db = Database::new();
        let text = Any::new_in(&db, String::from("héllo"));
        let facet = text.facet::<StringLike<'_>>();
        assert!(!facet.is_empty().unwrap());
        assert_eq!(facet.len().unwrap(), 6);
        assert_eq!(facet.as_slice().unwrap(), "héllo".as_bytes());
        assert_eq!(facet.to_string_lossy().unwrap(), "héllo");
        assert_eq!(facet.c_str().unwrap_err().function, "StringLike::c_str");
    }

    #[test]
    fn test_static_str() {
        let db = Database::new();
        let text = Any::new_in(&db, "");
        let facet = text.facet::<StringLike<'_>>();
        assert!(facet.is_empty().unwrap());
        assert!(facet.as_slice().unwrap().is_empty());
    }

    #[test]
    fn test_c_string() {
        let db = Database::new();
        let text = Any::new_in(&db, CString::new("abc").unwrap());
        let facet = text.facet::<StringLike<'_>>();
        assert_eq!(facet.len().unwrap(), 3);
        let terminated = unsafe { CStr::from_ptr(facet.c_str().unwrap().cast()) };
        assert_eq!(terminated.to_bytes(), b"abc");
    }

    #[test]
    fn test_wide_units_unbound() {
        let db = Database::new();
        let text = Any::new_in(&db, String::from("abc"));
        let wide = text.facet::<StringLike<'_, u16>>();
        assert!(!wide.is_bound());
        assert!(wide.len().is_err());
    }
}
