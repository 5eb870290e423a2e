//! Exception type hierarchy
//!
//! Exception kinds form a process-wide forest of immutable `'static` nodes with
//! single-parent links. A type is identified by its address, so two statics with the
//! same name are still distinct kinds.

use std::fmt;

/// Root of the hierarchy. A clause for this type catches every instance, including
/// instances of kinds declared outside its subtree.
pub static EXCEPTION: ExceptionType = ExceptionType::root("Exception");

/// An exception kind
///
/// Declare kinds with [`define_exception!`](crate::define_exception) or
/// [`ExceptionType::new`] in a `static`.
pub struct ExceptionType {
    name: &'static str,
    parent: Option<&'static ExceptionType>,
}

impl ExceptionType {
    /// Create a kind extending `parent`
    pub const fn new(name: &'static str, parent: &'static ExceptionType) -> Self {
        Self {
            name,
            parent: Some(parent),
        }
    }

    /// Create a kind with no parent (the root of its own tree)
    pub const fn root(name: &'static str) -> Self {
        Self { name, parent: None }
    }

    /// Declared name
    #[inline]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Direct parent, if any
    #[inline]
    pub fn parent(&self) -> Option<&'static ExceptionType> {
        self.parent
    }

    /// Whether this is the catch-all root [`EXCEPTION`]
    #[inline]
    pub fn is_root(&self) -> bool {
        std::ptr::eq(self, &EXCEPTION)
    }

    /// Iterate over the parent chain, nearest first. Does not include `self`.
    pub fn ancestors(&self) -> Ancestors {
        Ancestors { next: self.parent }
    }

    /// Number of parent links between this kind and the root of its tree
    pub fn depth(&self) -> usize {
        self.ancestors().count()
    }

    /// Matching rule at the type level: true if `other` is this kind, the catch-all
    /// root, or any ancestor of this kind. O(depth).
    pub fn is_subtype_of(&self, other: &ExceptionType) -> bool {
        if std::ptr::eq(self, other) || other.is_root() {
            return true;
        }
        self.ancestors().any(|ancestor| std::ptr::eq(ancestor, other))
    }
}

impl PartialEq for ExceptionType {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self, other)
    }
}

impl Eq for ExceptionType {}

impl fmt::Debug for ExceptionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExceptionType")
            .field("name", &self.name)
            .field("parent", &self.parent.map(|p| p.name))
            .finish()
    }
}

impl fmt::Display for ExceptionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// Iterator over an [`ExceptionType`]'s parent chain
#[derive(Clone)]
pub struct Ancestors {
    next: Option<&'static ExceptionType>,
}

impl Iterator for Ancestors {
    type Item = &'static ExceptionType;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = current.parent;
        Some(current)
    }
}

/// Declare exception kinds as statics.
///
/// The kind's name is the identifier after the colon.
///
/// ```ignore
/// define_exception! {
///     pub static IO_ERROR: IOError extends EXCEPTION;
///     pub static FILE_NOT_FOUND: FileNotFoundError extends IO_ERROR;
/// }
/// ```
#[macro_export]
macro_rules! define_exception {
    ($(
        $(#[$attr:meta])*
        $vis:vis static $ident:ident : $name:ident extends $parent:path;
    )+) => {
        $(
            $(#[$attr])*
            $vis static $ident: $crate::ExceptionType =
                $crate::ExceptionType::new(stringify!($name), &$parent);
        )+
    };
}
