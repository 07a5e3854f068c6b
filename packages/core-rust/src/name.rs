//! CIM class and namespace names.
//!
//! CIM names compare case-insensitively: `CIM_IndicationFilter` and
//! `cim_indicationfilter` name the same class, and `root/PG_InterOp` and
//! `ROOT/pg_interop` the same namespace. Both types keep the spelling they
//! were created with for display, and fold case only for equality, hashing,
//! and routing-key construction.

use std::fmt;
use std::hash::{Hash, Hasher};

/// Errors from constructing a `CimName` or `CimNamespaceName`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NameError {
    #[error("invalid CIM class name: {0:?}")]
    InvalidClassName(String),
    #[error("invalid CIM namespace name: {0:?}")]
    InvalidNamespace(String),
}

/// Returns `true` if `s` is a legal CIM identifier (`[A-Za-z_][A-Za-z0-9_]*`).
fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn folded(s: &str) -> impl Iterator<Item = char> + '_ {
    s.chars().flat_map(char::to_lowercase)
}

// ---------------------------------------------------------------------------
// CimName
// ---------------------------------------------------------------------------

/// A CIM class name. Never empty, never a wildcard.
#[derive(Clone)]
pub struct CimName(String);

impl CimName {
    /// Validate and wrap a class name.
    ///
    /// # Errors
    ///
    /// Returns `NameError::InvalidClassName` if `name` is empty or is not a
    /// CIM identifier.
    pub fn new(name: impl Into<String>) -> Result<Self, NameError> {
        let name = name.into();
        if is_identifier(&name) {
            Ok(Self(name))
        } else {
            Err(NameError::InvalidClassName(name))
        }
    }

    /// The name as originally spelled.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Lower-cased form used for routing keys.
    #[must_use]
    pub fn folded(&self) -> String {
        folded(&self.0).collect()
    }
}

impl PartialEq for CimName {
    fn eq(&self, other: &Self) -> bool {
        folded(&self.0).eq(folded(&other.0))
    }
}

impl Eq for CimName {}

impl Hash for CimName {
    fn hash<H: Hasher>(&self, state: &mut H) {
        for c in folded(&self.0) {
            c.hash(state);
        }
    }
}

impl fmt::Debug for CimName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CimName({:?})", self.0)
    }
}

impl fmt::Display for CimName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<&str> for CimName {
    type Error = NameError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

// ---------------------------------------------------------------------------
// CimNamespaceName
// ---------------------------------------------------------------------------

/// A CIM namespace name such as `root/cimv2`.
///
/// A single leading `/` is accepted and stripped. Every `/`-separated
/// segment must be a CIM identifier, so empty names and empty segments are
/// rejected.
#[derive(Clone)]
pub struct CimNamespaceName(String);

impl CimNamespaceName {
    /// Validate and wrap a namespace name.
    ///
    /// # Errors
    ///
    /// Returns `NameError::InvalidNamespace` for empty names or names with an
    /// empty or non-identifier segment.
    pub fn new(name: impl Into<String>) -> Result<Self, NameError> {
        let name = name.into();
        let trimmed = name.strip_prefix('/').unwrap_or(&name);
        if !trimmed.is_empty() && trimmed.split('/').all(is_identifier) {
            Ok(Self(trimmed.to_string()))
        } else {
            Err(NameError::InvalidNamespace(name))
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Lower-cased form used for routing keys.
    #[must_use]
    pub fn folded(&self) -> String {
        folded(&self.0).collect()
    }
}

impl PartialEq for CimNamespaceName {
    fn eq(&self, other: &Self) -> bool {
        folded(&self.0).eq(folded(&other.0))
    }
}

impl Eq for CimNamespaceName {}

impl Hash for CimNamespaceName {
    fn hash<H: Hasher>(&self, state: &mut H) {
        for c in folded(&self.0) {
            c.hash(state);
        }
    }
}

impl fmt::Debug for CimNamespaceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CimNamespaceName({:?})", self.0)
    }
}

impl fmt::Display for CimNamespaceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<&str> for CimNamespaceName {
    type Error = NameError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

// ---------------------------------------------------------------------------
// NamespaceScope
// ---------------------------------------------------------------------------

/// The namespace part of a routing registration.
///
/// `Any` matches a class in every namespace. It is a distinct variant rather
/// than an empty name so that it can never be confused with a real namespace.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum NamespaceScope {
    Any,
    Specific(CimNamespaceName),
}

impl NamespaceScope {
    #[must_use]
    pub fn is_any(&self) -> bool {
        matches!(self, Self::Any)
    }

    /// Whether a request against `namespace` falls under this scope.
    #[must_use]
    pub fn matches(&self, namespace: &CimNamespaceName) -> bool {
        match self {
            Self::Any => true,
            Self::Specific(ns) => ns == namespace,
        }
    }
}

impl fmt::Display for NamespaceScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Any => f.write_str("*"),
            Self::Specific(ns) => ns.fmt(f),
        }
    }
}

impl From<CimNamespaceName> for NamespaceScope {
    fn from(ns: CimNamespaceName) -> Self {
        Self::Specific(ns)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
