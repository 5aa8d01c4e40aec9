//! Serializer configuration.
//!
//! [`SerializerOptions`] is an immutable value shared by every cache of one
//! [`Serializer`](crate::Serializer). Options are built through the consuming
//! `with_*` methods (or [`SerializerBuilder`](crate::SerializerBuilder)) before
//! the serializer is created; nothing can be changed afterwards.

use std::fmt;
use std::sync::Arc;

use crate::converter::{Converter, ConverterRegistry};
use crate::error::{ConfigError, Result};
use crate::reflect::{MemberInfo, MemberKind, Type};
use crate::version::Version;

/// How strings are encoded on the wire. Both variants are length-prefixed by
/// their byte count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum StringEncoding {
    /// UTF-8 bytes.
    #[default]
    Utf8,
    /// UTF-16 code units, little-endian.
    Utf16Le,
}

/// What to do when a member refers back to a type already being mapped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CyclePolicy {
    /// Leave the member out of the mapping list and log a warning.
    #[default]
    Skip,
    /// Fail the mapping build with [`ConfigError::CyclicMember`].
    Error,
}

/// Computes the ordering key of a member: `(member, discovery_index, total)`.
pub type OrderFn = dyn Fn(&MemberInfo, usize, usize) -> i64 + Send + Sync;

/// Default ordering: the explicit `order` annotation, else declaration position
/// starting at 1.
pub fn default_order(member: &MemberInfo, index: usize, _total: usize) -> i64 {
    member
        .attributes()
        .order
        .unwrap_or_else(|| i64::try_from(index).map_or(i64::MAX, |i| i.saturating_add(1)))
}

/// Configuration shared by one serializer and all of its caches.
#[derive(Clone)]
pub struct SerializerOptions {
    registry: ConverterRegistry,
    encoding: StringEncoding,
    member_kinds: Vec<MemberKind>,
    order_by: Arc<OrderFn>,
    version: Option<Version>,
    cycle_policy: CyclePolicy,
}

impl Default for SerializerOptions {
    fn default() -> Self {
        Self {
            registry: ConverterRegistry::default(),
            encoding: StringEncoding::default(),
            member_kinds: vec![MemberKind::Field],
            order_by: Arc::new(default_order),
            version: None,
            cycle_policy: CyclePolicy::default(),
        }
    }
}

impl fmt::Debug for SerializerOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SerializerOptions")
            .field("registry", &self.registry)
            .field("encoding", &self.encoding)
            .field("member_kinds", &self.member_kinds)
            .field("version", &self.version)
            .field("cycle_policy", &self.cycle_policy)
            .finish_non_exhaustive()
    }
}

impl SerializerOptions {
    /// Default options: UTF-8, fields only, declaration order, no version.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a custom converter. Custom converters are consulted before the
    /// built-in ones, in registration order.
    #[must_use]
    pub fn with_converter(mut self, converter: Arc<dyn Converter>) -> Self {
        self.registry.register(converter);
        self
    }

    /// Selects the string encoding.
    #[must_use]
    pub fn with_encoding(mut self, encoding: StringEncoding) -> Self {
        self.encoding = encoding;
        self
    }

    /// Maps only members of `kind`.
    #[must_use]
    pub fn with_member_kind(mut self, kind: MemberKind) -> Self {
        self.member_kinds = vec![kind];
        self
    }

    /// Adds `kind` to the selected member kinds.
    ///
    /// Selecting fields and properties together is rejected when the first
    /// mapping is built.
    #[must_use]
    pub fn add_member_kind(mut self, kind: MemberKind) -> Self {
        if !self.member_kinds.contains(&kind) {
            self.member_kinds.push(kind);
        }
        self
    }

    /// Replaces the member ordering function.
    #[must_use]
    pub fn with_order_by<F>(mut self, order_by: F) -> Self
    where
        F: Fn(&MemberInfo, usize, usize) -> i64 + Send + Sync + 'static,
    {
        self.order_by = Arc::new(order_by);
        self
    }

    /// Sets the schema version written to (and assumed for) streams.
    #[must_use]
    pub fn with_version(mut self, version: impl Into<Version>) -> Self {
        self.version = Some(version.into());
        self
    }

    /// Sets the cycle policy.
    #[must_use]
    pub fn with_cycle_policy(mut self, policy: CyclePolicy) -> Self {
        self.cycle_policy = policy;
        self
    }

    /// The converter registry.
    pub fn registry(&self) -> &ConverterRegistry {
        &self.registry
    }

    /// The string encoding.
    pub fn encoding(&self) -> StringEncoding {
        self.encoding
    }

    /// The configured version.
    pub fn version(&self) -> Option<Version> {
        self.version
    }

    /// The cycle policy.
    pub fn cycle_policy(&self) -> CyclePolicy {
        self.cycle_policy
    }

    /// The selected member kinds, in selection order.
    pub fn member_kinds(&self) -> &[MemberKind] {
        &self.member_kinds
    }

    /// The single member kind to map for `ty`.
    pub(crate) fn member_kind(&self, ty: &Type) -> Result<MemberKind> {
        match self.member_kinds.as_slice() {
            [kind] => Ok(*kind),
            [] => Ok(MemberKind::Field),
            _ => Err(ConfigError::ConflictingMemberKinds { ty: ty.name() }.into()),
        }
    }

    pub(crate) fn order_of(&self, member: &MemberInfo, index: usize, total: usize) -> i64 {
        (self.order_by)(member, index, total)
    }
}
