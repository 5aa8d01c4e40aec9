use std::sync::Arc;

use super::{
    ArrayConverter, Converter, ConverterRegistry, DictionaryConverter, EnumConverter,
    KeyValuePairConverter, ListConverter, NullableConverter, ObjectConverter, PairCodec,
    PointerConverter,
};
use crate::error::{ConfigError, Result};
use crate::reflect::{ArraySegment, ConverterSelector, RecursionKind, Type, TypeShape};
use crate::resolver::MemberDescriptor;

/// Recursion strategies for the parts of a value that have no direct converter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RecursionPlan {
    /// Engine for a bare nested object.
    pub nested: Option<RecursionKind>,
    /// Engine for list elements.
    pub elements: Option<RecursionKind>,
    /// Engine for dictionary and pair keys.
    pub keys: Option<RecursionKind>,
    /// Engine for dictionary and pair values.
    pub values: Option<RecursionKind>,
}

impl RecursionPlan {
    /// The same engine for every part.
    pub fn uniform(kind: RecursionKind) -> Self {
        Self {
            nested: Some(kind),
            elements: Some(kind),
            keys: Some(kind),
            values: Some(kind),
        }
    }
}

/// What to resolve a converter for.
#[derive(Debug, Clone, Copy)]
pub struct Request<'a> {
    /// Explicit choice, honored only at the outermost level.
    pub selection: Option<ConverterSelector>,
    /// Array segment; implies the `"array"` converter.
    pub segment: Option<ArraySegment>,
    /// Engine for this level if it turns out to be an object.
    pub object: Option<RecursionKind>,
    /// Engines for nested parts.
    pub plan: RecursionPlan,
    /// Label used in error messages.
    pub label: &'a str,
}

impl<'a> Request<'a> {
    /// A request carrying a member's annotations.
    pub fn for_member(member: &MemberDescriptor, label: &'a str) -> Self {
        let attributes = member.attributes();
        Self {
            selection: attributes.converter,
            segment: attributes.segment,
            object: None,
            plan: RecursionPlan {
                nested: attributes.nested,
                elements: attributes.elements,
                keys: attributes.keys,
                values: attributes.values,
            },
            label,
        }
    }

    /// A request for a root value, which has no annotations.
    pub fn root(kind: RecursionKind, label: &'a str) -> Self {
        Self {
            selection: None,
            segment: None,
            object: Some(kind),
            plan: RecursionPlan::uniform(kind),
            label,
        }
    }

    /// The same request, resolving a bare object with `kind`.
    #[must_use]
    pub fn with_object(mut self, kind: RecursionKind) -> Self {
        self.object = Some(kind);
        self
    }

    fn nested(&self, object: Option<RecursionKind>) -> Self {
        Self {
            selection: None,
            segment: None,
            object,
            plan: self.plan,
            label: self.label,
        }
    }
}

/// Picks the converter for a type.
///
/// Resolution order: an explicit selection; then a registered converter whose
/// target is the type; then a converter built from the type's shape (nullable,
/// box, list, map, pair, enum, and objects when a recursion engine is given).
/// `Ok(None)` means nothing applies and the caller may cascade into the type.
#[derive(Debug, Clone)]
pub struct ConverterResolver {
    registry: ConverterRegistry,
}

impl ConverterResolver {
    /// A resolver over `registry`.
    pub fn new(registry: ConverterRegistry) -> Self {
        Self { registry }
    }

    /// Resolves the converter for a member's declared type.
    pub fn resolve_member(
        &self,
        member: &MemberDescriptor,
        object: Option<RecursionKind>,
    ) -> Result<Option<Arc<dyn Converter>>> {
        let label = member.qualified_name();
        let mut request = Request::for_member(member, &label);
        request.object = object;
        self.resolve(&member.ty(), &request)
    }

    /// Resolves the converter for `ty`.
    pub fn resolve(&self, ty: &Type, request: &Request<'_>) -> Result<Option<Arc<dyn Converter>>> {
        if let Some(selection) = request.selection {
            if let Some(make) = selection.instance {
                return Ok(Some(make()));
            }
            if let Some(name) = selection.name {
                return self.by_name(ty, name).map(Some);
            }
        }
        if request.segment.is_some() {
            return self.by_name(ty, ArrayConverter::NAME).map(Some);
        }
        if let Some(found) = self.by_target(ty)? {
            return Ok(Some(found));
        }
        self.by_shape(ty, request)
    }

    fn by_name(&self, ty: &Type, name: &str) -> Result<Arc<dyn Converter>> {
        self.registry
            .iter()
            .find(|c| c.name() == Some(name) && c.can_convert(ty))
            .cloned()
            .ok_or_else(|| {
                ConfigError::UnknownConverter {
                    name: name.to_owned(),
                    ty: ty.name(),
                }
                .into()
            })
    }

    fn by_target(&self, ty: &Type) -> Result<Option<Arc<dyn Converter>>> {
        let candidates = self.registry.candidates(ty);
        match candidates.as_slice() {
            [] => Ok(None),
            [only] => Ok(Some(Arc::clone(only))),
            several => match several.iter().find(|c| c.name().is_none()) {
                Some(unnamed) => Ok(Some(Arc::clone(unnamed))),
                None => Err(ConfigError::AmbiguousConverter {
                    ty: ty.name(),
                    candidates: several
                        .iter()
                        .filter_map(|c| c.name().map(str::to_owned))
                        .collect(),
                }
                .into()),
            },
        }
    }

    fn by_shape(&self, ty: &Type, request: &Request<'_>) -> Result<Option<Arc<dyn Converter>>> {
        let converter: Arc<dyn Converter> = match ty.shape() {
            TypeShape::Primitive => return Ok(None),
            TypeShape::Nullable(shape) => {
                let Some(inner) = self.resolve(&shape.inner, &request.nested(request.object))?
                else {
                    return Ok(None);
                };
                Arc::new(NullableConverter::new(*ty, shape, inner))
            }
            TypeShape::Pointer(shape) => {
                let Some(inner) = self.resolve(&shape.inner, &request.nested(request.object))?
                else {
                    return Ok(None);
                };
                Arc::new(PointerConverter::new(*ty, shape, inner))
            }
            TypeShape::List(shape) => {
                let element =
                    self.resolve(&shape.element, &request.nested(request.plan.elements))?;
                Arc::new(ListConverter::new(*ty, shape, element, request.label)?)
            }
            TypeShape::Map(shape) => {
                let entries = self.pair_codec(shape.key, shape.value, request)?;
                Arc::new(DictionaryConverter::new(*ty, shape, entries))
            }
            TypeShape::Pair(shape) => {
                let codec = self.pair_codec(shape.key, shape.value, request)?;
                Arc::new(KeyValuePairConverter::new(*ty, shape, codec))
            }
            TypeShape::Enum(shape) => Arc::new(EnumConverter::new(*ty, shape)),
            TypeShape::Object(shape) => match request.object {
                Some(kind) => Arc::new(ObjectConverter::new(*ty, kind, shape.hooks())),
                None => return Ok(None),
            },
        };
        Ok(Some(converter))
    }

    fn pair_codec(&self, key: Type, value: Type, request: &Request<'_>) -> Result<PairCodec> {
        let key_converter = self.resolve(&key, &request.nested(request.plan.keys))?;
        let value_converter = self.resolve(&value, &request.nested(request.plan.values))?;
        PairCodec::new(key, value, key_converter, value_converter, request.label)
    }
}
