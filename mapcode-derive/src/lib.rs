//! # Mapcode Derive Macros
//!
//! This crate provides the procedural macros for `mapcode`. It implements `Reflect`
//! for structs (`MapcodeObject`) and field-less enums (`MapcodeEnum`), generating the
//! member table the engine reads instead of runtime reflection.
//!
//! Compatible with `syn 2.0`.

use proc_macro::TokenStream;
use proc_macro2::Span;
use quote::quote;
use syn::meta::ParseNestedMeta;
use syn::{parse_macro_input, Attribute, Data, DeriveInput, Expr, Fields, Ident, LitStr};

/// Derives `mapcode::Reflect` for a struct with named fields.
///
/// Field attributes (`#[mapcode(...)]`):
/// - `ignore`: never map the field. Its type need not implement `Reflect`.
/// - `order = N`: explicit ordering key.
/// - `converter = "name"`: use the registered converter with that name.
/// - `with = Type`: use `Type::default()` as the converter.
/// - `segment(offset = A, len = B)`: map a fixed run of a `Vec<u8>`.
/// - `nested`, `elements`, `keys`, `values` = `"dynamic"` | `"compiled"`: the engine
///   used for nested objects.
/// - `since = X`, `until = X`, `version(value = X, compare = ">=")`: version gates.
///
/// Struct attribute: `#[mapcode(property(name = "...", ty = "...", get = "...",
/// set = "...", order = N, since = X, until = X))]` declares a computed member
/// backed by accessor methods. `set` is optional.
#[proc_macro_derive(MapcodeObject, attributes(mapcode))]
pub fn derive_mapcode_object(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match expand_object(&input) {
        Ok(tokens) => TokenStream::from(tokens),
        Err(e) => e.to_compile_error().into(),
    }
}

/// Derives `mapcode::Reflect` for an enum whose variants carry no data.
///
/// The variant name goes on the wire; `#[mapcode(rename = "...")]` overrides it.
/// The enum must implement `Default`.
#[proc_macro_derive(MapcodeEnum, attributes(mapcode))]
pub fn derive_mapcode_enum(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match expand_enum(&input) {
        Ok(tokens) => TokenStream::from(tokens),
        Err(e) => e.to_compile_error().into(),
    }
}

// --- Internal Data Structures ---

#[derive(Default)]
struct MemberAttrs {
    ignore: bool,
    order: Option<Expr>,
    converter: Option<LitStr>,
    with: Option<syn::Type>,
    segment: Option<(Expr, Expr)>,
    nested: Option<proc_macro2::TokenStream>,
    elements: Option<proc_macro2::TokenStream>,
    keys: Option<proc_macro2::TokenStream>,
    values: Option<proc_macro2::TokenStream>,
    versions: Vec<proc_macro2::TokenStream>,
}

struct FieldDef {
    ident: Ident,
    label: String,
    ty: syn::Type,
    attrs: MemberAttrs,
}

struct PropertyDef {
    label: LitStr,
    ty: syn::Type,
    get: Ident,
    set: Option<Ident>,
    attrs: MemberAttrs,
}

fn no_generics(input: &DeriveInput, derive: &str) -> syn::Result<()> {
    if input.generics.params.is_empty() {
        Ok(())
    } else {
        Err(syn::Error::new_spanned(
            &input.generics,
            format!("{derive} does not support generic types"),
        ))
    }
}

// --- Attribute Parsing ---

fn parse_recursion(meta: &ParseNestedMeta<'_>) -> syn::Result<proc_macro2::TokenStream> {
    let s: LitStr = meta.value()?.parse()?;
    match s.value().to_lowercase().as_str() {
        "dynamic" => Ok(quote! { mapcode::reflect::RecursionKind::Dynamic }),
        "compiled" => Ok(quote! { mapcode::reflect::RecursionKind::Compiled }),
        _ => Err(meta.error("Unknown recursion kind. Supported: \"dynamic\", \"compiled\"")),
    }
}

fn version_gate(value: &Expr, comparison: &str) -> proc_macro2::TokenStream {
    let variant = Ident::new(comparison, Span::call_site());
    quote! {
        mapcode::Version::new((#value) as f64, mapcode::Comparison::#variant)
    }
}

/// Handles the keys shared by fields and properties. Returns `false` for an
/// unknown key.
fn parse_member_key(meta: &ParseNestedMeta<'_>, attrs: &mut MemberAttrs) -> syn::Result<bool> {
    if meta.path.is_ident("ignore") {
        attrs.ignore = true;
    } else if meta.path.is_ident("order") {
        attrs.order = Some(meta.value()?.parse()?);
    } else if meta.path.is_ident("converter") {
        attrs.converter = Some(meta.value()?.parse()?);
    } else if meta.path.is_ident("with") {
        attrs.with = Some(meta.value()?.parse()?);
    } else if meta.path.is_ident("segment") {
        let mut offset = None;
        let mut len = None;
        meta.parse_nested_meta(|inner| {
            if inner.path.is_ident("offset") {
                offset = Some(inner.value()?.parse::<Expr>()?);
                return Ok(());
            }
            if inner.path.is_ident("len") {
                len = Some(inner.value()?.parse::<Expr>()?);
                return Ok(());
            }
            Err(inner.error("Unknown segment key. Supported: offset, len"))
        })?;
        match (offset, len) {
            (Some(offset), Some(len)) => attrs.segment = Some((offset, len)),
            _ => return Err(meta.error("segment requires both offset and len")),
        }
    } else if meta.path.is_ident("nested") {
        attrs.nested = Some(parse_recursion(meta)?);
    } else if meta.path.is_ident("elements") {
        attrs.elements = Some(parse_recursion(meta)?);
    } else if meta.path.is_ident("keys") {
        attrs.keys = Some(parse_recursion(meta)?);
    } else if meta.path.is_ident("values") {
        attrs.values = Some(parse_recursion(meta)?);
    } else if meta.path.is_ident("since") {
        let value: Expr = meta.value()?.parse()?;
        attrs.versions.push(version_gate(&value, "GreaterThanOrEqual"));
    } else if meta.path.is_ident("until") {
        let value: Expr = meta.value()?.parse()?;
        attrs.versions.push(version_gate(&value, "LessThanOrEqual"));
    } else if meta.path.is_ident("version") {
        let mut value = None;
        let mut comparison = "Equal";
        meta.parse_nested_meta(|inner| {
            if inner.path.is_ident("value") {
                value = Some(inner.value()?.parse::<Expr>()?);
                return Ok(());
            }
            if inner.path.is_ident("compare") {
                let s: LitStr = inner.value()?.parse()?;
                comparison = match s.value().as_str() {
                    "==" | "=" => "Equal",
                    ">" => "GreaterThan",
                    ">=" => "GreaterThanOrEqual",
                    "<" => "LessThan",
                    "<=" => "LessThanOrEqual",
                    _ => return Err(inner.error("Unknown comparison. Supported: ==, >, >=, <, <=")),
                };
                return Ok(());
            }
            Err(inner.error("Unknown version key. Supported: value, compare"))
        })?;
        let value = value.ok_or_else(|| meta.error("version requires a value"))?;
        attrs.versions.push(version_gate(&value, comparison));
    } else {
        return Ok(false);
    }
    Ok(true)
}

fn parse_field_attributes(attrs: &[Attribute]) -> syn::Result<MemberAttrs> {
    let mut parsed = MemberAttrs::default();
    for attr in attrs {
        if attr.path().is_ident("mapcode") {
            attr.parse_nested_meta(|meta| {
                if parse_member_key(&meta, &mut parsed)? {
                    return Ok(());
                }
                Err(meta.error(
                    "Unknown mapcode attribute key. Supported: ignore, order, converter, with, \
                     segment, nested, elements, keys, values, since, until, version",
                ))
            })?;
        }
    }
    Ok(parsed)
}

fn parse_properties(attrs: &[Attribute]) -> syn::Result<Vec<PropertyDef>> {
    let mut properties = Vec::new();
    for attr in attrs {
        if !attr.path().is_ident("mapcode") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if !meta.path.is_ident("property") {
                return Err(meta.error("Unknown mapcode struct attribute. Supported: property"));
            }
            let mut label = None;
            let mut ty = None;
            let mut get = None;
            let mut set = None;
            let mut member = MemberAttrs::default();
            meta.parse_nested_meta(|inner| {
                if inner.path.is_ident("name") {
                    label = Some(inner.value()?.parse::<LitStr>()?);
                } else if inner.path.is_ident("ty") {
                    let s: LitStr = inner.value()?.parse()?;
                    ty = Some(s.parse::<syn::Type>()?);
                } else if inner.path.is_ident("get") {
                    let s: LitStr = inner.value()?.parse()?;
                    get = Some(s.parse::<Ident>()?);
                } else if inner.path.is_ident("set") {
                    let s: LitStr = inner.value()?.parse()?;
                    set = Some(s.parse::<Ident>()?);
                } else if !parse_member_key(&inner, &mut member)? {
                    return Err(inner.error("Unknown property key"));
                }
                Ok(())
            })?;
            let label = label.ok_or_else(|| meta.error("property requires a name"))?;
            let ty = ty.ok_or_else(|| meta.error("property requires a ty"))?;
            let get = get.ok_or_else(|| meta.error("property requires a get method"))?;
            properties.push(PropertyDef {
                label,
                ty,
                get,
                set,
                attrs: member,
            });
            Ok(())
        })?;
    }
    Ok(properties)
}

// --- Generator: MemberAttributes ---

fn option_tokens(value: Option<&proc_macro2::TokenStream>) -> proc_macro2::TokenStream {
    match value {
        Some(v) => quote! { ::core::option::Option::Some(#v) },
        None => quote! { ::core::option::Option::None },
    }
}

fn generate_attributes(attrs: &MemberAttrs) -> proc_macro2::TokenStream {
    let order = match &attrs.order {
        Some(expr) => quote! { ::core::option::Option::Some((#expr) as i64) },
        None => quote! { ::core::option::Option::None },
    };
    let converter = if attrs.converter.is_none() && attrs.with.is_none() {
        quote! { ::core::option::Option::None }
    } else {
        let name = match &attrs.converter {
            Some(name) => quote! { ::core::option::Option::Some(#name) },
            None => quote! { ::core::option::Option::None },
        };
        let instance = match &attrs.with {
            Some(ty) => quote! {
                ::core::option::Option::Some(mapcode::rt::converter_instance::<#ty>)
            },
            None => quote! { ::core::option::Option::None },
        };
        quote! {
            ::core::option::Option::Some(mapcode::reflect::ConverterSelector {
                name: #name,
                instance: #instance,
            })
        }
    };
    let segment = match &attrs.segment {
        Some((offset, len)) => quote! {
            ::core::option::Option::Some(mapcode::reflect::ArraySegment {
                offset: (#offset) as usize,
                len: (#len) as usize,
            })
        },
        None => quote! { ::core::option::Option::None },
    };
    let nested = option_tokens(attrs.nested.as_ref());
    let elements = option_tokens(attrs.elements.as_ref());
    let keys = option_tokens(attrs.keys.as_ref());
    let values = option_tokens(attrs.values.as_ref());
    let versions = &attrs.versions;

    quote! {
        mapcode::reflect::MemberAttributes {
            ignore: false,
            order: #order,
            converter: #converter,
            segment: #segment,
            nested: #nested,
            elements: #elements,
            keys: #keys,
            values: #values,
            versions: ::std::vec![#(#versions),*],
        }
    }
}

// --- Generator: MapcodeObject ---

fn expand_object(input: &DeriveInput) -> syn::Result<proc_macro2::TokenStream> {
    no_generics(input, "MapcodeObject")?;
    let name = &input.ident;
    let Data::Struct(data_struct) = &input.data else {
        return Err(syn::Error::new(name.span(), "MapcodeObject only supports structs"));
    };
    let Fields::Named(named) = &data_struct.fields else {
        return Err(syn::Error::new(
            name.span(),
            "MapcodeObject only supports structs with named fields",
        ));
    };

    let mut fields = Vec::new();
    for field in &named.named {
        let Some(ident) = field.ident.clone() else {
            continue;
        };
        let label = ident.to_string().trim_start_matches("r#").to_owned();
        fields.push(FieldDef {
            ident,
            label,
            ty: field.ty.clone(),
            attrs: parse_field_attributes(&field.attrs)?,
        });
    }
    let properties = parse_properties(&input.attrs)?;

    let field_infos = fields.iter().map(|f| generate_field_info(name, f));
    let property_infos = properties.iter().map(|p| generate_property_info(name, p));
    let field_typed = fields.iter().map(|f| generate_field_typed(name, f));
    let property_typed = properties.iter().map(|p| generate_property_typed(name, p));

    Ok(quote! {
        impl mapcode::Reflect for #name {
            fn shape() -> mapcode::reflect::TypeShape {
                mapcode::reflect::TypeShape::Object(
                    mapcode::reflect::ObjectShape::new::<Self>(::std::vec![
                        #(#field_infos,)*
                        #(#property_infos,)*
                    ])
                )
            }

            fn typed_members() -> ::std::vec::Vec<mapcode::reflect::TypedMember<Self>> {
                ::std::vec![
                    #(#field_typed,)*
                    #(#property_typed,)*
                ]
            }
        }
    })
}

fn generate_field_info(owner: &Ident, field: &FieldDef) -> proc_macro2::TokenStream {
    let label = &field.label;
    if field.attrs.ignore {
        return quote! {
            mapcode::reflect::MemberInfo::ignored(#label, mapcode::reflect::MemberKind::Field)
        };
    }
    let ident = &field.ident;
    let ty = &field.ty;
    let attributes = generate_attributes(&field.attrs);
    quote! {
        {
            fn get(
                owner: &dyn ::core::any::Any,
            ) -> ::core::option::Option<mapcode::reflect::MemberRef<'_>> {
                owner.downcast_ref::<#owner>().map(|o| {
                    mapcode::reflect::MemberRef::Borrowed(&o.#ident as &dyn ::core::any::Any)
                })
            }
            fn get_mut(
                owner: &mut dyn ::core::any::Any,
            ) -> ::core::option::Option<&mut dyn ::core::any::Any> {
                owner
                    .downcast_mut::<#owner>()
                    .map(|o| &mut o.#ident as &mut dyn ::core::any::Any)
            }
            fn set(
                owner: &mut dyn ::core::any::Any,
                value: mapcode::reflect::BoxedValue,
            ) -> mapcode::Result<()> {
                let owner = mapcode::rt::owner_mut::<#owner>(owner)?;
                owner.#ident = mapcode::rt::unbox::<#ty>(value)?;
                ::core::result::Result::Ok(())
            }
            mapcode::reflect::MemberInfo::field::<#ty>(#label)
                .with_access(mapcode::reflect::MemberAccess::field(get, get_mut, set))
                .with_attributes(#attributes)
        }
    }
}

fn generate_field_typed(owner: &Ident, field: &FieldDef) -> proc_macro2::TokenStream {
    let label = &field.label;
    if field.attrs.ignore {
        return quote! { mapcode::reflect::TypedMember::<#owner>::bare(#label) };
    }
    let ident = &field.ident;
    let ty = &field.ty;
    quote! {
        {
            fn get(owner: &#owner) -> mapcode::reflect::MemberRef<'_> {
                mapcode::reflect::MemberRef::Borrowed(&owner.#ident as &dyn ::core::any::Any)
            }
            fn get_mut(owner: &mut #owner) -> &mut dyn ::core::any::Any {
                &mut owner.#ident
            }
            fn set(owner: &mut #owner, value: mapcode::reflect::BoxedValue) -> mapcode::Result<()> {
                owner.#ident = mapcode::rt::unbox::<#ty>(value)?;
                ::core::result::Result::Ok(())
            }
            mapcode::reflect::TypedMember::<#owner>::field(#label, get, get_mut, set)
        }
    }
}

fn generate_property_info(owner: &Ident, property: &PropertyDef) -> proc_macro2::TokenStream {
    let label = &property.label;
    if property.attrs.ignore {
        return quote! {
            mapcode::reflect::MemberInfo::ignored(#label, mapcode::reflect::MemberKind::Property)
        };
    }
    let ty = &property.ty;
    let getter = &property.get;
    let attributes = generate_attributes(&property.attrs);
    let setter = property.set.as_ref().map(|setter| {
        quote! {
            fn set(
                owner: &mut dyn ::core::any::Any,
                value: mapcode::reflect::BoxedValue,
            ) -> mapcode::Result<()> {
                let owner = mapcode::rt::owner_mut::<#owner>(owner)?;
                owner.#setter(mapcode::rt::unbox::<#ty>(value)?);
                ::core::result::Result::Ok(())
            }
        }
    });
    let with_setter = property.set.as_ref().map(|_| quote! { .with_setter(set) });
    quote! {
        {
            fn get(
                owner: &dyn ::core::any::Any,
            ) -> ::core::option::Option<mapcode::reflect::MemberRef<'_>> {
                owner.downcast_ref::<#owner>().map(|o| {
                    let value: #ty = o.#getter();
                    mapcode::reflect::MemberRef::Owned(
                        ::std::boxed::Box::new(value) as mapcode::reflect::BoxedValue
                    )
                })
            }
            #setter
            mapcode::reflect::MemberInfo::property::<#ty>(#label)
                .with_access(mapcode::reflect::MemberAccess::property().with_getter(get)#with_setter)
                .with_attributes(#attributes)
        }
    }
}

fn generate_property_typed(owner: &Ident, property: &PropertyDef) -> proc_macro2::TokenStream {
    let label = &property.label;
    if property.attrs.ignore {
        return quote! { mapcode::reflect::TypedMember::<#owner>::bare(#label) };
    }
    let ty = &property.ty;
    let getter = &property.get;
    let setter = property.set.as_ref().map(|setter| {
        quote! {
            fn set(owner: &mut #owner, value: mapcode::reflect::BoxedValue) -> mapcode::Result<()> {
                owner.#setter(mapcode::rt::unbox::<#ty>(value)?);
                ::core::result::Result::Ok(())
            }
        }
    });
    let with_setter = property.set.as_ref().map(|_| quote! { .with_setter(set) });
    quote! {
        {
            fn get(owner: &#owner) -> mapcode::reflect::MemberRef<'_> {
                let value: #ty = owner.#getter();
                mapcode::reflect::MemberRef::Owned(
                    ::std::boxed::Box::new(value) as mapcode::reflect::BoxedValue
                )
            }
            #setter
            mapcode::reflect::TypedMember::<#owner>::bare(#label).with_getter(get)#with_setter
        }
    }
}

// --- Generator: MapcodeEnum ---

fn parse_variant_name(attrs: &[Attribute], default: String) -> syn::Result<String> {
    let mut wire_name = default;
    for attr in attrs {
        if attr.path().is_ident("mapcode") {
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("rename") {
                    let s: LitStr = meta.value()?.parse()?;
                    wire_name = s.value();
                    return Ok(());
                }
                Err(meta.error("Unknown mapcode variant attribute. Supported: rename"))
            })?;
        }
    }
    Ok(wire_name)
}

fn expand_enum(input: &DeriveInput) -> syn::Result<proc_macro2::TokenStream> {
    no_generics(input, "MapcodeEnum")?;
    let name = &input.ident;
    let Data::Enum(data_enum) = &input.data else {
        return Err(syn::Error::new(name.span(), "MapcodeEnum only supports enums"));
    };
    if data_enum.variants.is_empty() {
        return Err(syn::Error::new(name.span(), "MapcodeEnum needs at least one variant"));
    }

    let mut idents = Vec::new();
    let mut wire_names = Vec::new();
    for variant in &data_enum.variants {
        if !matches!(variant.fields, Fields::Unit) {
            return Err(syn::Error::new_spanned(
                variant,
                "MapcodeEnum only supports variants without fields",
            ));
        }
        let wire_name = parse_variant_name(&variant.attrs, variant.ident.to_string())?;
        if wire_names.contains(&wire_name) {
            return Err(syn::Error::new_spanned(
                variant,
                format!("duplicate wire name '{wire_name}'"),
            ));
        }
        idents.push(&variant.ident);
        wire_names.push(wire_name);
    }

    Ok(quote! {
        impl mapcode::Reflect for #name {
            fn shape() -> mapcode::reflect::TypeShape {
                fn name_of(value: &dyn ::core::any::Any) -> ::core::option::Option<&'static str> {
                    match value.downcast_ref::<#name>()? {
                        #(#name::#idents => ::core::option::Option::Some(#wire_names),)*
                    }
                }
                fn from_name(
                    wire_name: &str,
                ) -> ::core::option::Option<mapcode::reflect::BoxedValue> {
                    match wire_name {
                        #(#wire_names => ::core::option::Option::Some(
                            ::std::boxed::Box::new(#name::#idents) as mapcode::reflect::BoxedValue
                        ),)*
                        _ => ::core::option::Option::None,
                    }
                }
                mapcode::reflect::TypeShape::Enum(mapcode::reflect::EnumShape::new(
                    &[#(#wire_names),*],
                    name_of,
                    from_name,
                ))
            }
        }
    })
}
