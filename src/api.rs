//! Public entry points.
//!
//! [`Serializer`] owns one configuration and every cache built under it. It is
//! `Send + Sync`; share it (or clone an `Arc` of it) across threads. [`Mapcode`]
//! is a set of static shortcuts over a process-wide default serializer.

use std::any::Any;
use std::fs::File;
use std::io::{BufWriter, Read, Write};
use std::path::Path;
use std::sync::{Arc, OnceLock};

use memmap2::Mmap;
use rayon::prelude::*;

use crate::converter::{Converter, MemberContext};
use crate::error::{MapcodeError, Result};
use crate::io::{BinaryReader, BinaryWriter};
use crate::mapping::{Mapper, MappingList, RootPlan};
use crate::options::{CyclePolicy, SerializerOptions, StringEncoding};
use crate::reflect::{BoxedValue, MemberInfo, MemberKind, RecursionKind, Reflect, Type};
use crate::resolver::MemberDescriptor;
use crate::version::{self, Version};

/// Encodes and decodes object graphs under one configuration.
///
/// Statically typed calls (`serialize`, `deserialize`, ...) replay the root
/// type's list with the compiled engine; the `*_dyn` calls take a runtime
/// [`Type`] and use the dynamic engine. The engine choice covers the root and
/// unannotated collections of a root value. Object members reached through
/// `Option` or `Box` use the dynamic engine unless annotated with
/// `nested = "compiled"`, because mapping lists are shared by both entry
/// points. Both engines produce identical bytes for the same value.
#[derive(Debug)]
pub struct Serializer {
    mapper: Mapper,
}

impl Default for Serializer {
    fn default() -> Self {
        Self::new(SerializerOptions::default())
    }
}

impl Serializer {
    /// A serializer with the given options.
    pub fn new(options: SerializerOptions) -> Self {
        Self {
            mapper: Mapper::new(options),
        }
    }

    /// Starts a [`SerializerBuilder`].
    pub fn builder() -> SerializerBuilder {
        SerializerBuilder::default()
    }

    /// The options this serializer was built with.
    pub fn options(&self) -> &SerializerOptions {
        self.mapper.options()
    }

    /// The underlying mapper.
    pub fn mapper(&self) -> &Mapper {
        &self.mapper
    }

    // --- COMPILED ENTRY POINTS ---

    /// Encodes `value` into a fresh buffer.
    pub fn serialize<T: Reflect>(&self, value: &T) -> Result<Vec<u8>> {
        let mut buffer = Vec::new();
        self.serialize_into(&mut buffer, value)?;
        Ok(buffer)
    }

    /// Encodes `value` into `writer`. The writer is neither flushed nor closed.
    pub fn serialize_into<T: Reflect, W: Write>(&self, writer: &mut W, value: &T) -> Result<()> {
        let version = self.options().version();
        let mut writer = BinaryWriter::new(writer, self.options().encoding());
        version::write_version(&mut writer, version)?;
        let ctx = MemberContext::new(&self.mapper, version);
        let ty = Type::of::<T>();
        match self.mapper.root_plan(ty, RecursionKind::Compiled)? {
            RootPlan::Object => self.mapper.compiled::<T>(version)?.write(value, &mut writer, &ctx),
            RootPlan::Converter(converter) => converter.write(&mut writer, &ty, value, &ctx),
        }
    }

    /// Encodes `value` to a file, replacing it if it exists.
    pub fn save<T: Reflect, P: AsRef<Path>>(&self, path: P, value: &T) -> Result<()> {
        let mut writer = BufWriter::new(File::create(path)?);
        self.serialize_into(&mut writer, value)?;
        writer.flush()?;
        Ok(())
    }

    /// Decodes a `T`, starting from `T::default()`.
    pub fn deserialize<T: Reflect>(&self, bytes: &[u8]) -> Result<T> {
        let mut value = T::default();
        self.deserialize_into(bytes, &mut value)?;
        Ok(value)
    }

    /// Decodes into an existing instance. Members absent from the stream keep
    /// their current values.
    pub fn deserialize_into<T: Reflect>(&self, bytes: &[u8], target: &mut T) -> Result<()> {
        let mut reader = BinaryReader::new(bytes, self.options().encoding());
        let version = self.stream_version(&mut reader);
        let ctx = MemberContext::new(&self.mapper, version);
        let ty = Type::of::<T>();
        match self.mapper.root_plan(ty, RecursionKind::Compiled)? {
            RootPlan::Object => self
                .mapper
                .compiled::<T>(version)?
                .read_into(target, &mut reader, &ctx),
            RootPlan::Converter(converter) => {
                *target = crate::rt::unbox::<T>(converter.read(&mut reader, &ty, &ctx)?)?;
                Ok(())
            }
        }
    }

    /// Reads `reader` to the end and decodes a `T` from it.
    pub fn deserialize_from<T: Reflect, R: Read>(&self, reader: &mut R) -> Result<T> {
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes)?;
        self.deserialize(&bytes)
    }

    /// Decodes a `T` from a memory-mapped file.
    pub fn load<T: Reflect, P: AsRef<Path>>(&self, path: P) -> Result<T> {
        let file = File::open(path)?;
        // Safety: the map is read-only and dropped before returning; a concurrent
        // writer to the same file can at worst corrupt the decoded value.
        #[allow(unsafe_code)]
        let mmap = unsafe { Mmap::map(&file)? };
        self.deserialize(&mmap)
    }

    // --- DYNAMIC ENTRY POINTS ---

    /// Encodes `value`, an instance of `ty`, through the dynamic engine.
    pub fn serialize_dyn(&self, value: &dyn Any, ty: Type) -> Result<Vec<u8>> {
        let mut buffer = Vec::new();
        self.serialize_dyn_into(&mut buffer, value, ty)?;
        Ok(buffer)
    }

    /// Encodes `value`, an instance of `ty`, into `writer`.
    pub fn serialize_dyn_into<W: Write>(
        &self,
        writer: &mut W,
        value: &dyn Any,
        ty: Type,
    ) -> Result<()> {
        if !ty.matches(value) {
            return Err(MapcodeError::type_mismatch(ty.name(), "a value of another type"));
        }
        let version = self.options().version();
        let mut writer = BinaryWriter::new(writer, self.options().encoding());
        version::write_version(&mut writer, version)?;
        match self.mapper.root_plan(ty, RecursionKind::Dynamic)? {
            RootPlan::Object => self.mapper.write_dynamic(ty, value, &mut writer, version),
            RootPlan::Converter(converter) => {
                let ctx = MemberContext::new(&self.mapper, version);
                converter.write(&mut writer, &ty, value, &ctx)
            }
        }
    }

    /// Decodes a value of `ty` through the dynamic engine, into `initial` if
    /// given, else into a default instance.
    pub fn deserialize_dyn(
        &self,
        bytes: &[u8],
        ty: Type,
        initial: Option<BoxedValue>,
    ) -> Result<BoxedValue> {
        let mut target = initial.unwrap_or_else(|| ty.default_value());
        if !ty.matches(&*target) {
            return Err(MapcodeError::type_mismatch(ty.name(), "a value of another type"));
        }
        let mut reader = BinaryReader::new(bytes, self.options().encoding());
        let version = self.stream_version(&mut reader);
        match self.mapper.root_plan(ty, RecursionKind::Dynamic)? {
            RootPlan::Object => {
                self.mapper
                    .read_dynamic_into(ty, &mut *target, &mut reader, version)?;
                Ok(target)
            }
            RootPlan::Converter(converter) => {
                let ctx = MemberContext::new(&self.mapper, version);
                converter.read(&mut reader, &ty, &ctx)
            }
        }
    }

    // --- BATCHES ---

    /// Encodes every item in parallel. Output order matches input order.
    pub fn serialize_batch<T: Reflect>(&self, items: &[T]) -> Result<Vec<Vec<u8>>> {
        items.par_iter().map(|item| self.serialize(item)).collect()
    }

    /// Decodes every payload in parallel. Output order matches input order.
    pub fn deserialize_batch<T, B>(&self, payloads: &[B]) -> Result<Vec<T>>
    where
        T: Reflect,
        B: AsRef<[u8]> + Sync,
    {
        payloads
            .par_iter()
            .map(|bytes| self.deserialize(bytes.as_ref()))
            .collect()
    }

    // --- INTROSPECTION ---

    /// The mapping list of `ty` under the configured version.
    pub fn mapping_list(&self, ty: Type) -> Result<Arc<MappingList>> {
        self.mapper.mapping_list(ty, self.options().version())
    }

    /// The participating members of `ty`, in order.
    pub fn members(&self, ty: Type) -> Result<Arc<[Arc<MemberDescriptor>]>> {
        self.mapper.members(ty)
    }

    /// Drops every cache. Subsequent calls rebuild on demand.
    pub fn clear_caches(&self) {
        self.mapper.clear();
    }

    fn stream_version(&self, reader: &mut BinaryReader<'_>) -> Option<Version> {
        version::read_version(reader).or(self.options().version())
    }
}

/// Builds a [`Serializer`].
///
/// ```rust
/// use mapcode::{CyclePolicy, Mapcode, StringEncoding};
///
/// let serializer = Mapcode::builder()
///     .encoding(StringEncoding::Utf16Le)
///     .version(2.0)
///     .cycle_policy(CyclePolicy::Error)
///     .build();
/// let bytes = serializer.serialize(&"hi".to_string()).unwrap();
/// assert_eq!(serializer.deserialize::<String>(&bytes).unwrap(), "hi");
/// ```
#[derive(Debug, Default)]
pub struct SerializerBuilder {
    options: SerializerOptions,
}

impl SerializerBuilder {
    /// Registers a custom converter.
    #[must_use]
    pub fn converter(mut self, converter: Arc<dyn Converter>) -> Self {
        self.options = self.options.with_converter(converter);
        self
    }

    /// Selects the string encoding.
    #[must_use]
    pub fn encoding(mut self, encoding: StringEncoding) -> Self {
        self.options = self.options.with_encoding(encoding);
        self
    }

    /// Maps only members of `kind`.
    #[must_use]
    pub fn member_kind(mut self, kind: MemberKind) -> Self {
        self.options = self.options.with_member_kind(kind);
        self
    }

    /// Adds `kind` to the selected member kinds.
    #[must_use]
    pub fn add_member_kind(mut self, kind: MemberKind) -> Self {
        self.options = self.options.add_member_kind(kind);
        self
    }

    /// Replaces the member ordering function.
    #[must_use]
    pub fn order_by<F>(mut self, order_by: F) -> Self
    where
        F: Fn(&MemberInfo, usize, usize) -> i64 + Send + Sync + 'static,
    {
        self.options = self.options.with_order_by(order_by);
        self
    }

    /// Sets the schema version.
    #[must_use]
    pub fn version(mut self, version: impl Into<Version>) -> Self {
        self.options = self.options.with_version(version);
        self
    }

    /// Sets the cycle policy.
    #[must_use]
    pub fn cycle_policy(mut self, policy: CyclePolicy) -> Self {
        self.options = self.options.with_cycle_policy(policy);
        self
    }

    /// The options collected so far.
    pub fn options(self) -> SerializerOptions {
        self.options
    }

    /// Creates the serializer.
    pub fn build(self) -> Serializer {
        Serializer::new(self.options)
    }
}

static DEFAULT_SERIALIZER: OnceLock<Serializer> = OnceLock::new();

/// Static shortcuts over a process-wide serializer with default options.
#[derive(Debug)]
pub struct Mapcode;

impl Mapcode {
    /// The process-wide default serializer.
    pub fn default_serializer() -> &'static Serializer {
        DEFAULT_SERIALIZER.get_or_init(Serializer::default)
    }

    /// Starts a [`SerializerBuilder`] for a dedicated serializer.
    pub fn builder() -> SerializerBuilder {
        SerializerBuilder::default()
    }

    /// Encodes `value` into a fresh buffer.
    pub fn serialize<T: Reflect>(value: &T) -> Result<Vec<u8>> {
        Self::default_serializer().serialize(value)
    }

    /// Decodes a `T`.
    pub fn deserialize<T: Reflect>(bytes: &[u8]) -> Result<T> {
        Self::default_serializer().deserialize(bytes)
    }

    /// Encodes `value` into `writer`.
    pub fn write<T: Reflect, W: Write>(writer: &mut W, value: &T) -> Result<()> {
        Self::default_serializer().serialize_into(writer, value)
    }

    /// Reads `reader` to the end and decodes a `T`.
    pub fn read<T: Reflect, R: Read>(reader: &mut R) -> Result<T> {
        Self::default_serializer().deserialize_from(reader)
    }

    /// Encodes `value` to a file.
    pub fn save<T: Reflect, P: AsRef<Path>>(path: P, value: &T) -> Result<()> {
        Self::default_serializer().save(path, value)
    }

    /// Decodes a `T` from a file.
    pub fn load<T: Reflect, P: AsRef<Path>>(path: P) -> Result<T> {
        Self::default_serializer().load(path)
    }
}
