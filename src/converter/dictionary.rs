use std::any::Any;
use std::sync::Arc;

use super::{Converter, MemberContext};
use crate::error::{ConfigError, MapcodeError, Result};
use crate::io::{BinaryReader, BinaryWriter};
use crate::reflect::{BoxedValue, MapShape, PairShape, Type};

/// Encodes one key/value pair with independent converters for each half.
///
/// Shared by [`KeyValuePairConverter`] and [`DictionaryConverter`]; the key may
/// use a direct converter while the value is mapped recursively, or the other
/// way round.
#[derive(Debug, Clone)]
pub struct PairCodec {
    key_ty: Type,
    value_ty: Type,
    key: Arc<dyn Converter>,
    value: Arc<dyn Converter>,
}

impl PairCodec {
    /// Bundles the two halves. Fails if either converter is missing.
    pub fn new(
        key_ty: Type,
        value_ty: Type,
        key: Option<Arc<dyn Converter>>,
        value: Option<Arc<dyn Converter>>,
        member: &str,
    ) -> Result<Self> {
        let missing = |ty: Type| ConfigError::MissingElementStrategy {
            member: member.to_owned(),
            element: ty.name(),
        };
        Ok(Self {
            key_ty,
            value_ty,
            key: key.ok_or_else(|| missing(key_ty))?,
            value: value.ok_or_else(|| missing(value_ty))?,
        })
    }

    /// Object types reached through either half.
    pub fn nested_objects(&self) -> Vec<Type> {
        let mut nested = self.key.nested_objects();
        nested.extend(self.value.nested_objects());
        nested
    }

    /// Writes the key then the value.
    pub fn write_pair(
        &self,
        writer: &mut BinaryWriter<'_>,
        key: &dyn Any,
        value: &dyn Any,
        ctx: &MemberContext<'_>,
    ) -> Result<()> {
        self.key.write(writer, &self.key_ty, key, ctx)?;
        self.value.write(writer, &self.value_ty, value, ctx)
    }

    /// Reads the key then the value.
    pub fn read_pair(
        &self,
        reader: &mut BinaryReader<'_>,
        ctx: &MemberContext<'_>,
    ) -> Result<(BoxedValue, BoxedValue)> {
        let key = self.key.read(reader, &self.key_ty, ctx)?;
        let value = self.value.read(reader, &self.value_ty, ctx)?;
        Ok((key, value))
    }
}

/// 2-tuples `(K, V)`, written as key then value with no flag of their own.
#[derive(Debug)]
pub struct KeyValuePairConverter {
    ty: Type,
    shape: PairShape,
    codec: PairCodec,
}

impl KeyValuePairConverter {
    /// Builds the converter for tuple type `ty`.
    pub fn new(ty: Type, shape: PairShape, codec: PairCodec) -> Self {
        Self { ty, shape, codec }
    }
}

impl Converter for KeyValuePairConverter {
    fn target(&self) -> Type {
        self.ty
    }

    fn nested_objects(&self) -> Vec<Type> {
        self.codec.nested_objects()
    }

    fn write_core(
        &self,
        writer: &mut BinaryWriter<'_>,
        ty: &Type,
        value: &dyn Any,
        ctx: &MemberContext<'_>,
    ) -> Result<()> {
        let (key, value) = (self.shape.split)(value)
            .ok_or_else(|| MapcodeError::type_mismatch(self.ty.name(), ty.name()))?;
        self.codec.write_pair(writer, key, value, &ctx.detached())
    }

    fn read_core(
        &self,
        reader: &mut BinaryReader<'_>,
        _ty: &Type,
        ctx: &MemberContext<'_>,
    ) -> Result<BoxedValue> {
        let (key, value) = self.codec.read_pair(reader, &ctx.detached())?;
        (self.shape.join)(key, value)
    }
}

/// Keyed collections: an `i32` entry count, then each entry as a key/value pair.
///
/// Sorted collections (`BTreeMap`) are written in key order. Entries of
/// unordered ones (`HashMap`) are encoded one by one and written in ascending
/// byte order, so equal maps always produce identical bytes.
#[derive(Debug)]
pub struct DictionaryConverter {
    ty: Type,
    shape: MapShape,
    entries: PairCodec,
}

impl DictionaryConverter {
    /// Builds the converter for map type `ty`.
    pub fn new(ty: Type, shape: MapShape, entries: PairCodec) -> Self {
        Self { ty, shape, entries }
    }
}

impl Converter for DictionaryConverter {
    fn target(&self) -> Type {
        self.ty
    }

    fn handles_null(&self) -> bool {
        true
    }

    fn nested_objects(&self) -> Vec<Type> {
        self.entries.nested_objects()
    }

    fn write_core(
        &self,
        writer: &mut BinaryWriter<'_>,
        ty: &Type,
        value: &dyn Any,
        ctx: &MemberContext<'_>,
    ) -> Result<()> {
        let entries = (self.shape.entries)(value)
            .ok_or_else(|| MapcodeError::type_mismatch(self.ty.name(), ty.name()))?;
        writer.write_len(entries.len())?;
        let entry_ctx = ctx.detached();
        if self.shape.sorted {
            for (key, value) in entries {
                self.entries.write_pair(writer, key, value, &entry_ctx)?;
            }
            return Ok(());
        }
        let encoding = writer.encoding();
        let mut encoded = entries
            .into_iter()
            .map(|(key, value)| -> Result<Vec<u8>> {
                let mut buf: Vec<u8> = Vec::new();
                let mut scratch = BinaryWriter::new(&mut buf, encoding);
                self.entries.write_pair(&mut scratch, key, value, &entry_ctx)?;
                Ok(buf)
            })
            .collect::<Result<Vec<_>>>()?;
        encoded.sort_unstable();
        for entry in &encoded {
            writer.write_raw(entry)?;
        }
        Ok(())
    }

    fn read_core(
        &self,
        reader: &mut BinaryReader<'_>,
        _ty: &Type,
        ctx: &MemberContext<'_>,
    ) -> Result<BoxedValue> {
        let count = reader.read_len(2)?;
        let entry_ctx = ctx.detached();
        let mut entries = Vec::with_capacity(count);
        for _ in 0..count {
            entries.push(self.entries.read_pair(reader, &entry_ctx)?);
        }
        (self.shape.build)(entries)
    }
}
