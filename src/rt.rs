// src/rt.rs

//! Runtime utilities for generated code (Macros).
//! Do not use directly.

use std::any::{type_name, Any};
use std::sync::Arc;

use crate::converter::Converter;
use crate::error::{MapcodeError, Result};
use crate::reflect::BoxedValue;

/// Takes a decoded value back out of its box.
pub fn unbox<T: Any>(value: BoxedValue) -> Result<T> {
    value
        .downcast::<T>()
        .map(|boxed| *boxed)
        .map_err(|_| MapcodeError::type_mismatch(type_name::<T>(), "a value of another type"))
}

/// Downcasts the owner handed to a generated setter.
pub fn owner_mut<T: Any>(owner: &mut dyn Any) -> Result<&mut T> {
    owner
        .downcast_mut::<T>()
        .ok_or_else(|| MapcodeError::type_mismatch(type_name::<T>(), "a different owner type"))
}

/// Builds the converter named by `#[mapcode(with = ...)]`.
pub fn converter_instance<C: Converter + Default + 'static>() -> Arc<dyn Converter> {
    Arc::new(C::default())
}
