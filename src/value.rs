//! Value model
//!
//! How payload bytes are interpreted, driven by the entry's type tag.
//!
//! - Fixed-width scalars (`i32`, `u32`, `i64`, `u64`, `f32`) occupy a
//!   little-endian prefix of the payload, see [`Scalar`].
//! - Arrays and strings carry a `u32` length prefix followed by the content.
//!   Bytes after the content are slack left by earlier, longer values.

use std::fmt;

use bytes::{Buf, BufMut};

use crate::error::{PStorageError, Result};
use crate::format::{get_u32, put_u32, EntryType};

/// Width of the length prefix of array and string payloads
pub const LENGTH_PREFIX_LEN: usize = 4;

// =============================================================================
// Scalars
// =============================================================================

/// A fixed-width value stored in place
pub trait Scalar: Copy {
    /// Tag written with entries holding this type
    const ENTRY_TYPE: EntryType;

    /// Encoded width in bytes
    const WIDTH: usize;

    /// Append the encoded value to `dst`
    fn encode(self, dst: &mut Vec<u8>);

    /// Decode from the first `WIDTH` bytes of `src`
    fn decode(src: &[u8]) -> Self;

    fn into_value(self) -> Value;
}

macro_rules! impl_scalar {
    ($ty:ty, $variant:ident, $put:ident, $get:ident) => {
        impl Scalar for $ty {
            const ENTRY_TYPE: EntryType = EntryType::$variant;
            const WIDTH: usize = std::mem::size_of::<$ty>();

            fn encode(self, dst: &mut Vec<u8>) {
                dst.$put(self);
            }

            fn decode(mut src: &[u8]) -> Self {
                src.$get()
            }

            fn into_value(self) -> Value {
                Value::$variant(self)
            }
        }
    };
}

impl_scalar!(i32, Int, put_i32_le, get_i32_le);
impl_scalar!(u32, UInt, put_u32_le, get_u32_le);
impl_scalar!(i64, Long, put_i64_le, get_i64_le);
impl_scalar!(u64, ULong, put_u64_le, get_u64_le);
impl_scalar!(f32, Float, put_f32_le, get_f32_le);

// =============================================================================
// Variable-Length Payloads
// =============================================================================

/// Encode `content` behind its length prefix
pub fn encode_variable(content: &[u8]) -> Result<Vec<u8>> {
    let len = u32::try_from(content.len())
        .ok()
        .filter(|len| len.checked_add(LENGTH_PREFIX_LEN as u32).is_some())
        .ok_or(PStorageError::ValueTooLarge {
            len: content.len(),
            capacity: u32::MAX - LENGTH_PREFIX_LEN as u32,
        })?;

    let mut payload = Vec::with_capacity(LENGTH_PREFIX_LEN + content.len());
    put_u32(&mut payload, len);
    payload.put_slice(content);
    Ok(payload)
}

/// Extract the content of a length-prefixed payload
pub fn decode_variable(payload: &[u8]) -> Result<&[u8]> {
    if payload.len() < LENGTH_PREFIX_LEN {
        return Err(PStorageError::Corrupted(format!(
            "payload of {} bytes has no length prefix",
            payload.len()
        )));
    }

    let mut src = payload;
    let len = get_u32(&mut src) as usize;
    if len > src.len() {
        return Err(PStorageError::Corrupted(format!(
            "length prefix {} exceeds capacity {}",
            len,
            src.len()
        )));
    }

    Ok(&src[..len])
}

// =============================================================================
// Value
// =============================================================================

/// A decoded payload of any type
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(i32),
    UInt(u32),
    Long(i64),
    ULong(u64),
    Float(f32),
    Array(Vec<u8>),
    String(String),
}

impl Value {
    pub fn entry_type(&self) -> EntryType {
        match self {
            Value::Int(_) => EntryType::Int,
            Value::UInt(_) => EntryType::UInt,
            Value::Long(_) => EntryType::Long,
            Value::ULong(_) => EntryType::ULong,
            Value::Float(_) => EntryType::Float,
            Value::Array(_) => EntryType::Array,
            Value::String(_) => EntryType::String,
        }
    }

    /// Interpret a payload according to its entry type
    pub fn decode(entry_type: EntryType, payload: &[u8]) -> Result<Value> {
        match entry_type {
            EntryType::Free => Err(PStorageError::Corrupted(
                "free entries carry no value".to_string(),
            )),
            EntryType::Int => decode_scalar::<i32>(payload),
            EntryType::UInt => decode_scalar::<u32>(payload),
            EntryType::Long => decode_scalar::<i64>(payload),
            EntryType::ULong => decode_scalar::<u64>(payload),
            EntryType::Float => decode_scalar::<f32>(payload),
            EntryType::Array => Ok(Value::Array(decode_variable(payload)?.to_vec())),
            EntryType::String => {
                let content = decode_variable(payload)?;
                String::from_utf8(content.to_vec())
                    .map(Value::String)
                    .map_err(|e| PStorageError::Corrupted(format!("string is not UTF-8: {}", e)))
            }
        }
    }

    /// Encoded payload (scalar bytes, or length prefix plus content)
    pub fn encode(&self) -> Result<Vec<u8>> {
        let mut payload = Vec::new();
        match self {
            Value::Int(v) => v.encode(&mut payload),
            Value::UInt(v) => v.encode(&mut payload),
            Value::Long(v) => v.encode(&mut payload),
            Value::ULong(v) => v.encode(&mut payload),
            Value::Float(v) => v.encode(&mut payload),
            Value::Array(bytes) => payload = encode_variable(bytes)?,
            Value::String(s) => payload = encode_variable(s.as_bytes())?,
        }
        Ok(payload)
    }

    /// Short single-line rendering for dumps
    pub fn preview(&self) -> String {
        const MAX_CHARS: usize = 24;
        const MAX_BYTES: usize = 12;

        match self {
            Value::String(s) if s.chars().count() > MAX_CHARS => {
                let head: String = s.chars().take(MAX_CHARS).collect();
                format!("{:?}..", head)
            }
            Value::String(s) => format!("{:?}", s),
            Value::Array(bytes) if bytes.len() > MAX_BYTES => {
                format!("[{}..] ({} bytes)", hex::encode(&bytes[..MAX_BYTES]), bytes.len())
            }
            Value::Array(bytes) => format!("[{}]", hex::encode(bytes)),
            other => other.to_string(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(v) => write!(f, "{}", v),
            Value::UInt(v) => write!(f, "{}", v),
            Value::Long(v) => write!(f, "{}", v),
            Value::ULong(v) => write!(f, "{}", v),
            Value::Float(v) => write!(f, "{}", v),
            Value::Array(bytes) => f.write_str(&hex::encode(bytes)),
            Value::String(s) => f.write_str(s),
        }
    }
}

macro_rules! impl_from_scalar {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Value {
                fn from(v: $ty) -> Self {
                    v.into_value()
                }
            }
        )*
    };
}

impl_from_scalar!(i32, u32, i64, u64, f32);

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<Vec<u8>> for Value {
    fn from(bytes: Vec<u8>) -> Self {
        Value::Array(bytes)
    }
}

fn decode_scalar<T: Scalar>(payload: &[u8]) -> Result<Value> {
    if payload.len() < T::WIDTH {
        return Err(PStorageError::Corrupted(format!(
            "{} payload needs {} bytes, entry holds {}",
            T::ENTRY_TYPE,
            T::WIDTH,
            payload.len()
        )));
    }
    Ok(T::decode(payload).into_value())
}
