//! Deterministic cache keys for producer calls.
//!
//! A key is the SHA-256 digest of the generation name and the canonical JSON
//! form of the producer's parameters. `serde_json` objects keep their keys
//! sorted, so two calls that differ only in argument ordering hash equally.
//!
//! Author: kelexine (<https://github.com/kelexine>)

use crate::error::{CacheError, Result};
use serde::ser::{self, Error as _};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;

/// Length in bytes of every cache key.
pub const KEY_LEN: usize = 32;

/// Fixed-length identifier of a cached asset.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey([u8; KEY_LEN]);

impl CacheKey {
    /// Derive the key for a producer call in `generation` with `params`.
    ///
    /// Fails with `KeyComputation` when `params` cannot be represented as
    /// JSON, including any NaN or infinite float.
    pub fn derive<P>(generation: &str, params: &P) -> Result<Self>
    where
        P: Serialize + ?Sized,
    {
        // JSON writes NaN and infinities as null, which would collide with None
        params.serialize(FiniteCheck)?;
        // Round-trip through Value so map ordering is normalized
        let canonical = serde_json::to_vec(&serde_json::to_value(params)?)?;

        let mut hasher = Sha256::new();
        hasher.update(generation.as_bytes());
        hasher.update([0u8]);
        hasher.update(&canonical);

        let mut key = [0u8; KEY_LEN];
        key.copy_from_slice(&hasher.finalize());
        Ok(Self(key))
    }

    pub fn from_bytes(bytes: [u8; KEY_LEN]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.0
    }

    /// First 8 hex characters, for log lines.
    pub fn short(&self) -> String {
        hex::encode(&self.0[..4])
    }
}

impl TryFrom<&[u8]> for CacheKey {
    type Error = CacheError;

    fn try_from(bytes: &[u8]) -> Result<Self> {
        let array: [u8; KEY_LEN] = bytes.try_into().map_err(|_| {
            CacheError::InvalidKey(format!(
                "expected {} bytes, got {}",
                KEY_LEN,
                bytes.len()
            ))
        })?;
        Ok(Self(array))
    }
}

impl FromStr for CacheKey {
    type Err = CacheError;

    fn from_str(s: &str) -> Result<Self> {
        let bytes = hex::decode(s).map_err(|e| CacheError::InvalidKey(e.to_string()))?;
        Self::try_from(bytes.as_slice())
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl fmt::Debug for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CacheKey({})", self.short())
    }
}

type Check<T = ()> = std::result::Result<T, serde_json::Error>;

/// Serializer that only visits the value, failing on the first non-finite float.
struct FiniteCheck;

macro_rules! accept {
    ($($method:ident($ty:ty)),* $(,)?) => {
        $(fn $method(self, _: $ty) -> Check {
            Ok(())
        })*
    };
}

macro_rules! compound {
    ($($tr:ident::$method:ident($($skip:ty),*)),* $(,)?) => {
        $(impl ser::$tr for FiniteCheck {
            type Ok = ();
            type Error = serde_json::Error;

            fn $method<T: ?Sized + Serialize>(&mut self, $(_: $skip,)* value: &T) -> Check {
                value.serialize(FiniteCheck)
            }

            fn end(self) -> Check {
                Ok(())
            }
        })*
    };
}

impl ser::Serializer for FiniteCheck {
    type Ok = ();
    type Error = serde_json::Error;
    type SerializeSeq = Self;
    type SerializeTuple = Self;
    type SerializeTupleStruct = Self;
    type SerializeTupleVariant = Self;
    type SerializeMap = Self;
    type SerializeStruct = Self;
    type SerializeStructVariant = Self;

    accept! {
        serialize_bool(bool),
        serialize_i8(i8),
        serialize_i16(i16),
        serialize_i32(i32),
        serialize_i64(i64),
        serialize_u8(u8),
        serialize_u16(u16),
        serialize_u32(u32),
        serialize_u64(u64),
        serialize_char(char),
        serialize_str(&str),
        serialize_bytes(&[u8]),
        serialize_unit_struct(&'static str),
    }

    fn serialize_f32(self, v: f32) -> Check {
        self.serialize_f64(f64::from(v))
    }

    fn serialize_f64(self, v: f64) -> Check {
        if v.is_finite() {
            Ok(())
        } else {
            Err(serde_json::Error::custom(format!(
                "non-finite float {} cannot be part of a cache key",
                v
            )))
        }
    }

    fn serialize_none(self) -> Check {
        Ok(())
    }

    fn serialize_some<T: ?Sized + Serialize>(self, value: &T) -> Check {
        value.serialize(self)
    }

    fn serialize_unit(self) -> Check {
        Ok(())
    }

    fn serialize_unit_variant(self, _: &'static str, _: u32, _: &'static str) -> Check {
        Ok(())
    }

    fn serialize_newtype_struct<T: ?Sized + Serialize>(
        self,
        _: &'static str,
        value: &T,
    ) -> Check {
        value.serialize(self)
    }

    fn serialize_newtype_variant<T: ?Sized + Serialize>(
        self,
        _: &'static str,
        _: u32,
        _: &'static str,
        value: &T,
    ) -> Check {
        value.serialize(self)
    }

    fn serialize_seq(self, _: Option<usize>) -> Check<Self> {
        Ok(self)
    }

    fn serialize_tuple(self, _: usize) -> Check<Self> {
        Ok(self)
    }

    fn serialize_tuple_struct(self, _: &'static str, _: usize) -> Check<Self> {
        Ok(self)
    }

    fn serialize_tuple_variant(
        self,
        _: &'static str,
        _: u32,
        _: &'static str,
        _: usize,
    ) -> Check<Self> {
        Ok(self)
    }

    fn serialize_map(self, _: Option<usize>) -> Check<Self> {
        Ok(self)
    }

    fn serialize_struct(self, _: &'static str, _: usize) -> Check<Self> {
        Ok(self)
    }

    fn serialize_struct_variant(
        self,
        _: &'static str,
        _: u32,
        _: &'static str,
        _: usize,
    ) -> Check<Self> {
        Ok(self)
    }
}

compound! {
    SerializeSeq::serialize_element(),
    SerializeTuple::serialize_element(),
    SerializeTupleStruct::serialize_field(),
    SerializeTupleVariant::serialize_field(),
    SerializeStruct::serialize_field(&'static str),
    SerializeStructVariant::serialize_field(&'static str),
}

impl ser::SerializeMap for FiniteCheck {
    type Ok = ();
    type Error = serde_json::Error;

    fn serialize_key<T: ?Sized + Serialize>(&mut self, key: &T) -> Check {
        key.serialize(FiniteCheck)
    }

    fn serialize_value<T: ?Sized + Serialize>(&mut self, value: &T) -> Check {
        value.serialize(FiniteCheck)
    }

    fn end(self) -> Check {
        Ok(())
    }
}
