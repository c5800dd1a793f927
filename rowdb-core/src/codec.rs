//! Column codecs (component C1): per-type encode/decode/skip for keys and
//! values, including order-preservation for keys.
//!
//! Each logical type gets a
//! [`KeyCodec`] (used when the column participates in a primary key,
//! alternate key, or secondary index key) and a [`ValueCodec`] (used when the
//! column is stored in an entry's value). The two codecs differ in layout:
//! key codecs are order-preserving and never length-prefixed ambiguously
//! (fixed width, or length-prefixed in a way that still collates correctly);
//! value codecs are compact and only order-preserving by accident.

use crate::value::Value;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CodecError {
    #[error("truncated entry while decoding column")]
    Truncated,
    #[error("invalid utf-8 in string column")]
    InvalidUtf8,
    #[error("required column was unset during encode")]
    RequiredColumnUnset,
}

/// Bit flags describing how a column's codec should behave, mirroring the
/// `NULLABLE | DESCENDING | NULL_LOW | UNSIGNED | ARRAY` flags a column can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TypeFlags(u8);

impl TypeFlags {
    pub const NULLABLE: TypeFlags = TypeFlags(1 << 0);
    pub const DESCENDING: TypeFlags = TypeFlags(1 << 1);
    pub const NULL_LOW: TypeFlags = TypeFlags(1 << 2);
    pub const UNSIGNED: TypeFlags = TypeFlags(1 << 3);
    pub const ARRAY: TypeFlags = TypeFlags(1 << 4);

    pub const fn empty() -> Self {
        TypeFlags(0)
    }

    pub const fn contains(self, other: TypeFlags) -> bool {
        self.0 & other.0 == other.0
    }

    pub const fn union(self, other: TypeFlags) -> Self {
        TypeFlags(self.0 | other.0)
    }

    pub fn nullable(self) -> bool {
        self.contains(TypeFlags::NULLABLE)
    }

    pub fn descending(self) -> bool {
        self.contains(TypeFlags::DESCENDING)
    }

    pub fn null_low(self) -> bool {
        self.contains(TypeFlags::NULL_LOW)
    }

    /// Override just the `DESCENDING` bit, keeping nullability and the rest
    /// as declared. Used when a column's own declared direction differs
    /// from the direction it's sorted in within a particular index.
    pub fn with_descending(self, descending: bool) -> TypeFlags {
        if descending {
            self.union(TypeFlags::DESCENDING)
        } else {
            TypeFlags(self.0 & !TypeFlags::DESCENDING.0)
        }
    }
}

impl std::ops::BitOr for TypeFlags {
    type Output = TypeFlags;
    fn bitor(self, rhs: Self) -> Self::Output {
        self.union(rhs)
    }
}

/// Codec used when a column is a key column (primary key, alternate key, or
/// secondary index key). Bytes produced by `encode` must collate
/// lexicographically in the column's declared direction.
pub trait KeyCodec: std::fmt::Debug {
    fn min_size(&self) -> usize;
    fn encode_size(&self, value: &Value) -> Result<usize, CodecError>;
    fn encode(&self, value: &Value, dst: &mut [u8], offset: usize) -> Result<usize, CodecError>;
    fn decode(&self, src: &[u8], offset: usize) -> Result<(Value, usize), CodecError>;
    fn decode_skip(&self, src: &[u8], offset: usize) -> Result<usize, CodecError>;
    fn flags(&self) -> TypeFlags;
}

/// Codec used when a column is stored in an entry's value.
///
/// `terminal` is true exactly when this is the last nullable-capable column
/// emitted into the entry: a nullable *last* value column
/// has no length prefix or trailer -- the entry boundary itself marks the
/// end, and `null` is encoded as a wholly absent trailer rather than an empty
/// one.
pub trait ValueCodec: std::fmt::Debug {
    fn min_size(&self) -> usize;
    fn encode_size(&self, value: &Value, terminal: bool) -> Result<usize, CodecError>;
    fn encode(
        &self,
        value: &Value,
        dst: &mut [u8],
        offset: usize,
        terminal: bool,
    ) -> Result<usize, CodecError>;
    fn decode(
        &self,
        src: &[u8],
        offset: usize,
        terminal: bool,
    ) -> Result<(Value, usize), CodecError>;
    fn decode_skip(&self, src: &[u8], offset: usize, terminal: bool) -> Result<usize, CodecError>;
    fn flags(&self) -> TypeFlags;
    /// The value a destination column receives when the source schema never
    /// encoded it.
    fn type_default(&self) -> Value;
}

fn check_bounds(src: &[u8], offset: usize, len: usize) -> Result<(), CodecError> {
    if offset.checked_add(len).is_none_or(|end| end > src.len()) {
        Err(CodecError::Truncated)
    } else {
        Ok(())
    }
}

// ---------------------------------------------------------------------
// varint, used for value-column length prefixes (not the schema-version
// prefix, which has its own fixed 1/4-byte layout in `crate::encode`).
// ---------------------------------------------------------------------

pub fn write_varint_u64(mut v: u64, dst: &mut Vec<u8>) {
    loop {
        let byte = (v & 0x7f) as u8;
        v >>= 7;
        if v == 0 {
            dst.push(byte);
            break;
        }
        dst.push(byte | 0x80);
    }
}

pub fn varint_u64_size(mut v: u64) -> usize {
    let mut n = 1;
    v >>= 7;
    while v != 0 {
        n += 1;
        v >>= 7;
    }
    n
}

pub fn read_varint_u64(src: &[u8], mut offset: usize) -> Result<(u64, usize), CodecError> {
    let mut result: u64 = 0;
    let mut shift = 0;
    loop {
        check_bounds(src, offset, 1)?;
        let byte = src[offset];
        offset += 1;
        result |= ((byte & 0x7f) as u64) << shift;
        if byte & 0x80 == 0 {
            break;
        }
        shift += 7;
    }
    Ok((result, offset))
}

// ---------------------------------------------------------------------
// Fixed-width signed/unsigned integers.
// ---------------------------------------------------------------------

macro_rules! fixed_int_codec {
    ($name:ident, $unsigned_name:ident, $ty:ty, $utyty:ty, $width:expr, $variant:ident) => {
        #[derive(Debug, Clone, Copy)]
        pub struct $name {
            pub flags: TypeFlags,
        }

        impl $name {
            pub fn new(flags: TypeFlags) -> Self {
                Self { flags }
            }

            fn extract(value: &Value) -> Result<Option<$ty>, CodecError> {
                match value {
                    Value::$variant(v) => Ok(*v),
                    Value::Null => Ok(None),
                    _ => Ok(None),
                }
            }

            /// Order-preserving transform: flip the sign bit so natural
            /// unsigned byte order equals numeric order.
            fn order_key(v: $ty) -> $utyty {
                (v as $utyty) ^ (1 as $utyty).rotate_right(1)
            }

            fn order_key_inv(k: $utyty) -> $ty {
                (k ^ (1 as $utyty).rotate_right(1)) as $ty
            }
        }

        impl KeyCodec for $name {
            fn min_size(&self) -> usize {
                if self.flags.nullable() {
                    $width + 1
                } else {
                    $width
                }
            }

            fn encode_size(&self, _value: &Value) -> Result<usize, CodecError> {
                Ok(self.min_size())
            }

            fn encode(
                &self,
                value: &Value,
                dst: &mut [u8],
                mut offset: usize,
            ) -> Result<usize, CodecError> {
                let v = Self::extract(value)?;
                if self.flags.nullable() {
                    let null_marker = if self.flags.null_low() { 0x00u8 } else { 0x01u8 };
                    let non_null_marker = 1 - null_marker;
                    match v {
                        None => {
                            dst[offset] = null_marker;
                            offset += 1;
                            dst[offset..offset + $width].fill(0);
                            offset += $width;
                        }
                        Some(v) => {
                            dst[offset] = non_null_marker;
                            offset += 1;
                            let mut bits = Self::order_key(v);
                            if self.flags.descending() {
                                bits = !bits;
                            }
                            dst[offset..offset + $width].copy_from_slice(&bits.to_be_bytes());
                            offset += $width;
                        }
                    }
                } else {
                    let v = v.ok_or(CodecError::RequiredColumnUnset)?;
                    let mut bits = Self::order_key(v);
                    if self.flags.descending() {
                        bits = !bits;
                    }
                    dst[offset..offset + $width].copy_from_slice(&bits.to_be_bytes());
                    offset += $width;
                }
                Ok(offset)
            }

            fn decode(&self, src: &[u8], mut offset: usize) -> Result<(Value, usize), CodecError> {
                if self.flags.nullable() {
                    check_bounds(src, offset, 1 + $width)?;
                    let null_marker = if self.flags.null_low() { 0x00u8 } else { 0x01u8 };
                    let marker = src[offset];
                    offset += 1;
                    let mut buf = [0u8; $width];
                    buf.copy_from_slice(&src[offset..offset + $width]);
                    offset += $width;
                    if marker == null_marker {
                        Ok((Value::$variant(None), offset))
                    } else {
                        let mut bits = <$utyty>::from_be_bytes(buf);
                        if self.flags.descending() {
                            bits = !bits;
                        }
                        Ok((Value::$variant(Some(Self::order_key_inv(bits))), offset))
                    }
                } else {
                    check_bounds(src, offset, $width)?;
                    let mut buf = [0u8; $width];
                    buf.copy_from_slice(&src[offset..offset + $width]);
                    offset += $width;
                    let mut bits = <$utyty>::from_be_bytes(buf);
                    if self.flags.descending() {
                        bits = !bits;
                    }
                    Ok((Value::$variant(Some(Self::order_key_inv(bits))), offset))
                }
            }

            fn decode_skip(&self, src: &[u8], offset: usize) -> Result<usize, CodecError> {
                let len = self.min_size();
                check_bounds(src, offset, len)?;
                Ok(offset + len)
            }

            fn flags(&self) -> TypeFlags {
                self.flags
            }
        }

        impl ValueCodec for $name {
            fn min_size(&self) -> usize {
                if self.flags.nullable() { 1 } else { 0 }
            }

            fn encode_size(&self, _value: &Value, terminal: bool) -> Result<usize, CodecError> {
                if self.flags.nullable() && terminal {
                    Ok(0)
                } else if self.flags.nullable() {
                    Ok(1)
                } else {
                    Ok($width)
                }
            }

            fn encode(
                &self,
                value: &Value,
                dst: &mut [u8],
                mut offset: usize,
                terminal: bool,
            ) -> Result<usize, CodecError> {
                let v = Self::extract(value)?;
                if self.flags.nullable() {
                    match v {
                        None => {
                            if !terminal {
                                dst[offset] = 0;
                                offset += 1;
                            }
                            // terminal + null: absent trailer entirely.
                        }
                        Some(v) => {
                            if !terminal {
                                dst[offset] = 1;
                                offset += 1;
                            }
                            dst[offset..offset + $width].copy_from_slice(&v.to_le_bytes());
                            offset += $width;
                        }
                    }
                } else {
                    let v = v.ok_or(CodecError::RequiredColumnUnset)?;
                    dst[offset..offset + $width].copy_from_slice(&v.to_le_bytes());
                    offset += $width;
                }
                Ok(offset)
            }

            fn decode(
                &self,
                src: &[u8],
                mut offset: usize,
                terminal: bool,
            ) -> Result<(Value, usize), CodecError> {
                if self.flags.nullable() {
                    if terminal {
                        if offset >= src.len() {
                            return Ok((Value::$variant(None), offset));
                        }
                        check_bounds(src, offset, $width)?;
                        let mut buf = [0u8; $width];
                        buf.copy_from_slice(&src[offset..offset + $width]);
                        offset += $width;
                        return Ok((Value::$variant(Some(<$ty>::from_le_bytes(buf))), offset));
                    }
                    check_bounds(src, offset, 1)?;
                    let marker = src[offset];
                    offset += 1;
                    if marker == 0 {
                        return Ok((Value::$variant(None), offset));
                    }
                    check_bounds(src, offset, $width)?;
                    let mut buf = [0u8; $width];
                    buf.copy_from_slice(&src[offset..offset + $width]);
                    offset += $width;
                    Ok((Value::$variant(Some(<$ty>::from_le_bytes(buf))), offset))
                } else {
                    check_bounds(src, offset, $width)?;
                    let mut buf = [0u8; $width];
                    buf.copy_from_slice(&src[offset..offset + $width]);
                    offset += $width;
                    Ok((Value::$variant(Some(<$ty>::from_le_bytes(buf))), offset))
                }
            }

            fn decode_skip(&self, src: &[u8], offset: usize, terminal: bool) -> Result<usize, CodecError> {
                self.decode(src, offset, terminal).map(|(_, o)| o)
            }

            fn flags(&self) -> TypeFlags {
                self.flags
            }

            fn type_default(&self) -> Value {
                if self.flags.nullable() {
                    Value::$variant(None)
                } else {
                    Value::$variant(Some(Default::default()))
                }
            }
        }

        #[derive(Debug, Clone, Copy)]
        pub struct $unsigned_name {
            pub flags: TypeFlags,
        }
        impl $unsigned_name {
            pub fn new(flags: TypeFlags) -> Self {
                Self { flags }
            }
        }
    };
}

fixed_int_codec!(I8Codec, U8CodecMarker, i8, u8, 1, I8);
fixed_int_codec!(I16Codec, U16CodecMarker, i16, u16, 2, I16);
fixed_int_codec!(I32Codec, U32CodecMarker, i32, u32, 4, I32);
fixed_int_codec!(I64Codec, U64CodecMarker, i64, u64, 8, I64);

macro_rules! fixed_uint_codec {
    ($name:ident, $ty:ty, $width:expr, $variant:ident) => {
        #[derive(Debug, Clone, Copy)]
        pub struct $name {
            pub flags: TypeFlags,
        }

        impl $name {
            pub fn new(flags: TypeFlags) -> Self {
                Self { flags }
            }

            fn extract(value: &Value) -> Option<$ty> {
                match value {
                    Value::$variant(v) => *v,
                    _ => None,
                }
            }
        }

        impl KeyCodec for $name {
            fn min_size(&self) -> usize {
                if self.flags.nullable() { $width + 1 } else { $width }
            }
            fn encode_size(&self, _value: &Value) -> Result<usize, CodecError> {
                Ok(self.min_size())
            }
            fn encode(&self, value: &Value, dst: &mut [u8], mut offset: usize) -> Result<usize, CodecError> {
                let v = Self::extract(value);
                if self.flags.nullable() {
                    let null_marker = if self.flags.null_low() { 0x00u8 } else { 0x01u8 };
                    let non_null_marker = 1 - null_marker;
                    match v {
                        None => {
                            dst[offset] = null_marker;
                            offset += 1;
                            dst[offset..offset + $width].fill(0);
                            offset += $width;
                        }
                        Some(v) => {
                            dst[offset] = non_null_marker;
                            offset += 1;
                            let bits = if self.flags.descending() { !v } else { v };
                            dst[offset..offset + $width].copy_from_slice(&bits.to_be_bytes());
                            offset += $width;
                        }
                    }
                } else {
                    let v = v.ok_or(CodecError::RequiredColumnUnset)?;
                    let bits = if self.flags.descending() { !v } else { v };
                    dst[offset..offset + $width].copy_from_slice(&bits.to_be_bytes());
                    offset += $width;
                }
                Ok(offset)
            }
            fn decode(&self, src: &[u8], mut offset: usize) -> Result<(Value, usize), CodecError> {
                if self.flags.nullable() {
                    check_bounds(src, offset, 1 + $width)?;
                    let null_marker = if self.flags.null_low() { 0x00u8 } else { 0x01u8 };
                    let marker = src[offset];
                    offset += 1;
                    let mut buf = [0u8; $width];
                    buf.copy_from_slice(&src[offset..offset + $width]);
                    offset += $width;
                    if marker == null_marker {
                        Ok((Value::$variant(None), offset))
                    } else {
                        let mut bits = <$ty>::from_be_bytes(buf);
                        if self.flags.descending() {
                            bits = !bits;
                        }
                        Ok((Value::$variant(Some(bits)), offset))
                    }
                } else {
                    check_bounds(src, offset, $width)?;
                    let mut buf = [0u8; $width];
                    buf.copy_from_slice(&src[offset..offset + $width]);
                    offset += $width;
                    let mut bits = <$ty>::from_be_bytes(buf);
                    if self.flags.descending() {
                        bits = !bits;
                    }
                    Ok((Value::$variant(Some(bits)), offset))
                }
            }
            fn decode_skip(&self, src: &[u8], offset: usize) -> Result<usize, CodecError> {
                let len = self.min_size();
                check_bounds(src, offset, len)?;
                Ok(offset + len)
            }
            fn flags(&self) -> TypeFlags {
                self.flags
            }
        }

        impl ValueCodec for $name {
            fn min_size(&self) -> usize {
                if self.flags.nullable() { 1 } else { 0 }
            }
            fn encode_size(&self, _value: &Value, terminal: bool) -> Result<usize, CodecError> {
                if self.flags.nullable() && terminal {
                    Ok(0)
                } else if self.flags.nullable() {
                    Ok(1)
                } else {
                    Ok($width)
                }
            }
            fn encode(&self, value: &Value, dst: &mut [u8], mut offset: usize, terminal: bool) -> Result<usize, CodecError> {
                let v = Self::extract(value);
                if self.flags.nullable() {
                    match v {
                        None => {
                            if !terminal {
                                dst[offset] = 0;
                                offset += 1;
                            }
                        }
                        Some(v) => {
                            if !terminal {
                                dst[offset] = 1;
                                offset += 1;
                            }
                            dst[offset..offset + $width].copy_from_slice(&v.to_le_bytes());
                            offset += $width;
                        }
                    }
                } else {
                    let v = v.ok_or(CodecError::RequiredColumnUnset)?;
                    dst[offset..offset + $width].copy_from_slice(&v.to_le_bytes());
                    offset += $width;
                }
                Ok(offset)
            }
            fn decode(&self, src: &[u8], mut offset: usize, terminal: bool) -> Result<(Value, usize), CodecError> {
                if self.flags.nullable() {
                    if terminal {
                        if offset >= src.len() {
                            return Ok((Value::$variant(None), offset));
                        }
                        check_bounds(src, offset, $width)?;
                        let mut buf = [0u8; $width];
                        buf.copy_from_slice(&src[offset..offset + $width]);
                        offset += $width;
                        return Ok((Value::$variant(Some(<$ty>::from_le_bytes(buf))), offset));
                    }
                    check_bounds(src, offset, 1)?;
                    let marker = src[offset];
                    offset += 1;
                    if marker == 0 {
                        return Ok((Value::$variant(None), offset));
                    }
                    check_bounds(src, offset, $width)?;
                    let mut buf = [0u8; $width];
                    buf.copy_from_slice(&src[offset..offset + $width]);
                    offset += $width;
                    Ok((Value::$variant(Some(<$ty>::from_le_bytes(buf))), offset))
                } else {
                    check_bounds(src, offset, $width)?;
                    let mut buf = [0u8; $width];
                    buf.copy_from_slice(&src[offset..offset + $width]);
                    offset += $width;
                    Ok((Value::$variant(Some(<$ty>::from_le_bytes(buf))), offset))
                }
            }
            fn decode_skip(&self, src: &[u8], offset: usize, terminal: bool) -> Result<usize, CodecError> {
                self.decode(src, offset, terminal).map(|(_, o)| o)
            }
            fn flags(&self) -> TypeFlags {
                self.flags
            }
            fn type_default(&self) -> Value {
                if self.flags.nullable() {
                    Value::$variant(None)
                } else {
                    Value::$variant(Some(Default::default()))
                }
            }
        }
    };
}

fixed_uint_codec!(U8Codec, u8, 1, U8);
fixed_uint_codec!(U16Codec, u16, 2, U16);
fixed_uint_codec!(U32Codec, u32, 4, U32);
fixed_uint_codec!(U64Codec, u64, 8, U64);

// ---------------------------------------------------------------------
// Floating point.
// ---------------------------------------------------------------------

macro_rules! float_codec {
    ($name:ident, $ty:ty, $uty:ty, $width:expr, $variant:ident) => {
        #[derive(Debug, Clone, Copy)]
        pub struct $name {
            pub flags: TypeFlags,
        }

        impl $name {
            pub fn new(flags: TypeFlags) -> Self {
                Self { flags }
            }

            fn order_key(v: $ty) -> $uty {
                let bits = v.to_bits();
                if bits & (1 as $uty).rotate_right(1) != 0 {
                    !bits
                } else {
                    bits ^ (1 as $uty).rotate_right(1)
                }
            }

            fn order_key_inv(mut k: $uty) -> $ty {
                if k & (1 as $uty).rotate_right(1) != 0 {
                    k ^= (1 as $uty).rotate_right(1);
                } else {
                    k = !k;
                }
                <$ty>::from_bits(k)
            }

            fn extract(value: &Value) -> Option<$ty> {
                match value {
                    Value::$variant(v) => *v,
                    _ => None,
                }
            }
        }

        impl KeyCodec for $name {
            fn min_size(&self) -> usize {
                if self.flags.nullable() { $width + 1 } else { $width }
            }
            fn encode_size(&self, _value: &Value) -> Result<usize, CodecError> {
                Ok(self.min_size())
            }
            fn encode(&self, value: &Value, dst: &mut [u8], mut offset: usize) -> Result<usize, CodecError> {
                let v = Self::extract(value);
                if self.flags.nullable() {
                    let null_marker = if self.flags.null_low() { 0x00u8 } else { 0x01u8 };
                    let non_null_marker = 1 - null_marker;
                    match v {
                        None => {
                            dst[offset] = null_marker;
                            offset += 1;
                            dst[offset..offset + $width].fill(0);
                            offset += $width;
                        }
                        Some(v) => {
                            dst[offset] = non_null_marker;
                            offset += 1;
                            let mut bits = Self::order_key(v);
                            if self.flags.descending() {
                                bits = !bits;
                            }
                            dst[offset..offset + $width].copy_from_slice(&bits.to_be_bytes());
                            offset += $width;
                        }
                    }
                } else {
                    let v = v.ok_or(CodecError::RequiredColumnUnset)?;
                    let mut bits = Self::order_key(v);
                    if self.flags.descending() {
                        bits = !bits;
                    }
                    dst[offset..offset + $width].copy_from_slice(&bits.to_be_bytes());
                    offset += $width;
                }
                Ok(offset)
            }
            fn decode(&self, src: &[u8], mut offset: usize) -> Result<(Value, usize), CodecError> {
                if self.flags.nullable() {
                    check_bounds(src, offset, 1 + $width)?;
                    let null_marker = if self.flags.null_low() { 0x00u8 } else { 0x01u8 };
                    let marker = src[offset];
                    offset += 1;
                    let mut buf = [0u8; $width];
                    buf.copy_from_slice(&src[offset..offset + $width]);
                    offset += $width;
                    if marker == null_marker {
                        Ok((Value::$variant(None), offset))
                    } else {
                        let mut bits = <$uty>::from_be_bytes(buf);
                        if self.flags.descending() {
                            bits = !bits;
                        }
                        Ok((Value::$variant(Some(Self::order_key_inv(bits))), offset))
                    }
                } else {
                    check_bounds(src, offset, $width)?;
                    let mut buf = [0u8; $width];
                    buf.copy_from_slice(&src[offset..offset + $width]);
                    offset += $width;
                    let mut bits = <$uty>::from_be_bytes(buf);
                    if self.flags.descending() {
                        bits = !bits;
                    }
                    Ok((Value::$variant(Some(Self::order_key_inv(bits))), offset))
                }
            }
            fn decode_skip(&self, src: &[u8], offset: usize) -> Result<usize, CodecError> {
                let len = self.min_size();
                check_bounds(src, offset, len)?;
                Ok(offset + len)
            }
            fn flags(&self) -> TypeFlags {
                self.flags
            }
        }

        impl ValueCodec for $name {
            fn min_size(&self) -> usize {
                if self.flags.nullable() { 1 } else { 0 }
            }
            fn encode_size(&self, _value: &Value, terminal: bool) -> Result<usize, CodecError> {
                if self.flags.nullable() && terminal {
                    Ok(0)
                } else if self.flags.nullable() {
                    Ok(1)
                } else {
                    Ok($width)
                }
            }
            fn encode(&self, value: &Value, dst: &mut [u8], mut offset: usize, terminal: bool) -> Result<usize, CodecError> {
                let v = Self::extract(value);
                if self.flags.nullable() {
                    match v {
                        None => {
                            if !terminal {
                                dst[offset] = 0;
                                offset += 1;
                            }
                        }
                        Some(v) => {
                            if !terminal {
                                dst[offset] = 1;
                                offset += 1;
                            }
                            dst[offset..offset + $width].copy_from_slice(&v.to_bits().to_le_bytes());
                            offset += $width;
                        }
                    }
                } else {
                    let v = v.ok_or(CodecError::RequiredColumnUnset)?;
                    dst[offset..offset + $width].copy_from_slice(&v.to_bits().to_le_bytes());
                    offset += $width;
                }
                Ok(offset)
            }
            fn decode(&self, src: &[u8], mut offset: usize, terminal: bool) -> Result<(Value, usize), CodecError> {
                if self.flags.nullable() {
                    if terminal {
                        if offset >= src.len() {
                            return Ok((Value::$variant(None), offset));
                        }
                        check_bounds(src, offset, $width)?;
                        let mut buf = [0u8; $width];
                        buf.copy_from_slice(&src[offset..offset + $width]);
                        offset += $width;
                        return Ok((Value::$variant(Some(<$ty>::from_bits(<$uty>::from_le_bytes(buf)))), offset));
                    }
                    check_bounds(src, offset, 1)?;
                    let marker = src[offset];
                    offset += 1;
                    if marker == 0 {
                        return Ok((Value::$variant(None), offset));
                    }
                    check_bounds(src, offset, $width)?;
                    let mut buf = [0u8; $width];
                    buf.copy_from_slice(&src[offset..offset + $width]);
                    offset += $width;
                    Ok((Value::$variant(Some(<$ty>::from_bits(<$uty>::from_le_bytes(buf)))), offset))
                } else {
                    check_bounds(src, offset, $width)?;
                    let mut buf = [0u8; $width];
                    buf.copy_from_slice(&src[offset..offset + $width]);
                    offset += $width;
                    Ok((Value::$variant(Some(<$ty>::from_bits(<$uty>::from_le_bytes(buf)))), offset))
                }
            }
            fn decode_skip(&self, src: &[u8], offset: usize, terminal: bool) -> Result<usize, CodecError> {
                self.decode(src, offset, terminal).map(|(_, o)| o)
            }
            fn flags(&self) -> TypeFlags {
                self.flags
            }
            fn type_default(&self) -> Value {
                if self.flags.nullable() {
                    Value::$variant(None)
                } else {
                    Value::$variant(Some(Default::default()))
                }
            }
        }
    };
}

float_codec!(F32Codec, f32, u32, 4, F32);
float_codec!(F64Codec, f64, u64, 8, F64);

// ---------------------------------------------------------------------
// Boolean.
// ---------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
pub struct BoolCodec {
    pub flags: TypeFlags,
}

impl BoolCodec {
    pub fn new(flags: TypeFlags) -> Self {
        Self { flags }
    }

    fn extract(value: &Value) -> Option<bool> {
        match value {
            Value::Bool(v) => *v,
            _ => None,
        }
    }
}

impl KeyCodec for BoolCodec {
    fn min_size(&self) -> usize {
        1
    }
    fn encode_size(&self, _value: &Value) -> Result<usize, CodecError> {
        Ok(1)
    }
    fn encode(&self, value: &Value, dst: &mut [u8], offset: usize) -> Result<usize, CodecError> {
        let v = Self::extract(value);
        let byte = if self.flags.nullable() {
            let null_low = self.flags.null_low();
            match v {
                None => {
                    if null_low {
                        0
                    } else {
                        3
                    }
                }
                Some(false) => 1,
                Some(true) => 2,
            }
        } else {
            match v.ok_or(CodecError::RequiredColumnUnset)? {
                false => 0,
                true => 1,
            }
        };
        let byte = if self.flags.descending() { !byte } else { byte };
        dst[offset] = byte;
        Ok(offset + 1)
    }
    fn decode(&self, src: &[u8], offset: usize) -> Result<(Value, usize), CodecError> {
        check_bounds(src, offset, 1)?;
        let mut byte = src[offset];
        if self.flags.descending() {
            byte = !byte;
        }
        let value = if self.flags.nullable() {
            let null_low = self.flags.null_low();
            let null_byte = if null_low { 0 } else { 3 };
            if byte == null_byte {
                Value::Bool(None)
            } else {
                Value::Bool(Some(byte == 2))
            }
        } else {
            Value::Bool(Some(byte != 0))
        };
        Ok((value, offset + 1))
    }
    fn decode_skip(&self, src: &[u8], offset: usize) -> Result<usize, CodecError> {
        check_bounds(src, offset, 1)?;
        Ok(offset + 1)
    }
    fn flags(&self) -> TypeFlags {
        self.flags
    }
}

impl ValueCodec for BoolCodec {
    fn min_size(&self) -> usize {
        1
    }
    fn encode_size(&self, _value: &Value, _terminal: bool) -> Result<usize, CodecError> {
        Ok(1)
    }
    fn encode(&self, value: &Value, dst: &mut [u8], offset: usize, _terminal: bool) -> Result<usize, CodecError> {
        let v = Self::extract(value);
        let byte = if self.flags.nullable() {
            match v {
                None => 2,
                Some(false) => 0,
                Some(true) => 1,
            }
        } else {
            match v.ok_or(CodecError::RequiredColumnUnset)? {
                false => 0,
                true => 1,
            }
        };
        dst[offset] = byte;
        Ok(offset + 1)
    }
    fn decode(&self, src: &[u8], offset: usize, _terminal: bool) -> Result<(Value, usize), CodecError> {
        check_bounds(src, offset, 1)?;
        let byte = src[offset];
        let value = if self.flags.nullable() && byte == 2 {
            Value::Bool(None)
        } else {
            Value::Bool(Some(byte != 0))
        };
        Ok((value, offset + 1))
    }
    fn decode_skip(&self, src: &[u8], offset: usize, terminal: bool) -> Result<usize, CodecError> {
        self.decode(src, offset, terminal).map(|(_, o)| o)
    }
    fn flags(&self) -> TypeFlags {
        self.flags
    }
    fn type_default(&self) -> Value {
        if self.flags.nullable() {
            Value::Bool(None)
        } else {
            Value::Bool(Some(false))
        }
    }
}

// ---------------------------------------------------------------------
// Order-preserving escape for variable-length key columns (String/Bytes
// used as a primary/alternate/secondary key column). A raw 0x00 byte is
// escaped to 0x00 0xFF and the run is closed with a 0x00 0x01 terminator,
// so the column stays self-delimiting inside a compound key instead of
// needing to be the key's last column -- the same "bytes ascending"
// technique CockroachDB/TiKV use for their ordered key encodings.
// DESCENDING complements the whole escaped-plus-terminator run after the
// fact, which still reverses comparison order since every byte compared
// is complemented identically.
// ---------------------------------------------------------------------

fn escaped_key_len(bytes: &[u8]) -> usize {
    bytes.iter().map(|&b| if b == 0 { 2 } else { 1 }).sum::<usize>() + 2
}

fn encode_escaped_key_bytes(bytes: &[u8], dst: &mut [u8], offset: usize, descending: bool) -> usize {
    let mut i = offset;
    for &b in bytes {
        if b == 0x00 {
            dst[i] = 0x00;
            dst[i + 1] = 0xFF;
            i += 2;
        } else {
            dst[i] = b;
            i += 1;
        }
    }
    dst[i] = 0x00;
    dst[i + 1] = 0x01;
    i += 2;
    if descending {
        for b in &mut dst[offset..i] {
            *b = !*b;
        }
    }
    i
}

fn decode_escaped_key_bytes(src: &[u8], offset: usize, descending: bool) -> Result<(Vec<u8>, usize), CodecError> {
    let mut out = Vec::new();
    let mut i = offset;
    loop {
        check_bounds(src, i, 1)?;
        let b = if descending { !src[i] } else { src[i] };
        if b == 0x00 {
            check_bounds(src, i + 1, 1)?;
            let next = if descending { !src[i + 1] } else { src[i + 1] };
            match next {
                0x01 => {
                    i += 2;
                    break;
                }
                0xFF => {
                    out.push(0x00);
                    i += 2;
                }
                _ => return Err(CodecError::Truncated),
            }
        } else {
            out.push(b);
            i += 1;
        }
    }
    Ok((out, i))
}

// ---------------------------------------------------------------------
// UTF-8 strings. Value encoding uses a varint length prefix, except when
// this is the terminal nullable column of the entry.
// ---------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
pub struct StringCodec {
    pub flags: TypeFlags,
}

impl StringCodec {
    pub fn new(flags: TypeFlags) -> Self {
        Self { flags }
    }

    fn extract(value: &Value) -> Result<Option<&str>, CodecError> {
        match value {
            Value::Str(v) => Ok(v.as_deref()),
            _ => Ok(None),
        }
    }
}

impl KeyCodec for StringCodec {
    fn min_size(&self) -> usize {
        (if self.flags.nullable() { 1 } else { 0 }) + 2
    }

    fn encode_size(&self, value: &Value) -> Result<usize, CodecError> {
        let s = Self::extract(value)?;
        let marker = if self.flags.nullable() { 1 } else { 0 };
        match s {
            None => Ok(marker),
            Some(s) => Ok(marker + escaped_key_len(s.as_bytes())),
        }
    }

    fn encode(&self, value: &Value, dst: &mut [u8], mut offset: usize) -> Result<usize, CodecError> {
        let s = Self::extract(value)?;
        if self.flags.nullable() {
            let null_marker = if self.flags.null_low() { 0x00u8 } else { 0x01u8 };
            let non_null_marker = 1 - null_marker;
            match s {
                None => {
                    dst[offset] = null_marker;
                    return Ok(offset + 1);
                }
                Some(_) => {
                    dst[offset] = non_null_marker;
                    offset += 1;
                }
            }
        }
        let s = s.ok_or(CodecError::RequiredColumnUnset)?;
        Ok(encode_escaped_key_bytes(s.as_bytes(), dst, offset, self.flags.descending()))
    }

    fn decode(&self, src: &[u8], mut offset: usize) -> Result<(Value, usize), CodecError> {
        if self.flags.nullable() {
            check_bounds(src, offset, 1)?;
            let null_marker = if self.flags.null_low() { 0x00u8 } else { 0x01u8 };
            let marker = src[offset];
            offset += 1;
            if marker == null_marker {
                return Ok((Value::Str(None), offset));
            }
        }
        let (bytes, new_offset) = decode_escaped_key_bytes(src, offset, self.flags.descending())?;
        let s = String::from_utf8(bytes).map_err(|_| CodecError::InvalidUtf8)?;
        Ok((Value::Str(Some(s)), new_offset))
    }

    fn decode_skip(&self, src: &[u8], offset: usize) -> Result<usize, CodecError> {
        self.decode(src, offset).map(|(_, o)| o)
    }

    fn flags(&self) -> TypeFlags {
        self.flags
    }
}

impl ValueCodec for StringCodec {
    fn min_size(&self) -> usize {
        0
    }

    fn encode_size(&self, value: &Value, terminal: bool) -> Result<usize, CodecError> {
        let s = Self::extract(value)?;
        let header = if self.flags.nullable() {
            if terminal { 0 } else { 1 }
        } else {
            0
        };
        let len_prefix = if terminal {
            0
        } else {
            varint_u64_size(s.map(str::len).unwrap_or(0) as u64)
        };
        Ok(header + len_prefix + s.map(str::len).unwrap_or(0))
    }

    fn encode(&self, value: &Value, dst: &mut [u8], mut offset: usize, terminal: bool) -> Result<usize, CodecError> {
        let s = Self::extract(value)?;
        if self.flags.nullable() {
            match s {
                None => {
                    if !terminal {
                        dst[offset] = 0;
                        offset += 1;
                    }
                    return Ok(offset);
                }
                Some(_) if !terminal => {
                    dst[offset] = 1;
                    offset += 1;
                }
                _ => {}
            }
        }
        let s = s.ok_or(CodecError::RequiredColumnUnset)?;
        let bytes = s.as_bytes();
        if !terminal {
            let mut len_buf = Vec::with_capacity(5);
            write_varint_u64(bytes.len() as u64, &mut len_buf);
            dst[offset..offset + len_buf.len()].copy_from_slice(&len_buf);
            offset += len_buf.len();
        }
        dst[offset..offset + bytes.len()].copy_from_slice(bytes);
        offset += bytes.len();
        Ok(offset)
    }

    fn decode(&self, src: &[u8], mut offset: usize, terminal: bool) -> Result<(Value, usize), CodecError> {
        if self.flags.nullable() && !terminal {
            check_bounds(src, offset, 1)?;
            let marker = src[offset];
            offset += 1;
            if marker == 0 {
                return Ok((Value::Str(None), offset));
            }
        }
        let len = if terminal {
            src.len() - offset
        } else {
            let (len, new_offset) = read_varint_u64(src, offset)?;
            offset = new_offset;
            len as usize
        };
        if terminal && self.flags.nullable() && len == 0 && offset >= src.len() {
            // Absent trailer: treat zero remaining bytes as null only when
            // the column is nullable; a present-but-empty string still
            // decodes to Some("").
            return Ok((Value::Str(None), offset));
        }
        check_bounds(src, offset, len)?;
        let s = String::from_utf8(src[offset..offset + len].to_vec()).map_err(|_| CodecError::InvalidUtf8)?;
        offset += len;
        Ok((Value::Str(Some(s)), offset))
    }

    fn decode_skip(&self, src: &[u8], offset: usize, terminal: bool) -> Result<usize, CodecError> {
        self.decode(src, offset, terminal).map(|(_, o)| o)
    }

    fn flags(&self) -> TypeFlags {
        self.flags
    }

    fn type_default(&self) -> Value {
        if self.flags.nullable() {
            Value::Str(None)
        } else {
            Value::Str(Some(String::new()))
        }
    }
}

// ---------------------------------------------------------------------
// Blob (raw bytes), same layout rules as strings minus UTF-8 validation.
// ---------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
pub struct BlobCodec {
    pub flags: TypeFlags,
}

impl BlobCodec {
    pub fn new(flags: TypeFlags) -> Self {
        Self { flags }
    }

    fn extract(value: &Value) -> Option<&[u8]> {
        match value {
            Value::Bytes(v) => v.as_deref(),
            _ => None,
        }
    }
}

impl KeyCodec for BlobCodec {
    fn min_size(&self) -> usize {
        (if self.flags.nullable() { 1 } else { 0 }) + 2
    }

    fn encode_size(&self, value: &Value) -> Result<usize, CodecError> {
        let b = Self::extract(value);
        let marker = if self.flags.nullable() { 1 } else { 0 };
        match b {
            None => Ok(marker),
            Some(b) => Ok(marker + escaped_key_len(b)),
        }
    }

    fn encode(&self, value: &Value, dst: &mut [u8], mut offset: usize) -> Result<usize, CodecError> {
        let b = Self::extract(value);
        if self.flags.nullable() {
            let null_marker = if self.flags.null_low() { 0x00u8 } else { 0x01u8 };
            let non_null_marker = 1 - null_marker;
            match b {
                None => {
                    dst[offset] = null_marker;
                    return Ok(offset + 1);
                }
                Some(_) => {
                    dst[offset] = non_null_marker;
                    offset += 1;
                }
            }
        }
        let b = b.ok_or(CodecError::RequiredColumnUnset)?;
        Ok(encode_escaped_key_bytes(b, dst, offset, self.flags.descending()))
    }

    fn decode(&self, src: &[u8], mut offset: usize) -> Result<(Value, usize), CodecError> {
        if self.flags.nullable() {
            check_bounds(src, offset, 1)?;
            let null_marker = if self.flags.null_low() { 0x00u8 } else { 0x01u8 };
            let marker = src[offset];
            offset += 1;
            if marker == null_marker {
                return Ok((Value::Bytes(None), offset));
            }
        }
        let (bytes, new_offset) = decode_escaped_key_bytes(src, offset, self.flags.descending())?;
        Ok((Value::Bytes(Some(bytes)), new_offset))
    }

    fn decode_skip(&self, src: &[u8], offset: usize) -> Result<usize, CodecError> {
        self.decode(src, offset).map(|(_, o)| o)
    }

    fn flags(&self) -> TypeFlags {
        self.flags
    }
}

impl ValueCodec for BlobCodec {
    fn min_size(&self) -> usize {
        0
    }

    fn encode_size(&self, value: &Value, terminal: bool) -> Result<usize, CodecError> {
        let b = Self::extract(value);
        let header = if self.flags.nullable() {
            if terminal { 0 } else { 1 }
        } else {
            0
        };
        let len_prefix = if terminal {
            0
        } else {
            varint_u64_size(b.map(<[u8]>::len).unwrap_or(0) as u64)
        };
        Ok(header + len_prefix + b.map(<[u8]>::len).unwrap_or(0))
    }

    fn encode(&self, value: &Value, dst: &mut [u8], mut offset: usize, terminal: bool) -> Result<usize, CodecError> {
        let b = Self::extract(value);
        if self.flags.nullable() {
            match b {
                None => {
                    if !terminal {
                        dst[offset] = 0;
                        offset += 1;
                    }
                    return Ok(offset);
                }
                Some(_) if !terminal => {
                    dst[offset] = 1;
                    offset += 1;
                }
                _ => {}
            }
        }
        let b = b.ok_or(CodecError::RequiredColumnUnset)?;
        if !terminal {
            let mut len_buf = Vec::with_capacity(5);
            write_varint_u64(b.len() as u64, &mut len_buf);
            dst[offset..offset + len_buf.len()].copy_from_slice(&len_buf);
            offset += len_buf.len();
        }
        dst[offset..offset + b.len()].copy_from_slice(b);
        offset += b.len();
        Ok(offset)
    }

    fn decode(&self, src: &[u8], mut offset: usize, terminal: bool) -> Result<(Value, usize), CodecError> {
        if self.flags.nullable() && !terminal {
            check_bounds(src, offset, 1)?;
            let marker = src[offset];
            offset += 1;
            if marker == 0 {
                return Ok((Value::Bytes(None), offset));
            }
        }
        let len = if terminal {
            src.len() - offset
        } else {
            let (len, new_offset) = read_varint_u64(src, offset)?;
            offset = new_offset;
            len as usize
        };
        check_bounds(src, offset, len)?;
        let bytes = src[offset..offset + len].to_vec();
        offset += len;
        Ok((Value::Bytes(Some(bytes)), offset))
    }

    fn decode_skip(&self, src: &[u8], offset: usize, terminal: bool) -> Result<usize, CodecError> {
        self.decode(src, offset, terminal).map(|(_, o)| o)
    }

    fn flags(&self) -> TypeFlags {
        self.flags
    }

    fn type_default(&self) -> Value {
        if self.flags.nullable() {
            Value::Bytes(None)
        } else {
            Value::Bytes(Some(Vec::new()))
        }
    }
}

// ---------------------------------------------------------------------
// Null column: produces a constant default, consumes nothing.
// ---------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
pub struct NullColumnCodec;

impl ValueCodec for NullColumnCodec {
    fn min_size(&self) -> usize {
        0
    }
    fn encode_size(&self, _value: &Value, _terminal: bool) -> Result<usize, CodecError> {
        Ok(0)
    }
    fn encode(&self, _value: &Value, _dst: &mut [u8], offset: usize, _terminal: bool) -> Result<usize, CodecError> {
        Ok(offset)
    }
    fn decode(&self, _src: &[u8], offset: usize, _terminal: bool) -> Result<(Value, usize), CodecError> {
        Ok((Value::Null, offset))
    }
    fn decode_skip(&self, _src: &[u8], offset: usize, _terminal: bool) -> Result<usize, CodecError> {
        Ok(offset)
    }
    fn flags(&self) -> TypeFlags {
        TypeFlags::empty()
    }
    fn type_default(&self) -> Value {
        Value::Null
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn i64_key_order_preserving_ascending() {
        let codec = I64Codec::new(TypeFlags::empty());
        let mut a = [0u8; 8];
        let mut b = [0u8; 8];
        codec.encode(&Value::I64(Some(-5)), &mut a, 0).unwrap();
        codec.encode(&Value::I64(Some(3)), &mut b, 0).unwrap();
        assert!(a < b);
    }

    #[test]
    fn i64_key_order_preserving_descending() {
        let codec = I64Codec::new(TypeFlags::DESCENDING);
        let mut a = [0u8; 8];
        let mut b = [0u8; 8];
        codec.encode(&Value::I64(Some(-5)), &mut a, 0).unwrap();
        codec.encode(&Value::I64(Some(3)), &mut b, 0).unwrap();
        assert!(a > b);
    }

    #[test]
    fn i64_roundtrip() {
        let codec = I64Codec::new(TypeFlags::empty());
        for v in [i64::MIN, -1, 0, 1, i64::MAX] {
            let mut buf = [0u8; 8];
            codec.encode(&Value::I64(Some(v)), &mut buf, 0).unwrap();
            let (decoded, off) = KeyCodec::decode(&codec, &buf, 0).unwrap();
            assert_eq!(off, 8);
            assert_eq!(decoded, Value::I64(Some(v)));
        }
    }

    #[test]
    fn nullable_key_null_low_sorts_first() {
        let codec = I32Codec::new(TypeFlags::NULLABLE | TypeFlags::NULL_LOW);
        let mut null_buf = [0u8; 5];
        let mut some_buf = [0u8; 5];
        codec.encode(&Value::I32(None), &mut null_buf, 0).unwrap();
        codec.encode(&Value::I32(Some(i32::MIN)), &mut some_buf, 0).unwrap();
        assert!(null_buf < some_buf);
    }

    #[test]
    fn nullable_key_default_sorts_null_last() {
        let codec = I32Codec::new(TypeFlags::NULLABLE);
        let mut null_buf = [0u8; 5];
        let mut some_buf = [0u8; 5];
        codec.encode(&Value::I32(None), &mut null_buf, 0).unwrap();
        codec.encode(&Value::I32(Some(i32::MAX)), &mut some_buf, 0).unwrap();
        assert!(null_buf > some_buf);
    }

    #[test]
    fn f64_key_order_preserving() {
        let codec = F64Codec::new(TypeFlags::empty());
        let mut a = [0u8; 8];
        let mut b = [0u8; 8];
        let mut c = [0u8; 8];
        codec.encode(&Value::F64(Some(-1.5)), &mut a, 0).unwrap();
        codec.encode(&Value::F64(Some(0.0)), &mut b, 0).unwrap();
        codec.encode(&Value::F64(Some(2.5)), &mut c, 0).unwrap();
        assert!(a < b);
        assert!(b < c);
    }

    #[test]
    fn string_value_terminal_null_has_no_bytes() {
        let codec = StringCodec::new(TypeFlags::NULLABLE);
        let mut buf = [0u8; 0];
        let offset = codec.encode(&Value::Str(None), &mut buf, 0, true).unwrap();
        assert_eq!(offset, 0);
        let (decoded, _) = codec.decode(&buf, 0, true).unwrap();
        assert_eq!(decoded, Value::Str(None));
    }

    #[test]
    fn string_value_non_terminal_roundtrip() {
        let codec = StringCodec::new(TypeFlags::empty());
        let s = "hello world";
        let size = codec.encode_size(&Value::Str(Some(s.into())), false).unwrap();
        let mut buf = vec![0u8; size];
        codec.encode(&Value::Str(Some(s.into())), &mut buf, 0, false).unwrap();
        let (decoded, offset) = codec.decode(&buf, 0, false).unwrap();
        assert_eq!(offset, size);
        assert_eq!(decoded, Value::Str(Some(s.into())));
    }

    #[test]
    fn truncated_decode_is_corrupt_encoding() {
        let codec = I64Codec::new(TypeFlags::empty());
        let buf = [0u8; 3];
        assert_eq!(
            KeyCodec::decode(&codec, &buf, 0).unwrap_err(),
            CodecError::Truncated
        );
    }

    #[test]
    fn invalid_utf8_string_decode_fails() {
        let codec = StringCodec::new(TypeFlags::empty());
        // Payload 0xff,0xfe followed by the escape-scheme terminator 0x00,0x01.
        let buf = [0xffu8, 0xfe, 0x00, 0x01];
        assert_eq!(
            KeyCodec::decode(&codec, &buf, 0).unwrap_err(),
            CodecError::InvalidUtf8
        );
    }

    #[test]
    fn string_key_non_terminal_column_does_not_consume_the_rest_of_the_entry() {
        let city = StringCodec::new(TypeFlags::empty());
        let name = StringCodec::new(TypeFlags::empty());
        let size = city.encode_size(&Value::Str(Some("nyc".into()))).unwrap()
            + name.encode_size(&Value::Str(Some("Ada".into()))).unwrap();
        let mut buf = vec![0u8; size];
        let offset = city.encode(&Value::Str(Some("nyc".into())), &mut buf, 0).unwrap();
        name.encode(&Value::Str(Some("Ada".into())), &mut buf, offset).unwrap();

        let (decoded_city, offset) = KeyCodec::decode(&city, &buf, 0).unwrap();
        assert_eq!(decoded_city, Value::Str(Some("nyc".into())));
        let (decoded_name, offset) = KeyCodec::decode(&name, &buf, offset).unwrap();
        assert_eq!(decoded_name, Value::Str(Some("Ada".into())));
        assert_eq!(offset, buf.len());
    }

    #[test]
    fn string_key_escapes_embedded_nul_byte_without_colliding_with_the_terminator() {
        let codec = StringCodec::new(TypeFlags::empty());
        let a = "ab";
        let b = "ab\u{0}c";
        let size_a = codec.encode_size(&Value::Str(Some(a.into()))).unwrap();
        let size_b = codec.encode_size(&Value::Str(Some(b.into()))).unwrap();
        let mut buf_a = vec![0u8; size_a];
        let mut buf_b = vec![0u8; size_b];
        codec.encode(&Value::Str(Some(a.into())), &mut buf_a, 0).unwrap();
        codec.encode(&Value::Str(Some(b.into())), &mut buf_b, 0).unwrap();
        assert!(buf_a < buf_b, "\"ab\" must sort before its own extension with an embedded NUL");

        let (decoded, offset) = KeyCodec::decode(&codec, &buf_b, 0).unwrap();
        assert_eq!(decoded, Value::Str(Some(b.into())));
        assert_eq!(offset, buf_b.len());
    }
}
