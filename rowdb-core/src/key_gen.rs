//! Automatic-column key generator: produces primary key
//! values for columns marked `automatic`, clamped into the declared
//! column's representable range rather than overflowing it.
//!
//! Grounded on the `AtomicI64`/`Ordering::SeqCst` auto-increment counter
//! pattern used by the in-memory table in the `weaver` storage example,
//! generalized here over every integer `TypeKind` rather than one fixed
//! row-id type.

use std::sync::atomic::{AtomicI64, Ordering};

use crate::error::Error;
use crate::schema::TypeKind;
use crate::value::Value;

#[derive(Debug)]
pub struct AutoKeyGenerator {
    counter: AtomicI64,
    kind: TypeKind,
}

impl AutoKeyGenerator {
    pub fn new(kind: TypeKind, start: i64) -> Result<Self, Error> {
        if !matches!(
            kind,
            TypeKind::I8
                | TypeKind::I16
                | TypeKind::I32
                | TypeKind::I64
                | TypeKind::U8
                | TypeKind::U16
                | TypeKind::U32
                | TypeKind::U64
        ) {
            return Err(Error::MalformedRowType(
                "automatic column must have an integer type".into(),
            ));
        }
        Ok(Self {
            counter: AtomicI64::new(start),
            kind,
        })
    }

    fn range(&self) -> (i64, i64) {
        match self.kind {
            TypeKind::I8 => (i8::MIN as i64, i8::MAX as i64),
            TypeKind::I16 => (i16::MIN as i64, i16::MAX as i64),
            TypeKind::I32 => (i32::MIN as i64, i32::MAX as i64),
            TypeKind::I64 => (i64::MIN, i64::MAX),
            TypeKind::U8 => (0, u8::MAX as i64),
            TypeKind::U16 => (0, u16::MAX as i64),
            TypeKind::U32 => (0, u32::MAX as i64),
            TypeKind::U64 => (0, i64::MAX),
            _ => unreachable!("validated in `new`"),
        }
    }

    /// Wraps `raw` back into the column's representable range rather than
    /// letting it overflow: once the counter runs past `max` it resumes at
    /// `min`, the way a ring buffer index wraps, instead of panicking or
    /// silently truncating high bits.
    fn clamp(&self, raw: i64) -> i64 {
        let (min, max) = self.range();
        let span = (max as i128) - (min as i128) + 1;
        let wrapped = ((raw as i128 - min as i128).rem_euclid(span)) + min as i128;
        wrapped as i64
    }

    pub fn next_value(&self) -> Value {
        let raw = self.counter.fetch_add(1, Ordering::SeqCst);
        let v = self.clamp(raw);
        match self.kind {
            TypeKind::I8 => Value::I8(Some(v as i8)),
            TypeKind::I16 => Value::I16(Some(v as i16)),
            TypeKind::I32 => Value::I32(Some(v as i32)),
            TypeKind::I64 => Value::I64(Some(v)),
            TypeKind::U8 => Value::U8(Some(v as u8)),
            TypeKind::U16 => Value::U16(Some(v as u16)),
            TypeKind::U32 => Value::U32(Some(v as u32)),
            TypeKind::U64 => Value::U64(Some(v as u64)),
            _ => unreachable!("validated in `new`"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn i8_generator_wraps_at_range_boundary() {
        let gen = AutoKeyGenerator::new(TypeKind::I8, i8::MAX as i64).unwrap();
        assert_eq!(gen.next_value(), Value::I8(Some(i8::MAX)));
        assert_eq!(gen.next_value(), Value::I8(Some(i8::MIN)));
        assert_eq!(gen.next_value(), Value::I8(Some(i8::MIN + 1)));
    }

    #[test]
    fn u8_generator_wraps_to_zero() {
        let gen = AutoKeyGenerator::new(TypeKind::U8, u8::MAX as i64).unwrap();
        assert_eq!(gen.next_value(), Value::U8(Some(u8::MAX)));
        assert_eq!(gen.next_value(), Value::U8(Some(0)));
    }

    #[test]
    fn non_integer_kind_is_rejected() {
        assert!(AutoKeyGenerator::new(TypeKind::Str, 0).is_err());
    }

    #[test]
    fn i64_generator_is_sequential_in_normal_range() {
        let gen = AutoKeyGenerator::new(TypeKind::I64, 0).unwrap();
        assert_eq!(gen.next_value(), Value::I64(Some(0)));
        assert_eq!(gen.next_value(), Value::I64(Some(1)));
    }
}
