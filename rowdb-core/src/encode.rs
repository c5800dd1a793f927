//! Encode/decode pipeline (component C4): turning a row's current values
//! into primary-key and value byte strings, and back.
//!
//! The value encoding is prefixed with a schema version so a later decode
//! can tell which `RowInfo` the bytes were written against and default
//! columns that didn't exist at encode time.
//! Versions below 128 take one byte; at or above 128 they take four, with
//! the top bit of the first byte as the discriminator.

use crate::error::Error;
use crate::row::RowFields;
use crate::schema::RowInfo;
use crate::value::Value;

/// Version 0 is the empty entry: no prefix bytes at all, not even a single
/// zero byte. Versions 1..127 take one byte, 128.. take four.
pub fn schema_version_size(version: u32) -> usize {
    if version == 0 {
        0
    } else if version < 0x80 {
        1
    } else {
        4
    }
}

pub fn write_schema_version(version: u32, dst: &mut Vec<u8>) {
    if version == 0 {
        // Nothing to write: `[] ≡ schema version 0`.
    } else if version < 0x80 {
        dst.push(version as u8);
    } else {
        dst.push(0x80 | ((version >> 24) & 0x7f) as u8);
        dst.push((version >> 16) as u8);
        dst.push((version >> 8) as u8);
        dst.push(version as u8);
    }
}

pub fn read_schema_version(src: &[u8]) -> Result<(u32, usize), Error> {
    use crate::codec::CodecError;
    if src.is_empty() {
        return Ok((0, 0));
    }
    let b0 = src[0];
    if b0 & 0x80 == 0 {
        Ok((b0 as u32, 1))
    } else {
        if src.len() < 4 {
            return Err(Error::CorruptEncoding(CodecError::Truncated));
        }
        let v = (((b0 & 0x7f) as u32) << 24)
            | ((src[1] as u32) << 16)
            | ((src[2] as u32) << 8)
            | (src[3] as u32);
        Ok((v, 4))
    }
}

/// Encode the primary key columns of `row` in `RowInfo`-assigned order.
pub fn encode_primary_key(info: &RowInfo, row: &dyn RowFields) -> Result<Vec<u8>, Error> {
    let mut codecs = Vec::with_capacity(info.key_columns.len());
    let mut size = 0;
    for &col in &info.key_columns {
        let c = &info.all_columns[col];
        let codec = c.kind.key_codec(c.flags);
        let value = row.get_value(col);
        size += codec.encode_size(&value).map_err(Error::CorruptEncoding)?;
        codecs.push((codec, value));
    }
    let mut buf = vec![0u8; size];
    let mut offset = 0;
    for (codec, value) in &codecs {
        offset = codec
            .encode(value, &mut buf, offset)
            .map_err(Error::CorruptEncoding)?;
    }
    Ok(buf)
}

/// Decode a primary key into `(column index, value)` pairs in `info`'s
/// column order.
pub fn decode_primary_key(info: &RowInfo, src: &[u8]) -> Result<Vec<(usize, Value)>, Error> {
    let mut offset = 0;
    let mut out = Vec::with_capacity(info.key_columns.len());
    for &col in &info.key_columns {
        let c = &info.all_columns[col];
        let codec = c.kind.key_codec(c.flags);
        let (value, new_offset) = codec.decode(src, offset).map_err(Error::CorruptEncoding)?;
        offset = new_offset;
        out.push((col, value));
    }
    Ok(out)
}

/// Re-encode the primary key after one or more key columns change.
///
/// Unlike value re-encoding (see [`crate::transform`]), this always
/// rebuilds the whole key: an order-preserving compound key has no
/// statically-fixed column boundaries the way a value entry does once a
/// trailing variable-length column is involved, so splicing a changed span
/// into place isn't generally safe. Keys change far less often than values
/// in practice, so the simplicity is worth it.
pub fn update_primary_key(info: &RowInfo, row: &dyn RowFields) -> Result<Vec<u8>, Error> {
    encode_primary_key(info, row)
}

/// Encode the value columns of `row`, prefixed with `schema_version`.
pub fn encode_value(info: &RowInfo, schema_version: u32, row: &dyn RowFields) -> Result<Vec<u8>, Error> {
    let mut codecs = Vec::with_capacity(info.value_columns.len());
    let mut size = schema_version_size(schema_version);
    let last = info.value_columns.len().saturating_sub(1);
    for (i, &col) in info.value_columns.iter().enumerate() {
        let c = &info.all_columns[col];
        let codec = c.kind.value_codec(c.flags);
        let value = row.get_value(col);
        let terminal = i == last;
        size += codec.encode_size(&value, terminal).map_err(Error::CorruptEncoding)?;
        codecs.push((codec, value, terminal));
    }
    let mut buf = vec![0u8; size];
    write_schema_version(schema_version, &mut buf);
    let mut offset = schema_version_size(schema_version);
    for (codec, value, terminal) in &codecs {
        offset = codec
            .encode(value, &mut buf, offset, *terminal)
            .map_err(Error::CorruptEncoding)?;
    }
    Ok(buf)
}

/// Decode a value entry written against `stored`'s column layout into
/// `current`'s column indices, applying schema-evolution defaulting:
/// columns `stored` has that `current` has dropped are skipped;
/// columns `current` has that `stored` predates are defaulted.
pub fn decode_value(current: &RowInfo, stored: &RowInfo, src: &[u8]) -> Result<Vec<(usize, Value)>, Error> {
    if src.is_empty() {
        // `[] ≡ schema version 0`: no column was ever written, so every
        // destination value column gets its type default.
        return Ok(current
            .value_columns
            .iter()
            .map(|&ccol| {
                let c = &current.all_columns[ccol];
                (ccol, c.kind.value_codec(c.flags).type_default())
            })
            .collect());
    }
    let (_, mut offset) = read_schema_version(src)?;
    let mut out = Vec::with_capacity(current.value_columns.len());
    let last_stored = stored.value_columns.len().saturating_sub(1);
    let mut seen_names = Vec::with_capacity(stored.value_columns.len());
    for (i, &scol) in stored.value_columns.iter().enumerate() {
        let sc = &stored.all_columns[scol];
        let codec = sc.kind.value_codec(sc.flags);
        let terminal = i == last_stored;
        let target = current
            .value_columns
            .iter()
            .find(|&&ccol| current.all_columns[ccol].name == sc.name)
            .copied();
        match target {
            Some(ccol) => {
                let (value, new_offset) = codec.decode(src, offset, terminal).map_err(Error::CorruptEncoding)?;
                offset = new_offset;
                out.push((ccol, value));
            }
            None => {
                offset = codec.decode_skip(src, offset, terminal).map_err(Error::CorruptEncoding)?;
            }
        }
        seen_names.push(sc.name.as_str());
    }
    for &ccol in &current.value_columns {
        let name = current.all_columns[ccol].name.as_str();
        if !seen_names.contains(&name) {
            let c = &current.all_columns[ccol];
            out.push((ccol, c.kind.value_codec(c.flags).type_default()));
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::TypeFlags;
    use crate::row::GenericRow;
    use crate::schema::{clear_row_info_cache, find, ColumnDecl, RowType, TypeKind};

    struct Widget;
    impl RowType for Widget {
        fn type_name() -> &'static str {
            "encode_tests::Widget"
        }
        fn columns() -> &'static [ColumnDecl] {
            &[
                ColumnDecl {
                    name: "id",
                    kind: TypeKind::I64,
                    flags: TypeFlags::empty(),
                    primary_key: true,
                    automatic: false,
                },
                ColumnDecl {
                    name: "weight",
                    kind: TypeKind::F32,
                    flags: TypeFlags::empty(),
                    primary_key: false,
                    automatic: false,
                },
                ColumnDecl {
                    name: "label",
                    kind: TypeKind::Str,
                    flags: TypeFlags::NULLABLE,
                    primary_key: false,
                    automatic: false,
                },
            ]
        }
    }

    #[test]
    fn schema_version_zero_is_the_empty_byte_string() {
        let mut buf = Vec::new();
        write_schema_version(0, &mut buf);
        assert!(buf.is_empty());
        let (decoded, consumed) = read_schema_version(&buf).unwrap();
        assert_eq!(decoded, 0);
        assert_eq!(consumed, 0);
    }

    #[test]
    fn decode_value_on_empty_bytes_defaults_every_column() {
        clear_row_info_cache();
        let info = find::<Widget>().unwrap();
        let decoded = decode_value(&info, &info, &[]).unwrap();
        let mut sorted = decoded;
        sorted.sort_by_key(|(i, _)| *i);
        assert_eq!(sorted, vec![(1, Value::F32(Some(0.0))), (2, Value::Str(None))]);
    }

    #[test]
    fn schema_version_roundtrip_across_128_boundary() {
        for v in [0u32, 1, 127, 128, 129, 70_000] {
            let mut buf = Vec::new();
            write_schema_version(v, &mut buf);
            assert_eq!(buf.len(), schema_version_size(v));
            let (decoded, consumed) = read_schema_version(&buf).unwrap();
            assert_eq!(decoded, v);
            assert_eq!(consumed, buf.len());
        }
    }

    #[test]
    fn primary_key_roundtrip() {
        clear_row_info_cache();
        let info = find::<Widget>().unwrap();
        let mut row = GenericRow::new(&info);
        row.set_value(0, Value::I64(Some(42)));
        let key = encode_primary_key(&info, &row).unwrap();
        let decoded = decode_primary_key(&info, &key).unwrap();
        assert_eq!(decoded, vec![(0, Value::I64(Some(42)))]);
    }

    #[test]
    fn value_roundtrip_with_terminal_nullable_column() {
        clear_row_info_cache();
        let info = find::<Widget>().unwrap();
        let mut row = GenericRow::new(&info);
        row.set_value(0, Value::I64(Some(1)));
        row.set_value(1, Value::F32(Some(2.5)));
        row.set_value(2, Value::Str(Some("ok".into())));
        let bytes = encode_value(&info, 3, &row).unwrap();
        let decoded = decode_value(&info, &info, &bytes).unwrap();
        let mut sorted = decoded;
        sorted.sort_by_key(|(i, _)| *i);
        assert_eq!(sorted[1], (1, Value::F32(Some(2.5))));
        assert_eq!(sorted[2], (2, Value::Str(Some("ok".into()))));
    }

    #[test]
    fn schema_evolution_defaults_added_column() {
        clear_row_info_cache();
        let info = find::<Widget>().unwrap();
        let mut row = GenericRow::new(&info);
        row.set_value(0, Value::I64(Some(1)));
        row.set_value(1, Value::F32(Some(9.0)));
        let old_bytes = encode_value(&info, 1, &row).unwrap();

        struct WidgetV2;
        impl RowType for WidgetV2 {
            fn type_name() -> &'static str {
                "encode_tests::WidgetV2"
            }
            fn columns() -> &'static [ColumnDecl] {
                &[
                    ColumnDecl {
                        name: "id",
                        kind: TypeKind::I64,
                        flags: TypeFlags::empty(),
                        primary_key: true,
                        automatic: false,
                    },
                    ColumnDecl {
                        name: "weight",
                        kind: TypeKind::F32,
                        flags: TypeFlags::empty(),
                        primary_key: false,
                        automatic: false,
                    },
                    ColumnDecl {
                        name: "label",
                        kind: TypeKind::Str,
                        flags: TypeFlags::NULLABLE,
                        primary_key: false,
                        automatic: false,
                    },
                    ColumnDecl {
                        name: "extra",
                        kind: TypeKind::I32,
                        flags: TypeFlags::NULLABLE,
                        primary_key: false,
                        automatic: false,
                    },
                ]
            }
        }

        // Old value was encoded with only {weight, label} as value columns
        // (label absent entirely since it was never set -- here we only
        // wrote weight, so label itself is already an instance of evolution
        // relative to a hypothetical older writer; emulate a genuinely older
        // stored schema missing "extra" explicitly).
        let current = find::<WidgetV2>().unwrap();
        let decoded = decode_value(&current, &info, &old_bytes).unwrap();
        let extra = decoded.iter().find(|(i, _)| current.all_columns[*i].name == "extra");
        assert_eq!(extra.map(|(_, v)| v.clone()), Some(Value::I32(None)));
    }
}
