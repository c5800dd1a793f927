//! Partial update pipeline (component C5): re-encode only the dirty value
//! columns of a row, copying every untouched column's original byte span
//! verbatim rather than re-encoding it.
//!
//! A fresh insert and an update touching only changed columns are the same
//! underlying operation at different dirty-column granularities; this
//! module is the byte-level expression of that, since a stored row here is
//! a single length-delimited blob rather than a column list.

use smallvec::SmallVec;

use crate::encode::read_schema_version;
use crate::error::Error;
use crate::row::RowFields;
use crate::schema::RowInfo;
use crate::state::DIRTY;

/// Most rows have a handful of value columns; inlining a few spans avoids a
/// heap allocation on the common partial-update path.
type ColumnSpans = SmallVec<[ColumnSpan; 8]>;

/// Byte range of one value column within an encoded entry, including its
/// header/length-prefix bytes.
#[derive(Debug, Clone, Copy)]
struct ColumnSpan {
    start: usize,
    end: usize,
}

fn column_spans(info: &RowInfo, src: &[u8]) -> Result<(u32, usize, ColumnSpans), Error> {
    let (version, mut offset) = read_schema_version(src)?;
    let version_prefix_end = offset;
    let last = info.value_columns.len().saturating_sub(1);
    let mut spans = ColumnSpans::with_capacity(info.value_columns.len());
    for (i, &col) in info.value_columns.iter().enumerate() {
        let c = &info.all_columns[col];
        let codec = c.kind.value_codec(c.flags);
        let start = offset;
        offset = codec
            .decode_skip(src, offset, i == last)
            .map_err(Error::CorruptEncoding)?;
        spans.push(ColumnSpan { start, end: offset });
    }
    Ok((version, version_prefix_end, spans))
}

/// TransformMaker's byte-copy shortcut: the result of overlaying `row`'s
/// dirty value columns onto `original`, an entry previously encoded for
/// `info`.
///
/// Walks the value columns in order (pass 1 of the algorithm folded into
/// `column_spans`, pass 2 here): a dirty column is freshly encoded from the
/// row's held value; every other column -- clean or still unset -- has its
/// original byte span copied verbatim, since the row is not required to
/// hold a value for a column it never touched. `schema_version` is unused
/// here by design: a partial update never changes the stored entry's
/// schema version, only a full re-encode does.
pub fn transform_update(
    info: &RowInfo,
    _schema_version: u32,
    original: &[u8],
    row: &dyn RowFields,
) -> Result<Vec<u8>, Error> {
    let (_stored_version, version_prefix_end, spans) = column_spans(info, original)?;

    if !info.value_columns.iter().any(|&col| row.state().get(col) == DIRTY) {
        return Ok(original.to_vec());
    }

    let mut buf = Vec::with_capacity(original.len());
    buf.extend_from_slice(&original[..version_prefix_end]);

    let last = info.value_columns.len().saturating_sub(1);
    for (i, &col) in info.value_columns.iter().enumerate() {
        if row.state().get(col) == DIRTY {
            let c = &info.all_columns[col];
            let codec = c.kind.value_codec(c.flags);
            let value = row.get_value(col);
            let terminal = i == last;
            let size = codec
                .encode_size(&value, terminal)
                .map_err(Error::CorruptEncoding)?;
            let start = buf.len();
            buf.resize(start + size, 0);
            let end = codec
                .encode(&value, &mut buf, start, terminal)
                .map_err(Error::CorruptEncoding)?;
            debug_assert_eq!(end, buf.len());
        } else {
            let span = spans[i];
            buf.extend_from_slice(&original[span.start..span.end]);
        }
    }
    Ok(buf)
}
