//! Fixed-width row encoding: every column occupies a constant number of
//! bytes (a null flag plus `SqlType::fixed_width()`), so a row's encoded
//! length depends only on its schema — never on the data. This is what
//! lets [`crate::update_in_place`] overwrite a slot's bytes without
//! touching slot boundaries.

use common::{BeeDbError, BeeDbResult};
use types::{SqlType, Value};

/// Encoded length of a single column: one null-flag byte plus its payload.
fn column_width(ty: SqlType) -> usize {
    1 + ty.fixed_width()
}

/// Total encoded length of a row under `schema`.
pub fn encoded_row_len(schema: &[SqlType]) -> usize {
    schema.iter().copied().map(column_width).sum()
}

pub fn encode_row(schema: &[SqlType], row: &[Value]) -> BeeDbResult<Vec<u8>> {
    if row.len() != schema.len() {
        return Err(BeeDbError::Schema(format!(
            "row has {} values but schema has {} columns",
            row.len(),
            schema.len()
        )));
    }
    let mut out = Vec::with_capacity(encoded_row_len(schema));
    for (ty, value) in schema.iter().zip(row) {
        encode_column(*ty, value, &mut out)?;
    }
    Ok(out)
}

fn encode_column(ty: SqlType, value: &Value, out: &mut Vec<u8>) -> BeeDbResult<()> {
    if matches!(value, Value::Null) {
        out.push(0);
        out.resize(out.len() + ty.fixed_width(), 0);
        return Ok(());
    }
    out.push(1);
    match (ty, value) {
        (SqlType::Int32, Value::Int32(v)) => out.extend_from_slice(&v.to_le_bytes()),
        (SqlType::Int64, Value::Int64(v)) => out.extend_from_slice(&v.to_le_bytes()),
        (SqlType::Double, Value::Double(v)) => out.extend_from_slice(&v.to_le_bytes()),
        (SqlType::Date, Value::Date(v)) => out.extend_from_slice(&v.to_le_bytes()),
        (SqlType::Bool, Value::Bool(v)) => out.push(*v as u8),
        (SqlType::Char(n), Value::Char(s)) => {
            let width = n as usize;
            let bytes = s.as_bytes();
            if bytes.len() > width {
                return Err(BeeDbError::Constraint(format!(
                    "value '{s}' exceeds CHAR({n}) width"
                )));
            }
            out.extend_from_slice(bytes);
            out.resize(out.len() + (width - bytes.len()), 0);
        }
        (ty, value) => {
            return Err(BeeDbError::Schema(format!(
                "value {value:?} does not match column type {ty:?}"
            )))
        }
    }
    Ok(())
}

pub fn decode_row(schema: &[SqlType], bytes: &[u8]) -> BeeDbResult<Vec<Value>> {
    let mut values = Vec::with_capacity(schema.len());
    let mut cursor = 0usize;
    for ty in schema {
        let width = column_width(*ty);
        let slice = bytes.get(cursor..cursor + width).ok_or_else(|| {
            BeeDbError::InvariantViolation("row buffer shorter than schema demands".into())
        })?;
        let is_present = slice[0] != 0;
        let payload = &slice[1..];
        let value = if !is_present {
            Value::Null
        } else {
            match ty {
                SqlType::Int32 => Value::Int32(i32::from_le_bytes(payload.try_into().unwrap())),
                SqlType::Int64 => Value::Int64(i64::from_le_bytes(payload.try_into().unwrap())),
                SqlType::Double => Value::Double(f64::from_le_bytes(payload.try_into().unwrap())),
                SqlType::Date => Value::Date(i32::from_le_bytes(payload.try_into().unwrap())),
                SqlType::Bool => Value::Bool(payload[0] != 0),
                SqlType::Char(_) => {
                    let end = payload.iter().position(|b| *b == 0).unwrap_or(payload.len());
                    let s = std::str::from_utf8(&payload[..end])
                        .map_err(|e| BeeDbError::InvariantViolation(format!("invalid utf8 in CHAR column: {e}")))?;
                    Value::Char(s.to_string())
                }
            }
        };
        values.push(value);
        cursor += width;
    }
    Ok(values)
}
