//! dBASE III attribute table.

use std::collections::BTreeMap;

use byteorder::{ByteOrder, LittleEndian};

use crate::vector::AttributeValue;

pub(super) const FIELD_TERMINATOR: u8 = 0x0D;
pub(super) const END_OF_FILE: u8 = 0x1A;
pub(super) const DESCRIPTOR_LEN: usize = 32;

/// dBASE field type code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Character,
    Numeric,
    Float,
    Logical,
    Date,
    Other(u8),
}

impl FieldKind {
    pub fn from_code(code: u8) -> Self {
        match code {
            b'C' => FieldKind::Character,
            b'N' => FieldKind::Numeric,
            b'F' => FieldKind::Float,
            b'L' => FieldKind::Logical,
            b'D' => FieldKind::Date,
            other => FieldKind::Other(other),
        }
    }

    pub fn code(self) -> u8 {
        match self {
            FieldKind::Character => b'C',
            FieldKind::Numeric => b'N',
            FieldKind::Float => b'F',
            FieldKind::Logical => b'L',
            FieldKind::Date => b'D',
            FieldKind::Other(c) => c,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DbfField {
    pub name: String,
    pub kind: FieldKind,
    pub length: u8,
    pub decimals: u8,
}

pub(super) type Record = BTreeMap<String, AttributeValue>;

pub(super) struct Table {
    pub fields: Vec<DbfField>,
    /// `None` for rows flagged as deleted
    pub records: Vec<Option<Record>>,
}

/// dBASE text is nominally code-page encoded; accept UTF-8 and fall back to Latin-1.
fn decode_text(raw: &[u8]) -> String {
    match std::str::from_utf8(raw) {
        Ok(s) => s.to_string(),
        Err(_) => raw.iter().map(|&b| b as char).collect(),
    }
}

pub(super) fn read_table(data: &[u8]) -> Result<Table, String> {
    if data.len() < DESCRIPTOR_LEN {
        return Err("dbf header truncated".into());
    }
    let n_records = LittleEndian::read_u32(&data[4..8]) as usize;
    let header_len = LittleEndian::read_u16(&data[8..10]) as usize;
    let record_len = LittleEndian::read_u16(&data[10..12]) as usize;

    let mut fields = Vec::new();
    let mut pos = DESCRIPTOR_LEN;
    while pos + DESCRIPTOR_LEN <= header_len.min(data.len()) && data[pos] != FIELD_TERMINATOR {
        let d = &data[pos..pos + DESCRIPTOR_LEN];
        let name_end = d[..11].iter().position(|&b| b == 0).unwrap_or(11);
        fields.push(DbfField {
            name: decode_text(&d[..name_end]).trim().to_string(),
            kind: FieldKind::from_code(d[11]),
            length: d[16],
            decimals: d[17],
        });
        pos += DESCRIPTOR_LEN;
    }

    let expected: usize = 1 + fields.iter().map(|f| f.length as usize).sum::<usize>();
    if record_len < expected {
        return Err(format!("record length {record_len} shorter than fields ({expected})"));
    }

    let mut records = Vec::with_capacity(n_records);
    for i in 0..n_records {
        let start = header_len + i * record_len;
        let row = data
            .get(start..start + record_len)
            .ok_or_else(|| format!("dbf truncated at record {i}"))?;
        if row[0] == b'*' {
            records.push(None);
            continue;
        }
        let mut record = Record::new();
        let mut offset = 1;
        for field in &fields {
            let raw = &row[offset..offset + field.length as usize];
            record.insert(field.name.clone(), parse_value(field, raw));
            offset += field.length as usize;
        }
        records.push(Some(record));
    }

    Ok(Table { fields, records })
}

fn parse_value(field: &DbfField, raw: &[u8]) -> AttributeValue {
    let text = decode_text(raw);
    let text = text.trim_matches(|c: char| c == ' ' || c == '\0');
    if text.is_empty() {
        return AttributeValue::Null;
    }
    match field.kind {
        FieldKind::Numeric | FieldKind::Float => {
            if text.starts_with('*') {
                return AttributeValue::Null;
            }
            if field.decimals == 0 {
                if let Ok(i) = text.parse::<i64>() {
                    return AttributeValue::Int(i);
                }
            }
            text.parse::<f64>().map(AttributeValue::Float).unwrap_or(AttributeValue::Null)
        }
        FieldKind::Logical => match text.chars().next() {
            Some('T' | 't' | 'Y' | 'y') => AttributeValue::Bool(true),
            Some('F' | 'f' | 'N' | 'n') => AttributeValue::Bool(false),
            _ => AttributeValue::Null,
        },
        _ => AttributeValue::String(text.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field(kind: FieldKind, length: u8, decimals: u8) -> DbfField {
        DbfField { name: "F".into(), kind, length, decimals }
    }

    #[test]
    fn numeric_parsing() {
        let n0 = field(FieldKind::Numeric, 10, 0);
        let n3 = field(FieldKind::Numeric, 10, 3);
        assert_eq!(parse_value(&n0, b"        42"), AttributeValue::Int(42));
        assert_eq!(parse_value(&n3, b"    12.500"), AttributeValue::Float(12.5));
        assert_eq!(parse_value(&n3, b"          "), AttributeValue::Null);
        assert_eq!(parse_value(&n3, b"**********"), AttributeValue::Null);
        assert_eq!(parse_value(&n3, b"   n/a    "), AttributeValue::Null);
    }

    #[test]
    fn text_and_logical_parsing() {
        let c = field(FieldKind::Character, 8, 0);
        let l = field(FieldKind::Logical, 1, 0);
        assert_eq!(parse_value(&c, b"Pantai  "), AttributeValue::from("Pantai"));
        assert_eq!(parse_value(&c, &[0xC9, b'l', b'e', b' ']), AttributeValue::from("\u{c9}le"));
        assert_eq!(parse_value(&l, b"T"), AttributeValue::Bool(true));
        assert_eq!(parse_value(&l, b"?"), AttributeValue::Null);
    }
}
