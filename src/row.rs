//! Decoding of resultset row fields.
//!
//! Each field of a `Mysqlx.Resultset.Row` is an opaque byte cell whose
//! interpretation depends on the column type; a zero-length cell is NULL.

use prost::bytes::Buf;

use crate::error::{Error, Result, code};
use crate::protocol::result::{Column, ColumnType};

/// DATE/DATETIME/TIMESTAMP parts. `has_time` is false for plain dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Datetime {
    pub year: u16,
    pub month: u8,
    pub day: u8,
    pub hour: u8,
    pub minutes: u8,
    pub seconds: u8,
    pub useconds: u32,
    pub has_time: bool,
}

/// TIME value; hours are unbounded (MySQL allows up to 838).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Time {
    pub negative: bool,
    pub hour: u32,
    pub minutes: u8,
    pub seconds: u8,
    pub useconds: u32,
}

/// One decoded field.
#[derive(Debug, Clone, PartialEq)]
pub enum Value<'a> {
    Null,
    SignedInt(i64),
    UnsignedInt(u64),
    Float(f32),
    Double(f64),
    /// BYTES/ENUM cell with valid UTF-8 content.
    String(&'a str),
    /// BYTES cell with non-UTF-8 content.
    Octets(&'a [u8]),
    Time(Time),
    Datetime(Datetime),
    Decimal(String),
    Set(Vec<&'a [u8]>),
    Bit(u64),
}

impl<'a> Value<'a> {
    /// Decode one row cell according to its column metadata.
    ///
    /// `datetime_length_discriminator` is the column length up to which a
    /// DATETIME column carries only a date.
    pub fn parse(
        column: &Column,
        data: &'a [u8],
        datetime_length_discriminator: u32,
    ) -> Result<Self> {
        if data.is_empty() {
            return Ok(Value::Null);
        }

        match column.column_type {
            ColumnType::Sint => {
                let raw = read_varint(&mut &data[..])?;
                Ok(Value::SignedInt(zigzag(raw)))
            }
            ColumnType::Uint => Ok(Value::UnsignedInt(read_varint(&mut &data[..])?)),
            ColumnType::Bit => Ok(Value::Bit(read_varint(&mut &data[..])?)),
            ColumnType::Double => {
                let bytes: [u8; 8] = data.try_into().map_err(|_| truncated())?;
                Ok(Value::Double(f64::from_le_bytes(bytes)))
            }
            ColumnType::Float => {
                let bytes: [u8; 4] = data.try_into().map_err(|_| truncated())?;
                Ok(Value::Float(f32::from_le_bytes(bytes)))
            }
            ColumnType::Bytes | ColumnType::Enum => parse_bytes(data),
            ColumnType::Time => parse_time(data),
            ColumnType::Datetime => {
                parse_datetime(data, column.length <= datetime_length_discriminator)
            }
            ColumnType::Decimal => parse_decimal(data),
            ColumnType::Set => parse_set(data),
        }
    }
}

fn truncated() -> Error {
    Error::new(code::MALFORMED_PACKET, "Truncated row field")
}

fn read_varint(data: &mut &[u8]) -> Result<u64> {
    prost::encoding::decode_varint(data).map_err(|_| truncated())
}

fn zigzag(raw: u64) -> i64 {
    ((raw >> 1) as i64) ^ -((raw & 1) as i64)
}

/// String cells carry a trailing NUL so that empty strings stay distinct
/// from NULL cells.
fn parse_bytes(data: &[u8]) -> Result<Value<'_>> {
    let (content, terminator) = data.split_at(data.len() - 1);
    if terminator != [0] {
        return Err(Error::new(
            code::MALFORMED_PACKET,
            "String field is not null terminated",
        ));
    }
    Ok(match simdutf8::basic::from_utf8(content) {
        Ok(text) => Value::String(text),
        Err(_) => Value::Octets(content),
    })
}

fn parse_time(data: &[u8]) -> Result<Value<'static>> {
    let mut rest = &data[..];
    let negative = match rest.get_u8() {
        0x00 => false,
        0x01 => true,
        _ => {
            return Err(Error::new(code::MALFORMED_PACKET, "Invalid TIME sign byte"));
        }
    };

    let mut time = Time {
        negative,
        ..Time::default()
    };
    if !rest.is_empty() {
        time.hour = read_varint(&mut rest)? as u32;
    }
    if !rest.is_empty() {
        time.minutes = read_varint(&mut rest)? as u8;
    }
    if !rest.is_empty() {
        time.seconds = read_varint(&mut rest)? as u8;
    }
    if !rest.is_empty() {
        time.useconds = read_varint(&mut rest)? as u32;
    }
    Ok(Value::Time(time))
}

fn parse_datetime(data: &[u8], date_only_column: bool) -> Result<Value<'static>> {
    let mut rest = &data[..];
    let mut datetime = Datetime {
        year: read_varint(&mut rest)? as u16,
        month: read_varint(&mut rest)? as u8,
        day: read_varint(&mut rest)? as u8,
        ..Datetime::default()
    };

    if !date_only_column {
        datetime.has_time = !rest.is_empty();
        if !rest.is_empty() {
            datetime.hour = read_varint(&mut rest)? as u8;
        }
        if !rest.is_empty() {
            datetime.minutes = read_varint(&mut rest)? as u8;
        }
        if !rest.is_empty() {
            datetime.seconds = read_varint(&mut rest)? as u8;
        }
        if !rest.is_empty() {
            datetime.useconds = read_varint(&mut rest)? as u32;
        }
    }
    Ok(Value::Datetime(datetime))
}

/// Decimals: one scale byte, then packed BCD digits closed by a sign
/// nibble (0xC positive, 0xD negative), optionally padded with 0x0.
fn parse_decimal(data: &[u8]) -> Result<Value<'static>> {
    let (scale, digits) = data.split_first().ok_or_else(truncated)?;

    let mut text = String::with_capacity(digits.len() * 2 + 2);
    let mut sign = None;
    'bytes: for byte in digits {
        for nibble in [byte >> 4, byte & 0x0F] {
            match nibble {
                0x0..=0x9 => text.push(char::from(b'0' + nibble)),
                0xC => sign = Some('+'),
                0xD => sign = Some('-'),
                _ => {
                    return Err(Error::new(
                        code::MALFORMED_PACKET,
                        "Invalid decimal nibble",
                    ));
                }
            }
            if sign.is_some() {
                break 'bytes;
            }
        }
    }
    let Some(sign) = sign else {
        return Err(Error::new(
            code::MALFORMED_PACKET,
            "Decimal field has no sign nibble",
        ));
    };

    let scale = usize::from(*scale);
    if scale > text.len() {
        return Err(Error::new(code::MALFORMED_PACKET, "Invalid decimal scale"));
    }
    let point = text.len() - scale;
    let mut out = String::with_capacity(text.len() + 2);
    if sign == '-' {
        out.push('-');
    }
    if point == 0 {
        out.push('0');
    } else {
        out.push_str(&text[..point]);
    }
    if scale > 0 {
        out.push('.');
        out.push_str(&text[point..]);
    }
    Ok(Value::Decimal(out))
}

fn parse_set(data: &[u8]) -> Result<Value<'_>> {
    // A single 0x01 byte encodes the empty set.
    if data == [0x01] {
        return Ok(Value::Set(Vec::new()));
    }

    let mut members = Vec::new();
    let mut rest = &data[..];
    while !rest.is_empty() {
        let len = read_varint(&mut rest)? as usize;
        if rest.len() < len {
            return Err(truncated());
        }
        let (member, tail) = rest.split_at(len);
        members.push(member);
        rest = tail;
    }
    Ok(Value::Set(members))
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constant::ColumnFlags;

    fn column(column_type: ColumnType) -> Column {
        Column {
            column_type,
            name: "c".to_string(),
            original_name: String::new(),
            table: String::new(),
            original_table: String::new(),
            schema: String::new(),
            catalog: String::new(),
            collation: 0,
            fractional_digits: 0,
            length: 20,
            flags: ColumnFlags::empty(),
            content_type: None,
        }
    }

    #[test]
    fn empty_cell_is_null() {
        let value = Value::parse(&column(ColumnType::Sint), &[], 10).unwrap();
        assert_eq!(value, Value::Null);
    }

    #[test]
    fn sint_is_zigzag_varint() {
        // zigzag(-1) = 1, zigzag(1) = 2
        let value = Value::parse(&column(ColumnType::Sint), &[0x01], 10).unwrap();
        assert_eq!(value, Value::SignedInt(-1));
        let value = Value::parse(&column(ColumnType::Sint), &[0x02], 10).unwrap();
        assert_eq!(value, Value::SignedInt(1));
        // -300 zigzags to 599, varint [0xD7, 0x04]
        let value = Value::parse(&column(ColumnType::Sint), &[0xD7, 0x04], 10).unwrap();
        assert_eq!(value, Value::SignedInt(-300));
    }

    #[test]
    fn uint_is_plain_varint() {
        let value = Value::parse(&column(ColumnType::Uint), &[0xAC, 0x02], 10).unwrap();
        assert_eq!(value, Value::UnsignedInt(300));
    }

    #[test]
    fn bytes_strip_the_trailing_nul() {
        let value = Value::parse(&column(ColumnType::Bytes), b"abc\0", 10).unwrap();
        assert_eq!(value, Value::String("abc"));

        // Empty string is one NUL byte, distinct from NULL.
        let value = Value::parse(&column(ColumnType::Bytes), &[0], 10).unwrap();
        assert_eq!(value, Value::String(""));

        let err = Value::parse(&column(ColumnType::Bytes), b"abc", 10).unwrap_err();
        assert_eq!(err.code, crate::error::code::MALFORMED_PACKET);
    }

    #[test]
    fn float_and_double_are_little_endian() {
        let double_bytes = 2.5_f64.to_le_bytes();
        let value = Value::parse(&column(ColumnType::Double), &double_bytes, 10).unwrap();
        assert_eq!(value, Value::Double(2.5));
        let float_bytes = 1.5_f32.to_le_bytes();
        let value = Value::parse(&column(ColumnType::Float), &float_bytes, 10).unwrap();
        assert_eq!(value, Value::Float(1.5));
    }

    #[test]
    fn time_sign_and_parts() {
        // -01:02:03
        let value = Value::parse(&column(ColumnType::Time), &[0x01, 1, 2, 3], 10).unwrap();
        assert_eq!(
            value,
            Value::Time(Time {
                negative: true,
                hour: 1,
                minutes: 2,
                seconds: 3,
                useconds: 0,
            })
        );
    }

    #[test]
    fn datetime_honours_the_length_discriminator() {
        // year=2024 (varint [0xE8, 0x0F]), month=2, day=29
        let date_bytes = [0xE8, 0x0F, 2, 29];

        let mut date_column = column(ColumnType::Datetime);
        date_column.length = 10;
        let value = Value::parse(&date_column, &date_bytes, 10).unwrap();
        let Value::Datetime(date) = value else {
            panic!("expected datetime");
        };
        assert_eq!((date.year, date.month, date.day), (2024, 2, 29));
        assert!(!date.has_time);

        let mut datetime_column = column(ColumnType::Datetime);
        datetime_column.length = 19;
        let bytes = [0xE8, 0x0F, 2, 29, 13, 37, 59];
        let Value::Datetime(dt) = Value::parse(&datetime_column, &bytes, 10).unwrap() else {
            panic!("expected datetime");
        };
        assert!(dt.has_time);
        assert_eq!((dt.hour, dt.minutes, dt.seconds), (13, 37, 59));
    }

    #[test]
    fn decimal_bcd() {
        // scale 2, digits 1234.56, positive: nibbles 1,2,3,4,5,6,+pad
        let value =
            Value::parse(&column(ColumnType::Decimal), &[2, 0x12, 0x34, 0x56, 0xC0], 10)
                .unwrap();
        assert_eq!(value, Value::Decimal("1234.56".to_string()));

        // scale 1, -3.5: nibbles 3,5, sign D
        let value = Value::parse(&column(ColumnType::Decimal), &[1, 0x35, 0xD0], 10).unwrap();
        assert_eq!(value, Value::Decimal("-3.5".to_string()));
    }

    #[test]
    fn set_members() {
        // "a", "bc"
        let value =
            Value::parse(&column(ColumnType::Set), &[1, b'a', 2, b'b', b'c'], 10).unwrap();
        assert_eq!(value, Value::Set(vec![&b"a"[..], &b"bc"[..]]));

        let value = Value::parse(&column(ColumnType::Set), &[0x01], 10).unwrap();
        assert_eq!(value, Value::Set(Vec::new()));
    }
}
