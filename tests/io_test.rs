#![allow(missing_docs)]

use mapcode::io::{BinaryReader, BinaryWriter};
use mapcode::{DataError, MapcodeError, StringEncoding};

#[test]
fn scalars_are_fixed_width_little_endian() -> mapcode::Result<()> {
    let mut buf = Vec::new();
    let mut w = BinaryWriter::new(&mut buf, StringEncoding::Utf8);
    w.write_bool(true)?;
    w.write_i32(2)?;
    w.write_f64(1.5)?;
    w.write_value(&0x0102u16)?;
    assert_eq!(w.written(), 15);
    assert_eq!(&buf[..5], &[1, 2, 0, 0, 0]);
    assert_eq!(&buf[13..], &[2, 1]);

    let mut r = BinaryReader::new(&buf, StringEncoding::Utf8);
    assert!(r.read_bool()?);
    assert_eq!(r.read_i32()?, 2);
    assert_eq!(r.read_f64()?, 1.5);
    assert_eq!(r.read_value::<u16>()?, 0x0102);
    assert_eq!(r.remaining(), 0);
    Ok(())
}

#[test]
fn utf8_strings_carry_a_byte_count() -> mapcode::Result<()> {
    let mut buf = Vec::new();
    BinaryWriter::new(&mut buf, StringEncoding::Utf8).write_string("hé")?;
    assert_eq!(buf, vec![3, 0, 0, 0, b'h', 0xC3, 0xA9]);

    let mut r = BinaryReader::new(&buf, StringEncoding::Utf8);
    assert_eq!(r.read_string()?, "hé");
    Ok(())
}

#[test]
fn utf16_strings_use_two_bytes_per_unit() -> mapcode::Result<()> {
    let mut buf = Vec::new();
    BinaryWriter::new(&mut buf, StringEncoding::Utf16Le).write_string("ab")?;
    assert_eq!(buf, vec![4, 0, 0, 0, b'a', 0, b'b', 0]);

    let mut r = BinaryReader::new(&buf, StringEncoding::Utf16Le);
    assert_eq!(r.read_string()?, "ab");
    Ok(())
}

#[test]
fn invalid_utf8_is_a_data_error() {
    let buf = [2, 0, 0, 0, 0xFF, 0xFE];
    let mut r = BinaryReader::new(&buf, StringEncoding::Utf8);
    let err = r.read_string().unwrap_err();
    assert!(err.is_data());
}

#[test]
fn oversized_length_is_rejected_before_allocation() {
    let buf = i32::MAX.to_le_bytes();
    let mut r = BinaryReader::new(&buf, StringEncoding::Utf8);
    let err = r.read_bytes().unwrap_err();
    assert!(err.is_data());
}

#[test]
fn negative_length_is_rejected() {
    let buf = (-1i32).to_le_bytes();
    let mut r = BinaryReader::new(&buf, StringEncoding::Utf8);
    assert!(matches!(
        r.read_len(1),
        Err(MapcodeError::Data(DataError::InvalidLength { length: -1, .. }))
    ));
}

#[test]
fn rewind_restores_the_cursor() -> mapcode::Result<()> {
    let buf = [1u8, 2, 3, 4];
    let mut r = BinaryReader::new(&buf, StringEncoding::Utf8);
    let start = r.position();
    assert_eq!(r.read_raw(3)?, vec![1, 2, 3]);
    r.rewind_to(start);
    assert_eq!(r.remaining(), 4);
    assert!(r.read_raw(5).is_err());
    Ok(())
}
