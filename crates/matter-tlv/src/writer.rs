//! Canonical TLV writer. Canonical form (Matter core spec §3.8.1) means
//! every integer and length field uses the narrowest representation that
//! fits the value — this writer always picks that representation itself
//! rather than trusting the caller to pick a width.

use crate::element::ElementType;
use crate::error::{Result, TlvError};
use crate::tag::Tag;

pub struct TlvWriter {
    buf: Vec<u8>,
    /// Count of open containers, used only to catch programmer error
    /// (an unbalanced `end_container` call) before the message goes out.
    depth: u32,
}

impl Default for TlvWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl TlvWriter {
    pub fn new() -> Self {
        Self { buf: Vec::new(), depth: 0 }
    }

    pub fn into_bytes(self) -> Result<Vec<u8>> {
        if self.depth != 0 {
            return Err(TlvError::ExpectedContainerEnd);
        }
        Ok(self.buf)
    }

    fn write_control_and_tag(&mut self, tag: Tag, element_type: u8) {
        let control = (tag.control() << 5) | element_type;
        self.buf.push(control);
        match tag {
            Tag::Anonymous => {}
            Tag::Context(t) => self.buf.push(t),
            Tag::CommonProfile16(t) | Tag::Implicit16(t) => self.buf.extend_from_slice(&t.to_le_bytes()),
            Tag::CommonProfile32(t) | Tag::Implicit32(t) => self.buf.extend_from_slice(&t.to_le_bytes()),
            Tag::FullyQualified48 { vendor, profile, tag } => {
                self.buf.extend_from_slice(&vendor.to_le_bytes());
                self.buf.extend_from_slice(&profile.to_le_bytes());
                self.buf.extend_from_slice(&tag.to_le_bytes());
            }
            Tag::FullyQualified64 { vendor, profile, tag } => {
                self.buf.extend_from_slice(&vendor.to_le_bytes());
                self.buf.extend_from_slice(&profile.to_le_bytes());
                self.buf.extend_from_slice(&tag.to_le_bytes());
            }
        }
    }

    pub fn put_bool(&mut self, tag: Tag, v: bool) -> Result<()> {
        let et = if v { ElementType::BooleanTrue } else { ElementType::BooleanFalse };
        self.write_control_and_tag(tag, et.to_byte());
        Ok(())
    }

    pub fn put_null(&mut self, tag: Tag) -> Result<()> {
        self.write_control_and_tag(tag, ElementType::Null.to_byte());
        Ok(())
    }

    /// Unsigned integer, canonical minimal width.
    pub fn put_uint(&mut self, tag: Tag, value: u64) -> Result<()> {
        if value <= u8::MAX as u64 {
            self.write_control_and_tag(tag, ElementType::UInt8.to_byte());
            self.buf.push(value as u8);
        } else if value <= u16::MAX as u64 {
            self.write_control_and_tag(tag, ElementType::UInt16.to_byte());
            self.buf.extend_from_slice(&(value as u16).to_le_bytes());
        } else if value <= u32::MAX as u64 {
            self.write_control_and_tag(tag, ElementType::UInt32.to_byte());
            self.buf.extend_from_slice(&(value as u32).to_le_bytes());
        } else {
            self.write_control_and_tag(tag, ElementType::UInt64.to_byte());
            self.buf.extend_from_slice(&value.to_le_bytes());
        }
        Ok(())
    }

    /// Signed integer, canonical minimal width.
    pub fn put_int(&mut self, tag: Tag, value: i64) -> Result<()> {
        if value >= i8::MIN as i64 && value <= i8::MAX as i64 {
            self.write_control_and_tag(tag, ElementType::Int8.to_byte());
            self.buf.push(value as i8 as u8);
        } else if value >= i16::MIN as i64 && value <= i16::MAX as i64 {
            self.write_control_and_tag(tag, ElementType::Int16.to_byte());
            self.buf.extend_from_slice(&(value as i16).to_le_bytes());
        } else if value >= i32::MIN as i64 && value <= i32::MAX as i64 {
            self.write_control_and_tag(tag, ElementType::Int32.to_byte());
            self.buf.extend_from_slice(&(value as i32).to_le_bytes());
        } else {
            self.write_control_and_tag(tag, ElementType::Int64.to_byte());
            self.buf.extend_from_slice(&value.to_le_bytes());
        }
        Ok(())
    }

    pub fn put_octet_string(&mut self, tag: Tag, data: &[u8]) -> Result<()> {
        let (et, len_bytes) = Self::length_element(
            data.len(),
            [
                ElementType::OctetString1,
                ElementType::OctetString2,
                ElementType::OctetString4,
                ElementType::OctetString8,
            ],
        )?;
        self.write_control_and_tag(tag, et.to_byte());
        self.buf.extend_from_slice(&len_bytes);
        self.buf.extend_from_slice(data);
        Ok(())
    }

    pub fn put_utf8_string(&mut self, tag: Tag, s: &str) -> Result<()> {
        let (et, len_bytes) = Self::length_element(
            s.len(),
            [
                ElementType::Utf8String1,
                ElementType::Utf8String2,
                ElementType::Utf8String4,
                ElementType::Utf8String8,
            ],
        )?;
        self.write_control_and_tag(tag, et.to_byte());
        self.buf.extend_from_slice(&len_bytes);
        self.buf.extend_from_slice(s.as_bytes());
        Ok(())
    }

    fn length_element(len: usize, widths: [ElementType; 4]) -> Result<(ElementType, Vec<u8>)> {
        if len <= u8::MAX as usize {
            Ok((widths[0], vec![len as u8]))
        } else if len <= u16::MAX as usize {
            Ok((widths[1], (len as u16).to_le_bytes().to_vec()))
        } else if len <= u32::MAX as usize {
            Ok((widths[2], (len as u32).to_le_bytes().to_vec()))
        } else {
            Ok((widths[3], (len as u64).to_le_bytes().to_vec()))
        }
    }

    pub fn start_struct(&mut self, tag: Tag) -> Result<()> {
        self.write_control_and_tag(tag, ElementType::Structure.to_byte());
        self.depth += 1;
        Ok(())
    }

    pub fn start_array(&mut self, tag: Tag) -> Result<()> {
        self.write_control_and_tag(tag, ElementType::Array.to_byte());
        self.depth += 1;
        Ok(())
    }

    pub fn start_list(&mut self, tag: Tag) -> Result<()> {
        self.write_control_and_tag(tag, ElementType::List.to_byte());
        self.depth += 1;
        Ok(())
    }

    pub fn end_container(&mut self) -> Result<()> {
        if self.depth == 0 {
            return Err(TlvError::ExpectedContainerEnd);
        }
        self.write_control_and_tag(Tag::Anonymous, ElementType::EndOfContainer.to_byte());
        self.depth -= 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_uint_picks_narrowest_width() {
        let mut w = TlvWriter::new();
        w.put_uint(Tag::Context(1), 5).unwrap();
        let bytes = w.into_bytes().unwrap();
        // control byte: tag_control=1 (context) << 5 | UInt8 (0x04) = 0x24
        assert_eq!(bytes, vec![0x24, 0x01, 0x05]);
    }

    #[test]
    fn struct_roundtrip_depth_must_balance() {
        let mut w = TlvWriter::new();
        w.start_struct(Tag::Anonymous).unwrap();
        w.put_uint(Tag::Context(0), 1).unwrap();
        assert!(w.into_bytes().is_err());
    }

    #[test]
    fn balanced_struct_serializes() {
        let mut w = TlvWriter::new();
        w.start_struct(Tag::Anonymous).unwrap();
        w.put_uint(Tag::Context(0), 1).unwrap();
        w.end_container().unwrap();
        assert!(w.into_bytes().is_ok());
    }
}
