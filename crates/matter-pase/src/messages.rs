//! PASE wire messages (spec §4.3 / §5.1), TLV-framed.

use matter_tlv::{Tag, TlvReader, TlvWriter};

use crate::error::{PaseError, Result};

pub mod opcode {
    pub const PBKDF_PARAM_REQUEST: u8 = 0x20;
    pub const PBKDF_PARAM_RESPONSE: u8 = 0x21;
    pub const PAKE1: u8 = 0x22;
    pub const PAKE2: u8 = 0x23;
    pub const PAKE3: u8 = 0x24;
    pub const STATUS_REPORT: u8 = 0x40;
}

#[derive(Debug, Clone)]
pub struct PbkdfParamRequest {
    pub initiator_random: [u8; 32],
    pub initiator_session_id: u16,
    pub passcode_id: u16,
    pub has_pbkdf_params: bool,
}

impl PbkdfParamRequest {
    pub fn encode(&self) -> Result<Vec<u8>> {
        let mut w = TlvWriter::new();
        w.start_struct(Tag::Anonymous)?;
        w.put_octet_string(Tag::Context(1), &self.initiator_random)?;
        w.put_uint(Tag::Context(2), self.initiator_session_id as u64)?;
        w.put_uint(Tag::Context(3), self.passcode_id as u64)?;
        w.put_bool(Tag::Context(4), self.has_pbkdf_params)?;
        w.end_container()?;
        Ok(w.into_bytes()?)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let mut r = TlvReader::new(bytes);
        r.next()?; // struct start
        let initiator_random = r.next()?.ok_or(matter_tlv::TlvError::UnexpectedEof)?.as_octet_string()?.try_into()
            .map_err(|_| matter_tlv::TlvError::LengthMismatch)?;
        let initiator_session_id = r.next()?.ok_or(matter_tlv::TlvError::UnexpectedEof)?.as_uint()? as u16;
        let passcode_id = r.next()?.ok_or(matter_tlv::TlvError::UnexpectedEof)?.as_uint()? as u16;
        let has_pbkdf_params = r.next()?.ok_or(matter_tlv::TlvError::UnexpectedEof)?.as_bool()?;
        Ok(Self { initiator_random, initiator_session_id, passcode_id, has_pbkdf_params })
    }
}

#[derive(Debug, Clone)]
pub struct PbkdfParams {
    pub iterations: u32,
    pub salt: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct PbkdfParamResponse {
    pub initiator_random: [u8; 32],
    pub responder_random: [u8; 32],
    pub responder_session_id: u16,
    pub pbkdf_params: Option<PbkdfParams>,
}

impl PbkdfParamResponse {
    pub fn encode(&self) -> Result<Vec<u8>> {
        let mut w = TlvWriter::new();
        w.start_struct(Tag::Anonymous)?;
        w.put_octet_string(Tag::Context(1), &self.initiator_random)?;
        w.put_octet_string(Tag::Context(2), &self.responder_random)?;
        w.put_uint(Tag::Context(3), self.responder_session_id as u64)?;
        if let Some(params) = &self.pbkdf_params {
            w.start_struct(Tag::Context(4))?;
            w.put_uint(Tag::Context(1), params.iterations as u64)?;
            w.put_octet_string(Tag::Context(2), &params.salt)?;
            w.end_container()?;
        }
        w.end_container()?;
        Ok(w.into_bytes()?)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let mut r = TlvReader::new(bytes);
        r.next()?;
        let initiator_random = r.next()?.ok_or(matter_tlv::TlvError::UnexpectedEof)?.as_octet_string()?.try_into()
            .map_err(|_| matter_tlv::TlvError::LengthMismatch)?;
        let responder_random = r.next()?.ok_or(matter_tlv::TlvError::UnexpectedEof)?.as_octet_string()?.try_into()
            .map_err(|_| matter_tlv::TlvError::LengthMismatch)?;
        let responder_session_id = r.next()?.ok_or(matter_tlv::TlvError::UnexpectedEof)?.as_uint()? as u16;

        let mut pbkdf_params = None;
        if let Some(next) = r.next()? {
            if next.is_container_start() {
                let iterations = r.next()?.ok_or(matter_tlv::TlvError::UnexpectedEof)?.as_uint()? as u32;
                let salt = r.next()?.ok_or(matter_tlv::TlvError::UnexpectedEof)?.as_octet_string()?.to_vec();
                r.next()?; // inner struct end
                pbkdf_params = Some(PbkdfParams { iterations, salt });
            }
        }
        Ok(Self { initiator_random, responder_random, responder_session_id, pbkdf_params })
    }
}

#[derive(Debug, Clone)]
pub struct Pake1 {
    pub p_a: [u8; 65],
}

impl Pake1 {
    pub fn encode(&self) -> Result<Vec<u8>> {
        let mut w = TlvWriter::new();
        w.start_struct(Tag::Anonymous)?;
        w.put_octet_string(Tag::Context(1), &self.p_a)?;
        w.end_container()?;
        Ok(w.into_bytes()?)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let mut r = TlvReader::new(bytes);
        r.next()?;
        let p_a = r.next()?.ok_or(matter_tlv::TlvError::UnexpectedEof)?.as_octet_string()?.try_into()
            .map_err(|_| matter_tlv::TlvError::LengthMismatch)?;
        Ok(Self { p_a })
    }
}

#[derive(Debug, Clone)]
pub struct Pake2 {
    pub p_b: [u8; 65],
    pub c_b: [u8; 32],
}

impl Pake2 {
    pub fn encode(&self) -> Result<Vec<u8>> {
        let mut w = TlvWriter::new();
        w.start_struct(Tag::Anonymous)?;
        w.put_octet_string(Tag::Context(1), &self.p_b)?;
        w.put_octet_string(Tag::Context(2), &self.c_b)?;
        w.end_container()?;
        Ok(w.into_bytes()?)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let mut r = TlvReader::new(bytes);
        r.next()?;
        let p_b = r.next()?.ok_or(matter_tlv::TlvError::UnexpectedEof)?.as_octet_string()?.try_into()
            .map_err(|_| matter_tlv::TlvError::LengthMismatch)?;
        let c_b = r.next()?.ok_or(matter_tlv::TlvError::UnexpectedEof)?.as_octet_string()?.try_into()
            .map_err(|_| matter_tlv::TlvError::LengthMismatch)?;
        Ok(Self { p_b, c_b })
    }
}

#[derive(Debug, Clone)]
pub struct Pake3 {
    pub c_a: [u8; 32],
}

impl Pake3 {
    pub fn encode(&self) -> Result<Vec<u8>> {
        let mut w = TlvWriter::new();
        w.start_struct(Tag::Anonymous)?;
        w.put_octet_string(Tag::Context(1), &self.c_a)?;
        w.end_container()?;
        Ok(w.into_bytes()?)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let mut r = TlvReader::new(bytes);
        r.next()?;
        let c_a = r.next()?.ok_or(matter_tlv::TlvError::UnexpectedEof)?.as_octet_string()?.try_into()
            .map_err(|_| matter_tlv::TlvError::LengthMismatch)?;
        Ok(Self { c_a })
    }
}

#[derive(Debug, Clone, Copy)]
pub struct StatusReport {
    pub general_code: u16,
    pub protocol_id: u32,
    pub protocol_code: u16,
}

impl StatusReport {
    pub const GENERAL_CODE_SUCCESS: u16 = 0x0000;
    pub const GENERAL_CODE_FAILURE: u16 = 0x0001;

    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(8);
        out.extend_from_slice(&self.general_code.to_le_bytes());
        out.extend_from_slice(&self.protocol_id.to_le_bytes());
        out.extend_from_slice(&self.protocol_code.to_le_bytes());
        out
    }

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < 8 {
            return Err(PaseError::Tlv(matter_tlv::TlvError::UnexpectedEof));
        }
        Ok(Self {
            general_code: u16::from_le_bytes([bytes[0], bytes[1]]),
            protocol_id: u32::from_le_bytes([bytes[2], bytes[3], bytes[4], bytes[5]]),
            protocol_code: u16::from_le_bytes([bytes[6], bytes[7]]),
        })
    }

    pub fn into_result(self) -> Result<()> {
        if self.general_code == Self::GENERAL_CODE_SUCCESS {
            Ok(())
        } else {
            Err(PaseError::PeerStatusReport { general_code: self.general_code, protocol_code: self.protocol_code })
        }
    }
}
