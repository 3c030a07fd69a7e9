//! CASE wire messages (spec §4.6), TLV-framed.

use matter_tlv::{Tag, TlvReader, TlvValue, TlvWriter};

use crate::error::{CaseError, Result};

pub mod opcode {
    pub const SIGMA1: u8 = 0x30;
    pub const SIGMA2: u8 = 0x31;
    pub const SIGMA3: u8 = 0x32;
    pub const SIGMA2_RESUME: u8 = 0x33;
    pub const STATUS_REPORT: u8 = 0x40;
}

#[derive(Debug, Clone)]
pub struct Sigma1 {
    pub initiator_random: [u8; 32],
    pub initiator_session_id: u16,
    pub destination_id: [u8; 32],
    pub initiator_eph_pub_key: [u8; 65],
    pub resumption: Option<ResumptionRequest>,
}

#[derive(Debug, Clone)]
pub struct ResumptionRequest {
    pub resumption_id: [u8; 16],
    pub initiator_resume_mic: [u8; 16],
}

impl Sigma1 {
    pub fn encode(&self) -> Result<Vec<u8>> {
        let mut w = TlvWriter::new();
        w.start_struct(Tag::Anonymous)?;
        w.put_octet_string(Tag::Context(1), &self.initiator_random)?;
        w.put_uint(Tag::Context(2), self.initiator_session_id as u64)?;
        w.put_octet_string(Tag::Context(3), &self.destination_id)?;
        w.put_octet_string(Tag::Context(4), &self.initiator_eph_pub_key)?;
        if let Some(resume) = &self.resumption {
            w.put_octet_string(Tag::Context(6), &resume.resumption_id)?;
            w.put_octet_string(Tag::Context(7), &resume.initiator_resume_mic)?;
        }
        w.end_container()?;
        Ok(w.into_bytes()?)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let mut r = TlvReader::new(bytes);
        r.next()?;
        let initiator_random = octets32(&mut r)?;
        let initiator_session_id = uint16(&mut r)?;
        let destination_id = octets32(&mut r)?;
        let initiator_eph_pub_key = octets65(&mut r)?;

        let mut resumption_id = None;
        let mut initiator_resume_mic = None;
        while let Some(next) = r.next()? {
            if next.value == TlvValue::EndOfContainer {
                break;
            }
            match next.tag {
                Tag::Context(6) => resumption_id = Some(into16(next.as_octet_string()?)?),
                Tag::Context(7) => initiator_resume_mic = Some(into16(next.as_octet_string()?)?),
                _ => {}
            }
        }
        let resumption = match (resumption_id, initiator_resume_mic) {
            (Some(resumption_id), Some(initiator_resume_mic)) => {
                Some(ResumptionRequest { resumption_id, initiator_resume_mic })
            }
            (None, None) => None,
            _ => return Err(CaseError::IncompleteResumptionFields),
        };

        Ok(Self {
            initiator_random,
            initiator_session_id,
            destination_id,
            initiator_eph_pub_key,
            resumption,
        })
    }
}

#[derive(Debug, Clone)]
pub struct Sigma2 {
    pub responder_random: [u8; 32],
    pub responder_session_id: u16,
    pub responder_eph_pub_key: [u8; 65],
    pub encrypted2: Vec<u8>,
}

impl Sigma2 {
    pub fn encode(&self) -> Result<Vec<u8>> {
        let mut w = TlvWriter::new();
        w.start_struct(Tag::Anonymous)?;
        w.put_octet_string(Tag::Context(1), &self.responder_random)?;
        w.put_uint(Tag::Context(2), self.responder_session_id as u64)?;
        w.put_octet_string(Tag::Context(3), &self.responder_eph_pub_key)?;
        w.put_octet_string(Tag::Context(4), &self.encrypted2)?;
        w.end_container()?;
        Ok(w.into_bytes()?)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let mut r = TlvReader::new(bytes);
        r.next()?;
        let responder_random = octets32(&mut r)?;
        let responder_session_id = uint16(&mut r)?;
        let responder_eph_pub_key = octets65(&mut r)?;
        let encrypted2 = r.next()?.ok_or(matter_tlv::TlvError::UnexpectedEof)?.as_octet_string()?.to_vec();
        Ok(Self { responder_random, responder_session_id, responder_eph_pub_key, encrypted2 })
    }
}

#[derive(Debug, Clone)]
pub struct Sigma2Resume {
    pub resumption_id: [u8; 16],
    pub resume2_mic: [u8; 16],
    pub responder_session_id: u16,
}

impl Sigma2Resume {
    pub fn encode(&self) -> Result<Vec<u8>> {
        let mut w = TlvWriter::new();
        w.start_struct(Tag::Anonymous)?;
        w.put_octet_string(Tag::Context(1), &self.resumption_id)?;
        w.put_octet_string(Tag::Context(2), &self.resume2_mic)?;
        w.put_uint(Tag::Context(3), self.responder_session_id as u64)?;
        w.end_container()?;
        Ok(w.into_bytes()?)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let mut r = TlvReader::new(bytes);
        r.next()?;
        let resumption_id = into16(r.next()?.ok_or(matter_tlv::TlvError::UnexpectedEof)?.as_octet_string()?)?;
        let resume2_mic = into16(r.next()?.ok_or(matter_tlv::TlvError::UnexpectedEof)?.as_octet_string()?)?;
        let responder_session_id = uint16(&mut r)?;
        Ok(Self { resumption_id, resume2_mic, responder_session_id })
    }
}

#[derive(Debug, Clone)]
pub struct Sigma3 {
    pub encrypted3: Vec<u8>,
}

impl Sigma3 {
    pub fn encode(&self) -> Result<Vec<u8>> {
        let mut w = TlvWriter::new();
        w.start_struct(Tag::Anonymous)?;
        w.put_octet_string(Tag::Context(1), &self.encrypted3)?;
        w.end_container()?;
        Ok(w.into_bytes()?)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let mut r = TlvReader::new(bytes);
        r.next()?;
        let encrypted3 = r.next()?.ok_or(matter_tlv::TlvError::UnexpectedEof)?.as_octet_string()?.to_vec();
        Ok(Self { encrypted3 })
    }
}

/// Plaintext sealed inside Sigma2's `Encrypted2` field (spec §4.6).
#[derive(Debug, Clone)]
pub struct Tbe2 {
    pub responder_noc: Vec<u8>,
    pub responder_icac: Option<Vec<u8>>,
    pub signature: [u8; 64],
    pub resumption_id: [u8; 16],
}

impl Tbe2 {
    pub fn encode(&self) -> Result<Vec<u8>> {
        let mut w = TlvWriter::new();
        w.start_struct(Tag::Anonymous)?;
        w.put_octet_string(Tag::Context(1), &self.responder_noc)?;
        if let Some(icac) = &self.responder_icac {
            w.put_octet_string(Tag::Context(2), icac)?;
        }
        w.put_octet_string(Tag::Context(3), &self.signature)?;
        w.put_octet_string(Tag::Context(4), &self.resumption_id)?;
        w.end_container()?;
        Ok(w.into_bytes()?)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let mut r = TlvReader::new(bytes);
        r.next()?;
        let responder_noc = r.next()?.ok_or(matter_tlv::TlvError::UnexpectedEof)?.as_octet_string()?.to_vec();
        let mut next = r.next()?.ok_or(matter_tlv::TlvError::UnexpectedEof)?;
        let mut responder_icac = None;
        if next.tag == Tag::Context(2) {
            responder_icac = Some(next.as_octet_string()?.to_vec());
            next = r.next()?.ok_or(matter_tlv::TlvError::UnexpectedEof)?;
        }
        let signature = into64(next.as_octet_string()?)?;
        let resumption_id = into16(r.next()?.ok_or(matter_tlv::TlvError::UnexpectedEof)?.as_octet_string()?)?;
        Ok(Self { responder_noc, responder_icac, signature, resumption_id })
    }
}

/// Plaintext sealed inside Sigma3's `Encrypted3` field (spec §4.6).
#[derive(Debug, Clone)]
pub struct Tbe3 {
    pub initiator_noc: Vec<u8>,
    pub initiator_icac: Option<Vec<u8>>,
    pub signature: [u8; 64],
}

impl Tbe3 {
    pub fn encode(&self) -> Result<Vec<u8>> {
        let mut w = TlvWriter::new();
        w.start_struct(Tag::Anonymous)?;
        w.put_octet_string(Tag::Context(1), &self.initiator_noc)?;
        if let Some(icac) = &self.initiator_icac {
            w.put_octet_string(Tag::Context(2), icac)?;
        }
        w.put_octet_string(Tag::Context(3), &self.signature)?;
        w.end_container()?;
        Ok(w.into_bytes()?)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let mut r = TlvReader::new(bytes);
        r.next()?;
        let initiator_noc = r.next()?.ok_or(matter_tlv::TlvError::UnexpectedEof)?.as_octet_string()?.to_vec();
        let mut next = r.next()?.ok_or(matter_tlv::TlvError::UnexpectedEof)?;
        let mut initiator_icac = None;
        if next.tag == Tag::Context(2) {
            initiator_icac = Some(next.as_octet_string()?.to_vec());
            next = r.next()?.ok_or(matter_tlv::TlvError::UnexpectedEof)?;
        }
        let signature = into64(next.as_octet_string()?)?;
        Ok(Self { initiator_noc, initiator_icac, signature })
    }
}

/// Builds TBSData2, the payload the responder signs (spec §4.6).
pub fn tbs_data2(
    responder_noc: &[u8],
    responder_icac: Option<&[u8]>,
    responder_eph_pub_key: &[u8; 65],
    initiator_eph_pub_key: &[u8; 65],
) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(responder_noc);
    if let Some(icac) = responder_icac {
        out.extend_from_slice(icac);
    }
    out.extend_from_slice(responder_eph_pub_key);
    out.extend_from_slice(initiator_eph_pub_key);
    out
}

/// Builds TBSData3, the payload the initiator signs (spec §4.6).
pub fn tbs_data3(
    initiator_noc: &[u8],
    initiator_icac: Option<&[u8]>,
    initiator_eph_pub_key: &[u8; 65],
    responder_eph_pub_key: &[u8; 65],
) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(initiator_noc);
    if let Some(icac) = initiator_icac {
        out.extend_from_slice(icac);
    }
    out.extend_from_slice(initiator_eph_pub_key);
    out.extend_from_slice(responder_eph_pub_key);
    out
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
            return Err(CaseError::Tlv(matter_tlv::TlvError::UnexpectedEof));
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
            Err(CaseError::PeerStatusReport { general_code: self.general_code, protocol_code: self.protocol_code })
        }
    }
}

fn uint16(r: &mut TlvReader) -> Result<u16> {
    Ok(r.next()?.ok_or(matter_tlv::TlvError::UnexpectedEof)?.as_uint()? as u16)
}

fn octets32(r: &mut TlvReader) -> Result<[u8; 32]> {
    into32(r.next()?.ok_or(matter_tlv::TlvError::UnexpectedEof)?.as_octet_string()?)
}

fn octets65(r: &mut TlvReader) -> Result<[u8; 65]> {
    into65(r.next()?.ok_or(matter_tlv::TlvError::UnexpectedEof)?.as_octet_string()?)
}

fn into16(bytes: &[u8]) -> Result<[u8; 16]> {
    bytes.try_into().map_err(|_| CaseError::Tlv(matter_tlv::TlvError::LengthMismatch))
}

fn into32(bytes: &[u8]) -> Result<[u8; 32]> {
    bytes.try_into().map_err(|_| CaseError::Tlv(matter_tlv::TlvError::LengthMismatch))
}

fn into64(bytes: &[u8]) -> Result<[u8; 64]> {
    bytes.try_into().map_err(|_| CaseError::Tlv(matter_tlv::TlvError::LengthMismatch))
}

fn into65(bytes: &[u8]) -> Result<[u8; 65]> {
    bytes.try_into().map_err(|_| CaseError::Tlv(matter_tlv::TlvError::LengthMismatch))
}
