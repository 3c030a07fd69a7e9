//! Cluster-command TLV messages the orchestrator exchanges with the device
//! during commissioning (spec §6): General Commissioning's ArmFailSafe and
//! CommissioningComplete, and the attestation-facing half of Operational
//! Credentials (AttestationRequest/Response, CertificateChainRequest/
//! Response). CSR/AddNOC/network provisioning are delegated wholesale to a
//! `CredentialIssuer` collaborator and have no wire representation here.

use matter_tlv::{Tag, TlvReader, TlvWriter};

use crate::error::Result;

pub mod opcode {
    pub const ATTESTATION_REQUEST: u8 = 0x00;
    pub const ATTESTATION_RESPONSE: u8 = 0x01;
    pub const CERTIFICATE_CHAIN_REQUEST: u8 = 0x02;
    pub const CERTIFICATE_CHAIN_RESPONSE: u8 = 0x03;

    pub const ARM_FAIL_SAFE: u8 = 0x50;
    pub const ARM_FAIL_SAFE_RESPONSE: u8 = 0x51;
    pub const COMMISSIONING_COMPLETE: u8 = 0x52;
    pub const COMMISSIONING_COMPLETE_RESPONSE: u8 = 0x53;
}

#[derive(Debug, Clone, Copy)]
pub enum CertificateType {
    Dac,
    Pai,
}

impl CertificateType {
    fn to_u8(self) -> u8 {
        match self {
            Self::Dac => 1,
            Self::Pai => 2,
        }
    }

    fn from_u8(v: u8) -> Result<Self> {
        match v {
            1 => Ok(Self::Dac),
            2 => Ok(Self::Pai),
            _ => Err(crate::error::CommissioningError::InvalidState("unknown certificate chain type")),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct AttestationRequest {
    pub attestation_nonce: [u8; 32],
}

impl AttestationRequest {
    pub fn encode(&self) -> Result<Vec<u8>> {
        let mut w = TlvWriter::new();
        w.start_struct(Tag::Anonymous)?;
        w.put_octet_string(Tag::Context(0), &self.attestation_nonce)?;
        w.end_container()?;
        Ok(w.into_bytes()?)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let mut r = TlvReader::new(bytes);
        r.next()?;
        let nonce = r.next()?.ok_or(matter_tlv::TlvError::UnexpectedEof)?.as_octet_string()?;
        Ok(Self { attestation_nonce: nonce.try_into().map_err(|_| matter_tlv::TlvError::LengthMismatch)? })
    }
}

#[derive(Debug, Clone)]
pub struct AttestationResponse {
    pub attestation_elements: Vec<u8>,
    pub signature: Vec<u8>,
}

impl AttestationResponse {
    pub fn encode(&self) -> Result<Vec<u8>> {
        let mut w = TlvWriter::new();
        w.start_struct(Tag::Anonymous)?;
        w.put_octet_string(Tag::Context(0), &self.attestation_elements)?;
        w.put_octet_string(Tag::Context(1), &self.signature)?;
        w.end_container()?;
        Ok(w.into_bytes()?)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let mut r = TlvReader::new(bytes);
        r.next()?;
        let attestation_elements = r.next()?.ok_or(matter_tlv::TlvError::UnexpectedEof)?.as_octet_string()?.to_vec();
        let signature = r.next()?.ok_or(matter_tlv::TlvError::UnexpectedEof)?.as_octet_string()?.to_vec();
        Ok(Self { attestation_elements, signature })
    }
}

#[derive(Debug, Clone, Copy)]
pub struct CertificateChainRequest {
    pub certificate_type: CertificateType,
}

impl CertificateChainRequest {
    pub fn encode(&self) -> Result<Vec<u8>> {
        let mut w = TlvWriter::new();
        w.start_struct(Tag::Anonymous)?;
        w.put_uint(Tag::Context(0), self.certificate_type.to_u8() as u64)?;
        w.end_container()?;
        Ok(w.into_bytes()?)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let mut r = TlvReader::new(bytes);
        r.next()?;
        let raw = r.next()?.ok_or(matter_tlv::TlvError::UnexpectedEof)?.as_uint()? as u8;
        Ok(Self { certificate_type: CertificateType::from_u8(raw)? })
    }
}

#[derive(Debug, Clone)]
pub struct CertificateChainResponse {
    pub certificate: Vec<u8>,
}

impl CertificateChainResponse {
    pub fn encode(&self) -> Result<Vec<u8>> {
        let mut w = TlvWriter::new();
        w.start_struct(Tag::Anonymous)?;
        w.put_octet_string(Tag::Context(0), &self.certificate)?;
        w.end_container()?;
        Ok(w.into_bytes()?)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let mut r = TlvReader::new(bytes);
        r.next()?;
        let certificate = r.next()?.ok_or(matter_tlv::TlvError::UnexpectedEof)?.as_octet_string()?.to_vec();
        Ok(Self { certificate })
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ArmFailSafeRequest {
    pub expiry_length_seconds: u16,
    pub breadcrumb: u64,
}

impl ArmFailSafeRequest {
    pub fn encode(&self) -> Result<Vec<u8>> {
        let mut w = TlvWriter::new();
        w.start_struct(Tag::Anonymous)?;
        w.put_uint(Tag::Context(0), self.expiry_length_seconds as u64)?;
        w.put_uint(Tag::Context(1), self.breadcrumb)?;
        w.end_container()?;
        Ok(w.into_bytes()?)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let mut r = TlvReader::new(bytes);
        r.next()?;
        let expiry_length_seconds = r.next()?.ok_or(matter_tlv::TlvError::UnexpectedEof)?.as_uint()? as u16;
        let breadcrumb = r.next()?.ok_or(matter_tlv::TlvError::UnexpectedEof)?.as_uint()?;
        Ok(Self { expiry_length_seconds, breadcrumb })
    }
}

/// Shared by ArmFailSafeResponse and CommissioningCompleteResponse: both are
/// `{ error_code: uint8, debug_text: utf8 }` in General Commissioning.
#[derive(Debug, Clone)]
pub struct ClusterStatusResponse {
    pub error_code: u8,
    pub debug_text: String,
}

impl ClusterStatusResponse {
    pub const OK: u8 = 0;

    pub fn ok() -> Self {
        Self { error_code: Self::OK, debug_text: String::new() }
    }

    pub fn encode(&self) -> Result<Vec<u8>> {
        let mut w = TlvWriter::new();
        w.start_struct(Tag::Anonymous)?;
        w.put_uint(Tag::Context(0), self.error_code as u64)?;
        w.put_utf8_string(Tag::Context(1), &self.debug_text)?;
        w.end_container()?;
        Ok(w.into_bytes()?)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let mut r = TlvReader::new(bytes);
        r.next()?;
        let error_code = r.next()?.ok_or(matter_tlv::TlvError::UnexpectedEof)?.as_uint()? as u8;
        let debug_text = r.next()?.ok_or(matter_tlv::TlvError::UnexpectedEof)?.as_utf8_string()?.to_string();
        Ok(Self { error_code, debug_text })
    }

    pub fn into_result(self) -> Result<()> {
        if self.error_code == Self::OK {
            Ok(())
        } else {
            Err(crate::error::CommissioningError::ClusterError(self.error_code))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attestation_request_matches_the_documented_wire_encoding() {
        let nonce = [0u8; 32];
        let encoded = AttestationRequest { attestation_nonce: nonce }.encode().unwrap();
        assert_eq!(encoded.len(), 37);
        assert_eq!(&encoded[0..4], &[0x15, 0x30, 0x00, 0x20]);
        assert_eq!(*encoded.last().unwrap(), 0x18);
    }

    #[test]
    fn arm_fail_safe_round_trips() {
        let req = ArmFailSafeRequest { expiry_length_seconds: 60, breadcrumb: 42 };
        let bytes = req.encode().unwrap();
        let decoded = ArmFailSafeRequest::decode(&bytes).unwrap();
        assert_eq!(decoded.expiry_length_seconds, 60);
        assert_eq!(decoded.breadcrumb, 42);
    }

    #[test]
    fn cluster_status_response_ok_round_trips() {
        let bytes = ClusterStatusResponse::ok().encode().unwrap();
        let decoded = ClusterStatusResponse::decode(&bytes).unwrap();
        assert!(decoded.into_result().is_ok());
    }
}
