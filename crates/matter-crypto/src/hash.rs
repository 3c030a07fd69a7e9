//! SHA-256 (spec §4.1).

use sha2::{Digest, Sha256};

pub const DIGEST_LEN: usize = 32;

pub fn sha256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Streaming hasher for callers that build up the transcript incrementally
/// (SPAKE2+'s TT, CASE's Sigma transcript).
#[derive(Clone, Default)]
pub struct Sha256Stream(Sha256);

impl Sha256Stream {
    pub fn new() -> Self {
        Self(Sha256::new())
    }

    pub fn update(&mut self, data: &[u8]) -> &mut Self {
        self.0.update(data);
        self
    }

    pub fn finalize(self) -> [u8; 32] {
        self.0.finalize().into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_string_vector() {
        let expected = hex::decode("e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855")
            .unwrap();
        assert_eq!(&sha256(b"")[..], &expected[..]);
    }

    #[test]
    fn streaming_matches_one_shot() {
        let mut s = Sha256Stream::new();
        s.update(b"hello, ").update(b"matter");
        assert_eq!(s.finalize(), sha256(b"hello, matter"));
    }
}
