//! Cryptographic primitives for signing and checking anchored fingerprints.

use crate::types::{Hash256, PublicKeyBytes};
pub use ed25519_dalek::{Signature, SigningKey, VerifyingKey};
use sha2::{Digest, Sha256, Sha512};
use std::fmt;

/// Compute SHA-256 hash of data.
pub fn sha256(data: &[u8]) -> Hash256 {
    let hash = Sha256::digest(data);
    hash.into()
}

/// Double SHA-256, used by the ledger's commit welds.
pub fn sha256d(data: &[u8]) -> Hash256 {
    sha256(&sha256(data))
}

/// Compute SHA-512 hash of data.
pub fn sha512(data: &[u8]) -> [u8; 64] {
    let hash = Sha512::digest(data);
    hash.into()
}

/// A signer that can create Ed25519 signatures.
///
/// The same key pair doubles as the ledger funding key, so a `Signer` is also
/// what pays for commits.
#[derive(Clone)]
pub struct Signer {
    signing_key: SigningKey,
}

impl Signer {
    /// Create a new signer from a signing key.
    pub fn new(signing_key: SigningKey) -> Self {
        Self { signing_key }
    }

    /// Create a signer from 32 raw secret key bytes.
    pub fn from_secret_bytes(secret: &[u8; 32]) -> Self {
        Self {
            signing_key: SigningKey::from_bytes(secret),
        }
    }

    /// Generate a new random signing key.
    pub fn generate() -> Self {
        use rand::rngs::OsRng;
        let mut csprng = OsRng;
        let signing_key = SigningKey::generate(&mut csprng);
        Self { signing_key }
    }

    /// Sign a message.
    pub fn sign(&self, message: &[u8]) -> Signature {
        use ed25519_dalek::Signer as _;
        self.signing_key.sign(message)
    }

    /// Get the verifying (public) key.
    pub fn verifying_key(&self) -> VerifyingKey {
        self.signing_key.verifying_key()
    }

    /// Raw public key bytes, as embedded in anchor records and chain names.
    pub fn public_key_bytes(&self) -> PublicKeyBytes {
        self.signing_key.verifying_key().to_bytes()
    }
}

impl fmt::Debug for Signer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signer")
            .field("public_key", &hex::encode(self.public_key_bytes()))
            .finish_non_exhaustive()
    }
}

/// Check an Ed25519 signature given raw key and signature bytes.
///
/// Never fails: a key of the wrong length, a key that is not a valid curve
/// point, a signature of the wrong length, or a mismatch all yield `false`.
pub fn verify_signature(public_key: &[u8], message: &[u8], signature: &[u8]) -> bool {
    use ed25519_dalek::Verifier;

    let Ok(key_bytes) = <[u8; 32]>::try_from(public_key) else {
        return false;
    };
    let Ok(verifying_key) = VerifyingKey::from_bytes(&key_bytes) else {
        return false;
    };
    let Ok(signature) = Signature::from_slice(signature) else {
        return false;
    };

    verifying_key.verify(message, &signature).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_sha256() {
        let data = b"test data";
        let hash1 = sha256(data);
        let hash2 = sha256(data);
        assert_eq!(hash1, hash2);
        assert_eq!(hash1.len(), 32);
    }

    #[test]
    fn test_sha256d_differs_from_single_round() {
        assert_ne!(sha256d(b"abc"), sha256(b"abc"));
        assert_eq!(sha256d(b"abc"), sha256(&sha256(b"abc")));
    }

    #[test]
    fn test_signer() {
        let signer = Signer::generate();
        let message = b"test message";
        let signature = signer.sign(message);

        assert!(verify_signature(
            &signer.public_key_bytes(),
            message,
            &signature.to_bytes()
        ));
    }

    #[test]
    fn test_signing_is_deterministic() {
        let signer = Signer::from_secret_bytes(&[7u8; 32]);
        assert_eq!(signer.sign(b"m").to_bytes(), signer.sign(b"m").to_bytes());
    }

    #[test]
    fn test_verify_rejects_malformed_input() {
        let signer = Signer::generate();
        let sig = signer.sign(b"msg").to_bytes();
        let key = signer.public_key_bytes();

        assert!(!verify_signature(&key[..31], b"msg", &sig));
        assert!(!verify_signature(&key, b"msg", &sig[..63]));
        assert!(!verify_signature(&[], b"msg", &[]));
    }

    #[test]
    fn test_verify_rejects_other_key() {
        let signer = Signer::generate();
        let other = Signer::generate();
        let sig = signer.sign(b"msg").to_bytes();
        assert!(!verify_signature(&other.public_key_bytes(), b"msg", &sig));
    }

    #[test]
    fn test_debug_hides_secret() {
        let signer = Signer::from_secret_bytes(&[9u8; 32]);
        let rendered = format!("{:?}", signer);
        assert!(rendered.contains(&hex::encode(signer.public_key_bytes())));
        assert!(!rendered.contains(&hex::encode([9u8; 32])));
    }

    proptest! {
        #[test]
        fn prop_sign_then_verify(secret in any::<[u8; 32]>(), message in proptest::collection::vec(any::<u8>(), 0..256)) {
            let signer = Signer::from_secret_bytes(&secret);
            let sig = signer.sign(&message).to_bytes();
            prop_assert!(verify_signature(&signer.public_key_bytes(), &message, &sig));
        }

        #[test]
        fn prop_mutated_message_fails(
            secret in any::<[u8; 32]>(),
            message in proptest::collection::vec(any::<u8>(), 1..256),
            index in any::<prop::sample::Index>(),
            flip in 1u8..=255,
        ) {
            let signer = Signer::from_secret_bytes(&secret);
            let sig = signer.sign(&message).to_bytes();
            let mut tampered = message.clone();
            let i = index.index(tampered.len());
            tampered[i] ^= flip;
            prop_assert!(!verify_signature(&signer.public_key_bytes(), &tampered, &sig));
        }

        #[test]
        fn prop_mutated_signature_fails(
            secret in any::<[u8; 32]>(),
            message in proptest::collection::vec(any::<u8>(), 0..128),
            index in 0usize..64,
            flip in 1u8..=255,
        ) {
            let signer = Signer::from_secret_bytes(&secret);
            let mut sig = signer.sign(&message).to_bytes();
            sig[index] ^= flip;
            prop_assert!(!verify_signature(&signer.public_key_bytes(), &message, &sig));
        }
    }
}
