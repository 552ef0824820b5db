//! TEE key service: keypair lifecycle, hybrid envelope decryption, and the
//! attestation stub (components A and K of the relay).

pub mod attestation;
pub mod envelope;
pub mod error;
pub mod keypair;

pub use attestation::{AttestationService, EnclaveIdentity};
pub use envelope::{Envelope, decrypt_envelope};
pub use error::CryptoError;
pub use keypair::{Jwk, Keypair, PublicKeyInfo};
