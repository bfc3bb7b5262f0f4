pub mod identity;
pub mod storage;
pub mod verifier;

// Re-export
pub use identity::{AuthenticatedUser, GoogleIdentity, IdentityProvider, StaticIdentity};
pub use storage::{BucketStorage, InlineStorage, ProofStorage};
pub use verifier::{AiVerifier, OfflineVerifier, ProofVerifier, Verdict};
