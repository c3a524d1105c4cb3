//! # Signature Port
//!
//! The core never holds key material. It hands a [`TypedData`] request to
//! whatever implements [`SignaturePort`] (a browser wallet bridge, a
//! hardware signer, a remote custody service) and gets back a signature plus
//! the address the signer claims to be.
//!
//! The exchange can end three ways besides success, and callers must treat
//! them differently:
//!
//! - [`SignerError::Declined`]: the user said no. Report "no proof produced"
//!   and do **not** retry.
//! - [`SignerError::Timeout`] / [`SignerError::Unavailable`]: transient; the
//!   caller may retry.
//! - [`SignerError::InvalidResponse`]: the signer answered with something
//!   unusable.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use super::typed_data::TypedData;
use crate::crypto::keys::SignerKeypair;
use crate::crypto::signatures::RecoverableSignature;
use crate::identity::Address;

/// Ways a signing request can fail.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SignerError {
    #[error("the user declined to sign")]
    Declined,

    #[error("signer did not answer within {0:?}")]
    Timeout(Duration),

    #[error("signer unavailable: {0}")]
    Unavailable(String),

    #[error("signer returned an invalid response: {0}")]
    InvalidResponse(String),
}

impl SignerError {
    /// Whether retrying the same request could succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Timeout(_) | Self::Unavailable(_))
    }
}

/// A signer's answer: the signature and who it claims to be.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureResponse {
    pub signature: RecoverableSignature,
    pub signer: Address,
}

/// Anything that can produce a structured-data signature.
#[async_trait]
pub trait SignaturePort: Send + Sync {
    /// Sign `request`. May suspend for as long as the user takes to decide.
    async fn sign_typed_data(&self, request: &TypedData) -> Result<SignatureResponse, SignerError>;
}

/// An in-process signer backed by a local key. For development and tests;
/// production keys belong in a wallet.
#[derive(Debug, Clone)]
pub struct LocalSigner {
    keypair: SignerKeypair,
}

impl LocalSigner {
    pub fn new(keypair: SignerKeypair) -> Self {
        Self { keypair }
    }

    pub fn address(&self) -> Address {
        self.keypair.address()
    }
}

#[async_trait]
impl SignaturePort for LocalSigner {
    async fn sign_typed_data(&self, request: &TypedData) -> Result<SignatureResponse, SignerError> {
        let signature = self
            .keypair
            .sign_digest(&request.digest())
            .map_err(|e| SignerError::InvalidResponse(e.to_string()))?;
        Ok(SignatureResponse {
            signature,
            signer: self.keypair.address(),
        })
    }
}
