//! Identity KeyBundle: classical + post-quantum keypairs for KEM and signing
//!
//! A bundle is either public-only (private buffers empty) or full. The full
//! form exists in RAM only while a session is unlocked; the public form is
//! what the server stores and what peers fetch before sharing.
//!
//! Wire/disk layout: the classical public keys are SPKI-DER framed, the
//! post-quantum keys are raw; everything is base64 inside a two-parent JSON
//! object (`preQuantum` / `postQuantum`). Import tolerates classical public
//! keys that arrive raw (32 bytes) as well as SPKI-framed (44 bytes).

use crate::encoding::{b64_decode, b64_encode};
use crate::kem::{
    EcdhKem, MlKem1024, MLKEM1024_PUBLIC_KEY_SIZE, SHARED_SECRET_SIZE, X25519_KEY_SIZE,
};
use crate::signer::{
    ed25519_verify, mldsa87_verify, Ed25519Signer, HybridSignature, MlDsa87Signer,
    ED25519_PUBLIC_KEY_SIZE, MLDSA87_PUBLIC_KEY_SIZE,
};
use crate::spki::{spki_unwrap, spki_wrap, SpkiAlgorithm, RAW_KEY_SIZE, SPKI_KEY_SIZE};
use crate::{CryptoError, Result};
use serde::{Deserialize, Serialize};
use zeroize::Zeroize;

/// One identity: X25519 + Ed25519 (classical) and ML-KEM-1024 + ML-DSA-87
/// (post-quantum) key material
pub struct KeyBundle {
    x25519_pub: [u8; X25519_KEY_SIZE],
    x25519_priv: Vec<u8>,
    eddsa_pub: [u8; ED25519_PUBLIC_KEY_SIZE],
    eddsa_priv: Vec<u8>,
    pq_sig_pub: Vec<u8>,
    pq_sig_priv: Vec<u8>,
    pq_kem_pub: Vec<u8>,
    pq_kem_priv: Vec<u8>,
}

#[derive(Serialize, Deserialize, Default)]
struct BundleSlot {
    #[serde(rename = "identityKemPublicKey", skip_serializing_if = "Option::is_none")]
    kem_public: Option<String>,
    #[serde(
        rename = "identitySigningPublicKey",
        skip_serializing_if = "Option::is_none"
    )]
    signing_public: Option<String>,
    #[serde(rename = "identityKemPrivateKey", skip_serializing_if = "Option::is_none")]
    kem_private: Option<String>,
    #[serde(
        rename = "identitySigningPrivateKey",
        skip_serializing_if = "Option::is_none"
    )]
    signing_private: Option<String>,
}

#[derive(Serialize, Deserialize)]
struct BundleJson {
    #[serde(rename = "preQuantum")]
    pre_quantum: BundleSlot,
    #[serde(rename = "postQuantum")]
    post_quantum: BundleSlot,
}

impl KeyBundle {
    /// Generate a complete fresh identity
    pub fn generate() -> Self {
        let kem = EcdhKem::generate();
        let signer = Ed25519Signer::generate();
        let pq_kem = MlKem1024::generate();
        let pq_signer = MlDsa87Signer::generate();

        Self {
            x25519_pub: kem.public_key(),
            x25519_priv: kem.secret_bytes().to_vec(),
            eddsa_pub: signer.public_key(),
            eddsa_priv: signer.to_keypair_bytes().to_vec(),
            pq_sig_pub: pq_signer.public_key().to_vec(),
            pq_sig_priv: pq_signer.secret_key().to_vec(),
            pq_kem_pub: pq_kem.public_key().to_vec(),
            pq_kem_priv: pq_kem.secret_key().to_vec(),
        }
    }

    /// Import a full bundle from raw private buffers
    ///
    /// Classical public halves are re-derived from the private material;
    /// post-quantum halves are taken as supplied after length checks.
    pub fn from_private_parts(
        x25519_priv: &[u8],
        eddsa_priv: &[u8],
        pq_sig_pub: &[u8],
        pq_sig_priv: &[u8],
        pq_kem_pub: &[u8],
        pq_kem_priv: &[u8],
    ) -> Result<Self> {
        let kem = EcdhKem::from_bytes(x25519_priv)?;
        let signer = Ed25519Signer::from_keypair_bytes(eddsa_priv)?;
        let pq_signer = MlDsa87Signer::from_parts(pq_sig_pub, pq_sig_priv)?;
        let pq_kem = MlKem1024::from_parts(pq_kem_pub, pq_kem_priv)?;

        Ok(Self {
            x25519_pub: kem.public_key(),
            x25519_priv: kem.secret_bytes().to_vec(),
            eddsa_pub: signer.public_key(),
            eddsa_priv: signer.to_keypair_bytes().to_vec(),
            pq_sig_pub: pq_signer.public_key().to_vec(),
            pq_sig_priv: pq_signer.secret_key().to_vec(),
            pq_kem_pub: pq_kem.public_key().to_vec(),
            pq_kem_priv: pq_kem.secret_key().to_vec(),
        })
    }

    /// Import a public-only bundle from raw public buffers
    ///
    /// Classical keys may be raw (32) or SPKI-framed (44).
    pub fn from_public_parts(
        x25519_pub: &[u8],
        eddsa_pub: &[u8],
        pq_sig_pub: &[u8],
        pq_kem_pub: &[u8],
    ) -> Result<Self> {
        if pq_sig_pub.len() != MLDSA87_PUBLIC_KEY_SIZE {
            return Err(CryptoError::invalid(format!(
                "pq signing public key must be {MLDSA87_PUBLIC_KEY_SIZE} bytes, got {}",
                pq_sig_pub.len()
            )));
        }
        if pq_kem_pub.len() != MLKEM1024_PUBLIC_KEY_SIZE {
            return Err(CryptoError::invalid(format!(
                "pq kem public key must be {MLKEM1024_PUBLIC_KEY_SIZE} bytes, got {}",
                pq_kem_pub.len()
            )));
        }
        Ok(Self {
            x25519_pub: accept_classical(SpkiAlgorithm::X25519, x25519_pub)?,
            x25519_priv: Vec::new(),
            eddsa_pub: accept_classical(SpkiAlgorithm::Ed25519, eddsa_pub)?,
            eddsa_priv: Vec::new(),
            pq_sig_pub: pq_sig_pub.to_vec(),
            pq_sig_priv: Vec::new(),
            pq_kem_pub: pq_kem_pub.to_vec(),
            pq_kem_priv: Vec::new(),
        })
    }

    /// Whether private material is present
    pub fn is_full(&self) -> bool {
        !self.x25519_priv.is_empty()
            && !self.eddsa_priv.is_empty()
            && !self.pq_sig_priv.is_empty()
            && !self.pq_kem_priv.is_empty()
    }

    /// A public-only copy of this identity
    pub fn public_clone(&self) -> Self {
        Self {
            x25519_pub: self.x25519_pub,
            x25519_priv: Vec::new(),
            eddsa_pub: self.eddsa_pub,
            eddsa_priv: Vec::new(),
            pq_sig_pub: self.pq_sig_pub.clone(),
            pq_sig_priv: Vec::new(),
            pq_kem_pub: self.pq_kem_pub.clone(),
            pq_kem_priv: Vec::new(),
        }
    }

    pub fn x25519_public(&self) -> &[u8; X25519_KEY_SIZE] {
        &self.x25519_pub
    }

    pub fn eddsa_public(&self) -> &[u8; ED25519_PUBLIC_KEY_SIZE] {
        &self.eddsa_pub
    }

    pub fn pq_sig_public(&self) -> &[u8] {
        &self.pq_sig_pub
    }

    pub fn pq_kem_public(&self) -> &[u8] {
        &self.pq_kem_pub
    }

    // ==================== Signing ====================

    /// Produce the classical + post-quantum signature pair over `msg`
    pub fn sign_hybrid(&self, msg: &[u8]) -> Result<HybridSignature> {
        if !self.is_full() {
            return Err(CryptoError::SignFailed(
                "bundle holds no private material".into(),
            ));
        }
        let classical = Ed25519Signer::from_keypair_bytes(&self.eddsa_priv)?.sign(msg);
        let post_quantum =
            MlDsa87Signer::from_parts(&self.pq_sig_pub, &self.pq_sig_priv)?.sign(msg)?;
        Ok(HybridSignature {
            classical,
            post_quantum,
        })
    }

    /// Verify both halves of a hybrid signature; true only if both pass
    pub fn verify_hybrid(&self, msg: &[u8], sig: &HybridSignature) -> bool {
        ed25519_verify(&self.eddsa_pub, msg, &sig.classical)
            && mldsa87_verify(&self.pq_sig_pub, msg, &sig.post_quantum)
    }

    // ==================== KEM ====================

    /// Decapsulate the classical half of a share against this identity
    pub fn decap_classical(&self, ciphertext: &[u8]) -> Result<[u8; SHARED_SECRET_SIZE]> {
        if self.x25519_priv.is_empty() {
            return Err(CryptoError::invalid("bundle holds no private material"));
        }
        EcdhKem::from_bytes(&self.x25519_priv)?.decap(ciphertext)
    }

    /// Decapsulate the post-quantum half of a share against this identity
    pub fn decap_post_quantum(&self, ciphertext: &[u8]) -> Result<[u8; SHARED_SECRET_SIZE]> {
        if self.pq_kem_priv.is_empty() {
            return Err(CryptoError::invalid("bundle holds no private material"));
        }
        MlKem1024::from_parts(&self.pq_kem_pub, &self.pq_kem_priv)?.decap(ciphertext)
    }

    // ==================== JSON ====================

    /// Serialize the public half (classical keys SPKI-framed)
    pub fn to_public_json(&self) -> Result<String> {
        let doc = BundleJson {
            pre_quantum: BundleSlot {
                kem_public: Some(b64_encode(spki_wrap(SpkiAlgorithm::X25519, &self.x25519_pub)?)),
                signing_public: Some(b64_encode(spki_wrap(
                    SpkiAlgorithm::Ed25519,
                    &self.eddsa_pub,
                )?)),
                ..Default::default()
            },
            post_quantum: BundleSlot {
                signing_public: Some(b64_encode(&self.pq_sig_pub)),
                kem_public: Some(b64_encode(&self.pq_kem_pub)),
                ..Default::default()
            },
        };
        serde_json::to_string(&doc).map_err(|e| CryptoError::invalid(e.to_string()))
    }

    /// Serialize the full bundle, private buffers included
    pub fn to_private_json(&self) -> Result<String> {
        if !self.is_full() {
            return Err(CryptoError::invalid("bundle holds no private material"));
        }
        let doc = BundleJson {
            pre_quantum: BundleSlot {
                kem_public: Some(b64_encode(spki_wrap(SpkiAlgorithm::X25519, &self.x25519_pub)?)),
                signing_public: Some(b64_encode(spki_wrap(
                    SpkiAlgorithm::Ed25519,
                    &self.eddsa_pub,
                )?)),
                kem_private: Some(b64_encode(&self.x25519_priv)),
                signing_private: Some(b64_encode(&self.eddsa_priv)),
            },
            post_quantum: BundleSlot {
                signing_public: Some(b64_encode(&self.pq_sig_pub)),
                kem_public: Some(b64_encode(&self.pq_kem_pub)),
                signing_private: Some(b64_encode(&self.pq_sig_priv)),
                kem_private: Some(b64_encode(&self.pq_kem_priv)),
            },
        };
        serde_json::to_string(&doc).map_err(|e| CryptoError::invalid(e.to_string()))
    }

    /// Parse a public bundle
    pub fn from_public_json(json: &str) -> Result<Self> {
        let doc: BundleJson =
            serde_json::from_str(json).map_err(|e| CryptoError::invalid(e.to_string()))?;
        let x25519_pub = b64_decode(required(&doc.pre_quantum.kem_public, "preQuantum kem")?)?;
        let eddsa_pub = b64_decode(required(
            &doc.pre_quantum.signing_public,
            "preQuantum signing",
        )?)?;
        let pq_sig_pub = b64_decode(required(
            &doc.post_quantum.signing_public,
            "postQuantum signing",
        )?)?;
        let pq_kem_pub = b64_decode(required(&doc.post_quantum.kem_public, "postQuantum kem")?)?;
        Self::from_public_parts(&x25519_pub, &eddsa_pub, &pq_sig_pub, &pq_kem_pub)
    }

    /// Parse a full bundle
    pub fn from_private_json(json: &str) -> Result<Self> {
        let doc: BundleJson =
            serde_json::from_str(json).map_err(|e| CryptoError::invalid(e.to_string()))?;
        let x25519_priv = b64_decode(required(&doc.pre_quantum.kem_private, "preQuantum kem")?)?;
        let eddsa_priv = b64_decode(required(
            &doc.pre_quantum.signing_private,
            "preQuantum signing",
        )?)?;
        let pq_sig_pub = b64_decode(required(
            &doc.post_quantum.signing_public,
            "postQuantum signing",
        )?)?;
        let pq_sig_priv = b64_decode(required(
            &doc.post_quantum.signing_private,
            "postQuantum signing",
        )?)?;
        let pq_kem_pub = b64_decode(required(&doc.post_quantum.kem_public, "postQuantum kem")?)?;
        let pq_kem_priv = b64_decode(required(&doc.post_quantum.kem_private, "postQuantum kem")?)?;

        let mut x25519_priv = x25519_priv;
        let mut eddsa_priv = eddsa_priv;
        let bundle = Self::from_private_parts(
            &x25519_priv,
            &eddsa_priv,
            &pq_sig_pub,
            &pq_sig_priv,
            &pq_kem_pub,
            &pq_kem_priv,
        );
        x25519_priv.zeroize();
        eddsa_priv.zeroize();
        bundle
    }
}

impl Drop for KeyBundle {
    fn drop(&mut self) {
        self.x25519_priv.zeroize();
        self.eddsa_priv.zeroize();
        self.pq_sig_priv.zeroize();
        self.pq_kem_priv.zeroize();
    }
}

impl std::fmt::Debug for KeyBundle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "KeyBundle({}, x25519+ed25519+ml-kem-1024+ml-dsa-87)",
            if self.is_full() { "full" } else { "public-only" }
        )
    }
}

fn required<'a>(field: &'a Option<String>, what: &str) -> Result<&'a String> {
    field
        .as_ref()
        .ok_or_else(|| CryptoError::invalid(format!("bundle JSON missing {what} key")))
}

// Length-based tolerance: 32 → raw, 44 → SPKI.
fn accept_classical(alg: SpkiAlgorithm, key: &[u8]) -> Result<[u8; RAW_KEY_SIZE]> {
    match key.len() {
        RAW_KEY_SIZE => {
            let mut raw = [0u8; RAW_KEY_SIZE];
            raw.copy_from_slice(key);
            Ok(raw)
        }
        SPKI_KEY_SIZE => spki_unwrap(alg, key),
        n => Err(CryptoError::invalid(format!(
            "classical public key must be {RAW_KEY_SIZE} or {SPKI_KEY_SIZE} bytes, got {n}"
        ))),
    }
}
