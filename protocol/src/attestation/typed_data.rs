//! # Typed-Data Encoding
//!
//! Turns an [`AttestationMessage`] into the 32-byte digest a wallet signs,
//! following the EIP-712 structured-data scheme:
//!
//! ```text
//! digest          = keccak256(0x19 0x01 || domainSeparator || hashStruct(message))
//! domainSeparator = keccak256(typeHash(EIP712Domain) || keccak(name) || keccak(version))
//! hashStruct(m)   = keccak256(typeHash(Attestation) || encodeData(m))
//! ```
//!
//! `encodeData` maps each field to one 32-byte word: `string` fields become
//! the hash of their UTF-8 bytes, `bytes32` fields are taken verbatim, and
//! unsigned integers are left-padded big-endian.
//!
//! The field list and order below are shared with every external signer.
//! Any change, even renaming a field, produces a different digest.

use serde_json::{json, Map, Value};

use super::message::AttestationMessage;
use crate::config::{DOMAIN_NAME, DOMAIN_VERSION, PRIMARY_TYPE};
use crate::crypto::hash::{keccak256, keccak256_multi, u64_word};

/// `(name, type)` pairs of the domain struct.
pub const DOMAIN_FIELDS: [(&str, &str); 2] = [("name", "string"), ("version", "string")];

/// `(name, type)` pairs of the attestation struct, in signing order.
pub const ATTESTATION_FIELDS: [(&str, &str); 8] = [
    ("schema", "string"),
    ("aud", "string"),
    ("nonce", "bytes32"),
    ("issuedAt", "uint64"),
    ("expiresAt", "uint64"),
    ("plaidRoot", "bytes32"),
    ("valueCents", "uint256"),
    ("predicate", "string"),
];

const DOMAIN_TYPE_NAME: &str = "EIP712Domain";

fn field_list(fields: &[(&str, &str)]) -> Value {
    Value::Array(
        fields
            .iter()
            .map(|(name, ty)| json!({ "name": name, "type": ty }))
            .collect(),
    )
}

/// `Name(type1 field1,type2 field2,...)`
fn encode_type(name: &str, fields: &[(&str, &str)]) -> String {
    let members: Vec<String> = fields
        .iter()
        .map(|(field, ty)| format!("{} {}", ty, field))
        .collect();
    format!("{}({})", name, members.join(","))
}

/// Type hash of the primary `Attestation` struct.
pub fn attestation_type_hash() -> [u8; 32] {
    keccak256(encode_type(PRIMARY_TYPE, &ATTESTATION_FIELDS).as_bytes())
}

/// Hash of the fixed signing domain.
pub fn domain_separator() -> [u8; 32] {
    let type_hash = keccak256(encode_type(DOMAIN_TYPE_NAME, &DOMAIN_FIELDS).as_bytes());
    keccak256_multi(&[
        &type_hash,
        &keccak256(DOMAIN_NAME.as_bytes()),
        &keccak256(DOMAIN_VERSION.as_bytes()),
    ])
}

/// `hashStruct` of an attestation message.
pub fn struct_hash(message: &AttestationMessage) -> [u8; 32] {
    keccak256_multi(&[
        &attestation_type_hash(),
        &keccak256(message.schema.as_bytes()),
        &keccak256(message.aud.as_bytes()),
        message.nonce.as_bytes(),
        &u64_word(message.issued_at),
        &u64_word(message.expires_at),
        message.root.as_bytes(),
        &u64_word(message.value_cents),
        &keccak256(message.predicate.as_bytes()),
    ])
}

/// The digest a wallet signs for `message`.
pub fn signing_digest(message: &AttestationMessage) -> [u8; 32] {
    keccak256_multi(&[&[0x19, 0x01], &domain_separator(), &struct_hash(message)])
}

/// What the core hands to a signer: the fixed domain, the typed schema,
/// and the message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypedData {
    message: AttestationMessage,
}

impl TypedData {
    pub fn new(message: AttestationMessage) -> Self {
        Self { message }
    }

    pub fn message(&self) -> &AttestationMessage {
        &self.message
    }

    pub fn into_message(self) -> AttestationMessage {
        self.message
    }

    pub fn digest(&self) -> [u8; 32] {
        signing_digest(&self.message)
    }

    /// The standard JSON request body wallets accept for structured-data
    /// signing (`types`, `primaryType`, `domain`, `message`).
    pub fn to_json(&self) -> Value {
        let mut types = Map::new();
        types.insert(DOMAIN_TYPE_NAME.to_string(), field_list(&DOMAIN_FIELDS));
        types.insert(PRIMARY_TYPE.to_string(), field_list(&ATTESTATION_FIELDS));

        json!({
            "types": types,
            "primaryType": PRIMARY_TYPE,
            "domain": {
                "name": DOMAIN_NAME,
                "version": DOMAIN_VERSION,
            },
            "message": self.message,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attestation::message::Nonce;
    use crate::commitment::Root;
    use crate::config::{AUDIENCE, SCHEMA_ID};

    fn message() -> AttestationMessage {
        AttestationMessage {
            schema: SCHEMA_ID.into(),
            aud: AUDIENCE.into(),
            nonce: Nonce::from_bytes([1u8; 32]),
            issued_at: 1_704_067_200,
            expires_at: 1_704_153_600,
            root: Root::from_bytes([2u8; 32]),
            value_cents: 2000,
            predicate: "sum(Food) >= 10".into(),
        }
    }

    #[test]
    fn type_strings_are_exact() {
        assert_eq!(
            encode_type(PRIMARY_TYPE, &ATTESTATION_FIELDS),
            "Attestation(string schema,string aud,bytes32 nonce,uint64 issuedAt,\
             uint64 expiresAt,bytes32 plaidRoot,uint256 valueCents,string predicate)"
        );
        assert_eq!(
            encode_type(DOMAIN_TYPE_NAME, &DOMAIN_FIELDS),
            "EIP712Domain(string name,string version)"
        );
    }

    #[test]
    fn digest_is_deterministic() {
        assert_eq!(signing_digest(&message()), signing_digest(&message()));
    }

    #[test]
    fn every_field_is_bound() {
        let base = signing_digest(&message());
        let mutations: [fn(&mut AttestationMessage); 8] = [
            |m| m.schema.push('x'),
            |m| m.aud.push('x'),
            |m| m.nonce = Nonce::from_bytes([3u8; 32]),
            |m| m.issued_at += 1,
            |m| m.expires_at += 1,
            |m| m.root = Root::from_bytes([4u8; 32]),
            |m| m.value_cents += 1,
            |m| m.predicate.push('0'),
        ];
        for mutate in mutations {
            let mut m = message();
            mutate(&mut m);
            assert_ne!(signing_digest(&m), base);
        }
    }

    #[test]
    fn digest_is_not_the_bare_struct_hash() {
        assert_ne!(signing_digest(&message()), struct_hash(&message()));
    }

    #[test]
    fn wallet_payload_shape() {
        let payload = TypedData::new(message()).to_json();
        assert_eq!(payload["primaryType"], "Attestation");
        assert_eq!(payload["domain"]["name"], "PlaidAttestation");
        assert_eq!(payload["domain"]["version"], "1");
        assert_eq!(payload["types"]["Attestation"].as_array().unwrap().len(), 8);
        assert_eq!(payload["types"]["Attestation"][5]["name"], "plaidRoot");
        assert_eq!(payload["types"]["EIP712Domain"][0]["type"], "string");
        assert_eq!(payload["message"]["valueCents"], "2000");
    }
}
