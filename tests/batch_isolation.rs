//! One damaged secret must not keep the rest of a vault unreadable.

use softovault::crypto::EncryptedField;
use softovault::keys::{AccessKey, KdfParams};
use softovault::{CodecConfig, RecordCodec, Secret, SecretOutcome};
use uuid::Uuid;

fn codec() -> RecordCodec {
    RecordCodec::new(CodecConfig {
        kdf: KdfParams::default().with_iterations(100),
        ..CodecConfig::default()
    })
}

fn secret(key: &str, value: &str) -> Secret {
    let mut s = Secret::new(key, value);
    s.id = Some(Uuid::new_v4());
    s
}

#[test]
fn test_corrupted_secret_is_skipped() {
    let codec = codec();
    let ak = AccessKey::new("batch-key").unwrap();

    let mut sealed: Vec<_> = [("A", "1"), ("B", "2"), ("C", "3")]
        .into_iter()
        .map(|(k, v)| codec.encrypt_secret(secret(k, v), &ak).unwrap())
        .collect();
    sealed[1].value = EncryptedField::from_stored("bm90IGEgcmVhbCBjaXBoZXJ0ZXh0IGF0IGFsbA==");

    let opened = codec.decrypt_secrets(sealed, &ak).unwrap();

    let pairs: Vec<_> = opened.iter().map(|s| (s.key.as_str(), s.value.as_str())).collect();
    assert_eq!(pairs, vec![("A", "1"), ("C", "3")]);
}

#[test]
fn test_secret_from_another_vault_is_skipped() {
    let codec = codec();
    let mine = AccessKey::new("mine").unwrap();
    let theirs = AccessKey::new("theirs").unwrap();

    let batch = vec![
        codec.encrypt_secret(secret("OWN", "x"), &mine).unwrap(),
        codec.encrypt_secret(secret("FOREIGN", "y"), &theirs).unwrap(),
    ];

    let opened = codec.decrypt_secrets(batch, &mine).unwrap();
    assert_eq!(opened.len(), 1);
    assert_eq!(opened[0].key, "OWN");
}

#[test]
fn test_detailed_batch_distinguishes_failures() {
    let codec = codec();
    let ak = AccessKey::new("detailed").unwrap();
    let ok = codec.encrypt_secret(secret("A", "1"), &ak).unwrap();
    let mut broken = codec.encrypt_secret(secret("B", "2"), &ak).unwrap();
    broken.key = EncryptedField::from_stored("!!");
    let broken_id = broken.id;

    let outcomes = codec.decrypt_secrets_detailed(vec![ok, broken], &ak).unwrap();
    let failed: Vec<_> = outcomes
        .iter()
        .filter_map(|o| match o {
            SecretOutcome::Failed { id, .. } => Some(*id),
            SecretOutcome::Decrypted(_) => None,
        })
        .collect();
    assert_eq!(failed, vec![broken_id]);
}

#[test]
fn test_empty_batch() {
    let ak = AccessKey::new("empty").unwrap();
    assert!(codec().decrypt_secrets(Vec::new(), &ak).unwrap().is_empty());
}
