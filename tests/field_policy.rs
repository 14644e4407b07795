//! Which fields the codec encrypts, and which it leaves alone.

use chrono::Utc;
use serde_json::{json, Value};
use softovault::keys::{AccessKey, KdfParams};
use softovault::{CodecConfig, EncryptedVault, RecordCodec, Secret, Vault};
use uuid::Uuid;

fn codec() -> RecordCodec {
    RecordCodec::new(CodecConfig {
        kdf: KdfParams::default().with_iterations(100),
        ..CodecConfig::default()
    })
}

#[test]
fn test_vault_without_description_stays_without() {
    let ak = AccessKey::new("k").unwrap();
    let sealed = codec().encrypt_vault(Vault::new("T"), &ak).unwrap();

    assert_ne!(sealed.title.as_str(), "T");
    assert!(sealed.description.is_none());
    let as_json = serde_json::to_value(&sealed).unwrap();
    assert!(as_json.get("description").is_none());
}

#[test]
fn test_vault_with_description_encrypts_both() {
    let ak = AccessKey::new("k").unwrap();
    let codec = codec();
    let sealed = codec
        .encrypt_vault(Vault::new("T").with_description("D"), &ak)
        .unwrap();

    let description = sealed.description.clone().unwrap();
    assert_ne!(description.as_str(), "D");
    assert_ne!(description, sealed.title);

    let opened = codec.decrypt_vault(sealed, &ak).unwrap();
    assert_eq!(opened.title, "T");
    assert_eq!(opened.description.as_deref(), Some("D"));
}

#[test]
fn test_plaintext_columns_pass_through() {
    let ak = AccessKey::new("k").unwrap();
    let codec = codec();
    let now = Utc::now();

    let mut vault = Vault::new("T");
    vault.id = Some(Uuid::new_v4());
    vault.user_id = Some(Uuid::new_v4());
    vault.created_at = Some(now);
    vault.updated_at = Some(now);
    vault.extra.insert("accessed".into(), Value::Bool(false));
    vault.extra.insert("access_key".into(), json!("lookup"));

    let sealed = codec.encrypt_vault(vault.clone(), &ak).unwrap();
    assert_eq!(sealed.id, vault.id);
    assert_eq!(sealed.user_id, vault.user_id);
    assert_eq!(sealed.created_at, vault.created_at);
    assert_eq!(sealed.extra, vault.extra);

    assert_eq!(codec.decrypt_vault(sealed, &ak).unwrap(), vault);
}

#[test]
fn test_secret_fields() {
    let ak = AccessKey::new("k").unwrap();
    let codec = codec();
    let mut secret = Secret::new("DB_URL", "postgres://").with_description("primary");
    secret.vault_id = Some(Uuid::new_v4());

    let sealed = codec.encrypt_secret(secret.clone(), &ak).unwrap();
    assert_eq!(sealed.vault_id, secret.vault_id);
    assert_ne!(sealed.key.as_str(), "DB_URL");
    assert_ne!(sealed.value.as_str(), "postgres://");
    assert_ne!(sealed.description.as_ref().unwrap().as_str(), "primary");

    assert_eq!(codec.decrypt_secret(sealed, &ak).unwrap(), secret);
}

#[test]
fn test_stored_vault_row_decrypts() {
    let ak = AccessKey::new("k").unwrap();
    let codec = codec();
    let sealed = codec
        .encrypt_vault(Vault::new("Prod").with_description("keys"), &ak)
        .unwrap();

    // Through JSON, as a database row would travel.
    let mut row = serde_json::to_value(&sealed).unwrap();
    row["last_accessed"] = json!(null);
    let loaded: EncryptedVault = serde_json::from_value(row).unwrap();

    let opened = codec.decrypt_vault(loaded, &ak).unwrap();
    assert_eq!(opened.title, "Prod");
    assert_eq!(opened.extra.get("last_accessed"), Some(&Value::Null));
}
