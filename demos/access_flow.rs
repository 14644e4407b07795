//! Minimal example: a vault created by its owner and read back by a client
//! that holds nothing but the access key.
//!
//! Run with: `RUST_LOG=softovault=debug cargo run --example access_flow`
//!
//! - The owner creates a vault and stores two secrets
//! - The store only holds ciphertext
//! - A client reads the secrets with a bearer access key
//! - A wrong key gets nothing; accesses are appended to a JSON-lines file

use softovault::access::VaultApi;
use softovault::audit::FileAccessSink;
use softovault::limits::Profile;
use softovault::store::{MemoryVaultStore, VaultStore};
use softovault::{Secret, SoftovaultConfig, Vault};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // 1. Setup
    let api = VaultApi::new(MemoryVaultStore::new(), SoftovaultConfig::default());
    let log_path = std::env::temp_dir().join("softovault_access.jsonl");
    api.add_access_sink(Box::new(FileAccessSink::new(&log_path)?))?;

    // 2. Owner creates a vault
    let owner = Uuid::new_v4();
    let profile = Profile {
        user_id: owner,
        premium: false,
    };
    let created = api.create_vault(
        owner,
        Some(&profile),
        Vault::new("Production").with_description("payment provider keys"),
    )?;
    let auth = format!("Bearer {}", created.access_key.expose());
    println!("Created vault {:?}", created.vault.id);

    api.create_secret(Some(&auth), Some(&profile), Secret::new("API_KEY", "sk-123"))?;
    api.create_secret(
        Some(&auth),
        Some(&profile),
        Secret::new("WEBHOOK_SECRET", "whsec-456").with_description("signing secret"),
    )?;

    // 3. What the database holds
    if let Some(vault_id) = created.vault.id {
        for row in api.store().secrets_for_vault(vault_id)? {
            println!("  stored key={} value={}", row.key, row.value);
        }
    }

    // 4. A client with the access key
    let all = api.all_secrets(Some(&auth))?;
    println!("Client sees {} secret(s):", all.count);
    for (key, value) in &all.secrets {
        println!("  {key} = {value}");
    }

    // 5. A client without it
    match api.all_secrets(Some("Bearer guessed-key")) {
        Ok(_) => println!("unexpected: guessed key accepted"),
        Err(e) => println!("Guessed key rejected: {e}"),
    }

    println!("Access log written to: {}", log_path.display());
    Ok(())
}
