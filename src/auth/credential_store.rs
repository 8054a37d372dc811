use anyhow::{Result, anyhow};
use keyring::{Entry, Error as KeyringError};

const SERVICE: &str = "mail_digest";
const API_KEY_ENTRY: &str = "summarizer-api-key";

/// Save the IMAP password into the OS keyring for the given account
pub fn save_password(account: &str, password: &str) -> Result<()> {
    save(account, password)
}

/// Load the IMAP password from the keyring for the given account
pub fn load_password(account: &str) -> Result<Option<String>> {
    load(account)
}

pub fn save_api_key(key: &str) -> Result<()> {
    save(API_KEY_ENTRY, key)
}

pub fn load_api_key() -> Result<Option<String>> {
    load(API_KEY_ENTRY)
}

fn save(user: &str, secret: &str) -> Result<()> {
    let entry = Entry::new(SERVICE, user);
    entry?
        .set_password(secret)
        .map_err(|e| anyhow!(e.to_string()))?;
    Ok(())
}

fn load(user: &str) -> Result<Option<String>> {
    let entry = Entry::new(SERVICE, user);
    match entry?.get_password() {
        Ok(v) => Ok(Some(v)),
        // no keyring daemon behaves like an empty keyring
        Err(KeyringError::NoEntry)
        | Err(KeyringError::PlatformFailure(_))
        | Err(KeyringError::NoStorageAccess(_)) => Ok(None),
        Err(e) => Err(anyhow!(e.to_string())),
    }
}
