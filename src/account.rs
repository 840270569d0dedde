//! Account store
//!
//! Nickname → credential hash table shared by every connection task.
//! Hashing is slow, so it runs on the blocking pool with no lock held;
//! the insert re-checks availability under the nickname's shard lock.

use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tokio::sync::OnceCell;
use tracing::{debug, info};

use crate::error::AppError;

/// Accepted nickname length in UTF-16 code units (inclusive)
pub const NICKNAME_LEN: std::ops::RangeInclusive<usize> = 1..=20;

/// Accepted password length in UTF-16 code units (inclusive)
pub const PASSWORD_LEN: std::ops::RangeInclusive<usize> = 6..=50;

/// Hashed once per store and verified against for unknown nicknames,
/// so both login failure paths cost the same.
const DUMMY_PASSWORD: &str = "dummy-password-for-unknown-nicknames";

/// Length as browser clients count it: UTF-16 code units, so an emoji
/// outside the BMP counts as 2.
fn client_len(s: &str) -> usize {
    s.encode_utf16().count()
}

/// A registered account
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    pub nickname: String,
    pub credential_hash: String,
}

/// One-way password hashing capability
pub trait CredentialHasher: Send + Sync + 'static {
    fn hash(&self, password: &str) -> Result<String, AppError>;
    fn verify(&self, password: &str, hash: &str) -> Result<bool, AppError>;
}

/// bcrypt with a configurable cost factor
#[derive(Debug, Clone, Copy)]
pub struct BcryptHasher {
    cost: u32,
}

impl BcryptHasher {
    pub fn new(cost: u32) -> Self {
        Self { cost }
    }
}

impl Default for BcryptHasher {
    fn default() -> Self {
        Self::new(bcrypt::DEFAULT_COST)
    }
}

impl CredentialHasher for BcryptHasher {
    fn hash(&self, password: &str) -> Result<String, AppError> {
        Ok(bcrypt::hash(password, self.cost)?)
    }

    fn verify(&self, password: &str, hash: &str) -> Result<bool, AppError> {
        Ok(bcrypt::verify(password, hash)?)
    }
}

/// Shared account table
pub struct AccountStore {
    accounts: DashMap<String, Account>,
    hasher: Arc<dyn CredentialHasher>,
    dummy_hash: OnceCell<String>,
}

impl AccountStore {
    pub fn new(hasher: Arc<dyn CredentialHasher>) -> Self {
        Self {
            accounts: DashMap::new(),
            hasher,
            dummy_hash: OnceCell::new(),
        }
    }

    /// Create an account
    ///
    /// Checks, in order: nickname free, nickname length, password length.
    /// Availability is checked again when inserting, after the hash is done,
    /// so of two concurrent registrations only one can win.
    pub async fn register(&self, nickname: &str, password: &str) -> Result<Account, AppError> {
        if self.accounts.contains_key(nickname) {
            return Err(AppError::NicknameTaken);
        }
        if !NICKNAME_LEN.contains(&client_len(nickname)) {
            return Err(AppError::InvalidNickname);
        }
        if !PASSWORD_LEN.contains(&client_len(password)) {
            return Err(AppError::InvalidPassword);
        }

        let credential_hash = self.hash(password).await?;

        match self.accounts.entry(nickname.to_string()) {
            Entry::Occupied(_) => {
                debug!("Lost registration race for '{}'", nickname);
                Err(AppError::NicknameTaken)
            }
            Entry::Vacant(slot) => {
                let account = Account {
                    nickname: nickname.to_string(),
                    credential_hash,
                };
                slot.insert(account.clone());
                info!("Registered account '{}'", nickname);
                Ok(account)
            }
        }
    }

    /// Check a nickname/password pair
    ///
    /// Unknown nickname and wrong password both yield `InvalidCredentials`.
    pub async fn authenticate(&self, nickname: &str, password: &str) -> Result<Account, AppError> {
        // Clone out so no shard lock is held across the await
        let account = self.accounts.get(nickname).map(|a| a.value().clone());

        let stored_hash = match &account {
            Some(account) => account.credential_hash.clone(),
            None => self.dummy_hash().await?,
        };
        let matched = self.verify(password, stored_hash).await?;

        match account {
            Some(account) if matched => Ok(account),
            _ => Err(AppError::InvalidCredentials),
        }
    }

    pub fn contains(&self, nickname: &str) -> bool {
        self.accounts.contains_key(nickname)
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }

    /// Hash of `DUMMY_PASSWORD` at this store's own cost, computed on first use
    async fn dummy_hash(&self) -> Result<String, AppError> {
        self.dummy_hash
            .get_or_try_init(|| self.hash(DUMMY_PASSWORD))
            .await
            .cloned()
    }

    async fn hash(&self, password: &str) -> Result<String, AppError> {
        let hasher = Arc::clone(&self.hasher);
        let password = password.to_string();
        tokio::task::spawn_blocking(move || hasher.hash(&password)).await?
    }

    async fn verify(&self, password: &str, hash: String) -> Result<bool, AppError> {
        let hasher = Arc::clone(&self.hasher);
        let password = password.to_string();
        let result = tokio::task::spawn_blocking(move || hasher.verify(&password, &hash)).await?;
        // A malformed stored hash counts as a mismatch
        Ok(result.unwrap_or(false))
    }
}
