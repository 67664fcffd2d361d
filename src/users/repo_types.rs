use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::users::id::{encode_user_id, InvalidUserId};

/// User projection safe to hand to any caller. The password hash is not a
/// field here at all; only [`UserStore::get_credential_by_email`] returns it,
/// paired with the matching record.
///
/// [`UserStore::get_credential_by_email`]: crate::users::repo::UserStore::get_credential_by_email
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SafeUser {
    pub user_id: String,
    pub user_name: String,
    pub url_key: String,
    pub signature: String,
    pub avatar_key: String,
}

#[derive(Debug, Clone, FromRow)]
pub(crate) struct UserRow {
    pub id: Uuid,
    pub user_name: String,
    pub url_key: String,
    pub signature: String,
    pub avatar_key: String,
}

impl From<UserRow> for SafeUser {
    fn from(row: UserRow) -> Self {
        Self {
            user_id: encode_user_id(row.id),
            user_name: row.user_name,
            url_key: row.url_key,
            signature: row.signature,
            avatar_key: row.avatar_key,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmailKind {
    School,
    Personal,
}

/// One address attached to a user, stored in the record's `emails` JSONB list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailEntry {
    #[serde(rename = "type")]
    pub kind: EmailKind,
    pub address: String,
    pub verified: bool,
}

/// Everything needed to create a record. `url_key` defaults to the key
/// derived from `user_name` when absent.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub user_name: String,
    pub url_key: Option<String>,
    pub signature: String,
    pub avatar_key: String,
    pub emails: Vec<EmailEntry>,
    pub password_hash: String,
}

/// Caller-supplied key addressing exactly one record. Exactly one of the
/// external id or the url key, by construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Locator {
    Id(String),
    UrlKey(String),
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("url key {0:?} already taken")]
    UrlKeyDuplication(String),

    #[error("url key spin exhausted for {original:?} after {attempts} attempts")]
    UrlKeySpinExhausted { original: String, attempts: u32 },

    #[error(transparent)]
    InvalidUserId(#[from] InvalidUserId),

    #[error("password hashing failed: {0}")]
    Hash(String),

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}
