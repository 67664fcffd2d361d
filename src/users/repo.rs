use std::future::Future;
use std::sync::Arc;

use sqlx::{FromRow, PgPool};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::StoreConfig;
use crate::users::id::decode_user_id;
use crate::users::password;
use crate::users::repo_types::{Locator, NewUser, SafeUser, StoreError, UserRow};
use crate::users::slug::{self, RandomSuffix, SuffixSource};

/// Upper bound on url key collision retries before giving up.
const URL_KEY_SPIN_LIMIT: u32 = 1000;

const SAFE_COLUMNS: &str = "id, user_name, url_key, signature, avatar_key";

/// Owns the user table. All reads project [`SAFE_COLUMNS`] only; the single
/// exception is [`UserStore::get_credential_by_email`].
pub struct UserStore {
    db: PgPool,
    table: String,
    indexes: Vec<String>,
    suffixes: Arc<dyn SuffixSource>,
}

impl UserStore {
    pub fn new(db: PgPool, config: &StoreConfig) -> Self {
        Self::with_suffix_source(db, config, Arc::new(RandomSuffix))
    }

    pub fn with_suffix_source(
        db: PgPool,
        config: &StoreConfig,
        suffixes: Arc<dyn SuffixSource>,
    ) -> Self {
        Self {
            db,
            table: config.table.clone(),
            indexes: config.indexes.clone(),
            suffixes,
        }
    }

    /// Ensure the table and its indexes exist. Safe to call repeatedly;
    /// everything here is `IF NOT EXISTS`.
    pub async fn initialize(&self) -> Result<(), StoreError> {
        info!(table = %self.table, "user store initializing, verifying database integrity");

        let sql = format!(
            r#"
            CREATE TABLE IF NOT EXISTS {} (
                id            UUID PRIMARY KEY,
                user_name     TEXT NOT NULL,
                url_key       TEXT NOT NULL,
                signature     TEXT NOT NULL DEFAULT '',
                avatar_key    TEXT NOT NULL DEFAULT '',
                emails        JSONB NOT NULL DEFAULT '[]'::jsonb,
                password_hash TEXT NOT NULL,
                created_at    TIMESTAMPTZ NOT NULL DEFAULT now()
            )
            "#,
            self.table
        );
        sqlx::query(&sql).execute(&self.db).await?;

        for column in &self.indexes {
            let sql = if column == "emails" {
                format!(
                    "CREATE INDEX IF NOT EXISTS {t}_emails_idx ON {t} USING GIN (emails jsonb_path_ops)",
                    t = self.table
                )
            } else {
                format!(
                    "CREATE INDEX IF NOT EXISTS {t}_{column}_idx ON {t} ({column})",
                    t = self.table
                )
            };
            sqlx::query(&sql).execute(&self.db).await?;
            debug!(%column, "secondary index ensured");
        }

        let sql = format!(
            "CREATE UNIQUE INDEX IF NOT EXISTS {t}_url_key_uidx ON {t} (url_key)",
            t = self.table
        );
        sqlx::query(&sql).execute(&self.db).await?;

        info!(table = %self.table, "user store initialization complete");
        Ok(())
    }

    pub async fn get_by_id(&self, user_id: &str) -> Result<Option<SafeUser>, StoreError> {
        let id = decode_user_id(user_id)?;
        let sql = format!("SELECT {SAFE_COLUMNS} FROM {} WHERE id = $1", self.table);
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(id)
            .fetch_optional(&self.db)
            .await?;
        Ok(row.map(SafeUser::from))
    }

    pub async fn get_by_url_key(&self, url_key: &str) -> Result<Option<SafeUser>, StoreError> {
        let sql = format!("SELECT {SAFE_COLUMNS} FROM {} WHERE url_key = $1", self.table);
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(url_key)
            .fetch_optional(&self.db)
            .await?;
        Ok(row.map(SafeUser::from))
    }

    pub async fn get_by_name(&self, user_name: &str) -> Result<Vec<SafeUser>, StoreError> {
        let sql = format!("SELECT {SAFE_COLUMNS} FROM {} WHERE user_name = $1", self.table);
        let rows = sqlx::query_as::<_, UserRow>(&sql)
            .bind(user_name)
            .fetch_all(&self.db)
            .await?;
        Ok(rows.into_iter().map(SafeUser::from).collect())
    }

    /// The only read path that returns the password hash, paired with the
    /// record it belongs to.
    pub async fn get_credential_by_email(
        &self,
        email: &str,
    ) -> Result<Option<(SafeUser, String)>, StoreError> {
        #[derive(FromRow)]
        struct CredentialRow {
            id: Uuid,
            user_name: String,
            url_key: String,
            signature: String,
            avatar_key: String,
            password_hash: String,
        }

        let sql = format!(
            "SELECT {SAFE_COLUMNS}, password_hash FROM {} WHERE emails @> $1",
            self.table
        );
        let row = sqlx::query_as::<_, CredentialRow>(&sql)
            .bind(serde_json::json!([{ "address": email }]))
            .fetch_optional(&self.db)
            .await?;

        Ok(row.map(|r| {
            let user = SafeUser::from(UserRow {
                id: r.id,
                user_name: r.user_name,
                url_key: r.url_key,
                signature: r.signature,
                avatar_key: r.avatar_key,
            });
            (user, r.password_hash)
        }))
    }

    /// Insert a new record. The candidate url key starts as the supplied one
    /// (or the key derived from the name) and spins through random suffixes
    /// on conflict when `tolerate_collision` is set; otherwise the first
    /// conflict is surfaced as [`StoreError::UrlKeyDuplication`].
    pub async fn insert(
        &self,
        user: NewUser,
        tolerate_collision: bool,
    ) -> Result<SafeUser, StoreError> {
        let id = Uuid::new_v4();
        let original = user
            .url_key
            .clone()
            .unwrap_or_else(|| slug::url_key(&user.user_name));

        let sql = format!(
            "INSERT INTO {} (id, user_name, url_key, signature, avatar_key, emails, password_hash) \
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
            self.table
        );

        let attempt = |candidate: String| {
            let sql = sql.clone();
            let db = self.db.clone();
            let user_name = user.user_name.clone();
            let signature = user.signature.clone();
            let avatar_key = user.avatar_key.clone();
            let emails = sqlx::types::Json(user.emails.clone());
            let password_hash = user.password_hash.clone();
            async move {
                let result = sqlx::query(&sql)
                    .bind(id)
                    .bind(&user_name)
                    .bind(&candidate)
                    .bind(&signature)
                    .bind(&avatar_key)
                    .bind(&emails)
                    .bind(&password_hash)
                    .execute(&db)
                    .await;
                match result {
                    Ok(_) => Ok(candidate),
                    Err(e) if is_unique_violation(&e) => {
                        Err(StoreError::UrlKeyDuplication(candidate))
                    }
                    Err(e) => Err(e.into()),
                }
            }
        };

        let url_key = if tolerate_collision {
            spin_url_key(&original, self.suffixes.as_ref(), attempt).await?
        } else {
            attempt(original).await?
        };

        Ok(SafeUser {
            user_id: crate::users::id::encode_user_id(id),
            user_name: user.user_name,
            url_key,
            signature: user.signature,
            avatar_key: user.avatar_key,
        })
    }

    /// Two phases. First the display name is set unconditionally on whatever
    /// record the locator resolves to, pinning its id. Then the url key is
    /// recomputed from the new name and written together with the name in the
    /// same spin loop as insert, scoped to that id, so a racing writer cannot
    /// leave the pair inconsistent.
    pub async fn update_name(
        &self,
        new_name: &str,
        locator: &Locator,
        tolerate_collision: bool,
    ) -> Result<bool, StoreError> {
        let pinned = match locator {
            Locator::Id(user_id) => {
                let id = decode_user_id(user_id)?;
                let sql = format!(
                    "UPDATE {} SET user_name = $1 WHERE id = $2 RETURNING id",
                    self.table
                );
                sqlx::query_as::<_, (Uuid,)>(&sql)
                    .bind(new_name)
                    .bind(id)
                    .fetch_optional(&self.db)
                    .await?
            }
            Locator::UrlKey(url_key) => {
                let sql = format!(
                    "UPDATE {} SET user_name = $1 WHERE url_key = $2 RETURNING id",
                    self.table
                );
                sqlx::query_as::<_, (Uuid,)>(&sql)
                    .bind(new_name)
                    .bind(url_key)
                    .fetch_optional(&self.db)
                    .await?
            }
        };
        let Some((id,)) = pinned else {
            return Ok(false);
        };

        if !tolerate_collision {
            return Ok(true);
        }

        let original = slug::url_key(new_name);
        let sql = format!(
            "UPDATE {} SET user_name = $1, url_key = $2 WHERE id = $3",
            self.table
        );

        spin_url_key(&original, self.suffixes.as_ref(), |candidate: String| {
            let sql = sql.clone();
            let db = self.db.clone();
            let user_name = new_name.to_owned();
            async move {
                // if racing on the name, overwrite it
                let result = sqlx::query(&sql)
                    .bind(&user_name)
                    .bind(&candidate)
                    .bind(id)
                    .execute(&db)
                    .await;
                match result {
                    Ok(done) => Ok(done.rows_affected() == 1),
                    Err(e) if is_unique_violation(&e) => {
                        Err(StoreError::UrlKeyDuplication(candidate))
                    }
                    Err(e) => Err(e.into()),
                }
            }
        })
        .await
    }

    pub async fn update_signature(
        &self,
        signature: &str,
        locator: &Locator,
    ) -> Result<bool, StoreError> {
        self.update_single_column("signature", signature, locator).await
    }

    pub async fn update_avatar(
        &self,
        avatar_key: &str,
        locator: &Locator,
    ) -> Result<bool, StoreError> {
        self.update_single_column("avatar_key", avatar_key, locator).await
    }

    /// Read the current hash, verify the old password, then write the new
    /// hash guarded by the hash value just read. A rotation that raced in
    /// between makes the guarded write a no-op instead of clobbering it.
    pub async fn update_password(
        &self,
        before: &str,
        after: &str,
        locator: &Locator,
    ) -> Result<bool, StoreError> {
        let current = match locator {
            Locator::Id(user_id) => {
                let id = decode_user_id(user_id)?;
                let sql = format!(
                    "SELECT id, password_hash FROM {} WHERE id = $1",
                    self.table
                );
                sqlx::query_as::<_, (Uuid, String)>(&sql)
                    .bind(id)
                    .fetch_optional(&self.db)
                    .await?
            }
            Locator::UrlKey(url_key) => {
                let sql = format!(
                    "SELECT id, password_hash FROM {} WHERE url_key = $1",
                    self.table
                );
                sqlx::query_as::<_, (Uuid, String)>(&sql)
                    .bind(url_key)
                    .fetch_optional(&self.db)
                    .await?
            }
        };
        let Some((id, original_hash)) = current else {
            return Ok(false);
        };

        let matches = password::verify_password(before, &original_hash)
            .await
            .map_err(|e| StoreError::Hash(e.to_string()))?;
        if !matches {
            return Ok(false);
        }

        let new_hash = password::hash_password(after)
            .await
            .map_err(|e| StoreError::Hash(e.to_string()))?;

        let sql = format!(
            "UPDATE {} SET password_hash = $1 WHERE id = $2 AND password_hash = $3",
            self.table
        );
        let done = sqlx::query(&sql)
            .bind(&new_hash)
            .bind(id)
            .bind(&original_hash)
            .execute(&self.db)
            .await?;
        Ok(done.rows_affected() == 1)
    }

    pub async fn close(&self) {
        self.db.close().await;
    }

    async fn update_single_column(
        &self,
        column: &str,
        value: &str,
        locator: &Locator,
    ) -> Result<bool, StoreError> {
        let done = match locator {
            Locator::Id(user_id) => {
                let id = decode_user_id(user_id)?;
                let sql = format!("UPDATE {} SET {column} = $1 WHERE id = $2", self.table);
                sqlx::query(&sql).bind(value).bind(id).execute(&self.db).await?
            }
            Locator::UrlKey(url_key) => {
                let sql = format!("UPDATE {} SET {column} = $1 WHERE url_key = $2", self.table);
                sqlx::query(&sql)
                    .bind(value)
                    .bind(url_key)
                    .execute(&self.db)
                    .await?
            }
        };
        Ok(done.rows_affected() == 1)
    }
}

fn is_unique_violation(e: &sqlx::Error) -> bool {
    matches!(e, sqlx::Error::Database(db) if db.is_unique_violation())
}

/// Retry `attempt` with suffixed candidates until it stops reporting a url
/// key conflict, bounded by [`URL_KEY_SPIN_LIMIT`]. Every retry re-derives
/// its candidate from the original key, never from the previous candidate.
async fn spin_url_key<T, F, Fut>(
    original: &str,
    suffixes: &dyn SuffixSource,
    mut attempt: F,
) -> Result<T, StoreError>
where
    F: FnMut(String) -> Fut,
    Fut: Future<Output = Result<T, StoreError>>,
{
    let mut candidate = original.to_string();
    for _ in 0..URL_KEY_SPIN_LIMIT {
        match attempt(candidate.clone()).await {
            Err(StoreError::UrlKeyDuplication(_)) => {
                let previous = candidate;
                candidate = format!("{}-{}", original, suffixes.suffix());
                debug!(%previous, next = %candidate, "url key taken, spinning");
            }
            other => return other,
        }
    }
    warn!(%original, attempts = URL_KEY_SPIN_LIMIT, "url key spin exhausted");
    Err(StoreError::UrlKeySpinExhausted {
        original: original.to_string(),
        attempts: URL_KEY_SPIN_LIMIT,
    })
}
