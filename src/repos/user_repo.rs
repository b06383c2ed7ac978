/*
 * Responsibility
 * - ユーザーレジストリ (users テーブル) の読み取り専用ビュー
 * - subject (uid) をキーに status / role を返す
 * - 書き込みはこのサービスの責務外 (プロビジョニングは外部)
 */
use async_trait::async_trait;
use sqlx::{FromRow, PgPool, postgres::PgPoolOptions};

use crate::repos::error::{RepoError, RepoResult};

/// Registry row for one subject. Both fields are free-form text owned by
/// the registry; interpretation happens in the role resolver.
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct UserRecord {
    pub status: Option<String>,
    pub role: Option<String>,
}

#[cfg(test)]
impl UserRecord {
    pub fn active(role: Option<&str>) -> Self {
        Self {
            status: Some("active".to_string()),
            role: role.map(str::to_string),
        }
    }

    pub fn with_status(status: &str, role: Option<&str>) -> Self {
        Self {
            status: Some(status.to_string()),
            role: role.map(str::to_string),
        }
    }
}

/// Read path into the external user registry.
///
/// Implementations are shared by every in-flight request and must support
/// concurrent reads.
#[async_trait]
pub trait UserRegistry: Send + Sync + 'static {
    // Returns the registry backend name (for logging).
    fn backend_name(&self) -> &'static str;

    // `Ok(None)` when the subject has no record.
    async fn find_user(&self, subject: &str) -> RepoResult<Option<UserRecord>>;
}

/// Postgres-backed registry.
///
/// The pool connects lazily, so building it never touches the network and the
/// first lookup pays the connection cost.
#[derive(Clone, Debug)]
pub struct PgUserRegistry {
    pool: PgPool,
}

impl PgUserRegistry {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn connect_lazy(database_url: &str, max_connections: u32) -> RepoResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect_lazy(database_url)?;

        Ok(Self::new(pool))
    }
}

#[async_trait]
impl UserRegistry for PgUserRegistry {
    fn backend_name(&self) -> &'static str {
        "postgres"
    }

    async fn find_user(&self, subject: &str) -> RepoResult<Option<UserRecord>> {
        let row = sqlx::query_as::<_, UserRecord>(
            r#"
            SELECT status, role
            FROM users
            WHERE uid = $1
            "#,
        )
        .bind(subject)
        .fetch_optional(&self.pool)
        .await
        .map_err(RepoError::Db)?;

        Ok(row)
    }
}

#[cfg(test)]
pub(crate) mod memory {
    use std::collections::HashMap;

    use tokio::sync::RwLock;

    use super::*;

    /// In-memory registry used by unit and router tests.
    #[derive(Debug, Default)]
    pub(crate) struct InMemoryUserRegistry {
        users: RwLock<HashMap<String, UserRecord>>,
    }

    impl InMemoryUserRegistry {
        pub(crate) async fn upsert(&self, subject: &str, record: UserRecord) {
            self.users.write().await.insert(subject.to_string(), record);
        }
    }

    #[async_trait]
    impl UserRegistry for InMemoryUserRegistry {
        fn backend_name(&self) -> &'static str {
            "memory"
        }

        async fn find_user(&self, subject: &str) -> RepoResult<Option<UserRecord>> {
            Ok(self.users.read().await.get(subject).cloned())
        }
    }
}
