//! Business profile projection, keyed by email.
//!
//! Profiles live in the portal database and are read-only here: the store
//! fetches one per session change and never writes back. There is no
//! invalidation channel, so a profile can go stale if the record changes
//! server-side while a session is open.

use async_trait::async_trait;
use sqlx::{PgPool, Row};
use tracing::{Instrument, info_span};

/// Read-only business attributes associated with an identity.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Profile {
    pub name: String,
    pub email: String,
    pub company: String,
    pub department: String,
    pub role: String,
    pub active: bool,
}

/// Source of profile projections, keyed by normalized email.
#[async_trait]
pub trait ProfileSource: Send + Sync {
    /// `Ok(None)` means the identity has no profile record, which downstream
    /// pages render as "account not found", not as an error.
    async fn fetch_by_email(&self, email: &str) -> anyhow::Result<Option<Profile>>;
}

/// Postgres-backed profile source.
pub struct PgProfileSource {
    pool: PgPool,
}

impl PgProfileSource {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProfileSource for PgProfileSource {
    async fn fetch_by_email(&self, email: &str) -> anyhow::Result<Option<Profile>> {
        let query = r"
            SELECT name, email, company, department, role, active
            FROM student_profiles
            WHERE email = $1
        ";
        let span = info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = query
        );
        let row = sqlx::query(query)
            .bind(email)
            .fetch_optional(&self.pool)
            .instrument(span)
            .await?;

        Ok(row.map(|row| Profile {
            name: row.get("name"),
            email: row.get("email"),
            company: row.get("company"),
            department: row.get("department"),
            role: row.get("role"),
            active: row.get("active"),
        }))
    }
}
