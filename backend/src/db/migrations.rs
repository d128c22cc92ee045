//! Versioned schema migrations.
//!
//! Migrations live on disk as reversible pairs,
//! `{version}_{description}.up.sql` and `{version}_{description}.down.sql`,
//! and are loaded at runtime so new revisions apply without a rebuild.

use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::Serialize;
use sqlx::migrate::Migrator;
use sqlx::{AnyPool, Row};

use super::DatabaseBackend;
use crate::error::{AppError, Result};

/// Name accepted by `upgrade` for "everything pending".
pub const HEAD: &str = "head";

/// A migration recorded as applied in the database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AppliedRevision {
    pub version: i64,
    pub description: String,
}

/// Files written by `revision`.
#[derive(Debug, Clone)]
pub struct NewRevision {
    pub version: i64,
    pub up_path: PathBuf,
    pub down_path: PathBuf,
}

/// Turn a free-form message into a file-name-safe description.
pub fn slugify(message: &str) -> String {
    let mut slug = String::with_capacity(message.len());
    for ch in message.trim().chars() {
        if ch.is_ascii_alphanumeric() {
            slug.push(ch.to_ascii_lowercase());
        } else if !slug.ends_with('_') {
            slug.push('_');
        }
    }
    slug.trim_matches('_').to_string()
}

/// Create a new, empty reversible migration in `dir`.
///
/// Schema diffing is not supported; with `autogenerate` set the revision is
/// still written, empty, and a warning is logged.
pub async fn revision(dir: &Path, message: &str, autogenerate: bool) -> Result<NewRevision> {
    let slug = slugify(message);
    if slug.is_empty() {
        return Err(AppError::Validation(
            "Revision message must contain at least one letter or digit".to_string(),
        ));
    }
    if autogenerate {
        tracing::warn!("Schema autogeneration is not supported; writing an empty revision");
    }

    tokio::fs::create_dir_all(dir).await?;

    let existing = existing_versions(dir).await?;
    let mut version: i64 = Utc::now()
        .format("%Y%m%d%H%M%S")
        .to_string()
        .parse()
        .map_err(|_| AppError::Internal("Failed to derive revision version".to_string()))?;
    // Two revisions within the same second must not share a version.
    while existing.contains(&version) {
        version += 1;
    }

    let up_path = dir.join(format!("{}_{}.up.sql", version, slug));
    let down_path = dir.join(format!("{}_{}.down.sql", version, slug));

    tokio::fs::write(
        &up_path,
        format!("-- {}\n-- Add upgrade statements below.\n", message.trim()),
    )
    .await?;
    tokio::fs::write(
        &down_path,
        format!("-- Revert: {}\n-- Add downgrade statements below.\n", message.trim()),
    )
    .await?;

    tracing::info!(version, path = %up_path.display(), "Created revision");
    Ok(NewRevision {
        version,
        up_path,
        down_path,
    })
}

async fn existing_versions(dir: &Path) -> Result<Vec<i64>> {
    let mut versions = Vec::new();
    let mut entries = tokio::fs::read_dir(dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if let Some(version) = name.split('_').next().and_then(|v| v.parse().ok()) {
            versions.push(version);
        }
    }
    Ok(versions)
}

/// Applies, reverts and reports migrations against one database.
pub struct MigrationService {
    db: AnyPool,
    backend: DatabaseBackend,
    dir: PathBuf,
}

impl MigrationService {
    pub fn new(db: AnyPool, backend: DatabaseBackend, dir: impl Into<PathBuf>) -> Self {
        Self {
            db,
            backend,
            dir: dir.into(),
        }
    }

    async fn migrator(&self) -> Result<Migrator> {
        if !tokio::fs::try_exists(&self.dir).await? {
            return Err(AppError::Config(format!(
                "Migrations directory {} does not exist",
                self.dir.display()
            )));
        }
        Ok(Migrator::new(self.dir.as_path()).await?)
    }

    /// Apply pending migrations up to `target`. Only `head` is accepted.
    /// Returns the versions that were applied.
    pub async fn upgrade(&self, target: &str) -> Result<Vec<i64>> {
        if !target.eq_ignore_ascii_case(HEAD) {
            return Err(AppError::Validation(format!(
                "Unsupported upgrade target '{}', only '{}' is supported",
                target, HEAD
            )));
        }

        let migrator = self.migrator().await?;
        let before = self.current().await?;
        migrator.run(&self.db).await?;
        let after = self.current().await?;

        let applied: Vec<i64> = after
            .iter()
            .map(|r| r.version)
            .filter(|v| !before.iter().any(|b| b.version == *v))
            .collect();

        if applied.is_empty() {
            tracing::info!("Database already at head");
        } else {
            tracing::info!(count = applied.len(), "Applied migrations");
        }
        Ok(applied)
    }

    /// Revert migrations.
    ///
    /// A negative `revision` reverts that many of the most recently applied
    /// migrations (`-1` reverts the latest). A non-negative value reverts
    /// every migration newer than that version. Returns the reverted
    /// versions, newest first.
    pub async fn downgrade(&self, revision: i64) -> Result<Vec<i64>> {
        let applied = self.current().await?;
        let target = downgrade_target(&applied, revision);

        let mut reverted: Vec<i64> = applied
            .iter()
            .map(|r| r.version)
            .filter(|v| *v > target)
            .collect();
        if reverted.is_empty() {
            tracing::info!("Nothing to downgrade");
            return Ok(reverted);
        }

        let migrator = self.migrator().await?;
        migrator.undo(&self.db, target).await?;

        reverted.reverse();
        tracing::info!(count = reverted.len(), target, "Reverted migrations");
        Ok(reverted)
    }

    /// Applied migrations in ascending version order. Empty when the
    /// database has never been migrated.
    pub async fn current(&self) -> Result<Vec<AppliedRevision>> {
        if !self.migrations_table_exists().await? {
            return Ok(Vec::new());
        }

        let rows = sqlx::query(
            "SELECT version, description FROM _sqlx_migrations WHERE success ORDER BY version",
        )
        .fetch_all(&self.db)
        .await?;

        rows.iter()
            .map(|row| {
                Ok(AppliedRevision {
                    version: row.try_get("version")?,
                    description: row.try_get("description")?,
                })
            })
            .collect()
    }

    async fn migrations_table_exists(&self) -> Result<bool> {
        let sql = match self.backend {
            DatabaseBackend::Sqlite => {
                "SELECT COUNT(*) AS n FROM sqlite_master WHERE type = 'table' AND name = '_sqlx_migrations'"
            }
            DatabaseBackend::Postgres => {
                "SELECT COUNT(*) AS n FROM information_schema.tables WHERE table_name = '_sqlx_migrations'"
            }
        };
        let row = sqlx::query(sql).fetch_one(&self.db).await?;
        let count: i64 = row.try_get("n")?;
        Ok(count > 0)
    }
}

/// Resolve the version `downgrade` reverts down to.
fn downgrade_target(applied: &[AppliedRevision], revision: i64) -> i64 {
    if revision >= 0 {
        return revision;
    }
    let steps = revision.unsigned_abs() as usize;
    if steps >= applied.len() {
        0
    } else {
        applied[applied.len() - steps - 1].version
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{connect, DatabaseConfig};

    fn applied(versions: &[i64]) -> Vec<AppliedRevision> {
        versions
            .iter()
            .map(|v| AppliedRevision {
                version: *v,
                description: format!("m{}", v),
            })
            .collect()
    }

    async fn write_pair(dir: &Path, version: i64, name: &str, up: &str, down: &str) {
        tokio::fs::write(dir.join(format!("{}_{}.up.sql", version, name)), up)
            .await
            .unwrap();
        tokio::fs::write(dir.join(format!("{}_{}.down.sql", version, name)), down)
            .await
            .unwrap();
    }

    async fn memory_service(dir: &Path) -> MigrationService {
        let pool = connect(&DatabaseConfig::with_url("sqlite::memory:"))
            .await
            .unwrap();
        MigrationService::new(pool, DatabaseBackend::Sqlite, dir)
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Add report table"), "add_report_table");
        assert_eq!(slugify("  drop -- old  stuff!! "), "drop_old_stuff");
        assert_eq!(slugify("!!!"), "");
    }

    #[test]
    fn test_downgrade_target() {
        let list = applied(&[1, 2, 3]);
        assert_eq!(downgrade_target(&list, -1), 2);
        assert_eq!(downgrade_target(&list, -2), 1);
        assert_eq!(downgrade_target(&list, -3), 0);
        assert_eq!(downgrade_target(&list, -10), 0);
        assert_eq!(downgrade_target(&list, 1), 1);
        assert_eq!(downgrade_target(&[], -1), 0);
    }

    #[tokio::test]
    async fn test_revision_writes_reversible_pair() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("migrations");

        let rev = revision(&target, "Add report table", false).await.unwrap();
        assert!(rev.up_path.exists());
        assert!(rev.down_path.exists());
        let name = rev.up_path.file_name().unwrap().to_string_lossy().to_string();
        assert_eq!(name, format!("{}_add_report_table.up.sql", rev.version));

        let second = revision(&target, "Add report table", true).await.unwrap();
        assert!(second.version > rev.version);
    }

    #[tokio::test]
    async fn test_revision_rejects_empty_message() {
        let dir = tempfile::tempdir().unwrap();
        let err = revision(dir.path(), "  ", false).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn test_upgrade_current_downgrade_cycle() {
        let dir = tempfile::tempdir().unwrap();
        write_pair(
            dir.path(),
            1,
            "create_a",
            "CREATE TABLE a (id TEXT PRIMARY KEY);",
            "DROP TABLE a;",
        )
        .await;
        write_pair(
            dir.path(),
            2,
            "create_b",
            "CREATE TABLE b (id TEXT PRIMARY KEY);",
            "DROP TABLE b;",
        )
        .await;

        let service = memory_service(dir.path()).await;
        assert!(service.current().await.unwrap().is_empty());

        let applied = service.upgrade("head").await.unwrap();
        assert_eq!(applied, vec![1, 2]);
        assert!(service.upgrade("head").await.unwrap().is_empty());

        let current = service.current().await.unwrap();
        assert_eq!(current.len(), 2);
        assert_eq!(current[1].description, "create b");

        let reverted = service.downgrade(-1).await.unwrap();
        assert_eq!(reverted, vec![2]);
        let current = service.current().await.unwrap();
        assert_eq!(current.iter().map(|r| r.version).collect::<Vec<_>>(), vec![1]);

        assert_eq!(service.downgrade(-1).await.unwrap(), vec![1]);
        assert!(service.downgrade(-1).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_upgrade_rejects_non_head_target() {
        let dir = tempfile::tempdir().unwrap();
        let service = memory_service(dir.path()).await;
        let err = service.upgrade("20240101000000").await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn test_missing_directory_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let service = memory_service(&dir.path().join("absent")).await;
        let err = service.upgrade("head").await.unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
    }

    #[tokio::test]
    async fn test_bundled_migrations_apply() {
        let service = memory_service(Path::new(concat!(
            env!("CARGO_MANIFEST_DIR"),
            "/migrations"
        )))
        .await;
        let applied = service.upgrade(HEAD).await.unwrap();
        assert!(!applied.is_empty());
        sqlx::query("SELECT id, component, status, message, checked_at FROM health_check_log")
            .fetch_all(&service.db)
            .await
            .unwrap();
    }
}
