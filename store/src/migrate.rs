//! Migration tracking for the PostgreSQL schema.
//!
//! Scripts are embedded in the binary and applied in ascending version
//! order, each inside its own transaction. An `applied_migration` table
//! records what has run; a recorded version or name the binary does not
//! know about aborts the run before anything is applied.

use crate::error::StoreError;

/// One embedded migration script.
#[derive(Debug, Clone, Copy)]
pub struct Migration {
    pub version: i64,
    pub name: &'static str,
    pub sql: &'static str,
}

/// Migration errors.
#[derive(Debug, thiserror::Error)]
pub enum MigrateError {
    #[error("invalid migration set: {0}")]
    InvalidSet(String),

    #[error("migration drift: applied version {version} ({applied}) does not match embedded set")]
    Drift { version: i64, applied: String },

    #[error("migration {version} ({name}) failed: {source}")]
    Failed {
        version: i64,
        name: &'static str,
        #[source]
        source: StoreError,
    },

    #[error("backend error: {0}")]
    Backend(String),
}

const CREATE_TRACKING_TABLE: &str = "CREATE TABLE IF NOT EXISTS applied_migration (\
     version bigint PRIMARY KEY, \
     name text NOT NULL, \
     applied_at timestamptz NOT NULL DEFAULT now())";

/// Applies embedded migration scripts and tracks them.
pub struct Migrator {
    migrations: Vec<Migration>,
}

impl Migrator {
    /// The full embedded script set for the questionnaire schema.
    pub fn embedded() -> Self {
        // new() cannot fail on the embedded set; the validation test below
        // keeps it that way.
        Self::new(vec![
            Migration {
                version: 1,
                name: "base_schema",
                sql: include_str!("../migrations/0001_base_schema.sql"),
            },
            Migration {
                version: 2,
                name: "navigation_indexes",
                sql: include_str!("../migrations/0002_navigation_indexes.sql"),
            },
        ])
        .unwrap()
    }

    /// Validate and build a migrator over an explicit script set.
    ///
    /// Versions must be unique, positive, and contiguous from 1; names must
    /// be unique and non-empty.
    pub fn new(mut migrations: Vec<Migration>) -> Result<Self, MigrateError> {
        migrations.sort_by_key(|m| m.version);
        for (index, migration) in migrations.iter().enumerate() {
            let expected = index as i64 + 1;
            if migration.version != expected {
                return Err(MigrateError::InvalidSet(format!(
                    "expected version {expected}, found {}",
                    migration.version
                )));
            }
            if migration.name.is_empty() {
                return Err(MigrateError::InvalidSet(format!(
                    "version {} has an empty name",
                    migration.version
                )));
            }
            if migrations[..index].iter().any(|m| m.name == migration.name) {
                return Err(MigrateError::InvalidSet(format!(
                    "duplicate name {:?}",
                    migration.name
                )));
            }
        }
        Ok(Self { migrations })
    }

    pub fn migrations(&self) -> &[Migration] {
        &self.migrations
    }

    /// The scripts that still need to run, given the applied
    /// `(version, name)` pairs. Fails on drift: an applied version the set
    /// does not contain, or an applied name that disagrees.
    pub fn pending(
        &self,
        applied: &[(i64, String)],
    ) -> Result<Vec<&Migration>, MigrateError> {
        for (version, name) in applied {
            match self.migrations.iter().find(|m| m.version == *version) {
                Some(known) if known.name == name => {}
                _ => {
                    return Err(MigrateError::Drift {
                        version: *version,
                        applied: name.clone(),
                    });
                }
            }
        }
        Ok(self
            .migrations
            .iter()
            .filter(|m| !applied.iter().any(|(v, _)| *v == m.version))
            .collect())
    }

    /// Apply all pending migrations. Returns how many scripts ran.
    pub async fn run(&self, pool: &sqlx::PgPool) -> Result<u32, MigrateError> {
        sqlx::query(CREATE_TRACKING_TABLE)
            .execute(pool)
            .await
            .map_err(|e| MigrateError::Backend(e.to_string()))?;

        let applied: Vec<(i64, String)> = sqlx::query_as(
            "SELECT version, name FROM applied_migration ORDER BY version",
        )
        .fetch_all(pool)
        .await
        .map_err(|e| MigrateError::Backend(e.to_string()))?;

        let pending = self.pending(&applied)?;
        let mut ran = 0u32;

        for migration in pending {
            let mut tx = pool
                .begin()
                .await
                .map_err(|e| MigrateError::Backend(e.to_string()))?;

            sqlx::raw_sql(migration.sql)
                .execute(&mut *tx)
                .await
                .map_err(|e| MigrateError::Failed {
                    version: migration.version,
                    name: migration.name,
                    source: StoreError::QueryFailed(e.to_string()),
                })?;

            sqlx::query("INSERT INTO applied_migration (version, name) VALUES ($1, $2)")
                .bind(migration.version)
                .bind(migration.name)
                .execute(&mut *tx)
                .await
                .map_err(|e| MigrateError::Backend(e.to_string()))?;

            tx.commit()
                .await
                .map_err(|e| MigrateError::Backend(e.to_string()))?;

            tracing::info!(
                formway.migrate.version = migration.version,
                formway.migrate.name = migration.name,
                "Applied migration"
            );
            ran += 1;
        }

        Ok(ran)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn script(version: i64, name: &'static str) -> Migration {
        Migration {
            version,
            name,
            sql: "SELECT 1",
        }
    }

    #[test]
    fn test_embedded_set_is_valid() {
        let migrator = Migrator::embedded();
        assert_eq!(migrator.migrations().len(), 2);
        assert_eq!(migrator.migrations()[0].name, "base_schema");
    }

    #[test]
    fn test_set_is_sorted_and_contiguous() {
        let migrator =
            Migrator::new(vec![script(2, "second"), script(1, "first")]).unwrap();
        let versions: Vec<i64> = migrator.migrations().iter().map(|m| m.version).collect();
        assert_eq!(versions, vec![1, 2]);

        assert!(Migrator::new(vec![script(1, "first"), script(3, "third")]).is_err());
        assert!(Migrator::new(vec![script(1, "a"), script(1, "b")]).is_err());
        assert!(Migrator::new(vec![script(1, "a"), script(2, "a")]).is_err());
        assert!(Migrator::new(vec![script(1, "")]).is_err());
    }

    #[test]
    fn test_pending_skips_applied_versions() {
        let migrator =
            Migrator::new(vec![script(1, "first"), script(2, "second")]).unwrap();
        let pending = migrator.pending(&[(1, "first".into())]).unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].version, 2);

        let pending = migrator
            .pending(&[(1, "first".into()), (2, "second".into())])
            .unwrap();
        assert!(pending.is_empty());
    }

    #[test]
    fn test_unknown_applied_version_is_drift() {
        let migrator = Migrator::new(vec![script(1, "first")]).unwrap();
        let err = migrator.pending(&[(7, "mystery".into())]).unwrap_err();
        assert!(matches!(err, MigrateError::Drift { version: 7, .. }));
    }

    #[test]
    fn test_renamed_applied_script_is_drift() {
        let migrator = Migrator::new(vec![script(1, "first")]).unwrap();
        let err = migrator.pending(&[(1, "renamed".into())]).unwrap_err();
        assert!(matches!(err, MigrateError::Drift { version: 1, .. }));
    }
}
