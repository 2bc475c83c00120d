use anyhow::Context;
use rusqlite::{params, Connection, OptionalExtension};

/// Schema changes in the order they are applied. The SQL is compiled into
/// the binary, so the server does not depend on its working directory.
const MIGRATIONS: &[(&str, &str)] = &[
    (
        "001_bookings.sql",
        include_str!("../../migrations/001_bookings.sql"),
    ),
    (
        "002_catalog_settings.sql",
        include_str!("../../migrations/002_catalog_settings.sql"),
    ),
];

pub fn run_migrations(conn: &Connection) -> anyhow::Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS _migrations (
            name TEXT PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );",
    )
    .context("failed to create migrations table")?;

    for (name, sql) in MIGRATIONS {
        let applied_at: Option<String> = conn
            .query_row(
                "SELECT applied_at FROM _migrations WHERE name = ?1",
                params![name],
                |row| row.get(0),
            )
            .optional()
            .context("failed to check migration status")?;
        if applied_at.is_some() {
            continue;
        }

        let tx = conn
            .unchecked_transaction()
            .with_context(|| format!("failed to start migration {name}"))?;
        tx.execute_batch(sql)
            .with_context(|| format!("failed to apply migration {name}"))?;
        tx.execute("INSERT INTO _migrations (name) VALUES (?1)", params![name])
            .with_context(|| format!("failed to record migration {name}"))?;
        tx.commit()
            .with_context(|| format!("failed to commit migration {name}"))?;

        tracing::info!(migration = %name, "applied migration");
    }

    Ok(())
}
