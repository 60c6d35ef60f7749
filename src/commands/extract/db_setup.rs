use std::path::Path;

use anyhow::{Context, Result};
use rusqlite::{Connection, params};

use crate::model::PdfEntry;
use crate::util::now_utc_string;

use super::types::{RecommendationExport, RecommendationRecord, TableOfContents};

pub(crate) const DB_SCHEMA_VERSION: &str = "0.1.0";

pub(crate) fn open_store(db_path: &Path) -> Result<Connection> {
    let connection = Connection::open(db_path)
        .with_context(|| format!("failed to open {}", db_path.display()))?;
    configure_connection(&connection)?;
    ensure_schema(&connection)?;
    Ok(connection)
}

fn configure_connection(connection: &Connection) -> Result<()> {
    connection
        .pragma_update(None, "journal_mode", "WAL")
        .context("failed to set journal_mode=WAL")?;
    connection
        .pragma_update(None, "synchronous", "NORMAL")
        .context("failed to set synchronous=NORMAL")?;
    Ok(())
}

pub(crate) fn ensure_schema(connection: &Connection) -> Result<()> {
    connection
        .execute_batch(
            "
            CREATE TABLE IF NOT EXISTS metadata (
              key TEXT PRIMARY KEY,
              value TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS docs (
              doc_id TEXT PRIMARY KEY,
              filename TEXT NOT NULL,
              sha256 TEXT NOT NULL,
              benchmark TEXT,
              version TEXT,
              total_pages INTEGER,
              toc_source TEXT,
              extracted_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS recommendations (
              doc_id TEXT NOT NULL,
              rec_seq INTEGER NOT NULL,
              rec_id TEXT NOT NULL,
              title TEXT NOT NULL,
              profile_applicability TEXT NOT NULL DEFAULT '',
              description TEXT NOT NULL DEFAULT '',
              rationale TEXT NOT NULL DEFAULT '',
              impact TEXT NOT NULL DEFAULT '',
              audit TEXT NOT NULL DEFAULT '',
              remediation TEXT NOT NULL DEFAULT '',
              default_value TEXT NOT NULL DEFAULT '',
              PRIMARY KEY (doc_id, rec_seq),
              FOREIGN KEY(doc_id) REFERENCES docs(doc_id)
            );

            CREATE TABLE IF NOT EXISTS toc_entries (
              doc_id TEXT NOT NULL,
              entry_seq INTEGER NOT NULL,
              level INTEGER NOT NULL,
              toc_id TEXT NOT NULL,
              title TEXT NOT NULL,
              page INTEGER NOT NULL,
              PRIMARY KEY (doc_id, entry_seq),
              FOREIGN KEY(doc_id) REFERENCES docs(doc_id)
            );

            CREATE INDEX IF NOT EXISTS idx_recommendations_doc_rec ON recommendations(doc_id, rec_id);
            CREATE INDEX IF NOT EXISTS idx_toc_entries_doc_toc ON toc_entries(doc_id, toc_id);
            ",
        )
        .context("failed to initialize benchmark schema")?;

    let now = now_utc_string();
    connection.execute(
        "INSERT INTO metadata(key, value) VALUES('db_schema_version', ?1)
         ON CONFLICT(key) DO UPDATE SET value=excluded.value",
        [DB_SCHEMA_VERSION],
    )?;
    connection.execute(
        "INSERT INTO metadata(key, value) VALUES('db_updated_at', ?1)
         ON CONFLICT(key) DO UPDATE SET value=excluded.value",
        [now],
    )?;

    Ok(())
}

/// Replaces everything stored for `doc_id` with this run's records and index.
pub(crate) fn store_benchmark(
    connection: &mut Connection,
    doc_id: &str,
    pdf: &PdfEntry,
    records: &[RecommendationRecord],
    toc: &TableOfContents,
) -> Result<()> {
    let tx = connection.transaction()?;

    tx.execute(
        "
        INSERT INTO docs(doc_id, filename, sha256, benchmark, version, total_pages, toc_source, extracted_at)
        VALUES(?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
        ON CONFLICT(doc_id) DO UPDATE SET
          filename=excluded.filename,
          sha256=excluded.sha256,
          benchmark=excluded.benchmark,
          version=excluded.version,
          total_pages=excluded.total_pages,
          toc_source=excluded.toc_source,
          extracted_at=excluded.extracted_at
        ",
        params![
            doc_id,
            &pdf.filename,
            &pdf.sha256,
            &pdf.benchmark,
            &pdf.version,
            toc.total_pages,
            toc.source.as_str(),
            now_utc_string()
        ],
    )
    .with_context(|| format!("failed to upsert document row for {doc_id}"))?;

    tx.execute("DELETE FROM recommendations WHERE doc_id = ?1", [doc_id])?;
    tx.execute("DELETE FROM toc_entries WHERE doc_id = ?1", [doc_id])?;

    {
        let mut statement = tx.prepare(
            "
            INSERT INTO recommendations(
              doc_id, rec_seq, rec_id, title, profile_applicability, description,
              rationale, impact, audit, remediation, default_value
            )
            VALUES(?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            ",
        )?;

        for (seq, record) in records.iter().enumerate() {
            let row = RecommendationExport::from(record);
            statement.execute(params![
                doc_id,
                seq as i64,
                row.id,
                row.title,
                row.profile_applicability,
                row.description,
                row.rationale,
                row.impact,
                row.audit,
                row.remediation,
                row.default_value
            ])?;
        }
    }

    {
        let mut statement = tx.prepare(
            "
            INSERT INTO toc_entries(doc_id, entry_seq, level, toc_id, title, page)
            VALUES(?1, ?2, ?3, ?4, ?5, ?6)
            ",
        )?;

        for (seq, entry) in toc.entries.iter().enumerate() {
            statement.execute(params![
                doc_id,
                seq as i64,
                entry.level,
                &entry.id,
                &entry.title,
                entry.page
            ])?;
        }
    }

    tx.commit()
        .with_context(|| format!("failed to commit benchmark rows for {doc_id}"))?;
    Ok(())
}

pub(crate) fn count_rows(connection: &Connection, sql: &str) -> Result<i64> {
    let count = connection.query_row(sql, [], |row| row.get(0))?;
    Ok(count)
}
