//! SQLite-backed [`VectorStore`] implementation.
//!
//! Records live in the `records` table keyed by `(collection, id)`, with
//! metadata stored as JSON and filtered through `json_extract`. Text is
//! mirrored into the `records_fts` FTS5 table, and queries are ranked by
//! `bm25`.

use std::path::Path;

use anyhow::Result;
use async_trait::async_trait;
use sqlx::sqlite::{SqliteArguments, SqliteRow};
use sqlx::{Row, Sqlite, SqlitePool};

use crate::db;
use crate::error::StoreResult;
use crate::migrate;
use crate::models::{Metadata, Record};

use super::{query_terms, Filter, VectorStore};

type SqliteQuery<'q> = sqlx::query::Query<'q, Sqlite, SqliteArguments<'q>>;

/// A bound SQL parameter produced from a filter clause.
#[derive(Debug, Clone)]
enum Param {
    Text(String),
    Int(i64),
    Real(f64),
}

/// SQLite implementation of the [`VectorStore`] trait, bound to one
/// collection.
pub struct SqliteStore {
    pool: SqlitePool,
    collection: String,
}

impl SqliteStore {
    /// Open (creating if needed) the database at `path` and register the
    /// collection.
    pub async fn open(path: &Path, collection: &str) -> Result<Self> {
        let pool = db::connect(path).await?;
        migrate::run_migrations(&pool).await?;

        sqlx::query(
            "INSERT OR IGNORE INTO collections (name, description, created_at) VALUES (?, ?, ?)",
        )
        .bind(collection)
        .bind("Knowledge base for agent context retrieval")
        .bind(chrono::Utc::now().timestamp())
        .execute(&pool)
        .await?;

        Ok(Self {
            pool,
            collection: collection.to_string(),
        })
    }

}

/// ` AND json_extract(...) = ?` clauses for `filter`, plus their parameters.
fn filter_clause(filter: Option<&Filter>, alias: &str) -> StoreResult<(String, Vec<Param>)> {
    let mut sql = String::new();
    let mut params = Vec::new();

    let Some(filter) = filter else {
        return Ok((sql, params));
    };
    filter.validate()?;

    for (key, value) in filter.clauses() {
        sql.push_str(&format!(
            " AND json_extract({}.metadata_json, ?) = ?",
            alias
        ));
        params.push(Param::Text(format!("$.{}", key)));
        params.push(match value {
            serde_json::Value::String(s) => Param::Text(s.clone()),
            serde_json::Value::Bool(b) => Param::Int(i64::from(*b)),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Param::Int(i),
                None => Param::Real(n.as_f64().unwrap_or_default()),
            },
            // validate() admits scalars only
            _ => Param::Text(value.to_string()),
        });
    }

    Ok((sql, params))
}

fn bind_params<'q>(mut query: SqliteQuery<'q>, params: &'q [Param]) -> SqliteQuery<'q> {
    for param in params {
        query = match param {
            Param::Text(s) => query.bind(s.as_str()),
            Param::Int(i) => query.bind(*i),
            Param::Real(f) => query.bind(*f),
        };
    }
    query
}

fn row_to_record(row: &SqliteRow) -> StoreResult<Record> {
    let metadata_json: String = row.get("metadata_json");
    let metadata: Metadata = serde_json::from_str(&metadata_json)?;
    Ok(Record {
        id: row.get("id"),
        text: row.get("text"),
        metadata,
    })
}

/// FTS5 match expression: each term quoted, any term may match.
fn match_expression(terms: &[String]) -> String {
    terms
        .iter()
        .map(|t| format!("\"{}\"", t))
        .collect::<Vec<_>>()
        .join(" OR ")
}

fn sql_limit(limit: Option<usize>) -> i64 {
    // SQLite treats a negative LIMIT as unbounded
    limit.map_or(-1, |l| i64::try_from(l).unwrap_or(i64::MAX))
}

#[async_trait]
impl VectorStore for SqliteStore {
    fn collection(&self) -> &str {
        &self.collection
    }

    async fn upsert(&self, records: &[Record]) -> StoreResult<()> {
        let now = chrono::Utc::now().timestamp();
        let mut tx = self.pool.begin().await?;

        for record in records {
            let metadata_json = serde_json::to_string(&record.metadata)?;

            sqlx::query(
                r#"
                INSERT INTO records (collection, id, text, metadata_json, created_at, updated_at)
                VALUES (?, ?, ?, ?, ?, ?)
                ON CONFLICT(collection, id) DO UPDATE SET
                    text = excluded.text,
                    metadata_json = excluded.metadata_json,
                    updated_at = excluded.updated_at
                "#,
            )
            .bind(&self.collection)
            .bind(&record.id)
            .bind(&record.text)
            .bind(&metadata_json)
            .bind(now)
            .bind(now)
            .execute(&mut *tx)
            .await?;

            sqlx::query("DELETE FROM records_fts WHERE collection = ? AND record_id = ?")
                .bind(&self.collection)
                .bind(&record.id)
                .execute(&mut *tx)
                .await?;

            sqlx::query("INSERT INTO records_fts (collection, record_id, text) VALUES (?, ?, ?)")
                .bind(&self.collection)
                .bind(&record.id)
                .bind(&record.text)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn query(
        &self,
        text: &str,
        n: usize,
        filter: Option<&Filter>,
    ) -> StoreResult<Vec<Record>> {
        let (filter_sql, params) = filter_clause(filter, "r")?;
        let terms = query_terms(text);
        if terms.is_empty() || n == 0 {
            return Ok(Vec::new());
        }

        let sql = format!(
            r#"
            SELECT r.id, r.text, r.metadata_json
            FROM records_fts
            JOIN records r
              ON r.collection = records_fts.collection AND r.id = records_fts.record_id
            WHERE records_fts MATCH ? AND records_fts.collection = ?{}
            ORDER BY records_fts.rank, r.created_at, r.rowid
            LIMIT ?
            "#,
            filter_sql
        );

        let query = sqlx::query(&sql)
            .bind(match_expression(&terms))
            .bind(&self.collection);
        let rows = bind_params(query, &params)
            .bind(sql_limit(Some(n)))
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(row_to_record).collect()
    }

    async fn get(&self, filter: Option<&Filter>, limit: Option<usize>) -> StoreResult<Vec<Record>> {
        let (filter_sql, params) = filter_clause(filter, "r")?;
        let sql = format!(
            r#"
            SELECT r.id, r.text, r.metadata_json
            FROM records r
            WHERE r.collection = ?{}
            ORDER BY r.created_at, r.rowid
            LIMIT ?
            "#,
            filter_sql
        );

        let query = sqlx::query(&sql).bind(&self.collection);
        let rows = bind_params(query, &params)
            .bind(sql_limit(limit))
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(row_to_record).collect()
    }

    async fn delete_ids(&self, ids: &[String]) -> StoreResult<u64> {
        let mut tx = self.pool.begin().await?;
        let mut removed = 0u64;

        for id in ids {
            sqlx::query("DELETE FROM records_fts WHERE collection = ? AND record_id = ?")
                .bind(&self.collection)
                .bind(id)
                .execute(&mut *tx)
                .await?;

            let result = sqlx::query("DELETE FROM records WHERE collection = ? AND id = ?")
                .bind(&self.collection)
                .bind(id)
                .execute(&mut *tx)
                .await?;
            removed += result.rows_affected();
        }

        tx.commit().await?;
        Ok(removed)
    }

    async fn delete_where(&self, filter: Option<&Filter>) -> StoreResult<u64> {
        match filter {
            Some(f) if !f.is_empty() => {
                let ids: Vec<String> = self
                    .get(Some(f), None)
                    .await?
                    .into_iter()
                    .map(|r| r.id)
                    .collect();
                if ids.is_empty() {
                    return Ok(0);
                }
                self.delete_ids(&ids).await
            }
            _ => {
                let mut tx = self.pool.begin().await?;
                sqlx::query("DELETE FROM records_fts WHERE collection = ?")
                    .bind(&self.collection)
                    .execute(&mut *tx)
                    .await?;
                let result = sqlx::query("DELETE FROM records WHERE collection = ?")
                    .bind(&self.collection)
                    .execute(&mut *tx)
                    .await?;
                tx.commit().await?;
                Ok(result.rows_affected())
            }
        }
    }

    async fn count(&self) -> StoreResult<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM records WHERE collection = ?")
            .bind(&self.collection)
            .fetch_one(&self.pool)
            .await?;
        Ok(count.max(0) as u64)
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}
