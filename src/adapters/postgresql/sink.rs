//! PostgreSQL relational sink
//!
//! Every call runs in one transaction: schema changes, the mode's pre-delete, and one
//! `INSERT ... RETURNING row_id` per row. Identifiers therefore come back in row order
//! without re-reading the table. Columns whose stored type no longer fits the incoming
//! values are widened first, and over-long keys are shortened to a stable column name.

use super::client::PostgreSQLClient;
use super::ddl::{self, ColumnType};
use crate::adapters::database::{RelationalSink, WriteMode, ROW_ID_COLUMN};
use crate::domain::record::{column_union, value_to_text};
use crate::domain::{BazaarError, DurableId, Record, Result};
use async_trait::async_trait;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use tokio_postgres::types::ToSql;

/// PostgreSQL implementation of [`RelationalSink`]
pub struct PostgreSQLSink {
    client: Arc<PostgreSQLClient>,
}

impl PostgreSQLSink {
    /// Create a new sink
    pub fn new(client: PostgreSQLClient) -> Self {
        Self {
            client: Arc::new(client),
        }
    }

    /// Create a new sink sharing an Arc-wrapped client
    pub fn new_with_arc(client: Arc<PostgreSQLClient>) -> Self {
        Self { client }
    }

    /// Get a reference to the underlying client
    pub fn client(&self) -> &Arc<PostgreSQLClient> {
        &self.client
    }
}

/// Existing columns of `table` mapped to their `udt_name`, or `None` if it doesn't exist
async fn existing_columns(
    tx: &tokio_postgres::Transaction<'_>,
    table: &str,
) -> Result<Option<HashMap<String, String>>> {
    let rows = tx
        .query(
            "SELECT column_name::text, udt_name::text FROM information_schema.columns \
             WHERE table_schema = current_schema() AND table_name = $1",
            &[&table],
        )
        .await
        .map_err(|e| BazaarError::persistence(table, e.to_string()))?;

    if rows.is_empty() {
        return Ok(None);
    }

    let mut columns = HashMap::with_capacity(rows.len());
    for row in rows {
        let name: String = row
            .try_get(0)
            .map_err(|e| BazaarError::persistence(table, e.to_string()))?;
        let udt: String = row
            .try_get(1)
            .map_err(|e| BazaarError::persistence(table, e.to_string()))?;
        columns.insert(name, udt);
    }
    Ok(Some(columns))
}

#[async_trait]
impl RelationalSink for PostgreSQLSink {
    async fn test_connection(&self) -> Result<()> {
        self.client.test_connection().await
    }

    async fn insert_returning_ids(
        &self,
        table: &str,
        rows: &[Record],
        mode: &WriteMode,
    ) -> Result<Vec<DurableId>> {
        let err = |e: tokio_postgres::Error| BazaarError::persistence(table, e.to_string());

        // (source key, stored column name)
        let columns: Vec<(String, String)> = column_union(rows)
            .into_iter()
            .filter(|c| {
                let reserved = c == ROW_ID_COLUMN;
                if reserved {
                    tracing::warn!(table = table, column = %c, "Skipping reserved column");
                }
                !reserved
            })
            .map(|c| {
                let stored = ddl::column_name(&c);
                if stored != c {
                    tracing::debug!(table = table, column = %c, stored = %stored, "Shortened column name");
                }
                (c, stored)
            })
            .collect();

        let mut conn = self.client.get_connection().await?;
        let tx = conn.transaction().await.map_err(err)?;

        let existing = if *mode == WriteMode::Replace {
            tx.batch_execute(&format!("DROP TABLE IF EXISTS {}", ddl::quote_ident(table)))
                .await
                .map_err(err)?;
            None
        } else {
            existing_columns(&tx, table).await?
        };

        if existing.is_none() && rows.is_empty() && *mode != WriteMode::Replace {
            tx.commit().await.map_err(err)?;
            return Ok(Vec::new());
        }

        let mut typed: Vec<(String, String)> = Vec::with_capacity(columns.len());
        match &existing {
            None => {
                let inferred: Vec<(String, ColumnType)> = columns
                    .iter()
                    .map(|(source, stored)| (stored.clone(), ColumnType::infer(rows, source)))
                    .collect();
                tx.batch_execute(&ddl::create_table(table, &inferred, true))
                    .await
                    .map_err(err)?;
                typed.extend(inferred.into_iter().map(|(c, t)| (c, t.udt().to_string())));
            }
            Some(present) => {
                for (source, stored) in &columns {
                    match present.get(stored) {
                        Some(udt) => {
                            let widened = ColumnType::from_udt(udt).and_then(|current| {
                                ColumnType::infer_present(rows, source)
                                    .and_then(|incoming| current.widen_for(incoming))
                            });
                            match widened {
                                Some(ty) => {
                                    tx.batch_execute(&ddl::alter_column_type(table, stored, ty))
                                        .await
                                        .map_err(err)?;
                                    tracing::info!(table = table, column = %stored, from = %udt, to = ty.udt(), "Widened column type");
                                    typed.push((stored.clone(), ty.udt().to_string()));
                                }
                                None => typed.push((stored.clone(), udt.clone())),
                            }
                        }
                        None => {
                            let ty = ColumnType::infer(rows, source);
                            tx.batch_execute(&ddl::add_column(table, stored, ty))
                                .await
                                .map_err(err)?;
                            typed.push((stored.clone(), ty.udt().to_string()));
                        }
                    }
                }
            }
        }

        if let Some(present) = &existing {
            match mode {
                WriteMode::AppendReplacingAll => {
                    let deleted = tx.execute(&ddl::delete_all(table), &[]).await.map_err(err)?;
                    tracing::info!(table = table, deleted = deleted, "Cleared previous rows");
                }
                WriteMode::AppendReplacingDateRange { column, start, end } => {
                    let stored = ddl::column_name(column);
                    if let Some(udt) = present.get(&stored) {
                        let bounds = [
                            start.format("%Y-%m-%d").to_string(),
                            end.format("%Y-%m-%d").to_string(),
                        ];
                        let deleted = tx
                            .execute(
                                &ddl::delete_date_range(table, &stored, udt),
                                &[&bounds[0], &bounds[1]],
                            )
                            .await
                            .map_err(err)?;
                        tracing::info!(table = table, deleted = deleted, %start, %end, "Deleted rows in date range");
                    }
                }
                WriteMode::AppendReplacingIds { column } => {
                    let stored = ddl::column_name(column);
                    if present.contains_key(&stored) {
                        let ids: Vec<String> = rows
                            .iter()
                            .filter_map(|r| r.get(column).and_then(value_to_text))
                            .collect::<BTreeSet<_>>()
                            .into_iter()
                            .collect();
                        let deleted = tx
                            .execute(&ddl::delete_ids(table, &stored), &[&ids])
                            .await
                            .map_err(err)?;
                        tracing::info!(table = table, deleted = deleted, "Deleted rows by id");
                    }
                }
                WriteMode::Replace | WriteMode::Append => {}
            }
        }

        let mut ids = Vec::with_capacity(rows.len());
        if !rows.is_empty() {
            let statement = tx
                .prepare(&ddl::insert_returning(table, &typed))
                .await
                .map_err(err)?;

            for row in rows {
                let values: Vec<Option<String>> = columns
                    .iter()
                    .map(|(source, _)| row.get(source).and_then(value_to_text))
                    .collect();
                let params: Vec<&(dyn ToSql + Sync)> =
                    values.iter().map(|v| v as &(dyn ToSql + Sync)).collect();

                let returned = tx.query_one(&statement, &params).await.map_err(err)?;
                let id: i64 = returned.try_get(0).map_err(err)?;
                ids.push(DurableId::new(id));
            }
        }

        tx.commit().await.map_err(err)?;

        tracing::debug!(table = table, rows = ids.len(), mode = %mode, "PostgreSQL write committed");
        Ok(ids)
    }

    async fn read_back_ids(&self, table: &str, count: usize) -> Result<Vec<DurableId>> {
        let conn = self.client.get_connection().await?;
        let id = ddl::quote_ident(ROW_ID_COLUMN);
        let query = format!(
            "SELECT {id} FROM (SELECT {id} FROM {} ORDER BY {id} DESC LIMIT $1) recent ORDER BY {id} ASC",
            ddl::quote_ident(table)
        );

        let rows = conn
            .query(&query, &[&(count as i64)])
            .await
            .map_err(|e| BazaarError::persistence(table, e.to_string()))?;

        rows.iter()
            .map(|row| {
                row.try_get::<_, i64>(0)
                    .map(DurableId::new)
                    .map_err(|e| BazaarError::persistence(table, e.to_string()))
            })
            .collect()
    }

    fn name(&self) -> &str {
        "postgresql"
    }
}
