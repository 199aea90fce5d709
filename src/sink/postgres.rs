//! PostgreSQL sink (feature `postgres`).
//!
//! The ingestion pipeline is synchronous, so the sink drives one `sqlx` connection from a private
//! current-thread tokio runtime and blocks on every call.

use sqlx::postgres::{PgConnectOptions, PgConnection};
use sqlx::{Connection, Postgres, QueryBuilder, Row};
use tokio::runtime::{Builder, Runtime};

use crate::error::{IngestionError, IngestionResult};
use crate::types::{DataType, Frame, Schema, Value};

use super::{column_list, create_table_sql, quote_ident, ConnectionSettings, TableShape, TableSink};

/// PostgreSQL limit on bind parameters per statement.
const MAX_BIND_PARAMS: usize = 65_535;

/// SQLSTATE `invalid_catalog_name`: the target database does not exist.
const UNKNOWN_DATABASE: &str = "3D000";

/// A single PostgreSQL connection used for the whole run.
pub struct PostgresSink {
    runtime: Runtime,
    conn: PgConnection,
}

impl PostgresSink {
    /// Connect with `settings`, creating the database first if it does not exist yet.
    pub fn connect(settings: &ConnectionSettings) -> IngestionResult<Self> {
        let runtime = Builder::new_current_thread().enable_all().build()?;
        let conn = runtime.block_on(connect_or_create(settings))?;
        tracing::info!(
            host = %settings.host,
            port = settings.port,
            database = %settings.database,
            "connected to postgres"
        );
        Ok(Self { runtime, conn })
    }
}

fn options(settings: &ConnectionSettings, database: &str) -> PgConnectOptions {
    PgConnectOptions::new()
        .host(&settings.host)
        .port(settings.port)
        .username(&settings.username)
        .password(&settings.password)
        .database(database)
}

async fn connect_or_create(settings: &ConnectionSettings) -> IngestionResult<PgConnection> {
    match PgConnection::connect_with(&options(settings, &settings.database)).await {
        Ok(conn) => Ok(conn),
        Err(sqlx::Error::Database(db)) if db.code().as_deref() == Some(UNKNOWN_DATABASE) => {
            tracing::warn!(database = %settings.database, "database does not exist, creating it");
            let mut admin = PgConnection::connect_with(&options(settings, "postgres")).await?;
            sqlx::raw_sql(&format!("CREATE DATABASE {}", quote_ident(&settings.database)))
                .execute(&mut admin)
                .await?;
            admin.close().await?;
            Ok(PgConnection::connect_with(&options(settings, &settings.database)).await?)
        }
        Err(e) => Err(e.into()),
    }
}

impl TableSink for PostgresSink {
    fn backend(&self) -> &'static str {
        "postgres"
    }

    fn ensure_history_table(&mut self) -> IngestionResult<()> {
        let Self { runtime, conn } = self;
        runtime.block_on(async move {
            sqlx::raw_sql(
                "CREATE SCHEMA IF NOT EXISTS history; \
                 CREATE TABLE IF NOT EXISTS history.completed_queries (\
                 id SERIAL PRIMARY KEY, \
                 query_sql TEXT, \
                 time TIMESTAMP DEFAULT CURRENT_TIMESTAMP)",
            )
            .execute(&mut *conn)
            .await?;
            Ok::<_, IngestionError>(())
        })
    }

    fn table_schema(&mut self, table: &str) -> IngestionResult<Option<TableShape>> {
        let Self { runtime, conn } = self;
        runtime.block_on(async move {
            let rows = sqlx::query(
                "SELECT column_name::text, data_type::text FROM information_schema.columns \
                 WHERE table_schema = current_schema() AND table_name = $1 \
                 ORDER BY ordinal_position",
            )
            .bind(table)
            .fetch_all(&mut *conn)
            .await?;

            if rows.is_empty() {
                return Ok(None);
            }
            let mut columns = Vec::with_capacity(rows.len());
            for row in rows {
                let name: String = row.try_get(0)?;
                let ty: String = row.try_get(1)?;
                columns.push((name, DataType::from_sql_name(&ty)));
            }
            Ok::<_, IngestionError>(Some(TableShape { columns }))
        })
    }

    fn create_table(&mut self, table: &str, schema: &Schema) -> IngestionResult<()> {
        let sql = create_table_sql(table, schema);
        let Self { runtime, conn } = self;
        runtime.block_on(async move {
            sqlx::raw_sql(&sql).execute(&mut *conn).await?;
            Ok::<_, IngestionError>(())
        })
    }

    fn append(&mut self, table: &str, frame: &Frame) -> IngestionResult<usize> {
        if frame.rows.is_empty() {
            return Ok(0);
        }
        let head = format!("INSERT INTO {} ({}) ", quote_ident(table), column_list(&frame.schema));
        let rows_per_batch = (MAX_BIND_PARAMS / frame.column_count().max(1)).max(1);
        let types: Vec<DataType> = frame.schema.fields.iter().map(|f| f.data_type).collect();

        let Self { runtime, conn } = self;
        runtime.block_on(async move {
            let mut tx = conn.begin().await?;
            for batch in frame.rows.chunks(rows_per_batch) {
                let mut qb: QueryBuilder<Postgres> = QueryBuilder::new(head.as_str());
                qb.push_values(batch, |mut b, row| {
                    for (value, ty) in row.iter().zip(&types) {
                        match ty {
                            DataType::Int64 => b.push_bind(match value {
                                Value::Int64(v) => Some(*v),
                                _ => None,
                            }),
                            DataType::Float64 => b.push_bind(value.as_f64()),
                            DataType::Bool => b.push_bind(match value {
                                Value::Bool(v) => Some(*v),
                                _ => None,
                            }),
                            DataType::Utf8 => b.push_bind(match value {
                                Value::Utf8(v) => Some(v.clone()),
                                _ => None,
                            }),
                        };
                    }
                });
                qb.build().execute(&mut *tx).await?;
            }
            tx.commit().await?;
            Ok::<_, IngestionError>(frame.row_count())
        })
    }
}
