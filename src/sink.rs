use log::{info, error};
use postgres::{Client, NoTls, Statement};

use crate::config::is_plain_identifier;
use crate::error::{PipelineError, Result, StoreError};
use crate::record::{ListingRecord, RunBatch};

/// Destination for listing rows.
pub trait BookStore {
    /// Creates the destination table when it does not exist yet.
    fn ensure_table(&mut self) -> std::result::Result<(), StoreError>;

    /// Inserts one row and returns its assigned id.
    fn insert(&mut self, record: &ListingRecord) -> std::result::Result<i64, StoreError>;
}

/// Postgres backed store. Each statement runs in its own implicit transaction.
pub struct PostgresStore {
    client: Client,
    table: String,
    // prepared on first insert, once the table is known to exist
    insert_stmt: Option<Statement>,
}

impl PostgresStore {
    pub fn connect(conn_str: &str, table: &str) -> Result<Self> {
        if !is_plain_identifier(table) {
            return Err(PipelineError::Config(format!(
                "table name {:?} is not a plain SQL identifier",
                table
            )));
        }
        let client = Client::connect(conn_str, NoTls)?;
        Ok(PostgresStore {
            client,
            table: table.to_string(),
            insert_stmt: None,
        })
    }

    /// Table names are quoted so reserved words such as `user` stay usable.
    pub fn create_table_sql(table: &str) -> String {
        format!(
            "CREATE TABLE IF NOT EXISTS \"{}\" (
                id SERIAL PRIMARY KEY,
                title TEXT NOT NULL,
                author TEXT,
                price TEXT,
                rating TEXT
            )",
            table
        )
    }

    pub fn insert_sql(table: &str) -> String {
        format!(
            "INSERT INTO \"{}\" (title, author, price, rating) VALUES ($1, $2, $3, $4) RETURNING id",
            table
        )
    }
}

impl BookStore for PostgresStore {
    fn ensure_table(&mut self) -> std::result::Result<(), StoreError> {
        self.client
            .batch_execute(&Self::create_table_sql(&self.table))?;
        Ok(())
    }

    fn insert(&mut self, record: &ListingRecord) -> std::result::Result<i64, StoreError> {
        let stmt = match self.insert_stmt.clone() {
            Some(stmt) => stmt,
            None => {
                let stmt = self.client.prepare(&Self::insert_sql(&self.table))?;
                self.insert_stmt = Some(stmt.clone());
                stmt
            }
        };
        let row = self.client.query_one(
            &stmt,
            &[&record.title, &record.author, &record.price, &record.rating],
        )?;
        let id: i32 = row.try_get(0)?;
        Ok(i64::from(id))
    }
}

pub struct RecordSink<'a, B: BookStore> {
    store: &'a mut B,
}

impl<'a, B: BookStore> RecordSink<'a, B> {
    pub fn new(store: &'a mut B) -> Self {
        RecordSink { store }
    }

    pub fn create_table(&mut self) -> Result<()> {
        self.store
            .ensure_table()
            .map_err(|source| PipelineError::Database { source })?;
        info!("Destination table is ready");
        Ok(())
    }

    /// Inserts every record in batch order and returns the assigned ids.
    /// Stops at the first failing row; rows already inserted stay.
    pub fn insert_batch(&mut self, batch: &RunBatch) -> Result<Vec<i64>> {
        if batch.is_empty() {
            return Err(PipelineError::NoData);
        }

        let mut ids = Vec::with_capacity(batch.len());
        for (index, record) in batch.iter().enumerate() {
            match self.store.insert(record) {
                Ok(id) => ids.push(id),
                Err(source) => {
                    error!("Insert failed at record {} ({}): {}", index, record.title, source);
                    return Err(PipelineError::Insert {
                        index,
                        title: record.title.clone(),
                        source,
                    });
                }
            }
        }

        info!("Inserted {} books", ids.len());
        Ok(ids)
    }

    /// Empty check, create-if-absent, then row-by-row inserts.
    pub fn load(&mut self, batch: &RunBatch) -> Result<Vec<i64>> {
        if batch.is_empty() {
            return Err(PipelineError::NoData);
        }
        self.create_table()?;
        self.insert_batch(batch)
    }
}
