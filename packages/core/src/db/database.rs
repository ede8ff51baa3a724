//! Database Connection Management
//!
//! Core database connection and schema initialization using libsql for the
//! notebook document tables.
//!
//! # Architecture
//!
//! - **Path-agnostic**: accepts any valid `PathBuf`
//! - **WAL mode**: Write-Ahead Logging for better concurrency
//! - **Foreign keys**: enabled; ownership cascades mirror the document
//!   model (notebook owns sections, section owns child sections and
//!   results, result owns its association rows)
//! - **Idempotent schema**: `CREATE TABLE IF NOT EXISTS`, safe to rerun
//!
//! # Connection pattern
//!
//! Always use `connect_with_timeout()` in async functions. The busy
//! timeout makes concurrent operations wait and retry instead of failing
//! immediately with `SQLITE_BUSY` when the Tokio runtime interleaves
//! operations from different tasks.

use crate::db::error::DatabaseError;
use libsql::{Builder, Database};
use std::path::PathBuf;
use std::sync::Arc;

/// Database service managing the libsql connection and schema
///
/// # Examples
///
/// ```no_run
/// use labbook_core::db::DatabaseService;
/// use std::path::PathBuf;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let db = DatabaseService::new(PathBuf::from("./data/labbook.db")).await?;
///     let conn = db.connect_with_timeout().await?;
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct DatabaseService {
    /// libsql database handle (wrapped in Arc for sharing)
    pub db: Arc<Database>,

    /// Path to the database file
    pub db_path: PathBuf,
}

/// Parameters for section insert/update (avoids too-many-arguments lint)
pub struct DbSectionParams<'a> {
    pub id: &'a str,
    pub notebook_id: &'a str,
    pub parent_section_id: Option<&'a str>,
    pub name: &'a str,
    pub description: Option<&'a str>,
    pub next_type: Option<&'a str>,
    pub next_id: Option<&'a str>,
}

/// Parameters for result insert/update (avoids too-many-arguments lint)
pub struct DbResultParams<'a> {
    pub id: &'a str,
    pub section_id: &'a str,
    pub analysis: &'a str,
    pub python_code: Option<&'a str>,
    pub artifacts: &'a str,
    pub next_type: Option<&'a str>,
    pub next_id: Option<&'a str>,
}

impl DatabaseService {
    /// Create a new DatabaseService with the specified database path.
    ///
    /// Ensures the parent directory exists, opens/creates the database
    /// file, and initializes the schema.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the parent directory cannot be created,
    /// the connection fails, or schema initialization fails.
    pub async fn new(db_path: PathBuf) -> Result<Self, DatabaseError> {
        // WAL checkpointing is only needed when the file is brand new
        let is_new_database = !db_path.exists();

        if let Some(parent) = db_path.parent() {
            if !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    if e.kind() == std::io::ErrorKind::PermissionDenied {
                        DatabaseError::permission_denied(db_path.clone())
                    } else {
                        DatabaseError::DirectoryCreationFailed(e)
                    }
                })?;
            }
        }

        let db = Builder::new_local(&db_path)
            .build()
            .await
            .map_err(|e| DatabaseError::connection_failed(db_path.clone(), e))?;

        let service = Self {
            db: Arc::new(db),
            db_path,
        };

        service.initialize_schema(is_new_database).await?;

        Ok(service)
    }

    /// Execute a PRAGMA statement.
    ///
    /// PRAGMA statements return rows, so query() must be used instead of
    /// execute().
    async fn execute_pragma(
        &self,
        conn: &libsql::Connection,
        pragma: &str,
    ) -> Result<(), DatabaseError> {
        let mut stmt = conn.prepare(pragma).await.map_err(|e| {
            DatabaseError::sql_execution(format!("Failed to execute '{}': {}", pragma, e))
        })?;
        let _ = stmt.query(()).await.map_err(|e| {
            DatabaseError::sql_execution(format!("Failed to execute '{}': {}", pragma, e))
        })?;
        Ok(())
    }

    /// Initialize schema and SQLite configuration (idempotent)
    async fn initialize_schema(&self, is_new_database: bool) -> Result<(), DatabaseError> {
        let conn = self.connect_with_timeout().await?;

        self.execute_pragma(&conn, "PRAGMA journal_mode = WAL")
            .await?;
        self.execute_pragma(&conn, "PRAGMA busy_timeout = 5000")
            .await?;
        self.execute_pragma(&conn, "PRAGMA foreign_keys = ON")
            .await?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS notebooks (
                id TEXT PRIMARY KEY,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            )",
            (),
        )
        .await
        .map_err(|e| {
            DatabaseError::sql_execution(format!("Failed to create notebooks table: {}", e))
        })?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS analyses (
                id TEXT PRIMARY KEY,
                notebook_id TEXT NOT NULL UNIQUE,
                name TEXT NOT NULL,
                description TEXT,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
                modified_at DATETIME DEFAULT CURRENT_TIMESTAMP,
                FOREIGN KEY (notebook_id) REFERENCES notebooks(id) ON DELETE CASCADE
            )",
            (),
        )
        .await
        .map_err(|e| {
            DatabaseError::sql_execution(format!("Failed to create analyses table: {}", e))
        })?;

        // next_type/next_id carry the intra-scope chain. No FK on next_id:
        // the target lives in either table, the document layer owns the
        // integrity of that pointer.
        conn.execute(
            "CREATE TABLE IF NOT EXISTS sections (
                id TEXT PRIMARY KEY,
                notebook_id TEXT NOT NULL,
                parent_section_id TEXT,
                name TEXT NOT NULL,
                description TEXT,
                next_type TEXT,
                next_id TEXT,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
                modified_at DATETIME DEFAULT CURRENT_TIMESTAMP,
                FOREIGN KEY (notebook_id) REFERENCES notebooks(id) ON DELETE CASCADE,
                FOREIGN KEY (parent_section_id) REFERENCES sections(id) ON DELETE CASCADE
            )",
            (),
        )
        .await
        .map_err(|e| {
            DatabaseError::sql_execution(format!("Failed to create sections table: {}", e))
        })?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS results (
                id TEXT PRIMARY KEY,
                section_id TEXT NOT NULL,
                analysis TEXT NOT NULL DEFAULT '',
                python_code TEXT,
                artifacts JSON NOT NULL DEFAULT '[]',
                next_type TEXT,
                next_id TEXT,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
                modified_at DATETIME DEFAULT CURRENT_TIMESTAMP,
                FOREIGN KEY (section_id) REFERENCES sections(id) ON DELETE CASCADE
            )",
            (),
        )
        .await
        .map_err(|e| {
            DatabaseError::sql_execution(format!("Failed to create results table: {}", e))
        })?;

        // Non-owning many-to-many link sets. The referenced dataset /
        // data-source ids are opaque foreign identifiers resolved by
        // external registries, so only the result side carries a FK.
        conn.execute(
            "CREATE TABLE IF NOT EXISTS result_datasets (
                result_id TEXT NOT NULL,
                dataset_id TEXT NOT NULL,
                PRIMARY KEY (result_id, dataset_id),
                FOREIGN KEY (result_id) REFERENCES results(id) ON DELETE CASCADE
            )",
            (),
        )
        .await
        .map_err(|e| {
            DatabaseError::sql_execution(format!("Failed to create result_datasets table: {}", e))
        })?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS result_data_sources (
                result_id TEXT NOT NULL,
                data_source_id TEXT NOT NULL,
                PRIMARY KEY (result_id, data_source_id),
                FOREIGN KEY (result_id) REFERENCES results(id) ON DELETE CASCADE
            )",
            (),
        )
        .await
        .map_err(|e| {
            DatabaseError::sql_execution(format!(
                "Failed to create result_data_sources table: {}",
                e
            ))
        })?;

        self.create_core_indexes(&conn).await?;

        // Flush the WAL for brand-new databases so rapid open/close cycles
        // in tests never observe a half-written schema.
        if is_new_database {
            self.execute_pragma(&conn, "PRAGMA wal_checkpoint(TRUNCATE)")
                .await?;
        }

        Ok(())
    }

    /// Create indexes on the scope columns (the only hot lookups)
    async fn create_core_indexes(&self, conn: &libsql::Connection) -> Result<(), DatabaseError> {
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_sections_scope ON sections(notebook_id, parent_section_id)",
            (),
        )
        .await
        .map_err(|e| {
            DatabaseError::sql_execution(format!("Failed to create index 'idx_sections_scope': {}", e))
        })?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_results_section ON results(section_id)",
            (),
        )
        .await
        .map_err(|e| {
            DatabaseError::sql_execution(format!(
                "Failed to create index 'idx_results_section': {}",
                e
            ))
        })?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_analyses_notebook ON analyses(notebook_id)",
            (),
        )
        .await
        .map_err(|e| {
            DatabaseError::sql_execution(format!(
                "Failed to create index 'idx_analyses_notebook': {}",
                e
            ))
        })?;

        Ok(())
    }

    /// Get an async connection with busy timeout configured.
    ///
    /// Use this for all async code paths. The 5-second busy timeout makes
    /// concurrent operations serialize gracefully instead of failing when
    /// the database file is locked.
    pub async fn connect_with_timeout(&self) -> Result<libsql::Connection, DatabaseError> {
        let conn = self.db.connect().map_err(DatabaseError::LibsqlError)?;
        self.execute_pragma(&conn, "PRAGMA busy_timeout = 5000")
            .await?;
        Ok(conn)
    }

    //
    // SECTION OPERATIONS
    //

    /// Insert a section row
    pub async fn db_create_section(
        &self,
        params: DbSectionParams<'_>,
    ) -> Result<(), DatabaseError> {
        let conn = self.connect_with_timeout().await?;

        conn.execute(
            "INSERT INTO sections (id, notebook_id, parent_section_id, name, description, next_type, next_id)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
            (
                params.id,
                params.notebook_id,
                params.parent_section_id,
                params.name,
                params.description,
                params.next_type,
                params.next_id,
            ),
        )
        .await
        .map_err(|e| DatabaseError::sql_execution(format!("Failed to insert section: {}", e)))?;

        Ok(())
    }

    /// Fetch a single section row by id
    pub async fn db_get_section(&self, id: &str) -> Result<Option<libsql::Row>, DatabaseError> {
        let conn = self.connect_with_timeout().await?;

        let mut stmt = conn
            .prepare(
                "SELECT id, notebook_id, parent_section_id, name, description, next_type, next_id,
                        created_at, modified_at
                 FROM sections WHERE id = ?",
            )
            .await
            .map_err(|e| {
                DatabaseError::sql_execution(format!("Failed to prepare get_section query: {}", e))
            })?;

        let mut rows = stmt.query([id]).await.map_err(|e| {
            DatabaseError::sql_execution(format!("Failed to execute get_section query: {}", e))
        })?;

        rows.next()
            .await
            .map_err(|e| DatabaseError::sql_execution(e.to_string()))
    }

    /// Fetch all section rows in one scope, unordered
    pub async fn db_list_sections(
        &self,
        notebook_id: &str,
        parent_section_id: Option<&str>,
    ) -> Result<Vec<libsql::Row>, DatabaseError> {
        let conn = self.connect_with_timeout().await?;

        let mut rows = match parent_section_id {
            Some(parent_id) => {
                let mut stmt = conn
                    .prepare(
                        "SELECT id, notebook_id, parent_section_id, name, description, next_type, next_id,
                                created_at, modified_at
                         FROM sections WHERE notebook_id = ? AND parent_section_id = ?",
                    )
                    .await
                    .map_err(|e| {
                        DatabaseError::sql_execution(format!(
                            "Failed to prepare list_sections query: {}",
                            e
                        ))
                    })?;
                stmt.query([notebook_id, parent_id]).await.map_err(|e| {
                    DatabaseError::sql_execution(format!(
                        "Failed to execute list_sections query: {}",
                        e
                    ))
                })?
            }
            None => {
                let mut stmt = conn
                    .prepare(
                        "SELECT id, notebook_id, parent_section_id, name, description, next_type, next_id,
                                created_at, modified_at
                         FROM sections WHERE notebook_id = ? AND parent_section_id IS NULL",
                    )
                    .await
                    .map_err(|e| {
                        DatabaseError::sql_execution(format!(
                            "Failed to prepare list_sections query: {}",
                            e
                        ))
                    })?;
                stmt.query([notebook_id]).await.map_err(|e| {
                    DatabaseError::sql_execution(format!(
                        "Failed to execute list_sections query: {}",
                        e
                    ))
                })?
            }
        };

        let mut out = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| DatabaseError::sql_execution(e.to_string()))?
        {
            out.push(row);
        }
        Ok(out)
    }

    /// Full-row section update (caller merges sparse fields beforehand)
    pub async fn db_update_section(
        &self,
        params: DbSectionParams<'_>,
    ) -> Result<u64, DatabaseError> {
        let conn = self.connect_with_timeout().await?;

        let affected = conn
            .execute(
                "UPDATE sections SET notebook_id = ?, parent_section_id = ?, name = ?, description = ?,
                        next_type = ?, next_id = ?, modified_at = CURRENT_TIMESTAMP
                 WHERE id = ?",
                (
                    params.notebook_id,
                    params.parent_section_id,
                    params.name,
                    params.description,
                    params.next_type,
                    params.next_id,
                    params.id,
                ),
            )
            .await
            .map_err(|e| DatabaseError::sql_execution(format!("Failed to update section: {}", e)))?;

        Ok(affected)
    }

    /// Delete a single section row (no cascade logic here beyond FKs)
    pub async fn db_delete_section(&self, id: &str) -> Result<u64, DatabaseError> {
        let conn = self.connect_with_timeout().await?;

        conn.execute("DELETE FROM sections WHERE id = ?", [id])
            .await
            .map_err(|e| DatabaseError::sql_execution(format!("Failed to delete section: {}", e)))
    }

    //
    // RESULT OPERATIONS
    //

    /// Insert a result row (link rows are written separately)
    pub async fn db_create_result(&self, params: DbResultParams<'_>) -> Result<(), DatabaseError> {
        let conn = self.connect_with_timeout().await?;

        conn.execute(
            "INSERT INTO results (id, section_id, analysis, python_code, artifacts, next_type, next_id)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
            (
                params.id,
                params.section_id,
                params.analysis,
                params.python_code,
                params.artifacts,
                params.next_type,
                params.next_id,
            ),
        )
        .await
        .map_err(|e| DatabaseError::sql_execution(format!("Failed to insert result: {}", e)))?;

        Ok(())
    }

    /// Fetch a single result row by id
    pub async fn db_get_result(&self, id: &str) -> Result<Option<libsql::Row>, DatabaseError> {
        let conn = self.connect_with_timeout().await?;

        let mut stmt = conn
            .prepare(
                "SELECT id, section_id, analysis, python_code, artifacts, next_type, next_id,
                        created_at, modified_at
                 FROM results WHERE id = ?",
            )
            .await
            .map_err(|e| {
                DatabaseError::sql_execution(format!("Failed to prepare get_result query: {}", e))
            })?;

        let mut rows = stmt.query([id]).await.map_err(|e| {
            DatabaseError::sql_execution(format!("Failed to execute get_result query: {}", e))
        })?;

        rows.next()
            .await
            .map_err(|e| DatabaseError::sql_execution(e.to_string()))
    }

    /// Fetch all result rows in one section, unordered
    pub async fn db_list_results(&self, section_id: &str) -> Result<Vec<libsql::Row>, DatabaseError> {
        let conn = self.connect_with_timeout().await?;

        let mut stmt = conn
            .prepare(
                "SELECT id, section_id, analysis, python_code, artifacts, next_type, next_id,
                        created_at, modified_at
                 FROM results WHERE section_id = ?",
            )
            .await
            .map_err(|e| {
                DatabaseError::sql_execution(format!("Failed to prepare list_results query: {}", e))
            })?;

        let mut rows = stmt.query([section_id]).await.map_err(|e| {
            DatabaseError::sql_execution(format!("Failed to execute list_results query: {}", e))
        })?;

        let mut out = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| DatabaseError::sql_execution(e.to_string()))?
        {
            out.push(row);
        }
        Ok(out)
    }

    /// Full-row result update (caller merges sparse fields beforehand)
    pub async fn db_update_result(&self, params: DbResultParams<'_>) -> Result<u64, DatabaseError> {
        let conn = self.connect_with_timeout().await?;

        let affected = conn
            .execute(
                "UPDATE results SET section_id = ?, analysis = ?, python_code = ?, artifacts = ?,
                        next_type = ?, next_id = ?, modified_at = CURRENT_TIMESTAMP
                 WHERE id = ?",
                (
                    params.section_id,
                    params.analysis,
                    params.python_code,
                    params.artifacts,
                    params.next_type,
                    params.next_id,
                    params.id,
                ),
            )
            .await
            .map_err(|e| DatabaseError::sql_execution(format!("Failed to update result: {}", e)))?;

        Ok(affected)
    }

    /// Delete a single result row; association rows cascade via FK
    pub async fn db_delete_result(&self, id: &str) -> Result<u64, DatabaseError> {
        let conn = self.connect_with_timeout().await?;

        conn.execute("DELETE FROM results WHERE id = ?", [id])
            .await
            .map_err(|e| DatabaseError::sql_execution(format!("Failed to delete result: {}", e)))
    }

    /// Replace the dataset link set of a result
    pub async fn db_set_result_datasets(
        &self,
        result_id: &str,
        dataset_ids: &[String],
    ) -> Result<(), DatabaseError> {
        let conn = self.connect_with_timeout().await?;

        conn.execute("DELETE FROM result_datasets WHERE result_id = ?", [result_id])
            .await
            .map_err(|e| {
                DatabaseError::sql_execution(format!("Failed to clear dataset links: {}", e))
            })?;

        for dataset_id in dataset_ids {
            conn.execute(
                "INSERT OR IGNORE INTO result_datasets (result_id, dataset_id) VALUES (?, ?)",
                (result_id, dataset_id.as_str()),
            )
            .await
            .map_err(|e| {
                DatabaseError::sql_execution(format!("Failed to insert dataset link: {}", e))
            })?;
        }

        Ok(())
    }

    /// Replace the data-source link set of a result
    pub async fn db_set_result_data_sources(
        &self,
        result_id: &str,
        data_source_ids: &[String],
    ) -> Result<(), DatabaseError> {
        let conn = self.connect_with_timeout().await?;

        conn.execute(
            "DELETE FROM result_data_sources WHERE result_id = ?",
            [result_id],
        )
        .await
        .map_err(|e| {
            DatabaseError::sql_execution(format!("Failed to clear data-source links: {}", e))
        })?;

        for data_source_id in data_source_ids {
            conn.execute(
                "INSERT OR IGNORE INTO result_data_sources (result_id, data_source_id) VALUES (?, ?)",
                (result_id, data_source_id.as_str()),
            )
            .await
            .map_err(|e| {
                DatabaseError::sql_execution(format!("Failed to insert data-source link: {}", e))
            })?;
        }

        Ok(())
    }

    /// Fetch the dataset link set of a result
    pub async fn db_get_result_datasets(
        &self,
        result_id: &str,
    ) -> Result<Vec<String>, DatabaseError> {
        self.fetch_link_column(
            "SELECT dataset_id FROM result_datasets WHERE result_id = ? ORDER BY dataset_id",
            result_id,
        )
        .await
    }

    /// Fetch the data-source link set of a result
    pub async fn db_get_result_data_sources(
        &self,
        result_id: &str,
    ) -> Result<Vec<String>, DatabaseError> {
        self.fetch_link_column(
            "SELECT data_source_id FROM result_data_sources WHERE result_id = ? ORDER BY data_source_id",
            result_id,
        )
        .await
    }

    async fn fetch_link_column(
        &self,
        sql: &str,
        result_id: &str,
    ) -> Result<Vec<String>, DatabaseError> {
        let conn = self.connect_with_timeout().await?;

        let mut stmt = conn.prepare(sql).await.map_err(|e| {
            DatabaseError::sql_execution(format!("Failed to prepare link query: {}", e))
        })?;

        let mut rows = stmt.query([result_id]).await.map_err(|e| {
            DatabaseError::sql_execution(format!("Failed to execute link query: {}", e))
        })?;

        let mut out = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| DatabaseError::sql_execution(e.to_string()))?
        {
            let id: String = row
                .get(0)
                .map_err(|e| DatabaseError::sql_execution(e.to_string()))?;
            out.push(id);
        }
        Ok(out)
    }

    //
    // NOTEBOOK / ANALYSIS OPERATIONS
    //

    /// Insert a notebook row
    pub async fn db_create_notebook(&self, id: &str) -> Result<(), DatabaseError> {
        let conn = self.connect_with_timeout().await?;

        conn.execute("INSERT INTO notebooks (id) VALUES (?)", [id])
            .await
            .map_err(|e| DatabaseError::sql_execution(format!("Failed to insert notebook: {}", e)))?;

        Ok(())
    }

    /// Fetch a notebook row by id
    pub async fn db_get_notebook(&self, id: &str) -> Result<Option<libsql::Row>, DatabaseError> {
        let conn = self.connect_with_timeout().await?;

        let mut stmt = conn
            .prepare("SELECT id, created_at FROM notebooks WHERE id = ?")
            .await
            .map_err(|e| {
                DatabaseError::sql_execution(format!("Failed to prepare get_notebook query: {}", e))
            })?;

        let mut rows = stmt.query([id]).await.map_err(|e| {
            DatabaseError::sql_execution(format!("Failed to execute get_notebook query: {}", e))
        })?;

        rows.next()
            .await
            .map_err(|e| DatabaseError::sql_execution(e.to_string()))
    }

    /// Delete a notebook row
    pub async fn db_delete_notebook(&self, id: &str) -> Result<u64, DatabaseError> {
        let conn = self.connect_with_timeout().await?;

        conn.execute("DELETE FROM notebooks WHERE id = ?", [id])
            .await
            .map_err(|e| DatabaseError::sql_execution(format!("Failed to delete notebook: {}", e)))
    }

    /// Insert an analysis row
    pub async fn db_create_analysis(
        &self,
        id: &str,
        notebook_id: &str,
        name: &str,
        description: Option<&str>,
    ) -> Result<(), DatabaseError> {
        let conn = self.connect_with_timeout().await?;

        conn.execute(
            "INSERT INTO analyses (id, notebook_id, name, description) VALUES (?, ?, ?, ?)",
            (id, notebook_id, name, description),
        )
        .await
        .map_err(|e| DatabaseError::sql_execution(format!("Failed to insert analysis: {}", e)))?;

        Ok(())
    }

    /// Fetch an analysis row by id
    pub async fn db_get_analysis(&self, id: &str) -> Result<Option<libsql::Row>, DatabaseError> {
        let conn = self.connect_with_timeout().await?;

        let mut stmt = conn
            .prepare(
                "SELECT id, notebook_id, name, description, created_at, modified_at
                 FROM analyses WHERE id = ?",
            )
            .await
            .map_err(|e| {
                DatabaseError::sql_execution(format!("Failed to prepare get_analysis query: {}", e))
            })?;

        let mut rows = stmt.query([id]).await.map_err(|e| {
            DatabaseError::sql_execution(format!("Failed to execute get_analysis query: {}", e))
        })?;

        rows.next()
            .await
            .map_err(|e| DatabaseError::sql_execution(e.to_string()))
    }

    /// Fetch all analysis rows, most recently modified first
    pub async fn db_list_analyses(&self) -> Result<Vec<libsql::Row>, DatabaseError> {
        let conn = self.connect_with_timeout().await?;

        let mut stmt = conn
            .prepare(
                "SELECT id, notebook_id, name, description, created_at, modified_at
                 FROM analyses ORDER BY modified_at DESC",
            )
            .await
            .map_err(|e| {
                DatabaseError::sql_execution(format!(
                    "Failed to prepare list_analyses query: {}",
                    e
                ))
            })?;

        let mut rows = stmt.query(()).await.map_err(|e| {
            DatabaseError::sql_execution(format!("Failed to execute list_analyses query: {}", e))
        })?;

        let mut out = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| DatabaseError::sql_execution(e.to_string()))?
        {
            out.push(row);
        }
        Ok(out)
    }

    /// Update analysis metadata
    pub async fn db_update_analysis(
        &self,
        id: &str,
        name: &str,
        description: Option<&str>,
    ) -> Result<u64, DatabaseError> {
        let conn = self.connect_with_timeout().await?;

        conn.execute(
            "UPDATE analyses SET name = ?, description = ?, modified_at = CURRENT_TIMESTAMP
             WHERE id = ?",
            (name, description, id),
        )
        .await
        .map_err(|e| DatabaseError::sql_execution(format!("Failed to update analysis: {}", e)))
    }

    /// Delete an analysis row
    pub async fn db_delete_analysis(&self, id: &str) -> Result<u64, DatabaseError> {
        let conn = self.connect_with_timeout().await?;

        conn.execute("DELETE FROM analyses WHERE id = ?", [id])
            .await
            .map_err(|e| DatabaseError::sql_execution(format!("Failed to delete analysis: {}", e)))
    }
}
