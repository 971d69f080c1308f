use super::{
    AddResult, CollectionInfo, NewDocument, QueryMatch, QueryResult, StoredDocument, VectorIndex,
};
use crate::{
    errors::ProviderError,
    providers::{
        ai::Embedder,
        db::sqlite::{integer, now_timestamp, opt_text, parse_timestamp, text},
    },
};
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::fmt::{self, Debug};
use tracing::{debug, info};
use turso::{params, Connection, Database, Row, Value as TursoValue};
use uuid::Uuid;

const DOCUMENT_COLUMNS: &str = "id, document, metadata, created_at";

/// A vector index stored in the same Turso database as the relational data.
///
/// Embeddings come from the injected `Embedder`; they are stored with `vector32` and
/// ranked by `vector_distance_cos` inside the database.
#[derive(Clone)]
pub struct SqliteVectorIndex {
    db: Database,
    embedder: Box<dyn Embedder>,
}

/// Renders an embedding as the `[a, b, ...]` text that `vector32` parses.
fn vector_literal(embedding: &[f32]) -> String {
    format!(
        "[{}]",
        embedding
            .iter()
            .map(|f| f.to_string())
            .collect::<Vec<_>>()
            .join(", ")
    )
}

/// The JSON path of a top-level metadata key.
fn json_path(key: &str) -> String {
    if key.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        format!("$.{key}")
    } else {
        format!("$.\"{}\"", key.replace('"', "\\\""))
    }
}

/// Builds one SQL condition per filter key, with its bound parameters.
///
/// Every key must be present in the stored metadata with an equal value.
fn filter_conditions(filter: &Map<String, Value>) -> (Vec<String>, Vec<TursoValue>) {
    let mut conditions = Vec::with_capacity(filter.len());
    let mut query_params = Vec::with_capacity(filter.len() * 2);
    for (key, expected) in filter {
        query_params.push(TursoValue::Text(json_path(key)));
        match expected {
            Value::Null => {
                conditions.push("json_type(metadata, ?) = 'null'".to_string());
            }
            Value::Bool(b) => {
                conditions.push("json_type(metadata, ?) = ?".to_string());
                query_params.push(TursoValue::Text(b.to_string()));
            }
            Value::Number(n) => {
                conditions.push("json_extract(metadata, ?) = ?".to_string());
                query_params.push(match n.as_i64() {
                    Some(i) => TursoValue::Integer(i),
                    None => TursoValue::Real(n.as_f64().unwrap_or_default()),
                });
            }
            Value::String(s) => {
                conditions.push("json_extract(metadata, ?) = ?".to_string());
                query_params.push(TursoValue::Text(s.clone()));
            }
            Value::Array(_) | Value::Object(_) => {
                conditions.push("json_extract(metadata, ?) = json(?)".to_string());
                query_params.push(TursoValue::Text(expected.to_string()));
            }
        }
    }
    (conditions, query_params)
}

fn stored_document(row: &Row) -> Result<StoredDocument, ProviderError> {
    let metadata = match opt_text(row, 2)? {
        Some(raw) => match serde_json::from_str::<Value>(&raw)? {
            Value::Object(map) => map,
            _ => Map::new(),
        },
        None => Map::new(),
    };
    Ok(StoredDocument {
        id: text(row, 0)?,
        document: text(row, 1)?,
        metadata,
        created_at: parse_timestamp(&text(row, 3)?)?,
    })
}

impl SqliteVectorIndex {
    pub fn new(db: Database, embedder: Box<dyn Embedder>) -> Self {
        Self { db, embedder }
    }

    fn connect(&self) -> Result<Connection, ProviderError> {
        self.db
            .connect()
            .map_err(|e| ProviderError::StorageConnection(e.to_string()))
    }

    async fn ensure_collection(&self, conn: &Connection, name: &str) -> Result<(), ProviderError> {
        let changes = conn
            .execute(
                "INSERT INTO vector_collections (name, metadata, created_at) VALUES (?, NULL, ?)
                 ON CONFLICT(name) DO NOTHING",
                params![name, now_timestamp()],
            )
            .await?;
        if changes > 0 {
            info!(collection = %name, "Created vector collection on demand");
        }
        Ok(())
    }

    async fn collection_info(
        &self,
        conn: &Connection,
        row: &Row,
    ) -> Result<CollectionInfo, ProviderError> {
        let name = text(row, 0)?;
        let metadata = opt_text(row, 1)?
            .map(|raw| serde_json::from_str(&raw))
            .transpose()?;
        let created_at = parse_timestamp(&text(row, 2)?)?;

        let mut count_rows = conn
            .query(
                "SELECT COUNT(*) FROM vector_documents WHERE collection = ?",
                params![name.as_str()],
            )
            .await?;
        let document_count = match count_rows.next().await? {
            Some(count_row) => integer(&count_row, 0)?,
            None => 0,
        };

        Ok(CollectionInfo {
            name,
            metadata,
            document_count,
            created_at,
        })
    }

    /// Runs one ranked (or, for a blank query, newest-first) search.
    async fn search(
        &self,
        conn: &Connection,
        collection: &str,
        query_text: &str,
        n_results: usize,
        filter: Option<&Map<String, Value>>,
    ) -> Result<Vec<QueryMatch>, ProviderError> {
        let mut conditions = vec!["collection = ?".to_string()];
        let mut query_params = vec![TursoValue::Text(collection.to_string())];
        if let Some(filter) = filter {
            let (filter_sql, filter_params) = filter_conditions(filter);
            conditions.extend(filter_sql);
            query_params.extend(filter_params);
        }

        let scored = !query_text.trim().is_empty();
        let sql = if scored {
            let query_vector = self.embedder.embed(query_text).await?;
            let vector_str = format!("vector32('{}')", vector_literal(&query_vector));
            conditions.push("embedding IS NOT NULL".to_string());
            format!(
                "SELECT {DOCUMENT_COLUMNS}, vector_distance_cos(embedding, {vector_str}) AS distance
                 FROM vector_documents WHERE {} ORDER BY distance ASC, created_at DESC LIMIT {n_results}",
                conditions.join(" AND ")
            )
        } else {
            format!(
                "SELECT {DOCUMENT_COLUMNS} FROM vector_documents WHERE {}
                 ORDER BY created_at DESC LIMIT {n_results}",
                conditions.join(" AND ")
            )
        };

        let mut rows = conn.query(&sql, query_params).await?;
        let mut matches = Vec::new();
        while let Some(row) = rows.next().await? {
            let doc = stored_document(&row)?;
            let score = if scored {
                // Cosine distance is `1 - similarity`.
                match row.get_value(4)? {
                    TursoValue::Real(distance) => Some((1.0 - distance) as f32),
                    TursoValue::Integer(distance) => Some((1 - distance) as f32),
                    _ => Some(0.0),
                }
            } else {
                None
            };
            matches.push(QueryMatch {
                id: doc.id,
                document: doc.document,
                metadata: doc.metadata,
                score,
            });
        }
        Ok(matches)
    }
}

impl Debug for SqliteVectorIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SqliteVectorIndex")
            .field("embedder", &self.embedder)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl VectorIndex for SqliteVectorIndex {
    async fn list_collections(&self) -> Result<Vec<CollectionInfo>, ProviderError> {
        let conn = self.connect()?;
        let mut rows = conn
            .query(
                "SELECT name, metadata, created_at FROM vector_collections ORDER BY name",
                (),
            )
            .await?;
        let mut collections = Vec::new();
        while let Some(row) = rows.next().await? {
            collections.push(self.collection_info(&conn, &row).await?);
        }
        Ok(collections)
    }

    async fn create_collection(
        &self,
        name: &str,
        metadata: Option<Value>,
    ) -> Result<CollectionInfo, ProviderError> {
        let conn = self.connect()?;
        let metadata_json = metadata.as_ref().map(serde_json::to_string).transpose()?;
        let changes = conn
            .execute(
                "INSERT INTO vector_collections (name, metadata, created_at) VALUES (?, ?, ?)
                 ON CONFLICT(name) DO NOTHING",
                params![name, metadata_json.as_deref(), now_timestamp()],
            )
            .await?;
        if changes == 0 {
            return Err(ProviderError::AlreadyExists(format!("collection '{name}'")));
        }
        self.get_collection(name)
            .await?
            .ok_or_else(|| ProviderError::NotFound(format!("collection '{name}'")))
    }

    async fn get_collection(&self, name: &str) -> Result<Option<CollectionInfo>, ProviderError> {
        let conn = self.connect()?;
        let mut rows = conn
            .query(
                "SELECT name, metadata, created_at FROM vector_collections WHERE name = ?",
                params![name],
            )
            .await?;
        match rows.next().await? {
            Some(row) => Ok(Some(self.collection_info(&conn, &row).await?)),
            None => Ok(None),
        }
    }

    async fn delete_collection(&self, name: &str) -> Result<bool, ProviderError> {
        let conn = self.connect()?;
        conn.execute(
            "DELETE FROM vector_documents WHERE collection = ?",
            params![name],
        )
        .await?;
        let changes = conn
            .execute("DELETE FROM vector_collections WHERE name = ?", params![name])
            .await?;
        Ok(changes > 0)
    }

    async fn document_exists(&self, collection: &str, id: &str) -> Result<bool, ProviderError> {
        let conn = self.connect()?;
        let mut rows = conn
            .query(
                "SELECT 1 FROM vector_documents WHERE collection = ? AND id = ?",
                params![collection, id],
            )
            .await?;
        Ok(rows.next().await?.is_some())
    }

    async fn add_documents(
        &self,
        collection: &str,
        documents: Vec<NewDocument>,
    ) -> Result<AddResult, ProviderError> {
        let conn = self.connect()?;
        self.ensure_collection(&conn, collection).await?;

        let mut result = AddResult::default();
        for doc in documents {
            let id = doc.id.unwrap_or_else(|| Uuid::new_v4().to_string());

            // Saves an embedding call; the insert below is what guarantees uniqueness.
            if self.document_exists(collection, &id).await? {
                debug!(%collection, %id, "Document already indexed; skipping");
                result.skipped += 1;
                continue;
            }

            let embedding = vector_literal(&self.embedder.embed(&doc.document).await?);
            let metadata = serde_json::to_string(&doc.metadata)?;
            let changes = conn
                .execute(
                    "INSERT INTO vector_documents (collection, id, document, metadata, embedding, created_at)
                     VALUES (?, ?, ?, ?, vector32(?), ?)
                     ON CONFLICT(collection, id) DO NOTHING",
                    params![
                        collection,
                        id.as_str(),
                        doc.document.as_str(),
                        metadata.as_str(),
                        embedding.as_str(),
                        now_timestamp()
                    ],
                )
                .await?;

            if changes > 0 {
                result.added += 1;
                result.ids.push(id);
            } else {
                debug!(%collection, %id, "Concurrent insert won the race; skipping");
                result.skipped += 1;
            }
        }

        info!(
            %collection,
            added = result.added,
            skipped = result.skipped,
            "Added documents to vector index"
        );
        Ok(result)
    }

    async fn query(
        &self,
        collection: &str,
        query_texts: &[String],
        n_results: usize,
        filter: Option<&Map<String, Value>>,
    ) -> Result<Vec<QueryResult>, ProviderError> {
        if self.get_collection(collection).await?.is_none() {
            return Err(ProviderError::NotFound(format!("collection '{collection}'")));
        }

        let conn = self.connect()?;
        let mut results = Vec::with_capacity(query_texts.len());
        for query_text in query_texts {
            let matches = self
                .search(&conn, collection, query_text, n_results, filter)
                .await?;
            debug!(%collection, matches = matches.len(), "Vector query finished");
            results.push(QueryResult {
                query: query_text.clone(),
                matches,
            });
        }
        Ok(results)
    }

    async fn get_documents(&self, collection: &str) -> Result<Vec<StoredDocument>, ProviderError> {
        if self.get_collection(collection).await?.is_none() {
            return Err(ProviderError::NotFound(format!("collection '{collection}'")));
        }
        let conn = self.connect()?;
        let mut rows = conn
            .query(
                &format!(
                    "SELECT {DOCUMENT_COLUMNS} FROM vector_documents
                     WHERE collection = ? ORDER BY created_at DESC"
                ),
                params![collection],
            )
            .await?;
        let mut documents = Vec::new();
        while let Some(row) = rows.next().await? {
            documents.push(stored_document(&row)?);
        }
        Ok(documents)
    }

    async fn delete_document(&self, collection: &str, id: &str) -> Result<bool, ProviderError> {
        let conn = self.connect()?;
        let changes = conn
            .execute(
                "DELETE FROM vector_documents WHERE collection = ? AND id = ?",
                params![collection, id],
            )
            .await?;
        Ok(changes > 0)
    }
}
