//! Reference-documentation store using Tantivy (BM25)

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use async_trait::async_trait;
use tantivy::collector::TopDocs;
use tantivy::directory::MmapDirectory;
use tantivy::query::QueryParser;
use tantivy::schema::{Field, Schema, Value, STORED, STRING, TEXT};
use tantivy::{doc, Index, IndexReader, IndexWriter, ReloadPolicy, TantivyDocument};
use tracing::{debug, info, warn};

use super::{Document, DocumentStore};

const WRITER_HEAP_BYTES: usize = 50_000_000;
/// Paragraphs are packed into chunks of at most this many bytes
const CHUNK_BYTES: usize = 1_000;
const DOC_EXTENSIONS: &[&str] = &["md", "markdown", "txt", "rst"];

/// Document store over a directory of text files
pub struct KeywordDocumentStore {
    index: Index,
    reader: IndexReader,
    source_field: Field,
    content_field: Field,
}

fn build_schema() -> (Schema, Field, Field) {
    let mut schema_builder = Schema::builder();
    let source_field = schema_builder.add_text_field("source", STRING | STORED);
    let content_field = schema_builder.add_text_field("content", TEXT | STORED);
    (schema_builder.build(), source_field, content_field)
}

impl KeywordDocumentStore {
    /// Open the index at `index_dir`, building it from `docs_dir` if it is empty
    pub fn create_or_load(docs_dir: &Path, index_dir: &Path) -> Result<Self> {
        let store = Self::open(index_dir)?;

        if store.count() == 0 {
            info!("Documentation index at {:?} is empty, building from {:?}", index_dir, docs_dir);
            store.ingest(docs_dir, false)?;
        } else {
            info!("Loaded documentation index at {:?} ({} chunks)", index_dir, store.count());
        }

        Ok(store)
    }

    /// Discard the index at `index_dir` and re-read everything under `docs_dir`
    pub fn rebuild(docs_dir: &Path, index_dir: &Path) -> Result<Self> {
        let store = Self::open(index_dir)?;
        store.ingest(docs_dir, true)?;
        Ok(store)
    }

    /// Build a RAM-only index from the given documents
    pub fn in_memory(documents: impl IntoIterator<Item = Document>) -> Result<Self> {
        let (schema, source_field, content_field) = build_schema();
        let store = Self::from_index(Index::create_in_ram(schema), source_field, content_field)?;

        let mut writer: IndexWriter = store.index.writer(WRITER_HEAP_BYTES)?;
        for document in documents {
            writer.add_document(doc!(
                store.source_field => document.source.as_deref().unwrap_or(""),
                store.content_field => document.content.as_str()
            ))?;
        }
        writer.commit()?;
        store.reader.reload()?;

        Ok(store)
    }

    fn open(index_dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(index_dir)
            .with_context(|| format!("Failed to create index directory {:?}", index_dir))?;

        let (schema, source_field, content_field) = build_schema();
        let index = Index::open_or_create(MmapDirectory::open(index_dir)?, schema)
            .with_context(|| format!("Failed to open index at {:?}", index_dir))?;

        Self::from_index(index, source_field, content_field)
    }

    fn from_index(index: Index, source_field: Field, content_field: Field) -> Result<Self> {
        let reader = index
            .reader_builder()
            .reload_policy(ReloadPolicy::OnCommitWithDelay)
            .try_into()?;

        Ok(Self {
            index,
            reader,
            source_field,
            content_field,
        })
    }

    /// Index every documentation file under `docs_dir`
    fn ingest(&self, docs_dir: &Path, clear: bool) -> Result<usize> {
        let files = collect_files(docs_dir)
            .with_context(|| format!("Failed to read documentation directory {:?}", docs_dir))?;

        let mut writer: IndexWriter = self.index.writer(WRITER_HEAP_BYTES)?;
        if clear {
            writer.delete_all_documents()?;
        }

        let mut chunks = 0;
        for path in &files {
            let text = match std::fs::read_to_string(path) {
                Ok(text) => text,
                Err(e) => {
                    warn!("Skipping unreadable document {:?}: {}", path, e);
                    continue;
                }
            };

            let source = path.strip_prefix(docs_dir).unwrap_or(path).display().to_string();
            for chunk in chunk_text(&text, CHUNK_BYTES) {
                writer.add_document(doc!(
                    self.source_field => source.as_str(),
                    self.content_field => chunk.as_str()
                ))?;
                chunks += 1;
            }
        }

        writer.commit()?;
        self.reader.reload()?;

        info!(files = files.len(), chunks, "Indexed reference documentation");
        Ok(chunks)
    }

    /// Number of indexed chunks
    pub fn count(&self) -> usize {
        self.reader.searcher().num_docs() as usize
    }
}

#[async_trait]
impl DocumentStore for KeywordDocumentStore {
    async fn similarity_search(&self, query: &str, k: usize) -> Result<Vec<Document>> {
        if k == 0 || query.trim().is_empty() {
            return Ok(Vec::new());
        }

        let searcher = self.reader.searcher();
        let query_parser = QueryParser::for_index(&self.index, vec![self.content_field]);

        // Free-form task text: tolerate stray operators instead of failing the request
        let (parsed_query, errors) = query_parser.parse_query_lenient(query);
        if !errors.is_empty() {
            debug!("Ignored {} query syntax errors in {:?}", errors.len(), query);
        }

        let top_docs = searcher
            .search(&parsed_query, &TopDocs::with_limit(k))
            .context("Search failed")?;

        let mut documents = Vec::with_capacity(top_docs.len());
        for (_score, doc_address) in top_docs {
            let retrieved: TantivyDocument = searcher
                .doc(doc_address)
                .context("Failed to retrieve document")?;

            let content = get_text_field(&retrieved, self.content_field);
            let source = get_text_field(&retrieved, self.source_field);

            let mut document = Document::new(content);
            if !source.is_empty() {
                document = document.with_source(source);
            }
            documents.push(document);
        }

        Ok(documents)
    }
}

/// Helper to extract text field value
fn get_text_field(doc: &TantivyDocument, field: Field) -> String {
    doc.get_first(field)
        .and_then(|v| v.as_str())
        .unwrap_or("")
        .to_string()
}

fn collect_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    let mut pending = vec![dir.to_path_buf()];

    while let Some(current) = pending.pop() {
        for entry in std::fs::read_dir(&current)? {
            let path = entry?.path();
            if path.is_dir() {
                pending.push(path);
            } else if path
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| DOC_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
            {
                files.push(path);
            }
        }
    }

    files.sort();
    Ok(files)
}

/// Pack blank-line separated paragraphs into chunks of at most `max_bytes`
///
/// A single paragraph longer than `max_bytes` becomes its own chunk.
fn chunk_text(text: &str, max_bytes: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();

    for paragraph in text.split("\n\n").map(str::trim).filter(|p| !p.is_empty()) {
        if !current.is_empty() && current.len() + 2 + paragraph.len() > max_bytes {
            chunks.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push_str("\n\n");
        }
        current.push_str(paragraph);
    }

    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}
