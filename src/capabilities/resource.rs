//! Resource references and the URI scheme → kind table.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// What kind of context a resource exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    /// Tabular or record-oriented data (CSV, parquet, database tables).
    Dataset,
    /// A single readable document. Also the fallback kind.
    Document,
    /// A remote service reachable over HTTP(S).
    Endpoint,
    /// A credential held by a secret store.
    Secret,
    /// A model artifact.
    Model,
    /// A push stream (websocket, SSE).
    Stream,
}

impl ResourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Dataset => "dataset",
            ResourceKind::Document => "document",
            ResourceKind::Endpoint => "endpoint",
            ResourceKind::Secret => "secret",
            ResourceKind::Model => "model",
            ResourceKind::Stream => "stream",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// File extensions that make a `file://` URI a dataset rather than a document.
const DATASET_EXTENSIONS: &[&str] = &[
    "csv", "tsv", "parquet", "jsonl", "ndjson", "arrow", "db", "sqlite",
];

/// Infer a resource kind from a URI.
///
/// The mapping is fixed and total:
///
/// | Scheme | Kind |
/// |--------|------|
/// | `http`, `https` | `Endpoint` |
/// | `ws`, `wss`, `sse` | `Stream` |
/// | `secret`, `vault` | `Secret` |
/// | `s3`, `gs`, `db`, `postgres`, `postgresql`, `mysql`, `sqlite` | `Dataset` |
/// | `model`, `hf` | `Model` |
/// | `file` | `Dataset` for tabular extensions, else `Document` |
/// | anything else | `Document` |
pub fn infer_kind(uri: &str) -> ResourceKind {
    let Some((scheme, rest)) = uri.split_once("://") else {
        return ResourceKind::Document;
    };

    match scheme.to_ascii_lowercase().as_str() {
        "http" | "https" => ResourceKind::Endpoint,
        "ws" | "wss" | "sse" => ResourceKind::Stream,
        "secret" | "vault" => ResourceKind::Secret,
        "s3" | "gs" | "db" | "postgres" | "postgresql" | "mysql" | "sqlite" => {
            ResourceKind::Dataset
        }
        "model" | "hf" => ResourceKind::Model,
        "file" => {
            let path = rest.split(['?', '#']).next().unwrap_or(rest);
            let ext = path
                .rsplit_once('.')
                .map(|(_, ext)| ext.to_ascii_lowercase())
                .unwrap_or_default();
            if !ext.contains('/') && DATASET_EXTENSIONS.contains(&ext.as_str()) {
                ResourceKind::Dataset
            } else {
                ResourceKind::Document
            }
        }
        _ => ResourceKind::Document,
    }
}

/// A protocol-exposable unit of context or data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceRef {
    /// Stable identifier, also used to derive protocol-facing names.
    pub id: String,

    /// Explicit kind; `None` means "infer from the URI".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<ResourceKind>,

    /// Where the resource lives.
    pub uri: String,

    /// Optional schema describing the resource contents.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<Value>,
}

impl ResourceRef {
    pub fn new(id: impl Into<String>, uri: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: None,
            uri: uri.into(),
            schema: None,
        }
    }

    pub fn with_kind(mut self, kind: ResourceKind) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn with_schema(mut self, schema: Value) -> Self {
        self.schema = Some(schema);
        self
    }

    /// The explicit kind if set, otherwise the kind inferred from the URI.
    pub fn effective_kind(&self) -> ResourceKind {
        self.kind.unwrap_or_else(|| infer_kind(&self.uri))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_infer_kind_by_scheme() {
        assert_eq!(infer_kind("https://x"), ResourceKind::Endpoint);
        assert_eq!(infer_kind("http://api.example.com/v1"), ResourceKind::Endpoint);
        assert_eq!(infer_kind("secret://x"), ResourceKind::Secret);
        assert_eq!(infer_kind("vault://kv/openai"), ResourceKind::Secret);
        assert_eq!(infer_kind("wss://feed"), ResourceKind::Stream);
        assert_eq!(infer_kind("s3://bucket/key"), ResourceKind::Dataset);
        assert_eq!(infer_kind("hf://meta/llama"), ResourceKind::Model);
    }

    #[test]
    fn test_infer_kind_file_extensions() {
        assert_eq!(infer_kind("file:///x.json"), ResourceKind::Document);
        assert_eq!(infer_kind("file:///data/users.csv"), ResourceKind::Dataset);
        assert_eq!(infer_kind("file:///data/events.PARQUET"), ResourceKind::Dataset);
        assert_eq!(infer_kind("file:///a.b/readme"), ResourceKind::Document);
        assert_eq!(infer_kind("file:///notes.md?rev=2"), ResourceKind::Document);
    }

    #[test]
    fn test_infer_kind_is_total() {
        for uri in ["", "no-scheme", "://", "weird+scheme://x", "ftp://host/file", "🦀://x"] {
            // Never panics, always yields a kind; unknown schemes fall back to document.
            assert_eq!(infer_kind(uri), ResourceKind::Document, "uri = {uri:?}");
        }
    }

    #[test]
    fn test_effective_kind_prefers_explicit() {
        let r = ResourceRef::new("creds", "https://vault.example.com").with_kind(ResourceKind::Secret);
        assert_eq!(r.effective_kind(), ResourceKind::Secret);
        let r = ResourceRef::new("api", "https://api.example.com");
        assert_eq!(r.effective_kind(), ResourceKind::Endpoint);
    }
}
