use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TreeError {
    #[error("node {child} cannot be appended to its own descendant {parent}")]
    Hierarchy { parent: usize, child: usize },

    #[error("documents cannot be appended as children (node {node})")]
    DocumentChild { node: usize },

    #[error("node {node} is not an element")]
    NotAnElement { node: usize },

    #[error("node {node} is not a document")]
    NotADocument { node: usize },

    #[error("node {node} does not exist in this tree")]
    UnknownNode { node: usize },
}

#[derive(Error, Debug)]
pub enum SnapshotError {
    #[error("I/O error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid snapshot JSON{}: {source}", display_path(.path))]
    Json {
        path: Option<PathBuf>,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid base URL '{url}': {source}")]
    BaseUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error(transparent)]
    Tree(#[from] TreeError),
}

impl SnapshotError {
    pub(crate) fn with_path(self, path: &std::path::Path) -> Self {
        match self {
            SnapshotError::Json { path: None, source } => SnapshotError::Json {
                path: Some(path.to_path_buf()),
                source,
            },
            other => other,
        }
    }
}

fn display_path(path: &Option<PathBuf>) -> String {
    match path {
        Some(path) => format!(" ({})", path.display()),
        None => String::new(),
    }
}
