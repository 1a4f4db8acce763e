use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, ConvertError>;

#[derive(Debug, thiserror::Error)]
pub enum ConvertError {
    /// Missing cross-reference, URL template or a record of the wrong kind.
    #[error("Data integrity error for {id}: {message}")]
    DataIntegrity { id: String, message: String },

    #[error("Unknown target identifier: {id}")]
    UnknownTarget { id: String },

    #[error("Geometry error for reaction {reaction}: {message}")]
    Geometry { reaction: String, message: String },

    #[error("Invalid database snapshot: {0}")]
    Snapshot(#[from] serde_json::Error),

    #[error("Invalid diagram XML for {id}: {source}")]
    DiagramXml {
        id: String,
        #[source]
        source: roxmltree::Error,
    },

    #[error("Failed to access {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize SBML: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("Serialized SBML is not UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    #[error("Rendering failed: {0}")]
    Render(String),

    #[error("Failed to start worker pool: {0}")]
    WorkerPool(#[from] rayon::ThreadPoolBuildError),
}

impl ConvertError {
    pub fn integrity(id: impl ToString, message: impl Into<String>) -> Self {
        Self::DataIntegrity {
            id: id.to_string(),
            message: message.into(),
        }
    }

    pub fn geometry(reaction: impl ToString, message: impl Into<String>) -> Self {
        Self::Geometry {
            reaction: reaction.to_string(),
            message: message.into(),
        }
    }
}

impl From<cairo::Error> for ConvertError {
    fn from(err: cairo::Error) -> Self {
        Self::Render(err.to_string())
    }
}

impl From<cairo::IoError> for ConvertError {
    fn from(err: cairo::IoError) -> Self {
        Self::Render(err.to_string())
    }
}
