//! Conversion of curated pathway database records into SBML Level 3
//! documents, optionally carrying the stored diagram as a layout.

pub mod annotation;
pub mod batch;
pub mod builder;
pub mod diagram;
pub mod document;
pub mod error;
pub mod layout;
pub mod model;
pub mod preview;
pub mod registry;
pub mod resolver;
pub mod sbo;
pub mod source;
pub mod tighten;
pub mod writer;

pub use batch::{convert_species, BatchOptions, BatchReport};
pub use builder::{ConvertOptions, ModelBuilder};
pub use document::Document;
pub use error::{ConvertError, Result};
pub use source::{PathwaySource, SnapshotSource};
pub use tighten::TextMeasure;
pub use writer::{to_sbml_string, write_sbml_file};
