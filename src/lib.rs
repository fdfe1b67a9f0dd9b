pub mod config;
pub mod converter;
pub mod error;
pub mod merge;
pub mod model;
pub mod parser;
pub mod pipeline;
pub mod registry;
pub mod semantic;
pub mod transform;
pub mod writer;

pub use config::{ConvertOptions, MapFrame, MapMetadata};
pub use converter::Converter;
pub use error::{Error, Result};
pub use merge::{merge, merge_all};
pub use model::{MapCounts, MapDocument, NuScenesMap, SemanticLayer};
pub use parser::{load_collection, parse_collection, InputCollection};
pub use pipeline::{convert_file, convert_path, persist, RunSummary};
pub use registry::NodeRegistry;
pub use transform::CoordinateTransformer;
pub use writer::MapWriter;
