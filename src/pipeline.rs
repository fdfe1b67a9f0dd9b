use std::path::Path;

use tracing::info;

use crate::config::{ConvertOptions, MapFrame};
use crate::converter::Converter;
use crate::error::Result;
use crate::merge::merge;
use crate::model::{MapCounts, MapDocument, NuScenesMap};
use crate::parser::load_collection;
use crate::writer::MapWriter;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    /// What this run contributed.
    pub converted: MapCounts,
    /// What ended up in the output file.
    pub written: MapCounts,
    /// Whether an existing output file was merged into.
    pub merged: bool,
}

/// Loads one GeoJSON file and converts it with a fresh converter.
pub fn convert_path(input: &Path, frame: MapFrame, options: ConvertOptions) -> Result<NuScenesMap> {
    info!("Processing GeoJSON file: {:?}", input);
    let collection = load_collection(input)?;
    Ok(Converter::new(frame, options).convert(&collection))
}

/// Merges `incoming` into whatever is at `output` and rewrites the file.
///
/// Nothing is written when the merge fails.
pub fn persist(output: &Path, incoming: MapDocument) -> Result<RunSummary> {
    let writer = MapWriter::new();
    let converted = MapCounts::of_document(&incoming);

    let (document, merged) = match writer.read_existing(output) {
        Some(existing) => (merge(existing, incoming)?, true),
        None => (incoming, false),
    };

    writer.write(&document, output)?;

    Ok(RunSummary {
        converted,
        written: MapCounts::of_document(&document),
        merged,
    })
}

/// One complete run: convert `input` and merge it into `output`.
pub fn convert_file(
    input: &Path,
    output: &Path,
    frame: MapFrame,
    options: ConvertOptions,
) -> Result<RunSummary> {
    let map = convert_path(input, frame, options)?;
    let summary = persist(output, map.to_document()?)?;
    info!(
        "Conversion complete. NuScenesMap JSON saved to {:?}",
        output
    );
    Ok(summary)
}
