use std::{fs, io, path::Path, path::PathBuf};

use base64::{engine::general_purpose::STANDARD_NO_PAD, Engine as _};
use thiserror::Error;
use vector_racing_core::{Tile, TrackError};
use vector_racing_world::track::TrackGrid;

const TRANSFER_DOMAIN: &str = "track";
const TRANSFER_VERSION: &str = "v1";

/// Identifier prefix emitted before the encoded grid payload.
pub(crate) const TRANSFER_HEADER: &str = "track:v1";
/// Delimiter used to separate the prefix, grid dimensions and payload.
const FIELD_DELIMITER: char = ':';

/// Encodings a track file may use.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum TrackFormat {
    /// JSON array of rows of tile codes.
    Json,
    /// One line of tile glyphs per row.
    Glyphs,
    /// Single-line `track:v1:<cols>x<rows>:<base64>` string.
    Transfer,
}

impl TrackFormat {
    /// Picks the format from the file extension, falling back to the contents.
    pub(crate) fn detect(path: &Path, contents: &str) -> Self {
        match path.extension().and_then(|extension| extension.to_str()) {
            Some("json") => Self::Json,
            Some("txt") => Self::Glyphs,
            _ => Self::sniff(contents),
        }
    }

    fn sniff(contents: &str) -> Self {
        let trimmed = contents.trim_start();
        if trimmed.starts_with(TRANSFER_HEADER) {
            Self::Transfer
        } else if trimmed.starts_with('[') {
            Self::Json
        } else {
            Self::Glyphs
        }
    }
}

/// Errors that can occur while reading or decoding track files.
#[derive(Debug, Error)]
pub(crate) enum TrackFileError {
    /// The file could not be read.
    #[error("could not read track file {path}")]
    Io {
        /// File that failed to open.
        path: PathBuf,
        /// Underlying failure.
        #[source]
        source: io::Error,
    },
    /// The provided string was empty or contained only whitespace.
    #[error("track payload was empty")]
    EmptyPayload,
    /// A segment of the transfer string was missing.
    #[error("track string is missing the {0}")]
    MissingField(&'static str),
    /// The transfer string used an unexpected prefix segment.
    #[error("track prefix '{0}' is not supported")]
    InvalidPrefix(String),
    /// The transfer string used an unsupported version identifier.
    #[error("track version '{0}' is not supported")]
    UnsupportedVersion(String),
    /// The grid dimensions could not be parsed.
    #[error("could not parse grid dimensions '{0}'")]
    InvalidDimensions(String),
    /// The base64 payload could not be decoded.
    #[error("could not decode track payload")]
    InvalidEncoding(#[from] base64::DecodeError),
    /// The decoded payload does not cover the announced grid.
    #[error("track payload holds {found} cells, expected {expected}")]
    PayloadSize {
        /// Cells implied by the dimensions.
        expected: usize,
        /// Cells actually decoded.
        found: usize,
    },
    /// The JSON rows could not be parsed.
    #[error("could not parse track rows")]
    InvalidJson(#[from] serde_json::Error),
    /// The rows do not describe a valid grid.
    #[error(transparent)]
    Grid(#[from] TrackError),
}

/// Reads and decodes the track stored at `path`.
pub(crate) fn load_track(path: &Path) -> Result<TrackGrid, TrackFileError> {
    let contents = fs::read_to_string(path).map_err(|source| TrackFileError::Io {
        path: path.to_owned(),
        source,
    })?;
    let format = TrackFormat::detect(path, &contents);
    tracing::debug!(path = %path.display(), ?format, "decoding track file");
    parse_track(&contents, format)
}

/// Decodes track contents stored in `format`.
pub(crate) fn parse_track(contents: &str, format: TrackFormat) -> Result<TrackGrid, TrackFileError> {
    match format {
        TrackFormat::Json => {
            let rows: Vec<Vec<u8>> = serde_json::from_str(contents)?;
            Ok(TrackGrid::from_codes(&rows)?)
        }
        TrackFormat::Glyphs => {
            let lines: Vec<&str> = contents
                .lines()
                .map(str::trim_end)
                .filter(|line| !line.is_empty())
                .collect();
            Ok(TrackGrid::from_glyphs(&lines)?)
        }
        TrackFormat::Transfer => decode_transfer(contents),
    }
}

/// Serialises the grid as a JSON array of rows of tile codes.
pub(crate) fn to_json(grid: &TrackGrid) -> Result<String, TrackFileError> {
    Ok(serde_json::to_string(&grid.to_codes())?)
}

/// Encodes the grid into a single-line string suitable for clipboard transfer.
pub(crate) fn encode_transfer(grid: &TrackGrid) -> String {
    let codes: Vec<u8> = grid.cells().map(|(_, tile)| tile.code()).collect();
    let encoded = STANDARD_NO_PAD.encode(codes);
    format!(
        "{TRANSFER_HEADER}:{}x{}:{encoded}",
        grid.columns(),
        grid.rows()
    )
}

/// Decodes a grid from its transfer string.
pub(crate) fn decode_transfer(value: &str) -> Result<TrackGrid, TrackFileError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(TrackFileError::EmptyPayload);
    }

    let mut parts = trimmed.split(FIELD_DELIMITER);
    let domain = parts.next().ok_or(TrackFileError::MissingField("prefix"))?;
    let version = parts.next().ok_or(TrackFileError::MissingField("version"))?;
    let dimensions = parts
        .next()
        .ok_or(TrackFileError::MissingField("grid dimensions"))?;
    let payload = parts.next().ok_or(TrackFileError::MissingField("payload"))?;

    if domain != TRANSFER_DOMAIN {
        return Err(TrackFileError::InvalidPrefix(domain.to_owned()));
    }
    if version != TRANSFER_VERSION {
        return Err(TrackFileError::UnsupportedVersion(version.to_owned()));
    }

    let (columns, rows) = parse_dimensions(dimensions)?;
    let bytes = STANDARD_NO_PAD.decode(payload.as_bytes())?;
    let expected = columns as usize * rows as usize;
    if bytes.len() != expected {
        return Err(TrackFileError::PayloadSize {
            expected,
            found: bytes.len(),
        });
    }

    let codes: Vec<Vec<u8>> = bytes
        .chunks(columns as usize)
        .map(<[u8]>::to_vec)
        .collect();
    Ok(TrackGrid::from_codes(&codes)?)
}

fn parse_dimensions(dimensions: &str) -> Result<(u32, u32), TrackFileError> {
    let invalid = || TrackFileError::InvalidDimensions(dimensions.to_owned());
    let (columns, rows) = dimensions.split_once(['x', 'X']).ok_or_else(invalid)?;

    let columns = columns.trim().parse::<u32>().map_err(|_| invalid())?;
    let rows = rows.trim().parse::<u32>().map_err(|_| invalid())?;

    if columns == 0 || rows == 0 {
        return Err(invalid());
    }

    Ok((columns, rows))
}

/// Counts of each tile kind, used in validation summaries.
pub(crate) fn tile_census(grid: &TrackGrid) -> Vec<(Tile, usize)> {
    Tile::ALL
        .into_iter()
        .map(|kind| {
            let count = grid.cells().filter(|&(_, tile)| tile == kind).count();
            (kind, count)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use vector_racing_core::CellCoord;

    fn grid() -> TrackGrid {
        TrackGrid::from_glyphs(&["#SS.11.#", "#SS.22.#"]).expect("valid layout")
    }

    #[test]
    fn transfer_strings_round_trip() {
        let grid = grid();

        let encoded = encode_transfer(&grid);
        assert!(encoded.starts_with(&format!("{TRANSFER_HEADER}:8x2:")));

        let decoded = decode_transfer(&encoded).expect("grid decodes");
        assert_eq!(decoded, grid);
    }

    #[test]
    fn json_rows_use_tile_codes() {
        let json = to_json(&grid()).expect("grid serialises");

        assert!(json.starts_with("[[0,2,2,1,3,3,1,0],"));
        assert_eq!(
            parse_track(&json, TrackFormat::Json).expect("json decodes"),
            grid()
        );
    }

    #[test]
    fn glyph_files_ignore_blank_lines() {
        let parsed = parse_track("#SS.11.#\n\n#SS.22.#\n", TrackFormat::Glyphs).expect("decodes");

        assert_eq!(parsed.tile(CellCoord::new(4, 1)), Some(Tile::Checkpoint2));
    }

    #[test]
    fn formats_are_detected_from_extension_then_contents() {
        assert_eq!(
            TrackFormat::detect(Path::new("oval.json"), "#"),
            TrackFormat::Json
        );
        assert_eq!(
            TrackFormat::detect(Path::new("oval.track"), "track:v1:1x1:AA"),
            TrackFormat::Transfer
        );
        assert_eq!(
            TrackFormat::detect(Path::new("oval"), "[[3]]"),
            TrackFormat::Json
        );
        assert_eq!(
            TrackFormat::detect(Path::new("oval"), "S.1.2"),
            TrackFormat::Glyphs
        );
    }

    #[test]
    fn malformed_transfer_strings_are_rejected() {
        assert!(matches!(
            decode_transfer("   "),
            Err(TrackFileError::EmptyPayload)
        ));
        assert!(matches!(
            decode_transfer("maze:v1:2x2:AAAAAA"),
            Err(TrackFileError::InvalidPrefix(prefix)) if prefix == "maze"
        ));
        assert!(matches!(
            decode_transfer("track:v2:2x2:AAAAAA"),
            Err(TrackFileError::UnsupportedVersion(_))
        ));
        assert!(matches!(
            decode_transfer("track:v1:0x2:AA"),
            Err(TrackFileError::InvalidDimensions(_))
        ));
        assert!(matches!(
            decode_transfer("track:v1:3x3:AAAA"),
            Err(TrackFileError::PayloadSize {
                expected: 9,
                found: 3
            })
        ));
        assert!(matches!(
            decode_transfer("track:v1:2x2"),
            Err(TrackFileError::MissingField("payload"))
        ));
    }

    #[test]
    fn unknown_codes_surface_as_grid_errors() {
        let encoded = format!("{TRANSFER_HEADER}:1x1:{}", STANDARD_NO_PAD.encode([9_u8]));

        assert!(matches!(
            decode_transfer(&encoded),
            Err(TrackFileError::Grid(TrackError::UnknownTileCode { code: 9, .. }))
        ));
    }

    #[test]
    fn census_counts_every_tile_kind() {
        let census = tile_census(&grid());

        assert_eq!(census.len(), Tile::ALL.len());
        assert!(census.contains(&(Tile::StartFinish, 4)));
        assert!(census.contains(&(Tile::OutOfBounds, 4)));
    }
}
