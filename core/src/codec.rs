// SPDX-License-Identifier: MIT OR Apache-2.0

//! Serialization helpers for record containers
//!
//! Containers are stored either as CBOR (`.cbor`) or JSON (`.json`); the
//! format is chosen from the file extension.

use serde::{de::DeserializeOwned, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use crate::{Error, Result};

/// On-disk container format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Cbor,
    Json,
}

impl Format {
    /// Pick the format from a file extension
    pub fn from_path(path: &Path) -> Result<Self> {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("cbor") => Ok(Format::Cbor),
            Some("json") => Ok(Format::Json),
            other => Err(Error::Decode {
                path: path.to_path_buf(),
                reason: format!("unsupported container extension {:?}", other),
            }),
        }
    }
}

/// Deserialize a container from a CBOR or JSON file
pub fn read_container<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let format = Format::from_path(path)?;
    let file = File::open(path).map_err(|e| Error::io(path, e))?;
    let reader = BufReader::new(file);

    match format {
        Format::Cbor => ciborium::de::from_reader(reader).map_err(|e| Error::Decode {
            path: path.to_path_buf(),
            reason: e.to_string(),
        }),
        Format::Json => serde_json::from_reader(reader).map_err(|e| Error::Decode {
            path: path.to_path_buf(),
            reason: e.to_string(),
        }),
    }
}

/// Serialize a container to a CBOR or JSON file
pub fn write_container<T: Serialize>(value: &T, path: &Path) -> Result<()> {
    let format = Format::from_path(path)?;
    let file = File::create(path).map_err(|e| Error::io(path, e))?;
    let mut writer = BufWriter::new(file);

    match format {
        Format::Cbor => {
            ciborium::ser::into_writer(value, &mut writer).map_err(|e| Error::Decode {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?
        }
        Format::Json => {
            serde_json::to_writer_pretty(&mut writer, value).map_err(|e| Error::Decode {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?
        }
    }

    writer.flush().map_err(|e| Error::io(path, e))
}

/// Read a text file as a list of lines, without trailing newlines
pub fn read_lines(path: &Path) -> Result<Vec<String>> {
    let content = std::fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
    Ok(content.lines().map(str::to_owned).collect())
}
