use std::collections::HashMap;
use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use log::debug;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use sha2::{Digest, Sha256};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MrpError {
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),
    #[error("invalid JSON run environment: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid TOML run environment: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("no input on stdin")]
    EmptyInput,
    #[error("input file '{0}' is not declared under model.files")]
    MissingFile(String),
    #[error("typed input has not been loaded")]
    MissingInput,
}

pub type Result<T> = std::result::Result<T, MrpError>;

/// Run environment handed to a model by the runner.
///
/// `seed` and `replicate` are lifted out of the `input` section so the typed
/// input only carries model parameters.
pub struct Environment<I = ()> {
    input_json: serde_json::Map<String, Value>,
    pub input: Option<I>,
    pub seed: u64,
    pub replicate: u64,
    pub files: HashMap<String, PathBuf>,
    output: Value,
}

impl Environment {
    pub fn from_json(data: Value) -> Self {
        let mut input_json = data
            .get("input")
            .and_then(|v| v.as_object())
            .cloned()
            .unwrap_or_default();

        let seed = input_json
            .remove("seed")
            .and_then(|v| v.as_u64())
            .unwrap_or(0);

        let replicate = input_json
            .remove("replicate")
            .and_then(|v| v.as_u64())
            .unwrap_or(0);

        let files = data
            .get("model")
            .and_then(|m| m.get("files"))
            .and_then(|f| f.as_object())
            .map(|obj| {
                obj.iter()
                    .filter_map(|(k, v)| v.as_str().map(|s| (k.clone(), PathBuf::from(s))))
                    .collect()
            })
            .unwrap_or_default();

        let output = data.get("output").cloned().unwrap_or(Value::Null);

        Self {
            input_json,
            input: None,
            seed,
            replicate,
            files,
            output,
        }
    }

    pub fn from_stdin() -> Result<Self> {
        let mut raw = String::new();
        io::stdin().read_to_string(&mut raw)?;
        if raw.trim().is_empty() {
            return Err(MrpError::EmptyInput);
        }
        let data: Value = serde_json::from_str(&raw)?;
        Ok(Self::from_json(data))
    }

    /// Same layout as the JSON environment, for local runs from a config
    /// file. Dates must be quoted strings.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let data: Value = toml::from_str(raw)?;
        Ok(Self::from_json(data))
    }

    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = fs::read_to_string(path)?;
        Self::from_toml_str(&raw)
    }

    pub fn with_input_type<I: DeserializeOwned>(self) -> Result<Environment<I>> {
        let input_value = Value::Object(self.input_json.clone());
        let input = serde_json::from_value(input_value)?;
        Ok(Environment {
            input_json: self.input_json,
            input: Some(input),
            seed: self.seed,
            replicate: self.replicate,
            files: self.files,
            output: self.output,
        })
    }
}

impl<I: DeserializeOwned> Environment<I> {
    pub fn load() -> Result<Self> {
        Environment::from_stdin()?.with_input_type::<I>()
    }
}

impl<I> Environment<I> {
    pub fn input_json(&self) -> &serde_json::Map<String, Value> {
        &self.input_json
    }

    pub fn input(&self) -> Result<&I> {
        self.input.as_ref().ok_or(MrpError::MissingInput)
    }

    pub fn output_dir(&self) -> Option<PathBuf> {
        let output = &self.output;

        // Check flat output
        if output.get("spec").and_then(|v| v.as_str()) == Some("filesystem") {
            if let Some(dir) = output.get("dir").and_then(|v| v.as_str()) {
                return Some(PathBuf::from(dir));
            }
            return None;
        }

        // Check profiled output, falling back to the first profile
        if let Some(profiles) = output.get("profile").and_then(|v| v.as_object()) {
            let selected = profiles
                .get("default")
                .or_else(|| profiles.values().next());
            if let Some(profile) = selected
                && profile.get("spec").and_then(|v| v.as_str()) == Some("filesystem")
                && let Some(dir) = profile.get("dir").and_then(|v| v.as_str())
            {
                return Some(PathBuf::from(dir));
            }
        }

        None
    }

    pub fn file(&self, key: &str) -> Result<&Path> {
        self.files
            .get(key)
            .map(PathBuf::as_path)
            .ok_or_else(|| MrpError::MissingFile(key.to_string()))
    }

    /// Hex-encoded SHA-256 of a declared input file.
    pub fn file_digest(&self, key: &str) -> Result<String> {
        let bytes = fs::read(self.file(key)?)?;
        Ok(hex::encode(Sha256::digest(&bytes)))
    }

    /// Deserialize every row of a declared CSV input file. The first row is
    /// the header and columns are matched to fields by name.
    pub fn read_csv<T: DeserializeOwned>(&self, key: &str) -> Result<Vec<T>> {
        let path = self.file(key)?;
        let mut rdr = csv::Reader::from_path(path)?;
        let mut rows = Vec::new();
        for record in rdr.deserialize() {
            rows.push(record?);
        }
        debug!("read {} rows from {}", rows.len(), path.display());
        Ok(rows)
    }

    /// Write serializable records as CSV, headers taken from field names.
    /// Without a filesystem output the table goes to stdout.
    pub fn write_csv<T: Serialize>(&self, filename: &str, records: &[T]) -> Result<()> {
        if let Some(dir) = self.output_dir() {
            fs::create_dir_all(&dir)?;
            let file = fs::File::create(dir.join(filename))?;
            write_records(file, records)
        } else {
            write_records(io::stdout(), records)
        }
    }
}

fn write_records<W: Write, T: Serialize>(writer: W, records: &[T]) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    for record in records {
        wtr.serialize(record)?;
    }
    wtr.flush()?;
    Ok(())
}

/// Mix a base seed, replicate and a list of labels into a 64-bit seed.
///
/// Stable across platforms and releases: the first eight bytes of a SHA-256
/// over the little-endian seed, replicate and length-prefixed labels.
pub fn derive_seed(seed: u64, replicate: u64, labels: &[&str]) -> u64 {
    let mut hasher = Sha256::new();
    hasher.update(seed.to_le_bytes());
    hasher.update(replicate.to_le_bytes());
    for label in labels {
        hasher.update((label.len() as u64).to_le_bytes());
        hasher.update(label.as_bytes());
    }
    let digest = hasher.finalize();
    let mut head = [0u8; 8];
    head.copy_from_slice(&digest[..8]);
    u64::from_le_bytes(head)
}
