//! Build artifacts of contract programs.
//!
//! Everything lives under one explicitly given directory which is created on the first write.
//! Files are replaced atomically so a crash never leaves a half-written program behind.

use core::fmt;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crate::compile::CompiledProgram;
use crate::config::Config;
use crate::encoding::{EncodingVersion, UnexpectedEnd, VersionDeserError};
use crate::transaction::StateSchema;

const SOURCE_EXTENSION: &str = "teal";
const PROGRAM_EXTENSION: &str = "compiled";

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct BuildDir {
    root: PathBuf,
}

impl BuildDir {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        BuildDir { root: root.into() }
    }

    pub fn from_config(config: &Config) -> Self {
        BuildDir::new(config.build_dir.clone())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Stores program assembly as `<name>.teal`.
    pub fn store_source(&self, name: &str, source: &str) -> Result<(), ArtifactError> {
        let path = self.path(name, Some(SOURCE_EXTENSION))?;
        self.write(&path, source.as_bytes())
    }

    /// Stores program bytecode as `<name>.compiled`.
    pub fn store_program(&self, name: &str, program: &CompiledProgram) -> Result<(), ArtifactError> {
        let path = self.path(name, Some(PROGRAM_EXTENSION))?;
        self.write(&path, program.as_bytes())
    }

    pub fn load_program(&self, name: &str) -> Result<CompiledProgram, ArtifactError> {
        let path = self.path(name, Some(PROGRAM_EXTENSION))?;
        let bytes = read(&path)?;
        if bytes.is_empty() {
            return Err(ArtifactError::EmptyProgram(path));
        }
        Ok(CompiledProgram::from_bytes(bytes))
    }

    pub fn store_schema(&self, name: &str, schema: &StateSchema) -> Result<(), ArtifactError> {
        let path = self.path(name, None)?;
        let mut bytes = Vec::new();
        EncodingVersion::CURRENT.serialize(&mut bytes);
        schema.serialize(&mut bytes);
        self.write(&path, &bytes)
    }

    pub fn load_schema(&self, name: &str) -> Result<StateSchema, ArtifactError> {
        let path = self.path(name, None)?;
        let bytes = read(&path)?;
        decode_schema(&bytes).map_err(|error| ArtifactError::Corrupted { path, error })
    }

    fn path(&self, name: &str, extension: Option<&str>) -> Result<PathBuf, ArtifactError> {
        let valid = !name.is_empty()
            && !name.starts_with('.')
            && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == '.');
        if !valid {
            return Err(ArtifactError::InvalidName(name.to_owned()));
        }
        match extension {
            Some(extension) => Ok(self.root.join(format!("{}.{}", name, extension))),
            None => Ok(self.root.join(name)),
        }
    }

    fn write(&self, path: &Path, data: &[u8]) -> Result<(), ArtifactError> {
        std::fs::create_dir_all(&self.root).map_err(|error| ArtifactError::Io { path: self.root.clone(), error })?;
        atomic_update(path, data).map_err(|error| ArtifactError::Io { path: path.to_owned(), error })
    }
}

fn atomic_update(path: &Path, data: &[u8]) -> io::Result<()> {
    let mut tmp_file = path.as_os_str().to_owned();
    tmp_file.push(".tmp");
    // we want to call sync, so we create `File` manually
    let written = std::fs::File::create(&tmp_file).and_then(|mut file| {
        file.write_all(data)?;
        file.sync_data()
    });
    if let Err(error) = written.and_then(|()| std::fs::rename(&tmp_file, path)) {
        let _ = std::fs::remove_file(&tmp_file);
        return Err(error);
    }
    Ok(())
}

fn read(path: &Path) -> Result<Vec<u8>, ArtifactError> {
    std::fs::read(path).map_err(|error| {
        if error.kind() == io::ErrorKind::NotFound {
            ArtifactError::Missing(path.to_owned())
        } else {
            ArtifactError::Io { path: path.to_owned(), error }
        }
    })
}

fn decode_schema(mut bytes: &[u8]) -> Result<StateSchema, SchemaError> {
    let EncodingVersion::V1 = EncodingVersion::deserialize(&mut bytes)?;
    let schema = StateSchema::deserialize(&mut bytes)?;
    if !bytes.is_empty() {
        return Err(SchemaError::TrailingBytes(bytes.len()));
    }
    Ok(schema)
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum SchemaError {
    UnexpectedEnd,
    UnsupportedVersion(u8),
    TrailingBytes(usize),
}

impl From<UnexpectedEnd> for SchemaError {
    fn from(_: UnexpectedEnd) -> Self {
        SchemaError::UnexpectedEnd
    }
}

impl From<VersionDeserError> for SchemaError {
    fn from(error: VersionDeserError) -> Self {
        match error {
            VersionDeserError::UnexpectedEnd => SchemaError::UnexpectedEnd,
            VersionDeserError::UnsupportedVersion(version) => SchemaError::UnsupportedVersion(version),
        }
    }
}

impl fmt::Display for SchemaError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            SchemaError::UnexpectedEnd => f.write_str("unexpected end of file"),
            SchemaError::UnsupportedVersion(version) => write!(f, "unsupported version {}", version),
            SchemaError::TrailingBytes(len) => write!(f, "{} unexpected bytes at the end", len),
        }
    }
}

#[derive(Debug)]
pub enum ArtifactError {
    /// Names may only contain ASCII letters, digits, `_`, `-` and `.` and can't start with a dot.
    InvalidName(String),
    Missing(PathBuf),
    EmptyProgram(PathBuf),
    Corrupted { path: PathBuf, error: SchemaError },
    Io { path: PathBuf, error: io::Error },
}

impl fmt::Display for ArtifactError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ArtifactError::InvalidName(name) => write!(f, "invalid artifact name '{}'", name),
            ArtifactError::Missing(path) => write!(f, "artifact {} doesn't exist, was the program compiled?", path.display()),
            ArtifactError::EmptyProgram(path) => write!(f, "program {} is empty", path.display()),
            ArtifactError::Corrupted { path, error } => write!(f, "artifact {} is corrupted: {}", path.display(), error),
            ArtifactError::Io { path, error } => write!(f, "failed to access {}: {}", path.display(), error),
        }
    }
}

impl std::error::Error for ArtifactError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ArtifactError::Io { error, .. } => Some(error),
            _ => None,
        }
    }
}
