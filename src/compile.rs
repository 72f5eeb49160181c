//! Compilation of contract programs.

use core::fmt;
use slog::{info, Logger};

use crate::artifacts::{ArtifactError, BuildDir};

/// Bytecode of a contract program as accepted by application calls.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct CompiledProgram(Vec<u8>);

impl CompiledProgram {
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        CompiledProgram(bytes)
    }

    /// Decodes the base64 answer of the node's compile endpoint.
    pub fn from_base64(encoded: &str) -> Result<Self, CompileError> {
        let bytes = base64::decode(encoded.trim()).map_err(|_| CompileError::InvalidEncoding)?;
        if bytes.is_empty() {
            return Err(CompileError::Empty);
        }
        Ok(CompiledProgram(bytes))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }
}

/// Turns program assembly into bytecode.
///
/// Usually implemented by the node, the compiler is opaque to this crate.
pub trait Compiler {
    fn compile(&self, source: &str) -> Result<CompiledProgram, CompileError>;
}

impl<'a, C: Compiler + ?Sized> Compiler for &'a C {
    fn compile(&self, source: &str) -> Result<CompiledProgram, CompileError> {
        (**self).compile(source)
    }
}

/// Compiles `source` and stores both the source and the bytecode under `name`.
pub fn compile_program<C: Compiler + ?Sized>(compiler: &C, source: &str, store: &BuildDir, name: &str, logger: &Logger) -> Result<CompiledProgram, CompileError> {
    store.store_source(name, source)?;
    let program = compiler.compile(source)?;
    store.store_program(name, &program)?;
    info!(logger, "program compiled"; "name" => name, "size" => program.as_bytes().len());
    Ok(program)
}

#[derive(Debug)]
pub enum CompileError {
    /// The compiler refused the source, contains its message.
    Failed(String),
    InvalidEncoding,
    Empty,
    Artifact(ArtifactError),
}

impl From<ArtifactError> for CompileError {
    fn from(error: ArtifactError) -> Self {
        CompileError::Artifact(error)
    }
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            CompileError::Failed(message) => write!(f, "compilation failed: {}", message),
            CompileError::InvalidEncoding => f.write_str("compiled program is not valid base64"),
            CompileError::Empty => f.write_str("compiled program is empty"),
            CompileError::Artifact(error) => write!(f, "failed to store the program: {}", error),
        }
    }
}

impl std::error::Error for CompileError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CompileError::Artifact(error) => Some(error),
            _ => None,
        }
    }
}
