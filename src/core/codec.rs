use std::{fmt, str::FromStr};

use strum::{Display, EnumString};

use crate::{CatalogError, common::error::Result, sql::parser::Parser};

/// Compression method names accepted inside `CODEC(...)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumString, Display)]
#[strum(ascii_case_insensitive)]
pub enum CodecKind {
    #[strum(serialize = "NONE")]
    None,
    #[strum(serialize = "LZ4")]
    Lz4,
    #[strum(serialize = "LZ4HC")]
    Lz4Hc,
    #[strum(serialize = "ZSTD")]
    Zstd,
    Delta,
    DoubleDelta,
    Gorilla,
    T64,
}

impl CodecKind {
    /// Checks the optional parameter of a codec method.
    fn check_parameter(self, parameter: Option<u64>) -> Result<(), String> {
        match (self, parameter) {
            (_, None) => Ok(()),
            (CodecKind::Lz4Hc, Some(0..=12)) => Ok(()),
            (CodecKind::Zstd, Some(1..=22)) => Ok(()),
            (CodecKind::Delta, Some(1 | 2 | 4 | 8)) => Ok(()),
            (CodecKind::Lz4Hc, Some(level)) => {
                Err(format!("LZ4HC level must be between 0 and 12, got {level}"))
            }
            (CodecKind::Zstd, Some(level)) => {
                Err(format!("ZSTD level must be between 1 and 22, got {level}"))
            }
            (CodecKind::Delta, Some(bytes)) => {
                Err(format!("Delta bytes size must be 1, 2, 4 or 8, got {bytes}"))
            }
            (kind, Some(_)) => Err(format!("Codec {kind} does not take parameters")),
        }
    }
}

/// One step of a codec chain, e.g. `ZSTD(3)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CodecMethod {
    pub kind: CodecKind,
    pub parameter: Option<u64>,
}

impl CodecMethod {
    pub fn new(kind: CodecKind, parameter: Option<u64>) -> Result<Self, String> {
        kind.check_parameter(parameter)?;
        Ok(Self { kind, parameter })
    }
}

impl fmt::Display for CodecMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.parameter {
            Some(parameter) => write!(f, "{}({parameter})", self.kind),
            None => write!(f, "{}", self.kind),
        }
    }
}

/// Compression codec of a column: a non-empty chain of methods applied in
/// order when writing.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CompressionCodec {
    methods: Vec<CodecMethod>,
}

impl CompressionCodec {
    /// Builds a chain. `NONE` may only be used on its own.
    pub fn new(methods: Vec<CodecMethod>) -> Result<Self, String> {
        if methods.is_empty() {
            return Err("Codec chain cannot be empty".to_string());
        }

        if methods.len() > 1 && methods.iter().any(|m| m.kind == CodecKind::None) {
            return Err("NONE cannot be combined with other codecs".to_string());
        }

        Ok(Self { methods })
    }

    pub fn single(kind: CodecKind, parameter: Option<u64>) -> Result<Self, String> {
        Self::new(vec![CodecMethod::new(kind, parameter)?])
    }

    /// Codec used by columns that do not declare one.
    pub fn default_codec() -> Self {
        Self {
            methods: vec![CodecMethod {
                kind: CodecKind::Lz4,
                parameter: None,
            }],
        }
    }

    pub fn methods(&self) -> &[CodecMethod] {
        &self.methods
    }
}

impl Default for CompressionCodec {
    fn default() -> Self {
        Self::default_codec()
    }
}

impl fmt::Display for CompressionCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CODEC(")?;
        for (i, method) in self.methods.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{method}")?;
        }
        write!(f, ")")
    }
}

impl FromStr for CompressionCodec {
    type Err = CatalogError;

    /// Parses a full `CODEC(...)` clause.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Parser::new(s).parse_codec_only()
    }
}
