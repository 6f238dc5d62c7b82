use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use clap::ValueEnum;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::PipelineError;

/// NCBI taxonomy id; the primary key for genome directories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TaxId(u64);

impl TaxId {
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for TaxId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for TaxId {
    type Err = PipelineError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        if trimmed.is_empty() || !trimmed.chars().all(|ch| ch.is_ascii_digit()) {
            return Err(PipelineError::InvalidTaxId(value.to_string()));
        }
        trimmed
            .parse::<u64>()
            .map(Self)
            .map_err(|_| PipelineError::InvalidTaxId(value.to_string()))
    }
}

/// dbCAN sequence-type mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SeqType {
    /// Proteome input.
    Protein,
    /// Prokaryote genome input.
    Prok,
    /// Metagenome input.
    Meta,
}

impl fmt::Display for SeqType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SeqType::Protein => write!(f, "protein"),
            SeqType::Prok => write!(f, "prok"),
            SeqType::Meta => write!(f, "meta"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tool {
    Hmmer,
    Diamond,
    Hotpep,
    All,
}

impl fmt::Display for Tool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tool::Hmmer => write!(f, "hmmer"),
            Tool::Diamond => write!(f, "diamond"),
            Tool::Hotpep => write!(f, "hotpep"),
            Tool::All => write!(f, "all"),
        }
    }
}

impl FromStr for Tool {
    type Err = PipelineError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "hmmer" => Ok(Tool::Hmmer),
            "diamond" => Ok(Tool::Diamond),
            "hotpep" => Ok(Tool::Hotpep),
            "all" => Ok(Tool::All),
            other => Err(PipelineError::InvalidTool(other.to_string())),
        }
    }
}

/// Comma-separated tool subset passed through to dbCAN's `--tools`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolSelection(Vec<Tool>);

impl ToolSelection {
    pub fn all() -> Self {
        Self(vec![Tool::All])
    }

    pub fn tools(&self) -> &[Tool] {
        &self.0
    }
}

impl Default for ToolSelection {
    fn default() -> Self {
        Self::all()
    }
}

impl fmt::Display for ToolSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered = self
            .0
            .iter()
            .map(Tool::to_string)
            .collect::<Vec<_>>()
            .join(",");
        write!(f, "{rendered}")
    }
}

impl FromStr for ToolSelection {
    type Err = PipelineError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let tools = value
            .split(',')
            .filter(|part| !part.trim().is_empty())
            .map(str::parse)
            .collect::<Result<Vec<Tool>, _>>()?;
        if tools.is_empty() {
            return Err(PipelineError::InvalidTool(value.to_string()));
        }
        Ok(Self(tools))
    }
}

/// A CAZyme family code, e.g. `GH13_1`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CazyFamily(String);

impl CazyFamily {
    /// Strips every parenthesized suffix from a raw family call, so
    /// `GH13_1(stuff)` becomes `GH13_1`.
    pub fn normalize(raw: &str) -> Self {
        static PARENS: OnceLock<Regex> = OnceLock::new();
        let parens = PARENS.get_or_init(|| Regex::new(r"\([^)]*\)").unwrap());
        Self(parens.replace_all(raw.trim(), "").to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CazyFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One row of the taxa metadata table, keyed by taxonomy id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenomeRecord {
    pub tax_id: TaxId,
    pub species: String,
    pub bioproject: String,
    pub scientific_name: String,
}

impl GenomeRecord {
    /// First whitespace token of the species name. `None` when the field
    /// is blank.
    pub fn genus(&self) -> Option<&str> {
        self.species.split_whitespace().next()
    }

    /// Strain designation parsed from the scientific name: brackets are
    /// stripped and the last two whitespace tokens are kept. Names with
    /// fewer than two tokens yield `None`; callers fall back to the whole
    /// cleaned name.
    pub fn strain(&self) -> Option<String> {
        let cleaned = self.cleaned_scientific_name();
        let tokens: Vec<&str> = cleaned.split_whitespace().collect();
        if tokens.len() < 2 {
            return None;
        }
        Some(tokens[tokens.len() - 2..].join(" "))
    }

    pub fn cleaned_scientific_name(&self) -> String {
        self.scientific_name.replace(['[', ']'], "")
    }
}
