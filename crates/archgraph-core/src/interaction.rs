use crate::{InteractionId, ModuleId};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum InteractionDirection {
    #[default]
    Uni,
    Bi,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InteractionPattern {
    Utility,
    Business,
}

/// Provenance of an interaction edge.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InteractionSource {
    Ast,
    AstImport,
    ContractMatched,
    LlmInferred,
    Other(String),
}

impl InteractionSource {
    /// Higher wins when two sources describe the same module pair.
    pub fn precedence(&self) -> u8 {
        match self {
            InteractionSource::Ast => 4,
            InteractionSource::ContractMatched => 3,
            InteractionSource::LlmInferred => 2,
            InteractionSource::AstImport => 1,
            InteractionSource::Other(_) => 0,
        }
    }
}

impl fmt::Display for InteractionSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            InteractionSource::Ast => "ast",
            InteractionSource::AstImport => "ast-import",
            InteractionSource::ContractMatched => "contract-matched",
            InteractionSource::LlmInferred => "llm-inferred",
            InteractionSource::Other(s) => s.as_str(),
        };
        write!(f, "{}", s)
    }
}

impl FromStr for InteractionSource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "ast" => Ok(InteractionSource::Ast),
            "ast-import" => Ok(InteractionSource::AstImport),
            "contract-matched" => Ok(InteractionSource::ContractMatched),
            "llm-inferred" => Ok(InteractionSource::LlmInferred),
            other => Ok(InteractionSource::Other(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    Low,
    Medium,
    High,
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Confidence::Low => "low",
            Confidence::Medium => "medium",
            Confidence::High => "high",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for Confidence {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "low" => Ok(Confidence::Low),
            "medium" => Ok(Confidence::Medium),
            "high" => Ok(Confidence::High),
            other => Err(format!("unknown confidence: {}", other)),
        }
    }
}

/// Directed module-to-module edge, unique per ordered pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interaction {
    pub id: InteractionId,
    pub from_module_id: ModuleId,
    pub to_module_id: ModuleId,
    pub direction: InteractionDirection,
    pub weight: u32,
    pub pattern: Option<InteractionPattern>,
    /// Observed callee names in first-seen order.
    pub symbols: Vec<String>,
    pub semantic: Option<String>,
    pub source: InteractionSource,
    pub confidence: Option<Confidence>,
}

impl Interaction {
    pub fn pair(&self) -> (ModuleId, ModuleId) {
        (self.from_module_id, self.to_module_id)
    }

    pub fn from_upsert(id: InteractionId, upsert: InteractionUpsert, max_symbols: usize) -> Self {
        let mut symbols = Vec::new();
        push_unique_capped(&mut symbols, &upsert.symbols, max_symbols);
        Self {
            id,
            from_module_id: upsert.from_module_id,
            to_module_id: upsert.to_module_id,
            direction: upsert.direction,
            weight: upsert.weight.max(1),
            pattern: upsert.pattern,
            symbols,
            semantic: upsert.semantic.filter(|s| !s.trim().is_empty()),
            source: upsert.source,
            confidence: upsert.confidence,
        }
    }

    /// Merge new evidence for the same ordered pair. Re-applying the same
    /// upsert leaves the interaction unchanged.
    pub fn merge(&mut self, upsert: &InteractionUpsert, max_symbols: usize) {
        self.weight = self.weight.max(upsert.weight).max(1);
        push_unique_capped(&mut self.symbols, &upsert.symbols, max_symbols);

        if self.semantic.as_deref().map_or(true, |s| s.trim().is_empty()) {
            self.semantic = upsert.semantic.clone().filter(|s| !s.trim().is_empty());
        }
        if upsert.direction == InteractionDirection::Bi {
            self.direction = InteractionDirection::Bi;
        }
        if self.pattern.is_none() {
            self.pattern = upsert.pattern;
        }
        if upsert.source.precedence() > self.source.precedence() {
            self.source = upsert.source.clone();
        }
        self.confidence = match (self.confidence, upsert.confidence) {
            (Some(a), Some(b)) => Some(a.max(b)),
            (a, b) => a.or(b),
        };
    }
}

fn push_unique_capped(target: &mut Vec<String>, incoming: &[String], cap: usize) {
    for symbol in incoming {
        if target.len() >= cap {
            break;
        }
        if !target.iter().any(|s| s == symbol) {
            target.push(symbol.clone());
        }
    }
}

/// Write payload keyed by `(from_module_id, to_module_id)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InteractionUpsert {
    pub from_module_id: ModuleId,
    pub to_module_id: ModuleId,
    pub direction: InteractionDirection,
    pub weight: u32,
    pub pattern: Option<InteractionPattern>,
    pub symbols: Vec<String>,
    pub semantic: Option<String>,
    pub source: InteractionSource,
    pub confidence: Option<Confidence>,
    /// Overrides the store's default cap on `symbols`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub symbol_cap: Option<usize>,
}

impl InteractionUpsert {
    pub fn new(from_module_id: ModuleId, to_module_id: ModuleId, source: InteractionSource) -> Self {
        Self {
            from_module_id,
            to_module_id,
            direction: InteractionDirection::Uni,
            weight: 1,
            pattern: None,
            symbols: Vec::new(),
            semantic: None,
            source,
            confidence: None,
            symbol_cap: None,
        }
    }

    pub fn with_weight(mut self, weight: u32) -> Self {
        self.weight = weight;
        self
    }

    pub fn with_semantic(mut self, semantic: impl Into<String>) -> Self {
        self.semantic = Some(semantic.into());
        self
    }

    pub fn with_confidence(mut self, confidence: Confidence) -> Self {
        self.confidence = Some(confidence);
        self
    }

    pub fn with_pattern(mut self, pattern: InteractionPattern) -> Self {
        self.pattern = Some(pattern);
        self
    }

    pub fn with_symbols(mut self, symbols: Vec<String>) -> Self {
        self.symbols = symbols;
        self
    }

    pub fn with_symbol_cap(mut self, cap: usize) -> Self {
        self.symbol_cap = Some(cap);
        self
    }

    pub fn symbol_cap_or(&self, default: usize) -> usize {
        self.symbol_cap.unwrap_or(default)
    }
}

/// Result of an interaction upsert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpsertOutcome {
    pub id: InteractionId,
    pub created: bool,
}
