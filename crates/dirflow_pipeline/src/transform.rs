//! Content transforms applied at dispatch
//!
//! A transform maps decoded text to processed text. The stage around it owns
//! reading and decoding, so a bad file becomes a per-unit `Transform` error
//! instead of stopping the drain.

use crate::error::{FlowError, Result, TransformCause};
use crate::fs::Filesystem;
use crate::unit::UnitOfWork;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::Arc;

/// A stateless text transform.
pub trait Transform: Send + Sync {
    fn name(&self) -> &'static str;
    fn apply(&self, text: &str) -> String;
}

/// Uppercases every line and joins them with `\n`.
///
/// `\n`, `\r\n` and a lone `\r` all end a line; the output has no trailing
/// newline.
#[derive(Debug, Clone, Copy, Default)]
pub struct UppercaseLines;

impl Transform for UppercaseLines {
    fn name(&self) -> &'static str {
        "uppercase"
    }

    fn apply(&self, text: &str) -> String {
        split_lines(text)
            .into_iter()
            .map(str::to_uppercase)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Split on any line terminator. A final terminator does not start an
/// empty line.
fn split_lines(text: &str) -> Vec<&str> {
    let mut lines = Vec::new();
    let mut rest = text;
    while !rest.is_empty() {
        match rest.find(|c: char| c == '\r' || c == '\n') {
            Some(end) => {
                lines.push(&rest[..end]);
                let terminator = if rest[end..].starts_with("\r\n") { 2 } else { 1 };
                rest = &rest[end + terminator..];
            }
            None => {
                lines.push(rest);
                break;
            }
        }
    }
    lines
}

/// Passes text through unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct Identity;

impl Transform for Identity {
    fn name(&self) -> &'static str {
        "identity"
    }

    fn apply(&self, text: &str) -> String {
        text.to_string()
    }
}

/// Configurable transform selection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransformPolicy {
    #[default]
    Uppercase,
    Identity,
}

impl TransformPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransformPolicy::Uppercase => "uppercase",
            TransformPolicy::Identity => "identity",
        }
    }

    pub fn build(&self) -> Arc<dyn Transform> {
        match self {
            TransformPolicy::Uppercase => Arc::new(UppercaseLines),
            TransformPolicy::Identity => Arc::new(Identity),
        }
    }
}

impl FromStr for TransformPolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "uppercase" => Ok(TransformPolicy::Uppercase),
            "identity" => Ok(TransformPolicy::Identity),
            other => Err(format!(
                "unknown transform '{}' (expected 'uppercase' or 'identity')",
                other
            )),
        }
    }
}

impl std::fmt::Display for TransformPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reads, decodes and transforms one unit.
#[derive(Clone)]
pub struct TransformStage {
    transform: Arc<dyn Transform>,
}

impl TransformStage {
    pub fn new(transform: Arc<dyn Transform>) -> Self {
        Self { transform }
    }

    pub fn process(&self, unit: &mut UnitOfWork, fs: &dyn Filesystem) -> Result<String> {
        let name = unit.name().to_string();
        let bytes = unit.load(fs).map_err(|e| FlowError::Transform {
            name: name.clone(),
            cause: TransformCause::Read(e),
        })?;
        let text = std::str::from_utf8(bytes).map_err(|e| FlowError::Transform {
            name,
            cause: TransformCause::Decode(e),
        })?;
        Ok(self.transform.apply(text))
    }
}

impl std::fmt::Debug for TransformStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransformStage")
            .field("transform", &self.transform.name())
            .finish()
    }
}
