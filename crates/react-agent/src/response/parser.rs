//! Two-stage response parsing
//!
//! Stage one is a strict XML reader; stage two an error-tolerant reader that
//! recovers from unbalanced tags and bare `&`. Both apply the same structural
//! rules, and each stage can be called on its own.

use std::collections::BTreeSet;

use thiserror::Error;
use tracing::debug;

use super::extract::extract_xml;
use super::interpret::{interpret, Lookup, ValidationError};
use super::strict::XmlSyntaxError;
use super::{lenient, strict, StructuredResponse};

/// Failure of a single parsing stage
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StageError {
    #[error(transparent)]
    Syntax(#[from] XmlSyntaxError),

    #[error(transparent)]
    Validation(#[from] ValidationError),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("no ```xml block or <response> element found in the reply")]
    NoStructuredContent,

    /// Both readers produced a tree but neither describes a valid turn
    #[error("invalid response: {strict}")]
    ValidationFailed {
        strict: ValidationError,
        lenient: ValidationError,
    },

    #[error("unparseable response (strict: {strict}; lenient: {lenient})")]
    Unparseable {
        strict: Box<StageError>,
        lenient: Box<StageError>,
    },
}

/// Parses model replies against the set of registered tool names
#[derive(Debug, Clone, Default)]
pub struct ResponseParser {
    tools: BTreeSet<String>,
}

impl ResponseParser {
    pub fn new<I, S>(tool_names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            tools: tool_names
                .into_iter()
                .map(|name| name.as_ref().to_uppercase())
                .collect(),
        }
    }

    /// Parse a raw model reply
    pub fn parse(&self, content: &str) -> Result<StructuredResponse, ParseError> {
        let xml = extract_xml(content).ok_or(ParseError::NoStructuredContent)?;

        let strict_error = match self.parse_strict(xml) {
            Ok(response) => return Ok(response),
            Err(e) => e,
        };
        debug!(error = %strict_error, "Strict parse failed, retrying leniently");

        match self.parse_lenient(xml) {
            Ok(response) => Ok(response),
            Err(lenient_error) => Err(match (strict_error, lenient_error) {
                (StageError::Validation(strict), StageError::Validation(lenient)) => {
                    debug!(strict = %strict, lenient = %lenient, "Both stages rejected the response");
                    ParseError::ValidationFailed { strict, lenient }
                }
                (strict, lenient) => ParseError::Unparseable {
                    strict: Box::new(strict),
                    lenient: Box::new(lenient),
                },
            }),
        }
    }

    /// Parse an extracted XML document with the strict reader only
    pub fn parse_strict(&self, xml: &str) -> Result<StructuredResponse, StageError> {
        let root = strict::parse(xml)?;
        Ok(interpret(&root, Lookup::Children, &self.tools)?)
    }

    /// Parse an extracted XML document with the error-tolerant reader only
    pub fn parse_lenient(&self, xml: &str) -> Result<StructuredResponse, StageError> {
        let root = lenient::parse(xml)?;
        Ok(interpret(&root, Lookup::Descendants, &self.tools)?)
    }
}
