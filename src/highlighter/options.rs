use serde::Deserialize;

use crate::{
    errors::errors::{Error, ErrorImpl},
    Position,
};

/// Highlighter-wide configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Options {
    /// Prepended to every scope's CSS class in HTML output.
    pub class_prefix: String,
    /// Candidate languages for auto-detection; all registered languages
    /// when unset.
    pub languages: Option<Vec<String>>,
    /// When set, malformed input never fails a highlight run: illegal
    /// lexemes produce an `illegal` result and unexpected failures a
    /// degraded one. When unset (debug mode) both are returned as errors.
    pub safe_mode: bool,
    /// How many occurrences of the same keyword count towards relevance in
    /// one run.
    pub max_keyword_hits: usize,
    /// Iterations a run may take before the loop guard looks at progress.
    pub loop_iteration_floor: usize,
    /// Past the floor, a run is aborted once its iteration count exceeds
    /// this many times the offset of the current match.
    pub loop_iteration_ratio: usize,
}

impl Default for Options {
    fn default() -> Self {
        Options {
            class_prefix: String::from("hljs-"),
            languages: None,
            safe_mode: true,
            max_keyword_hits: 7,
            loop_iteration_floor: 100_000,
            loop_iteration_ratio: 3,
        }
    }
}

impl Options {
    pub fn from_json(source: &str) -> Result<Options, Error> {
        serde_json::from_str(source).map_err(|err| {
            Error::new(
                ErrorImpl::InvalidOptions {
                    message: err.to_string(),
                },
                Position::null(),
            )
        })
    }
}
