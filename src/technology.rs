//! Supported-Technology Table — a process-wide constant mapping rows of
//! `(language, extension, technology tag, parser kind)`.
//!
//! Used both to filter endpoints by their reported technology tag and to
//! select the extension/parser pair for a given language.

use crate::error::{AioptimError, Result};

/// A source language with a concrete [`SourceParser`](crate::parser::SourceParser).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Language {
    Python,
    Java,
}

/// One row of the supported-technology table.
#[derive(Debug, Clone, Copy)]
pub struct TechnologyRow {
    pub language: Language,
    pub extension: &'static str,
    pub technology: &'static str,
}

/// Process-wide, immutable. Order matters only for readability — lookups
/// are by value, not position.
pub const TABLE: &[TechnologyRow] = &[
    TechnologyRow {
        language: Language::Python,
        extension: "py",
        technology: "pythonRuntimePlatform",
    },
    TechnologyRow {
        language: Language::Java,
        extension: "java",
        technology: "springbootApplicationContainer",
    },
];

/// All technology tags in the table, in table order. Used by
/// `EndpointSource::filter` as the default allowlist.
pub fn all_technologies() -> Vec<&'static str> {
    TABLE.iter().map(|row| row.technology).collect()
}

/// Look up the row whose `technology` tag matches.
pub fn row_for_technology(technology: &str) -> Result<&'static TechnologyRow> {
    TABLE
        .iter()
        .find(|row| row.technology == technology)
        .ok_or_else(|| {
            AioptimError::Other(format!(
                "could not find technology '{technology}' in the supported-technology table"
            ))
        })
}

/// Look up the row for a given language.
pub fn row_for_language(language: Language) -> &'static TechnologyRow {
    TABLE
        .iter()
        .find(|row| row.language == language)
        .expect("every Language variant has a table row")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_technologies_lists_both_rows() {
        let techs = all_technologies();
        assert_eq!(techs, vec!["pythonRuntimePlatform", "springbootApplicationContainer"]);
    }

    #[test]
    fn row_for_technology_resolves_python() {
        let row = row_for_technology("pythonRuntimePlatform").unwrap();
        assert_eq!(row.language, Language::Python);
        assert_eq!(row.extension, "py");
    }

    #[test]
    fn row_for_technology_rejects_unknown() {
        assert!(row_for_technology("dotnetRuntime").is_err());
    }

    #[test]
    fn row_for_language_resolves_java() {
        let row = row_for_language(Language::Java);
        assert_eq!(row.technology, "springbootApplicationContainer");
    }
}
