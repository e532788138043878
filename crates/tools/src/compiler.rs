//! Compiler directives and SPDX license-identifier normalization.

use serde::{Deserialize, Serialize};

const SPDX_TAG: &str = "SPDX-License-Identifier:";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizerSettings {
    pub enabled: bool,
    pub runs: u32,
}

impl Default for OptimizerSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            runs: 5000,
        }
    }
}

/// Solidity compiler version and optimizer directive
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompilerSettings {
    pub version: String,
    pub optimizer: OptimizerSettings,
}

impl Default for CompilerSettings {
    fn default() -> Self {
        Self {
            version: "0.8.1".to_string(),
            optimizer: OptimizerSettings::default(),
        }
    }
}

/// How license identifiers are treated when sources are compiled
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpdxSettings {
    pub overwrite: bool,
    pub run_on_compile: bool,
    pub license: String,
}

impl Default for SpdxSettings {
    fn default() -> Self {
        Self {
            overwrite: false,
            run_on_compile: true,
            license: "MIT".to_string(),
        }
    }
}

/// Result of normalizing one source file's license identifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LicenseEdit {
    Unchanged,
    Inserted(String),
    Replaced(String),
}

impl LicenseEdit {
    /// The new source text, if anything changed
    pub fn text(&self) -> Option<&str> {
        match self {
            LicenseEdit::Unchanged => None,
            LicenseEdit::Inserted(text) | LicenseEdit::Replaced(text) => Some(text),
        }
    }
}

/// Ensure `source` carries an SPDX identifier for `license`.
///
/// An identifier counts as present when the tag appears inside a line or
/// block comment, with or without a space after `//`. A missing identifier is
/// inserted as the first line. An existing one is kept unless `overwrite` is
/// set, in which case only its license expression is rewritten, preserving
/// the comment style.
pub fn apply_license_identifier(source: &str, license: &str, overwrite: bool) -> LicenseEdit {
    let existing = source.lines().position(is_license_line);

    match existing {
        None => {
            let newline = if source.contains("\r\n") { "\r\n" } else { "\n" };
            LicenseEdit::Inserted(format!("// {SPDX_TAG} {license}{newline}{source}"))
        }
        Some(_) if !overwrite => LicenseEdit::Unchanged,
        Some(index) => {
            let mut replaced = String::with_capacity(source.len());
            for (i, line) in source.split_inclusive('\n').enumerate() {
                if i == index {
                    replaced.push_str(&replace_license(line, license));
                } else {
                    replaced.push_str(line);
                }
            }
            if replaced == source {
                LicenseEdit::Unchanged
            } else {
                LicenseEdit::Replaced(replaced)
            }
        }
    }
}

fn is_license_line(line: &str) -> bool {
    let Some(tag) = line.find(SPDX_TAG) else {
        return false;
    };
    let before = &line[..tag];
    // continuation lines of a block comment start with `*`
    before.contains("//") || before.contains("/*") || line.trim_start().starts_with('*')
}

/// Swap the license expression after the tag, keeping whatever follows it
/// (a closing `*/`, the line ending).
fn replace_license(line: &str, license: &str) -> String {
    let Some(tag) = line.find(SPDX_TAG) else {
        return line.to_string();
    };
    let start = tag + SPDX_TAG.len();
    let tail = line[start..].trim_start_matches([' ', '\t']);
    let end = tail.find("*/").unwrap_or(tail.len());
    let expression = tail[..end].trim_end();
    format!("{} {license}{}", &line[..start], &tail[expression.len()..])
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONTRACT: &str = "pragma solidity ^0.8.1;\n\ncontract Contract {}\n";

    #[test]
    fn test_default_compiler_settings() {
        let settings = CompilerSettings::default();
        assert_eq!(settings.version, "0.8.1");
        assert!(settings.optimizer.enabled);
        assert_eq!(settings.optimizer.runs, 5000);
    }

    #[test]
    fn test_inserts_missing_identifier() {
        let edit = apply_license_identifier(CONTRACT, "MIT", false);
        assert_eq!(
            edit,
            LicenseEdit::Inserted(format!("// SPDX-License-Identifier: MIT\n{CONTRACT}"))
        );
    }

    #[test]
    fn test_keeps_existing_identifier_without_overwrite() {
        let source = format!("// SPDX-License-Identifier: GPL-3.0\n{CONTRACT}");
        assert_eq!(apply_license_identifier(&source, "MIT", false), LicenseEdit::Unchanged);
    }

    #[test]
    fn test_replaces_existing_identifier_with_overwrite() {
        let source = format!("// SPDX-License-Identifier: GPL-3.0\r\n{CONTRACT}");
        let edit = apply_license_identifier(&source, "MIT", true);
        assert_eq!(
            edit,
            LicenseEdit::Replaced(format!("// SPDX-License-Identifier: MIT\r\n{CONTRACT}"))
        );
    }

    #[test]
    fn test_overwrite_with_same_license_is_unchanged() {
        let source = format!("// SPDX-License-Identifier: MIT\n{CONTRACT}");
        assert_eq!(apply_license_identifier(&source, "MIT", true), LicenseEdit::Unchanged);
    }

    #[test]
    fn test_identifier_found_below_pragma() {
        let source = "pragma solidity ^0.8.1;\n// SPDX-License-Identifier: UNLICENSED\n";
        let edit = apply_license_identifier(source, "MIT", true);
        assert_eq!(
            edit.text(),
            Some("pragma solidity ^0.8.1;\n// SPDX-License-Identifier: MIT\n")
        );
    }

    #[test]
    fn test_identifier_without_space_after_slashes() {
        let source = "//SPDX-License-Identifier: GPL-3.0\npragma solidity 0.8.1;\n";
        assert_eq!(apply_license_identifier(source, "MIT", false), LicenseEdit::Unchanged);
        assert_eq!(
            apply_license_identifier(source, "MIT", true).text(),
            Some("//SPDX-License-Identifier: MIT\npragma solidity 0.8.1;\n")
        );
    }

    #[test]
    fn test_identifier_in_block_comment() {
        let source = format!("/* SPDX-License-Identifier: GPL-3.0 */\n{CONTRACT}");
        assert_eq!(apply_license_identifier(&source, "MIT", false), LicenseEdit::Unchanged);
        assert_eq!(
            apply_license_identifier(&source, "MIT", true),
            LicenseEdit::Replaced(format!("/* SPDX-License-Identifier: MIT */\n{CONTRACT}"))
        );
    }

    #[test]
    fn test_identifier_inside_multiline_block_comment() {
        let source = format!("/**\n * SPDX-License-Identifier: Apache-2.0\n */\n{CONTRACT}");
        assert_eq!(apply_license_identifier(&source, "MIT", false), LicenseEdit::Unchanged);
    }

    #[test]
    fn test_tag_outside_comment_is_not_an_identifier() {
        let source = "string constant TAG = \"SPDX-License-Identifier: MIT\";\n";
        assert!(matches!(
            apply_license_identifier(source, "MIT", false),
            LicenseEdit::Inserted(_)
        ));
    }

    #[test]
    fn test_inserts_into_empty_source() {
        let edit = apply_license_identifier("", "MIT", false);
        assert_eq!(edit.text(), Some("// SPDX-License-Identifier: MIT\n"));
    }
}
