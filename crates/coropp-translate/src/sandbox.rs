//! Include sandbox.
//!
//! With `-p <dir>` every transitively included (quoted) file must resolve to
//! a realpath under `<dir>`. Paths are rejected before resolution when they
//! contain parent-directory segments, shell metacharacters, whitespace, or
//! non-printable bytes. Angle-bracket includes name host toolchain headers
//! and are trusted.

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::lexer::{Tok, lex};

#[derive(Debug, Error)]
pub enum SandboxError {
    #[error("include of '{path}' escapes the sandbox")]
    Escapes { path: String },

    #[error("include path '{path}' contains a parent-directory segment")]
    ParentSegment { path: String },

    #[error("include path '{path}' contains a forbidden character")]
    ForbiddenCharacter { path: String },

    #[error("cannot resolve sandbox directory '{dir}': {source}")]
    BadRoot {
        dir: String,
        source: std::io::Error,
    },
}

const METACHARACTERS: &str = "\"$&'()*;<>?[\\]`{|}~";

/// Allow-listed realpath prefix.
#[derive(Debug, Clone)]
pub struct Sandbox {
    root: PathBuf,
}

impl Sandbox {
    pub fn new(dir: &Path) -> Result<Self, SandboxError> {
        let root = fs::canonicalize(dir).map_err(|source| SandboxError::BadRoot {
            dir: dir.display().to_string(),
            source,
        })?;
        Ok(Self { root })
    }

    /// Validate one include path as written in the source.
    pub fn check(&self, written: &str, resolved_from: &Path) -> Result<PathBuf, SandboxError> {
        check_characters(written)?;
        if Path::new(written)
            .components()
            .any(|c| matches!(c, std::path::Component::ParentDir))
        {
            return Err(SandboxError::ParentSegment {
                path: written.to_string(),
            });
        }

        let candidate = if Path::new(written).is_absolute() {
            PathBuf::from(written)
        } else {
            resolved_from.join(written)
        };

        // A file that cannot be resolved cannot be proven inside the
        // sandbox; treat it the same as an escape.
        let real = fs::canonicalize(&candidate).map_err(|_| SandboxError::Escapes {
            path: written.to_string(),
        })?;
        if !real.starts_with(&self.root) {
            return Err(SandboxError::Escapes {
                path: written.to_string(),
            });
        }
        Ok(real)
    }
}

fn check_characters(path: &str) -> Result<(), SandboxError> {
    let bad = path.chars().any(|c| {
        c.is_whitespace()
            || c.is_control()
            || !c.is_ascii()
            || METACHARACTERS.contains(c)
    });
    if bad {
        return Err(SandboxError::ForbiddenCharacter {
            path: path.to_string(),
        });
    }
    Ok(())
}

/// One include directive found in a source buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Include {
    pub path: String,
    pub quoted: bool,
    /// Byte offset of the directive in its file, for diagnostics.
    pub offset: usize,
}

/// Scan a buffer for `#include` directives.
pub fn find_includes(source: &str) -> Vec<Include> {
    let mut out = Vec::new();
    for tok in lex(source) {
        if tok.kind != Tok::Preproc {
            continue;
        }
        let line = tok.text(source);
        let Some(rest) = line.strip_prefix('#').map(str::trim_start) else {
            continue;
        };
        let Some(rest) = rest.strip_prefix("include").map(str::trim_start) else {
            continue;
        };
        if let Some(path) = delimited(rest, '"', '"') {
            out.push(Include {
                path: path.to_string(),
                quoted: true,
                offset: tok.span.start(),
            });
        } else if let Some(path) = delimited(rest, '<', '>') {
            out.push(Include {
                path: path.to_string(),
                quoted: false,
                offset: tok.span.start(),
            });
        }
    }
    out
}

fn delimited(s: &str, open: char, close: char) -> Option<&str> {
    let rest = s.strip_prefix(open)?;
    let end = rest.find(close)?;
    Some(&rest[..end])
}

/// Walk the quoted-include closure of the main file.
///
/// Every file entered is pushed to `entered` (the `-v` "file entered" log).
/// With a sandbox attached, each quoted include is validated; the first
/// violation aborts the walk.
pub fn scan_closure(
    main_source: &str,
    main_dir: &Path,
    sandbox: Option<&Sandbox>,
    entered: &mut Vec<PathBuf>,
) -> Result<(), SandboxError> {
    let mut visited: Vec<PathBuf> = Vec::new();
    scan_one(main_source, main_dir, sandbox, entered, &mut visited)
}

fn scan_one(
    source: &str,
    dir: &Path,
    sandbox: Option<&Sandbox>,
    entered: &mut Vec<PathBuf>,
    visited: &mut Vec<PathBuf>,
) -> Result<(), SandboxError> {
    for include in find_includes(source) {
        if !include.quoted {
            continue;
        }

        let resolved = match sandbox {
            Some(sb) => Some(sb.check(&include.path, dir)?),
            None => fs::canonicalize(dir.join(&include.path)).ok(),
        };

        let Some(real) = resolved else {
            // Unresolvable quoted include without a sandbox: the host
            // compiler will report it; nothing for us to scan.
            continue;
        };
        if visited.contains(&real) {
            continue;
        }
        visited.push(real.clone());
        entered.push(real.clone());

        if let Ok(text) = fs::read_to_string(&real) {
            let parent = real.parent().unwrap_or(dir).to_path_buf();
            scan_one(&text, &parent, sandbox, entered, visited)?;
        }
    }
    Ok(())
}
