//! Loads the game catalog from a TOML file.
//!
//! ```toml
//! [[games]]
//! id = "neon-snake"
//! title = "NEON SNAKE"
//! description = "..."
//! thumbnail = "https://..."
//! category = "Arcade"
//! tags = ["snake"]
//! program_file = "games/neon-snake.html"   # or `program = "..."` or `url = "https://..."`
//! ```

use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use arcadia_core::catalog::{Catalog, CatalogError, Category, GameDescriptor, GameSource};
use arcadia_core::settings::with_settings_listener;

#[derive(Debug, Error)]
pub enum CatalogLoadError {
    #[error("failed to read catalog {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse catalog: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("game `{id}` must set exactly one of `url`, `program`, `program_file`")]
    AmbiguousSource { id: String },
    #[error("game `{id}`: failed to read program file {path}: {source}")]
    ProgramFile {
        id: String,
        path: PathBuf,
        source: std::io::Error,
    },
    #[error(transparent)]
    Invalid(#[from] CatalogError),
}

#[derive(Debug, Deserialize)]
struct CatalogFile {
    #[serde(default)]
    games: Vec<CatalogEntry>,
}

#[derive(Debug, Deserialize)]
struct CatalogEntry {
    id: String,
    title: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    thumbnail: String,
    category: Category,
    #[serde(default)]
    tags: Vec<String>,
    url: Option<String>,
    program: Option<String>,
    program_file: Option<PathBuf>,
}

/// Read the catalog at `path`. A missing file yields an empty catalog.
///
/// With `inject_listener`, embedded programs get the settings listener script.
pub fn load_catalog(path: &Path, inject_listener: bool) -> Result<Catalog, CatalogLoadError> {
    let text = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::warn!(path = %path.display(), "Catalog file not found, starting with no games");
            return Ok(Catalog::empty());
        },
        Err(source) => {
            return Err(CatalogLoadError::Read {
                path: path.to_path_buf(),
                source,
            });
        },
    };
    let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
    let catalog = parse_catalog(&text, base_dir, inject_listener)?;
    tracing::info!(path = %path.display(), games = catalog.len(), "Loaded catalog");
    Ok(catalog)
}

/// Parse catalog TOML. `program_file` paths resolve against `base_dir`.
pub fn parse_catalog(
    text: &str,
    base_dir: &Path,
    inject_listener: bool,
) -> Result<Catalog, CatalogLoadError> {
    let file: CatalogFile = toml::from_str(text)?;
    let games = file
        .games
        .into_iter()
        .map(|entry| entry.into_descriptor(base_dir, inject_listener))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Catalog::new(games)?)
}

impl CatalogEntry {
    fn into_descriptor(
        self,
        base_dir: &Path,
        inject_listener: bool,
    ) -> Result<GameDescriptor, CatalogLoadError> {
        let source = match (self.url, self.program, self.program_file) {
            (Some(url), None, None) => GameSource::ExternalUrl(url),
            (None, Some(program), None) => embedded(&program, inject_listener),
            (None, None, Some(file)) => {
                let path = base_dir.join(file);
                let program = std::fs::read_to_string(&path).map_err(|source| {
                    CatalogLoadError::ProgramFile {
                        id: self.id.clone(),
                        path,
                        source,
                    }
                })?;
                embedded(&program, inject_listener)
            },
            _ => return Err(CatalogLoadError::AmbiguousSource { id: self.id }),
        };
        Ok(GameDescriptor {
            id: self.id,
            title: self.title,
            description: self.description,
            thumbnail: self.thumbnail,
            category: self.category,
            tags: self.tags,
            source,
        })
    }
}

fn embedded(program: &str, inject_listener: bool) -> GameSource {
    if inject_listener {
        GameSource::embedded(with_settings_listener(program))
    } else {
        GameSource::embedded(program)
    }
}

#[cfg(test)]
mod tests {
    use arcadia_core::settings::LISTENER_SCRIPT;

    use super::*;

    const SAMPLE: &str = r#"
[[games]]
id = "remote"
title = "REMOTE"
category = "Classic"
url = "https://example.com/play"

[[games]]
id = "inline"
title = "INLINE"
category = "Arcade"
tags = ["neon"]
program = "<html><body><canvas></canvas></body></html>"

[[games]]
id = "blank"
title = "BLANK"
category = "Classic"
program = ""
"#;

    #[test]
    fn parses_all_source_kinds() {
        let catalog = parse_catalog(SAMPLE, Path::new("."), true).unwrap();
        assert_eq!(catalog.len(), 3);
        assert_eq!(
            catalog.get("remote").unwrap().source,
            GameSource::ExternalUrl("https://example.com/play".to_string())
        );
        let inline = catalog.get("inline").unwrap();
        assert_eq!(inline.tags, vec!["neon"]);
        match &inline.source {
            GameSource::EmbeddedProgram(p) => {
                assert!(p.contains(LISTENER_SCRIPT));
                assert!(p.ends_with("</body></html>"));
            },
            other => panic!("expected embedded program, got {other:?}"),
        }
        assert_eq!(
            catalog.get("blank").unwrap().source,
            GameSource::EmbeddedProgram(String::new())
        );
    }

    #[test]
    fn injection_can_be_disabled() {
        let catalog = parse_catalog(SAMPLE, Path::new("."), false).unwrap();
        assert_eq!(
            catalog.get("inline").unwrap().source,
            GameSource::embedded("<html><body><canvas></canvas></body></html>")
        );
    }

    #[test]
    fn rejects_multiple_sources() {
        let text = r#"
[[games]]
id = "both"
title = "BOTH"
category = "Action"
url = "https://example.com"
program = "<p></p>"
"#;
        let err = parse_catalog(text, Path::new("."), true).unwrap_err();
        assert!(matches!(err, CatalogLoadError::AmbiguousSource { id } if id == "both"));
    }

    #[test]
    fn rejects_missing_source() {
        let text = r#"
[[games]]
id = "none"
title = "NONE"
category = "Action"
"#;
        assert!(matches!(
            parse_catalog(text, Path::new("."), true),
            Err(CatalogLoadError::AmbiguousSource { .. })
        ));
    }

    #[test]
    fn rejects_script_urls() {
        let text = r#"
[[games]]
id = "evil"
title = "EVIL"
category = "Classic"
url = "javascript:alert(1)"
"#;
        assert!(matches!(
            parse_catalog(text, Path::new("."), true),
            Err(CatalogLoadError::Invalid(CatalogError::InvalidSource { .. }))
        ));
    }

    #[test]
    fn reads_program_files_relative_to_catalog() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("games")).unwrap();
        std::fs::write(
            dir.path().join("games/snake.html"),
            "<html><body>snake</body></html>",
        )
        .unwrap();
        let catalog_path = dir.path().join("catalog.toml");
        std::fs::write(
            &catalog_path,
            r#"
[[games]]
id = "snake"
title = "SNAKE"
category = "Arcade"
program_file = "games/snake.html"
"#,
        )
        .unwrap();

        let catalog = load_catalog(&catalog_path, false).unwrap();
        assert_eq!(
            catalog.get("snake").unwrap().source,
            GameSource::embedded("<html><body>snake</body></html>")
        );
    }

    #[test]
    fn missing_program_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let text = r#"
[[games]]
id = "ghost"
title = "GHOST"
category = "Arcade"
program_file = "nope.html"
"#;
        assert!(matches!(
            parse_catalog(text, dir.path(), true),
            Err(CatalogLoadError::ProgramFile { .. })
        ));
    }

    #[test]
    fn shipped_catalog_loads() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../catalog/catalog.toml");
        let catalog = load_catalog(&path, true).unwrap();
        assert_eq!(catalog.len(), 5);
        assert!(catalog.get("hextris").is_some_and(|g| !g.source.is_embedded()));
        assert_eq!(
            catalog.get("legacy-proxy").unwrap().source,
            GameSource::embedded("")
        );
    }

    #[test]
    fn missing_catalog_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let catalog = load_catalog(&dir.path().join("absent.toml"), true).unwrap();
        assert!(catalog.is_empty());
    }
}
