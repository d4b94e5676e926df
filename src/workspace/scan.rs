use anyhow::{Context, Result};
use ignore::WalkBuilder;
use ignore::overrides::OverrideBuilder;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct LanguageSpec {
    pub name: &'static str,
    pub extensions: &'static [&'static str],
}

static LANGUAGE_SPECS: &[LanguageSpec] = &[
    LanguageSpec {
        name: "python",
        extensions: &["py", "pyi"],
    },
    LanguageSpec {
        name: "rust",
        extensions: &["rs"],
    },
    LanguageSpec {
        name: "javascript",
        extensions: &["js", "jsx", "mjs", "cjs"],
    },
    LanguageSpec {
        name: "typescript",
        extensions: &["ts", "mts", "cts"],
    },
    LanguageSpec {
        name: "tsx",
        extensions: &["tsx"],
    },
    LanguageSpec {
        name: "csharp",
        extensions: &["cs", "csx"],
    },
    LanguageSpec {
        name: "go",
        extensions: &["go"],
    },
    LanguageSpec {
        name: "lua",
        extensions: &["lua"],
    },
];

/// Dependency and build directories never worth indexing.
pub const DEFAULT_EXCLUDED_DIRS: &[&str] = &[
    "node_modules",
    "target",
    "dist",
    "build",
    "out",
    ".git",
    "vendor",
    "__pycache__",
    ".venv",
];

pub fn language_specs() -> &'static [LanguageSpec] {
    LANGUAGE_SPECS
}

pub fn language_for_path(path: &Path) -> Option<&'static str> {
    let ext = path.extension().and_then(|ext| ext.to_str())?;
    LANGUAGE_SPECS
        .iter()
        .find(|spec| spec.extensions.iter().any(|candidate| *candidate == ext))
        .map(|spec| spec.name)
}

pub fn default_extensions() -> Vec<String> {
    LANGUAGE_SPECS
        .iter()
        .flat_map(|spec| spec.extensions.iter().map(|ext| ext.to_string()))
        .collect()
}

pub fn include_globs(extensions: &[String]) -> Vec<String> {
    extensions
        .iter()
        .map(|ext| format!("**/*.{}", ext.trim_start_matches('.')))
        .collect()
}

pub fn default_exclude_globs() -> Vec<String> {
    DEFAULT_EXCLUDED_DIRS
        .iter()
        .map(|dir| format!("**/{dir}/**"))
        .collect()
}

/// True when any component of `rel_path` is an excluded directory.
pub fn in_excluded_dir(rel_path: &Path) -> bool {
    rel_path.components().any(|comp| {
        DEFAULT_EXCLUDED_DIRS
            .iter()
            .any(|dir| comp.as_os_str() == OsStr::new(dir))
    })
}

/// Walk `root` honouring .gitignore and return files matching any of
/// `include` and none of `exclude`, sorted by relative path.
pub fn scan_files(root: &Path, include: &[String], exclude: &[String]) -> Result<Vec<PathBuf>> {
    let mut overrides = OverrideBuilder::new(root);
    for glob in include {
        overrides
            .add(glob)
            .with_context(|| format!("include glob {glob}"))?;
    }
    for glob in exclude {
        overrides
            .add(&format!("!{glob}"))
            .with_context(|| format!("exclude glob {glob}"))?;
    }
    let overrides = overrides.build().context("build glob overrides")?;

    let walker = WalkBuilder::new(root)
        .hidden(false)
        .ignore(true)
        .git_ignore(true)
        .git_global(true)
        .git_exclude(true)
        .parents(true)
        .require_git(false)
        .overrides(overrides)
        .filter_entry(|entry| !is_ignored_entry(entry))
        .build();

    let mut files = Vec::new();
    for entry in walker {
        let entry = match entry {
            Ok(value) => value,
            Err(err) => {
                tracing::debug!("walk error: {err}");
                continue;
            }
        };
        if !entry.file_type().map(|ft| ft.is_file()).unwrap_or(false) {
            continue;
        }
        files.push(entry.into_path());
    }
    files.sort();
    Ok(files)
}

fn is_ignored_entry(entry: &ignore::DirEntry) -> bool {
    entry.depth() > 0
        && entry.file_type().map(|ft| ft.is_dir()).unwrap_or(false)
        && DEFAULT_EXCLUDED_DIRS
            .iter()
            .any(|dir| entry.file_name() == OsStr::new(dir))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_languages_by_extension() {
        assert_eq!(language_for_path(Path::new("a/b.rs")), Some("rust"));
        assert_eq!(language_for_path(Path::new("a/b.tsx")), Some("tsx"));
        assert_eq!(language_for_path(Path::new("a/b.md")), None);
    }

    #[test]
    fn scan_honours_globs_and_excluded_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        std::fs::create_dir_all(root.join("src")).unwrap();
        std::fs::create_dir_all(root.join("node_modules/pkg")).unwrap();
        std::fs::write(root.join("src/a.rs"), "fn a() {}").unwrap();
        std::fs::write(root.join("src/b.py"), "def b(): pass").unwrap();
        std::fs::write(root.join("src/notes.md"), "# notes").unwrap();
        std::fs::write(root.join("node_modules/pkg/index.js"), "function x() {}").unwrap();

        let include = include_globs(&default_extensions());
        let files = scan_files(root, &include, &default_exclude_globs()).unwrap();
        let rel: Vec<_> = files
            .iter()
            .map(|p| crate::util::normalize_rel_path(root, p).unwrap())
            .collect();
        assert_eq!(rel, vec!["src/a.rs", "src/b.py"]);

        let only_rust = scan_files(root, &include_globs(&["rs".to_string()]), &[]).unwrap();
        assert_eq!(only_rust.len(), 1);
    }

    #[test]
    fn excluded_dir_detection() {
        assert!(in_excluded_dir(Path::new("web/node_modules/x.js")));
        assert!(!in_excluded_dir(Path::new("src/targets.rs")));
    }
}
