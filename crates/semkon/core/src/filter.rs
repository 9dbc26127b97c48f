//! Eligible-file enumeration with inherited gitignore rules.
//!
//! Traversal is depth-first. Each directory sees the rule layers of its
//! ancestors plus the layer compiled from its own `.gitignore`; a layer added
//! for one subtree is never visible to siblings or parents. A directory that
//! is matched by the active rules is pruned together with its descendants.

use std::fs;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use ignore::gitignore::{Gitignore, GitignoreBuilder};
use ignore::Match;
use tracing::{debug, warn};

use crate::error::{SemkonError, SemkonResult};

/// Files of this size or larger are never scanned.
pub const MAX_FILE_SIZE_BYTES: u64 = 100 * 1024;

/// Patterns applied to every scan regardless of caller input.
pub const BUILTIN_PATTERNS: &[&str] = &["**/.git/"];

/// Name of the per-directory ignore file.
pub const IGNORE_FILE_NAME: &str = ".gitignore";

/// Permanent caller and built-in rules plus the nested `.gitignore` layers,
/// outermost first.
#[derive(Clone)]
pub struct IgnoreRuleSet {
    permanent: Arc<Gitignore>,
    layers: Vec<Arc<Gitignore>>,
}

impl std::fmt::Debug for IgnoreRuleSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IgnoreRuleSet")
            .field("permanent", &self.permanent.num_ignores())
            .field("layers", &self.layers.len())
            .field(
                "rules",
                &self.layers.iter().map(|l| l.num_ignores()).sum::<u64>(),
            )
            .finish()
    }
}

impl IgnoreRuleSet {
    fn new(permanent: Gitignore) -> Self {
        Self {
            permanent: Arc::new(permanent),
            layers: Vec::new(),
        }
    }

    /// A new rule set extended by `layer`. `self` is left untouched.
    fn with_layer(&self, layer: Gitignore) -> Self {
        let mut layers = self.layers.clone();
        layers.push(Arc::new(layer));
        Self {
            permanent: Arc::clone(&self.permanent),
            layers,
        }
    }

    /// A permanent match always excludes; `.gitignore` negations can only
    /// re-include what another `.gitignore` excluded. Among the nested
    /// layers the deepest one with an opinion decides, as git does.
    pub fn is_ignored(&self, path: &Path, is_dir: bool) -> bool {
        if self.permanent.matched(path, is_dir).is_ignore() {
            return true;
        }
        for layer in self.layers.iter().rev() {
            match layer.matched(path, is_dir) {
                Match::Ignore(_) => return true,
                Match::Whitelist(_) => return false,
                Match::None => {}
            }
        }
        false
    }
}

/// Enumerates the files of one scan root.
#[derive(Debug)]
pub struct FileFilter {
    root: PathBuf,
    base_rules: IgnoreRuleSet,
}

impl FileFilter {
    /// Compile caller patterns (relative to `root`) plus [`BUILTIN_PATTERNS`].
    pub fn new<S: AsRef<str>>(root: impl Into<PathBuf>, patterns: &[S]) -> SemkonResult<Self> {
        let root = root.into();
        let meta = fs::metadata(&root).map_err(|e| SemkonError::io(&root, e))?;
        if !meta.is_dir() {
            return Err(SemkonError::NotADirectory(root));
        }

        let mut all = patterns.iter().map(|p| p.as_ref()).collect::<Vec<&str>>();
        all.extend_from_slice(BUILTIN_PATTERNS);

        let mut builder = GitignoreBuilder::new(&root);
        for pattern in &all {
            builder
                .add_line(None, pattern)
                .map_err(|e| SemkonError::InvalidPattern {
                    pattern: pattern.to_string(),
                    reason: e.to_string(),
                })?;
        }
        let layer = builder.build().map_err(|e| SemkonError::InvalidPattern {
            pattern: all.join(", "),
            reason: e.to_string(),
        })?;

        Ok(Self {
            root,
            base_rules: IgnoreRuleSet::new(layer),
        })
    }

    /// All eligible files, relative to the root, sorted by path string.
    pub fn eligible_files(&self) -> SemkonResult<Vec<PathBuf>> {
        let mut found = Vec::new();
        self.visit(&self.root, &self.base_rules, &mut found)?;

        let mut relative = found
            .into_iter()
            .filter_map(|abs| abs.strip_prefix(&self.root).ok().map(Path::to_path_buf))
            .map(|rel| (path_key(&rel), rel))
            .collect::<Vec<_>>();
        relative.sort_by(|a, b| a.0.cmp(&b.0));

        debug!(root = %self.root.display(), files = relative.len(), "file filter finished");
        Ok(relative.into_iter().map(|(_, rel)| rel).collect())
    }

    fn visit(
        &self,
        dir: &Path,
        inherited: &IgnoreRuleSet,
        found: &mut Vec<PathBuf>,
    ) -> SemkonResult<()> {
        let rules = match load_ignore_layer(dir) {
            Some(layer) => inherited.with_layer(layer),
            None => inherited.clone(),
        };

        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) if dir == self.root => return Err(SemkonError::io(dir, e)),
            Err(e) => {
                warn!(dir = %dir.display(), error = %e, "skipping unreadable directory");
                return Ok(());
            }
        };

        let mut subdirs = Vec::new();
        for entry in entries {
            let Ok(entry) = entry else { continue };
            let path = entry.path();
            let Ok(file_type) = entry.file_type() else {
                continue;
            };

            if file_type.is_dir() {
                if rules.is_ignored(&path, true) {
                    debug!(dir = %path.display(), "pruned by ignore rules");
                } else {
                    subdirs.push(path);
                }
                continue;
            }

            // Symlinks to files are followed; symlinked directories are not.
            let Ok(meta) = fs::metadata(&path) else {
                continue;
            };
            if meta.is_file()
                && meta.len() < MAX_FILE_SIZE_BYTES
                && !rules.is_ignored(&path, false)
                && is_text_file(&path)
            {
                found.push(path);
            }
        }

        for sub in subdirs {
            self.visit(&sub, &rules, found)?;
        }
        Ok(())
    }
}

/// Convenience wrapper: filter `root` with `patterns`.
pub fn eligible_files<S: AsRef<str>>(root: &Path, patterns: &[S]) -> SemkonResult<Vec<PathBuf>> {
    FileFilter::new(root, patterns)?.eligible_files()
}

/// Whether the file reads as UTF-8. Read failures count as "not text".
pub fn is_text_file(path: &Path) -> bool {
    read_text(path).is_some()
}

/// File contents when the file is readable UTF-8.
pub fn read_text(path: &Path) -> Option<String> {
    let bytes = fs::read(path).ok()?;
    String::from_utf8(bytes).ok()
}

fn load_ignore_layer(dir: &Path) -> Option<Gitignore> {
    let path = dir.join(IGNORE_FILE_NAME);
    if !path.is_file() {
        return None;
    }
    let text = read_text(&path)?;

    let mut builder = GitignoreBuilder::new(dir);
    for line in text.lines() {
        if let Err(e) = builder.add_line(Some(path.clone()), line) {
            warn!(file = %path.display(), line, error = %e, "skipping invalid ignore pattern");
        }
    }
    match builder.build() {
        Ok(layer) => Some(layer),
        Err(e) => {
            warn!(file = %path.display(), error = %e, "ignoring unusable ignore file");
            None
        }
    }
}

/// Sort key: the relative path as a `/`-separated string.
fn path_key(rel: &Path) -> String {
    rel.components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}
