use std::fmt;
use std::ops::AddAssign;
use std::path::Path;

use similar::{ChangeTag, TextDiff};

/// Line counts of one or more diffs.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DiffStats {
    pub files_changed: usize,
    pub lines_added: usize,
    pub lines_removed: usize,
}

impl DiffStats {
    pub fn is_empty(&self) -> bool {
        self.files_changed == 0
    }
}

impl AddAssign for DiffStats {
    fn add_assign(&mut self, other: DiffStats) {
        self.files_changed += other.files_changed;
        self.lines_added += other.lines_added;
        self.lines_removed += other.lines_removed;
    }
}

impl fmt::Display for DiffStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let plural = if self.files_changed == 1 { "" } else { "s" };
        write!(
            f,
            "{} file{plural} changed, {} insertions(+), {} deletions(-)",
            self.files_changed, self.lines_added, self.lines_removed
        )
    }
}

/// A unified diff of one file, before and after editing.
#[derive(Debug, Clone)]
pub struct FileDiff {
    pub text: String,
    pub stats: DiffStats,
}

impl FileDiff {
    /// Diff `original` against `modified`, with `context` unchanged lines
    /// around each hunk. An unchanged file yields an empty diff.
    pub fn new(path: &Path, original: &str, modified: &str, context: usize) -> Self {
        let diff = TextDiff::from_lines(original, modified);

        let mut stats = DiffStats::default();
        for change in diff.iter_all_changes() {
            match change.tag() {
                ChangeTag::Insert => stats.lines_added += 1,
                ChangeTag::Delete => stats.lines_removed += 1,
                ChangeTag::Equal => {}
            }
        }
        if stats.lines_added == 0 && stats.lines_removed == 0 {
            return Self {
                text: String::new(),
                stats,
            };
        }
        stats.files_changed = 1;

        let name = path.display().to_string();
        let text = diff
            .unified_diff()
            .context_radius(context)
            .header(&format!("a/{name}"), &format!("b/{name}"))
            .to_string();

        Self { text, stats }
    }
}
