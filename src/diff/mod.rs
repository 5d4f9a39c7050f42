//! Unified line diff between two canonical texts.
//!
//! The edit script is Myers' shortest edit script; hunks carry three lines
//! of context and use the same range notation as `diff -u`.

use std::fmt;
use std::ops::Range;

const CONTEXT: usize = 3;

/// One step of an edit script, indexing into the `from` and `to` lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edit {
    Equal { from: usize, to: usize },
    Delete { from: usize },
    Insert { to: usize },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiffLine {
    Context(String),
    Removed(String),
    Added(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hunk {
    /// Zero-based index of the first `from` line in the hunk.
    pub from_start: usize,
    pub from_len: usize,
    pub to_start: usize,
    pub to_len: usize,
    pub lines: Vec<DiffLine>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diff {
    pub from_label: String,
    pub to_label: String,
    hunks: Vec<Hunk>,
}

impl Diff {
    /// Diffs `from` against `to` line by line.
    pub fn between(
        from_label: impl Into<String>,
        to_label: impl Into<String>,
        from: &str,
        to: &str,
    ) -> Self {
        let from_lines: Vec<&str> = from.lines().collect();
        let to_lines: Vec<&str> = to.lines().collect();
        let edits = edit_script(&from_lines, &to_lines);
        let positions = line_positions(&edits);
        let hunks = group_hunks(&edits)
            .into_iter()
            .map(|range| {
                let start = positions[range.start];
                build_hunk(&edits[range], start, &from_lines, &to_lines)
            })
            .collect();

        Self {
            from_label: from_label.into(),
            to_label: to_label.into(),
            hunks,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.hunks.is_empty()
    }

    pub fn hunks(&self) -> &[Hunk] {
        &self.hunks
    }

    pub fn added(&self) -> impl Iterator<Item = &str> + '_ {
        self.hunks.iter().flat_map(|hunk| {
            hunk.lines.iter().filter_map(|line| match line {
                DiffLine::Added(text) => Some(text.as_str()),
                _ => None,
            })
        })
    }

    pub fn removed(&self) -> impl Iterator<Item = &str> + '_ {
        self.hunks.iter().flat_map(|hunk| {
            hunk.lines.iter().filter_map(|line| match line {
                DiffLine::Removed(text) => Some(text.as_str()),
                _ => None,
            })
        })
    }
}

impl fmt::Display for Diff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.hunks.is_empty() {
            return Ok(());
        }
        writeln!(f, "--- {}", self.from_label)?;
        writeln!(f, "+++ {}", self.to_label)?;
        for hunk in &self.hunks {
            writeln!(
                f,
                "@@ -{} +{} @@",
                format_range(hunk.from_start, hunk.from_len),
                format_range(hunk.to_start, hunk.to_len)
            )?;
            for line in &hunk.lines {
                match line {
                    DiffLine::Context(text) => writeln!(f, " {text}")?,
                    DiffLine::Removed(text) => writeln!(f, "-{text}")?,
                    DiffLine::Added(text) => writeln!(f, "+{text}")?,
                }
            }
        }
        Ok(())
    }
}

fn format_range(start: usize, len: usize) -> String {
    match len {
        0 => format!("{start},0"),
        1 => format!("{}", start + 1),
        _ => format!("{},{len}", start + 1),
    }
}

/// Shortest edit script turning `from` into `to`.
pub fn edit_script(from: &[&str], to: &[&str]) -> Vec<Edit> {
    let prefix = from.iter().zip(to).take_while(|(a, b)| a == b).count();
    let suffix = from[prefix..]
        .iter()
        .rev()
        .zip(to[prefix..].iter().rev())
        .take_while(|(a, b)| a == b)
        .count();
    let (from_end, to_end) = (from.len() - suffix, to.len() - suffix);

    let mut edits = Vec::with_capacity(from.len().max(to.len()));
    edits.extend((0..prefix).map(|i| Edit::Equal { from: i, to: i }));
    edits.extend(
        middle_script(&from[prefix..from_end], &to[prefix..to_end])
            .into_iter()
            .map(|edit| edit.shifted(prefix)),
    );
    edits.extend((0..suffix).map(|i| Edit::Equal {
        from: from_end + i,
        to: to_end + i,
    }));
    edits
}

impl Edit {
    fn shifted(self, by: usize) -> Self {
        match self {
            Edit::Equal { from, to } => Edit::Equal {
                from: from + by,
                to: to + by,
            },
            Edit::Delete { from } => Edit::Delete { from: from + by },
            Edit::Insert { to } => Edit::Insert { to: to + by },
        }
    }
}

/// Myers' greedy search. Each step keeps only the diagonals it can reach,
/// so the trace holds `O(D^2)` entries for an edit distance of `D`.
fn middle_script(from: &[&str], to: &[&str]) -> Vec<Edit> {
    if from.is_empty() {
        return (0..to.len()).map(|to| Edit::Insert { to }).collect();
    }
    if to.is_empty() {
        return (0..from.len()).map(|from| Edit::Delete { from }).collect();
    }

    let n = from.len() as isize;
    let m = to.len() as isize;
    let max = n + m;
    let diagonal = |k: isize| (k + max) as usize;

    let mut frontier = vec![0isize; 2 * max as usize + 2];
    // trace[d] holds diagonals -d..=d+1 as they stood before step d.
    let mut trace: Vec<Vec<isize>> = Vec::new();

    'search: for d in 0..=max {
        trace.push(frontier[diagonal(-d)..=diagonal(d + 1)].to_vec());
        let mut k = -d;
        while k <= d {
            let down = k == -d || (k != d && frontier[diagonal(k - 1)] < frontier[diagonal(k + 1)]);
            let mut x = if down {
                frontier[diagonal(k + 1)]
            } else {
                frontier[diagonal(k - 1)] + 1
            };
            let mut y = x - k;
            while x < n && y < m && from[x as usize] == to[y as usize] {
                x += 1;
                y += 1;
            }
            frontier[diagonal(k)] = x;
            if x >= n && y >= m {
                break 'search;
            }
            k += 2;
        }
    }

    let mut edits = Vec::with_capacity(n.max(m) as usize);
    let (mut x, mut y) = (n, m);
    for (d, window) in trace.iter().enumerate().rev() {
        let d = d as isize;
        let at = |k: isize| window[(k + d) as usize];
        let k = x - y;
        let down = k == -d || (k != d && at(k - 1) < at(k + 1));
        let prev_k = if down { k + 1 } else { k - 1 };
        let prev_x = at(prev_k);
        let prev_y = prev_x - prev_k;

        while x > prev_x && y > prev_y {
            x -= 1;
            y -= 1;
            edits.push(Edit::Equal {
                from: x as usize,
                to: y as usize,
            });
        }
        if d > 0 {
            if x == prev_x {
                edits.push(Edit::Insert {
                    to: (y - 1) as usize,
                });
            } else {
                edits.push(Edit::Delete {
                    from: (x - 1) as usize,
                });
            }
        }
        x = prev_x;
        y = prev_y;
    }

    edits.reverse();
    edits
}

fn group_hunks(edits: &[Edit]) -> Vec<Range<usize>> {
    let changes: Vec<usize> = edits
        .iter()
        .enumerate()
        .filter(|(_, edit)| !matches!(edit, Edit::Equal { .. }))
        .map(|(index, _)| index)
        .collect();
    let Some((&first, rest)) = changes.split_first() else {
        return Vec::new();
    };

    let mut groups = Vec::new();
    let mut start = first.saturating_sub(CONTEXT);
    let mut end = first + 1;
    for &index in rest {
        if index - end > 2 * CONTEXT {
            groups.push(start..(end + CONTEXT).min(edits.len()));
            start = index - CONTEXT;
        }
        end = index + 1;
    }
    groups.push(start..(end + CONTEXT).min(edits.len()));
    groups
}

/// Number of `from` and `to` lines consumed before each edit.
fn line_positions(edits: &[Edit]) -> Vec<(usize, usize)> {
    let mut positions = Vec::with_capacity(edits.len() + 1);
    let (mut from, mut to) = (0, 0);
    for edit in edits {
        positions.push((from, to));
        match edit {
            Edit::Equal { .. } => {
                from += 1;
                to += 1;
            }
            Edit::Delete { .. } => from += 1,
            Edit::Insert { .. } => to += 1,
        }
    }
    positions.push((from, to));
    positions
}

fn build_hunk(edits: &[Edit], start: (usize, usize), from: &[&str], to: &[&str]) -> Hunk {
    let mut hunk = Hunk {
        from_start: start.0,
        from_len: 0,
        to_start: start.1,
        to_len: 0,
        lines: Vec::with_capacity(edits.len()),
    };

    for edit in edits {
        match *edit {
            Edit::Equal { from: f, .. } => {
                hunk.from_len += 1;
                hunk.to_len += 1;
                hunk.lines.push(DiffLine::Context(from[f].to_string()));
            }
            Edit::Delete { from: f } => {
                hunk.from_len += 1;
                hunk.lines.push(DiffLine::Removed(from[f].to_string()));
            }
            Edit::Insert { to: t } => {
                hunk.to_len += 1;
                hunk.lines.push(DiffLine::Added(to[t].to_string()));
            }
        }
    }
    hunk
}

#[cfg(test)]
mod tests {
    use super::*;

    fn apply(edits: &[Edit], from: &[&str], to: &[&str]) -> Vec<String> {
        edits
            .iter()
            .filter_map(|edit| match *edit {
                Edit::Equal { from: f, .. } => Some(from[f].to_string()),
                Edit::Insert { to: t } => Some(to[t].to_string()),
                Edit::Delete { .. } => None,
            })
            .collect()
    }

    #[test]
    fn test_identical_texts_have_no_hunks() {
        let diff = Diff::between("a", "b", "x\ny", "x\ny");
        assert!(diff.is_empty());
        assert_eq!(diff.to_string(), "");
    }

    #[test]
    fn test_single_added_line() {
        let diff = Diff::between(
            "canvas",
            "local",
            "# Tasks\n- [ ] A",
            "# Tasks\n- [ ] A\n- [ ] B",
        );
        assert_eq!(diff.added().collect::<Vec<_>>(), vec!["- [ ] B"]);
        assert_eq!(diff.removed().count(), 0);
        assert_eq!(
            diff.to_string(),
            "--- canvas\n+++ local\n@@ -1,2 +1,3 @@\n # Tasks\n - [ ] A\n+- [ ] B\n"
        );
    }

    #[test]
    fn test_replace_in_the_middle() {
        let diff = Diff::between("a", "b", "1\n2\n3", "1\nX\n3");
        assert_eq!(
            diff.to_string(),
            "--- a\n+++ b\n@@ -1,3 +1,3 @@\n 1\n-2\n+X\n 3\n"
        );
    }

    #[test]
    fn test_from_empty_uses_zero_length_range() {
        let diff = Diff::between("a", "b", "", "only");
        assert_eq!(diff.to_string(), "--- a\n+++ b\n@@ -0,0 +1 @@\n+only\n");
    }

    #[test]
    fn test_to_empty_uses_zero_length_range() {
        let diff = Diff::between("a", "b", "x\ny", "");
        assert_eq!(diff.to_string(), "--- a\n+++ b\n@@ -1,2 +0,0 @@\n-x\n-y\n");
    }

    #[test]
    fn test_distant_changes_split_into_hunks() {
        let from: Vec<String> = (1..=20).map(|i| i.to_string()).collect();
        let mut to = from.clone();
        to[1] = "two".into();
        to[17] = "eighteen".into();
        let diff = Diff::between("a", "b", &from.join("\n"), &to.join("\n"));
        assert_eq!(diff.hunks().len(), 2);
        let first = &diff.hunks()[0];
        assert_eq!((first.from_start, first.from_len), (0, 5));
        let second = &diff.hunks()[1];
        assert_eq!((second.from_start, second.from_len), (14, 6));
        assert!(diff.to_string().contains("@@ -15,6 +15,6 @@"));
    }

    #[test]
    fn test_nearby_changes_merge_into_one_hunk() {
        let from: Vec<String> = (1..=12).map(|i| i.to_string()).collect();
        let mut to = from.clone();
        to[2] = "c".into();
        to[8] = "i".into();
        let diff = Diff::between("a", "b", &from.join("\n"), &to.join("\n"));
        assert_eq!(diff.hunks().len(), 1);
    }

    #[test]
    fn test_insert_into_middle_of_empty_side_range() {
        let diff = Diff::between("a", "b", "1\n2\n3\n4\n5\n6\n7\n8", "1\n2\n3\n4\n4.5\n5\n6\n7\n8");
        assert_eq!(
            diff.to_string(),
            "--- a\n+++ b\n@@ -2,6 +2,7 @@\n 2\n 3\n 4\n+4.5\n 5\n 6\n 7\n"
        );
    }

    #[test]
    fn test_edit_script_reproduces_target() {
        let from = ["a", "b", "c", "a", "b", "b", "a"];
        let to = ["c", "b", "a", "b", "a", "c"];
        let edits = edit_script(&from, &to);
        assert_eq!(apply(&edits, &from, &to), to.to_vec());
        let kept = edits
            .iter()
            .filter(|e| matches!(e, Edit::Equal { .. }))
            .count();
        assert_eq!(kept, 4);
    }

    #[test]
    fn test_one_sided_large_input_is_linear() {
        let lines: Vec<String> = (0..20_000).map(|i| format!("- [ ] task {i}")).collect();
        let lines: Vec<&str> = lines.iter().map(String::as_str).collect();

        let deletes = edit_script(&lines, &[]);
        assert_eq!(deletes.len(), lines.len());
        assert_eq!(deletes[19_999], Edit::Delete { from: 19_999 });

        let diff = Diff::between("a", "b", "", &lines.join("\n"));
        assert_eq!(diff.hunks().len(), 1);
        assert_eq!(diff.added().count(), 20_000);
    }

    #[test]
    fn test_shared_prefix_and_suffix_are_kept() {
        let from: Vec<String> = (0..10_000).map(|i| i.to_string()).collect();
        let mut to = from.clone();
        to[5_000] = "changed".into();
        let from: Vec<&str> = from.iter().map(String::as_str).collect();
        let to: Vec<&str> = to.iter().map(String::as_str).collect();

        let edits = edit_script(&from, &to);
        assert_eq!(edits.len(), 10_001);
        assert_eq!(edits[5_000], Edit::Delete { from: 5_000 });
        assert_eq!(edits[5_001], Edit::Insert { to: 5_000 });
        assert_eq!(edits[10_000], Edit::Equal { from: 9_999, to: 9_999 });
        assert_eq!(apply(&edits, &from, &to), to);
    }

    #[test]
    fn test_edit_script_of_empty_inputs() {
        assert!(edit_script(&[], &[]).is_empty());
        assert_eq!(edit_script(&[], &["x"]), vec![Edit::Insert { to: 0 }]);
        assert_eq!(edit_script(&["x"], &[]), vec![Edit::Delete { from: 0 }]);
    }
}
