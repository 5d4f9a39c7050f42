//! A naive, simple oracle implementation for differential testing.
use canvas_sync::diff::Edit;

/// Length of the longest common subsequence of two line sequences, by the
/// full quadratic table.
pub fn lcs_len(from: &[&str], to: &[&str]) -> usize {
    let mut table = vec![vec![0usize; to.len() + 1]; from.len() + 1];
    for i in (0..from.len()).rev() {
        for j in (0..to.len()).rev() {
            table[i][j] = if from[i] == to[j] {
                table[i + 1][j + 1] + 1
            } else {
                table[i + 1][j].max(table[i][j + 1])
            };
        }
    }
    table[0][0]
}

/// Replays an edit script against `from` and returns the resulting lines,
/// or `None` if the script is inconsistent with either side.
pub fn replay<'a>(edits: &[Edit], from: &[&'a str], to: &[&'a str]) -> Option<Vec<&'a str>> {
    let mut output = Vec::new();
    let mut next_from = 0;
    let mut next_to = 0;
    for edit in edits {
        match *edit {
            Edit::Equal { from: i, to: j } => {
                if i != next_from || j != next_to || from.get(i)? != to.get(j)? {
                    return None;
                }
                output.push(from[i]);
                next_from += 1;
                next_to += 1;
            }
            Edit::Delete { from: i } => {
                if i != next_from || i >= from.len() {
                    return None;
                }
                next_from += 1;
            }
            Edit::Insert { to: j } => {
                if j != next_to {
                    return None;
                }
                output.push(*to.get(j)?);
                next_to += 1;
            }
        }
    }
    (next_from == from.len() && next_to == to.len()).then_some(output)
}
