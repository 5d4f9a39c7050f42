use canvas_sync::diff::{Edit, edit_script};
use canvas_sync::{Diff, DiffLine};
use canvas_sync_naive_oracle::{lcs_len, replay};
use proptest::collection::vec;
use proptest::prelude::*;

fn lines() -> impl Strategy<Value = Vec<&'static str>> {
    vec(prop::sample::select(vec!["# Tasks", "", "- [ ] A", "- [x] B", "C", "---"]), 0..40)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(proptest_config::cases()))]

    #[test]
    fn prop_edit_script_is_shortest(from in lines(), to in lines()) {
        let edits = edit_script(&from, &to);
        let kept = edits.iter().filter(|e| matches!(e, Edit::Equal { .. })).count();
        prop_assert_eq!(kept, lcs_len(&from, &to));
        prop_assert_eq!(replay(&edits, &from, &to), Some(to.clone()));
    }

    #[test]
    fn prop_hunks_cover_every_change(from in lines(), to in lines()) {
        let diff = Diff::between("from", "to", &from.join("\n"), &to.join("\n"));
        // `str::lines` drops a trailing empty line, so compare on what it sees.
        let from_text = from.join("\n");
        let to_text = to.join("\n");
        let from_lines: Vec<&str> = from_text.lines().collect();
        let to_lines: Vec<&str> = to_text.lines().collect();
        let changes = edit_script(&from_lines, &to_lines)
            .iter()
            .filter(|e| !matches!(e, Edit::Equal { .. }))
            .count();
        prop_assert_eq!(diff.added().count() + diff.removed().count(), changes);
        prop_assert_eq!(diff.is_empty(), from_lines == to_lines);

        for hunk in diff.hunks() {
            let from_len = hunk.lines.iter().filter(|l| !matches!(l, DiffLine::Added(_))).count();
            let to_len = hunk.lines.iter().filter(|l| !matches!(l, DiffLine::Removed(_))).count();
            prop_assert_eq!(hunk.from_len, from_len);
            prop_assert_eq!(hunk.to_len, to_len);
            prop_assert_eq!(&from_lines[hunk.from_start..hunk.from_start + from_len],
                &hunk.lines.iter().filter_map(|l| match l {
                    DiffLine::Context(t) | DiffLine::Removed(t) => Some(t.as_str()),
                    DiffLine::Added(_) => None,
                }).collect::<Vec<_>>()[..]);
        }
    }
}
