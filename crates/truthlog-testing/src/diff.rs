//! Rendering of `-want +got` diffs for mismatch reports.
//!
//! Two shapes are produced. A single-line mismatch renders as:
//!
//! ```text
//!   string(
//! -    `info  {"msg":"want"}`,
//! +    `info  {"msg":"got"}`,
//!   )
//! ```
//!
//! A list mismatch renders every element, marking those only on one side.
//! Very large differing regions are listed without alignment:
//!
//! ```text
//!   []string{
//! -    `a`,
//!      `b`,
//! +    `c`,
//!   }
//! ```
//!
//! Strings containing `"` are raw-quoted with backticks when possible,
//! otherwise JSON-escaped.

/// Quote `s` for display in a diff.
pub fn quote(s: &str) -> String {
    if s.contains('"') && can_backquote(s) {
        return format!("`{s}`");
    }
    serde_json::to_string(s).unwrap_or_else(|_| format!("{s:?}"))
}

fn can_backquote(s: &str) -> bool {
    !s.chars()
        .any(|c| c == '`' || c == '\u{feff}' || (c.is_control() && c != '\t'))
}

/// Diff of two single strings. Callers only use this when they differ.
pub fn string_diff(want: &str, got: &str) -> String {
    format!(
        "  string(\n- \t{},\n+ \t{},\n  )",
        quote(want),
        quote(got)
    )
}

/// Line-level diff of two lists, based on their longest common subsequence.
pub fn lines_diff(want: &[String], got: &[String]) -> String {
    let mut out = String::from("  []string{\n");
    for op in diff_ops(want, got) {
        let (marker, text) = match op {
            DiffOp::Equal(s) => (' ', s),
            DiffOp::Delete(s) => ('-', s),
            DiffOp::Insert(s) => ('+', s),
        };
        out.push(marker);
        out.push_str(" \t");
        out.push_str(&quote(text));
        out.push_str(",\n");
    }
    out.push_str("  }");
    out
}

/// One step of an edit script.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DiffOp<'a> {
    /// Present in both lists.
    Equal(&'a str),
    /// Only in `want`.
    Delete(&'a str),
    /// Only in `got`.
    Insert(&'a str),
}

/// Largest LCS table [`diff_ops`] builds, in cells.
pub const MAX_LCS_CELLS: usize = 1 << 22;

/// Edit script turning `want` into `got`. Deletions precede insertions
/// within a changed run.
///
/// The common prefix and suffix are matched directly. If the differing
/// middle would need more than [`MAX_LCS_CELLS`] table cells, it is listed
/// as all of its deletions followed by all of its insertions.
pub fn diff_ops<'a>(want: &'a [String], got: &'a [String]) -> Vec<DiffOp<'a>> {
    let prefix = want.iter().zip(got).take_while(|(w, g)| w == g).count();
    let suffix = want[prefix..]
        .iter()
        .rev()
        .zip(got[prefix..].iter().rev())
        .take_while(|(w, g)| w == g)
        .count();

    let mut ops = Vec::with_capacity(want.len().max(got.len()));
    ops.extend(want[..prefix].iter().map(|s| DiffOp::Equal(s)));
    middle_ops(
        &want[prefix..want.len() - suffix],
        &got[prefix..got.len() - suffix],
        &mut ops,
    );
    ops.extend(want[want.len() - suffix..].iter().map(|s| DiffOp::Equal(s)));
    ops
}

fn middle_ops<'a>(want: &'a [String], got: &'a [String], ops: &mut Vec<DiffOp<'a>>) {
    let (n, m) = (want.len(), got.len());
    let cells = (n + 1).saturating_mul(m + 1);
    if n == 0 || m == 0 || cells > MAX_LCS_CELLS {
        ops.extend(want.iter().map(|s| DiffOp::Delete(s)));
        ops.extend(got.iter().map(|s| DiffOp::Insert(s)));
        return;
    }

    // lcs[i * (m + 1) + j] = LCS length of want[i..] and got[j..].
    let width = m + 1;
    let mut lcs = vec![0u32; cells];
    for i in (0..n).rev() {
        for j in (0..m).rev() {
            lcs[i * width + j] = if want[i] == got[j] {
                lcs[(i + 1) * width + j + 1] + 1
            } else {
                lcs[(i + 1) * width + j].max(lcs[i * width + j + 1])
            };
        }
    }

    let (mut i, mut j) = (0, 0);
    while i < n && j < m {
        if want[i] == got[j] {
            ops.push(DiffOp::Equal(&want[i]));
            i += 1;
            j += 1;
        } else if lcs[(i + 1) * width + j] >= lcs[i * width + j + 1] {
            ops.push(DiffOp::Delete(&want[i]));
            i += 1;
        } else {
            ops.push(DiffOp::Insert(&got[j]));
            j += 1;
        }
    }
    ops.extend(want[i..].iter().map(|s| DiffOp::Delete(s)));
    ops.extend(got[j..].iter().map(|s| DiffOp::Insert(s)));
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn quote_prefers_backticks_for_json() {
        assert_eq!(quote(r#"info  {"msg":"x"}"#), r#"`info  {"msg":"x"}`"#);
    }

    #[test]
    fn quote_plain_and_empty() {
        assert_eq!(quote(""), r#""""#);
        assert_eq!(quote("plain"), r#""plain""#);
    }

    #[test]
    fn quote_escapes_when_backticks_impossible() {
        assert_eq!(quote("a`\"b"), r#""a`\"b""#);
        assert_eq!(quote("line\n\"x\""), r#""line\n\"x\"""#);
    }

    #[test]
    fn string_diff_shape() {
        let d = string_diff(r#"debug {"n":"42"}"#, r#"debug {"n":"12"}"#);
        insta::assert_snapshot!(d, @r#"
          string(
        - 	`debug {"n":"42"}`,
        + 	`debug {"n":"12"}`,
          )
        "#);
    }

    #[test]
    fn string_diff_against_empty() {
        let d = string_diff("", r#"trace {"msg":"extra"}"#);
        assert_eq!(
            d,
            "  string(\n- \t\"\",\n+ \t`trace {\"msg\":\"extra\"}`,\n  )"
        );
    }

    #[test]
    fn diff_ops_common_subsequence() {
        let want = strings(&["a", "b", "c"]);
        let got = strings(&["b", "c", "d"]);
        assert_eq!(
            diff_ops(&want, &got),
            vec![
                DiffOp::Delete("a"),
                DiffOp::Equal("b"),
                DiffOp::Equal("c"),
                DiffOp::Insert("d"),
            ]
        );
    }

    #[test]
    fn diff_ops_replacement_deletes_first() {
        let want = strings(&["x"]);
        let got = strings(&["y"]);
        assert_eq!(
            diff_ops(&want, &got),
            vec![DiffOp::Delete("x"), DiffOp::Insert("y")]
        );
    }

    #[test]
    fn diff_ops_keeps_duplicates() {
        let want = strings(&["a", "a", "b"]);
        let got = strings(&["a", "b"]);
        assert_eq!(
            diff_ops(&want, &got),
            vec![DiffOp::Equal("a"), DiffOp::Delete("a"), DiffOp::Equal("b")]
        );
    }

    #[test]
    fn diff_ops_large_lists_with_one_extra_line() {
        let want: Vec<String> = (0..20_000).map(|i| format!("line {i:05}")).collect();
        let mut got = want.clone();
        got.insert(12_345, "line 12344b".to_string());

        let ops = diff_ops(&want, &got);
        assert_eq!(ops.len(), 20_001);
        assert_eq!(ops[12_345], DiffOp::Insert("line 12344b"));
        assert_eq!(
            ops.iter().filter(|op| matches!(op, DiffOp::Equal(_))).count(),
            20_000
        );
    }

    #[test]
    fn diff_ops_oversized_middle_lists_plainly() {
        let want: Vec<String> = (0..3_000).map(|i| format!("w{i}")).collect();
        let got: Vec<String> = (0..3_001).map(|i| format!("g{i}")).collect();
        assert!((want.len() + 1) * (got.len() + 1) > MAX_LCS_CELLS);

        let ops = diff_ops(&want, &got);
        assert_eq!(ops.len(), 6_001);
        assert!(ops[..3_000].iter().all(|op| matches!(op, DiffOp::Delete(_))));
        assert!(ops[3_000..].iter().all(|op| matches!(op, DiffOp::Insert(_))));
    }

    #[test]
    fn diff_ops_trims_shared_ends() {
        let want = strings(&["head", "x", "tail"]);
        let got = strings(&["head", "y", "z", "tail"]);
        assert_eq!(
            diff_ops(&want, &got),
            vec![
                DiffOp::Equal("head"),
                DiffOp::Delete("x"),
                DiffOp::Insert("y"),
                DiffOp::Insert("z"),
                DiffOp::Equal("tail"),
            ]
        );
    }

    #[test]
    fn diff_ops_empty_sides() {
        let none: Vec<String> = Vec::new();
        let some = strings(&["a"]);
        assert_eq!(diff_ops(&none, &some), vec![DiffOp::Insert("a")]);
        assert_eq!(diff_ops(&some, &none), vec![DiffOp::Delete("a")]);
        assert!(diff_ops(&none, &none).is_empty());
    }

    #[test]
    fn lines_diff_shape() {
        let want = strings(&["a", "b"]);
        let got = strings(&["b", "c"]);
        assert_eq!(
            lines_diff(&want, &got),
            "  []string{\n- \t\"a\",\n  \t\"b\",\n+ \t\"c\",\n  }"
        );
    }
}
