//! Line-level three-way merge
//!
//! Aligns both sides against the common base using the diff engine's LCS
//! matches, slices the documents into stable and unstable regions, applies
//! one-sided changes, and renders two-sided divergent regions as conflict
//! blocks:
//!
//! ```text
//! <<<<<<< HEAD
//! <our lines>
//! =======
//! <their lines>
//! >>>>>>> <their label>
//! ```

use crate::artifacts::diff::myers::matching_lines;
use std::collections::HashMap;

pub const CONFLICT_OURS_LABEL: &str = "HEAD";

/// Outcome of merging one file's lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeResult {
    pub text: String,
    pub conflicted: bool,
}

/// Merge `ours` and `theirs` against `base`.
///
/// Regions where only one side diverges from the base take that side;
/// regions where both diverge identically take either; the rest become
/// conflict blocks labelled with `theirs_label`.
pub fn merge_lines(
    base: &[String],
    ours: &[String],
    theirs: &[String],
    theirs_label: &str,
) -> MergeResult {
    let ours_matches: HashMap<usize, usize> = matching_lines(base, ours).into_iter().collect();
    let theirs_matches: HashMap<usize, usize> = matching_lines(base, theirs).into_iter().collect();

    let mut output: Vec<String> = Vec::new();
    let mut conflicted = false;

    // cursors into base, ours, theirs
    let (mut b, mut o, mut t) = (0usize, 0usize, 0usize);

    while b < base.len() || o < ours.len() || t < theirs.len() {
        // stable position: the current base line is matched by both sides
        // at exactly the current cursors
        if b < base.len()
            && ours_matches.get(&b) == Some(&o)
            && theirs_matches.get(&b) == Some(&t)
        {
            output.push(base[b].clone());
            b += 1;
            o += 1;
            t += 1;
            continue;
        }

        // unstable chunk: scan ahead to the next base line matched by both
        // sides beyond the current cursors
        let mut next = b;
        let mut chunk_end = None;
        while next < base.len() {
            if let (Some(&o_match), Some(&t_match)) =
                (ours_matches.get(&next), theirs_matches.get(&next))
                && o_match >= o
                && t_match >= t
            {
                chunk_end = Some((next, o_match, t_match));
                break;
            }
            next += 1;
        }

        let (b_end, o_end, t_end) = chunk_end.unwrap_or((base.len(), ours.len(), theirs.len()));

        let base_chunk = &base[b..b_end];
        let ours_chunk = &ours[o..o_end];
        let theirs_chunk = &theirs[t..t_end];

        if ours_chunk == base_chunk {
            output.extend_from_slice(theirs_chunk);
        } else if theirs_chunk == base_chunk || ours_chunk == theirs_chunk {
            output.extend_from_slice(ours_chunk);
        } else {
            conflicted = true;
            output.push(format!("<<<<<<< {}", CONFLICT_OURS_LABEL));
            output.extend_from_slice(ours_chunk);
            output.push("=======".to_string());
            output.extend_from_slice(theirs_chunk);
            output.push(format!(">>>>>>> {}", theirs_label));
        }

        b = b_end;
        o = o_end;
        t = t_end;
    }

    let mut text = output.join("\n");
    if !text.is_empty() {
        text.push('\n');
    }

    MergeResult { text, conflicted }
}
