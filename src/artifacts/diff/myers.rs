//! Myers shortest-edit-script diff
//!
//! Line-level diff between two documents: a forward pass records the
//! furthest-reaching paths for each edit distance, a backtracking pass
//! recovers the edit script. Edits are grouped into unified-diff hunks with
//! a fixed amount of surrounding context.

use derive_new::new;

/// Context lines kept around each hunk.
pub const HUNK_CONTEXT: usize = 3;

/// A document line with its 1-based line number.
#[derive(Debug, Clone, PartialEq, Eq, new)]
pub struct Line {
    pub number: usize,
    pub text: String,
}

/// One step of an edit script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Edit {
    Delete { line: Line },
    Insert { line: Line },
    Equal { old: Line, new: Line },
}

impl Edit {
    pub fn is_equal(&self) -> bool {
        matches!(self, Edit::Equal { .. })
    }

    /// Unified-diff rendering: `-`, `+`, or a space prefix.
    pub fn render(&self) -> String {
        match self {
            Edit::Delete { line } => format!("-{}", line.text),
            Edit::Insert { line } => format!("+{}", line.text),
            Edit::Equal { old, .. } => format!(" {}", old.text),
        }
    }

    fn old_number(&self) -> Option<usize> {
        match self {
            Edit::Delete { line } => Some(line.number),
            Edit::Equal { old, .. } => Some(old.number),
            Edit::Insert { .. } => None,
        }
    }

    fn new_number(&self) -> Option<usize> {
        match self {
            Edit::Insert { line } => Some(line.number),
            Edit::Equal { new, .. } => Some(new.number),
            Edit::Delete { .. } => None,
        }
    }
}

/// Compute the edit script turning `a` into `b`.
pub fn diff_lines(a: &[String], b: &[String]) -> Vec<Edit> {
    if a.is_empty() && b.is_empty() {
        return Vec::new();
    }

    let trace = shortest_edit_trace(a, b);
    backtrack(a, b, &trace)
}

/// Forward pass: for each edit distance `d`, the furthest x reached on every
/// diagonal `k`, with the pre-round state snapshotted for backtracking.
fn shortest_edit_trace(a: &[String], b: &[String]) -> Vec<Vec<isize>> {
    let n = a.len() as isize;
    let m = b.len() as isize;
    let max = n + m;
    let offset = max as usize;

    let mut v = vec![0isize; 2 * offset + 1];
    let mut trace = Vec::new();

    for d in 0..=max {
        trace.push(v.clone());

        let mut k = -d;
        while k <= d {
            let idx = (offset as isize + k) as usize;

            let mut x = if k == -d || (k != d && v[idx - 1] < v[idx + 1]) {
                v[idx + 1] // step down: insertion
            } else {
                v[idx - 1] + 1 // step right: deletion
            };
            let mut y = x - k;

            // follow the snake of equal lines
            while x < n && y < m && a[x as usize] == b[y as usize] {
                x += 1;
                y += 1;
            }

            v[idx] = x;

            if x >= n && y >= m {
                return trace;
            }

            k += 2;
        }
    }

    trace
}

/// Backtracking pass: walk the trace from the end state back to the origin,
/// emitting edits in reverse.
fn backtrack(a: &[String], b: &[String], trace: &[Vec<isize>]) -> Vec<Edit> {
    let n = a.len() as isize;
    let m = b.len() as isize;
    let offset = (n + m) as usize;

    let mut x = n;
    let mut y = m;
    let mut edits = Vec::new();

    for (d, v) in trace.iter().enumerate().rev() {
        let d = d as isize;
        let k = x - y;
        let idx = (offset as isize + k) as usize;

        let prev_k = if k == -d || (k != d && v[idx - 1] < v[idx + 1]) {
            k + 1
        } else {
            k - 1
        };
        let prev_idx = (offset as isize + prev_k) as usize;
        let prev_x = v[prev_idx];
        let prev_y = prev_x - prev_k;

        while x > prev_x && y > prev_y {
            edits.push(Edit::Equal {
                old: Line::new(x as usize, a[(x - 1) as usize].clone()),
                new: Line::new(y as usize, b[(y - 1) as usize].clone()),
            });
            x -= 1;
            y -= 1;
        }

        if d > 0 {
            if x == prev_x {
                edits.push(Edit::Insert {
                    line: Line::new(y as usize, b[(y - 1) as usize].clone()),
                });
            } else {
                edits.push(Edit::Delete {
                    line: Line::new(x as usize, a[(x - 1) as usize].clone()),
                });
            }
            x = prev_x;
            y = prev_y;
        }
    }

    edits.reverse();
    edits
}

/// Aligned `(old-index, new-index)` pairs of unchanged lines, 0-based.
///
/// This is the LCS view of the edit script, consumed by the three-way merge.
pub fn matching_lines(a: &[String], b: &[String]) -> Vec<(usize, usize)> {
    diff_lines(a, b)
        .into_iter()
        .filter_map(|edit| match edit {
            Edit::Equal { old, new } => Some((old.number - 1, new.number - 1)),
            _ => None,
        })
        .collect()
}

/// A unified-diff hunk: a run of edits plus its `@@` header coordinates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hunk {
    old_start: usize,
    new_start: usize,
    edits: Vec<Edit>,
}

impl Hunk {
    pub fn edits(&self) -> &[Edit] {
        &self.edits
    }

    fn old_size(&self) -> usize {
        self.edits
            .iter()
            .filter(|edit| matches!(edit, Edit::Delete { .. } | Edit::Equal { .. }))
            .count()
    }

    fn new_size(&self) -> usize {
        self.edits
            .iter()
            .filter(|edit| matches!(edit, Edit::Insert { .. } | Edit::Equal { .. }))
            .count()
    }

    pub fn header(&self) -> String {
        format!(
            "@@ -{},{} +{},{} @@",
            self.old_start,
            self.old_size(),
            self.new_start,
            self.new_size()
        )
    }
}

/// Group an edit script into hunks, keeping `context` unchanged lines around
/// each changed region and merging regions whose gap fits twice the context.
pub fn build_hunks(edits: &[Edit], context: usize) -> Vec<Hunk> {
    let mut hunks = Vec::new();
    let mut i = 0;

    while i < edits.len() {
        if edits[i].is_equal() {
            i += 1;
            continue;
        }

        let start = i.saturating_sub(context);

        let mut j = i + 1;
        let mut last_change = i;
        while j < edits.len() {
            if !edits[j].is_equal() {
                last_change = j;
            } else if j - last_change > context * 2 {
                break;
            }
            j += 1;
        }

        let end = usize::min(last_change + context + 1, edits.len());
        let slice = &edits[start..end];

        let old_start = slice
            .iter()
            .find_map(Edit::old_number)
            .unwrap_or_default();
        let new_start = slice
            .iter()
            .find_map(Edit::new_number)
            .unwrap_or_default();

        hunks.push(Hunk {
            old_start,
            new_start,
            edits: slice.to_vec(),
        });

        i = usize::max(j, end);
    }

    hunks
}
