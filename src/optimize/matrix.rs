//! The rule-by-selector matrix.
//!
//! Every distinct merge-equal statement encountered in a chain becomes a
//! column; every rule becomes a row. A cell records which of the row's
//! statements belongs to the column, so two rules can be compared selector
//! by selector without caring about statement order or textual detail.

use crate::optimize::eq::{merge_eq, stmt_eq};
use crate::optimize::OptimizeError;
use crate::ruleset::{Rule, Stmt};

/// A maximal stretch of adjacent rows that agree on every column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) struct MergeRun {
    pub from: usize,
    pub to: usize,
}

pub(super) struct SelectorMatrix {
    /// Column keys: cloned statements, in order of first appearance. A key
    /// is only ever used as the left side of a merge-equality check.
    selectors: Vec<Stmt>,
    /// Per rule, per column: index of the rule's statement occupying the
    /// cell, or `None` when the rule does not test that selector.
    cells: Vec<Vec<Option<usize>>>,
}

impl SelectorMatrix {
    /// Collects selectors and fills the matrix in one pass over the chain.
    ///
    /// A statement merge-equal to no existing column appends a new one; this
    /// includes every statement of an unsupported kind, which is unequal
    /// even to its own clone and therefore occupies a column of its own.
    /// That keeps rows containing such statements unequal to every other
    /// row, so no fold can reach across them.
    pub fn build(rules: &[Rule], max_selectors: usize) -> Result<SelectorMatrix, OptimizeError> {
        let mut selectors: Vec<Stmt> = Vec::new();
        let mut cells: Vec<Vec<Option<usize>>> = Vec::with_capacity(rules.len());

        for rule in rules {
            let mut row = vec![None; selectors.len()];
            for (si, stmt) in rule.stmts.iter().enumerate() {
                let col = match selectors.iter().position(|key| merge_eq(stmt, key)) {
                    Some(col) => col,
                    None => {
                        selectors.push(stmt.clone());
                        if selectors.len() >= max_selectors {
                            return Err(OptimizeError::TooManySelectors { max: max_selectors });
                        }
                        selectors.len() - 1
                    }
                };
                if row.len() < selectors.len() {
                    row.resize(selectors.len(), None);
                }
                row[col] = Some(si);
            }
            cells.push(row);
        }

        let width = selectors.len();
        for row in cells.iter_mut() {
            row.resize(width, None);
        }

        Ok(SelectorMatrix { selectors, cells })
    }

    pub fn num_selectors(&self) -> usize {
        self.selectors.len()
    }

    /// Statement index occupying cell `(row, col)`, if any.
    pub fn cell(&self, row: usize, col: usize) -> Option<usize> {
        self.cells[row][col]
    }

    fn stmt_at<'r>(&self, rules: &'r [Rule], row: usize, col: usize) -> Option<&'r Stmt> {
        self.cells[row][col].map(|si| &rules[row].stmts[si])
    }

    /// Rows compare equal when every column does, counting empty cells as
    /// equal to each other and unequal to anything present.
    fn rows_eq(&self, rules: &[Rule], i: usize, j: usize) -> bool {
        (0..self.num_selectors())
            .all(|col| stmt_eq(self.stmt_at(rules, i, col), self.stmt_at(rules, j, col)))
    }

    /// Scans rows for maximal runs of matrix-equal neighbours.
    ///
    /// The scan restarts at the first row not absorbed by the previous run,
    /// so the produced runs are non-overlapping and in row order. Runs of a
    /// single row are not emitted.
    pub fn merge_runs(&self, rules: &[Rule]) -> Vec<MergeRun> {
        let mut runs = Vec::new();
        let num_rules = self.cells.len();

        let mut i = 0;
        while i + 1 < num_rules {
            let mut j = i + 1;
            while j < num_rules && self.rows_eq(rules, i, j) {
                j += 1;
            }
            if j > i + 1 {
                runs.push(MergeRun { from: i, to: j - 1 });
            }
            i = j;
        }
        runs
    }
}
