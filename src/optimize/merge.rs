//! Folding a run of rules into one set-valued rule.
//!
//! Planning picks the selector columns that vary across the run; applying
//! moves each row's comparands into a freshly built anonymous set on the
//! run's first rule and retires the rest of the run. Non-match columns
//! (counters, verdicts, limits, ...) are identical across the run by
//! construction and ride along on the surviving rule untouched.

use std::io::{self, Write};

use crate::optimize::matrix::{MergeRun, SelectorMatrix};
use crate::ruleset::expr::{Expr, RelOp};
use crate::ruleset::stmt::{MatchStmt, Stmt};
use crate::ruleset::Rule;

/// A run plus the coordinates of the statements to fold.
#[derive(Debug)]
pub(super) struct MergePlan {
    /// First row of the run, as an index into the unmodified rule list.
    from: usize,
    /// For each row of the run, the statement index of every participating
    /// column, in column order.
    rows: Vec<Vec<usize>>,
}

impl MergePlan {
    pub fn rules_removed(&self) -> usize {
        self.rows.len() - 1
    }
}

/// Decides what a run's fold will touch: exactly the columns whose cell on
/// the first row is a match statement. Returns `None` for runs of exact
/// duplicates, which have nothing to fold.
pub(super) fn plan_run(
    matrix: &SelectorMatrix,
    rules: &[Rule],
    run: &MergeRun,
) -> Option<MergePlan> {
    let mut cols = Vec::new();
    for col in 0..matrix.num_selectors() {
        if let Some(si) = matrix.cell(run.from, col) {
            if matches!(rules[run.from].stmts[si], Stmt::Match(_)) {
                cols.push(col);
            }
        }
    }
    if cols.is_empty() {
        return None;
    }

    let mut rows = Vec::with_capacity(run.to - run.from + 1);
    for row in run.from..=run.to {
        let mut indices = Vec::with_capacity(cols.len());
        for &col in &cols {
            indices.push(matrix.cell(row, col)?);
        }
        rows.push(indices);
    }
    Some(MergePlan {
        from: run.from,
        rows,
    })
}

/// Rewrites the run's first rule in place and removes the rest.
///
/// `removed` is the number of rules already dropped from the list by earlier
/// folds, i.e. the offset between plan coordinates and current indices.
pub(super) fn apply_merge(
    rules: &mut Vec<Rule>,
    plan: &MergePlan,
    removed: usize,
    diag: &mut dyn Write,
) -> io::Result<()> {
    let from = plan.from - removed;
    let run_len = plan.rows.len();

    writeln!(diag, "Merging:")?;
    for rule in &rules[from..from + run_len] {
        let line = rule.location.line_text().unwrap_or_default();
        writeln!(diag, "{}: {}", rule.location, line)?;
    }

    // detach the donor rules, then move their comparands out
    let donors: Vec<Rule> = rules.drain(from + 1..from + run_len).collect();
    let donor_rights: Vec<Vec<Expr>> = donors
        .into_iter()
        .zip(&plan.rows[1..])
        .map(|(donor, indices)| take_rights(donor, indices))
        .collect();

    let rule = &mut rules[from];
    let mut slots: Vec<Option<Stmt>> = std::mem::take(&mut rule.stmts)
        .into_iter()
        .map(Some)
        .collect();
    let anchor = plan.rows[0][0];
    let parts: Vec<MatchStmt> = plan.rows[0]
        .iter()
        .map(|&si| match slots[si].take() {
            Some(Stmt::Match(stmt)) => stmt,
            _ => unreachable!("planned cell is not a match statement"),
        })
        .collect();

    let merged = if parts.len() == 1 {
        fold_values(parts, donor_rights)
    } else {
        fold_concat(parts, donor_rights)
    };
    slots[anchor] = Some(Stmt::Match(merged));
    rule.stmts = slots.into_iter().flatten().collect();

    writeln!(diag, "into:\n\t{}", rules[from])?;
    Ok(())
}

/// Consumes a donor rule, returning the right-hand sides of its planned
/// statements in column order.
fn take_rights(donor: Rule, indices: &[usize]) -> Vec<Expr> {
    let mut slots: Vec<Option<Stmt>> = donor.stmts.into_iter().map(Some).collect();
    indices
        .iter()
        .map(|&si| match slots[si].take() {
            Some(Stmt::Match(stmt)) => stmt.right,
            _ => unreachable!("planned cell is not a match statement"),
        })
        .collect()
}

/// Single-selector fold: the comparands of the whole run become the
/// elements of one anonymous set, in row order.
fn fold_values(mut parts: Vec<MatchStmt>, donor_rights: Vec<Vec<Expr>>) -> MatchStmt {
    let MatchStmt { left, op, right } = parts.remove(0);

    let mut elems = Vec::with_capacity(donor_rights.len() + 1);
    elems.push(Expr::set_elem(right));
    elems.extend(donor_rights.into_iter().flatten().map(Expr::set_elem));

    MatchStmt {
        left,
        op,
        right: Expr::anon_set(elems),
    }
}

/// Multi-selector fold: the participating selectors concatenate into one
/// compound left-hand side, and each row's comparands concatenate into one
/// set element, preserving row and column order.
fn fold_concat(parts: Vec<MatchStmt>, donor_rights: Vec<Vec<Expr>>) -> MatchStmt {
    let mut op = RelOp::Eq;
    let mut lefts = Vec::with_capacity(parts.len());
    let mut first_rights = Vec::with_capacity(parts.len());
    for (k, part) in parts.into_iter().enumerate() {
        let MatchStmt {
            left,
            op: part_op,
            right,
        } = part;
        if k == 0 {
            op = part_op;
        }
        lefts.push(left);
        first_rights.push(right);
    }

    let mut elems = Vec::with_capacity(donor_rights.len() + 1);
    elems.push(Expr::set_elem(Expr::concat(first_rights)));
    elems.extend(
        donor_rights
            .into_iter()
            .map(|rights| Expr::set_elem(Expr::concat(rights))),
    );

    MatchStmt {
        left: Expr::concat(lefts),
        op,
        right: Expr::anon_set(elems),
    }
}
