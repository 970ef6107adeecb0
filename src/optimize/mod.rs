//! The rule-folding pass.
//!
//! Per chain, the pass runs four phases: collect the distinct selectors,
//! build the rule-by-selector matrix, scan for runs of adjacent rules that
//! agree on every selector, then fold each run into its first rule. The
//! pass is best-effort: a chain it cannot handle is simply left as written,
//! and no failure here ever propagates to the command being processed.

mod eq;
mod matrix;
mod merge;

use std::io::{self, Write};

use anyhow::Result;
use thiserror::Error;

use self::matrix::SelectorMatrix;
use self::merge::{apply_merge, plan_run};
use crate::config::OptimizeConfig;
use crate::ruleset::{Chain, ChainFlag, Cmd, CmdObj, CmdOp};

/// Why a chain's pass was abandoned.
#[derive(Error, Debug)]
pub enum OptimizeError {
    /// The chain tests more distinct selectors than the pass is willing to
    /// track; see [`OptimizeConfig::max_selectors`].
    #[error("too many distinct selectors (limit {max})")]
    TooManySelectors { max: usize },

    #[error("failed to write fold diagnostics")]
    Diagnostics(#[from] io::Error),
}

/// Optimizes every chain of every added table in `cmds`, with default
/// limits. Fold diagnostics are written to `diag`.
pub fn optimize(cmds: &mut [Cmd], diag: &mut dyn Write) -> Result<()> {
    Optimizer::default().optimize(cmds, diag)
}

/// The rule-folding pass with explicit configuration.
#[derive(Debug, Clone, Default)]
pub struct Optimizer {
    config: OptimizeConfig,
}

impl Optimizer {
    pub fn new(config: OptimizeConfig) -> Optimizer {
        Optimizer { config }
    }

    /// Walks a command list and rewrites the chains of every `add table`
    /// command in place. Other commands pass through untouched.
    ///
    /// Chains flagged for hardware offload are skipped, as are chains whose
    /// selector count exceeds the configured budget; neither stops the walk.
    pub fn optimize(&self, cmds: &mut [Cmd], diag: &mut dyn Write) -> Result<()> {
        for cmd in cmds.iter_mut() {
            if cmd.op != CmdOp::Add {
                continue;
            }
            let table = match &mut cmd.obj {
                CmdObj::Table(table) => table,
                _ => continue,
            };
            for chain in table.chains.iter_mut() {
                if chain.flags.contains(ChainFlag::HwOffload) {
                    log::debug!("chain {}: offloaded to hardware, not folding", chain.name);
                    continue;
                }
                if let Err(err) = self.optimize_chain(chain, diag) {
                    log::warn!("chain {}: not folding: {}", chain.name, err);
                }
            }
        }
        Ok(())
    }

    fn optimize_chain(&self, chain: &mut Chain, diag: &mut dyn Write) -> Result<(), OptimizeError> {
        let matrix = SelectorMatrix::build(&chain.rules, self.config.max_selectors)?;
        let runs = matrix.merge_runs(&chain.rules);

        let mut plans = Vec::with_capacity(runs.len());
        for run in &runs {
            if let Some(plan) = plan_run(&matrix, &chain.rules, run) {
                plans.push(plan);
            }
        }

        // folds shift every later rule index down by the rules they remove
        let mut removed = 0;
        for plan in &plans {
            apply_merge(&mut chain.rules, plan, removed, diag)?;
            removed += plan.rules_removed();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ruleset::expr::{Expr, PayloadField, PayloadHdr};
    use crate::ruleset::stmt::{MatchStmt, Stmt, Verdict, VerdictStmt};
    use crate::ruleset::{Location, NfFamily, Rule, Table};

    fn tcp_accept_rule(port: u64) -> Rule {
        Rule::new(
            vec![
                Stmt::Match(MatchStmt::eq(
                    Expr::payload(PayloadHdr::Tcp, PayloadField::Dport),
                    Expr::num(port),
                )),
                Stmt::Verdict(VerdictStmt::new(Verdict::Accept)),
            ],
            Location::internal(),
        )
    }

    fn table_with_chain(rules: Vec<Rule>) -> Table {
        let mut chain = Chain::new("input");
        chain.rules = rules;
        let mut table = Table::new(NfFamily::Inet, "filter");
        table.chains.push(chain);
        table
    }

    #[test]
    fn optimize_only_add_table_commands() {
        let table = table_with_chain(vec![tcp_accept_rule(22), tcp_accept_rule(23)]);
        let mut cmds = vec![
            Cmd {
                op: CmdOp::List,
                obj: CmdObj::Table(table.clone()),
            },
            Cmd {
                op: CmdOp::Flush,
                obj: CmdObj::Ruleset,
            },
        ];
        let mut diag = Vec::new();
        optimize(&mut cmds, &mut diag).unwrap();

        assert_eq!(cmds[0].obj, CmdObj::Table(table));
        assert!(diag.is_empty());
    }

    #[test]
    fn optimize_respects_selector_budget() {
        let rules = vec![tcp_accept_rule(22), tcp_accept_rule(23)];
        let mut cmds = vec![Cmd::add_table(table_with_chain(rules.clone()))];

        let tight = Optimizer::new(OptimizeConfig { max_selectors: 2 });
        let mut diag = Vec::new();
        tight.optimize(&mut cmds, &mut diag).unwrap();

        // two selectors fill the budget, so the chain is left as written
        let CmdObj::Table(table) = &cmds[0].obj else {
            panic!("table command lost its object");
        };
        assert_eq!(table.chains[0].rules, rules);
        assert!(diag.is_empty());
    }
}
