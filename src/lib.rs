//! A rule-merging optimizer for packet-filter rulesets.
//!
//! Firewall chains routinely contain long stretches of rules that perform the
//! same test against different values:
//!
//! ```text
//! tcp dport 22 accept
//! tcp dport 23 accept
//! tcp dport 80 accept
//! ```
//!
//! Evaluated linearly, every packet pays for every rule. This crate detects
//! adjacent rules that are identical in every respect except the values on
//! the right-hand side of their match expressions and folds each such run
//! into a single rule whose match uses an anonymous set:
//!
//! ```text
//! tcp dport { 22, 23, 80 } accept
//! ```
//!
//! When several selectors vary together, the fold produces a concatenation
//! matched against a set of tuples instead:
//!
//! ```text
//! iifname . ip daddr . tcp dport { "eth0" . 1.1.1.1 . 22, "eth1" . 2.2.2.2 . 80 } accept
//! ```
//!
//! The transformation is best-effort and conservative: rules that differ in
//! any non-value detail, rules containing statement kinds the optimizer does
//! not understand, and chains flagged for hardware offload are left exactly
//! as written. Surviving rules keep their relative order, and a folded run
//! collapses to its first member's position.
//!
//! The entry point is [`optimize`], which walks a command list and rewrites
//! the chains of every added table in place, reporting each fold on a
//! caller-supplied diagnostic stream. [`Optimizer`] exposes the same pass
//! with a custom [`OptimizeConfig`].

#[macro_use]
extern crate bitmask;

pub mod config;
pub mod optimize;
pub mod ruleset;

pub use self::config::{load_config, OptimizeConfig};
pub use self::optimize::{optimize, OptimizeError, Optimizer};
pub use self::ruleset::{Chain, ChainFlag, ChainFlags, Cmd, CmdObj, CmdOp, NfFamily, Rule, Table};
