//! The ruleset object model: commands, tables, chains, rules.
//!
//! This is the in-memory tree the optimizer rewrites. It is produced by an
//! external parser and consumed by an external backend; the optimizer only
//! ever edits rule lists within chains.

pub mod expr;
pub mod location;
pub mod stmt;

use std::fmt;

use itertools::Itertools;

pub use self::expr::{Expr, RelOp, Value};
pub use self::location::{InputDescriptor, InputKind, Location};
pub use self::stmt::{MatchStmt, Stmt, Verdict, VerdictStmt};

/// Address family of a table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NfFamily {
    Ip,
    Ip6,
    Inet,
    Arp,
    Bridge,
    Netdev,
}

impl fmt::Display for NfFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            NfFamily::Ip => "ip",
            NfFamily::Ip6 => "ip6",
            NfFamily::Inet => "inet",
            NfFamily::Arp => "arp",
            NfFamily::Bridge => "bridge",
            NfFamily::Netdev => "netdev",
        };
        write!(f, "{}", name)
    }
}

/// An ordered list of statements plus the source position it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    pub stmts: Vec<Stmt>,
    pub location: Location,
}

impl Rule {
    pub fn new(stmts: Vec<Stmt>, location: Location) -> Rule {
        Rule { stmts, location }
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.stmts.iter().format(" "))
    }
}

// Chain property flags. Chains flagged HwOffload are never rewritten.
bitmask! {
    #[derive(Debug)]
    pub mask ChainFlags: u32 where flags ChainFlag {
        // Attached to a netfilter hook
        Base      = 0x1 << 0,
        // Offloaded to hardware
        HwOffload = 0x1 << 1,
        // Bound to a rule rather than declared standalone
        Binding   = 0x1 << 2,
    }
}

/// An ordered list of rules evaluated top to bottom.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chain {
    pub name: String,
    pub rules: Vec<Rule>,
    pub flags: ChainFlags,
}

impl Chain {
    pub fn new(name: &str) -> Chain {
        Chain {
            name: name.to_owned(),
            rules: Vec::new(),
            flags: ChainFlags::none(),
        }
    }
}

/// A named collection of chains within one address family.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    pub name: String,
    pub family: NfFamily,
    pub chains: Vec<Chain>,
}

impl Table {
    pub fn new(family: NfFamily, name: &str) -> Table {
        Table {
            name: name.to_owned(),
            family,
            chains: Vec::new(),
        }
    }
}

/// Operation a command performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CmdOp {
    Add,
    Create,
    Delete,
    Flush,
    List,
}

/// Object a command operates on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CmdObj {
    Table(Table),
    /// The whole ruleset, e.g. `flush ruleset`.
    Ruleset,
}

/// One parsed command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cmd {
    pub op: CmdOp,
    pub obj: CmdObj,
}

impl Cmd {
    pub fn add_table(table: Table) -> Cmd {
        Cmd {
            op: CmdOp::Add,
            obj: CmdObj::Table(table),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::expr::{PayloadField, PayloadHdr};
    use super::*;

    #[test]
    fn ruleset_rule_display() {
        let rule = Rule::new(
            vec![
                Stmt::Match(MatchStmt::eq(
                    Expr::payload(PayloadHdr::Tcp, PayloadField::Dport),
                    Expr::num(22),
                )),
                Stmt::Counter,
                Stmt::Verdict(VerdictStmt::new(Verdict::Accept)),
            ],
            Location::internal(),
        );
        assert_eq!(rule.to_string(), "tcp dport 22 counter accept");
    }

    #[test]
    fn ruleset_chain_flags() {
        let mut chain = Chain::new("input");
        assert!(!chain.flags.contains(ChainFlag::HwOffload));
        chain.flags.set(ChainFlag::HwOffload);
        assert!(chain.flags.contains(ChainFlag::HwOffload));
    }
}
