//! Statements: the ordered elements of a rule.
//!
//! A rule is a sequence of match statements (which must all succeed) and
//! action statements (which fire once the matches have). Only the statement
//! kinds modeled here take part in rule folding; anything else blocks it.

use std::fmt;

use crate::ruleset::expr::{Expr, RelOp, Value};
use crate::ruleset::NfFamily;

/// One element of a rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Stmt {
    /// Relational match, e.g. `tcp dport 22`.
    Match(MatchStmt),
    /// Packet and byte counter.
    Counter,
    /// Disable connection tracking.
    Notrack,
    /// Terminal verdict, e.g. `accept` or `jump other_chain`.
    Verdict(VerdictStmt),
    /// Rate limit.
    Limit(LimitStmt),
    /// Packet logging.
    Log(LogStmt),
    /// Reject with an ICMP error or TCP reset.
    Reject(RejectStmt),
    /// Userspace queueing. Not foldable.
    Queue(QueueStmt),
}

impl fmt::Display for Stmt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stmt::Match(stmt) => write!(f, "{}", stmt),
            Stmt::Counter => write!(f, "counter"),
            Stmt::Notrack => write!(f, "notrack"),
            Stmt::Verdict(stmt) => write!(f, "{}", stmt),
            Stmt::Limit(stmt) => write!(f, "{}", stmt),
            Stmt::Log(stmt) => write!(f, "{}", stmt),
            Stmt::Reject(stmt) => write!(f, "{}", stmt),
            Stmt::Queue(stmt) => write!(f, "{}", stmt),
        }
    }
}

/// A relational comparison between a selector and a value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchStmt {
    pub left: Expr,
    pub op: RelOp,
    pub right: Expr,
}

impl MatchStmt {
    pub fn new(left: Expr, op: RelOp, right: Expr) -> MatchStmt {
        MatchStmt { left, op, right }
    }

    /// Implicit-equality match, the common form in rule text.
    pub fn eq(left: Expr, right: Expr) -> MatchStmt {
        MatchStmt::new(left, RelOp::Eq, right)
    }
}

impl fmt::Display for MatchStmt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.op {
            // equality is implicit in rule text
            RelOp::Eq => write!(f, "{} {}", self.left, self.right),
            op => write!(f, "{} {} {}", self.left, op, self.right),
        }
    }
}

/// Verdict kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Verdict {
    Accept,
    Drop,
    Continue,
    Return,
    Jump,
    Goto,
}

/// A verdict plus, for `jump`/`goto`, the target chain expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerdictStmt {
    pub verdict: Verdict,
    pub chain: Option<Expr>,
}

impl VerdictStmt {
    pub fn new(verdict: Verdict) -> VerdictStmt {
        VerdictStmt {
            verdict,
            chain: None,
        }
    }

    pub fn jump(chain: &str) -> VerdictStmt {
        VerdictStmt {
            verdict: Verdict::Jump,
            chain: Some(Expr::symbol(chain)),
        }
    }

    pub fn goto(chain: &str) -> VerdictStmt {
        VerdictStmt {
            verdict: Verdict::Goto,
            chain: Some(Expr::symbol(chain)),
        }
    }
}

impl fmt::Display for VerdictStmt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let keyword = match self.verdict {
            Verdict::Accept => "accept",
            Verdict::Drop => "drop",
            Verdict::Continue => "continue",
            Verdict::Return => "return",
            Verdict::Jump => "jump",
            Verdict::Goto => "goto",
        };
        match &self.chain {
            // chain names print bare, not as quoted symbols
            Some(Expr::Value(Value::Symbol(name))) => write!(f, "{} {}", keyword, name),
            Some(expr) => write!(f, "{} {}", keyword, expr),
            None => write!(f, "{}", keyword),
        }
    }
}

/// Time unit of a limit rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimeUnit {
    Second,
    Minute,
    Hour,
    Day,
    Week,
}

impl fmt::Display for TimeUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TimeUnit::Second => "second",
            TimeUnit::Minute => "minute",
            TimeUnit::Hour => "hour",
            TimeUnit::Day => "day",
            TimeUnit::Week => "week",
        };
        write!(f, "{}", name)
    }
}

/// What a limit counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LimitKind {
    Packets,
    Bytes,
}

impl fmt::Display for LimitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LimitKind::Packets => write!(f, "packets"),
            LimitKind::Bytes => write!(f, "bytes"),
        }
    }
}

/// Rate limit statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LimitStmt {
    pub rate: u64,
    pub unit: TimeUnit,
    pub burst: u32,
    pub per: LimitKind,
    /// Match packets *over* the rate instead of under it.
    pub over: bool,
}

impl LimitStmt {
    pub fn per_second(rate: u64) -> LimitStmt {
        LimitStmt {
            rate,
            unit: TimeUnit::Second,
            burst: 0,
            per: LimitKind::Packets,
            over: false,
        }
    }
}

impl fmt::Display for LimitStmt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "limit rate ")?;
        if self.over {
            write!(f, "over ")?;
        }
        write!(f, "{}/{}", self.rate, self.unit)?;
        if self.burst > 0 {
            write!(f, " burst {} {}", self.burst, self.per)?;
        }
        Ok(())
    }
}

/// Log severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogLevel {
    Emerg,
    Alert,
    Crit,
    Err,
    Warn,
    Notice,
    Info,
    Debug,
    Audit,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LogLevel::Emerg => "emerg",
            LogLevel::Alert => "alert",
            LogLevel::Crit => "crit",
            LogLevel::Err => "err",
            LogLevel::Warn => "warn",
            LogLevel::Notice => "notice",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Audit => "audit",
        };
        write!(f, "{}", name)
    }
}

// Optional payload details a log statement records.
bitmask! {
    #[derive(Debug)]
    pub mask LogFlags: u32 where flags LogFlag {
        TcpSeq     = 0x1 << 0,
        TcpOpts    = 0x1 << 1,
        IpOpts     = 0x1 << 2,
        Uid        = 0x1 << 3,
        MacDecode  = 0x1 << 4,
    }
}

/// Packet logging statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogStmt {
    /// Text prepended to each log record; an immediate value when present.
    pub prefix: Option<Expr>,
    pub snaplen: u32,
    pub group: u16,
    pub qthreshold: u16,
    pub level: Option<LogLevel>,
    pub flags: LogFlags,
}

impl LogStmt {
    pub fn new() -> LogStmt {
        LogStmt {
            prefix: None,
            snaplen: 0,
            group: 0,
            qthreshold: 0,
            level: None,
            flags: LogFlags::none(),
        }
    }

    pub fn with_prefix(prefix: &str) -> LogStmt {
        LogStmt {
            prefix: Some(Expr::symbol(prefix)),
            ..LogStmt::new()
        }
    }
}

impl Default for LogStmt {
    fn default() -> Self {
        LogStmt::new()
    }
}

impl fmt::Display for LogStmt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "log")?;
        if let Some(prefix) = &self.prefix {
            write!(f, " prefix {}", prefix)?;
        }
        if self.group > 0 {
            write!(f, " group {}", self.group)?;
        }
        if self.snaplen > 0 {
            write!(f, " snaplen {}", self.snaplen)?;
        }
        if self.qthreshold > 0 {
            write!(f, " queue-threshold {}", self.qthreshold)?;
        }
        if let Some(level) = self.level {
            write!(f, " level {}", level)?;
        }
        Ok(())
    }
}

/// Reject kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RejectKind {
    IcmpUnreach,
    TcpReset,
    IcmpxUnreach,
}

/// Reject statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectStmt {
    pub kind: RejectKind,
    pub family: Option<NfFamily>,
    pub icmp_code: u8,
    /// Reason expression from the rule text, if any was written.
    pub expr: Option<Expr>,
}

impl RejectStmt {
    pub fn new(kind: RejectKind) -> RejectStmt {
        RejectStmt {
            kind,
            family: None,
            icmp_code: 0,
            expr: None,
        }
    }
}

impl fmt::Display for RejectStmt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            RejectKind::IcmpUnreach => write!(f, "reject"),
            RejectKind::TcpReset => write!(f, "reject with tcp reset"),
            RejectKind::IcmpxUnreach => write!(f, "reject with icmpx type {}", self.icmp_code),
        }
    }
}

/// Userspace queue statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueStmt {
    pub num: u16,
}

impl fmt::Display for QueueStmt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "queue num {}", self.num)
    }
}
