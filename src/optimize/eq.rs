//! Statement equality modulo matched values.
//!
//! Two statements are merge-equal when they perform the same test or action
//! with at most the right-hand comparand differing. This is the relation
//! that decides which statements share a selector column, and therefore
//! which adjacent rules may fold into one.

use crate::ruleset::expr::{Expr, Value};
use crate::ruleset::stmt::{LogStmt, MatchStmt, RejectStmt, Stmt, VerdictStmt};

/// Cell-level equality: two absent statements are equal, an absent and a
/// present one are not.
pub(super) fn stmt_eq(a: Option<&Stmt>, b: Option<&Stmt>) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(a), Some(b)) => merge_eq(a, b),
        _ => false,
    }
}

/// Statement-level equality. The right-hand side of a match is deliberately
/// not compared: differing values are what folding is for.
pub(super) fn merge_eq(a: &Stmt, b: &Stmt) -> bool {
    match (a, b) {
        (Stmt::Match(a), Stmt::Match(b)) => match_eq(a, b),
        (Stmt::Counter, Stmt::Counter) => true,
        (Stmt::Notrack, Stmt::Notrack) => true,
        (Stmt::Verdict(a), Stmt::Verdict(b)) => verdict_eq(a, b),
        (Stmt::Limit(a), Stmt::Limit(b)) => {
            a.rate == b.rate
                && a.unit == b.unit
                && a.burst == b.burst
                && a.per == b.per
                && a.over == b.over
        }
        (Stmt::Log(a), Stmt::Log(b)) => log_eq(a, b),
        (Stmt::Reject(a), Stmt::Reject(b)) => reject_eq(a, b),
        // folding anything else is yet unsupported
        _ => false,
    }
}

fn match_eq(a: &MatchStmt, b: &MatchStmt) -> bool {
    selector_eq(&a.left, &b.left)
}

/// Identity of the tested selector: kind plus every field that names what
/// is read, none of the fields that carry packet data.
fn selector_eq(a: &Expr, b: &Expr) -> bool {
    match (a, b) {
        (
            Expr::Payload { hdr, field },
            Expr::Payload {
                hdr: peer_hdr,
                field: peer_field,
            },
        ) => hdr == peer_hdr && field == peer_field,
        (
            Expr::ExtHdr { hdr, field },
            Expr::ExtHdr {
                hdr: peer_hdr,
                field: peer_field,
            },
        ) => hdr == peer_hdr && field == peer_field,
        (
            Expr::Meta { key, base },
            Expr::Meta {
                key: peer_key,
                base: peer_base,
            },
        ) => key == peer_key && base == peer_base,
        (
            Expr::Ct {
                key,
                base,
                direction,
                nfproto,
            },
            Expr::Ct {
                key: peer_key,
                base: peer_base,
                direction: peer_direction,
                nfproto: peer_nfproto,
            },
        ) => {
            key == peer_key
                && base == peer_base
                && direction == peer_direction
                && nfproto == peer_nfproto
        }
        (Expr::Rt { key }, Expr::Rt { key: peer_key }) => key == peer_key,
        (
            Expr::Socket { key, level },
            Expr::Socket {
                key: peer_key,
                level: peer_level,
            },
        ) => key == peer_key && level == peer_level,
        _ => false,
    }
}

fn verdict_eq(a: &VerdictStmt, b: &VerdictStmt) -> bool {
    if a.verdict != b.verdict {
        return false;
    }
    match (&a.chain, &b.chain) {
        (None, None) => true,
        (Some(Expr::Value(Value::Symbol(name))), Some(Expr::Value(Value::Symbol(peer_name)))) => {
            name == peer_name
        }
        // non-identifier chain expressions are unsupported
        _ => false,
    }
}

fn log_eq(a: &LogStmt, b: &LogStmt) -> bool {
    if a.snaplen != b.snaplen
        || a.group != b.group
        || a.qthreshold != b.qthreshold
        || a.level != b.level
        || a.flags != b.flags
    {
        return false;
    }
    match (&a.prefix, &b.prefix) {
        (None, None) => true,
        (Some(Expr::Value(value)), Some(Expr::Value(peer_value))) => value == peer_value,
        _ => false,
    }
}

fn reject_eq(a: &RejectStmt, b: &RejectStmt) -> bool {
    if a.expr.is_some() || b.expr.is_some() {
        return false;
    }
    a.kind == b.kind && a.family == b.family && a.icmp_code == b.icmp_code
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ruleset::expr::{CtDir, CtKey, MetaKey, PayloadField, PayloadHdr, RelOp};
    use crate::ruleset::stmt::{LimitStmt, QueueStmt, RejectKind, Verdict};

    fn tcp_dport(port: u64) -> Stmt {
        Stmt::Match(MatchStmt::eq(
            Expr::payload(PayloadHdr::Tcp, PayloadField::Dport),
            Expr::num(port),
        ))
    }

    #[test]
    fn eq_ignores_matched_value() {
        assert!(merge_eq(&tcp_dport(22), &tcp_dport(8080)));
    }

    #[test]
    fn eq_ignores_relational_op() {
        let lt = Stmt::Match(MatchStmt::new(
            Expr::payload(PayloadHdr::Tcp, PayloadField::Dport),
            RelOp::Lt,
            Expr::num(1024),
        ));
        assert!(merge_eq(&tcp_dport(22), &lt));
    }

    #[test]
    fn eq_selector_identity() {
        let sport = Stmt::Match(MatchStmt::eq(
            Expr::payload(PayloadHdr::Tcp, PayloadField::Sport),
            Expr::num(22),
        ));
        let udp = Stmt::Match(MatchStmt::eq(
            Expr::payload(PayloadHdr::Udp, PayloadField::Dport),
            Expr::num(22),
        ));
        assert!(!merge_eq(&tcp_dport(22), &sport));
        assert!(!merge_eq(&tcp_dport(22), &udp));

        let iif = Stmt::Match(MatchStmt::eq(Expr::meta(MetaKey::Iifname), Expr::symbol("eth0")));
        let oif = Stmt::Match(MatchStmt::eq(Expr::meta(MetaKey::Oifname), Expr::symbol("eth0")));
        assert!(!merge_eq(&iif, &oif));
        assert!(!merge_eq(&iif, &tcp_dport(22)));

        let ct_orig = Stmt::Match(MatchStmt::eq(
            Expr::ct_dir(CtKey::Saddr, CtDir::Original),
            Expr::ipv4("10.0.0.1".parse().unwrap()),
        ));
        let ct_reply = Stmt::Match(MatchStmt::eq(
            Expr::ct_dir(CtKey::Saddr, CtDir::Reply),
            Expr::ipv4("10.0.0.1".parse().unwrap()),
        ));
        assert!(!merge_eq(&ct_orig, &ct_reply));
    }

    #[test]
    fn eq_non_selector_left_is_unsupported() {
        let odd = Stmt::Match(MatchStmt::eq(Expr::num(1), Expr::num(1)));
        assert!(!merge_eq(&odd, &odd));
    }

    #[test]
    fn eq_verdicts() {
        let accept = Stmt::Verdict(VerdictStmt::new(Verdict::Accept));
        let drop = Stmt::Verdict(VerdictStmt::new(Verdict::Drop));
        assert!(merge_eq(&accept, &accept));
        assert!(!merge_eq(&accept, &drop));

        let jump_a = Stmt::Verdict(VerdictStmt::jump("dmz"));
        let jump_b = Stmt::Verdict(VerdictStmt::jump("dmz"));
        let jump_c = Stmt::Verdict(VerdictStmt::jump("lan"));
        assert!(merge_eq(&jump_a, &jump_b));
        assert!(!merge_eq(&jump_a, &jump_c));
        assert!(!merge_eq(&jump_a, &Stmt::Verdict(VerdictStmt::new(Verdict::Jump))));

        // a chain expressed as anything but an identifier never compares equal
        let computed = Stmt::Verdict(VerdictStmt {
            verdict: Verdict::Jump,
            chain: Some(Expr::num(7)),
        });
        assert!(!merge_eq(&computed, &computed));
    }

    #[test]
    fn eq_actions() {
        assert!(merge_eq(&Stmt::Counter, &Stmt::Counter));
        assert!(merge_eq(&Stmt::Notrack, &Stmt::Notrack));
        assert!(!merge_eq(&Stmt::Counter, &Stmt::Notrack));

        let limit_a = Stmt::Limit(LimitStmt::per_second(10));
        let limit_b = Stmt::Limit(LimitStmt::per_second(20));
        assert!(merge_eq(&limit_a, &limit_a.clone()));
        assert!(!merge_eq(&limit_a, &limit_b));
    }

    #[test]
    fn eq_log() {
        let ssh = Stmt::Log(LogStmt::with_prefix("ssh"));
        let telnet = Stmt::Log(LogStmt::with_prefix("telnet"));
        let bare = Stmt::Log(LogStmt::new());
        assert!(merge_eq(&ssh, &ssh.clone()));
        assert!(!merge_eq(&ssh, &telnet));
        assert!(!merge_eq(&ssh, &bare));
        assert!(merge_eq(&bare, &bare.clone()));

        let mut grouped = LogStmt::with_prefix("ssh");
        grouped.group = 2;
        assert!(!merge_eq(&ssh, &Stmt::Log(grouped)));
    }

    #[test]
    fn eq_reject() {
        let plain = Stmt::Reject(RejectStmt::new(RejectKind::IcmpUnreach));
        let reset = Stmt::Reject(RejectStmt::new(RejectKind::TcpReset));
        assert!(merge_eq(&plain, &plain.clone()));
        assert!(!merge_eq(&plain, &reset));

        let mut reasoned = RejectStmt::new(RejectKind::IcmpUnreach);
        reasoned.expr = Some(Expr::symbol("host-unreachable"));
        assert!(!merge_eq(&plain, &Stmt::Reject(reasoned.clone())));
        assert!(!merge_eq(&Stmt::Reject(reasoned.clone()), &Stmt::Reject(reasoned)));
    }

    #[test]
    fn eq_unsupported_kind_never_equal() {
        let queue = Stmt::Queue(QueueStmt { num: 0 });
        assert!(!merge_eq(&queue, &queue.clone()));
    }

    #[test]
    fn eq_cell_nullability() {
        let stmt = tcp_dport(22);
        assert!(stmt_eq(None, None));
        assert!(!stmt_eq(Some(&stmt), None));
        assert!(!stmt_eq(None, Some(&stmt)));
        assert!(stmt_eq(Some(&stmt), Some(&tcp_dport(23))));
    }
}
