//! The expression tree rules are built from.
//!
//! Selector expressions (payload, extension header, meta, conntrack, route,
//! socket) name *what* a match statement tests; value expressions carry the
//! comparand. Sets and concatenations are the compound forms the optimizer
//! constructs when it folds a run of rules into a single set lookup.

use std::fmt;
use std::net::{Ipv4Addr, Ipv6Addr};

use ipnet::{Ipv4Net, Ipv6Net};
use itertools::Itertools;
use num_bigint::BigUint;

/// Protocol header a payload expression reads from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PayloadHdr {
    Ether,
    Vlan,
    Ip,
    Ip6,
    Icmp,
    Icmp6,
    Tcp,
    Udp,
    Sctp,
}

impl fmt::Display for PayloadHdr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PayloadHdr::Ether => "ether",
            PayloadHdr::Vlan => "vlan",
            PayloadHdr::Ip => "ip",
            PayloadHdr::Ip6 => "ip6",
            PayloadHdr::Icmp => "icmp",
            PayloadHdr::Icmp6 => "icmpv6",
            PayloadHdr::Tcp => "tcp",
            PayloadHdr::Udp => "udp",
            PayloadHdr::Sctp => "sctp",
        };
        write!(f, "{}", name)
    }
}

/// Field template within a payload header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PayloadField {
    Saddr,
    Daddr,
    Sport,
    Dport,
    Protocol,
    Nexthdr,
    Ttl,
    Hoplimit,
    Type,
    Code,
    Flags,
    Length,
}

impl fmt::Display for PayloadField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PayloadField::Saddr => "saddr",
            PayloadField::Daddr => "daddr",
            PayloadField::Sport => "sport",
            PayloadField::Dport => "dport",
            PayloadField::Protocol => "protocol",
            PayloadField::Nexthdr => "nexthdr",
            PayloadField::Ttl => "ttl",
            PayloadField::Hoplimit => "hoplimit",
            PayloadField::Type => "type",
            PayloadField::Code => "code",
            PayloadField::Flags => "flags",
            PayloadField::Length => "length",
        };
        write!(f, "{}", name)
    }
}

/// IPv6 extension header an exthdr expression reads from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExtHdrKind {
    Hbh,
    Rt,
    Frag,
    Dst,
    Mh,
}

impl fmt::Display for ExtHdrKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ExtHdrKind::Hbh => "hbh",
            ExtHdrKind::Rt => "rt",
            ExtHdrKind::Frag => "frag",
            ExtHdrKind::Dst => "dst",
            ExtHdrKind::Mh => "mh",
        };
        write!(f, "{}", name)
    }
}

/// Field template within an extension header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExtHdrField {
    Nexthdr,
    Hdrlength,
    Id,
}

impl fmt::Display for ExtHdrField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ExtHdrField::Nexthdr => "nexthdr",
            ExtHdrField::Hdrlength => "hdrlength",
            ExtHdrField::Id => "id",
        };
        write!(f, "{}", name)
    }
}

/// Packet metadata key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetaKey {
    Iifname,
    Oifname,
    Iif,
    Oif,
    Mark,
    Priority,
    Protocol,
    L4proto,
    Skuid,
    Skgid,
    Cpu,
}

impl MetaKey {
    /// Keys whose textual form omits the `meta` keyword.
    fn is_unqualified(&self) -> bool {
        matches!(
            self,
            MetaKey::Iifname | MetaKey::Oifname | MetaKey::Iif | MetaKey::Oif
        )
    }
}

impl fmt::Display for MetaKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MetaKey::Iifname => "iifname",
            MetaKey::Oifname => "oifname",
            MetaKey::Iif => "iif",
            MetaKey::Oif => "oif",
            MetaKey::Mark => "mark",
            MetaKey::Priority => "priority",
            MetaKey::Protocol => "protocol",
            MetaKey::L4proto => "l4proto",
            MetaKey::Skuid => "skuid",
            MetaKey::Skgid => "skgid",
            MetaKey::Cpu => "cpu",
        };
        write!(f, "{}", name)
    }
}

/// Connection-tracking key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CtKey {
    State,
    Direction,
    Status,
    Mark,
    Expiration,
    Helper,
    Label,
    Bytes,
    Packets,
    Saddr,
    Daddr,
    ProtoSrc,
    ProtoDst,
}

impl fmt::Display for CtKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CtKey::State => "state",
            CtKey::Direction => "direction",
            CtKey::Status => "status",
            CtKey::Mark => "mark",
            CtKey::Expiration => "expiration",
            CtKey::Helper => "helper",
            CtKey::Label => "label",
            CtKey::Bytes => "bytes",
            CtKey::Packets => "packets",
            CtKey::Saddr => "saddr",
            CtKey::Daddr => "daddr",
            CtKey::ProtoSrc => "proto-src",
            CtKey::ProtoDst => "proto-dst",
        };
        write!(f, "{}", name)
    }
}

/// Flow direction qualifier for a conntrack key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CtDir {
    Original,
    Reply,
}

impl fmt::Display for CtDir {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CtDir::Original => write!(f, "original"),
            CtDir::Reply => write!(f, "reply"),
        }
    }
}

/// Network-protocol qualifier for address-valued conntrack keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NfProto {
    Ipv4,
    Ipv6,
}

/// Routing information key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RtKey {
    ClassId,
    NextHop,
    Mtu,
    Ipsec,
}

impl fmt::Display for RtKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RtKey::ClassId => "classid",
            RtKey::NextHop => "nexthop",
            RtKey::Mtu => "mtu",
            RtKey::Ipsec => "ipsec",
        };
        write!(f, "{}", name)
    }
}

/// Originating-socket key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SocketKey {
    Transparent,
    Mark,
    Wildcard,
    Cgroupv2,
}

impl fmt::Display for SocketKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SocketKey::Transparent => "transparent",
            SocketKey::Mark => "mark",
            SocketKey::Wildcard => "wildcard",
            SocketKey::Cgroupv2 => "cgroupv2",
        };
        write!(f, "{}", name)
    }
}

/// Header layer a selector reads its data from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProtoBase {
    LinkHdr,
    NetworkHdr,
    TransportHdr,
}

/// Relational operator of a match statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RelOp {
    Eq,
    Neq,
    Lt,
    Gt,
    Lte,
    Gte,
}

impl fmt::Display for RelOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RelOp::Eq => "==",
            RelOp::Neq => "!=",
            RelOp::Lt => "<",
            RelOp::Gt => ">",
            RelOp::Lte => "<=",
            RelOp::Gte => ">=",
        };
        write!(f, "{}", name)
    }
}

/// An immediate value: the right-hand comparand of a match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    /// Arbitrary-precision integer constant.
    Num(BigUint),
    Ipv4(Ipv4Net),
    Ipv6(Ipv6Net),
    /// Identifier string, e.g. an interface or chain name.
    Symbol(String),
}

impl Value {
    pub fn num(n: u64) -> Value {
        Value::Num(BigUint::from(n))
    }

    pub fn symbol(name: &str) -> Value {
        Value::Symbol(name.to_owned())
    }

    pub fn ipv4(addr: Ipv4Addr) -> Value {
        Value::Ipv4(Ipv4Net::from(addr))
    }

    pub fn ipv6(addr: Ipv6Addr) -> Value {
        Value::Ipv6(Ipv6Net::from(addr))
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Num(n) => write!(f, "{}", n),
            // host addresses print without the redundant full-length prefix
            Value::Ipv4(net) if net.prefix_len() == net.max_prefix_len() => {
                write!(f, "{}", net.addr())
            }
            Value::Ipv4(net) => write!(f, "{}", net),
            Value::Ipv6(net) if net.prefix_len() == net.max_prefix_len() => {
                write!(f, "{}", net.addr())
            }
            Value::Ipv6(net) => write!(f, "{}", net),
            Value::Symbol(name) => write!(f, "\"{}\"", name),
        }
    }
}

/// One node of the expression tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
    /// Packet header field, e.g. `tcp dport`.
    Payload { hdr: PayloadHdr, field: PayloadField },
    /// IPv6 extension header field, e.g. `frag id`.
    ExtHdr { hdr: ExtHdrKind, field: ExtHdrField },
    /// Packet metadata, e.g. `iifname`.
    Meta {
        key: MetaKey,
        base: Option<ProtoBase>,
    },
    /// Connection-tracking state, e.g. `ct original saddr`.
    Ct {
        key: CtKey,
        base: Option<ProtoBase>,
        direction: Option<CtDir>,
        nfproto: Option<NfProto>,
    },
    /// Routing information, e.g. `rt mtu`.
    Rt { key: RtKey },
    /// Originating socket, e.g. `socket cgroupv2`.
    Socket { key: SocketKey, level: u32 },
    /// Immediate value.
    Value(Value),
    /// Inline set of elements; `anonymous` sets have no name and live only
    /// inside the rule that uses them.
    Set { elems: Vec<Expr>, anonymous: bool },
    /// One element of a set.
    SetElem(Box<Expr>),
    /// Ordered tuple of sub-expressions, matched jointly.
    Concat(Vec<Expr>),
}

impl Expr {
    pub fn payload(hdr: PayloadHdr, field: PayloadField) -> Expr {
        Expr::Payload { hdr, field }
    }

    pub fn exthdr(hdr: ExtHdrKind, field: ExtHdrField) -> Expr {
        Expr::ExtHdr { hdr, field }
    }

    pub fn meta(key: MetaKey) -> Expr {
        let base = match key {
            MetaKey::Protocol => Some(ProtoBase::LinkHdr),
            MetaKey::L4proto => Some(ProtoBase::NetworkHdr),
            _ => None,
        };
        Expr::Meta { key, base }
    }

    pub fn ct(key: CtKey) -> Expr {
        let base = match key {
            CtKey::Saddr | CtKey::Daddr => Some(ProtoBase::NetworkHdr),
            CtKey::ProtoSrc | CtKey::ProtoDst => Some(ProtoBase::TransportHdr),
            _ => None,
        };
        Expr::Ct {
            key,
            base,
            direction: None,
            nfproto: None,
        }
    }

    pub fn ct_dir(key: CtKey, direction: CtDir) -> Expr {
        let mut expr = Expr::ct(key);
        if let Expr::Ct { direction: dir, .. } = &mut expr {
            *dir = Some(direction);
        }
        expr
    }

    pub fn num(n: u64) -> Expr {
        Expr::Value(Value::num(n))
    }

    pub fn symbol(name: &str) -> Expr {
        Expr::Value(Value::symbol(name))
    }

    pub fn ipv4(addr: Ipv4Addr) -> Expr {
        Expr::Value(Value::ipv4(addr))
    }

    pub fn ipv6(addr: Ipv6Addr) -> Expr {
        Expr::Value(Value::ipv6(addr))
    }

    /// A fresh anonymous set holding `elems`.
    pub fn anon_set(elems: Vec<Expr>) -> Expr {
        Expr::Set {
            elems,
            anonymous: true,
        }
    }

    /// Wraps `inner` as a set element.
    pub fn set_elem(inner: Expr) -> Expr {
        Expr::SetElem(Box::new(inner))
    }

    /// An ordered tuple of `parts`.
    pub fn concat(parts: Vec<Expr>) -> Expr {
        Expr::Concat(parts)
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Payload { hdr, field } => write!(f, "{} {}", hdr, field),
            Expr::ExtHdr { hdr, field } => write!(f, "{} {}", hdr, field),
            Expr::Meta { key, .. } => {
                if key.is_unqualified() {
                    write!(f, "{}", key)
                } else {
                    write!(f, "meta {}", key)
                }
            }
            Expr::Ct { key, direction, .. } => match direction {
                Some(dir) => write!(f, "ct {} {}", dir, key),
                None => write!(f, "ct {}", key),
            },
            Expr::Rt { key } => write!(f, "rt {}", key),
            Expr::Socket { key, .. } => write!(f, "socket {}", key),
            Expr::Value(value) => write!(f, "{}", value),
            Expr::Set { elems, .. } => write!(f, "{{ {} }}", elems.iter().format(", ")),
            Expr::SetElem(inner) => write!(f, "{}", inner),
            Expr::Concat(parts) => write!(f, "{}", parts.iter().format(" . ")),
        }
    }
}
