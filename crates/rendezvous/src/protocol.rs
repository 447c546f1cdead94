//! The bootstrap rendezvous wire format: ASCII messages framed as
//! `LLLL payload`, where `LLLL` is the four-digit decimal length of the
//! whole message (length field, the separating space, and the payload).
//!
//! Grounded on `bootstrap/bootstrap.go`: `Register`/`Unregister` build this
//! exact framing (`fmt.Sprintf("%04d %s", len(msg)+5, msg)`), and `listen()`
//! parses replies the same way in reverse.

use crate::error::{Error, Result};

/// Registration outcome, exactly `bootstrap.go`'s `RegisterStatus` consts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum RegisterStatus {
    Ok = 0,
    OkOne = 1,
    OkTwo = 2,
    BsFull = 9996,
    AddrRegistered = 9997,
    AlreadyRegistered = 9998,
    InvalidCommand = 9999,
}

impl RegisterStatus {
    fn from_code(code: i32) -> Result<Self> {
        match code {
            0 => Ok(Self::Ok),
            1 => Ok(Self::OkOne),
            2 => Ok(Self::OkTwo),
            9996 => Ok(Self::BsFull),
            9997 => Ok(Self::AddrRegistered),
            9998 => Ok(Self::AlreadyRegistered),
            9999 => Ok(Self::InvalidCommand),
            other => Err(Error::Malformed(format!("unknown register status {other}"))),
        }
    }

    /// Any of `{0,1,2}` counts as success, per the joining peer's rule.
    pub fn is_success(self) -> bool {
        matches!(self, Self::Ok | Self::OkOne | Self::OkTwo)
    }
}

/// Deregistration outcome, `bootstrap.go`'s `UnregisterStatus` consts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum UnregisterStatus {
    Ok = 0,
    Error = 9999,
}

impl UnregisterStatus {
    fn from_code(code: i32) -> Result<Self> {
        match code {
            0 => Ok(Self::Ok),
            9999 => Ok(Self::Error),
            other => Err(Error::Malformed(format!("unknown unregister status {other}"))),
        }
    }
}

/// A peer address as carried in a `REG`/`REGOK` message: `ip port`, two
/// whitespace-separated tokens rather than `ip:port`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerAddr {
    pub ip: String,
    pub port: u16,
}

impl std::fmt::Display for PeerAddr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.ip, self.port)
    }
}

fn frame(payload: &str) -> String {
    // +5: the 4-digit length field plus the separating space.
    format!("{:04} {}", payload.len() + 5, payload)
}

pub fn encode_register(ip: &str, port: u16, username: &str) -> String {
    frame(&format!("REG {ip} {port} {username}"))
}

pub fn encode_unregister(ip: &str, port: u16, username: &str) -> String {
    frame(&format!("UNREG {ip} {port} {username}"))
}

pub fn encode_register_reply(status: RegisterStatus, peers: &[PeerAddr]) -> String {
    let mut payload = format!("REGOK {}", status as i32);
    for peer in peers {
        payload.push_str(&format!(" {} {}", peer.ip, peer.port));
    }
    frame(&payload)
}

pub fn encode_unregister_reply(status: UnregisterStatus) -> String {
    frame(&format!("UNROK {}", status as i32))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    Register { ip: String, port: u16, username: String },
    Unregister { ip: String, port: u16, username: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    RegisterOk { status: RegisterStatus, peers: Vec<PeerAddr> },
    UnregisterOk { status: UnregisterStatus },
}

/// Strips and validates the `LLLL ` length prefix, returning the tokens of
/// the payload that follows.
fn tokenize(raw: &str) -> Result<Vec<&str>> {
    let mut tokens = raw.split(' ');
    let len_token = tokens.next().ok_or_else(|| Error::Malformed("empty message".into()))?;
    let declared_len: usize = len_token
        .parse()
        .map_err(|_| Error::Malformed(format!("non-numeric length prefix {len_token:?}")))?;
    if declared_len != raw.len() {
        return Err(Error::Malformed(format!(
            "declared length {declared_len} does not match actual length {}",
            raw.len()
        )));
    }
    Ok(tokens.collect())
}

/// Parses a raw `REG`/`UNREG` request, as the server receives it.
pub fn parse_request(raw: &str) -> Result<Request> {
    let tokens = tokenize(raw)?;
    match tokens.as_slice() {
        ["REG", ip, port, username] => Ok(Request::Register {
            ip: ip.to_string(),
            port: parse_port(port)?,
            username: username.to_string(),
        }),
        ["UNREG", ip, port, username] => Ok(Request::Unregister {
            ip: ip.to_string(),
            port: parse_port(port)?,
            username: username.to_string(),
        }),
        _ => Err(Error::Malformed(format!("unrecognized request: {raw:?}"))),
    }
}

/// Parses a raw `REGOK`/`UNROK` reply, as the joining peer receives it.
pub fn parse_reply(raw: &str) -> Result<Reply> {
    let tokens = tokenize(raw)?;
    match tokens.as_slice() {
        ["REGOK", status, rest @ ..] => {
            let status = RegisterStatus::from_code(parse_code(status)?)?;
            let peers = rest
                .chunks(2)
                .map(|pair| match pair {
                    [ip, port] => Ok(PeerAddr {
                        ip: ip.to_string(),
                        port: parse_port(port)?,
                    }),
                    _ => Err(Error::Malformed(format!("dangling peer token in {raw:?}"))),
                })
                .collect::<Result<Vec<_>>>()?;
            Ok(Reply::RegisterOk { status, peers })
        }
        ["UNROK", status] => Ok(Reply::UnregisterOk {
            status: UnregisterStatus::from_code(parse_code(status)?)?,
        }),
        _ => Err(Error::Malformed(format!("unrecognized reply: {raw:?}"))),
    }
}

fn parse_port(s: &str) -> Result<u16> {
    s.parse().map_err(|_| Error::Malformed(format!("invalid port {s:?}")))
}

fn parse_code(s: &str) -> Result<i32> {
    s.parse().map_err(|_| Error::Malformed(format!("invalid status code {s:?}")))
}
