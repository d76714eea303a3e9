//! Wire protocol between peers.
//!
//! Messages are single text frames, except BLOCK whose payload is raw bytes.
//! There is no length prefix; framing is one message per connection, read
//! until the sender closes its write half.
//!
//! Decoding is total: any byte input maps to one of the five messages,
//! [`Decoded::Invalid`] (recognized command, malformed remainder), or
//! [`Decoded::Unknown`] (unrecognized leading token).

use bytes::{BufMut, Bytes, BytesMut};

const CMD_GET: &str = "GET";
const CMD_LIST: &str = "LIST";
const CMD_BLOCK: &[u8] = b"BLOCK";
const CMD_BLOCKS: &str = "BLOCKS";
const CMD_ERROR: &str = "ERROR";

/// A well-formed protocol message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    /// Request one block by index.
    Get(u32),
    /// Request the responder's block index list.
    List,
    /// A block payload. The payload is raw bytes and may contain spaces,
    /// newlines, or NULs; it is always the final component of the frame.
    Block { index: u32, data: Bytes },
    /// The responder's block indices, ascending.
    Blocks(Vec<u32>),
    /// An error description.
    Error(String),
}

/// Outcome of decoding a frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decoded {
    /// A well-formed message.
    Message(Message),
    /// Recognized command with a malformed remainder.
    Invalid,
    /// Unrecognized leading token.
    Unknown,
}

impl Message {
    /// Encodes the message into a single wire frame.
    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::new();
        match self {
            Message::Get(index) => {
                buf.put_slice(format!("{CMD_GET} {index}").as_bytes());
            }
            Message::List => {
                buf.put_slice(CMD_LIST.as_bytes());
            }
            Message::Block { index, data } => {
                buf.put_slice(CMD_BLOCK);
                buf.put_slice(format!(" {index} ").as_bytes());
                buf.put_slice(data);
            }
            Message::Blocks(indices) => {
                let mut sorted = indices.clone();
                sorted.sort_unstable();
                let list: Vec<String> = sorted.iter().map(|i| i.to_string()).collect();
                buf.put_slice(format!("{CMD_BLOCKS} {}", list.join(",")).as_bytes());
            }
            Message::Error(text) => {
                buf.put_slice(format!("{CMD_ERROR} {text}").as_bytes());
            }
        }
        buf.freeze()
    }
}

/// Decodes a single wire frame. Never panics.
pub fn decode(data: &[u8]) -> Decoded {
    // BLOCK carries a binary payload, so it is matched on raw bytes before
    // any UTF-8 interpretation.
    if is_block_frame(data) {
        return decode_block(data);
    }

    let Ok(text) = std::str::from_utf8(data) else {
        return Decoded::Invalid;
    };

    // Only the command token tolerates surrounding whitespace; the remainder
    // after the first space belongs to the message and is never trimmed here.
    let (token, rest) = match text.split_once(' ') {
        Some((token, rest)) => (token, Some(rest)),
        None => (text.trim_end(), None),
    };

    match token {
        CMD_GET => decode_get(rest),
        CMD_LIST => match rest {
            None => Decoded::Message(Message::List),
            Some(rest) if rest.trim().is_empty() => Decoded::Message(Message::List),
            Some(_) => Decoded::Invalid,
        },
        CMD_BLOCKS => decode_blocks(rest.unwrap_or("")),
        // ERROR text is carried verbatim, whitespace included.
        CMD_ERROR => Decoded::Message(Message::Error(rest.unwrap_or("").to_string())),
        _ => Decoded::Unknown,
    }
}

fn is_block_frame(data: &[u8]) -> bool {
    match data.strip_prefix(CMD_BLOCK) {
        Some(rest) => rest.first() == Some(&b' '),
        None => false,
    }
}

fn decode_block(data: &[u8]) -> Decoded {
    // BLOCK <index> <payload>, payload may be empty or absent.
    let rest = &data[CMD_BLOCK.len() + 1..];
    let (index_bytes, payload) = match rest.iter().position(|&b| b == b' ') {
        Some(pos) => (&rest[..pos], &rest[pos + 1..]),
        None => (rest, &[][..]),
    };

    let Some(index) = parse_index(index_bytes) else {
        return Decoded::Invalid;
    };
    Decoded::Message(Message::Block {
        index,
        data: Bytes::copy_from_slice(payload),
    })
}

fn decode_get(rest: Option<&str>) -> Decoded {
    let Some(arg) = rest else {
        return Decoded::Invalid;
    };
    match parse_index(arg.trim().as_bytes()) {
        Some(index) => Decoded::Message(Message::Get(index)),
        None => Decoded::Invalid,
    }
}

fn decode_blocks(rest: &str) -> Decoded {
    let rest = rest.trim();
    if rest.is_empty() {
        return Decoded::Message(Message::Blocks(Vec::new()));
    }

    let mut indices = Vec::new();
    for part in rest.split(',') {
        match parse_index(part.as_bytes()) {
            Some(index) => indices.push(index),
            None => return Decoded::Invalid,
        }
    }
    Decoded::Message(Message::Blocks(indices))
}

fn parse_index(bytes: &[u8]) -> Option<u32> {
    if bytes.is_empty() || !bytes.iter().all(|b| b.is_ascii_digit()) {
        return None;
    }
    std::str::from_utf8(bytes).ok()?.parse().ok()
}
