//! `MessageData` envelope: the signed payload of every social-protocol
//! message.
//!
//! Only the fields the escrow consumes are modeled; everything else is
//! skipped on decode. Field numbers:
//!
//! ```text
//! MessageData   1 type  2 fid  3 timestamp  4 network
//!               5 cast_add_body  6 cast_remove_body  7 reaction_body
//! CastAddBody   1 embeds_deprecated  2 mentions  3 parent_cast_id  4 text
//!               5 mentions_positions  6 embeds  7 parent_url
//! Embed         1 url  2 cast_id
//! CastId        1 fid  2 hash
//! ReactionBody  1 type  2 target_cast_id  3 target_url
//! CastRemoveBody 1 target_hash
//! ```

use serde::{Deserialize, Serialize};

use crate::fingerprint::MessageHash;
use crate::wire::{Reader, Writer};

/// Errors from decoding a serialized envelope.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    #[error("message truncated")]
    Truncated,
    #[error("varint exceeds 64 bits")]
    VarintOverflow,
    #[error("unsupported wire type {0}")]
    UnsupportedWireType(u64),
    #[error("invalid field number")]
    InvalidFieldNumber,
    #[error("wrong wire type for field {field}")]
    WrongWireType { field: u32 },
    #[error("field {field} is not valid UTF-8")]
    InvalidUtf8 { field: u32 },
    #[error("cast hash must be 20 bytes, got {0}")]
    InvalidHashLength(usize),
    #[error("value of field {field} out of range")]
    OutOfRange { field: u32 },
}

/// Message kind tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MessageType {
    None,
    CastAdd,
    CastRemove,
    ReactionAdd,
    ReactionRemove,
    LinkAdd,
    LinkRemove,
    VerificationAddEthAddress,
    VerificationRemove,
    UserDataAdd,
    UsernameProof,
    /// A tag this decoder does not know; enums are open on the wire.
    Unknown(u64),
}

impl From<u64> for MessageType {
    fn from(tag: u64) -> Self {
        match tag {
            0 => Self::None,
            1 => Self::CastAdd,
            2 => Self::CastRemove,
            3 => Self::ReactionAdd,
            4 => Self::ReactionRemove,
            5 => Self::LinkAdd,
            6 => Self::LinkRemove,
            7 => Self::VerificationAddEthAddress,
            8 => Self::VerificationRemove,
            11 => Self::UserDataAdd,
            12 => Self::UsernameProof,
            other => Self::Unknown(other),
        }
    }
}

impl From<MessageType> for u64 {
    fn from(kind: MessageType) -> Self {
        match kind {
            MessageType::None => 0,
            MessageType::CastAdd => 1,
            MessageType::CastRemove => 2,
            MessageType::ReactionAdd => 3,
            MessageType::ReactionRemove => 4,
            MessageType::LinkAdd => 5,
            MessageType::LinkRemove => 6,
            MessageType::VerificationAddEthAddress => 7,
            MessageType::VerificationRemove => 8,
            MessageType::UserDataAdd => 11,
            MessageType::UsernameProof => 12,
            MessageType::Unknown(other) => other,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Network {
    None,
    Mainnet,
    Testnet,
    Devnet,
    Unknown(u64),
}

impl From<u64> for Network {
    fn from(tag: u64) -> Self {
        match tag {
            0 => Self::None,
            1 => Self::Mainnet,
            2 => Self::Testnet,
            3 => Self::Devnet,
            other => Self::Unknown(other),
        }
    }
}

impl From<Network> for u64 {
    fn from(network: Network) -> Self {
        match network {
            Network::None => 0,
            Network::Mainnet => 1,
            Network::Testnet => 2,
            Network::Devnet => 3,
            Network::Unknown(other) => other,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReactionType {
    None,
    Like,
    Recast,
    Unknown(u64),
}

impl From<u64> for ReactionType {
    fn from(tag: u64) -> Self {
        match tag {
            0 => Self::None,
            1 => Self::Like,
            2 => Self::Recast,
            other => Self::Unknown(other),
        }
    }
}

impl From<ReactionType> for u64 {
    fn from(kind: ReactionType) -> Self {
        match kind {
            ReactionType::None => 0,
            ReactionType::Like => 1,
            ReactionType::Recast => 2,
            ReactionType::Unknown(other) => other,
        }
    }
}

/// Reference to a cast: its author and fingerprint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CastId {
    pub fid: u64,
    pub hash: MessageHash,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Embed {
    Url(String),
    Cast(CastId),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Parent {
    Cast(CastId),
    Url(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CastAddBody {
    /// Legacy string embeds, kept so re-encoding preserves them.
    pub embeds_deprecated: Vec<String>,
    pub text: String,
    pub mentions: Vec<u64>,
    pub mentions_positions: Vec<u32>,
    pub parent: Option<Parent>,
    pub embeds: Vec<Embed>,
}

impl CastAddBody {
    /// The first embedded cast, which makes this cast a quote of it.
    pub fn quoted_cast(&self) -> Option<&CastId> {
        self.embeds.iter().find_map(|embed| match embed {
            Embed::Cast(id) => Some(id),
            Embed::Url(_) => None,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReactionTarget {
    Cast(CastId),
    Url(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReactionBody {
    pub kind: ReactionType,
    pub target: Option<ReactionTarget>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Body {
    CastAdd(CastAddBody),
    CastRemove { target_hash: Vec<u8> },
    Reaction(ReactionBody),
}

/// A decoded envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageData {
    pub kind: MessageType,
    pub fid: u64,
    pub timestamp: u32,
    pub network: Network,
    pub body: Option<Body>,
}

impl MessageData {
    /// Decode an envelope. Fails without side effects on malformed input.
    pub fn decode(bytes: &[u8]) -> Result<Self, DecodeError> {
        let mut kind = MessageType::None;
        let mut fid = 0;
        let mut timestamp = 0;
        let mut network = Network::None;
        let mut body = None;

        let mut reader = Reader::new(bytes);
        while let Some((field, value)) = reader.next_field()? {
            match field {
                1 => kind = MessageType::from(value.as_varint(field)?),
                2 => fid = value.as_varint(field)?,
                3 => {
                    timestamp = u32::try_from(value.as_varint(field)?)
                        .map_err(|_| DecodeError::OutOfRange { field })?;
                }
                4 => network = Network::from(value.as_varint(field)?),
                5 => body = Some(Body::CastAdd(decode_cast_add(value.as_bytes(field)?)?)),
                6 => {
                    body = Some(Body::CastRemove {
                        target_hash: decode_cast_remove(value.as_bytes(field)?)?,
                    });
                }
                7 => body = Some(Body::Reaction(decode_reaction(value.as_bytes(field)?)?)),
                _ => {}
            }
        }

        Ok(Self {
            kind,
            fid,
            timestamp,
            network,
            body,
        })
    }

    /// The body, when it is a cast-add and the kind tag agrees.
    pub fn cast_add(&self) -> Option<&CastAddBody> {
        match (&self.kind, &self.body) {
            (MessageType::CastAdd, Some(Body::CastAdd(body))) => Some(body),
            _ => None,
        }
    }

    /// The cast this message recasts or quotes, if it does either.
    ///
    /// Only a recast reaction with a cast target, or a cast-add embedding a
    /// cast, qualifies. Likes, replies and URL targets do not.
    pub fn qualifying_target(&self) -> Option<&CastId> {
        match (&self.kind, &self.body) {
            (MessageType::ReactionAdd, Some(Body::Reaction(reaction)))
                if reaction.kind == ReactionType::Recast =>
            {
                match &reaction.target {
                    Some(ReactionTarget::Cast(id)) => Some(id),
                    Some(ReactionTarget::Url(_)) | None => None,
                }
            }
            (MessageType::CastAdd, Some(Body::CastAdd(cast))) => cast.quoted_cast(),
            _ => None,
        }
    }

    /// Encode in field declaration order, the layout hubs produce.
    pub fn encode_to_vec(&self) -> Vec<u8> {
        let mut w = Writer::new();
        w.varint(1, self.kind.into());
        w.varint(2, self.fid);
        w.varint(3, u64::from(self.timestamp));
        w.varint(4, self.network.into());
        match &self.body {
            Some(Body::CastAdd(cast)) => w.message(5, encode_cast_add(cast)),
            Some(Body::CastRemove { target_hash }) => {
                let mut inner = Writer::new();
                inner.bytes_if_present(1, target_hash);
                w.message(6, inner);
            }
            Some(Body::Reaction(reaction)) => w.message(7, encode_reaction(reaction)),
            None => {}
        }
        w.into_bytes()
    }
}

fn decode_cast_id(bytes: &[u8]) -> Result<CastId, DecodeError> {
    let mut fid = 0;
    let mut hash: &[u8] = &[];
    let mut reader = Reader::new(bytes);
    while let Some((field, value)) = reader.next_field()? {
        match field {
            1 => fid = value.as_varint(field)?,
            2 => hash = value.as_bytes(field)?,
            _ => {}
        }
    }
    let hash = MessageHash::from_slice(hash).ok_or(DecodeError::InvalidHashLength(hash.len()))?;
    Ok(CastId { fid, hash })
}

fn decode_embed(bytes: &[u8]) -> Result<Option<Embed>, DecodeError> {
    let mut embed = None;
    let mut reader = Reader::new(bytes);
    while let Some((field, value)) = reader.next_field()? {
        match field {
            1 => embed = Some(Embed::Url(value.as_str(field)?.to_owned())),
            2 => embed = Some(Embed::Cast(decode_cast_id(value.as_bytes(field)?)?)),
            _ => {}
        }
    }
    Ok(embed)
}

fn decode_cast_add(bytes: &[u8]) -> Result<CastAddBody, DecodeError> {
    let mut body = CastAddBody::default();
    let mut positions = Vec::new();
    let mut reader = Reader::new(bytes);
    while let Some((field, value)) = reader.next_field()? {
        match field {
            1 => body.embeds_deprecated.push(value.as_str(field)?.to_owned()),
            2 => value.push_varints(field, &mut body.mentions)?,
            3 => body.parent = Some(Parent::Cast(decode_cast_id(value.as_bytes(field)?)?)),
            4 => body.text = value.as_str(field)?.to_owned(),
            5 => value.push_varints(field, &mut positions)?,
            6 => {
                if let Some(embed) = decode_embed(value.as_bytes(field)?)? {
                    body.embeds.push(embed);
                }
            }
            7 => body.parent = Some(Parent::Url(value.as_str(field)?.to_owned())),
            _ => {}
        }
    }
    body.mentions_positions = positions
        .into_iter()
        .map(|p| u32::try_from(p).map_err(|_| DecodeError::OutOfRange { field: 5 }))
        .collect::<Result<_, _>>()?;
    Ok(body)
}

fn decode_cast_remove(bytes: &[u8]) -> Result<Vec<u8>, DecodeError> {
    let mut target = Vec::new();
    let mut reader = Reader::new(bytes);
    while let Some((field, value)) = reader.next_field()? {
        if field == 1 {
            target = value.as_bytes(field)?.to_vec();
        }
    }
    Ok(target)
}

fn decode_reaction(bytes: &[u8]) -> Result<ReactionBody, DecodeError> {
    let mut kind = ReactionType::None;
    let mut target = None;
    let mut reader = Reader::new(bytes);
    while let Some((field, value)) = reader.next_field()? {
        match field {
            1 => kind = ReactionType::from(value.as_varint(field)?),
            2 => target = Some(ReactionTarget::Cast(decode_cast_id(value.as_bytes(field)?)?)),
            3 => target = Some(ReactionTarget::Url(value.as_str(field)?.to_owned())),
            _ => {}
        }
    }
    Ok(ReactionBody { kind, target })
}

fn encode_cast_id(id: &CastId) -> Writer {
    let mut w = Writer::new();
    w.varint(1, id.fid);
    w.bytes(2, id.hash.as_bytes());
    w
}

fn encode_cast_add(cast: &CastAddBody) -> Writer {
    let mut w = Writer::new();
    for embed in &cast.embeds_deprecated {
        w.bytes(1, embed.as_bytes());
    }
    w.packed_varints(2, &cast.mentions);
    // The parent oneof is declared between fields 2 and 4.
    match &cast.parent {
        Some(Parent::Cast(id)) => w.message(3, encode_cast_id(id)),
        Some(Parent::Url(url)) => w.bytes(7, url.as_bytes()),
        None => {}
    }
    w.bytes_if_present(4, cast.text.as_bytes());
    let positions: Vec<u64> = cast.mentions_positions.iter().map(|&p| u64::from(p)).collect();
    w.packed_varints(5, &positions);
    for embed in &cast.embeds {
        let mut inner = Writer::new();
        match embed {
            Embed::Url(url) => inner.bytes(1, url.as_bytes()),
            Embed::Cast(id) => inner.message(2, encode_cast_id(id)),
        }
        w.message(6, inner);
    }
    w
}

fn encode_reaction(reaction: &ReactionBody) -> Writer {
    let mut w = Writer::new();
    w.varint(1, reaction.kind.into());
    match &reaction.target {
        Some(ReactionTarget::Cast(id)) => w.message(2, encode_cast_id(id)),
        Some(ReactionTarget::Url(url)) => w.bytes(3, url.as_bytes()),
        None => {}
    }
    w
}

/// Decode an envelope; see [`MessageData::decode`].
pub fn decode(bytes: &[u8]) -> Result<MessageData, DecodeError> {
    MessageData::decode(bytes)
}
