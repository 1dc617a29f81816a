// Event channel wire codec: Engine.IO v4 / Socket.IO v4 text frames.
//
// Only the subset the auction client needs is handled: the open handshake,
// heartbeat ping/pong, namespace connect, and event packets on the default
// namespace. Binary attachments are not used by the auction server.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::model::{Amount, LiveAuctionState};

/// Errors raised while decoding a frame received from the event channel.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("empty frame")]
    Empty,

    #[error("unknown packet type {0:?}")]
    UnknownPacketType(char),

    #[error("malformed JSON in {context}: {source}")]
    MalformedJson {
        context: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("unexpected packet shape: {0}")]
    UnexpectedShape(String),
}

/// Parameters announced by the server in the Engine.IO open packet.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenHandshake {
    pub sid: String,
    /// Milliseconds between server pings.
    pub ping_interval: u64,
    /// Milliseconds the server waits for a pong.
    pub ping_timeout: u64,
}

impl OpenHandshake {
    /// How long the session may stay silent before it is considered lost.
    pub fn liveness_window(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.ping_interval + self.ping_timeout)
    }
}

/// A single decoded text frame.
#[derive(Debug, Clone, PartialEq)]
pub enum Packet {
    Open(OpenHandshake),
    Close,
    Ping,
    Pong,
    Noop,
    /// Namespace connect. Inbound carries the socket id; outbound is bare.
    Connect(Option<String>),
    Disconnect,
    Event { name: String, args: Vec<Value> },
    ConnectError(String),
}

impl Packet {
    /// Encode the packet as a text frame. Outbound frames never carry an
    /// ack id.
    pub fn encode(&self) -> String {
        match self {
            Packet::Open(_) => "0".to_string(),
            Packet::Close => "1".to_string(),
            Packet::Ping => "2".to_string(),
            Packet::Pong => "3".to_string(),
            Packet::Noop => "6".to_string(),
            Packet::Connect(_) => "40".to_string(),
            Packet::Disconnect => "41".to_string(),
            Packet::Event { name, args } => {
                let mut arr = Vec::with_capacity(args.len() + 1);
                arr.push(Value::String(name.clone()));
                arr.extend(args.iter().cloned());
                format!("42{}", Value::Array(arr))
            }
            Packet::ConnectError(msg) => {
                format!("44{}", serde_json::json!({ "message": msg }))
            }
        }
    }

    /// Decode one text frame.
    pub fn decode(frame: &str) -> Result<Packet, ProtocolError> {
        let mut chars = frame.chars();
        let engine = chars.next().ok_or(ProtocolError::Empty)?;
        let rest = &frame[engine.len_utf8()..];

        match engine {
            '0' => {
                let open: OpenHandshake =
                    serde_json::from_str(rest).map_err(|source| ProtocolError::MalformedJson {
                        context: "open packet",
                        source,
                    })?;
                Ok(Packet::Open(open))
            }
            '1' => Ok(Packet::Close),
            '2' => Ok(Packet::Ping),
            '3' => Ok(Packet::Pong),
            '6' => Ok(Packet::Noop),
            '4' => decode_message(rest),
            other => Err(ProtocolError::UnknownPacketType(other)),
        }
    }
}

fn decode_message(body: &str) -> Result<Packet, ProtocolError> {
    let mut chars = body.chars();
    let kind = chars
        .next()
        .ok_or_else(|| ProtocolError::UnexpectedShape("message packet without type".into()))?;
    let mut rest = &body[kind.len_utf8()..];

    // Namespaced packets look like `42/admin,[...]`; only the default
    // namespace is joined, so the prefix is skipped.
    if rest.starts_with('/') {
        rest = match rest.find(',') {
            Some(idx) => &rest[idx + 1..],
            None => "",
        };
    }

    // Optional ack id.
    let json_start = rest
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(rest.len());
    let rest = &rest[json_start..];

    match kind {
        '0' => {
            if rest.is_empty() {
                return Ok(Packet::Connect(None));
            }
            let v: Value = serde_json::from_str(rest).map_err(|source| {
                ProtocolError::MalformedJson {
                    context: "connect packet",
                    source,
                }
            })?;
            let sid = v.get("sid").and_then(Value::as_str).map(str::to_string);
            Ok(Packet::Connect(sid))
        }
        '1' => Ok(Packet::Disconnect),
        '2' | '3' => {
            let v: Value =
                serde_json::from_str(rest).map_err(|source| ProtocolError::MalformedJson {
                    context: "event packet",
                    source,
                })?;
            let mut arr = match v {
                Value::Array(arr) => arr,
                other => {
                    return Err(ProtocolError::UnexpectedShape(format!(
                        "event body is not an array: {other}"
                    )))
                }
            };
            if arr.is_empty() {
                return Err(ProtocolError::UnexpectedShape("event without name".into()));
            }
            let name = match arr.remove(0) {
                Value::String(s) => s,
                other => {
                    return Err(ProtocolError::UnexpectedShape(format!(
                        "event name is not a string: {other}"
                    )))
                }
            };
            Ok(Packet::Event { name, args: arr })
        }
        '4' => {
            let msg = serde_json::from_str::<Value>(rest)
                .ok()
                .and_then(|v| v.get("message").and_then(Value::as_str).map(str::to_string))
                .unwrap_or_else(|| rest.to_string());
            Ok(Packet::ConnectError(msg))
        }
        other => Err(ProtocolError::UnknownPacketType(other)),
    }
}

// ---------------------------------------------------------------------------
// Client intents
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct StartPlayerPayload<'a> {
    auction_id: &'a str,
    player_id: &'a str,
    base_price: Amount,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PlaceBidPayload<'a> {
    auction_id: &'a str,
    team_id: &'a str,
    amount: Amount,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AuctionScope<'a> {
    auction_id: &'a str,
}

/// Client-to-server intents. The server owns every effect; an intent only
/// asks for one.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientIntent {
    JoinAuction {
        auction_id: String,
    },
    StartPlayer {
        auction_id: String,
        player_id: String,
        base_price: Amount,
    },
    PlaceBid {
        auction_id: String,
        team_id: String,
        amount: Amount,
    },
    UndoBid {
        auction_id: String,
    },
    SellPlayer {
        auction_id: String,
    },
    UnsellPlayer {
        auction_id: String,
    },
    TogglePause {
        auction_id: String,
    },
    ResetRound {
        auction_id: String,
    },
    /// Ask every subscriber to re-fetch its snapshot.
    RequestRefresh,
}

impl ClientIntent {
    pub fn event_name(&self) -> &'static str {
        match self {
            ClientIntent::JoinAuction { .. } => "join_auction",
            ClientIntent::StartPlayer { .. } => "start_player",
            ClientIntent::PlaceBid { .. } => "place_bid",
            ClientIntent::UndoBid { .. } => "undo_bid",
            ClientIntent::SellPlayer { .. } => "sell_player",
            ClientIntent::UnsellPlayer { .. } => "unsell_player",
            ClientIntent::TogglePause { .. } => "toggle_pause",
            ClientIntent::ResetRound { .. } => "reset_round",
            ClientIntent::RequestRefresh => "data_update",
        }
    }

    /// Encode as a Socket.IO event frame. Payload keys keep their declared
    /// order and amounts stay integers.
    pub fn to_frame(&self) -> String {
        let name = self.event_name();
        let encoded = match self {
            ClientIntent::JoinAuction { auction_id } => serde_json::to_string(&(name, auction_id)),
            ClientIntent::StartPlayer {
                auction_id,
                player_id,
                base_price,
            } => serde_json::to_string(&(
                name,
                StartPlayerPayload {
                    auction_id,
                    player_id,
                    base_price: *base_price,
                },
            )),
            ClientIntent::PlaceBid {
                auction_id,
                team_id,
                amount,
            } => serde_json::to_string(&(
                name,
                PlaceBidPayload {
                    auction_id,
                    team_id,
                    amount: *amount,
                },
            )),
            ClientIntent::UndoBid { auction_id }
            | ClientIntent::SellPlayer { auction_id }
            | ClientIntent::UnsellPlayer { auction_id }
            | ClientIntent::TogglePause { auction_id }
            | ClientIntent::ResetRound { auction_id } => {
                serde_json::to_string(&(name, AuctionScope { auction_id }))
            }
            ClientIntent::RequestRefresh => serde_json::to_string(&[name]),
        };
        // Serializing string/integer-only payloads cannot fail.
        format!("42{}", encoded.unwrap_or_default())
    }
}

// ---------------------------------------------------------------------------
// Server events
// ---------------------------------------------------------------------------

/// Server-to-client events the client reacts to.
#[derive(Debug, Clone, PartialEq)]
pub enum ServerEvent {
    /// Something changed; re-fetch the snapshot.
    DataUpdate,
    /// Live state replaced wholesale.
    AuctionState(LiveAuctionState),
}

impl ServerEvent {
    /// Interpret an event packet. Unknown event names yield `Ok(None)`.
    pub fn from_event(name: &str, args: &[Value]) -> Result<Option<ServerEvent>, ProtocolError> {
        match name {
            "data_update" => Ok(Some(ServerEvent::DataUpdate)),
            "auction_state" => {
                let payload = args.first().ok_or_else(|| {
                    ProtocolError::UnexpectedShape("auction_state without payload".into())
                })?;
                let state: LiveAuctionState = serde_json::from_value(payload.clone()).map_err(
                    |source| ProtocolError::MalformedJson {
                        context: "auction_state payload",
                        source,
                    },
                )?;
                Ok(Some(ServerEvent::AuctionState(state)))
            }
            _ => Ok(None),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
