//! Wire protocol — the named events exchanged over the realtime channel.
//!
//! DESIGN
//! ======
//! Every realtime message is a JSON object tagged by `"event"`. Clients send
//! `ClientEvent`s, the gateway dispatches on the variant, and `ServerEvent`s
//! flow back — either as a direct reply (`init`) or through a board's
//! fan-out group (`draw-segment`, `clear-board`). The gateway never inspects
//! payloads beyond deserialization; a frame that fails to parse is dropped.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::state::Segment;

/// Inbound events, client to server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "kebab-case")]
pub enum ClientEvent {
    /// Join a board, switching membership if already joined elsewhere.
    #[serde(rename_all = "camelCase")]
    JoinBoard { board_id: Uuid },
    /// Append one stroke to a board and relay it to the other members.
    #[serde(rename_all = "camelCase")]
    DrawSegment { board_id: Uuid, segment: Segment },
    /// Wipe a board's log for every member.
    #[serde(rename_all = "camelCase")]
    ClearBoard { board_id: Uuid },
}

/// Outbound events, server to client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "kebab-case")]
pub enum ServerEvent {
    /// Full replay log, sent once to a session right after it joins.
    Init { segments: Vec<Segment> },
    /// A stroke drawn by another member of the board.
    DrawSegment { segment: Segment },
    /// The board was cleared. Delivered to every member, sender included.
    ClearBoard,
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::Point;

    fn sample_segment() -> Segment {
        Segment {
            from: Point { x: 0.0, y: 0.0 },
            to: Point { x: 1.0, y: 1.0 },
            color: "#000".into(),
            size: 2.0,
        }
    }

    #[test]
    fn join_board_parses_camel_case_board_id() {
        let board_id = Uuid::new_v4();
        let json = format!(r#"{{"event":"join-board","boardId":"{board_id}"}}"#);
        let event: ClientEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(event, ClientEvent::JoinBoard { board_id });
    }

    #[test]
    fn draw_segment_parses_nested_segment() {
        let board_id = Uuid::new_v4();
        let json = format!(
            r##"{{"event":"draw-segment","boardId":"{board_id}","segment":{{"from":{{"x":0,"y":0}},"to":{{"x":1,"y":1}},"color":"#000","size":2}}}}"##
        );
        let event: ClientEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(event, ClientEvent::DrawSegment { board_id, segment: sample_segment() });
    }

    #[test]
    fn draw_segment_parses_legacy_flat_segment() {
        let board_id = Uuid::new_v4();
        let json = format!(
            r##"{{"event":"draw-segment","boardId":"{board_id}","segment":{{"x0":0,"y0":0,"x1":1,"y1":1,"color":"#000","size":2}}}}"##
        );
        let event: ClientEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(event, ClientEvent::DrawSegment { board_id, segment: sample_segment() });
    }

    #[test]
    fn draw_segment_missing_endpoint_fails_to_parse() {
        let board_id = Uuid::new_v4();
        let json = format!(r#"{{"event":"draw-segment","boardId":"{board_id}","segment":{{"from":{{"x":0,"y":0}}}}}}"#);
        assert!(serde_json::from_str::<ClientEvent>(&json).is_err());
    }

    #[test]
    fn unknown_event_name_fails_to_parse() {
        assert!(serde_json::from_str::<ClientEvent>(r#"{"event":"shout","boardId":"x"}"#).is_err());
    }

    #[test]
    fn init_serializes_with_segments_array() {
        let event = ServerEvent::Init { segments: vec![sample_segment()] };
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["event"], "init");
        assert_eq!(value["segments"].as_array().map(Vec::len), Some(1));
    }

    #[test]
    fn clear_board_serializes_as_bare_tag() {
        let value = serde_json::to_value(ServerEvent::ClearBoard).unwrap();
        assert_eq!(value, serde_json::json!({"event": "clear-board"}));
    }

    #[test]
    fn server_event_round_trip() {
        let original = ServerEvent::DrawSegment { segment: sample_segment() };
        let json = serde_json::to_string(&original).unwrap();
        let restored: ServerEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, original);
    }
}
