//! services/api/src/web/protocol.rs
//!
//! Defines the WebSocket message protocol between the console and the API server
//! for the live presence board.

use serde::{Deserialize, Serialize};

use crate::web::rest::PresenceResponse;

//=========================================================================================
// Messages Sent FROM the Client (Browser) TO the Server
//=========================================================================================

/// Represents the structured text messages a client can send to the server.
#[derive(Deserialize, Debug, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Switches the board to another `YYYY-MM-DD` day.
    SelectDay { day: String },

    /// Replaces the roster filter. Both fields absent means everyone.
    SetFilter {
        #[serde(default)]
        class: Option<String>,
        #[serde(default)]
        level: Option<String>,
    },
}

//=========================================================================================
// Messages Sent FROM the Server TO the Client (Browser)
//=========================================================================================

/// Represents the structured text messages the server can send to the client.
#[derive(Serialize, Debug)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// A freshly recomputed presence partition. Sent on connect and after every change.
    Snapshot { presence: PresenceResponse },

    /// A client message was rejected; the board keeps its previous day and filter.
    Error { message: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_tagged_client_messages() {
        let select: ClientMessage =
            serde_json::from_str(r#"{"type":"select_day","day":"2024-03-01"}"#).unwrap();
        assert_eq!(
            select,
            ClientMessage::SelectDay {
                day: "2024-03-01".to_string()
            }
        );

        let filter: ClientMessage =
            serde_json::from_str(r#"{"type":"set_filter","level":"secondary"}"#).unwrap();
        assert_eq!(
            filter,
            ClientMessage::SetFilter {
                class: None,
                level: Some("secondary".to_string())
            }
        );
    }

    #[test]
    fn error_message_is_tagged() {
        let json = serde_json::to_value(ServerMessage::Error {
            message: "bad day".to_string(),
        })
        .unwrap();
        assert_eq!(json["type"], "error");
        assert_eq!(json["message"], "bad day");
    }
}
