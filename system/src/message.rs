use crate::{PageNumber, RoomId, Tool};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MessageError {
    #[error("malformed message: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("room id must not be empty")]
    EmptyRoomId,
    #[error("page number must be 1 or greater, got {0}")]
    InvalidPageNumber(u32),
    #[error("missing field `{0}`")]
    MissingField(&'static str),
    #[error("invalid stroke size `{0}`")]
    InvalidStrokeSize(String),
}

/// Ingress. One variant per event name the browser client emits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum ClientMessage {
    #[serde(rename = "join room")]
    JoinRoom(RoomId),
    #[serde(rename = "draw")]
    Draw(Draw),
    #[serde(rename = "clear")]
    Clear(RoomId),
    #[serde(rename = "pageChange")]
    PageChange(PageChange),
    #[serde(rename = "addWhitePage")]
    AddWhitePage(WhitePage),
}

impl ClientMessage {
    pub fn from_json(text: &str) -> Result<Self, MessageError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self, MessageError> {
        Ok(serde_json::from_slice(bytes)?)
    }

    pub fn to_json(&self) -> Result<String, MessageError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn room_id(&self) -> &RoomId {
        match self {
            Self::JoinRoom(room_id) | Self::Clear(room_id) => room_id,
            Self::Draw(draw) => &draw.room_id,
            Self::PageChange(page_change) => &page_change.room_id,
            Self::AddWhitePage(white_page) => &white_page.room_id,
        }
    }
}

/// Egress. Room ids are consumed by the relay and never sent back out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum ServerMessage {
    #[serde(rename = "draw")]
    Draw(DrawCommand),
    #[serde(rename = "clear")]
    Clear,
    #[serde(rename = "pageChange")]
    PageChange(PageChanged),
    #[serde(rename = "addWhitePage")]
    AddWhitePage(Map<String, Value>),
    /// Sent only to the connection whose frame failed validation.
    #[serde(rename = "rejected")]
    Rejected(Rejection),
}

impl ServerMessage {
    pub fn rejected(error: &MessageError) -> Self {
        Self::Rejected(Rejection {
            reason: error.to_string(),
        })
    }

    pub fn from_json(text: &str) -> Result<Self, MessageError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn to_json(&self) -> Result<String, MessageError> {
        Ok(serde_json::to_string(self)?)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Draw {
    #[serde(rename = "roomId")]
    pub room_id: RoomId,
    #[serde(flatten)]
    pub command: DrawCommand,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "DrawWire", into = "DrawWire")]
pub enum DrawCommand {
    Stroke(StrokePoint),
    /// Pen lifted: the next point must not be connected to the previous one.
    PenUp,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StrokePoint {
    pub x: f64,
    pub y: f64,
    pub tool: Tool,
    pub color: String,
    pub size: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageChange {
    #[serde(rename = "roomId")]
    pub room_id: RoomId,
    #[serde(rename = "pageNum")]
    pub page_num: PageNumber,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageChanged {
    #[serde(rename = "pageNum")]
    pub page_num: PageNumber,
}

/// `addWhitePage` carries whatever the client attaches; only the room id is read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WhitePage {
    #[serde(rename = "roomId")]
    pub room_id: RoomId,
    #[serde(flatten)]
    pub page: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rejection {
    pub reason: String,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DrawWire {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    x: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    y: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tool: Option<Tool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    size: Option<StrokeSize>,
    is_new_stroke: bool,
}

// Range inputs in the browser report their value as a string.
#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum StrokeSize {
    Number(f64),
    Text(String),
}

impl StrokeSize {
    fn into_f64(self) -> Result<f64, MessageError> {
        match self {
            Self::Number(size) => Ok(size),
            Self::Text(text) => text
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|size| size.is_finite())
                .ok_or(MessageError::InvalidStrokeSize(text)),
        }
    }
}

impl TryFrom<DrawWire> for DrawCommand {
    type Error = MessageError;

    fn try_from(wire: DrawWire) -> Result<Self, Self::Error> {
        if wire.is_new_stroke {
            return Ok(Self::PenUp);
        }
        Ok(Self::Stroke(StrokePoint {
            x: wire.x.ok_or(MessageError::MissingField("x"))?,
            y: wire.y.ok_or(MessageError::MissingField("y"))?,
            tool: wire.tool.ok_or(MessageError::MissingField("tool"))?,
            color: wire.color.ok_or(MessageError::MissingField("color"))?,
            size: wire
                .size
                .ok_or(MessageError::MissingField("size"))?
                .into_f64()?,
        }))
    }
}

impl From<DrawCommand> for DrawWire {
    fn from(command: DrawCommand) -> Self {
        match command {
            DrawCommand::PenUp => Self {
                x: None,
                y: None,
                tool: None,
                color: None,
                size: None,
                is_new_stroke: true,
            },
            DrawCommand::Stroke(point) => Self {
                x: Some(point.x),
                y: Some(point.y),
                tool: Some(point.tool),
                color: Some(point.color),
                size: Some(StrokeSize::Number(point.size)),
                is_new_stroke: false,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn it_should_ignore_stroke_fields_on_pen_up() {
        let command: DrawCommand =
            serde_json::from_value(json!({ "isNewStroke": true, "x": 3 })).expect("");
        assert_eq!(command, DrawCommand::PenUp);
        assert_eq!(
            serde_json::to_value(&command).expect(""),
            json!({ "isNewStroke": true })
        );
    }

    #[test]
    fn it_should_accept_stroke_size_as_numeric_string() {
        let command: DrawCommand = serde_json::from_value(json!({
            "x": 1, "y": 2, "tool": "pen", "color": "#000000", "size": "5", "isNewStroke": false
        }))
        .expect("");
        match command {
            DrawCommand::Stroke(point) => assert_eq!(point.size, 5.0),
            DrawCommand::PenUp => panic!("expected a stroke point"),
        }
    }

    #[test]
    fn it_should_reject_non_numeric_stroke_size() {
        let result = serde_json::from_value::<DrawCommand>(json!({
            "x": 1, "y": 2, "tool": "pen", "color": "#000000", "size": "big", "isNewStroke": false
        }));
        assert!(result.is_err());
    }

    #[test]
    fn it_should_name_missing_stroke_field() {
        let error = ClientMessage::from_json(
            r#"{"event":"draw","data":{"roomId":"r1","x":1,"tool":"pen","color":"red","size":2,"isNewStroke":false}}"#,
        )
        .expect_err("y is missing");
        assert!(error.to_string().contains("`y`"), "{}", error);
    }

    #[test]
    fn it_should_report_room_id_of_every_variant() {
        let message = ClientMessage::from_json(r#"{"event":"clear","data":"r9"}"#).expect("");
        assert_eq!(message.room_id().as_str(), "r9");
    }
}
