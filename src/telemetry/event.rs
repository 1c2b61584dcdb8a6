use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

use crate::time::Timestamp;

// Wire shape: flat JSON objects, camelCase keys, discriminated by
// `methodName` (game loop) or `type` (everything else).

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum TelemetryEvent {
    GameLoop(GameLoopRecord),
    Span(SpanRecord),
    UserDefined(UserDefinedRecord),
    UserInput(UserInputRecord),
    GameState(GameStateRecord),
    Entity(EntityRecord),
    Error(ErrorRecord),
}

impl TelemetryEvent {
    pub fn id(&self) -> Uuid {
        match self {
            TelemetryEvent::GameLoop(r) => r.id,
            TelemetryEvent::Span(r) => r.id,
            TelemetryEvent::UserDefined(r) => r.id,
            TelemetryEvent::UserInput(r) => r.id,
            TelemetryEvent::GameState(r) => r.id,
            TelemetryEvent::Entity(r) => r.id,
            TelemetryEvent::Error(r) => r.id,
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum GameLoopPhase {
    #[serde(rename = "gameloop enter")]
    Enter,
    #[serde(rename = "gameloop exit")]
    Exit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SpanPhase {
    Enter,
    Exit,
}

/// Fixed `type` discriminators of the one-shot events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum EventKind {
    UserDefinedEvent,
    UserInputEvent,
    GameState,
    EntityEvent,
    ErrorEvent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum InputType {
    Keyboard,
    Mouse,
    Touch,
    Gamepad,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GameLoopRecord {
    pub method_name: GameLoopPhase,
    pub id: Uuid,
    pub ts: Timestamp,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpanRecord {
    pub method_name: String,
    #[serde(rename = "type")]
    pub phase: SpanPhase,
    pub id: Uuid,
    #[serde(rename = "gameloopID", skip_serializing_if = "Option::is_none")]
    pub gameloop_id: Option<Uuid>,
    pub ts: Timestamp,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDefinedRecord {
    pub method_name: String,
    #[serde(rename = "type")]
    pub kind: EventKind,
    pub id: Uuid,
    pub payload: Vec<Value>,
    pub ts: Timestamp,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserInputRecord {
    pub method_name: String,
    #[serde(rename = "type")]
    pub kind: EventKind,
    pub event_type: InputType,
    pub event_name: String,
    pub id: Uuid,
    pub payload: Vec<Value>,
    pub ts: Timestamp,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GameStateRecord {
    #[serde(rename = "type")]
    pub kind: EventKind,
    pub id: Uuid,
    pub state: Value,
    pub ts: Timestamp,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntityRecord {
    #[serde(rename = "type")]
    pub kind: EventKind,
    pub id: Uuid,
    pub entity: Value,
    pub event: Value,
    pub ts: Timestamp,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorRecord {
    #[serde(rename = "type")]
    pub kind: EventKind,
    pub id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    pub payload: Vec<Value>,
    pub ts: Timestamp,
}

impl TelemetryEvent {
    pub fn game_loop(phase: GameLoopPhase, id: Uuid, ts: Timestamp, duration: Option<f64>) -> Self {
        TelemetryEvent::GameLoop(GameLoopRecord { method_name: phase, id, ts, duration })
    }

    pub fn span(
        label: &str,
        phase: SpanPhase,
        id: Uuid,
        gameloop_id: Option<Uuid>,
        ts: Timestamp,
        duration: Option<f64>,
    ) -> Self {
        TelemetryEvent::Span(SpanRecord {
            method_name: label.to_string(),
            phase,
            id,
            gameloop_id,
            ts,
            duration,
        })
    }

    pub fn user_defined(label: &str, payload: Vec<Value>, ts: Timestamp) -> Self {
        TelemetryEvent::UserDefined(UserDefinedRecord {
            method_name: label.to_string(),
            kind: EventKind::UserDefinedEvent,
            id: Uuid::new_v4(),
            payload,
            ts,
        })
    }

    pub fn user_input(
        input_type: InputType,
        label: &str,
        event_name: &str,
        payload: Vec<Value>,
        ts: Timestamp,
    ) -> Self {
        TelemetryEvent::UserInput(UserInputRecord {
            method_name: label.to_string(),
            kind: EventKind::UserInputEvent,
            event_type: input_type,
            event_name: event_name.to_string(),
            id: Uuid::new_v4(),
            payload,
            ts,
        })
    }

    pub fn game_state(state: Value, ts: Timestamp) -> Self {
        TelemetryEvent::GameState(GameStateRecord {
            kind: EventKind::GameState,
            id: Uuid::new_v4(),
            state,
            ts,
        })
    }

    pub fn entity(entity: Value, event: Value, ts: Timestamp) -> Self {
        TelemetryEvent::Entity(EntityRecord {
            kind: EventKind::EntityEvent,
            id: Uuid::new_v4(),
            entity,
            event,
            ts,
        })
    }

    pub fn error(error_message: Option<String>, payload: Vec<Value>, ts: Timestamp) -> Self {
        TelemetryEvent::Error(ErrorRecord {
            kind: EventKind::ErrorEvent,
            id: Uuid::new_v4(),
            error_message,
            payload,
            ts,
        })
    }
}
