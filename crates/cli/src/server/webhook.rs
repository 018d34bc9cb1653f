use super::{ApiError, ServerState};
use crate::channels::ONLY_TEXT_REPLY;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::Json;
use docqa_search::AUTO_LANGUAGE;
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashMap;

/// Meta subscription handshake shared by both platforms.
pub(super) async fn verify(
    State(state): State<ServerState>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<String, ApiError> {
    let mode = params.get("hub.mode").filter(|v| !v.is_empty());
    let token = params.get("hub.verify_token").filter(|v| !v.is_empty());
    let challenge = params.get("hub.challenge");

    let (Some(mode), Some(token)) = (mode, token) else {
        return Err(ApiError::new(StatusCode::BAD_REQUEST, "Missing parameters"));
    };

    if mode != "subscribe" || state.verify_token.as_deref() != Some(token.as_str()) {
        log::warn!("Webhook verification failed: token mismatch");
        return Err(ApiError::new(StatusCode::FORBIDDEN, "Verification failed"));
    }

    let Some(challenge) = challenge else {
        return Err(ApiError::new(StatusCode::BAD_REQUEST, "Missing parameters"));
    };
    log::info!("Webhook verified");
    Ok(challenge.clone())
}

fn received() -> Json<Value> {
    Json(json!({ "status": "received" }))
}

#[derive(Debug, Deserialize)]
struct WhatsAppPayload {
    #[serde(default)]
    entry: Vec<WhatsAppEntry>,
}

#[derive(Debug, Deserialize)]
struct WhatsAppEntry {
    #[serde(default)]
    changes: Vec<WhatsAppChange>,
}

#[derive(Debug, Deserialize)]
struct WhatsAppChange {
    #[serde(default)]
    value: WhatsAppValue,
}

#[derive(Debug, Default, Deserialize)]
struct WhatsAppValue {
    /// Absent for delivery/read status callbacks
    messages: Option<Vec<WhatsAppMessage>>,
}

#[derive(Debug, Deserialize)]
struct WhatsAppMessage {
    from: String,
    #[serde(rename = "type")]
    kind: String,
    text: Option<WhatsAppText>,
}

#[derive(Debug, Deserialize)]
struct WhatsAppText {
    body: String,
}

/// Inbound WhatsApp notification. Acknowledged immediately; answering
/// happens on a spawned task.
pub(super) async fn whatsapp(
    State(state): State<ServerState>,
    Json(body): Json<Value>,
) -> Json<Value> {
    tokio::spawn(async move { process_whatsapp(state, body).await });
    received()
}

async fn process_whatsapp(state: ServerState, body: Value) {
    let payload: WhatsAppPayload = match serde_json::from_value(body) {
        Ok(payload) => payload,
        Err(e) => {
            log::error!("Error parsing WhatsApp payload: {e}");
            return;
        }
    };
    let Some(value) = payload
        .entry
        .into_iter()
        .next()
        .and_then(|entry| entry.changes.into_iter().next())
        .map(|change| change.value)
    else {
        log::error!("Error parsing WhatsApp payload: no entry/changes");
        return;
    };
    let Some(message) = value.messages.and_then(|m| m.into_iter().next()) else {
        log::debug!("Ignoring WhatsApp status update");
        return;
    };

    let reply = match (message.kind.as_str(), message.text) {
        ("text", Some(text)) => {
            log::info!("WhatsApp message from {}", message.from);
            match state.qa.ask(&text.body, AUTO_LANGUAGE).await {
                Ok(answer) => answer,
                Err(e) => {
                    log::error!("Failed to answer WhatsApp message from {}: {e}", message.from);
                    return;
                }
            }
        }
        (kind, _) => {
            log::info!("Received non-text WhatsApp message type: {kind}");
            ONLY_TEXT_REPLY.to_string()
        }
    };

    if let Err(e) = state.sender.send_whatsapp(&message.from, &reply).await {
        log::error!("Failed to send WhatsApp message: {e:#}");
    }
}

#[derive(Debug, Deserialize)]
struct InstagramPayload {
    #[serde(default)]
    entry: Vec<InstagramEntry>,
}

#[derive(Debug, Deserialize)]
struct InstagramEntry {
    #[serde(default)]
    messaging: Vec<InstagramEvent>,
}

#[derive(Debug, Deserialize)]
struct InstagramEvent {
    sender: Option<InstagramUser>,
    message: Option<InstagramMessage>,
}

#[derive(Debug, Deserialize)]
struct InstagramUser {
    id: String,
}

#[derive(Debug, Deserialize)]
struct InstagramMessage {
    text: Option<String>,
}

/// Inbound Instagram messaging events; every text event gets an answer.
pub(super) async fn instagram(
    State(state): State<ServerState>,
    Json(body): Json<Value>,
) -> Json<Value> {
    tokio::spawn(async move { process_instagram(state, body).await });
    received()
}

async fn process_instagram(state: ServerState, body: Value) {
    let payload: InstagramPayload = match serde_json::from_value(body) {
        Ok(payload) => payload,
        Err(e) => {
            log::error!("Error parsing Instagram payload: {e}");
            return;
        }
    };
    let Some(entry) = payload.entry.into_iter().next() else {
        log::error!("Error parsing Instagram payload: no entry");
        return;
    };

    for event in entry.messaging {
        let (Some(sender), Some(text)) = (event.sender, event.message.and_then(|m| m.text)) else {
            log::info!("Received Instagram event without text message");
            continue;
        };

        log::info!("Instagram message from {}", sender.id);
        let answer = match state.qa.ask(&text, AUTO_LANGUAGE).await {
            Ok(answer) => answer,
            Err(e) => {
                log::error!("Failed to answer Instagram message from {}: {e}", sender.id);
                continue;
            }
        };
        if let Err(e) = state.sender.send_instagram(&sender.id, &answer).await {
            log::error!("Failed to send Instagram message: {e:#}");
        }
    }
}
