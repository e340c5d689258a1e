use axum::{body::Bytes, extract::State, http::HeaderMap, response::IntoResponse, Json};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use twilight_model::id::{marker::UserMarker, Id};

use crate::allocator::{DrawOutcome, DrawRefusal};
use crate::discord::messages::{self, COLOR_LINK_EMBED, LINK_BUTTON_ID, LINK_BUTTON_LABEL};
use crate::discord::verify::verify_discord_signature;
use crate::error::{Error, Result};
use crate::AppState;

const PING: u8 = 1;
const APPLICATION_COMMAND: u8 = 2;
const MESSAGE_COMPONENT: u8 = 3;

const PONG: u8 = 1;
const CHANNEL_MESSAGE_WITH_SOURCE: u8 = 4;
const DEFERRED_CHANNEL_MESSAGE_WITH_SOURCE: u8 = 5;

const EPHEMERAL: u32 = 1 << 6;
const ADMINISTRATOR: u64 = 0x8;

pub const SEND_LINK_EMBED: &str = "sendlinkembed";

#[derive(Debug, Deserialize)]
pub struct Interaction {
    #[serde(rename = "type")]
    pub kind: u8,
    pub data: Option<InteractionData>,
    pub member: Option<Member>,
    /// Present instead of `member` when invoked outside a guild
    pub user: Option<User>,
    pub guild_id: Option<String>,
    pub token: String,
    #[allow(dead_code)]
    pub id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InteractionData {
    /// Slash command name
    pub name: Option<String>,
    /// Component custom id
    pub custom_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Member {
    pub user: User,
    pub permissions: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct User {
    pub id: String,
    pub username: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct InteractionResponse {
    #[serde(rename = "type")]
    pub kind: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<ResponseData>,
}

#[derive(Debug, Default, Serialize)]
pub struct ResponseData {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flags: Option<u32>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub embeds: Vec<EmbedData>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub components: Vec<ActionRow>,
}

#[derive(Debug, Serialize)]
pub struct EmbedData {
    pub title: String,
    pub description: String,
    pub color: u32,
}

#[derive(Debug, Serialize)]
pub struct ActionRow {
    #[serde(rename = "type")]
    pub kind: u8,
    pub components: Vec<Button>,
}

#[derive(Debug, Serialize)]
pub struct Button {
    #[serde(rename = "type")]
    pub kind: u8,
    pub style: u8,
    pub label: String,
    pub custom_id: String,
}

/// Who clicked the button.
#[derive(Debug, Clone)]
pub struct Requester {
    pub id: Id<UserMarker>,
    pub tag: String,
}

impl Requester {
    fn from_interaction(interaction: &Interaction) -> Result<Self> {
        let user = interaction
            .member
            .as_ref()
            .map(|m| &m.user)
            .or(interaction.user.as_ref())
            .ok_or(Error::InvalidPayload("missing user".into()))?;

        let id = user
            .id
            .parse::<u64>()
            .ok()
            .and_then(Id::new_checked)
            .ok_or(Error::InvalidPayload("invalid user id".into()))?;

        Ok(Self {
            id,
            tag: user.username.clone().unwrap_or_else(|| user.id.clone()),
        })
    }
}

pub async fn handle_interaction(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse> {
    let signature = headers
        .get("x-signature-ed25519")
        .and_then(|v| v.to_str().ok())
        .ok_or(Error::InvalidSignature)?;
    let timestamp = headers
        .get("x-signature-timestamp")
        .and_then(|v| v.to_str().ok())
        .ok_or(Error::InvalidSignature)?;

    if !verify_discord_signature(
        &state.config.discord_public_key,
        timestamp,
        &body,
        signature,
    ) {
        warn!("invalid discord signature");
        return Err(Error::InvalidSignature);
    }

    let interaction: Interaction =
        serde_json::from_slice(&body).map_err(|e| Error::InvalidPayload(e.to_string()))?;

    let response = match interaction.kind {
        PING => InteractionResponse {
            kind: PONG,
            data: None,
        },
        APPLICATION_COMMAND => handle_command(&state, &interaction).await?,
        MESSAGE_COMPONENT => handle_component(&state, &interaction)?,
        _ => InteractionResponse {
            kind: PONG,
            data: None,
        },
    };

    Ok(Json(response))
}

async fn handle_command(state: &AppState, interaction: &Interaction) -> Result<InteractionResponse> {
    let data = interaction
        .data
        .as_ref()
        .ok_or(Error::InvalidPayload("missing data".into()))?;

    if data.name.as_deref() != Some(SEND_LINK_EMBED) {
        return Ok(ephemeral("Unknown command".to_string()));
    }

    if !is_admin(interaction.member.as_ref()) {
        return Ok(ephemeral(
            "❌ This command requires the Administrator permission.".to_string(),
        ));
    }

    let requester = Requester::from_interaction(interaction)?;
    state
        .audit
        .send(&format!("↩️ {} used by {}", SEND_LINK_EMBED, requester.tag))
        .await;

    Ok(link_embed_response(state))
}

/// The public post carrying the link button.
pub fn link_embed_response(state: &AppState) -> InteractionResponse {
    let (title, description) = messages::format_link_embed(&state.allocator.policy());
    InteractionResponse {
        kind: CHANNEL_MESSAGE_WITH_SOURCE,
        data: Some(ResponseData {
            embeds: vec![EmbedData {
                title,
                description,
                color: COLOR_LINK_EMBED,
            }],
            components: vec![ActionRow {
                kind: 1,
                components: vec![Button {
                    kind: 2,
                    style: 1,
                    label: LINK_BUTTON_LABEL.to_string(),
                    custom_id: LINK_BUTTON_ID.to_string(),
                }],
            }],
            ..ResponseData::default()
        }),
    }
}

fn handle_component(state: &AppState, interaction: &Interaction) -> Result<InteractionResponse> {
    let custom_id = interaction
        .data
        .as_ref()
        .and_then(|d| d.custom_id.as_deref())
        .ok_or(Error::InvalidPayload("missing custom_id".into()))?;

    if custom_id != LINK_BUTTON_ID {
        return Ok(ephemeral("Unknown button".to_string()));
    }

    let requester = Requester::from_interaction(interaction)?;
    let token = interaction.token.clone();
    let state = state.clone();

    // The draw waits on storage and a DM round-trip, so answer within
    // Discord's 3s deadline and fill in the reply afterwards
    tokio::spawn(async move {
        let now = chrono::Utc::now().timestamp_millis();
        let reply = run_draw(&state, &requester, now).await;

        if let Err(e) = state.discord.edit_original_response(&token, &reply).await {
            warn!(user = %requester.id, error = %e, "failed to edit deferred reply");
        }
        state
            .audit
            .send(&format!("↩️ Replied to {}: \"{}\"", requester.tag, reply))
            .await;
    });

    Ok(InteractionResponse {
        kind: DEFERRED_CHANNEL_MESSAGE_WITH_SOURCE,
        data: Some(ResponseData {
            flags: Some(EPHEMERAL),
            ..ResponseData::default()
        }),
    })
}

/// Run one draw for `requester` and deliver the link by DM.
///
/// Returns the text for the requester's ephemeral reply. A DM that cannot be
/// delivered still consumes the draw.
pub async fn run_draw(state: &AppState, requester: &Requester, now: i64) -> String {
    state
        .audit
        .send(&format!("🔘 Button clicked by {} ({})", requester.tag, requester.id))
        .await;

    let user_id = requester.id.to_string();
    let policy = state.allocator.policy();

    let issued = match state.allocator.draw(&user_id, now).await {
        DrawOutcome::Issued(issued) => issued,
        DrawOutcome::Refused(DrawRefusal::CooldownActive { remaining }) => {
            return messages::cooldown_reply(remaining, &policy);
        }
        DrawOutcome::Refused(DrawRefusal::CatalogExhausted) => {
            return messages::exhausted_reply();
        }
    };

    let dm = messages::link_dm(&issued.item, state.config.link_emoji.as_deref());
    match state.discord.send_direct_message(requester.id, &dm).await {
        Ok(()) => {
            info!(user = %requester.id, "link delivered");
            state
                .audit
                .send(&format!("✉️ Sent DM to {}: \"{}\"", requester.tag, dm))
                .await;
            messages::issued_reply(issued.remaining_in_window, &policy)
        }
        Err(e) => {
            warn!(user = %requester.id, error = %e, "could not deliver link");
            state
                .audit
                .send(&format!("⚠️ DM to {} failed: {}", requester.tag, e))
                .await;
            messages::delivery_failed_reply()
        }
    }
}

fn ephemeral(content: String) -> InteractionResponse {
    InteractionResponse {
        kind: CHANNEL_MESSAGE_WITH_SOURCE,
        data: Some(ResponseData {
            content: Some(content),
            flags: Some(EPHEMERAL),
            ..ResponseData::default()
        }),
    }
}

fn is_admin(member: Option<&Member>) -> bool {
    let permissions: u64 = member
        .and_then(|m| m.permissions.as_ref())
        .and_then(|p| p.parse().ok())
        .unwrap_or(0);
    permissions & ADMINISTRATOR != 0
}
