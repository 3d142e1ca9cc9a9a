//! HTTP routes.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, patch, post},
    Json, Router,
};
use std::sync::Arc;
use talebound_domain::{
    Character, CharacterId, CharacterPatch, CharacterSetup, DiceParseError, DiceRoll, GameSession,
    Message, Player, SessionId,
};
use talebound_shared::{
    ActionOutcomeResponse, CharacterCreatedResponse, CharacterDto, CreateCharacterRequest,
    ErrorCode, ErrorResponse, HealthResponse, JoinSessionRequest, JoinSessionResponse,
    MessageDto, PlayerDto, RollDiceRequest, SessionDto, SessionStateResponse,
    SubmitActionRequest, UpdateCharacterRequest,
};
use uuid::Uuid;

use crate::app::App;
use crate::infrastructure::ports::RepoError;
use crate::use_cases::character::CharacterError;
use crate::use_cases::session::{AuthError, SessionError};
use crate::use_cases::turn::{ActionOutcome, TurnError};

/// Create all HTTP routes.
pub fn routes() -> Router<Arc<App>> {
    Router::new()
        .route("/", get(health))
        .route("/api/health", get(health))
        .route("/api/sessions", post(create_session))
        .route("/api/sessions/by-code/{code}", get(get_session_by_code))
        .route("/api/sessions/by-code/{code}/join", post(join_session))
        .route("/api/sessions/{id}/state", get(get_session_state))
        .route("/api/sessions/{id}/characters", post(create_character))
        .route("/api/sessions/{id}/actions", post(submit_action))
        .route("/api/sessions/{id}/opening", post(force_opening))
        .route("/api/characters/{id}", patch(update_character))
        .route("/api/dice/roll", post(roll_dice))
}

async fn health(State(app): State<Arc<App>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        generator_configured: app.generator_configured,
    })
}

// =============================================================================
// Sessions
// =============================================================================

async fn create_session(
    State(app): State<Arc<App>>,
) -> Result<(StatusCode, Json<SessionDto>), ApiError> {
    let session = app.use_cases.session.create.execute().await?;
    Ok((StatusCode::CREATED, Json(session_dto(&session))))
}

async fn get_session_by_code(
    State(app): State<Arc<App>>,
    Path(code): Path<String>,
) -> Result<Json<SessionDto>, ApiError> {
    let session = app.use_cases.session.get_by_code.execute(&code).await?;
    Ok(Json(session_dto(&session)))
}

async fn join_session(
    State(app): State<Arc<App>>,
    Path(code): Path<String>,
    body: Result<Json<JoinSessionRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<JoinSessionResponse>), ApiError> {
    let Json(request) = body?;
    let joined = app
        .use_cases
        .session
        .join
        .execute(&code, &request.name)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(JoinSessionResponse {
            session: session_dto(&joined.session),
            player: player_dto(&joined.player),
            token: joined.player.token,
        }),
    ))
}

async fn get_session_state(
    State(app): State<Arc<App>>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionStateResponse>, ApiError> {
    let state = app
        .use_cases
        .session
        .get_state
        .execute(SessionId::from_uuid(id))
        .await?;

    Ok(Json(SessionStateResponse {
        session: session_dto(&state.session),
        players: state.players.iter().map(player_dto).collect(),
        characters: state.characters.iter().map(character_dto).collect(),
        messages: state.messages.iter().map(message_dto).collect(),
    }))
}

// =============================================================================
// Characters
// =============================================================================

async fn create_character(
    State(app): State<Arc<App>>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
    body: Result<Json<CreateCharacterRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<CharacterCreatedResponse>), ApiError> {
    let Json(request) = body?;
    let setup = CharacterSetup {
        name: request.name,
        race: request.race,
        class: request.class,
        max_hp: request.max_hp,
        max_mp: request.max_mp,
        attributes: request.attributes,
        inventory: request.inventory,
        abilities: request.abilities,
    };

    let created = app
        .use_cases
        .character
        .create
        .execute(SessionId::from_uuid(id), bearer_token(&headers), setup)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(CharacterCreatedResponse {
            character: character_dto(&created.character),
            opening: created.opening.as_ref().map(message_dto),
        }),
    ))
}

async fn update_character(
    State(app): State<Arc<App>>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
    body: Result<Json<UpdateCharacterRequest>, JsonRejection>,
) -> Result<Json<CharacterDto>, ApiError> {
    let Json(request) = body?;
    let patch = CharacterPatch {
        name: request.name,
        race: request.race,
        class: request.class,
        level: request.level,
        xp: request.xp,
        xp_to_next_level: request.xp_to_next_level,
        hp: request.hp,
        mp: request.mp,
        attributes: request.attributes,
        inventory: request.inventory,
        status_effects: request.status_effects,
        abilities: request.abilities,
    };

    let character = app
        .use_cases
        .character
        .update
        .execute(CharacterId::from_uuid(id), bearer_token(&headers), patch)
        .await?;
    Ok(Json(character_dto(&character)))
}

// =============================================================================
// Round cycle
// =============================================================================

async fn submit_action(
    State(app): State<Arc<App>>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
    body: Result<Json<SubmitActionRequest>, JsonRejection>,
) -> Result<Json<ActionOutcomeResponse>, ApiError> {
    let Json(request) = body?;
    let outcome = app
        .use_cases
        .turn
        .submit_action
        .execute(
            SessionId::from_uuid(id),
            bearer_token(&headers),
            &request.content,
            request.dice_roll,
        )
        .await?;

    Ok(Json(match outcome {
        ActionOutcome::Waiting { turn, waiting_for } => {
            ActionOutcomeResponse::Waiting { turn, waiting_for }
        }
        ActionOutcome::Narrated {
            turn,
            message,
            fallback,
        } => ActionOutcomeResponse::Narrated {
            turn,
            message: message_dto(&message),
            fallback,
        },
    }))
}

async fn force_opening(
    State(app): State<Arc<App>>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
) -> Result<(StatusCode, Json<MessageDto>), ApiError> {
    let outcome = app
        .use_cases
        .turn
        .force_opening
        .execute(SessionId::from_uuid(id), bearer_token(&headers))
        .await?;
    Ok((StatusCode::CREATED, Json(message_dto(&outcome.message))))
}

async fn roll_dice(
    State(app): State<Arc<App>>,
    body: Result<Json<RollDiceRequest>, JsonRejection>,
) -> Result<Json<DiceRoll>, ApiError> {
    let Json(request) = body?;
    let roll = app.use_cases.dice.execute(&request.notation)?;
    Ok(Json(roll))
}

// =============================================================================
// Conversions
// =============================================================================

/// Token from `Authorization: Bearer <token>`, if present.
fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?.trim();
    let (scheme, token) = value.split_once(' ')?;
    scheme
        .eq_ignore_ascii_case("bearer")
        .then_some(token.trim())
        .filter(|t| !t.is_empty())
}

fn session_dto(session: &GameSession) -> SessionDto {
    SessionDto {
        id: session.id().to_uuid(),
        join_code: session.join_code().as_str().to_string(),
        turn: session.turn(),
        phase: session.phase(),
        created_at: session.created_at(),
        last_activity_at: session.last_activity_at(),
    }
}

fn player_dto(player: &Player) -> PlayerDto {
    PlayerDto {
        id: player.id.to_uuid(),
        session_id: player.session_id.to_uuid(),
        name: player.name.clone(),
        has_acted: player.has_acted,
        joined_at: player.joined_at,
    }
}

fn character_dto(character: &Character) -> CharacterDto {
    CharacterDto {
        id: character.id.to_uuid(),
        player_id: character.player_id.to_uuid(),
        session_id: character.session_id.to_uuid(),
        name: character.name.clone(),
        race: character.race.clone(),
        class: character.class.clone(),
        level: character.level,
        xp: character.xp,
        xp_to_next_level: character.xp_to_next_level,
        hp: character.hp,
        mp: character.mp,
        attributes: character.attributes.clone(),
        inventory: character.inventory.clone(),
        status_effects: character.status_effects.clone(),
        abilities: character.abilities.clone(),
        created_at: character.created_at,
        updated_at: character.updated_at,
    }
}

fn message_dto(message: &Message) -> MessageDto {
    MessageDto {
        id: message.id.to_uuid(),
        session_id: message.session_id.to_uuid(),
        player_id: message.player_id.map(|id| id.to_uuid()),
        role: message.role,
        author_name: message.author_name.clone(),
        content: message.content.clone(),
        dice_roll: message.dice_roll.clone(),
        state_updates: message.state_updates.clone(),
        created_at: message.created_at,
    }
}

// =============================================================================
// Errors
// =============================================================================

#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Unauthorized(String),
    Forbidden(String),
    NotFound(String),
    Conflict(String),
    SessionFull,
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, ErrorCode::BadRequest, msg),
            ApiError::Unauthorized(msg) => {
                (StatusCode::UNAUTHORIZED, ErrorCode::Unauthorized, msg)
            }
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, ErrorCode::Forbidden, msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, ErrorCode::NotFound, msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, ErrorCode::Conflict, msg),
            ApiError::SessionFull => (
                StatusCode::CONFLICT,
                ErrorCode::SessionFull,
                "Session is full".to_string(),
            ),
            ApiError::Internal(detail) => {
                tracing::error!(error = %detail, "Request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorCode::InternalError,
                    "Internal server error".to_string(),
                )
            }
        };
        (status, Json(ErrorResponse { code, message })).into_response()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(e: JsonRejection) -> Self {
        ApiError::BadRequest(e.body_text())
    }
}

impl From<RepoError> for ApiError {
    fn from(e: RepoError) -> Self {
        ApiError::Internal(e.to_string())
    }
}

impl From<DiceParseError> for ApiError {
    fn from(e: DiceParseError) -> Self {
        ApiError::BadRequest(e.to_string())
    }
}

impl From<AuthError> for ApiError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::MissingToken | AuthError::InvalidToken => {
                ApiError::Unauthorized(e.to_string())
            }
            AuthError::WrongSession => ApiError::Forbidden(e.to_string()),
            AuthError::Repo(e) => e.into(),
        }
    }
}

impl From<SessionError> for ApiError {
    fn from(e: SessionError) -> Self {
        match e {
            SessionError::Validation(msg) => ApiError::BadRequest(msg),
            SessionError::NotFound => ApiError::NotFound(e.to_string()),
            SessionError::SessionFull => ApiError::SessionFull,
            SessionError::Repo(e) => e.into(),
        }
    }
}

impl From<CharacterError> for ApiError {
    fn from(e: CharacterError) -> Self {
        match e {
            CharacterError::Validation(msg) => ApiError::BadRequest(msg),
            CharacterError::NotFound => ApiError::NotFound(e.to_string()),
            CharacterError::AlreadyExists => ApiError::Conflict(e.to_string()),
            CharacterError::Auth(e) => e.into(),
            CharacterError::Repo(e) => e.into(),
        }
    }
}

impl From<TurnError> for ApiError {
    fn from(e: TurnError) -> Self {
        match e {
            TurnError::Validation(msg) => ApiError::BadRequest(msg),
            TurnError::SessionNotFound => ApiError::NotFound(e.to_string()),
            TurnError::AlreadyActed | TurnError::Busy | TurnError::OpeningExists => {
                ApiError::Conflict(e.to_string())
            }
            TurnError::Auth(e) => e.into(),
            TurnError::Narration(e) => ApiError::Internal(e.to_string()),
            TurnError::Repo(e) => e.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_fixtures::{create_request, mira_setup, test_app, ScriptedLlm};
    use axum::body::Body;
    use axum::http::Request;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    async fn call(
        app: &Arc<App>,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut request = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            request = request.header(AUTHORIZATION, format!("Bearer {token}"));
        }
        let body = match body {
            Some(json) => {
                request = request.header("content-type", "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };

        let response = routes()
            .with_state(app.clone())
            .oneshot(request.body(body).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, json)
    }

    async fn create_and_join(app: &Arc<App>, name: &str) -> (String, String, String) {
        let (_, session) = call(app, "POST", "/api/sessions", None, None).await;
        let code = session["joinCode"].as_str().unwrap().to_string();
        let (status, joined) = call(
            app,
            "POST",
            &format!("/api/sessions/by-code/{}/join", code.to_lowercase()),
            None,
            Some(json!({ "name": name })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        (
            session["id"].as_str().unwrap().to_string(),
            code,
            joined["token"].as_str().unwrap().to_string(),
        )
    }

    #[test]
    fn bearer_token_parsing() {
        let mut headers = HeaderMap::new();
        assert_eq!(bearer_token(&headers), None);
        headers.insert(AUTHORIZATION, "bearer abc123".parse().unwrap());
        assert_eq!(bearer_token(&headers), Some("abc123"));
        headers.insert(AUTHORIZATION, "Basic abc123".parse().unwrap());
        assert_eq!(bearer_token(&headers), None);
        headers.insert(AUTHORIZATION, "Bearer   ".parse().unwrap());
        assert_eq!(bearer_token(&headers), None);
    }

    #[tokio::test]
    async fn health_reports_generator() {
        let (app, _dir) = test_app(ScriptedLlm::silent()).await;
        let (status, body) = call(&app, "GET", "/api/health", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["generatorConfigured"], true);
    }

    #[tokio::test]
    async fn create_fetch_and_join_session() {
        let (app, _dir) = test_app(ScriptedLlm::silent()).await;
        let (session_id, code, token) = create_and_join(&app, "Ash").await;
        assert_eq!(token.len(), talebound_domain::TOKEN_LENGTH);

        let (status, body) = call(
            &app,
            "GET",
            &format!("/api/sessions/by-code/{code}"),
            None,
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["id"], session_id.as_str());
        assert_eq!(body["turn"], 1);
        assert_eq!(body["phase"], "awaiting-actions");

        let (status, body) = call(&app, "GET", "/api/sessions/by-code/ZZZZZZ", None, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["code"], "NOT_FOUND");
    }

    #[tokio::test]
    async fn third_player_gets_session_full() {
        let (app, _dir) = test_app(ScriptedLlm::silent()).await;
        let (_, code, _) = create_and_join(&app, "Ash").await;
        let join = format!("/api/sessions/by-code/{code}/join");

        let (status, _) = call(&app, "POST", &join, None, Some(json!({ "name": "Brin" }))).await;
        assert_eq!(status, StatusCode::CREATED);
        let (status, body) =
            call(&app, "POST", &join, None, Some(json!({ "name": "Cato" }))).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["code"], "SESSION_FULL");
    }

    #[tokio::test]
    async fn state_never_exposes_tokens() {
        let (app, _dir) = test_app(ScriptedLlm::silent()).await;
        let (session_id, _, token) = create_and_join(&app, "Ash").await;

        let (status, body) = call(
            &app,
            "GET",
            &format!("/api/sessions/{session_id}/state"),
            None,
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["players"].as_array().unwrap().len(), 1);
        assert!(!body.to_string().contains(&token));
    }

    #[tokio::test]
    async fn character_routes_check_tokens() {
        let (app, _dir) = test_app(ScriptedLlm::silent()).await;
        let (session_id, _, token) = create_and_join(&app, "Ash").await;
        let (_, _, other_token) = create_and_join(&app, "Brin").await;
        let setup = serde_json::to_value(create_request(mira_setup())).unwrap();
        let uri = format!("/api/sessions/{session_id}/characters");

        let (status, body) = call(&app, "POST", &uri, None, Some(setup.clone())).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["code"], "UNAUTHORIZED");

        let (status, _) = call(&app, "POST", &uri, Some("bogus"), Some(setup.clone())).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, body) =
            call(&app, "POST", &uri, Some(&other_token), Some(setup.clone())).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["code"], "FORBIDDEN");

        let (status, body) = call(&app, "POST", &uri, Some(&token), Some(setup.clone())).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["character"]["name"], "Mira");
        assert_eq!(body["character"]["hp"]["current"], 12);
        assert!(body.get("opening").is_none());

        let (status, _) = call(&app, "POST", &uri, Some(&token), Some(setup)).await;
        assert_eq!(status, StatusCode::CONFLICT);

        let character_id = body["character"]["id"].as_str().unwrap();
        let (status, body) = call(
            &app,
            "PATCH",
            &format!("/api/characters/{character_id}"),
            Some(&token),
            Some(json!({ "xp": 40, "inventory": ["Rope"] })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["xp"], 40);
        assert_eq!(body["inventory"], json!(["Rope"]));
        assert_eq!(body["level"], 1);

        let (status, _) = call(
            &app,
            "PATCH",
            &format!("/api/characters/{character_id}"),
            Some(&other_token),
            Some(json!({ "xp": 1 })),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn malformed_body_is_bad_request() {
        let (app, _dir) = test_app(ScriptedLlm::silent()).await;
        let (_, code, _) = create_and_join(&app, "Ash").await;
        let (status, body) = call(
            &app,
            "POST",
            &format!("/api/sessions/by-code/{code}/join"),
            None,
            Some(json!({ "nickname": "Brin" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "BAD_REQUEST");
    }

    #[tokio::test]
    async fn dice_route_rolls_and_validates() {
        let (app, _dir) = test_app(ScriptedLlm::silent()).await;

        let (status, body) = call(
            &app,
            "POST",
            "/api/dice/roll",
            None,
            Some(json!({ "notation": "2d6+3" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["notation"], "2d6+3");
        let total = body["total"].as_i64().unwrap();
        assert!((5..=15).contains(&total));
        assert_eq!(body["rolls"].as_array().unwrap().len(), 2);

        let (status, _) = call(
            &app,
            "POST",
            "/api/dice/roll",
            None,
            Some(json!({ "notation": "2d" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn action_before_character_is_bad_request() {
        let (app, _dir) = test_app(ScriptedLlm::silent()).await;
        let (session_id, _, token) = create_and_join(&app, "Ash").await;
        let (status, _) = call(
            &app,
            "POST",
            &format!("/api/sessions/{session_id}/actions"),
            Some(&token),
            Some(json!({ "content": "I look around" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
