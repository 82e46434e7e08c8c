use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use crate::{
    errors::{GameError, SessionError},
    extractors::AppJson,
    models::{
        category::Category,
        game::{
            AnswerRequest, CategoryInfo, CategoryRequest, CreateGameRequest, CreateGameResponse,
            NicknameRequest, PlayerInputRequest,
        },
        TurnResponse,
    },
    services::{
        session_service::{GameSession, PlayerAction},
        AppState,
    },
};

type HandlerError = (StatusCode, String);

pub fn error_status(error: &SessionError) -> StatusCode {
    match error {
        SessionError::NotFound => StatusCode::NOT_FOUND,
        SessionError::Closed => StatusCode::GONE,
        SessionError::Busy => StatusCode::CONFLICT,
        SessionError::Game(
            GameError::EmptyInput
            | GameError::NicknameTooLong { .. }
            | GameError::UnknownCategory(_),
        ) => {
            StatusCode::BAD_REQUEST
        }
        SessionError::Game(_) => StatusCode::CONFLICT,
    }
}

fn into_response_error(error: SessionError) -> HandlerError {
    let status = error_status(&error);
    if status == StatusCode::NOT_FOUND {
        tracing::debug!("{}", error);
    } else {
        tracing::warn!("Rejected game action: {}", error);
    }
    (status, error.to_string())
}

fn validation_error(e: validator::ValidationErrors) -> HandlerError {
    (StatusCode::BAD_REQUEST, format!("Validation error: {}", e))
}

pub(crate) async fn find_game(
    state: &AppState,
    game_id: &str,
) -> Result<Arc<GameSession>, HandlerError> {
    let id = Uuid::parse_str(game_id)
        .map_err(|_| into_response_error(SessionError::NotFound))?;
    state.games.get(id).await.map_err(into_response_error)
}

async fn play(
    state: &AppState,
    game_id: &str,
    action: PlayerAction,
) -> Result<Json<TurnResponse>, HandlerError> {
    let game = find_game(state, game_id).await?;
    let response = game.handle(action).await.map_err(into_response_error)?;
    Ok(Json(response))
}

pub async fn list_categories(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let points = &state.config.game.points;
    let categories: Vec<CategoryInfo> = Category::ALL
        .iter()
        .map(|&category| CategoryInfo {
            key: category,
            name: category.display_name().to_string(),
            points: points.base_points(category),
            max_points: points.max_points(category),
            creator_label: category.creator_label().map(str::to_string),
        })
        .collect();

    Json(categories)
}

pub async fn create_game(
    State(state): State<Arc<AppState>>,
    AppJson(req): AppJson<CreateGameRequest>,
) -> Result<impl IntoResponse, HandlerError> {
    req.validate().map_err(validation_error)?;

    let max_rounds = state.config.game.max_rounds;
    if req.number_of_rounds.is_some_and(|rounds| rounds > max_rounds) {
        return Err((
            StatusCode::BAD_REQUEST,
            format!("number_of_rounds must be at most {}", max_rounds),
        ));
    }

    let settings = state
        .config
        .game_settings(req.difficulty, req.number_of_rounds);
    tracing::info!(
        "Creating game: difficulty={}, rounds={}",
        settings.difficulty.as_str(),
        settings.number_of_rounds
    );

    let game = state.start_game(settings).await;
    let view = game.view();

    Ok((
        StatusCode::CREATED,
        Json(CreateGameResponse {
            game_id: game.id().to_string(),
            message: view.message.clone(),
            prompt: view.prompt.clone(),
            game: view,
        }),
    ))
}

pub async fn get_game(
    State(state): State<Arc<AppState>>,
    Path(game_id): Path<String>,
) -> Result<impl IntoResponse, HandlerError> {
    let game = find_game(&state, &game_id).await?;
    Ok((StatusCode::OK, Json(game.view())))
}

pub async fn delete_game(
    State(state): State<Arc<AppState>>,
    Path(game_id): Path<String>,
) -> Result<impl IntoResponse, HandlerError> {
    tracing::info!("Closing game: {}", game_id);

    let id = Uuid::parse_str(&game_id)
        .map_err(|_| into_response_error(SessionError::NotFound))?;
    state.games.remove(id).await.map_err(into_response_error)?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn submit_input(
    State(state): State<Arc<AppState>>,
    Path(game_id): Path<String>,
    AppJson(req): AppJson<PlayerInputRequest>,
) -> Result<impl IntoResponse, HandlerError> {
    req.validate().map_err(validation_error)?;
    play(&state, &game_id, PlayerAction::Input(req.text)).await
}

pub async fn submit_nickname(
    State(state): State<Arc<AppState>>,
    Path(game_id): Path<String>,
    AppJson(req): AppJson<NicknameRequest>,
) -> Result<impl IntoResponse, HandlerError> {
    req.validate().map_err(validation_error)?;
    play(&state, &game_id, PlayerAction::Nickname(req.nickname)).await
}

pub async fn select_category(
    State(state): State<Arc<AppState>>,
    Path(game_id): Path<String>,
    AppJson(req): AppJson<CategoryRequest>,
) -> Result<impl IntoResponse, HandlerError> {
    let category = req
        .category
        .parse::<Category>()
        .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?;
    play(&state, &game_id, PlayerAction::Category(category)).await
}

pub async fn submit_answer(
    State(state): State<Arc<AppState>>,
    Path(game_id): Path<String>,
    AppJson(req): AppJson<AnswerRequest>,
) -> Result<impl IntoResponse, HandlerError> {
    req.validate().map_err(validation_error)?;
    tracing::info!("Submitting answer for game: {}", game_id);
    play(&state, &game_id, PlayerAction::Answer(req.answer)).await
}
