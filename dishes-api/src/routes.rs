use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::{header::CONTENT_TYPE, Method, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use dishes_app::domain::{Dish, DishReplacement, NewDish, VoteRequest};
use dishes_app::AppContext;
use dishes_errors::AppError;
use serde::Deserialize;
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub fn create_router(ctx: AppContext) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE])
        .max_age(Duration::from_secs(60 * 60));

    Router::new()
        .route("/health", get(health))
        .route("/dishes", get(list_dishes).post(create_dish))
        .route("/dishes/{id}", get(get_dish).put(replace_dish))
        .route("/dishes/{id}/vote", post(vote_on_dish))
        .route("/vote", post(vote))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(ctx)
}

/// Vote body when the dish id comes from the path.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct VoteBody {
    #[serde(alias = "userId")]
    voter_id: String,
    vote: String,
}

fn parse<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    payload
        .map(|Json(value)| value)
        .map_err(|rejection| AppError::MalformedRequest(rejection.body_text()))
}

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn list_dishes(State(ctx): State<AppContext>) -> Result<Json<Vec<Dish>>, AppError> {
    Ok(Json(ctx.dishes.list().await?))
}

async fn get_dish(
    State(ctx): State<AppContext>,
    Path(id): Path<String>,
) -> Result<Json<Dish>, AppError> {
    Ok(Json(ctx.dishes.get(&id).await?))
}

async fn create_dish(
    State(ctx): State<AppContext>,
    payload: Result<Json<NewDish>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let new_dish = parse(payload)?;
    let dish = ctx.dishes.create(new_dish).await?;
    Ok((StatusCode::CREATED, Json(dish)))
}

async fn replace_dish(
    State(ctx): State<AppContext>,
    Path(id): Path<String>,
    payload: Result<Json<DishReplacement>, JsonRejection>,
) -> Result<Json<Dish>, AppError> {
    let replacement = parse(payload)?;
    Ok(Json(ctx.dishes.replace(&id, replacement).await?))
}

async fn vote(
    State(ctx): State<AppContext>,
    payload: Result<Json<VoteRequest>, JsonRejection>,
) -> Result<Json<Dish>, AppError> {
    let request = parse(payload)?;
    Ok(Json(ctx.dishes.vote(request).await?))
}

async fn vote_on_dish(
    State(ctx): State<AppContext>,
    Path(id): Path<String>,
    payload: Result<Json<VoteBody>, JsonRejection>,
) -> Result<Json<Dish>, AppError> {
    let body = parse(payload)?;
    let request = VoteRequest {
        dish_id: id,
        voter_id: body.voter_id,
        vote: body.vote,
    };
    Ok(Json(ctx.dishes.vote(request).await?))
}
