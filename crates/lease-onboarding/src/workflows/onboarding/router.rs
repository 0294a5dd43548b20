use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use chrono::{Local, NaiveDate};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use super::domain::{KybProfile, NewSubscriber, SubscriberId, VehicleId};
use super::repository::{AccountRepository, RepositoryError, SubscriberRepository};
use super::scoring::ScoringError;
use super::service::{LifecycleError, SubscriberLifecycle, SubscriberView};

/// Router builder exposing the lifecycle surface over HTTP. Serialization is
/// the only concern here; every rule lives in the service.
pub fn onboarding_router<S, A>(service: Arc<SubscriberLifecycle<S, A>>) -> Router
where
    S: SubscriberRepository + 'static,
    A: AccountRepository + 'static,
{
    Router::new()
        .route("/api/v1/subscribers", post(create_handler::<S, A>))
        .route(
            "/api/v1/subscribers/:subscriber_id",
            get(get_handler::<S, A>),
        )
        .route(
            "/api/v1/subscribers/:subscriber_id/kyb",
            post(submit_kyb_handler::<S, A>),
        )
        .route(
            "/api/v1/subscribers/:subscriber_id/kyb/verify",
            post(verify_kyb_handler::<S, A>),
        )
        .route(
            "/api/v1/subscribers/:subscriber_id/kyb/reject",
            post(reject_kyb_handler::<S, A>),
        )
        .route(
            "/api/v1/subscribers/:subscriber_id/vehicle",
            post(assign_vehicle_handler::<S, A>),
        )
        .route(
            "/api/v1/subscribers/:subscriber_id/deactivate",
            post(deactivate_handler::<S, A>),
        )
        .route(
            "/api/v1/subscribers/:subscriber_id/score",
            post(score_handler::<S, A>),
        )
        .with_state(service)
}

#[derive(Debug, Deserialize)]
pub(crate) struct AssignVehicleRequest {
    pub(crate) vehicle_id: Uuid,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ScoreRequest {
    #[serde(default)]
    pub(crate) as_of: Option<NaiveDate>,
}

async fn create_handler<S, A>(
    State(service): State<Arc<SubscriberLifecycle<S, A>>>,
    axum::Json(lead): axum::Json<NewSubscriber>,
) -> Response
where
    S: SubscriberRepository + 'static,
    A: AccountRepository + 'static,
{
    match service.create(lead) {
        Ok(id) => (
            StatusCode::CREATED,
            axum::Json(json!({ "subscriber_id": id.0 })),
        )
            .into_response(),
        Err(err) => error_response(err),
    }
}

async fn get_handler<S, A>(
    State(service): State<Arc<SubscriberLifecycle<S, A>>>,
    Path(subscriber_id): Path<Uuid>,
) -> Response
where
    S: SubscriberRepository + 'static,
    A: AccountRepository + 'static,
{
    match service.get(&SubscriberId(subscriber_id)) {
        Ok(subscriber) => {
            let view = SubscriberView::from(&subscriber);
            (StatusCode::OK, axum::Json(view)).into_response()
        }
        Err(err) => error_response(err),
    }
}

async fn submit_kyb_handler<S, A>(
    State(service): State<Arc<SubscriberLifecycle<S, A>>>,
    Path(subscriber_id): Path<Uuid>,
    axum::Json(profile): axum::Json<KybProfile>,
) -> Response
where
    S: SubscriberRepository + 'static,
    A: AccountRepository + 'static,
{
    respond_no_content(service.submit_kyb(&SubscriberId(subscriber_id), profile))
}

async fn verify_kyb_handler<S, A>(
    State(service): State<Arc<SubscriberLifecycle<S, A>>>,
    Path(subscriber_id): Path<Uuid>,
) -> Response
where
    S: SubscriberRepository + 'static,
    A: AccountRepository + 'static,
{
    respond_no_content(service.verify_kyb(&SubscriberId(subscriber_id)))
}

async fn reject_kyb_handler<S, A>(
    State(service): State<Arc<SubscriberLifecycle<S, A>>>,
    Path(subscriber_id): Path<Uuid>,
) -> Response
where
    S: SubscriberRepository + 'static,
    A: AccountRepository + 'static,
{
    respond_no_content(service.reject_kyb(&SubscriberId(subscriber_id)))
}

async fn assign_vehicle_handler<S, A>(
    State(service): State<Arc<SubscriberLifecycle<S, A>>>,
    Path(subscriber_id): Path<Uuid>,
    axum::Json(request): axum::Json<AssignVehicleRequest>,
) -> Response
where
    S: SubscriberRepository + 'static,
    A: AccountRepository + 'static,
{
    respond_no_content(
        service.assign_vehicle(&SubscriberId(subscriber_id), VehicleId(request.vehicle_id)),
    )
}

async fn deactivate_handler<S, A>(
    State(service): State<Arc<SubscriberLifecycle<S, A>>>,
    Path(subscriber_id): Path<Uuid>,
) -> Response
where
    S: SubscriberRepository + 'static,
    A: AccountRepository + 'static,
{
    respond_no_content(service.deactivate(&SubscriberId(subscriber_id)))
}

async fn score_handler<S, A>(
    State(service): State<Arc<SubscriberLifecycle<S, A>>>,
    Path(subscriber_id): Path<Uuid>,
    axum::Json(request): axum::Json<ScoreRequest>,
) -> Response
where
    S: SubscriberRepository + 'static,
    A: AccountRepository + 'static,
{
    let as_of = request
        .as_of
        .unwrap_or_else(|| Local::now().date_naive());
    match service.calculate_score(&SubscriberId(subscriber_id), as_of) {
        Ok(score) => (StatusCode::OK, axum::Json(score)).into_response(),
        Err(err) => error_response(err),
    }
}

fn respond_no_content(result: Result<(), LifecycleError>) -> Response {
    match result {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => error_response(err),
    }
}

fn error_response(err: LifecycleError) -> Response {
    let status = match &err {
        LifecycleError::SubscriberNotFound(_) => StatusCode::NOT_FOUND,
        LifecycleError::InvalidTransition { .. } => StatusCode::CONFLICT,
        LifecycleError::Repository(RepositoryError::Conflict) => StatusCode::CONFLICT,
        LifecycleError::Scoring(ScoringError::IncompleteInput { .. }) => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        LifecycleError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    let payload = json!({ "error": err.to_string() });
    (status, axum::Json(payload)).into_response()
}
