use rocket::Request;
use rocket::http::Status;
use rocket::request::{FromRequest, Outcome};
use rocket::response::status::Custom;
use rocket::serde::json::Json;
use serde_json::{Value, json};
use tracing::Instrument;

use super::{AdminGate, GateState, PUBLIC_ENTRY_POINT, Permission, SessionUser};
use crate::error::AppError;
use crate::state::AppState;

/// Any logged-in session. Gates the protected links.
#[derive(Debug, Clone)]
pub struct Member(pub SessionUser);

/// A session that passed the admin gate for this view load.
#[derive(Debug, Clone)]
pub struct AdminView(pub SessionUser);

async fn read_session(request: &Request<'_>) -> Result<Option<SessionUser>, AppError> {
    let state = request
        .rocket()
        .state::<AppState>()
        .ok_or_else(|| AppError::Internal("application state not managed".to_string()))?;

    state.accounts.current_session().await
}

fn refuse<T>(error: AppError, context: &str) -> Outcome<T, AppError> {
    Outcome::Error((error.to_status_with_log(context), error))
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for Member {
    type Error = AppError;

    async fn from_request(request: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        let session = read_session(request)
            .instrument(tracing::info_span!("member_guard"))
            .await;

        match session {
            Ok(Some(user)) if user.has_permission(Permission::OpenProtectedPages) => {
                Outcome::Success(Member(user))
            }
            Ok(Some(user)) => refuse(
                AppError::Authorization(format!("{} cannot open protected pages", user.name)),
                "Member guard",
            ),
            Ok(None) => refuse(
                AppError::Authentication("no active session".to_string()),
                "Member guard",
            ),
            Err(err) => refuse(err, "Member guard session lookup"),
        }
    }
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for AdminView {
    type Error = AppError;

    async fn from_request(request: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        let session = match read_session(request)
            .instrument(tracing::info_span!("admin_gate"))
            .await
        {
            Ok(session) => session,
            Err(err) => return refuse(err, "Admin gate session lookup"),
        };

        let mut gate = AdminGate::new();
        match gate.enter(session) {
            GateState::Unlocked(user) => Outcome::Success(AdminView(user.clone())),
            _ => refuse(
                AppError::Authorization("administrator access required".to_string()),
                "Admin gate",
            ),
        }
    }
}

#[catch(401)]
pub fn unauthorized_api(_req: &Request) -> Custom<Json<Value>> {
    let error_json = json!({
        "error": "Unauthorized",
        "message": "Authentication required"
    });

    Custom(Status::Unauthorized, Json(error_json))
}

#[catch(403)]
pub fn forbidden_api(_req: &Request) -> Custom<Json<Value>> {
    tracing::warn!("Forbidden access attempt");
    let error_json = json!({
        "error": "Forbidden",
        "message": "Administrator access required",
        "redirect": PUBLIC_ENTRY_POINT
    });

    Custom(Status::Forbidden, Json(error_json))
}
