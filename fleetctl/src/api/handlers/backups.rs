//! Instant backup tasks, started from the details page or for a selection on the router list.

use axum::{
    extract::{Query, State},
    http::{Method, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use tracing::{error, info, instrument};
use uuid::Uuid;

use crate::{
    api::models::{
        forms::FormData,
        routers::{details_url, BulkBackupResponse, BulkBackupResult, UuidQuery},
        users::CurrentUser,
    },
    auth::permissions::{has_permission, operation, resource, RequiresPermission},
    backup::{self, BackupOutcome},
    db::{
        errors::DbError,
        handlers::{Repository, Routers},
    },
    errors::{Error, JsonError, Result},
    flash::Flash,
    types::{Operation, Resource},
    AppState,
};

/// Form key the router list submits the selection under
const SELECTION_KEY: &str = "routers[]";

const INVALID_METHOD: JsonError = JsonError::new(StatusCode::METHOD_NOT_ALLOWED, "Invalid request method.");
const PERMISSION_DENIED: JsonError = JsonError::new(StatusCode::FORBIDDEN, "Permission denied.");
const NOTHING_SELECTED: JsonError = JsonError::new(StatusCode::BAD_REQUEST, "No routers selected.");
const ROUTER_NOT_FOUND: JsonError = JsonError::new(StatusCode::NOT_FOUND, "Router not found.");
const INTERNAL: JsonError = JsonError::new(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error.");

/// Start an instant backup of one router and return to its details page
#[instrument(skip_all)]
pub async fn create_instant_backup(
    State(state): State<AppState>,
    _user: RequiresPermission<resource::Backups, operation::Backup>,
    Query(query): Query<UuidQuery>,
    flash: Flash,
) -> Result<Response> {
    let id = query.required_id("Router")?;
    let mut conn = state.db.acquire().await.map_err(DbError::from)?;

    let outcome = match backup::create_instant_backup(&mut conn, id).await {
        Ok(outcome) => outcome,
        Err(DbError::NotFound) => {
            return Err(Error::NotFound {
                resource: "Router".to_string(),
                id: id.to_string(),
            })
        }
        Err(e) => return Err(e.into()),
    };

    let flash = match outcome {
        BackupOutcome::Started(_) => flash.success("Backup task created successfully"),
        BackupOutcome::Refused(refusal) => flash.warning(format!("Backup task not created|{}", refusal.message())),
    };
    Ok(flash.redirect(details_url(id)).into_response())
}

/// Start instant backups for every router in `routers[]`, reporting one status per router.
///
/// Every id is resolved before any task is created, so an unknown router leaves nothing behind.
#[instrument(skip_all, fields(user = %user.username))]
pub async fn create_instant_backup_multiple(
    State(state): State<AppState>,
    method: Method,
    user: CurrentUser,
    form: FormData,
) -> std::result::Result<Json<BulkBackupResponse>, JsonError> {
    if method != Method::POST {
        return Err(INVALID_METHOD);
    }
    if !has_permission(&user, Resource::Backups, Operation::Backup) {
        return Err(PERMISSION_DENIED);
    }

    let selection = form.all(SELECTION_KEY);
    if selection.is_empty() {
        return Err(NOTHING_SELECTED);
    }
    let ids = selection
        .iter()
        .map(|raw| Uuid::parse_str(raw.trim()))
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|_| ROUTER_NOT_FOUND)?;

    let mut conn = state.db.acquire().await.map_err(|e| internal(e.into()))?;
    let routers = Routers::new(&mut conn).get_bulk(ids.clone()).await.map_err(internal)?;
    if ids.iter().any(|id| !routers.contains_key(id)) {
        return Err(ROUTER_NOT_FOUND);
    }

    let mut results = Vec::with_capacity(ids.len());
    for id in ids {
        let outcome = backup::create_instant_backup(&mut conn, id).await.map_err(internal)?;
        let name = routers.get(&id).map(|r| r.name.clone()).unwrap_or_default();
        results.push(BulkBackupResult {
            router: name,
            status: outcome.bulk_status().to_string(),
        });
    }

    info!(count = results.len(), "Processed bulk backup request");
    Ok(Json(BulkBackupResponse { results }))
}

fn internal(e: DbError) -> JsonError {
    error!("Bulk backup failed: {e:#}");
    INTERNAL
}
