use axum::extract::{Path, Query, State};
use axum::{Extension, Json};
use serde::Deserialize;
use uuid::Uuid;

use models::permission::PermissionGrid;
use models::user::Role;
use service::permissions::sidebar::{self as nav, SidebarItem};
use service::permissions::store;

use super::auth::{AuthContext, ServerState};
use super::ApiResult;

#[derive(Debug, Default, Deserialize)]
pub struct ClinicQuery {
    pub clinic_id: Option<Uuid>,
}

pub async fn get_role(
    State(state): State<ServerState>,
    Extension(ctx): Extension<AuthContext>,
    Path(role): Path<Role>,
    Query(q): Query<ClinicQuery>,
) -> ApiResult<PermissionGrid> {
    Ok(Json(store::get_role_permissions(&state.db, &ctx.actor, q.clinic_id, role).await?))
}

pub async fn put_role(
    State(state): State<ServerState>,
    Extension(ctx): Extension<AuthContext>,
    Path(role): Path<Role>,
    Query(q): Query<ClinicQuery>,
    Json(grid): Json<PermissionGrid>,
) -> ApiResult<PermissionGrid> {
    Ok(Json(store::put_role_permissions(&state.db, &ctx.actor, q.clinic_id, role, grid).await?))
}

pub async fn get_agent(State(state): State<ServerState>, Extension(ctx): Extension<AuthContext>, Path(agent_id): Path<Uuid>) -> ApiResult<PermissionGrid> {
    Ok(Json(store::get_agent_permissions(&state.db, &ctx.actor, agent_id).await?))
}

pub async fn put_agent(
    State(state): State<ServerState>,
    Extension(ctx): Extension<AuthContext>,
    Path(agent_id): Path<Uuid>,
    Json(grid): Json<PermissionGrid>,
) -> ApiResult<PermissionGrid> {
    Ok(Json(store::put_agent_permissions(&state.db, &ctx.actor, agent_id, grid).await?))
}

/// Navigation entries the caller may open.
pub async fn sidebar(State(state): State<ServerState>, Extension(ctx): Extension<AuthContext>) -> ApiResult<Vec<SidebarItem>> {
    Ok(Json(nav::sidebar(&state.db, &ctx.actor).await?))
}
