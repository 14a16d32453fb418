//! Read model for `GET /profile`.

use crate::{
    dto::profile::ProfileResponse,
    error::{AppError, AppResult},
    state::AppState,
};

pub async fn get_profile(state: &AppState, user_id: i64) -> AppResult<ProfileResponse> {
    let user = match state.users.find_by_id(user_id).await? {
        Some(u) => u,
        None => return Err(AppError::NotFound),
    };
    let addresses = state.addresses.list(user_id).await?;
    Ok(ProfileResponse { user, addresses })
}
