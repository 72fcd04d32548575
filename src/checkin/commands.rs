use tauri::State;

use crate::{
    admin::{DashboardPage, TimeWindow},
    checkin::{CheckinController, FlowSnapshot, Role},
    location::LocationReply,
    AppState,
};

fn controller_from_state(state: &State<'_, AppState>) -> CheckinController {
    state.checkin.clone()
}

#[tauri::command]
pub async fn get_flow_state(state: State<'_, AppState>) -> Result<FlowSnapshot, String> {
    let controller = controller_from_state(&state);
    Ok(controller.get_snapshot().await)
}

#[tauri::command]
pub async fn select_role(state: State<'_, AppState>, role: Role) -> Result<FlowSnapshot, String> {
    let controller = controller_from_state(&state);
    Ok(controller.select_role(role).await)
}

#[tauri::command]
pub async fn admin_login(
    state: State<'_, AppState>,
    username: String,
    password: String,
) -> Result<FlowSnapshot, String> {
    let controller = controller_from_state(&state);
    Ok(controller.admin_login(&username, &password).await)
}

#[tauri::command]
pub async fn back_to_role_selection(state: State<'_, AppState>) -> Result<FlowSnapshot, String> {
    let controller = controller_from_state(&state);
    Ok(controller.return_to_role_selection().await)
}

#[tauri::command]
pub async fn submit_details(
    state: State<'_, AppState>,
    employee_id: String,
) -> Result<FlowSnapshot, String> {
    let controller = controller_from_state(&state);
    Ok(controller.submit_details(employee_id).await)
}

/// Stamps the raw camera frame and returns the processed JPEG as a data URL.
#[tauri::command]
pub async fn attach_photo(
    state: State<'_, AppState>,
    frame_data_url: String,
) -> Result<String, String> {
    let controller = controller_from_state(&state);
    controller
        .attach_photo(frame_data_url)
        .await
        .map_err(|e| e.to_string())
}

#[tauri::command]
pub async fn abort_capture(
    state: State<'_, AppState>,
    message: String,
) -> Result<FlowSnapshot, String> {
    let controller = controller_from_state(&state);
    Ok(controller.abort_capture(message).await)
}

#[tauri::command]
pub async fn retake_photo(state: State<'_, AppState>) -> Result<FlowSnapshot, String> {
    let controller = controller_from_state(&state);
    Ok(controller.retake_photo().await)
}

#[tauri::command]
pub async fn submit_checkin(state: State<'_, AppState>) -> Result<FlowSnapshot, String> {
    let controller = controller_from_state(&state);
    Ok(controller.submit_checkin().await)
}

#[tauri::command]
pub async fn start_new_checkin(state: State<'_, AppState>) -> Result<FlowSnapshot, String> {
    let controller = controller_from_state(&state);
    Ok(controller.start_new_checkin().await)
}

#[tauri::command]
pub async fn logout(state: State<'_, AppState>) -> Result<FlowSnapshot, String> {
    let controller = controller_from_state(&state);
    Ok(controller.logout().await)
}

#[tauri::command]
pub async fn admin_records(
    state: State<'_, AppState>,
    search: Option<String>,
    window: Option<TimeWindow>,
) -> Result<DashboardPage, String> {
    let controller = controller_from_state(&state);
    Ok(controller
        .admin_records(search.as_deref().unwrap_or(""), window.unwrap_or_default())
        .await)
}

/// The webview's answer to a `location-request` event.
#[tauri::command]
pub async fn provide_location(
    state: State<'_, AppState>,
    request_id: String,
    reply: LocationReply,
) -> Result<(), String> {
    state.location.provide(&request_id, reply).await;
    Ok(())
}
