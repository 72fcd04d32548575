mod admin;
mod capture;
mod checkin;
mod error;
mod events;
mod geocode;
mod location;
mod models;
mod settings;
mod storage;
mod utils;

use std::sync::Arc;

use admin::StaticCredentials;
use checkin::{
    commands::{
        abort_capture, admin_login, admin_records, attach_photo, back_to_role_selection,
        get_flow_state, logout, provide_location, retake_photo, select_role, start_new_checkin,
        submit_checkin, submit_details,
    },
    CheckinController,
};
use events::{TauriEvents, UiEvents};
use geocode::GeminiResolver;
use location::WebviewLocation;
use log::{info, warn};
use settings::{SettingsStore, StorageBackend};
use storage::{LocalStore, RecordStore, RemoteStore};
use tauri::Manager;
use tokio_util::sync::CancellationToken;

pub(crate) struct AppState {
    pub(crate) checkin: CheckinController,
    pub(crate) location: Arc<WebviewLocation>,
}

#[cfg_attr(mobile, tauri::mobile_entry_point)]
pub fn run() {
    // Initialize logging (reads RUST_LOG env var)
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    log::info!("Clock-in starting up...");

    tauri::Builder::default()
        .plugin(tauri_plugin_opener::init())
        .setup(|app| {
            let result = (|| -> anyhow::Result<()> {
                let app_data_dir = app
                    .path()
                    .app_data_dir()
                    .map_err(|err| anyhow::anyhow!(err))?;
                std::fs::create_dir_all(&app_data_dir)?;

                let settings = SettingsStore::new(app_data_dir.join("settings.json"))?;

                let events: Arc<dyn UiEvents> = Arc::new(TauriEvents::new(app.handle().clone()));
                let bridge = Arc::new(WebviewLocation::new(events.clone()));

                let geocoder = settings.geocoder();
                let api_key = match geocoder.resolved_api_key() {
                    Some(key) => key,
                    None => {
                        warn!("No Gemini API key configured; address resolution will fail");
                        String::new()
                    }
                };
                let resolver =
                    GeminiResolver::new(&geocoder.base_url, &geocoder.model, &api_key);

                let admin = settings.admin();
                let auth = StaticCredentials::new(admin.username, admin.password);

                let storage = settings.storage();
                let (store, remote): (Arc<dyn RecordStore>, Option<RemoteStore>) =
                    match storage.effective_backend() {
                        StorageBackend::Remote => match storage.remote_base_url.as_deref() {
                            Some(base_url) if !base_url.trim().is_empty() => {
                                info!("Using the remote record store at {base_url}");
                                let remote =
                                    RemoteStore::new(base_url, storage.remote_api_key.clone());
                                (Arc::new(remote.clone()), Some(remote))
                            }
                            _ => {
                                warn!(
                                    "Remote storage selected without a base URL; using the local store"
                                );
                                let local =
                                    LocalStore::new(app_data_dir.join("records.json"))?;
                                (Arc::new(local), None)
                            }
                        },
                        StorageBackend::Local => {
                            let local = LocalStore::new(app_data_dir.join("records.json"))?;
                            (Arc::new(local), None)
                        }
                    };

                let controller = CheckinController::new(
                    store,
                    bridge.clone(),
                    Arc::new(resolver),
                    Arc::new(auth),
                    events,
                );

                // Load the persisted collection and, for the remote backend,
                // start the poll loop that mirrors other devices' check-ins.
                {
                    let controller = controller.clone();
                    tauri::async_runtime::block_on(async move {
                        if let Err(err) = controller.bootstrap().await {
                            warn!("Failed to load persisted records: {err:#}");
                        }

                        if let Some(remote) = remote {
                            let mut updates = remote.spawn_poller(CancellationToken::new());
                            let controller = controller.clone();
                            tokio::spawn(async move {
                                while updates.changed().await.is_ok() {
                                    let fresh = updates.borrow_and_update().clone();
                                    controller.replace_records(fresh).await;
                                }
                            });
                        }
                    });
                }

                app.manage(AppState {
                    checkin: controller,
                    location: bridge,
                });

                Ok(())
            })();

            result.map_err(|err| err.into())
        })
        .invoke_handler(tauri::generate_handler![
            get_flow_state,
            select_role,
            admin_login,
            back_to_role_selection,
            submit_details,
            attach_photo,
            abort_capture,
            retake_photo,
            submit_checkin,
            start_new_checkin,
            logout,
            admin_records,
            provide_location,
        ])
        .run(tauri::generate_context!())
        .expect("error while running tauri application");
}
