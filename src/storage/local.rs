//! Local JSON-document store.
//!
//! One file holds the whole collection. All file IO happens on a dedicated
//! worker thread; async callers hand it closures and await a oneshot reply,
//! so loads and saves are serialized without an async lock held over IO.

use std::{
    fs,
    path::{Path, PathBuf},
    sync::{mpsc, Arc, Mutex},
    thread::{self, JoinHandle},
};

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use log::{error, info, warn};
use tokio::sync::oneshot;

use super::RecordStore;
use crate::models::{record::sort_newest_first, AttendanceRecord};

type StoreTask = Box<dyn FnOnce(&Path) + Send + 'static>;

enum StoreCommand {
    Execute(StoreTask),
    Shutdown,
}

struct LocalStoreInner {
    sender: mpsc::Sender<StoreCommand>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl Drop for LocalStoreInner {
    fn drop(&mut self) {
        let mut guard = match self.worker.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        if let Some(handle) = guard.take() {
            if let Err(err) = self.sender.send(StoreCommand::Shutdown) {
                error!("Failed to send shutdown to store thread: {err}");
            }
            if let Err(join_err) = handle.join() {
                error!("Failed to join store thread: {join_err:?}");
            }
        }
    }
}

#[derive(Clone)]
pub struct LocalStore {
    inner: Arc<LocalStoreInner>,
    file_path: Arc<PathBuf>,
}

impl LocalStore {
    pub fn new(file_path: PathBuf) -> Result<Self> {
        if let Some(parent) = file_path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("failed to create records directory {}", parent.display())
            })?;
        }

        let (command_tx, command_rx) = mpsc::channel::<StoreCommand>();
        let path_for_thread = file_path.clone();

        let worker = thread::Builder::new()
            .name("clockin-records".into())
            .spawn(move || {
                while let Ok(command) = command_rx.recv() {
                    match command {
                        StoreCommand::Execute(task) => task(&path_for_thread),
                        StoreCommand::Shutdown => break,
                    }
                }
                info!("Record store thread shutting down");
            })
            .context("failed to spawn record store worker thread")?;

        info!("Record store at {}", file_path.display());

        Ok(Self {
            inner: Arc::new(LocalStoreInner {
                sender: command_tx,
                worker: Mutex::new(Some(worker)),
            }),
            file_path: Arc::new(file_path),
        })
    }

    pub fn path(&self) -> &Path {
        self.file_path.as_path()
    }

    async fn execute<F, T>(&self, task: F) -> Result<T>
    where
        F: FnOnce(&Path) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let sender = self.inner.sender.clone();
        let (reply_tx, reply_rx) = oneshot::channel();

        let command = StoreCommand::Execute(Box::new(move |path| {
            let result = task(path);
            if reply_tx.send(result).is_err() {
                error!("Store caller dropped before receiving result");
            }
        }));

        sender
            .send(command)
            .map_err(|err| anyhow!("failed to send command to store thread: {err}"))?;

        reply_rx
            .await
            .map_err(|_| anyhow!("record store thread terminated unexpectedly"))?
    }
}

#[async_trait]
impl RecordStore for LocalStore {
    async fn load(&self) -> Result<Vec<AttendanceRecord>> {
        self.execute(read_collection).await
    }

    async fn save(&self, records: &[AttendanceRecord]) -> Result<()> {
        let records = records.to_vec();
        self.execute(move |path| write_collection(path, &records))
            .await
    }
}

fn read_collection(path: &Path) -> Result<Vec<AttendanceRecord>> {
    let raw = match fs::read(path) {
        Ok(raw) => raw,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(err) => {
            return Err(err).with_context(|| format!("failed to read {}", path.display()))
        }
    };

    match serde_json::from_slice::<Vec<AttendanceRecord>>(&raw) {
        Ok(mut records) => {
            sort_newest_first(&mut records);
            Ok(records)
        }
        Err(err) => {
            // Corrupted data is set aside, not deleted; the flow restarts
            // with an empty collection and never surfaces the parse error.
            let quarantine = sibling_path(path, ".corrupt");
            warn!(
                "records file is corrupted ({err}); moving it to {}",
                quarantine.display()
            );
            if let Err(rename_err) = fs::rename(path, &quarantine) {
                warn!("failed to set corrupted records aside: {rename_err}");
            }
            Ok(Vec::new())
        }
    }
}

fn write_collection(path: &Path, records: &[AttendanceRecord]) -> Result<()> {
    let json = serde_json::to_vec(records).context("failed to serialize records")?;
    // Temp file plus rename keeps a crash mid-write from eating the
    // collection.
    let tmp = sibling_path(path, ".tmp");
    fs::write(&tmp, &json).with_context(|| format!("failed to write {}", tmp.display()))?;
    fs::rename(&tmp, path).with_context(|| format!("failed to replace {}", path.display()))?;
    Ok(())
}

fn sibling_path(path: &Path, suffix: &str) -> PathBuf {
    let mut os = path.as_os_str().to_os_string();
    os.push(suffix);
    PathBuf::from(os)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use crate::models::LocationStamp;

    fn record(id: &str, employee_id: &str, day: u32) -> AttendanceRecord {
        AttendanceRecord {
            id: id.to_string(),
            employee_id: employee_id.to_string(),
            check_in_time: Utc.with_ymd_and_hms(2024, 6, day, 8, 30, 0).unwrap(),
            location: LocationStamp {
                latitude: 37.422,
                longitude: -122.0841,
                address: Some("1600 Amphitheatre Parkway, Mountain View, CA, USA".to_string()),
            },
            image_data_url: "data:image/jpeg;base64,AAAA".to_string(),
        }
    }

    fn store_in(dir: &tempfile::TempDir) -> LocalStore {
        LocalStore::new(dir.path().join("records.json")).unwrap()
    }

    #[tokio::test]
    async fn missing_file_loads_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        assert!(store.load().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn saves_and_reloads_the_collection() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);

        let records = vec![record("b", "E2", 18), record("a", "E1", 15)];
        store.save(&records).await.unwrap();

        let loaded = store.load().await.unwrap();
        assert_eq!(loaded, records);
    }

    #[tokio::test]
    async fn load_then_save_is_byte_stable() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);

        store
            .save(&[record("b", "E2", 18), record("a", "E1", 15)])
            .await
            .unwrap();
        let first = fs::read(store.path()).unwrap();

        let loaded = store.load().await.unwrap();
        store.save(&loaded).await.unwrap();
        let second = fs::read(store.path()).unwrap();

        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn save_replaces_the_whole_collection() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);

        store
            .save(&[record("b", "E2", 18), record("a", "E1", 15)])
            .await
            .unwrap();
        store.save(&[record("c", "E3", 19)]).await.unwrap();

        let loaded = store.load().await.unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].id, "c");
    }

    #[tokio::test]
    async fn corrupted_file_is_set_aside_and_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);

        fs::write(store.path(), b"{ not json").unwrap();

        assert!(store.load().await.unwrap().is_empty());
        assert!(!store.path().exists());

        let quarantine = dir.path().join("records.json.corrupt");
        assert_eq!(fs::read(&quarantine).unwrap(), b"{ not json");

        // A load after quarantine sees a missing file, still empty.
        assert!(store.load().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn reads_collections_written_by_the_browser_flow() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);

        // localStorage-era data: millisecond timestamps, oldest first.
        let raw = r#"[
            {"id":"1718000000000","employeeId":"E1",
             "checkInTime":"2024-06-10T06:13:20.000Z",
             "location":{"latitude":1.0,"longitude":2.0,"address":"somewhere"},
             "imageDataUrl":"data:image/jpeg;base64,AAAA"},
            {"id":"1718440200000","employeeId":"E2",
             "checkInTime":"2024-06-15T08:30:00.000Z",
             "location":{"latitude":3.0,"longitude":4.0},
             "imageDataUrl":"data:image/jpeg;base64,BBBB"}
        ]"#;
        fs::write(store.path(), raw).unwrap();

        let loaded = store.load().await.unwrap();
        assert_eq!(loaded.len(), 2);
        // Re-sorted newest first on load.
        assert_eq!(loaded[0].id, "1718440200000");
        assert_eq!(loaded[0].location.address, None);
        assert_eq!(loaded[1].employee_id, "E1");
    }
}
