//! Shared state between the HTTP handlers and the WebSocket connections
//!
//! `AppContext` is built once at startup and handed to every handler as an
//! `Arc`. Per-connection state (gesture debounce, frame history, effect
//! instances) lives in each connection's own `Pipeline`; only the registry,
//! the virtual camera and the counters here are shared.

use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tokio::sync::{broadcast, Semaphore};

use super::types::WsEvent;
use crate::effects::{EffectRegistry, RegistryError};
use crate::gestures::Gesture;
use crate::ml;
use crate::network::VirtualCamera;
use crate::pipeline::{Pipeline, PipelineConfig};
use crate::settings::AppSettings;
use crate::telemetry::FrameProfiler;

/// Events buffered per viewer before it is reported as lagging
const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Thread-safe handle to the application context
pub type AppContextHandle = Arc<AppContext>;

/// Application state shared by all connections
pub struct AppContext {
    settings: AppSettings,
    pipeline_config: PipelineConfig,
    registry: Arc<RwLock<EffectRegistry>>,
    mapping_path: PathBuf,
    virtual_camera: Arc<VirtualCamera>,
    /// Outbound events, fanned out to every viewer
    ws_tx: broadcast::Sender<WsEvent>,
    /// Bounds frames processed concurrently across connections
    workers: Arc<Semaphore>,
    profiler: Mutex<FrameProfiler>,
    viewers: AtomicUsize,
}

impl AppContext {
    pub fn new(settings: AppSettings, registry: EffectRegistry, virtual_camera: VirtualCamera) -> Self {
        let (ws_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let mapping_path = settings.mapping_path();
        Self {
            pipeline_config: PipelineConfig::from(&settings),
            workers: Arc::new(Semaphore::new(settings.worker_threads.max(1))),
            settings,
            registry: Arc::new(RwLock::new(registry)),
            mapping_path,
            virtual_camera: Arc::new(virtual_camera),
            ws_tx,
            profiler: Mutex::new(FrameProfiler::new()),
            viewers: AtomicUsize::new(0),
        }
    }

    pub fn settings(&self) -> &AppSettings {
        &self.settings
    }

    pub fn registry(&self) -> &Arc<RwLock<EffectRegistry>> {
        &self.registry
    }

    pub fn virtual_camera(&self) -> &VirtualCamera {
        &self.virtual_camera
    }

    pub fn workers(&self) -> Arc<Semaphore> {
        self.workers.clone()
    }

    /// Build the pipeline owned by one connection
    pub fn new_pipeline(&self) -> Pipeline {
        Pipeline::new(&self.pipeline_config, self.registry.clone(), ml::create_detector())
            .with_virtual_camera(self.virtual_camera.clone())
    }

    // ========== Events ==========

    pub fn subscribe(&self) -> broadcast::Receiver<WsEvent> {
        self.ws_tx.subscribe()
    }

    /// Broadcast an event to every viewer
    ///
    /// Having no viewers is not an error.
    pub fn broadcast(&self, event: WsEvent) {
        let _ = self.ws_tx.send(event);
    }

    // ========== Effects ==========

    /// Flip an effect's enabled flag and tell every viewer
    ///
    /// Returns `None` for identifiers that are neither mapped nor built in;
    /// those are not recorded or broadcast.
    pub fn toggle_effect(&self, effect_id: &str) -> Option<bool> {
        let enabled = {
            let mut registry = self.registry.write();
            if !registry.is_known(effect_id) {
                tracing::warn!(effect = effect_id, "Ignoring toggle of unknown effect");
                return None;
            }
            registry.toggle(effect_id)
        };
        tracing::info!(effect = effect_id, enabled, "Effect toggled");
        self.broadcast(WsEvent::EffectToggled {
            effect: effect_id.to_string(),
            enabled,
        });
        Some(enabled)
    }

    /// Replace a gesture's mapping and persist the registry
    ///
    /// The live registry is only replaced once the new mapping is on disk.
    pub fn update_mapping(&self, gesture: Gesture, effects: Vec<String>) -> Result<(), RegistryError> {
        let mut registry = self.registry.write();
        let mut updated = registry.clone();
        updated.register_mapping(gesture, effects);
        updated.save(&self.mapping_path)?;
        *registry = updated;
        tracing::info!(gesture = %gesture, effects = ?registry.mapping(gesture), "Gesture mapping updated");
        Ok(())
    }

    // ========== Metrics ==========

    pub fn profiler(&self) -> &Mutex<FrameProfiler> {
        &self.profiler
    }

    pub fn viewer_count(&self) -> usize {
        self.viewers.load(Ordering::Relaxed)
    }

    pub(crate) fn viewer_connected(&self) -> usize {
        self.viewers.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub(crate) fn viewer_disconnected(&self) -> usize {
        self.viewers.fetch_sub(1, Ordering::Relaxed).saturating_sub(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::VirtualCameraConfig;

    fn context(dir: &std::path::Path) -> AppContext {
        let settings = AppSettings {
            mapping_path: Some(dir.join("mappings.json")),
            ..Default::default()
        };
        AppContext::new(
            settings,
            EffectRegistry::with_default_mappings(),
            VirtualCamera::disabled(VirtualCameraConfig::default()),
        )
    }

    #[test]
    fn test_toggle_effect_broadcasts() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(dir.path());
        let mut rx = ctx.subscribe();

        assert_eq!(ctx.toggle_effect("vhs"), Some(false));
        assert!(!ctx.registry().read().is_enabled("vhs"));

        match rx.try_recv().unwrap() {
            WsEvent::EffectToggled { effect, enabled } => {
                assert_eq!(effect, "vhs");
                assert!(!enabled);
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn test_update_mapping_persists() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(dir.path());
        ctx.update_mapping(Gesture::Smile, vec!["vhs".to_string(), "matrix".to_string()])
            .unwrap();

        let stored = EffectRegistry::load(&dir.path().join("mappings.json"));
        assert_eq!(stored.mapping(Gesture::Smile), ["vhs", "matrix"]);
    }

    #[test]
    fn test_toggle_unknown_effect_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(dir.path());
        let mut rx = ctx.subscribe();

        assert_eq!(ctx.toggle_effect("bogus"), None);
        assert!(!ctx.registry().read().enablement().contains_key("bogus"));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_failed_save_keeps_mapping() {
        let dir = tempfile::tempdir().unwrap();
        // A regular file where the mapping's parent directory should be
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, b"").unwrap();
        let settings = AppSettings {
            mapping_path: Some(blocker.join("mappings.json")),
            ..Default::default()
        };
        let ctx = AppContext::new(
            settings,
            EffectRegistry::with_default_mappings(),
            VirtualCamera::disabled(VirtualCameraConfig::default()),
        );

        assert!(ctx.update_mapping(Gesture::Smile, vec!["vhs".to_string()]).is_err());
        assert_eq!(ctx.registry().read().mapping(Gesture::Smile), ["liquify"]);
    }

    #[test]
    fn test_viewer_counter() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(dir.path());
        assert_eq!(ctx.viewer_connected(), 1);
        assert_eq!(ctx.viewer_connected(), 2);
        assert_eq!(ctx.viewer_disconnected(), 1);
        assert_eq!(ctx.viewer_count(), 1);
    }

    #[test]
    fn test_pipelines_share_registry() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(dir.path());
        let _pipeline = ctx.new_pipeline();
        assert_eq!(Arc::strong_count(ctx.registry()), 2);
    }
}
