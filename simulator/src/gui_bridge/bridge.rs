use crate::gui_bridge::model::VisualizationModel;
use log::{info, warn};
use serde_json::json;
use std::{
    net::SocketAddr,
    sync::{Arc, RwLock},
};
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use vitalcore::interface::PipelineSnapshot;
use vitalcore::prelude::{ConfigUpdate, VitalConfig};
use vitalcore::runtime::SnapshotSink;
use warp::{http::StatusCode, Filter};

pub fn gui_bind_address() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 9000))
}

type SharedModel = Arc<RwLock<VisualizationModel>>;

/// HTTP bridge serving the latest snapshot and forwarding live configuration
/// commands to the processing task.
#[derive(Clone)]
pub struct GuiBridge {
    state: SharedModel,
    updates: UnboundedSender<ConfigUpdate>,
    config: Arc<VitalConfig>,
}

impl GuiBridge {
    /// `config` is the session configuration; commands are checked against
    /// it before they are queued.
    pub fn new(updates: UnboundedSender<ConfigUpdate>, config: VitalConfig) -> Self {
        Self {
            state: Arc::new(RwLock::new(VisualizationModel::default())),
            updates,
            config: Arc::new(config),
        }
    }

    /// `GET /snapshot`, `GET /telemetry` and `POST /config`.
    pub fn routes(
        &self,
    ) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
        let state = self.state.clone();
        let state_filter = warp::any().map(move || state.clone());
        let updates = self.updates.clone();
        let updates_filter = warp::any().map(move || updates.clone());
        let config = self.config.clone();
        let config_filter = warp::any().map(move || config.clone());

        let snapshot_route = warp::path("snapshot")
            .and(warp::path::end())
            .and(warp::get())
            .and(state_filter.clone())
            .map(|state: SharedModel| {
                let snapshot = state.read().ok().and_then(|model| model.snapshot.clone());
                match snapshot {
                    Some(snapshot) => warp::reply::with_status(
                        warp::reply::json(&*snapshot),
                        StatusCode::OK,
                    ),
                    None => warp::reply::with_status(
                        warp::reply::json(&json!({"status": "no snapshot yet"})),
                        StatusCode::SERVICE_UNAVAILABLE,
                    ),
                }
            });

        let telemetry_route = warp::path("telemetry")
            .and(warp::path::end())
            .and(warp::get())
            .and(state_filter)
            .map(|state: SharedModel| {
                let telemetry = state
                    .read()
                    .map(|model| model.telemetry())
                    .unwrap_or_default();
                warp::reply::json(&telemetry)
            });

        let config_route = warp::path("config")
            .and(warp::path::end())
            .and(warp::post())
            .and(warp::body::json())
            .and(updates_filter)
            .and(config_filter)
            .map(forward_update);

        snapshot_route.or(telemetry_route).or(config_route)
    }

    /// Serves the routes on `addr` from the current tokio runtime.
    pub fn serve(&self, addr: SocketAddr) -> JoinHandle<()> {
        let routes = self.routes();
        info!("[bridge] listening on http://{}", addr);
        tokio::spawn(warp::serve(routes).run(addr))
    }

    pub fn publish_status(&self, message: &str) {
        info!("[bridge] {}", message);
        if let Ok(mut model) = self.state.write() {
            model.status = message.to_string();
        }
    }

    #[cfg(test)]
    pub fn model(&self) -> VisualizationModel {
        self.state
            .read()
            .map(|model| model.clone())
            .unwrap_or_default()
    }
}

fn forward_update(
    update: ConfigUpdate,
    updates: UnboundedSender<ConfigUpdate>,
    config: Arc<VitalConfig>,
) -> warp::reply::WithStatus<warp::reply::Json> {
    if let Err(err) = update.validate(&config) {
        warn!("[bridge] rejected {:?}: {}", update, err);
        return warp::reply::with_status(
            warp::reply::json(&json!({"status": "rejected", "reason": err.to_string()})),
            StatusCode::BAD_REQUEST,
        );
    }
    match updates.send(update) {
        Ok(()) => {
            info!("[bridge] queued {:?}", update);
            warp::reply::with_status(
                warp::reply::json(&json!({"status": "queued"})),
                StatusCode::ACCEPTED,
            )
        }
        Err(_) => {
            warn!("[bridge] pipeline stopped, dropping {:?}", update);
            warp::reply::with_status(
                warp::reply::json(&json!({"status": "pipeline stopped"})),
                StatusCode::SERVICE_UNAVAILABLE,
            )
        }
    }
}

impl SnapshotSink for GuiBridge {
    fn publish(&mut self, snapshot: &PipelineSnapshot) {
        if let Ok(mut model) = self.state.write() {
            model.snapshot = Some(Arc::new(snapshot.clone()));
        }
    }
}
