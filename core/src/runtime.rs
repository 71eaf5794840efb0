//! Producer/consumer runtime around [`VitalPipeline`].
//!
//! A blocking producer pulls frames from a [`FrameSource`] and offers them to
//! a bounded queue without waiting; frames that do not fit are dropped and
//! counted. A single processing task owns the pipeline, applies configuration
//! commands between cycles (also while the source is idle) and publishes an
//! immutable snapshot after every pass. Presentation reads snapshots on its own timer.

use crate::interface::{FrameSource, PipelineSnapshot, RadarFrame, SourceError};
use crate::pipeline::VitalPipeline;
use crate::prelude::ConfigUpdate;
use crate::telemetry::log::LogManager;
use crate::telemetry::metrics::MetricsRecorder;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

/// Receiver of published snapshots, driven by the presentation timer.
pub trait SnapshotSink: Send {
    fn publish(&mut self, snapshot: &PipelineSnapshot);
}

#[derive(thiserror::Error, Debug)]
pub enum RuntimeError {
    #[error("frame source failed: {0}")]
    Source(#[from] SourceError),
    #[error("runtime task failed: {0}")]
    Join(String),
}

/// Control surface of a running pipeline.
pub struct PipelineHandle {
    updates: mpsc::UnboundedSender<ConfigUpdate>,
    snapshots: watch::Receiver<Arc<PipelineSnapshot>>,
    shutdown: watch::Sender<bool>,
    stop: Arc<AtomicBool>,
    metrics: Arc<MetricsRecorder>,
    consumer: JoinHandle<VitalPipeline>,
    producer: JoinHandle<Result<(), SourceError>>,
}

/// Starts the producer and the processing task. Must be called from within
/// a tokio runtime.
pub fn spawn<S>(pipeline: VitalPipeline, source: S) -> PipelineHandle
where
    S: FrameSource + Send + 'static,
{
    let runtime = pipeline.config().runtime.clone();
    let metrics = pipeline.metrics();
    let (frame_tx, frame_rx) = mpsc::channel(runtime.queue_capacity.max(1));
    let (update_tx, update_rx) = mpsc::unbounded_channel();
    let (snapshot_tx, snapshot_rx) = watch::channel(Arc::new(pipeline.snapshot()));
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let stop = Arc::new(AtomicBool::new(false));

    LogManager::new("runtime").notice(&format!(
        "starting: queue capacity {}, batch limit {}",
        runtime.queue_capacity, runtime.max_batch
    ));

    let producer = {
        let stop = Arc::clone(&stop);
        let metrics = Arc::clone(&metrics);
        tokio::task::spawn_blocking(move || run_producer(source, frame_tx, stop, metrics))
    };
    let consumer = tokio::spawn(run_consumer(
        pipeline,
        frame_rx,
        update_rx,
        shutdown_rx,
        snapshot_tx,
        runtime.max_batch.max(1),
    ));

    PipelineHandle {
        updates: update_tx,
        snapshots: snapshot_rx,
        shutdown: shutdown_tx,
        stop,
        metrics,
        consumer,
        producer,
    }
}

impl PipelineHandle {
    /// Queues a configuration change; it is applied before the next cycle,
    /// or right away while the source is idle.
    /// Returns false once the processing task has stopped.
    pub fn send_update(&self, update: ConfigUpdate) -> bool {
        self.updates.send(update).is_ok()
    }

    pub fn updates(&self) -> mpsc::UnboundedSender<ConfigUpdate> {
        self.updates.clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<PipelineSnapshot>> {
        self.snapshots.clone()
    }

    pub fn latest(&self) -> Arc<PipelineSnapshot> {
        Arc::clone(&self.snapshots.borrow())
    }

    pub fn metrics(&self) -> Arc<MetricsRecorder> {
        Arc::clone(&self.metrics)
    }

    /// Asks both tasks to stop after the cycle in progress.
    pub fn shutdown(&self) {
        self.stop.store(true, Ordering::SeqCst);
        let _ = self.shutdown.send(true);
    }

    /// Waits for both tasks and hands the pipeline back. A frame-source
    /// failure surfaces here.
    pub async fn join(self) -> Result<VitalPipeline, RuntimeError> {
        let pipeline = self
            .consumer
            .await
            .map_err(|err| RuntimeError::Join(err.to_string()))?;
        self.stop.store(true, Ordering::SeqCst);
        self.producer
            .await
            .map_err(|err| RuntimeError::Join(err.to_string()))??;
        LogManager::new("runtime").notice(&format!("stopped after {} cycles", pipeline.cycle()));
        Ok(pipeline)
    }
}

fn run_producer<S: FrameSource>(
    mut source: S,
    frames: mpsc::Sender<RadarFrame>,
    stop: Arc<AtomicBool>,
    metrics: Arc<MetricsRecorder>,
) -> Result<(), SourceError> {
    let logger = LogManager::new("producer");
    while !stop.load(Ordering::SeqCst) {
        let frame = match source.next_frame() {
            Ok(Some(frame)) => frame,
            Ok(None) => {
                logger.notice("frame source exhausted");
                break;
            }
            Err(err) => {
                logger.warn(&format!("frame source failed: {}", err));
                return Err(err);
            }
        };
        match frames.try_send(frame) {
            Ok(()) => {}
            Err(TrySendError::Full(frame)) => {
                metrics.record_dropped();
                logger.record(&format!("queue full, dropped frame at t={:.3}s", frame.timestamp));
            }
            Err(TrySendError::Closed(_)) => break,
        }
    }
    Ok(())
}

async fn run_consumer(
    mut pipeline: VitalPipeline,
    mut frames: mpsc::Receiver<RadarFrame>,
    mut updates: mpsc::UnboundedReceiver<ConfigUpdate>,
    mut shutdown: watch::Receiver<bool>,
    snapshots: watch::Sender<Arc<PipelineSnapshot>>,
    max_batch: usize,
) -> VitalPipeline {
    let logger = LogManager::new("consumer");
    let mut updates_open = true;
    loop {
        let first = tokio::select! {
            biased;
            _ = shutdown.changed() => break,
            update = updates.recv(), if updates_open => {
                match update {
                    Some(update) => {
                        if pipeline.apply(update).is_ok() {
                            snapshots.send_replace(Arc::new(pipeline.snapshot()));
                        }
                    }
                    None => updates_open = false,
                }
                continue;
            }
            frame = frames.recv() => match frame {
                Some(frame) => frame,
                None => break,
            },
        };

        while let Ok(update) = updates.try_recv() {
            // rejections are logged and counted by the pipeline
            let _ = pipeline.apply(update);
        }

        let mut batch = Vec::with_capacity(max_batch);
        batch.push(first);
        while batch.len() < max_batch {
            match frames.try_recv() {
                Ok(frame) => batch.push(frame),
                Err(_) => break,
            }
        }

        match pipeline.process_batch(batch) {
            Ok(Some(_)) => {
                snapshots.send_replace(Arc::new(pipeline.snapshot()));
            }
            Ok(None) => {}
            Err(err) => logger.warn(&format!("processing pass failed: {}", err)),
        }
    }
    pipeline
}

/// Forwards new snapshots to `sink` every `interval` until the processing
/// task stops; the final snapshot is always delivered. Returns the sink.
pub fn spawn_publisher<S>(
    mut snapshots: watch::Receiver<Arc<PipelineSnapshot>>,
    mut sink: S,
    interval: Duration,
) -> JoinHandle<S>
where
    S: SnapshotSink + 'static,
{
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        let mut last_cycle = None;
        loop {
            ticker.tick().await;
            match snapshots.has_changed() {
                Ok(true) => {
                    let snapshot = Arc::clone(&snapshots.borrow_and_update());
                    last_cycle = Some(snapshot.cycle);
                    sink.publish(&snapshot);
                }
                Ok(false) => {}
                Err(_) => {
                    let snapshot = Arc::clone(&snapshots.borrow());
                    if last_cycle != Some(snapshot.cycle) {
                        sink.publish(&snapshot);
                    }
                    break;
                }
            }
        }
        sink
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interface::synthetic::{reflector_frame, vital_sign_frames};
    use crate::interface::{FrameReplay, VitalMotion};
    use crate::prelude::{Band, RangeGate, VitalConfig};
    use std::sync::mpsc as std_mpsc;

    struct ChannelSource(std_mpsc::Receiver<RadarFrame>);

    impl FrameSource for ChannelSource {
        fn next_frame(&mut self) -> Result<Option<RadarFrame>, SourceError> {
            Ok(self.0.recv().ok())
        }
    }

    struct FailingSource {
        remaining: usize,
    }

    impl FrameSource for FailingSource {
        fn next_frame(&mut self) -> Result<Option<RadarFrame>, SourceError> {
            if self.remaining == 0 {
                return Err(SourceError::Device("usb reset".into()));
            }
            self.remaining -= 1;
            let radar = VitalConfig::default().radar;
            Ok(Some(reflector_frame(&radar, 40, 1.0, 0.0, 0.0)))
        }
    }

    struct RepeatingSource {
        frame: RadarFrame,
    }

    impl FrameSource for RepeatingSource {
        fn next_frame(&mut self) -> Result<Option<RadarFrame>, SourceError> {
            std::thread::sleep(Duration::from_millis(1));
            Ok(Some(self.frame.clone()))
        }
    }

    #[derive(Default)]
    struct CollectingSink {
        cycles: Vec<u64>,
    }

    impl SnapshotSink for CollectingSink {
        fn publish(&mut self, snapshot: &PipelineSnapshot) {
            self.cycles.push(snapshot.cycle);
        }
    }

    fn pipeline() -> VitalPipeline {
        VitalPipeline::new(VitalConfig::default()).unwrap()
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn replayed_frames_are_processed_or_counted_as_dropped() {
        let config = VitalConfig::default();
        let frames = vital_sign_frames(&config.radar, 40, 1.0, &VitalMotion::default(), 10.0);
        let total = frames.len();

        let handle = spawn(pipeline(), FrameReplay::new(frames));
        let metrics = handle.metrics();
        let pipeline = handle.join().await.unwrap();

        let counts = metrics.snapshot();
        assert_eq!(counts.frames_processed + counts.frames_dropped, total);
        assert!(counts.frames_processed > 0);
        assert!(pipeline.cycle() >= 1);
        assert_eq!(counts.passes as u64, pipeline.cycle());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn updates_are_applied_before_the_next_cycle() {
        let (tx, rx) = std_mpsc::channel();
        let handle = spawn(pipeline(), ChannelSource(rx));
        assert!(handle.send_update(ConfigUpdate::BreathingBand(Band::new(0.2, 0.5))));
        assert!(handle.send_update(ConfigUpdate::HeartBand(Band::new(3.0, 1.0))));

        let radar = VitalConfig::default().radar;
        tx.send(reflector_frame(&radar, 40, 1.0, 0.0, 0.0)).unwrap();
        drop(tx);

        let metrics = handle.metrics();
        let pipeline = handle.join().await.unwrap();
        assert_eq!(pipeline.config().bands.breathing, Band::new(0.2, 0.5));
        assert_eq!(pipeline.config().bands.heart, Band::new(0.85, 2.4));
        assert_eq!(metrics.snapshot().config_rejected, 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn updates_apply_while_the_source_is_idle() {
        let (tx, rx) = std_mpsc::channel::<RadarFrame>();
        let handle = spawn(pipeline(), ChannelSource(rx));
        let mut snapshots = handle.subscribe();
        let gate = RangeGate {
            start_m: 0.2,
            stop_m: 0.4,
        };
        assert!(handle.send_update(ConfigUpdate::RangeGate(gate)));

        tokio::time::timeout(Duration::from_secs(5), snapshots.changed())
            .await
            .unwrap()
            .unwrap();
        let latest = handle.latest();
        let radar = VitalConfig::default().radar;
        assert_eq!(latest.range.gate_bins.0, radar.range_to_bin(0.2));
        assert_eq!(latest.cycle, 0);

        handle.shutdown();
        drop(tx);
        let pipeline = handle.join().await.unwrap();
        assert_eq!(pipeline.config().processing.range_gate, gate);
        assert_eq!(pipeline.cycle(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn source_failure_is_fatal() {
        let handle = spawn(pipeline(), FailingSource { remaining: 3 });
        match handle.join().await {
            Err(RuntimeError::Source(SourceError::Device(message))) => {
                assert_eq!(message, "usb reset")
            }
            other => panic!("expected source failure, got {:?}", other.map(|p| p.cycle())),
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn shutdown_stops_an_endless_source() {
        let radar = VitalConfig::default().radar;
        let source = RepeatingSource {
            frame: reflector_frame(&radar, 40, 1.0, 0.3, 0.0),
        };
        let handle = spawn(pipeline(), source);
        tokio::time::sleep(Duration::from_millis(50)).await;
        handle.shutdown();
        let pipeline = handle.join().await.unwrap();
        assert_eq!(pipeline.buffer_len(), 2000);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn publisher_delivers_the_final_snapshot() {
        let (tx, rx) = std_mpsc::channel();
        let handle = spawn(pipeline(), ChannelSource(rx));
        let publisher = spawn_publisher(
            handle.subscribe(),
            CollectingSink::default(),
            Duration::from_millis(5),
        );

        let radar = VitalConfig::default().radar;
        for i in 0..5 {
            tx.send(reflector_frame(&radar, 40, 1.0, 0.1 * i as f64, i as f64 * 0.05))
                .unwrap();
        }
        drop(tx);

        let pipeline = handle.join().await.unwrap();
        let sink = publisher.await.unwrap();
        assert_eq!(sink.cycles.last().copied(), Some(pipeline.cycle()));
        assert!(sink.cycles.windows(2).all(|w| w[0] < w[1]));
    }
}
