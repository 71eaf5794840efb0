use anyhow::Context;
use clap::Parser;
use gui_bridge::bridge::{gui_bind_address, GuiBridge};
use log::info;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;
use tokio::runtime::Builder as TokioBuilder;
use tokio::signal;
use vitalcore::runtime::spawn_publisher;
use vitalcore::telemetry::TelemetryLogger;
use workflow::config::WorkflowConfig;
use workflow::runner::Runner;

mod generator;
mod gui_bridge;
mod workflow;

#[derive(Parser)]
#[command(author, version, about = "Synthetic radar driver for the vital-signs pipeline")]
struct Args {
    /// Process a finite synthetic recording and append a summary report
    #[arg(long, default_value_t = false)]
    offline: bool,
    /// Load a workflow config from YAML
    #[arg(long)]
    workflow: Option<PathBuf>,
    #[arg(long, default_value_t = 0.25)]
    breathing_hz: f64,
    #[arg(long, default_value_t = 1.2)]
    heart_hz: f64,
    #[arg(long, default_value_t = 60.0)]
    duration_s: f64,
    /// Run the pipeline live at the frame rate and serve snapshots over HTTP
    #[arg(long, default_value_t = false)]
    serve: bool,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let workflow_config = if let Some(path) = args.workflow {
        WorkflowConfig::load(path)?
    } else {
        WorkflowConfig::from_args(args.breathing_hz, args.heart_hz, args.duration_s)
    };

    if args.offline {
        let runner = Runner::new(workflow_config.clone());
        let result = runner.execute().context("running offline workflow")?;

        println!(
            "Offline run -> breathing {:.0}/min, heart {:.0}/min, present {}, inhalations {}, exhalations {}",
            result.breathing_bpm,
            result.heart_bpm,
            result.present,
            result.inhalations,
            result.exhalations
        );

        let report_path = PathBuf::from("tools/data/offline_vitals.log");
        if let Some(parent) = report_path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&report_path)
            .with_context(|| format!("opening {}", report_path.display()))?;
        file.write_all(result.report_line().as_bytes())
            .context("writing offline report")?;
    }

    if args.serve {
        let mut live_config = workflow_config;
        live_config.generator.realtime = true;
        let interval = Duration::from_millis(live_config.pipeline.runtime.publish_interval_ms);
        let pipeline_config = live_config.pipeline.clone();
        let runner = Runner::new(live_config);

        let runtime = TokioBuilder::new_multi_thread()
            .enable_all()
            .build()
            .context("creating runtime for live processing")?;
        runtime.block_on(async {
            let handle = runner.start().context("starting live pipeline")?;
            let bridge = GuiBridge::new(handle.updates(), pipeline_config);
            let server = bridge.serve(gui_bind_address());
            let bridge_publisher = spawn_publisher(handle.subscribe(), bridge.clone(), interval);
            let telemetry_publisher =
                spawn_publisher(handle.subscribe(), TelemetryLogger::new(), interval);
            bridge.publish_status("HTTP bridge running (Ctrl+C to stop)...");

            signal::ctrl_c().await.context("awaiting Ctrl+C to exit")?;
            bridge.publish_status("shutting down");
            handle.shutdown();
            let pipeline = handle.join().await.context("stopping live pipeline")?;
            bridge_publisher.await.context("stopping bridge publisher")?;
            telemetry_publisher
                .await
                .context("stopping telemetry publisher")?;
            server.abort();

            info!(
                "live run finished after {} cycles, {} frames dropped",
                pipeline.cycle(),
                pipeline.metrics().snapshot().frames_dropped
            );
            Ok::<(), anyhow::Error>(())
        })?;
    }

    Ok(())
}
