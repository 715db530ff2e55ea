// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

mod args;

use args::Args;
use clap::Parser as _;
use edgefirst_radarstream::{
    decoder::RecordFormat,
    display::{DisplayLoop, FrameConsumer},
    lidar::LidarFrame,
    line_source::ProcessSource,
    pcd::list_frames,
    playback::{PlaybackCommand, PlaybackController, Progress},
    producer::{
        DEFAULT_POLL_INTERVAL, DirectoryProducer, ProducerStats, StreamOptions, run_lidar,
        spawn_named, spawn_stream,
    },
    queue::bounded,
    radar::{Error, SectorFrame, SourceMode},
    recorder::{RotationRecorder, record_stream},
};
use std::{
    io::BufRead as _,
    thread::JoinHandle,
    time::{Duration, Instant},
};
use tracing::{debug, error, info, warn};
use tracing_subscriber::{Layer as _, fmt, layer::SubscriberExt as _, util::SubscriberInitExt as _};

type ProducerHandle = JoinHandle<Result<ProducerStats, Error>>;

const REPORT_INTERVAL: Duration = Duration::from_secs(1);

/// Stands in for the renderer: counts what was drained and logs a summary
/// once per second.
struct LogConsumer {
    sectors: u64,
    returns: u64,
    lidar_frames: u64,
    lidar_points: u64,
    last_report: Instant,
}

impl LogConsumer {
    fn new() -> Self {
        Self {
            sectors: 0,
            returns: 0,
            lidar_frames: 0,
            lidar_points: 0,
            last_report: Instant::now(),
        }
    }
}

impl FrameConsumer for LogConsumer {
    fn sector_frame(&mut self, frame: SectorFrame) {
        self.sectors += 1;
        self.returns += frame.len() as u64;
    }

    fn lidar_frame(&mut self, frame: LidarFrame) {
        self.lidar_frames += 1;
        self.lidar_points += frame.len() as u64;
    }

    fn tick(&mut self, progress: Progress) {
        if self.last_report.elapsed() < REPORT_INTERVAL {
            return;
        }
        self.last_report = Instant::now();

        if progress.total_files > 0 {
            info!(
                "{} file {}/{}: {} sectors ({} returns), {} lidar frames ({} points)",
                progress.state,
                progress.current_file_index + 1,
                progress.total_files,
                self.sectors,
                self.returns,
                self.lidar_frames,
                self.lidar_points
            );
        } else {
            info!(
                "{}: {} sectors ({} returns), {} lidar frames ({} points)",
                progress.state, self.sectors, self.returns, self.lidar_frames, self.lidar_points
            );
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_thread_names(true)
                .with_target(false)
                .with_filter(args.rust_log),
        )
        .init();

    match args.mode.source_mode() {
        Some(mode) => play(args, mode).await,
        None => record(args).await,
    }
}

/// Shut down on Ctrl-C.
fn handle_interrupt(ctl: PlaybackController) {
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => ctl.shutdown(),
            Err(e) => warn!("cannot listen for Ctrl-C: {}", e),
        }
    });
}

/// Read playback commands from standard input, one per line.
fn spawn_commands(ctl: PlaybackController) -> Result<(), Error> {
    spawn_named("commands", move || {
        for line in std::io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            if line.trim().is_empty() {
                continue;
            }
            match line.parse::<PlaybackCommand>() {
                Ok(command) => {
                    debug!("command {:?}", command);
                    ctl.apply(command);
                    if command == PlaybackCommand::Shutdown {
                        break;
                    }
                }
                Err(e) => warn!("{}", e),
            }
        }
        // End of input leaves playback running; Ctrl-C still stops it.
    })?;
    Ok(())
}

async fn play(args: Args, mode: SourceMode) -> Result<(), Box<dyn std::error::Error>> {
    let ctl = PlaybackController::new(mode);
    let state = ctl.state();
    let capacities = args.capacities();

    let (radar_tx, radar_rx) = bounded::<SectorFrame>("radar", capacities.radar(mode), args.overflow)?;
    let mut producers: Vec<(&'static str, ProducerHandle)> = Vec::new();

    match mode {
        SourceMode::Live => {
            ctl.start()?;
            let program = args.live_decoder.clone();
            let address = args.multicast_addr.clone();
            let stop_timeout = args.stop_timeout();
            info!("live radar from {} via {}", address, program);
            let handle = spawn_stream(
                "radar-live",
                move || {
                    Ok(ProcessSource::spawn(&program, ["-a", address.as_str()])?
                        .with_stop_timeout(stop_timeout))
                },
                radar_tx,
                state.clone(),
                StreamOptions {
                    format: RecordFormat::Csv,
                    ..Default::default()
                },
            )?;
            producers.push(("radar-live", handle));
        }
        SourceMode::File => {
            ctl.start()?;
            let program = args.file_decoder.clone();
            let target = args.require_target()?.clone();
            let stop_timeout = args.stop_timeout();
            info!("replaying {} via {}", target.display(), program);
            let handle = spawn_stream(
                "radar-file",
                move || {
                    Ok(ProcessSource::spawn(&program, [target.as_os_str()])?
                        .with_stop_timeout(stop_timeout))
                },
                radar_tx,
                state.clone(),
                StreamOptions {
                    format: RecordFormat::Csv,
                    pausable: true,
                    ..Default::default()
                },
            )?;
            producers.push(("radar-file", handle));
        }
        SourceMode::Directory => {
            let files = ctl.enumerate(args.require_target()?, &args.extension)?;
            let producer =
                DirectoryProducer::new(files, radar_tx, state.clone(), args.directory_pacing());
            let handle = spawn_named("radar-directory", move || producer.run())?;
            producers.push(("radar-directory", handle));
        }
    }

    let mut display = DisplayLoop::new(radar_rx, state.clone())
        .with_frame_rate(args.frame_rate)
        .with_stale_threshold(args.stale_threshold());

    if let Some(dir) = &args.lidar_dir {
        let frames = list_frames(dir, &args.lidar_extension)?;
        info!("found {} lidar frames in {}", frames.len(), dir.display());
        let (lidar_tx, lidar_rx) = bounded::<LidarFrame>("lidar", capacities.lidar, args.overflow)?;
        let pacing = args.lidar_pacing();
        let lidar_state = state.clone();
        let handle = spawn_named("lidar", move || {
            run_lidar(frames, lidar_tx, lidar_state, pacing, DEFAULT_POLL_INTERVAL)
        })?;
        producers.push(("lidar", handle));
        display = display.with_lidar(lidar_rx);
    }

    handle_interrupt(ctl.clone());
    spawn_commands(ctl.clone())?;

    let display = spawn_named("display", move || {
        let mut consumer = LogConsumer::new();
        display.run(&mut consumer);
        consumer
    })?;

    let joined = tokio::task::spawn_blocking(move || {
        let consumer = display.join();
        let results: Vec<_> = producers
            .into_iter()
            .map(|(name, handle)| (name, handle.join()))
            .collect();
        (consumer, results)
    })
    .await?;

    let (consumer, results) = joined;
    if let Ok(consumer) = consumer {
        info!(
            "displayed {} sectors and {} lidar frames",
            consumer.sectors, consumer.lidar_frames
        );
    }

    for (name, result) in results {
        match result {
            Ok(Ok(stats)) => info!(
                "{}: {} lines, {} frames, {} dropped, {} parse errors, {} read errors",
                name, stats.lines, stats.frames, stats.dropped, stats.parse_errors, stats.io_errors
            ),
            Ok(Err(e)) => error!("{} failed: {}", name, e),
            Err(_) => error!("{} panicked", name),
        }
    }

    Ok(())
}

async fn record(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let target = args.require_target()?.clone();
    let out_dir = args.record_dir()?;

    let ctl = PlaybackController::new(SourceMode::File);
    ctl.start()?;
    handle_interrupt(ctl.clone());

    let recorder = RotationRecorder::new(&out_dir)?;
    let source = ProcessSource::spawn(&args.file_decoder, [target.as_os_str()])?
        .with_stop_timeout(args.stop_timeout());
    info!(
        "recording {} into {}",
        target.display(),
        out_dir.display()
    );

    let recorder = record_stream(source, recorder, ctl.state(), DEFAULT_POLL_INTERVAL).await?;
    info!(
        "wrote {} rotation files to {}",
        recorder.rotations(),
        recorder.out_dir().display()
    );
    Ok(())
}
