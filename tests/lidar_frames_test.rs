// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

//! Integration tests for LiDAR frame playback from a directory of PCD files.

use edgefirst_radarstream::{
    lidar::{LidarFrame, Points},
    pacing::Pacing,
    pcd::{encode_frame, list_frames},
    playback::PlaybackController,
    producer::run_lidar,
    queue::{OverflowPolicy, bounded},
    radar::SourceMode,
};
use std::{
    path::Path,
    thread,
    time::{Duration, Instant},
};

fn write_frame(dir: &Path, name: &str, n_points: usize) {
    let mut points = Points::with_capacity(n_points);
    for i in 0..n_points {
        let f = i as f32;
        points.push(f, -f, f * 0.5, 100.0 + f);
    }
    std::fs::write(dir.join(name), encode_frame(&points)).unwrap();
}

#[test]
fn test_frames_played_in_numeric_order() {
    let dir = tempfile::tempdir().unwrap();
    write_frame(dir.path(), "frame_100.pcd", 1);
    write_frame(dir.path(), "frame_9.pcd", 3);
    write_frame(dir.path(), "frame_10.pcd", 2);
    // Truncated payload is skipped, not fatal
    let mut bad = encode_frame(&{
        let mut p = Points::empty();
        p.push(1.0, 2.0, 3.0, 4.0);
        p
    });
    bad.truncate(bad.len() - 8);
    std::fs::write(dir.path().join("frame_50.pcd"), bad).unwrap();

    let frames = list_frames(dir.path(), "pcd").unwrap();
    let indices: Vec<_> = frames.iter().map(|(i, _)| *i).collect();
    assert_eq!(indices, vec![9, 10, 50, 100]);

    let ctl = PlaybackController::new(SourceMode::Directory);
    ctl.start().unwrap();
    let (tx, rx) = bounded::<LidarFrame>("lidar", 128, OverflowPolicy::DropNewest).unwrap();
    let state = ctl.state();
    let handle = thread::spawn(move || {
        run_lidar(
            frames,
            tx,
            state,
            Pacing::WallClock(Duration::from_millis(2)),
            Duration::from_millis(5),
        )
    });

    let deadline = Instant::now() + Duration::from_secs(2);
    let mut received = Vec::new();
    while received.len() < 4 && Instant::now() < deadline {
        received.extend(rx.drain());
        thread::sleep(Duration::from_millis(1));
    }
    ctl.shutdown();
    let stats = handle.join().unwrap().unwrap();

    let order: Vec<_> = received.iter().map(|f| (f.index, f.len())).collect();
    assert_eq!(&order[..4], &[(9, 3), (10, 2), (100, 1), (9, 3)]);
    assert!(stats.io_errors >= 1);

    let first = &received[0];
    let (x, y, z, intensity) = first.points.iter().nth(2).unwrap();
    assert_eq!((x, y, z, intensity), (2.0, -2.0, 1.0, 102.0));
}

#[test]
fn test_paused_lidar_holds_position() {
    let dir = tempfile::tempdir().unwrap();
    write_frame(dir.path(), "frame_1.pcd", 1);
    write_frame(dir.path(), "frame_2.pcd", 1);

    let ctl = PlaybackController::new(SourceMode::Directory);
    ctl.start().unwrap();
    ctl.toggle_pause();

    let frames = list_frames(dir.path(), "pcd").unwrap();
    let (tx, rx) = bounded::<LidarFrame>("lidar", 16, OverflowPolicy::DropNewest).unwrap();
    let state = ctl.state();
    let handle = thread::spawn(move || {
        run_lidar(frames, tx, state, Pacing::None, Duration::from_millis(5))
    });

    thread::sleep(Duration::from_millis(30));
    assert!(rx.is_empty());

    ctl.toggle_pause();
    let deadline = Instant::now() + Duration::from_secs(2);
    while rx.is_empty() && Instant::now() < deadline {
        thread::sleep(Duration::from_millis(1));
    }
    ctl.shutdown();
    handle.join().unwrap().unwrap();

    assert_eq!(rx.try_pop().map(|f| f.index), Some(1));
}
