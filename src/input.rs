// src/input.rs
//
// Discovery and parsing of frame files. Each file is JSON lines, one frame
// per line, either tracker output or a prepared observation:
//   {"timestamp_s": 0.033, "objects": [{"track_id": 4, "cx": 612.0, "cy": 388.5}]}
//   {"count": 7, "speeds": [48.2, 51.0], "crossed_ids": [12]}
// A line is a tracked frame only if it has no keys beyond timestamp_s,
// objects and anomaly; anything else is read as an observation.

use crate::types::{FrameInput, IoConfig};
use anyhow::{Context, Result};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use walkdir::WalkDir;

const FRAME_FILE_EXTENSIONS: [&str; 3] = ["jsonl", "ndjson", "JSONL"];

pub struct InputSource {
    config: IoConfig,
}

impl InputSource {
    pub fn new(config: IoConfig) -> Self {
        Self { config }
    }

    pub fn find_frame_files(&self) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();

        for entry in WalkDir::new(&self.config.input_dir)
            .follow_links(true)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
        {
            let path = entry.path();
            if !entry.file_type().is_file() {
                continue;
            }
            if let Some(ext) = path.extension() {
                if FRAME_FILE_EXTENSIONS.contains(&ext.to_str().unwrap_or("")) {
                    files.push(path.to_path_buf());
                }
            }
        }

        info!("Found {} frame files", files.len());
        Ok(files)
    }
}

/// Lazily parse a frame file, one `FrameInput` per non-empty line
pub fn read_frames(path: &Path) -> Result<impl Iterator<Item = Result<FrameInput>>> {
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let display = path.display().to_string();

    Ok(BufReader::new(file)
        .lines()
        .enumerate()
        .filter_map(move |(idx, line)| {
            let line = match line {
                Ok(line) => line,
                Err(e) => {
                    return Some(Err(anyhow::Error::new(e)
                        .context(format!("reading {} line {}", display, idx + 1))))
                }
            };
            if line.trim().is_empty() {
                return None;
            }
            Some(
                serde_json::from_str::<FrameInput>(&line)
                    .with_context(|| format!("parsing {} line {}", display, idx + 1)),
            )
        }))
}

/// Parse every frame, skipping (and logging) malformed lines
pub fn load_frames_lenient(path: &Path) -> Result<Vec<FrameInput>> {
    let mut frames = Vec::new();
    let mut skipped = 0usize;

    for frame in read_frames(path)? {
        match frame {
            Ok(frame) => frames.push(frame),
            Err(e) => {
                skipped += 1;
                warn!("Skipping frame: {:#}", e);
            }
        }
    }

    if skipped > 0 {
        warn!("⚠️  {} malformed line(s) skipped in {}", skipped, path.display());
    }
    Ok(frames)
}
