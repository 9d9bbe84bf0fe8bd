//! Shared fixtures: synthetic MAT files, zip archives and in-memory stores.

#![allow(dead_code)]

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use mat2npy::pipeline::{ItemSettings, PipelineContext};
use mat2npy::store::{RemoteStore, StoreError};

// ============================================================================
// MAT v5 encoding
// ============================================================================

const MI_INT8: u32 = 1;
const MI_INT32: u32 = 5;
const MI_UINT32: u32 = 6;
const MI_DOUBLE: u32 = 9;
const MI_MATRIX: u32 = 14;
const MX_DOUBLE_CLASS: u32 = 6;

fn push_tag(buf: &mut Vec<u8>, data_type: u32, len: usize) {
    buf.extend_from_slice(&data_type.to_le_bytes());
    buf.extend_from_slice(&(len as u32).to_le_bytes());
}

fn pad8(buf: &mut Vec<u8>) {
    while buf.len() % 8 != 0 {
        buf.push(0);
    }
}

/// Encode a single double array as a little-endian level 5 MAT file.
/// `column_major` must already be in MATLAB (first index fastest) order.
pub fn mat5_bytes(name: &str, dims: &[usize], column_major: &[f64]) -> Vec<u8> {
    assert_eq!(dims.iter().product::<usize>(), column_major.len());

    let mut out = Vec::new();
    let mut text = b"MATLAB 5.0 MAT-file, Platform: test, Created by: mat2npy tests".to_vec();
    text.resize(116, b' ');
    out.extend_from_slice(&text);
    out.extend_from_slice(&[0u8; 8]);
    out.extend_from_slice(&0x0100u16.to_le_bytes());
    out.extend_from_slice(b"IM");

    let mut body = Vec::new();
    push_tag(&mut body, MI_UINT32, 8);
    body.extend_from_slice(&MX_DOUBLE_CLASS.to_le_bytes());
    body.extend_from_slice(&0u32.to_le_bytes());

    push_tag(&mut body, MI_INT32, dims.len() * 4);
    for dim in dims {
        body.extend_from_slice(&(*dim as i32).to_le_bytes());
    }
    pad8(&mut body);

    if name.len() <= 4 {
        let small = ((name.len() as u32) << 16) | MI_INT8;
        body.extend_from_slice(&small.to_le_bytes());
        let mut bytes = name.as_bytes().to_vec();
        bytes.resize(4, 0);
        body.extend_from_slice(&bytes);
    } else {
        push_tag(&mut body, MI_INT8, name.len());
        body.extend_from_slice(name.as_bytes());
        pad8(&mut body);
    }

    push_tag(&mut body, MI_DOUBLE, column_major.len() * 8);
    for value in column_major {
        body.extend_from_slice(&value.to_le_bytes());
    }
    pad8(&mut body);

    push_tag(&mut out, MI_MATRIX, body.len());
    out.extend_from_slice(&body);
    out
}

/// 3-D volume whose sample at (f, y, x) is `value(f, y, x)`, MAT encoded.
pub fn mat5_volume(
    name: &str,
    (frames, height, width): (usize, usize, usize),
    value: impl Fn(usize, usize, usize) -> f64,
) -> Vec<u8> {
    let mut data = Vec::with_capacity(frames * height * width);
    for x in 0..width {
        for y in 0..height {
            for f in 0..frames {
                data.push(value(f, y, x));
            }
        }
    }
    mat5_bytes(name, &[frames, height, width], &data)
}

/// Distinct value per sample so ordering mistakes show up.
pub fn ramp(f: usize, y: usize, x: usize) -> f64 {
    (f * 10_000 + y * 100 + x) as f64
}

// ============================================================================
// Archives
// ============================================================================

pub fn write_zip(path: &Path, entries: &[(&str, &[u8])]) {
    let file = File::create(path).expect("create zip");
    let mut zip = zip::ZipWriter::new(file);
    let options = zip::write::FileOptions::default();
    for (name, data) in entries {
        zip.start_file(*name, options).expect("start file");
        zip.write_all(data).expect("write entry");
    }
    zip.finish().expect("finish zip");
}

/// Zip holding one `cine.mat` with a `frames x 3 x 2` ramp volume.
pub fn write_volume_archive(path: &Path, frames: usize) {
    let mat = mat5_volume("CI_F", (frames, 3, 2), ramp);
    write_zip(path, &[("cine.mat", &mat)]);
}

// ============================================================================
// Stores
// ============================================================================

/// Records uploads in memory. Optionally fails every upload.
#[derive(Default)]
pub struct RecordingStore {
    pub fail_uploads: bool,
    pub folders: Mutex<Vec<String>>,
    pub uploads: Mutex<Vec<(String, Vec<u8>)>>,
}

impl RecordingStore {
    pub fn failing() -> Self {
        Self {
            fail_uploads: true,
            ..Self::default()
        }
    }

    pub fn uploaded_names(&self) -> Vec<String> {
        self.uploads
            .lock()
            .expect("lock")
            .iter()
            .map(|(name, _)| name.clone())
            .collect()
    }
}

impl RemoteStore for RecordingStore {
    fn ensure_folder(&self, folder: &str) -> Result<(), StoreError> {
        self.folders.lock().expect("lock").push(folder.to_string());
        Ok(())
    }

    fn upload(&self, local: &Path, _folder: &str) -> Result<(), StoreError> {
        if self.fail_uploads {
            return Err(StoreError::CommandFailed {
                command: "upload".to_string(),
                status: "exit status: 1".to_string(),
                stderr: "simulated".to_string(),
            });
        }
        let bytes = std::fs::read(local)?;
        let name = local
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        self.uploads.lock().expect("lock").push((name, bytes));
        Ok(())
    }
}

/// Panics on upload, after the local array has been written.
pub struct PanickingStore;

impl RemoteStore for PanickingStore {
    fn ensure_folder(&self, _folder: &str) -> Result<(), StoreError> {
        Ok(())
    }

    fn upload(&self, _local: &Path, _folder: &str) -> Result<(), StoreError> {
        panic!("store client crashed")
    }
}

// ============================================================================
// Context helpers
// ============================================================================

pub fn settings(scratch: &Path, target_frames: usize) -> ItemSettings {
    ItemSettings {
        scratch_dir: scratch.to_path_buf(),
        container_extension: ".mat".to_string(),
        target_frames,
        remote_dest: "/processed/npy".to_string(),
    }
}

pub fn context(
    scratch: &Path,
    target_frames: usize,
    store: Arc<dyn RemoteStore>,
) -> PipelineContext {
    PipelineContext::new(settings(scratch, target_frames), store)
}

/// Names of everything left in `dir`.
pub fn leftovers(dir: &Path) -> Vec<PathBuf> {
    std::fs::read_dir(dir)
        .expect("list dir")
        .map(|entry| entry.expect("entry").path())
        .collect()
}
