//! Session files: one CSV trial table appended after every trial, one `.npy`
//! joystick trace per trial, and a JSON snapshot of the settings used.

use crate::config::ExperimentConfig;
use crate::context::SubjectInfo;
use crate::error::{ExperimentError, Result};
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use vmex_core::{JoystickTrace, TrialRecord};

/// Receives each finished trial. Writes are synchronous: a trial's data is
/// on disk before the next trial starts.
pub trait TrialSink {
    fn record_trial(&mut self, record: &TrialRecord, trace: &JoystickTrace) -> Result<()>;
}

impl<K: TrialSink + ?Sized> TrialSink for &mut K {
    fn record_trial(&mut self, record: &TrialRecord, trace: &JoystickTrace) -> Result<()> {
        (**self).record_trial(record, trace)
    }
}

pub const TABLE_COLUMNS: [&str; 13] = [
    "ID",
    "trial",
    "fix_dur",
    "ready_dur",
    "go_dur",
    "post_go_dur",
    "ITI_dur",
    "target_angle",
    "cursor_displacement",
    "SSD",
    "GO/Stop",
    "start_mov",
    "full_mov",
];

/// `<root>/<subject>/ses<session>_<subject>/` and the file names inside it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionFiles {
    pub subject_dir: PathBuf,
    pub data_dir: PathBuf,
    pub subject: SubjectInfo,
}

impl SessionFiles {
    /// Creates the session directories. An existing subject directory is only
    /// a warning; an existing session directory asks `confirm_overwrite`,
    /// and a refusal ends the session before it starts.
    pub fn prepare<F>(root: &Path, subject: &SubjectInfo, confirm_overwrite: F) -> Result<Self>
    where
        F: FnOnce(&Path) -> bool,
    {
        let subject_dir = root.join(&subject.id);
        if subject_dir.is_dir() {
            warn!(path = %subject_dir.display(), "subject directory already exists");
        }
        fs::create_dir_all(&subject_dir)?;

        let data_dir = subject_dir.join(subject.stem());
        if data_dir.exists() {
            if !confirm_overwrite(&data_dir) {
                return Err(ExperimentError::DirectoryExists(data_dir));
            }
            warn!(path = %data_dir.display(), "continuing in existing session directory");
        } else {
            fs::create_dir(&data_dir)?;
        }

        Ok(Self {
            subject_dir,
            data_dir,
            subject: subject.clone(),
        })
    }

    pub fn table_path(&self) -> PathBuf {
        self.data_dir.join(format!("{}.csv", self.subject.stem()))
    }

    pub fn trace_path(&self, trial: usize) -> PathBuf {
        let stem = self.subject.stem();
        self.data_dir.join(format!("{stem}_trial{trial:04}.npy"))
    }

    pub fn settings_path(&self) -> PathBuf {
        let stem = self.subject.stem();
        self.data_dir.join(format!("{stem}_settings.json"))
    }
}

/// Writes the session's files as trials complete.
pub struct SessionWriter {
    files: SessionFiles,
    table: csv::Writer<File>,
    rows: usize,
}

impl SessionWriter {
    /// Starts a fresh trial table with its header row.
    pub fn create(files: SessionFiles) -> Result<Self> {
        let mut table = csv::Writer::from_writer(File::create(files.table_path())?);
        // Leading unnamed column holds the row index.
        table.write_record(std::iter::once("").chain(TABLE_COLUMNS))?;
        table.flush()?;
        info!(path = %files.table_path().display(), "trial table created");
        Ok(Self {
            files,
            table,
            rows: 0,
        })
    }

    pub fn files(&self) -> &SessionFiles {
        &self.files
    }

    pub fn write_settings(&self, config: &ExperimentConfig) -> Result<()> {
        let mut out = BufWriter::new(File::create(self.files.settings_path())?);
        serde_json::to_writer_pretty(&mut out, config)?;
        out.flush()?;
        Ok(())
    }
}

impl TrialSink for SessionWriter {
    fn record_trial(&mut self, record: &TrialRecord, trace: &JoystickTrace) -> Result<()> {
        let index = self.rows.to_string();
        self.table.write_record(std::iter::once(index).chain(table_row(record)))?;
        self.table.flush()?;
        self.rows += 1;

        let mut npy = BufWriter::new(File::create(self.files.trace_path(record.trial))?);
        write_npy(&mut npy, &trace.rows())?;
        npy.flush()?;
        Ok(())
    }
}

fn opt<T: ToString>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

/// One trial-table row in `TABLE_COLUMNS` order. Flags are written as 0/1.
pub fn table_row(record: &TrialRecord) -> [String; TABLE_COLUMNS.len()] {
    [
        record.subject_id.clone(),
        record.trial.to_string(),
        record.fix_dur.to_string(),
        record.ready_dur.to_string(),
        record.go_dur.to_string(),
        record.post_go_dur.to_string(),
        record.iti_dur.to_string(),
        record.target_angle.to_string(),
        opt(record.cursor_displacement),
        opt(record.ssd),
        opt(record.kind.map(|k| k.code())),
        u8::from(record.movement.start_mov).to_string(),
        u8::from(record.movement.full_mov).to_string(),
    ]
}

/// Writes a C-ordered little-endian f64 array of shape (rows, cols) in NumPy
/// `.npy` v1.0 format. All rows must have the same length.
pub fn write_npy<W: Write>(out: &mut W, rows: &[Vec<f64>]) -> io::Result<()> {
    let cols = rows.first().map_or(0, Vec::len);
    if rows.iter().any(|row| row.len() != cols) {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            "ragged rows cannot form an array",
        ));
    }

    let mut header = format!(
        "{{'descr': '<f8', 'fortran_order': False, 'shape': ({}, {}), }}",
        rows.len(),
        cols
    );
    // magic (6) + version (2) + header length (2) + header, padded to 64 bytes
    // and terminated by a newline.
    let unpadded = 10 + header.len() + 1;
    header.push_str(&" ".repeat((64 - unpadded % 64) % 64));
    header.push('\n');

    out.write_all(b"\x93NUMPY\x01\x00")?;
    out.write_all(&(header.len() as u16).to_le_bytes())?;
    out.write_all(header.as_bytes())?;
    for value in rows.iter().flatten() {
        out.write_all(&value.to_le_bytes())?;
    }
    Ok(())
}
