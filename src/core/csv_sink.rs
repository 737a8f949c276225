use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::PathBuf;

use parking_lot::Mutex;

use crate::core::sampler::{PersistenceSink, Sample};
use crate::error::{HostmonError, Result};

/// Column header of the store
pub const CSV_HEADER: [&str; 4] = ["timestamp", "device", "measure", "value"];

/// Append-only CSV store.
///
/// Every append encodes the whole batch in memory, then writes it to the end
/// of the file in one piece and syncs. If any part of that fails the file is
/// cut back to its previous length, so a batch is on disk entirely or not at
/// all. Appends are serialized through `write_lock` so rows from the sampler
/// and the termination handler never interleave.
pub struct CsvSink {
    path: PathBuf,
    write_lock: Mutex<()>,
}

/// The file operations an append needs
trait StoreFile: Write {
    fn end_offset(&self) -> io::Result<u64>;
    fn truncate_to(&mut self, len: u64) -> io::Result<()>;
    fn sync(&mut self) -> io::Result<()>;
}

impl StoreFile for File {
    fn end_offset(&self) -> io::Result<u64> {
        Ok(self.metadata()?.len())
    }

    fn truncate_to(&mut self, len: u64) -> io::Result<()> {
        self.set_len(len)
    }

    fn sync(&mut self) -> io::Result<()> {
        self.sync_data()
    }
}

impl CsvSink {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }
}

fn encode_rows(rows: &[Sample], header: bool) -> Result<Vec<u8>> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());

    if header {
        writer.write_record(CSV_HEADER)?;
    }
    for sample in rows {
        writer.write_record(sample.to_record())?;
    }

    writer
        .into_inner()
        .map_err(|e| io::Error::new(e.error().kind(), e.error().to_string()).into())
}

/// Write `bytes` at the end of `file` as a unit.
///
/// On failure the file is truncated back to where it ended before the call.
fn append_all<F: StoreFile>(file: &mut F, bytes: &[u8]) -> io::Result<()> {
    let original_len = file.end_offset()?;

    if let Err(e) = write_through(file, bytes) {
        if let Err(rollback) = file.truncate_to(original_len) {
            log::error!("Could not remove partially written rows: {}", rollback);
        }
        return Err(e);
    }
    Ok(())
}

fn write_through<F: StoreFile>(file: &mut F, bytes: &[u8]) -> io::Result<()> {
    file.write_all(bytes)?;
    file.flush()?;
    file.sync()
}

impl PersistenceSink for CsvSink {
    fn initialize(&self, static_info: &[Sample]) -> Result<()> {
        let _guard = self.write_lock.lock();

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                HostmonError::startup(format!("cannot create directory {:?}: {}", parent, e))
            })?;
        }

        // a fresh run starts a fresh store
        let mut file = File::create(&self.path).map_err(|e| {
            HostmonError::startup(format!("cannot create {:?}: {}", self.path, e))
        })?;

        let bytes = encode_rows(static_info, true)?;
        append_all(&mut file, &bytes)
            .map_err(|e| HostmonError::startup(format!("cannot write {:?}: {}", self.path, e)))?;

        log::info!(
            "Initialized {:?} with {} static info rows",
            self.path,
            static_info.len()
        );
        Ok(())
    }

    fn append(&self, batch: &[Sample]) -> Result<()> {
        if batch.is_empty() {
            return Ok(());
        }
        let bytes = encode_rows(batch, false)?;

        let _guard = self.write_lock.lock();
        let mut file = OpenOptions::new()
            .append(true)
            .open(&self.path)
            .map_err(|e| HostmonError::sink_write(format!("cannot open {:?}: {}", self.path, e)))?;

        append_all(&mut file, &bytes)
            .map_err(|e| HostmonError::sink_write(format!("{:?}: {}", self.path, e)))
    }
}
