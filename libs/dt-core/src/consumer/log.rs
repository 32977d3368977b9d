use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use dt_api::{Consumer, CoreError, Event};
use fs2::FileExt;

use crate::config::LogConsumerConfig;
use crate::{core_debug, core_info};

const HOUR_SECS: i64 = 3600;

/// Source of the current Unix time in seconds.
pub type Clock = Box<dyn Fn() -> i64 + Send>;

fn system_clock() -> i64 {
    chrono::Utc::now().timestamp()
}

fn hour_of(secs: i64) -> i64 {
    secs - secs.rem_euclid(HOUR_SECS)
}

/// `{prefix}-{hour}_{revision}.log`
pub fn shard_file_name(prefix: &str, hour: i64, revision: u32) -> String {
    format!("{prefix}-{hour}_{revision}.log")
}

fn parse_revision(file_name: &str, prefix: &str, hour: i64) -> Option<u32> {
    file_name
        .strip_prefix(prefix)?
        .strip_prefix('-')?
        .strip_prefix(hour.to_string().as_str())?
        .strip_prefix('_')?
        .strip_suffix(".log")?
        .parse()
        .ok()
}

fn lock_file_name(prefix: &str) -> String {
    format!("dt-sdk-{prefix}.lock")
}

// ════════════════════════════════════════════════════════════════
//  DirLock
// ════════════════════════════════════════════════════════════════

/// Exclusive lock on `dt-sdk-{prefix}.lock` in the log directory.
///
/// Only one writer may own a directory and prefix pair. The lock file is
/// removed again on drop.
#[derive(Debug)]
struct DirLock {
    file: File,
    path: PathBuf,
}

impl DirLock {
    fn acquire(dir: &Path, prefix: &str) -> Result<Self, CoreError> {
        let path = dir.join(lock_file_name(prefix));
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .read(true)
            .write(true)
            .open(&path)
            .map_err(|e| CoreError::from(e).with_context(format!("open {}", path.display())))?;
        file.try_lock_exclusive().map_err(|e| {
            CoreError::state(format!(
                "{} is held by another writer, or was left behind by a crashed one: {e}",
                path.display()
            ))
        })?;
        Ok(Self { file, path })
    }
}

impl Drop for DirLock {
    fn drop(&mut self) {
        if let Err(e) = FileExt::unlock(&self.file) {
            tracing::warn!(error = %e, path = %self.path.display(), "failed to unlock log directory");
        }
        if let Err(e) = fs::remove_file(&self.path) {
            tracing::warn!(error = %e, path = %self.path.display(), "failed to remove lock file");
        }
    }
}

// ════════════════════════════════════════════════════════════════
//  LogConsumer
// ════════════════════════════════════════════════════════════════

/// Writes canonical records as JSON lines into hourly shards.
///
/// Records are buffered until `max_batch_len` is reached or `flush` is
/// called. A new hour starts a new shard at revision 0; a shard that would
/// outgrow `max_file_size_bytes` is closed and the next revision opened.
/// A batch is always written to a single shard, and stays pending until
/// that write succeeds.
pub struct LogConsumer {
    dir: PathBuf,
    name_prefix: String,
    max_batch_len: usize,
    max_file_size_bytes: u64,
    clock: Clock,

    batch: Vec<String>,
    batch_bytes: u64,

    hour: i64,
    revision: u32,
    shard_bytes: u64,
    writer: Option<BufWriter<File>>,
    lock: Option<DirLock>,
    closed: bool,
}

impl std::fmt::Debug for LogConsumer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogConsumer")
            .field("dir", &self.dir)
            .field("shard", &self.shard_name())
            .field("pending", &self.batch.len())
            .finish()
    }
}

impl LogConsumer {
    pub fn open(config: &LogConsumerConfig) -> Result<Self, CoreError> {
        Self::with_clock(config, Box::new(system_clock))
    }

    pub fn with_clock(config: &LogConsumerConfig, clock: Clock) -> Result<Self, CoreError> {
        config.validate()?;
        let dir = PathBuf::from(&config.path);
        fs::create_dir_all(&dir)
            .map_err(|e| CoreError::from(e).with_context(format!("mkdir {}", dir.display())))?;
        let lock = DirLock::acquire(&dir, config.name_prefix())?;

        let mut consumer = Self {
            dir,
            name_prefix: config.name_prefix().to_string(),
            max_batch_len: config.max_batch_len as usize,
            max_file_size_bytes: config.max_file_size_bytes,
            clock,
            batch: Vec::with_capacity(config.max_batch_len.min(4096) as usize),
            batch_bytes: 0,
            hour: 0,
            revision: 0,
            shard_bytes: 0,
            writer: None,
            lock: Some(lock),
            closed: false,
        };
        let hour = hour_of((consumer.clock)());
        consumer.resume(hour)?;

        core_info!(
            dir = %consumer.dir.display(),
            shard = %consumer.shard_name(),
            max_batch_len = consumer.max_batch_len,
            "log consumer opened"
        );
        Ok(consumer)
    }

    /// Current shard path.
    pub fn shard_path(&self) -> PathBuf {
        self.dir.join(self.shard_name())
    }

    fn shard_name(&self) -> String {
        shard_file_name(&self.name_prefix, self.hour, self.revision)
    }

    /// A resumed shard at or above the limit takes no more events.
    fn is_full(&self, bytes: u64) -> bool {
        self.max_file_size_bytes > 0 && bytes >= self.max_file_size_bytes
    }

    /// Point at the highest existing revision of `hour`, or the next one
    /// when that shard is already full.
    fn resume(&mut self, hour: i64) -> Result<(), CoreError> {
        let mut revision = None;
        let entries = fs::read_dir(&self.dir)
            .map_err(|e| CoreError::from(e).with_context(format!("scan {}", self.dir.display())))?;
        for entry in entries.flatten() {
            let name = entry.file_name();
            if let Some(rev) = name.to_str().and_then(|n| parse_revision(n, &self.name_prefix, hour)) {
                revision = revision.max(Some(rev));
            }
        }

        self.writer = None;
        self.hour = hour;
        self.revision = revision.unwrap_or(0);
        self.shard_bytes = file_len(&self.shard_path());
        if self.is_full(self.shard_bytes) {
            self.revision += 1;
            self.shard_bytes = 0;
        }
        Ok(())
    }

    fn next_revision(&mut self) {
        self.writer = None;
        self.revision += 1;
        self.shard_bytes = 0;
        core_debug!(shard = %self.shard_name(), "log shard rotated");
    }

    fn ensure_writer(&mut self) -> Result<(), CoreError> {
        if self.writer.is_none() {
            let path = self.shard_path();
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)
                .map_err(|e| CoreError::from(e).with_context(format!("open {}", path.display())))?;
            self.writer = Some(BufWriter::new(file));
        }
        Ok(())
    }

    /// Write the pending batch to the current shard.
    ///
    /// On failure the batch is kept for the next attempt and the writer is
    /// discarded without flushing what it still buffers.
    fn write_batch(&mut self) -> Result<(), CoreError> {
        if self.batch.is_empty() {
            return Ok(());
        }
        let path = self.shard_path();
        if let Err(e) = self.write_pending(&path) {
            if let Some(writer) = self.writer.take() {
                let _ = writer.into_parts();
            }
            return Err(e);
        }

        let events = self.batch.len();
        let bytes = std::mem::take(&mut self.batch_bytes);
        self.batch.clear();
        self.shard_bytes += bytes;
        core_debug!(shard = %path.display(), events, bytes, "log batch written");
        Ok(())
    }

    fn write_pending(&mut self, path: &Path) -> Result<(), CoreError> {
        self.ensure_writer()?;
        let Some(writer) = self.writer.as_mut() else {
            return Err(CoreError::state("log shard is not open"));
        };
        for line in &self.batch {
            writeln!(writer, "{line}")
                .map_err(|e| CoreError::from(e).with_context(format!("write {}", path.display())))?;
        }
        writer
            .flush()
            .map_err(|e| CoreError::from(e).with_context(format!("flush {}", path.display())))
    }

    fn ensure_open(&self) -> Result<(), CoreError> {
        if self.closed {
            return Err(CoreError::state("log consumer is closed"));
        }
        Ok(())
    }
}

fn file_len(path: &Path) -> u64 {
    fs::metadata(path).map(|m| m.len()).unwrap_or(0)
}

impl Consumer for LogConsumer {
    fn kind(&self) -> &'static str {
        "log"
    }

    fn add(&mut self, event: Event) -> Result<(), CoreError> {
        self.ensure_open()?;
        let line = serde_json::to_string(&event)?;
        let line_bytes = line.len() as u64 + 1;

        // ---- hour rollover, a clock stepping back stays on the current shard ----
        let hour = hour_of((self.clock)());
        if hour > self.hour {
            self.write_batch()?;
            self.resume(hour)?;
        }

        // ---- size limit ----
        let used = self.shard_bytes + self.batch_bytes;
        if used > 0 && self.max_file_size_bytes > 0 && used + line_bytes > self.max_file_size_bytes {
            self.write_batch()?;
            self.next_revision();
        }

        self.batch.push(line);
        self.batch_bytes += line_bytes;

        if self.batch.len() >= self.max_batch_len {
            self.write_batch()?;
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<(), CoreError> {
        self.ensure_open()?;
        self.write_batch()
    }

    fn close(&mut self) -> Result<(), CoreError> {
        self.ensure_open()?;
        self.write_batch()?;
        self.writer = None;
        self.lock = None;
        self.closed = true;
        core_info!(dir = %self.dir.display(), "log consumer closed");
        Ok(())
    }
}

impl Drop for LogConsumer {
    fn drop(&mut self) {
        if self.closed || self.batch.is_empty() {
            return;
        }
        if let Err(e) = self.write_batch() {
            tracing::error!(error = %e, dir = %self.dir.display(), "failed to write pending events on drop");
        }
    }
}
