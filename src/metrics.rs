//! Episode-result logging backends.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use crate::messages::EpisodeRecord;

/// Logger for per-episode results.
pub trait EpisodeLogger: Send {
    /// Log one episode record as it arrives.
    fn log(&mut self, record: &EpisodeRecord);

    /// Flush any buffered output.
    fn flush(&mut self) {}
}

/// Logs each episode through the `log` facade.
pub struct ConsoleLogger {
    total_episodes: usize,
}

impl ConsoleLogger {
    /// Create a console logger that knows the planned episode total.
    pub fn new(total_episodes: usize) -> Self {
        Self { total_episodes }
    }
}

impl EpisodeLogger for ConsoleLogger {
    fn log(&mut self, record: &EpisodeRecord) {
        log::info!(
            "episode {:>4}/{} [w{:02}] reward {:9.3} running {:9.3}{}",
            record.episode,
            self.total_episodes,
            record.worker_id,
            record.reward,
            record.running_reward,
            if record.new_best { "  (new best)" } else { "" }
        );
    }
}

/// Appends episode records to a CSV file.
pub struct CsvLogger {
    writer: BufWriter<File>,
}

impl CsvLogger {
    /// Create a CSV logger writing to `path`, truncating any existing file
    /// and emitting the header row.
    pub fn new(path: impl AsRef<Path>) -> io::Result<Self> {
        let mut writer = BufWriter::new(File::create(path)?);
        writeln!(writer, "episode,worker,reward,running_reward,new_best")?;
        Ok(Self { writer })
    }
}

impl EpisodeLogger for CsvLogger {
    fn log(&mut self, record: &EpisodeRecord) {
        if let Err(e) = writeln!(
            self.writer,
            "{},{},{},{},{}",
            record.episode, record.worker_id, record.reward, record.running_reward, record.new_best
        ) {
            log::warn!("failed to write episode record to CSV: {}", e);
        }
    }

    fn flush(&mut self) {
        if let Err(e) = self.writer.flush() {
            log::warn!("failed to flush CSV logger: {}", e);
        }
    }
}
