//! CSV writer for per-episode training logs.
//!
//! Format: episode,epsilon,alpha,moves,random_moves,reward_p0..,stop_reason,timestamp

use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;

use chrono::Utc;

use crate::training::EpisodeStats;

/// Append-only episode log, one row per episode.
pub struct EpisodeCsvWriter {
    writer: BufWriter<File>,
    num_players: usize,
}

impl EpisodeCsvWriter {
    /// Opens `path` for appending, creating parent directories and writing
    /// the header when the file is new.
    pub fn create<P: AsRef<Path>>(path: P, num_players: usize) -> std::io::Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let file_exists = path.exists();

        let file = OpenOptions::new().create(true).append(true).open(path)?;
        let mut writer = BufWriter::new(file);

        if !file_exists {
            Self::write_header(&mut writer, num_players)?;
        }

        Ok(Self {
            writer,
            num_players,
        })
    }

    fn write_header<W: Write>(writer: &mut W, num_players: usize) -> std::io::Result<()> {
        let mut header = String::from("episode,epsilon,alpha,moves,random_moves");
        for player in 0..num_players {
            header.push_str(&format!(",reward_p{}", player));
        }
        header.push_str(",stop_reason,timestamp");
        writeln!(writer, "{}", header)
    }

    /// Appends one episode row.
    pub fn append(&mut self, stats: &EpisodeStats) -> std::io::Result<()> {
        let mut row = format!(
            "{},{:.6},{:.6},{},{}",
            stats.episode, stats.epsilon, stats.alpha, stats.moves, stats.random_moves
        );
        for player in 0..self.num_players {
            row.push_str(&format!(",{}", stats.final_rewards.get(player)));
        }
        row.push_str(&format!(",{},{}", stats.stop, Utc::now().to_rfc3339()));
        writeln!(self.writer, "{}", row)
    }

    /// Flush any buffered rows
    pub fn flush(&mut self) -> std::io::Result<()> {
        self.writer.flush()
    }

    /// Close the writer
    pub fn close(mut self) -> std::io::Result<()> {
        self.writer.flush()
    }
}

impl Drop for EpisodeCsvWriter {
    fn drop(&mut self) {
        let _ = self.writer.flush();
    }
}

/// One row read back from an episode log.
#[derive(Debug, Clone)]
pub struct EpisodeRow {
    pub episode: usize,
    pub epsilon: f64,
    pub alpha: f64,
    pub moves: usize,
    pub random_moves: usize,
    pub rewards: Vec<f64>,
    pub stop_reason: String,
    pub timestamp: String,
}

/// Loads episode rows from a log written by [`EpisodeCsvWriter`]. The
/// reward column count adapts to however many players the file was written
/// with; malformed fields fall back to zero instead of failing the run.
pub fn load_episode_rows<P: AsRef<Path>>(
    path: P,
) -> Result<Vec<EpisodeRow>, Box<dyn std::error::Error>> {
    let mut reader = csv::Reader::from_path(path)?;
    let num_rewards = reader
        .headers()?
        .iter()
        .filter(|name| name.starts_with("reward_p"))
        .count();

    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result?;

        let episode: usize = record.get(0).unwrap_or("0").parse().unwrap_or(0);
        let epsilon: f64 = record.get(1).unwrap_or("0").parse().unwrap_or(0.0);
        let alpha: f64 = record.get(2).unwrap_or("0").parse().unwrap_or(0.0);
        let moves: usize = record.get(3).unwrap_or("0").parse().unwrap_or(0);
        let random_moves: usize = record.get(4).unwrap_or("0").parse().unwrap_or(0);

        let mut rewards = Vec::with_capacity(num_rewards);
        for i in 0..num_rewards {
            let value: f64 = record.get(5 + i).unwrap_or("0").parse().unwrap_or(0.0);
            rewards.push(value);
        }

        let stop_reason = record.get(5 + num_rewards).unwrap_or("").to_string();
        let timestamp = record.get(6 + num_rewards).unwrap_or("").to_string();

        rows.push(EpisodeRow {
            episode,
            epsilon,
            alpha,
            moves,
            random_moves,
            rewards,
            stop_reason,
            timestamp,
        });
    }

    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::ScoreTuple;
    use crate::training::StopReason;
    use tempfile::tempdir;

    fn stats(episode: usize, reward: f64) -> EpisodeStats {
        EpisodeStats {
            episode,
            moves: 7,
            random_moves: 2,
            epsilon: 0.25,
            alpha: 0.1,
            final_rewards: ScoreTuple::from_values(vec![reward, -reward]),
            stop: StopReason::GameOver,
        }
    }

    #[test]
    fn test_rows_round_trip() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let path = dir.path().join("logs").join("episodes.csv");

        let mut writer = EpisodeCsvWriter::create(&path, 2)?;
        writer.append(&stats(0, 1.0))?;
        writer.append(&stats(1, 0.0))?;
        writer.append(&stats(2, -1.0))?;
        writer.flush()?;

        let rows = load_episode_rows(&path)?;
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].episode, 0);
        assert_eq!(rows[0].moves, 7);
        assert_eq!(rows[0].rewards, vec![1.0, -1.0]);
        assert_eq!(rows[2].rewards, vec![-1.0, 1.0]);
        assert_eq!(rows[1].stop_reason, "game_over");
        assert!(!rows[1].timestamp.is_empty());
        Ok(())
    }

    #[test]
    fn test_reopening_appends_without_a_second_header() -> Result<(), Box<dyn std::error::Error>>
    {
        let dir = tempdir()?;
        let path = dir.path().join("episodes.csv");

        {
            let mut writer = EpisodeCsvWriter::create(&path, 2)?;
            writer.append(&stats(0, 1.0))?;
        }
        {
            let mut writer = EpisodeCsvWriter::create(&path, 2)?;
            writer.append(&stats(1, 0.0))?;
        }

        let rows = load_episode_rows(&path)?;
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].episode, 1);
        Ok(())
    }
}
