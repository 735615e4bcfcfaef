pub mod csv_writer;

pub use csv_writer::{load_episode_rows, EpisodeCsvWriter, EpisodeRow};
