pub mod agent_io;

pub use agent_io::{load_agent, save_agent, SavedAgent};
