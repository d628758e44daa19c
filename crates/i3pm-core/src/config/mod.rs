pub mod dirs;
pub mod rules;
pub mod settings;

pub use dirs::{socket_path, Directories};
pub use rules::load_merged_applications;
pub use settings::{ApplicationsFile, ProjectsFile};
