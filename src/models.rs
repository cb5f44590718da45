pub mod error;
pub mod modpack;
pub mod package;
pub mod paths;
pub mod task_status;
