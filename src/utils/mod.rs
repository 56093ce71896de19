mod command_to_string;
mod detect_software;
mod threadcount;

pub use command_to_string::command_to_string;
pub use detect_software::check_executable;
pub use threadcount::determine_thread_counts;
