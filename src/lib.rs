pub mod app;
pub mod config;
pub mod contest;
pub mod error;
pub mod grading;
pub mod render;
pub mod selector;
pub mod stats_store;
pub mod types;

pub use error::{PracticeError, Result};
pub use selector::{next_question, select_next};
