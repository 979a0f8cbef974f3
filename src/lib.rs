pub mod args;
pub mod constants;
pub mod database;
pub mod dispatch;
pub mod error;
pub mod jobs;
pub mod model;
pub mod ranking_index;
pub mod utils;
