pub mod category;
pub mod config;
pub mod export;
pub mod history;
pub mod run;
pub mod timer;
