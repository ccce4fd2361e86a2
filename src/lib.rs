pub mod analysis;
pub mod config;
pub mod page_puller;
pub mod scoresaber;
