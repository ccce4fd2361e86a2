pub mod leaderboard;
pub mod structure_hash;
