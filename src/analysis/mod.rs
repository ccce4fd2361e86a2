//! Raw pp derivation from the play log, and charts of the result.

pub mod chart;
pub mod correction;
pub mod derive;
pub mod table;
