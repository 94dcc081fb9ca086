// Squad domain: player reference data, roster snapshots, selection engine.

pub mod player;
pub mod roster;
pub mod select;
