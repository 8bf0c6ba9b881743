pub mod admin;
pub mod migrate;
pub mod resync;
pub mod seed;
