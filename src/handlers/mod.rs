// Two security tiers: public (no token) and protected (access token).
// Admin-only writes are checked inside the protected handlers.
pub mod protected;
pub mod public;
