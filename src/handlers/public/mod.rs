// Token acquisition, password recovery and token checks; no JWT required.
pub mod auth;
