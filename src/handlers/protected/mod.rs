// Handlers behind `jwt_auth_middleware`; each receives the `AuthUser`
// extension and enforces admin-only writes itself.
pub mod account;
pub mod billing;
pub mod catalog;
pub mod frames;
pub mod groups;
pub mod mappings;
pub mod users;
