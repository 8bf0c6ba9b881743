pub mod account_service;
pub mod billing;
pub mod catalog_views;
pub mod frame_service;
pub mod mapping_views;
pub mod media;

pub use account_service::{AccountError, AccountService, LogMailer, Mailer};
pub use frame_service::FrameService;
pub use mapping_views::MappingViewService;
