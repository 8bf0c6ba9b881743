pub mod billing;
pub mod catalog;
pub mod frame;
pub mod mapping;
pub mod user;
pub mod user_code;

pub use billing::{PaymentMethod, Plan, Subscription};
pub use catalog::{BusinessCategory, BusinessPost, Category, Event, OtherPost, Post};
pub use frame::{CustomerFrame, CustomerGroup};
pub use mapping::{ContentMapping, MappingKind};
pub use user::{User, UserType};
pub use user_code::{CodeType, UserCode};
