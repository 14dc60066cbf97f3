pub mod code;
pub mod error;
pub mod models;

pub use code::generate_public_code;
pub use error::{Error, Result};
pub use models::{
    Ad, AdStatus, MediaKind, Outdoor, OutdoorKind, OutdoorStatus, Role, User, UserProfile,
};
