//! User profiles: the base currency that amounts are converted into and an
//! optional avatar image.

mod avatar;
mod core;
mod endpoints;

pub use avatar::{AvatarState, upload_avatar};
pub use core::{
    Profile, create_profile, create_profile_table, get_base_currency, get_profile,
    set_avatar_url, set_base_currency,
};
pub use endpoints::{ProfileState, get_profile_endpoint, put_profile};
