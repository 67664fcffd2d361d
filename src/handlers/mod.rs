use crate::bus::EventBus;
use crate::state::AppState;

pub mod authentication;
pub mod describe_user;
pub mod update_user_info;

/// Bind every endpoint on its configured address.
pub fn bind_all(bus: &EventBus, state: &AppState) {
    authentication::bind(bus, state.clone());
    describe_user::bind(bus, state.clone());
    update_user_info::bind(bus, state.clone());
}
