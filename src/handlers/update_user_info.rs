use anyhow::bail;
use tracing::warn;

use crate::bus::EventBus;
use crate::dispatcher;
use crate::state::AppState;
use crate::users::repo_types::{Locator, StoreError};
use crate::wire::update_user_info_request::{QueryBy, Target};
use crate::wire::{UpdateResult, UpdateUserInfoRequest, UpdateUserInfoResponse};

pub fn bind(bus: &EventBus, state: AppState) {
    let address = state.config.bus.update_user_info.clone();
    dispatcher::bind(
        bus,
        &address,
        Some(UpdateUserInfoResponse::from(UpdateResult::InternalError)),
        move |request: UpdateUserInfoRequest| {
            let state = state.clone();
            async move { handle(state, request).await }
        },
    );
}

async fn handle(
    state: AppState,
    request: UpdateUserInfoRequest,
) -> anyhow::Result<UpdateUserInfoResponse> {
    let locator = match request.query_by {
        Some(QueryBy::UserId(user_id)) => Locator::Id(user_id),
        Some(QueryBy::UrlKey(url_key)) => Locator::UrlKey(url_key),
        None => bail!("update request carries no query_by variant"),
    };
    let Some(target) = request.target else {
        bail!("update request carries no target variant");
    };

    let outcome = match target {
        Target::UserName(user_name) => {
            state.store.update_name(&user_name, &locator, true).await
        }
        Target::Signature(signature) => {
            state.store.update_signature(&signature, &locator).await
        }
        Target::AvatarKey(avatar_key) => {
            state.store.update_avatar(&avatar_key, &locator).await
        }
        Target::Password(change) => {
            state
                .store
                .update_password(&change.before, &change.after, &locator)
                .await
        }
    };

    match outcome {
        Ok(true) => Ok(UpdateResult::Success.into()),
        Ok(false) => Ok(UpdateResult::FailureUnsafeUpdate.into()),
        // a digest that failed to parse or hash is an internal fault, not a
        // store fault; hand it to the dispatcher fallback
        Err(StoreError::Hash(message)) => bail!("password hashing failed: {message}"),
        Err(e) => {
            warn!(error = %e, "store error while processing user info update request");
            Ok(UpdateResult::DbError.into())
        }
    }
}
