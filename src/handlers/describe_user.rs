use anyhow::bail;
use tracing::warn;

use crate::bus::EventBus;
use crate::dispatcher;
use crate::state::AppState;
use crate::users::repo_types::SafeUser;
use crate::wire::describe_user_request::By;
use crate::wire::describe_user_response::Result as DescribeResult;
use crate::wire::{DescribeUserRequest, DescribeUserResponse, Empty, UserList};

pub fn bind(bus: &EventBus, state: AppState) {
    let address = state.config.bus.describe_user.clone();
    dispatcher::bind(
        bus,
        &address,
        Some(unexpected_error_response()),
        move |request: DescribeUserRequest| {
            let state = state.clone();
            async move { handle(state, request).await }
        },
    );
}

async fn handle(
    state: AppState,
    request: DescribeUserRequest,
) -> anyhow::Result<DescribeUserResponse> {
    let Some(by) = request.by else {
        bail!("describe request carries no lookup variant");
    };

    let response = match by {
        By::UrlKey(url_key) => state
            .store
            .get_by_url_key(&url_key)
            .await
            .map(pack_individual),
        By::Id(id) => state.store.get_by_id(&id).await.map(pack_individual),
        By::UserName(user_name) => state.store.get_by_name(&user_name).await.map(pack_multiple),
    };

    match response {
        Ok(response) => Ok(response),
        Err(e) => {
            warn!(error = %e, "unexpected database error");
            Ok(database_error_response())
        }
    }
}

fn pack_individual(user: Option<SafeUser>) -> DescribeUserResponse {
    match user {
        Some(user) => DescribeUserResponse {
            result: Some(DescribeResult::SingleUserResult(user.into())),
        },
        None => user_not_found_response(),
    }
}

fn pack_multiple(users: Vec<SafeUser>) -> DescribeUserResponse {
    if users.is_empty() {
        return user_not_found_response();
    }
    DescribeUserResponse {
        result: Some(DescribeResult::MultiUserResult(UserList {
            users: users.into_iter().map(Into::into).collect(),
        })),
    }
}

fn user_not_found_response() -> DescribeUserResponse {
    DescribeUserResponse {
        result: Some(DescribeResult::UserNotFound(Empty {})),
    }
}

fn database_error_response() -> DescribeUserResponse {
    DescribeUserResponse {
        result: Some(DescribeResult::SystemErrorMessage("database error".into())),
    }
}

fn unexpected_error_response() -> DescribeUserResponse {
    DescribeUserResponse {
        result: Some(DescribeResult::SystemErrorMessage(
            "unexpected error".into(),
        )),
    }
}
