use tracing::{debug, warn};

use crate::bus::EventBus;
use crate::dispatcher;
use crate::state::AppState;
use crate::users::password::verify_password;
use crate::users::repo_types::SafeUser;
use crate::wire::authentication_response::Result as AuthResult;
use crate::wire::{AuthenticationErrorType, AuthenticationRequest, AuthenticationResponse};

pub fn bind(bus: &EventBus, state: AppState) {
    let address = state.config.bus.authentication.clone();
    dispatcher::bind(
        bus,
        &address,
        Some(unexpected_error_response()),
        move |request: AuthenticationRequest| {
            let state = state.clone();
            async move { handle(state, request).await }
        },
    );
}

async fn handle(
    state: AppState,
    request: AuthenticationRequest,
) -> anyhow::Result<AuthenticationResponse> {
    debug!("authentication request inbound");
    let email = request.user_email;

    debug!(%email, "accessing store for credential");
    let credential = match state.store.get_credential_by_email(&email).await {
        Ok(credential) => credential,
        Err(e) => {
            warn!(error = %e, %email, "database failure when processing authentication request");
            return Ok(database_error_response());
        }
    };

    let Some((user, hash)) = credential else {
        debug!(%email, "no user with this email");
        return Ok(user_not_found_response());
    };

    // a malformed stored digest is an internal fault, not a failed login;
    // let it escape to the dispatcher fallback
    if verify_password(&request.plain_password, &hash).await? {
        debug!(%email, "credentials verified");
        Ok(success_response(user))
    } else {
        debug!(%email, "invalid credential");
        Ok(invalid_credential_response())
    }
}

fn success_response(user: SafeUser) -> AuthenticationResponse {
    AuthenticationResponse {
        result: Some(AuthResult::SuccessUser(user.into())),
    }
}

fn invalid_credential_response() -> AuthenticationResponse {
    AuthenticationResponse {
        result: Some(AuthResult::CommonAuthenticationError(
            AuthenticationErrorType::InvalidCredential as i32,
        )),
    }
}

fn user_not_found_response() -> AuthenticationResponse {
    AuthenticationResponse {
        result: Some(AuthResult::CommonAuthenticationError(
            AuthenticationErrorType::UserNotFound as i32,
        )),
    }
}

fn database_error_response() -> AuthenticationResponse {
    AuthenticationResponse {
        result: Some(AuthResult::SystemErrorMessage("database error".into())),
    }
}

fn unexpected_error_response() -> AuthenticationResponse {
    AuthenticationResponse {
        result: Some(AuthResult::SystemErrorMessage(
            "unexpected internal error during processing result".into(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // the fake state carries a lazy pool that fails on first use, which is
    // exactly the store-fault path
    #[tokio::test]
    async fn store_fault_maps_to_database_error() {
        let state = AppState::fake();
        let response = handle(
            state,
            AuthenticationRequest {
                user_email: "a@b.c".into(),
                plain_password: "pw".into(),
            },
        )
        .await
        .expect("handled locally");
        assert_eq!(response, database_error_response());
    }

    #[tokio::test]
    async fn undecodable_request_yields_the_fallback_over_the_bus() {
        use prost::Message;

        let bus = EventBus::new();
        let state = AppState::fake();
        let address = state.config.bus.authentication.clone();
        bind(&bus, state);

        let reply = bus
            .request(&address, bytes::Bytes::from_static(&[0xff, 0xff]))
            .await
            .expect("one reply even for garbage");
        let response = AuthenticationResponse::decode(reply).expect("decodable");
        assert_eq!(response, unexpected_error_response());
    }

    #[test]
    fn fixed_responses_carry_no_user_payload() {
        for response in [
            invalid_credential_response(),
            user_not_found_response(),
            database_error_response(),
            unexpected_error_response(),
        ] {
            assert!(!matches!(
                response.result,
                Some(AuthResult::SuccessUser(_))
            ));
        }
    }
}
