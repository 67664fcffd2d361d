//! Binary message types for the three bus endpoints. Tagged, length-delimited
//! protobuf encoding; unknown fields are skipped on decode, so newer peers can
//! add fields without breaking older ones.

use crate::users::repo_types::SafeUser;

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct User {
    #[prost(string, tag = "1")]
    pub user_id: String,
    #[prost(string, tag = "2")]
    pub user_name: String,
    #[prost(string, tag = "3")]
    pub url_key: String,
    #[prost(string, tag = "4")]
    pub signature: String,
    #[prost(string, tag = "5")]
    pub avatar_key: String,
}

impl From<SafeUser> for User {
    fn from(user: SafeUser) -> Self {
        Self {
            user_id: user.user_id,
            user_name: user.user_name,
            url_key: user.url_key,
            signature: user.signature,
            avatar_key: user.avatar_key,
        }
    }
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct UserList {
    #[prost(message, repeated, tag = "1")]
    pub users: Vec<User>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Empty {}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct AuthenticationRequest {
    #[prost(string, tag = "1")]
    pub user_email: String,
    #[prost(string, tag = "2")]
    pub plain_password: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum AuthenticationErrorType {
    InvalidCredential = 0,
    UserNotFound = 1,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct AuthenticationResponse {
    #[prost(oneof = "authentication_response::Result", tags = "1, 2, 3")]
    pub result: Option<authentication_response::Result>,
}

pub mod authentication_response {
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum Result {
        #[prost(message, tag = "1")]
        SuccessUser(super::User),
        #[prost(enumeration = "super::AuthenticationErrorType", tag = "2")]
        CommonAuthenticationError(i32),
        #[prost(string, tag = "3")]
        SystemErrorMessage(String),
    }
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct DescribeUserRequest {
    #[prost(oneof = "describe_user_request::By", tags = "1, 2, 3")]
    pub by: Option<describe_user_request::By>,
}

pub mod describe_user_request {
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum By {
        #[prost(string, tag = "1")]
        UrlKey(String),
        #[prost(string, tag = "2")]
        Id(String),
        #[prost(string, tag = "3")]
        UserName(String),
    }
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct DescribeUserResponse {
    #[prost(oneof = "describe_user_response::Result", tags = "1, 2, 3, 4")]
    pub result: Option<describe_user_response::Result>,
}

pub mod describe_user_response {
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum Result {
        #[prost(message, tag = "1")]
        SingleUserResult(super::User),
        #[prost(message, tag = "2")]
        MultiUserResult(super::UserList),
        #[prost(message, tag = "3")]
        UserNotFound(super::Empty),
        #[prost(string, tag = "4")]
        SystemErrorMessage(String),
    }
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct PasswordChange {
    #[prost(string, tag = "1")]
    pub before: String,
    #[prost(string, tag = "2")]
    pub after: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct UpdateUserInfoRequest {
    #[prost(oneof = "update_user_info_request::QueryBy", tags = "1, 2")]
    pub query_by: Option<update_user_info_request::QueryBy>,
    #[prost(oneof = "update_user_info_request::Target", tags = "3, 4, 5, 6")]
    pub target: Option<update_user_info_request::Target>,
}

pub mod update_user_info_request {
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum QueryBy {
        #[prost(string, tag = "1")]
        UserId(String),
        #[prost(string, tag = "2")]
        UrlKey(String),
    }

    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum Target {
        #[prost(string, tag = "3")]
        UserName(String),
        #[prost(string, tag = "4")]
        Signature(String),
        #[prost(string, tag = "5")]
        AvatarKey(String),
        #[prost(message, tag = "6")]
        Password(super::PasswordChange),
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum UpdateResult {
    Success = 0,
    FailureUnsafeUpdate = 1,
    DbError = 2,
    InternalError = 3,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct UpdateUserInfoResponse {
    #[prost(enumeration = "UpdateResult", tag = "1")]
    pub result: i32,
}

impl From<UpdateResult> for UpdateUserInfoResponse {
    fn from(result: UpdateResult) -> Self {
        Self {
            result: result as i32,
        }
    }
}
