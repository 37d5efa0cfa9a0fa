use garde::Validate;
use kernel::model::{
    id::UserId,
    role::Role,
    user::{event::CreateUser, User},
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RoleName {
    Participant,
    Admin,
}

impl From<Role> for RoleName {
    fn from(value: Role) -> Self {
        match value {
            Role::Participant => Self::Participant,
            Role::Admin => Self::Admin,
        }
    }
}

impl From<RoleName> for Role {
    fn from(value: RoleName) -> Self {
        match value {
            RoleName::Participant => Self::Participant,
            RoleName::Admin => Self::Admin,
        }
    }
}

#[derive(Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserRequest {
    #[garde(length(min = 1))]
    pub user_name: String,
    #[garde(email)]
    pub email: String,
    #[garde(length(min = 1))]
    pub password: String,
}

impl From<CreateUserRequest> for CreateUser {
    fn from(value: CreateUserRequest) -> Self {
        let CreateUserRequest {
            user_name,
            email,
            password,
        } = value;
        Self {
            user_name,
            email,
            password,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub user_id: UserId,
    pub user_name: String,
    pub email: String,
    pub role: RoleName,
}

impl From<User> for UserResponse {
    fn from(value: User) -> Self {
        let User {
            user_id,
            user_name,
            email,
            role,
        } = value;
        Self {
            user_id,
            user_name,
            email,
            role: RoleName::from(role),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registration_request_rejects_invalid_input() {
        let req = CreateUserRequest {
            user_name: "".into(),
            email: "not-an-email".into(),
            password: "".into(),
        };
        assert!(req.validate(&()).is_err());

        let req = CreateUserRequest {
            user_name: "Taro".into(),
            email: "taro@example.com".into(),
            password: "hunter2".into(),
        };
        assert!(req.validate(&()).is_ok());
    }

    #[test]
    fn role_serializes_in_lowercase() {
        assert_eq!(
            serde_json::to_string(&RoleName::Participant).unwrap(),
            r#""participant""#
        );
        assert_eq!(serde_json::to_string(&RoleName::Admin).unwrap(), r#""admin""#);
    }
}
