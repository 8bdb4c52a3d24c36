use super::UserId;

/// The identity on whose behalf an operation runs.
///
/// Authentication happens outside this crate; by the time a `Caller` exists
/// the user id and role have been verified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    pub user_id: UserId,
    pub role: Role,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Customer,
    Admin,
}

impl Caller {
    pub fn customer(user_id: impl Into<UserId>) -> Self {
        Self { user_id: user_id.into(), role: Role::Customer }
    }

    pub fn admin(user_id: impl Into<UserId>) -> Self {
        Self { user_id: user_id.into(), role: Role::Admin }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}
