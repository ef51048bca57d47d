use crate::users::UserRole;

/// Write policy shared by create, update and delete.
///
/// Admins may write anything, agents only listings they own, users nothing.
pub fn can_write(role: UserRole, owner_id: Option<&str>, actor_id: &str) -> bool {
    match role {
        UserRole::Admin => true,
        UserRole::Agent => owner_id == Some(actor_id),
        UserRole::User => false,
    }
}
