//! Ownership and role checks, centralized so every route agrees

use outdoor_common::{Error, Result, Role, User};

/// Allow only admins
pub fn ensure_admin(user: &User) -> Result<()> {
    if user.role != Role::Admin {
        return Err(Error::Forbidden("access denied".to_string()));
    }
    Ok(())
}

/// Allow the owner of a resource, or an admin override
pub fn ensure_owner_or_admin(user: &User, owner_id: &str) -> Result<()> {
    if user.role != Role::Admin && user.id != owner_id {
        return Err(Error::Forbidden("access denied".to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn customer(id: &str) -> User {
        User::new(
            "Test".to_string(),
            format!("{}@example.com", id),
            "hash".to_string(),
        )
    }

    fn admin() -> User {
        let mut user = customer("admin");
        user.role = Role::Admin;
        user
    }

    #[test]
    fn test_owner_allowed() {
        let user = customer("alice");
        assert!(ensure_owner_or_admin(&user, &user.id).is_ok());
    }

    #[test]
    fn test_non_owner_forbidden() {
        let user = customer("alice");
        let err = ensure_owner_or_admin(&user, "someone-else").unwrap_err();
        assert!(matches!(err, Error::Forbidden(_)));
    }

    #[test]
    fn test_admin_override() {
        let user = admin();
        assert!(ensure_owner_or_admin(&user, "someone-else").is_ok());
        assert!(ensure_admin(&user).is_ok());
    }

    #[test]
    fn test_customer_is_not_admin() {
        let user = customer("alice");
        assert!(matches!(ensure_admin(&user), Err(Error::Forbidden(_))));
    }
}
