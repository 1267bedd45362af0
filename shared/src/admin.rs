use crate::identity::{DecodedIdentity, ADMIN_GROUP};

/// A caller is admin when the role claim says so, or when their email matches
/// the configured admin address. `admin_email` is expected trimmed and lowercased,
/// as `Config` stores it.
pub fn is_admin(identity: &DecodedIdentity, admin_email: Option<&str>) -> bool {
    let role_claim = identity.role.as_deref() == Some(ADMIN_GROUP);

    let email_match = match (admin_email, identity.email.as_deref()) {
        (Some(admin), Some(email)) => !admin.is_empty() && admin == email.trim().to_lowercase(),
        _ => false,
    };

    role_claim || email_match
}

#[cfg(test)]
mod tests {
    use super::*;

    fn caller(email: Option<&str>, role: Option<&str>) -> DecodedIdentity {
        DecodedIdentity {
            subject: "u-1".to_string(),
            email: email.map(str::to_string),
            role: role.map(str::to_string),
        }
    }

    #[test]
    fn role_claim_grants_admin() {
        assert!(is_admin(&caller(None, Some("admin")), None));
        assert!(!is_admin(&caller(None, Some("Admin")), None));
        assert!(!is_admin(&caller(None, Some("medico")), None));
    }

    #[test]
    fn admin_email_matches_case_insensitively() {
        let identity = caller(Some(" Jefa@Clinica.Example"), Some("medico"));
        assert!(is_admin(&identity, Some("jefa@clinica.example")));
        assert!(!is_admin(&identity, Some("otra@clinica.example")));
        assert!(!is_admin(&identity, None));
    }

    #[test]
    fn blank_admin_email_never_matches() {
        assert!(!is_admin(&caller(Some(""), None), Some("")));
        assert!(!is_admin(&caller(None, None), Some("jefa@clinica.example")));
    }
}
