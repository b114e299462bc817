use regex::Regex;
use std::sync::OnceLock;

/// Symbols that satisfy the password special-character rule.
const PASSWORD_SYMBOLS: &str = "!@#$%^&*(),.?\":{}|<>";

fn email_regex() -> &'static Regex {
    static EMAIL: OnceLock<Regex> = OnceLock::new();
    EMAIL.get_or_init(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap())
}

pub fn validate_username(username: &str) -> Result<(), String> {
    if username.contains(' ') {
        return Err("Username cannot contain spaces".to_string());
    }
    if username.len() < 3 {
        return Err("Username must be at least 3 characters long".to_string());
    }
    Ok(())
}

/// Checks the password rules in order; the first failing rule names the error.
pub fn validate_password(password: &str) -> Result<(), String> {
    if password.len() < 8 {
        return Err("Password must be at least 8 characters long".to_string());
    }
    if !password.chars().any(|c| c.is_ascii_uppercase()) {
        return Err("Password must contain at least one uppercase letter".to_string());
    }
    if !password.chars().any(|c| c.is_ascii_lowercase()) {
        return Err("Password must contain at least one lowercase letter".to_string());
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        return Err("Password must contain at least one number".to_string());
    }
    if !password.chars().any(|c| PASSWORD_SYMBOLS.contains(c)) {
        return Err("Password must contain at least one special character".to_string());
    }
    Ok(())
}

pub fn validate_email(email: &str) -> Result<(), String> {
    if email_regex().is_match(email) {
        Ok(())
    } else {
        Err("Invalid email address".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn username_rejects_spaces() {
        assert_eq!(
            validate_username("bad name"),
            Err("Username cannot contain spaces".to_string())
        );
    }

    #[test]
    fn username_rejects_short_names() {
        assert_eq!(
            validate_username("ab"),
            Err("Username must be at least 3 characters long".to_string())
        );
    }

    #[test]
    fn username_accepts_plain_names() {
        assert!(validate_username("alice").is_ok());
    }

    #[test]
    fn password_rules_fail_in_declared_order() {
        assert_eq!(
            validate_password("Ab1!"),
            Err("Password must be at least 8 characters long".to_string())
        );
        assert_eq!(
            validate_password("alllower1!"),
            Err("Password must contain at least one uppercase letter".to_string())
        );
        assert_eq!(
            validate_password("ALLUPPER1!"),
            Err("Password must contain at least one lowercase letter".to_string())
        );
        assert_eq!(
            validate_password("NoDigits!!"),
            Err("Password must contain at least one number".to_string())
        );
        assert_eq!(
            validate_password("NoSymbol11"),
            Err("Password must contain at least one special character".to_string())
        );
    }

    #[test]
    fn password_accepts_compliant_value() {
        assert!(validate_password("Planit#2024").is_ok());
    }

    #[test]
    fn email_requires_local_domain_tld_shape() {
        assert!(validate_email("user@example.com").is_ok());
        assert!(validate_email("no-at-sign.example.com").is_err());
        assert!(validate_email("user@nodot").is_err());
        assert!(validate_email("has space@example.com").is_err());
        assert!(validate_email("").is_err());
    }
}
