//! Login and signup form validation

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::fmt;

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9._%+-]+@[A-Za-z0-9-]+(\.[A-Za-z0-9-]+)*\.[A-Za-z]{2,}$")
        .expect("valid email regex")
});

const PASSWORD_MAX: usize = 100;
const LOGIN_PASSWORD_MIN: usize = 1;
const SIGNUP_PASSWORD_MIN: usize = 8;
const USERNAME_MIN: usize = 3;
const USERNAME_MAX: usize = 100;

/// A problem with one form field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

/// All field problems of a submitted form
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationErrors(pub Vec<FieldError>);

impl ValidationErrors {
    /// Messages reported for `field`
    pub fn for_field(&self, field: &str) -> Vec<&str> {
        self.0
            .iter()
            .filter(|e| e.field == field)
            .map(|e| e.message.as_str())
            .collect()
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .0
            .iter()
            .map(|e| format!("{}: {}", e.field, e.message))
            .collect();
        f.write_str(&parts.join("; "))
    }
}

impl std::error::Error for ValidationErrors {}

#[derive(Default)]
struct Collector(Vec<FieldError>);

impl Collector {
    fn push(&mut self, field: &'static str, message: impl Into<String>) {
        self.0.push(FieldError {
            field,
            message: message.into(),
        });
    }

    fn length(&mut self, field: &'static str, value: &str, min: usize, max: usize) {
        let len = value.chars().count();
        if len < min {
            self.push(
                field,
                format!("must contain at least {} character(s)", min),
            );
        } else if len > max {
            self.push(field, format!("must contain at most {} character(s)", max));
        }
    }

    fn email(&mut self, value: &str) {
        if !EMAIL_RE.is_match(value.trim()) {
            self.push("email", "Invalid email");
        }
    }

    fn finish<T>(self, value: T) -> Result<T, ValidationErrors> {
        if self.0.is_empty() {
            Ok(value)
        } else {
            Err(ValidationErrors(self.0))
        }
    }
}

/// Raw login input
#[derive(Clone, Default)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

/// Validated login body as the gateway expects it
#[derive(Clone, PartialEq, Eq, Serialize)]
pub struct LoginCredentials {
    pub identifier: String,
    pub password: String,
}

impl fmt::Debug for LoginCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginCredentials")
            .field("identifier", &self.identifier)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl LoginForm {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }

    /// Check every field and return trimmed credentials
    pub fn validate(&self) -> Result<LoginCredentials, ValidationErrors> {
        let mut errors = Collector::default();
        errors.email(&self.email);
        errors.length("password", &self.password, LOGIN_PASSWORD_MIN, PASSWORD_MAX);
        if !self.password.is_empty() && self.password.trim().is_empty() {
            errors.push("password", "Input Password");
        }

        errors.finish(LoginCredentials {
            identifier: self.email.trim().to_string(),
            password: self.password.trim().to_string(),
        })
    }
}

/// Raw signup input
#[derive(Clone, Default)]
pub struct SignupForm {
    pub username: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
}

/// Validated registration body as the gateway expects it
#[derive(Clone, PartialEq, Eq, Serialize)]
pub struct SignupCredentials {
    pub username: String,
    pub email: String,
    pub password: String,
}

impl fmt::Debug for SignupCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignupCredentials")
            .field("username", &self.username)
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl SignupForm {
    /// Check every field and return trimmed credentials
    pub fn validate(&self) -> Result<SignupCredentials, ValidationErrors> {
        let mut errors = Collector::default();
        errors.length("username", &self.username, USERNAME_MIN, USERNAME_MAX);
        errors.email(&self.email);

        errors.length("password", &self.password, SIGNUP_PASSWORD_MIN, PASSWORD_MAX);
        let has_lower = self.password.chars().any(|c| c.is_ascii_lowercase());
        let has_upper = self.password.chars().any(|c| c.is_ascii_uppercase());
        let has_digit = self.password.chars().any(|c| c.is_ascii_digit());
        if !(has_lower && has_upper && has_digit) {
            errors.push(
                "password",
                "Password must contain at least one lowercase letter, one uppercase letter, and one number",
            );
        }

        errors.length(
            "confirm_password",
            &self.confirm_password,
            SIGNUP_PASSWORD_MIN,
            PASSWORD_MAX,
        );
        if self.password.trim() != self.confirm_password.trim() {
            errors.push("confirm_password", "Passwords do not match");
        }

        errors.finish(SignupCredentials {
            username: self.username.trim().to_string(),
            email: self.email.trim().to_string(),
            password: self.password.trim().to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signup(password: &str, confirm: &str) -> SignupForm {
        SignupForm {
            username: "demo_user".to_string(),
            email: "demo@example.com".to_string(),
            password: password.to_string(),
            confirm_password: confirm.to_string(),
        }
    }

    #[test]
    fn test_login_trims_and_maps_identifier() {
        let creds = LoginForm::new(" demo@example.com ", " secret ")
            .validate()
            .unwrap();
        assert_eq!(creds.identifier, "demo@example.com");
        assert_eq!(creds.password, "secret");
        assert_eq!(
            serde_json::to_value(&creds).unwrap(),
            serde_json::json!({"identifier": "demo@example.com", "password": "secret"})
        );
    }

    #[test]
    fn test_login_rejects_bad_email_and_blank_password() {
        let errors = LoginForm::new("not-an-email", "   ").validate().unwrap_err();
        assert_eq!(errors.for_field("email"), vec!["Invalid email"]);
        assert_eq!(errors.for_field("password"), vec!["Input Password"]);
    }

    #[test]
    fn test_login_rejects_empty_and_overlong_password() {
        let errors = LoginForm::new("a@b.io", "").validate().unwrap_err();
        assert_eq!(errors.for_field("password").len(), 1);

        let long = "x".repeat(101);
        let errors = LoginForm::new("a@b.io", long).validate().unwrap_err();
        assert!(errors.for_field("password")[0].contains("at most 100"));
    }

    #[test]
    fn test_signup_accepts_strong_matching_passwords() {
        let creds = signup("Secret123", "Secret123").validate().unwrap();
        assert_eq!(creds.username, "demo_user");
        assert_eq!(creds.password, "Secret123");
    }

    #[test]
    fn test_signup_requires_character_classes() {
        for weak in ["alllowercase1", "ALLUPPERCASE1", "NoDigitsHere"] {
            let errors = signup(weak, weak).validate().unwrap_err();
            assert_eq!(errors.for_field("password").len(), 1, "{}", weak);
        }
    }

    #[test]
    fn test_signup_mismatch_is_reported_on_confirm_field() {
        let errors = signup("Secret123", "Secret124").validate().unwrap_err();
        assert_eq!(
            errors.for_field("confirm_password"),
            vec!["Passwords do not match"]
        );
        assert!(errors.for_field("password").is_empty());
    }

    #[test]
    fn test_signup_aggregates_all_fields() {
        let form = SignupForm {
            username: "ab".to_string(),
            email: "nope".to_string(),
            password: "short".to_string(),
            confirm_password: "".to_string(),
        };
        let errors = form.validate().unwrap_err();
        assert!(!errors.for_field("username").is_empty());
        assert!(!errors.for_field("email").is_empty());
        assert!(!errors.for_field("password").is_empty());
        assert!(!errors.for_field("confirm_password").is_empty());
        assert!(errors.to_string().contains("username:"));
    }

    #[test]
    fn test_credentials_debug_redacts_password() {
        let creds = LoginForm::new("a@b.io", "hunter2").validate().unwrap();
        assert!(!format!("{:?}", creds).contains("hunter2"));
    }
}
