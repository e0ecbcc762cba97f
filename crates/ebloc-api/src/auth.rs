use std::fmt;

use secrecy::{ExposeSecret, SecretString};

/// Credentials for one apartment account on the owners portal.
///
/// Immutable for the lifetime of a configuration. The association and
/// apartment identifiers select which apartment the data endpoints report on;
/// they are also sent with the login form.
#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    pub password: SecretString,
    pub association_id: String,
    pub apartment_id: String,
}

impl Credentials {
    pub fn new(
        username: impl Into<String>,
        password: SecretString,
        association_id: impl Into<String>,
        apartment_id: impl Into<String>,
    ) -> Self {
        Self {
            username: username.into(),
            password,
            association_id: association_id.into(),
            apartment_id: apartment_id.into(),
        }
    }

    /// Form body for the login request: `pUser`, `pPass`, `pIdAsoc`, `pIdAp`.
    pub(crate) fn login_form(&self) -> [(&'static str, &str); 4] {
        [
            ("pUser", self.username.as_str()),
            ("pPass", self.password.expose_secret()),
            ("pIdAsoc", self.association_id.as_str()),
            ("pIdAp", self.apartment_id.as_str()),
        ]
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &mask_value(&self.username))
            .field("password", &"****")
            .field("association_id", &mask_value(&self.association_id))
            .field("apartment_id", &mask_value(&self.apartment_id))
            .finish()
    }
}

/// Mask a value for logs, keeping only the first three characters.
///
/// Values of three characters or fewer are returned unchanged.
pub fn mask_value(value: &str) -> String {
    let len = value.chars().count();
    if len <= 3 {
        return value.to_owned();
    }
    let mut masked: String = value.chars().take(3).collect();
    masked.push_str(&"*".repeat(len - 3));
    masked
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mask_keeps_first_three_characters() {
        assert_eq!(mask_value("popescu"), "pop****");
        assert_eq!(mask_value("1234"), "123*");
    }

    #[test]
    fn mask_leaves_short_values_alone() {
        assert_eq!(mask_value(""), "");
        assert_eq!(mask_value("ab"), "ab");
        assert_eq!(mask_value("abc"), "abc");
    }

    #[test]
    fn mask_counts_characters_not_bytes() {
        assert_eq!(mask_value("ăîșț"), "ăîș*");
    }

    #[test]
    fn debug_output_never_contains_password() {
        let creds = Credentials::new(
            "ion.popescu",
            SecretString::from("hunter22".to_string()),
            "12345",
            "678",
        );
        let rendered = format!("{creds:?}");
        assert!(!rendered.contains("hunter22"));
        assert!(rendered.contains("ion********"));
        assert!(rendered.contains("123**"));
        assert!(rendered.contains("678"));
    }
}
