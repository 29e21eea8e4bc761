//! Login form detection.
//!
//! Portals rarely document their login form, so the form is read from the
//! login page itself: the form holding a password input, its hidden
//! tokens, and the most likely user and password field names.

use reqwest::Url;
use scraper::{ElementRef, Html, Selector};

use crate::{PortalError, resolve_url};

/// User field name used when none can be detected.
pub const FALLBACK_USER_FIELD: &str = "usuario";

/// Password field name used when none can be detected.
pub const FALLBACK_PASS_FIELD: &str = "contrasena";

/// A login form ready to be submitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginForm {
    /// Absolute URL the form posts to.
    pub action: Url,
    /// Hidden inputs (anti-forgery tokens, view state), in page order.
    pub hidden: Vec<(String, String)>,
    pub user_field: String,
    pub pass_field: String,
}

fn selector(css: &str) -> Selector {
    Selector::parse(css).unwrap_or_else(|_| unreachable!())
}

fn input_name(input: ElementRef<'_>) -> Option<String> {
    input
        .value()
        .attr("name")
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .map(ToOwned::to_owned)
}

impl LoginForm {
    /// Detects the login form of a login page.
    ///
    /// The first form containing a password input is used, or the first
    /// form if none does. Explicit field names in `user_field` and
    /// `pass_field` win over detection.
    ///
    /// # Errors
    ///
    /// * [`PortalError::LoginFormNotFound`] if the page has no `<form>`
    /// * [`PortalError::InvalidUrl`] if the form action cannot be resolved
    pub fn detect(
        html: &str,
        login_url: &Url,
        user_field: Option<&str>,
        pass_field: Option<&str>,
    ) -> Result<Self, PortalError> {
        let document = Html::parse_document(html);
        let form_sel = selector("form");
        let password_sel = selector("input[type=password i]");
        let user_sel = selector(
            "input[type=email i], input[autocomplete=username i], input[type=text i]",
        );
        let input_sel = selector("input");

        let form = document
            .select(&form_sel)
            .find(|f| f.select(&password_sel).next().is_some())
            .or_else(|| document.select(&form_sel).next())
            .ok_or(PortalError::LoginFormNotFound)?;

        let action = match form.value().attr("action").map(str::trim) {
            Some(action) if !action.is_empty() => resolve_url(login_url, action)?,
            _ => login_url.clone(),
        };

        let hidden: Vec<(String, String)> = form
            .select(&input_sel)
            .filter(|i| {
                i.value()
                    .attr("type")
                    .is_some_and(|t| t.eq_ignore_ascii_case("hidden"))
            })
            .filter_map(|i| {
                let name = input_name(i)?;
                Some((name, i.value().attr("value").unwrap_or_default().to_owned()))
            })
            .collect();

        let user_field = user_field
            .filter(|f| !f.is_empty())
            .map(ToOwned::to_owned)
            .or_else(|| form.select(&user_sel).find_map(input_name))
            .unwrap_or_else(|| FALLBACK_USER_FIELD.to_owned());
        let pass_field = pass_field
            .filter(|f| !f.is_empty())
            .map(ToOwned::to_owned)
            .or_else(|| form.select(&password_sel).find_map(input_name))
            .unwrap_or_else(|| FALLBACK_PASS_FIELD.to_owned());

        log::debug!(
            "Login form: action={action} user_field={user_field} pass_field={pass_field} hidden={}",
            hidden.len()
        );

        Ok(Self {
            action,
            hidden,
            user_field,
            pass_field,
        })
    }

    /// Builds the urlencoded body: every hidden input, then the
    /// credentials. A hidden input sharing a credential field name is
    /// replaced.
    #[must_use]
    pub fn payload(&self, user: &str, pass: &str) -> Vec<(String, String)> {
        let mut payload: Vec<(String, String)> = self
            .hidden
            .iter()
            .filter(|(name, _)| *name != self.user_field && *name != self.pass_field)
            .cloned()
            .collect();
        payload.push((self.user_field.clone(), user.to_owned()));
        payload.push((self.pass_field.clone(), pass.to_owned()));
        payload
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn login_url() -> Url {
        Url::parse("https://portal.example.cl/alumnos/login.aspx").unwrap()
    }

    #[test]
    fn detects_password_form_and_hidden_tokens() {
        let html = r#"
            <form action="/buscar"><input type="text" name="q"></form>
            <form action="auth.aspx" method="post">
              <input type="hidden" name="__VIEWSTATE" value="abc">
              <input type="hidden" name="token" value="">
              <input type="email" name="correo">
              <input type="password" name="clave">
            </form>"#;

        let form = LoginForm::detect(html, &login_url(), None, None).unwrap();
        assert_eq!(form.action.as_str(), "https://portal.example.cl/alumnos/auth.aspx");
        assert_eq!(
            form.hidden,
            vec![
                ("__VIEWSTATE".to_owned(), "abc".to_owned()),
                ("token".to_owned(), String::new()),
            ]
        );
        assert_eq!(form.user_field, "correo");
        assert_eq!(form.pass_field, "clave");
    }

    #[test]
    fn prefers_username_autocomplete_over_later_text() {
        let html = r#"
            <form>
              <input name="rut" autocomplete="username">
              <input type="text" name="captcha">
              <input type="password" name="pwd">
            </form>"#;
        let form = LoginForm::detect(html, &login_url(), None, None).unwrap();
        assert_eq!(form.user_field, "rut");
        assert_eq!(form.action, login_url());
    }

    #[test]
    fn overrides_win_and_fallbacks_apply() {
        let html = r#"<form action=""><input type="submit" value="Entrar"></form>"#;
        let form = LoginForm::detect(html, &login_url(), None, None).unwrap();
        assert_eq!(form.user_field, FALLBACK_USER_FIELD);
        assert_eq!(form.pass_field, FALLBACK_PASS_FIELD);

        let form = LoginForm::detect(html, &login_url(), Some("email"), Some("password")).unwrap();
        assert_eq!(form.user_field, "email");
        assert_eq!(form.pass_field, "password");
    }

    #[test]
    fn page_without_form_is_an_error() {
        assert!(matches!(
            LoginForm::detect("<p>Mantención</p>", &login_url(), None, None),
            Err(PortalError::LoginFormNotFound)
        ));
    }

    #[test]
    fn payload_keeps_tokens_and_sets_credentials() {
        let form = LoginForm {
            action: login_url(),
            hidden: vec![
                ("__VIEWSTATE".to_owned(), "abc".to_owned()),
                ("usuario".to_owned(), String::new()),
            ],
            user_field: "usuario".to_owned(),
            pass_field: "contrasena".to_owned(),
        };
        assert_eq!(
            form.payload("alumno", "secreto"),
            vec![
                ("__VIEWSTATE".to_owned(), "abc".to_owned()),
                ("usuario".to_owned(), "alumno".to_owned()),
                ("contrasena".to_owned(), "secreto".to_owned()),
            ]
        );
    }
}
