//! Cookie-backed portal session.

use std::time::Duration;

use reqwest::header::{ACCEPT, HeaderMap, HeaderValue, REFERER};
use reqwest::{StatusCode, Url};

use crate::form::LoginForm;
use crate::navigate::next_hop;
use crate::{GradesPageSource, PortalConfig, PortalError, decode_page};

/// Browser-like user agent; some portals reject unknown clients.
pub const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124 Safari/537.36";

const ACCEPT_HTML: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8";

/// Maximum HTTP redirects followed per request.
const MAX_REDIRECTS: usize = 5;

/// A logged-in (or about to be) portal session.
#[derive(Debug, Clone)]
pub struct PortalClient {
    http: reqwest::Client,
    config: PortalConfig,
}

/// Returns `true` if a probe response means the session is not
/// authenticated.
#[must_use]
pub fn is_rejected(status: StatusCode, final_url: &Url, login_url: &Url) -> bool {
    status == StatusCode::UNAUTHORIZED
        || status == StatusCode::FORBIDDEN
        || final_url.as_str().starts_with(login_url.as_str())
}

impl PortalClient {
    /// Creates a session with an empty cookie jar.
    ///
    /// # Errors
    ///
    /// * [`PortalError::Http`] if the HTTP client cannot be built
    pub fn new(config: PortalConfig) -> Result<Self, PortalError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(ACCEPT_HTML));

        let http = reqwest::Client::builder()
            .cookie_store(true)
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self { http, config })
    }

    #[must_use]
    pub const fn config(&self) -> &PortalConfig {
        &self.config
    }

    async fn get_text(&self, url: &Url) -> Result<(Url, String), PortalError> {
        let response = self.http.get(url.clone()).send().await?.error_for_status()?;
        let final_url = response.url().clone();
        let bytes = response.bytes().await?;
        Ok((final_url, decode_page(bytes.to_vec())))
    }

    /// Logs in through the portal's login form.
    ///
    /// Success is verified by probing the grades URL: landing back on the
    /// login page, or a 401/403, means the credentials were rejected.
    ///
    /// # Errors
    ///
    /// * [`PortalError::LoginFormNotFound`] if the login page has no form
    /// * [`PortalError::LoginRejected`] if the probe fails
    /// * [`PortalError::Http`] on transport failures
    pub async fn login(&self) -> Result<(), PortalError> {
        let login_url = &self.config.login_url;
        log::info!("Fetching login page {login_url}");
        let (_, page) = self.get_text(login_url).await?;

        let form = LoginForm::detect(
            &page,
            login_url,
            self.config.user_field.as_deref(),
            self.config.pass_field.as_deref(),
        )?;

        log::info!("Submitting credentials to {}", form.action);
        let response = self
            .http
            .post(form.action.clone())
            .header(REFERER, login_url.as_str())
            .form(&form.payload(&self.config.user, &self.config.pass))
            .send()
            .await?;
        log::debug!("Login POST answered {}", response.status());

        let probe = self.http.get(self.config.grades_url.clone()).send().await?;
        if is_rejected(probe.status(), probe.url(), login_url) {
            return Err(PortalError::LoginRejected {
                user_field: form.user_field,
                pass_field: form.pass_field,
            });
        }

        log::info!("Logged in as {}", self.config.user);
        tokio::time::sleep(Duration::from_millis(self.config.login_pause_ms)).await;
        Ok(())
    }

    /// Downloads the grades page of the current session.
    ///
    /// Meta refreshes are followed, and so are frames when a page has no
    /// table of its own, up to `max_hops` times.
    ///
    /// # Errors
    ///
    /// * [`PortalError::TooManyHops`] if the page still points elsewhere
    ///   after `max_hops` hops
    /// * [`PortalError::Http`] on transport failures
    pub async fn fetch_grades_html(&self) -> Result<String, PortalError> {
        let mut url = self.config.grades_url.clone();
        let mut hops = 0_u8;

        loop {
            log::info!("Downloading grades page {url}");
            let (final_url, html) = self.get_text(&url).await?;

            let Some(next) = next_hop(&html, &final_url)? else {
                log::info!("Grades page downloaded ({} bytes)", html.len());
                return Ok(html);
            };
            if hops >= self.config.max_hops {
                return Err(PortalError::TooManyHops {
                    hops,
                    url: final_url.to_string(),
                });
            }

            log::debug!("Following {final_url} -> {next}");
            hops += 1;
            url = next;
        }
    }
}

impl GradesPageSource for PortalClient {
    async fn fetch_html(&self) -> Result<String, PortalError> {
        self.login().await?;
        self.fetch_grades_html().await
    }

    fn describe(&self) -> String {
        format!("portal {}", self.config.grades_url)
    }
}
