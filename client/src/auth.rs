use crate::{
    client::{
        AuthState,
        Client,
        Function,
    },
    error::{
        Error,
        Result,
    },
    form::FormValues,
    session,
};
use regex::Regex;

lazy_static::lazy_static! {
    static ref SESSION_ID_PATTERN: Regex =
        Regex::new(r"^successful;SID=(\d+)$").expect("session id pattern is valid");
}

/// Extracts the session id from the body of a login response.
fn parse_session_id(body: &str) -> Option<&str> {
    SESSION_ID_PATTERN
        .captures(body)
        .and_then(|captures| captures.get(1))
        .map(|sid| sid.as_str())
}

impl Client {
    /// Logs into the modem.
    ///
    /// Loads the homepage to obtain a session token, submits the password and
    /// stores the session id the modem answers with. Any answer other than
    /// `successful;SID=<digits>` is reported as [`Error::LoginFailed`].
    #[instrument(level = "debug", skip(self), fields(modem = %self.base_url()))]
    pub async fn login(&self) -> Result<()> {
        let mut state = self.state.lock().await;
        let result = self.handshake(&mut state).await;
        if let Err(err) = &result {
            debug!(%err, "login aborted");
            *state = AuthState::LoggedOut;
        }
        result
    }

    async fn handshake(&self, state: &mut AuthState) -> Result<()> {
        // TODO: skip the handshake when the stored SID is still accepted by the modem.
        *state = AuthState::AwaitingToken;
        let homepage = self.http.get(self.base_url().clone()).send().await?;
        trace!(status = %homepage.status(), "loaded homepage");
        drop(homepage);

        *state = AuthState::Authenticating;
        let credentials = FormValues::new()
            .with("Username", "NULL")
            .with("Password", self.password.as_str());
        let response = self.post_setter(Function::LOGIN, credentials).await?;
        let cookies = session::response_cookies(&response);
        let body = response.text().await?;

        let Some(sid) = parse_session_id(&body) else {
            debug!(len = body.len(), "login response did not contain a session id");
            return Err(Error::LoginFailed);
        };
        self.session.store_session_id(sid, cookies)?;

        *state = AuthState::LoggedIn;
        info!("logged in");
        Ok(())
    }

    /// Ends the current session. The cookies of the logout response replace
    /// all stored cookies, dropping the session id.
    #[instrument(level = "debug", skip(self), fields(modem = %self.base_url()))]
    pub async fn logout(&self) -> Result<()> {
        let mut state = self.state.lock().await;
        let response = self.post_setter(Function::LOGOUT, FormValues::new()).await?;
        self.session.overwrite(session::response_cookies(&response));

        *state = AuthState::LoggedOut;
        info!("logged out");
        Ok(())
    }
}
