use crate::{
    error::{
        Error,
        Result,
    },
    form::FormValues,
    session::SessionStore,
};
use reqwest::{
    header::CONTENT_TYPE,
    Response,
};
use std::time::Duration;
use tokio::sync::Mutex;
use url::Url;

const GETTER_PATH: &str = "/xml/getter.xml";
const SETTER_PATH: &str = "/xml/setter.xml";

/// Numeric code selecting what the getter/setter endpoint does.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, derive_more::Display)]
pub struct Function(pub u16);

impl Function {
    pub const DOWNSTREAM_TABLE: Self = Self(10);
    pub const LOGIN: Self = Self(15);
    pub const LOGOUT: Self = Self(16);
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, derive_more::Display)]
pub enum AuthState {
    #[default]
    LoggedOut,
    AwaitingToken,
    Authenticating,
    LoggedIn,
}

/// Client for the web interface of a single CH7465LG modem.
///
/// All operations serialize on one lock: the modem rotates its session token
/// on every request, so a call must never read the token while a login or
/// logout is replacing it. Use one client per modem.
#[derive(derive_more::Debug)]
pub struct Client {
    pub(crate) session: SessionStore,
    #[debug(skip)]
    pub(crate) password: String,
    pub(crate) http: reqwest::Client,
    pub(crate) state: Mutex<AuthState>,
    getter_url: Url,
    setter_url: Url,
}

impl Client {
    /// Creates a client for the modem at `address`, either `host[:port]` or
    /// a full `http(s)://` URL.
    pub fn new(address: impl AsRef<str>, password: impl Into<String>) -> Result<Self> {
        Self::builder(address, password).build()
    }

    pub fn builder(address: impl AsRef<str>, password: impl Into<String>) -> ClientBuilder {
        ClientBuilder {
            address: address.as_ref().to_string(),
            password: password.into(),
            timeout: None,
        }
    }

    pub fn base_url(&self) -> &Url {
        self.session.base_url()
    }

    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    pub async fn state(&self) -> AuthState {
        *self.state.lock().await
    }

    /// Calls the getter endpoint. The response is returned as is.
    pub async fn get(&self, function: Function) -> Result<Response> {
        let _state = self.state.lock().await;
        self.post_getter(function).await
    }

    /// Calls the setter endpoint with `fields` appended after `token` and
    /// `fun`. The response is returned as is.
    pub async fn set(&self, function: Function, fields: FormValues) -> Result<Response> {
        let _state = self.state.lock().await;
        self.post_setter(function, fields).await
    }

    pub(crate) async fn post_getter(&self, function: Function) -> Result<Response> {
        let form = self.rpc_form(function)?;
        self.post(&self.getter_url, form).await
    }

    pub(crate) async fn post_setter(&self, function: Function, fields: FormValues) -> Result<Response> {
        let mut form = self.rpc_form(function)?;
        form.extend(fields);
        self.post(&self.setter_url, form).await
    }

    fn rpc_form(&self, function: Function) -> Result<FormValues> {
        let token = self.session.session_token()?;
        Ok(FormValues::new()
            .with("token", token)
            .with("fun", function.to_string()))
    }

    async fn post(&self, url: &Url, form: FormValues) -> Result<Response> {
        trace!(%url, fields = form.len(), "posting form");
        let response = self
            .http
            .post(url.clone())
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(form.encode())
            .send()
            .await?;
        trace!(status = %response.status(), "modem responded");
        Ok(response)
    }
}

// -=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-

#[derive(derive_more::Debug)]
pub struct ClientBuilder {
    address: String,
    #[debug(skip)]
    password: String,
    timeout: Option<Duration>,
}

impl ClientBuilder {
    /// Total timeout for each request made to the modem.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn build(self) -> Result<Client> {
        let base_url = parse_base_url(&self.address)?;
        let getter_url = base_url.join(GETTER_PATH)?;
        let setter_url = base_url.join(SETTER_PATH)?;
        let session = SessionStore::new(base_url);

        let mut http = reqwest::Client::builder().cookie_provider(session.jar());
        if let Some(timeout) = self.timeout {
            http = http.timeout(timeout);
        }

        Ok(Client {
            http: http.build()?,
            session,
            password: self.password,
            state: Mutex::new(AuthState::LoggedOut),
            getter_url,
            setter_url,
        })
    }
}

fn parse_base_url(address: &str) -> Result<Url> {
    let url = if address.contains("://") {
        Url::parse(address)?
    } else {
        Url::parse(&format!("http://{address}"))?
    };
    if url.host_str().is_none_or(str::is_empty) {
        return Err(Error::InvalidAddress(url::ParseError::EmptyHost));
    }
    Ok(url)
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn function_codes() {
        assert_eq!(Function::DOWNSTREAM_TABLE.to_string(), "10");
        assert_eq!(Function::LOGIN.to_string(), "15");
        assert_eq!(Function::LOGOUT.to_string(), "16");
    }

    #[test]
    fn bare_host_defaults_to_http() {
        let client = Client::new("192.168.178.1", "secret").expect("valid address");
        assert_eq!(client.base_url().as_str(), "http://192.168.178.1/");
        assert_eq!(client.getter_url.as_str(), "http://192.168.178.1/xml/getter.xml");
        assert_eq!(client.setter_url.as_str(), "http://192.168.178.1/xml/setter.xml");
    }

    #[test]
    fn keeps_explicit_scheme_and_port() {
        let client = Client::new("https://modem.local:8443", "secret").expect("valid address");
        assert_eq!(client.setter_url.as_str(), "https://modem.local:8443/xml/setter.xml");
    }

    #[test]
    fn rejects_invalid_address() {
        assert!(matches!(
            Client::new("", "secret"),
            Err(Error::InvalidAddress(_))
        ));
        assert!(matches!(
            Client::new("http://", "secret"),
            Err(Error::InvalidAddress(_))
        ));
    }

    #[test]
    fn debug_output_hides_password() {
        let client = Client::new("192.168.178.1", "hunter2").expect("valid address");
        assert!(!format!("{client:?}").contains("hunter2"));
    }

    #[tokio::test]
    async fn rpc_without_session_token_fails_fast() {
        // Nothing listens on this port, the call has to fail before connecting.
        let client = Client::new("127.0.0.1:9", "secret").expect("valid address");
        assert!(matches!(
            client.get(Function::DOWNSTREAM_TABLE).await,
            Err(Error::NoSessionToken)
        ));
        assert!(matches!(
            client.set(Function::LOGOUT, FormValues::new()).await,
            Err(Error::NoSessionToken)
        ));
    }
}
