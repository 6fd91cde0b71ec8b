use crate::error::{
    Error,
    Result,
};
use cookie_store::{
    CookieError,
    CookieStore,
    RawCookie,
};
use reqwest_cookie_store::CookieStoreMutex;
use std::{
    fmt,
    sync::{
        Arc,
        MutexGuard,
        PoisonError,
    },
};
use url::Url;

pub const SESSION_TOKEN_COOKIE: &str = "sessionToken";
pub const SESSION_ID_COOKIE: &str = "SID";

/// The cookie jar of one modem, scoped to its base address.
///
/// The jar is shared with the `reqwest` client so that cookies the modem sets
/// on regular responses are picked up automatically. The `SID` cookie is not
/// sent that way and has to be spliced in with [`SessionStore::store_session_id`].
#[derive(Clone)]
pub struct SessionStore {
    base_url: Url,
    jar: Arc<CookieStoreMutex>,
}

impl fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionStore")
            .field("base_url", &self.base_url.as_str())
            .finish_non_exhaustive()
    }
}

impl SessionStore {
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url,
            jar: Arc::new(CookieStoreMutex::new(CookieStore::default())),
        }
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub(crate) fn jar(&self) -> Arc<CookieStoreMutex> {
        Arc::clone(&self.jar)
    }

    fn lock(&self) -> MutexGuard<'_, CookieStore> {
        self.jar.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Value of the cookie `name` that would be sent to the base address.
    pub fn cookie(&self, name: &str) -> Option<String> {
        self.lock()
            .matches(&self.base_url)
            .into_iter()
            .find(|cookie| cookie.name() == name)
            .map(|cookie| cookie.value().to_string())
    }

    /// The token every getter/setter call has to carry in its body.
    pub fn session_token(&self) -> Result<String> {
        self.cookie(SESSION_TOKEN_COOKIE).ok_or(Error::NoSessionToken)
    }

    pub fn session_id(&self) -> Option<String> {
        self.cookie(SESSION_ID_COOKIE)
    }

    /// Names and values of all cookies stored for the base address.
    pub fn cookies(&self) -> Vec<(String, String)> {
        self.lock()
            .matches(&self.base_url)
            .into_iter()
            .map(|cookie| (cookie.name().to_string(), cookie.value().to_string()))
            .collect()
    }

    /// Commits `sid` together with the cookies of the login response.
    ///
    /// An `SID` cookie among `response_cookies` gets its value replaced,
    /// otherwise a host-only `SID` cookie for the base host is appended.
    /// Only a rejected `SID` is an error, other cookies are stored like the
    /// HTTP client stores them.
    pub fn store_session_id(&self, sid: &str, response_cookies: Vec<RawCookie<'static>>) -> Result<()> {
        let mut session_id = RawCookie::new(SESSION_ID_COOKIE, sid.to_string());
        let mut store = self.lock();
        for cookie in response_cookies {
            if cookie.name() == SESSION_ID_COOKIE {
                session_id = cookie;
                session_id.set_value(sid.to_string());
            } else {
                insert_lenient(&mut store, &cookie, &self.base_url);
            }
        }
        store.insert_raw(&session_id, &self.base_url)?;
        debug!("stored session id");
        Ok(())
    }

    /// Replaces everything stored for the modem with `cookies`. Deletions
    /// (expired cookies) and cookies the jar refuses are skipped.
    pub fn overwrite(&self, cookies: Vec<RawCookie<'static>>) {
        let mut store = self.lock();
        store.clear();
        for cookie in &cookies {
            insert_lenient(&mut store, cookie, &self.base_url);
        }
        debug!(cookies = cookies.len(), "overwrote session cookies");
    }
}

/// Inserts `cookie`, treating an expired one as a deletion and skipping
/// cookies the jar rejects.
fn insert_lenient(store: &mut CookieStore, cookie: &RawCookie<'_>, url: &Url) {
    match store.insert_raw(cookie, url) {
        Ok(_) => {}
        Err(CookieError::Expired) => trace!(name = cookie.name(), "cookie deleted"),
        Err(err) => warn!(%err, name = cookie.name(), "ignoring cookie rejected by the jar"),
    }
}

/// Cookies set by `response`, parsed from its `Set-Cookie` headers.
pub(crate) fn response_cookies(response: &reqwest::Response) -> Vec<RawCookie<'static>> {
    response
        .headers()
        .get_all(reqwest::header::SET_COOKIE)
        .iter()
        .filter_map(|value| {
            let value = value.to_str().ok()?;
            RawCookie::parse(value.to_string())
                .inspect_err(|err| warn!(%err, "ignoring malformed Set-Cookie header"))
                .ok()
        })
        .collect()
}
