pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("no `sessionToken` cookie stored for the modem, load the homepage first")]
    NoSessionToken,
    #[error("login failed, the modem did not answer with a session id")]
    LoginFailed,
    #[error("request to the modem failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("could not decode the modem response: {0}")]
    DecodeFailed(#[from] DecodeError),
    #[error("invalid modem address: {0}")]
    InvalidAddress(#[from] url::ParseError),
    #[error("the modem sent a cookie that cannot be stored: {0}")]
    Cookie(#[from] cookie_store::CookieError),
}

/// Why an XML payload could not be turned into records.
#[derive(thiserror::Error, Debug)]
pub enum DecodeError {
    #[error("malformed XML: {0}")]
    Xml(#[from] quick_xml::Error),
    #[error("unexpected XML content: {0}")]
    Deserialize(#[from] quick_xml::DeError),
    #[error("document has no root element")]
    MissingRoot,
    #[error("expected root element `{expected}` but found `{found}`")]
    UnexpectedRoot { expected: &'static str, found: String },
}
