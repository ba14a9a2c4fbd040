use std::time::Duration;

use reqwest::{Client, Error};

pub struct HttpClient;

impl HttpClient {
    pub fn default_user_agent() -> String {
        format!("tunestream/{}", env!("CARGO_PKG_VERSION"))
    }

    pub fn with_timeout(timeout: Duration) -> Result<Client, Error> {
        Client::builder()
            .user_agent(Self::default_user_agent())
            .timeout(timeout)
            .build()
    }
}
