// barometer_logger - Barometric pressure logger for router admin pages
//
// Copyright 2026 barometer_logger contributors
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <http://www.gnu.org/licenses/>.
//

use crate::clock::Clock;
use crate::config::Credentials;
use crate::reading::{Reading, Status};
use async_trait::async_trait;
use regex::Regex;
use reqwest::header::{ACCEPT, USER_AGENT};
use reqwest::{Client, Response, StatusCode, Url};
use std::error;
use std::fmt;
use std::sync::Arc;

#[derive(Debug)]
pub enum ClientError {
    Internal(reqwest::Error),
    Unauthorized(StatusCode, Url),
    Unexpected(StatusCode, Url),
    MissingField(String),
    InvalidValue(String),
}

impl ClientError {
    /// The reading status this error corresponds to: `FetchError` when the router could
    /// not be reached or refused us, `ParseError` when the page came back without a
    /// usable pressure value.
    pub fn status(&self) -> Status {
        match self {
            Self::Internal(_) | Self::Unauthorized(_, _) | Self::Unexpected(_, _) => Status::FetchError,
            Self::MissingField(_) | Self::InvalidValue(_) => Status::ParseError,
        }
    }
}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Internal(e) => write!(f, "{}", e),
            Self::Unauthorized(status, url) => write!(f, "authentication rejected with status {} for {}", status, url),
            Self::Unexpected(status, url) => write!(f, "unexpected status {} for {}", status, url),
            Self::MissingField(label) => write!(f, "no '{}' field found in router page", label),
            Self::InvalidValue(value) => write!(f, "could not parse pressure from '{}'", value),
        }
    }
}

impl error::Error for ClientError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            Self::Internal(e) => Some(e),
            _ => None,
        }
    }
}

/// Something that can produce a single pressure reading.
///
/// Implementations signal failures through `ClientError` instead of panicking or
/// exiting. They must not write readings anywhere themselves.
#[async_trait]
pub trait RouterClient: Send + Sync {
    async fn fetch_reading(&self) -> Result<Reading, ClientError>;
}

/// Strategy for pulling a pressure value, in pascals, out of a router status page.
///
/// Page layouts differ between firmware versions so this is kept separate from the
/// HTTP side of things.
pub trait PressureParser: Send + Sync + fmt::Debug {
    fn parse(&self, body: &str) -> Result<f64, ClientError>;
}

/// Parser for status pages that render settings as a two column HTML table.
///
/// The row whose first cell matches the configured label (`Barometer Value` by default),
/// ignoring any markup wrapped around the label, is located and the first number in the neighbouring cell is used, so a cell like
/// `Pressure = 96231` yields `96231.0`.
#[derive(Debug, Clone)]
pub struct BarometerTableParser {
    label: String,
    row: Regex,
    tag: Regex,
    number: Regex,
}

impl BarometerTableParser {
    pub const DEFAULT_LABEL: &'static str = "Barometer Value";

    pub fn new(label: &str) -> Self {
        let row = format!(
            r"(?is)<t[dh][^>]*>\s*(?:<[^>]*>\s*)*{}\s*(?:<[^>]*>\s*)*</t[dh]>\s*<td[^>]*>(.*?)</td>",
            regex::escape(label.trim())
        );

        BarometerTableParser {
            label: label.trim().to_owned(),
            row: Regex::new(&row).expect("escaped label always forms a valid pattern"),
            tag: Regex::new(r"<[^>]*>").expect("tag pattern is valid"),
            number: Regex::new(r"-?\d+(?:\.\d+)?").expect("number pattern is valid"),
        }
    }
}

impl Default for BarometerTableParser {
    fn default() -> Self {
        Self::new(Self::DEFAULT_LABEL)
    }
}

impl PressureParser for BarometerTableParser {
    fn parse(&self, body: &str) -> Result<f64, ClientError> {
        let cell = self
            .row
            .captures(body)
            .and_then(|c| c.get(1))
            .ok_or_else(|| ClientError::MissingField(self.label.clone()))?;

        let text = self.tag.replace_all(cell.as_str(), " ");
        let text = text.trim();

        self.number
            .find(text)
            .and_then(|m| m.as_str().parse::<f64>().ok())
            .ok_or_else(|| ClientError::InvalidValue(text.to_owned()))
    }
}

/// Fetches the router's status page using HTTP basic auth and parses the pressure
/// value out of it.
///
/// Timeouts and TLS settings come from the `reqwest::Client` passed in.
#[derive(Debug)]
pub struct HttpRouterClient {
    client: Client,
    url: Url,
    credentials: Credentials,
    parser: Box<dyn PressureParser>,
    clock: Arc<dyn Clock>,
}

impl HttpRouterClient {
    const USER_AGENT: &'static str = "barometer_logger (https://github.com/barometer-logger/barometer_logger)";
    const HTML_RESPONSE: &'static str = "text/html";

    pub fn new(
        client: Client,
        url: Url,
        credentials: Credentials,
        parser: Box<dyn PressureParser>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        HttpRouterClient {
            client,
            url,
            credentials,
            parser,
            clock,
        }
    }

    async fn make_request(&self) -> Result<Response, ClientError> {
        let res = self
            .client
            .get(self.url.clone())
            .basic_auth(&self.credentials.username, Some(&self.credentials.password))
            .header(USER_AGENT, Self::USER_AGENT)
            .header(ACCEPT, Self::HTML_RESPONSE)
            .send()
            .await
            .map_err(ClientError::Internal)?;

        let status = res.status();
        tracing::debug!(message = "router responded", url = %self.url, status = %status);

        if status == StatusCode::OK {
            Ok(res)
        } else if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            Err(ClientError::Unauthorized(status, self.url.clone()))
        } else {
            Err(ClientError::Unexpected(status, self.url.clone()))
        }
    }
}

#[async_trait]
impl RouterClient for HttpRouterClient {
    async fn fetch_reading(&self) -> Result<Reading, ClientError> {
        tracing::debug!(message = "making router status request", url = %self.url);

        let res = self.make_request().await?;
        let timestamp = self.clock.now();
        let body = res.text().await.map_err(ClientError::Internal)?;
        let pressure = self.parser.parse(&body)?;

        Ok(Reading::ok(timestamp, pressure))
    }
}
