//! Talking to the irrigation backend.
//!
//! The device reports each moisture reading to `readings/` and, once the
//! backend has stored it, asks `status/esp/` what the pump should do. HTTP
//! details stay in this module: callers only ever see a [`CycleError`].

use std::time;

use crate::config;
use crate::error::CycleError;
use crate::model;

pub mod schema;

const API_KEY_HEADER: &str = "X-API-KEY";

const READINGS_PATH: &str = "readings/";
const STATUS_PATH: &str = "status/esp/";
const PUMP_STATUS_PATH: &str = "pump-status/";

const STATUS_OK: u16 = 200;
const STATUS_CREATED: u16 = 201;

/// Status code and body of a completed exchange.
#[derive(Clone, Debug, PartialEq)]
pub struct Reply {
    pub status: u16,
    pub body: Vec<u8>,
}

/// A request/response primitive against the backend's API root.
///
/// An `Err` means no reply arrived at all; any status the backend sent back
/// is an `Ok` reply.
pub trait Transport {
    fn get(&mut self, path: &str) -> Result<Reply, failure::Error>;

    fn post_json<B>(&mut self, path: &str, body: &B) -> Result<Reply, failure::Error>
    where
        B: serde::Serialize;
}

pub struct HttpTransport {
    client: reqwest::blocking::Client,
    base_url: String,
    api_key: String,
}

impl HttpTransport {
    pub fn new(config: &config::Backend) -> Result<Self, failure::Error> {
        let client = reqwest::blocking::Client::builder()
            .timeout(time::Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(HttpTransport {
            client,
            base_url: config.base_url.trim_end_matches('/').to_owned(),
            api_key: config.api_key.clone(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }
}

impl Transport for HttpTransport {
    fn get(&mut self, path: &str) -> Result<Reply, failure::Error> {
        let response = self
            .client
            .get(&self.url(path))
            .header(API_KEY_HEADER, self.api_key.as_str())
            .send()?;
        into_reply(response)
    }

    fn post_json<B>(&mut self, path: &str, body: &B) -> Result<Reply, failure::Error>
    where
        B: serde::Serialize,
    {
        let response = self
            .client
            .post(&self.url(path))
            .header(API_KEY_HEADER, self.api_key.as_str())
            .json(body)
            .send()?;
        into_reply(response)
    }
}

fn into_reply(response: reqwest::blocking::Response) -> Result<Reply, failure::Error> {
    let status = response.status().as_u16();
    let body = response.bytes()?.to_vec();
    Ok(Reply { status, body })
}

/// Reporter and fetcher for one device.
pub struct Client<T> {
    log: slog::Logger,
    transport: T,
    device_id: String,
}

impl<T> Client<T>
where
    T: Transport,
{
    pub fn new(log: slog::Logger, transport: T, device_id: String) -> Self {
        Client {
            log,
            transport,
            device_id,
        }
    }

    /// Stores a reading; only `201 Created` counts as delivered.
    pub fn submit_reading(&mut self, reading: model::MoistureReading) -> Result<(), CycleError> {
        let body = schema::Reading {
            device_id: &self.device_id,
            moisture: reading.percent,
        };
        let reply = self
            .transport
            .post_json(READINGS_PATH, &body)
            .map_err(|e| CycleError::Disconnected(e.to_string()))?;
        debug!(self.log, "sent reading"; "status" => reply.status, "moisture" => reading.percent);

        expect_status(&reply, STATUS_CREATED, "reading")
    }

    pub fn fetch_status(&mut self) -> Result<model::StatusCommand, CycleError> {
        let reply = self
            .transport
            .get(STATUS_PATH)
            .map_err(|e| CycleError::Disconnected(e.to_string()))?;
        debug!(self.log, "fetched status"; "status" => reply.status, "bytes" => reply.body.len());

        expect_status(&reply, STATUS_OK, "status request")?;

        let status: schema::Status = serde_json::from_slice(&reply.body)
            .map_err(|e| CycleError::Decode(e.to_string()))?;
        status.into_command()
    }

    /// Tells the backend which state the relay was just switched to.
    pub fn sync_pump_status(&mut self, state: model::PumpState) -> Result<(), CycleError> {
        let body = schema::PumpStatus {
            device_id: &self.device_id,
            pump_on: state.is_on,
        };
        let reply = self
            .transport
            .post_json(PUMP_STATUS_PATH, &body)
            .map_err(|e| CycleError::Disconnected(e.to_string()))?;
        debug!(self.log, "synced pump status"; "status" => reply.status, "pump_on" => state.is_on);

        if (200..300).contains(&reply.status) {
            Ok(())
        } else {
            Err(CycleError::Rejected {
                request: "pump status",
                status: reply.status,
            })
        }
    }
}

fn expect_status(reply: &Reply, expected: u16, request: &'static str) -> Result<(), CycleError> {
    if reply.status == expected {
        Ok(())
    } else {
        Err(CycleError::Rejected {
            request,
            status: reply.status,
        })
    }
}

#[cfg(test)]
pub mod testing {
    use std::cell::RefCell;
    use std::collections;
    use std::rc::Rc;

    use super::{Reply, Transport};

    #[derive(Clone, Debug, PartialEq)]
    pub enum Request {
        Get(String),
        Post(String, serde_json::Value),
    }

    /// Answers requests from a script; an exhausted script or a `None` entry
    /// behaves like a dropped connection.
    #[derive(Clone, Default)]
    pub struct FakeTransport {
        pub replies: Rc<RefCell<collections::VecDeque<Option<Reply>>>>,
        pub requests: Rc<RefCell<Vec<Request>>>,
    }

    impl FakeTransport {
        pub fn reply(&self, status: u16, body: &str) -> &Self {
            self.replies.borrow_mut().push_back(Some(Reply {
                status,
                body: body.as_bytes().to_vec(),
            }));
            self
        }

        pub fn drop_connection(&self) -> &Self {
            self.replies.borrow_mut().push_back(None);
            self
        }

        pub fn paths(&self) -> Vec<String> {
            self.requests
                .borrow()
                .iter()
                .map(|r| match *r {
                    Request::Get(ref path) | Request::Post(ref path, _) => path.clone(),
                })
                .collect()
        }

        fn next_reply(&self) -> Result<Reply, failure::Error> {
            match self.replies.borrow_mut().pop_front() {
                Some(Some(reply)) => Ok(reply),
                _ => Err(failure::err_msg("connection refused")),
            }
        }
    }

    impl Transport for FakeTransport {
        fn get(&mut self, path: &str) -> Result<Reply, failure::Error> {
            self.requests
                .borrow_mut()
                .push(Request::Get(path.to_owned()));
            self.next_reply()
        }

        fn post_json<B>(&mut self, path: &str, body: &B) -> Result<Reply, failure::Error>
        where
            B: serde::Serialize,
        {
            let body = serde_json::to_value(body)?;
            self.requests
                .borrow_mut()
                .push(Request::Post(path.to_owned(), body));
            self.next_reply()
        }
    }
}
