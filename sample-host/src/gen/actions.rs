// Code generated by plugbus generate; DO NOT EDIT.
//
// Mount this file as a module of the host crate:
//
//     #[path = "src/gen/actions.rs"]
//     pub mod actions;

use std::sync::{Arc, Mutex};

use serde_derive::{Deserialize, Serialize};
use serde_json::Value;

use plugbus_plugin_lib::Client;
use plugbus_rpc::{Dispatch, Error, RemoteError};

use crate::api as api0;

/// Host-side implementations of the generated actions.
///
/// One field per receiver type; the host fills these in before
/// registering the struct as the `Host` service.
pub struct HostActions {
    pub api0_app_ref: Arc<Mutex<api0::App>>,
}

/// Plugin-side call shims for the generated actions.
pub struct ClientActions {
    client: Client,
}

impl ClientActions {
    pub fn new(client: Client) -> ClientActions {
        ClientActions { client }
    }

    /// Prints `text` on the host's standard output.
    pub fn print(&self, text: &str) -> Result<(), Error> {
        self.client.print(text)
    }
}

#[derive(Serialize, Deserialize)]
pub struct GetRandomIntRequest {
    pub n: i64,
}

#[derive(Serialize, Deserialize)]
pub struct GetRandomIntResponse {
    pub res0: i64,
}

impl HostActions {
    /// Returns a non-negative pseudo-random number in `[0, n)`.
    pub fn get_random_int(
        &self,
        args: GetRandomIntRequest,
    ) -> Result<GetRandomIntResponse, RemoteError> {
        let target =
            self.api0_app_ref.lock().map_err(|_| RemoteError::new("receiver lock poisoned"))?;
        let res0 =
            target.get_random_int(args.n).map_err(|err| RemoteError::new(err.to_string()))?;
        Ok(GetRandomIntResponse { res0 })
    }
}

impl ClientActions {
    /// Returns a non-negative pseudo-random number in `[0, n)`.
    pub fn get_random_int(&self, n: i64) -> Result<i64, Error> {
        let response: GetRandomIntResponse =
            self.client.call("get_random_int", &GetRandomIntRequest { n })?;
        Ok(response.res0)
    }
}

#[derive(Serialize, Deserialize)]
pub struct PrintHelloRequest {}

#[derive(Serialize, Deserialize)]
pub struct PrintHelloResponse {}

impl HostActions {
    /// Prints a greeting on the host's standard output, counting how
    /// often it was asked to.
    pub fn print_hello(
        &self,
        _args: PrintHelloRequest,
    ) -> Result<PrintHelloResponse, RemoteError> {
        let mut target =
            self.api0_app_ref.lock().map_err(|_| RemoteError::new("receiver lock poisoned"))?;
        target.print_hello().map_err(|err| RemoteError::new(err.to_string()))?;
        Ok(PrintHelloResponse {})
    }
}

impl ClientActions {
    /// Prints a greeting on the host's standard output, counting how
    /// often it was asked to.
    pub fn print_hello(&self) -> Result<(), Error> {
        let _response: PrintHelloResponse =
            self.client.call("print_hello", &PrintHelloRequest {})?;
        Ok(())
    }
}

#[derive(Serialize, Deserialize)]
pub struct SummarizeRequest {
    pub values: Vec<i64>,
}

#[derive(Serialize, Deserialize)]
pub struct SummarizeResponse {
    pub res0: api0::Summary,
}

impl HostActions {
    /// Boils a batch of samples down to its summary.
    pub fn summarize(&self, args: SummarizeRequest) -> Result<SummarizeResponse, RemoteError> {
        let target =
            self.api0_app_ref.lock().map_err(|_| RemoteError::new("receiver lock poisoned"))?;
        let res0 =
            target.summarize(args.values).map_err(|err| RemoteError::new(err.to_string()))?;
        Ok(SummarizeResponse { res0 })
    }
}

impl ClientActions {
    /// Boils a batch of samples down to its summary.
    pub fn summarize(&self, values: Vec<i64>) -> Result<api0::Summary, Error> {
        let response: SummarizeResponse =
            self.client.call("summarize", &SummarizeRequest { values })?;
        Ok(response.res0)
    }
}

impl Dispatch for HostActions {
    fn dispatch(&self, method: &str, params: Value) -> Result<Value, RemoteError> {
        match method {
            "get_random_int" => {
                let args: GetRandomIntRequest =
                    serde_json::from_value(params).map_err(RemoteError::invalid_params)?;
                let reply = self.get_random_int(args)?;
                serde_json::to_value(reply).map_err(RemoteError::from)
            }
            "print_hello" => {
                let args: PrintHelloRequest =
                    serde_json::from_value(params).map_err(RemoteError::invalid_params)?;
                let reply = self.print_hello(args)?;
                serde_json::to_value(reply).map_err(RemoteError::from)
            }
            "summarize" => {
                let args: SummarizeRequest =
                    serde_json::from_value(params).map_err(RemoteError::invalid_params)?;
                let reply = self.summarize(args)?;
                serde_json::to_value(reply).map_err(RemoteError::from)
            }
            _ => Err(RemoteError::method_not_found(method)),
        }
    }
}
