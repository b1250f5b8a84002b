// Copyright 2022 The Plugbus Authors.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Rendering the resolved actions into Rust source, and writing it out.

use std::fmt::Write as FmtWrite;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::error::GenError;
use crate::model::{Action, ActionsFile};

/// Renders the whole `actions.rs` file.
pub(crate) fn render(file: &ActionsFile) -> String {
    let mut out = String::new();
    header(&mut out, file);
    imports(&mut out, file);
    host_struct(&mut out, file);
    client_struct(&mut out);
    for action in &file.actions {
        value_types(&mut out, action);
        host_shim(&mut out, action);
        client_shim(&mut out, action);
    }
    dispatch_impl(&mut out, file);
    out
}

fn header(out: &mut String, file: &ActionsFile) {
    writeln!(out, "// Code generated by plugbus generate; DO NOT EDIT.").unwrap();
    writeln!(out, "//").unwrap();
    writeln!(out, "// Mount this file as a module of the host crate:").unwrap();
    writeln!(out, "//").unwrap();
    writeln!(out, "//     #[path = \"{}/actions.rs\"]", file.out_rel).unwrap();
    writeln!(out, "//     pub mod {};", file.package).unwrap();
    writeln!(out).unwrap();
}

fn imports(out: &mut String, file: &ActionsFile) {
    if !file.references.is_empty() {
        writeln!(out, "use std::sync::{{Arc, Mutex}};").unwrap();
        writeln!(out).unwrap();
    }
    if !file.actions.is_empty() {
        writeln!(out, "use serde_derive::{{Deserialize, Serialize}};").unwrap();
    }
    writeln!(out, "use serde_json::Value;").unwrap();
    writeln!(out).unwrap();
    writeln!(out, "use plugbus_plugin_lib::Client;").unwrap();
    writeln!(out, "use plugbus_rpc::{{Dispatch, Error, RemoteError}};").unwrap();
    if !file.imports.is_empty() {
        writeln!(out).unwrap();
        for import in &file.imports {
            writeln!(out, "{}", import).unwrap();
        }
    }
    writeln!(out).unwrap();
}

fn host_struct(out: &mut String, file: &ActionsFile) {
    writeln!(out, "/// Host-side implementations of the generated actions.").unwrap();
    writeln!(out, "///").unwrap();
    writeln!(out, "/// One field per receiver type; the host fills these in before").unwrap();
    writeln!(out, "/// registering the struct as the `Host` service.").unwrap();
    if file.references.is_empty() {
        writeln!(out, "pub struct HostActions {{}}").unwrap();
    } else {
        writeln!(out, "pub struct HostActions {{").unwrap();
        for reference in &file.references {
            writeln!(out, "    pub {}: Arc<Mutex<{}>>,", reference.name, reference.ty).unwrap();
        }
        writeln!(out, "}}").unwrap();
    }
    writeln!(out).unwrap();
}

fn client_struct(out: &mut String) {
    writeln!(out, "/// Plugin-side call shims for the generated actions.").unwrap();
    writeln!(out, "pub struct ClientActions {{").unwrap();
    writeln!(out, "    client: Client,").unwrap();
    writeln!(out, "}}").unwrap();
    writeln!(out).unwrap();
    writeln!(out, "impl ClientActions {{").unwrap();
    writeln!(out, "    pub fn new(client: Client) -> ClientActions {{").unwrap();
    writeln!(out, "        ClientActions {{ client }}").unwrap();
    writeln!(out, "    }}").unwrap();
    writeln!(out).unwrap();
    writeln!(out, "    /// Prints `text` on the host's standard output.").unwrap();
    writeln!(out, "    pub fn print(&self, text: &str) -> Result<(), Error> {{").unwrap();
    writeln!(out, "        self.client.print(text)").unwrap();
    writeln!(out, "    }}").unwrap();
    writeln!(out, "}}").unwrap();
    writeln!(out).unwrap();
}

fn value_types(out: &mut String, action: &Action) {
    writeln!(out, "#[derive(Serialize, Deserialize)]").unwrap();
    if action.request.is_empty() {
        writeln!(out, "pub struct {} {{}}", action.request_type).unwrap();
    } else {
        writeln!(out, "pub struct {} {{", action.request_type).unwrap();
        for param in &action.request {
            writeln!(out, "    pub {}: {},", param.name, param.ty).unwrap();
        }
        writeln!(out, "}}").unwrap();
    }
    writeln!(out).unwrap();
    writeln!(out, "#[derive(Serialize, Deserialize)]").unwrap();
    if action.response.is_empty() {
        writeln!(out, "pub struct {} {{}}", action.response_type).unwrap();
    } else {
        writeln!(out, "pub struct {} {{", action.response_type).unwrap();
        for param in &action.response {
            writeln!(out, "    pub {}: {},", param.name, param.ty).unwrap();
        }
        writeln!(out, "}}").unwrap();
    }
    writeln!(out).unwrap();
}

fn doc(out: &mut String, action: &Action) {
    for line in &action.doc {
        writeln!(out, "    ///{}", line).unwrap();
    }
}

fn host_shim(out: &mut String, action: &Action) {
    writeln!(out, "impl HostActions {{").unwrap();
    doc(out, action);
    let args_name = if action.request.is_empty() { "_args" } else { "args" };
    writeln!(
        out,
        "    pub fn {}(&self, {}: {}) -> Result<{}, RemoteError> {{",
        action.name, args_name, action.request_type, action.response_type
    )
    .unwrap();
    let binding = if action.receiver_mut { "let mut target" } else { "let target" };
    writeln!(
        out,
        "        {} = self.{}.lock().map_err(|_| RemoteError::new(\"receiver lock poisoned\"))?;",
        binding, action.ref_name
    )
    .unwrap();
    let forwarded: Vec<String> =
        action.request.iter().map(|param| format!("args.{}", param.name)).collect();
    let call = format!("target.{}({})", action.name, forwarded.join(", "));
    let err_map = ".map_err(|err| RemoteError::new(err.to_string()))?";
    match action.response.len() {
        0 => {
            writeln!(out, "        {}{};", call, err_map).unwrap();
            writeln!(out, "        Ok({} {{}})", action.response_type).unwrap();
        }
        1 => {
            writeln!(out, "        let res0 = {}{};", call, err_map).unwrap();
            writeln!(out, "        Ok({} {{ res0 }})", action.response_type).unwrap();
        }
        _ => {
            let names: Vec<&str> =
                action.response.iter().map(|param| param.name.as_str()).collect();
            writeln!(out, "        let ({}) = {}{};", names.join(", "), call, err_map).unwrap();
            writeln!(out, "        Ok({} {{ {} }})", action.response_type, names.join(", "))
                .unwrap();
        }
    }
    writeln!(out, "    }}").unwrap();
    writeln!(out, "}}").unwrap();
    writeln!(out).unwrap();
}

fn client_shim(out: &mut String, action: &Action) {
    writeln!(out, "impl ClientActions {{").unwrap();
    doc(out, action);
    let params: Vec<String> =
        action.request.iter().map(|param| format!("{}: {}", param.name, param.ty)).collect();
    let returns = match action.response.len() {
        0 => "()".to_string(),
        1 => action.response[0].ty.clone(),
        _ => {
            let types: Vec<&str> = action.response.iter().map(|p| p.ty.as_str()).collect();
            format!("({})", types.join(", "))
        }
    };
    let sig_params =
        if params.is_empty() { "&self".to_string() } else { format!("&self, {}", params.join(", ")) };
    writeln!(
        out,
        "    pub fn {}({}) -> Result<{}, Error> {{",
        action.name, sig_params, returns
    )
    .unwrap();
    let request_literal = if action.request.is_empty() {
        format!("{} {{}}", action.request_type)
    } else {
        let names: Vec<&str> = action.request.iter().map(|p| p.name.as_str()).collect();
        format!("{} {{ {} }}", action.request_type, names.join(", "))
    };
    let response_binding = if action.response.is_empty() { "_response" } else { "response" };
    writeln!(
        out,
        "        let {}: {} = self.client.call(\"{}\", &{})?;",
        response_binding, action.response_type, action.name, request_literal
    )
    .unwrap();
    match action.response.len() {
        0 => writeln!(out, "        Ok(())").unwrap(),
        1 => writeln!(out, "        Ok(response.res0)").unwrap(),
        _ => {
            let fields: Vec<String> =
                action.response.iter().map(|p| format!("response.{}", p.name)).collect();
            writeln!(out, "        Ok(({}))", fields.join(", ")).unwrap();
        }
    }
    writeln!(out, "    }}").unwrap();
    writeln!(out, "}}").unwrap();
    writeln!(out).unwrap();
}

fn dispatch_impl(out: &mut String, file: &ActionsFile) {
    writeln!(out, "impl Dispatch for HostActions {{").unwrap();
    writeln!(
        out,
        "    fn dispatch(&self, method: &str, params: Value) -> Result<Value, RemoteError> {{"
    )
    .unwrap();
    writeln!(out, "        match method {{").unwrap();
    for action in &file.actions {
        writeln!(out, "            \"{}\" => {{", action.name).unwrap();
        writeln!(
            out,
            "                let args: {} =",
            action.request_type
        )
        .unwrap();
        writeln!(
            out,
            "                    serde_json::from_value(params).map_err(RemoteError::invalid_params)?;"
        )
        .unwrap();
        writeln!(out, "                let reply = self.{}(args)?;", action.name).unwrap();
        writeln!(out, "                serde_json::to_value(reply).map_err(RemoteError::from)")
            .unwrap();
        writeln!(out, "            }}").unwrap();
    }
    writeln!(out, "            _ => Err(RemoteError::method_not_found(method)),").unwrap();
    writeln!(out, "        }}").unwrap();
    writeln!(out, "    }}").unwrap();
    writeln!(out, "}}").unwrap();
}

/// Writes the rendered file as `actions.rs` in `out_dir`, optionally
/// running it through the standard source formatter. A formatter
/// failure is fatal.
pub(crate) fn write_actions(
    out_dir: &Path,
    rendered: &str,
    format_output: bool,
) -> Result<PathBuf, GenError> {
    let path = out_dir.join("actions.rs");
    fs::write(&path, rendered).map_err(|err| GenError::Io(path.clone(), err))?;
    if format_output {
        rustfmt(&path)?;
    }
    Ok(path)
}

fn rustfmt(path: &Path) -> Result<(), GenError> {
    let status = Command::new("rustfmt")
        .arg("--edition")
        .arg("2018")
        .arg(path)
        .status()
        .map_err(|err| GenError::Format(format!("could not run rustfmt: {}", err)))?;
    if !status.success() {
        return Err(GenError::Format(format!("rustfmt exited with status {:?}", status.code())));
    }
    Ok(())
}
