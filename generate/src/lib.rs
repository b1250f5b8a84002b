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

//! Generates the action surface of a plugbus host.
//!
//! The generator walks a host project's `src/` tree for methods
//! annotated with `//plugbus:generate`, and emits one file holding the
//! matching request/response value types, the host dispatch struct, and
//! the plugin-side call shims. Hosts check the file in and mount it as
//! a module; plugins link against the same file through the host crate.

#[macro_use]
extern crate log;
extern crate proc_macro2;
extern crate quote;
extern crate syn;
extern crate toml;
extern crate walkdir;

mod emit;
mod error;
mod model;
mod resolve;
mod search;

pub use crate::error::{GenError, Policy};
pub use crate::search::MARKER;

use std::fs;
use std::path::{Path, PathBuf};

use crate::model::{Action, ActionsFile, Param, Reference};
use crate::model::{pascal_case, snake_case};
use crate::resolve::{Policies, Resolver};
use crate::search::MatchedMethod;

/// Configuration and entry point for one generation run.
pub struct Generator {
    /// The root of the host project to scan (the directory holding its
    /// `Cargo.toml` and `src/`).
    pub project_root: PathBuf,
    /// The output folder, relative to the project root unless absolute.
    pub out: PathBuf,
    /// Overrides the module path (the crate name used to resolve the
    /// project's own paths). Auto-detected from `Cargo.toml` if absent.
    pub module: Option<String>,
    /// The name the generated module should be mounted as. Defaults to
    /// the base name of the output folder.
    pub package: Option<String>,
    pub allow_structs: bool,
    pub allow_pointers: bool,
    pub allow_slices: bool,
    /// Pass the emitted file through `rustfmt`. On by default; tests
    /// turn it off to stay hermetic.
    pub format_output: bool,
}

impl Generator {
    pub fn new<P: Into<PathBuf>>(project_root: P) -> Generator {
        Generator {
            project_root: project_root.into(),
            out: PathBuf::from("actions"),
            module: None,
            package: None,
            allow_structs: false,
            allow_pointers: false,
            allow_slices: false,
            format_output: true,
        }
    }

    /// Runs the whole pipeline: clean the destination, search for
    /// annotated methods, resolve their types, write `actions.rs`.
    /// Returns the path of the emitted file.
    pub fn run(&self) -> Result<PathBuf, GenError> {
        let module = match &self.module {
            Some(module) => module.clone(),
            None => detect_module(&self.project_root)?,
        };
        let package = match &self.package {
            Some(package) => package.clone(),
            None => self
                .out
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_else(|| "actions".to_string()),
        };
        let out_dir = if self.out.is_absolute() {
            self.out.clone()
        } else {
            self.project_root.join(&self.out)
        };

        info!("cleaning target directory {:?}", out_dir);
        clean_destination(&out_dir)?;

        info!("searching for '{}' annotations", MARKER);
        let found = search::search(&self.project_root.join("src"))?;
        debug!("found {} annotated method(s)", found.len());

        let policies = Policies {
            structs: self.allow_structs,
            pointers: self.allow_pointers,
            slices: self.allow_slices,
        };
        let file = build(&found, &module, &package, &self.out.to_string_lossy(), policies)?;

        info!("writing {:?}", out_dir.join("actions.rs"));
        emit::write_actions(&out_dir, &emit::render(&file), self.format_output)
    }
}

/// Reads the crate name from the project's `Cargo.toml`, mapped to its
/// in-source spelling (`-` becomes `_`).
fn detect_module(project_root: &Path) -> Result<String, GenError> {
    let manifest = project_root.join("Cargo.toml");
    let text =
        fs::read_to_string(&manifest).map_err(|err| GenError::Io(manifest.clone(), err))?;
    let value = text
        .parse::<toml::Value>()
        .map_err(|err| GenError::Manifest(manifest.clone(), err.to_string()))?;
    value
        .as_table()
        .and_then(|table| table.get("package"))
        .and_then(|package| package.as_table())
        .and_then(|package| package.get("name"))
        .and_then(|name| name.as_str())
        .map(|name| name.replace('-', "_"))
        .ok_or_else(|| GenError::Manifest(manifest, "no [package].name".to_string()))
}

/// Removes the whole destination folder (if it exists) and re-creates a
/// new empty one.
fn clean_destination(out_dir: &Path) -> Result<(), GenError> {
    if out_dir.exists() {
        fs::remove_dir_all(out_dir).map_err(|err| GenError::Io(out_dir.to_owned(), err))?;
    }
    fs::create_dir_all(out_dir).map_err(|err| GenError::Io(out_dir.to_owned(), err))
}

/// Resolves the found methods into the renderable file shape.
fn build(
    found: &[MatchedMethod],
    module: &str,
    package: &str,
    out_rel: &str,
    policies: Policies,
) -> Result<ActionsFile, GenError> {
    let mut resolver = Resolver::new(module.to_string(), policies);
    let mut references: Vec<Reference> = Vec::new();
    let mut actions = Vec::new();

    for method in found {
        // the receiver's package is referenced unconditionally; the
        // policy gates only cover parameter and result types
        let mut pkg = vec!["crate".to_string()];
        pkg.extend(method.module_path.iter().cloned());
        let alias = resolver.imports.add(&pkg);
        let ref_name = if alias == "crate" {
            format!("{}_ref", snake_case(&method.receiver))
        } else {
            format!("{}_{}_ref", alias, snake_case(&method.receiver))
        };
        let ref_ty = format!("{}::{}", alias, method.receiver);
        if !references.iter().any(|reference| reference.name == ref_name) {
            references.push(Reference { name: ref_name.clone(), ty: ref_ty });
        }

        let mut request = Vec::new();
        for (name, ty) in &method.params {
            request.push(Param { name: name.clone(), ty: resolver.map_type(ty, method)? });
        }
        let mut response = Vec::new();
        for (i, ty) in method.ok_types.iter().enumerate() {
            response
                .push(Param { name: format!("res{}", i), ty: resolver.map_type(ty, method)? });
        }

        actions.push(Action {
            name: method.name.clone(),
            request_type: format!("{}Request", pascal_case(&method.name)),
            response_type: format!("{}Response", pascal_case(&method.name)),
            doc: method.doc.clone(),
            ref_name,
            receiver_mut: method.receiver_mut,
            request,
            response,
        });
    }

    Ok(ActionsFile {
        package: package.to_string(),
        out_rel: out_rel.to_string(),
        imports: resolver.imports.render(),
        references,
        actions,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempdir::TempDir;

    fn fixture_project(api_src: &str) -> TempDir {
        let dir = TempDir::new("plugbus-generate").unwrap();
        fs::create_dir_all(dir.path().join("src")).unwrap();
        let mut manifest = fs::File::create(dir.path().join("Cargo.toml")).unwrap();
        writeln!(manifest, "[package]\nname = \"sample-host\"\nversion = \"0.1.0\"").unwrap();
        fs::write(dir.path().join("src/lib.rs"), "pub mod api;\n").unwrap();
        fs::write(dir.path().join("src/api.rs"), api_src).unwrap();
        dir
    }

    const BASIC_API: &str = r#"
pub struct App;

impl App {
    /// Returns a non-negative pseudo-random number in `[0, n)`.
    //plugbus:generate
    pub fn get_random_int(&mut self, n: i64) -> Result<i64, String> {
        Ok(n - 1)
    }
}
"#;

    fn run_generator(dir: &TempDir, configure: impl FnOnce(&mut Generator)) -> Result<String, GenError> {
        let mut generator = Generator::new(dir.path());
        generator.format_output = false;
        configure(&mut generator);
        let path = generator.run()?;
        Ok(fs::read_to_string(path).unwrap())
    }

    #[test]
    fn generates_schema_and_shims() {
        let dir = fixture_project(BASIC_API);
        let out = run_generator(&dir, |_| ()).unwrap();

        // value types, with the source names as JSON keys
        assert!(out.contains("pub struct GetRandomIntRequest {\n    pub n: i64,\n}"), "{}", out);
        assert!(out.contains("pub struct GetRandomIntResponse {\n    pub res0: i64,\n}"), "{}", out);
        // host shim forwards the decoded arg positionally
        assert!(out.contains("target.get_random_int(args.n)"), "{}", out);
        assert!(out.contains("pub api0_app_ref: Arc<Mutex<api0::App>>"), "{}", out);
        // client shim calls the transport with the bare method name
        assert!(out.contains("pub fn get_random_int(&self, n: i64) -> Result<i64, Error>"), "{}", out);
        assert!(out.contains("self.client.call(\"get_random_int\", &GetRandomIntRequest { n })"), "{}", out);
        // the dispatch table decodes into the concrete type
        assert!(out.contains("\"get_random_int\" => {"), "{}", out);
        // docs are carried over, the marker is not
        assert_eq!(out.matches("/// Returns a non-negative pseudo-random number").count(), 2);
        assert!(!out.contains(MARKER), "{}", out);
        // imports resolve through the alias
        assert!(out.contains("use crate::api as api0;"), "{}", out);
    }

    #[test]
    fn generation_is_deterministic() {
        let dir = fixture_project(BASIC_API);
        let first = run_generator(&dir, |_| ()).unwrap();
        let second = run_generator(&dir, |_| ()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn clean_removes_stale_output() {
        let dir = fixture_project(BASIC_API);
        let out_dir = dir.path().join("actions");
        fs::create_dir_all(&out_dir).unwrap();
        fs::write(out_dir.join("stale.rs"), "// stale\n").unwrap();
        run_generator(&dir, |_| ()).unwrap();
        assert!(!out_dir.join("stale.rs").exists());
        assert!(out_dir.join("actions.rs").exists());
    }

    #[test]
    fn policy_bits_gate_generation() {
        let struct_api = r#"
pub struct Payload;

pub struct App;

impl App {
    //plugbus:generate
    pub fn send(&self, payload: Payload) -> Result<(), String> {
        let _ = payload;
        Ok(())
    }
}
"#;
        let dir = fixture_project(struct_api);
        match run_generator(&dir, |_| ()) {
            Err(GenError::TypeNotSupported { policy: Some(Policy::Structs), .. }) => (),
            other => panic!("{:?}", other.err().map(|e| e.to_string())),
        }
        let out = run_generator(&dir, |g| g.allow_structs = true).unwrap();
        assert!(out.contains("payload: api0::Payload"), "{}", out);

        let pointer_api = r#"
pub struct App;

impl App {
    //plugbus:generate
    pub fn boxed(&self, val: Box<i64>) -> Result<Box<i64>, String> {
        Ok(val)
    }
}
"#;
        let dir = fixture_project(pointer_api);
        match run_generator(&dir, |_| ()) {
            Err(GenError::TypeNotSupported { policy: Some(Policy::Pointers), .. }) => (),
            other => panic!("{:?}", other.err().map(|e| e.to_string())),
        }
        assert!(run_generator(&dir, |g| g.allow_pointers = true).is_ok());

        let slice_api = r#"
pub struct App;

impl App {
    //plugbus:generate
    pub fn sum(&self, values: Vec<i64>) -> Result<i64, String> {
        Ok(values.iter().sum())
    }
}
"#;
        let dir = fixture_project(slice_api);
        match run_generator(&dir, |_| ()) {
            Err(GenError::TypeNotSupported { policy: Some(Policy::Slices), .. }) => (),
            other => panic!("{:?}", other.err().map(|e| e.to_string())),
        }
        assert!(run_generator(&dir, |g| g.allow_slices = true).is_ok());
    }

    #[test]
    fn multiple_results_and_empty_requests() {
        let api = r#"
pub struct App;

impl App {
    //plugbus:generate
    pub fn stats(&self) -> Result<(i64, String), String> {
        Ok((0, "ok".to_string()))
    }
}
"#;
        let dir = fixture_project(api);
        let out = run_generator(&dir, |_| ()).unwrap();
        assert!(out.contains("pub res0: i64"), "{}", out);
        assert!(out.contains("pub res1: String"), "{}", out);
        assert!(out.contains("pub fn stats(&self) -> Result<(i64, String), Error>"), "{}", out);
        assert!(out.contains("Ok((response.res0, response.res1))"), "{}", out);
        assert!(out.contains("pub struct StatsRequest {}"), "{}", out);
    }

    #[test]
    fn module_autodetection_and_override() {
        let api = r#"
use sample_host::api::Payload as Remote;

pub struct App;

impl App {
    //plugbus:generate
    pub fn send(&self, payload: Remote) -> Result<(), String> {
        let _ = payload;
        Ok(())
    }
}
"#;
        // "sample-host" in Cargo.toml resolves sample_host:: to crate::
        let dir = fixture_project(api);
        let out = run_generator(&dir, |g| g.allow_structs = true).unwrap();
        assert!(out.contains("use crate::api as api0;"), "{}", out);
        assert!(out.contains("api0::Payload"), "{}", out);

        // with an overridden module path the name is no longer the
        // project's own, so the path stays external
        let out = run_generator(&dir, |g| {
            g.allow_structs = true;
            g.module = Some("other_module".to_string());
        })
        .unwrap();
        assert!(out.contains("use sample_host::api as api0;"), "{}", out);
    }
}
