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

//! Finding annotated methods in a source tree.
//!
//! A method opts in by carrying the marker comment on its own line in
//! the comment block directly above the `fn`:
//!
//! ```text
//! /// Returns a non-negative pseudo-random number in `[0, n)`.
//! //plugbus:generate
//! pub fn get_random_int(&mut self, n: i64) -> Result<i64, ApiError> {
//! ```
//!
//! Line comments are not part of the AST, so the marker lines are read
//! off the raw source and matched against item spans.

use std::fs;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::error::GenError;

/// The annotation marker, on a line of its own.
pub const MARKER: &str = "//plugbus:generate";

/// One `use` binding visible in a file: the name it binds, and the
/// absolute path it refers to (`crate`-rooted for internal paths).
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct UseImport {
    pub name: String,
    pub path: Vec<String>,
}

/// An annotated method, as found in the source.
#[derive(Debug, Clone)]
pub(crate) struct MatchedMethod {
    pub file: PathBuf,
    /// The declaring module's path within the crate, e.g. `["api"]`.
    pub module_path: Vec<String>,
    /// The receiver type name, e.g. `App`.
    pub receiver: String,
    /// Whether the method takes `&mut self`.
    pub receiver_mut: bool,
    pub name: String,
    /// Doc-comment lines, verbatim (without the `///`).
    pub doc: Vec<String>,
    /// `(name, type)` per parameter, in order.
    pub params: Vec<(String, syn::Type)>,
    /// The Ok side of the return type, decomposed: empty for `()`, the
    /// elements for a tuple, one entry otherwise.
    pub ok_types: Vec<syn::Type>,
    /// The file's `use` bindings, for resolving type paths.
    pub imports: Vec<UseImport>,
}

/// Walks the source tree and collects every annotated method, in
/// deterministic (path, source) order.
pub(crate) fn search(src_root: &Path) -> Result<Vec<MatchedMethod>, GenError> {
    let mut found = Vec::new();
    for entry in WalkDir::new(src_root).sort_by_file_name() {
        let entry = entry.map_err(|err| {
            let path = err.path().map(Path::to_owned).unwrap_or_else(|| src_root.to_owned());
            GenError::Io(path, err.into())
        })?;
        if entry.file_type().is_file()
            && entry.path().extension().map_or(false, |ext| ext == "rs")
        {
            scan_file(src_root, entry.path(), &mut found)?;
        }
    }
    Ok(found)
}

fn scan_file(src_root: &Path, path: &Path, out: &mut Vec<MatchedMethod>) -> Result<(), GenError> {
    let text = fs::read_to_string(path).map_err(|err| GenError::Io(path.to_owned(), err))?;
    if !text.contains(MARKER) {
        return Ok(());
    }
    let lines: Vec<&str> = text.lines().collect();
    let markers: Vec<usize> = lines
        .iter()
        .enumerate()
        .filter(|(_, line)| line.trim() == MARKER)
        .map(|(i, _)| i + 1)
        .collect();

    let file = syn::parse_file(&text).map_err(|err| GenError::Parse(path.to_owned(), err))?;
    let module_path = module_path_for(src_root, path);
    let imports = collect_uses(&file.items, &module_path);

    let mut ctx = FileCtx { path, lines: &lines, markers: &markers, imports: &imports };
    walk_items(&file.items, &module_path, &mut ctx, out)
}

struct FileCtx<'a> {
    path: &'a Path,
    lines: &'a [&'a str],
    markers: &'a [usize],
    imports: &'a [UseImport],
}

fn walk_items(
    items: &[syn::Item],
    module_path: &[String],
    ctx: &mut FileCtx,
    out: &mut Vec<MatchedMethod>,
) -> Result<(), GenError> {
    for item in items {
        match item {
            syn::Item::Impl(imp) if imp.trait_.is_none() => {
                for impl_item in &imp.items {
                    if let syn::ImplItem::Fn(method) = impl_item {
                        if !has_marker(&method.sig, ctx) {
                            continue;
                        }
                        let matched =
                            match_method(&imp.self_ty, method, module_path, ctx)?;
                        out.push(matched);
                    }
                }
            }
            syn::Item::Fn(func) => {
                if has_marker(&func.sig, ctx) {
                    // only methods carry a receiver to dispatch on
                    debug!(
                        "skipping annotated free function '{}' in {:?}",
                        func.sig.ident, ctx.path
                    );
                }
            }
            syn::Item::Mod(module) => {
                if let Some((_, items)) = &module.content {
                    let mut nested = module_path.to_vec();
                    nested.push(module.ident.to_string());
                    walk_items(items, &nested, ctx, out)?;
                }
            }
            _ => (),
        }
    }
    Ok(())
}

/// True when a marker line sits in the contiguous comment/attribute
/// block directly above the method's `fn` keyword.
fn has_marker(sig: &syn::Signature, ctx: &FileCtx) -> bool {
    let fn_line = sig.fn_token.span.start().line;
    ctx.markers.iter().any(|&marker| {
        marker < fn_line
            && ((marker + 1)..fn_line).all(|n| {
                let trimmed = ctx.lines[n - 1].trim_start();
                trimmed.starts_with("//") || trimmed.starts_with('#')
            })
    })
}

fn match_method(
    self_ty: &syn::Type,
    method: &syn::ImplItemFn,
    module_path: &[String],
    ctx: &FileCtx,
) -> Result<MatchedMethod, GenError> {
    let name = method.sig.ident.to_string();

    let receiver = match receiver_name(self_ty) {
        Some(receiver) => receiver,
        None => return Err(GenError::UnsupportedReceiver { method: name }),
    };

    let receiver_mut = match method.sig.receiver() {
        Some(recv) if recv.reference.is_some() && recv.colon_token.is_none() => {
            recv.mutability.is_some()
        }
        _ => return Err(GenError::UnsupportedReceiver { method: name }),
    };

    let mut params = Vec::new();
    for input in &method.sig.inputs {
        if let syn::FnArg::Typed(pt) = input {
            match &*pt.pat {
                syn::Pat::Ident(pat) => params.push((pat.ident.to_string(), (*pt.ty).clone())),
                _ => return Err(GenError::UnnamedParam { method: name.clone() }),
            }
        }
    }

    let ok_types = match &method.sig.output {
        syn::ReturnType::Type(_, ty) => match result_ok_types(ty) {
            Some(types) => types,
            None => return Err(GenError::NotResult { method: name }),
        },
        syn::ReturnType::Default => return Err(GenError::NotResult { method: name }),
    };

    Ok(MatchedMethod {
        file: ctx.path.to_owned(),
        module_path: module_path.to_vec(),
        receiver,
        receiver_mut,
        name,
        doc: doc_lines(&method.attrs),
        params,
        ok_types,
        imports: ctx.imports.to_vec(),
    })
}

/// The plain type name an inherent impl is for, or `None` for shapes we
/// cannot dispatch on (generics, references, trait objects, …).
fn receiver_name(self_ty: &syn::Type) -> Option<String> {
    if let syn::Type::Path(tp) = self_ty {
        if tp.qself.is_none() && tp.path.segments.len() == 1 {
            let seg = &tp.path.segments[0];
            if seg.arguments.is_empty() {
                return Some(seg.ident.to_string());
            }
        }
    }
    None
}

/// Decomposes `Result<T, E>` into the value types the response carries:
/// none for `Result<(), E>`, the elements for `Result<(A, B), E>`, and a
/// single entry otherwise. `None` means the type is not a `Result` at
/// all, which fails generation.
fn result_ok_types(ty: &syn::Type) -> Option<Vec<syn::Type>> {
    if let syn::Type::Path(tp) = ty {
        let seg = tp.path.segments.last()?;
        if seg.ident != "Result" {
            return None;
        }
        if let syn::PathArguments::AngleBracketed(args) = &seg.arguments {
            let ok = args.args.iter().find_map(|arg| match arg {
                syn::GenericArgument::Type(t) => Some(t),
                _ => None,
            })?;
            return Some(match ok {
                syn::Type::Tuple(tuple) => tuple.elems.iter().cloned().collect(),
                other => vec![other.clone()],
            });
        }
    }
    None
}

/// The `///` lines above the method, verbatim. Plain comments (the
/// marker among them) and non-doc attributes never reach the output.
fn doc_lines(attrs: &[syn::Attribute]) -> Vec<String> {
    let mut doc = Vec::new();
    for attr in attrs {
        if !attr.path().is_ident("doc") {
            continue;
        }
        if let syn::Meta::NameValue(nv) = &attr.meta {
            if let syn::Expr::Lit(lit) = &nv.value {
                if let syn::Lit::Str(s) = &lit.lit {
                    doc.push(s.value());
                }
            }
        }
    }
    doc
}

/// The module path a file's items live in: `["api"]` for both
/// `src/api.rs` and `src/api/mod.rs`, empty for `src/lib.rs`.
pub(crate) fn module_path_for(src_root: &Path, file: &Path) -> Vec<String> {
    let rel = file.strip_prefix(src_root).unwrap_or(file);
    let mut segments: Vec<String> = rel
        .with_extension("")
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    if let Some(last) = segments.last() {
        if last == "lib" || last == "main" || last == "mod" {
            segments.pop();
        }
    }
    segments
}

fn collect_uses(items: &[syn::Item], module_path: &[String]) -> Vec<UseImport> {
    let mut uses = Vec::new();
    for item in items {
        if let syn::Item::Use(u) = item {
            let mut prefix = Vec::new();
            flatten_use_tree(&u.tree, &mut prefix, module_path, &mut uses);
        }
    }
    uses
}

fn flatten_use_tree(
    tree: &syn::UseTree,
    prefix: &mut Vec<String>,
    module_path: &[String],
    out: &mut Vec<UseImport>,
) {
    match tree {
        syn::UseTree::Path(p) => {
            prefix.push(p.ident.to_string());
            flatten_use_tree(&p.tree, prefix, module_path, out);
            prefix.pop();
        }
        syn::UseTree::Name(n) => {
            let name = n.ident.to_string();
            if name == "self" {
                // `use crate::api::{self, …}` binds the module itself
                if let Some(module) = prefix.last().cloned() {
                    let path = resolve_prefix(prefix, module_path);
                    out.push(UseImport { name: module, path });
                }
            } else {
                let mut path = resolve_prefix(prefix, module_path);
                path.push(name.clone());
                out.push(UseImport { name, path });
            }
        }
        syn::UseTree::Rename(r) => {
            let mut path = resolve_prefix(prefix, module_path);
            path.push(r.ident.to_string());
            out.push(UseImport { name: r.rename.to_string(), path });
        }
        syn::UseTree::Group(g) => {
            for item in &g.items {
                flatten_use_tree(item, prefix, module_path, out);
            }
        }
        syn::UseTree::Glob(_) => {
            debug!("glob import under {:?} cannot be resolved; names it brings in are treated as local", prefix);
        }
    }
}

/// Normalizes a use-path prefix to an absolute path: `crate`-rooted for
/// internal paths, as written for external crates.
pub(crate) fn resolve_prefix(prefix: &[String], module_path: &[String]) -> Vec<String> {
    match prefix.first().map(String::as_str) {
        Some("crate") => prefix.to_vec(),
        Some("self") => {
            let mut path = vec!["crate".to_string()];
            path.extend(module_path.iter().cloned());
            path.extend(prefix[1..].iter().cloned());
            path
        }
        Some("super") => {
            let mut base = module_path.to_vec();
            let mut rest = 0;
            while prefix.get(rest).map(String::as_str) == Some("super") {
                base.pop();
                rest += 1;
            }
            let mut path = vec!["crate".to_string()];
            path.extend(base);
            path.extend(prefix[rest..].iter().cloned());
            path
        }
        _ => prefix.to_vec(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_and_walk(src: &str) -> Vec<MatchedMethod> {
        let lines: Vec<&str> = src.lines().collect();
        let markers: Vec<usize> = lines
            .iter()
            .enumerate()
            .filter(|(_, line)| line.trim() == MARKER)
            .map(|(i, _)| i + 1)
            .collect();
        let file = syn::parse_file(src).unwrap();
        let module_path = vec!["api".to_string()];
        let imports = collect_uses(&file.items, &module_path);
        let mut ctx = FileCtx {
            path: Path::new("src/api.rs"),
            lines: &lines,
            markers: &markers,
            imports: &imports,
        };
        let mut out = Vec::new();
        walk_items(&file.items, &module_path, &mut ctx, &mut out).unwrap();
        out
    }

    #[test]
    fn finds_marked_method() {
        let found = parse_and_walk(
            r#"
pub struct App;

impl App {
    /// Rolls a die.
    //plugbus:generate
    pub fn roll(&mut self, n: i64) -> Result<i64, String> {
        Ok(n)
    }

    pub fn unmarked(&self) -> Result<(), String> {
        Ok(())
    }
}
"#,
        );
        assert_eq!(found.len(), 1);
        let m = &found[0];
        assert_eq!(m.name, "roll");
        assert_eq!(m.receiver, "App");
        assert!(m.receiver_mut);
        assert_eq!(m.doc, vec![" Rolls a die."]);
        assert_eq!(m.params.len(), 1);
        assert_eq!(m.params[0].0, "n");
        assert_eq!(m.ok_types.len(), 1);
    }

    #[test]
    fn marker_above_docs_also_counts() {
        let found = parse_and_walk(
            r#"
pub struct App;

impl App {
    //plugbus:generate
    /// Documented after the marker.
    pub fn roll(&self) -> Result<(), String> {
        Ok(())
    }
}
"#,
        );
        assert_eq!(found.len(), 1);
        assert!(!found[0].receiver_mut);
        assert!(found[0].ok_types.is_empty());
    }

    #[test]
    fn marker_does_not_leak_past_code() {
        let found = parse_and_walk(
            r#"
pub struct App;

//plugbus:generate
pub struct Decoy;

impl App {
    pub fn roll(&self) -> Result<(), String> {
        Ok(())
    }
}
"#,
        );
        assert!(found.is_empty());
    }

    #[test]
    fn free_functions_are_skipped() {
        let found = parse_and_walk(
            r#"
//plugbus:generate
pub fn not_a_method() -> Result<(), String> {
    Ok(())
}
"#,
        );
        assert!(found.is_empty());
    }

    #[test]
    fn non_result_return_fails() {
        let src = r#"
pub struct App;

impl App {
    //plugbus:generate
    pub fn roll(&self) -> i64 {
        4
    }
}
"#;
        let lines: Vec<&str> = src.lines().collect();
        let markers: Vec<usize> = lines
            .iter()
            .enumerate()
            .filter(|(_, line)| line.trim() == MARKER)
            .map(|(i, _)| i + 1)
            .collect();
        let file = syn::parse_file(src).unwrap();
        let imports = Vec::new();
        let mut ctx =
            FileCtx { path: Path::new("src/api.rs"), lines: &lines, markers: &markers, imports: &imports };
        let mut out = Vec::new();
        let err = walk_items(&file.items, &[], &mut ctx, &mut out).unwrap_err();
        match err {
            GenError::NotResult { ref method } => assert_eq!(method, "roll"),
            other => panic!("{}", other),
        }
    }

    #[test]
    fn tuple_and_unit_results() {
        let found = parse_and_walk(
            r#"
pub struct App;

impl App {
    //plugbus:generate
    pub fn pair(&self) -> Result<(i64, String), String> {
        Ok((1, "x".to_string()))
    }
}
"#,
        );
        assert_eq!(found[0].ok_types.len(), 2);
    }

    #[test]
    fn module_paths() {
        let root = Path::new("/p/src");
        assert_eq!(module_path_for(root, Path::new("/p/src/api.rs")), vec!["api"]);
        assert_eq!(module_path_for(root, Path::new("/p/src/api/mod.rs")), vec!["api"]);
        assert_eq!(
            module_path_for(root, Path::new("/p/src/api/a_package.rs")),
            vec!["api", "a_package"]
        );
        assert!(module_path_for(root, Path::new("/p/src/lib.rs")).is_empty());
    }

    #[test]
    fn use_resolution() {
        let src = r#"
use crate::api::a_package;
use crate::api::{self, AStruct as Renamed};
use serde_json::Value;
use super::util;
"#;
        let file = syn::parse_file(src).unwrap();
        let module_path = vec!["api".to_string(), "inner".to_string()];
        let uses = collect_uses(&file.items, &module_path);
        let find = |name: &str| uses.iter().find(|u| u.name == name).unwrap().path.join("::");
        assert_eq!(find("a_package"), "crate::api::a_package");
        assert_eq!(find("api"), "crate::api");
        assert_eq!(find("Renamed"), "crate::api::AStruct");
        assert_eq!(find("Value"), "serde_json::Value");
        assert_eq!(find("util"), "crate::api::util");
    }
}
