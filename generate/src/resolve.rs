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

//! Resolving parameter and result type expressions, and assigning
//! aliases to the packages they come from.

use std::collections::BTreeMap;

use quote::ToTokens;

use crate::error::{GenError, Policy};
use crate::search::{resolve_prefix, MatchedMethod};

/// The three opt-in bits, as configured on the generator.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct Policies {
    pub structs: bool,
    pub pointers: bool,
    pub slices: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Import {
    pub alias: String,
    pub path: Vec<String>,
}

/// Assigns every referenced package path a unique alias: the package's
/// base name plus a counter owned by this map, so repeated runs emit
/// identical files. The same path always yields the same alias.
#[derive(Debug, Default)]
pub(crate) struct ImportMap {
    by_key: BTreeMap<String, usize>,
    imports: Vec<Import>,
    counter: u32,
}

impl ImportMap {
    pub fn new() -> ImportMap {
        ImportMap::default()
    }

    /// Returns the alias for `path`, allocating one on first use.
    ///
    /// The crate root itself gets no alias; types there are referenced
    /// as `crate::Name` directly.
    pub fn add(&mut self, path: &[String]) -> String {
        if path == ["crate"] {
            return "crate".to_string();
        }
        let key = path.join("::");
        if let Some(&idx) = self.by_key.get(&key) {
            return self.imports[idx].alias.clone();
        }
        let base = sanitize(path.last().map(String::as_str).unwrap_or("pkg"));
        let alias = format!("{}{}", base, self.counter);
        self.counter += 1;
        self.by_key.insert(key, self.imports.len());
        self.imports.push(Import { alias: alias.clone(), path: path.to_vec() });
        alias
    }

    /// The `use` lines for the generated file, in allocation order.
    pub fn render(&self) -> Vec<String> {
        self.imports
            .iter()
            .map(|import| format!("use {} as {};", import.path.join("::"), import.alias))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.imports.is_empty()
    }
}

/// Strips characters that cannot appear in an identifier.
fn sanitize(base: &str) -> String {
    let cleaned: String =
        base.chars().map(|c| if c.is_alphanumeric() || c == '_' { c } else { '_' }).collect();
    if cleaned.chars().next().map_or(true, |c| c.is_numeric()) {
        format!("p{}", cleaned)
    } else {
        cleaned
    }
}

const PRIMITIVES: &[&str] = &[
    "bool", "char", "f32", "f64", "i8", "i16", "i32", "i64", "i128", "isize", "u8", "u16", "u32",
    "u64", "u128", "usize", "String",
];

fn is_primitive(ident: &str) -> bool {
    PRIMITIVES.contains(&ident)
}

fn type_string(ty: &syn::Type) -> String {
    ty.to_token_stream().to_string()
}

pub(crate) struct Resolver {
    pub policies: Policies,
    pub imports: ImportMap,
    /// The scanned crate's own name, with `-` mapped to `_`. A path
    /// written through it resolves like a `crate::` path.
    pub module: String,
}

impl Resolver {
    pub fn new(module: String, policies: Policies) -> Resolver {
        Resolver { policies, imports: ImportMap::new(), module }
    }

    /// Maps a source type expression to the type the generated file
    /// uses for it, enforcing the policy gates and collecting package
    /// aliases along the way.
    pub fn map_type(&mut self, ty: &syn::Type, scope: &MatchedMethod) -> Result<String, GenError> {
        match ty {
            syn::Type::Path(tp) if tp.qself.is_none() => self.map_path_type(ty, tp, scope),
            syn::Type::Reference(_) => Err(GenError::TypeNotSupported {
                ty: type_string(ty),
                policy: Some(Policy::Pointers),
            }),
            syn::Type::Slice(_) | syn::Type::Array(_) => Err(GenError::TypeNotSupported {
                ty: type_string(ty),
                policy: Some(Policy::Slices),
            }),
            other => {
                Err(GenError::TypeNotSupported { ty: type_string(other), policy: None })
            }
        }
    }

    fn map_path_type(
        &mut self,
        whole: &syn::Type,
        tp: &syn::TypePath,
        scope: &MatchedMethod,
    ) -> Result<String, GenError> {
        let segments = &tp.path.segments;
        let last = segments.last().unwrap();

        if segments.len() == 1 {
            let ident = last.ident.to_string();
            match &last.arguments {
                syn::PathArguments::None => {
                    if is_primitive(&ident) {
                        return Ok(ident);
                    }
                    // `use crate::api::Thing;` makes a bare `Thing`
                    // resolvable; otherwise it lives in the method's
                    // own module.
                    if let Some(import) = scope.imports.iter().find(|u| u.name == ident) {
                        if import.path.len() < 2 {
                            return Err(GenError::TypeNotSupported {
                                ty: type_string(whole),
                                policy: None,
                            });
                        }
                        // the binding may be a rename; the path carries
                        // the type's real name
                        let name = import.path.last().unwrap().clone();
                        let pkg = import.path[..import.path.len() - 1].to_vec();
                        let pkg = self.internalize(&pkg);
                        return self.named_type(&pkg, &name, whole);
                    }
                    let mut pkg = vec!["crate".to_string()];
                    pkg.extend(scope.module_path.iter().cloned());
                    self.named_type(&pkg, &ident, whole)
                }
                syn::PathArguments::AngleBracketed(args) => {
                    let inner: Vec<&syn::Type> = args
                        .args
                        .iter()
                        .filter_map(|arg| match arg {
                            syn::GenericArgument::Type(t) => Some(t),
                            _ => None,
                        })
                        .collect();
                    match (ident.as_str(), inner.as_slice()) {
                        ("Box", [elem]) => {
                            if !self.policies.pointers {
                                return Err(GenError::TypeNotSupported {
                                    ty: type_string(whole),
                                    policy: Some(Policy::Pointers),
                                });
                            }
                            Ok(format!("Box<{}>", self.map_type(elem, scope)?))
                        }
                        ("Vec", [elem]) => {
                            if !self.policies.slices {
                                return Err(GenError::TypeNotSupported {
                                    ty: type_string(whole),
                                    policy: Some(Policy::Slices),
                                });
                            }
                            Ok(format!("Vec<{}>", self.map_type(elem, scope)?))
                        }
                        _ => Err(GenError::TypeNotSupported {
                            ty: type_string(whole),
                            policy: None,
                        }),
                    }
                }
                syn::PathArguments::Parenthesized(_) => {
                    Err(GenError::TypeNotSupported { ty: type_string(whole), policy: None })
                }
            }
        } else {
            // a qualified path: everything up to the last segment names
            // the package
            if !last.arguments.is_empty() {
                return Err(GenError::TypeNotSupported { ty: type_string(whole), policy: None });
            }
            let name = last.ident.to_string();
            let prefix: Vec<String> =
                segments.iter().take(segments.len() - 1).map(|s| s.ident.to_string()).collect();
            let pkg = self.resolve_pkg(&prefix, scope);
            self.named_type(&pkg, &name, whole)
        }
    }

    /// A named (non-primitive) type. Gated on `--allow-structs`
    /// regardless of which package declares it.
    fn named_type(
        &mut self,
        pkg: &[String],
        name: &str,
        whole: &syn::Type,
    ) -> Result<String, GenError> {
        if !self.policies.structs {
            return Err(GenError::TypeNotSupported {
                ty: type_string(whole),
                policy: Some(Policy::Structs),
            });
        }
        let alias = self.imports.add(pkg);
        Ok(format!("{}::{}", alias, name))
    }

    fn resolve_pkg(&self, prefix: &[String], scope: &MatchedMethod) -> Vec<String> {
        match prefix.first().map(String::as_str) {
            Some("crate") | Some("self") | Some("super") => {
                resolve_prefix(prefix, &scope.module_path)
            }
            Some(first) => {
                if let Some(import) = scope.imports.iter().find(|u| u.name == first) {
                    let mut path = import.path.clone();
                    path.extend(prefix[1..].iter().cloned());
                    self.internalize(&path)
                } else if first == self.module {
                    // the crate referring to itself by name
                    let mut path = vec!["crate".to_string()];
                    path.extend(prefix[1..].iter().cloned());
                    path
                } else {
                    prefix.to_vec()
                }
            }
            None => prefix.to_vec(),
        }
    }

    /// Rewrites a path that starts with the scanned crate's own name to
    /// a `crate::` path.
    fn internalize(&self, path: &[String]) -> Vec<String> {
        if path.first().map(String::as_str) == Some(self.module.as_str()) {
            let mut out = vec!["crate".to_string()];
            out.extend(path[1..].iter().cloned());
            out
        } else {
            path.to_vec()
        }
    }
}
