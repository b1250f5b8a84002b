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

//! The shape of the generated file, after resolution and before
//! rendering.

/// One field of a request or response value type. The field name is the
/// source name (parameter name, or `res{i}` for results), which is also
/// the JSON key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Param {
    pub name: String,
    pub ty: String,
}

/// A field on the host dispatch struct pointing at one receiver value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Reference {
    /// e.g. `api0_app_ref`
    pub name: String,
    /// e.g. `api0::App`
    pub ty: String,
}

/// One annotated method, fully resolved.
#[derive(Debug, Clone)]
pub(crate) struct Action {
    /// The method name as it appears on the wire (under `Host.`).
    pub name: String,
    pub request_type: String,
    pub response_type: String,
    /// Doc lines, without the leading `///`.
    pub doc: Vec<String>,
    /// The dispatch-struct field holding this action's receiver.
    pub ref_name: String,
    /// Whether the receiver method needs `&mut` access.
    pub receiver_mut: bool,
    pub request: Vec<Param>,
    pub response: Vec<Param>,
}

/// Everything the emitter needs.
#[derive(Debug, Clone)]
pub(crate) struct ActionsFile {
    /// The module name the host is expected to mount the file as.
    pub package: String,
    /// Where the file lands, relative to the project root; used in the
    /// mount hint.
    pub out_rel: String,
    /// Rendered `use … as aliasN;` lines, in alias order.
    pub imports: Vec<String>,
    pub references: Vec<Reference>,
    pub actions: Vec<Action>,
}

/// `get_random_int` becomes `GetRandomInt`.
pub(crate) fn pascal_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut upper_next = true;
    for c in s.chars() {
        if c == '_' {
            upper_next = true;
        } else if upper_next {
            out.extend(c.to_uppercase());
            upper_next = false;
        } else {
            out.push(c);
        }
    }
    out
}

/// `App` becomes `app`, `MyApp` becomes `my_app`.
pub(crate) fn snake_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for (i, c) in s.chars().enumerate() {
        if c.is_uppercase() {
            if i > 0 {
                out.push('_');
            }
            out.extend(c.to_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}
