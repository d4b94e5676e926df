//! Lexical call-site extraction.
//!
//! No parsing happens here: a call is an identifier directly followed by `(`,
//! either bare (`helper(`) or after a member dot (`self.helper(`). Names on
//! the denylist (keywords, logging and collection built-ins) are dropped.

use crate::model::FileId;
use crate::workspace::scan::language_for_path;
use regex::Regex;
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// One lexical call match. `offset` is the byte offset of the name in the
/// scanned text.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CallCandidate {
    pub name: String,
    pub offset: usize,
}

pub trait CallExtractor: Send + Sync {
    /// Call candidates of `text`, ordered by offset.
    fn extract(&self, text: &str) -> Vec<CallCandidate>;
}

const COMMON_DENYLIST: &[&str] = &[
    "if", "for", "while", "switch", "catch", "return", "function", "typeof", "instanceof",
    "new", "delete", "await", "yield", "super", "this", "sizeof", "elif", "with", "match",
    "fn", "loop", "lambda", "assert", "and", "or", "not", "in", "is", "log", "info", "warn",
    "error", "debug", "trace", "print", "println", "printf", "push", "pop", "shift",
    "unshift", "map", "filter", "reduce", "forEach", "some", "every", "join", "split",
    "slice", "splice", "concat", "includes", "indexOf", "keys", "values", "entries",
    "toString", "length",
];

const RUST_DENYLIST: &[&str] = &[
    "unwrap", "expect", "clone", "into", "iter", "collect", "to_string", "to_owned",
    "as_str", "as_ref", "Some", "Ok", "Err", "Box", "Vec", "format", "vec", "len",
    "is_empty", "unwrap_or", "unwrap_or_default", "unwrap_or_else", "map_err",
];

const PYTHON_DENYLIST: &[&str] = &[
    "len", "range", "str", "int", "float", "list", "dict", "set", "tuple", "isinstance",
    "hasattr", "getattr", "setattr", "type", "enumerate", "zip", "sorted", "append",
    "extend", "format", "items", "def", "class",
];

const JAVASCRIPT_DENYLIST: &[&str] = &[
    "console", "require", "parseInt", "parseFloat", "setTimeout", "setInterval",
    "clearTimeout", "clearInterval", "stringify", "parse", "then", "resolve", "reject",
    "Promise", "String", "Number", "Boolean", "Array", "Object", "find", "findIndex",
    "has", "get", "set", "add",
];

const GO_DENYLIST: &[&str] = &[
    "make", "append", "len", "cap", "panic", "recover", "Println", "Printf", "Sprintf",
    "Errorf", "func",
];

const CSHARP_DENYLIST: &[&str] = &[
    "WriteLine", "ToString", "nameof", "Equals", "GetType", "GetHashCode", "using", "lock",
    "foreach", "Add",
];

const LUA_DENYLIST: &[&str] = &[
    "pairs", "ipairs", "require", "tostring", "tonumber", "type", "pcall", "setmetatable",
    "getmetatable", "select",
];

fn builtin_language_denylists() -> HashMap<String, Vec<&'static str>> {
    let mut lists = HashMap::new();
    lists.insert("rust".to_string(), RUST_DENYLIST.to_vec());
    lists.insert("python".to_string(), PYTHON_DENYLIST.to_vec());
    lists.insert("javascript".to_string(), JAVASCRIPT_DENYLIST.to_vec());
    lists.insert("typescript".to_string(), JAVASCRIPT_DENYLIST.to_vec());
    lists.insert("tsx".to_string(), JAVASCRIPT_DENYLIST.to_vec());
    lists.insert("go".to_string(), GO_DENYLIST.to_vec());
    lists.insert("csharp".to_string(), CSHARP_DENYLIST.to_vec());
    lists.insert("lua".to_string(), LUA_DENYLIST.to_vec());
    lists
}

/// Denylist overrides read from the config file. A present `common` list
/// replaces the built-in one; each `languages` entry replaces that language's list.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct DenylistConfig {
    pub common: Option<Vec<String>>,
    pub languages: HashMap<String, Vec<String>>,
}

/// Names never treated as calls.
#[derive(Debug, Clone)]
pub struct Denylist {
    common: HashSet<String>,
    languages: HashMap<String, HashSet<String>>,
}

impl Default for Denylist {
    fn default() -> Self {
        Self {
            common: COMMON_DENYLIST.iter().map(|s| s.to_string()).collect(),
            languages: builtin_language_denylists()
                .into_iter()
                .map(|(lang, names)| (lang, names.iter().map(|s| s.to_string()).collect()))
                .collect(),
        }
    }
}

impl Denylist {
    pub fn with_overrides(mut self, overrides: &DenylistConfig) -> Self {
        if let Some(common) = overrides.common.as_ref() {
            self.common = common.iter().cloned().collect();
        }
        for (lang, names) in &overrides.languages {
            self.languages
                .insert(lang.to_ascii_lowercase(), names.iter().cloned().collect());
        }
        self
    }

    /// Merged set for one language; `None` yields only the common names.
    pub fn names_for(&self, language: Option<&str>) -> HashSet<String> {
        let mut names = self.common.clone();
        if let Some(extra) = language.and_then(|lang| self.languages.get(lang)) {
            names.extend(extra.iter().cloned());
        }
        names
    }

    pub fn languages(&self) -> impl Iterator<Item = &str> {
        self.languages.keys().map(String::as_str)
    }
}

/// Regex-based [`CallExtractor`].
pub struct LexicalExtractor {
    bare_call: Regex,
    member_call: Regex,
    denylist: HashSet<String>,
}

impl LexicalExtractor {
    pub fn new(denylist: HashSet<String>) -> Self {
        Self {
            bare_call: Regex::new(r"[A-Za-z_$][A-Za-z0-9_$]*\(").expect("static regex"),
            member_call: Regex::new(r"\.([A-Za-z_$][A-Za-z0-9_$]*)\(").expect("static regex"),
            denylist,
        }
    }

    fn keep(&self, name: &str) -> bool {
        name.len() >= 2
            && !name.starts_with(|ch: char| ch.is_ascii_digit())
            && !self.denylist.contains(name)
    }
}

fn is_ident_char(ch: char) -> bool {
    ch == '_' || ch == '$' || ch.is_alphanumeric()
}

impl CallExtractor for LexicalExtractor {
    fn extract(&self, text: &str) -> Vec<CallCandidate> {
        let mut out = Vec::new();
        for found in self.bare_call.find_iter(text) {
            let start = found.start();
            let preceding = text[..start].chars().next_back();
            if matches!(preceding, Some(ch) if ch == '.' || is_ident_char(ch)) {
                continue;
            }
            let name = &found.as_str()[..found.len() - 1];
            if self.keep(name) {
                out.push(CallCandidate {
                    name: name.to_string(),
                    offset: start,
                });
            }
        }
        for caps in self.member_call.captures_iter(text) {
            let Some(name) = caps.get(1) else {
                continue;
            };
            if self.keep(name.as_str()) {
                out.push(CallCandidate {
                    name: name.as_str().to_string(),
                    offset: name.start(),
                });
            }
        }
        out.sort_by_key(|candidate| candidate.offset);
        out.dedup();
        out
    }
}

/// Extractors keyed by language, falling back to the common denylist.
#[derive(Clone)]
pub struct ExtractorSet {
    fallback: Arc<dyn CallExtractor>,
    languages: HashMap<String, Arc<dyn CallExtractor>>,
}

impl ExtractorSet {
    pub fn from_denylist(denylist: &Denylist) -> Self {
        let fallback: Arc<dyn CallExtractor> = Arc::new(LexicalExtractor::new(denylist.names_for(None)));
        let languages = denylist
            .languages()
            .map(|lang| {
                let extractor: Arc<dyn CallExtractor> =
                    Arc::new(LexicalExtractor::new(denylist.names_for(Some(lang))));
                (lang.to_string(), extractor)
            })
            .collect();
        Self {
            fallback,
            languages,
        }
    }

    pub fn single(extractor: Arc<dyn CallExtractor>) -> Self {
        Self {
            fallback: extractor,
            languages: HashMap::new(),
        }
    }

    /// Replace the extractor for one language, e.g. with a parser-backed one.
    pub fn insert(&mut self, language: impl Into<String>, extractor: Arc<dyn CallExtractor>) {
        self.languages.insert(language.into(), extractor);
    }

    pub fn for_file(&self, file: &FileId) -> &dyn CallExtractor {
        language_for_path(file.path())
            .and_then(|lang| self.languages.get(lang))
            .map(|extractor| extractor.as_ref())
            .unwrap_or(self.fallback.as_ref())
    }
}

impl Default for ExtractorSet {
    fn default() -> Self {
        Self::from_denylist(&Denylist::default())
    }
}
