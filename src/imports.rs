//! Rewrites contract imports in source text into concrete addresses for one network.
//!
//! Two import styles are accepted:
//!
//! ```text
//! import Foo from "./contracts/Foo.cdc"
//! import Foo from 0xFoo
//! ```
//!
//! The file style is first normalised into the placeholder style, then every `0xName`
//! placeholder of a known contract is substituted by the contract's address. Resolution never
//! fails: placeholders of unknown contracts are left for the ledger to reject.

use crate::{
    address::prepend_hex_prefix,
    registry::{Registry, RegistryResult},
};
use std::collections::BTreeMap;


/// File extensions recognised in file-style imports
pub const SOURCE_EXTENSIONS: [&str; 2] = [".cdc", ".src"];

const IMPORT_KEYWORD: &str = "import";
const FROM_KEYWORD: &str = "from";

/// Source text after resolution, with the imports that were actually substituted
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedSource {
    /// Resolved code
    pub bytes: Vec<u8>,
    /// Contract name to address, for every placeholder replaced in the text
    pub resolved_imports: BTreeMap<String, String>,
}

/// Contract name to address table for one network
#[derive(Clone, Debug, Default)]
pub struct ImportResolver {
    network: String,
    addresses: BTreeMap<String, String>,
}

impl ImportResolver {
    /// Resolver over an explicit name to address table
    pub fn new(network: &str, addresses: BTreeMap<String, String>) -> Self {
        let addresses = addresses
            .into_iter()
            .map(|(name, address)| (name, prepend_hex_prefix(&address)))
            .collect();
        ImportResolver {
            network: network.to_string(),
            addresses,
        }
    }

    /// Resolver for every contract that has an address on `network`. Contracts without one are
    /// skipped and their placeholders stay unresolved.
    pub fn from_registry(registry: &Registry, network: &str) -> RegistryResult<Self> {
        let addresses = registry
            .contracts_for_network(network)?
            .into_iter()
            .filter_map(|(name, location)| location.address.map(|address| (name, address)))
            .collect();
        Ok(Self::new(network, addresses))
    }

    /// Network this resolver targets
    pub fn network(&self) -> &str {
        &self.network
    }

    /// Address of a contract on this network
    pub fn address_of(&self, name: &str) -> Option<&str> {
        self.addresses.get(name).map(String::as_str)
    }

    /// File references, then addresses
    pub fn resolve(&self, text: &str) -> String {
        resolve_addresses(&rewrite_file_references(text), &self.addresses)
    }

    /// [`ImportResolver::resolve`], also reporting which contracts were substituted
    pub fn resolve_source(&self, text: &str) -> ResolvedSource {
        let rewritten = rewrite_file_references(text);
        let resolved_imports = self
            .addresses
            .iter()
            .filter(|(name, _)| !placeholder_positions(&rewritten, &placeholder(name)).is_empty())
            .map(|(name, address)| (name.clone(), address.clone()))
            .collect();
        ResolvedSource {
            bytes: resolve_addresses(&rewritten, &self.addresses).into_bytes(),
            resolved_imports,
        }
    }
}

/// Turn `import Foo from "./Foo.cdc"` lines into `import Foo from 0xFoo`. Other lines, and
/// candidate lines that do not have the expected shape, are returned untouched.
pub fn rewrite_file_references(text: &str) -> String {
    text.split('\n')
        .map(|line| rewrite_line(line).unwrap_or_else(|| line.to_string()))
        .collect::<Vec<_>>()
        .join("\n")
}

fn rewrite_line(line: &str) -> Option<String> {
    if !(line.contains(IMPORT_KEYWORD)
        && line.contains(FROM_KEYWORD)
        && SOURCE_EXTENSIONS.iter().any(|ext| line.contains(ext)))
    {
        return None;
    }
    let body = line.trim_start();
    let indent = &line[..line.len() - body.len()];
    let tokens: Vec<&str> = body.split_whitespace().collect();
    match tokens.as_slice() {
        [IMPORT_KEYWORD, name, FROM_KEYWORD, path, rest @ ..] if is_source_path(path) => {
            let mut rewritten = format!(
                "{indent}{IMPORT_KEYWORD} {name} {FROM_KEYWORD} {}",
                placeholder(name)
            );
            for token in rest {
                rewritten.push(' ');
                rewritten.push_str(token);
            }
            Some(rewritten)
        }
        _ => None,
    }
}

fn is_source_path(token: &str) -> bool {
    let path = token.trim_matches(|c| c == '"' || c == '\'');
    SOURCE_EXTENSIONS.iter().any(|ext| path.ends_with(ext))
}

/// Substitute every `0xName` placeholder of a known contract by its address.
///
/// Names are applied longest first, ties by name, and a placeholder only matches as a whole
/// identifier, so `0xToken` never fires inside `0xFungibleToken` or `0xTokenA`.
pub fn resolve_addresses(text: &str, addresses: &BTreeMap<String, String>) -> String {
    let mut names: Vec<&String> = addresses.keys().collect();
    names.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
    names.into_iter().fold(text.to_string(), |text, name| {
        let address = &addresses[name];
        replace_placeholder(&text, &placeholder(name), address)
    })
}

/// Placeholder form of a contract name
pub fn placeholder(name: &str) -> String {
    format!("0x{name}")
}

fn replace_placeholder(text: &str, placeholder: &str, address: &str) -> String {
    let positions = placeholder_positions(text, placeholder);
    if positions.is_empty() {
        return text.to_string();
    }
    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    for start in positions {
        out.push_str(&text[last..start]);
        out.push_str(address);
        last = start + placeholder.len();
    }
    out.push_str(&text[last..]);
    out
}

fn placeholder_positions(text: &str, placeholder: &str) -> Vec<usize> {
    text.match_indices(placeholder)
        .map(|(start, _)| start)
        .filter(|start| {
            let before = text[..*start].chars().next_back();
            let after = text[start + placeholder.len()..].chars().next();
            !before.map_or(false, is_identifier_char) && !after.map_or(false, is_identifier_char)
        })
        .collect()
}

fn is_identifier_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}
