//! Building an installed record from a marketplace entry.

use std::collections::BTreeMap;

use serde_json::Value;

use super::matcher::{extract_definition, extract_signature};
use super::{ArgPrompt, InstalledError, InstalledMeta, InstalledResult, InstalledServer};
use crate::db::MarketplaceServer;
use crate::db::utils::generate_entity_id;

const HOME_TOKEN: &str = "${HOME}";
/// How far past the declared args a prompt may point.
const MAX_ARG_PADDING: usize = 32;

/// Substitute `${HOME}` in an argument.
///
/// A leading `${HOME}` or `/${HOME}` becomes the home directory, any later
/// occurrence is replaced in place, and a run of leading slashes collapses
/// to one. With no home directory the argument is returned unchanged.
pub fn resolve_home(arg: &str, home: &str) -> String {
    if home.is_empty() {
        return arg.to_string();
    }
    let rest = arg.strip_prefix('/').unwrap_or(arg);
    let resolved = match rest.strip_prefix(HOME_TOKEN) {
        Some(tail) => format!("{}{}", home, tail),
        None => arg.to_string(),
    };
    let resolved = resolved.replace(HOME_TOKEN, home);

    let trimmed = resolved.trim_start_matches('/');
    if resolved.len() - trimmed.len() > 1 {
        format!("/{}", trimmed)
    } else {
        resolved
    }
}

fn as_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn args_prompts(config: &Value) -> Vec<ArgPrompt> {
    config
        .get("argsPrompts")
        .and_then(Value::as_array)
        .map(|prompts| {
            prompts
                .iter()
                .filter_map(|p| serde_json::from_value(p.clone()).ok())
                .collect()
        })
        .unwrap_or_default()
}

/// Turn an entry into a new, inactive installed record linked back to it by
/// `meta.marketplaceId`.
pub fn install_from_entry(
    entry: &MarketplaceServer,
    home: Option<&str>,
) -> InstalledResult<InstalledServer> {
    let empty = Value::Object(Default::default());
    let definition = extract_definition(&entry.config).unwrap_or(&empty);
    if !definition.is_object() {
        return Err(InstalledError::InvalidConfig {
            message: format!("entry {} has no server definition object", entry.id),
        });
    }
    let text = |key: &str| definition.get(key).and_then(Value::as_str);

    let prompts = args_prompts(&entry.config);
    let mut args: Vec<String> = definition
        .get("args")
        .and_then(Value::as_array)
        .map(|a| a.iter().map(as_text).collect())
        .unwrap_or_default();
    let limit = args.len() + MAX_ARG_PADDING;
    for prompt in &prompts {
        let needed = prompt
            .arg_index
            .checked_add(1)
            .filter(|&n| n <= limit)
            .ok_or_else(|| InstalledError::InvalidConfig {
                message: format!("argument index {} is out of range", prompt.arg_index),
            })?;
        if args.len() < needed {
            args.resize(needed, String::new());
        }
    }
    let home = home.unwrap_or_default();
    let args = args.iter().map(|a| resolve_home(a, home)).collect();

    let env: BTreeMap<String, String> = definition
        .get("env")
        .and_then(Value::as_object)
        .map(|m| m.iter().map(|(k, v)| (k.clone(), as_text(v))).collect())
        .unwrap_or_default();

    let name = Some(entry.name.as_str())
        .filter(|n| !n.is_empty())
        .or_else(|| text("name"))
        .unwrap_or("New Server")
        .to_string();

    Ok(InstalledServer {
        id: generate_entity_id(),
        search_key: Some(name.clone()),
        name,
        kind: text("type").unwrap_or("stdio").to_string(),
        description: entry.description.clone(),
        command: text("command").unwrap_or_default().to_string(),
        args,
        env,
        provider: entry.author.clone(),
        registry_url: extract_signature(entry).registry_url,
        is_active: false,
        meta: InstalledMeta {
            marketplace_id: Some(entry.id.clone()),
            args_prompts: prompts,
            extra: Default::default(),
        },
    })
}
