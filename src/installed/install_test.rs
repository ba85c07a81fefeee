use serde_json::json;

use crate::db::MarketplaceServer;
use crate::installed::{ArgPrompt, InstalledError, install_from_entry, is_installed, resolve_home};

fn entry(value: serde_json::Value) -> MarketplaceServer {
    serde_json::from_value(value).unwrap()
}

#[test]
fn test_resolve_home() {
    assert_eq!(resolve_home("${HOME}/data", "/home/a"), "/home/a/data");
    assert_eq!(resolve_home("/${HOME}/data", "/home/a"), "/home/a/data");
    assert_eq!(
        resolve_home("--root=${HOME}/x:${HOME}/y", "/home/a"),
        "--root=/home/a/x:/home/a/y"
    );
    assert_eq!(resolve_home("/${HOME}/data", "/"), "/data");
    assert_eq!(resolve_home("${HOME}/data", ""), "${HOME}/data");
    assert_eq!(resolve_home("//plain", "/home/a"), "/plain");
    assert_eq!(resolve_home("index.js", "/home/a"), "index.js");
}

#[test]
fn test_install_from_bare_definition() {
    let entry = entry(json!({
        "id": "0123456789abcdef0123456789abcdef",
        "name": "fs-server",
        "description": "Files",
        "author": "alice",
        "repository": "https://github.com/alice/fs",
        "config": {
            "command": "node",
            "args": ["${HOME}/fs/index.js"],
            "env": {"LOG": "debug", "PORT": 8080}
        }
    }));

    let installed = install_from_entry(&entry, Some("/home/a")).unwrap();

    assert_eq!(installed.id.len(), 32);
    assert_eq!(installed.name, "fs-server");
    assert_eq!(installed.search_key.as_deref(), Some("fs-server"));
    assert_eq!(installed.kind, "stdio");
    assert_eq!(installed.description.as_deref(), Some("Files"));
    assert_eq!(installed.command, "node");
    assert_eq!(installed.args, vec!["/home/a/fs/index.js"]);
    assert_eq!(installed.env["LOG"], "debug");
    assert_eq!(installed.env["PORT"], "8080");
    assert_eq!(installed.provider.as_deref(), Some("alice"));
    assert_eq!(
        installed.registry_url.as_deref(),
        Some("https://github.com/alice/fs")
    );
    assert!(!installed.is_active);
    assert_eq!(
        installed.meta.marketplace_id.as_deref(),
        Some("0123456789abcdef0123456789abcdef")
    );
    assert!(installed.meta.args_prompts.is_empty());

    assert!(is_installed(&entry, &[installed]));
}

#[test]
fn test_install_from_wrapped_definition_with_prompts() {
    let entry = entry(json!({
        "id": "0123456789abcdef0123456789abcdef",
        "name": "",
        "config": {
            "mcpServers": {
                "db": {
                    "name": "db-server",
                    "type": "sse",
                    "command": "uvx",
                    "args": ["db-mcp"],
                    "registryUrl": "https://reg/db"
                }
            },
            "argsPrompts": [
                {"argIndex": 2, "label": "Database path", "type": "file"},
                {"bogus": true}
            ]
        }
    }));

    let installed = install_from_entry(&entry, None).unwrap();

    assert_eq!(installed.name, "db-server");
    assert_eq!(installed.kind, "sse");
    assert_eq!(installed.args, vec!["db-mcp", "", ""]);
    assert_eq!(installed.registry_url.as_deref(), Some("https://reg/db"));
    assert_eq!(
        installed.meta.args_prompts,
        vec![ArgPrompt {
            arg_index: 2,
            label: Some("Database path".to_string()),
            kind: Some("file".to_string()),
        }]
    );
}

#[test]
fn test_install_without_config_defaults() {
    let entry = entry(json!({"id": "0123456789abcdef0123456789abcdef", "name": "x"}));

    let installed = install_from_entry(&entry, Some("/home/a")).unwrap();
    assert_eq!(installed.command, "");
    assert!(installed.args.is_empty());
    assert_eq!(installed.kind, "stdio");
}

#[test]
fn test_install_rejects_non_object_definition() {
    let entry = entry(json!({
        "id": "0123456789abcdef0123456789abcdef",
        "name": "x",
        "config": {"mcpServers": {"x": "node index.js"}}
    }));

    let err = install_from_entry(&entry, None).unwrap_err();
    assert!(err.to_string().starts_with("Invalid server config"));
}

fn entry_with_prompt_at(index: serde_json::Value) -> MarketplaceServer {
    entry(json!({
        "id": "0123456789abcdef0123456789abcdef",
        "name": "x",
        "config": {
            "command": "node",
            "args": ["index.js"],
            "argsPrompts": [{"argIndex": index, "label": "Path"}]
        }
    }))
}

#[test]
fn test_install_rejects_out_of_range_arg_index() {
    for index in [json!(u64::MAX), json!(1_000_000_000_000u64)] {
        let err = install_from_entry(&entry_with_prompt_at(index), None).unwrap_err();
        assert!(
            matches!(err, InstalledError::InvalidConfig { ref message } if message.contains("out of range")),
            "unexpected error: {err}"
        );
    }
}

#[test]
fn test_install_pads_args_within_limit() {
    let installed = install_from_entry(&entry_with_prompt_at(json!(32)), None).unwrap();
    assert_eq!(installed.args.len(), 33);
    assert_eq!(installed.args[0], "index.js");
    assert!(installed.args[1..].iter().all(String::is_empty));
}
