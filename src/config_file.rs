//! Purpose: Load `shell-fmt --config` files into the registration payload.
//! Exports: `load_registration`, `registration_from_document`.
//! Role: CLI-only helper; the output is exactly what a host would send to `register_config`.
//! Invariants: A document with only `plugin`/`global` keys is taken as-is.
//! Invariants: Otherwise top-level scalars are global config and the `shfmt` object is plugin config.
use dprint_plugin_shell::plugin::CONFIG_KEY;
use dprint_plugin_shell::{Error, ErrorKind};
use serde_json::{Map, Value, json};
use std::path::Path;

pub fn load_registration(path: Option<&Path>) -> Result<Vec<u8>, Error> {
    let document = match path {
        Some(path) => {
            let bytes = std::fs::read(path).map_err(|err| {
                Error::new(ErrorKind::Io)
                    .with_message("failed to read config file")
                    .with_path(path)
                    .with_source(err)
            })?;
            serde_json::from_slice::<Value>(&bytes).map_err(|err| {
                Error::new(ErrorKind::InvalidJson)
                    .with_message("config file is not valid JSON")
                    .with_path(path)
                    .with_source(err)
            })?
        }
        None => Value::Object(Map::new()),
    };

    let registration = registration_from_document(document)?;
    serde_json::to_vec(&registration).map_err(|err| {
        Error::new(ErrorKind::Internal)
            .with_message("failed to encode registration")
            .with_source(err)
    })
}

pub fn registration_from_document(document: Value) -> Result<Value, Error> {
    let Value::Object(map) = document else {
        return Err(Error::new(ErrorKind::Usage).with_message("config file must contain a JSON object"));
    };

    let raw = !map.is_empty() && map.keys().all(|key| key == "plugin" || key == "global");
    if raw {
        return Ok(Value::Object(map));
    }

    let mut global = Map::new();
    let mut plugin = Map::new();
    for (key, value) in map {
        match value {
            Value::Object(section) if key == CONFIG_KEY => plugin = section,
            Value::Object(_) | Value::Array(_) => {}
            scalar => {
                global.insert(key, scalar);
            }
        }
    }
    Ok(json!({ "plugin": plugin, "global": global }))
}

#[cfg(test)]
mod tests {
    use super::{load_registration, registration_from_document};
    use serde_json::{Value, json};
    use std::io::Write;

    #[test]
    fn raw_documents_pass_through() {
        let doc = json!({"plugin": {"minify": true}, "global": {"indentWidth": 4}});
        assert_eq!(registration_from_document(doc.clone()).expect("registration"), doc);
    }

    #[test]
    fn dprint_documents_are_split() {
        let doc = json!({
            "indentWidth": 4,
            "useTabs": false,
            "shfmt": {"switchCaseIndent": true},
            "json": {"indentWidth": 2},
            "plugins": ["https://example.com/plugin.wasm"]
        });
        assert_eq!(
            registration_from_document(doc).expect("registration"),
            json!({
                "plugin": {"switchCaseIndent": true},
                "global": {"indentWidth": 4, "useTabs": false}
            })
        );
    }

    #[test]
    fn missing_file_is_io_error_and_no_file_is_empty() {
        let dir = tempfile::tempdir().expect("tempdir");
        let err = load_registration(Some(&dir.path().join("missing.json"))).unwrap_err();
        assert_eq!(err.kind(), dprint_plugin_shell::ErrorKind::Io);

        let bytes = load_registration(None).expect("registration");
        let value: Value = serde_json::from_slice(&bytes).expect("json");
        assert_eq!(value, json!({"plugin": {}, "global": {}}));
    }

    #[test]
    fn invalid_json_is_reported() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("dprint.json");
        let mut file = std::fs::File::create(&path).expect("create");
        file.write_all(b"{\"shfmt\":").expect("write");
        let err = load_registration(Some(&path)).unwrap_err();
        assert_eq!(err.kind(), dprint_plugin_shell::ErrorKind::InvalidJson);
    }
}
