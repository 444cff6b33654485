use anyhow::Result;
use dbdesk_config::Config;
use dbdesk_security::Redactor;
use serde_json::Value;
use std::path::Path;

use super::read_json_input;

pub fn handle(config: &Config, file: Option<&Path>) -> Result<()> {
    let payload = read_json_input(file)?;
    let (redacted, report) = redact(config, &payload);

    println!("{}", serde_json::to_string_pretty(&redacted)?);
    eprintln!(
        "Redacted {} item(s): {} by key, {} by shape, {} connection string(s), dropped [{}]",
        report.total(),
        report.masked_keys,
        report.masked_values,
        report.masked_connection_strings,
        report.dropped_fields.join(", ")
    );
    Ok(())
}

fn redact(config: &Config, payload: &Value) -> (Value, dbdesk_security::RedactionReport) {
    Redactor::new()
        .with_dropped_fields(config.redaction.extra_dropped_fields.iter().cloned())
        .redact_payload(payload)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_redact_uses_configured_fields() {
        let mut config = Config::default();
        config.redaction.extra_dropped_fields = vec!["notes".to_string()];

        let (out, report) = redact(
            &config,
            &json!({"notes": "x", "password": "hunter2", "db": "shop"}),
        );
        assert_eq!(out, json!({"password": "hu*****[REDACTED]", "db": "shop"}));
        assert_eq!(report.dropped_fields, vec!["notes"]);
    }
}
