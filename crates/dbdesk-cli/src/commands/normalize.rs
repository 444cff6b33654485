use anyhow::Result;
use dbdesk_normalize::{DriverValue, json_to_bson, normalize_for_transport};
use serde_json::Value;
use std::path::Path;

use super::read_json_input;

pub fn handle(file: Option<&Path>) -> Result<()> {
    let input = read_json_input(file)?;
    let output = normalize(input)?;
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn normalize(input: Value) -> Result<Value> {
    let bson = json_to_bson(input)?;
    Ok(normalize_for_transport(&DriverValue::from(bson)))
}
