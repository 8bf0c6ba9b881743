use serde_json::{json, Value};

use crate::cli::OutputFormat;

/// Print a success message; in JSON mode the fields of `data` are merged
/// into the envelope
pub fn output_success(output_format: OutputFormat, message: &str, data: Option<Value>) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&success_envelope(message, data))?),
        OutputFormat::Text => println!("✓ {}", message),
    }
    Ok(())
}

/// Print a line only in text mode
pub fn output_detail(output_format: OutputFormat, line: &str) {
    if output_format == OutputFormat::Text {
        println!("  {}", line);
    }
}

fn success_envelope(message: &str, data: Option<Value>) -> Value {
    let mut response = json!({
        "success": true,
        "message": message
    });

    match data {
        Some(Value::Object(fields)) => {
            if let Some(envelope) = response.as_object_mut() {
                envelope.extend(fields);
            }
        }
        Some(other) => response["data"] = other,
        None => {}
    }
    response
}
