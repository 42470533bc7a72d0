#![deny(clippy::all, clippy::pedantic)]

use designctl::application::batch::BatchConfig;
use serde_json::json;

use crate::args::{InitArgs, ValidateArgs};
use crate::client::{App, CliError};
use crate::io::{parse_json, read_file, write_output};
use crate::print::print_json;

pub fn init(app: &App, args: &InitArgs) -> Result<(), CliError> {
    if args.path.exists() && !args.force {
        return Err(CliError::InvalidInput(format!(
            "{} already exists (pass --force to overwrite)",
            args.path.display()
        )));
    }
    let body = serde_json::to_string_pretty(&BatchConfig::starter())
        .map_err(|e| CliError::InvalidInput(format!("failed to encode batch file: {e}")))?;
    write_output(&args.path, format!("{body}\n").as_bytes())?;

    if app.json {
        return print_json(&json!({ "created": args.path }));
    }
    println!("wrote {}", args.path.display());
    println!(
        "edit the ids, then run `designctl batch-render {}`",
        args.path.display()
    );
    Ok(())
}

pub fn validate(app: &App, args: &ValidateArgs) -> Result<(), CliError> {
    let raw = read_file(&args.file)?;
    let origin = args.file.display().to_string();

    if args.data {
        parse_json(&raw, &origin)?;
        if app.json {
            return print_json(&json!({ "file": args.file, "valid": true, "kind": "data" }));
        }
        println!("{origin}: valid JSON data");
        return Ok(());
    }

    let config = BatchConfig::parse(&raw, &origin)?;
    config.validate()?;
    if app.json {
        return print_json(&json!({
            "file": args.file,
            "valid": true,
            "kind": "batch",
            "renders": config.renders.len(),
        }));
    }
    println!("{origin}: {} renders, all valid", config.renders.len());
    Ok(())
}
