#![deny(clippy::all, clippy::pedantic)]

use std::path::PathBuf;

use designctl::application::batch::{BatchConfig, BatchDefaults, BatchRunner};

use crate::args::BatchRenderArgs;
use crate::client::{CliError, Ctx};
use crate::io::read_file;
use crate::print::{print_json, print_table};

pub async fn handle(ctx: &Ctx, args: BatchRenderArgs) -> Result<(), CliError> {
    let raw = read_file(&args.file)?;
    let mut config = BatchConfig::parse(&raw, &args.file.display().to_string())?;
    if let Some(dir) = args.output_dir {
        config.output_dir = Some(dir);
    }
    if config.renders.is_empty() {
        return Err(CliError::InvalidInput(format!(
            "{} contains no renders",
            args.file.display()
        )));
    }

    let defaults = BatchDefaults {
        format: args.format.unwrap_or(ctx.default_format),
        quality: ctx.default_quality,
        output_dir: PathBuf::from("."),
    };
    let total = config.renders.len();
    let json = ctx.json;

    let runner = BatchRunner::new(ctx.orch.clone());
    let summary = runner
        .run(&config, &defaults, |outcome| {
            if json {
                return;
            }
            let position = outcome.index + 1;
            match (&outcome.output, &outcome.error) {
                (Some(output), None) => {
                    eprintln!("[{position}/{total}] ok    {}", output.display());
                }
                (_, Some(err)) => eprintln!("[{position}/{total}] error {err}"),
                (None, None) => {}
            }
        })
        .await;

    if json {
        print_json(&summary)?;
    } else {
        if config.parallel.is_some() {
            eprintln!("note: `parallel` is accepted but items run one at a time");
        }
        let rows: Vec<Vec<String>> = summary
            .items
            .iter()
            .filter(|item| !item.succeeded())
            .map(|item| {
                vec![
                    item.index.to_string(),
                    item.target.clone().unwrap_or_else(|| "-".into()),
                    item.error.clone().unwrap_or_default(),
                ]
            })
            .collect();
        if !rows.is_empty() {
            print_table(&["ITEM", "TARGET", "ERROR"], &rows);
        }
        println!("{} succeeded, {} failed", summary.succeeded, summary.failed);
    }

    if summary.failed > 0 {
        return Err(CliError::BatchFailed {
            failed: summary.failed,
            total,
        });
    }
    Ok(())
}
