use crate::cli::ParseArgs;
use anyhow::Context;
use epicflow::protocol::{format_message, parse_completion_output};
use std::io::Read;

pub fn execute(args: ParseArgs) -> anyhow::Result<()> {
    let text = match &args.file {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?,
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read stdin")?;
            buf
        }
    };

    match parse_completion_output(&text)? {
        Some(msg) if args.wire => println!("{}", format_message(&msg)?),
        Some(msg) => println!("{}", serde_json::to_string_pretty(&msg)?),
        None => println!("not complete"),
    }
    Ok(())
}
