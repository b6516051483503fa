// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: MIT-0

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use claude_sdk_stack::assets::FsAssetResolver;
use claude_sdk_stack::claude_sdk_stack::ClaudeSdkStack;
use claude_sdk_stack::configuration::{Command, StackOptions};
use claude_sdk_stack::stack::CloudAssembly;
use clap::Parser;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .json()
        .with_env_filter(EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        // stdout may carry the template
        .with_writer(std::io::stderr)
        .with_current_span(false)
        .with_ansi(false)
        .without_time()
        .with_target(false)
        .init();

    let options = StackOptions::parse();

    tracing::info!("[stack] {:?}", &options);

    let resolver = FsAssetResolver::new(&options.project_root);
    let built = ClaudeSdkStack::build(&options.props(), &resolver)?;

    match &options.command {
        Command::Synth { out_dir } => {
            let assembly = built.synth()?;
            if out_dir.as_os_str() == "-" {
                println!("{}", serde_json::to_string_pretty(&assembly.template)?);
            } else {
                write_assembly(out_dir, &assembly)?;
            }
        }
        Command::Plan => {
            for logical_id in built.stack.deployment_order()? {
                let resource_type = built
                    .stack
                    .resource(logical_id)
                    .map(|r| r.resource_type.as_str())
                    .unwrap_or_default();
                println!("{logical_id}\t{resource_type}");
            }
        }
    }

    Ok(())
}

fn write_assembly(out_dir: &Path, assembly: &CloudAssembly) -> Result<()> {
    fs::create_dir_all(out_dir)
        .with_context(|| format!("unable to create {}", out_dir.display()))?;

    let template_path = out_dir.join(format!("{}.template.json", assembly.stack_name));
    fs::write(&template_path, serde_json::to_string_pretty(&assembly.template)?)
        .with_context(|| format!("unable to write {}", template_path.display()))?;

    let assets_path = out_dir.join(format!("{}.assets.json", assembly.stack_name));
    fs::write(&assets_path, serde_json::to_string_pretty(&assembly.assets)?)
        .with_context(|| format!("unable to write {}", assets_path.display()))?;

    tracing::info!(
        "[stack] wrote {} and {}",
        template_path.display(),
        assets_path.display()
    );

    Ok(())
}
