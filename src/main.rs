// Copyright 2022 The Plugbus Authors.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! The plugbus command line tool.
//!
//! Today it hosts one job: `plugbus generate actions`, which scans a
//! host project for annotated methods and emits the action schemas and
//! call shims.

use std::io;
use std::path::PathBuf;
use std::process;

use clap::{Args, Parser, Subcommand};

use plugbus_generate::Generator;

#[derive(Parser)]
#[command(name = "plugbus", version, about = "Tooling for plugbus hosts")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Code generation for host projects.
    #[command(subcommand)]
    Generate(GenerateCommands),
}

#[derive(Subcommand)]
enum GenerateCommands {
    /// Generates request/response types and dispatch shims for every
    /// method annotated with `//plugbus:generate`.
    Actions(ActionsArgs),
}

#[derive(Args)]
struct ActionsArgs {
    /// Output folder, relative to the project root.
    #[arg(short, long, default_value = "actions")]
    out: PathBuf,

    /// Module path override; auto-detected from Cargo.toml if absent.
    #[arg(short, long)]
    module: Option<String>,

    /// Name to mount the generated module as; defaults to the base
    /// name of the output folder.
    #[arg(short, long)]
    package: Option<String>,

    /// Permit struct parameter and result types.
    #[arg(long)]
    allow_structs: bool,

    /// Permit Box-pointer parameter and result types.
    #[arg(long)]
    allow_pointers: bool,

    /// Permit Vec parameter and result types.
    #[arg(long)]
    allow_slices: bool,

    /// The host project to scan.
    #[arg(value_name = "PROJECT_ROOT")]
    project_root: PathBuf,
}

fn setup_logging() -> Result<(), fern::InitError> {
    let level = match std::env::var("PLUGBUS_LOG") {
        Ok(level) => level.parse().unwrap_or(log::LevelFilter::Info),
        Err(_) => log::LevelFilter::Info,
    };
    fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "{}[{}][{}] {}",
                chrono::Local::now().format("[%Y-%m-%d][%H:%M:%S]"),
                record.target(),
                record.level(),
                message
            ))
        })
        .level(level)
        .chain(io::stderr())
        .apply()?;
    Ok(())
}

fn main() {
    if let Err(err) = setup_logging() {
        eprintln!("warning: could not set up logging: {:?}", err);
    }

    let cli = Cli::parse();
    match cli.command {
        Commands::Generate(GenerateCommands::Actions(args)) => {
            let mut generator = Generator::new(args.project_root);
            generator.out = args.out;
            generator.module = args.module;
            generator.package = args.package;
            generator.allow_structs = args.allow_structs;
            generator.allow_pointers = args.allow_pointers;
            generator.allow_slices = args.allow_slices;
            match generator.run() {
                Ok(path) => log::info!("wrote {:?}", path),
                Err(err) => {
                    eprintln!("plugbus: {}", err);
                    process::exit(1);
                }
            }
        }
    }
}
