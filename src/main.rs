// Copyright 2025 Lablup Inc. and Jeongkyu Shin
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

use clap::error::ErrorKind;
use clap::Parser;
use tracing::debug;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use xenstat_bridge::cache::CacheRefresher;
use xenstat_bridge::cli::{Cli, USAGE};
use xenstat_bridge::error::{
    Result, EXIT_MISSING_ARGUMENT, EXIT_NO_ARGUMENTS, EXIT_OK, EXIT_PARSE_ERROR,
};
use xenstat_bridge::network::XenApiClient;
use xenstat_bridge::query::QueryEngine;

#[tokio::main]
async fn main() {
    if std::env::args_os().len() <= 1 {
        println!("Usage:");
        println!("{USAGE}");
        std::process::exit(EXIT_NO_ARGUMENTS);
    }

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let code = match e.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => EXIT_OK,
                ErrorKind::MissingRequiredArgument => EXIT_MISSING_ARGUMENT,
                _ => EXIT_PARSE_ERROR,
            };
            let _ = e.print();
            std::process::exit(code);
        }
    };

    init_tracing(cli.verbose);

    match run(&cli).await {
        Ok(Some(output)) => println!("{output}"),
        Ok(None) => {}
        Err(e) => {
            debug!(error = ?e, "invocation failed");
            eprintln!("Error: {e}");
            std::process::exit(e.exit_code());
        }
    }
}

fn init_tracing(verbose: bool) {
    let default_directive = if verbose {
        "xenstat_bridge=debug"
    } else {
        "xenstat_bridge=warn"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_directive.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

async fn run(cli: &Cli) -> Result<Option<String>> {
    // Argument problems are reported before the control plane is contacted.
    cli.check_required()?;
    let target = cli.target_kind()?;
    let query = cli.query()?;

    let paths = cli.cache_paths();
    let refresher = CacheRefresher::new(XenApiClient::new()?);
    let outcome = refresher
        .ensure_fresh(&paths, &cli.master, &cli.credentials(), cli.max_age())
        .await?;
    debug!(?outcome, host = paths.hostname(), "cache ready");

    QueryEngine::new(paths).execute(target, &query)
}
