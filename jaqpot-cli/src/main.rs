//! Command-line access to the Jaqpot model-hosting service.

use anyhow::{format_err, Context, Result};
use jaqpot::{
    prediction::Values,
    resource::{Dataset, Feature, Id, Model, Task},
    CancellationToken, Client, WaitOptions,
};
use serde::Serialize;
use std::{process, time::Duration};
use structopt::StructOpt;
use tokio::io::{self, AsyncBufReadExt, BufReader};
use tracing::{debug, warn};
use tracing_subscriber::{fmt::Subscriber, prelude::*, EnvFilter};

mod feature_input;

use feature_input::FeatureInput;

/// Our command-line arguments.
#[derive(Debug, StructOpt)]
#[structopt(
    name = "jaqpot-cli",
    about = "Query Jaqpot models and run predictions."
)]
struct Opt {
    /// The base URL of the Jaqpot API.
    #[structopt(long = "url", env = "JAQPOT_URL", default_value = "https://api.jaqpot.org/")]
    url: String,

    /// The bearer token used to authenticate with Jaqpot.
    #[structopt(long = "token", env = "JAQPOT_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// How long to wait for any single HTTP request, in seconds.
    #[structopt(long = "timeout", default_value = "15")]
    timeout: u64,

    /// How long to wait between checks on a running prediction, in seconds.
    #[structopt(
        long = "poll-interval",
        default_value = "1",
        parse(try_from_str = parse_poll_interval)
    )]
    poll_interval: u64,

    /// How long a whole prediction may take, in seconds. Use 0 to wait
    /// forever.
    #[structopt(long = "deadline", default_value = "600")]
    deadline: u64,

    #[structopt(subcommand)]
    cmd: Command,
}

#[derive(Debug, StructOpt)]
enum Command {
    /// Show a model.
    #[structopt(name = "model")]
    Model {
        /// The model ID.
        id: Id<Model>,
    },

    /// List models, either your own or an organization's.
    #[structopt(name = "models")]
    Models {
        /// List the models of this organization.
        #[structopt(long = "org")]
        org: Option<String>,

        /// Only list models carrying this tag. Requires `--org`.
        #[structopt(long = "tag", requires = "org")]
        tag: Option<String>,

        /// Index of the first model to list.
        #[structopt(long = "min", default_value = "0")]
        min: u64,

        /// Index after the last model to list.
        #[structopt(long = "max", default_value = "10")]
        max: u64,
    },

    /// Show a feature.
    #[structopt(name = "feature")]
    Feature {
        /// The feature ID.
        id: Id<Feature>,
    },

    /// Show a dataset, including its rows.
    #[structopt(name = "dataset")]
    Dataset {
        /// The dataset ID.
        id: Id<Dataset>,
    },

    /// Show the domain of applicability of a model.
    #[structopt(name = "doa")]
    Doa {
        /// The model ID.
        model: Id<Model>,
    },

    /// Show a task.
    #[structopt(name = "task")]
    Task {
        /// The task ID.
        id: Id<Task>,
    },

    /// Run a model and wait for its predictions.
    #[structopt(name = "predict")]
    Predict {
        /// The model ID.
        model: Id<Model>,

        /// A feature value for a single input row, as "name=value". Values
        /// are parsed as JSON, falling back to plain strings.
        #[structopt(
            short = "i",
            long = "input",
            number_of_values = 1,
            conflicts_with = "stdin"
        )]
        inputs: Vec<FeatureInput>,

        /// Read input rows from standard input, one JSON object per line.
        #[structopt(long = "stdin")]
        stdin: bool,
    },
}

#[tokio::main]
async fn main() {
    // Configure tracing.
    let filter = EnvFilter::from_default_env();
    Subscriber::builder()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .finish()
        .init();

    let opt = Opt::from_args();
    debug!("{:?}", opt.cmd);

    if let Err(err) = run(opt).await {
        eprint!("ERROR");
        for e in err.chain() {
            eprint!(": {}", e);
        }
        eprintln!();
        process::exit(1);
    }
}

/// Does the real work, and can return an error (unlike `main`).
async fn run(opt: Opt) -> Result<()> {
    let token = opt
        .token
        .as_deref()
        .ok_or_else(|| format_err!("pass --token or set JAQPOT_TOKEN"))?;
    let client = Client::with_request_timeout(&opt.url, Duration::from_secs(opt.timeout))
        .with_context(|| format!("cannot use Jaqpot URL {:?}", opt.url))?;

    match opt.cmd {
        Command::Model { id } => print_json(&client.get_model(&id, token).await?),
        Command::Models {
            org,
            tag,
            min,
            max,
        } => {
            let models = match (org, tag) {
                (Some(org), Some(tag)) => {
                    client
                        .get_orgs_models_by_tag(&org, &tag, min, max, token)
                        .await?
                }
                (Some(org), None) => client.get_orgs_models(&org, min, max, token).await?,
                (None, _) => client.get_my_models(min, max, token).await?,
            };
            print_json(&models)
        }
        Command::Feature { id } => print_json(&client.get_feature(&id, token).await?),
        Command::Dataset { id } => print_json(&client.get_dataset(&id, token).await?),
        Command::Doa { model } => print_json(&client.get_doa(&model, token).await?),
        Command::Task { id } => print_json(&client.get_task(&id, token).await?),
        Command::Predict {
            model,
            inputs,
            stdin,
        } => {
            let rows = if stdin {
                read_rows().await?
            } else if inputs.is_empty() {
                return Err(format_err!("pass feature values with -i, or use --stdin"));
            } else {
                vec![inputs
                    .into_iter()
                    .map(|input| (input.name, input.value))
                    .collect::<Values>()]
            };

            // Abandon the prediction on Ctrl-C, and give up entirely on a
            // second Ctrl-C.
            let cancel = CancellationToken::new();
            let on_interrupt = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    warn!("interrupted, cancelling prediction");
                    on_interrupt.cancel();
                }
                if tokio::signal::ctrl_c().await.is_ok() {
                    process::exit(130);
                }
            });

            let deadline = match opt.deadline {
                0 => None,
                secs => Some(Duration::from_secs(secs)),
            };
            let options = WaitOptions::default()
                .retry_interval(Duration::from_secs(opt.poll_interval))
                .timeout(deadline)
                .cancel_token(cancel);
            let prediction = client.predict_opt(&model, &rows, token, &options).await?;
            print_json(&prediction)
        }
    }
}

/// Read line-delimited JSON rows from standard input, skipping blank lines.
async fn read_rows() -> Result<Vec<Values>> {
    let mut lines = BufReader::new(io::stdin()).lines();
    let mut rows = vec![];
    let mut line_number = 0;
    while let Some(line) = lines.next_line().await? {
        line_number += 1;
        if line.trim().is_empty() {
            continue;
        }
        let row = serde_json::from_str::<Values>(&line)
            .with_context(|| format!("cannot parse line {} of input as a JSON object", line_number))?;
        rows.push(row);
    }
    if rows.is_empty() {
        return Err(format_err!("no input rows on standard input"));
    }
    Ok(rows)
}

/// Polling with no pause would hammer the server.
fn parse_poll_interval(s: &str) -> Result<u64> {
    match s.parse::<u64>()? {
        0 => Err(format_err!("poll interval must be at least 1 second")),
        secs => Ok(secs),
    }
}

/// Print `value` to standard output as pretty JSON.
fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[test]
fn poll_interval_must_be_positive() {
    assert_eq!(parse_poll_interval("2").unwrap(), 2);
    assert!(parse_poll_interval("0").is_err());
    assert!(parse_poll_interval("soon").is_err());
}
