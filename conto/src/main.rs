//! Contact center simulation application.
#![warn(
    missing_docs,
    trivial_casts,
    trivial_numeric_casts,
    unused_import_braces,
    unused_qualifications
)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(
    clippy::module_name_repetitions,
    clippy::default_trait_access,
    clippy::inline_always
)]

use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use eyre::WrapErr;
use indicatif::{ProgressBar, ProgressStyle};

use conto::{Config, ContactCenter};

/// Runs contact center simulation.
#[derive(Parser)]
#[clap(version, author)]
struct Opt {
    /// Average number of contacts arriving per hour.
    #[clap(long, default_value = "100")]
    contacts_per_hour: f64,

    /// Average handle time in seconds.
    #[clap(long, default_value = "300")]
    handle_time: f64,

    /// Probability that a contact is placed on hold.
    #[clap(long, default_value = "0.15")]
    hold_probability: f64,

    /// Average time a contact is placed on hold, in seconds.
    #[clap(long, default_value = "30")]
    hold_time: f64,

    /// Average wait time before abandoning, in seconds.
    #[clap(long, default_value = "120")]
    abandon_time: f64,

    /// Average wrap-up time in seconds.
    #[clap(long, default_value = "60")]
    wrap_up_time: f64,

    /// Number of agents.
    #[clap(long, default_value = "10")]
    agent_count: usize,

    /// Duration of simulation, e.g., `10000s` or `2h 30m`.
    #[clap(long, default_value = "10000s", parse(try_from_str = humantime::parse_duration))]
    sim_time: Duration,

    /// Random seed.
    #[clap(long, default_value = "0")]
    seed: u64,

    /// Contact center configuration in JSON format. Overrides all simulation parameters.
    #[clap(long)]
    config: Option<PathBuf>,

    /// Write records of finished contacts to this CSV file.
    #[clap(long)]
    contact_output: Option<PathBuf>,

    /// Verbosity.
    #[clap(short, long, parse(from_occurrences))]
    verbose: i32,

    /// Store the logs this file.
    #[clap(long)]
    log_output: Option<PathBuf>,

    /// Do not log to the stderr.
    #[clap(long)]
    no_stderr: bool,
}

impl Opt {
    fn config(&self) -> eyre::Result<Config> {
        if let Some(path) = &self.config {
            let file = File::open(path)
                .wrap_err_with(|| format!("unable to open config: {}", path.display()))?;
            return Config::from_reader(file).wrap_err("unable to load config");
        }
        let config = Config {
            agent_count: self.agent_count,
            contact_rate: self.contacts_per_hour / 3600.0,
            handle_time: self.handle_time,
            hold_probability: self.hold_probability,
            hold_time: self.hold_time,
            abandon_time: self.abandon_time,
            wrap_up_time: self.wrap_up_time,
            seed: self.seed,
            ..Config::default()
        };
        config.validate().wrap_err("invalid simulation parameters")?;
        Ok(config)
    }
}

/// Set up a logger based on the given user options.
fn set_up_logger(opt: &Opt) -> Result<(), fern::InitError> {
    let log_level = match opt.verbose {
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        3 => log::LevelFilter::Trace,
        _ => log::LevelFilter::Warn,
    };
    let dispatch = fern::Dispatch::new()
        .format(|out, message, record| out.finish(format_args!("[{}] {}", record.level(), message)))
        .level(log_level);
    let dispatch = if let Some(path) = &opt.log_output {
        dispatch.chain(
            std::fs::OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .open(path)?,
        )
    } else {
        dispatch
    };
    let dispatch = if opt.no_stderr {
        dispatch
    } else {
        dispatch.chain(std::io::stderr())
    };
    dispatch.apply()?;
    Ok(())
}

fn run(opt: &Opt) -> eyre::Result<()> {
    let config = opt.config()?;
    let mut center = ContactCenter::new(&config).wrap_err("unable to create contact center")?;
    let pb = ProgressBar::new(opt.sim_time.as_secs())
        .with_style(ProgressStyle::default_bar().template("{msg} {wide_bar} {percent}%"));
    center.run_with_progress(opt.sim_time, &pb);
    pb.finish();

    println!("{}", center.statistics());
    for agent in center.agents() {
        println!("{}: {}", agent, agent.statistics());
    }

    if let Some(path) = &opt.contact_output {
        let file = File::create(path)
            .wrap_err_with(|| format!("unable to create contact output: {}", path.display()))?;
        center
            .write_contacts(BufWriter::new(file))
            .wrap_err("unable to write contact output")?;
    }
    Ok(())
}

fn main() -> eyre::Result<()> {
    color_eyre::install()?;
    let opt = Opt::parse();
    set_up_logger(&opt)?;
    run(&opt)
}
