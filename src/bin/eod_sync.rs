use nse_eod_sync::scrapers::base::EodScraper;
use nse_eod_sync::{Config, DateTracker, NseArchive, Payload, SessionClient, SyncError, SyncService};

use anyhow::{bail, Context};
use clap::{App, Arg, ArgMatches, SubCommand};
use log::info;
use serde_json::Value;
use std::io;
use std::process;
use std::time::Duration;

fn main() {
    // Initialize logger
    env_logger::init();

    let matches = build_app().get_matches();

    if let Err(e) = run(&matches) {
        // "已是最新" 不是错误，正常退出
        if let Some(sync_err) = e.downcast_ref::<SyncError>() {
            if sync_err.is_up_to_date() {
                println!("{}", sync_err);
                return;
            }
        }
        eprintln!("{:#}", e);
        process::exit(1);
    }
}

fn build_app() -> App<'static> {
    App::new("eod_sync")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Sync NSE end-of-day archives one trading day at a time")
        .arg(
            Arg::with_name("data-dir")
                .long("data-dir")
                .value_name("DIR")
                .help("Directory holding lastupdate.txt and cookies.json")
                .takes_value(true)
                .global(true)
                .default_value("eod_data"),
        )
        .arg(
            Arg::with_name("download-dir")
                .long("download-dir")
                .value_name("DIR")
                .help("Directory for downloaded files (defaults to the data dir)")
                .takes_value(true)
                .global(true),
        )
        .arg(
            Arg::with_name("base-url")
                .long("base-url")
                .value_name("URL")
                .help("Site used to obtain session cookies")
                .takes_value(true)
                .global(true),
        )
        .arg(
            Arg::with_name("tz")
                .long("tz")
                .value_name("TZ")
                .help("Exchange time zone for the publish cutoff, e.g. Asia/Kolkata")
                .takes_value(true)
                .global(true),
        )
        .subcommand(SubCommand::with_name("next").about("Print the next trading date to sync"))
        .subcommand(
            SubCommand::with_name("sync")
                .about("Download archives for each pending trading date and advance the marker")
                .arg(
                    Arg::with_name("archive")
                        .short('a')
                        .long("archive")
                        .value_name("ARCHIVE")
                        .help("Archive to fetch (equity, delivery, all)")
                        .takes_value(true)
                        .default_value("equity"),
                )
                .arg(
                    Arg::with_name("url-template")
                        .long("url-template")
                        .value_name("TEMPLATE")
                        .help("Custom archive URL with {date}, {iso} or {ddmmyyyy} placeholders")
                        .takes_value(true)
                        .multiple_occurrences(true),
                )
                .arg(
                    Arg::with_name("max-days")
                        .long("max-days")
                        .value_name("N")
                        .help("Stop after syncing N trading days")
                        .takes_value(true),
                ),
        )
        .subcommand(
            SubCommand::with_name("fetch")
                .about("GET a URL with the session cookies and print the body")
                .arg(Arg::with_name("url").required(true).index(1))
                .arg(
                    Arg::with_name("param")
                        .short('p')
                        .long("param")
                        .value_name("KEY=VALUE")
                        .help("Query parameter, may be repeated")
                        .takes_value(true)
                        .multiple_occurrences(true),
                )
                .arg(
                    Arg::with_name("timeout")
                        .long("timeout")
                        .value_name("SECS")
                        .help("Request timeout in seconds")
                        .takes_value(true),
                )
                .arg(
                    Arg::with_name("raw")
                        .long("raw")
                        .help("Print the body as received instead of parsing JSON")
                        .takes_value(false),
                ),
        )
        .subcommand(
            SubCommand::with_name("download")
                .about("Download a URL into the download directory")
                .arg(Arg::with_name("url").required(true).index(1)),
        )
}

fn build_config(matches: &ArgMatches) -> anyhow::Result<Config> {
    let mut config = Config::new();

    if let Some(dir) = matches.value_of("data-dir") {
        config = config.with_data_dir(dir);
    }
    if let Some(dir) = matches.value_of("download-dir") {
        config = config.with_download_dir(dir);
    }
    if let Some(url) = matches.value_of("base-url") {
        config = config.with_base_url(url);
    }
    if let Some(tz) = matches.value_of("tz") {
        config = config.with_exchange_tz_name(tz)?;
    }

    Ok(config)
}

fn run(matches: &ArgMatches) -> anyhow::Result<()> {
    match matches.subcommand() {
        Some(("next", sub)) => {
            let config = build_config(sub)?;
            let tracker = DateTracker::new(&config)?;
            println!("{}", tracker.next_date()?);
        }
        Some(("sync", sub)) => {
            let config = build_config(sub)?;
            let scrapers = build_scrapers(sub)?;
            let max_days = match sub.value_of("max-days") {
                Some(n) => Some(n.parse::<usize>().with_context(|| format!("invalid --max-days {}", n))?),
                None => None,
            };

            let mut tracker = DateTracker::new(&config)?;
            let session = SessionClient::new(&config)?;
            let service = SyncService::new(scrapers);

            let outcomes = service.sync_until_current(&mut tracker, &session, max_days)?;
            for outcome in &outcomes {
                for file in &outcome.files {
                    println!("{} {}", outcome.date, file.display());
                }
            }
            session.close();
        }
        Some(("fetch", sub)) => {
            let config = build_config(sub)?;
            let url = sub.value_of("url").context("missing url")?;
            let params = parse_params(sub)?;
            let param_refs: Vec<(&str, &str)> =
                params.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect();
            let timeout = match sub.value_of("timeout") {
                Some(secs) => Some(Duration::from_secs(
                    secs.parse::<u64>().with_context(|| format!("invalid --timeout {}", secs))?,
                )),
                None => None,
            };

            let session = SessionClient::new(&config)?;
            let params = if param_refs.is_empty() { None } else { Some(param_refs.as_slice()) };

            match session.request(url, params, !sub.is_present("raw"), timeout)? {
                Payload::Json(json) => println!("{}", serde_json::to_string_pretty::<Value>(&json)?),
                Payload::Raw(mut response) => {
                    io::copy(&mut response, &mut io::stdout().lock())?;
                }
            }
            session.close();
        }
        Some(("download", sub)) => {
            let config = build_config(sub)?;
            let url = sub.value_of("url").context("missing url")?;

            let session = SessionClient::new(&config)?;
            let path = session.download(url)?;
            println!("{}", path.display());
            session.close();
        }
        _ => {
            info!("No command specified. Use --help for usage information.");
        }
    }

    Ok(())
}

fn build_scrapers(matches: &ArgMatches) -> anyhow::Result<Vec<Box<dyn EodScraper>>> {
    if let Some(templates) = matches.values_of("url-template") {
        return Ok(templates
            .enumerate()
            .map(|(i, t)| Box::new(NseArchive::new(&format!("CUSTOM-{}", i + 1), t)) as Box<dyn EodScraper>)
            .collect());
    }

    let archive = matches.value_of("archive").unwrap_or("equity");
    let scrapers: Vec<Box<dyn EodScraper>> = match archive.to_lowercase().as_str() {
        "equity" => vec![Box::new(NseArchive::equity_bhavcopy())],
        "delivery" => vec![Box::new(NseArchive::delivery_report())],
        "all" => vec![
            Box::new(NseArchive::equity_bhavcopy()),
            Box::new(NseArchive::delivery_report()),
        ],
        _ => bail!("Unknown archive: {}", archive),
    };
    Ok(scrapers)
}

fn parse_params(matches: &ArgMatches) -> anyhow::Result<Vec<(String, String)>> {
    let mut params = Vec::new();
    if let Some(values) = matches.values_of("param") {
        for value in values {
            let (key, val) = value
                .split_once('=')
                .with_context(|| format!("query parameter {:?} is not KEY=VALUE", value))?;
            params.push((key.to_string(), val.to_string()));
        }
    }
    Ok(params)
}
