//TODO: update clap to remove the need for this
#![allow(dangerous_implicit_autorefs)]

use anyhow::{anyhow, bail, Context};
use clap::{
    crate_authors, crate_description, crate_name, crate_version, App, AppSettings, Arg, ArgMatches,
    SubCommand,
};
use pbo::{create, extract, list, verify, CreateOptions, Entry, ExtractOptions, ReadOptions};

fn value<'a>(matches: &'a ArgMatches, name: &str) -> anyhow::Result<&'a str> {
    matches
        .value_of(name)
        .ok_or_else(|| anyhow!("missing argument '{}'", name))
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let arg_archive = Arg::with_name("archive")
        .help("Archive file")
        .short("a")
        .long("archive")
        .required(true)
        .takes_value(true)
        .value_name("FILE");

    let arg_signed = Arg::with_name("signed")
        .help("Fail when the archive signature does not match")
        .long("signed");

    let matches = App::new(crate_name!())
        .author(crate_authors!(", "))
        .about(crate_description!())
        .version(crate_version!())
        .setting(AppSettings::SubcommandRequiredElseHelp)
        .subcommand(
            SubCommand::with_name("create")
                .about("Create archive")
                .arg(&arg_archive)
                .arg(
                    Arg::with_name("no-overwrite")
                        .help("Fail if the archive already exists")
                        .long("no-overwrite"),
                )
                .arg(
                    Arg::with_name("files")
                        .help("Files and directories to pack")
                        .required(true)
                        .multiple(true)
                        .value_name("FILES"),
                ),
        )
        .subcommand(
            SubCommand::with_name("extract")
                .about("Extract archive")
                .arg(&arg_archive)
                .arg(&arg_signed)
                .arg(
                    Arg::with_name("basedir")
                        .help("Directory to unpack to (defaults to '.')")
                        .required(true)
                        .value_name("DIR")
                        .default_value("."),
                ),
        )
        .subcommand(
            SubCommand::with_name("list")
                .about("List archive")
                .arg(&arg_archive)
                .arg(&arg_signed),
        )
        .subcommand(
            SubCommand::with_name("verify")
                .about("Verify archive signature")
                .arg(&arg_archive),
        )
        .get_matches();

    if let Some(matches) = matches.subcommand_matches("create") {
        let options = CreateOptions {
            overwrite: !matches.is_present("no-overwrite"),
            ..CreateOptions::default()
        };
        let files: Vec<&str> = matches.values_of("files").into_iter().flatten().collect();
        let digest = create(value(matches, "archive")?, files, options)?;
        println!("{}", hex::encode(digest));
    } else if let Some(matches) = matches.subcommand_matches("extract") {
        let options = ExtractOptions {
            signed: matches.is_present("signed"),
        };
        let report = extract(value(matches, "archive")?, value(matches, "basedir")?, options)?;
        if !report.failed.is_empty() {
            bail!("{} entries could not be extracted", report.failed.len());
        }
    } else if let Some(matches) = matches.subcommand_matches("list") {
        let options = ReadOptions {
            signed: matches.is_present("signed"),
        };
        let archive = list(value(matches, "archive")?, options)?;
        if let Some(header) = archive.header() {
            for (key, val) in header.properties() {
                println!("{}={}", key, val);
            }
        }
        for entry in archive.entries() {
            if let Entry::File(file) = entry {
                let record = file.record();
                println!(
                    "{}\t{}\t{}\t{:?}",
                    String::from_utf8_lossy(file.path_bytes()),
                    record.data_size,
                    record.timestamp,
                    record.packing_method
                );
            }
        }
    } else if let Some(matches) = matches.subcommand_matches("verify") {
        let archive = value(matches, "archive")?;
        let digest = verify(archive).with_context(|| format!("verifying {}", archive))?;
        println!("{}", hex::encode(digest));
    }
    Ok(())
}
