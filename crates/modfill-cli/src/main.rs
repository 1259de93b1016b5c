use clap::{Arg, Command, ValueHint};
use modfill_cli::input::Input;
use modfill_cli::runner::Runner;

fn main() -> anyhow::Result<()> {
    env_logger::Builder::default()
        .filter_level(log::LevelFilter::Error)
        .parse_env(env_logger::Env::default().filter_or("MODFILL_LOG", "error,modfill=info"))
        .init();

    let matches = Command::new("modfill")
        .version(clap::crate_version!())
        .author("The modfill developers")
        .about("Predict modifications, localizations and USIs for an MS2 QC table")
        .arg(
            Arg::new("parameters")
                .required(true)
                .value_parser(clap::builder::NonEmptyStringValueParser::new())
                .help("Path to configuration parameters (JSON file)")
                .value_hint(ValueHint::FilePath),
        )
        .arg(
            Arg::new("table")
                .short('t')
                .long("table")
                .value_parser(clap::builder::NonEmptyStringValueParser::new())
                .help(
                    "Path to the MS2 table (CSV). Overrides the table \
                     specified in the configuration file.",
                )
                .value_hint(ValueHint::FilePath),
        )
        .arg(
            Arg::new("spectra")
                .short('s')
                .long("spectra")
                .value_parser(clap::builder::NonEmptyStringValueParser::new())
                .help(
                    "Path to the MS2 spectra (JSON). Overrides the spectra \
                     specified in the configuration file.",
                )
                .value_hint(ValueHint::FilePath),
        )
        .arg(
            Arg::new("sequence")
                .long("sequence")
                .value_parser(clap::builder::NonEmptyStringValueParser::new())
                .help(
                    "Sequence of the synthetic peptide, including any bracketed tags, \
                     e.g. LTLPAKWER[Label:13C(6)15N(4)]",
                )
                .value_hint(ValueHint::Other),
        )
        .arg(
            Arg::new("unimod")
                .short('u')
                .long("unimod")
                .value_parser(clap::builder::NonEmptyStringValueParser::new())
                .help(
                    "Path (or URL, with the `http` feature) of the Unimod OBO file. \
                     Overrides the source specified in the configuration file.",
                )
                .value_hint(ValueHint::FilePath),
        )
        .arg(
            Arg::new("scan")
                .long("scan")
                .value_parser(clap::value_parser!(usize))
                .help(
                    "Report the resolution and every matched fragment ion of this \
                     scan at `info` level",
                )
                .value_hint(ValueHint::Other),
        )
        .arg(
            Arg::new("output_directory")
                .short('o')
                .long("output_directory")
                .value_parser(clap::builder::NonEmptyStringValueParser::new())
                .help(
                    "Path where the autofilled table will be written. \
                     Overrides the directory specified in the configuration file.",
                )
                .value_hint(ValueHint::DirPath),
        )
        .help_template(
            "{usage-heading} {usage}\n\n\
             {about-with-newline}\n\
             Written by {author-with-newline}Version {version}\n\n\
             {all-args}{after-help}",
        )
        .get_matches();

    let input = Input::from_arguments(matches)?;

    let runner = input.build().and_then(Runner::new)?;
    runner.run()?;

    Ok(())
}
