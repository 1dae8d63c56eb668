use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};

pub fn parse_args() -> ArgMatches {
    Command::new("tilt-tone")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Audible level feedback through an ordered tone queue.")
        .subcommand_required(true)
        .arg(
            Arg::new("device")
                .short('d')
                .long("device")
                .default_value("default")
                .help("Output device, matched by name. `default` uses the host default."),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .action(ArgAction::SetTrue)
                .help("Log queue and worker activity."),
        )
        .subcommands([
            Command::new("play")
                .alias("p")
                .about("Plays a tone sequence.")
                .arg(
                    Arg::new("sequence")
                        .required(true)
                        .help("`freq;ms` segments separated by commas or newlines, `0;ms` is a pause. Example: `440;300,0;100,261.63;200,293.66;200`"),
                ),
            Command::new("notes")
                .alias("n")
                .about("Plays the C major scale.")
                .arg(
                    Arg::new("duration")
                        .long("duration")
                        .value_parser(value_parser!(u32))
                        .default_value("300")
                        .help("Length of each note in ms."),
                )
                .arg(
                    Arg::new("octave")
                        .long("octave")
                        .value_parser(value_parser!(i32).range(-3..=3))
                        .default_value("0")
                        .help("Octaves to shift the scale by."),
                ),
            Command::new("tilt")
                .alias("t")
                .about("Feeds simulated tilt readings through the level feedback.")
                .arg(
                    Arg::new("seconds")
                        .long("seconds")
                        .value_parser(value_parser!(u64))
                        .default_value("20"),
                )
                .arg(
                    Arg::new("interval")
                        .long("interval")
                        .value_parser(value_parser!(u64))
                        .default_value("50")
                        .help("Time between readings in ms."),
                )
                .arg(
                    Arg::new("tolerance")
                        .long("tolerance")
                        .value_parser(value_parser!(f32))
                        .default_value("2.0")
                        .help("Degrees either side of zero that count as level."),
                )
                .arg(
                    Arg::new("seed")
                        .long("seed")
                        .value_parser(value_parser!(u64))
                        .help("Seed for the simulated readings."),
                )
                .arg(
                    Arg::new("zero")
                        .long("zero")
                        .action(ArgAction::SetTrue)
                        .help("Treat the first reading as level."),
                ),
            Command::new("devices").about("Lists output devices."),
        ])
        .get_matches()
}
