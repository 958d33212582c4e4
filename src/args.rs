use clap::Parser;

/// This is an election dataset validator and incremental vote tabulator.
#[derive(Parser, Debug, Clone)]
#[clap(author, version, about, long_about = None)]
pub struct Args {
    /// (file path, optional) A tabulation config in JSON format listing the inputs of the run.
    /// The paths inside are relative to the directory of the config file. Any path given on
    /// the command line overrides the one of the config.
    #[clap(short, long, value_parser)]
    pub config: Option<String>,

    /// (file path) The jurisdiction definition in JSON format.
    #[clap(short, long, value_parser)]
    pub jurisdiction: Option<String>,

    /// (file path) The election definition in JSON format.
    #[clap(short, long, value_parser)]
    pub election: Option<String>,

    /// (file path, optional) A previously saved tabulation state. When given, the definitions
    /// are taken from this state and the --jurisdiction and --election options are ignored.
    #[clap(short, long, value_parser)]
    pub state: Option<String>,

    /// (file paths, can be repeated) The counter counts to add, in this order.
    #[clap(long, value_parser)]
    pub counts: Vec<String>,

    /// (file path, 'stdout' or empty) If specified, the tabulation state will be written in
    /// JSON format to the given location.
    #[clap(short, long, value_parser)]
    pub out: Option<String>,

    /// (file path) A reference file containing the expected summary in JSON format. If provided,
    /// vtab will check that the computed summary matches the reference.
    #[clap(short, long, value_parser)]
    pub reference: Option<String>,

    // Other arguments
    /// If passed as an argument, will turn on verbose logging to the standard output.
    #[clap(long, takes_value = false)]
    pub verbose: bool,
}
