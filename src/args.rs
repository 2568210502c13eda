use clap::Parser;

/// This is a preferential voting tabulation program.
#[derive(Parser, Debug, Clone)]
#[clap(author, version, about, long_about = None)]
pub struct Args {
    /// (file path) The file containing the votes of the election, one JSON vote record per line.
    #[clap(short, long, value_parser)]
    pub votes: String,

    /// (list of comma-separated values or not specified) The candidates of the race. If not
    /// specified, the slate is inferred from the candidates the votes mention.
    #[clap(short, long, value_parser, use_value_delimiter = true)]
    pub candidates: Option<Vec<String>>,

    /// The name of the race being tallied.
    #[clap(long, value_parser, default_value = "race")]
    pub race: String,

    /// The evaluation method: plurality, copeland, irv, borda, runoff or single_round.
    #[clap(short, long, value_parser, default_value = "runoff")]
    pub method: String,

    /// (file path, optional) Carry-over file holding the unspent-weight shadow votes of past
    /// elections. Shadow votes of voters present in this election are merged into the tally.
    #[clap(short, long, value_parser)]
    pub unspent: Option<String>,

    /// (file path, optional) Default-votes file. A voter with a default vote on file who is
    /// missing from the votes file is counted as having cast their default.
    #[clap(short, long, value_parser)]
    pub defaults: Option<String>,

    /// (repeatable) A candidate suggested on top of the slate, by name.
    #[clap(long, value_parser)]
    pub suggest: Vec<String>,

    /// (repeatable, format "voter:A>B>C") A ranked submission applied after the votes file is
    /// read, replacing the voter's vote. Candidate names may be unambiguous shorthands.
    #[clap(long, value_parser)]
    pub rank: Vec<String>,

    /// (repeatable, format "voter:candidate=rating") A rating amendment applied after the votes
    /// file is read.
    #[clap(long, value_parser)]
    pub rate: Vec<String>,

    /// (repeatable, format "voter:candidate") A veto toggle applied after the votes file is read.
    #[clap(long, value_parser)]
    pub veto: Vec<String>,

    /// (repeatable) After all amendments, store this voter's ballot in the default-votes file.
    #[clap(long, value_parser)]
    pub save_default: Vec<String>,

    /// (repeatable) Remove this voter's ballot from the default-votes file.
    #[clap(long, value_parser)]
    pub clear_default: Vec<String>,

    /// If passed as an argument, the unspent weight of this election is folded back into the
    /// carry-over file after tallying. Requires --unspent and a single winner.
    #[clap(long, takes_value = false)]
    pub record_unspent: bool,

    /// (file path or empty) If specified, the summary of the election will be written in JSON
    /// format to the given location instead of the standard output.
    #[clap(short, long, value_parser)]
    pub out: Option<String>,

    // Other arguments
    /// If passed as an argument, will turn on verbose logging to the standard output.
    #[clap(long, takes_value = false)]
    pub verbose: bool,
}
