use clap::Subcommand;

#[derive(Subcommand)]
pub enum Commands {
    /// Read every result row of a bulk job and route it to the outputs
    Drain {
        #[arg(long, help = "Reader settings file (JSON)")]
        settings: String,

        #[arg(long, help = "Schema file: a JSON array of {name, type, nullable}")]
        schema: String,

        #[arg(long, help = "Directory holding the batch_<n>.csv result logs")]
        results: String,

        #[arg(long, help = "If specified, writes accepted rows to this JSON-lines file")]
        accepted: Option<String>,

        #[arg(long, help = "If specified, writes rejected rows to this JSON-lines file")]
        rejected: Option<String>,
    },
}
