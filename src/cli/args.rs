use clap::Parser;

/*-------------------------------------------------------------------------------------------------
  Command Line Interface (CLI) Arguments
-------------------------------------------------------------------------------------------------*/

#[derive(Parser, Debug)]
#[command(author, version, about="Resolve IP addresses to the AWS region and service that announced them.", long_about = None)]
pub struct Args {
    /// Match prefixes published under this AWS service tag
    #[arg(short = 's', long, default_value = "AMAZON")]
    pub service: String,

    /// URL used to retrieve the AWS IP Ranges JSON document
    #[arg(short = 'u', long)]
    pub url: Option<String>,

    /// Logging verbosity
    #[command(flatten)]
    pub verbose: clap_verbosity_flag::Verbosity,

    /// IP addresses to resolve
    #[arg(required = true)]
    pub addresses: Vec<String>,
}
