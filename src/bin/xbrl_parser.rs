use anyhow::Result;
use serde::Serialize;
use structopt::StructOpt;
use xbrl_qa::edgar::parsing::{parse_document, RawFact};
use xbrl_qa::normalize::{resolve_contexts, ContextTable};

#[derive(StructOpt, Debug)]
#[structopt(name = "xbrl-parser", about = "Dump the facts and contexts of an XBRL instance")]
struct Opt {
    /// Input file to parse
    #[structopt(parse(from_os_str))]
    input: std::path::PathBuf,
}

#[derive(Serialize)]
struct Dump {
    facts: Vec<RawFact>,
    contexts: ContextTable,
}

fn main() -> Result<()> {
    env_logger::init();
    let opt = Opt::from_args();

    // Ensure input file exists
    if !opt.input.exists() {
        eprintln!("Input file does not exist: {:?}", opt.input);
        std::process::exit(1);
    }

    let content = std::fs::read_to_string(&opt.input)?;
    match parse_document(&content) {
        Ok(document) => {
            let dump = Dump {
                contexts: resolve_contexts(&document.periods),
                facts: document.facts,
            };
            println!("{}", serde_json::to_string_pretty(&dump)?);
            Ok(())
        }
        Err(e) => {
            eprintln!("Error parsing XBRL file: {:#}", e);
            std::process::exit(1);
        }
    }
}
