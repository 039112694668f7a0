use anyhow::Context;
use clap::Parser;
use corpus_dataset::{decode_record, IndexCatalog, StoreEnv};
use serde::Serialize;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "corpus_inspect",
    about = "Report the contents of a packed image corpus store"
)]
struct Args {
    /// Store path (directory containing corpus.pack, or the file itself).
    store: PathBuf,
    /// Number of keys to list from the front of the catalog.
    #[arg(long, default_value_t = 8)]
    keys: usize,
    /// Decode the record at this index to check it is readable.
    #[arg(long)]
    probe: Option<usize>,
}

#[derive(Serialize)]
struct Report {
    store: String,
    entries: usize,
    count: usize,
    first_keys: Vec<String>,
    probe: Option<ProbeReport>,
}

#[derive(Serialize)]
struct ProbeReport {
    index: usize,
    encoded_bytes: usize,
    label: i64,
    width: u32,
    height: u32,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let env = StoreEnv::open(&args.store)
        .with_context(|| format!("opening store {}", args.store.display()))?;
    let catalog = IndexCatalog::build(&env).context("recovering the index catalog")?;

    let first_keys = catalog
        .keys()
        .iter()
        .take(args.keys)
        .map(|k| String::from_utf8_lossy(k).into_owned())
        .collect();

    let probe = match args.probe {
        None => None,
        Some(index) => {
            let key = catalog
                .key(index)
                .with_context(|| format!("index {index} out of range ({})", catalog.count()))?;
            let txn = env.begin_read();
            let raw = txn
                .get(key)
                .with_context(|| format!("no record for key {}", String::from_utf8_lossy(key)))?;
            let record = decode_record(raw)?;
            let img = image::load_from_memory(&record.image_bytes)
                .with_context(|| format!("decoding image at index {index}"))?
                .to_rgb8();
            Some(ProbeReport {
                index,
                encoded_bytes: record.image_bytes.len(),
                label: record.label,
                width: img.width(),
                height: img.height(),
            })
        }
    };

    let report = Report {
        store: args.store.display().to_string(),
        entries: env.entry_count(),
        count: catalog.count(),
        first_keys,
        probe,
    };
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
