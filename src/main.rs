use std::fs::File;
use std::io::{BufReader, Cursor};

use bruin_index::record::{load, MemoryRecordStore, RecordStore};
use bruin_index::{OpenMode, TreeIndex};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const SAMPLE: &str = "\
272, 'Baby Take a Bow'
2244, 'Godfather, The'
1074, 'Blade Runner'
3022, \"Sleepless in Seattle\"
51, 'Airplane!'
1578, 'Dracula'
2965, 'Silence of the Lambs, The'
4734, 'Zoolander'
";

fn init_logging() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry().with(env_filter).with(fmt::layer()).init();
}

fn main() {
    init_logging();

    println!("Bruin Index - a disk-resident B+Tree in Rust");
    println!("============================================\n");

    let index_path = std::env::temp_dir().join(format!("bruin-index-{}.idx", std::process::id()));
    let mut records = MemoryRecordStore::new();
    let mut index =
        TreeIndex::open(&index_path, OpenMode::ReadWrite).expect("Failed to create index");
    println!("Created index at: {}", index_path.display());

    let loaded = match std::env::args().nth(1) {
        Some(path) => {
            let file = File::open(&path).expect("Failed to open load file");
            load(BufReader::new(file), &mut records, Some(&mut index))
        }
        None => load(Cursor::new(SAMPLE), &mut records, Some(&mut index)),
    }
    .expect("Failed to load records");

    println!("Loaded {} records", loaded);
    println!("  - Tree height: {}", index.height());
    println!("  - Root page: {}", index.root_page_id());
    println!("  - Pages allocated: {}", index.next_page_id().as_i32());

    index.close().expect("Failed to close index");

    // Reopen read-only and scan a key range
    let index = TreeIndex::open(&index_path, OpenMode::ReadOnly).expect("Failed to reopen index");
    println!("\nKeys between 1000 and 3000:");
    for entry in index.scan(1000..=3000).expect("Failed to start scan") {
        let (key, rid) = entry.expect("Failed to read index entry");
        let (_, value) = records.read(rid).expect("Record missing");
        println!("  - {} {:?} at {}", key, value, rid);
    }

    if let Some(rid) = index.get(51).expect("Lookup failed") {
        println!("\nPoint lookup 51 -> {}", rid);
    }

    index.close().expect("Failed to close index");
    std::fs::remove_file(&index_path).ok();
    println!("\nDemo completed successfully!");
}
