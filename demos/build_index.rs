//! Build a small geolocation index in memory and look a few addresses up.
//!
//! Run with: `cargo run --example build_index`
//!
//! A tight node budget forces several tree levels so the lookup has to walk
//! branches before reaching a leaf.

use std::sync::Arc;

use geo_range_index::{
    Assembler, AssemblerConfig, CountryTable, Entry, IpBlock, LocationRow, MemoryBlockStore, Node,
    Normalizer, StoredNode,
};
use metrics_util::debugging::{DebugValue, DebuggingRecorder, Snapshotter};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();
    recorder.install().expect("failed to install metrics recorder");

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "geo_range_index=info".into()),
        )
        .with_target(false)
        .compact()
        .init();

    let countries: CountryTable = [
        ("AD", "Andorra"),
        ("AE", "United Arab Emirates"),
        ("AF", "Afghanistan"),
        ("AG", "Antigua And Barbuda"),
    ]
    .into_iter()
    .collect();

    let codes = [("AD", 42.5, 1.5), ("AE", 24.0, 54.0), ("AF", 33.0, 65.0), ("AG", 17.05, -61.8)];
    let normalizer = Normalizer::from_rows(
        codes.iter().enumerate().map(|(i, (code, latitude, longitude))| {
            let row = LocationRow {
                country_code: code.to_string(),
                city: format!("City {}", i),
                latitude: *latitude,
                longitude: *longitude,
                ..Default::default()
            };
            (i as u32 + 1, row)
        }),
        &countries,
    );

    // 2000 /24 blocks starting at 1.0.0.0, every seventh one missing
    let blocks: Vec<IpBlock> = (0..2000u64)
        .filter(|i| i % 7 != 6)
        .map(|i| {
            let start = 16_777_216 + i * 256;
            IpBlock::new(start, start + 255, (i % 4) as u32 + 1)
        })
        .collect();

    let store = Arc::new(MemoryBlockStore::new());
    let config = AssemblerConfig {
        max_node_bytes: 4 * 1024,
        ..Default::default()
    };
    let assembler = Assembler::new(config, store.clone())?;

    let root = assembler.assemble_blocks(&normalizer, blocks).await?;
    println!("\nroot {} ({} bytes, {} objects stored)\n", root.address, root.size, store.len());

    for ip in ["1.0.0.1", "1.0.6.200", "1.2.3.4", "1.7.208.0", "9.9.9.9"] {
        let key = ipv4_key(ip)?;
        match lookup(&store, &root, key)? {
            Some(entry) => match entry.data.record() {
                Some(record) => println!("{:>12} → {} ({})", ip, record.country, record.city),
                None => println!("{:>12} → no data", ip),
            },
            None => println!("{:>12} → below first range", ip),
        }
    }

    println!("\nmetrics:");
    dump_metrics(&snapshotter);
    Ok(())
}

fn ipv4_key(ip: &str) -> Result<u64, std::net::AddrParseError> {
    let addr: std::net::Ipv4Addr = ip.parse()?;
    Ok(u64::from(u32::from(addr)))
}

/// Descend from `root` to the entry whose range holds `key`.
fn lookup(
    store: &MemoryBlockStore,
    root: &StoredNode,
    key: u64,
) -> Result<Option<Entry>, Box<dyn std::error::Error>> {
    let mut current = root.clone();
    loop {
        let bytes = store
            .get(&current.address)
            .ok_or_else(|| format!("{} missing from store", current.address))?;
        match Node::decode(&bytes)? {
            Node::Branch { children } => {
                let index = children.partition_point(|child| child.start <= key);
                let Some(child) = index.checked_sub(1).map(|i| children[i].clone()) else {
                    return Ok(None);
                };
                current = child;
            }
            Node::Leaf { entries } => {
                let index = entries.partition_point(|entry| entry.start <= key);
                return Ok(index.checked_sub(1).map(|i| entries[i].clone()));
            }
        }
    }
}

fn dump_metrics(snapshotter: &Snapshotter) {
    let mut lines = Vec::new();
    for (composite_key, _, _, value) in snapshotter.snapshot().into_vec() {
        let (_, key) = composite_key.into_parts();
        let labels: Vec<_> = key.labels().map(|l| format!("{}={}", l.key(), l.value())).collect();
        let label_str = if labels.is_empty() { String::new() } else { format!("{{{}}}", labels.join(",")) };

        let rendered = match value {
            DebugValue::Counter(v) => format!("{}", v),
            DebugValue::Gauge(v) => format!("{:.2}", v.into_inner()),
            DebugValue::Histogram(samples) => {
                let count = samples.len();
                let sum: f64 = samples.iter().map(|v| v.into_inner()).sum();
                format!("count={} avg={:.2}", count, sum / count.max(1) as f64)
            }
        };
        lines.push(format!("   {}{} = {}", key.name(), label_str, rendered));
    }

    lines.sort();
    for line in lines {
        println!("{}", line);
    }
}
