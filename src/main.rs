use anyhow::{bail, Result};
use netprep::{merge_keywords_from_env, DateRange, Platform, Preprocessor};
use std::path::PathBuf;

const OUTPUT_ROOT: &str = "./Data";
const DATE_START: &str = "2024-06-25";
const DATE_END: &str = "2024-07-03"; // exclusive
const SEARCH_TERMS: &[&str] = &["biden", "debate", "trump"];

const USAGE: &str = "usage: netprep <mastodon|bluesky|reblogs> [data_dir] [output_dir]";

fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some(command) = args.first() else { bail!(USAGE) };

    let mut keywords: Vec<String> = SEARCH_TERMS.iter().map(|s| s.to_string()).collect();
    merge_keywords_from_env(&mut keywords);

    let (platform, enrich) = match command.as_str() {
        "reblogs" => (Platform::Mastodon, true),
        other => match other.parse::<Platform>() {
            Ok(p) => (p, false),
            Err(e) => bail!("{e}\n{USAGE}"),
        },
    };

    let data_dir = args
        .get(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("./data").join(platform.as_str()));
    let output_dir = args.get(2).map(PathBuf::from).unwrap_or_else(|| PathBuf::from(OUTPUT_ROOT));
    let hw = std::thread::available_parallelism().map(|n| n.get()).unwrap_or(4);

    let pre = Preprocessor::new(platform)
        .data_dir(&data_dir)
        .output_dir(&output_dir)
        .date_range(DateRange::parse(DATE_START, DATE_END)?)
        .keywords(&keywords)
        .parallelism(hw)
        .file_concurrency(hw.min(4))
        .progress(true)
        .progress_label(format!("Scanning {platform}"));

    if enrich {
        let token = std::env::var("MASTODON_ACCESS_TOKEN").ok().filter(|t| !t.trim().is_empty());
        let report = pre.enrich_reblogs(token)?;
        println!(
            "Collected reblogs for {} statuses ({} problematic, {} rate-limit waits)",
            report.reblogs.len(),
            report.problematic.len(),
            report.rate_limit_waits
        );
        return Ok(());
    }

    let report = pre.run()?;
    println!(
        "Wrote {} rows to {} ({} rejected, {} duplicates, {} outside window)",
        report.rows_written,
        report.output.display(),
        report.rejected,
        report.duplicates,
        report.out_of_window
    );
    if let Some(h) = &report.hydration {
        println!("Hydrated {} of {} repost events", h.matched, h.events);
    }
    Ok(())
}
