use chrono::{Duration, NaiveDate, Utc};
use jobharvest::{Config, sources};

fn parse_date(arg: Option<String>, default: NaiveDate) -> NaiveDate {
    arg.and_then(|s| NaiveDate::parse_from_str(&s, "%Y-%m-%d").ok())
        .unwrap_or(default)
}

// Usage: cargo run --example crawl -- <djinni|dou> [START] [END]
#[tokio::main]
async fn main() {
    env_logger::init();

    let mut args = std::env::args().skip(1);
    let source = args.next().unwrap_or_else(|| "djinni".to_owned());
    let yesterday = Utc::now().date_naive() - Duration::days(1);
    let start = parse_date(args.next(), yesterday);
    let end = parse_date(args.next(), yesterday);

    let config = Config::default();
    let parser = match sources::by_name(&source, &config) {
        Some(parser) => parser,
        None => {
            eprintln!("unknown source: {}", source);
            std::process::exit(2);
        }
    };

    let harvester = jobharvest::harvester_with_config(config, parser);
    let stop = harvester.stop_handle();
    ctrlc::set_handler(move || {
        stop.stop();
    })
    .unwrap();

    match harvester.run_crawl(start, end).await {
        Ok(postings) => {
            for posting in &postings {
                println!("{}", serde_json::to_string(posting).unwrap());
            }
            eprintln!("{} postings", postings.len());
        }
        Err(e) => {
            eprintln!("crawl failed: {}", e);
            std::process::exit(1);
        }
    }
}
