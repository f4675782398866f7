use std::{path::PathBuf, process::ExitCode};

use clap::Parser;
use serde_json::json;
use tracing::{error, info};
use tubelink::{
  common::{logger, types::AnyResult},
  configs::Config,
  sources::youtube::{ResolveError, ResolvedStream, StreamResolver, normalize_identifier},
};

#[derive(Parser, Debug)]
#[command(name = "tubelink", version)]
#[command(about = "Resolve video identifiers into playable stream URLs", long_about = None)]
struct Args {
  /// Video ids or watch URLs
  #[arg(required = true)]
  identifiers: Vec<String>,

  /// Config file (defaults to config.toml, then config.default.toml)
  #[arg(short, long, env = "TUBELINK_CONFIG")]
  config: Option<PathBuf>,

  /// Only list these itags, comma-separated
  #[arg(long, value_delimiter = ',')]
  itag: Vec<String>,

  /// Print the listing as JSON
  #[arg(long)]
  json: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
  let args = Args::parse();

  match run(args).await {
    Ok(true) => ExitCode::SUCCESS,
    Ok(false) => ExitCode::FAILURE,
    Err(e) => {
      eprintln!("tubelink: {}", e);
      ExitCode::FAILURE
    }
  }
}

/// Resolves every identifier in turn. `Ok(false)` when any of them failed.
async fn run(args: Args) -> AnyResult<bool> {
  let config = Config::load(args.config.as_deref())?;
  logger::init(&config.logging)?;

  let resolver = StreamResolver::from_config(config.youtube)?;
  let mut all_resolved = true;

  for input in &args.identifiers {
    match resolve_one(&resolver, input).await {
      Ok(mut streams) => {
        retain_itags(&mut streams, &args.itag);
        print_streams(input, &streams, args.json)?;
      }
      Err(e) => {
        error!("Failed to resolve {}: {}", input, e);
        eprintln!("{}: {}", input, e);
        all_resolved = false;
      }
    }
  }

  Ok(all_resolved)
}

async fn resolve_one(
  resolver: &StreamResolver,
  input: &str,
) -> Result<Vec<ResolvedStream>, ResolveError> {
  let video_id = normalize_identifier(input)?;
  info!("Resolving {}", video_id);
  resolver.resolve(&video_id).await
}

/// Keeps only the preferred itags; an empty list keeps everything.
fn retain_itags(streams: &mut Vec<ResolvedStream>, itags: &[String]) {
  if !itags.is_empty() {
    streams.retain(|s| itags.contains(&s.itag));
  }
}

fn print_streams(input: &str, streams: &[ResolvedStream], as_json: bool) -> AnyResult<()> {
  if as_json {
    let doc = json!({ "identifier": input, "streams": streams });
    println!("{}", serde_json::to_string_pretty(&doc)?);
    return Ok(());
  }

  for stream in streams {
    println!("{}\n\t{}", stream.label, stream.url);
  }
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;

  fn stream(itag: &str) -> ResolvedStream {
    ResolvedStream {
      itag: itag.to_string(),
      title: "T".to_string(),
      url: format!("https://r.example/{}", itag),
      extension: "mp4".to_string(),
      quality: None,
      label: format!("{} - mp4", itag),
    }
  }

  fn itags(streams: &[ResolvedStream]) -> Vec<&str> {
    streams.iter().map(|s| s.itag.as_str()).collect()
  }

  #[test]
  fn itag_filter_keeps_listing_order() {
    let mut streams = vec![stream("22"), stream("18"), stream("137")];
    retain_itags(&mut streams, &["137".to_string(), "22".to_string()]);
    assert_eq!(itags(&streams), vec!["22", "137"]);
  }

  #[test]
  fn empty_itag_filter_keeps_everything() {
    let mut streams = vec![stream("22"), stream("18")];
    retain_itags(&mut streams, &[]);
    assert_eq!(itags(&streams), vec!["22", "18"]);
  }

  #[test]
  fn itag_list_splits_on_commas() {
    let args = Args::try_parse_from(["tubelink", "--itag", "22,18", "abc123"]).unwrap();
    assert_eq!(args.itag, vec!["22", "18"]);
    assert_eq!(args.identifiers, vec!["abc123"]);
  }
}
