//! Collects the files to transfer and the request headers from CLI input.

use std::io::{self, IsTerminal, Read};

use anyhow::{Context, Result, bail};
use rangefetch_core::{ResolvedFile, extract_urls, load_manifest};
use reqwest::header::{COOKIE, HeaderMap, HeaderName, HeaderValue, REFERER, USER_AGENT};
use tracing::{debug, warn};

use crate::cli::Args;

/// Files to transfer, in the order given.
pub(crate) fn collect_files(args: &Args) -> Result<Vec<ResolvedFile>> {
    if let Some(manifest) = &args.manifest {
        return load_manifest(manifest)
            .with_context(|| format!("Failed to load manifest '{}'", manifest.display()));
    }

    let input_text = if !args.urls.is_empty() {
        args.urls.join("\n")
    } else if !io::stdin().is_terminal() {
        let mut buffer = String::new();
        io::stdin()
            .read_to_string(&mut buffer)
            .context("Failed to read URLs from stdin")?;
        buffer
    } else {
        String::new()
    };

    Ok(files_from_text(&input_text))
}

/// Extracts URLs from free text, skipping invalid ones with a warning.
pub(crate) fn files_from_text(input_text: &str) -> Vec<ResolvedFile> {
    extract_urls(input_text)
        .into_iter()
        .filter_map(|result| match result {
            Ok(url) => {
                debug!(url = %url, "queued URL");
                Some(ResolvedFile::from_url(url))
            }
            Err(error) => {
                warn!(error = %error, "skipping invalid URL");
                None
            }
        })
        .collect()
}

/// Builds the request headers from `-H` and the identity flags.
///
/// `--user-agent`, `--referer` and `--cookie` override the same header given
/// with `-H`.
pub(crate) fn build_headers(args: &Args) -> Result<HeaderMap> {
    let mut headers = HeaderMap::new();

    for raw in &args.headers {
        let Some((name, value)) = raw.split_once(':') else {
            bail!("Invalid header '{raw}'\n  Suggestion: Use the form \"Name: Value\"");
        };
        let name = HeaderName::from_bytes(name.trim().as_bytes())
            .with_context(|| format!("Invalid header name in '{raw}'"))?;
        let value = HeaderValue::from_str(value.trim())
            .with_context(|| format!("Invalid header value in '{raw}'"))?;
        headers.append(name, value);
    }

    for (name, value) in [
        (USER_AGENT, &args.user_agent),
        (REFERER, &args.referer),
        (COOKIE, &args.cookie),
    ] {
        if let Some(value) = value {
            let value = HeaderValue::from_str(value)
                .with_context(|| format!("Invalid {name} value '{value}'"))?;
            headers.insert(name, value);
        }
    }

    Ok(headers)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_files_from_text_skips_noise() {
        let files = files_from_text("get https://a.example/x.bin\nand www.b.example/y.zip\nftp://c/z");
        let urls: Vec<_> = files.iter().map(|f| f.download_url.as_str()).collect();
        assert_eq!(urls, vec!["https://a.example/x.bin", "https://www.b.example/y.zip"]);
        assert!(files.iter().all(|f| f.preferred_name().is_none()));
    }

    #[test]
    fn test_collect_files_from_positional_urls() {
        let args = Args::try_parse_from(["rangefetch", "https://a.example/1.bin"]).unwrap();
        let files = collect_files(&args).unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].download_url, "https://a.example/1.bin");
    }

    #[test]
    fn test_build_headers_merges_flags() {
        let args = Args::try_parse_from([
            "rangefetch",
            "-H",
            "Authorization: Bearer abc",
            "-H",
            "User-Agent: from-header",
            "--user-agent",
            "from-flag",
            "--referer",
            "https://www.example.com/",
            "--cookie",
            "session=1; lang=en",
        ])
        .unwrap();

        let headers = build_headers(&args).unwrap();
        assert_eq!(headers["authorization"], "Bearer abc");
        assert_eq!(headers[USER_AGENT], "from-flag");
        assert_eq!(headers[REFERER], "https://www.example.com/");
        assert_eq!(headers[COOKIE], "session=1; lang=en");
    }

    #[test]
    fn test_build_headers_rejects_malformed_header() {
        let args = Args::try_parse_from(["rangefetch", "-H", "no-colon-here"]).unwrap();
        let err = build_headers(&args).unwrap_err();
        assert!(err.to_string().contains("Name: Value"));
    }
}
