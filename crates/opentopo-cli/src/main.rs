//! opentopo - download DEM rasters from the OpenTopography global DEM API.
//!
//! ```text
//! opentopo --south -25.451567 --north -25.418431 --west -49.308291 --east -49.235979 \
//!     --api-key demoapikeyot2022 -o curitiba.tif
//! ```

mod config;
mod error;
mod logging;

use clap::Parser;
use config::{parse_key_val, BboxConfig, RequestConfig};
use error::CliError;
use opentopo_dem::{
    build_url, redact_api_key, retrieve_dem, DemError, DemParams, ParamValue, BASE_URL, DEMTYPE,
};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info};

#[derive(Debug, Parser)]
#[command(name = "opentopo")]
#[command(about = "Download DEM rasters from the OpenTopography global DEM API", long_about = None)]
struct Args {
    /// YAML request file; flags override its values
    #[arg(long, short = 'c')]
    config: Option<PathBuf>,

    /// DEM product, e.g. SRTMGL3, SRTMGL1, COP30 [default: SRTMGL3]
    #[arg(long)]
    demtype: Option<String>,

    /// Southern latitude in decimal degrees
    #[arg(long, allow_negative_numbers = true)]
    south: Option<f64>,

    /// Northern latitude in decimal degrees
    #[arg(long, allow_negative_numbers = true)]
    north: Option<f64>,

    /// Western longitude in decimal degrees
    #[arg(long, allow_negative_numbers = true)]
    west: Option<f64>,

    /// Eastern longitude in decimal degrees
    #[arg(long, allow_negative_numbers = true)]
    east: Option<f64>,

    /// Response format, e.g. GTiff, AAIGrid, HFA [default: GTiff]
    #[arg(long)]
    output_format: Option<String>,

    /// OpenTopography API key
    #[arg(long, env = "OPENTOPOGRAPHY_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Extra query parameter (repeatable)
    #[arg(long = "param", value_name = "KEY=VALUE", value_parser = parse_key_val)]
    params: Vec<(String, String)>,

    /// Request timeout in seconds [default: 30]
    #[arg(long)]
    timeout: Option<f64>,

    /// Print the request URL (API key hidden) without downloading
    #[arg(long)]
    dry_run: bool,

    /// Output file for the raster
    #[arg(long, short = 'o', required_unless_present = "dry_run")]
    output: Option<PathBuf>,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Args {
    /// Command-line values as a config layer.
    fn overrides(&self) -> RequestConfig {
        RequestConfig {
            demtype: self.demtype.clone(),
            bbox: BboxConfig {
                south: self.south,
                north: self.north,
                west: self.west,
                east: self.east,
            },
            output_format: self.output_format.clone(),
            api_key: self.api_key.clone(),
            timeout_secs: self.timeout,
            params: self
                .params
                .iter()
                .map(|(k, v)| (k.clone(), ParamValue::from(v.as_str())))
                .collect(),
        }
    }
}

fn main() {
    let args = Args::parse();

    if let Err(e) = logging::init_logging(args.verbose) {
        e.exit();
    }

    if let Err(e) = run(&args) {
        e.exit();
    }
}

fn run(args: &Args) -> Result<(), CliError> {
    let base = match &args.config {
        Some(path) => {
            debug!(path = %path.display(), "Loading request config");
            RequestConfig::load(path)?
        }
        None => RequestConfig::default(),
    };
    let config = base.merge(args.overrides());
    let params = config.to_params();
    let timeout = config.timeout()?;

    if args.dry_run {
        println!("{}", dry_run_url(&params)?);
        return Ok(());
    }

    let output = args
        .output
        .as_ref()
        .ok_or_else(|| CliError::Config("--output is required".to_string()))?;

    info!(
        demtype = %params.get(DEMTYPE).map(|v| v.to_string()).unwrap_or_default(),
        timeout_secs = timeout.as_secs_f64(),
        "Requesting DEM"
    );
    let start = Instant::now();
    let bytes = retrieve_dem(&params, Some(timeout))?;
    write_output(output, &bytes)?;

    info!(
        bytes = bytes.len(),
        path = %output.display(),
        elapsed_secs = start.elapsed().as_secs_f64(),
        "Wrote DEM"
    );
    Ok(())
}

/// Request URL for `--dry-run`, with the API key hidden.
///
/// Validates first, so an incomplete request fails the same way a real one
/// would.
fn dry_run_url(params: &DemParams) -> Result<String, CliError> {
    params.validate().map_err(DemError::from)?;
    Ok(redact_api_key(&build_url(BASE_URL, params)))
}

/// Write the downloaded raster to `path`.
fn write_output(path: &Path, bytes: &[u8]) -> Result<(), CliError> {
    std::fs::write(path, bytes).map_err(|source| CliError::FileWrite {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_parse_full_command_line() {
        let args = Args::try_parse_from([
            "opentopo",
            "--south",
            "-25.451567",
            "--north",
            "-25.418431",
            "--west",
            "-49.308291",
            "--east",
            "-49.235979",
            "--api-key",
            "demoapikeyot2022",
            "--param",
            "datasetName=COP30",
            "-o",
            "out.tif",
            "-vv",
        ])
        .unwrap();

        assert_eq!(args.verbose, 2);
        assert_eq!(args.output, Some(PathBuf::from("out.tif")));

        let params = RequestConfig::default().merge(args.overrides()).to_params();
        assert!(params.validate().is_ok());
        assert_eq!(params.get("south"), Some(&ParamValue::Float(-25.451567)));
        assert_eq!(params.get("datasetName"), Some(&ParamValue::from("COP30")));
    }

    #[test]
    fn test_output_required_without_dry_run() {
        assert!(Args::try_parse_from(["opentopo", "--south", "1"]).is_err());
        assert!(Args::try_parse_from(["opentopo", "--dry-run"]).is_ok());
    }

    fn full_config() -> RequestConfig {
        let args = Args::try_parse_from([
            "opentopo",
            "--south",
            "-25.451567",
            "--north",
            "-25.418431",
            "--west",
            "-49.308291",
            "--east",
            "-49.235979",
            "--api-key",
            "demoapikeyot2022",
            "--dry-run",
        ])
        .unwrap();
        RequestConfig::default().merge(args.overrides())
    }

    #[test]
    fn test_dry_run_url_hides_key() {
        let url = dry_run_url(&full_config().to_params()).unwrap();
        assert!(url.starts_with(&format!("{}?", BASE_URL)), "{}", url);
        assert!(url.contains("API_Key=REDACTED"), "{}", url);
        assert!(!url.contains("demoapikeyot2022"), "{}", url);
        assert!(url.contains("demtype=SRTMGL3"));
        assert!(url.contains("outputFormat=GTiff"));
    }

    #[test]
    fn test_dry_run_url_rejects_incomplete_bbox() {
        let mut config = full_config();
        config.bbox.east = None;
        config.bbox.west = None;
        match dry_run_url(&config.to_params()) {
            Err(CliError::Dem(DemError::Validation(
                opentopo_dem::ValidationError::MissingParameters { missing },
            ))) => assert_eq!(missing, vec!["west".to_string(), "east".to_string()]),
            other => panic!("expected missing parameters, got {:?}", other),
        }
    }

    #[test]
    fn test_write_output() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("curitiba.tif");
        write_output(&path, b"\x00\x01\x02").unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), vec![0x00, 0x01, 0x02]);
    }

    #[test]
    fn test_write_output_to_missing_dir() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("no-such-dir").join("out.tif");
        match write_output(&path, b"dem") {
            Err(CliError::FileWrite { path: failed, .. }) => assert_eq!(failed, path),
            other => panic!("expected write error, got {:?}", other),
        }
    }

    #[test]
    fn test_bad_param_rejected() {
        assert!(Args::try_parse_from(["opentopo", "--param", "oops", "-o", "x.tif"]).is_err());
    }
}
