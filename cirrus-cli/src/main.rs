use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, anyhow, bail};
use clap::{Parser, Subcommand};
use colored::Colorize;
use heck::ToUpperCamelCase;
use similar::{ChangeTag, TextDiff};

use cirrus_core::LifecycleState;
use cirrus_core::polymorphic::{Decoded, DynRegistry};
use cirrus_provider_oci::models::goldengate::{
    CreateDeploymentDetails, CreateOggDeploymentDetails, DeploymentType, LicenseModel,
};
use cirrus_provider_oci::sweeper::{DeploymentSweeper, SweepReport, SweeperResourceIds};
use cirrus_provider_oci::{GoldenGateClient, InMemoryGoldenGate, ProviderConfig, Registries};

#[derive(Parser)]
#[command(name = "cirrus")]
#[command(about = "OCI model codecs and resource maintenance", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the known polymorphic unions and their tags
    Unions,
    /// Decode a JSON payload as a union and print its wire form
    Decode {
        /// Union name (e.g. DeliveredArtifact or delivered_artifact)
        union: String,

        /// Path to a JSON payload
        file: PathBuf,

        /// Decode the list under this field instead of a single value
        #[arg(long)]
        items: Option<String>,
    },
    /// Check that a payload survives a decode/encode round trip unchanged
    Check {
        /// Union name
        union: String,

        /// Path to a JSON payload
        file: PathBuf,

        /// Check the list under this field instead of a single value
        #[arg(long)]
        items: Option<String>,
    },
    /// Delete leftover Golden Gate deployments of a compartment
    Sweep {
        /// Compartment OCID (defaults to TF_VAR_compartment_id)
        #[arg(long)]
        compartment: Option<String>,

        /// Sweep an in-memory service seeded with this many deployments
        #[arg(long)]
        simulate: usize,
    },
}

#[tokio::main]
async fn main() {
    env_logger::init();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Unions => run_unions(),
        Commands::Decode { union, file, items } => run_decode(&union, &file, items.as_deref()),
        Commands::Check { union, file, items } => run_check(&union, &file, items.as_deref()),
        Commands::Sweep {
            compartment,
            simulate,
        } => run_sweep(compartment, simulate).await,
    };

    if let Err(e) = result {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

fn registries() -> Result<Registries> {
    Registries::new().context("Failed to build union registries")
}

fn find_registry<'a>(registries: &'a Registries, union: &str) -> Result<&'a dyn DynRegistry> {
    let name = union.to_upper_camel_case();
    registries.find(&name).ok_or_else(|| {
        let known: Vec<&str> = registries.all().iter().map(|r| r.union_name()).collect();
        anyhow!("Unknown union '{}' (known: {})", union, known.join(", "))
    })
}

fn format_unions(registries: &Registries) -> String {
    let mut out = String::new();
    for registry in registries.all() {
        out.push_str(&format!(
            "{} (discriminator: {})\n",
            registry.union_name(),
            registry.discriminator()
        ));
        for tag in registry.tags() {
            out.push_str(&format!("  - {}\n", tag));
        }
    }
    out
}

fn run_unions() -> Result<()> {
    let registries = registries()?;
    for line in format_unions(&registries).lines() {
        match line.strip_prefix("  - ") {
            Some(tag) => println!("  - {}", tag.green()),
            None => println!("{}", line.bold()),
        }
    }
    Ok(())
}

fn decode_file(
    registries: &Registries,
    union: &str,
    file: &Path,
    items: Option<&str>,
) -> Result<Vec<Decoded>> {
    let registry = find_registry(registries, union)?;
    let payload =
        fs::read(file).with_context(|| format!("Failed to read {}", file.display()))?;
    log::debug!(
        "Decoding {} as {} ({} bytes)",
        file.display(),
        registry.union_name(),
        payload.len()
    );

    let decoded = match items {
        Some(field) => registry.reencode_collection(&payload, field)?,
        None => vec![registry.reencode(&payload)?],
    };
    Ok(decoded)
}

/// Wire form of decoded values, shaped like the input
fn wire_output(decoded: Vec<Decoded>, items: Option<&str>) -> serde_json::Value {
    let mut wires: Vec<serde_json::Value> = decoded.into_iter().map(|d| d.wire).collect();
    match items {
        Some(field) => wrap_items(field, serde_json::Value::Array(wires)),
        None => wires.pop().unwrap_or(serde_json::Value::Null),
    }
}

fn wrap_items(field: &str, items: serde_json::Value) -> serde_json::Value {
    let mut object = serde_json::Map::new();
    object.insert(field.to_string(), items);
    serde_json::Value::Object(object)
}

fn run_decode(union: &str, file: &Path, items: Option<&str>) -> Result<()> {
    let registries = registries()?;
    let decoded = decode_file(&registries, union, file, items)?;
    for value in &decoded {
        log::info!("Decoded variant {}", value.tag);
    }
    let output = wire_output(decoded, items);
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

/// Pretty-printed input and round-tripped output, for comparison
fn round_trip(
    registries: &Registries,
    union: &str,
    file: &Path,
    items: Option<&str>,
) -> Result<(String, String)> {
    let raw = fs::read_to_string(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let input: serde_json::Value = serde_json::from_str(&raw)
        .with_context(|| format!("{} is not valid JSON", file.display()))?;
    let input = match items {
        Some(field) => wrap_items(field, input.get(field).cloned().unwrap_or_default()),
        None => input,
    };

    let decoded = decode_file(registries, union, file, items)?;
    let output = wire_output(decoded, items);
    Ok((
        serde_json::to_string_pretty(&input)? + "\n",
        serde_json::to_string_pretty(&output)? + "\n",
    ))
}

fn run_check(union: &str, file: &Path, items: Option<&str>) -> Result<()> {
    let registries = registries()?;
    let (original, encoded) = round_trip(&registries, union, file, items)?;
    if original == encoded {
        println!("{} {}", "Round trip OK:".green().bold(), file.display());
        return Ok(());
    }
    print_diff(file, &original, &encoded);
    bail!("{} changed after a decode/encode round trip", file.display())
}

/// Seed `service` with `count` ACTIVE deployments in `compartment_id`
async fn seed_deployments(
    service: &InMemoryGoldenGate,
    compartment_id: &str,
    count: usize,
) -> Result<Vec<String>> {
    let mut ids = Vec::with_capacity(count);
    for i in 0..count {
        let details = CreateDeploymentDetails {
            display_name: format!("sweep-{}", i),
            license_model: LicenseModel::LicenseIncluded,
            description: None,
            compartment_id: compartment_id.to_string(),
            deployment_backup_id: None,
            freeform_tags: Default::default(),
            defined_tags: Default::default(),
            subnet_id: "ocid1.subnet.oc1.phx.aaaaaaaasimulated".to_string(),
            fqdn: None,
            nsg_ids: vec![],
            is_public: None,
            cpu_core_count: 1,
            is_auto_scaling_enabled: false,
            deployment_type: DeploymentType::Ogg,
            ogg_data: Some(CreateOggDeploymentDetails {
                deployment_name: format!("sweep_{}", i),
                admin_username: "admin".to_string(),
                admin_password: "BEstrO0ng_#11".to_string(),
                certificate: None,
                key: None,
            }),
        };
        let created = service.create_deployment(&details).await?;
        let settled = service.get_deployment(&created.id).await?;
        if settled.lifecycle_state != LifecycleState::Active {
            bail!(
                "Deployment {} did not become ACTIVE (state {})",
                created.id,
                settled.lifecycle_state
            );
        }
        ids.push(created.id);
    }
    Ok(ids)
}

fn print_report(report: &SweepReport) {
    for id in &report.deleted {
        println!("  {} {}", "-".red(), id);
    }
    for id in &report.skipped {
        println!("  {} {} (default resource)", "~".yellow(), id);
    }
    for failure in &report.failed {
        println!("  {} {}: {}", "!".red().bold(), failure.identifier, failure.reason);
    }
    println!(
        "\nSweep: {} deleted, {} skipped, {} failed.",
        report.deleted.len(),
        report.skipped.len(),
        report.failed.len()
    );
}

async fn sweep_simulated(
    config: ProviderConfig,
    compartment_id: &str,
    count: usize,
) -> Result<SweepReport> {
    let service = Arc::new(InMemoryGoldenGate::new().with_transition_reads(0));
    seed_deployments(&service, compartment_id, count).await?;
    log::info!(
        "Seeded {} deployments in {}",
        service.len(),
        compartment_id
    );

    let sweeper = DeploymentSweeper::new(service, config, Arc::new(SweeperResourceIds::new()));
    Ok(sweeper.sweep(compartment_id).await?)
}

async fn run_sweep(compartment: Option<String>, simulate: usize) -> Result<()> {
    let config = ProviderConfig::from_env()?;
    let compartment_id = compartment
        .or_else(|| config.compartment_id.clone())
        .ok_or_else(|| anyhow!("No compartment given (use --compartment or TF_VAR_compartment_id)"))?;

    println!("{}", "Sweeping Golden Gate deployments...".cyan());
    let report = sweep_simulated(config, &compartment_id, simulate).await?;
    print_report(&report);

    if !report.is_clean() {
        bail!("{} deployments could not be swept", report.failed.len());
    }
    Ok(())
}

fn print_diff(file: &Path, original: &str, encoded: &str) {
    println!("\n{} {}:", "Diff for".cyan().bold(), file.display());

    let diff = TextDiff::from_lines(original, encoded);
    for change in diff.iter_all_changes() {
        let sign = match change.tag() {
            ChangeTag::Delete => "-".red(),
            ChangeTag::Insert => "+".green(),
            ChangeTag::Equal => " ".normal(),
        };
        print!("{}{}", sign, change);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::time::Duration;

    fn payload_file(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_find_registry_accepts_snake_case() {
        let registries = Registries::new().unwrap();
        let registry = find_registry(&registries, "delivered_artifact").unwrap();
        assert_eq!(registry.union_name(), "DeliveredArtifact");
        assert_eq!(registry.discriminator(), "artifactType");
    }

    #[test]
    fn test_find_registry_unknown_lists_known_unions() {
        let registries = Registries::new().unwrap();
        let err = find_registry(&registries, "Nope").err().unwrap();
        let message = err.to_string();
        assert!(message.starts_with("Unknown union 'Nope'"));
        assert!(message.contains("PublishedObject"));
    }

    #[test]
    fn test_format_unions_lists_tags() {
        let registries = Registries::new().unwrap();
        let listing = format_unions(&registries);
        assert!(listing.starts_with("DeliveredArtifact (discriminator: artifactType)\n"));
        assert!(listing.contains("  - OCIR\n"));
        assert!(listing.contains("  - GENERIC_ARTIFACT\n"));
    }

    #[test]
    fn test_decode_single_payload() {
        let file = payload_file(
            r#"{"artifactType": "GENERIC_ARTIFACT", "deployArtifactId": "ocid1.devopsdeployartifact.oc1.phx.aaaa", "outputArtifactName": "out", "artifactRepositoryId": "ocid1.artifactrepository.oc1.phx.aaaa", "path": "p", "version": "1.0"}"#,
        );
        let registries = Registries::new().unwrap();
        let decoded = decode_file(&registries, "DeliveredArtifact", file.path(), None).unwrap();
        assert_eq!(decoded.len(), 1);
        assert_eq!(decoded[0].tag, "GENERIC_ARTIFACT");
        assert_eq!(decoded[0].wire["artifactType"], "GENERIC_ARTIFACT");
    }

    #[test]
    fn test_decode_unknown_tag_fails() {
        let file = payload_file(r#"{"exadataResourceType": "STORAGE_SERVER"}"#);
        let registries = Registries::new().unwrap();
        let err = decode_file(
            &registries,
            "exadata_insight_resource_statistics_aggregation",
            file.path(),
            None,
        )
        .err()
        .unwrap();
        assert!(err.to_string().contains("STORAGE_SERVER"));
    }

    #[test]
    fn test_decode_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.json");
        let registries = Registries::new().unwrap();
        let err = decode_file(&registries, "PublishedObject", &missing, None)
            .err()
            .unwrap();
        assert!(err.to_string().starts_with("Failed to read"));
    }

    #[test]
    fn test_wire_output_wraps_items() {
        let decoded = vec![Decoded {
            tag: "OCIR",
            wire: serde_json::json!({"artifactType": "OCIR"}),
        }];
        let output = wire_output(decoded, Some("items"));
        assert_eq!(output, serde_json::json!({"items": [{"artifactType": "OCIR"}]}));
    }

    #[test]
    fn test_round_trip_of_canonical_collection_is_unchanged() {
        let file = payload_file(
            r#"{"items": [{"artifactType": "OCIR", "deployArtifactId": "ocid1.devopsdeployartifact.oc1.phx.bbbb", "outputArtifactName": "image", "imageUri": "phx.ocir.io/ns/repo:1", "deliveredArtifactHash": "sha256:abc"}]}"#,
        );
        let registries = Registries::new().unwrap();
        let (original, encoded) =
            round_trip(&registries, "DeliveredArtifact", file.path(), Some("items")).unwrap();
        assert_eq!(original, encoded);
    }

    #[test]
    fn test_round_trip_reports_dropped_fields() {
        let file = payload_file(r#"{"artifactType": "OCIR", "imageUri": "phx.ocir.io/ns/repo:1"}"#);
        let registries = Registries::new().unwrap();
        let (original, encoded) =
            round_trip(&registries, "DeliveredArtifact", file.path(), None).unwrap();
        assert_ne!(original, encoded);
        assert!(encoded.contains("\"deployArtifactId\": null"));
    }

    #[tokio::test]
    async fn test_seed_deployments_are_active() {
        let service = InMemoryGoldenGate::new().with_transition_reads(0);
        let ids = seed_deployments(&service, "ocid1.compartment.oc1..aaaaaaaasim", 2)
            .await
            .unwrap();
        assert_eq!(ids.len(), 2);
        assert_eq!(service.len(), 2);
    }

    #[tokio::test]
    async fn test_seed_rejects_invalid_compartment() {
        let service = InMemoryGoldenGate::new();
        let err = seed_deployments(&service, "not-an-ocid", 1).await.err().unwrap();
        assert!(err.to_string().contains("compartmentId"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_simulated_sweep_deletes_everything() {
        let config = ProviderConfig {
            poll_interval: Duration::from_secs(1),
            ..Default::default()
        };
        let report = sweep_simulated(config, "ocid1.compartment.oc1..aaaaaaaasim", 3)
            .await
            .unwrap();
        assert!(report.is_clean());
        assert_eq!(report.deleted.len(), 3);
    }
}
