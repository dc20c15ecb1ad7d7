//! Machine image resolution
//!
//! The compute template takes the image id as an input variable. We ask the
//! cloud CLI for the newest image matching a fixed name/architecture filter
//! and fall back to a static per-region table of known-good images when the
//! query fails or comes back empty. Resolution never fails the deployment;
//! hard failure is reserved for init/apply/destroy.

use std::sync::Arc;
use tracing::{debug, warn};

use super::builder::ProcessCommandBuilder;
use super::runner::ProcessRunner;

const IMAGE_NAME_FILTER: &str = "ubuntu/images/hvm-ssd/ubuntu-jammy-22.04-amd64-server-*";
const IMAGE_ARCHITECTURE: &str = "x86_64";

/// Known-good Ubuntu 22.04 images per region.
const FALLBACK_IMAGES: &[(&str, &str)] = &[
    ("us-east-1", "ami-0c7217cdde317cfec"),
    ("us-east-2", "ami-05fb0b8c1424f266b"),
    ("us-west-2", "ami-008fe2fc65df48dac"),
    ("eu-west-1", "ami-0905a3c97561e0b69"),
    ("eu-central-1", "ami-0faab6bdbac9486fb"),
    ("ap-southeast-1", "ami-0fa377108253bf620"),
];

pub fn fallback_image(region: &str) -> &'static str {
    FALLBACK_IMAGES
        .iter()
        .find(|(r, _)| *r == region)
        .map(|(_, ami)| *ami)
        .unwrap_or(FALLBACK_IMAGES[0].1)
}

/// Resolve the newest matching image id for a region.
pub async fn resolve_machine_image(runner: &Arc<dyn ProcessRunner>, region: &str) -> String {
    let command = ProcessCommandBuilder::new("aws")
        .args([
            "ec2",
            "describe-images",
            "--owners",
            "amazon",
            "--region",
            region,
            "--filters",
            &format!("Name=name,Values={IMAGE_NAME_FILTER}"),
            &format!("Name=architecture,Values={IMAGE_ARCHITECTURE}"),
            "--query",
            "sort_by(Images, &CreationDate)[-1].ImageId",
            "--output",
            "text",
        ])
        .build();

    match runner.run(command).await {
        Ok(output) if output.status.success() => {
            let ami = output.stdout.trim().to_string();
            if ami.starts_with("ami-") {
                debug!(region, %ami, "resolved machine image from cloud query");
                return ami;
            }
            warn!(region, response = %ami, "image query returned no usable id, using fallback");
            fallback_image(region).to_string()
        }
        Ok(output) => {
            warn!(region, payload = %output.error_payload(), "image query failed, using fallback");
            fallback_image(region).to_string()
        }
        Err(err) => {
            warn!(region, %err, "image query could not run, using fallback");
            fallback_image(region).to_string()
        }
    }
}
