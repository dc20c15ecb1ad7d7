//! Manual replication instructions
//!
//! A deployment record carries a plain-language recipe sufficient for a
//! person to reproduce the deployment by hand, without this system.

use crate::config::DeploymentConfig;

pub fn for_config(config: &DeploymentConfig) -> Vec<String> {
    let port = config.app.port;
    let mut instructions = vec![
        format!(
            "1. Create a VPC with CIDR {} and a public subnet {} with an internet gateway and a default route.",
            config.networking.vpc_cidr, config.networking.public_subnet_cidr
        ),
        format!(
            "2. Create a security group allowing inbound TCP on ports {} from anywhere, and all outbound traffic.",
            config
                .networking
                .ingress_ports
                .iter()
                .map(|p| p.to_string())
                .collect::<Vec<_>>()
                .join(", ")
        ),
        format!(
            "3. Launch a {} instance in {} from a recent Ubuntu 22.04 image, attached to the public subnet and security group.",
            config.infrastructure.instance_type, config.infrastructure.region
        ),
        "4. Allocate a static public address and associate it with the instance.".to_string(),
        format!(
            "5. On the instance, clone {} into /opt/app.",
            config.app.repository_url
        ),
    ];

    match config.app.language.as_str() {
        "python" => {
            instructions.push(
                "6. Install python3 and pip, install the declared dependencies, and run the app bound to 0.0.0.0.".to_string(),
            );
        }
        "javascript" | "typescript" | "node" => {
            instructions.push(
                "6. Install node and npm, run npm install, and start the entry file with PORT set.".to_string(),
            );
        }
        _ => {
            instructions.push(
                "6. Install docker and build/run the project's Dockerfile, or serve static content.".to_string(),
            );
        }
    }

    instructions.push(format!(
        "7. Register the app as a supervised service with automatic restart, listening on port {port}."
    ));
    instructions.push(format!(
        "8. Verify the app responds at http://<public-address>:{port}/."
    ));

    if let Some(db) = &config.database {
        instructions.push(format!(
            "9. Provision a managed {} database ({}) and point the app at it.",
            db.engine, db.instance_class
        ));
    }

    instructions
}

/// Conservative instructions for a record rebuilt from on-disk state,
/// where the original configuration is no longer available.
pub fn reconciled() -> Vec<String> {
    vec![
        "This deployment was reconciled from on-disk provisioning state; the original step history is not available.".to_string(),
        "Inspect the generated templates in the deployment working directory to reproduce it manually.".to_string(),
    ]
}
