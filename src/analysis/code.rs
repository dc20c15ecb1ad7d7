//! Heuristic codebase inspector
//!
//! Walks a checked-out source tree and classifies language, framework,
//! declared port, dependencies and database hints from manifests and
//! well-known file names. When the source reference is a remote URL the
//! tree is not available locally, so the inspector returns a conservative
//! default analysis and lets the strategy engine fall through to its own
//! defaults.

use super::{CodeAnalysis, CodeInspector};
use crate::error::Result;
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeSet;
use std::path::Path;
use tracing::debug;
use walkdir::WalkDir;

static PORT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bport\b\s*[=:]\s*(\d{2,5})").unwrap());
static ENV_VAR_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?:os\.environ(?:\.get)?\(|process\.env\.|getenv\(\s*)["']?([A-Z][A-Z0-9_]{2,})"#)
        .unwrap()
});

const DB_KEYWORDS: &[(&str, &str)] = &[
    ("psycopg", "postgresql"),
    ("pg", "postgresql"),
    ("mysql", "mysql"),
    ("sqlalchemy", "sql"),
    ("mongoose", "mongodb"),
    ("pymongo", "mongodb"),
    ("redis", "redis"),
    ("sqlite", "sqlite"),
];

pub struct HeuristicInspector;

impl HeuristicInspector {
    pub fn new() -> Self {
        Self
    }

    fn analyze_tree(root: &Path) -> CodeAnalysis {
        let mut analysis = CodeAnalysis::default();
        let mut py_files = 0usize;
        let mut js_files = 0usize;
        let mut html_files = 0usize;
        let mut env_vars: BTreeSet<String> = BTreeSet::new();
        let mut databases: BTreeSet<String> = BTreeSet::new();

        for entry in WalkDir::new(root)
            .max_depth(4)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
        {
            let name = entry.file_name().to_string_lossy().to_lowercase();
            match name.as_str() {
                "dockerfile" => analysis.dockerized = true,
                "requirements.txt" => {
                    if let Ok(content) = std::fs::read_to_string(entry.path()) {
                        Self::collect_python_manifest(&content, &mut analysis, &mut databases);
                    }
                }
                "package.json" => {
                    if let Ok(content) = std::fs::read_to_string(entry.path()) {
                        Self::collect_node_manifest(&content, &mut analysis, &mut databases);
                    }
                }
                "pom.xml" | "build.gradle" => {
                    analysis.language = "java".to_string();
                    analysis.framework = "spring".to_string();
                    analysis.app_type = "spring".to_string();
                }
                _ => {}
            }

            match entry.path().extension().and_then(|e| e.to_str()) {
                Some("py") => py_files += 1,
                Some("js") | Some("ts") => js_files += 1,
                Some("html") | Some("htm") => html_files += 1,
                _ => {}
            }

            // Source-level hints: declared port, env var reads, framework imports.
            if matches!(
                entry.path().extension().and_then(|e| e.to_str()),
                Some("py") | Some("js") | Some("ts")
            ) {
                if let Ok(content) = std::fs::read_to_string(entry.path()) {
                    Self::collect_source_hints(&content, &mut analysis, &mut env_vars);
                }
            }
        }

        if analysis.language == "unknown" {
            if py_files > 0 && py_files >= js_files {
                analysis.language = "python".to_string();
            } else if js_files > 0 {
                analysis.language = "javascript".to_string();
            } else if html_files > 0 {
                analysis.language = "html".to_string();
            }
        }

        analysis.static_files =
            html_files > 0 && analysis.framework == "none" && py_files == 0 && js_files == 0;
        analysis.environment_variables = env_vars.into_iter().collect();
        analysis.database_requirements = databases.into_iter().collect();
        analysis
    }

    fn collect_python_manifest(
        content: &str,
        analysis: &mut CodeAnalysis,
        databases: &mut BTreeSet<String>,
    ) {
        analysis.language = "python".to_string();
        for line in content.lines() {
            let dep = line
                .split(['=', '<', '>', '~', '[', ';'])
                .next()
                .unwrap_or("")
                .trim()
                .to_lowercase();
            if dep.is_empty() || dep.starts_with('#') {
                continue;
            }
            analysis.dependencies.push(dep.clone());
            match dep.as_str() {
                "flask" => {
                    analysis.framework = "flask".to_string();
                    analysis.app_type = "flask".to_string();
                }
                "django" => {
                    analysis.framework = "django".to_string();
                    analysis.app_type = "django".to_string();
                }
                "fastapi" => {
                    analysis.framework = "fastapi".to_string();
                    analysis.app_type = "fastapi".to_string();
                }
                _ => {}
            }
            for (needle, engine) in DB_KEYWORDS {
                if dep.contains(needle) {
                    databases.insert(engine.to_string());
                }
            }
        }
    }

    fn collect_node_manifest(
        content: &str,
        analysis: &mut CodeAnalysis,
        databases: &mut BTreeSet<String>,
    ) {
        analysis.language = "javascript".to_string();
        let parsed: serde_json::Value = match serde_json::from_str(content) {
            Ok(v) => v,
            Err(_) => return,
        };
        if let Some(deps) = parsed.get("dependencies").and_then(|d| d.as_object()) {
            for dep in deps.keys() {
                let dep = dep.to_lowercase();
                analysis.dependencies.push(dep.clone());
                match dep.as_str() {
                    "express" => {
                        analysis.framework = "express".to_string();
                        analysis.app_type = "express".to_string();
                    }
                    "koa" | "fastify" => {
                        analysis.framework = dep.clone();
                        analysis.app_type = dep.clone();
                    }
                    _ => {}
                }
                for (needle, engine) in DB_KEYWORDS {
                    if dep.contains(needle) {
                        databases.insert(engine.to_string());
                    }
                }
            }
        }
        if let Some(start) = parsed
            .get("scripts")
            .and_then(|s| s.get("start"))
            .and_then(|s| s.as_str())
        {
            analysis.start_commands.push(start.to_string());
        }
    }

    fn collect_source_hints(
        content: &str,
        analysis: &mut CodeAnalysis,
        env_vars: &mut BTreeSet<String>,
    ) {
        if analysis.framework == "none" {
            if content.contains("from flask import") || content.contains("import flask") {
                analysis.framework = "flask".to_string();
                analysis.app_type = "flask".to_string();
                analysis.language = "python".to_string();
            } else if content.contains("from fastapi import") {
                analysis.framework = "fastapi".to_string();
                analysis.app_type = "fastapi".to_string();
                analysis.language = "python".to_string();
            } else if content.contains("require('express')")
                || content.contains("require(\"express\")")
                || content.contains("from 'express'")
            {
                analysis.framework = "express".to_string();
                analysis.app_type = "express".to_string();
                analysis.language = "javascript".to_string();
            }
        }
        if analysis.port.is_none() {
            if let Some(caps) = PORT_RE.captures(content) {
                analysis.port = caps[1].parse().ok();
            }
        }
        for caps in ENV_VAR_RE.captures_iter(content) {
            env_vars.insert(caps[1].to_string());
        }
    }
}

impl Default for HeuristicInspector {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CodeInspector for HeuristicInspector {
    async fn analyze(&self, source: &str) -> Result<CodeAnalysis> {
        let path = Path::new(source);
        if path.is_dir() {
            let root = path.to_path_buf();
            let analysis =
                tokio::task::spawn_blocking(move || Self::analyze_tree(&root))
                    .await
                    .map_err(|e| crate::error::Error::Analysis(e.to_string()))?;
            debug!(
                language = %analysis.language,
                framework = %analysis.framework,
                "codebase analysis complete"
            );
            Ok(analysis)
        } else {
            debug!(source, "source is not a local tree, using default analysis");
            Ok(CodeAnalysis::default())
        }
    }
}
