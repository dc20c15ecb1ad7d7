//! Host bootstrap script synthesis
//!
//! The bootstrap script is embedded as instance user data and runs once on
//! first boot. It installs a runtime, fetches the source, and registers the
//! application as a supervised service. Install steps are fatal;
//! verification steps log and continue so a slow-starting app does not
//! abort host setup.

use crate::config::DeploymentConfig;
use crate::error::Result;
use tera::Context;

use super::template::TemplateEngine;

/// All branches append progress to this host-side log.
pub const SETUP_LOG: &str = "/var/log/skylift-setup.log";

pub(crate) const PYTHON_BOOTSTRAP: &str = r#"#!/bin/bash
# skylift host bootstrap: python stack for {{ app_name }}
exec >> {{ setup_log }} 2>&1
echo "=== skylift bootstrap started: $(date) ==="

apt-get update -y
apt-get install -y python3 python3-pip git || { echo "FATAL: runtime install failed"; exit 1; }

git clone {{ repository_url }} /opt/app || { echo "FATAL: source clone failed"; exit 1; }
cd /opt/app

ENTRY=""
for candidate in app.py main.py server.py; do
  if [ -f "$candidate" ]; then ENTRY="$candidate"; break; fi
done
if [ -z "$ENTRY" ]; then ENTRY="app.py"; fi
echo "entry file: $ENTRY"

if [ -f requirements.txt ]; then
  pip3 install -r requirements.txt || { echo "FATAL: dependency install failed"; exit 1; }
else
  pip3 install {{ default_packages }} || { echo "FATAL: dependency install failed"; exit 1; }
fi

MODULE="${ENTRY%.py}"
cat > /opt/app/skylift_entry.py <<PYEOF
import importlib

mod = importlib.import_module("$MODULE")
app = getattr(mod, "app")

if __name__ == "__main__":
{{ run_statement }}
PYEOF

cat > /etc/systemd/system/skylift-app.service <<'UNIT'
[Unit]
Description={{ app_name }} (skylift managed)
After=network.target

[Service]
WorkingDirectory=/opt/app
ExecStart=/usr/bin/python3 /opt/app/skylift_entry.py
Restart=always
RestartSec=5
Environment=PORT={{ port }}

[Install]
WantedBy=multi-user.target
UNIT

systemctl daemon-reload
systemctl enable skylift-app
systemctl start skylift-app || echo "WARN: service start failed"

sleep 5
curl -s "http://localhost:{{ port }}/" > /dev/null \
  && echo "verify: application responding on port {{ port }}" \
  || echo "WARN: application not responding yet"
echo "=== skylift bootstrap finished: $(date) ==="
"#;

pub(crate) const NODE_BOOTSTRAP: &str = r#"#!/bin/bash
# skylift host bootstrap: node stack for {{ app_name }}
exec >> {{ setup_log }} 2>&1
echo "=== skylift bootstrap started: $(date) ==="

apt-get update -y
apt-get install -y nodejs npm git || { echo "FATAL: runtime install failed"; exit 1; }

git clone {{ repository_url }} /opt/app || { echo "FATAL: source clone failed"; exit 1; }
cd /opt/app

ENTRY=""
for candidate in server.js app.js index.js src/server.js src/app.js src/index.js; do
  if [ -f "$candidate" ]; then ENTRY="$candidate"; break; fi
done
if [ -z "$ENTRY" ] && [ -f package.json ]; then
  ENTRY=$(node -e "console.log(require('./package.json').main || '')" 2>/dev/null)
fi
if [ -z "$ENTRY" ]; then ENTRY="server.js"; fi
echo "entry file: $ENTRY"

if [ -f package.json ]; then
  npm install --omit=dev || { echo "FATAL: dependency install failed"; exit 1; }
fi

cat > /etc/systemd/system/skylift-app.service <<UNIT
[Unit]
Description={{ app_name }} (skylift managed)
After=network.target

[Service]
WorkingDirectory=/opt/app
ExecStart=/usr/bin/node /opt/app/$ENTRY
Restart=always
RestartSec=5
Environment=PORT={{ port }}

[Install]
WantedBy=multi-user.target
UNIT

systemctl daemon-reload
systemctl enable skylift-app
systemctl start skylift-app || echo "WARN: service start failed"

sleep 5
curl -s "http://localhost:{{ port }}/" > /dev/null \
  && echo "verify: application responding on port {{ port }}" \
  || echo "WARN: application not responding yet"
echo "=== skylift bootstrap finished: $(date) ==="
"#;

pub(crate) const GENERIC_BOOTSTRAP: &str = r#"#!/bin/bash
# skylift host bootstrap: container fallback for {{ app_name }}
exec >> {{ setup_log }} 2>&1
echo "=== skylift bootstrap started: $(date) ==="

apt-get update -y
apt-get install -y docker.io git || { echo "FATAL: container engine install failed"; exit 1; }
systemctl enable --now docker

git clone {{ repository_url }} /opt/app || { echo "FATAL: source clone failed"; exit 1; }
cd /opt/app

if [ -f Dockerfile ]; then
  docker build -t skylift-app . || { echo "FATAL: image build failed"; exit 1; }
  docker run -d --restart=always -p {{ port }}:{{ port }} --name skylift-app skylift-app \
    || { echo "FATAL: container start failed"; exit 1; }
else
  mkdir -p /opt/app/public
  cat > /opt/app/public/index.html <<'HTML'
<!doctype html>
<html>
  <head><title>{{ app_name }}</title></head>
  <body><h1>{{ app_name }}</h1><p>Deployed by skylift.</p></body>
</html>
HTML
  docker run -d --restart=always -p {{ port }}:80 --name skylift-app \
    -v /opt/app/public:/usr/share/nginx/html:ro nginx:alpine \
    || { echo "FATAL: placeholder container start failed"; exit 1; }
fi

sleep 5
curl -s "http://localhost:{{ port }}/" > /dev/null \
  && echo "verify: application responding on port {{ port }}" \
  || echo "WARN: application not responding yet"
echo "=== skylift bootstrap finished: $(date) ==="
"#;

/// Select the bootstrap branch for a configuration and render it.
pub fn script_for(config: &DeploymentConfig, engine: &TemplateEngine) -> Result<String> {
    let mut context = Context::new();
    context.insert("app_name", &config.app.name);
    context.insert("repository_url", &config.app.repository_url);
    context.insert("port", &config.app.port);
    context.insert("setup_log", SETUP_LOG);

    match config.app.language.as_str() {
        "python" => {
            context.insert("default_packages", default_python_packages(&config.app.framework));
            context.insert("run_statement", &run_statement(&config.app.framework, config.app.port));
            engine.render("bootstrap/python", &context)
        }
        "javascript" | "typescript" | "node" => engine.render("bootstrap/node", &context),
        _ => engine.render("bootstrap/generic", &context),
    }
}

fn default_python_packages(framework: &str) -> &'static str {
    match framework {
        "fastapi" => "fastapi uvicorn",
        "django" => "django gunicorn",
        _ => "flask",
    }
}

/// Body of the generated wrapper's `__main__` block, indented for python.
fn run_statement(framework: &str, port: u16) -> String {
    match framework {
        "fastapi" => format!(
            "    import uvicorn\n    uvicorn.run(app, host=\"0.0.0.0\", port={port})"
        ),
        _ => format!("    app.run(host=\"0.0.0.0\", port={port})"),
    }
}
