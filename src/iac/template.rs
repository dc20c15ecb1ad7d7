//! Embedded terraform templates and the rendering engine

use crate::config::DeploymentConfig;
use crate::error::Result;
use tera::{Context, Tera};

const MAIN_TF: &str = r#"terraform {
  required_version = ">= 1.0"

  required_providers {
    aws = {
      source  = "hashicorp/aws"
      version = "~> 5.0"
    }
  }
}

provider "aws" {
  region = var.region
}

resource "aws_vpc" "main" {
  cidr_block           = "{{ vpc_cidr }}"
  enable_dns_support   = true
  enable_dns_hostnames = true

  tags = {
    Name = "{{ app_name }}-vpc"
  }
}

resource "aws_internet_gateway" "main" {
  vpc_id = aws_vpc.main.id

  tags = {
    Name = "{{ app_name }}-igw"
  }
}

resource "aws_subnet" "public" {
  vpc_id                  = aws_vpc.main.id
  cidr_block              = "{{ public_subnet_cidr }}"
  map_public_ip_on_launch = true

  tags = {
    Name = "{{ app_name }}-public"
  }
}

resource "aws_route_table" "public" {
  vpc_id = aws_vpc.main.id

  route {
    cidr_block = "0.0.0.0/0"
    gateway_id = aws_internet_gateway.main.id
  }

  tags = {
    Name = "{{ app_name }}-public-rt"
  }
}

resource "aws_route_table_association" "public" {
  subnet_id      = aws_subnet.public.id
  route_table_id = aws_route_table.public.id
}

resource "aws_security_group" "app" {
  name   = "{{ app_name }}-sg"
  vpc_id = aws_vpc.main.id
{% for port in ingress_ports %}
  ingress {
    from_port   = {{ port }}
    to_port     = {{ port }}
    protocol    = "tcp"
    cidr_blocks = ["0.0.0.0/0"]
  }
{% endfor %}
  egress {
    from_port   = 0
    to_port     = 0
    protocol    = "-1"
    cidr_blocks = ["0.0.0.0/0"]
  }

  tags = {
    Name = "{{ app_name }}-sg"
  }
}

resource "aws_instance" "app" {
  ami                    = var.ami_id
  instance_type          = "{{ instance_type }}"
  subnet_id              = aws_subnet.public.id
  vpc_security_group_ids = [aws_security_group.app.id]
  user_data              = file("${path.module}/user_data.sh")

  tags = {
    Name = "{{ app_name }}"
  }
}

resource "aws_eip" "app" {
  instance = aws_instance.app.id
  domain   = "vpc"

  tags = {
    Name = "{{ app_name }}-eip"
  }
}
"#;

const VARIABLES_TF: &str = r#"variable "ami_id" {
  description = "Machine image for the application instance"
  type        = string
}

variable "region" {
  description = "Target region"
  type        = string
  default     = "{{ region }}"
}
"#;

const OUTPUTS_TF: &str = r#"output "instance_id" {
  value = aws_instance.app.id
}

output "public_ip" {
  value = aws_eip.app.public_ip
}

output "public_dns" {
  value = aws_instance.app.public_dns
}

output "application_url" {
  value = "http://${aws_eip.app.public_ip}:{{ port }}"
}
"#;

pub struct TemplateEngine {
    tera: Tera,
}

impl TemplateEngine {
    pub fn new() -> Result<Self> {
        let mut tera = Tera::default();
        tera.autoescape_on(vec![]); // HCL and shell, not HTML
        tera.add_raw_template("main.tf", MAIN_TF)?;
        tera.add_raw_template("variables.tf", VARIABLES_TF)?;
        tera.add_raw_template("outputs.tf", OUTPUTS_TF)?;
        tera.add_raw_template("bootstrap/python", super::bootstrap::PYTHON_BOOTSTRAP)?;
        tera.add_raw_template("bootstrap/node", super::bootstrap::NODE_BOOTSTRAP)?;
        tera.add_raw_template("bootstrap/generic", super::bootstrap::GENERIC_BOOTSTRAP)?;
        Ok(Self { tera })
    }

    pub fn render(&self, name: &str, context: &Context) -> Result<String> {
        Ok(self.tera.render(name, context)?)
    }

    pub fn render_main(&self, config: &DeploymentConfig) -> Result<String> {
        let mut context = Context::new();
        context.insert("app_name", &config.app.name);
        context.insert("vpc_cidr", &config.networking.vpc_cidr);
        context.insert("public_subnet_cidr", &config.networking.public_subnet_cidr);
        context.insert("ingress_ports", &config.networking.ingress_ports);
        context.insert("instance_type", &config.infrastructure.instance_type);
        self.render("main.tf", &context)
    }

    pub fn render_variables(&self, config: &DeploymentConfig) -> Result<String> {
        let mut context = Context::new();
        context.insert("region", &config.infrastructure.region);
        self.render("variables.tf", &context)
    }

    pub fn render_outputs(&self, config: &DeploymentConfig) -> Result<String> {
        let mut context = Context::new();
        context.insert("port", &config.app.port);
        self.render("outputs.tf", &context)
    }
}
