use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

/// How much of the employee profile the privacy label reveals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum PrivacyLevel {
    #[default]
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Contact {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub telegram: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CorporateColors {
    pub primary: String,
    pub secondary: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Branding {
    #[serde(default)]
    pub logo_url: Option<String>,
    #[serde(default)]
    pub corporate_colors: Option<CorporateColors>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EmployeeProfile {
    pub full_name: String,
    #[serde(default)]
    pub position: String,
    #[serde(default)]
    pub company: String,
    #[serde(default)]
    pub department: String,
    #[serde(default)]
    pub office_location: String,
    #[serde(default)]
    pub contact: Contact,
    #[serde(default)]
    pub branding: Branding,
    #[serde(default)]
    pub privacy_level: PrivacyLevel,
}

#[derive(Deserialize)]
struct ProfileFile {
    employee: EmployeeProfile,
}

impl EmployeeProfile {
    /// Parse a profile document of the form `{ "employee": { ... } }`.
    pub fn from_json(json: &str) -> Result<Self> {
        let file: ProfileFile = serde_json::from_str(json).context("Invalid employee profile")?;
        Ok(file.employee)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read profile {}", path.display()))?;
        Self::from_json(&json)
    }

    /// Privacy label text for `level`, one field per line.
    pub fn privacy_text(&self, level: PrivacyLevel) -> String {
        let mut lines = vec![self.full_name.as_str(), self.position.as_str()];
        if level != PrivacyLevel::Low {
            lines.extend([
                self.company.as_str(),
                self.department.as_str(),
                self.office_location.as_str(),
            ]);
        }
        if level == PrivacyLevel::High {
            lines.extend([self.contact.email.as_str(), self.contact.telegram.as_str()]);
        }
        lines.join("\n")
    }

    /// Link for the default contact QR code, if the profile has one.
    pub fn contact_link(&self) -> Option<&str> {
        Some(self.contact.telegram.as_str()).filter(|link| !link.is_empty())
    }

    pub fn logo_url(&self) -> Option<&str> {
        self.branding.logo_url.as_deref().filter(|url| !url.is_empty())
    }
}
